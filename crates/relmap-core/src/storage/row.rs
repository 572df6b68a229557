//! Row representation and its stored form.

use crate::error::Error;
use relmap_proto::Value;
use rkyv::{Archive, Deserialize, Serialize};
use std::collections::BTreeMap;

/// A table row: column name to value.
pub type Row = BTreeMap<String, Value>;

/// The serialized form of a row.
#[derive(Debug, Clone, PartialEq, Archive, Serialize, Deserialize)]
pub struct StoredRow {
    /// Column values in column-name order.
    pub fields: Vec<(String, Value)>,
}

impl StoredRow {
    /// Capture a row for storage.
    pub fn from_row(row: &Row) -> Self {
        Self {
            fields: row.iter().map(|(k, v)| (k.clone(), v.clone())).collect(),
        }
    }

    /// Convert back into a row.
    pub fn into_row(self) -> Row {
        self.fields.into_iter().collect()
    }

    /// Serialize the row to bytes using rkyv.
    pub fn to_bytes(&self) -> Result<Vec<u8>, Error> {
        rkyv::to_bytes::<rkyv::rancor::Error>(self)
            .map(|v| v.to_vec())
            .map_err(|e| Error::Serialization(e.to_string()))
    }

    /// Deserialize a row from bytes using rkyv.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, Error> {
        rkyv::from_bytes::<Self, rkyv::rancor::Error>(bytes)
            .map_err(|e| Error::Deserialization(e.to_string()))
    }
}

/// Encode a row straight to bytes.
pub(crate) fn encode_row(row: &Row) -> Result<Vec<u8>, Error> {
    StoredRow::from_row(row).to_bytes()
}

/// Decode bytes straight to a row.
pub(crate) fn decode_row(bytes: &[u8]) -> Result<Row, Error> {
    StoredRow::from_bytes(bytes).map(StoredRow::into_row)
}
