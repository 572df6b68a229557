//! Row key encoding.
//!
//! Key format: `[table name][0x00][tag][payload]`
//!
//! Integers are stored big-endian with the sign bit flipped so lexicographic
//! ordering matches numeric ordering; strings are stored as raw UTF-8 bytes.

use crate::error::Error;
use relmap_proto::Value;

const TAG_INT: u8 = 1;
const TAG_STRING: u8 = 2;
const TAG_UUID: u8 = 3;

/// Prefix shared by every row of a table.
pub fn table_prefix(table: &str) -> Vec<u8> {
    let mut prefix = Vec::with_capacity(table.len() + 1);
    prefix.extend_from_slice(table.as_bytes());
    prefix.push(0); // Null separator
    prefix
}

/// Encode the storage key of a row.
pub fn row_key(table: &str, key: &Value) -> Result<Vec<u8>, Error> {
    let mut buf = table_prefix(table);
    match key {
        Value::Int32(v) => encode_int(&mut buf, i64::from(*v)),
        Value::Int64(v) => encode_int(&mut buf, *v),
        Value::String(s) => {
            buf.push(TAG_STRING);
            buf.extend_from_slice(s.as_bytes());
        }
        Value::Uuid(bytes) => {
            buf.push(TAG_UUID);
            buf.extend_from_slice(bytes);
        }
        other => {
            return Err(Error::InvalidData(format!(
                "{} value cannot be used as a primary key",
                other.kind()
            )))
        }
    }
    Ok(buf)
}

fn encode_int(buf: &mut Vec<u8>, v: i64) {
    buf.push(TAG_INT);
    buf.extend_from_slice(&((v as u64) ^ (1 << 63)).to_be_bytes());
}

/// Get current timestamp in microseconds since Unix epoch.
pub fn current_timestamp() -> i64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_micros() as i64)
        .unwrap_or(0)
}
