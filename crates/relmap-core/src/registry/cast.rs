//! JSON attribute casts.

use crate::error::Error;
use relmap_proto::Value;
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Serialize a typed value into a JSON column value.
pub(crate) fn encode<T: Serialize + ?Sized>(value: &T) -> Result<Value, Error> {
    Ok(Value::Json(serde_json::to_string(value)?))
}

/// Deserialize a JSON column value into a typed value.
pub(crate) fn decode<T: DeserializeOwned>(
    entity: &str,
    column: &str,
    value: Option<&Value>,
) -> Result<Option<T>, Error> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Json(text)) | Some(Value::String(text)) => {
            Ok(Some(serde_json::from_str(text)?))
        }
        Some(other) => Err(Error::TypeMismatch {
            entity: entity.to_string(),
            column: column.to_string(),
            expected: "json".to_string(),
            actual: other.kind(),
        }),
    }
}
