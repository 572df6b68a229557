//! Core type definitions for the catalog.

use relmap_proto::Value;

/// Scalar data types a column can declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarType {
    /// Boolean value.
    Bool,
    /// 32-bit signed integer.
    Int32,
    /// 64-bit signed integer.
    Int64,
    /// 64-bit floating point.
    Float64,
    /// UTF-8 string.
    String,
    /// Timestamp (microseconds since Unix epoch).
    Timestamp,
    /// UUID (128-bit identifier).
    Uuid,
    /// JSON document holding a cast attribute.
    Json,
}

impl ScalarType {
    /// Check if this type is numeric.
    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            ScalarType::Int32 | ScalarType::Int64 | ScalarType::Float64
        )
    }

    /// Check if this type is an integer type.
    pub fn is_integer(&self) -> bool {
        matches!(self, ScalarType::Int32 | ScalarType::Int64)
    }

    /// Convert a value to this type's canonical variant.
    ///
    /// Integer widths are converted where lossless and integers widen to
    /// floats. Null passes through; nullability is checked at persist time.
    /// Returns `None` when the value cannot represent this type.
    pub fn coerce(&self, value: Value) -> Option<Value> {
        match (self, value) {
            (_, Value::Null) => Some(Value::Null),
            (ScalarType::Bool, v @ Value::Bool(_)) => Some(v),
            (ScalarType::Int32, v @ Value::Int32(_)) => Some(v),
            (ScalarType::Int32, Value::Int64(i)) => i32::try_from(i).ok().map(Value::Int32),
            (ScalarType::Int64, v @ Value::Int64(_)) => Some(v),
            (ScalarType::Int64, Value::Int32(i)) => Some(Value::Int64(i as i64)),
            (ScalarType::Float64, v @ Value::Float64(_)) => Some(v),
            (ScalarType::Float64, Value::Int32(i)) => Some(Value::Float64(i as f64)),
            (ScalarType::Float64, Value::Int64(i)) => Some(Value::Float64(i as f64)),
            (ScalarType::String, v @ Value::String(_)) => Some(v),
            (ScalarType::Timestamp, v @ Value::Timestamp(_)) => Some(v),
            (ScalarType::Uuid, v @ Value::Uuid(_)) => Some(v),
            (ScalarType::Uuid, Value::String(s)) => uuid::Uuid::parse_str(&s)
                .ok()
                .map(|u| Value::Uuid(*u.as_bytes())),
            (ScalarType::Json, v @ Value::Json(_)) => Some(v),
            _ => None,
        }
    }

    /// Convert a key value for comparison against a column of this type.
    ///
    /// Like [`coerce`](Self::coerce), but also renders integers and UUIDs as
    /// text for string columns and parses text for integer columns, as needed
    /// by polymorphic id columns shared by entities with different key types.
    /// Values that cannot be converted are returned unchanged.
    pub fn convert_key(&self, value: Value) -> Value {
        if let Some(converted) = self.coerce(value.clone()) {
            return converted;
        }
        match (self, value) {
            (ScalarType::String, v @ (Value::Int32(_) | Value::Int64(_) | Value::Uuid(_))) => {
                Value::String(v.to_string())
            }
            (ScalarType::Int64, Value::String(s)) => match s.parse() {
                Ok(i) => Value::Int64(i),
                Err(_) => Value::String(s),
            },
            (ScalarType::Int32, Value::String(s)) => match s.parse() {
                Ok(i) => Value::Int32(i),
                Err(_) => Value::String(s),
            },
            (_, v) => v,
        }
    }

    /// Human-readable name used in errors.
    pub fn name(&self) -> &'static str {
        match self {
            ScalarType::Bool => "bool",
            ScalarType::Int32 => "int32",
            ScalarType::Int64 => "int64",
            ScalarType::Float64 => "float64",
            ScalarType::String => "string",
            ScalarType::Timestamp => "timestamp",
            ScalarType::Uuid => "uuid",
            ScalarType::Json => "json",
        }
    }
}
