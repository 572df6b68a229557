//! Field definitions for entities.

use super::types::ScalarType;
use crate::storage::key::current_timestamp;
use relmap_proto::Value;

/// A column definition within an entity.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDef {
    /// Column name.
    pub name: String,
    /// Column data type.
    pub scalar: ScalarType,
    /// Whether null is an acceptable persisted value.
    pub nullable: bool,
    /// Default applied when a record is instantiated without this column.
    pub default: Option<DefaultValue>,
}

/// Default value for a field.
#[derive(Debug, Clone, PartialEq)]
pub enum DefaultValue {
    /// Null value.
    Null,
    /// Boolean value.
    Bool(bool),
    /// Integer value.
    Int(i64),
    /// Floating point value.
    Float(f64),
    /// String value.
    String(String),
    /// Current timestamp (evaluated at instantiation).
    CurrentTimestamp,
    /// Freshly generated UUID.
    AutoUuid,
}

impl DefaultValue {
    /// Produce a concrete value for a column of the given type.
    pub fn evaluate(&self, scalar: ScalarType) -> Value {
        let value = match self {
            DefaultValue::Null => Value::Null,
            DefaultValue::Bool(b) => Value::Bool(*b),
            DefaultValue::Int(i) => Value::Int64(*i),
            DefaultValue::Float(f) => Value::Float64(*f),
            DefaultValue::String(s) => Value::String(s.clone()),
            DefaultValue::CurrentTimestamp => Value::Timestamp(current_timestamp()),
            DefaultValue::AutoUuid => generate_uuid(scalar),
        };
        scalar.coerce(value.clone()).unwrap_or(value)
    }
}

/// Generate a v4 UUID in the representation a column of `scalar` stores.
pub(crate) fn generate_uuid(scalar: ScalarType) -> Value {
    let id = uuid::Uuid::new_v4();
    match scalar {
        ScalarType::Uuid => Value::Uuid(*id.as_bytes()),
        _ => Value::String(id.hyphenated().to_string()),
    }
}

impl FieldDef {
    /// Create a new required field.
    pub fn new(name: impl Into<String>, scalar: ScalarType) -> Self {
        Self {
            name: name.into(),
            scalar,
            nullable: false,
            default: None,
        }
    }

    /// Create a nullable field.
    pub fn optional(name: impl Into<String>, scalar: ScalarType) -> Self {
        Self {
            name: name.into(),
            scalar,
            nullable: true,
            default: None,
        }
    }

    /// Set the default value.
    pub fn with_default(mut self, default: DefaultValue) -> Self {
        self.default = Some(default);
        self
    }

    /// Check if this field has a default value.
    pub fn has_default(&self) -> bool {
        self.default.is_some()
    }
}
