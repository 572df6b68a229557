//! Computed (virtual) attributes.

use crate::error::Error;
use crate::registry::Record;
use relmap_proto::Value;
use std::fmt;
use std::sync::Arc;

/// An attribute computed from, and decomposed into, real columns.
///
/// `get` runs on read; `set` maps an assigned value onto the columns that
/// store it. Implementations must only return declared columns from `set`.
pub trait VirtualAttribute: Send + Sync {
    /// Compute the attribute from the record's stored columns.
    fn get(&self, record: &Record) -> Result<Value, Error>;

    /// Split an assigned value into column assignments.
    fn set(&self, value: Value) -> Result<Vec<(String, Value)>, Error>;
}

/// A named virtual attribute registered on an entity.
#[derive(Clone)]
pub struct VirtualDef {
    /// Attribute name.
    pub name: String,
    /// Accessor/mutator implementation.
    pub attribute: Arc<dyn VirtualAttribute>,
}

impl fmt::Debug for VirtualDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VirtualDef")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}
