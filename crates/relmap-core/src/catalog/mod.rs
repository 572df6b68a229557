//! Schema catalog for relmap.
//!
//! The catalog describes entities, their columns and key strategies, the
//! relations between them, and the scopes applied to their queries. It is
//! assembled once from a [`SchemaBundle`] and is read-only afterwards.

mod attribute;
mod catalog;
mod entity;
mod field;
mod relation;
mod schema;
mod scope;
mod types;

pub use attribute::{VirtualAttribute, VirtualDef};
pub use catalog::Catalog;
pub use entity::{EntityDef, KeyDef, KeyStrategy, LifecycleRules, CREATED_AT, DELETED_AT, UPDATED_AT};
pub use field::{DefaultValue, FieldDef};
pub(crate) use field::generate_uuid;
pub use relation::{MorphKeys, OneOfMany, RelationDef, RelationKind};
pub use schema::SchemaBundle;
pub use scope::{Predicate, ScopeDef, ScopeKind};
pub use types::ScalarType;
