//! relmap core - schema catalog, entity registry, query engine and
//! relationship resolution over an embedded datastore.
//!
//! The entry point is [`Database`], opened with a [`StorageConfig`] and a
//! frozen [`Catalog`]. Records are created through the [`Registry`], read and
//! bulk-mutated through [`Query`], and related records are reached through the
//! [`Resolver`].

pub mod catalog;
pub mod database;
pub mod error;
pub mod query;
pub mod registry;
pub mod relation;
pub mod storage;

pub use catalog::{
    Catalog, DefaultValue, EntityDef, FieldDef, KeyDef, KeyStrategy, LifecycleRules, MorphKeys,
    OneOfMany, Predicate, RelationDef, RelationKind, ScalarType, SchemaBundle, ScopeDef,
    ScopeKind, VirtualAttribute,
};
pub use database::Database;
pub use error::{ConstraintError, Error};
pub use query::{FilterEvaluator, Query};
pub use registry::{Record, RecordState, Registry};
pub use relation::{Resolved, Resolver};
pub use storage::{Row, Statement, StatementResult, StorageConfig, StorageEngine, Transaction};

/// Re-export protocol types.
pub use relmap_proto as proto;
pub use relmap_proto::{FilterExpr, Operator, OrderDirection, OrderSpec, Value};
