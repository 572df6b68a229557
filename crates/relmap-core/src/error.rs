//! Core error types.

use thiserror::Error;

/// Core mapping-layer errors.
#[derive(Debug, Error)]
pub enum Error {
    /// Entity type is not registered in the catalog.
    #[error("unknown entity: {0}")]
    UnknownEntity(String),

    /// Column is not declared on the entity.
    #[error("unknown column '{column}' on entity '{entity}'")]
    UnknownColumn { entity: String, column: String },

    /// Relation is not declared on the entity.
    #[error("unknown relation '{relation}' on entity '{entity}'")]
    UnknownRelation { entity: String, relation: String },

    /// Named scope is not declared on the entity.
    #[error("unknown scope '{scope}' on entity '{entity}'")]
    UnknownScope { entity: String, scope: String },

    /// Manual-key record persisted without a key.
    #[error("entity '{0}' requires a primary key before it can be persisted")]
    MissingKey(String),

    /// Attempt to change the primary key of a persisted record.
    #[error("primary key of persisted '{0}' record cannot change")]
    ImmutableKey(String),

    /// Value does not fit the declared column type.
    #[error("column '{column}' on '{entity}' expects {expected}, got {actual}")]
    TypeMismatch {
        entity: String,
        column: String,
        expected: String,
        actual: &'static str,
    },

    /// Datastore constraint violation.
    #[error("constraint violation: {0}")]
    ConstraintViolation(#[from] ConstraintError),

    /// The pivot pair is already attached.
    #[error("'{related_key}' is already attached to '{owner_key}' through '{pivot}'")]
    DuplicatePivot {
        pivot: String,
        owner_key: String,
        related_key: String,
    },

    /// Relation definition or usage is invalid.
    #[error("invalid relation: {0}")]
    InvalidRelation(String),

    /// Operation needs a persisted record.
    #[error("'{0}' record has not been persisted")]
    NotPersisted(String),

    /// Record not found where one was required.
    #[error("no '{0}' record matches the query")]
    NotFound(String),

    /// Storage layer error.
    #[error("storage error: {0}")]
    Storage(#[from] sled::Error),

    /// Protocol error.
    #[error("protocol error: {0}")]
    Protocol(#[from] relmap_proto::Error),

    /// Attribute cast (de)serialization error.
    #[error("cast error: {0}")]
    Cast(#[from] serde_json::Error),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Deserialization error.
    #[error("deserialization error: {0}")]
    Deserialization(String),

    /// Transaction error.
    #[error("transaction error: {0}")]
    Transaction(String),

    /// Invalid data format.
    #[error("invalid data: {0}")]
    InvalidData(String),
}

/// Constraint violation details.
#[derive(Debug, Clone, Error)]
pub enum ConstraintError {
    /// A row with the same primary key already exists.
    #[error("duplicate primary key {key} in '{entity}'")]
    DuplicateKey { entity: String, key: String },

    /// A required column was left null.
    #[error("column '{column}' of '{entity}' cannot be null")]
    NotNull { entity: String, column: String },
}
