//! Protocol error types.

use thiserror::Error;

/// Errors raised while building protocol values and predicates.
#[derive(Debug, Error)]
pub enum Error {
    /// Comparison operator could not be parsed.
    #[error("unknown comparison operator: {0}")]
    UnknownOperator(String),
}
