//! Query engine.
//!
//! [`Query`] collects filters, ordering, paging and scope options for one
//! entity, then runs them against the row store. Global scopes and the
//! soft-delete tombstone filter are injected at execution time unless the
//! query opts out.

mod builder;
mod filter;

pub use builder::Query;
pub use filter::FilterEvaluator;

pub(crate) use builder::PivotAttachment;
