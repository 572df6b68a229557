//! relmap protocol types.
//!
//! This crate defines the runtime values and predicate expressions that flow
//! between the catalog, the query engine, and the relationship resolver.

pub mod error;
pub mod filter;
pub mod value;

pub use error::Error;
pub use filter::{FilterExpr, Operator, OrderDirection, OrderSpec};
pub use value::Value;
