//! Relationship resolution.
//!
//! Every relation kind is reduced to a [`Query`](crate::Query) on the related
//! entity, so resolution honors the related entity's global scopes and soft
//! delete exactly like a direct query would.

mod pivot;
mod resolver;

pub use resolver::{Resolved, Resolver};
