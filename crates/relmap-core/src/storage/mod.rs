//! Storage layer for relmap.
//!
//! A sled-backed row store. Each table row lives under a single key made of
//! the table name and the order-preserving encoding of its primary key, so a
//! prefix scan returns a table's rows in key order.

mod config;
mod engine;
mod row;
mod statement;
mod transaction;

pub mod key;

pub use config::StorageConfig;
pub use engine::StorageEngine;
pub use row::{Row, StoredRow};
pub use statement::{Statement, StatementResult};
pub use transaction::Transaction;
