//! Statements understood by the storage engine.

use super::Row;
use relmap_proto::Value;

/// A single datastore statement.
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    /// Insert a new row; fails if the key is taken.
    Insert {
        /// Table name.
        table: String,
        /// Primary key value.
        key: Value,
        /// Full row, key column included.
        row: Row,
    },
    /// Replace an existing row; affects nothing if the key is absent.
    Update {
        /// Table name.
        table: String,
        /// Primary key value.
        key: Value,
        /// Full replacement row.
        row: Row,
    },
    /// Remove a row.
    Delete {
        /// Table name.
        table: String,
        /// Primary key value.
        key: Value,
    },
    /// Fetch one row by key.
    Get {
        /// Table name.
        table: String,
        /// Primary key value.
        key: Value,
    },
    /// Fetch every row of a table in key order.
    Scan {
        /// Table name.
        table: String,
    },
}

impl Statement {
    /// Table the statement targets.
    pub fn table(&self) -> &str {
        match self {
            Statement::Insert { table, .. }
            | Statement::Update { table, .. }
            | Statement::Delete { table, .. }
            | Statement::Get { table, .. }
            | Statement::Scan { table } => table,
        }
    }

    /// Check if the statement modifies data.
    pub fn is_write(&self) -> bool {
        matches!(
            self,
            Statement::Insert { .. } | Statement::Update { .. } | Statement::Delete { .. }
        )
    }
}

/// Result of executing a statement.
#[derive(Debug, Clone, PartialEq)]
pub enum StatementResult {
    /// Rows returned by a read.
    Rows(Vec<Row>),
    /// Number of rows a write affected.
    Affected(u64),
}

impl StatementResult {
    /// Take the returned rows (empty for writes).
    pub fn into_rows(self) -> Vec<Row> {
        match self {
            StatementResult::Rows(rows) => rows,
            StatementResult::Affected(_) => Vec::new(),
        }
    }

    /// Number of affected rows (row count for reads).
    pub fn affected(&self) -> u64 {
        match self {
            StatementResult::Rows(rows) => rows.len() as u64,
            StatementResult::Affected(n) => *n,
        }
    }
}
