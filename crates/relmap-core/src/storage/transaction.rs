//! Transaction support for atomic multi-statement writes.

use super::engine::duplicate_key;
use super::key::row_key;
use super::row::encode_row;
use super::{Statement, StorageEngine};
use crate::error::Error;
use relmap_proto::Value;
use sled::transaction::{ConflictableTransactionError, TransactionError};
use tracing::{debug, warn};

/// A write statement with its key and row already encoded.
#[derive(Debug)]
enum PreparedOp {
    Insert {
        table: String,
        key: Value,
        key_bytes: Vec<u8>,
        value_bytes: Vec<u8>,
    },
    Update {
        key_bytes: Vec<u8>,
        value_bytes: Vec<u8>,
    },
    Delete {
        key_bytes: Vec<u8>,
    },
}

/// A unit of work over the row store.
///
/// Write statements are queued and applied atomically on commit: either every
/// statement takes effect or none does.
pub struct Transaction<'a> {
    engine: &'a StorageEngine,
    ops: Vec<Statement>,
}

impl<'a> Transaction<'a> {
    /// Create a new transaction.
    pub(crate) fn new(engine: &'a StorageEngine) -> Self {
        Self {
            engine,
            ops: Vec::new(),
        }
    }

    /// Queue a write statement.
    pub fn execute(&mut self, statement: Statement) -> Result<&mut Self, Error> {
        if !statement.is_write() {
            return Err(Error::Transaction(format!(
                "read statement on '{}' cannot be queued in a transaction",
                statement.table()
            )));
        }
        self.ops.push(statement);
        Ok(self)
    }

    /// Get the pending statements.
    pub fn operations(&self) -> &[Statement] {
        &self.ops
    }

    /// Get the number of pending statements.
    pub fn operation_count(&self) -> usize {
        self.ops.len()
    }

    /// Commit the transaction atomically.
    ///
    /// Returns the total number of affected rows.
    pub fn commit(self) -> Result<u64, Error> {
        if self.ops.is_empty() {
            return Ok(0);
        }

        let prepared = self.prepare()?;
        let count = prepared.len();

        let result: Result<u64, TransactionError<Error>> =
            self.engine.data_tree().transaction(|tx| {
                let mut affected = 0u64;
                for op in &prepared {
                    match op {
                        PreparedOp::Insert {
                            table,
                            key,
                            key_bytes,
                            value_bytes,
                        } => {
                            if tx.get(key_bytes)?.is_some() {
                                return Err(ConflictableTransactionError::Abort(duplicate_key(
                                    table, key,
                                )));
                            }
                            tx.insert(key_bytes.as_slice(), value_bytes.as_slice())?;
                            affected += 1;
                        }
                        PreparedOp::Update {
                            key_bytes,
                            value_bytes,
                        } => {
                            if tx.get(key_bytes)?.is_some() {
                                tx.insert(key_bytes.as_slice(), value_bytes.as_slice())?;
                                affected += 1;
                            }
                        }
                        PreparedOp::Delete { key_bytes } => {
                            if tx.remove(key_bytes.as_slice())?.is_some() {
                                affected += 1;
                            }
                        }
                    }
                }
                Ok(affected)
            });

        match result {
            Ok(affected) => {
                debug!(statements = count, affected, "transaction committed");
                Ok(affected)
            }
            Err(TransactionError::Abort(e)) => {
                warn!(statements = count, error = %e, "transaction aborted");
                Err(e)
            }
            Err(TransactionError::Storage(e)) => {
                warn!(statements = count, error = %e, "transaction failed in storage");
                Err(Error::Storage(e))
            }
        }
    }

    /// Rollback the transaction (discard all pending statements).
    pub fn rollback(self) {
        if !self.ops.is_empty() {
            debug!(statements = self.ops.len(), "transaction rolled back");
        }
    }

    fn prepare(&self) -> Result<Vec<PreparedOp>, Error> {
        self.ops
            .iter()
            .map(|statement| match statement {
                Statement::Insert { table, key, row } => Ok(PreparedOp::Insert {
                    table: table.clone(),
                    key: key.clone(),
                    key_bytes: row_key(table, key)?,
                    value_bytes: encode_row(row)?,
                }),
                Statement::Update { table, key, row } => Ok(PreparedOp::Update {
                    key_bytes: row_key(table, key)?,
                    value_bytes: encode_row(row)?,
                }),
                Statement::Delete { table, key } => Ok(PreparedOp::Delete {
                    key_bytes: row_key(table, key)?,
                }),
                Statement::Get { table, .. } | Statement::Scan { table } => Err(
                    Error::Transaction(format!("read statement on '{}' in write queue", table)),
                ),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ConstraintError;
    use crate::storage::{Row, StatementResult, StorageConfig};

    fn test_engine() -> StorageEngine {
        StorageEngine::open(StorageConfig::temporary()).unwrap()
    }

    fn wallet(id: i64, amount: i64) -> Statement {
        let mut row = Row::new();
        row.insert("id".into(), Value::Int64(id));
        row.insert("amount".into(), Value::Int64(amount));
        Statement::Insert {
            table: "Wallet".into(),
            key: Value::Int64(id),
            row,
        }
    }

    #[test]
    fn test_transaction_commit() {
        let engine = test_engine();

        let mut tx = engine.transaction();
        tx.execute(wallet(1, 10)).unwrap();
        tx.execute(wallet(2, 20)).unwrap();
        assert_eq!(tx.operation_count(), 2);
        assert_eq!(tx.commit().unwrap(), 2);

        assert_eq!(engine.scan("Wallet").unwrap().len(), 2);
    }

    #[test]
    fn test_transaction_rollback() {
        let engine = test_engine();

        let mut tx = engine.transaction();
        tx.execute(wallet(1, 10)).unwrap();
        tx.rollback();

        assert!(engine.scan("Wallet").unwrap().is_empty());
    }

    #[test]
    fn test_duplicate_aborts_whole_transaction() {
        let engine = test_engine();
        engine.execute(wallet(2, 20)).unwrap();

        let mut tx = engine.transaction();
        tx.execute(wallet(1, 10)).unwrap();
        tx.execute(wallet(2, 99)).unwrap();
        let err = tx.commit().unwrap_err();

        assert!(matches!(
            err,
            Error::ConstraintViolation(ConstraintError::DuplicateKey { .. })
        ));
        // Wallet 1 was not written and wallet 2 kept its amount.
        let rows = engine.scan("Wallet").unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get("amount"), Some(&Value::Int64(20)));
    }

    #[test]
    fn test_duplicate_within_same_transaction() {
        let engine = test_engine();

        let mut tx = engine.transaction();
        tx.execute(wallet(1, 10)).unwrap();
        tx.execute(wallet(1, 10)).unwrap();

        assert!(tx.commit().is_err());
        assert!(engine.scan("Wallet").unwrap().is_empty());
    }

    #[test]
    fn test_update_and_delete_counts() {
        let engine = test_engine();
        engine.execute(wallet(1, 10)).unwrap();

        let mut row = Row::new();
        row.insert("id".into(), Value::Int64(1));
        row.insert("amount".into(), Value::Int64(15));

        let mut tx = engine.transaction();
        tx.execute(Statement::Update {
            table: "Wallet".into(),
            key: Value::Int64(1),
            row,
        })
        .unwrap();
        tx.execute(Statement::Delete {
            table: "Wallet".into(),
            key: Value::Int64(7),
        })
        .unwrap();
        assert_eq!(tx.commit().unwrap(), 1);

        let rows = engine
            .execute(Statement::Get {
                table: "Wallet".into(),
                key: Value::Int64(1),
            })
            .unwrap();
        assert!(matches!(
            rows,
            StatementResult::Rows(rows) if rows[0].get("amount") == Some(&Value::Int64(15))
        ));
    }

    #[test]
    fn test_reads_rejected() {
        let engine = test_engine();
        let mut tx = engine.transaction();

        assert!(matches!(
            tx.execute(Statement::Scan {
                table: "Wallet".into()
            }),
            Err(Error::Transaction(_))
        ));
    }

    #[test]
    fn test_empty_transaction() {
        let engine = test_engine();
        assert_eq!(engine.transaction().commit().unwrap(), 0);
    }
}
