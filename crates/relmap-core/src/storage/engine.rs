//! Storage engine implementation.

use super::key::{row_key, table_prefix};
use super::row::{decode_row, encode_row};
use super::{Row, Statement, StatementResult, StorageConfig, Transaction};
use crate::error::{ConstraintError, Error};
use relmap_proto::Value;
use sled::{Db, Tree};
use tracing::trace;

/// Tree name for table rows.
const DATA_TREE: &str = "data";

/// Tree name for metadata (sequences).
const META_TREE: &str = "meta";

/// Prefix for auto-increment counters in the meta tree.
const SEQUENCE_PREFIX: &[u8] = b"seq:";

/// The row store wrapping sled.
pub struct StorageEngine {
    /// The underlying sled database.
    db: Db,

    /// Tree for table rows.
    data_tree: Tree,

    /// Tree for metadata.
    meta_tree: Tree,
}

impl StorageEngine {
    /// Open or create a storage engine with the given configuration.
    pub fn open(config: StorageConfig) -> Result<Self, Error> {
        let db = config.to_sled_config().open()?;
        let data_tree = db.open_tree(DATA_TREE)?;
        let meta_tree = db.open_tree(META_TREE)?;

        Ok(Self {
            db,
            data_tree,
            meta_tree,
        })
    }

    /// Execute a single statement outside of any transaction.
    pub fn execute(&self, statement: Statement) -> Result<StatementResult, Error> {
        trace!(table = statement.table(), "execute statement");

        match statement {
            Statement::Insert { table, key, row } => {
                let key_bytes = row_key(&table, &key)?;
                let value_bytes = encode_row(&row)?;
                let swapped = self.data_tree.compare_and_swap(
                    key_bytes,
                    None as Option<&[u8]>,
                    Some(value_bytes),
                )?;
                if swapped.is_err() {
                    return Err(duplicate_key(&table, &key));
                }
                Ok(StatementResult::Affected(1))
            }
            Statement::Update { table, key, row } => {
                let key_bytes = row_key(&table, &key)?;
                if !self.data_tree.contains_key(&key_bytes)? {
                    return Ok(StatementResult::Affected(0));
                }
                self.data_tree.insert(key_bytes, encode_row(&row)?)?;
                Ok(StatementResult::Affected(1))
            }
            Statement::Delete { table, key } => {
                let key_bytes = row_key(&table, &key)?;
                let removed = self.data_tree.remove(key_bytes)?;
                Ok(StatementResult::Affected(u64::from(removed.is_some())))
            }
            Statement::Get { table, key } => {
                let rows = self.get(&table, &key)?.into_iter().collect();
                Ok(StatementResult::Rows(rows))
            }
            Statement::Scan { table } => Ok(StatementResult::Rows(self.scan(&table)?)),
        }
    }

    /// Get one row by primary key.
    pub fn get(&self, table: &str, key: &Value) -> Result<Option<Row>, Error> {
        match self.data_tree.get(row_key(table, key)?)? {
            Some(bytes) => Ok(Some(decode_row(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Get every row of a table in key order.
    pub fn scan(&self, table: &str) -> Result<Vec<Row>, Error> {
        self.data_tree
            .scan_prefix(table_prefix(table))
            .map(|result| {
                let (_, bytes) = result?;
                decode_row(&bytes)
            })
            .collect()
    }

    /// Begin a new transaction.
    pub fn transaction(&self) -> Transaction<'_> {
        Transaction::new(self)
    }

    /// Draw the next auto-increment value for a table.
    ///
    /// Values start at 1 and are never reused, even if the inserting
    /// transaction rolls back.
    pub fn next_sequence(&self, table: &str) -> Result<i64, Error> {
        let mut key = Vec::with_capacity(SEQUENCE_PREFIX.len() + table.len());
        key.extend_from_slice(SEQUENCE_PREFIX);
        key.extend_from_slice(table.as_bytes());

        let next = self.meta_tree.update_and_fetch(key, |current| {
            let value = current.map(decode_counter).unwrap_or(0) + 1;
            Some(value.to_be_bytes().to_vec())
        })?;

        next.map(|bytes| decode_counter(&bytes) as i64)
            .ok_or_else(|| Error::InvalidData(format!("sequence for '{}' vanished", table)))
    }

    /// Flush all pending writes to disk.
    pub fn flush(&self) -> Result<(), Error> {
        self.db.flush()?;
        Ok(())
    }

    /// Check if the database was recovered from a previous run.
    pub fn was_recovered(&self) -> bool {
        self.db.was_recovered()
    }

    /// Get access to the underlying data tree (for transactions).
    pub(crate) fn data_tree(&self) -> &Tree {
        &self.data_tree
    }
}

fn decode_counter(bytes: &[u8]) -> u64 {
    let mut buf = [0u8; 8];
    if bytes.len() == 8 {
        buf.copy_from_slice(bytes);
    }
    u64::from_be_bytes(buf)
}

/// Build the duplicate-key constraint error for a row.
pub(crate) fn duplicate_key(table: &str, key: &Value) -> Error {
    Error::ConstraintViolation(ConstraintError::DuplicateKey {
        entity: table.to_string(),
        key: key.to_string(),
    })
}
