//! In-memory records.

use super::cast;
use crate::error::Error;
use crate::storage::Row;
use relmap_proto::Value;
use serde::de::DeserializeOwned;
use std::collections::BTreeSet;

/// Lifecycle position of a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordState {
    /// Instantiated, never persisted.
    New,
    /// Backed by a live row.
    Persisted,
    /// Row physically removed.
    Deleted,
    /// Row kept with a `deleted_at` tombstone.
    Trashed,
}

/// An instance of an entity: a column map with dirty tracking.
///
/// Records are created and mutated through the [`Registry`](super::Registry),
/// which validates column names and types against the catalog.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    entity: String,
    attributes: Row,
    original: Row,
    dirty: BTreeSet<String>,
    state: RecordState,
    pivot: Option<Box<Record>>,
}

impl Record {
    pub(crate) fn new(entity: impl Into<String>, state: RecordState) -> Self {
        Self {
            entity: entity.into(),
            attributes: Row::new(),
            original: Row::new(),
            dirty: BTreeSet::new(),
            state,
            pivot: None,
        }
    }

    pub(crate) fn from_row(entity: impl Into<String>, row: Row, state: RecordState) -> Self {
        Self {
            entity: entity.into(),
            original: row.clone(),
            attributes: row,
            dirty: BTreeSet::new(),
            state,
            pivot: None,
        }
    }

    /// Entity this record belongs to.
    pub fn entity(&self) -> &str {
        &self.entity
    }

    /// Stored value of a column, if set.
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.attributes.get(column)
    }

    /// Stored value of a column, `Null` if unset.
    pub fn value(&self, column: &str) -> Value {
        self.attributes.get(column).cloned().unwrap_or(Value::Null)
    }

    /// All stored columns.
    pub fn attributes(&self) -> &Row {
        &self.attributes
    }

    /// Values as last loaded from or written to the datastore.
    pub fn original(&self) -> &Row {
        &self.original
    }

    /// Check if a column changed since the last sync.
    pub fn is_dirty(&self, column: &str) -> bool {
        self.dirty.contains(column)
    }

    /// Columns changed since the last sync.
    pub fn dirty(&self) -> impl Iterator<Item = &str> {
        self.dirty.iter().map(String::as_str)
    }

    /// Check if any column changed since the last sync.
    pub fn has_changes(&self) -> bool {
        !self.dirty.is_empty()
    }

    /// Current lifecycle state.
    pub fn state(&self) -> RecordState {
        self.state
    }

    /// Whether a row backs this record (live or tombstoned).
    pub fn exists(&self) -> bool {
        matches!(self.state, RecordState::Persisted | RecordState::Trashed)
    }

    /// Whether the record is soft-deleted.
    pub fn is_trashed(&self) -> bool {
        self.state == RecordState::Trashed
    }

    /// Pivot row that linked this record when loaded through a many-to-many relation.
    pub fn pivot(&self) -> Option<&Record> {
        self.pivot.as_deref()
    }

    /// Decode a JSON-cast column into a typed value.
    ///
    /// Returns `None` when the column is unset or null.
    pub fn get_cast<T: DeserializeOwned>(&self, column: &str) -> Result<Option<T>, Error> {
        cast::decode(&self.entity, column, self.get(column))
    }

    /// Assign a column without validation, tracking dirtiness against the
    /// last synced value.
    pub(crate) fn set_raw(&mut self, column: &str, value: Value) {
        let unchanged_from_original = match self.original.get(column) {
            Some(original) => *original == value,
            None => false,
        };
        if unchanged_from_original {
            self.dirty.remove(column);
        } else if self.attributes.get(column) != Some(&value) {
            self.dirty.insert(column.to_string());
        }
        self.attributes.insert(column.to_string(), value);
    }

    /// Mark the current attributes as matching the datastore.
    pub(crate) fn sync_original(&mut self) {
        self.original = self.attributes.clone();
        self.dirty.clear();
    }

    pub(crate) fn set_state(&mut self, state: RecordState) {
        self.state = state;
    }

    pub(crate) fn with_pivot(mut self, pivot: Record) -> Self {
        self.pivot = Some(Box::new(pivot));
        self
    }
}
