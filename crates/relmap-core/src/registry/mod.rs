//! Entity registry: creating, hydrating and mutating records.
//!
//! Every assignment goes through the catalog: unknown columns are rejected,
//! values are coerced to the declared column type, virtual attributes are
//! decomposed into the columns that back them, and a persisted record's
//! primary key cannot change.

mod cast;
mod record;

pub use record::{Record, RecordState};

use crate::catalog::{Catalog, EntityDef, DELETED_AT};
use crate::error::Error;
use crate::storage::Row;
use relmap_proto::Value;
use serde::Serialize;

/// Catalog-aware record factory and mutator.
#[derive(Clone, Copy)]
pub struct Registry<'a> {
    catalog: &'a Catalog,
}

impl<'a> Registry<'a> {
    /// Create a registry over a catalog.
    pub fn new(catalog: &'a Catalog) -> Self {
        Self { catalog }
    }

    /// Create a new record with declared defaults applied.
    pub fn instantiate(&self, entity: &str) -> Result<Record, Error> {
        let def = self.catalog.describe(entity)?;
        let mut record = Record::new(&def.name, RecordState::New);
        for field in &def.fields {
            if let Some(default) = &field.default {
                record.set_raw(&field.name, default.evaluate(field.scalar));
            }
        }
        Ok(record)
    }

    /// Create a new record with defaults, then assign `attrs` over them.
    pub fn instantiate_with<K, V>(
        &self,
        entity: &str,
        attrs: impl IntoIterator<Item = (K, V)>,
    ) -> Result<Record, Error>
    where
        K: AsRef<str>,
        V: Into<Value>,
    {
        let mut record = self.instantiate(entity)?;
        self.fill(&mut record, attrs)?;
        Ok(record)
    }

    /// Build a persisted record from a stored row.
    pub fn hydrate(&self, entity: &str, row: Row) -> Result<Record, Error> {
        let def = self.catalog.describe(entity)?;
        let state = if def.has_soft_delete() && !row.get(DELETED_AT).map_or(true, Value::is_null)
        {
            RecordState::Trashed
        } else {
            RecordState::Persisted
        };
        Ok(Record::from_row(&def.name, row, state))
    }

    /// Assign a column or virtual attribute.
    pub fn set_attribute(
        &self,
        record: &mut Record,
        column: &str,
        value: impl Into<Value>,
    ) -> Result<(), Error> {
        let def = self.catalog.describe(record.entity())?;
        let value = value.into();

        if let Some(virtual_def) = def.get_virtual(column) {
            for (column, value) in virtual_def.attribute.set(value)? {
                set_column(def, record, &column, value)?;
            }
            return Ok(());
        }

        set_column(def, record, column, value)
    }

    /// Read a column or virtual attribute.
    pub fn get_attribute(&self, record: &Record, column: &str) -> Result<Value, Error> {
        let def = self.catalog.describe(record.entity())?;

        if let Some(virtual_def) = def.get_virtual(column) {
            return virtual_def.attribute.get(record);
        }
        if !def.has_field(column) {
            return Err(unknown_column(def, column));
        }
        Ok(record.value(column))
    }

    /// Assign several attributes, stopping at the first invalid one.
    pub fn fill<K, V>(
        &self,
        record: &mut Record,
        attrs: impl IntoIterator<Item = (K, V)>,
    ) -> Result<(), Error>
    where
        K: AsRef<str>,
        V: Into<Value>,
    {
        for (column, value) in attrs {
            self.set_attribute(record, column.as_ref(), value)?;
        }
        Ok(())
    }

    /// Serialize a value into a JSON-cast column.
    pub fn set_cast<T: Serialize + ?Sized>(
        &self,
        record: &mut Record,
        column: &str,
        value: &T,
    ) -> Result<(), Error> {
        let def = self.catalog.describe(record.entity())?;
        set_column(def, record, column, cast::encode(value)?)
    }

    /// Primary key of a record, `None` while unassigned.
    pub fn primary_key_of(&self, record: &Record) -> Result<Option<Value>, Error> {
        let def = self.catalog.describe(record.entity())?;
        Ok(record
            .get(&def.key.field)
            .filter(|v| !v.is_null())
            .cloned())
    }
}

fn set_column(
    def: &EntityDef,
    record: &mut Record,
    column: &str,
    value: Value,
) -> Result<(), Error> {
    let field = def
        .get_field(column)
        .ok_or_else(|| unknown_column(def, column))?;

    let actual = value.kind();
    let value = field
        .scalar
        .coerce(value)
        .ok_or_else(|| Error::TypeMismatch {
            entity: def.name.clone(),
            column: column.to_string(),
            expected: field.scalar.name().to_string(),
            actual,
        })?;

    if column == def.key.field && record.exists() && record.get(column) != Some(&value) {
        return Err(Error::ImmutableKey(def.name.clone()));
    }

    record.set_raw(column, value);
    Ok(())
}

fn unknown_column(def: &EntityDef, column: &str) -> Error {
    Error::UnknownColumn {
        entity: def.name.clone(),
        column: column.to_string(),
    }
}
