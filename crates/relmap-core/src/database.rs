//! Database facade combining the row store and the catalog.

use crate::catalog::{Catalog, EntityDef, KeyStrategy, CREATED_AT, DELETED_AT, UPDATED_AT};
use crate::error::{ConstraintError, Error};
use crate::query::Query;
use crate::registry::{Record, RecordState, Registry};
use crate::relation::Resolver;
use crate::storage::key::current_timestamp;
use crate::storage::{Row, Statement, StorageConfig, StorageEngine};
use relmap_proto::Value;
use std::sync::Arc;
use tracing::{debug, info, instrument};

/// An open database: row store plus the schema it is mapped with.
pub struct Database {
    storage: StorageEngine,
    catalog: Arc<Catalog>,
}

impl Database {
    /// Open a database with the given storage configuration and catalog.
    pub fn open(config: StorageConfig, catalog: Arc<Catalog>) -> Result<Self, Error> {
        let storage = StorageEngine::open(config)?;
        info!(
            entities = catalog.entity_names().len(),
            recovered = storage.was_recovered(),
            "database opened"
        );
        Ok(Self { storage, catalog })
    }

    /// Get a reference to the catalog.
    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Get a shared handle to the catalog.
    pub fn catalog_arc(&self) -> Arc<Catalog> {
        self.catalog.clone()
    }

    /// Get a reference to the storage engine.
    pub fn storage(&self) -> &StorageEngine {
        &self.storage
    }

    /// Record factory for this database's catalog.
    pub fn registry(&self) -> Registry<'_> {
        Registry::new(&self.catalog)
    }

    /// Relationship resolver for this database.
    pub fn resolver(&self) -> Resolver<'_> {
        Resolver::new(self)
    }

    /// Start a query against an entity.
    pub fn query(&self, entity: &str) -> Result<Query<'_>, Error> {
        Query::new(self, entity)
    }

    /// Create a new, unsaved record with defaults applied.
    pub fn instantiate(&self, entity: &str) -> Result<Record, Error> {
        self.registry().instantiate(entity)
    }

    /// Instantiate a record from `attrs` and insert it.
    pub fn create<K, V>(
        &self,
        entity: &str,
        attrs: impl IntoIterator<Item = (K, V)>,
    ) -> Result<Record, Error>
    where
        K: AsRef<str>,
        V: Into<Value>,
    {
        let mut record = self.registry().instantiate_with(entity, attrs)?;
        self.insert(&mut record)?;
        Ok(record)
    }

    /// Find a record by primary key, honoring scopes and soft delete.
    pub fn find(&self, entity: &str, key: impl Into<Value>) -> Result<Option<Record>, Error> {
        self.query(entity)?.find(key)
    }

    /// Persist a new record.
    ///
    /// Assigns the primary key according to the entity's key strategy and
    /// stamps `created_at` / `updated_at` when timestamps are enabled. On
    /// failure the record is left as it was passed in.
    #[instrument(skip_all, fields(entity = %record.entity()))]
    pub fn insert(&self, record: &mut Record) -> Result<(), Error> {
        let snapshot = record.clone();
        let now = Value::Timestamp(current_timestamp());
        let result = self
            .prepare_insert(record, &now)
            .and_then(|statement| self.storage.execute(statement));
        if let Err(e) = result {
            *record = snapshot;
            return Err(e);
        }

        record.sync_original();
        record.set_state(RecordState::Persisted);
        debug!(entity = %record.entity(), "record inserted");
        Ok(())
    }

    /// Persist several new records atomically.
    ///
    /// Either every record is inserted or none is; on failure the records are
    /// left exactly as they were passed in.
    #[instrument(skip_all, fields(count = records.len()))]
    pub fn insert_many(&self, records: &mut [Record]) -> Result<u64, Error> {
        let snapshot = records.to_vec();
        let now = Value::Timestamp(current_timestamp());

        let result = self.insert_batch(records, &now);
        if result.is_err() {
            records.clone_from_slice(&snapshot);
            return result;
        }

        for record in records.iter_mut() {
            record.sync_original();
            record.set_state(RecordState::Persisted);
        }
        result
    }

    fn insert_batch(&self, records: &mut [Record], now: &Value) -> Result<u64, Error> {
        let mut tx = self.storage.transaction();
        for record in records.iter_mut() {
            tx.execute(self.prepare_insert(record, now)?)?;
        }
        let inserted = tx.commit()?;
        debug!(inserted, "records inserted");
        Ok(inserted)
    }

    /// Insert a new record or write the changes of a persisted one.
    pub fn save(&self, record: &mut Record) -> Result<(), Error> {
        if record.exists() {
            self.update(record).map(|_| ())
        } else {
            self.insert(record)
        }
    }

    /// Write a persisted record's changes.
    ///
    /// Returns `false` when there was nothing to write.
    #[instrument(skip_all, fields(entity = %record.entity()))]
    pub fn update(&self, record: &mut Record) -> Result<bool, Error> {
        let def = self.persisted_def(record)?;
        if !record.has_changes() {
            return Ok(false);
        }

        touch(def, record, &Value::Timestamp(current_timestamp()), false);
        let written = self.write_back(def, record)?;
        debug!(entity = %def.name, written, "record updated");
        Ok(written)
    }

    /// Delete a persisted record.
    ///
    /// Soft-deletable entities get a `deleted_at` tombstone (pending changes
    /// are written with it); others are removed. Returns `false` if the
    /// record was already trashed or its row is gone.
    #[instrument(skip_all, fields(entity = %record.entity()))]
    pub fn delete(&self, record: &mut Record) -> Result<bool, Error> {
        let def = self.persisted_def(record)?;
        if !def.has_soft_delete() {
            return self.force_delete(record);
        }
        if record.is_trashed() {
            return Ok(false);
        }

        let now = Value::Timestamp(current_timestamp());
        record.set_raw(DELETED_AT, now.clone());
        touch(def, record, &now, false);
        let written = self.write_back(def, record)?;
        if written {
            record.set_state(RecordState::Trashed);
        }
        debug!(entity = %def.name, written, "record soft deleted");
        Ok(written)
    }

    /// Clear the tombstone of a soft-deleted record.
    #[instrument(skip_all, fields(entity = %record.entity()))]
    pub fn restore(&self, record: &mut Record) -> Result<bool, Error> {
        let def = self.persisted_def(record)?;
        if !def.has_soft_delete() {
            return Err(Error::InvalidData(format!(
                "'{}' does not support soft delete",
                def.name
            )));
        }
        if !record.is_trashed() {
            return Ok(false);
        }

        record.set_raw(DELETED_AT, Value::Null);
        touch(def, record, &Value::Timestamp(current_timestamp()), false);
        let written = self.write_back(def, record)?;
        if written {
            record.set_state(RecordState::Persisted);
        }
        debug!(entity = %def.name, written, "record restored");
        Ok(written)
    }

    /// Physically remove a record, even a soft-deletable one.
    #[instrument(skip_all, fields(entity = %record.entity()))]
    pub fn force_delete(&self, record: &mut Record) -> Result<bool, Error> {
        let def = self.persisted_def(record)?;
        let result = self.storage.execute(Statement::Delete {
            table: def.name.clone(),
            key: key_of(def, record)?,
        })?;

        record.set_state(RecordState::Deleted);
        debug!(entity = %def.name, "record removed");
        Ok(result.affected() > 0)
    }

    /// Reload a persisted record's columns from the datastore.
    ///
    /// Returns `false` if the row no longer exists.
    pub fn refresh(&self, record: &mut Record) -> Result<bool, Error> {
        let def = self.persisted_def(record)?;
        match self.storage.get(&def.name, &key_of(def, record)?)? {
            Some(row) => {
                let pivot = record.pivot().cloned();
                let mut fresh = self.registry().hydrate(&def.name, row)?;
                if let Some(pivot) = pivot {
                    fresh = fresh.with_pivot(pivot);
                }
                *record = fresh;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn persisted_def(&self, record: &Record) -> Result<&EntityDef, Error> {
        let def = self.catalog.describe(record.entity())?;
        if !record.exists() {
            return Err(Error::NotPersisted(def.name.clone()));
        }
        Ok(def)
    }

    fn write_back(&self, def: &EntityDef, record: &mut Record) -> Result<bool, Error> {
        let result = self.storage.execute(Statement::Update {
            table: def.name.clone(),
            key: key_of(def, record)?,
            row: row_for(def, record)?,
        })?;
        let written = result.affected() > 0;
        if written {
            record.sync_original();
        }
        Ok(written)
    }

    fn prepare_insert(&self, record: &mut Record, now: &Value) -> Result<Statement, Error> {
        let def = self.catalog.describe(record.entity())?;
        if record.exists() {
            return Err(Error::InvalidData(format!(
                "'{}' record is already persisted",
                def.name
            )));
        }

        if record.get(&def.key.field).map_or(true, Value::is_null) {
            let key_field = def.get_key_field().ok_or_else(|| Error::UnknownColumn {
                entity: def.name.clone(),
                column: def.key.field.clone(),
            })?;
            let key = match def.key.strategy {
                KeyStrategy::Manual => return Err(Error::MissingKey(def.name.clone())),
                KeyStrategy::AutoIncrement => key_field
                    .scalar
                    .convert_key(Value::Int64(self.storage.next_sequence(&def.name)?)),
                KeyStrategy::Uuid => crate::catalog::generate_uuid(key_field.scalar),
            };
            record.set_raw(&def.key.field, key);
        }

        for field in &def.fields {
            if let Some(default) = &field.default {
                if record.get(&field.name).is_none() {
                    record.set_raw(&field.name, default.evaluate(field.scalar));
                }
            }
        }

        touch(def, record, now, true);

        Ok(Statement::Insert {
            table: def.name.clone(),
            key: key_of(def, record)?,
            row: row_for(def, record)?,
        })
    }
}

/// Maintain `created_at` / `updated_at` on entities with timestamps.
pub(crate) fn touch(def: &EntityDef, record: &mut Record, now: &Value, creating: bool) {
    if !def.has_timestamps() {
        return;
    }
    if creating && record.get(CREATED_AT).map_or(true, Value::is_null) {
        record.set_raw(CREATED_AT, now.clone());
    }
    record.set_raw(UPDATED_AT, now.clone());
}

/// Primary key of a record that must have one.
pub(crate) fn key_of(def: &EntityDef, record: &Record) -> Result<Value, Error> {
    match record.get(&def.key.field) {
        Some(v) if !v.is_null() => Ok(v.clone()),
        _ => Err(Error::MissingKey(def.name.clone())),
    }
}

/// The stored row of a record: every declared column, nulls checked.
pub(crate) fn row_for(def: &EntityDef, record: &Record) -> Result<Row, Error> {
    let mut row = Row::new();
    for field in &def.fields {
        let value = record.value(&field.name);
        if value.is_null() && !field.nullable {
            return Err(ConstraintError::NotNull {
                entity: def.name.clone(),
                column: field.name.clone(),
            }
            .into());
        }
        row.insert(field.name.clone(), value);
    }
    Ok(row)
}
