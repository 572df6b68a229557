//! Entity definitions.

use super::attribute::{VirtualAttribute, VirtualDef};
use super::field::FieldDef;
use super::types::ScalarType;
use std::sync::Arc;

/// Column maintained with the insertion time when timestamps are enabled.
pub const CREATED_AT: &str = "created_at";

/// Column maintained with the last write time when timestamps are enabled.
pub const UPDATED_AT: &str = "updated_at";

/// Tombstone column of soft-deletable entities.
pub const DELETED_AT: &str = "deleted_at";

/// An entity definition (table schema).
#[derive(Debug, Clone)]
pub struct EntityDef {
    /// Entity name (unique within schema, also the storage table name).
    pub name: String,
    /// Primary key column and generation strategy.
    pub key: KeyDef,
    /// Column definitions, in declaration order.
    pub fields: Vec<FieldDef>,
    /// Lifecycle rules.
    pub lifecycle: LifecycleRules,
    /// Discriminator stored by polymorphic relations pointing at this entity.
    pub morph_alias: Option<String>,
    /// Computed attributes backed by real columns.
    pub virtuals: Vec<VirtualDef>,
}

/// Primary key declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyDef {
    /// Key column name.
    pub field: String,
    /// How the key is produced on first persist.
    pub strategy: KeyStrategy,
}

/// Primary key generation strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyStrategy {
    /// The caller assigns the key.
    Manual,
    /// The datastore assigns the next sequence value.
    AutoIncrement,
    /// A v4 UUID is generated before insert when the key is absent.
    Uuid,
}

/// Lifecycle rules for an entity.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LifecycleRules {
    /// Enable soft delete (deleted records kept with a `deleted_at` tombstone).
    pub soft_delete: bool,
    /// Maintain `created_at` / `updated_at` automatically.
    pub timestamps: bool,
}

impl EntityDef {
    /// Create a new entity definition with a caller-assigned key.
    pub fn new(name: impl Into<String>, key_field: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            key: KeyDef {
                field: key_field.into(),
                strategy: KeyStrategy::Manual,
            },
            fields: Vec::new(),
            lifecycle: LifecycleRules::default(),
            morph_alias: None,
            virtuals: Vec::new(),
        }
    }

    /// Set the key generation strategy.
    pub fn with_key_strategy(mut self, strategy: KeyStrategy) -> Self {
        self.key.strategy = strategy;
        self
    }

    /// Add a field to the entity.
    pub fn with_field(mut self, field: FieldDef) -> Self {
        self.fields.push(field);
        self
    }

    /// Add multiple fields.
    pub fn with_fields(mut self, fields: impl IntoIterator<Item = FieldDef>) -> Self {
        self.fields.extend(fields);
        self
    }

    /// Enable soft delete, declaring the `deleted_at` column.
    pub fn with_soft_delete(mut self) -> Self {
        self.lifecycle.soft_delete = true;
        self.ensure_field(FieldDef::optional(DELETED_AT, ScalarType::Timestamp));
        self
    }

    /// Enable automatic timestamps, declaring `created_at` and `updated_at`.
    pub fn with_timestamps(mut self) -> Self {
        self.lifecycle.timestamps = true;
        self.ensure_field(FieldDef::optional(CREATED_AT, ScalarType::Timestamp));
        self.ensure_field(FieldDef::optional(UPDATED_AT, ScalarType::Timestamp));
        self
    }

    /// Set the discriminator value polymorphic relations store for this entity.
    pub fn with_morph_alias(mut self, alias: impl Into<String>) -> Self {
        self.morph_alias = Some(alias.into());
        self
    }

    /// Register a computed attribute.
    pub fn with_virtual(
        mut self,
        name: impl Into<String>,
        attribute: impl VirtualAttribute + 'static,
    ) -> Self {
        self.virtuals.push(VirtualDef {
            name: name.into(),
            attribute: Arc::new(attribute),
        });
        self
    }

    fn ensure_field(&mut self, field: FieldDef) {
        if self.get_field(&field.name).is_none() {
            self.fields.push(field);
        }
    }

    /// Get a field by name.
    pub fn get_field(&self, name: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Check whether a column is declared.
    pub fn has_field(&self, name: &str) -> bool {
        self.get_field(name).is_some()
    }

    /// Get the key field definition.
    pub fn get_key_field(&self) -> Option<&FieldDef> {
        self.get_field(&self.key.field)
    }

    /// Get a computed attribute by name.
    pub fn get_virtual(&self, name: &str) -> Option<&VirtualDef> {
        self.virtuals.iter().find(|v| v.name == name)
    }

    /// Discriminator value for polymorphic relations (defaults to the name).
    pub fn morph_alias(&self) -> &str {
        self.morph_alias.as_deref().unwrap_or(&self.name)
    }

    /// Check if this entity has soft delete enabled.
    pub fn has_soft_delete(&self) -> bool {
        self.lifecycle.soft_delete
    }

    /// Check if this entity maintains timestamps.
    pub fn has_timestamps(&self) -> bool {
        self.lifecycle.timestamps
    }
}
