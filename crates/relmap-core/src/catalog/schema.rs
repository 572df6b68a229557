//! Schema bundle - the builder a catalog is frozen from.

use super::{EntityDef, RelationDef, ScopeDef};
use std::collections::HashMap;

/// A complete schema description awaiting validation.
#[derive(Debug, Clone, Default)]
pub struct SchemaBundle {
    /// Entity definitions keyed by name.
    pub entities: HashMap<String, EntityDef>,
    /// Relation definitions, in declaration order.
    pub relations: Vec<RelationDef>,
    /// Scope definitions, in declaration order.
    pub scopes: Vec<ScopeDef>,
}

impl SchemaBundle {
    /// Create an empty schema bundle.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an entity to the schema.
    pub fn with_entity(mut self, entity: EntityDef) -> Self {
        self.entities.insert(entity.name.clone(), entity);
        self
    }

    /// Add a relation to the schema.
    pub fn with_relation(mut self, relation: RelationDef) -> Self {
        self.relations.push(relation);
        self
    }

    /// Add a scope to the schema.
    pub fn with_scope(mut self, scope: ScopeDef) -> Self {
        self.scopes.push(scope);
        self
    }

    /// Get an entity by name.
    pub fn get_entity(&self, name: &str) -> Option<&EntityDef> {
        self.entities.get(name)
    }

    /// Get all relations declared on an entity.
    pub fn relations_from(&self, entity: &str) -> Vec<&RelationDef> {
        self.relations.iter().filter(|r| r.owner == entity).collect()
    }

    /// Get all scopes declared for an entity.
    pub fn scopes_for(&self, entity: &str) -> Vec<&ScopeDef> {
        self.scopes.iter().filter(|s| s.entity == entity).collect()
    }

    /// List all entity names.
    pub fn entity_names(&self) -> Vec<&str> {
        self.entities.keys().map(|s| s.as_str()).collect()
    }
}
