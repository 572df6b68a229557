//! The frozen, validated schema catalog.

use super::{
    EntityDef, KeyStrategy, OneOfMany, Predicate, RelationDef, RelationKind, SchemaBundle,
    ScopeDef,
};
use crate::error::Error;
use std::collections::HashMap;

/// Read-only schema metadata shared by every component.
///
/// Built once from a [`SchemaBundle`]; construction validates that every
/// relation and scope refers to registered entities and declared columns.
#[derive(Debug)]
pub struct Catalog {
    entities: HashMap<String, EntityDef>,
    relations: HashMap<String, HashMap<String, RelationDef>>,
    scopes: HashMap<String, Vec<ScopeDef>>,
    morph_map: HashMap<String, String>,
}

impl Catalog {
    /// Validate a bundle and freeze it.
    pub fn new(bundle: SchemaBundle) -> Result<Self, Error> {
        let SchemaBundle {
            entities,
            relations,
            scopes,
        } = bundle;

        let mut morph_map = HashMap::new();
        for entity in entities.values() {
            validate_entity(entity)?;
            let alias = entity.morph_alias().to_string();
            if let Some(previous) = morph_map.insert(alias.clone(), entity.name.clone()) {
                return Err(Error::InvalidData(format!(
                    "morph alias '{}' used by both '{}' and '{}'",
                    alias, previous, entity.name
                )));
            }
        }

        let mut catalog = Self {
            entities,
            relations: HashMap::new(),
            scopes: HashMap::new(),
            morph_map,
        };

        for relation in relations {
            catalog.validate_relation(&relation)?;
            let by_name = catalog.relations.entry(relation.owner.clone()).or_default();
            if by_name.contains_key(&relation.name) {
                return Err(Error::InvalidRelation(format!(
                    "relation '{}' declared twice on '{}'",
                    relation.name, relation.owner
                )));
            }
            by_name.insert(relation.name.clone(), relation);
        }

        for scope in scopes {
            let entity = catalog.describe(&scope.entity)?;
            if let Predicate::Static(filter) = &scope.predicate {
                for field in filter.fields() {
                    require_field(entity, field)?;
                }
            }
            let list = catalog.scopes.entry(scope.entity.clone()).or_default();
            if list.iter().any(|s| s.name == scope.name) {
                return Err(Error::InvalidData(format!(
                    "scope '{}' declared twice on '{}'",
                    scope.name, scope.entity
                )));
            }
            list.push(scope);
        }

        Ok(catalog)
    }

    /// Get an entity definition by name.
    pub fn describe(&self, entity: &str) -> Result<&EntityDef, Error> {
        self.entities
            .get(entity)
            .ok_or_else(|| Error::UnknownEntity(entity.to_string()))
    }

    /// Get a relation declared on an entity.
    pub fn relation(&self, entity: &str, name: &str) -> Result<&RelationDef, Error> {
        self.describe(entity)?;
        self.relations
            .get(entity)
            .and_then(|by_name| by_name.get(name))
            .ok_or_else(|| Error::UnknownRelation {
                entity: entity.to_string(),
                relation: name.to_string(),
            })
    }

    /// Get all relations declared on an entity.
    pub fn relations_from(&self, entity: &str) -> Vec<&RelationDef> {
        self.relations
            .get(entity)
            .map(|by_name| by_name.values().collect())
            .unwrap_or_default()
    }

    /// Global scopes applied to every query against an entity.
    pub fn global_scopes(&self, entity: &str) -> impl Iterator<Item = &ScopeDef> {
        self.scopes
            .get(entity)
            .into_iter()
            .flatten()
            .filter(|s| s.is_global())
    }

    /// Get a scope (global or local) by name.
    pub fn scope(&self, entity: &str, name: &str) -> Result<&ScopeDef, Error> {
        self.scopes
            .get(entity)
            .and_then(|list| list.iter().find(|s| s.name == name))
            .ok_or_else(|| Error::UnknownScope {
                entity: entity.to_string(),
                scope: name.to_string(),
            })
    }

    /// Entity registered under a polymorphic discriminator value.
    pub fn entity_for_morph(&self, alias: &str) -> Option<&EntityDef> {
        self.morph_map
            .get(alias)
            .and_then(|name| self.entities.get(name))
    }

    /// List all entity names.
    pub fn entity_names(&self) -> Vec<&str> {
        self.entities.keys().map(|s| s.as_str()).collect()
    }

    fn validate_relation(&self, relation: &RelationDef) -> Result<(), Error> {
        let owner = self.describe(&relation.owner)?;

        match &relation.kind {
            RelationKind::HasOne {
                related,
                foreign_key,
                local_key,
            }
            | RelationKind::HasMany {
                related,
                foreign_key,
                local_key,
            } => {
                require_field(owner, local_key)?;
                require_field(self.describe(related)?, foreign_key)?;
            }
            RelationKind::BelongsTo {
                related,
                foreign_key,
                owner_key,
            } => {
                require_field(owner, foreign_key)?;
                require_field(self.describe(related)?, owner_key)?;
            }
            RelationKind::BelongsToMany {
                related,
                pivot,
                foreign_pivot_key,
                related_pivot_key,
                parent_key,
                related_key,
                pivot_filter,
            } => {
                require_field(owner, parent_key)?;
                require_field(self.describe(related)?, related_key)?;
                let pivot = self.describe(pivot)?;
                require_field(pivot, foreign_pivot_key)?;
                require_field(pivot, related_pivot_key)?;
                if let Some(Predicate::Static(filter)) = pivot_filter {
                    for field in filter.fields() {
                        require_field(pivot, field)?;
                    }
                }
            }
            RelationKind::HasOneThrough {
                related,
                through,
                first_key,
                second_key,
                local_key,
                second_local_key,
            }
            | RelationKind::HasManyThrough {
                related,
                through,
                first_key,
                second_key,
                local_key,
                second_local_key,
            } => {
                require_field(owner, local_key)?;
                let through = self.describe(through)?;
                require_field(through, first_key)?;
                require_field(through, second_local_key)?;
                require_field(self.describe(related)?, second_key)?;
            }
            RelationKind::MorphOne {
                related,
                morph,
                local_key,
            }
            | RelationKind::MorphMany {
                related,
                morph,
                local_key,
            } => {
                require_field(owner, local_key)?;
                let related = self.describe(related)?;
                require_field(related, &morph.type_field)?;
                require_field(related, &morph.id_field)?;
            }
            RelationKind::MorphTo { morph } => {
                require_field(owner, &morph.type_field)?;
                require_field(owner, &morph.id_field)?;
            }
        }

        if let Some(pick) = &relation.of_many {
            if !relation.is_to_many_kind() {
                return Err(Error::InvalidRelation(format!(
                    "'{}' on '{}' is not a to-many relation and cannot pick one of many",
                    relation.name, relation.owner
                )));
            }
            if let OneOfMany::Min(column) | OneOfMany::Max(column) = pick {
                if let Some(related) = relation.related() {
                    require_field(self.describe(related)?, column)?;
                }
            }
        }

        Ok(())
    }
}

fn validate_entity(entity: &EntityDef) -> Result<(), Error> {
    let key = entity
        .get_key_field()
        .ok_or_else(|| Error::UnknownColumn {
            entity: entity.name.clone(),
            column: entity.key.field.clone(),
        })?;

    if entity.key.strategy == KeyStrategy::AutoIncrement && !key.scalar.is_integer() {
        return Err(Error::InvalidData(format!(
            "auto-increment key '{}' of '{}' must be an integer column",
            key.name, entity.name
        )));
    }

    for virtual_def in &entity.virtuals {
        if entity.has_field(&virtual_def.name) {
            return Err(Error::InvalidData(format!(
                "virtual attribute '{}' of '{}' shadows a column",
                virtual_def.name, entity.name
            )));
        }
    }

    Ok(())
}

fn require_field(entity: &EntityDef, column: &str) -> Result<(), Error> {
    if entity.has_field(column) {
        Ok(())
    } else {
        Err(Error::UnknownColumn {
            entity: entity.name.clone(),
            column: column.to_string(),
        })
    }
}
