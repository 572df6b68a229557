//! Resolving a record's related records.

use crate::catalog::{OneOfMany, RelationDef, RelationKind};
use crate::database::Database;
use crate::error::Error;
use crate::query::{PivotAttachment, Query};
use crate::registry::Record;
use relmap_proto::{FilterExpr, OrderDirection, Value};

/// Result of resolving a relation.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolved {
    /// Single-record relation.
    One(Option<Record>),
    /// Multi-record relation.
    Many(Vec<Record>),
}

impl Resolved {
    /// The single record (first record of a multi-record result).
    pub fn one(self) -> Option<Record> {
        match self {
            Resolved::One(record) => record,
            Resolved::Many(records) => records.into_iter().next(),
        }
    }

    /// All resolved records.
    pub fn many(self) -> Vec<Record> {
        match self {
            Resolved::One(record) => record.into_iter().collect(),
            Resolved::Many(records) => records,
        }
    }

    /// Check if nothing was resolved.
    pub fn is_empty(&self) -> bool {
        match self {
            Resolved::One(record) => record.is_none(),
            Resolved::Many(records) => records.is_empty(),
        }
    }
}

/// Resolves relations declared in the catalog against a database.
#[derive(Clone, Copy)]
pub struct Resolver<'a> {
    pub(super) db: &'a Database,
}

impl<'a> Resolver<'a> {
    /// Create a resolver over a database.
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Resolve a relation of `record`.
    ///
    /// Nothing matching yields `One(None)` or an empty `Many`, including a
    /// morph-to whose discriminator is null or names no registered entity.
    pub fn resolve(&self, record: &Record, relation: &str) -> Result<Resolved, Error> {
        let def = self.db.catalog().relation(record.entity(), relation)?;

        if let RelationKind::MorphTo { morph } = &def.kind {
            let alias = record.value(&morph.type_field);
            let known = alias
                .as_str()
                .and_then(|a| self.db.catalog().entity_for_morph(a))
                .is_some();
            if !known {
                return Ok(Resolved::One(None));
            }
        }

        let query = self.query(record, relation)?;
        if def.is_many() {
            Ok(Resolved::Many(query.get()?))
        } else {
            Ok(Resolved::One(query.first()?))
        }
    }

    /// Resolve a single-record relation.
    pub fn one(&self, record: &Record, relation: &str) -> Result<Option<Record>, Error> {
        self.resolve(record, relation).map(Resolved::one)
    }

    /// Resolve a multi-record relation.
    pub fn many(&self, record: &Record, relation: &str) -> Result<Vec<Record>, Error> {
        self.resolve(record, relation).map(Resolved::many)
    }

    /// A query on the related entity constrained to this relation.
    ///
    /// The query can be refined further before running it. Pivot and
    /// intermediate rows are read when the query is built.
    pub fn query(&self, record: &Record, relation: &str) -> Result<Query<'a>, Error> {
        let catalog = self.db.catalog();
        let def = catalog.relation(record.entity(), relation)?;

        let query = match &def.kind {
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
                let key = self.convert(related, foreign_key, record.value(local_key))?;
                self.db.query(related)?.filter(match_key(foreign_key, key))
            }
            RelationKind::BelongsTo {
                related,
                foreign_key,
                owner_key,
            } => {
                let key = self.convert(related, owner_key, record.value(foreign_key))?;
                self.db.query(related)?.filter(match_key(owner_key, key))
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
                let owner_key = self.convert(pivot, foreign_pivot_key, record.value(parent_key))?;
                let mut pivots = self
                    .db
                    .query(pivot)?
                    .filter(match_key(foreign_pivot_key, owner_key));
                if let Some(predicate) = pivot_filter {
                    pivots = pivots.filter(predicate.build());
                }
                let pivots = pivots.get()?;

                let keys = pivots
                    .iter()
                    .map(|p| self.convert(related, related_key, p.value(related_pivot_key)))
                    .collect::<Result<Vec<_>, _>>()?;

                self.db
                    .query(related)?
                    .filter(FilterExpr::is_in(related_key.as_str(), keys))
                    .with_pivots(PivotAttachment {
                        related_key: related_key.clone(),
                        pivot_key: related_pivot_key.clone(),
                        rows: pivots,
                    })
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
                let owner_key = self.convert(through, first_key, record.value(local_key))?;
                let keys = self
                    .db
                    .query(through)?
                    .filter(match_key(first_key, owner_key))
                    .get()?
                    .iter()
                    .map(|r| r.value(second_local_key))
                    .filter(|v| !v.is_null())
                    .map(|v| self.convert(related, second_key, v))
                    .collect::<Result<Vec<_>, _>>()?;

                self.db
                    .query(related)?
                    .filter(FilterExpr::is_in(second_key.as_str(), keys))
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
                let alias = catalog.describe(record.entity())?.morph_alias();
                let key = self.convert(related, &morph.id_field, record.value(local_key))?;
                self.db
                    .query(related)?
                    .where_eq(&morph.type_field, alias)
                    .filter(match_key(&morph.id_field, key))
            }
            RelationKind::MorphTo { morph } => {
                let alias = record.value(&morph.type_field);
                let target = alias
                    .as_str()
                    .and_then(|a| catalog.entity_for_morph(a))
                    .ok_or_else(|| {
                        Error::InvalidRelation(format!(
                            "'{}' on '{}' has no registered target for discriminator {}",
                            def.name,
                            def.owner,
                            alias
                        ))
                    })?;
                let key = self.convert(&target.name, &target.key.field, record.value(&morph.id_field))?;
                self.db
                    .query(&target.name)?
                    .filter(match_key(&target.key.field, key))
            }
        };

        self.apply_of_many(def, query)
    }

    /// Point `child` at `owner` through a has or morph relation and save it.
    pub fn save(&self, owner: &Record, relation: &str, child: &mut Record) -> Result<(), Error> {
        let catalog = self.db.catalog();
        let def = catalog.relation(owner.entity(), relation)?;
        if !owner.exists() {
            return Err(Error::NotPersisted(owner.entity().to_string()));
        }
        let registry = self.db.registry();

        match &def.kind {
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
                expect_entity(def, related, child)?;
                let key = self.convert(related, foreign_key, owner.value(local_key))?;
                registry.set_attribute(child, foreign_key, key)?;
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
                expect_entity(def, related, child)?;
                let alias = catalog.describe(owner.entity())?.morph_alias();
                let key = self.convert(related, &morph.id_field, owner.value(local_key))?;
                registry.set_attribute(child, &morph.type_field, alias)?;
                registry.set_attribute(child, &morph.id_field, key)?;
            }
            _ => {
                return Err(Error::InvalidRelation(format!(
                    "cannot save a record through '{}' on '{}'",
                    def.name, def.owner
                )))
            }
        }

        self.db.save(child)
    }

    fn apply_of_many(&self, def: &RelationDef, query: Query<'a>) -> Result<Query<'a>, Error> {
        let pick = match &def.of_many {
            Some(pick) => pick,
            None => return Ok(query),
        };
        let key_field = self.db.catalog().describe(query.entity())?.key.field.clone();

        let query = match pick {
            OneOfMany::Min(column) => query.order_by(column, OrderDirection::Asc),
            OneOfMany::Max(column) => query.order_by(column, OrderDirection::Desc),
            OneOfMany::Latest => query.order_by(&key_field, OrderDirection::Desc),
            OneOfMany::Oldest => query.order_by(&key_field, OrderDirection::Asc),
        };
        Ok(query.limit(1))
    }

    /// Convert a linking value to the type of the column it is compared with.
    pub(super) fn convert(&self, entity: &str, column: &str, value: Value) -> Result<Value, Error> {
        let def = self.db.catalog().describe(entity)?;
        let field = def.get_field(column).ok_or_else(|| Error::UnknownColumn {
            entity: entity.to_string(),
            column: column.to_string(),
        })?;
        Ok(field.scalar.convert_key(value))
    }
}

/// Equality on a linking column; a null key matches nothing.
pub(super) fn match_key(field: &str, key: Value) -> FilterExpr {
    if key.is_null() {
        FilterExpr::none()
    } else {
        FilterExpr::eq(field, key)
    }
}

fn expect_entity(def: &RelationDef, related: &str, child: &Record) -> Result<(), Error> {
    if child.entity() == related {
        Ok(())
    } else {
        Err(Error::InvalidRelation(format!(
            "'{}' on '{}' relates '{}', not '{}'",
            def.name,
            def.owner,
            related,
            child.entity()
        )))
    }
}
