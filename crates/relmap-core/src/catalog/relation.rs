//! Relation definitions between entities.

use super::scope::Predicate;

/// Column pair of a polymorphic association.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MorphKeys {
    /// Column storing the discriminator (owner's morph alias).
    pub type_field: String,
    /// Column storing the owner's key.
    pub id_field: String,
}

impl MorphKeys {
    /// Conventional column pair `{name}_type` / `{name}_id`.
    pub fn new(name: &str) -> Self {
        Self {
            type_field: format!("{}_type", name),
            id_field: format!("{}_id", name),
        }
    }

    /// Explicit column pair.
    pub fn explicit(type_field: impl Into<String>, id_field: impl Into<String>) -> Self {
        Self {
            type_field: type_field.into(),
            id_field: id_field.into(),
        }
    }
}

/// Selection of a single record out of a to-many relation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OneOfMany {
    /// Record with the smallest value in the column.
    Min(String),
    /// Record with the largest value in the column.
    Max(String),
    /// Most recently created record (largest key).
    Latest,
    /// Earliest created record (smallest key).
    Oldest,
}

/// How a relation links its owner to related records.
#[derive(Debug, Clone)]
pub enum RelationKind {
    /// Related row holds `foreign_key` = owner's `local_key`; at most one.
    HasOne {
        related: String,
        foreign_key: String,
        local_key: String,
    },
    /// Related rows hold `foreign_key` = owner's `local_key`.
    HasMany {
        related: String,
        foreign_key: String,
        local_key: String,
    },
    /// Owner holds `foreign_key` = related's `owner_key`.
    BelongsTo {
        related: String,
        foreign_key: String,
        owner_key: String,
    },
    /// Rows of the `pivot` entity link owner and related keys.
    BelongsToMany {
        related: String,
        pivot: String,
        foreign_pivot_key: String,
        related_pivot_key: String,
        parent_key: String,
        related_key: String,
        pivot_filter: Option<Predicate>,
    },
    /// owner.local_key = through.first_key, through.second_local_key = related.second_key; one.
    HasOneThrough {
        related: String,
        through: String,
        first_key: String,
        second_key: String,
        local_key: String,
        second_local_key: String,
    },
    /// Same chain as `HasOneThrough`, yielding every match.
    HasManyThrough {
        related: String,
        through: String,
        first_key: String,
        second_key: String,
        local_key: String,
        second_local_key: String,
    },
    /// Related row tagged with the owner's alias and key; at most one.
    MorphOne {
        related: String,
        morph: MorphKeys,
        local_key: String,
    },
    /// Related rows tagged with the owner's alias and key.
    MorphMany {
        related: String,
        morph: MorphKeys,
        local_key: String,
    },
    /// Owner holds a discriminator and key naming one of several entity types.
    MorphTo { morph: MorphKeys },
}

/// A named relation declared on an owner entity.
#[derive(Debug, Clone)]
pub struct RelationDef {
    /// Relation name (unique per owner).
    pub name: String,
    /// Entity the relation is declared on.
    pub owner: String,
    /// Link kind.
    pub kind: RelationKind,
    /// Reduce a to-many relation to a single record.
    pub of_many: Option<OneOfMany>,
}

impl RelationDef {
    fn new(name: impl Into<String>, owner: impl Into<String>, kind: RelationKind) -> Self {
        Self {
            name: name.into(),
            owner: owner.into(),
            kind,
            of_many: None,
        }
    }

    /// Create a has-one relation.
    pub fn has_one(
        name: impl Into<String>,
        owner: impl Into<String>,
        related: impl Into<String>,
        foreign_key: impl Into<String>,
    ) -> Self {
        Self::new(
            name,
            owner,
            RelationKind::HasOne {
                related: related.into(),
                foreign_key: foreign_key.into(),
                local_key: "id".into(),
            },
        )
    }

    /// Create a has-many relation.
    pub fn has_many(
        name: impl Into<String>,
        owner: impl Into<String>,
        related: impl Into<String>,
        foreign_key: impl Into<String>,
    ) -> Self {
        Self::new(
            name,
            owner,
            RelationKind::HasMany {
                related: related.into(),
                foreign_key: foreign_key.into(),
                local_key: "id".into(),
            },
        )
    }

    /// Create a belongs-to relation (inverse of has-one / has-many).
    pub fn belongs_to(
        name: impl Into<String>,
        owner: impl Into<String>,
        related: impl Into<String>,
        foreign_key: impl Into<String>,
    ) -> Self {
        Self::new(
            name,
            owner,
            RelationKind::BelongsTo {
                related: related.into(),
                foreign_key: foreign_key.into(),
                owner_key: "id".into(),
            },
        )
    }

    /// Create a many-to-many relation through a pivot entity.
    pub fn belongs_to_many(
        name: impl Into<String>,
        owner: impl Into<String>,
        related: impl Into<String>,
        pivot: impl Into<String>,
        foreign_pivot_key: impl Into<String>,
        related_pivot_key: impl Into<String>,
    ) -> Self {
        Self::new(
            name,
            owner,
            RelationKind::BelongsToMany {
                related: related.into(),
                pivot: pivot.into(),
                foreign_pivot_key: foreign_pivot_key.into(),
                related_pivot_key: related_pivot_key.into(),
                parent_key: "id".into(),
                related_key: "id".into(),
                pivot_filter: None,
            },
        )
    }

    /// Create a has-one-through relation.
    pub fn has_one_through(
        name: impl Into<String>,
        owner: impl Into<String>,
        related: impl Into<String>,
        through: impl Into<String>,
        first_key: impl Into<String>,
        second_key: impl Into<String>,
    ) -> Self {
        Self::new(
            name,
            owner,
            RelationKind::HasOneThrough {
                related: related.into(),
                through: through.into(),
                first_key: first_key.into(),
                second_key: second_key.into(),
                local_key: "id".into(),
                second_local_key: "id".into(),
            },
        )
    }

    /// Create a has-many-through relation.
    pub fn has_many_through(
        name: impl Into<String>,
        owner: impl Into<String>,
        related: impl Into<String>,
        through: impl Into<String>,
        first_key: impl Into<String>,
        second_key: impl Into<String>,
    ) -> Self {
        Self::new(
            name,
            owner,
            RelationKind::HasManyThrough {
                related: related.into(),
                through: through.into(),
                first_key: first_key.into(),
                second_key: second_key.into(),
                local_key: "id".into(),
                second_local_key: "id".into(),
            },
        )
    }

    /// Create a polymorphic has-one relation using `{morph}_type` / `{morph}_id`.
    pub fn morph_one(
        name: impl Into<String>,
        owner: impl Into<String>,
        related: impl Into<String>,
        morph: &str,
    ) -> Self {
        Self::new(
            name,
            owner,
            RelationKind::MorphOne {
                related: related.into(),
                morph: MorphKeys::new(morph),
                local_key: "id".into(),
            },
        )
    }

    /// Create a polymorphic has-many relation using `{morph}_type` / `{morph}_id`.
    pub fn morph_many(
        name: impl Into<String>,
        owner: impl Into<String>,
        related: impl Into<String>,
        morph: &str,
    ) -> Self {
        Self::new(
            name,
            owner,
            RelationKind::MorphMany {
                related: related.into(),
                morph: MorphKeys::new(morph),
                local_key: "id".into(),
            },
        )
    }

    /// Create the inverse side of a polymorphic relation.
    pub fn morph_to(name: impl Into<String>, owner: impl Into<String>, morph: &str) -> Self {
        Self::new(
            name,
            owner,
            RelationKind::MorphTo {
                morph: MorphKeys::new(morph),
            },
        )
    }

    /// Override the owner-side key column (`local_key` / `parent_key`).
    pub fn with_local_key(mut self, key: impl Into<String>) -> Self {
        let key = key.into();
        match &mut self.kind {
            RelationKind::HasOne { local_key, .. }
            | RelationKind::HasMany { local_key, .. }
            | RelationKind::HasOneThrough { local_key, .. }
            | RelationKind::HasManyThrough { local_key, .. }
            | RelationKind::MorphOne { local_key, .. }
            | RelationKind::MorphMany { local_key, .. } => *local_key = key,
            RelationKind::BelongsToMany { parent_key, .. } => *parent_key = key,
            RelationKind::BelongsTo { .. } | RelationKind::MorphTo { .. } => {}
        }
        self
    }

    /// Override the related-side key column of a belongs-to or many-to-many relation.
    pub fn with_related_key(mut self, key: impl Into<String>) -> Self {
        let key = key.into();
        match &mut self.kind {
            RelationKind::BelongsTo { owner_key, .. } => *owner_key = key,
            RelationKind::BelongsToMany { related_key, .. } => *related_key = key,
            _ => {}
        }
        self
    }

    /// Restrict a many-to-many relation to pivot rows matching a predicate.
    pub fn with_pivot_filter(mut self, filter: Predicate) -> Self {
        if let RelationKind::BelongsToMany { pivot_filter, .. } = &mut self.kind {
            *pivot_filter = Some(filter);
        }
        self
    }

    /// Reduce a to-many relation to a single record.
    pub fn of_many(mut self, pick: OneOfMany) -> Self {
        self.of_many = Some(pick);
        self
    }

    /// Reduce to the most recently created record.
    pub fn latest_of_many(self) -> Self {
        self.of_many(OneOfMany::Latest)
    }

    /// Reduce to the earliest created record.
    pub fn oldest_of_many(self) -> Self {
        self.of_many(OneOfMany::Oldest)
    }

    /// The related entity, or `None` for morph-to (resolved per record).
    pub fn related(&self) -> Option<&str> {
        match &self.kind {
            RelationKind::HasOne { related, .. }
            | RelationKind::HasMany { related, .. }
            | RelationKind::BelongsTo { related, .. }
            | RelationKind::BelongsToMany { related, .. }
            | RelationKind::HasOneThrough { related, .. }
            | RelationKind::HasManyThrough { related, .. }
            | RelationKind::MorphOne { related, .. }
            | RelationKind::MorphMany { related, .. } => Some(related),
            RelationKind::MorphTo { .. } => None,
        }
    }

    /// Whether resolution yields a sequence rather than a single record.
    pub fn is_many(&self) -> bool {
        self.of_many.is_none()
            && matches!(
                self.kind,
                RelationKind::HasMany { .. }
                    | RelationKind::BelongsToMany { .. }
                    | RelationKind::HasManyThrough { .. }
                    | RelationKind::MorphMany { .. }
            )
    }

    /// Whether the relation is naturally to-many (before any `of_many`).
    pub(crate) fn is_to_many_kind(&self) -> bool {
        matches!(
            self.kind,
            RelationKind::HasMany { .. }
                | RelationKind::BelongsToMany { .. }
                | RelationKind::HasManyThrough { .. }
                | RelationKind::MorphMany { .. }
        )
    }
}
