//! Attaching and detaching many-to-many pivot rows.

use super::resolver::{match_key, Resolver};
use crate::catalog::RelationKind;
use crate::error::Error;
use crate::registry::Record;
use relmap_proto::Value;
use tracing::debug;

/// Pivot columns of a many-to-many relation, with the owner's key converted.
struct PivotLink<'a> {
    pivot: &'a str,
    foreign_pivot_key: &'a str,
    related_pivot_key: &'a str,
    owner_key: Value,
}

impl<'a> Resolver<'a> {
    /// Link `owner` to the related record keyed `related_key`.
    pub fn attach(
        &self,
        owner: &Record,
        relation: &str,
        related_key: impl Into<Value>,
    ) -> Result<Record, Error> {
        self.attach_with(owner, relation, related_key, Vec::<(&str, Value)>::new())
    }

    /// Link `owner` to a related record, storing extra columns on the pivot row.
    ///
    /// Attaching a pair that is already linked fails with `DuplicatePivot`;
    /// the pair is checked regardless of the pivot entity's scopes.
    pub fn attach_with<K, V>(
        &self,
        owner: &Record,
        relation: &str,
        related_key: impl Into<Value>,
        attrs: impl IntoIterator<Item = (K, V)>,
    ) -> Result<Record, Error>
    where
        K: AsRef<str>,
        V: Into<Value>,
    {
        let link = self.pivot_link(owner, relation)?;
        let related_key = self.convert(link.pivot, link.related_pivot_key, related_key.into())?;

        let linked = self
            .db
            .query(link.pivot)?
            .without_global_scopes()
            .with_trashed()
            .where_eq(link.foreign_pivot_key, link.owner_key.clone())
            .where_eq(link.related_pivot_key, related_key.clone())
            .exists()?;
        if linked {
            return Err(Error::DuplicatePivot {
                pivot: link.pivot.to_string(),
                owner_key: link.owner_key.to_string(),
                related_key: related_key.to_string(),
            });
        }

        let registry = self.db.registry();
        let mut record = registry.instantiate(link.pivot)?;
        registry.fill(&mut record, attrs)?;
        registry.set_attribute(&mut record, link.foreign_pivot_key, link.owner_key.clone())?;
        registry.set_attribute(&mut record, link.related_pivot_key, related_key.clone())?;
        self.db.insert(&mut record)?;

        debug!(
            pivot = link.pivot,
            owner = %link.owner_key,
            related = %related_key,
            "pivot attached"
        );
        Ok(record)
    }

    /// Remove the pivot row linking `owner` to `related_key`.
    ///
    /// Returns the number of pivot rows removed.
    pub fn detach(
        &self,
        owner: &Record,
        relation: &str,
        related_key: impl Into<Value>,
    ) -> Result<u64, Error> {
        let link = self.pivot_link(owner, relation)?;
        let related_key = self.convert(link.pivot, link.related_pivot_key, related_key.into())?;

        let removed = self
            .db
            .query(link.pivot)?
            .without_global_scopes()
            .with_trashed()
            .where_eq(link.foreign_pivot_key, link.owner_key.clone())
            .filter(match_key(link.related_pivot_key, related_key.clone()))
            .force_delete()?;

        debug!(pivot = link.pivot, owner = %link.owner_key, related = %related_key, removed, "pivot detached");
        Ok(removed)
    }

    /// Remove every pivot row of `owner` for this relation.
    pub fn detach_all(&self, owner: &Record, relation: &str) -> Result<u64, Error> {
        let link = self.pivot_link(owner, relation)?;

        let removed = self
            .db
            .query(link.pivot)?
            .without_global_scopes()
            .with_trashed()
            .where_eq(link.foreign_pivot_key, link.owner_key.clone())
            .force_delete()?;

        debug!(pivot = link.pivot, owner = %link.owner_key, removed, "pivots detached");
        Ok(removed)
    }

    fn pivot_link(&self, owner: &Record, relation: &str) -> Result<PivotLink<'a>, Error> {
        let def = self.db.catalog().relation(owner.entity(), relation)?;
        let RelationKind::BelongsToMany {
            pivot,
            foreign_pivot_key,
            related_pivot_key,
            parent_key,
            ..
        } = &def.kind
        else {
            return Err(Error::InvalidRelation(format!(
                "'{}' on '{}' is not a many-to-many relation",
                def.name, def.owner
            )));
        };

        let owner_key = self.convert(pivot, foreign_pivot_key, owner.value(parent_key))?;
        if !owner.exists() || owner_key.is_null() {
            return Err(Error::NotPersisted(owner.entity().to_string()));
        }

        Ok(PivotLink {
            pivot,
            foreign_pivot_key,
            related_pivot_key,
            owner_key,
        })
    }
}
