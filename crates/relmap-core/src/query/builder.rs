//! Fluent query builder.

use super::filter::{sort_order, FilterEvaluator};
use crate::catalog::{EntityDef, DELETED_AT};
use crate::database::{self, Database};
use crate::error::Error;
use crate::registry::Record;
use crate::storage::Statement;
use relmap_proto::{FilterExpr, Operator, OrderDirection, OrderSpec, Value};
use std::cmp::Ordering;
use std::collections::BTreeSet;
use tracing::{debug, instrument};

/// Which soft-deleted rows a query sees.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TrashedMode {
    Exclude,
    Include,
    Only,
}

/// Global scopes suppressed for one query.
#[derive(Debug, Clone, PartialEq, Eq)]
enum ScopeExclusion {
    None,
    Named(BTreeSet<String>),
    All,
}

impl ScopeExclusion {
    fn excludes(&self, scope: &str) -> bool {
        match self {
            ScopeExclusion::None => false,
            ScopeExclusion::Named(names) => names.contains(scope),
            ScopeExclusion::All => true,
        }
    }
}

/// Pivot rows to expose on records loaded through a many-to-many relation.
#[derive(Debug, Clone)]
pub(crate) struct PivotAttachment {
    /// Column of the related entity the pivot points at.
    pub related_key: String,
    /// Column of the pivot holding the related key.
    pub pivot_key: String,
    /// Pivot records.
    pub rows: Vec<Record>,
}

/// A query against one entity.
///
/// Repeated filter calls compose conjunctively. Invalid columns and scopes
/// are reported when the query runs.
pub struct Query<'a> {
    db: &'a Database,
    entity: &'a EntityDef,
    filters: Vec<FilterExpr>,
    order: Vec<OrderSpec>,
    limit: Option<usize>,
    offset: usize,
    trashed: TrashedMode,
    without: ScopeExclusion,
    pivots: Option<PivotAttachment>,
    error: Option<Error>,
}

impl<'a> Query<'a> {
    pub(crate) fn new(db: &'a Database, entity: &str) -> Result<Self, Error> {
        let entity = db.catalog().describe(entity)?;
        Ok(Self {
            db,
            entity,
            filters: Vec::new(),
            order: Vec::new(),
            limit: None,
            offset: 0,
            trashed: TrashedMode::Exclude,
            without: ScopeExclusion::None,
            pivots: None,
            error: None,
        })
    }

    /// Entity being queried.
    pub fn entity(&self) -> &str {
        &self.entity.name
    }

    /// Add an arbitrary filter expression.
    ///
    /// Literals are converted to the declared type of the column they are
    /// compared with, so `find` accepts a key in any form `set_attribute` does.
    pub fn filter(mut self, filter: FilterExpr) -> Self {
        if self.error.is_none() {
            self.error = self.unknown_column(&filter);
        }
        let filter = self.typed(filter);
        self.filters.push(filter);
        self
    }

    /// Require `field = value`.
    pub fn where_eq(self, field: &str, value: impl Into<Value>) -> Self {
        self.filter(FilterExpr::eq(field, value))
    }

    /// Require `field <op> value`.
    pub fn where_cmp(self, field: &str, op: Operator, value: impl Into<Value>) -> Self {
        self.filter(FilterExpr::compare(field, op, value))
    }

    /// Require `field <op> value` with a textual operator such as `">="`.
    pub fn where_op(mut self, field: &str, op: &str, value: impl Into<Value>) -> Self {
        match op.parse::<Operator>() {
            Ok(op) => self.where_cmp(field, op, value),
            Err(e) => {
                self.error.get_or_insert(Error::Protocol(e));
                self
            }
        }
    }

    /// Require `field` to be null.
    pub fn where_null(self, field: &str) -> Self {
        self.filter(FilterExpr::is_null(field))
    }

    /// Require `field` to be non-null.
    pub fn where_not_null(self, field: &str) -> Self {
        self.filter(FilterExpr::is_not_null(field))
    }

    /// Require `field` to equal one of `values`.
    pub fn where_in<V: Into<Value>>(self, field: &str, values: impl IntoIterator<Item = V>) -> Self {
        let values = values.into_iter().map(Into::into).collect();
        self.filter(FilterExpr::is_in(field, values))
    }

    /// Order results by a column. Later calls break ties of earlier ones.
    pub fn order_by(mut self, field: &str, direction: OrderDirection) -> Self {
        if self.error.is_none() && !self.entity.has_field(field) {
            self.error = Some(Error::UnknownColumn {
                entity: self.entity.name.clone(),
                column: field.to_string(),
            });
        }
        self.order.push(OrderSpec {
            field: field.to_string(),
            direction,
        });
        self
    }

    /// Return at most `n` records.
    pub fn limit(mut self, n: usize) -> Self {
        self.limit = Some(n);
        self
    }

    /// Skip the first `n` matching records.
    pub fn offset(mut self, n: usize) -> Self {
        self.offset = n;
        self
    }

    /// Include soft-deleted records.
    pub fn with_trashed(mut self) -> Self {
        self.trashed = TrashedMode::Include;
        self
    }

    /// Return only soft-deleted records.
    pub fn only_trashed(mut self) -> Self {
        self.trashed = TrashedMode::Only;
        self
    }

    /// Skip the named global scopes for this query.
    pub fn without_scopes(mut self, names: &[&str]) -> Self {
        if self.error.is_none() {
            self.error = names
                .iter()
                .find(|name| {
                    !self
                        .db
                        .catalog()
                        .global_scopes(&self.entity.name)
                        .any(|scope| scope.name == **name)
                })
                .map(|name| Error::UnknownScope {
                    entity: self.entity.name.clone(),
                    scope: name.to_string(),
                });
        }
        match &mut self.without {
            ScopeExclusion::All => {}
            ScopeExclusion::Named(set) => set.extend(names.iter().map(|n| n.to_string())),
            ScopeExclusion::None => {
                self.without =
                    ScopeExclusion::Named(names.iter().map(|n| n.to_string()).collect());
            }
        }
        self
    }

    /// Skip every global scope for this query.
    pub fn without_global_scopes(mut self) -> Self {
        self.without = ScopeExclusion::All;
        self
    }

    /// Apply a named scope declared on the entity.
    pub fn scope(mut self, name: &str) -> Self {
        let (db, entity) = (self.db, self.entity);
        match db.catalog().scope(&entity.name, name) {
            Ok(scope) => self.filter(scope.predicate.build()),
            Err(e) => {
                self.error.get_or_insert(e);
                self
            }
        }
    }

    pub(crate) fn with_pivots(mut self, pivots: PivotAttachment) -> Self {
        self.pivots = Some(pivots);
        self
    }

    /// Run the query.
    pub fn get(mut self) -> Result<Vec<Record>, Error> {
        self.check()?;
        self.load()
    }

    /// First matching record.
    pub fn first(mut self) -> Result<Option<Record>, Error> {
        self.limit = Some(1);
        Ok(self.get()?.into_iter().next())
    }

    /// First matching record, failing with `NotFound` if there is none.
    pub fn first_or_fail(self) -> Result<Record, Error> {
        let entity = self.entity.name.clone();
        self.first()?.ok_or(Error::NotFound(entity))
    }

    /// Record with the given primary key, if visible to this query.
    pub fn find(self, key: impl Into<Value>) -> Result<Option<Record>, Error> {
        let key_field = self.entity.key.field.clone();
        self.where_eq(&key_field, key).first()
    }

    /// Record with the given primary key, failing with `NotFound` if absent.
    pub fn find_or_fail(self, key: impl Into<Value>) -> Result<Record, Error> {
        let key_field = self.entity.key.field.clone();
        self.where_eq(&key_field, key).first_or_fail()
    }

    /// Number of matching records.
    pub fn count(self) -> Result<u64, Error> {
        Ok(self.get()?.len() as u64)
    }

    /// Whether any record matches.
    pub fn exists(self) -> Result<bool, Error> {
        Ok(self.first()?.is_some())
    }

    /// Assign `attrs` on every matching record in one transaction.
    ///
    /// Returns the number of updated rows.
    #[instrument(skip_all, fields(entity = %self.entity.name))]
    pub fn update<K, V>(mut self, attrs: impl IntoIterator<Item = (K, V)>) -> Result<u64, Error>
    where
        K: AsRef<str>,
        V: Into<Value>,
    {
        self.check()?;
        let attrs: Vec<(K, Value)> = attrs.into_iter().map(|(k, v)| (k, v.into())).collect();
        let registry = self.db.registry();
        let now = Value::Timestamp(crate::storage::key::current_timestamp());

        let mut tx = self.db.storage().transaction();
        for mut record in self.load()? {
            for (column, value) in &attrs {
                registry.set_attribute(&mut record, column.as_ref(), value.clone())?;
            }
            database::touch(self.entity, &mut record, &now, false);
            tx.execute(Statement::Update {
                table: self.entity.name.clone(),
                key: database::key_of(self.entity, &record)?,
                row: database::row_for(self.entity, &record)?,
            })?;
        }
        let affected = tx.commit()?;

        debug!(entity = %self.entity.name, affected, "bulk update");
        Ok(affected)
    }

    /// Delete every matching record in one transaction.
    ///
    /// Soft-deletable entities are tombstoned; others are removed.
    #[instrument(skip_all, fields(entity = %self.entity.name))]
    pub fn delete(mut self) -> Result<u64, Error> {
        self.check()?;
        if !self.entity.has_soft_delete() {
            return self.remove_matching();
        }

        let now = Value::Timestamp(crate::storage::key::current_timestamp());
        let mut tx = self.db.storage().transaction();
        for mut record in self.load()? {
            if record.is_trashed() {
                continue;
            }
            record.set_raw(DELETED_AT, now.clone());
            database::touch(self.entity, &mut record, &now, false);
            tx.execute(Statement::Update {
                table: self.entity.name.clone(),
                key: database::key_of(self.entity, &record)?,
                row: database::row_for(self.entity, &record)?,
            })?;
        }
        let affected = tx.commit()?;

        debug!(entity = %self.entity.name, affected, "bulk soft delete");
        Ok(affected)
    }

    /// Physically remove every matching record, tombstoned or not.
    #[instrument(skip_all, fields(entity = %self.entity.name))]
    pub fn force_delete(mut self) -> Result<u64, Error> {
        self.check()?;
        self.remove_matching()
    }

    /// Clear the tombstone of every matching soft-deleted record.
    ///
    /// Considers trashed records even without `only_trashed`.
    #[instrument(skip_all, fields(entity = %self.entity.name))]
    pub fn restore(mut self) -> Result<u64, Error> {
        self.check()?;
        if !self.entity.has_soft_delete() {
            return Err(Error::InvalidData(format!(
                "'{}' does not support soft delete",
                self.entity.name
            )));
        }
        if self.trashed == TrashedMode::Exclude {
            self.trashed = TrashedMode::Only;
        }

        let now = Value::Timestamp(crate::storage::key::current_timestamp());
        let mut tx = self.db.storage().transaction();
        for mut record in self.load()? {
            if !record.is_trashed() {
                continue;
            }
            record.set_raw(DELETED_AT, Value::Null);
            database::touch(self.entity, &mut record, &now, false);
            tx.execute(Statement::Update {
                table: self.entity.name.clone(),
                key: database::key_of(self.entity, &record)?,
                row: database::row_for(self.entity, &record)?,
            })?;
        }
        let affected = tx.commit()?;

        debug!(entity = %self.entity.name, affected, "bulk restore");
        Ok(affected)
    }

    fn remove_matching(&self) -> Result<u64, Error> {
        let mut tx = self.db.storage().transaction();
        for record in self.load()? {
            tx.execute(Statement::Delete {
                table: self.entity.name.clone(),
                key: database::key_of(self.entity, &record)?,
            })?;
        }
        let affected = tx.commit()?;

        debug!(entity = %self.entity.name, affected, "bulk delete");
        Ok(affected)
    }

    fn check(&mut self) -> Result<(), Error> {
        match self.error.take() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// First column referenced by `filter` that the entity does not declare.
    fn unknown_column(&self, filter: &FilterExpr) -> Option<Error> {
        filter
            .fields()
            .into_iter()
            .find(|field| !self.entity.has_field(field))
            .map(|field| Error::UnknownColumn {
                entity: self.entity.name.clone(),
                column: field.to_string(),
            })
    }

    fn typed(&self, filter: FilterExpr) -> FilterExpr {
        match filter {
            FilterExpr::Eq { field, value } => {
                let value = self.typed_value(&field, value);
                FilterExpr::Eq { field, value }
            }
            FilterExpr::Ne { field, value } => {
                let value = self.typed_value(&field, value);
                FilterExpr::Ne { field, value }
            }
            FilterExpr::Lt { field, value } => {
                let value = self.typed_value(&field, value);
                FilterExpr::Lt { field, value }
            }
            FilterExpr::Le { field, value } => {
                let value = self.typed_value(&field, value);
                FilterExpr::Le { field, value }
            }
            FilterExpr::Gt { field, value } => {
                let value = self.typed_value(&field, value);
                FilterExpr::Gt { field, value }
            }
            FilterExpr::Ge { field, value } => {
                let value = self.typed_value(&field, value);
                FilterExpr::Ge { field, value }
            }
            FilterExpr::In { field, values } => {
                let values = values
                    .into_iter()
                    .map(|v| self.typed_value(&field, v))
                    .collect();
                FilterExpr::In { field, values }
            }
            FilterExpr::NotIn { field, values } => {
                let values = values
                    .into_iter()
                    .map(|v| self.typed_value(&field, v))
                    .collect();
                FilterExpr::NotIn { field, values }
            }
            FilterExpr::And(filters) => {
                FilterExpr::And(filters.into_iter().map(|f| self.typed(f)).collect())
            }
            FilterExpr::Or(filters) => {
                FilterExpr::Or(filters.into_iter().map(|f| self.typed(f)).collect())
            }
            FilterExpr::Not(inner) => FilterExpr::Not(Box::new(self.typed(*inner))),
            other => other,
        }
    }

    /// A literal that cannot represent the column's type is kept as given
    /// and simply never matches.
    fn typed_value(&self, field: &str, value: Value) -> Value {
        match self.entity.get_field(field) {
            Some(def) => def.scalar.coerce(value.clone()).unwrap_or(value),
            None => value,
        }
    }

    /// Filters in effect: explicit ones, global scopes and the tombstone filter.
    fn effective_filter(&self) -> Result<Option<FilterExpr>, Error> {
        let mut parts = self.filters.clone();

        for scope in self.db.catalog().global_scopes(&self.entity.name) {
            if !self.without.excludes(&scope.name) {
                let predicate = scope.predicate.build();
                if let Some(e) = self.unknown_column(&predicate) {
                    return Err(e);
                }
                parts.push(self.typed(predicate));
            }
        }

        if self.entity.has_soft_delete() {
            match self.trashed {
                TrashedMode::Exclude => parts.push(FilterExpr::is_null(DELETED_AT)),
                TrashedMode::Only => parts.push(FilterExpr::is_not_null(DELETED_AT)),
                TrashedMode::Include => {}
            }
        }

        Ok(FilterExpr::all(parts))
    }

    fn load(&self) -> Result<Vec<Record>, Error> {
        let registry = self.db.registry();
        let filter = self.effective_filter()?;

        let mut records = Vec::new();
        for row in self.db.storage().scan(&self.entity.name)? {
            let matches = filter
                .as_ref()
                .map_or(true, |f| FilterEvaluator::evaluate(f, &row));
            if matches {
                records.push(registry.hydrate(&self.entity.name, row)?);
            }
        }

        // Rows arrive in key order and the sort is stable, so ties stay in key order.
        if !self.order.is_empty() {
            records.sort_by(|a, b| {
                for spec in &self.order {
                    let ord = sort_order(a.get(&spec.field), b.get(&spec.field));
                    let ord = match spec.direction {
                        OrderDirection::Asc => ord,
                        OrderDirection::Desc => ord.reverse(),
                    };
                    if ord != Ordering::Equal {
                        return ord;
                    }
                }
                Ordering::Equal
            });
        }

        let records = records
            .into_iter()
            .skip(self.offset)
            .take(self.limit.unwrap_or(usize::MAX));

        Ok(match &self.pivots {
            Some(pivots) => records
                .map(|record| attach_pivot(record, pivots))
                .collect(),
            None => records.collect(),
        })
    }
}

fn attach_pivot(record: Record, pivots: &PivotAttachment) -> Record {
    let key = record.get(&pivots.related_key);
    let pivot = pivots.rows.iter().find(|p| match (p.get(&pivots.pivot_key), key) {
        (Some(a), Some(b)) => FilterEvaluator::values_equal(a, b),
        _ => false,
    });
    match pivot {
        Some(pivot) => {
            let pivot = pivot.clone();
            record.with_pivot(pivot)
        }
        None => record,
    }
}
