//! Scope definitions: named predicates attached to an entity's queries.

use relmap_proto::FilterExpr;
use std::fmt;
use std::sync::Arc;

/// A predicate that is either fixed or rebuilt each time a query runs.
///
/// Dynamic predicates cover conditions relative to the current time, such as
/// "created within the last week".
#[derive(Clone)]
pub enum Predicate {
    /// Fixed filter.
    Static(FilterExpr),
    /// Filter produced at query time.
    Dynamic(Arc<dyn Fn() -> FilterExpr + Send + Sync>),
}

impl Predicate {
    /// Build a predicate that is evaluated on every query.
    pub fn dynamic(f: impl Fn() -> FilterExpr + Send + Sync + 'static) -> Self {
        Predicate::Dynamic(Arc::new(f))
    }

    /// Produce the filter to apply.
    pub fn build(&self) -> FilterExpr {
        match self {
            Predicate::Static(filter) => filter.clone(),
            Predicate::Dynamic(f) => f(),
        }
    }
}

impl From<FilterExpr> for Predicate {
    fn from(filter: FilterExpr) -> Self {
        Predicate::Static(filter)
    }
}

impl fmt::Debug for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Predicate::Static(filter) => f.debug_tuple("Static").field(filter).finish(),
            Predicate::Dynamic(_) => f.write_str("Dynamic(..)"),
        }
    }
}

/// When a scope applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeKind {
    /// Injected into every query unless suppressed with `without_scopes`.
    Global,
    /// Applied only when requested with `Query::scope`.
    Local,
}

/// A named scope on an entity.
#[derive(Debug, Clone)]
pub struct ScopeDef {
    /// Scope name (unique per entity).
    pub name: String,
    /// Entity whose queries the scope filters.
    pub entity: String,
    /// The filter applied.
    pub predicate: Predicate,
    /// Global or local.
    pub kind: ScopeKind,
}

impl ScopeDef {
    /// Create a global scope.
    pub fn global(
        name: impl Into<String>,
        entity: impl Into<String>,
        predicate: impl Into<Predicate>,
    ) -> Self {
        Self {
            name: name.into(),
            entity: entity.into(),
            predicate: predicate.into(),
            kind: ScopeKind::Global,
        }
    }

    /// Create a local (opt-in) scope.
    pub fn local(
        name: impl Into<String>,
        entity: impl Into<String>,
        predicate: impl Into<Predicate>,
    ) -> Self {
        Self {
            name: name.into(),
            entity: entity.into(),
            predicate: predicate.into(),
            kind: ScopeKind::Local,
        }
    }

    /// Check if the scope is applied implicitly.
    pub fn is_global(&self) -> bool {
        self.kind == ScopeKind::Global
    }
}
