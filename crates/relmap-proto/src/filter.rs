//! Predicate and ordering types used by queries, scopes and relations.

use crate::error::Error;
use crate::value::Value;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// A filter expression evaluated against a record's attributes.
///
/// Compound expressions nest freely; repeated `where` calls on a query are
/// combined with [`FilterExpr::and`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FilterExpr {
    /// Field equals value.
    Eq { field: String, value: Value },
    /// Field not equals value.
    Ne { field: String, value: Value },
    /// Field less than value.
    Lt { field: String, value: Value },
    /// Field less than or equal to value.
    Le { field: String, value: Value },
    /// Field greater than value.
    Gt { field: String, value: Value },
    /// Field greater than or equal to value.
    Ge { field: String, value: Value },
    /// Field is in a set of values.
    In { field: String, values: Vec<Value> },
    /// Field is not in a set of values.
    NotIn { field: String, values: Vec<Value> },
    /// Field is null.
    IsNull { field: String },
    /// Field is not null.
    IsNotNull { field: String },
    /// Field matches a LIKE pattern.
    Like { field: String, pattern: String },
    /// All conditions must be true.
    And(Vec<FilterExpr>),
    /// At least one condition must be true.
    Or(Vec<FilterExpr>),
    /// Negation.
    Not(Box<FilterExpr>),
}

impl FilterExpr {
    /// Field equals value.
    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        FilterExpr::Eq {
            field: field.into(),
            value: value.into(),
        }
    }

    /// Field not equals value.
    pub fn ne(field: impl Into<String>, value: impl Into<Value>) -> Self {
        FilterExpr::Ne {
            field: field.into(),
            value: value.into(),
        }
    }

    /// Build a comparison from an operator.
    pub fn compare(field: impl Into<String>, op: Operator, value: impl Into<Value>) -> Self {
        let field = field.into();
        let value = value.into();
        match op {
            Operator::Eq => FilterExpr::Eq { field, value },
            Operator::Ne => FilterExpr::Ne { field, value },
            Operator::Lt => FilterExpr::Lt { field, value },
            Operator::Le => FilterExpr::Le { field, value },
            Operator::Gt => FilterExpr::Gt { field, value },
            Operator::Ge => FilterExpr::Ge { field, value },
        }
    }

    /// Field is in a set of values.
    pub fn is_in(field: impl Into<String>, values: Vec<Value>) -> Self {
        FilterExpr::In {
            field: field.into(),
            values,
        }
    }

    /// Field is null.
    pub fn is_null(field: impl Into<String>) -> Self {
        FilterExpr::IsNull {
            field: field.into(),
        }
    }

    /// Field is not null.
    pub fn is_not_null(field: impl Into<String>) -> Self {
        FilterExpr::IsNotNull {
            field: field.into(),
        }
    }

    /// Field matches a LIKE pattern.
    pub fn like(field: impl Into<String>, pattern: impl Into<String>) -> Self {
        FilterExpr::Like {
            field: field.into(),
            pattern: pattern.into(),
        }
    }

    /// A filter no row satisfies.
    pub fn none() -> Self {
        FilterExpr::Or(Vec::new())
    }

    /// Conjunction of two filters, flattening nested `And`s.
    pub fn and(self, other: FilterExpr) -> Self {
        match (self, other) {
            (FilterExpr::And(mut left), FilterExpr::And(right)) => {
                left.extend(right);
                FilterExpr::And(left)
            }
            (FilterExpr::And(mut left), right) => {
                left.push(right);
                FilterExpr::And(left)
            }
            (left, FilterExpr::And(mut right)) => {
                right.insert(0, left);
                FilterExpr::And(right)
            }
            (left, right) => FilterExpr::And(vec![left, right]),
        }
    }

    /// Combine a sequence of filters conjunctively. Returns `None` when empty.
    pub fn all(filters: impl IntoIterator<Item = FilterExpr>) -> Option<Self> {
        filters.into_iter().reduce(FilterExpr::and)
    }

    /// All field names referenced by this expression.
    pub fn fields(&self) -> BTreeSet<&str> {
        let mut fields = BTreeSet::new();
        self.collect_fields(&mut fields);
        fields
    }

    fn collect_fields<'a>(&'a self, fields: &mut BTreeSet<&'a str>) {
        match self {
            FilterExpr::Eq { field, .. }
            | FilterExpr::Ne { field, .. }
            | FilterExpr::Lt { field, .. }
            | FilterExpr::Le { field, .. }
            | FilterExpr::Gt { field, .. }
            | FilterExpr::Ge { field, .. }
            | FilterExpr::In { field, .. }
            | FilterExpr::NotIn { field, .. }
            | FilterExpr::IsNull { field }
            | FilterExpr::IsNotNull { field }
            | FilterExpr::Like { field, .. } => {
                fields.insert(field.as_str());
            }
            FilterExpr::And(filters) | FilterExpr::Or(filters) => {
                for f in filters {
                    f.collect_fields(fields);
                }
            }
            FilterExpr::Not(inner) => inner.collect_fields(fields),
        }
    }
}

/// Comparison operator as written in `where(field, op, value)` style calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operator {
    /// `=`
    Eq,
    /// `!=` or `<>`
    Ne,
    /// `<`
    Lt,
    /// `<=`
    Le,
    /// `>`
    Gt,
    /// `>=`
    Ge,
}

impl FromStr for Operator {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "=" | "==" => Ok(Operator::Eq),
            "!=" | "<>" => Ok(Operator::Ne),
            "<" => Ok(Operator::Lt),
            "<=" => Ok(Operator::Le),
            ">" => Ok(Operator::Gt),
            ">=" => Ok(Operator::Ge),
            other => Err(Error::UnknownOperator(other.to_string())),
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Operator::Eq => "=",
            Operator::Ne => "!=",
            Operator::Lt => "<",
            Operator::Le => "<=",
            Operator::Gt => ">",
            Operator::Ge => ">=",
        };
        f.write_str(s)
    }
}

/// Order specification for sorting results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderSpec {
    /// Field to order by.
    pub field: String,
    /// Sort direction.
    pub direction: OrderDirection,
}

impl OrderSpec {
    /// Create an ascending order spec.
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: OrderDirection::Asc,
        }
    }

    /// Create a descending order spec.
    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: OrderDirection::Desc,
        }
    }
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderDirection {
    /// Ascending order.
    Asc,
    /// Descending order.
    Desc,
}
