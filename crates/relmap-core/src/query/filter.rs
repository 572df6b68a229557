//! Filter evaluation for query execution.
//!
//! `FilterEvaluator` decides whether a row satisfies a filter expression.
//! Missing columns behave as null; values of incomparable types never match
//! an ordering comparison.

use crate::storage::Row;
use relmap_proto::{FilterExpr, Value};
use std::cmp::Ordering;

/// Evaluates filter expressions against row values.
pub struct FilterEvaluator;

impl FilterEvaluator {
    /// Evaluate a filter expression against a row.
    ///
    /// Returns `true` if the row matches the filter, `false` otherwise.
    pub fn evaluate(filter: &FilterExpr, row: &Row) -> bool {
        match filter {
            FilterExpr::Eq { field, value } => {
                Self::compare_field(row, field, value, Self::values_equal)
            }
            FilterExpr::Ne { field, value } => {
                Self::compare_field(row, field, value, |a, b| !Self::values_equal(a, b))
            }
            FilterExpr::Lt { field, value } => {
                Self::compare_field(row, field, value, |a, b| {
                    compare_values(a, b).map(Ordering::is_lt).unwrap_or(false)
                })
            }
            FilterExpr::Le { field, value } => {
                Self::compare_field(row, field, value, |a, b| {
                    compare_values(a, b).map(Ordering::is_le).unwrap_or(false)
                })
            }
            FilterExpr::Gt { field, value } => {
                Self::compare_field(row, field, value, |a, b| {
                    compare_values(a, b).map(Ordering::is_gt).unwrap_or(false)
                })
            }
            FilterExpr::Ge { field, value } => {
                Self::compare_field(row, field, value, |a, b| {
                    compare_values(a, b).map(Ordering::is_ge).unwrap_or(false)
                })
            }
            FilterExpr::In { field, values } => match Self::get_field_value(row, field) {
                Some(fv) => values.iter().any(|v| Self::values_equal(fv, v)),
                None => false,
            },
            FilterExpr::NotIn { field, values } => match Self::get_field_value(row, field) {
                Some(fv) => !values.iter().any(|v| Self::values_equal(fv, v)),
                None => true, // NULL is not in any set
            },
            FilterExpr::IsNull { field } => Self::get_field_value(row, field).is_none(),
            FilterExpr::IsNotNull { field } => Self::get_field_value(row, field).is_some(),
            FilterExpr::Like { field, pattern } => match Self::get_field_value(row, field) {
                Some(Value::String(s)) => Self::like_match(s, pattern),
                _ => false,
            },
            FilterExpr::And(filters) => filters.iter().all(|f| Self::evaluate(f, row)),
            FilterExpr::Or(filters) => filters.iter().any(|f| Self::evaluate(f, row)),
            FilterExpr::Not(inner) => !Self::evaluate(inner, row),
        }
    }

    /// Get a non-null field value from a row by name.
    fn get_field_value<'a>(row: &'a Row, field: &str) -> Option<&'a Value> {
        row.get(field).filter(|v| !v.is_null())
    }

    /// Compare a field value with a comparator function.
    fn compare_field<F>(row: &Row, field: &str, value: &Value, comparator: F) -> bool
    where
        F: FnOnce(&Value, &Value) -> bool,
    {
        match Self::get_field_value(row, field) {
            Some(fv) => comparator(fv, value),
            None => false, // NULL never compares
        }
    }

    /// Check if two values are equal.
    pub(crate) fn values_equal(a: &Value, b: &Value) -> bool {
        match (a, b) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int32(a), Value::Int32(b)) => a == b,
            (Value::Int64(a), Value::Int64(b)) => a == b,
            (Value::Int32(a), Value::Int64(b)) => i64::from(*a) == *b,
            (Value::Int64(a), Value::Int32(b)) => *a == i64::from(*b),
            (Value::Float64(a), Value::Float64(b)) => a == b,
            (Value::Float64(a), Value::Int32(b)) => *a == f64::from(*b),
            (Value::Int32(a), Value::Float64(b)) => f64::from(*a) == *b,
            (Value::Float64(a), Value::Int64(b)) => *a == *b as f64,
            (Value::Int64(a), Value::Float64(b)) => *a as f64 == *b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Timestamp(a), Value::Timestamp(b)) => a == b,
            (Value::Uuid(a), Value::Uuid(b)) => a == b,
            (Value::Json(a), Value::Json(b)) => a == b,
            _ => false,
        }
    }

    /// Match a string against a SQL LIKE pattern.
    ///
    /// Supports:
    /// - `%` matches zero or more characters
    /// - `_` matches exactly one character
    /// - `\\%` / `\\_` match the literal character
    pub fn like_match(value: &str, pattern: &str) -> bool {
        let value: Vec<char> = value.chars().collect();
        let pattern: Vec<char> = pattern.chars().collect();
        Self::like_match_from(&value, &pattern)
    }

    fn like_match_from(value: &[char], pattern: &[char]) -> bool {
        match pattern.split_first() {
            None => value.is_empty(),
            Some(('%', rest)) => {
                if rest.is_empty() {
                    return true;
                }
                (0..=value.len()).any(|skip| Self::like_match_from(&value[skip..], rest))
            }
            Some(('_', rest)) => !value.is_empty() && Self::like_match_from(&value[1..], rest),
            Some(('\\', rest)) => match (rest.split_first(), value.split_first()) {
                (Some((p, rest)), Some((c, tail))) if p == c => Self::like_match_from(tail, rest),
                _ => false,
            },
            Some((p, rest)) => match value.split_first() {
                Some((c, tail)) if c == p => Self::like_match_from(tail, rest),
                _ => false,
            },
        }
    }
}

/// Compare two values, returning their ordering if comparable.
pub(crate) fn compare_values(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
        (Value::Int32(a), Value::Int32(b)) => Some(a.cmp(b)),
        (Value::Int64(a), Value::Int64(b)) => Some(a.cmp(b)),
        (Value::Int32(a), Value::Int64(b)) => Some(i64::from(*a).cmp(b)),
        (Value::Int64(a), Value::Int32(b)) => Some(a.cmp(&i64::from(*b))),
        (Value::Float64(a), Value::Float64(b)) => a.partial_cmp(b),
        (Value::Float64(a), Value::Int64(b)) => a.partial_cmp(&(*b as f64)),
        (Value::Int64(a), Value::Float64(b)) => (*a as f64).partial_cmp(b),
        (Value::Float64(a), Value::Int32(b)) => a.partial_cmp(&f64::from(*b)),
        (Value::Int32(a), Value::Float64(b)) => f64::from(*a).partial_cmp(b),
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        (Value::Timestamp(a), Value::Timestamp(b)) => Some(a.cmp(b)),
        (Value::Uuid(a), Value::Uuid(b)) => Some(a.cmp(b)),
        _ => None, // Incompatible types
    }
}

/// Total ordering used when sorting rows: nulls (or missing) first, then by value.
pub(crate) fn sort_order(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    let a = a.filter(|v| !v.is_null());
    let b = b.filter(|v| !v.is_null());
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(a), Some(b)) => compare_values(a, b).unwrap_or(Ordering::Equal),
    }
}
