use crate::types::Value;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Column-level predicates for [`Table::filter_where`](crate::Table::filter_where).
///
/// Ordering comparisons only hold between values of the same variant; a
/// comparison against a value of another variant, or against null, is false.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ColumnPredicate {
    Equal(Value),
    NotEqual(Value),
    Greater(Value),
    Less(Value),
    GreaterEqual(Value),
    LessEqual(Value),
    IsNull,
    IsNotNull,
}

impl ColumnPredicate {
    pub fn evaluate(&self, value: &Value) -> bool {
        match self {
            ColumnPredicate::Equal(target) => value == target,
            ColumnPredicate::NotEqual(target) => value != target,
            ColumnPredicate::Greater(target) => {
                matches!(ordered(value, target), Some(Ordering::Greater))
            }
            ColumnPredicate::Less(target) => matches!(ordered(value, target), Some(Ordering::Less)),
            ColumnPredicate::GreaterEqual(target) => matches!(
                ordered(value, target),
                Some(Ordering::Greater | Ordering::Equal)
            ),
            ColumnPredicate::LessEqual(target) => matches!(
                ordered(value, target),
                Some(Ordering::Less | Ordering::Equal)
            ),
            ColumnPredicate::IsNull => value.is_null(),
            ColumnPredicate::IsNotNull => !value.is_null(),
        }
    }
}

// Only integers, floats, text and booleans are ordered.
fn ordered(value: &Value, target: &Value) -> Option<Ordering> {
    match (value, target) {
        (Value::Null, _) | (_, Value::Null) => None,
        (Value::Other(_), _) | (_, Value::Other(_)) => None,
        _ => value.partial_cmp(target),
    }
}
