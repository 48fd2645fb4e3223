use crate::core::value::Value;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::{cmp::Ordering, fmt};

/// Persisted progress marker of an incremental source.
///
/// Values of the same variant are totally ordered; values of different
/// variants are incomparable, which callers treat as "cannot advance".
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Hash)]
pub enum CursorValue {
    Int(i64),
    Text(String),
    Timestamp(DateTime<Utc>),
    Date(NaiveDate),
}

impl CursorValue {
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Int(v) => Some(CursorValue::Int(*v)),
            Value::Uint(v) => i64::try_from(*v).ok().map(CursorValue::Int),
            Value::String(v) => Some(CursorValue::Text(v.clone())),
            Value::Timestamp(v) => Some(CursorValue::Timestamp(*v)),
            Value::Date(v) => Some(CursorValue::Date(*v)),
            _ => None,
        }
    }

    pub fn to_value(&self) -> Value {
        match self {
            CursorValue::Int(v) => Value::Int(*v),
            CursorValue::Text(v) => Value::String(v.clone()),
            CursorValue::Timestamp(v) => Value::Timestamp(*v),
            CursorValue::Date(v) => Value::Date(*v),
        }
    }

    /// Returns the greater of two cursors, keeping `self` when they are incomparable.
    pub fn max_with(self, other: CursorValue) -> CursorValue {
        match self.partial_cmp(&other) {
            Some(Ordering::Less) => other,
            _ => self,
        }
    }
}

impl PartialOrd for CursorValue {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        use CursorValue::*;
        match (self, other) {
            (Int(a), Int(b)) => Some(a.cmp(b)),
            (Text(a), Text(b)) => Some(a.cmp(b)),
            (Timestamp(a), Timestamp(b)) => Some(a.cmp(b)),
            (Date(a), Date(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }
}

impl fmt::Display for CursorValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CursorValue::Int(v) => write!(f, "{v}"),
            CursorValue::Text(v) => write!(f, "{v}"),
            CursorValue::Timestamp(v) => write!(f, "{}", v.to_rfc3339()),
            CursorValue::Date(v) => write!(f, "{v}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn max_with_keeps_larger_value() {
        assert_eq!(CursorValue::Int(3).max_with(CursorValue::Int(9)), CursorValue::Int(9));
        assert_eq!(CursorValue::Int(9).max_with(CursorValue::Int(3)), CursorValue::Int(9));
    }

    #[test]
    fn mixed_variants_are_incomparable() {
        let a = CursorValue::Int(1);
        let b = CursorValue::Text("1".into());
        assert_eq!(a.partial_cmp(&b), None);
        assert_eq!(a.clone().max_with(b), a);
    }
}
