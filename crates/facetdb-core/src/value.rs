//! Closed index-value vocabulary.
//!
//! Index fields carry a `Value`, not an open generic: the enum keeps every
//! bucket key totally ordered and lets one index name hold buckets for
//! several value families without any query-time type errors.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

///
/// Value
///
/// A single index field value. Totally ordered: variants compare by
/// canonical rank first, then by their payload within the same variant.
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub enum Value {
    Bool(bool),
    Int(i64),
    /// Ordered list of values. Used for composite keys (coordinates,
    /// tuples); list order is significant.
    List(Vec<Self>),
    Text(String),
    Uint(u64),
    Unit,
}

impl Value {
    /// Coarse family classification; one index page exists per
    /// (index name, family) pair.
    #[must_use]
    pub const fn family(&self) -> ValueFamily {
        match self {
            Self::Bool(_) => ValueFamily::Bool,
            Self::Int(_) => ValueFamily::Int,
            Self::List(_) => ValueFamily::List,
            Self::Text(_) => ValueFamily::Text,
            Self::Uint(_) => ValueFamily::Uint,
            Self::Unit => ValueFamily::Unit,
        }
    }

    // Stable cross-variant rank. Part of deterministic query behavior;
    // must not change once buckets depend on it.
    const fn canonical_rank(&self) -> u8 {
        match self {
            Self::Bool(_) => 0,
            Self::Int(_) => 1,
            Self::Uint(_) => 2,
            Self::Text(_) => 3,
            Self::List(_) => 4,
            Self::Unit => 5,
        }
    }
}

impl Ord for Value {
    fn cmp(&self, other: &Self) -> Ordering {
        let rank = self.canonical_rank().cmp(&other.canonical_rank());
        if rank != Ordering::Equal {
            return rank;
        }

        match (self, other) {
            (Self::Bool(a), Self::Bool(b)) => a.cmp(b),
            (Self::Int(a), Self::Int(b)) => a.cmp(b),
            (Self::List(a), Self::List(b)) => a.cmp(b),
            (Self::Text(a), Self::Text(b)) => a.cmp(b),
            (Self::Uint(a), Self::Uint(b)) => a.cmp(b),
            // Equal ranks imply equal variants; Unit is the only remaining case.
            _ => Ordering::Equal,
        }
    }
}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

///
/// ValueFamily
///
/// Coarse value classification used for index page routing. The same index
/// name used with incompatible families lands in distinct pages by design.
///

#[derive(Clone, Copy, Debug, Deserialize, Eq, Ord, PartialEq, PartialOrd, Serialize)]
pub enum ValueFamily {
    Bool,
    Int,
    List,
    Text,
    Uint,
    Unit,
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Self::Int(i64::from(v))
    }
}

impl From<u64> for Value {
    fn from(v: u64) -> Self {
        Self::Uint(v)
    }
}

impl From<u32> for Value {
    fn from(v: u32) -> Self {
        Self::Uint(u64::from(v))
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

impl From<()> for Value {
    fn from((): ()) -> Self {
        Self::Unit
    }
}

impl<T: Into<Self>> From<Vec<T>> for Value {
    fn from(vs: Vec<T>) -> Self {
        Self::List(vs.into_iter().map(Into::into).collect())
    }
}

impl<A: Into<Self>, B: Into<Self>> From<(A, B)> for Value {
    fn from((a, b): (A, B)) -> Self {
        Self::List(vec![a.into(), b.into()])
    }
}

impl<A: Into<Self>, B: Into<Self>, C: Into<Self>> From<(A, B, C)> for Value {
    fn from((a, b, c): (A, B, C)) -> Self {
        Self::List(vec![a.into(), b.into(), c.into()])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn family_follows_variant() {
        assert_eq!(Value::from(true).family(), ValueFamily::Bool);
        assert_eq!(Value::from(-3i64).family(), ValueFamily::Int);
        assert_eq!(Value::from(3u64).family(), ValueFamily::Uint);
        assert_eq!(Value::from("a").family(), ValueFamily::Text);
        assert_eq!(Value::from((1, 2)).family(), ValueFamily::List);
        assert_eq!(Value::from(()).family(), ValueFamily::Unit);
    }

    #[test]
    fn cross_family_order_is_rank_stable() {
        let mut values = vec![
            Value::Unit,
            Value::from("a"),
            Value::from(7u64),
            Value::from(-1),
            Value::from(false),
            Value::from((1, 1)),
        ];
        values.sort();

        let families: Vec<ValueFamily> = values.iter().map(Value::family).collect();
        assert_eq!(
            families,
            vec![
                ValueFamily::Bool,
                ValueFamily::Int,
                ValueFamily::Uint,
                ValueFamily::Text,
                ValueFamily::List,
                ValueFamily::Unit,
            ]
        );
    }

    #[test]
    fn same_family_order_is_payload_order() {
        assert!(Value::from(1) < Value::from(2));
        assert!(Value::from("ant") < Value::from("bat"));
        assert!(Value::from((1, 2)) < Value::from((1, 3)));
        assert!(Value::from((1, 2)) < Value::from((2, 0)));
    }

    #[test]
    fn tuples_convert_to_ordered_lists() {
        assert_eq!(
            Value::from((4, "north")),
            Value::List(vec![Value::Int(4), Value::Text("north".to_string())])
        );
    }

    #[test]
    fn value_round_trips_through_json() {
        let value = Value::from((true, 12, "marker"));
        let encoded = serde_json::to_string(&value).expect("value should encode");
        let decoded: Value = serde_json::from_str(&encoded).expect("value should decode");

        assert_eq!(decoded, value);
    }
}
