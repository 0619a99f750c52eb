//! Wire value type: what the backend stores and returns.
//!
//! Mirrors `Value` except that instants are carried as an opaque
//! `TemporalMarker` instead of a calendar timestamp.

use std::cmp::Ordering;
use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Backend-native instant: seconds since the Unix epoch plus sub-second nanos.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TemporalMarker {
    seconds: i64,
    nanos: u32,
}

impl TemporalMarker {
    /// Build a marker. `nanos` is normalized into `seconds` when it overflows
    /// one second.
    pub fn new(seconds: i64, nanos: u32) -> Self {
        let carry = (nanos / 1_000_000_000) as i64;
        Self {
            seconds: seconds.saturating_add(carry),
            nanos: nanos % 1_000_000_000,
        }
    }

    pub fn seconds(&self) -> i64 { self.seconds }
    pub fn nanos(&self) -> u32 { self.nanos }
}

/// A map of field names to wire values, as persisted.
pub type WireMap = HashMap<String, WireValue>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value")]
pub enum WireValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    Array(Vec<WireValue>),
    Map(WireMap),
    Marker(TemporalMarker),
}

/// A stored document as the backend returns it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireDocument {
    pub id: String,
    pub fields: WireMap,
}

impl WireValue {
    /// Type class used for cross-type ordering and range-filter matching.
    fn rank(&self) -> u8 {
        match self {
            WireValue::Null => 0,
            WireValue::Bool(_) => 1,
            WireValue::Int(_) | WireValue::Float(_) => 2,
            WireValue::Marker(_) => 3,
            WireValue::String(_) => 4,
            WireValue::Array(_) => 5,
            WireValue::Map(_) => 6,
        }
    }

    pub fn same_class(&self, other: &WireValue) -> bool {
        self.rank() == other.rank()
    }

    fn as_f64(&self) -> Option<f64> {
        match self {
            WireValue::Int(i) => Some(*i as f64),
            WireValue::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Equality with numeric coercion between Int and Float.
    pub fn loose_eq(&self, other: &WireValue) -> bool {
        self.total_cmp(other) == Ordering::Equal
    }

    /// Total order over wire values:
    /// Null < Bool < Number < Marker < String < Array < Map.
    pub fn total_cmp(&self, other: &WireValue) -> Ordering {
        match (self, other) {
            (WireValue::Null, WireValue::Null) => Ordering::Equal,
            (WireValue::Bool(a), WireValue::Bool(b)) => a.cmp(b),
            (WireValue::Int(a), WireValue::Int(b)) => a.cmp(b),
            (a @ (WireValue::Int(_) | WireValue::Float(_)), b @ (WireValue::Int(_) | WireValue::Float(_))) => {
                match (a.as_f64(), b.as_f64()) {
                    (Some(x), Some(y)) => x.total_cmp(&y),
                    _ => Ordering::Equal,
                }
            }
            (WireValue::Marker(a), WireValue::Marker(b)) => a.cmp(b),
            (WireValue::String(a), WireValue::String(b)) => a.cmp(b),
            (WireValue::Array(a), WireValue::Array(b)) => {
                for (x, y) in a.iter().zip(b) {
                    let ord = x.total_cmp(y);
                    if ord != Ordering::Equal {
                        return ord;
                    }
                }
                a.len().cmp(&b.len())
            }
            (WireValue::Map(a), WireValue::Map(b)) => {
                let mut ka: Vec<&String> = a.keys().collect();
                let mut kb: Vec<&String> = b.keys().collect();
                ka.sort();
                kb.sort();
                for (x, y) in ka.iter().zip(&kb) {
                    let ord = x.cmp(y).then_with(|| a[*x].total_cmp(&b[*y]));
                    if ord != Ordering::Equal {
                        return ord;
                    }
                }
                ka.len().cmp(&kb.len())
            }
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_marker_normalizes_nanos() {
        let m = TemporalMarker::new(10, 1_500_000_000);
        assert_eq!(m.seconds(), 11);
        assert_eq!(m.nanos(), 500_000_000);
    }

    #[test]
    fn test_numeric_cross_type_equality() {
        assert!(WireValue::Int(2).loose_eq(&WireValue::Float(2.0)));
        assert!(!WireValue::Int(2).loose_eq(&WireValue::String("2".into())));
    }

    #[test]
    fn test_type_class_ordering() {
        let ordered = [
            WireValue::Null,
            WireValue::Bool(true),
            WireValue::Float(-1.0),
            WireValue::Marker(TemporalMarker::new(0, 0)),
            WireValue::String("a".into()),
            WireValue::Array(vec![]),
            WireValue::Map(WireMap::new()),
        ];
        for pair in ordered.windows(2) {
            assert_eq!(pair[0].total_cmp(&pair[1]), Ordering::Less);
        }
    }

    #[test]
    fn test_marker_ordering() {
        let a = WireValue::Marker(TemporalMarker::new(5, 999));
        let b = WireValue::Marker(TemporalMarker::new(6, 0));
        assert_eq!(a.total_cmp(&b), Ordering::Less);
    }
}
