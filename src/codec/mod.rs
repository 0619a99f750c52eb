//! Temporal codec - domain `Value` ⇄ wire `WireValue`.
//!
//! Walks a value tree and swaps calendar timestamps for backend temporal
//! markers (and back). Every other scalar passes through untouched.
//! Inputs are borrowed; the codec always builds a new tree.
//!
//! On the way out, the `id` key is dropped from every mapping at every
//! depth. Identifiers are addressing, not payload.
//!
//! Markers have no leap seconds. A leap-second instant (chrono's
//! `subsec_nanos >= 1_000_000_000`) is encoded as the same offset into the
//! following second, so it does not round-trip exactly.

use chrono::{DateTime, Utc};

use crate::model::{FieldMap, TemporalMarker, Value, WireMap, WireValue, ID_FIELD};
use crate::{Error, Result};

/// Stateless converter between the domain and wire representations.
#[derive(Debug, Clone, Copy, Default)]
pub struct TemporalCodec;

impl TemporalCodec {
    /// Domain → wire.
    pub fn to_wire(value: &Value) -> WireValue {
        match value {
            Value::Null => WireValue::Null,
            Value::Bool(b) => WireValue::Bool(*b),
            Value::Int(i) => WireValue::Int(*i),
            Value::Float(f) => WireValue::Float(*f),
            Value::String(s) => WireValue::String(s.clone()),
            Value::List(items) => WireValue::Array(items.iter().map(Self::to_wire).collect()),
            Value::Map(m) => WireValue::Map(Self::encode_fields(m)),
            Value::Timestamp(t) => WireValue::Marker(Self::marker_of(t)),
        }
    }

    /// Wire → domain. Fails only on a marker outside the representable
    /// calendar range.
    pub fn to_domain(value: &WireValue) -> Result<Value> {
        Ok(match value {
            WireValue::Null => Value::Null,
            WireValue::Bool(b) => Value::Bool(*b),
            WireValue::Int(i) => Value::Int(*i),
            WireValue::Float(f) => Value::Float(*f),
            WireValue::String(s) => Value::String(s.clone()),
            WireValue::Array(items) => Value::List(
                items.iter().map(Self::to_domain).collect::<Result<_>>()?,
            ),
            WireValue::Map(m) => Value::Map(Self::decode_fields(m)?),
            WireValue::Marker(marker) => Value::Timestamp(Self::instant_of(marker)?),
        })
    }

    /// Encode a document body, dropping the identifier key.
    pub fn encode_fields(fields: &FieldMap) -> WireMap {
        fields
            .iter()
            .filter(|(k, _)| k.as_str() != ID_FIELD)
            .map(|(k, v)| (k.clone(), Self::to_wire(v)))
            .collect()
    }

    pub fn decode_fields(fields: &WireMap) -> Result<FieldMap> {
        fields
            .iter()
            .map(|(k, v)| Ok((k.clone(), Self::to_domain(v)?)))
            .collect()
    }

    /// Marker for `instant`. A leap second folds into the next second.
    pub fn marker_of(instant: &DateTime<Utc>) -> TemporalMarker {
        TemporalMarker::new(instant.timestamp(), instant.timestamp_subsec_nanos())
    }

    pub fn instant_of(marker: &TemporalMarker) -> Result<DateTime<Utc>> {
        DateTime::from_timestamp(marker.seconds(), marker.nanos()).ok_or_else(|| {
            Error::TypeError {
                expected: "Timestamp within calendar range".into(),
                got: format!("marker({}s, {}ns)", marker.seconds(), marker.nanos()),
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{fields, map_value};
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 15, h, m, 0).unwrap()
    }

    #[test]
    fn test_timestamp_becomes_marker() {
        let wire = TemporalCodec::to_wire(&Value::Timestamp(at(10, 0)));
        assert!(matches!(wire, WireValue::Marker(_)));
    }

    #[test]
    fn test_nested_round_trip() {
        let original = map_value([
            ("createdAt", Value::from(at(9, 30))),
            ("tags", Value::from(vec!["a", "b"])),
            (
                "history",
                Value::List(vec![
                    map_value([("at", Value::from(at(10, 1))), ("n", Value::from(1))]),
                    Value::Null,
                ]),
            ),
        ]);
        let back = TemporalCodec::to_domain(&TemporalCodec::to_wire(&original)).unwrap();
        assert_eq!(back, original);
    }

    #[test]
    fn test_id_is_stripped_at_every_depth() {
        let body = fields([
            ("id", Value::from("x")),
            ("a", Value::from(1)),
            ("inner", map_value([("id", Value::from("y")), ("b", Value::from(2))])),
        ]);
        let wire = TemporalCodec::encode_fields(&body);
        assert!(!wire.contains_key("id"));
        let WireValue::Map(inner) = &wire["inner"] else { panic!("inner must stay a map") };
        assert!(!inner.contains_key("id"));
        assert_eq!(inner["b"], WireValue::Int(2));
    }

    #[test]
    fn test_input_is_not_mutated() {
        let body = fields([("id", Value::from("x")), ("when", Value::from(at(8, 0)))]);
        let snapshot = body.clone();
        let _ = TemporalCodec::encode_fields(&body);
        assert_eq!(body, snapshot);
    }

    #[test]
    fn test_subsecond_precision_survives() {
        let t = Utc.timestamp_opt(1_700_000_000, 123_456_789).unwrap();
        let back = TemporalCodec::to_domain(&TemporalCodec::to_wire(&Value::from(t))).unwrap();
        assert_eq!(back, Value::Timestamp(t));
    }

    #[test]
    fn test_leap_second_folds_into_next_second() {
        let leap = Utc.timestamp_opt(1_483_228_799, 1_500_000_000).unwrap();
        let marker = TemporalCodec::marker_of(&leap);
        assert_eq!((marker.seconds(), marker.nanos()), (1_483_228_800, 500_000_000));

        let back = TemporalCodec::to_domain(&TemporalCodec::to_wire(&Value::from(leap))).unwrap();
        assert_eq!(back, Value::Timestamp(Utc.timestamp_opt(1_483_228_800, 500_000_000).unwrap()));
    }

    #[test]
    fn test_out_of_range_marker_is_type_error() {
        let wire = WireValue::Marker(TemporalMarker::new(i64::MAX, 0));
        assert!(matches!(TemporalCodec::to_domain(&wire), Err(Error::TypeError { .. })));
    }
}
