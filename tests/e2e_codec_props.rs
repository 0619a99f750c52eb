//! Property tests for the temporal codec and query evaluation.

use chrono::{TimeZone, Utc};
use docstore::{FieldMap, FilterOp, QueryOptions, TemporalCodec, Value, WireDocument};
use proptest::prelude::*;

// ============================================================================
// Strategies
// ============================================================================

fn arb_value() -> impl Strategy<Value = Value> {
    let leaf = prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(Value::Int),
        (-1.0e12f64..1.0e12).prop_map(Value::Float),
        "[a-z ]{0,12}".prop_map(Value::String),
        // nanos below 1e9 keeps leap seconds out; those fold into the next second.
        (0i64..4_000_000_000, 0u32..1_000_000_000)
            .prop_map(|(s, n)| Value::Timestamp(Utc.timestamp_opt(s, n).unwrap())),
    ];
    leaf.prop_recursive(3, 24, 4, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..4).prop_map(Value::List),
            prop::collection::hash_map(arb_key(), inner, 0..4).prop_map(Value::Map),
        ]
    })
}

/// Field names that are never the reserved `id`.
fn arb_key() -> impl Strategy<Value = String> {
    "[a-hj-z][a-z]{0,5}"
}

fn arb_fields() -> impl Strategy<Value = FieldMap> {
    prop::collection::hash_map(arb_key(), arb_value(), 0..6)
}

fn arb_docs() -> impl Strategy<Value = Vec<WireDocument>> {
    prop::collection::vec((0i64..5, prop::collection::vec("[abc]", 0..3)), 0..12).prop_map(|rows| {
        rows.into_iter()
            .enumerate()
            .map(|(i, (level, tags))| {
                let fields: FieldMap =
                    [("level".to_string(), Value::from(level)), ("tags".to_string(), Value::from(tags))].into();
                WireDocument { id: format!("d{i}"), fields: TemporalCodec::encode_fields(&fields) }
            })
            .collect()
    })
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    #[test]
    fn prop_codec_round_trip(fields in arb_fields()) {
        let wire = TemporalCodec::encode_fields(&fields);
        let back = TemporalCodec::decode_fields(&wire).unwrap();
        prop_assert_eq!(back, fields);
    }

    #[test]
    fn prop_encoded_maps_never_carry_id(fields in arb_fields(), id in "[a-z0-9]{1,8}") {
        let mut fields = fields;
        fields.insert("id".to_string(), Value::from(id));
        let wire = TemporalCodec::encode_fields(&fields);
        prop_assert!(!wire.contains_key("id"));
    }

    #[test]
    fn prop_filter_order_does_not_matter(docs in arb_docs(), min in 0i64..5, tag in "[abc]") {
        let a = QueryOptions::new()
            .filter("level", FilterOp::Ge, min)
            .filter("tags", FilterOp::ArrayContains, tag.as_str())
            .to_wire(None)
            .unwrap();
        let b = QueryOptions::new()
            .filter("tags", FilterOp::ArrayContains, tag.as_str())
            .filter("level", FilterOp::Ge, min)
            .to_wire(None)
            .unwrap();
        prop_assert_eq!(a.evaluate(&docs), b.evaluate(&docs));
    }

    #[test]
    fn prop_limit_is_a_prefix(docs in arb_docs(), limit in 1usize..6) {
        let all = QueryOptions::new().to_wire(None).unwrap().evaluate(&docs);
        let some = QueryOptions::new().limit(limit).to_wire(None).unwrap().evaluate(&docs);
        prop_assert_eq!(&all[..limit.min(all.len())], &some[..]);
    }
}
