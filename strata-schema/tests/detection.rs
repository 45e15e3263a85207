//! Dynamic type detection and its toggles.

use proptest::prelude::*;
use serde_json::{json, Value};
use strata_schema::{Error, MemoryShard, Schema, ShardSet};

fn shards() -> ShardSet<MemoryShard> {
    ShardSet::new(vec![MemoryShard::new()])
}

fn detected_type(object: Value) -> String {
    let mut schema = Schema::new(None).unwrap();
    schema.index(&object, None, &shards()).unwrap();
    let published = schema.published();
    let map = published.as_object().unwrap();
    let field = map
        .iter()
        .find(|(k, _)| !k.starts_with('_'))
        .expect("field created");
    field.1["_type"].as_str().unwrap().to_string()
}

#[test]
fn value_shapes_map_to_types() {
    assert_eq!(detected_type(json!({"f": 39})), "positive");
    assert_eq!(detected_type(json!({"f": -39})), "integer");
    assert_eq!(detected_type(json!({"f": 39.5})), "floating");
    assert_eq!(detected_type(json!({"f": true})), "boolean");
    assert_eq!(detected_type(json!({"f": "true"})), "boolean");
    assert_eq!(detected_type(json!({"f": "2015-04-10"})), "date");
    assert_eq!(
        detected_type(json!({"f": "2015-04-10T12:00:00"})),
        "datetime"
    );
    assert_eq!(detected_type(json!({"f": "12:04:00"})), "time");
    assert_eq!(detected_type(json!({"f": "+05:30:00"})), "timedelta");
    assert_eq!(
        detected_type(json!({"f": "a1b2c3d4-0000-4000-8000-000000000001"})),
        "uuid"
    );
    assert_eq!(
        detected_type(json!({"f": "POINT (-99.55 19.32)"})),
        "geospatial"
    );
    assert_eq!(detected_type(json!({"f": "loose words"})), "text");
}

#[test]
fn toggles_disable_branches() {
    // With date detection off an ISO date falls through to text.
    assert_eq!(
        detected_type(json!({"_date_detection": false, "f": "2015-04-10"})),
        "text"
    );
    // With geo detection off EWKT is plain text.
    assert_eq!(
        detected_type(json!({"_geo_detection": false, "f": "POINT (1 2)"})),
        "text"
    );
    // With bool detection off the string "true" is text.
    assert_eq!(
        detected_type(json!({"_bool_detection": false, "f": "true"})),
        "text"
    );
}

#[test]
fn numeric_detection_off_rejects_numbers() {
    let mut schema = Schema::new(None).unwrap();
    let err = schema
        .index(
            &json!({"_numeric_detection": false, "f": 5}),
            None,
            &shards(),
        )
        .unwrap_err();
    assert!(matches!(err, Error::Serialisation(_)), "{err:?}");
}

#[test]
fn strict_mode_rejects_undeclared() {
    let mut schema = Schema::new(None).unwrap();
    let err = schema
        .index(&json!({"_strict": true, "f": 5}), None, &shards())
        .unwrap_err();
    assert!(matches!(err, Error::MissingType(_)));

    // Declared fields are fine under strict mode.
    schema
        .index(
            &json!({"_strict": true, "g": {"_type": "integer", "_value": 5}}),
            None,
            &shards(),
        )
        .unwrap();
}

#[test]
fn dynamic_off_rejects_new_fields() {
    let mut schema = Schema::new(None).unwrap();
    schema
        .update(&json!({"_schema": {
            "_dynamic": false,
            "known": {"_type": "positive"},
        }}))
        .unwrap();
    schema
        .index(&json!({"known": 3}), None, &shards())
        .unwrap();
    let err = schema
        .index(&json!({"unknown": 3}), None, &shards())
        .unwrap_err();
    assert!(err.to_string().contains("dynamic"), "{err}");
}

proptest! {
    /// The first non-null value fixes the concrete type; any later value
    /// either serialises under it or fails, but the persisted type never
    /// changes.
    #[test]
    fn concrete_type_is_sticky(values in proptest::collection::vec(
        prop_oneof![
            any::<i64>().prop_map(|n| json!(n)),
            any::<bool>().prop_map(|b| json!(b)),
            "[a-z ]{1,12}".prop_map(|s| json!(s)),
        ],
        1..6,
    )) {
        let mut schema = Schema::new(None).unwrap();
        let shards = shards();
        let mut fixed: Option<String> = None;
        for value in values {
            let outcome = schema.index(&json!({"f": value}), None, &shards);
            let published = schema.published();
            let current = published["f"]["_type"].as_str().map(str::to_string);
            match (&fixed, current, outcome) {
                (None, Some(t), Ok(_)) => fixed = Some(t),
                (Some(t), Some(now), _) => prop_assert_eq!(t, &now),
                (_, None, Ok(_)) => prop_assert!(false, "indexed without a type"),
                (None, None, Err(_)) => {}
                (None, Some(_), Err(_)) => {}
                (Some(_), None, Err(_)) => {}
            }
        }
    }
}
