//! UUID-named field resolution.

use serde_json::{json, Value};
use strata_core::uuids;
use strata_schema::{IndexResult, MemoryShard, Schema, ShardSet};

fn shards() -> ShardSet<MemoryShard> {
    ShardSet::new(vec![MemoryShard::new()])
}

fn index(schema: &mut Schema, object: Value) -> IndexResult {
    schema
        .index(&object, None, &shards())
        .expect("document should index")
}

const HEX: &str = "a1b2c3d4-0000-4000-8000-000000000001";

/// Any spelling of a UUID-named field resolves to one canonical schema
/// child.
#[test]
fn spellings_share_one_field() {
    let mut schema = Schema::new(None).unwrap();
    index(&mut schema, json!({HEX: "first"}));
    let uuid = uuids::parse(HEX).unwrap();
    let compact = uuids::compact(&uuid);
    index(&mut schema, json!({compact: "second"}));

    let published = schema.published();
    let map = published.as_object().unwrap();
    let uuid_children: Vec<&String> = map
        .keys()
        .filter(|k| uuids::is_uuid_like(k))
        .collect();
    assert_eq!(uuid_children, vec![HEX], "one canonical child");
}

/// With the default `both` strategy the same value is reachable through
/// the field-derived and the uuid-derived prefix.
#[test]
fn both_strategy_emits_two_streams() {
    let mut schema = Schema::new(None).unwrap();
    let result = index(&mut schema, json!({HEX: {"_keyword": "tagged"}}));
    // One id boolean term, plus two keyword terms (field and uuid
    // streams).
    let keyword_terms = result
        .document
        .terms()
        .keys()
        .filter(|t| t.ends_with(b"tagged"))
        .count();
    assert_eq!(keyword_terms, 2);
}

/// `uuid` strategy keeps only the uuid-derived stream.
#[test]
fn uuid_strategy_single_stream() {
    let mut schema = Schema::new(None).unwrap();
    let result = index(
        &mut schema,
        json!({"_index_uuid_field": "uuid", HEX: {"_keyword": "tagged"}}),
    );
    let keyword_terms = result
        .document
        .terms()
        .keys()
        .filter(|t| t.ends_with(b"tagged"))
        .count();
    assert_eq!(keyword_terms, 1);
}

/// `uuid_field` strategy keeps only the field-name stream.
#[test]
fn uuid_field_strategy_single_stream() {
    let mut schema = Schema::new(None).unwrap();
    let result = index(
        &mut schema,
        json!({"_index_uuid_field": "uuid_field", HEX: {"_keyword": "tagged"}}),
    );
    let keyword_terms = result
        .document
        .terms()
        .keys()
        .filter(|t| t.ends_with(b"tagged"))
        .count();
    assert_eq!(keyword_terms, 1);
}

/// UUID values (not names) are normalized to canonical form in the
/// stored object.
#[test]
fn uuid_values_normalized() {
    let mut schema = Schema::new(None).unwrap();
    let braced = format!("{{{}}}", HEX.to_uppercase());
    let result = index(&mut schema, json!({"ref": braced}));
    assert_eq!(result.object["ref"], json!(HEX));
    assert_eq!(schema.published()["ref"]["_type"], json!("uuid"));
}

/// Disabling uuid detection treats the name as a plain field: the raw
/// spelling is kept instead of the canonical form.
#[test]
fn uuid_detection_toggle() {
    let mut schema = Schema::new(None).unwrap();
    let raw = HEX.to_uppercase();
    let mut object = serde_json::Map::new();
    object.insert("_uuid_detection".to_string(), json!(false));
    object.insert(raw.clone(), json!("plain"));
    index(&mut schema, Value::Object(object));
    let published = schema.published();
    assert!(published.get(&raw).is_some());
    assert!(published.get(HEX).is_none());
}
