//! Index bitset quadrants and per-position overrides.

use serde_json::{json, Value};
use strata_core::FieldType;
use strata_schema::{global_spec, IndexResult, MemoryShard, Schema, ShardSet, SLOT_ID};

fn shards() -> ShardSet<MemoryShard> {
    ShardSet::new(vec![MemoryShard::new()])
}

fn index(schema: &mut Schema, object: Value) -> IndexResult {
    schema
        .index(&object, None, &shards())
        .expect("document should index")
}

fn field_slot(schema: &Schema, name: &str) -> u32 {
    schema.published()[name]["_slot"].as_u64().unwrap() as u32
}

/// `_index: none` indexes nothing beyond the document id.
#[test]
fn index_none() {
    let mut schema = Schema::new(None).unwrap();
    let result = index(
        &mut schema,
        json!({"silent": {"_type": "positive", "_index": "none", "_value": 5}}),
    );
    // Only the id boolean term.
    assert_eq!(result.document.terms().len(), 1);
    // Only the id slot.
    assert_eq!(result.document.values().len(), 1);
    assert!(result.document.value(SLOT_ID).is_some());
}

/// `field_terms` alone emits terms but no slot value.
#[test]
fn field_terms_only() {
    let mut schema = Schema::new(None).unwrap();
    let result = index(
        &mut schema,
        json!({"t": {"_type": "positive", "_index": "field_terms", "_value": 5}}),
    );
    let slot = field_slot(&schema, "t");
    assert!(result.document.value(slot).is_none());
    assert!(result.document.terms().len() > 1);
}

/// `field_values` alone writes the slot plus accuracy bucket terms, but
/// no plain field term.
#[test]
fn field_values_only() {
    let mut schema = Schema::new(None).unwrap();
    let result = index(
        &mut schema,
        json!({"v": {"_type": "positive", "_index": "field_values", "_value": 1234}}),
    );
    let slot = field_slot(&schema, "v");
    assert!(result.document.value(slot).is_some());
    // Six default numeric buckets, one term each, plus the id term.
    assert_eq!(result.document.terms().len(), 7);
}

/// Global quadrants land in the shared per-type subspace.
#[test]
fn global_quadrants() {
    let mut schema = Schema::new(None).unwrap();
    let result = index(
        &mut schema,
        json!({"g": {"_type": "positive", "_index": "global", "_value": 9}}),
    );
    let global = global_spec(FieldType::Positive);
    assert!(result.document.value(global.slot).is_some());
    let field_slot = field_slot(&schema, "g");
    assert!(result.document.value(field_slot).is_none());

    // Two fields of the same type share the global slot payload space.
    let mut schema2 = Schema::new(None).unwrap();
    let both = index(
        &mut schema2,
        json!({
            "a": {"_type": "positive", "_index": "global_values", "_value": 1},
            "b": {"_type": "positive", "_index": "global_values", "_value": 2},
        }),
    );
    let payload = both.document.value(global.slot).unwrap();
    let parts = strata_core::serialise::unserialise_string_list(payload).unwrap();
    assert_eq!(parts.len(), 2);
}

/// `terms` is the union of field and global term quadrants.
#[test]
fn terms_alias() {
    let mut schema = Schema::new(None).unwrap();
    let result = index(
        &mut schema,
        json!({"k": {"_type": "keyword", "_index": "terms", "_value": "Zap"}}),
    );
    let matching = result
        .document
        .terms()
        .keys()
        .filter(|t| t.ends_with(b"zap"))
        .count();
    assert_eq!(matching, 2, "field term and global term");
    // No values at all.
    assert_eq!(result.document.values().len(), 1);
}

/// Per-position weight and positions sequences apply modulo length.
#[test]
fn per_position_overrides() {
    let mut schema = Schema::new(None).unwrap();
    let result = index(
        &mut schema,
        json!({"w": {
            "_type": "array/positive",
            "_weight": [5, 1],
            "_positions": true,
            "_position": [100, 200],
            "_value": [7, 7, 7],
        }}),
    );
    // All three elements serialise to the same term; weights 5+1+5,
    // positions 100 and 200.
    let entry = result
        .document
        .terms()
        .iter()
        .find(|(term, _)| term.ends_with(&strata_core::serialise::positive(7)))
        .map(|(_, entry)| entry.clone())
        .expect("term for 7");
    assert_eq!(entry.wdf, 11);
    assert_eq!(entry.positions, vec![100, 200]);
}

/// Text fields honor stop words and stemming strategies end to end.
#[test]
fn text_pipeline() {
    let mut schema = Schema::new(None).unwrap();
    let result = index(
        &mut schema,
        json!({"body": {
            "_type": "text",
            "_value": "the cats are running",
        }}),
    );
    let terms: Vec<String> = result
        .document
        .terms()
        .keys()
        .map(|t| String::from_utf8_lossy(t).into_owned())
        .collect();
    // Stopwords dropped, raw and stem-marked forms present.
    assert!(terms.iter().any(|t| t.ends_with("cats")));
    assert!(terms.iter().any(|t| t.ends_with("Zcat")));
    assert!(terms.iter().any(|t| t.ends_with("running")));
    assert!(!terms.iter().any(|t| t.ends_with("the")));
}

/// Boolean terms carry no weight.
#[test]
fn bool_terms_weightless() {
    let mut schema = Schema::new(None).unwrap();
    let result = index(
        &mut schema,
        json!({"Tag": {"_type": "keyword", "_value": "Exact"}}),
    );
    // Uppercase meta-name defaults the field to a boolean term.
    assert_eq!(schema.published()["Tag"]["_bool_term"], json!(true));
    let entry = result
        .document
        .terms()
        .iter()
        .find(|(term, _)| term.ends_with(b"Exact"))
        .map(|(_, entry)| entry.clone())
        .expect("exact term");
    assert_eq!(entry.wdf, 0);
    assert!(entry.positions.is_empty());
}
