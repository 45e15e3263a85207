//! User-facing schema view
//!
//! Strips the storage-internal properties before handing the schema back:
//! prefixes, slots and accuracy prefixes are derivation details, the
//! stem language is shown only when it differs from the language, and
//! date accuracies render as unit names instead of raw seconds.

use crate::keywords::ReservedWord;
use serde_json::{json, Map, Value};
use strata_core::{FieldType, UnitTime};

/// Render the persisted schema for a user.
pub fn readable(schema: &Value) -> Value {
    clean_node(schema, true)
}

fn clean_node(node: &Value, root: bool) -> Value {
    let Some(map) = node.as_object() else {
        return node.clone();
    };
    let field_type = map
        .get("_type")
        .and_then(Value::as_str)
        .and_then(|s| strata_core::parse_type(s).ok())
        .map(|sep| sep.concrete_type());
    let language = map.get("_language").and_then(Value::as_str);

    let mut out = Map::new();
    for (key, value) in map {
        match key.as_str() {
            // Storage internals.
            "_prefix" | "_slot" | "_acc_prefix" => continue,
            // Root-only defaults.
            "_id" | "_version" if root => continue,
            "_stem_language" => {
                if value.as_str() != language {
                    out.insert(key.clone(), value.clone());
                }
            }
            "_accuracy" => {
                out.insert(key.clone(), readable_accuracy(value, field_type));
            }
            "_script" => {
                out.insert(key.clone(), clean_node(value, false));
            }
            _ if key.starts_with('_') => {
                out.insert(key.clone(), value.clone());
            }
            // Child fields.
            _ if ReservedWord::parse(key).is_none() => {
                out.insert(key.clone(), clean_node(value, false));
            }
            _ => {
                out.insert(key.clone(), value.clone());
            }
        }
    }
    Value::Object(out)
}

/// Date and datetime accuracies read back as unit names.
fn readable_accuracy(value: &Value, field_type: Option<FieldType>) -> Value {
    let date_like = matches!(
        field_type,
        Some(FieldType::Date) | Some(FieldType::Datetime)
    );
    if !date_like {
        return value.clone();
    }
    let Some(items) = value.as_array() else {
        return value.clone();
    };
    Value::Array(
        items
            .iter()
            .map(|item| {
                item.as_u64()
                    .and_then(UnitTime::from_seconds)
                    .map(|unit| json!(unit.as_str()))
                    .unwrap_or_else(|| item.clone())
            })
            .collect(),
    )
}
