//! Leaf value indexing
//!
//! Turns a (specification, leaf value) pair into posting terms, value-slot
//! bytes and accuracy-bucket terms, honoring the specification's index
//! bitset: field terms, global terms, field values, global values. Bucket
//! terms ride with the values quadrants; the global quadrants use the
//! static per-type global specification.

use crate::accuracy_gen;
use crate::document::{Document, SlotValues};
use crate::error::{Error, Result};
use crate::keywords::ReservedWord;
use crate::specification::{global_spec, prefixed, Specification};
use crate::text;
use crate::types::TypeIndex;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use strata_core::{serialise, temporal, uuids, FieldType, Tm};
use strata_spatial::{parse_geometry, Reduced};

/// Maximum serialised length of an indexable term value.
const MAX_TERM_LENGTH: usize = 245;

/// A parsed leaf, ready for term/value emission.
#[derive(Debug, Clone)]
pub(crate) enum Leaf {
    Integer(i64),
    Positive(u64),
    Floating(f64),
    Boolean(bool),
    Keyword(String),
    Str(String),
    Text(String),
    Uuid(uuid::Uuid),
    Date(Tm),
    Datetime(Tm),
    Time(f64),
    Timedelta(f64),
    Geo(Reduced),
}

/// Unwrap `{"_integer": 7}`-style cast envelopes for non-geo types; geo
/// keeps the envelope (the geometry parser consumes it whole).
fn unwrap_cast(value: &Value) -> &Value {
    if let Value::Object(map) = value {
        if map.len() == 1 {
            if let Some((key, inner)) = map.iter().next() {
                if let Some(word) = ReservedWord::parse(key) {
                    if word.cast_type().is_some() && word.geo_cast().is_none() {
                        return inner;
                    }
                }
            }
        }
    }
    value
}

/// Parse a leaf for the specification's concrete type.
pub(crate) fn parse_leaf(spc: &Specification, value: &Value) -> Result<Leaf> {
    let t = spc.sep_types.concrete_type();
    let value = if t == FieldType::Geo { value } else { unwrap_cast(value) };
    Ok(match t {
        FieldType::Integer => Leaf::Integer(
            value
                .as_i64()
                .ok_or_else(|| type_error(spc, value, t))?,
        ),
        FieldType::Positive => Leaf::Positive(
            value
                .as_u64()
                .ok_or_else(|| type_error(spc, value, t))?,
        ),
        FieldType::Floating => Leaf::Floating(
            value
                .as_f64()
                .ok_or_else(|| type_error(spc, value, t))?,
        ),
        FieldType::Boolean => match value {
            Value::Bool(b) => Leaf::Boolean(*b),
            Value::String(s) if s == "true" => Leaf::Boolean(true),
            Value::String(s) if s == "false" => Leaf::Boolean(false),
            _ => return Err(type_error(spc, value, t)),
        },
        FieldType::Keyword => Leaf::Keyword(
            value
                .as_str()
                .ok_or_else(|| type_error(spc, value, t))?
                .to_string(),
        ),
        FieldType::String => Leaf::Str(
            value
                .as_str()
                .ok_or_else(|| type_error(spc, value, t))?
                .to_string(),
        ),
        FieldType::Text => Leaf::Text(
            value
                .as_str()
                .ok_or_else(|| type_error(spc, value, t))?
                .to_string(),
        ),
        FieldType::Uuid => {
            let s = value.as_str().ok_or_else(|| type_error(spc, value, t))?;
            Leaf::Uuid(uuids::parse(s)?)
        }
        FieldType::Date => Leaf::Date(temporal::parse_date(value)?),
        FieldType::Datetime => Leaf::Datetime(temporal::parse_datetime(value)?),
        FieldType::Time => Leaf::Time(temporal::parse_time(value)?),
        FieldType::Timedelta => Leaf::Timedelta(temporal::parse_timedelta(value)?),
        FieldType::Geo => {
            let geometry = parse_geometry(value)?;
            Leaf::Geo(geometry.reduce(spc.error, spc.flags.partials)?)
        }
        other => {
            return Err(Error::serialisation(format!(
                "Cannot index a value of type {other} in {}",
                spc.full_meta_name
            )))
        }
    })
}

fn type_error(spc: &Specification, value: &Value, t: FieldType) -> Error {
    Error::serialisation(format!(
        "Cannot serialise {value} as {t} in {}",
        spc.full_meta_name
    ))
}

impl Leaf {
    /// Serialised bytes for terms and value slots.
    pub(crate) fn serialised(&self, bool_term: bool) -> Result<Vec<u8>> {
        Ok(match self {
            Leaf::Integer(v) => serialise::integer(*v),
            Leaf::Positive(v) => serialise::positive(*v),
            Leaf::Floating(v) => serialise::floating(*v),
            Leaf::Boolean(v) => serialise::boolean(*v),
            Leaf::Keyword(s) => serialise::keyword(s, bool_term),
            Leaf::Str(s) => serialise::keyword(s, false),
            Leaf::Text(s) => serialise::text(s),
            Leaf::Uuid(u) => u.as_bytes().to_vec(),
            Leaf::Date(tm) | Leaf::Datetime(tm) => serialise::timestamp(tm.timestamp()?),
            Leaf::Time(s) | Leaf::Timedelta(s) => serialise::floating(*s),
            Leaf::Geo(reduced) => strata_spatial::serialise_ranges(&reduced.ranges),
        })
    }

    /// The value as stored back into the document's `_value`, normalized
    /// so it round-trips: UUIDs canonical, temporal values ISO-8601.
    pub(crate) fn normalized(&self, original: &Value) -> Value {
        match self {
            Leaf::Uuid(u) => json!(uuids::canonical(u)),
            Leaf::Date(tm) | Leaf::Datetime(tm) => json!(tm.to_iso()),
            Leaf::Time(s) | Leaf::Timedelta(s) => json!(temporal::format_time(*s)),
            _ => original.clone(),
        }
    }
}

/// Index one leaf into the document.
///
/// `pos` is the element's position within its containing array (0 for
/// scalars); it selects the per-position overrides.
pub(crate) fn index_item(
    spc: &Specification,
    doc: &mut Document,
    map_values: &mut BTreeMap<u32, SlotValues>,
    value: &Value,
    pos: usize,
) -> Result<Leaf> {
    let leaf = parse_leaf(spc, value)?;
    let index = spc.index;
    let t = spc.sep_types.concrete_type();
    let global = global_spec(t);

    if index.contains(TypeIndex::FIELD_TERMS) {
        emit_field_terms(spc, doc, &leaf, pos)?;
    }
    if index.contains(TypeIndex::GLOBAL_TERMS) {
        emit_terms(global, doc, &leaf, &global.prefix.field, pos, true)?;
    }
    if index.contains(TypeIndex::FIELD_VALUES) {
        accumulate_value(map_values, spc.slot, &leaf, spc.flags.bool_term)?;
        emit_accuracy(doc, &spc.accuracy, &spc.acc_prefix, &leaf)?;
    }
    if index.contains(TypeIndex::GLOBAL_VALUES) {
        accumulate_value(map_values, global.slot, &leaf, false)?;
        emit_accuracy(doc, &global.accuracy, &global.acc_prefix, &leaf)?;
    }
    Ok(leaf)
}

/// Field terms go out under the field prefix, the uuid prefix when the
/// path crossed a UUID-named field, and every namespace partial prefix.
fn emit_field_terms(
    spc: &Specification,
    doc: &mut Document,
    leaf: &Leaf,
    pos: usize,
) -> Result<()> {
    if !spc.prefix.field.is_empty() {
        emit_terms(spc, doc, leaf, &spc.prefix.field, pos, false)?;
    }
    if !spc.prefix.uuid.is_empty() {
        emit_terms(spc, doc, leaf, &spc.prefix.uuid, pos, false)?;
    }
    for partial in &spc.partial_index_spcs {
        emit_terms(spc, doc, leaf, &partial.prefix, pos, false)?;
    }
    Ok(())
}

/// Emit the term(s) for one leaf under one prefix.
fn emit_terms(
    spc: &Specification,
    doc: &mut Document,
    leaf: &Leaf,
    prefix: &[u8],
    pos: usize,
    global: bool,
) -> Result<()> {
    let bool_term = !global && spc.flags.bool_term;
    match leaf {
        Leaf::Text(s) => {
            text::index_text(doc, s, spc, prefix, pos);
            Ok(())
        }
        Leaf::Geo(reduced) => {
            if reduced.ranges.is_empty() {
                return Ok(());
            }
            // Hash term over the canonical range set.
            let serialised = strata_spatial::serialise_ranges(&reduced.ranges);
            let hash = serialise::fnv1a64(&serialised);
            let term = prefixed(&serialise::positive(hash), prefix, spc.get_ctype());
            doc.add_term(term, spc.weight_at(pos));
            Ok(())
        }
        other => {
            let serialised = other.serialised(bool_term)?;
            if serialised.len() > MAX_TERM_LENGTH {
                if matches!(other, Leaf::Keyword(_)) {
                    return Err(Error::KeywordTooLong {
                        field: spc.full_meta_name.clone(),
                        length: serialised.len(),
                    });
                }
                // Oversize terms of other types are skipped silently.
                return Ok(());
            }
            let term = prefixed(&serialised, prefix, spc.get_ctype());
            if bool_term {
                // Boolean terms carry no position and no weight.
                doc.add_term(term, 0);
            } else if spc.positions_at(pos) {
                doc.add_posting(term, spc.position_at(pos), spc.weight_at(pos));
            } else {
                doc.add_term(term, spc.weight_at(pos));
            }
            Ok(())
        }
    }
}

fn accumulate_value(
    map_values: &mut BTreeMap<u32, SlotValues>,
    slot: u32,
    leaf: &Leaf,
    bool_term: bool,
) -> Result<()> {
    match leaf {
        Leaf::Geo(reduced) => {
            map_values
                .entry(slot)
                .or_insert_with(|| SlotValues::Ranges(Vec::new()))
                .add_ranges(&reduced.ranges);
        }
        other => {
            map_values
                .entry(slot)
                .or_insert_with(|| SlotValues::Bytes(Default::default()))
                .add_bytes(other.serialised(bool_term)?);
        }
    }
    Ok(())
}

fn emit_accuracy(
    doc: &mut Document,
    accuracy: &[u64],
    acc_prefix: &[Vec<u8>],
    leaf: &Leaf,
) -> Result<()> {
    match leaf {
        Leaf::Integer(v) => accuracy_gen::integer(doc, accuracy, acc_prefix, *v),
        Leaf::Positive(v) => accuracy_gen::positive(doc, accuracy, acc_prefix, *v),
        Leaf::Floating(v) => accuracy_gen::floating(doc, accuracy, acc_prefix, *v),
        Leaf::Date(tm) | Leaf::Datetime(tm) => accuracy_gen::date(doc, accuracy, acc_prefix, tm)?,
        Leaf::Time(s) | Leaf::Timedelta(s) => accuracy_gen::time(doc, accuracy, acc_prefix, *s),
        Leaf::Geo(reduced) => accuracy_gen::geo(doc, accuracy, acc_prefix, &reduced.ranges),
        _ => {}
    }
    Ok(())
}

/// Append a normalized leaf to a stored object's `_value` slot:
/// nothing yet becomes the scalar, an array pushes, a scalar wraps.
pub(crate) fn add_value(data: &mut Value, normalized: Value) {
    match &mut *data {
        Value::Null => *data = normalized,
        Value::Array(items) => items.push(normalized),
        scalar => {
            let previous = std::mem::replace(scalar, Value::Null);
            *data = json!([previous, normalized]);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::specification::{field_prefix, slot_for, BAD_SLOT};
    use strata_core::SepTypes;

    fn concrete_spec(t: FieldType, name: &str) -> Specification {
        let mut spc = Specification::default();
        spc.sep_types = SepTypes::concrete(t);
        spc.flags.concrete = true;
        spc.meta_name = name.to_string();
        spc.full_meta_name = name.to_string();
        spc.prefix.field = field_prefix(name);
        spc.slot = slot_for(&spc.prefix.field, t.ctype());
        spc
    }

    #[test]
    fn field_terms_and_values() {
        let spc = concrete_spec(FieldType::Positive, "age");
        let mut doc = Document::new();
        let mut map_values = BTreeMap::new();
        index_item(&spc, &mut doc, &mut map_values, &json!(39), 0).unwrap();
        let term = prefixed(
            &serialise::positive(39),
            &spc.prefix.field,
            FieldType::Positive.ctype(),
        );
        assert!(doc.has_term(&term));
        assert!(map_values.contains_key(&spc.slot));
    }

    #[test]
    fn global_quadrants_use_global_spec() {
        let mut spc = concrete_spec(FieldType::Positive, "age");
        spc.index = TypeIndex::ALL;
        let mut doc = Document::new();
        let mut map_values = BTreeMap::new();
        index_item(&spc, &mut doc, &mut map_values, &json!(39), 0).unwrap();
        let global = global_spec(FieldType::Positive);
        assert!(map_values.contains_key(&global.slot));
        let global_term = prefixed(
            &serialise::positive(39),
            &global.prefix.field,
            FieldType::Positive.ctype(),
        );
        assert!(doc.has_term(&global_term));
    }

    #[test]
    fn keyword_too_long_rejected() {
        let spc = concrete_spec(FieldType::Keyword, "tag");
        let mut doc = Document::new();
        let mut map_values = BTreeMap::new();
        let long = "x".repeat(246);
        let err = index_item(&spc, &mut doc, &mut map_values, &json!(long), 0).unwrap_err();
        assert!(matches!(err, Error::KeywordTooLong { .. }));
    }

    #[test]
    fn oversize_text_tokens_skipped_silently() {
        let spc = concrete_spec(FieldType::Text, "body");
        let mut doc = Document::new();
        let mut map_values = BTreeMap::new();
        let long = "y".repeat(300);
        index_item(&spc, &mut doc, &mut map_values, &json!(long), 0).unwrap();
        assert!(doc.terms().is_empty());
        // Value slot is still written.
        assert!(map_values.contains_key(&spc.slot));
    }

    #[test]
    fn cast_envelope_unwrapped() {
        let spc = concrete_spec(FieldType::Integer, "n");
        let mut doc = Document::new();
        let mut map_values = BTreeMap::new();
        index_item(&spc, &mut doc, &mut map_values, &json!({"_integer": -5}), 0).unwrap();
        let term = prefixed(
            &serialise::integer(-5),
            &spc.prefix.field,
            FieldType::Integer.ctype(),
        );
        assert!(doc.has_term(&term));
    }

    #[test]
    fn uuid_normalized_for_storage() {
        let spc = concrete_spec(FieldType::Uuid, "ref");
        let leaf = parse_leaf(&spc, &json!("{00000000-0000-1000-8000-C97562616C75}")).unwrap();
        assert_eq!(
            leaf.normalized(&json!("{00000000-0000-1000-8000-C97562616C75}")),
            json!("00000000-0000-1000-8000-c97562616c75")
        );
    }

    #[test]
    fn datetime_value_roundtrips_iso() {
        let spc = concrete_spec(FieldType::Datetime, "when");
        let leaf = parse_leaf(&spc, &json!("2015-04-10T12:00:00")).unwrap();
        assert_eq!(
            leaf.normalized(&json!("2015-04-10T12:00:00")),
            json!("2015-04-10T12:00:00")
        );
    }

    #[test]
    fn add_value_policy() {
        let mut data = Value::Null;
        add_value(&mut data, json!("a"));
        assert_eq!(data, json!("a"));
        add_value(&mut data, json!("b"));
        assert_eq!(data, json!(["a", "b"]));
        add_value(&mut data, json!("c"));
        assert_eq!(data, json!(["a", "b", "c"]));
    }

    #[test]
    fn geo_slot_merges_by_union() {
        let mut spc = concrete_spec(FieldType::Geo, "place");
        spc.index = TypeIndex::FIELD_VALUES;
        let mut doc = Document::new();
        let mut map_values = BTreeMap::new();
        let point = json!({"_point": {"_latitude": 19.32, "_longitude": -99.55}});
        index_item(&spc, &mut doc, &mut map_values, &point, 0).unwrap();
        let once = map_values[&spc.slot].join();
        index_item(&spc, &mut doc, &mut map_values, &point, 0).unwrap();
        assert_eq!(map_values[&spc.slot].join(), once);
        assert_ne!(spc.slot, BAD_SLOT);
    }
}
