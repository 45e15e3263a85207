//! Keyword-driven property dispatch
//!
//! Four phases populate or validate a Specification from an object:
//!
//! - **feed**: load persisted schema values; malformed stored data is
//!   `SchemaCorrupt` (with the field's full meta-name)
//! - **process**: apply user-supplied properties; malformed input is
//!   `ClientError`
//! - **write**: process, then mirror the accepted value into the mutable
//!   schema node (new fields only)
//! - **consistency**: locked properties must match what is persisted
//!
//! Exactly one handler runs per key per phase; keys outside the closed
//! vocabulary never reach these functions.

use crate::error::{Error, Result};
use crate::keywords::{ReservedWord, IGNORE_ALL};
use crate::specification::Specification;
use crate::types::{StemStrategy, StopStrategy, TypeIndex, UuidFieldIndex};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde_json::{json, Map, Value};
use strata_core::{format_type, parse_type, UnitTime};

// ---------------------------------------------------------------------------
// Value readers
// ---------------------------------------------------------------------------

/// How a malformed value is reported: user input vs persisted schema.
#[derive(Clone, Copy)]
enum Origin {
    User,
    Stored,
}

fn bad(origin: Origin, spc: &Specification, keyword: &str, detail: String) -> Error {
    match origin {
        Origin::User => Error::client(format!("{detail} for {keyword} in {}", field_label(spc))),
        Origin::Stored => Error::corrupt(spc.full_meta_name.clone(), format!("{detail} for {keyword}")),
    }
}

fn field_label(spc: &Specification) -> String {
    if spc.full_meta_name.is_empty() {
        "the root".to_string()
    } else {
        spc.full_meta_name.clone()
    }
}

fn read_bool(origin: Origin, spc: &Specification, keyword: &str, value: &Value) -> Result<bool> {
    value
        .as_bool()
        .ok_or_else(|| bad(origin, spc, keyword, format!("Expected a boolean, got {value}")))
}

fn read_str<'a>(
    origin: Origin,
    spc: &Specification,
    keyword: &str,
    value: &'a Value,
) -> Result<&'a str> {
    value
        .as_str()
        .ok_or_else(|| bad(origin, spc, keyword, format!("Expected a string, got {value}")))
}

fn read_f64(origin: Origin, spc: &Specification, keyword: &str, value: &Value) -> Result<f64> {
    value
        .as_f64()
        .ok_or_else(|| bad(origin, spc, keyword, format!("Expected a number, got {value}")))
}

fn read_u32(origin: Origin, spc: &Specification, keyword: &str, value: &Value) -> Result<u32> {
    value
        .as_u64()
        .and_then(|n| u32::try_from(n).ok())
        .ok_or_else(|| {
            bad(origin, spc, keyword, format!("Expected a 32-bit unsigned number, got {value}"))
        })
}

/// A number or an array of numbers (the per-position lazy sequences).
fn read_u32_seq(
    origin: Origin,
    spc: &Specification,
    keyword: &str,
    value: &Value,
) -> Result<Vec<u32>> {
    match value {
        Value::Array(items) => items
            .iter()
            .map(|v| read_u32(origin, spc, keyword, v))
            .collect(),
        other => Ok(vec![read_u32(origin, spc, keyword, other)?]),
    }
}

fn read_bool_seq(
    origin: Origin,
    spc: &Specification,
    keyword: &str,
    value: &Value,
) -> Result<Vec<bool>> {
    match value {
        Value::Array(items) => items
            .iter()
            .map(|v| read_bool(origin, spc, keyword, v))
            .collect(),
        other => Ok(vec![read_bool(origin, spc, keyword, other)?]),
    }
}

/// Accuracy entries are magnitudes or calendar unit names.
fn read_accuracy(
    origin: Origin,
    spc: &Specification,
    keyword: &str,
    value: &Value,
) -> Result<Vec<u64>> {
    let items = value
        .as_array()
        .ok_or_else(|| bad(origin, spc, keyword, format!("Expected an array, got {value}")))?;
    items
        .iter()
        .map(|item| match item {
            Value::Number(n) => n.as_u64().ok_or_else(|| {
                bad(origin, spc, keyword, format!("Expected an unsigned magnitude, got {n}"))
            }),
            Value::String(s) => UnitTime::parse(s).map(UnitTime::seconds).map_err(|_| {
                bad(origin, spc, keyword, format!("Invalid accuracy unit {s:?}"))
            }),
            other => Err(bad(origin, spc, keyword, format!("Invalid accuracy entry {other}"))),
        })
        .collect()
}

fn read_prefix_bytes(origin: Origin, spc: &Specification, keyword: &str, value: &Value) -> Result<Vec<u8>> {
    let s = read_str(origin, spc, keyword, value)?;
    match origin {
        // Persisted prefixes are base64 (raw bytes are not JSON-safe).
        Origin::Stored => URL_SAFE_NO_PAD
            .decode(s)
            .map_err(|_| bad(origin, spc, keyword, format!("Invalid prefix encoding {s:?}"))),
        Origin::User => Ok(s.as_bytes().to_vec()),
    }
}

fn read_ignored(origin: Origin, spc: &Specification, keyword: &str, value: &Value) -> Result<Vec<String>> {
    match value {
        Value::Array(items) => items
            .iter()
            .map(|v| read_str(origin, spc, keyword, v).map(str::to_string))
            .collect(),
        other => Ok(vec![read_str(origin, spc, keyword, other)?.to_string()]),
    }
}

/// Encode a prefix for persistence.
pub(crate) fn encode_prefix(prefix: &[u8]) -> String {
    URL_SAFE_NO_PAD.encode(prefix)
}

// ---------------------------------------------------------------------------
// Shared application logic
// ---------------------------------------------------------------------------

/// Apply one property to the specification. Shared by feed and process;
/// only the error origin differs.
fn apply(spc: &mut Specification, word: ReservedWord, value: &Value, origin: Origin) -> Result<()> {
    match word {
        ReservedWord::Type => {
            let sep = parse_type(read_str(origin, spc, "_type", value)?).map_err(|e| match origin {
                Origin::User => Error::from(e),
                Origin::Stored => Error::corrupt(spc.full_meta_name.clone(), e.to_string()),
            })?;
            spc.sep_types = sep;
            if sep.concrete_type() != strata_core::FieldType::Empty {
                spc.flags.concrete = true;
            }
        }
        ReservedWord::Prefix => {
            spc.local_prefix.field = read_prefix_bytes(origin, spc, "_prefix", value)?;
        }
        ReservedWord::Slot => {
            spc.slot = read_u32(origin, spc, "_slot", value)?;
        }
        ReservedWord::Accuracy => {
            let acc = read_accuracy(origin, spc, "_accuracy", value)?;
            match origin {
                Origin::Stored => spc.accuracy = acc,
                Origin::User => spc.doc_acc = Some(acc),
            }
        }
        ReservedWord::AccPrefix => {
            let items = value.as_array().ok_or_else(|| {
                bad(origin, spc, "_acc_prefix", format!("Expected an array, got {value}"))
            })?;
            let prefixes: Vec<Vec<u8>> = items
                .iter()
                .map(|v| read_prefix_bytes(origin, spc, "_acc_prefix", v))
                .collect::<Result<_>>()?;
            match origin {
                Origin::Stored => spc.acc_prefix = prefixes,
                Origin::User => {
                    if spc.doc_acc.is_none() {
                        return Err(bad(
                            origin,
                            spc,
                            "_acc_prefix",
                            "_acc_prefix requires _accuracy".to_string(),
                        ));
                    }
                    spc.doc_acc_prefix = Some(prefixes);
                }
            }
        }
        ReservedWord::Language => {
            spc.language = read_str(origin, spc, "_language", value)?.to_string();
            if spc.stem_language.is_empty() || spc.stem_language == "en" {
                spc.stem_language = spc.language.clone();
            }
        }
        ReservedWord::StemLanguage => {
            spc.stem_language = read_str(origin, spc, "_stem_language", value)?.to_string();
        }
        ReservedWord::StopStrategy => {
            spc.stop_strategy = StopStrategy::parse(read_str(origin, spc, "_stop_strategy", value)?)
                .map_err(|e| bad(origin, spc, "_stop_strategy", e.to_string()))?;
        }
        ReservedWord::StemStrategy => {
            spc.stem_strategy = StemStrategy::parse(read_str(origin, spc, "_stem_strategy", value)?)
                .map_err(|e| bad(origin, spc, "_stem_strategy", e.to_string()))?;
        }
        ReservedWord::Ngram => spc.ngram = read_bool(origin, spc, "_ngram", value)?,
        ReservedWord::CjkNgram => spc.cjk_ngram = read_bool(origin, spc, "_cjk_ngram", value)?,
        ReservedWord::CjkWords => spc.cjk_words = read_bool(origin, spc, "_cjk_words", value)?,
        ReservedWord::BoolTerm => {
            spc.flags.bool_term = read_bool(origin, spc, "_bool_term", value)?;
            spc.flags.has_bool_term = true;
        }
        ReservedWord::Partials => spc.flags.partials = read_bool(origin, spc, "_partials", value)?,
        ReservedWord::GeoError => {
            let error = read_f64(origin, spc, "_error", value)?;
            if !(0.0..=1.0).contains(&error) {
                return Err(bad(origin, spc, "_error", format!("{error} not in [0, 1]")));
            }
            spc.error = error;
        }
        ReservedWord::Index => {
            let index = match value {
                Value::Array(items) => {
                    let mut acc = TypeIndex::NONE;
                    for item in items {
                        acc = acc.union(
                            TypeIndex::parse(read_str(origin, spc, "_index", item)?)
                                .map_err(|e| bad(origin, spc, "_index", e.to_string()))?,
                        );
                    }
                    acc
                }
                other => TypeIndex::parse(read_str(origin, spc, "_index", other)?)
                    .map_err(|e| bad(origin, spc, "_index", e.to_string()))?,
            };
            spc.index = index;
            spc.flags.has_index = true;
        }
        ReservedWord::IndexUuidField => {
            spc.index_uuid_field =
                UuidFieldIndex::parse(read_str(origin, spc, "_index_uuid_field", value)?)
                    .map_err(|e| bad(origin, spc, "_index_uuid_field", e.to_string()))?;
        }
        ReservedWord::Store => {
            // A false anywhere above forces false below.
            let store = read_bool(origin, spc, "_store", value)?;
            spc.flags.store = store && spc.flags.parent_store;
            spc.flags.parent_store = spc.flags.store;
        }
        ReservedWord::Recurse => spc.flags.recurse = read_bool(origin, spc, "_recurse", value)?,
        ReservedWord::Dynamic => spc.flags.dynamic = read_bool(origin, spc, "_dynamic", value)?,
        ReservedWord::Strict => spc.flags.strict = read_bool(origin, spc, "_strict", value)?,
        ReservedWord::DateDetection => {
            spc.flags.date_detection = read_bool(origin, spc, "_date_detection", value)?
        }
        ReservedWord::DatetimeDetection => {
            spc.flags.datetime_detection = read_bool(origin, spc, "_datetime_detection", value)?
        }
        ReservedWord::TimeDetection => {
            spc.flags.time_detection = read_bool(origin, spc, "_time_detection", value)?
        }
        ReservedWord::TimedeltaDetection => {
            spc.flags.timedelta_detection = read_bool(origin, spc, "_timedelta_detection", value)?
        }
        ReservedWord::NumericDetection => {
            spc.flags.numeric_detection = read_bool(origin, spc, "_numeric_detection", value)?
        }
        ReservedWord::GeoDetection => {
            spc.flags.geo_detection = read_bool(origin, spc, "_geo_detection", value)?
        }
        ReservedWord::BoolDetection => {
            spc.flags.bool_detection = read_bool(origin, spc, "_bool_detection", value)?
        }
        ReservedWord::TextDetection => {
            spc.flags.text_detection = read_bool(origin, spc, "_text_detection", value)?
        }
        ReservedWord::UuidDetection => {
            spc.flags.uuid_detection = read_bool(origin, spc, "_uuid_detection", value)?
        }
        ReservedWord::PartialPaths => {
            spc.flags.partial_paths = read_bool(origin, spc, "_partial_paths", value)?;
            spc.flags.has_partial_paths = true;
        }
        ReservedWord::Namespace => {
            spc.flags.is_namespace = read_bool(origin, spc, "_namespace", value)?;
            spc.flags.has_namespace = true;
        }
        ReservedWord::Weight => spc.weight = read_u32_seq(origin, spc, "_weight", value)?,
        ReservedWord::Position => spc.position = read_u32_seq(origin, spc, "_position", value)?,
        ReservedWord::Spelling => spc.spelling = read_bool_seq(origin, spc, "_spelling", value)?,
        ReservedWord::Positions => spc.positions = read_bool_seq(origin, spc, "_positions", value)?,
        ReservedWord::Ignore => {
            for name in read_ignored(origin, spc, "_ignore", value)? {
                if name == IGNORE_ALL {
                    spc.flags.recurse = false;
                }
                spc.ignored.insert(name);
            }
        }
        ReservedWord::Endpoint => {
            spc.endpoint = Some(read_str(origin, spc, "_endpoint", value)?.to_string());
            spc.flags.static_endpoint = matches!(origin, Origin::Stored);
        }
        ReservedWord::ValueKw => {
            spc.value = Some(value.clone());
        }
        ReservedWord::Data | ReservedWord::Settings => {
            // Stored verbatim by the traverser; nothing to apply.
        }
        ReservedWord::Script | ReservedWord::Chai => {
            if cfg!(feature = "scripting") {
                return Err(Error::not_supported("Scripting backend"));
            }
            return Err(Error::not_supported("Scripting"));
        }
        ReservedWord::Schemas => {
            return Err(Error::client("_schemas is not allowed in a schema"));
        }
        ReservedWord::Id | ReservedWord::Version | ReservedWord::Schema => {
            let keyword = match word {
                ReservedWord::Id => "_id",
                ReservedWord::Version => "_version",
                _ => "_schema",
            };
            return Err(bad(
                origin,
                spc,
                keyword,
                "Root-only keyword".to_string(),
            ));
        }
        cast => {
            // Cast objects stash the pending leaf and may fix the type.
            if let Some(t) = cast.cast_type() {
                if !spc.flags.concrete {
                    spc.sep_types.set_concrete(t);
                    spc.flags.concrete = true;
                } else if spc.sep_types.concrete_type() != t {
                    return Err(bad(
                        origin,
                        spc,
                        "_type",
                        format!(
                            "Cast to {t} conflicts with declared type {}",
                            spc.sep_types.concrete_type()
                        ),
                    ));
                }
                spc.value_rec = Some(wrap_cast(cast, value));
            }
        }
    }
    Ok(())
}

/// Keep the cast keyword with its payload so the value indexer knows how
/// to interpret it.
fn wrap_cast(word: ReservedWord, value: &Value) -> Value {
    let key = match word {
        ReservedWord::CastFloat => "_float",
        ReservedWord::CastInteger => "_integer",
        ReservedWord::CastPositive => "_positive",
        ReservedWord::CastBoolean => "_boolean",
        ReservedWord::CastKeyword => "_keyword",
        ReservedWord::CastText => "_text",
        ReservedWord::CastString => "_string",
        ReservedWord::CastDate => "_date",
        ReservedWord::CastTime => "_time",
        ReservedWord::CastTimedelta => "_timedelta",
        ReservedWord::CastDatetime => "_datetime",
        ReservedWord::CastUuid => "_uuid",
        ReservedWord::CastEwkt => "_ewkt",
        ReservedWord::CastPoint => "_point",
        ReservedWord::CastCircle => "_circle",
        ReservedWord::CastConvex => "_convex",
        ReservedWord::CastPolygon => "_polygon",
        ReservedWord::CastChull => "_chull",
        ReservedWord::CastMultipoint => "_multipoint",
        ReservedWord::CastMulticircle => "_multicircle",
        ReservedWord::CastMulticonvex => "_multiconvex",
        ReservedWord::CastMultipolygon => "_multipolygon",
        ReservedWord::CastMultichull => "_multichull",
        ReservedWord::CastGeoCollection => "_geo_collection",
        ReservedWord::CastGeoIntersection => "_geo_intersection",
        _ => "_value",
    };
    json!({ key: value })
}

// ---------------------------------------------------------------------------
// Phases
// ---------------------------------------------------------------------------

/// Populate the specification from persisted schema values.
pub(crate) fn feed(spc: &mut Specification, word: ReservedWord, value: &Value) -> Result<()> {
    apply(spc, word, value, Origin::Stored)
}

/// Apply a user-supplied property.
pub(crate) fn process(spc: &mut Specification, word: ReservedWord, value: &Value) -> Result<()> {
    apply(spc, word, value, Origin::User)
}

/// Process, then mirror the accepted value into the mutable schema node.
pub(crate) fn write(
    spc: &mut Specification,
    word: ReservedWord,
    value: &Value,
    props: &mut Map<String, Value>,
) -> Result<()> {
    process(spc, word, value)?;
    let mirrored: Option<(&str, Value)> = match word {
        ReservedWord::Type => Some(("_type", json!(format_type(&spc.sep_types)))),
        ReservedWord::Language => Some(("_language", json!(spc.language))),
        ReservedWord::StemLanguage => Some(("_stem_language", json!(spc.stem_language))),
        ReservedWord::StopStrategy => Some(("_stop_strategy", json!(spc.stop_strategy.as_str()))),
        ReservedWord::StemStrategy => Some(("_stem_strategy", json!(spc.stem_strategy.as_str()))),
        ReservedWord::Ngram => Some(("_ngram", json!(spc.ngram))),
        ReservedWord::CjkNgram => Some(("_cjk_ngram", json!(spc.cjk_ngram))),
        ReservedWord::CjkWords => Some(("_cjk_words", json!(spc.cjk_words))),
        ReservedWord::BoolTerm => Some(("_bool_term", json!(spc.flags.bool_term))),
        ReservedWord::Partials => Some(("_partials", json!(spc.flags.partials))),
        ReservedWord::GeoError => Some(("_error", json!(spc.error))),
        ReservedWord::Index => Some(("_index", json!(spc.index.as_str()))),
        ReservedWord::IndexUuidField => {
            Some(("_index_uuid_field", json!(spc.index_uuid_field.as_str())))
        }
        ReservedWord::Store => Some(("_store", value.clone())),
        ReservedWord::Recurse => Some(("_recurse", json!(spc.flags.recurse))),
        ReservedWord::Dynamic => Some(("_dynamic", json!(spc.flags.dynamic))),
        ReservedWord::Strict => Some(("_strict", json!(spc.flags.strict))),
        ReservedWord::DateDetection => Some(("_date_detection", json!(spc.flags.date_detection))),
        ReservedWord::DatetimeDetection => {
            Some(("_datetime_detection", json!(spc.flags.datetime_detection)))
        }
        ReservedWord::TimeDetection => Some(("_time_detection", json!(spc.flags.time_detection))),
        ReservedWord::TimedeltaDetection => {
            Some(("_timedelta_detection", json!(spc.flags.timedelta_detection)))
        }
        ReservedWord::NumericDetection => {
            Some(("_numeric_detection", json!(spc.flags.numeric_detection)))
        }
        ReservedWord::GeoDetection => Some(("_geo_detection", json!(spc.flags.geo_detection))),
        ReservedWord::BoolDetection => Some(("_bool_detection", json!(spc.flags.bool_detection))),
        ReservedWord::TextDetection => Some(("_text_detection", json!(spc.flags.text_detection))),
        ReservedWord::UuidDetection => Some(("_uuid_detection", json!(spc.flags.uuid_detection))),
        ReservedWord::PartialPaths => Some(("_partial_paths", json!(spc.flags.partial_paths))),
        ReservedWord::Namespace => Some(("_namespace", json!(spc.flags.is_namespace))),
        ReservedWord::Weight => Some(("_weight", json!(spc.weight))),
        ReservedWord::Position => Some(("_position", json!(spc.position))),
        ReservedWord::Spelling => Some(("_spelling", json!(spc.spelling))),
        ReservedWord::Positions => Some(("_positions", json!(spc.positions))),
        ReservedWord::Ignore => Some((
            "_ignore",
            json!(spc.ignored.iter().cloned().collect::<Vec<_>>()),
        )),
        ReservedWord::Endpoint => spc.endpoint.as_ref().map(|e| ("_endpoint", json!(e))),
        _ => None,
    };
    if let Some((key, mirrored)) = mirrored {
        props.insert(key.to_string(), mirrored);
    }
    Ok(())
}

/// Verify a user-supplied value matches the persisted one.
///
/// Locked once a field is concrete: slot, types, accuracies, the
/// boolean-term flag, partials, error, the language group and the
/// detection toggles.
pub(crate) fn consistency(
    spc: &mut Specification,
    word: ReservedWord,
    value: &Value,
) -> Result<()> {
    let spc_label = field_label(spc);
    let mismatch = |keyword: &str, current: String, supplied: String| {
        Error::client(format!(
            "It is not allowed to change {keyword}  [{current}  ->  {supplied}]  in {spc_label}"
        ))
    };
    match word {
        ReservedWord::Type => {
            let sep = parse_type(read_str(Origin::User, spc, "_type", value)?)?;
            // Adding the array wrapper is allowed; the concrete part and
            // structural flags must match.
            if sep.concrete_type() != spc.sep_types.concrete_type()
                || sep.foreign() != spc.sep_types.foreign()
                || sep.object() != spc.sep_types.object()
            {
                return Err(mismatch(
                    "_type",
                    format_type(&spc.sep_types),
                    format_type(&sep),
                ));
            }
        }
        ReservedWord::Slot => {
            let slot = read_u32(Origin::User, spc, "_slot", value)?;
            if slot != spc.slot {
                return Err(mismatch("_slot", spc.slot.to_string(), slot.to_string()));
            }
        }
        ReservedWord::Accuracy => {
            let mut acc = read_accuracy(Origin::User, spc, "_accuracy", value)?;
            acc.sort_unstable();
            acc.dedup();
            if acc != spc.accuracy {
                return Err(mismatch(
                    "_accuracy",
                    format!("{:?}", spc.accuracy),
                    format!("{acc:?}"),
                ));
            }
        }
        ReservedWord::AccPrefix => {
            // Derived data; accepted only when identical.
            let items = value.as_array().ok_or_else(|| {
                bad(Origin::User, spc, "_acc_prefix", format!("Expected an array, got {value}"))
            })?;
            let supplied: Vec<Vec<u8>> = items
                .iter()
                .map(|v| read_prefix_bytes(Origin::User, spc, "_acc_prefix", v))
                .collect::<Result<_>>()?;
            if supplied != spc.acc_prefix {
                return Err(mismatch("_acc_prefix", "stored".into(), "supplied".into()));
            }
        }
        ReservedWord::BoolTerm => {
            let bool_term = read_bool(Origin::User, spc, "_bool_term", value)?;
            if bool_term != spc.flags.bool_term {
                return Err(mismatch(
                    "_bool_term",
                    spc.flags.bool_term.to_string(),
                    bool_term.to_string(),
                ));
            }
        }
        ReservedWord::Partials => {
            let partials = read_bool(Origin::User, spc, "_partials", value)?;
            if partials != spc.flags.partials {
                return Err(mismatch(
                    "_partials",
                    spc.flags.partials.to_string(),
                    partials.to_string(),
                ));
            }
        }
        ReservedWord::GeoError => {
            let error = read_f64(Origin::User, spc, "_error", value)?;
            if (error - spc.error).abs() > f64::EPSILON {
                return Err(mismatch("_error", spc.error.to_string(), error.to_string()));
            }
        }
        ReservedWord::Language => {
            let language = read_str(Origin::User, spc, "_language", value)?;
            if language != spc.language {
                return Err(mismatch("_language", spc.language.clone(), language.into()));
            }
        }
        ReservedWord::StemLanguage => {
            let language = read_str(Origin::User, spc, "_stem_language", value)?;
            if language != spc.stem_language {
                return Err(mismatch(
                    "_stem_language",
                    spc.stem_language.clone(),
                    language.into(),
                ));
            }
        }
        ReservedWord::StopStrategy => {
            let strategy = StopStrategy::parse(read_str(Origin::User, spc, "_stop_strategy", value)?)?;
            if strategy != spc.stop_strategy {
                return Err(mismatch(
                    "_stop_strategy",
                    spc.stop_strategy.to_string(),
                    strategy.to_string(),
                ));
            }
        }
        ReservedWord::StemStrategy => {
            let strategy = StemStrategy::parse(read_str(Origin::User, spc, "_stem_strategy", value)?)?;
            if strategy != spc.stem_strategy {
                return Err(mismatch(
                    "_stem_strategy",
                    spc.stem_strategy.to_string(),
                    strategy.to_string(),
                ));
            }
        }
        ReservedWord::Namespace => {
            let namespace = read_bool(Origin::User, spc, "_namespace", value)?;
            if namespace != spc.flags.is_namespace {
                return Err(mismatch(
                    "_namespace",
                    spc.flags.is_namespace.to_string(),
                    namespace.to_string(),
                ));
            }
        }
        ReservedWord::PartialPaths => {
            let partial_paths = read_bool(Origin::User, spc, "_partial_paths", value)?;
            if partial_paths != spc.flags.partial_paths {
                return Err(mismatch(
                    "_partial_paths",
                    spc.flags.partial_paths.to_string(),
                    partial_paths.to_string(),
                ));
            }
        }
        ReservedWord::IndexUuidField => {
            let index_uuid =
                UuidFieldIndex::parse(read_str(Origin::User, spc, "_index_uuid_field", value)?)?;
            if index_uuid != spc.index_uuid_field {
                return Err(mismatch(
                    "_index_uuid_field",
                    spc.index_uuid_field.to_string(),
                    index_uuid.to_string(),
                ));
            }
        }
        ReservedWord::DateDetection
        | ReservedWord::DatetimeDetection
        | ReservedWord::TimeDetection
        | ReservedWord::TimedeltaDetection
        | ReservedWord::NumericDetection
        | ReservedWord::GeoDetection
        | ReservedWord::BoolDetection
        | ReservedWord::TextDetection
        | ReservedWord::UuidDetection => {
            let (keyword, current) = detection_state(spc, word);
            let supplied = read_bool(Origin::User, spc, keyword, value)?;
            if supplied != current {
                return Err(mismatch(keyword, current.to_string(), supplied.to_string()));
            }
        }
        // Everything else stays processable per document.
        other => process(spc, other, value)?,
    }
    Ok(())
}

fn detection_state(spc: &Specification, word: ReservedWord) -> (&'static str, bool) {
    match word {
        ReservedWord::DateDetection => ("_date_detection", spc.flags.date_detection),
        ReservedWord::DatetimeDetection => ("_datetime_detection", spc.flags.datetime_detection),
        ReservedWord::TimeDetection => ("_time_detection", spc.flags.time_detection),
        ReservedWord::TimedeltaDetection => {
            ("_timedelta_detection", spc.flags.timedelta_detection)
        }
        ReservedWord::NumericDetection => ("_numeric_detection", spc.flags.numeric_detection),
        ReservedWord::GeoDetection => ("_geo_detection", spc.flags.geo_detection),
        ReservedWord::BoolDetection => ("_bool_detection", spc.flags.bool_detection),
        ReservedWord::TextDetection => ("_text_detection", spc.flags.text_detection),
        _ => ("_uuid_detection", spc.flags.uuid_detection),
    }
}
