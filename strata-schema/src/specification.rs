//! The field Specification
//!
//! A Specification is the live value object threaded through traversal.
//! It carries every inheritable default plus the per-field settings, and
//! is pushed by value into each recursion step and restored on return, so
//! there are no parent back-references.

use crate::types::{StemStrategy, StopStrategy, TypeIndex, UuidFieldIndex};
use once_cell::sync::Lazy;
use serde_json::Value;
use std::collections::{BTreeSet, HashMap};
use strata_core::{default_accuracy, serialise, FieldType, SepTypes};

/// Slot reserved for the document id value.
pub const SLOT_ID: u32 = 0;
/// Slot reserved for the document version value.
pub const SLOT_VERSION: u32 = 1;
/// Slots below this are reserved for engine lanes.
pub const RESERVED_SLOTS: u32 = 20;
/// Unassigned slot sentinel.
pub const BAD_SLOT: u32 = u32::MAX;

/// Default geospatial coverage error factor.
pub const DEFAULT_GEO_ERROR: f64 = 0.3;

/// Reserved posting term that must never be emitted (numeric-id
/// sentinel owned by the storage layer).
pub const NUMERIC_ID_SENTINEL: &[u8] = b"QN\x80";

// Prefix space markers. Every term starts with one of these so the four
// derivation schemes cannot collide.
const PREFIX_FIELD_MARKER: u8 = 0x01;
const PREFIX_UUID_MARKER: u8 = 0x02;
const PREFIX_GLOBAL_MARKER: u8 = 0x03;
const PREFIX_ACC_MARKER: u8 = 0x04;

/// Derive the term prefix for a named field from its full dotted path.
pub fn field_prefix(full_meta_name: &str) -> Vec<u8> {
    let hash = serialise::fnv1a32(full_meta_name.as_bytes());
    let mut out = vec![PREFIX_FIELD_MARKER];
    out.extend_from_slice(&hash.to_be_bytes());
    out
}

/// Derive the term prefix for a UUID-named field from the identifier
/// itself, so every spelling of the UUID maps to the same prefix.
pub fn uuid_prefix(uuid_bytes: &[u8; 16]) -> Vec<u8> {
    let mut out = vec![PREFIX_UUID_MARKER];
    out.extend_from_slice(uuid_bytes);
    out
}

/// The static prefix of a concrete type's global subspace.
pub fn global_prefix(t: FieldType) -> Vec<u8> {
    vec![PREFIX_GLOBAL_MARKER, t.ctype()]
}

/// Per-bucket accuracy prefix derived from the owning prefix.
pub fn acc_prefix_for(prefix: &[u8], acc: u64) -> Vec<u8> {
    let mut out = prefix.to_vec();
    out.push(PREFIX_ACC_MARKER);
    out.extend_from_slice(&serialise::positive(acc));
    out
}

/// Derive a value slot from a prefix and type marker, avoiding the
/// reserved lanes and the unassigned sentinel.
pub fn slot_for(prefix: &[u8], ctype: u8) -> u32 {
    let mut bytes = prefix.to_vec();
    bytes.push(ctype);
    let mut slot = serialise::fnv1a32(&bytes);
    if slot < RESERVED_SLOTS {
        slot += RESERVED_SLOTS;
    }
    if slot == BAD_SLOT {
        slot -= 1;
    }
    slot
}

/// Build a full posting term: prefix, type marker, then the serialised
/// value.
pub fn prefixed(serialised: &[u8], prefix: &[u8], ctype: u8) -> Vec<u8> {
    let mut out = Vec::with_capacity(prefix.len() + 1 + serialised.len());
    out.extend_from_slice(prefix);
    out.push(ctype);
    out.extend_from_slice(serialised);
    out
}

/// Field and uuid prefix streams. The uuid stream is populated only while
/// the path has crossed a UUID-named field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Prefix {
    pub field: Vec<u8>,
    pub uuid: Vec<u8>,
}

/// Boolean settings and traversal state.
///
/// The first block is inheritable configuration; the second is state the
/// traverser maintains while descending and never persists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Flags {
    pub bool_term: bool,
    pub partials: bool,
    pub store: bool,
    pub parent_store: bool,
    pub recurse: bool,
    pub dynamic: bool,
    pub strict: bool,
    pub date_detection: bool,
    pub datetime_detection: bool,
    pub time_detection: bool,
    pub timedelta_detection: bool,
    pub numeric_detection: bool,
    pub geo_detection: bool,
    pub bool_detection: bool,
    pub text_detection: bool,
    pub uuid_detection: bool,
    pub partial_paths: bool,
    pub is_namespace: bool,

    // Traversal state.
    pub field_found: bool,
    pub concrete: bool,
    pub complete: bool,
    pub uuid_field: bool,
    pub uuid_path: bool,
    pub inside_namespace: bool,
    pub has_uuid_prefix: bool,
    pub has_bool_term: bool,
    pub has_index: bool,
    pub has_namespace: bool,
    pub has_partial_paths: bool,
    pub static_endpoint: bool,
}

impl Default for Flags {
    fn default() -> Self {
        Flags {
            bool_term: false,
            partials: true,
            store: true,
            parent_store: true,
            recurse: true,
            dynamic: true,
            strict: false,
            date_detection: true,
            datetime_detection: true,
            time_detection: true,
            timedelta_detection: true,
            numeric_detection: true,
            geo_detection: true,
            bool_detection: true,
            text_detection: true,
            uuid_detection: true,
            partial_paths: false,
            is_namespace: false,
            field_found: true,
            concrete: false,
            complete: false,
            uuid_field: false,
            uuid_path: false,
            inside_namespace: false,
            has_uuid_prefix: false,
            has_bool_term: false,
            has_index: false,
            has_namespace: false,
            has_partial_paths: false,
            static_endpoint: false,
        }
    }
}

/// An index target accumulated while descending namespace paths: one
/// combined prefix and its slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartialSpec {
    pub prefix: Vec<u8>,
    pub slot: u32,
}

/// The full field specification.
#[derive(Debug, Clone, PartialEq)]
pub struct Specification {
    pub sep_types: SepTypes,
    pub prefix: Prefix,
    pub local_prefix: Prefix,
    pub slot: u32,
    pub accuracy: Vec<u64>,
    pub acc_prefix: Vec<Vec<u8>>,
    pub index: TypeIndex,
    /// Per-position overrides, indexed modulo length.
    pub position: Vec<u32>,
    pub weight: Vec<u32>,
    pub spelling: Vec<bool>,
    pub positions: Vec<bool>,
    pub language: String,
    pub stem_language: String,
    pub stop_strategy: StopStrategy,
    pub stem_strategy: StemStrategy,
    pub ngram: bool,
    pub cjk_ngram: bool,
    pub cjk_words: bool,
    pub index_uuid_field: UuidFieldIndex,
    /// Geospatial coverage error factor.
    pub error: f64,
    pub flags: Flags,
    /// Pending direct leaf (`_value`).
    pub value: Option<Value>,
    /// Pending cast-wrapped leaf (`_integer`, `_point`, ...).
    pub value_rec: Option<Value>,
    /// Per-document accuracy override.
    pub doc_acc: Option<Vec<u64>>,
    /// Explicit accuracy prefixes supplied alongside `doc_acc`.
    pub doc_acc_prefix: Option<Vec<Vec<u8>>>,
    /// External reference for foreign fields.
    pub endpoint: Option<String>,
    /// Prefix stack accumulated across namespace ancestors.
    pub partial_prefixes: Vec<Prefix>,
    /// Index targets derived from the partial prefixes at the leaf.
    pub partial_index_spcs: Vec<PartialSpec>,
    /// Child names to skip; `"*"` disables recursion.
    pub ignored: BTreeSet<String>,
    pub meta_name: String,
    pub full_meta_name: String,
}

impl Default for Specification {
    fn default() -> Self {
        Specification {
            sep_types: SepTypes::default(),
            prefix: Prefix::default(),
            local_prefix: Prefix::default(),
            slot: BAD_SLOT,
            accuracy: Vec::new(),
            acc_prefix: Vec::new(),
            index: TypeIndex::FIELD_ALL,
            position: Vec::new(),
            weight: Vec::new(),
            spelling: Vec::new(),
            positions: Vec::new(),
            language: "en".to_string(),
            stem_language: "en".to_string(),
            stop_strategy: StopStrategy::default(),
            stem_strategy: StemStrategy::default(),
            ngram: false,
            cjk_ngram: false,
            cjk_words: false,
            index_uuid_field: UuidFieldIndex::Both,
            error: DEFAULT_GEO_ERROR,
            flags: Flags::default(),
            value: None,
            value_rec: None,
            doc_acc: None,
            doc_acc_prefix: None,
            endpoint: None,
            partial_prefixes: Vec::new(),
            partial_index_spcs: Vec::new(),
            ignored: BTreeSet::new(),
            meta_name: String::new(),
            full_meta_name: String::new(),
        }
    }
}

impl Specification {
    /// The concrete type marker byte.
    pub fn get_ctype(&self) -> u8 {
        self.sep_types.concrete_type().ctype()
    }

    /// Per-position weight (modulo length; 1 when unset).
    pub fn weight_at(&self, pos: usize) -> u32 {
        if self.weight.is_empty() {
            1
        } else {
            self.weight[pos % self.weight.len()]
        }
    }

    /// Per-position term position source (modulo length; the raw position
    /// when unset).
    pub fn position_at(&self, pos: usize) -> u32 {
        if self.position.is_empty() {
            pos as u32
        } else {
            self.position[pos % self.position.len()]
        }
    }

    /// Whether the term at `pos` is posted with positional information.
    pub fn positions_at(&self, pos: usize) -> bool {
        if self.positions.is_empty() {
            false
        } else {
            self.positions[pos % self.positions.len()]
        }
    }

    /// Whether the term at `pos` feeds the spelling dictionary.
    pub fn spelling_at(&self, pos: usize) -> bool {
        if self.spelling.is_empty() {
            false
        } else {
            self.spelling[pos % self.spelling.len()]
        }
    }

    /// In-place override of the concrete shape, used when adopting a
    /// partial (namespace or global) target.
    pub fn update(
        &mut self,
        sep_types: SepTypes,
        prefix: Vec<u8>,
        slot: u32,
        accuracy: Vec<u64>,
        acc_prefix: Vec<Vec<u8>>,
    ) {
        self.sep_types = sep_types;
        self.prefix.field = prefix;
        self.slot = slot;
        self.accuracy = accuracy;
        self.acc_prefix = acc_prefix;
    }

    /// Reset the per-document leaf state, keeping the inheritable parts.
    pub fn reset_pending(&mut self) {
        self.value = None;
        self.value_rec = None;
        self.doc_acc = None;
        self.doc_acc_prefix = None;
    }
}

/// Build the static global specification for a concrete type: the shared
/// subspace a field contributes to when indexed `global`.
fn build_global(t: FieldType) -> Specification {
    let prefix = global_prefix(t);
    let accuracy: Vec<u64> = default_accuracy(t).map(<[u64]>::to_vec).unwrap_or_default();
    let acc_prefix = accuracy
        .iter()
        .map(|&acc| acc_prefix_for(&prefix, acc))
        .collect();
    let mut spc = Specification {
        sep_types: SepTypes::concrete(t),
        slot: slot_for(&prefix, t.ctype()),
        accuracy,
        acc_prefix,
        index: TypeIndex::GLOBAL_ALL,
        ..Specification::default()
    };
    spc.prefix.field = prefix;
    spc.flags.concrete = true;
    spc.flags.complete = true;
    spc
}

static GLOBAL_SPECS: Lazy<HashMap<FieldType, Specification>> = Lazy::new(|| {
    [
        FieldType::Boolean,
        FieldType::Integer,
        FieldType::Positive,
        FieldType::Floating,
        FieldType::Date,
        FieldType::Datetime,
        FieldType::Time,
        FieldType::Timedelta,
        FieldType::Keyword,
        FieldType::Text,
        FieldType::String,
        FieldType::Uuid,
        FieldType::Geo,
    ]
    .into_iter()
    .map(|t| (t, build_global(t)))
    .collect()
});

/// The static per-type global specification.
pub fn global_spec(t: FieldType) -> &'static Specification {
    GLOBAL_SPECS
        .get(&t)
        .unwrap_or_else(|| panic!("no global specification for {t}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_root_settings() {
        let spc = Specification::default();
        assert!(spc.flags.store);
        assert!(spc.flags.recurse);
        assert!(spc.flags.dynamic);
        assert!(!spc.flags.strict);
        assert!(spc.flags.uuid_detection);
        assert_eq!(spc.index, TypeIndex::FIELD_ALL);
        assert_eq!(spc.index_uuid_field, UuidFieldIndex::Both);
        assert!(!spc.flags.bool_term);
        assert!(spc.flags.partials);
        assert_eq!(spc.error, DEFAULT_GEO_ERROR);
        assert_eq!(spc.slot, BAD_SLOT);
    }

    #[test]
    fn slots_avoid_reserved_lanes() {
        for name in ["a", "b", "some.deep.field", "x"] {
            let prefix = field_prefix(name);
            let slot = slot_for(&prefix, b't');
            assert!(slot >= RESERVED_SLOTS);
            assert_ne!(slot, BAD_SLOT);
        }
    }

    #[test]
    fn prefixes_are_stable_and_distinct() {
        assert_eq!(field_prefix("name"), field_prefix("name"));
        assert_ne!(field_prefix("name"), field_prefix("age"));
        assert_ne!(global_prefix(FieldType::Text), field_prefix("text"));
    }

    #[test]
    fn modulo_position_overrides() {
        let spc = Specification {
            weight: vec![1, 2, 3],
            ..Specification::default()
        };
        assert_eq!(spc.weight_at(0), 1);
        assert_eq!(spc.weight_at(4), 2);
        let bare = Specification::default();
        assert_eq!(bare.weight_at(7), 1);
        assert_eq!(bare.position_at(7), 7);
    }

    #[test]
    fn global_specs_are_complete() {
        let spc = global_spec(FieldType::Integer);
        assert!(spc.flags.concrete);
        assert_ne!(spc.slot, BAD_SLOT);
        assert_eq!(spc.accuracy.len(), spc.acc_prefix.len());
    }

    #[test]
    fn update_adopts_a_target() {
        let mut spc = Specification::default();
        let global = global_spec(FieldType::Positive);
        spc.update(
            global.sep_types,
            global.prefix.field.clone(),
            global.slot,
            global.accuracy.clone(),
            global.acc_prefix.clone(),
        );
        assert_eq!(spc.slot, global.slot);
        assert_eq!(spc.prefix.field, global.prefix.field);
        assert_eq!(spc.sep_types, global.sep_types);
    }
}
