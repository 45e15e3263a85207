//! Type descriptor and serialisation invariants.

use proptest::prelude::*;
use strata_core::{format_type, parse_type, serialise, temporal, FieldType, SepTypes};

const CONCRETE: &[FieldType] = &[
    FieldType::Empty,
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
];

/// Every expressible shape round-trips through its canonical descriptor.
#[test]
fn parse_format_roundtrip() {
    for &concrete in CONCRETE {
        for object in [false, true] {
            for array in [false, true] {
                let mut sep = SepTypes::concrete(concrete);
                if object {
                    sep.set_object();
                }
                if array {
                    sep.set_array();
                }
                if sep.is_empty() {
                    continue;
                }
                let rendered = format_type(&sep);
                let parsed = parse_type(&rendered).unwrap();
                assert_eq!(parsed, sep, "{rendered}");
            }
        }
    }
    // Foreign shapes.
    for descriptor in ["foreign/object", "foreign/script", "foreign/object/array"] {
        let sep = parse_type(descriptor).unwrap();
        assert_eq!(parse_type(&format_type(&sep)).unwrap(), sep);
    }
}

/// Token order never changes the parsed shape.
#[test]
fn permutations_are_equivalent() {
    let permutations = [
        "array/object/keyword",
        "object/array/keyword",
        "keyword/array/object",
        "keyword/object/array",
        "array/keyword/object",
        "object/keyword/array",
    ];
    let canonical = parse_type(permutations[0]).unwrap();
    for p in &permutations {
        assert_eq!(parse_type(p).unwrap(), canonical, "{p}");
    }
    assert_eq!(format_type(&canonical), "object/array/keyword");
}

proptest! {
    /// Numeric byte encodings preserve order.
    #[test]
    fn integer_encoding_preserves_order(a in any::<i64>(), b in any::<i64>()) {
        let (ea, eb) = (serialise::integer(a), serialise::integer(b));
        prop_assert_eq!(a.cmp(&b), ea.cmp(&eb));
    }

    #[test]
    fn positive_encoding_preserves_order(a in any::<u64>(), b in any::<u64>()) {
        let (ea, eb) = (serialise::positive(a), serialise::positive(b));
        prop_assert_eq!(a.cmp(&b), ea.cmp(&eb));
    }

    #[test]
    fn floating_encoding_preserves_order(a in any::<f64>(), b in any::<f64>()) {
        prop_assume!(a.is_finite() && b.is_finite());
        let (ea, eb) = (serialise::floating(a), serialise::floating(b));
        prop_assert_eq!(a.partial_cmp(&b).unwrap(), ea.cmp(&eb));
    }

    #[test]
    fn integer_roundtrip(v in any::<i64>()) {
        prop_assert_eq!(serialise::unserialise_integer(&serialise::integer(v)).unwrap(), v);
    }

    /// Dates round-trip through their ISO rendering.
    #[test]
    fn date_iso_roundtrip(
        year in 1i32..9999,
        month in 1u32..=12,
        day in 1u32..=28,
        hour in 0u32..24,
        minute in 0u32..60,
        second in 0u32..60,
    ) {
        let iso = format!("{year:04}-{month:02}-{day:02}T{hour:02}:{minute:02}:{second:02}");
        let tm = temporal::parse_datetime_str(&iso).unwrap();
        prop_assert_eq!(tm.to_iso(), iso);
    }

    /// String lists survive arbitrary binary content.
    #[test]
    fn string_list_roundtrip(items in proptest::collection::vec(
        proptest::collection::vec(any::<u8>(), 0..64), 1..8)
    ) {
        let joined = serialise::serialise_string_list(&items);
        // A single element is stored raw, so only multi-element lists
        // are framed.
        if items.len() > 1 {
            prop_assert_eq!(serialise::unserialise_string_list(&joined).unwrap(), items);
        }
    }
}
