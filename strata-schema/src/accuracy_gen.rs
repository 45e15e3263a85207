//! Accuracy-bucket term emission
//!
//! The sole authority for bucket terms: the per-field and global
//! quadrants both call through here, so a given (specification, value)
//! pair always yields the same buckets.
//!
//! Numeric buckets quantize the value down to a multiple of the bucket
//! magnitude. Date buckets truncate the broken-down tuple at the bucket's
//! unit and re-serialise the UTC timestamp. Geospatial buckets truncate
//! covering trixel ids to each accuracy level and emit one term per
//! distinct truncated id.

use crate::document::Document;
use crate::error::{Error, Result};
use crate::specification::prefixed;
use std::collections::BTreeSet;
use strata_core::{serialise, FieldType, Tm, UnitTime};
use strata_spatial::{htm, Range};

/// Buckets for a signed integer value.
pub fn integer(doc: &mut Document, accuracy: &[u64], acc_prefix: &[Vec<u8>], value: i64) {
    let ctype = FieldType::Integer.ctype();
    for (acc, prefix) in accuracy.iter().zip(acc_prefix) {
        let acc = *acc as i64;
        if acc == 0 {
            continue;
        }
        let quantized = value - value.rem_euclid(acc);
        doc.add_term(prefixed(&serialise::integer(quantized), prefix, ctype), 1);
    }
}

/// Buckets for an unsigned value.
pub fn positive(doc: &mut Document, accuracy: &[u64], acc_prefix: &[Vec<u8>], value: u64) {
    let ctype = FieldType::Integer.ctype();
    for (acc, prefix) in accuracy.iter().zip(acc_prefix) {
        if *acc == 0 {
            continue;
        }
        let quantized = value - value % *acc;
        doc.add_term(prefixed(&serialise::positive(quantized), prefix, ctype), 1);
    }
}

/// Buckets for a float value: quantized on the real line, emitted as
/// integer buckets so float and integer fields share bucket space.
pub fn floating(doc: &mut Document, accuracy: &[u64], acc_prefix: &[Vec<u8>], value: f64) {
    let ctype = FieldType::Integer.ctype();
    for (acc, prefix) in accuracy.iter().zip(acc_prefix) {
        if *acc == 0 {
            continue;
        }
        let acc_f = *acc as f64;
        let quantized = (value / acc_f).floor() * acc_f;
        doc.add_term(
            prefixed(&serialise::integer(quantized as i64), prefix, ctype),
            1,
        );
    }
}

/// Buckets for a date or datetime value.
///
/// Each bucket magnitude must be a calendar unit; the broken-down tuple
/// is truncated at that unit's coarsest field.
pub fn date(doc: &mut Document, accuracy: &[u64], acc_prefix: &[Vec<u8>], tm: &Tm) -> Result<()> {
    let ctype = FieldType::Date.ctype();
    for (acc, prefix) in accuracy.iter().zip(acc_prefix) {
        let unit = UnitTime::from_seconds(*acc)
            .ok_or_else(|| Error::client(format!("Invalid date accuracy {acc}")))?;
        let truncated = tm.truncate(unit);
        doc.add_term(
            prefixed(&serialise::timestamp(truncated.timestamp()?), prefix, ctype),
            1,
        );
    }
    Ok(())
}

/// Buckets for time and timedelta values: plain seconds quantization.
pub fn time(doc: &mut Document, accuracy: &[u64], acc_prefix: &[Vec<u8>], seconds: f64) {
    let ctype = FieldType::Time.ctype();
    for (acc, prefix) in accuracy.iter().zip(acc_prefix) {
        if *acc == 0 {
            continue;
        }
        let acc_f = *acc as f64;
        let quantized = (seconds / acc_f).floor() * acc_f;
        doc.add_term(prefixed(&serialise::floating(quantized), prefix, ctype), 1);
    }
}

/// Buckets for a geospatial range set.
///
/// Accuracies are trixel levels. Covering ids are truncated to each level
/// no deeper than their own, deduplicated, and emitted one term per id.
pub fn geo(doc: &mut Document, accuracy: &[u64], acc_prefix: &[Vec<u8>], ranges: &[Range]) {
    let ctype = FieldType::Geo.ctype();
    let ids = htm::ids_for_ranges(ranges);
    for (acc, prefix) in accuracy.iter().zip(acc_prefix) {
        let level = *acc as u8;
        let mut seen = BTreeSet::new();
        for &id in &ids {
            let id_level = htm::id_level(id);
            if level <= id_level {
                seen.insert(id >> (2 * u32::from(id_level - level)));
            }
        }
        for id in seen {
            doc.add_term(prefixed(&serialise::positive(id), prefix, ctype), 1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::specification::acc_prefix_for;
    use strata_core::temporal::parse_datetime_str;

    fn prefixes(accuracy: &[u64]) -> Vec<Vec<u8>> {
        accuracy.iter().map(|&a| acc_prefix_for(b"P", a)).collect()
    }

    #[test]
    fn integer_quantizes_toward_negative_infinity() {
        let accuracy = [100u64];
        let acc_prefix = prefixes(&accuracy);
        let mut doc = Document::new();
        integer(&mut doc, &accuracy, &acc_prefix, -150);
        let expected = prefixed(
            &serialise::integer(-200),
            &acc_prefix[0],
            FieldType::Integer.ctype(),
        );
        assert!(doc.has_term(&expected));
    }

    #[test]
    fn one_term_per_bucket() {
        let accuracy = [100u64, 1000, 10000];
        let acc_prefix = prefixes(&accuracy);
        let mut doc = Document::new();
        positive(&mut doc, &accuracy, &acc_prefix, 1234);
        assert_eq!(doc.terms().len(), 3);
    }

    #[test]
    fn date_buckets_truncate() {
        let accuracy = [UnitTime::Hour.seconds(), UnitTime::Century.seconds()];
        let acc_prefix = prefixes(&accuracy);
        let tm = parse_datetime_str("1987-06-05T12:34:56").unwrap();
        let mut doc = Document::new();
        date(&mut doc, &accuracy, &acc_prefix, &tm).unwrap();
        assert_eq!(doc.terms().len(), 2);

        let century = parse_datetime_str("1900-01-01T00:00:00").unwrap();
        let expected = prefixed(
            &serialise::timestamp(century.timestamp().unwrap()),
            &acc_prefix[1],
            FieldType::Date.ctype(),
        );
        assert!(doc.has_term(&expected));
    }

    #[test]
    fn invalid_date_accuracy_rejected() {
        let accuracy = [1234u64];
        let acc_prefix = prefixes(&accuracy);
        let tm = parse_datetime_str("2000-01-01").unwrap();
        let mut doc = Document::new();
        assert!(date(&mut doc, &accuracy, &acc_prefix, &tm).is_err());
    }

    #[test]
    fn geo_truncates_and_dedupes() {
        // Two full-depth points under the same level-10 trixel.
        let p = strata_spatial::Cartesian::from_degrees(10.0, 10.0).unwrap();
        let full = htm::point_to_id(&p);
        let sibling = full ^ 1;
        let ranges = vec![Range::new(full, full), Range::new(sibling, sibling)];
        let accuracy = [10u64];
        let acc_prefix = prefixes(&accuracy);
        let mut doc = Document::new();
        geo(&mut doc, &accuracy, &acc_prefix, &ranges);
        assert_eq!(doc.terms().len(), 1);
    }

    #[test]
    fn accuracy_finer_than_covering_skipped() {
        let p = strata_spatial::Cartesian::from_degrees(10.0, 10.0).unwrap();
        let coarse = htm::point_to_id_at(&p, 5);
        let ranges = vec![htm::id_to_range(coarse)];
        let accuracy = [15u64];
        let acc_prefix = prefixes(&accuracy);
        let mut doc = Document::new();
        geo(&mut doc, &accuracy, &acc_prefix, &ranges);
        // The covering id is coarser than the requested level: no terms.
        assert!(doc.terms().is_empty());
    }
}
