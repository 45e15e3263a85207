//! Full-depth trixel id ranges
//!
//! Coverings are stored as sorted, inclusive `[start, end]` intervals over
//! full-depth trixel ids. Union-merge keeps the set canonical: sorted,
//! non-overlapping, non-adjacent. Indexing the same geometry twice
//! therefore yields identical bytes.

use crate::error::{Result, SpatialError};
use strata_core::serialise;

/// Inclusive interval of full-depth trixel ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Range {
    pub start: u64,
    pub end: u64,
}

impl Range {
    pub fn new(start: u64, end: u64) -> Self {
        Range { start, end }
    }
}

/// Sort and merge overlapping or adjacent intervals in place.
pub fn merge(ranges: &mut Vec<Range>) {
    if ranges.len() < 2 {
        return;
    }
    ranges.sort_by_key(|r| r.start);
    let mut merged = Vec::with_capacity(ranges.len());
    let mut current = ranges[0];
    for range in ranges.iter().skip(1) {
        if range.start <= current.end.saturating_add(1) {
            current.end = current.end.max(range.end);
        } else {
            merged.push(current);
            current = *range;
        }
    }
    merged.push(current);
    *ranges = merged;
}

/// Union of two canonical range sets.
pub fn union(a: &[Range], b: &[Range]) -> Vec<Range> {
    let mut out: Vec<Range> = a.iter().chain(b.iter()).copied().collect();
    merge(&mut out);
    out
}

/// Intersection of two canonical range sets.
pub fn intersection(a: &[Range], b: &[Range]) -> Vec<Range> {
    let mut out = Vec::new();
    let (mut i, mut j) = (0, 0);
    while i < a.len() && j < b.len() {
        let start = a[i].start.max(b[j].start);
        let end = a[i].end.min(b[j].end);
        if start <= end {
            out.push(Range::new(start, end));
        }
        if a[i].end < b[j].end {
            i += 1;
        } else {
            j += 1;
        }
    }
    out
}

/// Serialise a canonical range set: 16 bytes per interval, big-endian
/// start then end. Fixed width, so no framing is needed.
pub fn serialise_ranges(ranges: &[Range]) -> Vec<u8> {
    let mut out = Vec::with_capacity(ranges.len() * 16);
    for r in ranges {
        out.extend_from_slice(&serialise::positive(r.start));
        out.extend_from_slice(&serialise::positive(r.end));
    }
    out
}

/// Reverse of [`serialise_ranges`].
pub fn unserialise_ranges(bytes: &[u8]) -> Result<Vec<Range>> {
    if bytes.len() % 16 != 0 {
        return Err(SpatialError::parse("Invalid range serialisation length"));
    }
    let mut out = Vec::with_capacity(bytes.len() / 16);
    for chunk in bytes.chunks_exact(16) {
        let start = serialise::unserialise_positive(&chunk[..8])
            .map_err(|e| SpatialError::parse(e.to_string()))?;
        let end = serialise::unserialise_positive(&chunk[8..])
            .map_err(|e| SpatialError::parse(e.to_string()))?;
        out.push(Range::new(start, end));
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_overlapping_and_adjacent() {
        let mut ranges = vec![
            Range::new(10, 20),
            Range::new(21, 30),
            Range::new(5, 12),
            Range::new(100, 110),
        ];
        merge(&mut ranges);
        assert_eq!(ranges, vec![Range::new(5, 30), Range::new(100, 110)]);
    }

    #[test]
    fn union_is_idempotent() {
        let a = vec![Range::new(0, 10), Range::new(20, 30)];
        let once = union(&a, &a);
        assert_eq!(once, a);
    }

    #[test]
    fn intersection_basic() {
        let a = vec![Range::new(0, 10), Range::new(20, 30)];
        let b = vec![Range::new(5, 25)];
        assert_eq!(
            intersection(&a, &b),
            vec![Range::new(5, 10), Range::new(20, 25)]
        );
    }

    #[test]
    fn serialise_roundtrip() {
        let ranges = vec![Range::new(1, 2), Range::new(u64::MAX - 1, u64::MAX)];
        let bytes = serialise_ranges(&ranges);
        assert_eq!(unserialise_ranges(&bytes).unwrap(), ranges);
    }
}
