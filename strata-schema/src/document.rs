//! The per-document indexed artifact
//!
//! A `Document` accumulates what one traversal produced: boolean terms,
//! posting terms with positions and weights, and value-slot payloads.
//! It is owned by the indexing worker and never shared.

use std::collections::{BTreeMap, BTreeSet};
use strata_spatial::{ranges, Range};

/// A term's accumulated weight and positions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TermEntry {
    /// Within-document frequency.
    pub wdf: u32,
    /// Sorted distinct positions; empty for boolean terms.
    pub positions: Vec<u32>,
}

/// Everything indexed for one document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Document {
    terms: BTreeMap<Vec<u8>, TermEntry>,
    values: BTreeMap<u32, Vec<u8>>,
}

impl Document {
    pub fn new() -> Self {
        Document::default()
    }

    /// Add a term without positional information.
    pub fn add_term(&mut self, term: Vec<u8>, wdf: u32) {
        let entry = self.terms.entry(term).or_default();
        entry.wdf = entry.wdf.saturating_add(wdf);
    }

    /// Add a term occurrence at a position.
    pub fn add_posting(&mut self, term: Vec<u8>, position: u32, wdf: u32) {
        let entry = self.terms.entry(term).or_default();
        entry.wdf = entry.wdf.saturating_add(wdf);
        if let Err(at) = entry.positions.binary_search(&position) {
            entry.positions.insert(at, position);
        }
    }

    /// Write a value-slot payload.
    pub fn set_value(&mut self, slot: u32, value: Vec<u8>) {
        self.values.insert(slot, value);
    }

    pub fn terms(&self) -> &BTreeMap<Vec<u8>, TermEntry> {
        &self.terms
    }

    pub fn has_term(&self, term: &[u8]) -> bool {
        self.terms.contains_key(term)
    }

    pub fn value(&self, slot: u32) -> Option<&[u8]> {
        self.values.get(&slot).map(Vec::as_slice)
    }

    pub fn values(&self) -> &BTreeMap<u32, Vec<u8>> {
        &self.values
    }
}

/// Per-slot accumulation while a document is traversed.
///
/// Ordinary slots collect distinct serialised values; geospatial slots
/// collect trixel ranges merged by union so repeated geometries collapse
/// to identical bytes.
#[derive(Debug, Clone, PartialEq)]
pub enum SlotValues {
    Bytes(BTreeSet<Vec<u8>>),
    Ranges(Vec<Range>),
}

impl SlotValues {
    pub fn add_bytes(&mut self, bytes: Vec<u8>) {
        match self {
            SlotValues::Bytes(set) => {
                set.insert(bytes);
            }
            SlotValues::Ranges(_) => {
                debug_assert!(false, "mixed slot accumulation");
            }
        }
    }

    pub fn add_ranges(&mut self, new: &[Range]) {
        match self {
            SlotValues::Ranges(acc) => {
                *acc = ranges::union(acc, new);
            }
            SlotValues::Bytes(_) => {
                debug_assert!(false, "mixed slot accumulation");
            }
        }
    }

    /// Join the accumulated values into the slot payload.
    pub fn join(&self) -> Vec<u8> {
        match self {
            SlotValues::Bytes(set) => strata_core::serialise::serialise_string_list(set.iter()),
            SlotValues::Ranges(acc) => ranges::serialise_ranges(acc),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn postings_accumulate() {
        let mut doc = Document::new();
        doc.add_posting(b"term".to_vec(), 3, 1);
        doc.add_posting(b"term".to_vec(), 1, 1);
        doc.add_posting(b"term".to_vec(), 3, 1);
        let entry = &doc.terms()[b"term".as_slice()];
        assert_eq!(entry.wdf, 3);
        assert_eq!(entry.positions, vec![1, 3]);
    }

    #[test]
    fn slot_join_is_deterministic() {
        let mut a = SlotValues::Bytes(BTreeSet::new());
        a.add_bytes(b"bb".to_vec());
        a.add_bytes(b"aa".to_vec());
        let mut b = SlotValues::Bytes(BTreeSet::new());
        b.add_bytes(b"aa".to_vec());
        b.add_bytes(b"bb".to_vec());
        assert_eq!(a.join(), b.join());
    }

    #[test]
    fn geo_union_idempotent() {
        let ranges = vec![Range::new(5, 10)];
        let mut acc = SlotValues::Ranges(Vec::new());
        acc.add_ranges(&ranges);
        let once = acc.join();
        acc.add_ranges(&ranges);
        assert_eq!(acc.join(), once);
    }
}
