//! KmerIndex: minimizer → source-sequence table plus a sorted distinct-value set.
//!
//! An index is *unbuilt* after [`KmerIndex::new`] and *built* after
//! [`KmerIndex::build`] or [`KmerIndex::read`]. Once built it is not
//! mutated by queries, so `&KmerIndex` can be shared across threads.
//!
//! Only the distinct-value set is persisted. An index restored from a stream
//! answers [`is_in`](KmerIndex::is_in) and [`is_repeat`](KmerIndex::is_repeat)
//! exactly like the one that wrote it, but has no sequence attribution and
//! [`find_repeats`](KmerIndex::find_repeats) always comes back empty.

use std::io::Write;
use std::path::PathBuf;

use log::debug;
use thiserror::Error;

use crate::encode::{BaseLookup, DnaLookup, assert_k};
use crate::minimizer::{Minimizer, minimizers_along};
use crate::radix::radix_sort_entries;

/// Index of a reference sequence in the collection passed to `build`.
pub type SeqId = u32;

/// Table entry: sequence `seq_id` has a window whose minimizer is `value`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct IndexEntry {
    pub value: u64,
    pub seq_id: SeqId,
}

#[derive(Debug, Error)]
/// Errors returned by KmerIndex persistence and configuration.
pub enum IndexError {
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// I/O error on a named file.
    #[error("I/O error during {operation} on '{}': {source}", .path.display())]
    File {
        path: PathBuf,
        operation: &'static str,
        source: std::io::Error,
    },
    /// Stream contents contradict the index format.
    #[error("Invalid index stream: {0}")]
    Format(String),
    /// Rejected build parameters.
    #[error("Invalid configuration: {0}")]
    Config(String),
}

/// Minimizer index over a reference collection.
#[derive(Clone, Debug)]
pub struct KmerIndex<L = DnaLookup> {
    w: usize,
    k: usize,
    entries: Vec<IndexEntry>,
    values: Vec<u64>,
    lookup: L,
}

impl KmerIndex {
    /// Empty index using the default [`DnaLookup`].
    pub fn new() -> Self {
        Self::with_lookup(DnaLookup)
    }
}

impl Default for KmerIndex {
    fn default() -> Self {
        Self::new()
    }
}

impl<L: BaseLookup> KmerIndex<L> {
    /// Empty index resolving non-ACGT symbols through `lookup`.
    pub fn with_lookup(lookup: L) -> Self {
        KmerIndex {
            w: 0,
            k: 0,
            entries: Vec::new(),
            values: Vec::new(),
            lookup,
        }
    }

    /// Window size (0 while unbuilt).
    #[inline]
    pub fn w(&self) -> usize {
        self.w
    }

    /// K-mer length (0 while unbuilt).
    #[inline]
    pub fn k(&self) -> usize {
        self.k
    }

    /// Sorted `(value, seq_id)` table. Empty after `read`.
    pub fn entries(&self) -> &[IndexEntry] {
        &self.entries
    }

    /// Sorted distinct minimizer values.
    pub fn values(&self) -> &[u64] {
        &self.values
    }

    pub fn lookup(&self) -> &L {
        &self.lookup
    }

    /// Shortest query that yields one window: `w + k - 1`, or 0 while unbuilt.
    pub fn min_query_len(&self) -> usize {
        if self.w == 0 || self.k == 0 {
            0
        } else {
            self.w + self.k - 1
        }
    }

    /// Whether `w` and `k` are set, i.e. queries can be answered.
    pub fn is_built(&self) -> bool {
        self.w > 0 && self.k > 0
    }

    /// Whether the entry table is populated, i.e. `find_repeats` can attribute hits.
    pub fn has_sources(&self) -> bool {
        !self.entries.is_empty()
    }

    /// Build from `seqs`, replacing any previous contents.
    ///
    /// Consecutive minimizers of one sequence with the same value are stored
    /// once; the table is then sorted by `(value, seq_id)` and deduplicated.
    ///
    /// # Panics
    /// If `k` is not in `1..=32`, `w == 0`, any sequence is shorter than
    /// `w + k - 1`, or there are more sequences than [`SeqId`] can number.
    pub fn build<S: AsRef<[u8]>>(&mut self, seqs: &[S], w: usize, k: usize) {
        assert_k(k);
        assert!(w > 0, "window size must be at least 1");
        assert!(
            seqs.len() <= SeqId::MAX as usize,
            "too many sequences for a u32 id: {}",
            seqs.len()
        );
        self.w = w;
        self.k = k;
        self.entries.clear();
        self.values.clear();

        let mut minimizers: Vec<Minimizer> = Vec::new();
        for (s, seq) in seqs.iter().enumerate() {
            let seq_id = s as SeqId;
            minimizers_along(seq.as_ref(), w, k, &self.lookup, &mut minimizers);
            for m in &minimizers {
                if self
                    .entries
                    .last()
                    .is_some_and(|e| e.value == m.value && e.seq_id == seq_id)
                {
                    continue;
                }
                self.entries.push(IndexEntry {
                    value: m.value,
                    seq_id,
                });
            }
        }
        let collected = self.entries.len();

        self.entries.shrink_to_fit();
        radix_sort_entries(&mut self.entries);
        self.entries.dedup();

        self.values = self.entries.iter().map(|e| e.value).collect();
        self.values.dedup();
        self.values.shrink_to_fit();

        debug!(
            "built index over {} sequences (w={}, k={}): {} entries collected, {} kept, {} distinct values",
            seqs.len(),
            w,
            k,
            collected,
            self.entries.len(),
            self.values.len()
        );
    }

    /// Whether `value` is one of the indexed minimizers. O(log n).
    #[inline]
    pub fn is_in(&self, value: u64) -> bool {
        self.values.binary_search(&value).is_ok()
    }

    /// Majority vote: true when at least half of the query's windows have an
    /// indexed minimizer.
    ///
    /// A window whose minimizer value equals the previous window's reuses that
    /// verdict instead of searching again. `minimizers` is scratch space and
    /// holds the query's minimizers on return.
    ///
    /// # Panics
    /// If the index is unbuilt or `query` is shorter than [`min_query_len`](Self::min_query_len).
    pub fn is_repeat(&self, query: &[u8], minimizers: &mut Vec<Minimizer>) -> bool {
        minimizers_along(query, self.w, self.k, &self.lookup, minimizers);
        let mut known = 0usize;
        let mut prev: Option<(u64, bool)> = None;
        for m in minimizers.iter() {
            let hit = match prev {
                Some((value, hit)) if value == m.value => hit,
                _ => self.is_in(m.value),
            };
            if hit {
                known += 1;
            }
            prev = Some((m.value, hit));
        }
        known * 2 >= minimizers.len()
    }

    /// [`is_repeat`](Self::is_repeat) on either strand; `rc_query` is the
    /// reverse complement of `query`.
    pub fn is_repeat_either_strand(
        &self,
        query: &[u8],
        rc_query: &[u8],
        minimizers: &mut Vec<Minimizer>,
    ) -> bool {
        self.is_repeat(query, minimizers) || self.is_repeat(rc_query, minimizers)
    }

    /// Collect into `repeats` the ids of every reference sequence sharing a
    /// minimizer value with `query`, ascending and without duplicates.
    ///
    /// Always empty on an index restored by `read`.
    ///
    /// # Panics
    /// If the index is unbuilt or `query` is shorter than [`min_query_len`](Self::min_query_len).
    pub fn find_repeats(
        &self,
        query: &[u8],
        minimizers: &mut Vec<Minimizer>,
        repeats: &mut Vec<SeqId>,
    ) {
        repeats.clear();
        minimizers_along(query, self.w, self.k, &self.lookup, minimizers);
        for (i, m) in minimizers.iter().enumerate() {
            if i > 0 && minimizers[i - 1].value == m.value {
                continue;
            }
            let start = self.entries.partition_point(|e| e.value < m.value);
            repeats.extend(
                self.entries[start..]
                    .iter()
                    .take_while(|e| e.value == m.value)
                    .map(|e| e.seq_id),
            );
        }
        repeats.sort_unstable();
        repeats.dedup();
    }

    /// Write a human-readable summary of the index.
    pub fn dump<W: Write>(&self, out: &mut W) -> std::io::Result<()> {
        writeln!(out, "window         : {}", self.w)?;
        writeln!(out, "k length       : {}", self.k)?;
        writeln!(out, "kmer_table size: {}", self.entries.len())?;
        writeln!(out, "kmer_set size  : {}", self.values.len())?;
        Ok(())
    }

    // -------- Internal helpers used by io --------

    pub(crate) fn clear(&mut self) {
        self.w = 0;
        self.k = 0;
        self.entries = Vec::new();
        self.values = Vec::new();
    }

    pub(crate) fn restore(&mut self, w: usize, k: usize, values: Vec<u64>) {
        debug_assert!(values.windows(2).all(|p| p[0] < p[1]));
        self.w = w;
        self.k = k;
        self.entries = Vec::new();
        self.values = values;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encode::encode_kmer;

    #[test]
    fn consecutive_duplicates_collapse_per_sequence() {
        // the minimizer of every window of a homopolymer is the same value
        let mut idx = KmerIndex::new();
        idx.build(&[b"AAAAAAAA".as_slice(), b"AAAAAA".as_slice()], 2, 3);
        assert_eq!(
            idx.entries(),
            &[
                IndexEntry { value: 0, seq_id: 0 },
                IndexEntry { value: 0, seq_id: 1 },
            ]
        );
        assert_eq!(idx.values(), &[0]);
    }

    #[test]
    fn rebuild_replaces_contents() {
        let mut idx = KmerIndex::new();
        idx.build(&[b"CCCCCCCC"], 3, 4);
        idx.build(&[b"GGGGG"], 2, 3);
        assert_eq!((idx.w(), idx.k()), (2, 3));
        assert_eq!(idx.values(), &[encode_kmer(b"GGG", 0, 3, &DnaLookup)]);
        assert_eq!(idx.entries().len(), 1);
    }

    #[test]
    fn first_window_gets_a_fresh_lookup() {
        // AAA packs to 0; the first window must still be checked against the set
        let mut idx = KmerIndex::new();
        idx.build(&[b"AAAAA"], 2, 3);
        let mut buf = Vec::new();
        assert!(idx.is_repeat(b"AAAAAATT", &mut buf));
    }

    #[test]
    fn dump_reports_sizes() {
        let mut idx = KmerIndex::new();
        idx.build(&[b"ACGTACG"], 2, 3);
        let mut out = Vec::new();
        idx.dump(&mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert_eq!(
            text,
            format!(
                "window         : 2\nk length       : 3\nkmer_table size: {}\nkmer_set size  : {}\n",
                idx.entries().len(),
                idx.values().len()
            )
        );
    }

    #[test]
    #[should_panic(expected = "k must be")]
    fn empty_build_still_checks_k() {
        let none: [&[u8]; 0] = [];
        KmerIndex::new().build(&none, 2, 33);
    }

    #[test]
    #[should_panic(expected = "window size must be at least 1")]
    fn empty_build_still_checks_w() {
        let none: [&[u8]; 0] = [];
        KmerIndex::new().build(&none, 0, 3);
    }

    #[test]
    fn empty_build_is_built_and_round_trips() {
        let none: [&[u8]; 0] = [];
        let mut idx = KmerIndex::new();
        idx.build(&none, 2, 3);
        assert!(idx.is_built());
        assert!(idx.values().is_empty());

        let mut bytes = Vec::new();
        idx.write(&mut bytes, crate::io::Endianness::Little).unwrap();
        let mut back = KmerIndex::new();
        back.read(&mut bytes.as_slice(), crate::io::Endianness::Little)
            .unwrap();
        assert_eq!((back.w(), back.k()), (2, 3));
    }

    #[test]
    fn unbuilt_index_knows_nothing() {
        let idx = KmerIndex::new();
        assert!(!idx.is_built());
        assert!(!idx.is_in(0));
        assert!(!idx.has_sources());
        assert_eq!(idx.min_query_len(), 0);
    }
}
