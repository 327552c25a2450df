//! Window minimizers over packed k-mers.
//!
//! A window is `w` consecutive k-mer start positions; its minimizer is the
//! smallest packed k-mer among them. Ties keep the **last** position: the
//! running minimum is replaced whenever a candidate is `<=` it.

use crate::encode::{BaseLookup, assert_k, base_code, encode_kmer, roll_kmer};

/// Minimal k-mer of one window and the offset of its first base.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Minimizer {
    /// Packed k-mer value.
    pub value: u64,
    /// 0-based offset of the k-mer in the source sequence.
    pub pos: usize,
}

#[inline]
fn minimizer_leq(candidate: u64, current: u64) -> bool {
    candidate <= current
}

#[inline]
fn check_window(len: usize, off: usize, w: usize, k: usize) {
    assert_k(k);
    assert!(w > 0, "window size must be at least 1");
    assert!(
        off + w + k - 1 <= len,
        "window at {off} (w={w}, k={k}) runs past sequence end {len}"
    );
}

/// Minimizer of the window whose k-mers start at `off..off + w`.
///
/// # Panics
/// If `k` is not in `1..=32`, `w == 0`, or `off + w + k - 1 > seq.len()`.
pub fn minimizer_of_window<L: BaseLookup + ?Sized>(
    seq: &[u8],
    off: usize,
    w: usize,
    k: usize,
    lookup: &L,
) -> Minimizer {
    check_window(seq.len(), off, w, k);
    let mut kmer = encode_kmer(seq, off, k, lookup);
    let mut best = Minimizer {
        value: kmer,
        pos: off,
    };
    for i in off + 1..off + w {
        kmer = roll_kmer(kmer, base_code(seq[i + k - 1], lookup) as u8, k);
        if minimizer_leq(kmer, best.value) {
            best = Minimizer { value: kmer, pos: i };
        }
    }
    best
}

/// Fill `out` with the minimizer of every window of `seq`, in order.
///
/// `out` is cleared first and ends with exactly `seq.len() - w - k + 2`
/// entries; entry `i` is the minimizer of the window starting at `i`.
///
/// Each step only compares the k-mer entering the window against the current
/// minimizer. When the minimizer slides out of the window, that window is
/// rescanned from scratch, so the worst case (minimum always at the leading
/// edge, e.g. a strictly increasing run of k-mers) is O(n·w).
///
/// # Panics
/// If `k` is not in `1..=32`, `w == 0`, or `seq` is shorter than `w + k - 1`.
pub fn minimizers_along<L: BaseLookup + ?Sized>(
    seq: &[u8],
    w: usize,
    k: usize,
    lookup: &L,
    out: &mut Vec<Minimizer>,
) {
    check_window(seq.len(), 0, w, k);
    let span = w + k - 1;
    out.clear();
    out.reserve(seq.len() - span + 1);

    let mut current = minimizer_of_window(seq, 0, w, k, lookup);
    out.push(current);
    // k-mer at the trailing edge of the first window
    let mut kmer = encode_kmer(seq, w - 1, k, lookup);
    for i in 1..=seq.len() - span {
        kmer = roll_kmer(kmer, base_code(seq[i + span - 1], lookup) as u8, k);
        if current.pos < i {
            current = minimizer_of_window(seq, i, w, k, lookup);
        } else if minimizer_leq(kmer, current.value) {
            current = Minimizer {
                value: kmer,
                pos: i + w - 1,
            };
        }
        out.push(current);
    }
    debug_assert_eq!(out.len() + span - 1, seq.len());
}

/// Allocating form of [`minimizers_along`].
pub fn window_minimizers<L: BaseLookup + ?Sized>(
    seq: &[u8],
    w: usize,
    k: usize,
    lookup: &L,
) -> Vec<Minimizer> {
    let mut out = Vec::new();
    minimizers_along(seq, w, k, lookup, &mut out);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encode::DnaLookup;

    #[test]
    fn ties_keep_last_position() {
        // every 2-mer of a homopolymer is equal
        let m = minimizer_of_window(b"AAAAAA", 0, 4, 2, &DnaLookup);
        assert_eq!(m, Minimizer { value: 0, pos: 3 });
    }

    #[test]
    fn single_window_sequence() {
        let seq = b"GATTACA";
        let out = window_minimizers(seq, 3, 5, &DnaLookup);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0], minimizer_of_window(seq, 0, 3, 5, &DnaLookup));
    }

    #[test]
    fn window_of_one_is_every_kmer() {
        let seq = b"ACGTTGCA";
        let out = window_minimizers(seq, 1, 3, &DnaLookup);
        for (i, m) in out.iter().enumerate() {
            assert_eq!(m.pos, i);
            assert_eq!(m.value, encode_kmer(seq, i, 3, &DnaLookup));
        }
    }

    #[test]
    fn buffer_is_reused() {
        let mut buf = vec![Minimizer::default(); 50];
        minimizers_along(b"ACGTACG", 2, 3, &DnaLookup, &mut buf);
        assert_eq!(buf.len(), 4);
    }

    #[test]
    #[should_panic(expected = "runs past sequence end")]
    fn short_sequence_panics() {
        window_minimizers(b"ACG", 2, 3, &DnaLookup);
    }
}
