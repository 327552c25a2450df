//! LSD radix sort for index entries keyed by `(value, seq_id)`.
//! 8-bit digits, least significant first: 4 passes over `seq_id`, then 8 over
//! `value`. Stable via counting + prefix sums.

use crate::index::IndexEntry;

const ID_PASSES: u32 = 4;
const VALUE_PASSES: u32 = 8;

#[inline]
fn digit(e: &IndexEntry, pass: u32) -> usize {
    if pass < ID_PASSES {
        ((e.seq_id >> (pass * 8)) & 0xFF) as usize
    } else {
        ((e.value >> ((pass - ID_PASSES) * 8)) & 0xFF) as usize
    }
}

/// Sort `entries` ascending by `(value, seq_id)`.
/// The scratch buffer is allocated once and reused across passes; passes whose
/// digit is the same for every entry are skipped.
pub fn radix_sort_entries(entries: &mut [IndexEntry]) {
    let n = entries.len();
    if n <= 1 {
        return;
    }

    let mut tmp = vec![IndexEntry::default(); n];

    for pass in 0..ID_PASSES + VALUE_PASSES {
        let mut counts = [0usize; 256];
        for e in entries.iter() {
            counts[digit(e, pass)] += 1;
        }
        if counts.iter().any(|&c| c == n) {
            continue;
        }

        // Prefix sums -> positions
        let mut sum = 0usize;
        for c in counts.iter_mut() {
            let count = *c;
            *c = sum;
            sum += count;
        }

        for e in entries.iter() {
            let d = digit(e, pass);
            tmp[counts[d]] = *e;
            counts[d] += 1;
        }

        entries.copy_from_slice(&tmp);
    }
}
