//! K-mer encoding: 2-bit base codes, rolling k-mers, symbol lookup.
//!
//! Conventions
//! - Sequences are plain byte slices. A byte in `0..=3` is already a base code
//!   (A=0, C=1, G=2, T=3); any other byte is a symbol resolved through a
//!   [`BaseLookup`].
//! - K-mers are **LSB-aligned**: the lower `2k` bits are used and the earliest
//!   base sits in the most significant of them.

/// Largest k that fits a packed `u64`.
pub const MAX_K: usize = 32;

/// Resolves a sequence symbol to a 2-bit base code.
///
/// Implementations must return a value in `0..=3` for every input byte.
pub trait BaseLookup {
    fn resolve(&self, symbol: u8) -> u8;
}

/// 256-entry LUT: bytes `0..=3` pass through, `ACGTU` map to their codes,
/// IUPAC ambiguity codes map to the lowest-coded base they admit, and every
/// other byte maps to A.
pub static DNA_LUT: [u8; 256] = {
    let mut t = [0u8; 256];
    t[1] = 1;
    t[2] = 2;
    t[3] = 3;
    let upper: [(u8, u8); 16] = [
        (b'A', 0),
        (b'C', 1),
        (b'G', 2),
        (b'T', 3),
        (b'U', 3),
        (b'R', 0), // A/G
        (b'Y', 1), // C/T
        (b'S', 1), // C/G
        (b'W', 0), // A/T
        (b'K', 2), // G/T
        (b'M', 0), // A/C
        (b'B', 1), // C/G/T
        (b'D', 0), // A/G/T
        (b'H', 0), // A/C/T
        (b'V', 0), // A/C/G
        (b'N', 0),
    ];
    let mut i = 0;
    while i < upper.len() {
        let (sym, code) = upper[i];
        t[sym as usize] = code;
        t[sym.to_ascii_lowercase() as usize] = code;
        i += 1;
    }
    t
};

/// Default lookup backed by [`DNA_LUT`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DnaLookup;

impl BaseLookup for DnaLookup {
    #[inline]
    fn resolve(&self, symbol: u8) -> u8 {
        DNA_LUT[symbol as usize]
    }
}

#[inline]
pub(crate) fn base_code<L: BaseLookup + ?Sized>(symbol: u8, lookup: &L) -> u64 {
    let code = if symbol > 3 {
        lookup.resolve(symbol)
    } else {
        symbol
    };
    debug_assert!(code <= 3, "lookup returned {code} for symbol {symbol}");
    (code & 0b11) as u64
}

#[inline]
pub(crate) fn assert_k(k: usize) {
    assert!(k > 0 && k <= MAX_K, "k must be 1..={MAX_K}, got {k}");
}

/// Pack `k` bases of `seq` starting at `offset` into an **LSB-aligned** k-mer.
///
/// # Panics
/// If `k` is not in `1..=32` or `offset + k > seq.len()`.
#[inline]
pub fn encode_kmer<L: BaseLookup + ?Sized>(
    seq: &[u8],
    offset: usize,
    k: usize,
    lookup: &L,
) -> u64 {
    assert_k(k);
    assert!(
        offset + k <= seq.len(),
        "k-mer at {offset} (k={k}) runs past sequence end {}",
        seq.len()
    );
    seq[offset..offset + k]
        .iter()
        .fold(0u64, |kmer, &b| (kmer << 2) | base_code(b, lookup))
}

/// Shift `kmer` one base forward: drop the outgoing (earliest) base and append
/// the 2-bit `code`.
#[inline]
pub fn roll_kmer(kmer: u64, code: u8, k: usize) -> u64 {
    debug_assert!(k > 0 && k <= MAX_K);
    let keep = (1u64 << ((k - 1) * 2)) - 1;
    ((kmer & keep) << 2) | (code & 0b11) as u64
}

/// Render an LSB-aligned k-mer as `ACGT` text, earliest base first.
pub fn decode_kmer(kmer: u64, k: usize) -> String {
    debug_assert!(k <= MAX_K);
    (0..k)
        .rev()
        .map(|i| b"ACGT"[((kmer >> (i * 2)) & 0b11) as usize] as char)
        .collect()
}

/// Reverse complement of `seq`, returned as base codes (`0..=3`).
pub fn reverse_complement<L: BaseLookup + ?Sized>(seq: &[u8], lookup: &L) -> Vec<u8> {
    seq.iter()
        .rev()
        .map(|&b| (base_code(b, lookup) ^ 0b11) as u8)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roll_matches_reencode() {
        let seq = b"ACGTTGCAAC";
        let k = 4;
        let mut kmer = encode_kmer(seq, 0, k, &DnaLookup);
        for off in 1..=seq.len() - k {
            kmer = roll_kmer(kmer, DNA_LUT[seq[off + k - 1] as usize], k);
            assert_eq!(kmer, encode_kmer(seq, off, k, &DnaLookup));
        }
    }

    #[test]
    fn roll_full_width() {
        let seq = [3u8; 33];
        let kmer = encode_kmer(&seq, 0, 32, &DnaLookup);
        assert_eq!(kmer, u64::MAX);
        assert_eq!(roll_kmer(kmer, 0, 32), u64::MAX << 2);
    }

    #[test]
    fn codes_and_symbols_agree() {
        assert_eq!(
            encode_kmer(&[0, 1, 2, 3], 0, 4, &DnaLookup),
            encode_kmer(b"acgt", 0, 4, &DnaLookup)
        );
        assert_eq!(encode_kmer(b"NRY", 0, 3, &DnaLookup), 0b00_00_01);
    }

    #[test]
    #[should_panic(expected = "k must be")]
    fn k_over_32_panics() {
        encode_kmer(&[0u8; 40], 0, 33, &DnaLookup);
    }
}
