use repeat_kmer_index::encode::*;

#[test]
fn test_encode_roll_decode() {
    let s = b"ACGT";
    let k = 3;
    let code = encode_kmer(s, 0, k, &DnaLookup);
    assert_eq!(code, 0b00_01_10);
    assert_eq!(decode_kmer(code, k), "ACG");

    let next = roll_kmer(code, DNA_LUT[b'T' as usize], k);
    assert_eq!(next, encode_kmer(s, 1, k, &DnaLookup));
    assert_eq!(decode_kmer(next, k), "CGT");
}

#[test]
fn test_reverse_complement() {
    let rc = reverse_complement(b"AACGTN", &DnaLookup);
    // N resolves to A, whose complement is T
    assert_eq!(rc, vec![3, 0, 1, 2, 3, 3]);
    assert_eq!(reverse_complement(&rc, &DnaLookup), vec![0, 0, 1, 2, 3, 0]);
}

/// Lookup that treats every non-code symbol as G.
struct AllG;

impl BaseLookup for AllG {
    fn resolve(&self, _symbol: u8) -> u8 {
        2
    }
}

#[test]
fn test_injected_lookup() {
    assert_eq!(encode_kmer(b"NNN", 0, 3, &AllG), 0b10_10_10);
    // codes bypass the lookup
    assert_eq!(encode_kmer(&[0, 3, b'x'], 0, 3, &AllG), 0b00_11_10);
}
