//! Build/query configuration.

use crate::encode::MAX_K;
use crate::index::IndexError;
use crate::io::Endianness;

/// Index parameters plus how the index is stored and queried.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IndexConfig {
    window: usize,
    k: usize,
    endianness: Endianness,
    both_strands: bool,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            window: 10,
            k: 31,
            endianness: Endianness::native(),
            both_strands: true,
        }
    }
}

impl IndexConfig {
    /// Number of consecutive k-mer starts per window (default 10).
    pub fn with_window(mut self, w: usize) -> Self {
        self.window = w;
        self
    }
    /// K-mer length, 1..=32 (default 31).
    pub fn with_k(mut self, k: usize) -> Self {
        self.k = k;
        self
    }
    /// Byte order of the persisted index (default: native).
    pub fn with_endianness(mut self, e: Endianness) -> Self {
        self.endianness = e;
        self
    }
    /// Screen queries on both strands (default: true).
    pub fn with_both_strands(mut self, yes: bool) -> Self {
        self.both_strands = yes;
        self
    }

    pub fn window(&self) -> usize {
        self.window
    }
    pub fn k(&self) -> usize {
        self.k
    }
    pub fn endianness(&self) -> Endianness {
        self.endianness
    }
    pub fn both_strands(&self) -> bool {
        self.both_strands
    }

    /// Shortest sequence that yields one window under this configuration.
    pub fn min_seq_len(&self) -> usize {
        self.window + self.k.max(1) - 1
    }

    /// Reject parameters that would trip the index's fatal preconditions.
    pub fn validate(&self) -> Result<(), IndexError> {
        if self.k == 0 || self.k > MAX_K {
            return Err(IndexError::Config(format!(
                "k must be 1..={MAX_K}, got {}",
                self.k
            )));
        }
        if self.window == 0 {
            return Err(IndexError::Config("window size must be at least 1".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let cfg = IndexConfig::default();
        cfg.validate().unwrap();
        assert_eq!(cfg.min_seq_len(), 40);
    }

    #[test]
    fn setters_and_getters_pair_up() {
        let cfg = IndexConfig::default()
            .with_window(4)
            .with_k(7)
            .with_endianness(Endianness::Big)
            .with_both_strands(false);
        assert_eq!(cfg.window(), 4);
        assert_eq!(cfg.k(), 7);
        assert_eq!(cfg.endianness(), Endianness::Big);
        assert!(!cfg.both_strands());
        assert_eq!(cfg.min_seq_len(), 10);
    }

    #[test]
    fn rejects_out_of_range() {
        assert!(IndexConfig::default().with_k(33).validate().is_err());
        assert!(IndexConfig::default().with_k(0).validate().is_err());
        assert!(IndexConfig::default().with_window(0).validate().is_err());
    }
}
