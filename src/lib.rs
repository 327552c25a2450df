//! Minimizer-sketch k-mer index for repeat screening.
//!
//! Reference sequences are reduced to their window minimizers (the smallest
//! 2-bit packed k-mer among `w` consecutive k-mer starts). A query is flagged
//! as a likely repeat when at least half of its windows have a minimizer that
//! is already indexed, which lets an aligner skip or defer expensive exact
//! alignment of repetitive reads.
//!
//! - [`encode`]: 2-bit base codes, rolling k-mers, pluggable symbol lookup
//! - [`minimizer`]: per-window and whole-sequence minimizer extraction
//! - [`KmerIndex`]: build, membership, repeat vote, repeat sources, persistence
//!
//! The persisted format keeps only the distinct minimizer values (see
//! [`io`](crate::io)). A reloaded index screens repeats but cannot name the
//! reference sequences they came from.

mod config;
pub mod encode;
mod index;
pub mod io;
pub mod minimizer;
mod radix;

pub use config::IndexConfig;
pub use encode::{BaseLookup, DnaLookup, decode_kmer, encode_kmer, reverse_complement, roll_kmer};
pub use index::{IndexEntry, IndexError, KmerIndex, SeqId};
pub use io::Endianness;
pub use minimizer::{Minimizer, minimizer_of_window, minimizers_along, window_minimizers};
