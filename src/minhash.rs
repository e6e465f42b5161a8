//! MinHash signatures of sequence k-mer sets.
//!
//! For each of `width` seeded hash functions `h_i`, the signature keeps
//! `min_{x in K} h_i(x)` over the k-mer set `K` of a sequence. Two sequences
//! agree at position `i` with probability equal to the Jaccard similarity of
//! their k-mer sets, so [`MismatchFraction`](crate::MismatchFraction) between
//! signatures estimates the Jaccard distance.
//!
//! Hashing uses seeded xxh3, which is stable across processes and Rust
//! releases; signatures stored in a disk table stay comparable with
//! signatures computed later.
//!
//! ## References
//!
//! - Broder (1997). "On the resemblance and containment of documents"
//! - Ondov et al. (2016). "Mash: fast genome and metagenome distance
//!   estimation using MinHash"

use xxhash_rust::xxh3::xxh3_64_with_seed;

use crate::error::{LshError, Result};
use crate::sketch::{Signature, Sketch};

/// Seed used by [`MinHasher::new`].
pub const DEFAULT_SEED: u64 = 42;

/// Signature generator for a fixed k-mer length and signature width.
#[derive(Debug, Clone)]
pub struct MinHasher {
    kmer_size: usize,
    seeds: Vec<u64>,
}

impl MinHasher {
    /// Create a generator with `width` hash functions over `kmer_size`-mers.
    pub fn new(kmer_size: usize, width: usize) -> Result<Self> {
        Self::with_seed(kmer_size, width, DEFAULT_SEED)
    }

    /// Create a generator with a specific seed for the hash family.
    pub fn with_seed(kmer_size: usize, width: usize, seed: u64) -> Result<Self> {
        if kmer_size == 0 {
            return Err(LshError::InvalidParameter(
                "kmer_size must be at least 1".to_string(),
            ));
        }
        if width == 0 {
            return Err(LshError::InvalidParameter(
                "signature width must be at least 1".to_string(),
            ));
        }

        let mut seeds = Vec::with_capacity(width);
        let mut state = seed;
        for _ in 0..width {
            // LCG step (Knuth MMIX constants)
            state = state
                .wrapping_mul(6364136223846793005)
                .wrapping_add(1442695040888963407);
            seeds.push(state);
        }

        Ok(Self { kmer_size, seeds })
    }

    pub fn kmer_size(&self) -> usize {
        self.kmer_size
    }

    /// Signature width.
    pub fn width(&self) -> usize {
        self.seeds.len()
    }

    /// Signature of an explicit k-mer set.
    ///
    /// Duplicates do not matter. An empty set yields all `u32::MAX`.
    pub fn signature_of_kmers<'a, I>(&self, kmers: I) -> Signature
    where
        I: IntoIterator<Item = &'a [u8]>,
    {
        let mut mins = vec![u32::MAX; self.seeds.len()];
        for kmer in kmers {
            for (min, &seed) in mins.iter_mut().zip(self.seeds.iter()) {
                let hash = (xxh3_64_with_seed(kmer, seed) >> 32) as u32;
                if hash < *min {
                    *min = hash;
                }
            }
        }
        Signature::new(mins)
    }

    /// Signature of the k-mer set of `sequence`.
    ///
    /// Letters are upper-cased first so soft-masked input hashes like the
    /// unmasked sequence. Sequences shorter than `kmer_size` have no k-mers.
    pub fn signature(&self, sequence: &[u8]) -> Signature {
        let upper = sequence.to_ascii_uppercase();
        self.signature_of_kmers(upper.windows(self.kmer_size))
    }

    /// Named sketch of `sequence`.
    pub fn sketch(&self, sequence: &[u8], name: impl Into<String>) -> Sketch {
        Sketch::new(self.signature(sequence), name)
    }
}

impl Sketch {
    /// Hash `sequence` into a `width`-value signature over `kmer_size`-mers.
    pub fn from_sequence(
        sequence: &[u8],
        name: impl Into<String>,
        kmer_size: usize,
        width: usize,
    ) -> Result<Self> {
        Ok(MinHasher::new(kmer_size, width)?.sketch(sequence, name))
    }
}
