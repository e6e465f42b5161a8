//! Table parameters and band/stage addressing.
//!
//! A table has `stages` independent hash tables of `buckets` buckets each.
//! A signature of `width` values is cut into `stages` contiguous bands; band
//! `s` is hashed into a bucket index of stage `s`.
//!
//! ```text
//! width = 10, stages = 3  =>  band = max(1, 10 / 3) = 3
//!
//!   [ v0 v1 v2 | v3 v4 v5 | v6 v7 v8 v9 ]
//!     stage 0    stage 1    stage 2 (absorbs the remainder)
//! ```
//!
//! Two signatures collide in stage `s` when they agree on every value of
//! band `s` (or when their band hashes happen to land in the same bucket).
//! With `r` values per band, two sketches of estimated Jaccard `J` share at
//! least one bucket with probability `1 - (1 - J^r)^stages`.

use std::fmt;
use std::ops::Range;

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::error::{LshError, Result};

/// Multiplier applied to every signature value before reduction (2^31 - 1).
///
/// Changing it changes the address of every stored sketch, so tables on
/// disk are only readable with the constant they were written with.
pub const LARGE_PRIME: u64 = 2_147_483_647;

/// Largest accepted `stages`; stage directories are named with 4 digits.
pub const MAX_STAGES: usize = 10_000;

/// Largest accepted `buckets`; bucket files are named with 6 digits.
///
/// Also keeps the band hash in range: with `hash < MAX_BUCKETS` the sum
/// `hash + value * LARGE_PRIME` stays below `2^64`.
pub const MAX_BUCKETS: usize = 1_000_000;

/// Bucket indices of one signature, one per stage.
pub type StageAddresses = SmallVec<[usize; 16]>;

/// Shape of an LSH table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LshParams {
    /// Signature length every sketch in the table must have.
    pub width: usize,
    /// Number of bands, i.e. independent hash tables.
    pub stages: usize,
    /// Buckets per stage.
    pub buckets: usize,
}

impl Default for LshParams {
    fn default() -> Self {
        Self {
            width: 200,
            stages: 15,
            buckets: 20,
        }
    }
}

impl fmt::Display for LshParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "width={} stages={} buckets={}",
            self.width, self.stages, self.buckets
        )
    }
}

impl LshParams {
    /// Create and validate parameters.
    pub fn new(width: usize, stages: usize, buckets: usize) -> Result<Self> {
        let params = Self {
            width,
            stages,
            buckets,
        };
        params.validate()?;
        Ok(params)
    }

    /// Reject shapes that cannot address anything or cannot be laid out
    /// on disk.
    pub fn validate(&self) -> Result<()> {
        if self.width == 0 {
            return Err(LshError::InvalidParameter(
                "width must be at least 1".to_string(),
            ));
        }
        if self.stages == 0 {
            return Err(LshError::InvalidParameter(
                "stages must be at least 1".to_string(),
            ));
        }
        if self.buckets == 0 {
            return Err(LshError::InvalidParameter(
                "buckets must be at least 1".to_string(),
            ));
        }
        if self.stages > MAX_STAGES {
            return Err(LshError::InvalidParameter(format!(
                "stages must be at most {MAX_STAGES}, got {}",
                self.stages
            )));
        }
        if self.buckets > MAX_BUCKETS {
            return Err(LshError::InvalidParameter(format!(
                "buckets must be at most {MAX_BUCKETS}, got {}",
                self.buckets
            )));
        }
        Ok(())
    }

    /// Values per band for every stage but the last.
    pub fn band_width(&self) -> usize {
        (self.width / self.stages.max(1)).max(1)
    }

    /// Signature positions hashed by `stage`.
    ///
    /// The last stage runs to the end of the signature. When there are more
    /// stages than values, trailing stages get an empty range.
    pub fn band_range(&self, stage: usize) -> Range<usize> {
        let band = self.band_width();
        let start = (stage * band).min(self.width);
        let end = if stage + 1 == self.stages {
            self.width
        } else {
            ((stage + 1) * band).min(self.width)
        };
        start..end
    }

    /// Bucket index of `signature` in every stage.
    ///
    /// Pure in `(signature, width, stages, buckets)`. Values past `width`
    /// are ignored; callers validate the length first.
    pub fn address_of(&self, signature: &[u32]) -> StageAddresses {
        let buckets = self.buckets as u64;
        (0..self.stages)
            .map(|stage| {
                let range = self.band_range(stage);
                let end = range.end.min(signature.len());
                let start = range.start.min(end);
                signature[start..end].iter().fold(0u64, |hash, &value| {
                    (hash + u64::from(value) * LARGE_PRIME) % buckets
                }) as usize
            })
            .collect()
    }

    /// Similarity at which the collision probability curve is steepest.
    ///
    /// Approximately `(1/stages)^(1/band_width)`; sketches above this
    /// estimated Jaccard are likely to share a bucket.
    pub fn approx_threshold(&self) -> f64 {
        (1.0 / self.stages as f64).powf(1.0 / self.band_width() as f64)
    }

    /// Check `signature` has the table width.
    pub fn check_width(&self, signature: &[u32]) -> Result<()> {
        if signature.len() != self.width {
            return Err(LshError::DimensionMismatch {
                expected: self.width,
                actual: signature.len(),
            });
        }
        Ok(())
    }
}

/// Options specific to the disk-backed table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiskOptions {
    /// k-mer length the sketches were built with. Recorded, not interpreted.
    pub kmer_size: usize,
    /// Maximum number of buckets kept in memory.
    pub cache_limit: usize,
}

/// Default number of resident buckets for a disk table.
pub const DEFAULT_CACHE_LIMIT: usize = 1000;

impl Default for DiskOptions {
    fn default() -> Self {
        Self {
            kmer_size: 5,
            cache_limit: DEFAULT_CACHE_LIMIT,
        }
    }
}

impl DiskOptions {
    /// Reject a zero cache limit.
    pub fn validate(&self) -> Result<()> {
        if self.cache_limit == 0 {
            return Err(LshError::InvalidParameter(
                "cache_limit must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
