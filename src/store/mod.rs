//! Physical bucket storage behind an [`LshIndex`](crate::LshIndex).
//!
//! The index only computes coordinates and runs the insert/query protocol;
//! a [`BucketStore`] decides where the S×B grid of buckets lives:
//!
//! - [`MemoryStore`]: every bucket allocated up front, nothing persisted.
//! - [`DiskStore`]: one file per non-empty bucket, with a bounded cache of
//!   recently used buckets in memory.

mod disk;
mod memory;

pub use disk::{BucketId, DiskStore, BUCKET_EXTENSION, CONTROL_FILE};
pub use memory::MemoryStore;

use crate::bucket::Bucket;
use crate::error::{LshError, Result};
use crate::params::LshParams;

/// Storage backend for the bucket grid.
pub trait BucketStore {
    /// Shape of the grid.
    fn params(&self) -> &LshParams;

    /// Bucket at `(stage, index)`, created empty if it does not exist yet.
    fn fetch(&mut self, stage: usize, index: usize) -> Result<&mut Bucket>;

    /// Whether the bucket at `(stage, index)` holds at least one sketch.
    fn bucket_exists(&self, stage: usize, index: usize) -> Result<bool>;

    /// Number of sketches in the bucket at `(stage, index)`.
    ///
    /// Must not change which buckets are resident.
    fn bucket_len(&self, stage: usize, index: usize) -> Result<usize>;
}

impl<S: BucketStore + ?Sized> BucketStore for Box<S> {
    fn params(&self) -> &LshParams {
        (**self).params()
    }

    fn fetch(&mut self, stage: usize, index: usize) -> Result<&mut Bucket> {
        (**self).fetch(stage, index)
    }

    fn bucket_exists(&self, stage: usize, index: usize) -> Result<bool> {
        (**self).bucket_exists(stage, index)
    }

    fn bucket_len(&self, stage: usize, index: usize) -> Result<usize> {
        (**self).bucket_len(stage, index)
    }
}

pub(crate) fn check_coordinate(params: &LshParams, stage: usize, index: usize) -> Result<()> {
    if stage >= params.stages || index >= params.buckets {
        return Err(LshError::InvalidParameter(format!(
            "bucket ({stage}, {index}) outside {}x{} grid",
            params.stages, params.buckets
        )));
    }
    Ok(())
}
