//! Eager in-memory bucket grid.

use super::{check_coordinate, BucketStore};
use crate::bucket::Bucket;
use crate::error::Result;
use crate::params::LshParams;

/// All `stages * buckets` buckets allocated at construction.
///
/// Flat row-major layout: bucket `(stage, index)` lives at
/// `stage * buckets + index`.
#[derive(Debug, Clone)]
pub struct MemoryStore {
    params: LshParams,
    grid: Vec<Bucket>,
}

impl MemoryStore {
    pub fn new(params: LshParams) -> Result<Self> {
        params.validate()?;
        let cells = params.stages * params.buckets;
        Ok(Self {
            params,
            grid: vec![Bucket::new(); cells],
        })
    }

    fn slot(&self, stage: usize, index: usize) -> usize {
        stage * self.params.buckets + index
    }

    /// Read-only view of a bucket.
    pub fn bucket(&self, stage: usize, index: usize) -> Result<&Bucket> {
        check_coordinate(&self.params, stage, index)?;
        Ok(&self.grid[self.slot(stage, index)])
    }
}

impl BucketStore for MemoryStore {
    fn params(&self) -> &LshParams {
        &self.params
    }

    fn fetch(&mut self, stage: usize, index: usize) -> Result<&mut Bucket> {
        check_coordinate(&self.params, stage, index)?;
        let slot = self.slot(stage, index);
        Ok(&mut self.grid[slot])
    }

    fn bucket_exists(&self, stage: usize, index: usize) -> Result<bool> {
        Ok(!self.bucket(stage, index)?.is_empty())
    }

    fn bucket_len(&self, stage: usize, index: usize) -> Result<usize> {
        Ok(self.bucket(stage, index)?.len())
    }
}
