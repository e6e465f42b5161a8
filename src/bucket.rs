//! A bucket: the sketches that hashed to one `(stage, index)` coordinate.

use std::slice;

use crate::hit::HitSet;
use crate::sketch::{SignatureMetric, Sketch};

/// Unordered collection of sketches with linear-scan search.
///
/// Buckets only grow. The `modified` flag and `last_touched` clock are
/// bookkeeping for the disk store's cache; the memory store ignores them.
#[derive(Debug, Clone, Default)]
pub struct Bucket {
    sketches: Vec<Sketch>,
    modified: bool,
    last_touched: u64,
}

impl Bucket {
    /// Empty, unmodified bucket.
    pub fn new() -> Self {
        Self::default()
    }

    /// Bucket restored from storage: not modified.
    pub(crate) fn from_sketches(sketches: Vec<Sketch>) -> Self {
        Self {
            sketches,
            modified: false,
            last_touched: 0,
        }
    }

    /// Append `sketch` and mark the bucket modified.
    pub fn add(&mut self, sketch: Sketch) {
        self.sketches.push(sketch);
        self.modified = true;
    }

    /// Sketches stored under exactly `name`.
    pub fn search_by_name(&self, name: &str) -> Vec<&Sketch> {
        self.sketches.iter().filter(|s| s.name() == name).collect()
    }

    /// Merge every sketch within `max_distance` of `query` into `hits`.
    ///
    /// Returns how many candidates were accepted into the set.
    pub fn search<M: SignatureMetric + ?Sized>(
        &self,
        hits: &mut HitSet,
        max_distance: f64,
        query: &[u32],
        metric: &M,
    ) -> usize {
        let mut accepted = 0;
        for sketch in &self.sketches {
            let distance = metric.distance(query, sketch.signature());
            if distance <= max_distance && hits.merge(distance, sketch.name()) {
                accepted += 1;
            }
        }
        accepted
    }

    /// Number of stored sketches.
    pub fn len(&self) -> usize {
        self.sketches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sketches.is_empty()
    }

    pub fn iter(&self) -> slice::Iter<'_, Sketch> {
        self.sketches.iter()
    }

    /// Stored sketches in insertion order.
    pub fn sketches(&self) -> &[Sketch] {
        &self.sketches
    }

    /// Whether the bucket changed since it was last written or loaded.
    pub fn is_modified(&self) -> bool {
        self.modified
    }

    #[cfg(test)]
    pub(crate) fn mark_modified(&mut self) {
        self.modified = true;
    }

    pub(crate) fn mark_clean(&mut self) {
        self.modified = false;
    }

    /// Logical time of the last fetch through a disk store.
    pub fn last_touched(&self) -> u64 {
        self.last_touched
    }

    pub(crate) fn touch(&mut self, clock: u64) {
        self.last_touched = clock;
    }
}

impl<'a> IntoIterator for &'a Bucket {
    type Item = &'a Sketch;
    type IntoIter = slice::Iter<'a, Sketch>;

    fn into_iter(self) -> Self::IntoIter {
        self.sketches.iter()
    }
}
