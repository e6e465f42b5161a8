//! The LSH index: insert and query over a [`BucketStore`].
//!
//! Every sketch is copied into one bucket per stage. A query scans the
//! bucket its signature addresses in every stage and keeps the best hits
//! across all of them, so a near-duplicate is found as long as it agrees
//! with the query on at least one full band.
//!
//! ```rust
//! use seqlsh::{LshIndex, LshParams, MemoryStore, Sketch};
//!
//! let params = LshParams::new(8, 4, 16).unwrap();
//! let mut index = LshIndex::new(MemoryStore::new(params).unwrap());
//!
//! index.insert(Sketch::new(vec![1, 2, 3, 4, 5, 6, 7, 8], "famA")).unwrap();
//! index.insert(Sketch::new(vec![1, 2, 3, 4, 9, 9, 9, 9], "famA")).unwrap();
//! index.insert(Sketch::new(vec![8, 7, 6, 5, 4, 3, 2, 1], "famB")).unwrap();
//!
//! let hits = index.query(&[1, 2, 3, 4, 5, 6, 7, 0], 10, 0.6).unwrap();
//! assert_eq!(hits.first().unwrap().target, "famA");
//! assert!(hits.iter().all(|h| h.target == "famA"));
//! ```

use std::collections::BTreeMap;

use tracing::debug;

use crate::bucket::Bucket;
use crate::error::Result;
use crate::hit::HitSet;
use crate::params::{LshParams, StageAddresses};
use crate::sketch::{MismatchFraction, SignatureMetric, Sketch};
use crate::store::{BucketStore, DiskStore};

/// Locality-sensitive hash index over a bucket store.
#[derive(Debug)]
pub struct LshIndex<S, M = MismatchFraction> {
    store: S,
    metric: M,
}

impl<S: BucketStore> LshIndex<S, MismatchFraction> {
    /// Index using the positional mismatch fraction as distance.
    pub fn new(store: S) -> Self {
        Self::with_metric(store, MismatchFraction)
    }
}

impl<S: BucketStore, M: SignatureMetric> LshIndex<S, M> {
    /// Index comparing signatures with `metric`.
    pub fn with_metric(store: S, metric: M) -> Self {
        Self { store, metric }
    }

    /// Shape of the underlying table.
    pub fn params(&self) -> &LshParams {
        self.store.params()
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    pub fn metric(&self) -> &M {
        &self.metric
    }

    /// Bucket index of `signature` in each stage, after a width check.
    pub fn address_of(&self, signature: &[u32]) -> Result<StageAddresses> {
        let params = self.store.params();
        params.check_width(signature)?;
        Ok(params.address_of(signature))
    }

    /// Add `sketch` to its bucket in every stage.
    ///
    /// Inserting the same sketch twice stores it twice.
    pub fn insert(&mut self, sketch: Sketch) -> Result<()> {
        let addresses = self.address_of(sketch.signature())?;
        let last = addresses.len() - 1;
        let mut sketch = Some(sketch);
        for (stage, &index) in addresses.iter().enumerate() {
            let copy = if stage == last {
                sketch.take()
            } else {
                sketch.clone()
            };
            if let Some(copy) = copy {
                self.store.fetch(stage, index)?.add(copy);
            }
        }
        Ok(())
    }

    /// Best `max_results` sketches within `max_distance` of `signature`.
    pub fn query(
        &mut self,
        signature: &[u32],
        max_results: usize,
        max_distance: f64,
    ) -> Result<HitSet> {
        let addresses = self.address_of(signature)?;
        let mut hits = HitSet::new(max_results);
        for (stage, &index) in addresses.iter().enumerate() {
            let bucket = self.store.fetch(stage, index)?;
            bucket.search(&mut hits, max_distance, signature, &self.metric);
        }
        Ok(hits)
    }

    /// [`LshIndex::query`] with the signature of `sketch`.
    pub fn query_sketch(
        &mut self,
        sketch: &Sketch,
        max_results: usize,
        max_distance: f64,
    ) -> Result<HitSet> {
        self.query(sketch.signature(), max_results, max_distance)
    }

    /// Number of inserted sketches, counted over stage 0.
    pub fn len(&self) -> Result<usize> {
        (0..self.params().buckets).try_fold(0, |total, index| {
            Ok(total + self.store.bucket_len(0, index)?)
        })
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// Every stored sketch named `name`.
    pub fn find_by_name(&mut self, name: &str) -> Result<Vec<Sketch>> {
        let mut found = Vec::new();
        for index in 0..self.params().buckets {
            if !self.store.bucket_exists(0, index)? {
                continue;
            }
            let bucket = self.store.fetch(0, index)?;
            found.extend(bucket.search_by_name(name).into_iter().cloned());
        }
        Ok(found)
    }

    /// How often sketches share a bucket with another sketch of the same name.
    ///
    /// Meaningful when names are cluster ids: a sketch is *good* if some
    /// stage puts it next to another member of its cluster, *bad* otherwise.
    /// Each sketch is visited once through its stage-0 copy.
    pub fn quality(&mut self) -> Result<QualityReport> {
        let mut report = QualityReport::default();
        for index in 0..self.params().buckets {
            if !self.store.bucket_exists(0, index)? {
                continue;
            }
            // Other stages are fetched while walking this one.
            let sketches = self.store.fetch(0, index)?.sketches().to_vec();
            for sketch in &sketches {
                let good = self.has_named_neighbor(sketch)?;
                report.record(sketch.name(), good);
            }
        }
        debug!(
            good = report.good(),
            bad = report.bad(),
            names = report.per_name.len(),
            "computed cluster quality"
        );
        Ok(report)
    }

    fn has_named_neighbor(&mut self, sketch: &Sketch) -> Result<bool> {
        let addresses = self.store.params().address_of(sketch.signature());
        for (stage, &index) in addresses.iter().enumerate() {
            let bucket = self.store.fetch(stage, index)?;
            if same_name_besides_self(bucket, sketch) {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Occupancy summary of the table.
    pub fn stats(&self) -> Result<TableStats> {
        let params = *self.params();
        let mut stats = TableStats {
            sketches: 0,
            occupied_per_stage: vec![0; params.stages],
            largest_bucket: 0,
        };
        for stage in 0..params.stages {
            for index in 0..params.buckets {
                let len = self.store.bucket_len(stage, index)?;
                if len > 0 {
                    stats.occupied_per_stage[stage] += 1;
                }
                if stage == 0 {
                    stats.sketches += len;
                }
                stats.largest_bucket = stats.largest_bucket.max(len);
            }
        }
        Ok(stats)
    }
}

impl<M: SignatureMetric> LshIndex<DiskStore, M> {
    /// Write every modified resident bucket to disk.
    pub fn save_all(&mut self) -> Result<()> {
        self.store.save_all()
    }

    /// Change how many buckets the disk store keeps in memory.
    pub fn set_cache_limit(&mut self, limit: usize) -> Result<()> {
        self.store.set_cache_limit(limit)
    }

    /// Save and release the underlying store.
    pub fn close(self) -> Result<()> {
        self.store.close()
    }
}

/// Whether `bucket` holds a sketch named like `sketch` other than its own copy.
///
/// Each inserted sketch has exactly one copy per stage, so skipping the first
/// equal entry skips the sketch itself; a second equal entry is a separate
/// insert and counts as a neighbour.
fn same_name_besides_self(bucket: &Bucket, sketch: &Sketch) -> bool {
    let mut skipped_self = false;
    for other in bucket {
        if !skipped_self && other == sketch {
            skipped_self = true;
            continue;
        }
        if other.name() == sketch.name() {
            return true;
        }
    }
    false
}

/// Good/bad counts for one name.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NameQuality {
    pub good: usize,
    pub bad: usize,
}

/// Result of [`LshIndex::quality`].
#[derive(Debug, Clone, Default)]
pub struct QualityReport {
    pub per_name: BTreeMap<String, NameQuality>,
}

impl QualityReport {
    fn record(&mut self, name: &str, good: bool) {
        let entry = self.per_name.entry(name.to_string()).or_default();
        if good {
            entry.good += 1;
        } else {
            entry.bad += 1;
        }
    }

    /// Sketches with a same-named neighbour in some stage.
    pub fn good(&self) -> usize {
        self.per_name.values().map(|q| q.good).sum()
    }

    /// Sketches with no same-named neighbour.
    pub fn bad(&self) -> usize {
        self.per_name.values().map(|q| q.bad).sum()
    }

    /// `good / (good + bad)`; 1.0 when nothing is bad, including an empty index.
    pub fn ratio(&self) -> f64 {
        let (good, bad) = (self.good(), self.bad());
        if bad == 0 {
            return 1.0;
        }
        if good == 0 {
            return 0.0;
        }
        good as f64 / (good + bad) as f64
    }
}

/// Result of [`LshIndex::stats`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableStats {
    /// Inserted sketches (stage-0 copies).
    pub sketches: usize,
    /// Non-empty buckets in each stage.
    pub occupied_per_stage: Vec<usize>,
    /// Size of the fullest bucket in any stage.
    pub largest_bucket: usize,
}
