//! Disk-backed bucket grid with a bounded LRU cache.
//!
//! # Layout
//!
//! ```text
//! <root>/
//! ├── control.txt              # "<width> <stages> <buckets> <kmer_size>\n"
//! ├── stage0000/
//! │   ├── bucket000000.lshb    # present iff the bucket is non-empty
//! │   └── ...
//! ├── stage0001/
//! └── ...
//! ```
//!
//! Bucket files use the format in [`crate::codec`]. Zero-padded names keep
//! directory listings sorted.
//!
//! # Cache
//!
//! At most `cache_limit` buckets are resident. Every fetch advances a
//! logical clock owned by the store and stamps the fetched bucket. When a
//! miss finds the cache full, the stalest buckets are evicted (smaller first
//! on equal stamps); modified ones are written out before they leave.
//!
//! A bucket leaves the cache only after a successful flush, so a failed
//! write surfaces as an error and the data stays resident and modified.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, info, trace, warn};

use super::{check_coordinate, BucketStore};
use crate::bucket::Bucket;
use crate::codec;
use crate::error::{LshError, Result};
use crate::params::{DiskOptions, LshParams};

/// Name of the parameter file at the table root.
pub const CONTROL_FILE: &str = "control.txt";

/// Extension of bucket files.
pub const BUCKET_EXTENSION: &str = "lshb";

/// Coordinate of a bucket in the grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BucketId {
    pub stage: usize,
    pub index: usize,
}

/// Bucket grid persisted under a directory.
#[derive(Debug)]
pub struct DiskStore {
    root: PathBuf,
    params: LshParams,
    kmer_size: usize,
    cache: HashMap<BucketId, Bucket>,
    cache_limit: usize,
    clock: u64,
}

impl DiskStore {
    /// Create an empty table at `root`.
    ///
    /// An existing directory is emptied first. Writes the control file and
    /// one directory per stage.
    pub fn create(
        root: impl Into<PathBuf>,
        params: LshParams,
        options: DiskOptions,
    ) -> Result<Self> {
        params.validate()?;
        options.validate()?;
        let root = root.into();

        if root.exists() {
            info!(root = %root.display(), "clearing existing table directory");
            clear_dir(&root)?;
        } else {
            fs::create_dir_all(&root).map_err(|e| LshError::io(&root, e))?;
        }

        let control = root.join(CONTROL_FILE);
        let line = format!(
            "{} {} {} {}\n",
            params.width, params.stages, params.buckets, options.kmer_size
        );
        fs::write(&control, line).map_err(|e| LshError::io(&control, e))?;

        for stage in 0..params.stages {
            let dir = stage_dir(&root, stage);
            fs::create_dir_all(&dir).map_err(|e| LshError::io(&dir, e))?;
        }

        info!(
            root = %root.display(),
            %params,
            kmer_size = options.kmer_size,
            "created disk table"
        );
        Ok(Self::from_parts(root, params, options))
    }

    /// Open a table previously written by [`DiskStore::create`].
    pub fn load(root: impl Into<PathBuf>) -> Result<Self> {
        Self::load_with(root, DiskOptions::default().cache_limit)
    }

    /// Open a table with a specific cache limit.
    pub fn load_with(root: impl Into<PathBuf>, cache_limit: usize) -> Result<Self> {
        let root = root.into();
        let (params, kmer_size) = read_control(&root.join(CONTROL_FILE))?;
        let options = DiskOptions {
            kmer_size,
            cache_limit,
        };
        options.validate()?;
        info!(root = %root.display(), %params, kmer_size, "loaded disk table");
        Ok(Self::from_parts(root, params, options))
    }

    /// Open a table and fail if it was created with other parameters.
    pub fn load_expecting(root: impl Into<PathBuf>, expected: &LshParams) -> Result<Self> {
        let store = Self::load(root)?;
        if store.params != *expected {
            return Err(LshError::ConfigMismatch {
                path: store.root.join(CONTROL_FILE),
                expected: expected.to_string(),
                found: store.params.to_string(),
            });
        }
        Ok(store)
    }

    fn from_parts(root: PathBuf, params: LshParams, options: DiskOptions) -> Self {
        Self {
            root,
            params,
            kmer_size: options.kmer_size,
            cache: HashMap::new(),
            cache_limit: options.cache_limit,
            clock: 0,
        }
    }

    /// Directory holding the table.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// k-mer length recorded in the control file.
    pub fn kmer_size(&self) -> usize {
        self.kmer_size
    }

    /// Maximum number of resident buckets.
    pub fn cache_limit(&self) -> usize {
        self.cache_limit
    }

    /// Number of buckets currently held in memory.
    pub fn resident_len(&self) -> usize {
        self.cache.len()
    }

    /// Whether `(stage, index)` is held in memory.
    pub fn is_resident(&self, stage: usize, index: usize) -> bool {
        self.cache.contains_key(&BucketId { stage, index })
    }

    /// Change the cache bound, evicting immediately if it shrank.
    pub fn set_cache_limit(&mut self, limit: usize) -> Result<()> {
        DiskOptions {
            kmer_size: self.kmer_size,
            cache_limit: limit,
        }
        .validate()?;
        self.cache_limit = limit;
        self.make_room(limit)
    }

    /// Path of the file backing `(stage, index)`.
    pub fn bucket_path(&self, stage: usize, index: usize) -> PathBuf {
        bucket_path(&self.root, BucketId { stage, index })
    }

    /// Write every modified resident bucket. Buckets stay resident.
    pub fn save_all(&mut self) -> Result<()> {
        let mut flushed = 0usize;
        for (&id, bucket) in self.cache.iter_mut() {
            if bucket.is_modified() {
                flush(&self.root, id, bucket)?;
                flushed += 1;
            }
        }
        debug!(flushed, resident = self.cache.len(), "saved resident buckets");
        Ok(())
    }

    /// Save everything and release the store.
    pub fn close(mut self) -> Result<()> {
        self.save_all()?;
        info!(root = %self.root.display(), "closed disk table");
        Ok(())
    }

    /// Evict until at most `target` buckets are resident.
    fn make_room(&mut self, target: usize) -> Result<()> {
        if self.cache.len() <= target {
            return Ok(());
        }
        let excess = self.cache.len() - target;

        let mut candidates: Vec<(u64, usize, BucketId)> = self
            .cache
            .iter()
            .map(|(&id, bucket)| (bucket.last_touched(), bucket.len(), id))
            .collect();
        candidates.sort_unstable();

        let mut flushed = 0usize;
        for &(_, _, id) in candidates.iter().take(excess) {
            if let Some(bucket) = self.cache.get_mut(&id) {
                if bucket.is_modified() {
                    flush(&self.root, id, bucket)?;
                    flushed += 1;
                }
            }
            self.cache.remove(&id);
        }
        debug!(evicted = excess, flushed, resident = self.cache.len(), "evicted buckets");
        Ok(())
    }

    fn read_bucket(&self, id: BucketId) -> Result<Bucket> {
        let path = bucket_path(&self.root, id);
        match fs::read(&path) {
            Ok(bytes) => {
                codec::decode(&bytes, self.params.width)
                    .map_err(|source| LshError::Corrupt { path, source })
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Bucket::new()),
            Err(e) => Err(LshError::io(path, e)),
        }
    }
}

impl BucketStore for DiskStore {
    fn params(&self) -> &LshParams {
        &self.params
    }

    fn fetch(&mut self, stage: usize, index: usize) -> Result<&mut Bucket> {
        check_coordinate(&self.params, stage, index)?;
        let id = BucketId { stage, index };
        self.clock += 1;
        let clock = self.clock;

        if !self.cache.contains_key(&id) {
            if self.cache.len() >= self.cache_limit {
                self.make_room(self.cache_limit.saturating_sub(1))?;
            }
            let bucket = self.read_bucket(id)?;
            trace!(stage, index, len = bucket.len(), "bucket cache miss");
            self.cache.insert(id, bucket);
        }

        let bucket = self.cache.entry(id).or_default();
        bucket.touch(clock);
        Ok(bucket)
    }

    fn bucket_exists(&self, stage: usize, index: usize) -> Result<bool> {
        check_coordinate(&self.params, stage, index)?;
        let id = BucketId { stage, index };
        if let Some(bucket) = self.cache.get(&id) {
            return Ok(!bucket.is_empty());
        }
        let path = bucket_path(&self.root, id);
        path.try_exists().map_err(|e| LshError::io(path, e))
    }

    fn bucket_len(&self, stage: usize, index: usize) -> Result<usize> {
        check_coordinate(&self.params, stage, index)?;
        let id = BucketId { stage, index };
        if let Some(bucket) = self.cache.get(&id) {
            return Ok(bucket.len());
        }
        let path = bucket_path(&self.root, id);
        let mut file = match fs::File::open(&path) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(LshError::io(path, e)),
        };
        match codec::read_count(&mut file) {
            Ok(Ok(count)) => Ok(count),
            Ok(Err(source)) => Err(LshError::Corrupt { path, source }),
            Err(e) => Err(LshError::io(path, e)),
        }
    }
}

impl Drop for DiskStore {
    fn drop(&mut self) {
        if !self.cache.values().any(Bucket::is_modified) {
            return;
        }
        if let Err(e) = self.save_all() {
            warn!(root = %self.root.display(), error = %e, "failed to save buckets on drop");
        }
    }
}

fn stage_dir(root: &Path, stage: usize) -> PathBuf {
    root.join(format!("stage{stage:04}"))
}

fn bucket_path(root: &Path, id: BucketId) -> PathBuf {
    stage_dir(root, id.stage).join(format!("bucket{:06}.{BUCKET_EXTENSION}", id.index))
}

/// Write `bucket` to its file, or delete the file if the bucket is empty.
fn flush(root: &Path, id: BucketId, bucket: &mut Bucket) -> Result<()> {
    let path = bucket_path(root, id);
    if bucket.is_empty() {
        match fs::remove_file(&path) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(LshError::io(path, e)),
        }
    } else {
        let bytes = codec::encode(bucket).map_err(|source| LshError::Encode {
            path: path.clone(),
            source,
        })?;
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir).map_err(|e| LshError::io(dir, e))?;
        }
        // Write-then-rename so a crash never leaves a half-written bucket.
        let tmp = path.with_extension(format!("{BUCKET_EXTENSION}.tmp"));
        fs::write(&tmp, &bytes).map_err(|e| LshError::io(&tmp, e))?;
        fs::rename(&tmp, &path).map_err(|e| LshError::io(&path, e))?;
    }
    trace!(stage = id.stage, index = id.index, len = bucket.len(), "flushed bucket");
    bucket.mark_clean();
    Ok(())
}

fn clear_dir(dir: &Path) -> Result<()> {
    let entries = fs::read_dir(dir).map_err(|e| LshError::io(dir, e))?;
    for entry in entries {
        let entry = entry.map_err(|e| LshError::io(dir, e))?;
        let path = entry.path();
        let file_type = entry.file_type().map_err(|e| LshError::io(&path, e))?;
        let removed = if file_type.is_dir() {
            fs::remove_dir_all(&path)
        } else {
            fs::remove_file(&path)
        };
        removed.map_err(|e| LshError::io(&path, e))?;
    }
    Ok(())
}

fn read_control(path: &Path) -> Result<(LshParams, usize)> {
    let text = fs::read_to_string(path).map_err(|e| LshError::io(path, e))?;
    let malformed = |reason: String| LshError::Control {
        path: path.to_path_buf(),
        reason,
    };

    let values = text
        .split_whitespace()
        .map(|token| {
            token
                .parse::<usize>()
                .map_err(|_| malformed(format!("not an unsigned integer: {token:?}")))
        })
        .collect::<Result<Vec<usize>>>()?;

    let &[width, stages, buckets, kmer_size] = values.as_slice() else {
        return Err(malformed(format!(
            "expected 4 values (width stages buckets kmer_size), found {}",
            values.len()
        )));
    };

    let params = LshParams {
        width,
        stages,
        buckets,
    };
    params
        .validate()
        .map_err(|e| malformed(e.to_string()))?;
    Ok((params, kmer_size))
}
