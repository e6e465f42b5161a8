//! Disk table persistence: round trips, eviction, file layout, failure modes.

use std::fs;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use seqlsh::{
    BucketStore, DiskOptions, DiskStore, Hit, LshError, LshIndex, LshParams, MemoryStore, Sketch,
};
use tempfile::TempDir;

const WIDTH: usize = 24;
const STAGES: usize = 6;
const BUCKETS: usize = 31;

fn params() -> LshParams {
    LshParams::new(WIDTH, STAGES, BUCKETS).unwrap()
}

fn options(cache_limit: usize) -> DiskOptions {
    DiskOptions {
        kmer_size: 7,
        cache_limit,
    }
}

/// Signatures drawn from a small alphabet so buckets collide often.
fn random_sketches(count: usize, seed: u64) -> Vec<Sketch> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..count)
        .map(|i| {
            let sig: Vec<u32> = (0..WIDTH).map(|_| rng.gen_range(0..4)).collect();
            Sketch::new(sig, format!("seq{}", i % 13))
        })
        .collect()
}

fn hits(set: seqlsh::HitSet) -> Vec<(f64, String)> {
    set.into_iter()
        .map(|Hit { distance, target }| (distance, target))
        .collect()
}

#[test]
fn test_save_load_round_trip_matches_memory() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    let root = dir.path().join("table");
    let sketches = random_sketches(200, 1);

    let mut memory = LshIndex::new(MemoryStore::new(params())?);
    let mut disk = LshIndex::new(DiskStore::create(&root, params(), options(1000))?);
    for sketch in &sketches {
        memory.insert(sketch.clone())?;
        disk.insert(sketch.clone())?;
    }
    disk.close()?;

    let mut reloaded = LshIndex::new(DiskStore::load(&root)?);
    assert_eq!(reloaded.params(), &params());
    assert_eq!(reloaded.store().kmer_size(), 7);
    assert_eq!(reloaded.len()?, sketches.len());

    for query in sketches.iter().take(40) {
        let expected = hits(memory.query_sketch(query, 10, 0.5)?);
        let actual = hits(reloaded.query_sketch(query, 10, 0.5)?);
        assert_eq!(actual, expected, "query {}", query.name());
    }
    Ok(())
}

#[test]
fn test_small_cache_keeps_every_sketch() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    let sketches = random_sketches(300, 2);

    let mut memory = LshIndex::new(MemoryStore::new(params())?);
    let mut disk = LshIndex::new(DiskStore::create(dir.path(), params(), options(3))?);
    for sketch in &sketches {
        memory.insert(sketch.clone())?;
        disk.insert(sketch.clone())?;
        assert!(disk.store().resident_len() <= 3);
    }

    // Every sketch still answers a zero-distance query for itself.
    for sketch in &sketches {
        let found = disk.query_sketch(sketch, sketches.len(), 0.0)?;
        assert!(found.iter().any(|h| h.target == sketch.name()));
        assert!(disk.store().resident_len() <= 3);
    }

    disk.save_all()?;
    let store = disk.into_store();
    for stage in 0..STAGES {
        for index in 0..BUCKETS {
            let expected = memory.store().bucket(stage, index)?;
            assert_eq!(store.bucket_len(stage, index)?, expected.len());
        }
    }
    drop(store);

    // Contents, not just counts, survive eviction.
    let mut reloaded = DiskStore::load_with(dir.path(), 2)?;
    for stage in 0..STAGES {
        for index in 0..BUCKETS {
            let expected = memory.store().bucket(stage, index)?.sketches().to_vec();
            let actual = reloaded.fetch(stage, index)?.sketches().to_vec();
            assert_eq!(actual, expected, "bucket ({stage}, {index})");
        }
    }
    Ok(())
}

#[test]
fn test_empty_buckets_have_no_file() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    let mut index = LshIndex::new(DiskStore::create(dir.path(), params(), options(1000))?);
    let sketch = Sketch::new(vec![5u32; WIDTH], "only");
    let addresses = index.address_of(sketch.signature())?;
    index.insert(sketch)?;

    // Touch an empty bucket so it is resident but never written.
    let spare = (addresses[0] + 1) % BUCKETS;
    index.store_mut().fetch(0, spare)?;
    index.save_all()?;

    let store = index.store();
    for stage in 0..STAGES {
        for bucket in 0..BUCKETS {
            let path = store.bucket_path(stage, bucket);
            assert_eq!(path.exists(), bucket == addresses[stage], "{}", path.display());
        }
    }
    assert!(dir.path().join("control.txt").exists());
    Ok(())
}

#[test]
fn test_control_file_contents() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    DiskStore::create(dir.path(), params(), options(10))?.close()?;
    let control = fs::read_to_string(dir.path().join("control.txt"))?;
    assert_eq!(control, format!("{WIDTH} {STAGES} {BUCKETS} 7\n"));
    Ok(())
}

#[test]
fn test_create_clears_existing_table() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    let mut index = LshIndex::new(DiskStore::create(dir.path(), params(), options(10))?);
    index.insert(Sketch::new(vec![1u32; WIDTH], "old"))?;
    index.close()?;

    let fresh = LshIndex::new(DiskStore::create(dir.path(), params(), options(10))?);
    assert!(fresh.is_empty()?);
    Ok(())
}

#[test]
fn test_load_expecting_rejects_other_params() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    DiskStore::create(dir.path(), params(), options(10))?.close()?;

    assert!(DiskStore::load_expecting(dir.path(), &params()).is_ok());

    let other = LshParams::new(WIDTH, STAGES, BUCKETS + 1)?;
    match DiskStore::load_expecting(dir.path(), &other) {
        Err(LshError::ConfigMismatch { path, .. }) => {
            assert!(path.ends_with("control.txt"));
        }
        other => panic!("expected ConfigMismatch, got {other:?}"),
    }
    Ok(())
}

#[test]
fn test_missing_control_file() {
    let dir = TempDir::new().unwrap();
    assert!(DiskStore::load(dir.path()).is_err());
}

#[test]
fn test_corrupt_bucket_reports_path() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    let sketch = Sketch::new(vec![3u32; WIDTH], "victim");
    let address = {
        let mut index = LshIndex::new(DiskStore::create(dir.path(), params(), options(10))?);
        let address = index.address_of(sketch.signature())?[0];
        index.insert(sketch.clone())?;
        index.close()?;
        address
    };

    let store = DiskStore::load(dir.path())?;
    let path = store.bucket_path(0, address);
    drop(store);
    fs::write(&path, b"not a bucket file")?;

    let mut index = LshIndex::new(DiskStore::load(dir.path())?);
    match index.query_sketch(&sketch, 5, 1.0) {
        Err(LshError::Corrupt { path: reported, .. }) => assert_eq!(reported, path),
        other => panic!("expected Corrupt, got {other:?}"),
    }
    Ok(())
}

#[test]
fn test_drop_saves_modified_buckets() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    {
        let mut index = LshIndex::new(DiskStore::create(dir.path(), params(), options(1000))?);
        for sketch in random_sketches(25, 3) {
            index.insert(sketch)?;
        }
        // No save_all or close.
    }
    let index = LshIndex::new(DiskStore::load(dir.path())?);
    assert_eq!(index.len()?, 25);
    Ok(())
}

#[test]
fn test_shrinking_cache_flushes_evicted() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    let mut index = LshIndex::new(DiskStore::create(dir.path(), params(), options(1000))?);
    for sketch in random_sketches(50, 4) {
        index.insert(sketch)?;
    }
    assert!(index.store().resident_len() > 1);

    index.set_cache_limit(1)?;
    assert_eq!(index.store().resident_len(), 1);
    assert_eq!(index.len()?, 50);
    assert!(index.set_cache_limit(0).is_err());
    Ok(())
}

#[test]
fn test_boxed_store_behaves_like_inner() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    let stores: Vec<Box<dyn BucketStore>> = vec![
        Box::new(MemoryStore::new(params())?),
        Box::new(DiskStore::create(dir.path(), params(), options(4))?),
    ];
    for store in stores {
        let mut index = LshIndex::new(store);
        for sketch in random_sketches(30, 5) {
            index.insert(sketch)?;
        }
        assert_eq!(index.len()?, 30);
    }
    Ok(())
}
