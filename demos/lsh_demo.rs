//! Disk-backed LSH table
//!
//! Build a table of sequence families, query it, persist it, reopen it.
//!
//! ```bash
//! RUST_LOG=seqlsh=debug cargo run --example lsh_demo --release
//! ```

use rand::prelude::*;
use seqlsh::{DiskOptions, DiskStore, LshIndex, LshParams, MinHasher};
use tracing_subscriber::EnvFilter;

fn main() -> seqlsh::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    // 1. Shape the table
    //    - width=200: signature values per sketch
    //    - stages=15: independent bands (more = better recall)
    //    - buckets=20: buckets per stage
    let params = LshParams::new(200, 15, 20)?;
    let options = DiskOptions {
        kmer_size: 8,
        cache_limit: 64,
    };
    println!("{params} (~{:.2} similarity threshold)", params.approx_threshold());

    let root = std::env::temp_dir().join("seqlsh-demo");
    let hasher = MinHasher::new(options.kmer_size, params.width)?;
    let mut index = LshIndex::new(DiskStore::create(&root, params, options)?);

    // 2. Insert three families of 20 noisy copies each
    let mut rng = StdRng::seed_from_u64(42);
    let mut originals = Vec::new();
    for family in 0..3 {
        let original: Vec<u8> = (0..500).map(|_| b"ACGT"[rng.gen_range(0..4)]).collect();
        for _ in 0..20 {
            let mut copy = original.clone();
            let pos = rng.gen_range(0..copy.len());
            copy[pos] = b"ACGT"[rng.gen_range(0..4)];
            index.insert(hasher.sketch(&copy, format!("family{family}")))?;
        }
        originals.push(original);
    }

    // 3. Query
    let query = hasher.signature(&originals[1]);
    println!("\nTop hits for family1's original:");
    for hit in &index.query(&query, 5, 0.3)? {
        println!("  {:<10} distance={:.3}", hit.target, hit.distance);
    }

    let quality = index.quality()?;
    println!("\nCluster quality: {:.3}", quality.ratio());

    // 4. Persist and reopen
    index.close()?;
    let store = DiskStore::load_expecting(&root, &params)?;
    let mut reopened = LshIndex::new(store);
    println!("\nReopened {} with {} sketches", root.display(), reopened.len()?);
    let hits = reopened.query(&query, 1, 0.3)?;
    if let Some(best) = hits.first() {
        println!("Best hit after reload: {} ({:.3})", best.target, best.distance);
    }

    Ok(())
}
