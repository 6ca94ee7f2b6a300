//! Criterion benchmark for K-of-N matcher query latency.
//!
//! Run with:
//!   cargo bench --bench matcher

use std::path::PathBuf;

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use ngram4::build::{self, BuildConfig};
use ngram4::{IndexSource, Matcher};

fn build_sample_index(root: &std::path::Path) -> PathBuf {
    let list_path = root.join("list.txt");
    let mut list = String::new();
    for i in 0..200u32 {
        let name = format!("f{i}.bin");
        let path = root.join(&name);
        // Deterministic pseudo-random payload so each file shares a subset
        // of 4-grams with its neighbors, mimicking overlapping malware
        // family fragments rather than wholly disjoint corpora.
        let mut data = Vec::with_capacity(4096);
        let mut state = i.wrapping_mul(2654435761).wrapping_add(1);
        for _ in 0..4096 {
            state = state.wrapping_mul(1664525).wrapping_add(1013904223);
            data.push((state >> 24) as u8);
        }
        std::fs::write(&path, &data).unwrap();
        list.push_str(&format!("{}\n", path.display()));
    }
    std::fs::write(&list_path, &list).unwrap();

    let out = root.join("idx");
    let mut cfg = BuildConfig::new(list_path, out.clone());
    cfg.w_read = 4;
    cfg.w_ng = 4;
    cfg.num_stage2_workers = 4;
    build::run_all(&cfg).unwrap();
    out
}

fn bench_match(c: &mut Criterion) {
    let dir = tempfile::tempdir().unwrap();
    let index_dir = build_sample_index(dir.path());
    let source = IndexSource::dir(index_dir, None);

    // Fixed query n-grams chosen to have nonempty (if small) posting lists
    // in the synthetic corpus above.
    let ngrams: Vec<u32> = (0..16u32).map(|i| i.wrapping_mul(2654435761)).collect();

    let mut group = c.benchmark_group("matcher_query");
    group.bench_function("k_of_16_min4", |b| {
        let mut matcher = Matcher::new(256);
        b.iter(|| {
            let result = matcher.match_ngrams(black_box(&source), black_box(&ngrams), 4).unwrap();
            black_box(result);
        });
    });
    group.finish();
}

criterion_group!(benches, bench_match);
criterion_main!(benches);
