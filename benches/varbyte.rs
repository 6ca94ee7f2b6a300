//! Criterion benchmark for the varbyte codec.
//!
//! Run with:
//!   cargo bench --bench varbyte

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use ngram4::varbyte;

fn sample_deltas(n: usize) -> Vec<u32> {
    // Deltas between sorted random-ish fids in a large corpus skew small;
    // a geometric-ish spread exercises every varbyte length class.
    (0..n as u32).map(|i| (i.wrapping_mul(2654435761)) % (1 << 21)).collect()
}

fn bench_encode(c: &mut Criterion) {
    let deltas = sample_deltas(10_000);
    let mut group = c.benchmark_group("varbyte_encode");
    group.throughput(Throughput::Elements(deltas.len() as u64));
    group.bench_function("encode_10k_deltas", |b| {
        b.iter(|| {
            let mut buf = Vec::with_capacity(deltas.len() * 3);
            for &d in &deltas {
                varbyte::encode(black_box(d), &mut buf);
            }
            black_box(buf);
        });
    });
    group.finish();
}

fn bench_decode(c: &mut Criterion) {
    let deltas = sample_deltas(10_000);
    let mut buf = Vec::with_capacity(deltas.len() * 3);
    for &d in &deltas {
        varbyte::encode(d, &mut buf);
    }

    let mut group = c.benchmark_group("varbyte_decode");
    group.throughput(Throughput::Elements(deltas.len() as u64));
    group.bench_function("decode_10k_deltas", |b| {
        b.iter(|| {
            let mut pos = 0;
            while pos < buf.len() {
                let (value, consumed) = varbyte::decode(&buf, pos);
                black_box(value);
                pos += consumed;
            }
        });
    });
    group.finish();
}

criterion_group!(benches, bench_encode, bench_decode);
criterion_main!(benches);
