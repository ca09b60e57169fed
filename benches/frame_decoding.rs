//! Benchmarks for frame reassembly
//!
//! Measures the per-cycle cost the read loop pays on every receive:
//! - extracting frames from a buffer holding a burst plus a partial tail
//! - flattening a batch into the emitted record
//!
//! Platform: Cross-platform (synthetic frames, CI-safe)

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use gprlink::test_utils::{encode_stream, test_frames};
use gprlink::types::{FrameGeometry, TraceBatch};
use gprlink::wire::extract;
use std::hint::black_box;
use std::time::SystemTime;

fn bench_extract(c: &mut Criterion) {
    let mut group = c.benchmark_group("extract");

    for points in [200usize, 1024] {
        let geometry = FrameGeometry::new(points).expect("valid geometry");
        let mut buffer = encode_stream(&test_frames(16, points));
        // Partial trailing frame, as left behind by a receive boundary.
        buffer.extend_from_slice(&encode_stream(&test_frames(1, points))[..points]);

        group.throughput(Throughput::Bytes(buffer.len() as u64));
        group.bench_with_input(BenchmarkId::new("burst_16", points), &buffer, |b, buffer| {
            b.iter(|| {
                let (frames, rest) = extract(black_box(buffer), &geometry).expect("aligned");
                black_box((frames.len(), rest.len()))
            })
        });
    }

    group.finish();
}

fn bench_into_record(c: &mut Criterion) {
    let frames = test_frames(8, 200);

    c.bench_function("into_record_8x200", |b| {
        b.iter(|| {
            let batch = TraceBatch::new(black_box(frames.clone()));
            black_box(batch.into_record(SystemTime::UNIX_EPOCH))
        })
    });
}

criterion_group!(benches, bench_extract, bench_into_record);
criterion_main!(benches);
