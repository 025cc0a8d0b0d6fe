//! Alignment Benchmarks
//!
//! Measures DTW alignment and deviation extraction at realistic delivery
//! lengths.
//!
//! # Running Benchmarks
//! ```bash
//! cargo bench --package bowl-analysis --bench alignment
//! ```

use bowl_analysis::{align_sequences, extract_deviations};
use bowl_models::{Keypoint, PoseFrame, PoseSequence, JOINT_COUNT};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use std::time::Duration;

/// Synthetic swing: every joint follows a phase-shifted sine.
fn synthetic_sequence(len: usize, phase: f32) -> PoseSequence {
    (0..len)
        .map(|t| {
            let t = t as f32 / len as f32;
            PoseFrame::new(
                (0..JOINT_COUNT)
                    .map(|j| {
                        let angle = (t * 6.0 + j as f32 * 0.3 + phase).sin();
                        Keypoint::new(angle * 0.5, j as f32 * 0.1 - 0.8, 0.9)
                    })
                    .collect(),
            )
        })
        .collect()
}

fn bench_alignment(c: &mut Criterion) {
    let mut group = c.benchmark_group("dtw");
    group.warm_up_time(Duration::from_secs(2));
    group.measurement_time(Duration::from_secs(5));

    for len in [200usize, 300, 400] {
        let reference = synthetic_sequence(len, 0.0);
        let test = synthetic_sequence(len + len / 10, 0.2);

        group.throughput(Throughput::Elements((len * (len + len / 10)) as u64));
        group.bench_with_input(BenchmarkId::new("align", len), &len, |b, _| {
            b.iter(|| align_sequences(black_box(&reference), black_box(&test)))
        });

        let alignment = align_sequences(&reference, &test).expect("non-empty sequences");
        group.bench_with_input(BenchmarkId::new("deviations", len), &len, |b, _| {
            b.iter(|| extract_deviations(black_box(&reference), black_box(&test), &alignment.path))
        });
    }

    group.finish();
}

criterion_group!(benches, bench_alignment);
criterion_main!(benches);
