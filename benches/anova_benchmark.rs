//! Benchmarks for ANOVA scoring and random undersampling
//!
//! Run with: cargo bench --bench anova_benchmark

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use ndarray::Array2;
use rand::prelude::*;
use rand::SeedableRng;

use prepline::pipeline::target::ClassIndex;
use prepline::pipeline::{f_classif, undersample};

/// Feature matrix where every third column shifts with the class.
fn generate_features(n_rows: usize, n_features: usize, seed: u64) -> (Array2<f64>, Vec<usize>) {
    let mut rng = rand::rngs::StdRng::seed_from_u64(seed);

    // roughly 1 in 5 rows in the positive class
    let classes: Vec<usize> = (0..n_rows)
        .map(|_| usize::from(rng.gen::<f64>() < 0.2))
        .collect();

    let features = Array2::from_shape_fn((n_rows, n_features), |(row, col)| {
        let noise = rng.gen::<f64>();
        if col % 3 == 0 {
            noise + classes[row] as f64 * 0.5
        } else {
            noise
        }
    });

    (features, classes)
}

fn benchmark_f_classif_by_rows(c: &mut Criterion) {
    let mut group = c.benchmark_group("f_classif_by_rows");
    group.sample_size(30);

    let n_features = 50;
    for n_rows in [1_000, 10_000, 100_000] {
        let (features, classes) = generate_features(n_rows, n_features, 42);
        group.throughput(Throughput::Elements((n_rows * n_features) as u64));

        group.bench_with_input(
            BenchmarkId::from_parameter(n_rows),
            &(&features, &classes),
            |b, (features, classes)| {
                b.iter(|| f_classif(black_box(features), black_box(classes), 2));
            },
        );
    }

    group.finish();
}

fn benchmark_f_classif_by_columns(c: &mut Criterion) {
    let mut group = c.benchmark_group("f_classif_by_columns");
    group.sample_size(30);

    let n_rows = 10_000;
    for n_features in [10, 100, 500] {
        let (features, classes) = generate_features(n_rows, n_features, 42);
        group.throughput(Throughput::Elements(n_features as u64));

        group.bench_with_input(
            BenchmarkId::from_parameter(n_features),
            &(&features, &classes),
            |b, (features, classes)| {
                b.iter(|| f_classif(black_box(features), black_box(classes), 2));
            },
        );
    }

    group.finish();
}

fn benchmark_undersample(c: &mut Criterion) {
    let mut group = c.benchmark_group("undersample");

    for n_rows in [10_000, 100_000] {
        let (_, assignments) = generate_features(n_rows, 1, 7);
        let index = ClassIndex {
            classes: vec!["0".to_string(), "1".to_string()],
            rows: (0..n_rows).collect(),
            assignments,
        };

        group.bench_with_input(BenchmarkId::from_parameter(n_rows), &index, |b, index| {
            b.iter(|| undersample(black_box(index), black_box(42)));
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    benchmark_f_classif_by_rows,
    benchmark_f_classif_by_columns,
    benchmark_undersample
);
criterion_main!(benches);
