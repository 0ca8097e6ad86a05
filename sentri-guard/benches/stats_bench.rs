use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use sentri_guard::stats::{self, Binning};

/// Deterministic pseudo-random sample in `[0, 1000)`.
fn sample(n: usize, seed: u64) -> Vec<f64> {
    let mut state = seed;
    (0..n)
        .map(|_| {
            state = state
                .wrapping_mul(6_364_136_223_846_793_005)
                .wrapping_add(1_442_695_040_888_963_407);
            (state >> 11) as f64 / (1u64 << 53) as f64 * 1000.0
        })
        .collect()
}

fn benchmark_drift_scores(c: &mut Criterion) {
    let mut group = c.benchmark_group("drift_scores");

    for n in [1_000, 10_000, 100_000].iter() {
        let baseline = sample(*n, 7);
        let current = sample(*n, 11);
        group.throughput(Throughput::Elements(*n as u64));

        group.bench_with_input(BenchmarkId::new("psi", n), n, |b, _| {
            b.iter(|| {
                let binning = Binning::from_baseline(&baseline, 10).unwrap();
                let expected = binning.proportions(&baseline);
                let actual = binning.proportions(&current);
                stats::psi(std::hint::black_box(&expected), &actual)
            });
        });

        group.bench_with_input(BenchmarkId::new("ks", n), n, |b, _| {
            b.iter(|| stats::ks_two_sample(std::hint::black_box(&current), &baseline).unwrap());
        });
    }

    group.finish();
}

fn benchmark_pearson(c: &mut Criterion) {
    let mut group = c.benchmark_group("pearson");

    for n in [1_000, 100_000].iter() {
        let x = sample(*n, 3);
        let y = sample(*n, 5);
        group.throughput(Throughput::Elements(*n as u64));
        group.bench_with_input(BenchmarkId::from_parameter(n), n, |b, _| {
            b.iter(|| stats::pearson(std::hint::black_box(&x), &y));
        });
    }

    group.finish();
}

fn benchmark_descriptive(c: &mut Criterion) {
    let values = sample(100_000, 13);
    c.bench_function("median_100k", |b| {
        b.iter(|| stats::median(std::hint::black_box(&values)))
    });
    c.bench_function("kurtosis_100k", |b| {
        b.iter(|| stats::kurtosis(std::hint::black_box(&values)))
    });
}

criterion_group!(
    benches,
    benchmark_drift_scores,
    benchmark_pearson,
    benchmark_descriptive,
);

criterion_main!(benches);
