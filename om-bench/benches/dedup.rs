use criterion::{black_box, criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion};
use om_bench::gen_samples;
use om_core::BoardGeometry;
use om_features::{dedup, preprocess, PreprocessOptions, Transform};

fn bench_dedup(c: &mut Criterion) {
    let geometry = BoardGeometry::default();
    let mut g = c.benchmark_group("om_features_dedup");
    for &n in &[1024usize, 8192usize] {
        // One reflected duplicate per four samples.
        let mut samples = gen_samples(n, &geometry);
        let dups: Vec<_> = samples
            .iter()
            .step_by(4)
            .map(|s| Transform::Rot90.apply_sample(s))
            .collect();
        samples.extend(dups);

        g.bench_with_input(BenchmarkId::new("dedup", n), &samples, |b, s| {
            b.iter_batched(|| s.clone(), |v| black_box(dedup(v)), BatchSize::LargeInput)
        });
        g.bench_with_input(BenchmarkId::new("preprocess", n), &samples, |b, s| {
            b.iter_batched(
                || s.clone(),
                |v| black_box(preprocess(geometry, v, PreprocessOptions::default())),
                BatchSize::LargeInput,
            )
        });
    }
    g.finish();
}

criterion_group!(benches, bench_dedup);
criterion_main!(benches);
