use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use om_bench::gen_records;
use om_core::BoardGeometry;
use om_replay::RecordLayout;

fn bench_codec(c: &mut Criterion) {
    let geometry = BoardGeometry::default();
    let layout = RecordLayout::new(geometry);
    let mut g = c.benchmark_group("om_replay_codec");
    for &n in &[1024usize, 16384usize] {
        let records = gen_records(n, &geometry);
        let bytes = match layout.encode(&records) {
            Ok(b) => b,
            Err(e) => panic!("fixture encode failed: {e}"),
        };
        g.throughput(Throughput::Bytes(bytes.len() as u64));
        g.bench_with_input(BenchmarkId::new("decode", n), &bytes, |b, buf| {
            b.iter(|| black_box(layout.decode(black_box(buf))))
        });
        g.bench_with_input(BenchmarkId::new("decode_lenient", n), &bytes, |b, buf| {
            b.iter(|| black_box(layout.decode_lenient(black_box(buf))))
        });
        g.bench_with_input(BenchmarkId::new("encode", n), &records, |b, r| {
            b.iter(|| black_box(layout.encode(black_box(r))))
        });
    }
    g.finish();
}

criterion_group!(benches, bench_codec);
criterion_main!(benches);
