use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use deckcycle_engine::sampling::{session_rng, FrequencyMap};

fn bench_weighted_draw(c: &mut Criterion) {
    let sizes = [50, 1_000, 20_000];
    let mut group = c.benchmark_group("frequency_map_sample");

    for size in sizes {
        let mut map = FrequencyMap::new(size);
        // Every tenth pair marked for repetition
        for i in (0..size).step_by(10) {
            map.boost(i, 4, 5);
        }
        let mut rng = session_rng(Some(42));

        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, _| {
            b.iter(|| black_box(map.sample(&mut rng)))
        });
    }

    group.finish();
}

fn bench_boost_then_draw(c: &mut Criterion) {
    let mut map = FrequencyMap::new(1_000);
    let mut rng = session_rng(Some(7));
    let mut i = 0usize;

    c.bench_function("boost_then_draw_1000", |b| {
        b.iter(|| {
            // Each boost dirties the cumulative table
            map.boost(i % 1_000, 4, 5);
            i += 1;
            black_box(map.sample(&mut rng))
        })
    });
}

criterion_group!(benches, bench_weighted_draw, bench_boost_then_draw);
criterion_main!(benches);
