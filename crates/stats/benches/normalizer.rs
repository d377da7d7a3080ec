use criterion::{black_box, criterion_group, criterion_main, Criterion};
use stats::{GroupId, Normalizer};

fn batch(rows: usize, dim: usize) -> Vec<Vec<f64>> {
    (0..rows)
        .map(|r| (0..dim).map(|d| ((r * 31 + d * 17) % 97) as f64 * 0.1).collect())
        .collect()
}

fn bench_update(c: &mut Criterion) {
    let data = batch(256, 64);
    let groups: Vec<GroupId> = (0..64).map(|d| GroupId(d / 4)).collect();

    c.bench_function("update_singleton_256x64", |b| {
        let mut norm = Normalizer::new("s_norm", 64);
        b.iter(|| norm.update(black_box(&data)).unwrap());
    });

    c.bench_function("update_grouped_256x64", |b| {
        let mut norm =
            Normalizer::with_options("s_norm", 64, Some(groups.clone()), 0.02, 10.0).unwrap();
        b.iter(|| norm.update(black_box(&data)).unwrap());
    });
}

fn bench_normalize(c: &mut Criterion) {
    let data = batch(256, 64);
    let mut norm = Normalizer::with_options("s_norm", 64, None, 0.02, 5.0).unwrap();
    norm.update(&data).unwrap();
    c.bench_function("normalize_batch_256x64", |b| {
        b.iter(|| norm.normalize_batch(black_box(&data)).unwrap());
    });
}

criterion_group!(benches, bench_update, bench_normalize);
criterion_main!(benches);
