use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use word2vec::Model;

// Deterministic random model for stable benches
fn random_model(words: usize, dim: usize) -> Model {
    let mut rng = StdRng::seed_from_u64(42);
    let vocab = (0..words).map(|i| format!("w{i}")).collect();
    let vectors = (0..words * dim).map(|_| rng.gen_range(-1.0f32..1.0)).collect();
    Model::new(vocab, dim, vectors).unwrap()
}

fn bench_lookup(c: &mut Criterion) {
    let mut group = c.benchmark_group("lookup");
    for &words in &[1_000usize, 10_000, 50_000] {
        let model = random_model(words, 100);
        for &k in &[1usize, 30] {
            group.bench_with_input(
                BenchmarkId::new(format!("vocab_{words}"), k),
                &k,
                |bencher, &k| bencher.iter(|| model.lookup(black_box("w7"), k).unwrap()),
            );
        }
    }
    group.finish();
}

fn bench_embedding(c: &mut Criterion) {
    let model = random_model(10_000, 300);
    let text = "w1 w20 w300 unknown w4000, w5000. w6 w77 w888 w9999";

    c.bench_function("embedding_10_words_dim_300", |bencher| {
        bencher.iter(|| model.embedding(black_box(text)).unwrap())
    });
    c.bench_function("vector_of_dim_300", |bencher| {
        bencher.iter(|| model.vector_of(black_box("w4000")).unwrap())
    });
}

criterion_group!(benches, bench_lookup, bench_embedding);
criterion_main!(benches);
