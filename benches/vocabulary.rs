use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::HashSet;
use word2vec::vocab::{huffman, UnigramTable};
use word2vec::Vocabulary;

// Zipf-like counts, sorted descending
fn zipf_counts(n: usize) -> Vec<u64> {
    (1..=n as u64).map(|r| 1_000_000 / r + 1).collect()
}

fn bench_huffman(c: &mut Criterion) {
    let mut group = c.benchmark_group("huffman");
    for &n in &[1_000usize, 100_000] {
        let counts = zipf_counts(n);
        group.bench_with_input(BenchmarkId::from_parameter(n), &counts, |bencher, counts| {
            bencher.iter(|| huffman::build(black_box(counts)))
        });
    }
    group.finish();
}

fn bench_unigram(c: &mut Criterion) {
    let counts = zipf_counts(10_000);
    c.bench_function("unigram_table_build_1e7", |bencher| {
        bencher.iter(|| UnigramTable::new(black_box(&counts)))
    });

    let table = UnigramTable::new(&counts);
    let mut rng = StdRng::seed_from_u64(1);
    c.bench_function("unigram_sample", |bencher| {
        bencher.iter(|| table.sample(&mut rng))
    });
}

fn bench_vocabulary(c: &mut Criterion) {
    let mut rng = StdRng::seed_from_u64(9);
    let pairs: Vec<(String, u64)> = (0..50_000)
        .map(|i| (format!("word{i}"), rng.gen_range(1..10_000)))
        .collect();
    let stop = HashSet::new();
    c.bench_function("vocabulary_from_counts_50k", |bencher| {
        bencher.iter(|| Vocabulary::from_counts(black_box(pairs.clone()), 5, &stop).unwrap())
    });
}

criterion_group!(benches, bench_huffman, bench_unigram, bench_vocabulary);
criterion_main!(benches);
