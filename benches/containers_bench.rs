//! Benchmarks comparing the pooled containers against std

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::collections::{HashMap, HashSet};

use repool::{PooledMap, PooledSet, PooledVec};

const SIZES: &[usize] = &[16, 256, 4096];

fn shuffled_keys(n: usize) -> Vec<u64> {
    let mut keys: Vec<u64> = (0..n as u64).collect();
    let mut rng = rand::rngs::StdRng::seed_from_u64(0x5eed);
    keys.shuffle(&mut rng);
    keys
}

fn bench_vec_push(c: &mut Criterion) {
    let mut group = c.benchmark_group("vec_push");
    for &size in SIZES {
        group.bench_with_input(BenchmarkId::new("pooled", size), &size, |b, &size| {
            b.iter(|| {
                let mut vec = PooledVec::new();
                for i in 0..size as u64 {
                    vec.push(black_box(i)).unwrap();
                }
                vec
            })
        });
        group.bench_with_input(BenchmarkId::new("std", size), &size, |b, &size| {
            b.iter(|| {
                let mut vec = Vec::new();
                for i in 0..size as u64 {
                    vec.push(black_box(i));
                }
                vec
            })
        });
    }
    group.finish();
}

fn bench_vec_churn(c: &mut Criterion) {
    // Repeated build/dispose cycles: leases recycle through the pool.
    let mut group = c.benchmark_group("vec_churn");
    for &size in SIZES {
        group.bench_with_input(BenchmarkId::new("pooled", size), &size, |b, &size| {
            b.iter(|| {
                for _ in 0..8 {
                    let mut vec = PooledVec::new();
                    for i in 0..size as u64 {
                        vec.push(black_box(i)).unwrap();
                    }
                    vec.dispose();
                }
            })
        });
        group.bench_with_input(BenchmarkId::new("std", size), &size, |b, &size| {
            b.iter(|| {
                for _ in 0..8 {
                    let mut vec = Vec::new();
                    for i in 0..size as u64 {
                        vec.push(black_box(i));
                    }
                    drop(vec);
                }
            })
        });
    }
    group.finish();
}

fn bench_set_insert(c: &mut Criterion) {
    let mut group = c.benchmark_group("set_insert");
    for &size in SIZES {
        let keys = shuffled_keys(size);
        group.bench_with_input(BenchmarkId::new("pooled", size), &keys, |b, keys| {
            b.iter(|| {
                let mut set = PooledSet::with_capacity(keys.len()).unwrap();
                for &k in keys {
                    set.insert(black_box(k)).unwrap();
                }
                set
            })
        });
        group.bench_with_input(BenchmarkId::new("std", size), &keys, |b, keys| {
            b.iter(|| {
                let mut set = HashSet::with_capacity(keys.len());
                for &k in keys {
                    set.insert(black_box(k));
                }
                set
            })
        });
    }
    group.finish();
}

fn bench_set_contains(c: &mut Criterion) {
    let mut group = c.benchmark_group("set_contains");
    for &size in SIZES {
        let keys = shuffled_keys(size);
        let pooled = PooledSet::from_slice(&keys).unwrap();
        let std_set: HashSet<u64> = keys.iter().copied().collect();

        group.bench_with_input(BenchmarkId::new("pooled", size), &keys, |b, keys| {
            b.iter(|| {
                let mut hits = 0usize;
                for k in keys {
                    if pooled.contains(black_box(k)) {
                        hits += 1;
                    }
                }
                hits
            })
        });
        group.bench_with_input(BenchmarkId::new("std", size), &keys, |b, keys| {
            b.iter(|| {
                let mut hits = 0usize;
                for k in keys {
                    if std_set.contains(black_box(k)) {
                        hits += 1;
                    }
                }
                hits
            })
        });
    }
    group.finish();
}

fn bench_map_lookup(c: &mut Criterion) {
    let mut group = c.benchmark_group("map_lookup");
    for &size in SIZES {
        let keys = shuffled_keys(size);
        let mut pooled = PooledMap::with_capacity(size).unwrap();
        let mut std_map = HashMap::with_capacity(size);
        for &k in &keys {
            pooled.insert(k, k * 2).unwrap();
            std_map.insert(k, k * 2);
        }

        group.bench_with_input(BenchmarkId::new("pooled", size), &keys, |b, keys| {
            b.iter(|| {
                let mut sum = 0u64;
                for k in keys {
                    if let Some(v) = pooled.get(black_box(k)) {
                        sum = sum.wrapping_add(*v);
                    }
                }
                sum
            })
        });
        group.bench_with_input(BenchmarkId::new("std", size), &keys, |b, keys| {
            b.iter(|| {
                let mut sum = 0u64;
                for k in keys {
                    if let Some(v) = std_map.get(black_box(k)) {
                        sum = sum.wrapping_add(*v);
                    }
                }
                sum
            })
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_vec_push,
    bench_vec_churn,
    bench_set_insert,
    bench_set_contains,
    bench_map_lookup
);
criterion_main!(benches);
