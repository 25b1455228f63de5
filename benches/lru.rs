use std::sync::Arc;
use std::thread;
use std::time::Duration;

use criterion::{BatchSize, Criterion, criterion_group, criterion_main};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use shardlru::policy::lru::LruCache;

const NO_TTL: Duration = Duration::ZERO;

fn warm_cache(capacity: u64) -> LruCache<u64, u64> {
    let cache = LruCache::new(capacity as usize);
    for i in 0..capacity {
        cache.set(i, i, NO_TTL);
    }
    cache
}

fn bench_lru_set_get(c: &mut Criterion) {
    c.bench_function("lru_set_get", |b| {
        b.iter_batched(
            || warm_cache(1024),
            |cache| {
                for i in 0..1024u64 {
                    cache.set(std::hint::black_box(i + 10_000), i, NO_TTL);
                    let _ = std::hint::black_box(cache.get(&std::hint::black_box(i)));
                }
            },
            BatchSize::SmallInput,
        )
    });
}

fn bench_lru_get_hotset(c: &mut Criterion) {
    let cache = warm_cache(4096);
    c.bench_function("lru_get_hotset", |b| {
        b.iter(|| {
            for i in 0..4096u64 {
                let _ = std::hint::black_box(cache.get(&std::hint::black_box(i)));
            }
        })
    });
}

fn bench_lru_get_quiet(c: &mut Criterion) {
    let cache = warm_cache(4096);
    c.bench_function("lru_get_quiet", |b| {
        b.iter(|| {
            for i in 0..4096u64 {
                let _ = std::hint::black_box(cache.get_quiet(&std::hint::black_box(i)));
            }
        })
    });
}

fn bench_lru_eviction_churn(c: &mut Criterion) {
    c.bench_function("lru_eviction_churn", |b| {
        b.iter_batched(
            || warm_cache(1024),
            |cache| {
                for i in 0..4096u64 {
                    cache.set(std::hint::black_box(10_000 + i), i, NO_TTL);
                }
            },
            BatchSize::SmallInput,
        )
    });
}

fn bench_lru_mget(c: &mut Criterion) {
    let cache = warm_cache(8192);
    let keys: Vec<u64> = (0..8192).step_by(3).collect();
    c.bench_function("lru_mget", |b| {
        b.iter(|| std::hint::black_box(cache.mget(&keys)))
    });
}

fn bench_lru_concurrent_reads(c: &mut Criterion) {
    let cache = Arc::new(warm_cache(16_384));
    c.bench_function("lru_concurrent_reads_4_threads", |b| {
        b.iter(|| {
            let handles: Vec<_> = (0..4u64)
                .map(|seed| {
                    let cache = cache.clone();
                    thread::spawn(move || {
                        let mut rng = SmallRng::seed_from_u64(seed);
                        for _ in 0..10_000 {
                            let key = rng.random_range(0..16_384u64);
                            let _ = std::hint::black_box(cache.get(&key));
                        }
                    })
                })
                .collect();
            for handle in handles {
                handle.join().unwrap();
            }
        })
    });
}

criterion_group!(
    benches,
    bench_lru_set_get,
    bench_lru_get_hotset,
    bench_lru_get_quiet,
    bench_lru_eviction_churn,
    bench_lru_mget,
    bench_lru_concurrent_reads
);
criterion_main!(benches);
