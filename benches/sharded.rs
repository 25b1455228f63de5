use std::sync::Arc;
use std::thread;
use std::time::Duration;

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use shardlru::builder::CacheBuilder;
use shardlru::policy::sharded_lru::ShardedLruCache;

const NO_TTL: Duration = Duration::ZERO;
const KEYS: u64 = 65_536;
const OPS_PER_THREAD: u64 = 20_000;

fn run_mixed(cache: &Arc<ShardedLruCache<u64, u64>>, threads: u64) {
    let handles: Vec<_> = (0..threads)
        .map(|seed| {
            let cache = cache.clone();
            thread::spawn(move || {
                let mut rng = SmallRng::seed_from_u64(seed);
                for i in 0..OPS_PER_THREAD {
                    let key = rng.random_range(0..KEYS);
                    if i % 10 == 0 {
                        cache.set(key, key, NO_TTL);
                    } else {
                        let _ = std::hint::black_box(cache.get(&key));
                    }
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }
}

fn bench_sharded_mixed(c: &mut Criterion) {
    let mut group = c.benchmark_group("sharded_mixed_90r_10w");
    let threads = 8u64;
    group.throughput(Throughput::Elements(threads * OPS_PER_THREAD));

    for shards in [1usize, 4, 16, 64] {
        let cache: Arc<ShardedLruCache<u64, u64>> = Arc::new(
            CacheBuilder::new(KEYS as usize / shards)
                .shards(shards)
                .build_sharded(),
        );
        cache.mset((0..KEYS).map(|k| (k, k)), NO_TTL);

        group.bench_with_input(BenchmarkId::from_parameter(shards), &cache, |b, cache| {
            b.iter(|| run_mixed(cache, threads))
        });
    }
    group.finish();
}

fn bench_sharded_mget(c: &mut Criterion) {
    let cache: ShardedLruCache<u64, u64> = ShardedLruCache::new(16, 4096);
    cache.mset((0..KEYS).map(|k| (k, k)), NO_TTL);
    let keys: Vec<u64> = (0..KEYS).step_by(7).collect();

    c.bench_function("sharded_mget", |b| {
        b.iter(|| std::hint::black_box(cache.mget(&keys)))
    });
}

criterion_group!(benches, bench_sharded_mixed, bench_sharded_mget);
criterion_main!(benches);
