// ==============================================
// LRU CACHE CONCURRENCY TESTS (integration)
// ==============================================
//
// Readers promote through the lock-free buffer while writers mutate under the
// exclusive lock. These exercise the buffer swap race and the
// flush-before-write path from many threads at once.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;

use shardlru::policy::lru::LruCache;
use shardlru::prelude::PROMOTION_BUFFER_CAPACITY;

const NO_TTL: Duration = Duration::ZERO;

// ==============================================
// Mixed readers and writers on overlapping keys
// ==============================================

mod mixed_load {
    use super::*;

    #[cfg_attr(miri, ignore)]
    #[test]
    fn overlapping_get_set_keeps_invariants() {
        let capacity = 64;
        let num_threads = 8;
        let ops_per_thread = 5_000u64;

        let cache: Arc<LruCache<u64, u64>> = Arc::new(LruCache::new(capacity));
        let barrier = Arc::new(Barrier::new(num_threads));

        let handles: Vec<_> = (0..num_threads as u64)
            .map(|tid| {
                let cache = cache.clone();
                let barrier = barrier.clone();
                thread::spawn(move || {
                    barrier.wait();
                    for i in 0..ops_per_thread {
                        let key = (i * 7 + tid * 13) % 128;
                        match i % 4 {
                            0 => cache.set(key, key, NO_TTL),
                            1 | 2 => {
                                if let Some((value, expired)) = cache.get(&key) {
                                    assert_eq!(value, key);
                                    assert!(!expired);
                                }
                            },
                            _ => {
                                cache.delete(&key);
                            },
                        }
                        assert!(cache.len() <= capacity);
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        assert!(cache.len() <= capacity);
        cache.check_invariants().unwrap();
    }

    #[cfg_attr(miri, ignore)]
    #[test]
    fn batch_operations_race_with_single_key_ops() {
        let capacity = 256;
        let cache: Arc<LruCache<u32, u32>> = Arc::new(LruCache::new(capacity));
        let barrier = Arc::new(Barrier::new(4));

        let writer = {
            let cache = cache.clone();
            let barrier = barrier.clone();
            thread::spawn(move || {
                barrier.wait();
                for round in 0..200u32 {
                    let base = (round * 31) % 512;
                    cache.mset((base..base + 64).map(|k| (k, k)), NO_TTL);
                    let doomed: Vec<u32> = (base..base + 16).collect();
                    cache.mdelete(&doomed);
                }
            })
        };

        let readers: Vec<_> = (0..3)
            .map(|_| {
                let cache = cache.clone();
                let barrier = barrier.clone();
                thread::spawn(move || {
                    barrier.wait();
                    let keys: Vec<u32> = (0..600).collect();
                    for _ in 0..100 {
                        let found = cache.mget(&keys);
                        assert!(found.iter().all(|(k, v)| k == v));
                    }
                })
            })
            .collect();

        writer.join().unwrap();
        for reader in readers {
            reader.join().unwrap();
        }
        cache.check_invariants().unwrap();
    }
}

// ==============================================
// Buffer overflow under contention
// ==============================================
//
// Many readers hammering a handful of hot keys fill the promotion buffer over
// and over. Every overflow swaps the buffer with a CAS; exactly one reader
// flushes each full buffer while writers keep inserting.

mod buffer_overflow {
    use super::*;

    #[cfg_attr(miri, ignore)]
    #[test]
    fn hot_readers_and_cold_writer_converge() {
        let capacity = 32;
        let cache: Arc<LruCache<u64, u64>> = Arc::new(LruCache::new(capacity));
        for key in 0..capacity as u64 {
            cache.set(key, key, NO_TTL);
        }

        let stop = Arc::new(AtomicBool::new(false));
        let barrier = Arc::new(Barrier::new(5));

        let readers: Vec<_> = (0..4)
            .map(|_| {
                let cache = cache.clone();
                let stop = stop.clone();
                let barrier = barrier.clone();
                thread::spawn(move || {
                    barrier.wait();
                    let mut reads = 0usize;
                    while !stop.load(Ordering::Relaxed) || reads < PROMOTION_BUFFER_CAPACITY * 4 {
                        // keys 0..4 are hot
                        let _ = cache.get(&((reads % 4) as u64));
                        reads += 1;
                    }
                })
            })
            .collect();

        barrier.wait();
        for key in 1_000..3_000u64 {
            cache.set(key, key, NO_TTL);
        }
        stop.store(true, Ordering::Relaxed);
        for reader in readers {
            reader.join().unwrap();
        }

        assert_eq!(cache.len(), capacity);
        cache.check_invariants().unwrap();
    }

    #[cfg_attr(miri, ignore)]
    #[test]
    fn promotions_before_write_are_applied_first() {
        // A key read by another thread and joined before the write must
        // survive the eviction that write causes.
        for _ in 0..50 {
            let cache: Arc<LruCache<u32, u32>> = Arc::new(LruCache::new(3));
            cache.set(1, 1, NO_TTL);
            cache.set(2, 2, NO_TTL);
            cache.set(3, 3, NO_TTL);

            let reader = {
                let cache = cache.clone();
                thread::spawn(move || {
                    assert_eq!(cache.get(&1), Some((1, false)));
                })
            };
            reader.join().unwrap();

            cache.set(4, 4, NO_TTL);
            assert!(cache.contains(&1));
            assert!(!cache.contains(&2));
        }
    }
}
