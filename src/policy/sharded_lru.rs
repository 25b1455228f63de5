//! Hash-sharded LRU cache.
//!
//! `ShardedLruCache` splits the key space over a power-of-two number of
//! independent [`LruCache`] shards. Each shard has its own lock and promotion
//! buffer, so threads working on different shards never contend.
//!
//! ## Architecture
//!
//! ```text
//!   ShardedLruCache<K, V>
//!   ┌──────────────────────────────────────────────────────────────┐
//!   │ selector: ShardSelector { mask: N - 1 }                      │
//!   │                                                              │
//!   │   key ── shard_hash ── mix ── & mask ──┐                     │
//!   │                                        ▼                     │
//!   │   ┌──────────┬──────────┬──────────┬──────────┐              │
//!   │   │ LruCache │ LruCache │ LruCache │ LruCache │  ...  N      │
//!   │   │ shard 0  │ shard 1  │ shard 2  │ shard 3  │              │
//!   │   └──────────┴──────────┴──────────┴──────────┘              │
//!   └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! Single-key operations delegate to one shard. Batch operations group their
//! keys by shard first and call each involved shard's batch operation once,
//! so a batch takes at most one lock per shard it touches.
//!
//! Each shard has a fixed capacity of its own; the total capacity is
//! `shard_count * capacity_per_shard`. A skewed key distribution can evict
//! from one shard while others have room.
//!
//! ## Example
//!
//! ```
//! use std::time::Duration;
//! use shardlru::policy::sharded_lru::ShardedLruCache;
//!
//! let cache: ShardedLruCache<String, u64> = ShardedLruCache::new(8, 1024);
//! cache.set("alpha".to_string(), 1, Duration::ZERO);
//! cache.set("beta".to_string(), 2, Duration::from_secs(60));
//!
//! assert_eq!(cache.get(&"alpha".to_string()), Some((1, false)));
//!
//! let found = cache.mget(&["alpha".to_string(), "beta".to_string(), "gamma".to_string()]);
//! assert_eq!(found.len(), 2);
//! ```

use std::fmt;
use std::time::Duration;

use log::debug;
use rustc_hash::FxHashMap;

use crate::ds::shard::{ShardKey, ShardSelector};
use crate::error::{ConfigError, InvariantError};
use crate::policy::lru::LruCache;

/// Array of independent [`LruCache`] shards addressed by key hash.
pub struct ShardedLruCache<K, V> {
    shards: Box<[LruCache<K, V>]>,
    selector: ShardSelector,
}

impl<K, V> ShardedLruCache<K, V>
where
    K: ShardKey + Clone,
    V: Clone,
{
    /// Creates `shards` (rounded up to a power of two) shards of
    /// `capacity_per_shard` entries each.
    ///
    /// # Panics
    ///
    /// Panics on an invalid capacity or shard count; see
    /// [`try_new`](Self::try_new).
    pub fn new(shards: usize, capacity_per_shard: usize) -> Self {
        match Self::try_new(shards, capacity_per_shard) {
            Ok(cache) => cache,
            Err(err) => panic!("{}", err),
        }
    }

    /// Creates a sharded cache, rejecting invalid parameters instead of
    /// panicking.
    ///
    /// # Example
    ///
    /// ```
    /// use shardlru::policy::sharded_lru::ShardedLruCache;
    ///
    /// let cache = ShardedLruCache::<u64, u64>::try_new(6, 100).unwrap();
    /// assert_eq!(cache.shard_count(), 8);
    /// assert_eq!(cache.capacity(), 800);
    ///
    /// assert!(ShardedLruCache::<u64, u64>::try_new(0, 100).is_err());
    /// assert!(ShardedLruCache::<u64, u64>::try_new(4, 0).is_err());
    /// ```
    pub fn try_new(shards: usize, capacity_per_shard: usize) -> Result<Self, ConfigError> {
        if shards == 0 {
            return Err(ConfigError::ZeroShards);
        }
        let count = ShardSelector::round_shards(shards)
            .ok_or(ConfigError::ShardCountOverflow(shards))?;

        let shards = (0..count)
            .map(|_| LruCache::try_new(capacity_per_shard))
            .collect::<Result<Vec<_>, _>>()?
            .into_boxed_slice();

        debug!(
            "creating sharded lru cache with {} shards of capacity {}",
            count, capacity_per_shard
        );
        Ok(Self {
            shards,
            selector: ShardSelector::new(count),
        })
    }

    /// Returns the number of shards.
    #[inline]
    pub fn shard_count(&self) -> usize {
        self.shards.len()
    }

    /// Returns the shard index `key` routes to.
    #[inline]
    pub fn shard_index(&self, key: &K) -> usize {
        self.selector.shard_for_key(key)
    }

    /// Returns the shard `key` routes to.
    #[inline]
    pub fn shard(&self, key: &K) -> &LruCache<K, V> {
        &self.shards[self.shard_index(key)]
    }

    /// Returns all shards in index order.
    pub fn shards(&self) -> &[LruCache<K, V>] {
        &self.shards
    }

    /// Total number of live keys across all shards.
    ///
    /// Shards are read one after another, so under concurrent writes the sum
    /// is not a single point-in-time snapshot.
    pub fn len(&self) -> usize {
        self.shards.iter().map(LruCache::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.shards.iter().all(LruCache::is_empty)
    }

    /// Total capacity across all shards.
    pub fn capacity(&self) -> usize {
        self.shards.iter().map(LruCache::capacity).sum()
    }

    /// See [`LruCache::has`].
    pub fn has(&self, key: &K) -> Option<bool> {
        self.shard(key).has(key)
    }

    /// See [`LruCache::contains`].
    pub fn contains(&self, key: &K) -> bool {
        self.shard(key).contains(key)
    }

    /// See [`LruCache::get`].
    pub fn get(&self, key: &K) -> Option<(V, bool)> {
        self.shard(key).get(key)
    }

    /// See [`LruCache::get_with_ttl`].
    pub fn get_with_ttl(&self, key: &K) -> Option<(V, Option<Duration>)> {
        self.shard(key).get_with_ttl(key)
    }

    /// See [`LruCache::get_quiet`].
    pub fn get_quiet(&self, key: &K) -> Option<(V, bool)> {
        self.shard(key).get_quiet(key)
    }

    /// See [`LruCache::get_not_stale`].
    pub fn get_not_stale(&self, key: &K) -> Option<V> {
        self.shard(key).get_not_stale(key)
    }

    /// See [`LruCache::set`].
    pub fn set(&self, key: K, value: V, ttl: Duration) {
        self.shard(&key).set(key, value, ttl)
    }

    /// See [`LruCache::delete`].
    pub fn delete(&self, key: &K) -> bool {
        self.shard(key).delete(key)
    }

    /// Looks up many keys; one [`LruCache::mget`] per involved shard.
    pub fn mget(&self, keys: &[K]) -> FxHashMap<K, V> {
        self.merge(keys, LruCache::<K, V>::mget)
    }

    /// Looks up many keys, omitting expired entries.
    pub fn mget_not_stale(&self, keys: &[K]) -> FxHashMap<K, V> {
        self.merge(keys, LruCache::<K, V>::mget_not_stale)
    }

    /// Inserts every pair; one exclusive lock per involved shard.
    pub fn mset<I>(&self, items: I, ttl: Duration)
    where
        I: IntoIterator<Item = (K, V)>,
    {
        let mut groups: Vec<Vec<(K, V)>> = (0..self.shards.len()).map(|_| Vec::new()).collect();
        for (key, value) in items {
            groups[self.shard_index(&key)].push((key, value));
        }
        for (shard, group) in self.shards.iter().zip(groups) {
            if !group.is_empty() {
                shard.mset(group, ttl);
            }
        }
    }

    /// Removes every key in `keys`; returns how many were present.
    pub fn mdelete(&self, keys: &[K]) -> usize {
        self.group_keys(keys)
            .into_iter()
            .enumerate()
            .filter(|(_, group)| !group.is_empty())
            .map(|(index, group)| self.shards[index].mdelete(&group))
            .sum()
    }

    /// Checks every shard's invariants and that each key lives in the shard
    /// it routes to.
    pub fn check_invariants(&self) -> Result<(), InvariantError> {
        for (index, shard) in self.shards.iter().enumerate() {
            shard
                .check_invariants()
                .map_err(|err| InvariantError::Shard {
                    shard: index,
                    source: Box::new(err),
                })?;

            let mut misrouted = 0usize;
            shard.for_each_key(|key| {
                if self.shard_index(key) != index {
                    misrouted += 1;
                }
            });
            if misrouted > 0 {
                return Err(InvariantError::Misrouted {
                    shard: index,
                    keys: misrouted,
                });
            }
        }
        Ok(())
    }

    fn group_keys(&self, keys: &[K]) -> Vec<Vec<K>> {
        let mut groups: Vec<Vec<K>> = (0..self.shards.len()).map(|_| Vec::new()).collect();
        for key in keys {
            groups[self.shard_index(key)].push(key.clone());
        }
        groups
    }

    fn merge<F>(&self, keys: &[K], lookup: F) -> FxHashMap<K, V>
    where
        F: Fn(&LruCache<K, V>, &[K]) -> FxHashMap<K, V>,
    {
        let mut merged = FxHashMap::with_capacity_and_hasher(keys.len(), Default::default());
        for (index, group) in self.group_keys(keys).into_iter().enumerate() {
            if group.is_empty() {
                continue;
            }
            merged.extend(lookup(&self.shards[index], &group));
        }
        merged
    }
}

impl<K, V> fmt::Debug for ShardedLruCache<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShardedLruCache")
            .field("shards", &self.shards.len())
            .finish()
    }
}
