//! Cache builder.
//!
//! Collects construction parameters in one place and validates them before
//! any memory is allocated. Capacity is per cache: for the sharded build it is
//! the capacity of each shard.
//!
//! ## Example
//!
//! ```rust
//! use std::time::Duration;
//! use shardlru::builder::CacheBuilder;
//!
//! let cache = CacheBuilder::new(100).build::<u64, String>();
//! cache.set(1, "hello".to_string(), Duration::ZERO);
//! assert_eq!(cache.get(&1), Some(("hello".to_string(), false)));
//!
//! let sharded = CacheBuilder::new(256).shards(8).build_sharded::<u64, String>();
//! assert_eq!(sharded.shard_count(), 8);
//! assert_eq!(sharded.capacity(), 2048);
//! ```

use std::hash::Hash;

use crate::ds::shard::ShardKey;
use crate::error::ConfigError;
use crate::policy::lru::LruCache;
use crate::policy::sharded_lru::ShardedLruCache;

/// Shard count used by [`CacheBuilder::build_sharded`] unless overridden.
pub const DEFAULT_SHARDS: usize = 16;

/// Builder for [`LruCache`] and [`ShardedLruCache`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheBuilder {
    capacity: usize,
    shards: usize,
}

impl CacheBuilder {
    /// Starts a builder for caches holding `capacity` entries (per shard).
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            shards: DEFAULT_SHARDS,
        }
    }

    /// Sets the shard count; rounded up to a power of two at build time.
    pub fn shards(mut self, shards: usize) -> Self {
        self.shards = shards;
        self
    }

    /// Returns the configured capacity.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Returns the configured (unrounded) shard count.
    pub fn shard_count(&self) -> usize {
        self.shards
    }

    /// Builds a single [`LruCache`].
    ///
    /// # Panics
    ///
    /// Panics if the capacity is invalid.
    pub fn build<K, V>(&self) -> LruCache<K, V>
    where
        K: Eq + Hash + Clone,
        V: Clone,
    {
        LruCache::new(self.capacity)
    }

    /// Builds a single [`LruCache`], returning an error on invalid capacity.
    pub fn try_build<K, V>(&self) -> Result<LruCache<K, V>, ConfigError>
    where
        K: Eq + Hash + Clone,
        V: Clone,
    {
        LruCache::try_new(self.capacity)
    }

    /// Builds a [`ShardedLruCache`].
    ///
    /// # Panics
    ///
    /// Panics if the capacity or shard count is invalid.
    pub fn build_sharded<K, V>(&self) -> ShardedLruCache<K, V>
    where
        K: ShardKey + Clone,
        V: Clone,
    {
        ShardedLruCache::new(self.shards, self.capacity)
    }

    /// Builds a [`ShardedLruCache`], returning an error on invalid parameters.
    pub fn try_build_sharded<K, V>(&self) -> Result<ShardedLruCache<K, V>, ConfigError>
    where
        K: ShardKey + Clone,
        V: Clone,
    {
        ShardedLruCache::try_new(self.shards, self.capacity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_defaults() {
        let builder = CacheBuilder::new(10);
        assert_eq!(builder.capacity(), 10);
        assert_eq!(builder.shard_count(), DEFAULT_SHARDS);
    }

    #[test]
    fn builder_builds_both_kinds() {
        let cache = CacheBuilder::new(10).build::<u32, u32>();
        assert_eq!(cache.capacity(), 10);

        let sharded = CacheBuilder::new(10).shards(3).build_sharded::<u32, u32>();
        assert_eq!(sharded.shard_count(), 4);
        assert_eq!(sharded.capacity(), 40);
    }

    #[test]
    fn builder_try_build_reports_errors() {
        assert!(CacheBuilder::new(0).try_build::<u32, u32>().is_err());
        assert!(
            CacheBuilder::new(8)
                .shards(0)
                .try_build_sharded::<u32, u32>()
                .is_err()
        );
        assert!(
            CacheBuilder::new(8)
                .shards(2)
                .try_build_sharded::<u32, u32>()
                .is_ok()
        );
    }
}
