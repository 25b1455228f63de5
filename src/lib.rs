//! shardlru: fixed-capacity LRU caches with lock-free read promotion.
//!
//! - [`policy::lru::LruCache`]: one arena-backed cache behind an `RwLock`.
//!   Reads take the shared lock and log promotions into a lock-free buffer;
//!   writes replay the buffer under the exclusive lock before mutating.
//! - [`policy::sharded_lru::ShardedLruCache`]: a power-of-two array of
//!   `LruCache` shards routed by [`ds::ShardKey`] hashing.
//! - [`builder::CacheBuilder`]: validated construction of either.
//!
//! Logging goes through the `log` facade; install any logger to see
//! construction (`debug`) and promotion flush (`trace`) events.

pub mod builder;
pub mod ds;
pub mod error;
pub mod policy;
pub mod prelude;
