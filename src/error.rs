//! Error types for the shardlru library.
//!
//! Reads and writes never fail: a missing key is `None` and staleness is a
//! flag on the hit. Errors only come out of construction ([`ConfigError`])
//! and out of `check_invariants` ([`InvariantError`]).
//!
//! ```
//! use shardlru::error::ConfigError;
//! use shardlru::policy::lru::LruCache;
//! use shardlru::policy::sharded_lru::ShardedLruCache;
//!
//! assert!(matches!(
//!     LruCache::<u64, String>::try_new(0),
//!     Err(ConfigError::ZeroCapacity)
//! ));
//! assert!(matches!(
//!     ShardedLruCache::<u64, String>::try_new(0, 64),
//!     Err(ConfigError::ZeroShards)
//! ));
//! ```

use std::error::Error;
use std::fmt;

/// Rejected construction parameters.
///
/// Returned by [`LruCache::try_new`](crate::policy::lru::LruCache::try_new),
/// [`ShardedLruCache::try_new`](crate::policy::sharded_lru::ShardedLruCache::try_new)
/// and the builder's `try_build*` methods. The panicking constructors panic
/// with this type's `Display` text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// A cache (or a shard) was asked to hold zero entries.
    ZeroCapacity,
    /// Slot ids are `u32`, so a single cache cannot exceed `max` entries.
    CapacityTooLarge { requested: usize, max: usize },
    /// A sharded cache needs at least one shard.
    ZeroShards,
    /// The shard count has no power of two above it that fits in `usize`.
    ShardCountOverflow(usize),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            ConfigError::ZeroCapacity => f.write_str("capacity must be > 0"),
            ConfigError::CapacityTooLarge { requested, max } => {
                write!(f, "capacity {} exceeds the maximum of {}", requested, max)
            },
            ConfigError::ZeroShards => f.write_str("shard count must be > 0"),
            ConfigError::ShardCountOverflow(shards) => write!(
                f,
                "shard count {} cannot be rounded up to a power of two",
                shards
            ),
        }
    }
}

impl Error for ConfigError {}

/// A broken structural invariant found by `check_invariants`.
///
/// These only appear if the cache itself has a bug; tests and debug tooling
/// call the checks after concurrent workloads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvariantError {
    /// More keys are indexed than the cache can hold.
    OverCapacity { len: usize, capacity: usize },
    /// The arena's circular list is not a single well-linked ring.
    BrokenRing(String),
    /// The key index points at a slot holding a different key.
    KeyMismatch { slot: usize },
    /// The key index points at an empty slot.
    EmptySlot { slot: usize },
    /// Occupied slots and indexed keys disagree in number.
    OccupancyMismatch { occupied: usize, indexed: usize },
    /// A shard holds keys that hash to another shard.
    Misrouted { shard: usize, keys: usize },
    /// A shard failed its own check.
    Shard {
        shard: usize,
        source: Box<InvariantError>,
    },
}

impl fmt::Display for InvariantError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InvariantError::OverCapacity { len, capacity } => {
                write!(f, "index holds {} keys but capacity is {}", len, capacity)
            },
            InvariantError::BrokenRing(detail) => write!(f, "broken slot ring: {}", detail),
            InvariantError::KeyMismatch { slot } => {
                write!(f, "slot {} holds a different key than the index says", slot)
            },
            InvariantError::EmptySlot { slot } => write!(f, "index points at empty slot {}", slot),
            InvariantError::OccupancyMismatch { occupied, indexed } => write!(
                f,
                "{} occupied slots but {} indexed keys",
                occupied, indexed
            ),
            InvariantError::Misrouted { shard, keys } => {
                write!(f, "shard {} holds {} keys that route elsewhere", shard, keys)
            },
            InvariantError::Shard { shard, source } => write!(f, "shard {}: {}", shard, source),
        }
    }
}

impl Error for InvariantError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            InvariantError::Shard { source, .. } => Some(source.as_ref()),
            _ => None,
        }
    }
}
