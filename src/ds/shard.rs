//! Deterministic key-to-shard routing.
//!
//! [`ShardSelector`] maps keys onto a power-of-two number of shards with a
//! mask, so routing costs one hash plus one `&`. The hash comes from
//! [`ShardKey`], which is implemented directly for strings, byte vectors and
//! every integer width, and falls back to `Hash` + `FxHasher` for anything
//! else. The choice is made by the type system at compile time, not per call.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Shard Selection Flow                           │
//! │                                                                         │
//! │   Input Key                                                             │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │   ┌───────────────────────────────────────────────────────────────┐   │
//! │   │  ShardSelector { mask: 3 }      (4 shards)                    │   │
//! │   │                                                               │   │
//! │   │  1. h = key.shard_hash()   (u64 as-is, str bytes via Fx, …)   │   │
//! │   │  2. h = mix64(h)           (spread entropy into low bits)     │   │
//! │   │  3. shard = h & mask                                          │   │
//! │   └───────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │   ┌─────────┬─────────┬─────────┬─────────┐                           │
//! │   │ Shard 0 │ Shard 1 │ Shard 2 │ Shard 3 │                           │
//! │   └─────────┴─────────┴─────────┴─────────┘                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Example Usage
//!
//! ```
//! use shardlru::ds::ShardSelector;
//!
//! // 5 is rounded up to 8 shards
//! let selector = ShardSelector::new(5);
//! assert_eq!(selector.shard_count(), 8);
//!
//! let shard = selector.shard_for_key("user:123");
//! assert!(shard < 8);
//! assert_eq!(selector.shard_for_key("user:123"), shard);
//! ```
//!
//! Custom key types opt in with an empty impl that uses the `Hash` fallback:
//!
//! ```
//! use shardlru::ds::{ShardKey, ShardSelector};
//!
//! #[derive(Hash, PartialEq, Eq)]
//! struct PageKey {
//!     file: u32,
//!     page: u64,
//! }
//!
//! impl ShardKey for PageKey {}
//!
//! let selector = ShardSelector::new(16);
//! let key = PageKey { file: 1, page: 99 };
//! assert_eq!(selector.shard_for_key(&key), selector.shard_for_key(&key));
//! ```

use std::hash::{Hash, Hasher};
use std::sync::Arc;

use rustc_hash::FxHasher;

/// A key that can be routed to a shard.
///
/// `shard_hash` must be a pure function of the key's value: equal keys must
/// produce equal hashes. The default method feeds the key's `Hash` impl into
/// an `FxHasher`.
pub trait ShardKey: Hash + Eq {
    fn shard_hash(&self) -> u64 {
        let mut hasher = FxHasher::default();
        self.hash(&mut hasher);
        hasher.finish()
    }
}

macro_rules! impl_shard_key_int {
    ($($t:ty),* $(,)?) => {
        $(
            impl ShardKey for $t {
                #[inline]
                fn shard_hash(&self) -> u64 {
                    *self as u64
                }
            }
        )*
    };
}

impl_shard_key_int!(u8, u16, u32, u64, usize, i8, i16, i32, i64, isize);

impl ShardKey for u128 {
    #[inline]
    fn shard_hash(&self) -> u64 {
        (*self as u64) ^ ((*self >> 64) as u64)
    }
}

impl ShardKey for i128 {
    #[inline]
    fn shard_hash(&self) -> u64 {
        (*self as u128).shard_hash()
    }
}

impl ShardKey for bool {
    #[inline]
    fn shard_hash(&self) -> u64 {
        *self as u64
    }
}

impl ShardKey for char {
    #[inline]
    fn shard_hash(&self) -> u64 {
        *self as u64
    }
}

#[inline]
fn hash_bytes(bytes: &[u8]) -> u64 {
    let mut hasher = FxHasher::default();
    hasher.write(bytes);
    hasher.write_usize(bytes.len());
    hasher.finish()
}

impl ShardKey for str {
    #[inline]
    fn shard_hash(&self) -> u64 {
        hash_bytes(self.as_bytes())
    }
}

impl ShardKey for String {
    #[inline]
    fn shard_hash(&self) -> u64 {
        hash_bytes(self.as_bytes())
    }
}

impl ShardKey for Box<str> {
    #[inline]
    fn shard_hash(&self) -> u64 {
        hash_bytes(self.as_bytes())
    }
}

impl ShardKey for Arc<str> {
    #[inline]
    fn shard_hash(&self) -> u64 {
        hash_bytes(self.as_bytes())
    }
}

impl ShardKey for Vec<u8> {
    #[inline]
    fn shard_hash(&self) -> u64 {
        hash_bytes(self)
    }
}

impl<T: ShardKey + ?Sized> ShardKey for &T {
    #[inline]
    fn shard_hash(&self) -> u64 {
        (**self).shard_hash()
    }
}

// Tuples use the Hash fallback.
impl<A: Hash + Eq, B: Hash + Eq> ShardKey for (A, B) {}
impl<A: Hash + Eq, B: Hash + Eq, C: Hash + Eq> ShardKey for (A, B, C) {}

/// 64-bit finalizer (splitmix64). Integer keys hash to themselves, so the
/// low bits that the mask keeps have to be mixed first.
#[inline]
fn mix64(mut h: u64) -> u64 {
    h ^= h >> 30;
    h = h.wrapping_mul(0xbf58_476d_1ce4_e5b9);
    h ^= h >> 27;
    h = h.wrapping_mul(0x94d0_49bb_1331_11eb);
    h ^ (h >> 31)
}

/// Maps keys to one of a power-of-two number of shards.
///
/// The same key always maps to the same shard for a given selector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShardSelector {
    mask: usize,
}

impl ShardSelector {
    /// Creates a selector for `shards` rounded up to the next power of two.
    ///
    /// Zero is treated as one shard.
    ///
    /// # Panics
    ///
    /// Panics if the rounded shard count overflows `usize`.
    ///
    /// # Example
    ///
    /// ```
    /// use shardlru::ds::ShardSelector;
    ///
    /// assert_eq!(ShardSelector::new(16).shard_count(), 16);
    /// assert_eq!(ShardSelector::new(17).shard_count(), 32);
    /// assert_eq!(ShardSelector::new(0).shard_count(), 1);
    /// ```
    pub fn new(shards: usize) -> Self {
        let count = Self::round_shards(shards).expect("shard count overflows usize");
        Self { mask: count - 1 }
    }

    /// Rounds a requested shard count up to a power of two.
    pub(crate) fn round_shards(shards: usize) -> Option<usize> {
        shards.max(1).checked_next_power_of_two()
    }

    /// Returns the number of shards.
    #[inline]
    pub fn shard_count(&self) -> usize {
        self.mask + 1
    }

    /// Maps a key to a shard index in `[0, shard_count)`.
    #[inline]
    pub fn shard_for_key<K: ShardKey + ?Sized>(&self, key: &K) -> usize {
        (mix64(key.shard_hash()) as usize) & self.mask
    }
}

impl Default for ShardSelector {
    /// Creates a single-shard selector.
    fn default() -> Self {
        Self::new(1)
    }
}
