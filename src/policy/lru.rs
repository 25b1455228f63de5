//! # Fixed-capacity LRU cache with batched read promotion
//!
//! `LruCache` keeps every entry in a preallocated [`ArenaList`] and indexes it
//! with an `FxHashMap<K, SlotId>`. Nothing is allocated per operation once the
//! cache is built: inserting a new key repurposes the slot at the back of the
//! list, deleting a key clears its slot and parks it at the back.
//!
//! ## Architecture
//!
//! ```text
//!   ┌──────────────────────────────────────────────────────────────────────┐
//!   │                          LruCache<K, V>                              │
//!   │                                                                      │
//!   │   ┌────────────────────────────────────────────────────────────────┐ │
//!   │   │                    RwLock<LruCore<K, V>>                       │ │
//!   │   │                                                                │ │
//!   │   │   FxHashMap<K, SlotId>          ArenaList<Option<Entry>>       │ │
//!   │   │   ┌────────┬────────┐          root ─► [3] ◄─► [1] ◄─► [2]     │ │
//!   │   │   │ "a"    │ 3      │ ───────────────►  MRU            LRU     │ │
//!   │   │   │ "b"    │ 1      │                                          │ │
//!   │   │   └────────┴────────┘          (slot 2 empty: reused first)    │ │
//!   │   └────────────────────────────────────────────────────────────────┘ │
//!   │                                                                      │
//!   │   ┌────────────────────────────────────────────────────────────────┐ │
//!   │   │  PromotionLog  (ArcSwap<PromotionBuffer>, lock-free appends)   │ │
//!   │   └────────────────────────────────────────────────────────────────┘ │
//!   └──────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Read and write paths
//!
//! ```text
//!   get(k)                                  set(k, v, ttl)
//!   ──────                                  ──────────────
//!   read lock                               write lock
//!     map[k] → slot, clone value              take pending promotion buffer
//!   unlock                                    replay it (move_to_front each)
//!   PromotionLog::record(slot)                k present? update + move_to_front
//!     └─ buffer full and we won the swap?     else take back(), evict occupant,
//!          write lock, replay, unlock              install k, move_to_front
//! ```
//!
//! Promotions recorded before a write are replayed before the write touches
//! the list, so recency order converges without readers ever taking the
//! exclusive lock.
//!
//! ## Expiry
//!
//! A TTL is turned into an absolute deadline at write time. Expired entries
//! stay in the cache until evicted or overwritten: `get` reports them with
//! `expired = true`, `get_not_stale` hides them. Eviction is driven by
//! recency only; an expired entry is not preferred as a victim.
//!
//! ## Example
//!
//! ```
//! use std::time::Duration;
//! use shardlru::policy::lru::LruCache;
//!
//! let cache = LruCache::new(3);
//! cache.set("a", 1, Duration::ZERO);
//! cache.set("b", 2, Duration::ZERO);
//! cache.set("c", 3, Duration::ZERO);
//!
//! assert_eq!(cache.get(&"a"), Some((1, false)));
//!
//! // "a" was read, so "b" is the least recently used entry
//! cache.set("d", 4, Duration::ZERO);
//! assert_eq!(cache.get(&"b"), None);
//! assert_eq!(cache.len(), 3);
//! ```

use std::fmt;
use std::hash::Hash;
use std::sync::Arc;
use std::time::{Duration, Instant};

use log::{debug, trace};
use parking_lot::RwLock;
use rustc_hash::{FxHashMap, FxHashSet};

use crate::ds::arena_list::{ArenaList, SlotId};
use crate::ds::promotion_buffer::{PROMOTION_BUFFER_CAPACITY, PromotionBuffer, PromotionLog};
use crate::error::{ConfigError, InvariantError};

/// Largest supported capacity; slot indices are `u32` and index 0 is the root.
pub const MAX_CAPACITY: usize = u32::MAX as usize;

/// Turns a TTL into an absolute deadline. `Duration::ZERO` never expires.
#[inline]
pub(crate) fn deadline(ttl: Duration) -> Option<Instant> {
    if ttl.is_zero() {
        None
    } else {
        Instant::now().checked_add(ttl)
    }
}

struct Entry<K, V> {
    key: K,
    value: V,
    expires_at: Option<Instant>,
}

impl<K, V> Entry<K, V> {
    #[inline]
    fn is_expired(&self) -> bool {
        self.expires_at.is_some_and(|at| Instant::now() > at)
    }
}

/// Map + list state guarded by the cache's lock.
struct LruCore<K, V> {
    map: FxHashMap<K, SlotId>,
    list: ArenaList<Option<Entry<K, V>>>,
    // scratch space for replaying promotion buffers
    seen: FxHashSet<u32>,
    promoted: Vec<SlotId>,
}

impl<K, V> LruCore<K, V>
where
    K: Eq + Hash + Clone,
{
    fn new(capacity: usize) -> Self {
        Self {
            map: FxHashMap::with_capacity_and_hasher(capacity, Default::default()),
            list: ArenaList::with_capacity(capacity),
            seen: FxHashSet::with_capacity_and_hasher(
                PROMOTION_BUFFER_CAPACITY,
                Default::default(),
            ),
            promoted: Vec::with_capacity(PROMOTION_BUFFER_CAPACITY),
        }
    }

    #[inline]
    fn lookup(&self, key: &K) -> Option<(SlotId, &Entry<K, V>)> {
        let id = *self.map.get(key)?;
        self.list.get(id).as_ref().map(|entry| (id, entry))
    }

    fn insert(&mut self, key: K, value: V, expires_at: Option<Instant>) {
        if let Some(&id) = self.map.get(&key) {
            if let Some(entry) = self.list.get_mut(id) {
                entry.value = value;
                entry.expires_at = expires_at;
            }
            self.list.move_to_front(id);
            return;
        }

        // back() is either an unused slot or the least recently used entry
        let id = self.list.back();
        if let Some(evicted) = self.list.get_mut(id).take() {
            self.map.remove(&evicted.key);
        }
        *self.list.get_mut(id) = Some(Entry {
            key: key.clone(),
            value,
            expires_at,
        });
        self.map.insert(key, id);
        self.list.move_to_front(id);
    }

    fn remove(&mut self, key: &K) -> bool {
        let Some(id) = self.map.remove(key) else {
            return false;
        };
        *self.list.get_mut(id) = None;
        self.list.move_to_back(id);
        true
    }

    /// Replays a drained promotion buffer. Slots emptied since the read was
    /// recorded are left where they are.
    fn apply(&mut self, buffer: &PromotionBuffer) {
        let recorded = buffer.collect_promotions(&mut self.seen, &mut self.promoted);
        let mut moved = 0usize;
        for &id in &self.promoted {
            if self.list.contains(id) && self.list.get(id).is_some() {
                self.list.move_to_front(id);
                moved += 1;
            }
        }
        trace!(
            "flushed promotion buffer: {} recorded, {} promoted",
            recorded, moved
        );
    }

    fn check_invariants(&self, capacity: usize) -> Result<(), InvariantError> {
        if self.map.len() > capacity {
            return Err(InvariantError::OverCapacity {
                len: self.map.len(),
                capacity,
            });
        }
        self.list.validate_ring().map_err(InvariantError::BrokenRing)?;

        for (key, &id) in &self.map {
            match self.list.get(id) {
                Some(entry) if entry.key == *key => {},
                Some(_) => {
                    return Err(InvariantError::KeyMismatch { slot: id.index() });
                },
                None => {
                    return Err(InvariantError::EmptySlot { slot: id.index() });
                },
            }
        }

        let occupied = self.list.iter().filter(|(_, e)| e.is_some()).count();
        if occupied != self.map.len() {
            return Err(InvariantError::OccupancyMismatch {
                occupied,
                indexed: self.map.len(),
            });
        }
        Ok(())
    }

    #[cfg(test)]
    fn keys_mru(&self) -> Vec<K> {
        self.list
            .iter()
            .filter_map(|(_, entry)| entry.as_ref().map(|e| e.key.clone()))
            .collect()
    }
}

/// Thread-safe, fixed-capacity LRU cache with TTL support.
///
/// Reads take a shared lock and record promotions into a lock-free buffer;
/// writes take the exclusive lock and first replay any pending promotions.
/// See the [module docs](self) for the full protocol.
pub struct LruCache<K, V> {
    inner: RwLock<LruCore<K, V>>,
    promotions: PromotionLog,
    capacity: usize,
}

impl<K, V> LruCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    /// Creates a cache holding at most `capacity` entries.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero or larger than [`MAX_CAPACITY`]. Use
    /// [`try_new`](Self::try_new) for user-supplied values.
    ///
    /// # Example
    ///
    /// ```
    /// use shardlru::policy::lru::LruCache;
    ///
    /// let cache: LruCache<u64, String> = LruCache::new(100);
    /// assert_eq!(cache.capacity(), 100);
    /// assert!(cache.is_empty());
    /// ```
    pub fn new(capacity: usize) -> Self {
        match Self::try_new(capacity) {
            Ok(cache) => cache,
            Err(err) => panic!("{}", err),
        }
    }

    /// Creates a cache, rejecting an invalid capacity instead of panicking.
    pub fn try_new(capacity: usize) -> Result<Self, ConfigError> {
        if capacity == 0 {
            return Err(ConfigError::ZeroCapacity);
        }
        if capacity > MAX_CAPACITY {
            return Err(ConfigError::CapacityTooLarge {
                requested: capacity,
                max: MAX_CAPACITY,
            });
        }
        debug!("creating lru cache with capacity {}", capacity);
        Ok(Self {
            inner: RwLock::new(LruCore::new(capacity)),
            promotions: PromotionLog::new(),
            capacity,
        })
    }

    /// Returns the number of live keys.
    #[inline]
    pub fn len(&self) -> usize {
        self.inner.read().map.len()
    }

    /// Returns `true` if the cache holds no keys.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the fixed capacity.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Returns `Some(expired)` if `key` is present, without promoting it.
    ///
    /// # Example
    ///
    /// ```
    /// use std::time::Duration;
    /// use shardlru::policy::lru::LruCache;
    ///
    /// let cache = LruCache::new(4);
    /// cache.set(1, "one", Duration::ZERO);
    /// assert_eq!(cache.has(&1), Some(false));
    /// assert_eq!(cache.has(&2), None);
    /// ```
    pub fn has(&self, key: &K) -> Option<bool> {
        let core = self.inner.read();
        core.lookup(key).map(|(_, entry)| entry.is_expired())
    }

    /// Returns `true` if `key` is present, expired or not.
    pub fn contains(&self, key: &K) -> bool {
        self.inner.read().map.contains_key(key)
    }

    /// Returns the value and whether its TTL has elapsed, promoting the entry.
    ///
    /// Expired entries are still returned and still promoted; the caller
    /// decides whether a stale value is usable.
    pub fn get(&self, key: &K) -> Option<(V, bool)> {
        let (id, value, expired) = {
            let core = self.inner.read();
            let (id, entry) = core.lookup(key)?;
            (id, entry.value.clone(), entry.is_expired())
        };
        self.promote(id);
        Some((value, expired))
    }

    /// Like [`get`](Self::get) but returns the remaining TTL.
    ///
    /// `None` means the entry never expires. An expired entry reports
    /// `Duration::ZERO`.
    ///
    /// # Example
    ///
    /// ```
    /// use std::time::Duration;
    /// use shardlru::policy::lru::LruCache;
    ///
    /// let cache = LruCache::new(4);
    /// cache.set("session", 7, Duration::from_secs(60));
    /// let (value, remaining) = cache.get_with_ttl(&"session").unwrap();
    /// assert_eq!(value, 7);
    /// assert!(remaining.unwrap() <= Duration::from_secs(60));
    /// ```
    pub fn get_with_ttl(&self, key: &K) -> Option<(V, Option<Duration>)> {
        let (id, value, remaining) = {
            let core = self.inner.read();
            let (id, entry) = core.lookup(key)?;
            let remaining = entry
                .expires_at
                .map(|at| at.saturating_duration_since(Instant::now()));
            (id, entry.value.clone(), remaining)
        };
        self.promote(id);
        Some((value, remaining))
    }

    /// Like [`get`](Self::get) but never changes eviction order.
    pub fn get_quiet(&self, key: &K) -> Option<(V, bool)> {
        let core = self.inner.read();
        core.lookup(key)
            .map(|(_, entry)| (entry.value.clone(), entry.is_expired()))
    }

    /// Returns the value only if it has not expired. Expired entries are
    /// treated as absent and are not promoted.
    pub fn get_not_stale(&self, key: &K) -> Option<V> {
        let (id, value) = {
            let core = self.inner.read();
            let (id, entry) = core.lookup(key)?;
            if entry.is_expired() {
                return None;
            }
            (id, entry.value.clone())
        };
        self.promote(id);
        Some(value)
    }

    /// Looks up many keys, promoting every hit. Missing keys are omitted.
    ///
    /// The shared lock is released every [`PROMOTION_BUFFER_CAPACITY`] keys so
    /// a huge batch cannot starve writers.
    pub fn mget(&self, keys: &[K]) -> FxHashMap<K, V> {
        self.mget_with(keys, false)
    }

    /// Like [`mget`](Self::mget) but omits expired entries.
    pub fn mget_not_stale(&self, keys: &[K]) -> FxHashMap<K, V> {
        self.mget_with(keys, true)
    }

    fn mget_with(&self, keys: &[K], skip_stale: bool) -> FxHashMap<K, V> {
        let mut found = FxHashMap::with_capacity_and_hasher(keys.len(), Default::default());
        let mut touched = Vec::with_capacity(keys.len().min(PROMOTION_BUFFER_CAPACITY));

        for chunk in keys.chunks(PROMOTION_BUFFER_CAPACITY) {
            {
                let core = self.inner.read();
                for key in chunk {
                    let Some((id, entry)) = core.lookup(key) else {
                        continue;
                    };
                    if skip_stale && entry.is_expired() {
                        continue;
                    }
                    found.insert(key.clone(), entry.value.clone());
                    touched.push(id);
                }
            }
            // promotions may need the write lock, so only after unlocking
            for id in touched.drain(..) {
                self.promote(id);
            }
        }
        found
    }

    /// Inserts or overwrites `key`. `Duration::ZERO` means no expiry.
    ///
    /// A new key takes the least recently used slot, evicting its occupant if
    /// the cache is full.
    pub fn set(&self, key: K, value: V, ttl: Duration) {
        let expires_at = deadline(ttl);
        let mut core = self.inner.write();
        self.flush_pending(&mut core);
        core.insert(key, value, expires_at);
    }

    /// Inserts every pair with the same TTL under one exclusive lock.
    pub fn mset<I>(&self, items: I, ttl: Duration)
    where
        I: IntoIterator<Item = (K, V)>,
    {
        let expires_at = deadline(ttl);
        let mut core = self.inner.write();
        self.flush_pending(&mut core);
        for (key, value) in items {
            core.insert(key, value, expires_at);
        }
    }

    /// Removes `key`; returns whether it was present.
    ///
    /// The freed slot moves to the back so the next insert reuses it.
    pub fn delete(&self, key: &K) -> bool {
        let mut core = self.inner.write();
        self.flush_pending(&mut core);
        core.remove(key)
    }

    /// Removes every key in `keys`; returns how many were present.
    pub fn mdelete(&self, keys: &[K]) -> usize {
        let mut core = self.inner.write();
        self.flush_pending(&mut core);
        keys.iter().filter(|key| core.remove(key)).count()
    }

    /// Verifies the map/list bijection and the ring structure.
    pub fn check_invariants(&self) -> Result<(), InvariantError> {
        self.inner.read().check_invariants(self.capacity)
    }

    /// Visits every live key under the shared lock.
    pub(crate) fn for_each_key(&self, mut f: impl FnMut(&K)) {
        let core = self.inner.read();
        for key in core.map.keys() {
            f(key);
        }
    }

    #[inline]
    fn promote(&self, id: SlotId) {
        if let Some(buffer) = self.promotions.record(id) {
            self.flush(buffer);
        }
    }

    // Replays a buffer this thread swapped out on overflow.
    fn flush(&self, buffer: Arc<PromotionBuffer>) {
        self.inner.write().apply(&buffer);
        self.promotions.recycle(buffer);
    }

    // Caller holds the exclusive lock.
    fn flush_pending(&self, core: &mut LruCore<K, V>) {
        if let Some(buffer) = self.promotions.take_pending() {
            core.apply(&buffer);
            self.promotions.recycle(buffer);
        }
    }

    #[cfg(test)]
    fn keys_mru(&self) -> Vec<K> {
        self.inner.read().keys_mru()
    }
}

impl<K, V> fmt::Debug for LruCache<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LruCache")
            .field("len", &self.inner.read().map.len())
            .field("capacity", &self.capacity)
            .field("pending_promotions", &self.promotions.pending())
            .finish()
    }
}
