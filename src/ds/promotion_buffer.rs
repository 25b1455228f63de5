//! Lock-free log of pending LRU promotions.
//!
//! Readers that hit a cache entry do not take the cache's exclusive lock to
//! move the entry to the front. They append the entry's [`SlotId`] to the
//! current [`PromotionBuffer`] instead, and the buffer is replayed in one batch
//! under the exclusive lock later.
//!
//! ## Architecture
//!
//! ```text
//!   PromotionLog
//!   ┌───────────────────────────────────────────────────────────────┐
//!   │ current: ArcSwap<PromotionBuffer>                             │
//!   │                                                               │
//!   │   ┌──────────────────────────────────────────┐                │
//!   │   │ slots:    [7][3][7][12][ ][ ] ... [ ]    │  512 slots     │
//!   │   │ position: 4   (fetch_add hands out slot) │                │
//!   │   └──────────────────────────────────────────┘                │
//!   │                                                               │
//!   │ pool: Mutex<Vec<Arc<PromotionBuffer>>>   (reset, reusable)    │
//!   └───────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Protocol
//!
//! 1. `fetch_add` on `position` gives each reader a unique slot. Slots
//!    `1..=512` are written in place.
//! 2. A reader that gets a position past the end takes a fresh buffer from the
//!    pool, seeds it with its own id and tries to `compare_and_swap` it in.
//!    The winner owns the old buffer and must flush it. Losers recycle their
//!    fresh buffer and retry against whatever buffer is now current.
//! 3. Writers call [`PromotionLog::take_pending`] while holding the cache's
//!    exclusive lock, which swaps the current buffer out unconditionally.
//!
//! Either way exactly one caller ends up holding a swapped-out buffer, so the
//! flush reads it without further coordination. A reader that obtained a slot
//! just before the swap may still be storing into it; slot values are atomics
//! and an unwritten slot reads as the root index, which flushing skips.

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};

use arc_swap::{ArcSwap, Guard};
use log::trace;
use parking_lot::Mutex;
use rustc_hash::FxHashSet;

use crate::ds::arena_list::SlotId;

/// Number of promotions a single buffer records before it is swapped out.
pub const PROMOTION_BUFFER_CAPACITY: usize = 512;

/// Drained buffers kept around for reuse.
const MAX_POOLED_BUFFERS: usize = 4;

/// Fixed-size, append-only array of slot ids with an atomic cursor.
#[derive(Debug)]
pub struct PromotionBuffer {
    slots: Box<[AtomicU32]>,
    position: AtomicUsize,
}

impl PromotionBuffer {
    /// Creates an empty buffer.
    pub fn new() -> Self {
        let slots = (0..PROMOTION_BUFFER_CAPACITY)
            .map(|_| AtomicU32::new(SlotId::ROOT.raw()))
            .collect();
        Self {
            slots,
            position: AtomicUsize::new(0),
        }
    }

    /// Appends `id`; returns `false` if the buffer was already full.
    ///
    /// A `false` return still consumes a position, so once a buffer reports
    /// full it stays full until [`reset`](Self::reset).
    #[inline]
    pub fn record(&self, id: SlotId) -> bool {
        let position = self.position.fetch_add(1, Ordering::AcqRel) + 1;
        if position > PROMOTION_BUFFER_CAPACITY {
            return false;
        }
        self.slots[position - 1].store(id.raw(), Ordering::Release);
        true
    }

    /// Number of recorded promotions, capped at the buffer capacity.
    #[inline]
    pub fn len(&self) -> usize {
        self.position
            .load(Ordering::Acquire)
            .min(PROMOTION_BUFFER_CAPACITY)
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Collects the distinct recorded ids into `out`, oldest first.
    ///
    /// An id recorded several times is kept at its most recent position, so
    /// replaying `out` front-to-back with `move_to_front` leaves the most
    /// recently read slot at the front. `seen` is scratch space. Returns the
    /// number of raw records inspected.
    pub fn collect_promotions(&self, seen: &mut FxHashSet<u32>, out: &mut Vec<SlotId>) -> usize {
        seen.clear();
        out.clear();
        let recorded = self.len();
        for slot in self.slots[..recorded].iter().rev() {
            let raw = slot.load(Ordering::Acquire);
            if raw != SlotId::ROOT.raw() && seen.insert(raw) {
                out.push(SlotId::from_raw(raw));
            }
        }
        out.reverse();
        recorded
    }

    /// Clears recorded ids and rewinds the cursor.
    pub fn reset(&self) {
        let used = self.len();
        for slot in &self.slots[..used] {
            slot.store(SlotId::ROOT.raw(), Ordering::Relaxed);
        }
        self.position.store(0, Ordering::Release);
    }

    // Prepares an unpublished buffer whose first entry is `id`.
    fn seed(&self, id: SlotId) {
        self.slots[0].store(id.raw(), Ordering::Relaxed);
        self.position.store(1, Ordering::Release);
    }
}

impl Default for PromotionBuffer {
    fn default() -> Self {
        Self::new()
    }
}

/// The current promotion buffer plus a pool of drained ones.
#[derive(Debug)]
pub struct PromotionLog {
    current: ArcSwap<PromotionBuffer>,
    pool: Mutex<Vec<Arc<PromotionBuffer>>>,
}

impl PromotionLog {
    pub fn new() -> Self {
        Self {
            current: ArcSwap::from_pointee(PromotionBuffer::new()),
            pool: Mutex::new(Vec::with_capacity(MAX_POOLED_BUFFERS)),
        }
    }

    /// Records a read of `id` without blocking.
    ///
    /// Returns `Some(buffer)` when this call swapped out a full buffer; the
    /// caller then owns it and must flush it under the exclusive lock and hand
    /// it back through [`recycle`](Self::recycle). The caller must not hold the
    /// cache's shared lock while flushing.
    pub fn record(&self, id: SlotId) -> Option<Arc<PromotionBuffer>> {
        loop {
            let current = self.current.load();
            if current.record(id) {
                return None;
            }

            let fresh = self.fresh();
            fresh.seed(id);
            let previous = self.current.compare_and_swap(&current, Arc::clone(&fresh));
            if Arc::ptr_eq(&previous, &current) {
                drop(previous);
                return Some(Guard::into_inner(current));
            }

            trace!("promotion buffer swap lost, retrying against the new buffer");
            drop(previous);
            self.recycle(fresh);
        }
    }

    /// Swaps out the current buffer if it holds anything.
    ///
    /// Called by writers while they hold the exclusive lock, so promotions
    /// recorded before the write are applied before it.
    pub fn take_pending(&self) -> Option<Arc<PromotionBuffer>> {
        if self.current.load().is_empty() {
            return None;
        }
        Some(self.current.swap(self.fresh()))
    }

    /// Resets `buffer` and returns it to the pool.
    ///
    /// A buffer some stale reader still holds a guard to is dropped instead,
    /// so a late write can never land in a pooled buffer. Swapping a buffer
    /// out settles outstanding guards into real references, which makes the
    /// strong count exact here.
    pub fn recycle(&self, buffer: Arc<PromotionBuffer>) {
        if Arc::strong_count(&buffer) != 1 {
            return;
        }
        buffer.reset();
        let mut pool = self.pool.lock();
        if pool.len() < MAX_POOLED_BUFFERS {
            pool.push(buffer);
        }
    }

    /// Number of promotions waiting in the current buffer.
    pub fn pending(&self) -> usize {
        self.current.load().len()
    }

    fn fresh(&self) -> Arc<PromotionBuffer> {
        self.pool
            .lock()
            .pop()
            .unwrap_or_else(|| Arc::new(PromotionBuffer::new()))
    }
}

impl Default for PromotionLog {
    fn default() -> Self {
        Self::new()
    }
}
