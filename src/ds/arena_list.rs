//! Fixed-capacity circular doubly linked list addressed by index.
//!
//! All nodes live in one preallocated `Vec` and link to each other by
//! [`SlotId`], so moving a node never allocates and handles stay valid for the
//! lifetime of the list. Index 0 is a sentinel root; the remaining `capacity`
//! nodes are linked into the ring at construction time and never leave it.
//!
//! ## Architecture
//!
//! ```text
//!   nodes (Vec<Node<T>>, len = capacity + 1)
//!   ┌───────┬──────────────────────────────────────┐
//!   │ index │ Node { value, prev, next }           │
//!   ├───────┼──────────────────────────────────────┤
//!   │   0   │ root    { prev: 3, next: 1 }         │
//!   │   1   │ value A { prev: 0, next: 2 }         │
//!   │   2   │ value B { prev: 1, next: 3 }         │
//!   │   3   │ value C { prev: 2, next: 0 }         │
//!   └───────┴──────────────────────────────────────┘
//!
//!   root ─► [1] ◄──► [2] ◄──► [3] ─► root
//!          front                back
//! ```
//!
//! "Empty" is not a list concept here: every slot is always in the ring. The
//! owner decides what an unused slot means (for the cache, `None`).
//!
//! ## Operations
//! - `front()` / `back()`: O(1), neighbours of the root
//! - `move_to_front(id)` / `move_to_back(id)`: unlink + splice, O(1)
//! - `get(id)` / `get_mut(id)`: direct index access
//!
//! `debug_validate_invariants()` is available in debug/test builds.

/// Handle to a slot in an [`ArenaList`].
///
/// Handles are plain indices: copying one never aliases the node it names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SlotId(pub(crate) u32);

impl SlotId {
    pub(crate) const ROOT: SlotId = SlotId(0);

    /// Returns the raw index of this slot.
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }

    #[inline]
    pub(crate) fn from_raw(raw: u32) -> Self {
        SlotId(raw)
    }

    #[inline]
    pub(crate) fn raw(self) -> u32 {
        self.0
    }
}

#[derive(Debug)]
struct Node<T> {
    value: T,
    prev: u32,
    next: u32,
}

/// Circular list of `capacity` reusable slots plus a sentinel root.
#[derive(Debug)]
pub struct ArenaList<T> {
    nodes: Vec<Node<T>>,
}

impl<T: Default> ArenaList<T> {
    /// Creates a list with `capacity` slots, each holding `T::default()`.
    ///
    /// Slots are linked in index order, so `back()` is the highest index
    /// until something is moved.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero or exceeds `u32::MAX`.
    pub fn with_capacity(capacity: usize) -> Self {
        assert!(capacity > 0, "arena list capacity must be > 0");
        assert!(
            capacity <= u32::MAX as usize,
            "arena list capacity must be <= u32::MAX"
        );

        let total = capacity + 1;
        let mut nodes = Vec::with_capacity(total);
        for i in 0..total {
            let prev = if i == 0 { capacity } else { i - 1 };
            let next = if i == capacity { 0 } else { i + 1 };
            nodes.push(Node {
                value: T::default(),
                prev: prev as u32,
                next: next as u32,
            });
        }
        Self { nodes }
    }
}

impl<T> ArenaList<T> {
    /// Returns the number of slots (excluding the root).
    #[inline]
    pub fn capacity(&self) -> usize {
        self.nodes.len() - 1
    }

    /// Returns the most recently promoted slot.
    #[inline]
    pub fn front(&self) -> SlotId {
        SlotId(self.nodes[0].next)
    }

    /// Returns the least recently promoted slot.
    #[inline]
    pub fn back(&self) -> SlotId {
        SlotId(self.nodes[0].prev)
    }

    /// Returns `true` if `id` names a non-root slot of this list.
    #[inline]
    pub fn contains(&self, id: SlotId) -> bool {
        id != SlotId::ROOT && id.index() < self.nodes.len()
    }

    /// Returns the value stored at `id`.
    ///
    /// # Panics
    ///
    /// Panics if `id` is out of range.
    #[inline]
    pub fn get(&self, id: SlotId) -> &T {
        &self.nodes[id.index()].value
    }

    /// Returns a mutable reference to the value stored at `id`.
    #[inline]
    pub fn get_mut(&mut self, id: SlotId) -> &mut T {
        &mut self.nodes[id.index()].value
    }

    /// Moves `id` to the front; a no-op if it is already there.
    pub fn move_to_front(&mut self, id: SlotId) {
        debug_assert!(self.contains(id));
        if self.nodes[0].next == id.0 {
            return;
        }
        self.unlink(id);
        self.insert_after(id, SlotId::ROOT);
    }

    /// Moves `id` to the back; a no-op if it is already there.
    pub fn move_to_back(&mut self, id: SlotId) {
        debug_assert!(self.contains(id));
        if self.nodes[0].prev == id.0 {
            return;
        }
        self.unlink(id);
        let tail = SlotId(self.nodes[0].prev);
        self.insert_after(id, tail);
    }

    /// Returns slot ids from front to back.
    pub fn iter_ids(&self) -> ArenaListIdIter<'_, T> {
        ArenaListIdIter {
            list: self,
            current: self.nodes[0].next,
        }
    }

    /// Returns `(SlotId, &T)` pairs from front to back.
    pub fn iter(&self) -> impl Iterator<Item = (SlotId, &T)> {
        self.iter_ids().map(move |id| (id, self.get(id)))
    }

    // Splices `id` in directly after `at`.
    fn insert_after(&mut self, id: SlotId, at: SlotId) {
        let next = self.nodes[at.index()].next;
        {
            let node = &mut self.nodes[id.index()];
            node.prev = at.0;
            node.next = next;
        }
        self.nodes[at.index()].next = id.0;
        self.nodes[next as usize].prev = id.0;
    }

    fn unlink(&mut self, id: SlotId) {
        let (prev, next) = {
            let node = &self.nodes[id.index()];
            (node.prev, node.next)
        };
        self.nodes[prev as usize].next = next;
        self.nodes[next as usize].prev = prev;
        let node = &mut self.nodes[id.index()];
        node.prev = id.0;
        node.next = id.0;
    }

    /// Walks the ring in both directions and checks that every slot appears
    /// exactly once with consistent back-links.
    pub(crate) fn validate_ring(&self) -> Result<(), String> {
        let total = self.nodes.len();
        let mut seen = vec![false; total];
        let mut current = 0u32;
        for step in 0..total {
            let node = &self.nodes[current as usize];
            if seen[current as usize] {
                return Err(format!("slot {} visited twice at step {}", current, step));
            }
            seen[current as usize] = true;
            let next = node.next as usize;
            if next >= total {
                return Err(format!("slot {} links to out-of-range {}", current, next));
            }
            if self.nodes[next].prev != current {
                return Err(format!(
                    "slot {} -> {} has back-link {}",
                    current, next, self.nodes[next].prev
                ));
            }
            current = node.next;
        }
        if current != 0 {
            return Err("ring does not close at the root".to_string());
        }
        Ok(())
    }

    #[cfg(any(test, debug_assertions))]
    pub fn debug_validate_invariants(&self) {
        if let Err(msg) = self.validate_ring() {
            panic!("arena list invariant violated: {}", msg);
        }
    }
}

/// Iterator over slot ids from front to back.
pub struct ArenaListIdIter<'a, T> {
    list: &'a ArenaList<T>,
    current: u32,
}

impl<'a, T> Iterator for ArenaListIdIter<'a, T> {
    type Item = SlotId;

    fn next(&mut self) -> Option<Self::Item> {
        if self.current == 0 {
            return None;
        }
        let id = SlotId(self.current);
        self.current = self.list.nodes[id.index()].next;
        Some(id)
    }
}
