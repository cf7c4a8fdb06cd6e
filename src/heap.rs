//! The scheduling side of the queue: an array-backed binary min-heap.
//!
//! Entries pair a priority with a back-reference to the tree node owning the
//! task ID. The heap does not own those nodes and never touches them
//! directly; instead, every mutation that moves entries takes an `on_move`
//! callback and reports each entry's new slot through it. The caller (the
//! queue) writes each reported slot into the owning tree node.
//!
//! Ordering is ascending priority. Ties are broken arbitrarily; there is no
//! secondary key, and the order of equal priorities must not be relied on.

use crate::{NodeId, Priority, Slot};
use core::fmt::{Debug, Formatter};
use log::trace;

fn left(parent: usize) -> usize {
    parent * 2 + 1
}
fn right(parent: usize) -> usize {
    parent * 2 + 2
}
fn parent(child: usize) -> usize {
    (child - 1) / 2
}

/// One heap entry.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Entry {
    pub priority: Priority,
    /// Back-reference to the tree node for this entry's task ID.
    pub node: NodeId,
}

pub struct IndexedHeap {
    entries: Vec<Entry>,
}

impl IndexedHeap {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Vec::with_capacity(capacity),
        }
    }

    /// Heapifies `entries` in place, sifting down from the last non-leaf
    /// slot to the root. O(n), unlike n pushes. `on_move` sees every entry
    /// the heapify relocates; entries that never move keep their input slot.
    pub fn build<F>(entries: Vec<Entry>, mut on_move: F) -> Self
    where
        F: FnMut(NodeId, Slot),
    {
        let mut heap = Self { entries };
        let len = heap.entries.len();
        for slot in (0..len / 2).rev() {
            heap.sift_down(slot, &mut on_move);
        }
        trace!("heapified {} entries", len);
        heap
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Appends a new entry and sifts it up; returns its final slot.
    /// `on_move` sees the initial append as well as every sift move.
    pub fn push<F>(&mut self, priority: Priority, node: NodeId, mut on_move: F) -> Slot
    where
        F: FnMut(NodeId, Slot),
    {
        let slot = self.entries.len();
        self.entries.push(Entry { priority, node });
        on_move(node, slot);
        self.sift_up(slot, &mut on_move)
    }

    /// The minimum entry, without removing it.
    pub fn peek_min(&self) -> Option<Entry> {
        self.entries.first().copied()
    }

    /// Removes and returns the minimum entry: swaps slot 0 with the last
    /// slot, shrinks by one, then sifts the new root down. The removed
    /// entry is not reported through `on_move`; its node is on the way out.
    pub fn pop_min<F>(&mut self, mut on_move: F) -> Option<Entry>
    where
        F: FnMut(NodeId, Slot),
    {
        if self.entries.is_empty() {
            return None;
        }
        let last = self.entries.len() - 1;
        self.entries.swap(0, last);
        let min = self.entries.pop();
        if !self.entries.is_empty() {
            on_move(self.entries[0].node, 0);
            self.sift_down(0, &mut on_move);
        }
        min
    }

    /// Restores heap order upward from `slot`, for an entry whose priority
    /// decreased. Returns the entry's final slot.
    pub fn sift_up<F>(&mut self, slot: Slot, mut on_move: F) -> Slot
    where
        F: FnMut(NodeId, Slot),
    {
        let mut i = slot;
        while i > 0 {
            let parent = parent(i);
            if self.entries[parent].priority <= self.entries[i].priority {
                break;
            }
            self.swap_entries(i, parent, &mut on_move);
            i = parent;
        }
        i
    }

    /// Restores heap order downward from `slot`, for an entry whose priority
    /// increased. Returns the entry's final slot.
    pub fn sift_down<F>(&mut self, slot: Slot, mut on_move: F) -> Slot
    where
        F: FnMut(NodeId, Slot),
    {
        let len = self.entries.len();
        let mut i = slot;
        loop {
            let left = left(i);
            if left >= len {
                break;
            }
            let mut smallest = i;
            if self.entries[left].priority < self.entries[smallest].priority {
                smallest = left;
            }
            let right = right(i);
            if right < len && self.entries[right].priority < self.entries[smallest].priority {
                smallest = right;
            }
            if smallest == i {
                break;
            }
            self.swap_entries(i, smallest, &mut on_move);
            i = smallest;
        }
        i
    }

    pub fn priority(&self, slot: Slot) -> Priority {
        self.entries[slot].priority
    }

    /// Overwrites one entry's priority in place. The caller is responsible
    /// for the follow-up sift.
    pub fn set_priority(&mut self, slot: Slot, priority: Priority) {
        self.entries[slot].priority = priority;
    }

    pub fn node(&self, slot: Slot) -> NodeId {
        self.entries[slot].node
    }

    /// Rewrites one entry's back-reference. Used when the tree's two-child
    /// removal copies a key into a different node.
    pub fn retarget(&mut self, slot: Slot, node: NodeId) {
        self.entries[slot].node = node;
    }

    pub fn iter(&self) -> impl Iterator<Item = Entry> + '_ {
        self.entries.iter().copied()
    }

    /// Asserts heap order over the whole array. Meant for tests; O(n).
    pub fn check(&self) {
        for i in 1..self.entries.len() {
            assert!(self.entries[parent(i)].priority <= self.entries[i].priority);
        }
    }

    fn swap_entries<F>(&mut self, a: Slot, b: Slot, on_move: &mut F)
    where
        F: FnMut(NodeId, Slot),
    {
        self.entries.swap(a, b);
        on_move(self.entries[a].node, a);
        on_move(self.entries[b].node, b);
    }
}

impl Default for IndexedHeap {
    fn default() -> Self {
        Self::new()
    }
}

impl Debug for IndexedHeap {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> core::fmt::Result {
        write!(fmt, "H: ")?;
        for entry in self.entries.iter() {
            write!(fmt, "{}@n{} ", entry.priority, entry.node)?;
        }
        Ok(())
    }
}
