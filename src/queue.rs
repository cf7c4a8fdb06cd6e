//! The priority queue itself: one AVL index tree plus one indexed heap,
//! kept mutually consistent.
//!
//! This is the only place allowed to mutate the heap and the tree in the
//! same logical operation. Every operation resolves an ID to a heap slot
//! (or creates one) through the tree, performs the heap work, and feeds the
//! heap's move reports back into the tree — so that at every return,
//! `tree.find_slot(id)` names exactly the array slot holding `id`'s entry.

use crate::avl::AvlTree;
use crate::error::Error;
use crate::heap::{Entry, IndexedHeap};
use crate::Priority;
use core::fmt::{Debug, Formatter};
use log::debug;

pub struct TaskQueue<K> {
    tree: AvlTree<K>,
    heap: IndexedHeap,
}

impl<K: Ord + Clone> TaskQueue<K> {
    pub fn new() -> Self {
        Self {
            tree: AvlTree::new(),
            heap: IndexedHeap::new(),
        }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            tree: AvlTree::with_capacity(capacity),
            heap: IndexedHeap::with_capacity(capacity),
        }
    }

    /// Builds a queue from parallel sequences: `priorities[i]` is the
    /// priority of `ids[i]`. Runs the O(n) bulk heapify rather than n
    /// inserts, and records each ID's post-heapify slot in the tree.
    ///
    /// Duplicate IDs follow the same rule as [`TaskQueue::insert`]: the
    /// first occurrence wins and later ones are skipped.
    ///
    /// Panics if the sequences differ in length.
    pub fn from_tasks(ids: Vec<K>, priorities: Vec<Priority>) -> Self {
        assert_eq!(ids.len(), priorities.len());
        let mut tree = AvlTree::with_capacity(ids.len());
        let mut entries = Vec::with_capacity(ids.len());
        for (id, priority) in ids.into_iter().zip(priorities) {
            let slot = entries.len();
            if let Some(node) = tree.insert(id, slot) {
                entries.push(Entry { priority, node });
            }
        }
        let tree_slots = &mut tree;
        let heap = IndexedHeap::build(entries, |node, slot| tree_slots.set_slot(node, slot));
        debug!("built queue of {} tasks", heap.len());
        Self { tree, heap }
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// O(log n) containment check.
    pub fn contains(&self, id: &K) -> bool {
        self.tree.contains(id)
    }

    /// The current priority of `id`, or `None` if absent. O(log n).
    pub fn priority_of(&self, id: &K) -> Option<Priority> {
        self.tree.find_slot(id).map(|slot| self.heap.priority(slot))
    }

    /// Inserts `id` with `priority`. Returns false (and changes nothing) if
    /// `id` is already queued; use [`TaskQueue::update_priority`] for update
    /// semantics.
    pub fn insert(&mut self, id: K, priority: Priority) -> bool {
        // provisional slot: where the heap will append
        let node = match self.tree.insert(id, self.heap.len()) {
            Some(node) => node,
            None => return false,
        };
        let tree = &mut self.tree;
        self.heap.push(priority, node, |n, s| tree.set_slot(n, s));
        true
    }

    /// The ID with the minimum priority, without removing it.
    pub fn find_min(&self) -> Result<&K, Error> {
        let entry = self.heap.peek_min().ok_or(Error::Underflow)?;
        Ok(self.tree.key(entry.node))
    }

    /// Removes and returns the ID with the minimum priority.
    pub fn delete_min(&mut self) -> Result<K, Error> {
        let tree = &mut self.tree;
        let entry = self
            .heap
            .pop_min(|n, s| tree.set_slot(n, s))
            .ok_or(Error::Underflow)?;
        let id = self.tree.key(entry.node).clone();
        let removal = self.tree.remove(&id);
        debug_assert!(removal.removed);
        if let Some((slot, node)) = removal.retarget {
            self.heap.retarget(slot, node);
        }
        debug!("delete_min: priority {}, {} left", entry.priority, self.heap.len());
        Ok(id)
    }

    /// Re-prioritizes `id` in O(log n): looks up its slot through the tree,
    /// overwrites the priority in place, and sifts in whichever direction
    /// the change calls for. Inserts `id` if it is not queued yet.
    pub fn update_priority(&mut self, id: K, priority: Priority) {
        let slot = match self.tree.find_slot(&id) {
            Some(slot) => slot,
            None => {
                self.insert(id, priority);
                return;
            }
        };
        let old = self.heap.priority(slot);
        self.heap.set_priority(slot, priority);
        let tree = &mut self.tree;
        if priority > old {
            self.heap.sift_down(slot, |n, s| tree.set_slot(n, s));
        } else if priority < old {
            self.heap.sift_up(slot, |n, s| tree.set_slot(n, s));
        }
    }

    /// Drops every queued task. Both structures empty out together; no
    /// cross-reference survives.
    pub fn clear(&mut self) {
        self.tree.clear();
        self.heap.clear();
    }

    /// Asserts every invariant the queue maintains: AVL balance, BST order,
    /// heap order, and the cross-structure slot agreement. Meant for tests
    /// and diagnostics; O(n log n).
    pub fn check(&self) {
        self.tree.check();
        self.heap.check();
        assert_eq!(self.tree.len(), self.heap.len());
        for (slot, entry) in self.heap.iter().enumerate() {
            assert_eq!(self.tree.slot(entry.node), slot);
            assert_eq!(self.tree.find_slot(self.tree.key(entry.node)), Some(slot));
        }
    }
}

impl<K: Ord + Clone> Default for TaskQueue<K> {
    fn default() -> Self {
        Self::new()
    }
}

/// Diagnostic dump: the heap array with each entry's tree-recorded slot,
/// then the tree in sorted order. Reads only the query surface.
impl<K: Ord + Debug> Debug for TaskQueue<K> {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> core::fmt::Result {
        writeln!(fmt, "heap -> tree:")?;
        for (slot, entry) in self.heap.iter().enumerate() {
            writeln!(
                fmt,
                "  [{}] priority {} -> tree slot {} id {:?}",
                slot,
                entry.priority,
                self.tree.slot(entry.node),
                self.tree.key(entry.node)
            )?;
        }
        writeln!(fmt, "tree in-order:")?;
        for (key, slot) in self.tree.iter_inorder() {
            writeln!(fmt, "  {:?} @ slot {}", key, slot)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{demo_queue, init_test};

    #[test]
    fn min_extraction_order() {
        init_test();
        // priorities [10..1]; priority j belongs to ID 111*j
        let mut q = demo_queue(10);
        q.check();
        let mut popped = Vec::new();
        while let Ok(id) = q.delete_min() {
            popped.push(id);
            q.check();
        }
        assert_eq!(popped, (1..=10).map(|j| j * 111).collect::<Vec<_>>());
        assert!(q.is_empty());
    }

    #[test]
    fn bulk_build_matches_incremental_inserts() {
        init_test();
        let mut bulk = demo_queue(30);
        let mut incremental = TaskQueue::new();
        for j in (1..=30).rev() {
            assert!(incremental.insert(j * 111, j));
        }
        bulk.check();
        incremental.check();
        for _ in 0..30 {
            assert_eq!(bulk.delete_min(), incremental.delete_min());
        }
    }

    #[test]
    fn insert_rejects_duplicates() {
        let mut q = TaskQueue::new();
        assert!(q.insert(666, 5));
        assert!(!q.insert(666, 1));
        assert_eq!(q.len(), 1);
        assert_eq!(q.priority_of(&666), Some(5));
    }

    #[test]
    fn bulk_build_skips_duplicate_ids() {
        init_test();
        let q = TaskQueue::from_tasks(vec![1, 2, 1, 3], vec![40, 30, 20, 10]);
        q.check();
        assert_eq!(q.len(), 3);
        // the first occurrence of ID 1 wins
        assert_eq!(q.priority_of(&1), Some(40));
    }

    #[test]
    fn find_min_does_not_mutate() {
        let q = demo_queue(10);
        assert_eq!(q.find_min(), Ok(&111));
        assert_eq!(q.find_min(), Ok(&111));
        assert_eq!(q.len(), 10);
    }

    #[test]
    fn update_priority_moves_id_both_ways() {
        init_test();
        // the PQdemo scenario: IDs 111..1110, priorities 10..1
        let mut q = demo_queue(10);

        // raising 666 above everything must not change the minimum
        q.update_priority(666, 11);
        q.check();
        assert_eq!(q.find_min(), Ok(&111));
        assert_eq!(q.priority_of(&666), Some(11));

        // lowering it back slots it among the others per its new priority
        q.update_priority(666, 6);
        q.check();
        let mut popped = Vec::new();
        while let Ok(id) = q.delete_min() {
            popped.push(id);
            q.check();
        }
        assert_eq!(
            popped,
            vec![111, 222, 333, 444, 555, 666, 777, 888, 999, 1110]
        );
    }

    #[test]
    fn update_priority_of_absent_id_inserts() {
        let mut q = demo_queue(10);
        assert!(!q.contains(&132));
        q.update_priority(132, 12);
        assert!(q.contains(&132));
        assert_eq!(q.priority_of(&132), Some(12));
        assert_eq!(q.len(), 11);
        q.check();
    }

    #[test]
    fn update_priority_to_same_value_changes_nothing() {
        let mut q = demo_queue(10);
        q.update_priority(555, 5);
        q.check();
        assert_eq!(q.priority_of(&555), Some(5));
        assert_eq!(q.find_min(), Ok(&111));
    }

    #[test]
    fn update_can_change_the_minimum() {
        let mut q = demo_queue(10);
        q.update_priority(1110, 0);
        q.check();
        assert_eq!(q.find_min(), Ok(&1110));
        assert_eq!(q.delete_min(), Ok(1110));
        assert_eq!(q.find_min(), Ok(&111));
    }

    #[test]
    fn underflow_on_empty() {
        let mut q: TaskQueue<i32> = TaskQueue::new();
        assert_eq!(q.find_min(), Err(Error::Underflow));
        assert_eq!(q.delete_min(), Err(Error::Underflow));
        assert!(q.is_empty());
        assert_eq!(q.len(), 0);
    }

    #[test]
    fn clear_then_reuse() {
        init_test();
        let mut q = demo_queue(1000);
        q.clear();
        assert!(q.is_empty());
        assert_eq!(q.len(), 0);
        assert_eq!(q.find_min(), Err(Error::Underflow));
        // behaves like a fresh queue afterward
        assert!(q.insert(42, 1));
        assert_eq!(q.find_min(), Ok(&42));
        q.check();
    }

    #[test]
    fn delete_min_through_two_child_removal() {
        init_test();
        // Force the successor-copy path: the minimum-priority ID sits at an
        // interior tree node with two children. ID 40 gets the smallest
        // priority; in the tree it is the root of {20, 40, 60, ...}.
        let mut q = TaskQueue::new();
        for (id, p) in [(40, 0), (20, 5), (60, 6), (10, 7), (30, 8), (50, 9), (70, 10)] {
            q.insert(id, p);
        }
        q.check();
        assert_eq!(q.delete_min(), Ok(40));
        q.check();
        assert!(!q.contains(&40));
        // every survivor is still reachable at its recorded slot
        for id in [10, 20, 30, 50, 60, 70] {
            assert!(q.contains(&id));
        }
        assert_eq!(q.delete_min(), Ok(20));
        q.check();
    }

    #[test]
    fn debug_dump_lists_heap_and_tree() {
        let q = demo_queue(3);
        let dump = format!("{:?}", q);
        assert!(dump.contains("heap -> tree:"));
        assert!(dump.contains("tree in-order:"));
        assert!(dump.contains("111"));
    }

    #[test]
    fn randomized_interleaving_keeps_invariants() {
        init_test();
        let mut rand = fastrand::Rng::with_seed(1);
        for _ in 0..20 {
            let mut q = TaskQueue::new();
            let mut model = std::collections::BTreeMap::new();
            for _ in 0..400 {
                match rand.u32(0..4) {
                    0 => {
                        let id = rand.i32(0..60);
                        let p = rand.i32(0..50);
                        let inserted = q.insert(id, p);
                        assert_eq!(inserted, !model.contains_key(&id));
                        model.entry(id).or_insert(p);
                    }
                    1 => {
                        let id = rand.i32(0..60);
                        let p = rand.i32(0..50);
                        q.update_priority(id, p);
                        model.insert(id, p);
                    }
                    2 => {
                        let id = rand.i32(0..60);
                        assert_eq!(q.contains(&id), model.contains_key(&id));
                        assert_eq!(q.priority_of(&id), model.get(&id).copied());
                    }
                    _ => match q.delete_min() {
                        Ok(id) => {
                            // ties are broken arbitrarily, so compare
                            // priorities rather than the exact ID
                            let min = *model.values().min().unwrap();
                            assert_eq!(model.remove(&id), Some(min));
                        }
                        Err(Error::Underflow) => assert!(model.is_empty()),
                    },
                }
                q.check();
                assert_eq!(q.len(), model.len());
            }
        }
    }

    #[test]
    fn randomized_bulk_builds() {
        init_test();
        let mut rand = fastrand::Rng::with_seed(7);
        for _ in 0..50 {
            let n = rand.usize(0..80);
            let ids: Vec<i32> = (0..n as i32).collect();
            let mut shuffled = ids.clone();
            rand.shuffle(&mut shuffled);
            let priorities: Vec<i32> = (0..n).map(|_| rand.i32(0..40)).collect();
            let mut model: std::collections::HashMap<i32, i32> = shuffled
                .iter()
                .copied()
                .zip(priorities.iter().copied())
                .collect();
            let mut q = TaskQueue::from_tasks(shuffled, priorities.clone());
            q.check();
            let mut sorted = priorities;
            sorted.sort_unstable();
            // extraction follows ascending priority; ties may pop either ID
            for &expected in sorted.iter() {
                let id = q.delete_min().unwrap();
                assert!(!q.contains(&id));
                assert_eq!(model.remove(&id), Some(expected));
                q.check();
            }
            assert!(q.is_empty());
        }
    }
}
