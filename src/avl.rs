//! The index side of the queue: an AVL tree keyed by task ID.
//!
//! The tree is used purely as an index. Each node records the heap slot
//! currently holding its key's entry, and hands out a stable `NodeId` handle
//! so the queue can rewrite that slot in O(1) after every heap move.
//!
//! Nodes live in an arena (`Vec<Option<Node>>` plus a free list) and link to
//! each other by index. Rotations relink indices and never move nodes, so a
//! handle stays valid for as long as its key is in the tree.

use crate::error::Error;
use crate::{NodeId, Slot};
use core::cmp::Ordering;
use log::trace;

/// Absent child / absent node.
const NIL: NodeId = u32::MAX;

const ALLOWED_IMBALANCE: i32 = 1;

struct Node<K> {
    key: K,
    slot: Slot,
    left: NodeId,
    right: NodeId,
    // height of the subtree rooted here; a leaf has height 0
    height: i32,
}

pub struct AvlTree<K> {
    arena: Vec<Option<Node<K>>>,
    free: Vec<NodeId>,
    root: NodeId,
    len: usize,
}

/// Result of [`AvlTree::remove`].
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct Removal {
    /// True if a key was actually removed.
    pub removed: bool,
    /// Set when the two-child case copied a surviving key into a different
    /// node: the heap entry at this slot must now reference this node.
    pub retarget: Option<(Slot, NodeId)>,
}

impl<K: Ord> AvlTree<K> {
    pub fn new() -> Self {
        Self {
            arena: Vec::new(),
            free: Vec::new(),
            root: NIL,
            len: 0,
        }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            arena: Vec::with_capacity(capacity),
            free: Vec::new(),
            root: NIL,
            len: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.root == NIL
    }

    pub fn clear(&mut self) {
        self.arena.clear();
        self.free.clear();
        self.root = NIL;
        self.len = 0;
    }

    /// Inserts `key` with an initial heap slot. Returns a handle to the new
    /// node, or `None` if the key was already present (duplicate inserts are
    /// no-ops). Rebalances along the path from the new leaf to the root.
    pub fn insert(&mut self, key: K, slot: Slot) -> Option<NodeId> {
        let mut created = None;
        let root = self.root;
        self.root = self.insert_at(root, key, slot, &mut created);
        if created.is_some() {
            self.len += 1;
        }
        created
    }

    pub fn contains(&self, key: &K) -> bool {
        self.find_node(key) != NIL
    }

    /// The heap slot recorded for `key`, or `None` if absent. O(log n).
    pub fn find_slot(&self, key: &K) -> Option<Slot> {
        let t = self.find_node(key);
        if t == NIL {
            None
        } else {
            Some(self.node(t).slot)
        }
    }

    /// The smallest key in the tree.
    pub fn find_min(&self) -> Result<&K, Error> {
        if self.root == NIL {
            return Err(Error::Underflow);
        }
        Ok(&self.node(self.min_node(self.root)).key)
    }

    /// The largest key in the tree.
    pub fn find_max(&self) -> Result<&K, Error> {
        if self.root == NIL {
            return Err(Error::Underflow);
        }
        let mut t = self.root;
        while self.node(t).right != NIL {
            t = self.node(t).right;
        }
        Ok(&self.node(t).key)
    }

    /// Key held by a live node. Panics on a dead handle.
    pub fn key(&self, id: NodeId) -> &K {
        &self.node(id).key
    }

    /// Heap slot recorded on a live node.
    pub fn slot(&self, id: NodeId) -> Slot {
        self.node(id).slot
    }

    /// Rewrites the heap slot recorded on a live node. The heap calls back
    /// into this (through the queue) after every entry move.
    pub fn set_slot(&mut self, id: NodeId, slot: Slot) {
        self.node_mut(id).slot = slot;
    }

    /// Height of the whole tree; -1 when empty.
    pub fn height(&self) -> i32 {
        self.height_of(self.root)
    }

    /// Number of edges between the root and `key`, or `None` if absent.
    pub fn depth(&self, key: &K) -> Option<usize> {
        let mut t = self.root;
        let mut depth = 0;
        while t != NIL {
            match key.cmp(&self.node(t).key) {
                Ordering::Less => t = self.node(t).left,
                Ordering::Greater => t = self.node(t).right,
                Ordering::Equal => return Some(depth),
            }
            depth += 1;
        }
        None
    }

    /// Iterates `(key, slot)` pairs in ascending key order.
    pub fn iter_inorder(&self) -> impl Iterator<Item = (&K, Slot)> + '_ {
        struct InOrder<'a, K> {
            tree: &'a AvlTree<K>,
            stack: Vec<NodeId>,
            next: NodeId,
        }
        impl<'a, K> Iterator for InOrder<'a, K> {
            type Item = (&'a K, Slot);
            fn next(&mut self) -> Option<Self::Item> {
                while self.next != NIL {
                    self.stack.push(self.next);
                    self.next = self.tree.node(self.next).left;
                }
                let t = self.stack.pop()?;
                let node = self.tree.node(t);
                self.next = node.right;
                Some((&node.key, node.slot))
            }
        }

        InOrder {
            tree: self,
            stack: Vec::new(),
            next: self.root,
        }
    }

    /// Walks the whole tree and asserts the BST, balance, and cached-height
    /// invariants. Meant for tests and diagnostics; O(n).
    pub fn check(&self) {
        let count = self.check_at(self.root);
        assert_eq!(count, self.len);
        let mut prev: Option<&K> = None;
        for (key, _) in self.iter_inorder() {
            if let Some(prev) = prev {
                assert!(prev < key);
            }
            prev = Some(key);
        }
    }

    fn check_at(&self, t: NodeId) -> usize {
        if t == NIL {
            return 0;
        }
        let node = self.node(t);
        let lh = self.height_of(node.left);
        let rh = self.height_of(node.right);
        assert!((lh - rh).abs() <= ALLOWED_IMBALANCE);
        assert_eq!(node.height, lh.max(rh) + 1);
        self.check_at(node.left) + self.check_at(node.right) + 1
    }

    fn find_node(&self, key: &K) -> NodeId {
        let mut t = self.root;
        while t != NIL {
            match key.cmp(&self.node(t).key) {
                Ordering::Less => t = self.node(t).left,
                Ordering::Greater => t = self.node(t).right,
                Ordering::Equal => return t,
            }
        }
        NIL
    }

    fn min_node(&self, mut t: NodeId) -> NodeId {
        while self.node(t).left != NIL {
            t = self.node(t).left;
        }
        t
    }

    fn insert_at(
        &mut self,
        t: NodeId,
        key: K,
        slot: Slot,
        created: &mut Option<NodeId>,
    ) -> NodeId {
        if t == NIL {
            let id = self.alloc(key, slot);
            *created = Some(id);
            return id;
        }
        match key.cmp(&self.node(t).key) {
            Ordering::Less => {
                let left = self.node(t).left;
                let new_left = self.insert_at(left, key, slot, created);
                self.node_mut(t).left = new_left;
            }
            Ordering::Greater => {
                let right = self.node(t).right;
                let new_right = self.insert_at(right, key, slot, created);
                self.node_mut(t).right = new_right;
            }
            // duplicate; drop the key
            Ordering::Equal => return t,
        }
        self.rebalance(t)
    }

    // Assumes the subtree at t is balanced or within one of being balanced.
    fn rebalance(&mut self, t: NodeId) -> NodeId {
        if t == NIL {
            return t;
        }
        let lh = self.height_of(self.node(t).left);
        let rh = self.height_of(self.node(t).right);
        let t = if lh - rh > ALLOWED_IMBALANCE {
            let left = self.node(t).left;
            if self.height_of(self.node(left).left) >= self.height_of(self.node(left).right) {
                self.rotate_with_left_child(t)
            } else {
                self.double_with_left_child(t)
            }
        } else if rh - lh > ALLOWED_IMBALANCE {
            let right = self.node(t).right;
            if self.height_of(self.node(right).right) >= self.height_of(self.node(right).left) {
                self.rotate_with_right_child(t)
            } else {
                self.double_with_right_child(t)
            }
        } else {
            t
        };
        self.update_height(t);
        t
    }

    /// Single rotation: the subtree leans left and its left child leans left
    /// (or is even). Returns the new subtree root.
    fn rotate_with_left_child(&mut self, k2: NodeId) -> NodeId {
        trace!("rotate left-child at node {}", k2);
        let k1 = self.node(k2).left;
        let k1_right = self.node(k1).right;
        self.node_mut(k2).left = k1_right;
        self.node_mut(k1).right = k2;
        self.update_height(k2);
        self.update_height(k1);
        k1
    }

    /// Mirror of `rotate_with_left_child`.
    fn rotate_with_right_child(&mut self, k1: NodeId) -> NodeId {
        trace!("rotate right-child at node {}", k1);
        let k2 = self.node(k1).right;
        let k2_left = self.node(k2).left;
        self.node_mut(k1).right = k2_left;
        self.node_mut(k2).left = k1;
        self.update_height(k1);
        self.update_height(k2);
        k2
    }

    /// Double rotation: the subtree leans left but its left child leans
    /// right. Rotate the child toward the lean first, then the subtree.
    fn double_with_left_child(&mut self, k3: NodeId) -> NodeId {
        let left = self.node(k3).left;
        let new_left = self.rotate_with_right_child(left);
        self.node_mut(k3).left = new_left;
        self.rotate_with_left_child(k3)
    }

    /// Mirror of `double_with_left_child`.
    fn double_with_right_child(&mut self, k1: NodeId) -> NodeId {
        let right = self.node(k1).right;
        let new_right = self.rotate_with_left_child(right);
        self.node_mut(k1).right = new_right;
        self.rotate_with_right_child(k1)
    }

    fn update_height(&mut self, t: NodeId) {
        if t == NIL {
            return;
        }
        let lh = self.height_of(self.node(t).left);
        let rh = self.height_of(self.node(t).right);
        self.node_mut(t).height = lh.max(rh) + 1;
    }

    fn alloc(&mut self, key: K, slot: Slot) -> NodeId {
        let node = Node {
            key,
            slot,
            left: NIL,
            right: NIL,
            height: 0,
        };
        if let Some(id) = self.free.pop() {
            self.arena[id as usize] = Some(node);
            id
        } else {
            self.arena.push(Some(node));
            (self.arena.len() - 1) as NodeId
        }
    }

    fn free_node(&mut self, id: NodeId) {
        self.arena[id as usize] = None;
        self.free.push(id);
    }
}

// Arena plumbing; none of it cares about key order, so types like the
// in-order iterator can reach the arena without an `Ord` bound.
impl<K> AvlTree<K> {
    fn height_of(&self, t: NodeId) -> i32 {
        if t == NIL {
            -1
        } else {
            self.node(t).height
        }
    }

    fn node(&self, id: NodeId) -> &Node<K> {
        self.arena[id as usize].as_ref().unwrap()
    }

    fn node_mut(&mut self, id: NodeId) -> &mut Node<K> {
        self.arena[id as usize].as_mut().unwrap()
    }
}

impl<K: Ord + Clone> AvlTree<K> {
    /// Removes `key` if present; a no-op otherwise. Rebalances along the
    /// path from the deletion point to the root.
    ///
    /// When the doomed node has two children, the smallest key of its right
    /// subtree is copied into it (key and slot both) and that successor node
    /// is removed instead. The heap entry for the copied key then references
    /// the wrong node, so the returned [`Removal`] carries the slot/node pair
    /// the caller must re-point. At most one such copy happens per removal:
    /// the successor has no left child, so its own removal is a splice.
    pub fn remove(&mut self, key: &K) -> Removal {
        let mut removal = Removal::default();
        let root = self.root;
        self.root = self.remove_at(root, key, &mut removal);
        if removal.removed {
            self.len -= 1;
        }
        removal
    }

    fn remove_at(&mut self, t: NodeId, key: &K, removal: &mut Removal) -> NodeId {
        if t == NIL {
            // not found; do nothing
            return NIL;
        }
        match key.cmp(&self.node(t).key) {
            Ordering::Less => {
                let left = self.node(t).left;
                let new_left = self.remove_at(left, key, removal);
                self.node_mut(t).left = new_left;
            }
            Ordering::Greater => {
                let right = self.node(t).right;
                let new_right = self.remove_at(right, key, removal);
                self.node_mut(t).right = new_right;
            }
            Ordering::Equal => {
                let left = self.node(t).left;
                let right = self.node(t).right;
                if left != NIL && right != NIL {
                    // Two children: copy the successor's key and slot here,
                    // then remove the successor from the right subtree.
                    let succ = self.min_node(right);
                    let succ_key = self.node(succ).key.clone();
                    let succ_slot = self.node(succ).slot;
                    {
                        let node = self.node_mut(t);
                        node.key = succ_key.clone();
                        node.slot = succ_slot;
                    }
                    trace!(
                        "two-child removal: heap slot {} re-points to node {}",
                        succ_slot,
                        t
                    );
                    removal.retarget = Some((succ_slot, t));
                    let new_right = self.remove_at(right, &succ_key, removal);
                    self.node_mut(t).right = new_right;
                } else {
                    let child = if left != NIL { left } else { right };
                    self.free_node(t);
                    removal.removed = true;
                    return self.rebalance(child);
                }
            }
        }
        self.rebalance(t)
    }
}

impl<K: Ord> Default for AvlTree<K> {
    fn default() -> Self {
        Self::new()
    }
}
