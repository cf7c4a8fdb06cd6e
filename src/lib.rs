//! An indexed mutable priority queue.
//!
//! `TaskQueue` is a scheduler-style priority queue. Callers identify work
//! items by an opaque, totally-ordered task ID and attach an integer priority
//! to each. Beyond the usual insert / find-min / delete-min, the queue can
//! re-prioritize an already-queued ID in O(log n) and answer containment in
//! O(log n), with no linear scans.
//!
//! Internally the queue is two structures kept mutually consistent: an AVL
//! tree keyed by ID that records where each ID currently sits in the heap
//! array, and an array-backed binary min-heap whose entries point back at
//! their tree nodes. Every heap move writes the new array position into the
//! owning tree node; every tree removal that relocates a key tells the heap
//! which entry to re-point.

pub mod avl;
pub mod error;
pub mod heap;
pub mod queue;

#[cfg(test)]
mod testing;

pub use crate::error::Error;
pub use crate::queue::TaskQueue;

// priority of a queued task; the heap orders ascending (smallest runs first)
pub type Priority = i32;

// position of an entry in the heap's dense array
pub type Slot = usize;

// index of a node in the tree's arena
pub type NodeId = u32;
