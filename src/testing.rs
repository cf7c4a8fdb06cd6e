use crate::queue::TaskQueue;
use crate::Priority;

pub fn init_test() {
    drop(env_logger::try_init());
}

/// The standard fixture: `n` tasks with IDs `111*n, 111*(n-1), ..., 111` and
/// priorities `n, n-1, ..., 1`, bulk-loaded. Priority `j` belongs to ID
/// `111*j`, so min-extraction yields `111, 222, ...`.
pub fn demo_queue(n: i32) -> TaskQueue<i32> {
    let ids: Vec<i32> = (1..=n).rev().map(|j| j * 111).collect();
    let priorities: Vec<Priority> = (1..=n).rev().collect();
    TaskQueue::from_tasks(ids, priorities)
}
