//! # Ordered holding area for pending requests.
//!
//! [`PriorityQueue`] orders entries by priority class, then by submission
//! order within a class (a monotonic sequence number breaks ties). `push`
//! always succeeds; `pop` on an empty queue returns `None`, which is normal
//! control flow, not an error.
//!
//! ## Rules
//! - Pop-once semantics: an entry leaves the queue exactly once, so the
//!   dispatch loop can never double-dispatch a request.
//! - The queue holds ids only; payloads and status live in the dispatcher's
//!   request table. Entries whose request was cancelled while pending are
//!   skipped by the dispatcher after popping (lazy removal).
//! - Internally synchronized; `push`/`pop` may race freely.

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::sync::Mutex;

use crate::queue::Priority;
use crate::requests::RequestId;

/// Heap entry: priority class first, then FIFO within the class.
#[derive(Debug, PartialEq, Eq)]
struct Entry {
    priority: Priority,
    seq: u64,
    id: RequestId,
}

impl Ord for Entry {
    fn cmp(&self, other: &Self) -> Ordering {
        // BinaryHeap is a max-heap: "greater" means dispatched first.
        // Lower rank wins; within a rank, lower seq (earlier submission) wins.
        other
            .priority
            .rank()
            .cmp(&self.priority.rank())
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for Entry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Priority-ordered queue of request ids.
pub struct PriorityQueue {
    heap: Mutex<BinaryHeap<Entry>>,
    seq: AtomicU64,
}

impl PriorityQueue {
    /// Creates an empty queue.
    pub fn new() -> Self {
        Self {
            heap: Mutex::new(BinaryHeap::new()),
            seq: AtomicU64::new(0),
        }
    }

    /// Inserts a request. Always succeeds.
    pub fn push(&self, id: RequestId, priority: Priority) {
        let seq = self.seq.fetch_add(1, AtomicOrdering::Relaxed);
        let mut heap = self.heap.lock().unwrap_or_else(|e| e.into_inner());
        heap.push(Entry { priority, seq, id });
    }

    /// Removes and returns the head of the queue, or `None` when empty.
    pub fn pop(&self) -> Option<RequestId> {
        let mut heap = self.heap.lock().unwrap_or_else(|e| e.into_inner());
        heap.pop().map(|e| e.id)
    }

    /// Number of queued entries.
    pub fn len(&self) -> usize {
        self.heap.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// Returns true when no entries are queued.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for PriorityQueue {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id() -> RequestId {
        RequestId::next()
    }

    #[test]
    fn test_priority_classes_dispatch_in_rank_order() {
        let q = PriorityQueue::new();
        let low = id();
        let critical = id();
        let normal = id();

        q.push(low, Priority::Low);
        q.push(critical, Priority::Critical);
        q.push(normal, Priority::Normal);

        assert_eq!(q.pop(), Some(critical));
        assert_eq!(q.pop(), Some(normal));
        assert_eq!(q.pop(), Some(low));
        assert_eq!(q.pop(), None);
    }

    #[test]
    fn test_fifo_within_one_class() {
        let q = PriorityQueue::new();
        let ids: Vec<RequestId> = (0..5).map(|_| id()).collect();
        for i in &ids {
            q.push(*i, Priority::Normal);
        }
        for i in &ids {
            assert_eq!(q.pop(), Some(*i));
        }
    }

    #[test]
    fn test_interleaved_classes_keep_fifo_per_class() {
        let q = PriorityQueue::new();
        let h1 = id();
        let n1 = id();
        let h2 = id();
        let n2 = id();

        q.push(n1, Priority::Normal);
        q.push(h1, Priority::High);
        q.push(n2, Priority::Normal);
        q.push(h2, Priority::High);

        assert_eq!(q.pop(), Some(h1));
        assert_eq!(q.pop(), Some(h2));
        assert_eq!(q.pop(), Some(n1));
        assert_eq!(q.pop(), Some(n2));
    }

    #[test]
    fn test_empty_pop_is_not_an_error() {
        let q = PriorityQueue::new();
        assert!(q.is_empty());
        assert_eq!(q.pop(), None);
        assert_eq!(q.pop(), None);
    }

    #[test]
    fn test_len_tracks_membership() {
        let q = PriorityQueue::new();
        q.push(id(), Priority::Low);
        q.push(id(), Priority::High);
        assert_eq!(q.len(), 2);
        q.pop();
        assert_eq!(q.len(), 1);
    }
}
