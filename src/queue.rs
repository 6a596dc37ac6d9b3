//! Outbound work queue.
//!
//! An unbounded priority queue feeding the worker loop. `push` never blocks
//! and is safe from any task or thread; the worker awaits items with a
//! bounded timeout so it stays responsive to shutdown. Items with equal
//! priority dequeue in insertion order via a monotone sequence counter.

use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::sync::Mutex;
use std::time::Duration;

use tokio::sync::Notify;
use tokio::time::Instant;

use crate::types::{RawEvent, Severity};

/// Priority used for everything this channel enqueues. Lower values dequeue
/// first; 0 and 1 are reserved for a future, more urgent lane.
pub const CHANNEL_PRIORITY: u8 = 2;

/// Payload of one unit of outbound work.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkKind {
    /// Critical live event: escalated as a voice call to every contact
    Event(RawEvent),
    /// Cross-channel notification: relayed as SMS to every contact
    Notify {
        source: String,
        message: String,
        severity: Severity,
    },
    /// Property change: accepted but a no-op for this channel
    Change {
        element: String,
        label: String,
        property: String,
        value: String,
    },
}

/// One queued unit of outbound work.
#[derive(Debug, Clone)]
pub struct WorkItem {
    pub priority: u8,
    seq: u64,
    pub kind: WorkKind,
}

impl WorkItem {
    pub fn into_kind(self) -> WorkKind {
        self.kind
    }
}

// Total order over (priority, seq); the payload does not participate.
impl PartialEq for WorkItem {
    fn eq(&self, other: &Self) -> bool {
        self.priority == other.priority && self.seq == other.seq
    }
}

impl Eq for WorkItem {}

impl PartialOrd for WorkItem {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for WorkItem {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.priority, self.seq).cmp(&(other.priority, other.seq))
    }
}

/// Thread-safe, unbounded priority queue.
#[derive(Debug, Default)]
pub struct WorkQueue {
    heap: Mutex<BinaryHeap<Reverse<WorkItem>>>,
    seq: AtomicU64,
    notify: Notify,
}

impl WorkQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enqueue a work item. Never blocks the caller.
    pub fn push(&self, priority: u8, kind: WorkKind) {
        let seq = self.seq.fetch_add(1, AtomicOrdering::Relaxed);
        let item = WorkItem {
            priority,
            seq,
            kind,
        };

        let mut heap = self.heap.lock().unwrap_or_else(|e| e.into_inner());
        heap.push(Reverse(item));
        drop(heap);

        self.notify.notify_one();
    }

    /// Dequeue the highest-priority item without waiting.
    pub fn try_pop(&self) -> Option<WorkItem> {
        let mut heap = self.heap.lock().unwrap_or_else(|e| e.into_inner());
        heap.pop().map(|Reverse(item)| item)
    }

    /// Dequeue the highest-priority item, waiting up to `wait` for one to
    /// arrive. Returns `None` on timeout.
    pub async fn pop_timeout(&self, wait: Duration) -> Option<WorkItem> {
        let deadline = Instant::now() + wait;

        loop {
            if let Some(item) = self.try_pop() {
                return Some(item);
            }

            let now = Instant::now();
            if now >= deadline {
                return None;
            }

            if tokio::time::timeout(deadline - now, self.notify.notified())
                .await
                .is_err()
            {
                return None;
            }
        }
    }

    pub fn len(&self) -> usize {
        self.heap.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
