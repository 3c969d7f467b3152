//! Bounded single-producer/single-consumer stage queues.

use crate::pipeline::types::StageItem;
use crossbeam_channel::{Receiver, Sender, TrySendError, bounded};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Bounded channel carrying [`StageItem`]s between two pipeline stages.
///
/// Producers never block: when the bound is reached the incoming item is
/// dropped, a shared overflow counter increments, and `push` returns false.
/// Dropping a stale item is preferable to unbounded latency growth, and
/// overflow is an observable condition, never a fatal one.
pub struct StageQueue<T> {
    tx: Sender<StageItem<T>>,
    rx: Receiver<StageItem<T>>,
    overflows: Arc<AtomicU64>,
}

impl<T> StageQueue<T> {
    /// Creates a queue with the given bound and a private overflow counter.
    pub fn new(capacity: usize) -> Self {
        Self::with_overflow_counter(capacity, Arc::new(AtomicU64::new(0)))
    }

    /// Creates a queue whose overflow events increment a shared counter
    /// (typically the metrics recorder's).
    pub fn with_overflow_counter(capacity: usize, overflows: Arc<AtomicU64>) -> Self {
        let (tx, rx) = bounded(capacity);
        Self { tx, rx, overflows }
    }

    /// Enqueues an item without blocking.
    ///
    /// Returns false when the item was dropped (queue full or consumer gone).
    pub fn push(&self, item: StageItem<T>) -> bool {
        match self.tx.try_send(item) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                self.overflows.fetch_add(1, Ordering::Relaxed);
                false
            }
            Err(TrySendError::Disconnected(_)) => false,
        }
    }

    /// Dequeues the next item, waiting at most `timeout`.
    pub fn pop(&self, timeout: Duration) -> Option<StageItem<T>> {
        self.rx.recv_timeout(timeout).ok()
    }

    /// Number of items currently queued.
    pub fn len(&self) -> usize {
        self.rx.len()
    }

    /// Whether the queue is empty.
    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }

    /// The queue bound.
    pub fn capacity(&self) -> usize {
        self.tx.capacity().unwrap_or(0)
    }

    /// Total items dropped on overflow since creation of the counter.
    pub fn overflow_count(&self) -> u64 {
        self.overflows.load(Ordering::Relaxed)
    }
}
