use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use bytes::Bytes;

/// Thread-safe FIFO of serialized records awaiting delivery.
///
/// Clones share the same underlying queue, so producers and the dispatcher
/// each hold their own handle instead of reaching for global state. Uses
/// `std::sync::Mutex` (not tokio) because the lock is never held across
/// `.await`; every operation is a short deque edit.
#[derive(Clone, Default)]
pub struct RecordQueue {
    inner: Arc<Mutex<VecDeque<Bytes>>>,
}

impl RecordQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append records at the tail, preserving their relative order.
    /// An empty input is a no-op.
    pub fn enqueue<I>(&self, records: I)
    where
        I: IntoIterator<Item = Bytes>,
    {
        self.lock().extend(records);
    }

    pub fn enqueue_one(&self, record: Bytes) {
        self.enqueue([record]);
    }

    /// Remove and return the oldest record, or `None` if the queue is empty.
    /// Never blocks.
    pub fn dequeue(&self) -> Option<Bytes> {
        self.lock().pop_front()
    }

    /// The oldest record without removing it.
    pub fn peek(&self) -> Option<Bytes> {
        self.lock().front().cloned()
    }

    /// Number of records currently queued. Advisory: no atomicity with a
    /// subsequent `dequeue` under concurrent mutation.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// No operation here leaves the deque mid-mutation on panic, so a
    /// poisoned lock still guards coherent data and is safe to reuse.
    fn lock(&self) -> MutexGuard<'_, VecDeque<Bytes>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
