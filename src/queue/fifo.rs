//! Condvar-backed FIFO function queue.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

use super::{FunctionQueue, QueueError, WorkDescriptor};

#[derive(Debug)]
struct Inner {
    items: VecDeque<WorkDescriptor>,
    /// `None` for an unbounded queue.
    capacity: Option<usize>,
    /// Bumped on every enqueue, dequeue, and close. `wait_for_state_change`
    /// returns as soon as the epoch it observed at entry has advanced, so a
    /// change that lands between two waits is never lost.
    epoch: u64,
    closed: bool,
}

/// FIFO queue of [`WorkDescriptor`]s with blocking dequeue and a
/// state-change signal.
///
/// Enqueue never blocks: a bounded queue at capacity reports
/// [`QueueError::Full`]. Dequeue blocks up to its timeout and reports
/// [`QueueError::Empty`] when nothing arrived — the idle signal pool
/// workers decay on. [`close`](Self::close) wakes every waiter; a closed and
/// drained queue reports [`QueueError::Closed`].
#[derive(Debug)]
pub struct FifoFunctionQueue {
    inner: Mutex<Inner>,
    /// Signalled on enqueue; dequeuers wait here.
    not_empty: Condvar,
    /// Signalled on every state change; `wait_for_state_change` waits here.
    state_changed: Condvar,
}

impl FifoFunctionQueue {
    /// Creates an unbounded queue.
    #[must_use]
    pub fn unbounded() -> Self {
        Self::with_capacity(None)
    }

    /// Creates a queue that rejects enqueues beyond `capacity` descriptors.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    #[must_use]
    pub fn bounded(capacity: usize) -> Self {
        assert!(capacity > 0, "bounded queue requires capacity of at least 1");
        Self::with_capacity(Some(capacity))
    }

    fn with_capacity(capacity: Option<usize>) -> Self {
        Self {
            inner: Mutex::new(Inner {
                items: VecDeque::new(),
                capacity,
                epoch: 0,
                closed: false,
            }),
            not_empty: Condvar::new(),
            state_changed: Condvar::new(),
        }
    }

    /// Returns the number of descriptors currently queued.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.lock().items.len()
    }

    /// Returns true when the queue holds no descriptors.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.lock().items.is_empty()
    }

    /// Closes the queue and wakes every waiter.
    ///
    /// Subsequent enqueues fail with [`QueueError::Closed`]; dequeues drain
    /// the remaining descriptors and then fail the same way.
    pub fn close(&self) {
        let mut inner = self.inner.lock();
        if inner.closed {
            return;
        }
        inner.closed = true;
        inner.epoch += 1;
        self.not_empty.notify_all();
        self.state_changed.notify_all();
    }

    /// Returns true once the queue has been closed.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.inner.lock().closed
    }
}

impl FunctionQueue for FifoFunctionQueue {
    fn enqueue(&self, descriptor: WorkDescriptor) -> Result<(), QueueError> {
        let mut inner = self.inner.lock();
        if inner.closed {
            return Err(QueueError::Closed);
        }
        if let Some(capacity) = inner.capacity {
            if inner.items.len() >= capacity {
                return Err(QueueError::Full);
            }
        }
        inner.items.push_back(descriptor);
        inner.epoch += 1;
        self.not_empty.notify_one();
        self.state_changed.notify_all();
        Ok(())
    }

    fn dequeue(&self, timeout: Duration) -> Result<WorkDescriptor, QueueError> {
        let deadline = Instant::now() + timeout;
        let mut inner = self.inner.lock();
        loop {
            if let Some(descriptor) = inner.items.pop_front() {
                inner.epoch += 1;
                self.state_changed.notify_all();
                return Ok(descriptor);
            }
            if inner.closed {
                return Err(QueueError::Closed);
            }
            if self.not_empty.wait_until(&mut inner, deadline).timed_out() {
                // One last look: an enqueue may have raced the timeout.
                return match inner.items.pop_front() {
                    Some(descriptor) => {
                        inner.epoch += 1;
                        self.state_changed.notify_all();
                        Ok(descriptor)
                    }
                    None if inner.closed => Err(QueueError::Closed),
                    None => Err(QueueError::Empty),
                };
            }
        }
    }

    fn is_empty(&self) -> bool {
        self.inner.lock().items.is_empty()
    }

    fn wait_for_state_change(&self, timeout: Duration) {
        let mut inner = self.inner.lock();
        let seen = inner.epoch;
        let _ = self
            .state_changed
            .wait_while_for(&mut inner, |inner| inner.epoch == seen, timeout);
    }
}
