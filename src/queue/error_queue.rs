//! Error queue: records user failures with the task that produced them.

use std::collections::VecDeque;

use parking_lot::Mutex;

use crate::types::TaskId;

use super::{ErrorQueue, UserError};

/// An error produced by a descriptor, tagged with the worker task that ran
/// it.
#[derive(Debug)]
pub struct ErrorInfo {
    task_id: TaskId,
    error: UserError,
}

impl ErrorInfo {
    /// Creates an entry tagging `error` with its producing task.
    #[must_use]
    pub fn new(task_id: TaskId, error: UserError) -> Self {
        Self { task_id, error }
    }

    /// Returns the id of the task that produced the error.
    #[must_use]
    pub fn task_id(&self) -> TaskId {
        self.task_id
    }

    /// Returns the recorded error.
    #[must_use]
    pub fn error(&self) -> &(dyn std::error::Error + Send + Sync) {
        self.error.as_ref()
    }

    /// Consumes the entry, returning the recorded error.
    #[must_use]
    pub fn into_error(self) -> UserError {
        self.error
    }
}

impl std::fmt::Display for ErrorInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.task_id, self.error)
    }
}

/// Capacity-bounded store of [`ErrorInfo`] entries.
///
/// At capacity the incoming entry is dropped with a warning; earlier
/// entries are kept so the first failures of an incident survive.
#[derive(Debug)]
pub struct BoundedErrorQueue {
    capacity: usize,
    entries: Mutex<VecDeque<ErrorInfo>>,
}

impl BoundedErrorQueue {
    /// Creates a queue holding at most `capacity` entries.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "error queue requires capacity of at least 1");
        Self {
            capacity,
            entries: Mutex::new(VecDeque::new()),
        }
    }

    /// Removes and returns the oldest recorded entry.
    #[must_use]
    pub fn pop(&self) -> Option<ErrorInfo> {
        self.entries.lock().pop_front()
    }

    /// Returns the number of recorded entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Returns true when no entries are recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

impl ErrorQueue for BoundedErrorQueue {
    fn enqueue(&self, info: ErrorInfo) {
        let mut entries = self.entries.lock();
        if entries.len() >= self.capacity {
            tracing::warn!(capacity = self.capacity, dropped = %info, "error queue full, dropping entry");
            return;
        }
        entries.push_back(info);
    }
}
