//! Identifier types for managed tasks.

use std::num::NonZeroU64;
use std::sync::atomic::{AtomicU64, Ordering};

/// Process-wide monotonic source of task identifiers.
///
/// Starts at 1 so that zero can never name a task; an unmanaged caller is
/// represented by the absence of an id, not by a sentinel value.
static NEXT_TASK_ID: AtomicU64 = AtomicU64::new(1);

/// Identifier of a managed task.
///
/// Ids are process-unique non-zero integers drawn from a monotonic counter
/// when the task is launched. An id is stable for the task's entire lifetime,
/// is never reused while the task is live, and is released when the task's
/// user function exits.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(NonZeroU64);

impl TaskId {
    /// Allocates the next id from the process-wide counter.
    pub(crate) fn allocate() -> Self {
        let raw = NEXT_TASK_ID.fetch_add(1, Ordering::Relaxed);
        Self(NonZeroU64::new(raw).expect("task id counter wrapped"))
    }

    /// Returns the numeric value of this id.
    #[must_use]
    pub fn as_u64(&self) -> u64 {
        self.0.get()
    }

    /// Creates a task id with a fixed value, for tests.
    ///
    /// # Panics
    ///
    /// Panics if `raw` is zero.
    #[must_use]
    pub fn new_for_test(raw: u64) -> Self {
        Self(NonZeroU64::new(raw).expect("test task id must be non-zero"))
    }
}

impl std::fmt::Debug for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "TaskId({})", self.0)
    }
}

impl std::fmt::Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "task-{}", self.0)
    }
}
