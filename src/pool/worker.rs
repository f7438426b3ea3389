//! Pool worker loop.
//!
//! Each worker runs as a managed task. Per iteration it checks the closed
//! flag, marks itself WAITING, blocks on the queue up to the idle-decay
//! period, and either retires (decay, close, queue failure) or marks itself
//! RUNNING and invokes the dequeued descriptor. Between the WAITING mark and
//! the dequeue the worker is observable as available; the monitor reads that
//! to decide growth.

use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use crate::queue::QueueError;
use crate::runtime::current_task_id;
use crate::types::TaskId;

use super::{ThreadPool, WorkerState};

/// Error wrapper for a panic caught inside a descriptor.
///
/// A panicking descriptor must not take its worker down with it, so the
/// payload is captured and routed to the error queue like any user error.
#[derive(Debug)]
pub struct PanicError {
    message: String,
}

impl PanicError {
    fn from_payload(payload: &(dyn Any + Send)) -> Self {
        let message = payload
            .downcast_ref::<&'static str>()
            .map(|s| (*s).to_owned())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "non-string panic payload".to_owned());
        Self { message }
    }

    /// Returns the captured panic message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl std::fmt::Display for PanicError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "descriptor panicked: {}", self.message)
    }
}

impl std::error::Error for PanicError {}

/// Removes the worker's `thread_state` entry when the loop exits, panics
/// included, so the tracked-worker set never outlives its workers.
struct WorkerExitGuard<'a> {
    pool: &'a ThreadPool,
    task_id: TaskId,
}

impl Drop for WorkerExitGuard<'_> {
    fn drop(&mut self) {
        self.pool.remove_worker_entry(self.task_id);
    }
}

pub(super) fn run(pool: &Arc<ThreadPool>) {
    let Some(task_id) = current_task_id() else {
        // Workers are always launched through the runtime; an unmanaged
        // entry would leave the launch-time count increment dangling.
        tracing::error!(pool = %pool.name(), "worker entered outside a managed task");
        pool.retire_worker();
        return;
    };

    let _exit_guard = WorkerExitGuard {
        pool: pool.as_ref(),
        task_id,
    };

    loop {
        if pool.is_closed() {
            pool.retire_worker();
            return;
        }

        pool.set_worker_state(task_id, WorkerState::Waiting);

        match pool.function_queue().dequeue(pool.idle_decay()) {
            Ok(descriptor) => {
                pool.set_worker_state(task_id, WorkerState::Running);
                match catch_unwind(AssertUnwindSafe(move || descriptor.invoke())) {
                    Ok(Ok(())) => {}
                    Ok(Err(error)) => pool.record_user_error(task_id, error),
                    Err(payload) => {
                        let error = PanicError::from_payload(payload.as_ref());
                        tracing::warn!(pool = %pool.name(), task = %task_id, %error, "descriptor panicked");
                        pool.record_user_error(task_id, Box::new(error));
                    }
                }
            }
            Err(QueueError::Empty) => {
                if pool.try_decay_worker() {
                    tracing::debug!(pool = %pool.name(), task = %task_id, "idle worker retiring");
                    return;
                }
            }
            Err(QueueError::Closed) => {
                tracing::debug!(pool = %pool.name(), task = %task_id, "worker exiting, queue closed");
                pool.retire_worker();
                return;
            }
            Err(error) => {
                tracing::warn!(pool = %pool.name(), task = %task_id, %error, "worker exiting on queue error");
                pool.retire_worker();
                return;
            }
        }
    }
}
