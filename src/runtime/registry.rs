//! Task registry: the live `TaskId → descriptor` map and the binding that
//! lets the executing thread discover its own id.
//!
//! The binding is installed by the launcher immediately before the user
//! function runs and removed — releasing the id — when the function returns
//! or unwinds, before the thread terminates. At any instant the registry's
//! key set is exactly the set of tasks whose user function has been entered
//! but not exited.

use std::cell::Cell;
use std::collections::HashMap;
use std::sync::OnceLock;
use std::time::Instant;

use parking_lot::Mutex;

use crate::types::TaskId;

thread_local! {
    /// Id of the managed task bound to this thread of execution, if any.
    static CURRENT_TASK: Cell<Option<TaskId>> = const { Cell::new(None) };
}

/// Descriptor for one live managed task.
#[derive(Debug, Clone)]
pub struct TaskDescriptor {
    name: Option<String>,
    launched_at: Instant,
}

impl TaskDescriptor {
    /// Returns the task's name, when one was assigned at launch.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Returns the instant the task entered its user function.
    #[must_use]
    pub fn launched_at(&self) -> Instant {
        self.launched_at
    }
}

fn live_tasks() -> &'static Mutex<HashMap<TaskId, TaskDescriptor>> {
    static LIVE: OnceLock<Mutex<HashMap<TaskId, TaskDescriptor>>> = OnceLock::new();
    LIVE.get_or_init(|| Mutex::new(HashMap::new()))
}

/// Returns the id of the managed task bound to the calling thread.
///
/// Returns `None` from any unmanaged context — a thread that was not started
/// through the launcher, or a launcher thread outside the user function's
/// extent.
#[must_use]
pub fn current_task_id() -> Option<TaskId> {
    CURRENT_TASK.with(Cell::get)
}

/// Returns the number of currently live managed tasks.
#[must_use]
pub fn live_task_count() -> usize {
    live_tasks().lock().len()
}

/// Returns true while `id` names a live managed task.
#[must_use]
pub fn is_live(id: TaskId) -> bool {
    live_tasks().lock().contains_key(&id)
}

/// Returns a snapshot of the descriptor for a live task.
#[must_use]
pub fn descriptor(id: TaskId) -> Option<TaskDescriptor> {
    live_tasks().lock().get(&id).cloned()
}

/// Binding of a task id to the current thread of execution.
///
/// Installing the binding registers the task as live; dropping it removes
/// the registry entry and clears the thread-local cell. The drop runs during
/// unwinding too, so a panicking user function still releases its id.
pub(crate) struct TaskBinding {
    id: TaskId,
}

impl TaskBinding {
    pub(crate) fn install(id: TaskId, name: Option<String>) -> Self {
        CURRENT_TASK.with(|current| current.set(Some(id)));
        live_tasks().lock().insert(
            id,
            TaskDescriptor {
                name,
                launched_at: Instant::now(),
            },
        );
        Self { id }
    }
}

impl Drop for TaskBinding {
    fn drop(&mut self) {
        live_tasks().lock().remove(&self.id);
        CURRENT_TASK.with(|current| current.set(None));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unmanaged_thread_has_no_task_id() {
        let handle = std::thread::spawn(current_task_id);
        assert_eq!(handle.join().expect("probe thread panicked"), None);
    }

    #[test]
    fn binding_registers_and_releases() {
        let id = TaskId::allocate();
        assert!(!is_live(id));

        {
            let _binding = TaskBinding::install(id, Some("probe".to_owned()));
            assert_eq!(current_task_id(), Some(id));
            assert!(is_live(id));
            let descriptor = descriptor(id).expect("descriptor for live task");
            assert_eq!(descriptor.name(), Some("probe"));
        }

        assert_eq!(current_task_id(), None);
        assert!(!is_live(id));
        assert!(descriptor(id).is_none());
    }

    #[test]
    fn binding_releases_during_unwind() {
        let id = TaskId::allocate();
        let result = std::panic::catch_unwind(|| {
            let _binding = TaskBinding::install(id, None);
            panic!("task body failed");
        });
        assert!(result.is_err());
        assert!(!is_live(id));
        assert_eq!(current_task_id(), None);
    }
}
