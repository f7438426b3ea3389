//! Managed task launcher.
//!
//! Launching allocates a fresh [`TaskId`], spawns a thread of execution, and
//! binds the id to that thread before the user function runs. The binding is
//! removed — and the id released — when the function returns or unwinds,
//! before the thread terminates.

use std::io;
use std::sync::Arc;
use std::thread;

use crate::runtime::registry::TaskBinding;
use crate::sync::TaskRwLock;
use crate::types::TaskId;

/// Launches `f` as a managed task and returns its id immediately.
///
/// Inside `f`, and in anything `f` calls synchronously on the same thread,
/// [`current_task_id`](super::current_task_id) returns the id this call
/// returned. A failure inside `f` is the concern of whatever framework
/// invoked the launch; the pool routes descriptor errors to its error queue,
/// direct callers are responsible themselves.
///
/// # Panics
///
/// Panics if the operating system refuses to spawn a thread. Frameworks that
/// need to tolerate spawn failure use the fallible internal entry point.
pub fn launch<F>(f: F) -> TaskId
where
    F: FnOnce() + Send + 'static,
{
    try_launch_named(None, f).expect("failed to spawn task thread")
}

/// Launches `f` as a managed task, passing it a captured argument value.
///
/// Equivalent to [`launch`] with a closure that moves `args` into `f`; see
/// [`launch`] for semantics.
pub fn launch_with_args<F, A>(f: F, args: A) -> TaskId
where
    F: FnOnce(A) + Send + 'static,
    A: Send + 'static,
{
    launch(move || f(args))
}

/// Creates a new task-keyed reentrant reader/writer lock, ready to share
/// between managed tasks.
#[must_use]
pub fn new_rwlock() -> Arc<TaskRwLock> {
    Arc::new(TaskRwLock::new())
}

/// Fallible launch with an optional thread name.
///
/// The id is allocated before the spawn so the caller learns it on success;
/// on failure nothing was bound and the allocated id is simply never live.
pub(crate) fn try_launch_named<F>(name: Option<String>, f: F) -> io::Result<TaskId>
where
    F: FnOnce() + Send + 'static,
{
    let id = TaskId::allocate();

    let mut builder = thread::Builder::new();
    if let Some(ref thread_name) = name {
        builder = builder.name(thread_name.clone());
    }

    builder.spawn(move || {
        let _binding = TaskBinding::install(id, name);
        f();
    })?;

    Ok(id)
}
