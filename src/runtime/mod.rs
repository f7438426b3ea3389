//! Managed task identity and launching.
//!
//! A *managed task* is a unit of work started through [`launch`] (or
//! [`launch_with_args`]). Each one runs on its own thread of execution with a
//! stable, process-unique [`TaskId`](crate::types::TaskId) bound to that
//! thread for the duration of the user function. Code running inside the task
//! — including anything it calls synchronously — can discover its own id with
//! [`current_task_id`]; code running anywhere else observes `None` and is an
//! *unmanaged caller*.
//!
//! The task-keyed lock ([`TaskRwLock`](crate::sync::TaskRwLock)) and the
//! worker pool ([`ThreadPool`](crate::pool::ThreadPool)) are both built on
//! this identity: the lock keys reentrancy by task id, and the pool tracks
//! per-worker state under the worker's id.

mod launcher;
mod registry;

pub use launcher::{launch, launch_with_args, new_rwlock};
pub use registry::{current_task_id, descriptor, is_live, live_task_count, TaskDescriptor};

pub(crate) use launcher::try_launch_named;
