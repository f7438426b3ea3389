//! Spindle: a managed-task concurrency runtime.
//!
//! Spindle provides a small substrate for server-side worker code, built
//! around three coupled primitives:
//!
//! - **Tracked tasks** ([`runtime`]): units of work launched with a stable,
//!   process-unique [`TaskId`] that the executing code can discover with
//!   [`current_task_id`].
//! - **A task-keyed reentrant reader/writer lock** ([`sync::TaskRwLock`]):
//!   recursion and demotion are recognized per task identity; reader-to-
//!   writer upgrades are rejected; unmanaged callers are refused.
//! - **An elastic worker pool** ([`pool::ThreadPool`]): workers drain a
//!   [`FunctionQueue`] of [`WorkDescriptor`]s, a monitor grows the pool one
//!   worker at a time while every worker is busy, and idle workers retire
//!   down to the configured floor.
//!
//! The coupling is deliberate: the lock answers "does this caller already
//! hold me?" through the task identity the launcher installs, and the pool
//! sizes itself by observing the waiting/running state of its identified
//! workers.
//!
//! # Example
//!
//! ```ignore
//! use spindle::{FifoFunctionQueue, PoolConfig, ThreadPool, WorkDescriptor};
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! let queue = Arc::new(FifoFunctionQueue::unbounded());
//! let errors = Arc::new(spindle::BoundedErrorQueue::new(64));
//!
//! let pool = ThreadPool::new(
//!     PoolConfig::new("workers").min_threads(2).max_threads(8),
//!     Arc::clone(&queue) as Arc<dyn spindle::FunctionQueue>,
//!     Some(Arc::clone(&errors) as Arc<dyn spindle::ErrorQueue>),
//! )?;
//! pool.start();
//!
//! queue.enqueue(WorkDescriptor::new(|| {
//!     // runs on a pool worker, inside a managed task
//!     Ok(())
//! }))?;
//! ```

#![warn(missing_docs)]

pub mod pool;
pub mod queue;
pub mod runtime;
pub mod sync;
pub mod test_logging;
pub mod types;

pub use pool::{PanicError, PoolConfig, PoolConfigError, ThreadPool, WorkerState};
pub use queue::{
    BoundedErrorQueue, ErrorInfo, ErrorQueue, FifoFunctionQueue, FunctionQueue, QueueError,
    UserError, WorkDescriptor,
};
pub use runtime::{current_task_id, launch, launch_with_args, new_rwlock};
pub use sync::{LockError, TaskRwLock};
pub use types::TaskId;
