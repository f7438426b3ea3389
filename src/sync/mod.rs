//! Synchronization primitives keyed by managed-task identity.
//!
//! # Primitives
//!
//! - [`TaskRwLock`]: reentrant reader/writer lock whose ownership is keyed
//!   by [`TaskId`](crate::types::TaskId) rather than OS thread
//!
//! Because ownership follows the task identity installed by the launcher,
//! these primitives refuse operations from unmanaged callers: a thread that
//! was not started through [`launch`](crate::runtime::launch) has no
//! identity to key recursion on.

mod rwlock;

pub use rwlock::{LockError, TaskRwLock};
