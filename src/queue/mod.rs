//! Work descriptors and the queue interfaces the pool consumes.
//!
//! The pool does not own its queues; it is handed a [`FunctionQueue`] of
//! [`WorkDescriptor`]s to drain and, optionally, an [`ErrorQueue`] to report
//! user failures into. This module defines those interfaces plus the
//! concrete implementations the crate ships:
//!
//! - [`FifoFunctionQueue`]: bounded or unbounded FIFO with blocking dequeue
//!   and a state-change signal for the pool monitor
//! - [`BoundedErrorQueue`]: capacity-bounded store of [`ErrorInfo`] entries
//!
//! A descriptor is an opaque callable plus its captured arguments, with a
//! single invoke operation and an explicit error channel: the worker records
//! an `Err` return as an [`ErrorInfo`] tagged with the worker's task id and
//! never inspects the payload otherwise.

mod error_queue;
mod fifo;

pub use error_queue::{BoundedErrorQueue, ErrorInfo};
pub use fifo::FifoFunctionQueue;

use std::time::Duration;

/// The error type user callables may return.
pub type UserError = Box<dyn std::error::Error + Send + Sync>;

/// Error returned by queue operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueError {
    /// The queue held nothing for the full dequeue timeout. This is the
    /// normal idle signal that drives pool decay.
    Empty,
    /// A bounded queue is at capacity.
    Full,
    /// The queue has been closed.
    Closed,
}

impl std::fmt::Display for QueueError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Empty => write!(f, "queue is empty"),
            Self::Full => write!(f, "queue is at capacity"),
            Self::Closed => write!(f, "queue is closed"),
        }
    }
}

impl std::error::Error for QueueError {}

/// A unit of work: an opaque callable plus its captured arguments.
///
/// Invocation either succeeds or yields the user's error value. Arguments
/// are captured at construction ([`with_args`](Self::with_args) mirrors
/// call-plus-argument-vector producers); the pool treats the descriptor as a
/// value with a single invoke operation.
pub struct WorkDescriptor {
    call: Box<dyn FnOnce() -> Result<(), UserError> + Send>,
}

impl WorkDescriptor {
    /// Creates a descriptor from a fallible callable.
    pub fn new<F>(call: F) -> Self
    where
        F: FnOnce() -> Result<(), UserError> + Send + 'static,
    {
        Self { call: Box::new(call) }
    }

    /// Creates a descriptor from an infallible callable.
    pub fn from_fn<F>(call: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        Self::new(move || {
            call();
            Ok(())
        })
    }

    /// Creates a descriptor binding a captured argument value to `call`.
    pub fn with_args<F, A>(call: F, args: A) -> Self
    where
        F: FnOnce(A) -> Result<(), UserError> + Send + 'static,
        A: Send + 'static,
    {
        Self::new(move || call(args))
    }

    /// Invokes the callable with its captured arguments.
    ///
    /// # Errors
    ///
    /// Propagates the callable's error value.
    pub fn invoke(self) -> Result<(), UserError> {
        (self.call)()
    }
}

impl std::fmt::Debug for WorkDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkDescriptor").finish_non_exhaustive()
    }
}

/// FIFO queue of work descriptors, as consumed by the pool.
///
/// Implementations provide their own synchronisation and are safe for
/// concurrent producers and consumers. A successful enqueue happens-before
/// the invocation of that descriptor by whichever worker dequeues it.
pub trait FunctionQueue: Send + Sync {
    /// Inserts a descriptor without blocking.
    ///
    /// # Errors
    ///
    /// [`QueueError::Full`] when a bounded queue is at capacity;
    /// [`QueueError::Closed`] after close.
    fn enqueue(&self, descriptor: WorkDescriptor) -> Result<(), QueueError>;

    /// Removes the oldest descriptor, blocking up to `timeout`.
    ///
    /// # Errors
    ///
    /// [`QueueError::Empty`] when nothing arrived within the timeout;
    /// [`QueueError::Closed`] when the queue is closed and drained.
    fn dequeue(&self, timeout: Duration) -> Result<WorkDescriptor, QueueError>;

    /// Returns true when the queue currently holds no descriptors.
    fn is_empty(&self) -> bool;

    /// Blocks until the queue's state changes (an enqueue, dequeue, or
    /// close) or the timeout elapses.
    fn wait_for_state_change(&self, timeout: Duration);
}

/// Sink for errors produced by user callables, as consumed by the pool.
pub trait ErrorQueue: Send + Sync {
    /// Records one error.
    fn enqueue(&self, info: ErrorInfo);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn descriptor_invokes_captured_closure() {
        let descriptor = WorkDescriptor::from_fn(|| {});
        assert!(descriptor.invoke().is_ok());
    }

    #[test]
    fn descriptor_propagates_user_error() {
        let descriptor = WorkDescriptor::new(|| Err("boom".into()));
        let error = descriptor.invoke().unwrap_err();
        assert_eq!(error.to_string(), "boom");
    }

    #[test]
    fn descriptor_binds_arguments() {
        let descriptor = WorkDescriptor::with_args(
            |(a, b): (u64, u64)| {
                assert_eq!(a + b, 7);
                Ok(())
            },
            (3, 4),
        );
        assert!(descriptor.invoke().is_ok());
    }

    #[test]
    fn queue_error_display() {
        assert_eq!(QueueError::Empty.to_string(), "queue is empty");
        assert_eq!(QueueError::Full.to_string(), "queue is at capacity");
        assert_eq!(QueueError::Closed.to_string(), "queue is closed");
    }

    #[test]
    fn descriptor_debug_is_opaque() {
        let descriptor = WorkDescriptor::from_fn(|| {});
        assert!(format!("{descriptor:?}").contains("WorkDescriptor"));
    }
}
