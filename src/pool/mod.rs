//! Elastic worker pool over a function queue.
//!
//! The pool owns a set of worker tasks, one monitor task, and references to
//! its queues. Growth and decay ride independent signals:
//!
//! - **Growth** is monitor-driven. The monitor wakes on queue state changes
//!   (or once a minute) and launches at most one worker per wakeup, only
//!   when the queue is non-empty, every tracked worker is running, and the
//!   ceiling has not been reached. One-at-a-time growth damps oscillation.
//! - **Decay** is worker-driven. A worker whose dequeue times out after the
//!   idle-decay period retires itself, but never below the floor.
//!
//! The monitor never removes workers, so a slow monitor cannot stall decay.
//! Workers invoke user code with no pool lock held; a descriptor's failure
//! is routed to the error queue and never fatal to the worker.

mod worker;

pub use worker::PanicError;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use crate::queue::{ErrorInfo, ErrorQueue, FunctionQueue, UserError};
use crate::runtime;
use crate::types::TaskId;

/// How long the monitor sleeps when the queue reports no state changes.
const MONITOR_PERIOD: Duration = Duration::from_secs(60);

/// Observable state of one pool worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    /// Parked in dequeue, available for work.
    Waiting,
    /// Invoking a descriptor.
    Running,
}

/// Configuration for a [`ThreadPool`].
///
/// Validation happens in [`ThreadPool::new`]; the builder only records
/// values.
#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// Name used for worker thread names and diagnostics.
    pub name: String,
    /// Floor: workers never decay below this count.
    pub min_threads: usize,
    /// Ceiling: the monitor never grows past this count.
    pub max_threads: usize,
    /// How long a worker waits for work before retiring (subject to the
    /// floor).
    pub idle_decay: Duration,
}

impl PoolConfig {
    /// Creates a configuration with the given pool name and defaults of
    /// one to ten workers and a ten-minute idle decay.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            min_threads: 1,
            max_threads: 10,
            idle_decay: Duration::from_secs(600),
        }
    }

    /// Sets the worker floor.
    #[must_use]
    pub fn min_threads(mut self, min_threads: usize) -> Self {
        self.min_threads = min_threads;
        self
    }

    /// Sets the worker ceiling.
    #[must_use]
    pub fn max_threads(mut self, max_threads: usize) -> Self {
        self.max_threads = max_threads;
        self
    }

    /// Sets the idle-decay duration.
    #[must_use]
    pub fn idle_decay(mut self, idle_decay: Duration) -> Self {
        self.idle_decay = idle_decay;
        self
    }
}

/// Error returned for an invalid pool configuration.
///
/// Construction fails synchronously; no threads are spawned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PoolConfigError {
    /// `max_threads` is zero; the pool could never run anything.
    NoWorkerCapacity {
        /// The rejected ceiling.
        max_threads: usize,
    },
    /// `min_threads` exceeds `max_threads`.
    MinExceedsMax {
        /// The configured floor.
        min_threads: usize,
        /// The configured ceiling.
        max_threads: usize,
    },
}

impl std::fmt::Display for PoolConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoWorkerCapacity { max_threads } => {
                write!(f, "maximum thread count less than one: {max_threads}")
            }
            Self::MinExceedsMax {
                min_threads,
                max_threads,
            } => write!(
                f,
                "minimum thread count {min_threads} exceeds maximum {max_threads}"
            ),
        }
    }
}

impl std::error::Error for PoolConfigError {}

#[derive(Debug)]
struct PoolState {
    started: bool,
    closed: bool,
    /// Workers launched and not yet exited. Mutated only under the pool
    /// mutex; `min <= current_threads <= max` while started and not closed.
    current_threads: usize,
    /// WAITING/RUNNING per live worker. Entries are inserted when a worker
    /// first reports and removed by the worker's exit guard.
    thread_state: HashMap<TaskId, WorkerState>,
    /// Source for worker thread names.
    next_worker_index: u64,
}

/// An elastic pool of managed worker tasks draining a [`FunctionQueue`].
///
/// See the module docs for the growth and decay policies.
///
/// # Example
///
/// ```ignore
/// use spindle::{FifoFunctionQueue, PoolConfig, ThreadPool, WorkDescriptor};
/// use std::sync::Arc;
/// use std::time::Duration;
///
/// let queue = Arc::new(FifoFunctionQueue::unbounded());
/// let pool = ThreadPool::new(
///     PoolConfig::new("workers")
///         .min_threads(1)
///         .max_threads(4)
///         .idle_decay(Duration::from_secs(5)),
///     Arc::clone(&queue) as Arc<dyn spindle::FunctionQueue>,
///     None,
/// )?;
/// pool.start();
/// queue.enqueue(WorkDescriptor::from_fn(|| println!("hello")))?;
/// ```
pub struct ThreadPool {
    config: PoolConfig,
    function_queue: Arc<dyn FunctionQueue>,
    error_queue: Option<Arc<dyn ErrorQueue>>,
    state: Mutex<PoolState>,
}

impl ThreadPool {
    /// Creates a pool over the given queues.
    ///
    /// The function queue is required; the error queue may be absent, in
    /// which case user errors are dropped by design. No threads are spawned
    /// until [`start`](Self::start).
    ///
    /// # Errors
    ///
    /// [`PoolConfigError`] when `max_threads` is zero or the floor exceeds
    /// the ceiling.
    pub fn new(
        config: PoolConfig,
        function_queue: Arc<dyn FunctionQueue>,
        error_queue: Option<Arc<dyn ErrorQueue>>,
    ) -> Result<Arc<Self>, PoolConfigError> {
        if config.max_threads < 1 {
            return Err(PoolConfigError::NoWorkerCapacity {
                max_threads: config.max_threads,
            });
        }
        if config.min_threads > config.max_threads {
            return Err(PoolConfigError::MinExceedsMax {
                min_threads: config.min_threads,
                max_threads: config.max_threads,
            });
        }

        Ok(Arc::new(Self {
            config,
            function_queue,
            error_queue,
            state: Mutex::new(PoolState {
                started: false,
                closed: false,
                current_threads: 0,
                thread_state: HashMap::new(),
                next_worker_index: 0,
            }),
        }))
    }

    /// Returns the pool's name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.config.name
    }

    /// Returns the worker floor.
    #[must_use]
    pub fn min_threads(&self) -> usize {
        self.config.min_threads
    }

    /// Returns the worker ceiling.
    #[must_use]
    pub fn max_threads(&self) -> usize {
        self.config.max_threads
    }

    /// Returns the idle-decay duration.
    #[must_use]
    pub fn idle_decay(&self) -> Duration {
        self.config.idle_decay
    }

    /// Returns the number of workers launched and not yet exited.
    #[must_use]
    pub fn current_thread_count(&self) -> usize {
        self.state.lock().current_threads
    }

    /// Returns the pool's function queue.
    #[must_use]
    pub fn function_queue(&self) -> &Arc<dyn FunctionQueue> {
        &self.function_queue
    }

    /// Returns the pool's error queue, when one was configured.
    #[must_use]
    pub fn error_queue(&self) -> Option<&Arc<dyn ErrorQueue>> {
        self.error_queue.as_ref()
    }

    /// Returns true once [`start`](Self::start) has run.
    #[must_use]
    pub fn is_started(&self) -> bool {
        self.state.lock().started
    }

    /// Returns true once [`close`](Self::close) has run.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.state.lock().closed
    }

    /// Starts the pool: launches the floor's worth of workers plus the
    /// monitor task.
    ///
    /// Idempotent when already started; a no-op on a closed pool.
    pub fn start(self: &Arc<Self>) {
        let mut state = self.state.lock();
        if state.started || state.closed {
            return;
        }
        state.started = true;

        for _ in 0..self.config.min_threads {
            if self.spawn_worker(&mut state) {
                state.current_threads += 1;
            }
        }

        let monitor_pool = Arc::clone(self);
        let monitor_name = format!("{}-monitor", self.config.name);
        if let Err(error) = runtime::try_launch_named(Some(monitor_name), move || {
            monitor_pool.monitor_loop();
        }) {
            tracing::warn!(pool = %self.config.name, %error, "failed to launch pool monitor");
        }
    }

    /// Closes the pool and returns immediately.
    ///
    /// Shutdown is cooperative: in-flight descriptors run to completion,
    /// waiting workers observe the flag after their next dequeue timeout,
    /// and the monitor exits on its next wakeup. No new workers launch
    /// after close.
    pub fn close(&self) {
        self.state.lock().closed = true;
    }

    fn monitor_loop(self: &Arc<Self>) {
        loop {
            if self.is_closed() {
                tracing::debug!(pool = %self.config.name, "monitor exiting");
                return;
            }
            // Decide before parking so work enqueued ahead of this wakeup is
            // never stranded until the next timeout.
            self.monitor_once();
            self.function_queue.wait_for_state_change(MONITOR_PERIOD);
        }
    }

    /// One growth decision. At most one worker is added per wakeup.
    fn monitor_once(self: &Arc<Self>) {
        let mut state = self.state.lock();
        if state.closed {
            return;
        }
        if self.function_queue.is_empty() {
            // Nothing pending; idle workers retire at their own pace.
            return;
        }
        if state.current_threads >= self.config.max_threads {
            return;
        }
        if state
            .thread_state
            .values()
            .any(|s| *s == WorkerState::Waiting)
        {
            return;
        }

        if self.spawn_worker(&mut state) {
            state.current_threads += 1;
            tracing::debug!(
                pool = %self.config.name,
                current_threads = state.current_threads,
                "pool grew by one worker"
            );
        }
    }

    /// Launches one worker task. Returns false when the spawn failed; the
    /// count is left untouched and the next monitor wakeup retries.
    fn spawn_worker(self: &Arc<Self>, state: &mut PoolState) -> bool {
        let name = format!("{}-worker-{}", self.config.name, state.next_worker_index);
        state.next_worker_index += 1;

        let pool = Arc::clone(self);
        match runtime::try_launch_named(Some(name), move || worker::run(&pool)) {
            Ok(_) => true,
            Err(error) => {
                tracing::warn!(pool = %self.config.name, %error, "failed to launch pool worker");
                false
            }
        }
    }

    fn set_worker_state(&self, task_id: TaskId, worker_state: WorkerState) {
        self.state.lock().thread_state.insert(task_id, worker_state);
    }

    fn remove_worker_entry(&self, task_id: TaskId) {
        self.state.lock().thread_state.remove(&task_id);
    }

    /// Retires an exiting worker unconditionally.
    fn retire_worker(&self) {
        let mut state = self.state.lock();
        state.current_threads = state.current_threads.saturating_sub(1);
    }

    /// Retires an idle worker only while above the floor. The check and the
    /// decrement happen under one lock hold so two workers cannot both
    /// consume the same headroom.
    fn try_decay_worker(&self) -> bool {
        let mut state = self.state.lock();
        if state.current_threads > self.config.min_threads {
            state.current_threads -= 1;
            true
        } else {
            false
        }
    }

    /// Routes a user error to the error queue, tagged with the producing
    /// worker. Dropped by design when no error queue was configured.
    fn record_user_error(&self, task_id: TaskId, error: UserError) {
        match self.error_queue {
            Some(ref error_queue) => error_queue.enqueue(ErrorInfo::new(task_id, error)),
            None => {
                tracing::trace!(pool = %self.config.name, task = %task_id, "user error dropped, no error queue");
            }
        }
    }
}

impl std::fmt::Debug for ThreadPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("ThreadPool")
            .field("name", &self.config.name)
            .field("min_threads", &self.config.min_threads)
            .field("max_threads", &self.config.max_threads)
            .field("started", &state.started)
            .field("closed", &state.closed)
            .field("current_threads", &state.current_threads)
            .finish_non_exhaustive()
    }
}
