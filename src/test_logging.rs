//! Test logging infrastructure for Spindle.
//!
//! This module provides detailed logging for tests that captures task,
//! lock, queue, and pool events with timing information to enable thorough
//! debugging of concurrency scenarios.
//!
//! # Overview
//!
//! - [`TestLogLevel`]: configurable verbosity levels
//! - [`TestEvent`]: typed events for runtime operations
//! - [`TestLogger`]: captures and reports events with timestamps
//!
//! # Example
//!
//! ```ignore
//! use spindle::test_logging::{TestLogger, TestLogLevel, TestEvent};
//!
//! let logger = TestLogger::new(TestLogLevel::Debug);
//! logger.log(TestEvent::TaskSpawn { task_id: 1, name: Some("worker".into()) });
//!
//! // On test completion, print the report
//! println!("{}", logger.report());
//! ```

use std::fmt::Write as _;
use std::sync::Mutex;
use std::time::{Duration, Instant};

// ============================================================================
// TestLogLevel
// ============================================================================

/// Logging verbosity level for tests.
///
/// Levels are ordered from least to most verbose:
/// `Error < Warn < Info < Debug < Trace`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum TestLogLevel {
    /// Only errors and failures.
    Error,
    /// Warnings and above.
    Warn,
    /// General test progress.
    #[default]
    Info,
    /// Detailed lock and queue operations.
    Debug,
    /// All events including per-acquisition lock traffic.
    Trace,
}

impl TestLogLevel {
    /// Returns a human-readable name for the level.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Error => "ERROR",
            Self::Warn => "WARN",
            Self::Info => "INFO",
            Self::Debug => "DEBUG",
            Self::Trace => "TRACE",
        }
    }

    /// Returns the level from the `TEST_LOG_LEVEL` environment variable.
    #[must_use]
    pub fn from_env() -> Self {
        std::env::var("TEST_LOG_LEVEL")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or_default()
    }
}

impl std::fmt::Display for TestLogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl std::str::FromStr for TestLogLevel {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "error" => Ok(Self::Error),
            "warn" | "warning" => Ok(Self::Warn),
            "info" => Ok(Self::Info),
            "debug" => Ok(Self::Debug),
            "trace" => Ok(Self::Trace),
            _ => Err(()),
        }
    }
}

// ============================================================================
// TestEvent
// ============================================================================

/// A typed event captured by the test logger.
///
/// Events cover the runtime's observable operations:
/// - Task events (spawn, complete)
/// - Lock events (read/write acquire and release)
/// - Queue events (enqueue, dequeue)
/// - Pool events (worker state changes, growth, decay)
/// - Custom events for test-specific logging
#[derive(Debug, Clone)]
pub enum TestEvent {
    /// A managed task was launched.
    TaskSpawn {
        /// Numeric id of the task.
        task_id: u64,
        /// Name assigned at launch, if any.
        name: Option<String>,
    },

    /// A managed task completed and released its id.
    TaskComplete {
        /// Numeric id of the task.
        task_id: u64,
    },

    /// A task acquired the lock for reading.
    ReadAcquired {
        /// Numeric id of the acquiring task.
        task_id: u64,
        /// Recursive read count held after the acquisition.
        depth: usize,
    },

    /// A task released one read count.
    ReadReleased {
        /// Numeric id of the releasing task.
        task_id: u64,
    },

    /// A task acquired the lock for writing.
    WriteAcquired {
        /// Numeric id of the acquiring task.
        task_id: u64,
        /// Recursive write depth held after the acquisition.
        depth: usize,
    },

    /// A task released one write depth.
    WriteReleased {
        /// Numeric id of the releasing task.
        task_id: u64,
    },

    /// A descriptor was enqueued.
    QueueEnqueue {
        /// Queue length after the insert.
        queue_len: usize,
    },

    /// A descriptor was dequeued.
    QueueDequeue {
        /// Queue length after the removal.
        queue_len: usize,
    },

    /// A pool worker changed state.
    WorkerStateChange {
        /// Numeric id of the worker task.
        task_id: u64,
        /// The new state ("waiting" or "running").
        state: &'static str,
    },

    /// The pool launched an additional worker.
    PoolGrow {
        /// Worker count after the growth.
        current_threads: usize,
    },

    /// An idle pool worker retired.
    PoolDecay {
        /// Worker count after the retirement.
        current_threads: usize,
    },

    /// Custom test event.
    Custom {
        /// Event category for grouping.
        category: &'static str,
        /// Freeform message.
        message: String,
    },

    /// Error event.
    Error {
        /// Event category for grouping.
        category: &'static str,
        /// Freeform message.
        message: String,
    },

    /// Warning event.
    Warn {
        /// Event category for grouping.
        category: &'static str,
        /// Freeform message.
        message: String,
    },
}

impl TestEvent {
    /// Returns the log level at which this event is captured.
    #[must_use]
    pub fn level(&self) -> TestLogLevel {
        match self {
            Self::Error { .. } => TestLogLevel::Error,
            Self::Warn { .. } => TestLogLevel::Warn,
            Self::TaskSpawn { .. } | Self::TaskComplete { .. } | Self::Custom { .. } => {
                TestLogLevel::Info
            }
            Self::QueueEnqueue { .. }
            | Self::QueueDequeue { .. }
            | Self::WorkerStateChange { .. }
            | Self::PoolGrow { .. }
            | Self::PoolDecay { .. } => TestLogLevel::Debug,
            Self::ReadAcquired { .. }
            | Self::ReadReleased { .. }
            | Self::WriteAcquired { .. }
            | Self::WriteReleased { .. } => TestLogLevel::Trace,
        }
    }
}

impl std::fmt::Display for TestEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::TaskSpawn { task_id, name } => match name {
                Some(name) => write!(f, "task spawn: task={task_id} name={name}"),
                None => write!(f, "task spawn: task={task_id}"),
            },
            Self::TaskComplete { task_id } => write!(f, "task complete: task={task_id}"),
            Self::ReadAcquired { task_id, depth } => {
                write!(f, "read acquired: task={task_id} depth={depth}")
            }
            Self::ReadReleased { task_id } => write!(f, "read released: task={task_id}"),
            Self::WriteAcquired { task_id, depth } => {
                write!(f, "write acquired: task={task_id} depth={depth}")
            }
            Self::WriteReleased { task_id } => write!(f, "write released: task={task_id}"),
            Self::QueueEnqueue { queue_len } => write!(f, "enqueue: len={queue_len}"),
            Self::QueueDequeue { queue_len } => write!(f, "dequeue: len={queue_len}"),
            Self::WorkerStateChange { task_id, state } => {
                write!(f, "worker state: task={task_id} state={state}")
            }
            Self::PoolGrow { current_threads } => {
                write!(f, "pool grow: current={current_threads}")
            }
            Self::PoolDecay { current_threads } => {
                write!(f, "pool decay: current={current_threads}")
            }
            Self::Custom { category, message } => write!(f, "[{category}] {message}"),
            Self::Error { category, message } => write!(f, "ERROR [{category}] {message}"),
            Self::Warn { category, message } => write!(f, "WARN [{category}] {message}"),
        }
    }
}

// ============================================================================
// TestLogger
// ============================================================================

#[derive(Debug, Clone)]
struct EventRecord {
    at: Duration,
    event: TestEvent,
}

/// Captures typed events with timestamps and produces a report.
#[derive(Debug)]
pub struct TestLogger {
    level: TestLogLevel,
    started: Instant,
    events: Mutex<Vec<EventRecord>>,
}

impl TestLogger {
    /// Creates a logger capturing events up to `level`.
    #[must_use]
    pub fn new(level: TestLogLevel) -> Self {
        Self {
            level,
            started: Instant::now(),
            events: Mutex::new(Vec::new()),
        }
    }

    /// Creates a logger with the level taken from `TEST_LOG_LEVEL`.
    #[must_use]
    pub fn from_env() -> Self {
        Self::new(TestLogLevel::from_env())
    }

    /// Captures one event, if its level is within the configured verbosity.
    pub fn log(&self, event: TestEvent) {
        if event.level() > self.level {
            return;
        }
        self.events.lock().expect("lock poisoned").push(EventRecord {
            at: self.started.elapsed(),
            event,
        });
    }

    /// Returns the number of captured events.
    #[must_use]
    pub fn event_count(&self) -> usize {
        self.events.lock().expect("lock poisoned").len()
    }

    /// Renders every captured event plus summary statistics.
    #[must_use]
    pub fn report(&self) -> String {
        let events = self.events.lock().expect("lock poisoned");

        let mut spawns = 0_usize;
        let mut completes = 0_usize;
        let mut grows = 0_usize;
        let mut decays = 0_usize;
        let mut errors = 0_usize;
        for record in events.iter() {
            match record.event {
                TestEvent::TaskSpawn { .. } => spawns += 1,
                TestEvent::TaskComplete { .. } => completes += 1,
                TestEvent::PoolGrow { .. } => grows += 1,
                TestEvent::PoolDecay { .. } => decays += 1,
                TestEvent::Error { .. } => errors += 1,
                _ => {}
            }
        }

        let mut out = String::new();
        let _ = writeln!(out, "=== test log ({} events) ===", events.len());
        for record in events.iter() {
            let _ = writeln!(
                out,
                "[{:>10.3?}] {}",
                record.at, record.event
            );
        }
        let _ = writeln!(out, "--- statistics ---");
        let _ = writeln!(out, "Task spawns: {spawns}");
        let _ = writeln!(out, "Task completions: {completes}");
        let _ = writeln!(out, "Pool growths: {grows}");
        let _ = writeln!(out, "Pool decays: {decays}");
        let _ = writeln!(out, "Errors: {errors}");
        out
    }

    /// Asserts that every spawned task has a matching completion event.
    ///
    /// # Panics
    ///
    /// Panics, printing the full report, if any spawned task did not
    /// complete.
    pub fn assert_all_tasks_completed(&self) {
        let leaked: Vec<u64> = {
            let events = self.events.lock().expect("lock poisoned");

            let spawned: std::collections::HashSet<_> = events
                .iter()
                .filter_map(|r| {
                    if let TestEvent::TaskSpawn { task_id, .. } = r.event {
                        Some(task_id)
                    } else {
                        None
                    }
                })
                .collect();

            let completed: std::collections::HashSet<_> = events
                .iter()
                .filter_map(|r| {
                    if let TestEvent::TaskComplete { task_id } = r.event {
                        Some(task_id)
                    } else {
                        None
                    }
                })
                .collect();

            spawned.difference(&completed).copied().collect()
        };

        assert!(
            leaked.is_empty(),
            "Task leak detected: {} tasks spawned but not completed: {:?}\n\nFull log:\n{}",
            leaked.len(),
            leaked,
            self.report()
        );
    }

    /// Clears all captured events.
    pub fn clear(&self) {
        self.events.lock().expect("lock poisoned").clear();
    }
}

impl Default for TestLogger {
    fn default() -> Self {
        Self::new(TestLogLevel::Info)
    }
}

// ============================================================================
// Macros
// ============================================================================

/// Log a custom event to a test logger.
///
/// # Example
///
/// ```ignore
/// test_log!(logger, "setup", "Starting pool with {} workers", min);
/// ```
#[macro_export]
macro_rules! test_log {
    ($logger:expr, $cat:literal, $($arg:tt)*) => {
        $logger.log($crate::test_logging::TestEvent::Custom {
            category: $cat,
            message: format!($($arg)*),
        });
    };
}

/// Log an error event to a test logger.
///
/// # Example
///
/// ```ignore
/// test_error!(logger, "lock", "Unexpected error: {}", err);
/// ```
#[macro_export]
macro_rules! test_error {
    ($logger:expr, $cat:literal, $($arg:tt)*) => {
        $logger.log($crate::test_logging::TestEvent::Error {
            category: $cat,
            message: format!($($arg)*),
        });
    };
}

/// Log a warning event to a test logger.
///
/// # Example
///
/// ```ignore
/// test_warn!(logger, "timing", "Decay took {}ms", elapsed);
/// ```
#[macro_export]
macro_rules! test_warn {
    ($logger:expr, $cat:literal, $($arg:tt)*) => {
        $logger.log($crate::test_logging::TestEvent::Warn {
            category: $cat,
            message: format!($($arg)*),
        });
    };
}

/// Assert a condition, printing the full log on failure.
///
/// # Example
///
/// ```ignore
/// assert_log!(logger, result.is_ok(), "Expected success, got {:?}", result);
/// ```
#[macro_export]
macro_rules! assert_log {
    ($logger:expr, $cond:expr) => {
        if !$cond {
            eprintln!("{}", $logger.report());
            panic!("assertion failed: {}", stringify!($cond));
        }
    };
    ($logger:expr, $cond:expr, $($arg:tt)*) => {
        if !$cond {
            eprintln!("{}", $logger.report());
            panic!($($arg)*);
        }
    };
}

/// Assert equality, printing the full log on failure.
///
/// # Example
///
/// ```ignore
/// assert_eq_log!(logger, actual, expected, "Counts should match");
/// ```
#[macro_export]
macro_rules! assert_eq_log {
    ($logger:expr, $left:expr, $right:expr) => {
        if $left != $right {
            eprintln!("{}", $logger.report());
            panic!(
                "assertion failed: `(left == right)`\n  left: {:?}\n right: {:?}",
                $left, $right
            );
        }
    };
    ($logger:expr, $left:expr, $right:expr, $($arg:tt)*) => {
        if $left != $right {
            eprintln!("{}", $logger.report());
            panic!(
                "assertion failed: `(left == right)`\n  left: {:?}\n right: {:?}\n{}",
                $left, $right, format!($($arg)*)
            );
        }
    };
}

// ============================================================================
// Tests
// ============================================================================
