//! Reentrant reader/writer lock keyed by managed-task identity.
//!
//! Ownership is tracked per [`TaskId`], not per OS thread, so the lock
//! composes with the launcher's task abstraction: a task that already holds
//! the lock is recognized wherever its code runs, and recursive acquisitions
//! complete without blocking.
//!
//! # Acquisition Semantics
//!
//! | Caller already holds | `read_lock`                          | `write_lock`            |
//! |-----------------------|--------------------------------------|-------------------------|
//! | nothing               | shared grant (queues behind a waiting writer) | exclusive grant  |
//! | read                  | count increment                      | fails: `ReadLockHeld`   |
//! | write                 | read count on self, mode stays write | depth increment         |
//! | write + read          | count increment                      | depth increment         |
//!
//! Reader-to-writer upgrade is rejected outright: two readers that both
//! blocked waiting to upgrade could never drain each other. Rejecting the
//! upgrade guarantees a reader can always progress to releasing its own read
//! count. Writer-to-reader demotion is permitted — the writer already
//! excludes every other holder, so granting it a read count changes nothing
//! another task can observe.
//!
//! # Fairness
//!
//! This lock uses a **writer-preference** policy: once a writer is waiting,
//! read requests from tasks that hold nothing queue behind it. Reentrant
//! acquisitions by current holders are never queued.
//!
//! | Scenario                  | Behavior                                   |
//! |---------------------------|--------------------------------------------|
//! | No writers waiting        | Readers acquire immediately                |
//! | Writer waiting            | New readers blocked until writer completes |
//! | Existing readers + writer | Writer waits for all readers to release    |
//!
//! # Unmanaged Callers
//!
//! Every operation requires a managed-task identity and fails with
//! [`LockError::NotInManagedTask`] when invoked from a thread that was not
//! started through the launcher.

use std::collections::HashMap;

use parking_lot::{Condvar, Mutex};

use crate::runtime::current_task_id;
use crate::types::TaskId;

/// Error returned by lock operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockError {
    /// The caller is not running inside a managed task.
    NotInManagedTask,
    /// The caller holds a read lock and attempted to acquire the write lock.
    ReadLockHeld,
    /// The caller released a lock it does not hold.
    NotLockOwner,
}

impl std::fmt::Display for LockError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotInManagedTask => write!(f, "caller is not a managed task"),
            Self::ReadLockHeld => write!(f, "read lock held; upgrade to write lock is not allowed"),
            Self::NotLockOwner => write!(f, "caller does not hold this lock"),
        }
    }
}

impl std::error::Error for LockError {}

#[derive(Debug, Default, Clone)]
struct State {
    /// Task holding the write lock, if any.
    writer: Option<TaskId>,
    /// Recursive write depth; >= 1 whenever `writer` is set.
    write_depth: usize,
    /// Read counts per holder. No entry is ever 0. While a writer is
    /// active the only possible key is the writer itself (demotion).
    readers: HashMap<TaskId, usize>,
    /// Writers blocked in `write_lock`. New readers queue while this is
    /// non-zero.
    writer_waiters: usize,
}

impl State {
    fn idle(&self) -> bool {
        self.writer.is_none() && self.readers.is_empty()
    }
}

/// A reentrant reader/writer lock keyed by managed-task identity.
///
/// Supports recursive read, recursive write, and writer-to-reader demotion;
/// rejects reader-to-writer upgrade; refuses unmanaged callers. See the
/// module docs for the full acquisition table.
///
/// # Example
///
/// ```ignore
/// use spindle::{launch, new_rwlock};
///
/// let lock = new_rwlock();
/// launch(move || {
///     lock.write_lock().unwrap();
///     lock.read_lock().unwrap();   // demotion: allowed
///     lock.read_unlock().unwrap();
///     lock.write_unlock().unwrap();
/// });
/// ```
#[derive(Debug, Default)]
pub struct TaskRwLock {
    state: Mutex<State>,
    /// Readers blocked behind an active or waiting writer.
    readers_cv: Condvar,
    /// Writers blocked behind the active holder(s).
    writers_cv: Condvar,
}

impl TaskRwLock {
    /// Creates a new, idle lock.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquires the lock for reading on behalf of the calling task.
    ///
    /// Grants immediately when the caller already holds the lock in either
    /// mode (recursion or demotion). Otherwise blocks while a writer is
    /// active or waiting.
    ///
    /// # Errors
    ///
    /// [`LockError::NotInManagedTask`] from an unmanaged caller.
    pub fn read_lock(&self) -> Result<(), LockError> {
        let task = current_task_id().ok_or(LockError::NotInManagedTask)?;
        let mut state = self.state.lock();

        // Reentrant paths never queue: a current holder (reader, or the
        // active writer demoting itself) bumps its count and returns.
        if state.writer == Some(task) || state.readers.contains_key(&task) {
            *state.readers.entry(task).or_insert(0) += 1;
            return Ok(());
        }

        while state.writer.is_some() || state.writer_waiters > 0 {
            self.readers_cv.wait(&mut state);
        }
        state.readers.insert(task, 1);
        Ok(())
    }

    /// Releases one read count held by the calling task.
    ///
    /// When the count reaches zero the task is removed from the reader set;
    /// if the lock becomes idle a waiting writer is released.
    ///
    /// # Errors
    ///
    /// [`LockError::NotInManagedTask`] from an unmanaged caller;
    /// [`LockError::NotLockOwner`] when the task holds no read count.
    pub fn read_unlock(&self) -> Result<(), LockError> {
        let task = current_task_id().ok_or(LockError::NotInManagedTask)?;
        let mut state = self.state.lock();

        let Some(count) = state.readers.get_mut(&task) else {
            return Err(LockError::NotLockOwner);
        };
        *count -= 1;
        if *count == 0 {
            state.readers.remove(&task);
        }

        if state.idle() && state.writer_waiters > 0 {
            self.writers_cv.notify_one();
        }
        Ok(())
    }

    /// Acquires the lock for writing on behalf of the calling task.
    ///
    /// Grants immediately when the caller is already the writer (depth
    /// increment). Otherwise blocks until no writer is active and no read
    /// counts remain.
    ///
    /// # Errors
    ///
    /// [`LockError::NotInManagedTask`] from an unmanaged caller;
    /// [`LockError::ReadLockHeld`] when the caller holds a read count —
    /// upgrade is not allowed.
    pub fn write_lock(&self) -> Result<(), LockError> {
        let task = current_task_id().ok_or(LockError::NotInManagedTask)?;
        let mut state = self.state.lock();

        if state.writer == Some(task) {
            state.write_depth += 1;
            return Ok(());
        }
        if state.readers.contains_key(&task) {
            return Err(LockError::ReadLockHeld);
        }

        state.writer_waiters += 1;
        while state.writer.is_some() || !state.readers.is_empty() {
            self.writers_cv.wait(&mut state);
        }
        state.writer_waiters -= 1;
        state.writer = Some(task);
        state.write_depth = 1;
        Ok(())
    }

    /// Releases one write depth held by the calling task.
    ///
    /// At depth zero the writer slot is cleared. If the task still holds
    /// read counts the lock continues in read mode; otherwise it becomes
    /// idle and a waiting writer (preferred) or all waiting readers are
    /// released.
    ///
    /// # Errors
    ///
    /// [`LockError::NotInManagedTask`] from an unmanaged caller;
    /// [`LockError::NotLockOwner`] when the task is not the active writer.
    pub fn write_unlock(&self) -> Result<(), LockError> {
        let task = current_task_id().ok_or(LockError::NotInManagedTask)?;
        let mut state = self.state.lock();

        if state.writer != Some(task) {
            return Err(LockError::NotLockOwner);
        }
        state.write_depth -= 1;
        if state.write_depth > 0 {
            return Ok(());
        }

        state.writer = None;
        if state.readers.is_empty() {
            if state.writer_waiters > 0 {
                self.writers_cv.notify_one();
            } else {
                self.readers_cv.notify_all();
            }
        } else if state.writer_waiters == 0 {
            // The demoting task keeps its read counts; other readers may
            // now share with it.
            self.readers_cv.notify_all();
        }
        Ok(())
    }

    #[cfg(test)]
    fn debug_state(&self) -> State {
        self.state.lock().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::launch;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::{mpsc, Arc};
    use std::time::Duration;

    /// Runs `f` inside a managed task and returns its result.
    fn run_in_task<T: Send + 'static>(f: impl FnOnce() -> T + Send + 'static) -> T {
        let (tx, rx) = mpsc::channel();
        launch(move || {
            let _ = tx.send(f());
        });
        rx.recv_timeout(Duration::from_secs(10)).expect("task died")
    }

    #[test]
    fn unmanaged_caller_is_rejected() {
        let lock = TaskRwLock::new();
        assert_eq!(lock.read_lock(), Err(LockError::NotInManagedTask));
        assert_eq!(lock.read_unlock(), Err(LockError::NotInManagedTask));
        assert_eq!(lock.write_lock(), Err(LockError::NotInManagedTask));
        assert_eq!(lock.write_unlock(), Err(LockError::NotInManagedTask));
    }

    #[test]
    fn read_recursion_balances_to_idle() {
        let lock = Arc::new(TaskRwLock::new());
        let task_lock = Arc::clone(&lock);

        run_in_task(move || {
            for _ in 0..5 {
                task_lock.read_lock().unwrap();
            }
            for _ in 0..5 {
                task_lock.read_unlock().unwrap();
            }
        });

        assert!(lock.debug_state().idle());
    }

    #[test]
    fn write_recursion_balances_to_idle() {
        let lock = Arc::new(TaskRwLock::new());
        let task_lock = Arc::clone(&lock);

        run_in_task(move || {
            for _ in 0..3 {
                task_lock.write_lock().unwrap();
            }
            for _ in 0..3 {
                task_lock.write_unlock().unwrap();
            }
        });

        assert!(lock.debug_state().idle());
    }

    #[test]
    fn reader_cannot_upgrade_to_writer() {
        let lock = Arc::new(TaskRwLock::new());
        let task_lock = Arc::clone(&lock);

        let outcome = run_in_task(move || {
            task_lock.read_lock().unwrap();
            let upgrade = task_lock.write_lock();
            task_lock.read_unlock().unwrap();
            upgrade
        });

        assert_eq!(outcome, Err(LockError::ReadLockHeld));
        assert!(lock.debug_state().idle());
    }

    #[test]
    fn writer_can_demote_to_reader() {
        let lock = Arc::new(TaskRwLock::new());
        let task_lock = Arc::clone(&lock);

        run_in_task(move || {
            task_lock.write_lock().unwrap();
            task_lock.read_lock().unwrap();
            // Mode stays write while the depth is held.
            task_lock.read_unlock().unwrap();
            task_lock.write_unlock().unwrap();
        });

        assert!(lock.debug_state().idle());
    }

    #[test]
    fn demoted_writer_keeps_read_mode_after_write_unlock() {
        let lock = Arc::new(TaskRwLock::new());
        let task_lock = Arc::clone(&lock);

        run_in_task(move || {
            task_lock.write_lock().unwrap();
            task_lock.read_lock().unwrap();
            task_lock.write_unlock().unwrap();

            // Write depth is gone but our read count remains.
            assert_eq!(task_lock.write_lock(), Err(LockError::ReadLockHeld));
            task_lock.read_unlock().unwrap();
        });

        assert!(lock.debug_state().idle());
    }

    #[test]
    fn unlock_without_hold_is_not_lock_owner() {
        let lock = Arc::new(TaskRwLock::new());
        let task_lock = Arc::clone(&lock);

        let (read, write) = run_in_task(move || (task_lock.read_unlock(), task_lock.write_unlock()));
        assert_eq!(read, Err(LockError::NotLockOwner));
        assert_eq!(write, Err(LockError::NotLockOwner));
    }

    #[test]
    fn writers_exclude_each_other() {
        let lock = Arc::new(TaskRwLock::new());
        let in_critical = Arc::new(AtomicBool::new(false));
        let overlap = Arc::new(AtomicBool::new(false));
        let (done_tx, done_rx) = mpsc::channel();

        for _ in 0..2 {
            let lock = Arc::clone(&lock);
            let in_critical = Arc::clone(&in_critical);
            let overlap = Arc::clone(&overlap);
            let done_tx = done_tx.clone();
            launch(move || {
                for _ in 0..50 {
                    lock.write_lock().unwrap();
                    if in_critical.swap(true, Ordering::SeqCst) {
                        overlap.store(true, Ordering::SeqCst);
                    }
                    std::thread::yield_now();
                    in_critical.store(false, Ordering::SeqCst);
                    lock.write_unlock().unwrap();
                }
                let _ = done_tx.send(());
            });
        }

        for _ in 0..2 {
            done_rx
                .recv_timeout(Duration::from_secs(10))
                .expect("writer task did not finish");
        }
        assert!(!overlap.load(Ordering::SeqCst));
        assert!(lock.debug_state().idle());
    }

    #[test]
    fn waiting_writer_blocks_new_readers() {
        let lock = Arc::new(TaskRwLock::new());
        let (holder_ready_tx, holder_ready_rx) = mpsc::channel();
        let (release_tx, release_rx) = mpsc::channel::<()>();

        // A reader parks while holding the lock.
        let holder_lock = Arc::clone(&lock);
        launch(move || {
            holder_lock.read_lock().unwrap();
            let _ = holder_ready_tx.send(());
            let _ = release_rx.recv();
            holder_lock.read_unlock().unwrap();
        });
        holder_ready_rx
            .recv_timeout(Duration::from_secs(5))
            .expect("holder did not start");

        // A writer queues behind the reader.
        let (writer_done_tx, writer_done_rx) = mpsc::channel();
        let writer_lock = Arc::clone(&lock);
        launch(move || {
            writer_lock.write_lock().unwrap();
            writer_lock.write_unlock().unwrap();
            let _ = writer_done_tx.send(());
        });

        // Wait until the writer is registered as waiting.
        let deadline = std::time::Instant::now() + Duration::from_secs(5);
        while lock.debug_state().writer_waiters == 0 {
            assert!(std::time::Instant::now() < deadline, "writer never queued");
            std::thread::sleep(Duration::from_millis(5));
        }

        // A fresh reader must now queue behind the writer.
        let (reader_done_tx, reader_done_rx) = mpsc::channel();
        let reader_lock = Arc::clone(&lock);
        launch(move || {
            reader_lock.read_lock().unwrap();
            reader_lock.read_unlock().unwrap();
            let _ = reader_done_tx.send(());
        });

        assert!(
            reader_done_rx.recv_timeout(Duration::from_millis(200)).is_err(),
            "reader bypassed a waiting writer"
        );

        drop(release_tx);
        writer_done_rx
            .recv_timeout(Duration::from_secs(10))
            .expect("writer never acquired");
        reader_done_rx
            .recv_timeout(Duration::from_secs(10))
            .expect("reader never acquired after writer");
        assert!(lock.debug_state().idle());
    }

    #[test]
    fn lock_error_display() {
        assert!(LockError::NotInManagedTask.to_string().contains("managed task"));
        assert!(LockError::ReadLockHeld.to_string().contains("upgrade"));
        assert!(LockError::NotLockOwner.to_string().contains("hold"));
    }
}
