//! Timer scheduling
//!
//! The sampling loop never touches platform timers directly. It asks a
//! [`Scheduler`] to run a task after a delay and keeps the returned handle
//! for cancellation. [`TokioScheduler`] runs on real time;
//! [`ManualScheduler`] runs on virtual time that only moves when
//! [`ManualScheduler::advance`] is called.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::AbortHandle;
use tracing::trace;

/// A deferred unit of work
pub type Task = Box<dyn FnOnce() + Send + 'static>;

/// Identifies a scheduled task for cancellation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TaskHandle(u64);

impl TaskHandle {
    pub fn id(&self) -> u64 {
        self.0
    }
}

/// Runs tasks after a delay
pub trait Scheduler: Send + Sync {
    /// Run `task` once after `delay`
    fn schedule(&self, delay: Duration, task: Task) -> TaskHandle;

    /// Prevent a pending task from running; unknown or finished handles are ignored
    fn cancel(&self, handle: TaskHandle);
}

// ============================================================================
// Tokio-backed scheduler
// ============================================================================

/// Scheduler backed by tokio timers
///
/// A task only runs if it is still registered when its timer fires, so a
/// cancel that races the timer always wins.
pub struct TokioScheduler {
    runtime: Handle,
    next_id: AtomicU64,
    tasks: Arc<Mutex<HashMap<u64, Option<AbortHandle>>>>,
}

impl TokioScheduler {
    /// Scheduler on the current tokio runtime
    ///
    /// # Panics
    /// Panics when called outside a tokio runtime.
    pub fn new() -> Self {
        Self::with_handle(Handle::current())
    }

    pub fn with_handle(runtime: Handle) -> Self {
        Self {
            runtime,
            next_id: AtomicU64::new(1),
            tasks: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Number of tasks that have neither fired nor been cancelled
    pub fn pending(&self) -> usize {
        self.tasks.lock().len()
    }
}

impl Default for TokioScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Scheduler for TokioScheduler {
    fn schedule(&self, delay: Duration, task: Task) -> TaskHandle {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.tasks.lock().insert(id, None);

        let tasks = Arc::clone(&self.tasks);
        let join = self.runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            let registered = tasks.lock().remove(&id).is_some();
            if registered {
                task();
            }
        });

        if let Some(slot) = self.tasks.lock().get_mut(&id) {
            *slot = Some(join.abort_handle());
        }

        trace!(task_id = id, delay_ms = delay.as_millis() as u64, "Task scheduled");
        TaskHandle(id)
    }

    fn cancel(&self, handle: TaskHandle) {
        if let Some(abort) = self.tasks.lock().remove(&handle.0) {
            if let Some(abort) = abort {
                abort.abort();
            }
            trace!(task_id = handle.0, "Task cancelled");
        }
    }
}

// ============================================================================
// Virtual-time scheduler
// ============================================================================

struct PendingTask {
    id: u64,
    due: Duration,
    task: Task,
}

#[derive(Default)]
struct ManualState {
    now: Duration,
    next_id: u64,
    pending: Vec<PendingTask>,
}

/// Scheduler on virtual time
///
/// Tasks run on the thread calling [`advance`](ManualScheduler::advance), in
/// due order (ties in scheduling order). The internal lock is released while
/// a task runs, so tasks may schedule or cancel other tasks.
#[derive(Default)]
pub struct ManualScheduler {
    state: Mutex<ManualState>,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Virtual time elapsed since creation
    pub fn elapsed(&self) -> Duration {
        self.state.lock().now
    }

    /// Number of tasks waiting to run
    pub fn pending(&self) -> usize {
        self.state.lock().pending.len()
    }

    /// Move virtual time forward, running every task that comes due
    ///
    /// Returns the number of tasks that ran.
    pub fn advance(&self, by: Duration) -> usize {
        let target = self.state.lock().now + by;
        let mut ran = 0;

        loop {
            let next = {
                let mut state = self.state.lock();
                let position = state
                    .pending
                    .iter()
                    .enumerate()
                    .filter(|(_, p)| p.due <= target)
                    .min_by_key(|(_, p)| (p.due, p.id))
                    .map(|(i, _)| i);

                match position {
                    Some(i) => {
                        let pending = state.pending.swap_remove(i);
                        state.now = pending.due;
                        Some(pending)
                    }
                    None => {
                        state.now = target;
                        None
                    }
                }
            };

            match next {
                Some(pending) => {
                    (pending.task)();
                    ran += 1;
                }
                None => break,
            }
        }

        ran
    }
}

impl Scheduler for ManualScheduler {
    fn schedule(&self, delay: Duration, task: Task) -> TaskHandle {
        let mut state = self.state.lock();
        state.next_id += 1;
        let id = state.next_id;
        let due = state.now + delay;
        state.pending.push(PendingTask { id, due, task });
        TaskHandle(id)
    }

    fn cancel(&self, handle: TaskHandle) {
        self.state.lock().pending.retain(|p| p.id != handle.0);
    }
}
