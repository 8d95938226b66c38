// src/exec/task.rs

//! Background Task Executor.
//!
//! [`BackgroundExecutor::start`] runs a unit of work on the Tokio runtime and
//! returns immediately. Exactly one [`TaskOutcome`] reaches the listener:
//!
//! - `Ready(value)` when the work returns `Ok`,
//! - `Failed(cause)` when it returns `Err` or panics,
//! - `Cancelled` when [`TaskHandle::cancel`] stopped it first.
//!
//! The listener is consumed by value, so a second delivery cannot type-check.
//! Cancellation is cooperative: the work is aborted at its next `.await`; if
//! it already finished, its own result is delivered instead. An aborted unit
//! of work is dropped before the listener runs, so anything it owns (child
//! processes, temporary files) is cleaned up first.

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use anyhow::anyhow;
use tokio::sync::oneshot;
use tokio::task::{JoinError, JoinHandle};
use tracing::{debug, error, info};

/// Terminal outcome of one background task.
pub enum TaskOutcome<T> {
    Ready(T),
    Failed(anyhow::Error),
    Cancelled,
}

impl<T> TaskOutcome<T> {
    pub fn kind(&self) -> &'static str {
        match self {
            TaskOutcome::Ready(_) => "ready",
            TaskOutcome::Failed(_) => "failed",
            TaskOutcome::Cancelled => "cancelled",
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, TaskOutcome::Ready(_))
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, TaskOutcome::Cancelled)
    }
}

impl<T: fmt::Debug> fmt::Debug for TaskOutcome<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskOutcome::Ready(v) => f.debug_tuple("Ready").field(v).finish(),
            TaskOutcome::Failed(e) => f.debug_tuple("Failed").field(e).finish(),
            TaskOutcome::Cancelled => f.write_str("Cancelled"),
        }
    }
}

/// Receives the single terminal outcome of a task.
pub trait TaskListener<T>: Send + 'static {
    fn on_outcome(self, outcome: TaskOutcome<T>);
}

impl<T, F> TaskListener<T> for F
where
    F: FnOnce(TaskOutcome<T>) + Send + 'static,
{
    fn on_outcome(self, outcome: TaskOutcome<T>) {
        self(outcome)
    }
}

/// Listener that forwards the outcome into a oneshot channel, for callers
/// that want to `.await` it. A dropped receiver is not an error.
pub fn outcome_channel<T: Send + 'static>()
-> (impl TaskListener<T>, oneshot::Receiver<TaskOutcome<T>>) {
    let (tx, rx) = oneshot::channel();
    let listener = move |outcome: TaskOutcome<T>| {
        let _ = tx.send(outcome);
    };
    (listener, rx)
}

/// Spawns units of work and supervises their terminal outcome.
///
/// Cheap to clone. Tasks are independent: the name is for diagnostics only
/// and two tasks with the same name do not interact.
#[derive(Debug, Clone, Default)]
pub struct BackgroundExecutor {
    active: Arc<AtomicUsize>,
}

impl BackgroundExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of tasks whose listener has not fired yet.
    pub fn active_tasks(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }

    /// Schedule `work` and return without waiting for it.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn start<T, F, L>(&self, name: impl Into<String>, work: F, listener: L) -> TaskHandle
    where
        T: Send + 'static,
        F: Future<Output = anyhow::Result<T>> + Send + 'static,
        L: TaskListener<T>,
    {
        let name = name.into();
        let (cancel_tx, cancel_rx) = oneshot::channel::<()>();

        let active = Arc::clone(&self.active);
        active.fetch_add(1, Ordering::SeqCst);

        let task_name = name.clone();
        let supervisor = tokio::spawn(async move {
            debug!(task = %task_name, "background task started");
            let outcome = supervise(&task_name, work, cancel_rx).await;
            active.fetch_sub(1, Ordering::SeqCst);

            match &outcome {
                TaskOutcome::Failed(err) => {
                    info!(task = %task_name, error = %err, "background task failed")
                }
                other => info!(task = %task_name, outcome = other.kind(), "background task finished"),
            }

            listener.on_outcome(outcome);
        });

        TaskHandle {
            name,
            cancel: Some(cancel_tx),
            supervisor,
        }
    }
}

/// Race the work against a cancellation request.
async fn supervise<T, F>(
    name: &str,
    work: F,
    mut cancel_rx: oneshot::Receiver<()>,
) -> TaskOutcome<T>
where
    T: Send + 'static,
    F: Future<Output = anyhow::Result<T>> + Send + 'static,
{
    let mut worker = tokio::spawn(work);

    tokio::select! {
        joined = &mut worker => outcome_from_join(name, joined),

        cancel = &mut cancel_rx => {
            match cancel {
                Ok(()) => {
                    info!(task = %name, "cancellation requested; aborting unit of work");
                    worker.abort();
                }
                Err(_) => {
                    // Handle dropped without cancelling: the task is detached.
                    debug!(task = %name, "task handle dropped; running to completion");
                }
            }
            outcome_from_join(name, worker.await)
        }
    }
}

fn outcome_from_join<T>(
    name: &str,
    joined: Result<anyhow::Result<T>, JoinError>,
) -> TaskOutcome<T> {
    match joined {
        Ok(Ok(value)) => TaskOutcome::Ready(value),
        Ok(Err(err)) => TaskOutcome::Failed(err),
        Err(err) if err.is_cancelled() => TaskOutcome::Cancelled,
        Err(err) => {
            error!(task = %name, error = %err, "unit of work panicked");
            TaskOutcome::Failed(anyhow!("task '{name}' panicked: {err}"))
        }
    }
}

/// Handle to a started task.
///
/// Dropping the handle detaches the task; it keeps running and its listener
/// still fires.
pub struct TaskHandle {
    name: String,
    cancel: Option<oneshot::Sender<()>>,
    supervisor: JoinHandle<()>,
}

impl fmt::Debug for TaskHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskHandle")
            .field("name", &self.name)
            .field("finished", &self.supervisor.is_finished())
            .finish()
    }
}

impl TaskHandle {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Request cancellation. Returns `false` if a request was already sent or
    /// the task has already reached its terminal state.
    pub fn cancel(&mut self) -> bool {
        match self.cancel.take() {
            Some(tx) => tx.send(()).is_ok(),
            None => false,
        }
    }

    /// `true` once the listener has been called.
    pub fn is_finished(&self) -> bool {
        self.supervisor.is_finished()
    }

    /// Wait until the listener has been called.
    pub async fn join(self) {
        let TaskHandle {
            name,
            cancel,
            supervisor,
        } = self;
        // Keep the cancel sender alive so joining does not count as detaching.
        let _cancel = cancel;
        if let Err(err) = supervisor.await {
            error!(task = %name, error = %err, "task listener panicked");
        }
    }
}
