// src/pipeline/mod.rs

//! Task Pipeline: compile, then test, then maybe submit.
//!
//! Each stage runs as its own background task on a [`BackgroundExecutor`].
//! Stages are strictly sequential: the next one is started only after the
//! previous task's listener has fired and its handle has been joined, so any
//! temporary file owned by a stage is gone before the next stage begins.
//!
//! Failures are reported to the error collaborator exactly once and stop the
//! chain. Cancellation is not an error: the running stage is aborted, its
//! resources are released and the pipeline returns to `Idle` silently.

use std::sync::Arc;

use anyhow::anyhow;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::collab::Collaborators;
use crate::config::{PipelineSettings, ProjectDescriptor};
use crate::errors::{ExerunError, Result};
use crate::exec::{outcome_channel, BackgroundExecutor, ExecutionBackend, TaskOutcome};
use crate::fs::{FileSystem, RealFileSystem};
use crate::results::TestRunResult;

pub mod compile;
pub mod discovery;
pub mod state;
pub mod test_stage;

pub use state::{PipelineState, StateTracker};
pub use test_stage::TestStage;

pub const COMPILE_FAILED_MESSAGE: &str = "The code did not compile.";
pub const COMPILE_ERROR_MESSAGE: &str = "Failed to compile the code.";
pub const TEST_RUN_FAILED_MESSAGE: &str = "Failed to run the tests.";
pub const RESULT_READ_FAILED_MESSAGE: &str = "Failed to read the test results.";

/// Terminal outcome of one pipeline invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineOutcome {
    CompileFailed(String),
    TestRunFailed(String),
    Completed {
        result: TestRunResult,
        submitted: bool,
    },
    Cancelled,
}

impl PipelineOutcome {
    /// `true` when tests ran and every case passed.
    pub fn is_success(&self) -> bool {
        matches!(self, PipelineOutcome::Completed { result, .. } if result.all_passed())
    }
}

/// Outcome plus every state the pipeline went through.
#[derive(Debug, Clone)]
pub struct PipelineReport {
    pub outcome: PipelineOutcome,
    pub states: Vec<PipelineState>,
}

/// One compile/test/submit invocation for one project.
pub struct Pipeline {
    project: ProjectDescriptor,
    settings: PipelineSettings,
    backend: Arc<dyn ExecutionBackend>,
    collab: Collaborators,
    fs: Arc<dyn FileSystem>,
}

impl Pipeline {
    pub fn new(
        project: ProjectDescriptor,
        settings: PipelineSettings,
        backend: Arc<dyn ExecutionBackend>,
        collab: Collaborators,
    ) -> Self {
        Self {
            project,
            settings,
            backend,
            collab,
            fs: Arc::new(RealFileSystem),
        }
    }

    pub fn with_fs(mut self, fs: Arc<dyn FileSystem>) -> Self {
        self.fs = fs;
        self
    }

    pub fn project(&self) -> &ProjectDescriptor {
        &self.project
    }

    /// Test stage as this pipeline would build it.
    pub fn test_stage(&self) -> TestStage {
        TestStage::new(
            self.project.clone(),
            self.settings.clone(),
            Arc::clone(&self.backend),
            Arc::clone(&self.fs),
            Arc::clone(&self.collab.output),
        )
    }

    /// Run to completion on the current task. Not cancellable.
    pub async fn run(self, executor: &BackgroundExecutor) -> PipelineReport {
        let (_cancel_tx, cancel_rx) = watch::channel(false);
        self.drive(executor, cancel_rx).await
    }

    /// Run in the background; the returned handle can cancel it.
    pub fn spawn(self, executor: BackgroundExecutor) -> PipelineHandle {
        let (cancel_tx, cancel_rx) = watch::channel(false);
        let join = tokio::spawn(async move { self.drive(&executor, cancel_rx).await });
        PipelineHandle { cancel_tx, join }
    }

    async fn drive(
        self,
        executor: &BackgroundExecutor,
        mut cancel: watch::Receiver<bool>,
    ) -> PipelineReport {
        let mut states = StateTracker::new(self.project.name.clone());
        let outcome = match self.drive_stages(executor, &mut cancel, &mut states).await {
            Ok(outcome) => outcome,
            Err(err) => {
                // Only an illegal state transition lands here.
                warn!(project = %self.project.name, error = %err, "pipeline aborted");
                self.collab.errors.display_error(TEST_RUN_FAILED_MESSAGE, Some(&err));
                PipelineOutcome::TestRunFailed(err.user_message())
            }
        };
        info!(project = %self.project.name, outcome = outcome_label(&outcome), "pipeline finished");
        PipelineReport {
            outcome,
            states: states.into_history(),
        }
    }

    async fn drive_stages(
        &self,
        executor: &BackgroundExecutor,
        cancel: &mut watch::Receiver<bool>,
        states: &mut StateTracker,
    ) -> Result<PipelineOutcome> {
        info!(project = %self.project.name, kind = %self.project.kind, "pipeline started");

        // Compile.
        states.advance(PipelineState::Compiling)?;
        let backend = Arc::clone(&self.backend);
        let project = self.project.clone();
        let compile_work = async move { Ok::<_, anyhow::Error>(backend.compile(&project).await?) };
        let compiled = match run_stage(executor, "compiling", compile_work, cancel).await {
            TaskOutcome::Ready(result) if result.success() => result,
            TaskOutcome::Ready(result) => {
                states.advance(PipelineState::CompileFailed)?;
                let diagnostics = if result.stderr.trim().is_empty() {
                    result.stdout
                } else {
                    result.stderr
                };
                let err = ExerunError::ToolFailed {
                    stage: "compilation".to_string(),
                    status: result.status,
                    diagnostics,
                };
                return self.fail_compile(states, COMPILE_FAILED_MESSAGE, err);
            }
            TaskOutcome::Failed(cause) => {
                states.advance(PipelineState::CompileFailed)?;
                let err = ExerunError::from_task_error(cause);
                return self.fail_compile(states, COMPILE_ERROR_MESSAGE, err);
            }
            TaskOutcome::Cancelled => return self.cancelled(states),
        };
        info!(project = %self.project.name, exit_code = compiled.status, "compilation succeeded");

        // Test.
        states.advance(PipelineState::Testing)?;
        let stage = self.test_stage();
        let test_work = async move { Ok::<_, anyhow::Error>(stage.run().await?) };
        let result = match run_stage(executor, "running tests", test_work, cancel).await {
            TaskOutcome::Ready(result) => result,
            TaskOutcome::Failed(cause) => {
                states.advance(PipelineState::TestRunFailed)?;
                let err = ExerunError::from_task_error(cause);
                let headline = match &err {
                    ExerunError::ResultFormat(_) => RESULT_READ_FAILED_MESSAGE,
                    _ => TEST_RUN_FAILED_MESSAGE,
                };
                self.collab.errors.display_error(headline, Some(&err));
                states.advance(PipelineState::Idle)?;
                return Ok(PipelineOutcome::TestRunFailed(format!(
                    "{headline}\n{}",
                    err.user_message()
                )));
            }
            TaskOutcome::Cancelled => return self.cancelled(states),
        };

        // Display, then maybe submit.
        states.advance(PipelineState::ResultsReady)?;
        info!(
            project = %self.project.name,
            status = ?result.status(),
            cases = result.cases().len(),
            failed = result.failed_count(),
            "test results ready"
        );
        let submit_requested = self.collab.display.show_test_run_result(&result);
        if submit_requested {
            states.advance(PipelineState::Submitting)?;
            info!(project = %self.project.name, "submitting");
            self.collab.submitter.submit(&self.project);
        }
        states.advance(PipelineState::Idle)?;

        Ok(PipelineOutcome::Completed {
            result,
            submitted: submit_requested,
        })
    }

    fn fail_compile(
        &self,
        states: &mut StateTracker,
        headline: &str,
        err: ExerunError,
    ) -> Result<PipelineOutcome> {
        self.collab.errors.display_error(headline, Some(&err));
        states.advance(PipelineState::Idle)?;
        Ok(PipelineOutcome::CompileFailed(format!(
            "{headline}\n{}",
            err.user_message()
        )))
    }

    fn cancelled(&self, states: &mut StateTracker) -> Result<PipelineOutcome> {
        info!(project = %self.project.name, stage = %states.current(), "pipeline cancelled");
        states.advance(PipelineState::Idle)?;
        Ok(PipelineOutcome::Cancelled)
    }
}

fn outcome_label(outcome: &PipelineOutcome) -> &'static str {
    match outcome {
        PipelineOutcome::CompileFailed(_) => "compile-failed",
        PipelineOutcome::TestRunFailed(_) => "test-run-failed",
        PipelineOutcome::Completed { .. } => "completed",
        PipelineOutcome::Cancelled => "cancelled",
    }
}

/// Start one stage and wait for its terminal outcome, forwarding a
/// cancellation request to the task if one arrives first.
async fn run_stage<T, F>(
    executor: &BackgroundExecutor,
    name: &str,
    work: F,
    cancel: &mut watch::Receiver<bool>,
) -> TaskOutcome<T>
where
    T: Send + 'static,
    F: std::future::Future<Output = anyhow::Result<T>> + Send + 'static,
{
    let already_cancelled = *cancel.borrow();
    if already_cancelled {
        return TaskOutcome::Cancelled;
    }

    let (listener, mut rx) = outcome_channel::<T>();
    let mut handle = executor.start(name, work, listener);

    let received = tokio::select! {
        outcome = &mut rx => outcome,
        _ = cancel_requested(cancel) => {
            handle.cancel();
            (&mut rx).await
        }
    };
    handle.join().await;

    received.unwrap_or_else(|_| TaskOutcome::Failed(anyhow!("stage '{name}' ended without an outcome")))
}

/// Resolves once cancellation is requested; never resolves if the sender is
/// gone without requesting it.
async fn cancel_requested(cancel: &mut watch::Receiver<bool>) {
    let sender_gone = cancel.wait_for(|requested| *requested).await.is_err();
    if sender_gone {
        std::future::pending::<()>().await;
    }
}

/// Handle to a pipeline started with [`Pipeline::spawn`].
#[derive(Debug)]
pub struct PipelineHandle {
    cancel_tx: watch::Sender<bool>,
    join: JoinHandle<PipelineReport>,
}

impl PipelineHandle {
    /// Ask the running stage to stop. No effect once the pipeline finished.
    pub fn cancel(&self) {
        let _ = self.cancel_tx.send(true);
    }

    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }

    /// Wait for the pipeline to finish.
    pub async fn join(self) -> Result<PipelineReport> {
        finished(self.join.await)
    }

    /// Wait for the pipeline to finish, cancelling it if `signal` resolves
    /// first.
    pub async fn join_or_cancel_on<S>(self, signal: S) -> Result<PipelineReport>
    where
        S: std::future::Future<Output = ()>,
    {
        let PipelineHandle {
            cancel_tx,
            mut join,
        } = self;
        tokio::select! {
            joined = &mut join => return finished(joined),
            _ = signal => {
                info!("cancelling pipeline");
                let _ = cancel_tx.send(true);
            }
        }
        finished(join.await)
    }
}

fn finished(
    joined: std::result::Result<PipelineReport, tokio::task::JoinError>,
) -> Result<PipelineReport> {
    joined.map_err(|err| ExerunError::Other(anyhow!("pipeline task failed: {err}")))
}
