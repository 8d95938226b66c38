// src/collab/console.rs

//! Console implementations of the collaborator traits, used by the binary.
//!
//! Results go to stdout, errors to stderr. Live process output is written to
//! stdout prefixed with the project name.

use std::io::Write;
use std::sync::{Arc, Mutex};

use tracing::{info, warn};

use crate::config::{ProjectDescriptor, SubmitSection};
use crate::errors::ExerunError;
use crate::exec::{
    BackgroundExecutor, CommandSpec, ProcessResult, ProcessRunner, TaskHandle, TaskOutcome,
};
use crate::results::{TestRunResult, TestRunStatus, ValidationResult};

use super::{Collaborators, ErrorReporter, OutputSink, ResultDisplay, Submitter};

/// Prints results as text or JSON.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsoleDisplay {
    json: bool,
    auto_submit: bool,
}

impl ConsoleDisplay {
    pub fn new(json: bool, auto_submit: bool) -> Self {
        Self { json, auto_submit }
    }
}

impl ResultDisplay for ConsoleDisplay {
    fn show_test_run_result(&self, result: &TestRunResult) -> bool {
        if self.json {
            print_json(result);
        } else {
            print!("{}", render_test_run(result));
        }
        self.auto_submit && result.status() == TestRunStatus::Passed
    }

    fn show_validation_result(&self, result: &ValidationResult) {
        if self.json {
            print_json(result);
        } else {
            print!("{}", render_validation(result));
        }
    }
}

fn print_json<T: serde::Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(text) => println!("{text}"),
        Err(err) => warn!(error = %err, "could not serialize result"),
    }
}

/// Human-readable rendering of a test run.
pub fn render_test_run(result: &TestRunResult) -> String {
    let mut out = String::new();
    if result.status() == TestRunStatus::CompileFailed {
        out.push_str("Compilation failed.\n");
        return out;
    }

    let total = result.cases().len();
    let passed = total - result.failed_count();
    out.push_str(&format!("Test results: {passed}/{total} passed\n"));
    for case in result.cases() {
        let mark = if case.successful { "PASS" } else { "FAIL" };
        match &case.message {
            Some(msg) if !case.successful => {
                out.push_str(&format!("  {mark}  {}: {msg}\n", case.name))
            }
            _ => out.push_str(&format!("  {mark}  {}\n", case.name)),
        }
        if !case.successful {
            for frame in &case.stack_trace {
                out.push_str(&format!("          {frame}\n"));
            }
        }
    }
    out
}

/// Human-readable rendering of a style check.
pub fn render_validation(result: &ValidationResult) -> String {
    let mut out = String::new();
    if result.violations.is_empty() {
        out.push_str("Style check: no violations\n");
        return out;
    }
    out.push_str(&format!(
        "Style check: {} violation(s) [{:?}]\n",
        result.violations.len(),
        result.strategy
    ));
    for v in &result.violations {
        out.push_str(&format!(
            "  {}:{}:{}: {}\n",
            v.file.display(),
            v.line,
            v.column,
            v.message
        ));
    }
    out
}

/// Writes errors to stderr.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsoleErrors;

impl ErrorReporter for ConsoleErrors {
    fn display_error(&self, message: &str, cause: Option<&ExerunError>) {
        match cause {
            Some(cause) => eprintln!("error: {message}\n{}", cause.user_message()),
            None => eprintln!("error: {message}"),
        }
    }
}

/// Streams process output to stdout as `[project] line`.
#[derive(Debug, Clone, Copy, Default)]
pub struct StdoutSink;

impl OutputSink for StdoutSink {
    fn append(&self, channel: &str, line: &str) {
        let mut stdout = std::io::stdout().lock();
        let _ = writeln!(stdout, "[{channel}] {line}");
    }
}

/// Submits by running an external command in the project directory.
///
/// Submissions run in the background; [`CommandSubmitter::finish`] waits for
/// the ones still in flight.
#[derive(Debug)]
pub struct CommandSubmitter {
    cmd: Vec<String>,
    executor: BackgroundExecutor,
    pending: Mutex<Vec<TaskHandle>>,
}

impl CommandSubmitter {
    pub fn new(section: &SubmitSection, executor: BackgroundExecutor) -> Self {
        Self {
            cmd: section.cmd.clone(),
            executor,
            pending: Mutex::new(Vec::new()),
        }
    }

    pub async fn finish(&self) {
        let handles: Vec<TaskHandle> = {
            let mut pending = self.pending.lock().unwrap_or_else(|p| p.into_inner());
            std::mem::take(&mut *pending)
        };
        for handle in handles {
            handle.join().await;
        }
    }
}

impl Submitter for CommandSubmitter {
    fn submit(&self, project: &ProjectDescriptor) {
        let Some((program, args)) = self.cmd.split_first() else {
            warn!(project = %project.name, "submit command is empty");
            return;
        };
        let spec = CommandSpec::new(program, &project.root).args(args.iter().cloned());
        let name = project.name.clone();
        info!(project = %name, command = %spec, "starting submission");

        let work = async move { Ok::<_, anyhow::Error>(ProcessRunner::new(spec).run().await?) };
        let listener = move |outcome: TaskOutcome<ProcessResult>| match outcome {
            TaskOutcome::Ready(result) if result.success() => {
                println!("Submitted {name}.");
            }
            TaskOutcome::Ready(result) => {
                eprintln!(
                    "error: submission of {name} failed with exit status {}\n{}",
                    result.status,
                    result.stderr.trim_end()
                );
            }
            TaskOutcome::Failed(err) => eprintln!("error: submission of {name} failed: {err}"),
            TaskOutcome::Cancelled => {}
        };

        let handle = self.executor.start("submitting", work, listener);
        self.pending
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .push(handle);
    }
}

/// Used when no `[submit]` section is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoSubmitter;

impl Submitter for NoSubmitter {
    fn submit(&self, project: &ProjectDescriptor) {
        warn!(project = %project.name, "submission requested but no submit command is configured");
    }
}

/// Console collaborators for the binary. Returns the bundle plus the command
/// submitter, when one is configured, so the caller can wait for it.
pub fn console_collaborators(
    json: bool,
    submit: Option<&SubmitSection>,
    executor: &BackgroundExecutor,
) -> (Collaborators, Option<Arc<CommandSubmitter>>) {
    let command_submitter =
        submit.map(|section| Arc::new(CommandSubmitter::new(section, executor.clone())));
    let submitter: Arc<dyn Submitter> = match &command_submitter {
        Some(s) => Arc::clone(s) as Arc<dyn Submitter>,
        None => Arc::new(NoSubmitter),
    };
    let auto_submit = submit.is_some_and(|s| s.auto);

    let collab = Collaborators {
        display: Arc::new(ConsoleDisplay::new(json, auto_submit)),
        submitter,
        errors: Arc::new(ConsoleErrors),
        output: Arc::new(StdoutSink),
    };
    (collab, command_submitter)
}
