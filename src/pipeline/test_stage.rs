// src/pipeline/test_stage.rs

//! The test stage: run the project's tests and normalize the result.
//!
//! Depending on [`TestExecution`] the tests are either run by the project's
//! own runner process or by the execution backend. Temporary files created
//! here are owned by a [`ScratchFile`] guard, so they are removed on every
//! path out of [`TestStage::run`], including the unit of work being aborted.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tempfile::TempPath;
use tracing::{debug, info, warn};

use crate::collab::OutputSink;
use crate::config::{PipelineSettings, ProjectDescriptor, ToolsSection};
use crate::errors::{ExerunError, Result};
use crate::exec::{CommandSpec, ExecutionBackend, ProcessResult, ProcessRunner};
use crate::fs::FileSystem;
use crate::pipeline::compile::{managed_properties, BuildInvocation, MANAGED_TEST_GOAL};
use crate::pipeline::discovery::{find_test_dir, find_test_methods, runner_classpath};
use crate::results::{normalize_backend_result, parse_native_output, parse_runner_file, TestRunResult};
use crate::types::{ProjectKind, TestExecution, ValgrindStrategy};

pub const RUNNER_MAIN_CLASS: &str = "fi.helsinki.cs.tmc.testrunner.Main";
pub const MANAGED_RESULTS_FILE: &str = "target/test_output.txt";
pub const NATIVE_TEST_BINARY: &str = "test/test";
pub const NO_BACKEND_RESULT: &str = "execution backend produced no result";

/// Temporary file removed when dropped.
struct ScratchFile {
    path: TempPath,
}

impl ScratchFile {
    fn create(prefix: &str, suffix: &str) -> Result<Self> {
        let path = tempfile::Builder::new()
            .prefix(prefix)
            .suffix(suffix)
            .tempfile()?
            .into_temp_path();
        debug!(path = %path.display(), "created temporary file");
        Ok(Self { path })
    }

    fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for ScratchFile {
    fn drop(&mut self) {
        debug!(path = %self.path.display(), "removing temporary file");
    }
}

/// Bundled-runner command for a simple project.
pub fn simple_runner_command(
    project: &ProjectDescriptor,
    tools: &ToolsSection,
    fs: &dyn FileSystem,
    results_file: &Path,
) -> Result<CommandSpec> {
    let test_dir = find_test_dir(project, fs)
        .ok_or_else(|| ExerunError::Config("No test directory in project".to_string()))?;
    let tests = find_test_methods(fs, &test_dir)?;
    let classpath = runner_classpath(project, fs)?;

    let mut spec = CommandSpec::new(&tools.java, &project.root)
        .arg("-cp")
        .arg(classpath)
        .arg(format!("-Dtmc.test_class_dir={}", test_dir.display()))
        .arg(format!("-Dtmc.results_file={}", results_file.display()));
    if let Some(limit) = project.memory_limit {
        spec = spec.arg(format!("-Xmx{limit}M"));
    }
    Ok(spec
        .arg(RUNNER_MAIN_CLASS)
        .args(tests.iter().map(ToString::to_string)))
}

/// Test goal for a managed project.
pub fn managed_test_command(project: &ProjectDescriptor, tools: &ToolsSection) -> CommandSpec {
    BuildInvocation::Goal {
        tool: tools.mvn.clone(),
        goals: vec![MANAGED_TEST_GOAL.to_string()],
        properties: managed_properties(project),
    }
    .to_command(&project.root)
}

/// Test binary of a native project, wrapped in Valgrind when a log file is
/// given.
pub fn native_test_command(
    project: &ProjectDescriptor,
    tools: &ToolsSection,
    valgrind_log: Option<&Path>,
) -> CommandSpec {
    let binary = project.root.join(NATIVE_TEST_BINARY);
    let spec = match valgrind_log {
        Some(log) => CommandSpec::new(&tools.valgrind, &project.root)
            .arg("--leak-check=full")
            .arg(format!("--log-file={}", log.display()))
            .arg(binary.to_string_lossy()),
        None => CommandSpec::new(binary.to_string_lossy(), &project.root),
    };
    spec.env("CK_VERBOSITY", "verbose")
}

pub struct TestStage {
    project: ProjectDescriptor,
    settings: PipelineSettings,
    backend: Arc<dyn ExecutionBackend>,
    fs: Arc<dyn FileSystem>,
    output: Arc<dyn OutputSink>,
}

impl TestStage {
    pub fn new(
        project: ProjectDescriptor,
        settings: PipelineSettings,
        backend: Arc<dyn ExecutionBackend>,
        fs: Arc<dyn FileSystem>,
        output: Arc<dyn OutputSink>,
    ) -> Self {
        Self {
            project,
            settings,
            backend,
            fs,
            output,
        }
    }

    /// The command the runner path would execute, with placeholder paths for
    /// temporary files. `None` when tests run through the execution backend.
    pub fn planned_command(&self) -> Result<Option<CommandSpec>> {
        if self.settings.test_execution == TestExecution::Backend {
            return Ok(None);
        }
        let tools = &self.settings.tools;
        let spec = match self.project.kind {
            ProjectKind::Simple => simple_runner_command(
                &self.project,
                tools,
                self.fs.as_ref(),
                Path::new("<results-file>"),
            )?,
            ProjectKind::Managed => managed_test_command(&self.project, tools),
            ProjectKind::Native => {
                let log = (self.settings.valgrind != ValgrindStrategy::None)
                    .then(|| PathBuf::from("<valgrind-log>"));
                native_test_command(&self.project, tools, log.as_deref())
            }
        };
        Ok(Some(spec))
    }

    /// Run the tests and return the normalized result.
    pub async fn run(self) -> Result<TestRunResult> {
        info!(
            project = %self.project.name,
            kind = %self.project.kind,
            execution = ?self.settings.test_execution,
            "running tests"
        );
        match self.settings.test_execution {
            TestExecution::Backend => self.run_with_backend().await,
            TestExecution::Runner => match self.project.kind {
                ProjectKind::Simple => self.run_simple().await,
                ProjectKind::Managed => self.run_managed().await,
                ProjectKind::Native => self.run_native().await,
            },
        }
    }

    async fn run_with_backend(&self) -> Result<TestRunResult> {
        self.backend
            .run_tests(&self.project.root)
            .await?
            .ok_or_else(|| ExerunError::ResultFormat(NO_BACKEND_RESULT.to_string()))
            .and_then(normalize_backend_result)
    }

    async fn run_simple(&self) -> Result<TestRunResult> {
        let results = ScratchFile::create("tmc_test_results", ".txt")?;
        let spec = simple_runner_command(
            &self.project,
            &self.settings.tools,
            self.fs.as_ref(),
            results.path(),
        )?;

        let outcome = self.execute(spec).await?;
        require_success(&outcome)?;
        parse_runner_file(results.path())
    }

    async fn run_managed(&self) -> Result<TestRunResult> {
        let results = self.project.root.join(MANAGED_RESULTS_FILE);
        // A copy left by an earlier run must not pass for this run's output.
        match tokio::fs::remove_file(&results).await {
            Ok(()) => debug!(path = %results.display(), "removed stale results file"),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
            Err(err) => return Err(err.into()),
        }

        let spec = managed_test_command(&self.project, &self.settings.tools);
        let outcome = self.execute(spec).await?;
        require_success(&outcome)?;
        parse_runner_file(&results)
    }

    async fn run_native(&self) -> Result<TestRunResult> {
        let binary = self.project.root.join(NATIVE_TEST_BINARY);
        if !self.fs.is_file(&binary) {
            return Err(ExerunError::Config(format!(
                "test binary {} was not built",
                binary.display()
            )));
        }

        let strategy = self.settings.valgrind;
        let log_file = match strategy {
            ValgrindStrategy::None => None,
            ValgrindStrategy::OnFailOnly | ValgrindStrategy::Always => {
                Some(ScratchFile::create("valgrind", ".log")?)
            }
        };

        let spec = native_test_command(
            &self.project,
            &self.settings.tools,
            log_file.as_ref().map(ScratchFile::path),
        );
        let outcome = self.execute(spec).await?;

        let log = match &log_file {
            Some(file) => match tokio::fs::read_to_string(file.path()).await {
                Ok(text) => Some(text),
                Err(err) => {
                    warn!(error = %err, "could not read valgrind log");
                    None
                }
            },
            None => None,
        };

        // Check suites exit non-zero when a case fails, so the exit status
        // alone does not mean the run is unusable.
        match parse_native_output(&outcome.stdout, log.as_deref(), strategy) {
            Ok(result) => Ok(result),
            Err(err) if !outcome.success() => {
                debug!(error = %err, "native output unusable after failed run");
                Err(tool_failed(&outcome))
            }
            Err(err) => Err(err),
        }
    }

    async fn execute(&self, spec: CommandSpec) -> Result<ProcessResult> {
        info!(project = %self.project.name, command = %spec, "starting test process");
        let result = ProcessRunner::new(spec)
            .with_sink(Arc::clone(&self.output), self.project.name.clone())
            .run()
            .await?;
        info!(project = %self.project.name, exit_code = result.status, "test process exited");
        Ok(result)
    }
}

fn require_success(result: &ProcessResult) -> Result<()> {
    if result.success() {
        Ok(())
    } else {
        Err(tool_failed(result))
    }
}

fn tool_failed(result: &ProcessResult) -> ExerunError {
    let diagnostics = if result.stderr.trim().is_empty() {
        result.stdout.clone()
    } else {
        result.stderr.clone()
    };
    ExerunError::ToolFailed {
        stage: "test run".to_string(),
        status: result.status,
        diagnostics,
    }
}
