use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use exerun::config::ProjectDescriptor;
use exerun::errors::ExerunError;
use exerun::exec::{BackendFuture, ExecutionBackend, ProcessResult};
use exerun::results::RawRunResult;
use exerun::style::RawStyleResult;

/// A fake execution backend that:
/// - counts calls per operation,
/// - returns canned results,
/// - optionally sleeps first, so tests can cancel mid-stage.
pub struct FakeBackend {
    compile_status: i32,
    compile_stderr: String,
    compile_error: Option<String>,
    compile_delay: Option<Duration>,
    run_result: Option<RawRunResult>,
    run_delay: Option<Duration>,
    style_result: Option<RawStyleResult>,
    compile_calls: AtomicUsize,
    run_tests_calls: AtomicUsize,
    check_style_calls: AtomicUsize,
}

impl Default for FakeBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeBackend {
    /// Compiles successfully, has no test or style result.
    pub fn new() -> Self {
        Self {
            compile_status: 0,
            compile_stderr: String::new(),
            compile_error: None,
            compile_delay: None,
            run_result: None,
            run_delay: None,
            style_result: None,
            compile_calls: AtomicUsize::new(0),
            run_tests_calls: AtomicUsize::new(0),
            check_style_calls: AtomicUsize::new(0),
        }
    }

    pub fn with_compile_status(mut self, status: i32, stderr: &str) -> Self {
        self.compile_status = status;
        self.compile_stderr = stderr.to_string();
        self
    }

    /// Make `compile` fail as if the build could not be set up.
    pub fn with_compile_error(mut self, message: &str) -> Self {
        self.compile_error = Some(message.to_string());
        self
    }

    pub fn with_compile_delay(mut self, delay: Duration) -> Self {
        self.compile_delay = Some(delay);
        self
    }

    pub fn with_run_result(mut self, result: RawRunResult) -> Self {
        self.run_result = Some(result);
        self
    }

    pub fn with_run_delay(mut self, delay: Duration) -> Self {
        self.run_delay = Some(delay);
        self
    }

    pub fn with_style_result(mut self, result: RawStyleResult) -> Self {
        self.style_result = Some(result);
        self
    }

    pub fn compile_calls(&self) -> usize {
        self.compile_calls.load(Ordering::SeqCst)
    }

    pub fn run_tests_calls(&self) -> usize {
        self.run_tests_calls.load(Ordering::SeqCst)
    }

    pub fn check_style_calls(&self) -> usize {
        self.check_style_calls.load(Ordering::SeqCst)
    }
}

impl ExecutionBackend for FakeBackend {
    fn compile<'a>(&'a self, _project: &'a ProjectDescriptor) -> BackendFuture<'a, ProcessResult> {
        self.compile_calls.fetch_add(1, Ordering::SeqCst);
        Box::pin(async move {
            if let Some(delay) = self.compile_delay {
                tokio::time::sleep(delay).await;
            }
            if let Some(msg) = &self.compile_error {
                return Err(ExerunError::Config(msg.clone()));
            }
            Ok(ProcessResult {
                status: self.compile_status,
                stdout: String::new(),
                stderr: self.compile_stderr.clone(),
            })
        })
    }

    fn run_tests<'a>(&'a self, _project_root: &'a Path) -> BackendFuture<'a, Option<RawRunResult>> {
        self.run_tests_calls.fetch_add(1, Ordering::SeqCst);
        Box::pin(async move {
            if let Some(delay) = self.run_delay {
                tokio::time::sleep(delay).await;
            }
            Ok(self.run_result.clone())
        })
    }

    fn check_style<'a>(
        &'a self,
        _project_root: &'a Path,
    ) -> BackendFuture<'a, Option<RawStyleResult>> {
        self.check_style_calls.fetch_add(1, Ordering::SeqCst);
        Box::pin(async move { Ok(self.style_result.clone()) })
    }
}
