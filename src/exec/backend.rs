// src/exec/backend.rs

//! Pluggable execution backend.
//!
//! The pipeline and the style adapter never invoke build tools directly; they
//! ask an [`ExecutionBackend`]. Production uses [`LocalBackend`], tests swap
//! in a fake that records calls and returns canned results.
//!
//! - `compile` always runs something and returns its [`ProcessResult`].
//! - `run_tests` / `check_style` return `None` when the backend has no usable
//!   result, which callers treat as "fall back" or "fail", never as success.

use std::future::Future;
use std::path::Path;
use std::pin::Pin;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use tempfile::TempPath;
use tracing::{debug, info, warn};

use crate::collab::{NullSink, OutputSink};
use crate::config::{ProjectDescriptor, ToolsSection};
use crate::errors::{ExerunError, Result};
use crate::fs::{FileSystem, RealFileSystem};
use crate::pipeline::compile::compile_command;
use crate::results::RawRunResult;
use crate::style::RawStyleResult;

use super::process::{CommandSpec, ProcessResult, ProcessRunner};

/// Boxed future returned by backend operations.
pub type BackendFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T>> + Send + 'a>>;

/// Trait abstracting how a project is compiled, tested and style-checked.
pub trait ExecutionBackend: Send + Sync {
    /// Run the project's build. A non-zero exit is data, not an error.
    fn compile<'a>(&'a self, project: &'a ProjectDescriptor) -> BackendFuture<'a, ProcessResult>;

    /// Run the tests of the project at `project_root`.
    fn run_tests<'a>(&'a self, project_root: &'a Path) -> BackendFuture<'a, Option<RawRunResult>>;

    /// Style-check the project at `project_root`.
    fn check_style<'a>(
        &'a self,
        project_root: &'a Path,
    ) -> BackendFuture<'a, Option<RawStyleResult>>;
}

/// Backend that runs the configured build tools and, when `tools.langs` is
/// set, the multi-language CLI on this machine.
pub struct LocalBackend {
    tools: ToolsSection,
    locale: String,
    fs: Arc<dyn FileSystem>,
    output: Arc<dyn OutputSink>,
}

impl LocalBackend {
    pub fn new(tools: ToolsSection, locale: impl Into<String>) -> Self {
        Self {
            tools,
            locale: locale.into(),
            fs: Arc::new(RealFileSystem),
            output: Arc::new(NullSink),
        }
    }

    pub fn with_fs(mut self, fs: Arc<dyn FileSystem>) -> Self {
        self.fs = fs;
        self
    }

    pub fn with_output(mut self, output: Arc<dyn OutputSink>) -> Self {
        self.output = output;
        self
    }

    /// Run `<langs> <subcommand> --exercise-path <root> --output-path <tmp>`
    /// and parse the JSON it writes. The output file is removed on return.
    async fn run_langs<T: DeserializeOwned>(
        &self,
        subcommand: &str,
        root: &Path,
        extra_args: Vec<String>,
    ) -> Result<Option<T>> {
        let Some(langs) = self.tools.langs.as_deref() else {
            debug!(subcommand, "no execution backend CLI configured");
            return Ok(None);
        };

        let output_path: TempPath = tempfile::Builder::new()
            .prefix("exerun-langs")
            .suffix(".json")
            .tempfile()?
            .into_temp_path();

        let spec = CommandSpec::new(langs, root)
            .arg(subcommand)
            .arg("--exercise-path")
            .arg(root.to_string_lossy())
            .arg("--output-path")
            .arg(output_path.to_string_lossy())
            .args(extra_args);

        let channel = channel_name(root);
        let result = match ProcessRunner::new(spec)
            .with_sink(Arc::clone(&self.output), channel)
            .run()
            .await
        {
            Ok(result) => result,
            Err(ExerunError::Spawn { program, source }) => {
                warn!(%program, error = %source, "execution backend CLI could not be started");
                return Ok(None);
            }
            Err(other) => return Err(other),
        };

        if !result.success() {
            warn!(
                subcommand,
                exit_code = result.status,
                "execution backend CLI exited with an error"
            );
            return Ok(None);
        }

        let text = match tokio::fs::read_to_string(&output_path).await {
            Ok(text) => text,
            Err(err) => {
                warn!(subcommand, error = %err, "execution backend wrote no output");
                return Ok(None);
            }
        };

        match serde_json::from_str::<T>(&text) {
            Ok(parsed) => Ok(Some(parsed)),
            Err(err) => {
                warn!(subcommand, error = %err, "execution backend output is not valid JSON");
                Ok(None)
            }
        }
    }
}

fn channel_name(root: &Path) -> String {
    root.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| root.display().to_string())
}

impl ExecutionBackend for LocalBackend {
    fn compile<'a>(&'a self, project: &'a ProjectDescriptor) -> BackendFuture<'a, ProcessResult> {
        Box::pin(async move {
            let spec = compile_command(project, &self.tools, self.fs.as_ref())?;
            info!(project = %project.name, command = %spec, "compiling");
            ProcessRunner::new(spec)
                .with_sink(Arc::clone(&self.output), project.name.clone())
                .run()
                .await
        })
    }

    fn run_tests<'a>(&'a self, project_root: &'a Path) -> BackendFuture<'a, Option<RawRunResult>> {
        Box::pin(async move { self.run_langs("run-tests", project_root, Vec::new()).await })
    }

    fn check_style<'a>(
        &'a self,
        project_root: &'a Path,
    ) -> BackendFuture<'a, Option<RawStyleResult>> {
        Box::pin(async move {
            let extra = vec!["--locale".to_string(), self.locale.clone()];
            self.run_langs("checkstyle", project_root, extra).await
        })
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::types::ProjectKind;
    use std::os::unix::fs::PermissionsExt;
    use std::path::PathBuf;

    fn script(dir: &Path, name: &str, body: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    fn tools_with_langs(langs: Option<PathBuf>) -> ToolsSection {
        ToolsSection {
            langs: langs.map(|p| p.to_string_lossy().into_owned()),
            ..ToolsSection::default()
        }
    }

    #[tokio::test]
    async fn compile_reports_non_zero_status_as_data() {
        let dir = tempfile::tempdir().unwrap();
        let make = script(dir.path(), "fake-make", "echo 'main.c:1: error' >&2; exit 2");
        let tools = ToolsSection {
            make: make.to_string_lossy().into_owned(),
            ..ToolsSection::default()
        };
        let backend = LocalBackend::new(tools, "en");
        let project = ProjectDescriptor::new("c", ProjectKind::Native, dir.path());

        let result = backend.compile(&project).await.unwrap();
        assert_eq!(result.status, 2);
        assert!(result.stderr.contains("main.c:1: error"));
    }

    #[tokio::test]
    async fn run_tests_without_cli_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let backend = LocalBackend::new(tools_with_langs(None), "en");
        assert!(backend.run_tests(dir.path()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn run_tests_reads_cli_output_file() {
        let dir = tempfile::tempdir().unwrap();
        // Arguments: run-tests --exercise-path <root> --output-path <file>
        let langs = script(
            dir.path(),
            "langs",
            r#"printf '{"status":"PASSED","testResults":[{"name":"a","successful":true}]}' > "$5""#,
        );
        let backend = LocalBackend::new(tools_with_langs(Some(langs)), "en");

        let raw = backend.run_tests(dir.path()).await.unwrap().unwrap();
        assert_eq!(raw.test_results.len(), 1);
    }

    #[tokio::test]
    async fn failing_cli_gives_none() {
        let dir = tempfile::tempdir().unwrap();
        let langs = script(dir.path(), "langs", "exit 1");
        let backend = LocalBackend::new(tools_with_langs(Some(langs)), "fi");
        assert!(backend.check_style(dir.path()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn check_style_passes_locale() {
        let dir = tempfile::tempdir().unwrap();
        let langs = script(
            dir.path(),
            "langs",
            r#"[ "$7" = "fi" ] || exit 3
printf '{"strategy":"WARN","validationErrors":{}}' > "$5""#,
        );
        let backend = LocalBackend::new(tools_with_langs(Some(langs)), "fi");
        let raw = backend.check_style(dir.path()).await.unwrap().unwrap();
        assert!(raw.validation_errors.is_empty());
    }
}
