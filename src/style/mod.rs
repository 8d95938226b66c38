// src/style/mod.rs

//! Style Checker Adapter.
//!
//! One background task per invocation: ask the execution backend for a style
//! result, fall back to the [`legacy`] checker when it has none, and hand the
//! resulting [`ValidationResult`] to the display collaborator. Where the
//! result comes from is decided once, up front, as a [`StylePlan`].

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::anyhow;
use serde::Deserialize;
use tracing::{info, warn};

use crate::collab::Collaborators;
use crate::config::{ProjectDescriptor, StyleSection};
use crate::errors::{ExerunError, Result};
use crate::exec::{outcome_channel, BackgroundExecutor, ExecutionBackend, TaskOutcome};
use crate::fs::FileSystem;
use crate::results::{StyleViolation, ValidationResult};
use crate::types::{ProjectKind, ValidationStrategy};

pub mod legacy;

pub use legacy::{legacy_source_dir, LegacyChecker, Locale};

/// One finding as reported by the execution backend.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawStyleError {
    pub line: usize,
    pub column: usize,
    pub message: String,
    #[serde(default)]
    pub source_name: String,
}

/// Style result as produced by the execution backend, keyed by file path.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawStyleResult {
    pub strategy: ValidationStrategy,
    #[serde(default)]
    pub validation_errors: BTreeMap<String, Vec<RawStyleError>>,
}

impl RawStyleResult {
    /// Flatten into a [`ValidationResult`]: files in path order, findings in
    /// reported order within a file.
    pub fn normalize(self) -> ValidationResult {
        let violations = self
            .validation_errors
            .into_iter()
            .flat_map(|(file, errors)| {
                let file = PathBuf::from(file);
                errors.into_iter().map(move |e| StyleViolation {
                    file: file.clone(),
                    line: e.line,
                    column: e.column,
                    message: e.message,
                    source: e.source_name,
                })
            })
            .collect();
        ValidationResult::new(self.strategy, violations)
    }
}

/// Where the style result comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StylePlan {
    PreferBackend(RawStyleResult),
    FallbackLegacy(ProjectKind),
    Unsupported(ProjectKind),
}

impl StylePlan {
    pub fn resolve(backend_result: Option<RawStyleResult>, kind: ProjectKind) -> Self {
        match (backend_result, kind) {
            (Some(raw), _) => StylePlan::PreferBackend(raw),
            (None, ProjectKind::Simple | ProjectKind::Managed) => StylePlan::FallbackLegacy(kind),
            (None, ProjectKind::Native) => StylePlan::Unsupported(kind),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            StylePlan::PreferBackend(_) => "backend",
            StylePlan::FallbackLegacy(_) => "legacy",
            StylePlan::Unsupported(_) => "unsupported",
        }
    }

    pub fn execute(
        self,
        project: &ProjectDescriptor,
        style: &StyleSection,
        fs: &dyn FileSystem,
    ) -> Result<ValidationResult> {
        match self {
            StylePlan::PreferBackend(raw) => Ok(raw.normalize()),
            StylePlan::FallbackLegacy(kind) => {
                let locale: Locale = style.locale.parse()?;
                LegacyChecker::new(fs, locale, style.max_line_length).check(&project.root, kind)
            }
            StylePlan::Unsupported(kind) => {
                warn!(project = %project.name, %kind, "no style checker available for this project kind");
                Ok(ValidationResult::clean())
            }
        }
    }
}

/// Runs one style check for one project.
pub struct StyleChecker {
    project: ProjectDescriptor,
    style: StyleSection,
    backend: Arc<dyn ExecutionBackend>,
    fs: Arc<dyn FileSystem>,
    collab: Collaborators,
}

impl StyleChecker {
    pub fn new(
        project: ProjectDescriptor,
        style: StyleSection,
        backend: Arc<dyn ExecutionBackend>,
        fs: Arc<dyn FileSystem>,
        collab: Collaborators,
    ) -> Self {
        Self {
            project,
            style,
            backend,
            fs,
            collab,
        }
    }

    /// Run the check in the background and report it.
    ///
    /// A successful result goes to the display collaborator. A failure goes
    /// to the error collaborator once and is returned; no placeholder result
    /// is displayed in its place.
    pub async fn run(&self, executor: &BackgroundExecutor) -> Result<ValidationResult> {
        let project = self.project.clone();
        let style = self.style.clone();
        let backend = Arc::clone(&self.backend);
        let fs = Arc::clone(&self.fs);

        let work = async move {
            let raw = backend.check_style(&project.root).await?;
            let plan = StylePlan::resolve(raw, project.kind);
            info!(project = %project.name, plan = plan.label(), "checking code style");
            Ok::<_, anyhow::Error>(plan.execute(&project, &style, fs.as_ref())?)
        };

        let (listener, rx) = outcome_channel::<ValidationResult>();
        let handle = executor.start("checking code style", work, listener);
        handle.join().await;
        let outcome = rx
            .await
            .unwrap_or_else(|_| TaskOutcome::Failed(anyhow!("style check ended without an outcome")));

        match outcome {
            TaskOutcome::Ready(result) => {
                self.collab.display.show_validation_result(&result);
                Ok(result)
            }
            TaskOutcome::Failed(cause) => {
                let err = ExerunError::from_task_error(cause);
                self.collab
                    .errors
                    .display_error("Failed to check code style", Some(&err));
                Err(err)
            }
            TaskOutcome::Cancelled => Err(ExerunError::Other(anyhow!("style check was cancelled"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::mock::MockFileSystem;

    fn raw(json: &str) -> RawStyleResult {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn backend_result_is_sorted_by_file_then_reported_order() {
        let result = raw(
            r#"{"strategy":"FAIL","validationErrors":{
                "/p/src/B.java":[{"line":9,"column":1,"message":"b9","sourceName":"X"},
                                 {"line":2,"column":4,"message":"b2","sourceName":"Y"}],
                "/p/src/A.java":[{"line":5,"column":3,"message":"a5"}]
            }}"#,
        )
        .normalize();

        let seen: Vec<_> = result.violations.iter().map(|v| v.message.as_str()).collect();
        assert_eq!(seen, vec!["a5", "b9", "b2"]);
        assert_eq!(result.violations[0].source, "");
        assert!(!result.passed());
    }

    #[test]
    fn warn_strategy_passes_with_findings() {
        let result = raw(
            r#"{"strategy":"WARN","validationErrors":{"/a":[{"line":1,"column":1,"message":"m"}]}}"#,
        )
        .normalize();
        assert!(result.passed());
    }

    #[test]
    fn plan_prefers_backend_then_legacy() {
        let backend = raw(r#"{"strategy":"DISABLED"}"#);
        assert_eq!(
            StylePlan::resolve(Some(backend.clone()), ProjectKind::Native),
            StylePlan::PreferBackend(backend)
        );
        assert_eq!(
            StylePlan::resolve(None, ProjectKind::Managed),
            StylePlan::FallbackLegacy(ProjectKind::Managed)
        );
        assert_eq!(
            StylePlan::resolve(None, ProjectKind::Native),
            StylePlan::Unsupported(ProjectKind::Native)
        );
    }

    #[test]
    fn unsupported_plan_gives_clean_result() {
        let fs = MockFileSystem::new();
        let project = ProjectDescriptor::new("c", ProjectKind::Native, "/c");
        let result = StylePlan::Unsupported(ProjectKind::Native)
            .execute(&project, &StyleSection::default(), &fs)
            .unwrap();
        assert!(result.violations.is_empty());
        assert!(result.passed());
    }
}
