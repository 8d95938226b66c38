// src/results/model.rs

//! Canonical, backend-independent result model.

use std::path::PathBuf;

use serde::Serialize;

use crate::types::ValidationStrategy;

/// Overall status of one test run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TestRunStatus {
    Passed,
    TestsFailed,
    CompileFailed,
    /// Part of the result vocabulary only. No normalizer produces it: failing
    /// backend statuses map to `CompileFailed`, and a run that cannot be read
    /// at all is a pipeline error rather than a result.
    GenericError,
}

/// One test case as reported by a backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TestCaseResult {
    pub name: String,
    pub successful: bool,
    pub message: Option<String>,
    /// Rendered stack frames, innermost first.
    pub stack_trace: Vec<String>,
    pub points: Vec<String>,
    pub detailed_message: Option<String>,
}

impl TestCaseResult {
    pub fn passed(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            successful: true,
            message: None,
            stack_trace: Vec::new(),
            points: Vec::new(),
            detailed_message: None,
        }
    }

    pub fn failed(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            successful: false,
            message: Some(message.into()),
            stack_trace: Vec::new(),
            points: Vec::new(),
            detailed_message: None,
        }
    }
}

/// Result of one test run.
///
/// Fields are private so the invariants hold for every value: a
/// `CompileFailed` run carries no cases, and any other run carries exactly the
/// cases the backend reported, in the backend's order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TestRunResult {
    status: TestRunStatus,
    cases: Vec<TestCaseResult>,
}

impl TestRunResult {
    /// Build a result from reported cases. Status is `Passed` when every case
    /// passed, `TestsFailed` otherwise.
    pub fn from_cases(cases: Vec<TestCaseResult>) -> Self {
        let status = if cases.iter().all(|c| c.successful) {
            TestRunStatus::Passed
        } else {
            TestRunStatus::TestsFailed
        };
        Self { status, cases }
    }

    pub fn compile_failed() -> Self {
        Self {
            status: TestRunStatus::CompileFailed,
            cases: Vec::new(),
        }
    }

    pub fn status(&self) -> TestRunStatus {
        self.status
    }

    pub fn cases(&self) -> &[TestCaseResult] {
        &self.cases
    }

    pub fn into_cases(self) -> Vec<TestCaseResult> {
        self.cases
    }

    pub fn all_passed(&self) -> bool {
        self.status == TestRunStatus::Passed
    }

    pub fn failed_count(&self) -> usize {
        self.cases.iter().filter(|c| !c.successful).count()
    }
}

/// One style finding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StyleViolation {
    pub file: PathBuf,
    pub line: usize,
    pub column: usize,
    pub message: String,
    /// Rule or check that produced the finding.
    pub source: String,
}

/// Result of one style check invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationResult {
    pub strategy: ValidationStrategy,
    pub violations: Vec<StyleViolation>,
}

impl ValidationResult {
    pub fn new(strategy: ValidationStrategy, violations: Vec<StyleViolation>) -> Self {
        Self {
            strategy,
            violations,
        }
    }

    /// A result with no findings.
    pub fn clean() -> Self {
        Self::new(ValidationStrategy::Fail, Vec::new())
    }

    /// Passing unless there are findings under the `Fail` strategy.
    pub fn passed(&self) -> bool {
        self.strategy != ValidationStrategy::Fail || self.violations.is_empty()
    }
}
