// src/results/backend.rs

//! Normalizer for the execution backend's structured run result.

use std::collections::BTreeMap;

use serde::Deserialize;
use tracing::{info, warn};

use crate::errors::{ExerunError, Result};
use crate::results::model::{TestCaseResult, TestRunResult};
use crate::results::null_as_default;
use crate::results::runner_json::EMPTY_RESULT;

/// Status reported by the execution backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RunStatus {
    Passed,
    TestsFailed,
    CompileFailed,
    TestrunInterrupted,
    GenericError,
}

/// One test as reported by the execution backend.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawTestResult {
    pub name: String,
    pub successful: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    pub points: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub message: String,
    /// Exception lines, outermost first.
    #[serde(default, deserialize_with = "null_as_default")]
    pub exception: Vec<String>,
}

/// Structured run result as produced by the execution backend.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawRunResult {
    pub status: RunStatus,
    #[serde(default, deserialize_with = "null_as_default")]
    pub test_results: Vec<RawTestResult>,
    /// Captured tool output (e.g. `stdout`, `stderr`, `compiler_output`).
    #[serde(default, deserialize_with = "null_as_default")]
    pub logs: BTreeMap<String, String>,
}

impl From<RawTestResult> for TestCaseResult {
    fn from(raw: RawTestResult) -> Self {
        TestCaseResult {
            name: raw.name,
            successful: raw.successful,
            message: (!raw.message.is_empty()).then_some(raw.message),
            stack_trace: raw.exception,
            points: raw.points,
            detailed_message: None,
        }
    }
}

/// Map a backend result onto the canonical model.
///
/// `Passed` and `TestsFailed` keep every reported test in order; reporting
/// no tests at all under either is a `ResultFormat` error, the same as an
/// empty runner results file. Every other status becomes `CompileFailed`
/// with no cases.
pub fn normalize_backend_result(raw: RawRunResult) -> Result<TestRunResult> {
    match raw.status {
        RunStatus::Passed | RunStatus::TestsFailed => {
            if raw.test_results.is_empty() {
                warn!(status = ?raw.status, "{EMPTY_RESULT}");
                return Err(ExerunError::ResultFormat(EMPTY_RESULT.to_string()));
            }
            Ok(TestRunResult::from_cases(
                raw.test_results.into_iter().map(TestCaseResult::from).collect(),
            ))
        }
        other => {
            info!(status = ?other, "execution backend reported a failed run");
            Ok(TestRunResult::compile_failed())
        }
    }
}
