// src/results/mod.rs

//! Result normalization.
//!
//! Three raw formats feed one canonical model:
//! - [`runner_json`]: the bundled test runner's JSON results file,
//! - [`native`]: Check output plus an optional Valgrind log,
//! - [`backend`]: the execution backend's structured run result.
//!
//! Normalizers never reorder or deduplicate cases.

pub mod backend;
pub mod model;
pub mod native;
pub mod runner_json;

pub use backend::{normalize_backend_result, RawRunResult, RawTestResult, RunStatus};
pub use model::{
    StyleViolation, TestCaseResult, TestRunResult, TestRunStatus, ValidationResult,
};
pub use native::{parse_native_output, ValgrindReport};
pub use runner_json::{parse_runner_file, parse_runner_json, EMPTY_RESULT};

use serde::{Deserialize, Deserializer};

/// Read an explicit JSON `null` as the field's default. `#[serde(default)]`
/// alone only covers a missing key; JVM serializers write `null` instead.
pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
