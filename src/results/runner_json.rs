// src/results/runner_json.rs

//! Normalizer for the bundled test runner's JSON results file.
//!
//! The runner writes a UTF-8 JSON array, one record per test case, in the
//! order the tests ran:
//!
//! ```json
//! [{"name": "T.a", "successful": true},
//!  {"name": "T.b", "successful": false, "message": "boom",
//!   "stackTrace": [{"declaringClass": "T", "methodName": "b",
//!                   "fileName": "T.java", "lineNumber": 12}]}]
//! ```

use std::path::Path;

use serde::Deserialize;
use tracing::{debug, warn};

use crate::errors::{ExerunError, Result};
use crate::results::model::{TestCaseResult, TestRunResult};
use crate::results::null_as_default;

/// Message used whenever the runner produced nothing usable.
pub const EMPTY_RESULT: &str = "Empty result from test runner";

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RunnerRecord {
    name: String,
    successful: bool,
    #[serde(default)]
    message: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    points: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    stack_trace: Vec<StackFrame>,
    #[serde(default)]
    detailed_message: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StackFrame {
    declaring_class: String,
    method_name: String,
    #[serde(default)]
    file_name: Option<String>,
    #[serde(default)]
    line_number: Option<i64>,
}

impl StackFrame {
    fn render(&self) -> String {
        let location = match (&self.file_name, self.line_number) {
            (Some(file), Some(line)) if line >= 0 => format!("{file}:{line}"),
            (Some(file), _) => file.clone(),
            (None, _) => "Unknown Source".to_string(),
        };
        format!("at {}.{}({location})", self.declaring_class, self.method_name)
    }
}

impl From<RunnerRecord> for TestCaseResult {
    fn from(rec: RunnerRecord) -> Self {
        TestCaseResult {
            name: rec.name,
            successful: rec.successful,
            message: rec.message,
            stack_trace: rec.stack_trace.iter().map(StackFrame::render).collect(),
            points: rec.points,
            detailed_message: rec.detailed_message,
        }
    }
}

/// Parse runner JSON text into a canonical result.
///
/// Empty text, `null`, an empty array and malformed JSON are all errors:
/// a run that reported nothing is never treated as zero passing tests.
pub fn parse_runner_json(text: &str) -> Result<TestRunResult> {
    if text.trim().is_empty() {
        warn!("{EMPTY_RESULT}");
        return Err(ExerunError::ResultFormat(EMPTY_RESULT.to_string()));
    }

    let records: Option<Vec<RunnerRecord>> = serde_json::from_str(text)
        .map_err(|e| ExerunError::ResultFormat(format!("malformed runner output: {e}")))?;

    let records = match records {
        Some(records) if !records.is_empty() => records,
        _ => {
            warn!("{EMPTY_RESULT}");
            return Err(ExerunError::ResultFormat(EMPTY_RESULT.to_string()));
        }
    };

    debug!(cases = records.len(), "parsed runner results");
    Ok(TestRunResult::from_cases(
        records.into_iter().map(TestCaseResult::from).collect(),
    ))
}

/// Read and parse a runner results file. A missing file is a format error.
pub fn parse_runner_file(path: &Path) -> Result<TestRunResult> {
    let text = std::fs::read_to_string(path).map_err(|e| {
        ExerunError::ResultFormat(format!("cannot read results file {}: {e}", path.display()))
    })?;
    parse_runner_json(&text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::results::model::TestRunStatus;

    #[test]
    fn parses_cases_in_order() {
        let run = parse_runner_json(
            r#"[{"name":"T.a","successful":true},{"name":"T.b","successful":false,"message":"boom"}]"#,
        )
        .unwrap();

        assert_eq!(run.status(), TestRunStatus::TestsFailed);
        let cases = run.cases();
        assert_eq!(cases.len(), 2);
        assert_eq!(cases[0].name, "T.a");
        assert!(cases[0].successful);
        assert_eq!(cases[1].name, "T.b");
        assert!(!cases[1].successful);
        assert_eq!(cases[1].message.as_deref(), Some("boom"));
    }

    #[test]
    fn renders_stack_frames_and_points() {
        let run = parse_runner_json(
            r#"[{"name":"CalcTest testSum","successful":false,"message":"expected 3",
                "points":["1.1"],
                "stackTrace":[
                  {"declaringClass":"CalcTest","methodName":"testSum","fileName":"CalcTest.java","lineNumber":12},
                  {"declaringClass":"sun.reflect.Native","methodName":"invoke0","lineNumber":-2}
                ]}]"#,
        )
        .unwrap();

        let case = &run.cases()[0];
        assert_eq!(case.points, vec!["1.1"]);
        assert_eq!(
            case.stack_trace,
            vec![
                "at CalcTest.testSum(CalcTest.java:12)",
                "at sun.reflect.Native.invoke0(Unknown Source)",
            ]
        );
    }

    #[test]
    fn keeps_duplicates() {
        let run = parse_runner_json(
            r#"[{"name":"T.a","successful":true},{"name":"T.a","successful":true}]"#,
        )
        .unwrap();
        assert_eq!(run.cases().len(), 2);
    }

    #[test]
    fn empty_and_null_payloads_are_errors() {
        for payload in ["", "   \n", "null", "[]"] {
            match parse_runner_json(payload) {
                Err(ExerunError::ResultFormat(msg)) => assert_eq!(msg, EMPTY_RESULT),
                other => panic!("payload {payload:?}: expected ResultFormat, got {other:?}"),
            }
        }
    }

    #[test]
    fn null_fields_read_as_absent() {
        let run = parse_runner_json(
            r#"[{"name":"T.a","successful":false,"message":"boom","points":null,
                 "stackTrace":null,"detailedMessage":null}]"#,
        )
        .unwrap();

        let case = &run.cases()[0];
        assert_eq!(case.message.as_deref(), Some("boom"));
        assert!(case.points.is_empty());
        assert!(case.stack_trace.is_empty());
        assert!(case.detailed_message.is_none());
        assert_eq!(run.status(), TestRunStatus::TestsFailed);
    }

    #[test]
    fn malformed_payload_is_error() {
        assert!(matches!(
            parse_runner_json(r#"[{"name":"T.a"}"#),
            Err(ExerunError::ResultFormat(_))
        ));
        assert!(matches!(
            parse_runner_json(r#"{"name":"T.a","successful":true}"#),
            Err(ExerunError::ResultFormat(_))
        ));
    }

    #[test]
    fn missing_file_is_error() {
        assert!(matches!(
            parse_runner_file(Path::new("/definitely/not/here.txt")),
            Err(ExerunError::ResultFormat(_))
        ));
    }
}
