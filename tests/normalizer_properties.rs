// tests/normalizer_properties.rs

mod common;
use crate::common::builders::raw_run_result;

use proptest::prelude::*;
use serde_json::json;

use exerun::errors::ExerunError;
use exerun::results::{
    normalize_backend_result, parse_native_output, parse_runner_json, RunStatus, TestRunStatus,
    EMPTY_RESULT,
};
use exerun::types::ValgrindStrategy;

// Case names may repeat; order and multiplicity must both survive.
fn cases_strategy() -> impl Strategy<Value = Vec<(String, bool)>> {
    proptest::collection::vec(("[A-Za-z][A-Za-z0-9_]{0,12}", any::<bool>()), 1..25)
}

fn expected_status(cases: &[(String, bool)]) -> TestRunStatus {
    if cases.iter().all(|(_, ok)| *ok) {
        TestRunStatus::Passed
    } else {
        TestRunStatus::TestsFailed
    }
}

proptest! {
    #[test]
    fn runner_json_keeps_order_count_and_flags(cases in cases_strategy()) {
        let records: Vec<_> = cases
            .iter()
            .map(|(name, ok)| json!({ "name": name, "successful": ok, "message": "m" }))
            .collect();
        let text = serde_json::to_string(&records).unwrap();

        let run = parse_runner_json(&text).unwrap();

        prop_assert_eq!(run.cases().len(), cases.len());
        for (case, (name, ok)) in run.cases().iter().zip(&cases) {
            prop_assert_eq!(&case.name, name);
            prop_assert_eq!(case.successful, *ok);
        }
        prop_assert_eq!(run.status(), expected_status(&cases));
    }

    #[test]
    fn backend_result_keeps_order_count_and_flags(cases in cases_strategy()) {
        let pairs: Vec<(&str, bool)> = cases.iter().map(|(n, ok)| (n.as_str(), *ok)).collect();
        let status = if pairs.iter().all(|(_, ok)| *ok) {
            RunStatus::Passed
        } else {
            RunStatus::TestsFailed
        };

        let run = normalize_backend_result(raw_run_result(status, &pairs)).unwrap();

        let names: Vec<&str> = run.cases().iter().map(|c| c.name.as_str()).collect();
        let expected: Vec<&str> = pairs.iter().map(|(n, _)| *n).collect();
        prop_assert_eq!(names, expected);
        prop_assert_eq!(run.failed_count(), pairs.iter().filter(|(_, ok)| !ok).count());
        prop_assert_eq!(run.status(), expected_status(&cases));
    }

    #[test]
    fn failing_backend_statuses_never_carry_cases(
        cases in cases_strategy(),
        status in prop_oneof![
            Just(RunStatus::CompileFailed),
            Just(RunStatus::GenericError),
            Just(RunStatus::TestrunInterrupted),
        ],
    ) {
        let pairs: Vec<(&str, bool)> = cases.iter().map(|(n, ok)| (n.as_str(), *ok)).collect();
        let run = normalize_backend_result(raw_run_result(status, &pairs)).unwrap();
        prop_assert_eq!(run.status(), TestRunStatus::CompileFailed);
        prop_assert!(run.cases().is_empty());
    }

    #[test]
    fn native_output_keeps_order_amid_noise(cases in cases_strategy()) {
        let mut output = String::from("Running suite(s): Core\n");
        for (i, (name, ok)) in cases.iter().enumerate() {
            let code = if *ok { "P" } else { "F" };
            output.push_str(&format!("ex.c:{}:{code}:Core:{name}:0: msg\n", i + 1));
            output.push_str("some unrelated line\n");
        }

        let run = parse_native_output(&output, None, ValgrindStrategy::None).unwrap();

        prop_assert_eq!(run.cases().len(), cases.len());
        for (case, (name, ok)) in run.cases().iter().zip(&cases) {
            prop_assert_eq!(&case.name, name);
            prop_assert_eq!(case.successful, *ok);
        }
    }

    #[test]
    fn blank_runner_output_is_an_error(ws in "[ \t\n]{0,8}") {
        let err = parse_runner_json(&ws).unwrap_err();
        prop_assert!(matches!(err, ExerunError::ResultFormat(ref msg) if msg == EMPTY_RESULT));
    }
}

#[test]
fn backend_result_without_cases_is_an_error() {
    for status in [RunStatus::Passed, RunStatus::TestsFailed] {
        match normalize_backend_result(raw_run_result(status, &[])) {
            Err(ExerunError::ResultFormat(msg)) => assert_eq!(msg, EMPTY_RESULT, "{status:?}"),
            other => panic!("{status:?}: expected ResultFormat, got {other:?}"),
        }
    }
}

#[test]
fn empty_and_null_runner_output_are_errors() {
    for text in ["[]", "null", " [ ] \n"] {
        match parse_runner_json(text) {
            Err(ExerunError::ResultFormat(msg)) => assert_eq!(msg, EMPTY_RESULT, "{text:?}"),
            other => panic!("{text:?}: expected ResultFormat, got {other:?}"),
        }
    }
}
