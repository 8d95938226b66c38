// src/results/native.rs

//! Normalizer for native (C) test output and Valgrind logs.
//!
//! The test binary is a Check suite run with `CK_VERBOSITY=verbose`, which
//! prints one line per test case:
//!
//! ```text
//! tmc-check-example.c:17:P:Core:test_add:0: Passed
//! tmc-check-example.c:24:F:Core:test_sub:0: Assertion 'sub(2, 1) == 1' failed
//! ```
//!
//! Result codes are `P` (passed), `F` (assertion failure) and `E` (error,
//! e.g. a crash or timeout). Anything else on stdout is ignored.

use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, info, warn};

use crate::errors::{ExerunError, Result};
use crate::results::model::{TestCaseResult, TestRunResult};
use crate::results::runner_json::EMPTY_RESULT;
use crate::types::ValgrindStrategy;

pub const VALGRIND_FAILURE_MESSAGE: &str = "Valgrind found memory errors";

static CHECK_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(?P<file>[^:]+):(?P<line>\d+):(?P<result>[PFE]):(?P<suite>[^:]*):(?P<test>[^:]+):(?P<iteration>\d+):\s?(?P<message>.*)$",
    )
    .expect("check line pattern is valid")
});

static ERROR_SUMMARY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"ERROR SUMMARY:\s*([0-9,]+) errors").expect("error summary pattern is valid")
});

static DEFINITELY_LOST: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"definitely lost:\s*([0-9,]+)\s*bytes").expect("leak pattern is valid")
});

/// Findings extracted from a Valgrind log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValgrindReport {
    pub log: String,
    pub error_count: u64,
    pub bytes_definitely_lost: u64,
}

impl ValgrindReport {
    /// Sum every `ERROR SUMMARY` and `definitely lost` line in the log. Test
    /// binaries fork per case, so one log holds several process summaries.
    pub fn parse(log: &str) -> Self {
        let error_count = sum_captures(&ERROR_SUMMARY, log);
        let bytes_definitely_lost = sum_captures(&DEFINITELY_LOST, log);
        Self {
            log: log.to_string(),
            error_count,
            bytes_definitely_lost,
        }
    }

    pub fn has_findings(&self) -> bool {
        self.error_count > 0 || self.bytes_definitely_lost > 0
    }
}

fn sum_captures(re: &Regex, text: &str) -> u64 {
    re.captures_iter(text)
        .filter_map(|cap| cap[1].replace(',', "").parse::<u64>().ok())
        .sum()
}

/// Parse Check output and fold in Valgrind findings according to `strategy`.
///
/// - `None`: the log is ignored.
/// - `OnFailOnly`: the log becomes the detailed message of failing cases.
/// - `Always`: the log is attached to every case, and when it has findings,
///   passing cases are turned into failures.
pub fn parse_native_output(
    output: &str,
    valgrind_log: Option<&str>,
    strategy: ValgrindStrategy,
) -> Result<TestRunResult> {
    let mut cases: Vec<TestCaseResult> = output.lines().filter_map(parse_check_line).collect();

    if cases.is_empty() {
        warn!("{EMPTY_RESULT}");
        return Err(ExerunError::ResultFormat(EMPTY_RESULT.to_string()));
    }
    debug!(cases = cases.len(), "parsed native test output");

    let report = match (strategy, valgrind_log) {
        (ValgrindStrategy::None, _) | (_, None) => None,
        (_, Some(log)) => Some(ValgrindReport::parse(log)),
    };

    if let Some(report) = report {
        info!(
            errors = report.error_count,
            definitely_lost = report.bytes_definitely_lost,
            ?strategy,
            "applying valgrind findings"
        );
        apply_valgrind(&mut cases, &report, strategy);
    }

    Ok(TestRunResult::from_cases(cases))
}

fn parse_check_line(line: &str) -> Option<TestCaseResult> {
    let caps = CHECK_LINE.captures(line.trim_end())?;
    let name = caps["test"].to_string();
    let message = caps["message"].trim();

    let case = match &caps["result"] {
        "P" => TestCaseResult::passed(name),
        _ => {
            let mut case = TestCaseResult::failed(name, message);
            case.stack_trace = vec![format!("at {}:{}", &caps["file"], &caps["line"])];
            case
        }
    };
    Some(case)
}

fn apply_valgrind(cases: &mut [TestCaseResult], report: &ValgrindReport, strategy: ValgrindStrategy) {
    for case in cases.iter_mut() {
        match strategy {
            ValgrindStrategy::None => {}
            ValgrindStrategy::OnFailOnly => {
                if !case.successful {
                    case.detailed_message = Some(report.log.clone());
                }
            }
            ValgrindStrategy::Always => {
                case.detailed_message = Some(report.log.clone());
                if case.successful && report.has_findings() {
                    case.successful = false;
                    case.message = Some(VALGRIND_FAILURE_MESSAGE.to_string());
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::results::model::TestRunStatus;

    const OUTPUT: &str = "\
Running suite(s): Core
66%: Checks: 3, Failures: 1, Errors: 0
tmc-check-example.c:17:P:Core:test_add:0: Passed
tmc-check-example.c:24:F:Core:test_sub:0: Assertion 'sub(2, 1) == 1' failed
tmc-check-example.c:31:P:Core:test_mul:0: Passed
";

    const CLEAN_LOG: &str = "\
==22== HEAP SUMMARY:
==22==     in use at exit: 0 bytes in 0 blocks
==22== All heap blocks were freed -- no leaks are possible
==22== ERROR SUMMARY: 0 errors from 0 contexts (suppressed: 0 from 0)
";

    const LEAKY_LOG: &str = "\
==22== LEAK SUMMARY:
==22==    definitely lost: 1,024 bytes in 1 blocks
==22== ERROR SUMMARY: 1 errors from 1 contexts (suppressed: 0 from 0)
==23== ERROR SUMMARY: 2 errors from 2 contexts (suppressed: 0 from 0)
";

    #[test]
    fn parses_check_lines_in_order() {
        let run = parse_native_output(OUTPUT, None, ValgrindStrategy::None).unwrap();
        let names: Vec<_> = run.cases().iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["test_add", "test_sub", "test_mul"]);
        assert_eq!(run.status(), TestRunStatus::TestsFailed);

        let failed = &run.cases()[1];
        assert_eq!(failed.message.as_deref(), Some("Assertion 'sub(2, 1) == 1' failed"));
        assert_eq!(failed.stack_trace, vec!["at tmc-check-example.c:24"]);
    }

    #[test]
    fn error_lines_are_failures() {
        let out = "t.c:5:E:Core:test_crash:0: (after this point) Received signal 11 (Segmentation fault)\n";
        let run = parse_native_output(out, None, ValgrindStrategy::None).unwrap();
        assert!(!run.cases()[0].successful);
    }

    #[test]
    fn output_without_results_is_error() {
        assert!(matches!(
            parse_native_output("Running suite(s): Core\n", None, ValgrindStrategy::None),
            Err(ExerunError::ResultFormat(_))
        ));
    }

    #[test]
    fn valgrind_report_sums_findings() {
        let report = ValgrindReport::parse(LEAKY_LOG);
        assert_eq!(report.error_count, 3);
        assert_eq!(report.bytes_definitely_lost, 1024);
        assert!(report.has_findings());
        assert!(!ValgrindReport::parse(CLEAN_LOG).has_findings());
    }

    #[test]
    fn strategy_none_ignores_log() {
        let run = parse_native_output(OUTPUT, Some(LEAKY_LOG), ValgrindStrategy::None).unwrap();
        assert!(run.cases().iter().all(|c| c.detailed_message.is_none()));
        assert!(run.cases()[0].successful);
    }

    #[test]
    fn on_fail_only_attaches_log_to_failures() {
        let run =
            parse_native_output(OUTPUT, Some(LEAKY_LOG), ValgrindStrategy::OnFailOnly).unwrap();
        let cases = run.cases();
        assert!(cases[0].successful);
        assert!(cases[0].detailed_message.is_none());
        assert_eq!(cases[1].detailed_message.as_deref(), Some(LEAKY_LOG));
    }

    #[test]
    fn always_fails_passing_cases_on_findings() {
        let run = parse_native_output(OUTPUT, Some(LEAKY_LOG), ValgrindStrategy::Always).unwrap();
        let cases = run.cases();
        assert!(cases.iter().all(|c| !c.successful));
        assert_eq!(cases[0].message.as_deref(), Some(VALGRIND_FAILURE_MESSAGE));
        // The original failure message is kept.
        assert_eq!(cases[1].message.as_deref(), Some("Assertion 'sub(2, 1) == 1' failed"));
        assert!(cases.iter().all(|c| c.detailed_message.as_deref() == Some(LEAKY_LOG)));
    }

    #[test]
    fn always_with_clean_log_keeps_passes() {
        let run = parse_native_output(OUTPUT, Some(CLEAN_LOG), ValgrindStrategy::Always).unwrap();
        assert!(run.cases()[0].successful);
        assert_eq!(run.cases()[0].detailed_message.as_deref(), Some(CLEAN_LOG));
    }
}
