use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Kind of exercise project. Selects the compile strategy and the test layout.
///
/// - `Simple`: a build-script project with a fixed `compile-test` target.
/// - `Managed`: a declarative project driven through named build goals.
/// - `Native`: a C project built with `make` and tested with Check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProjectKind {
    Simple,
    Managed,
    Native,
}

impl ProjectKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProjectKind::Simple => "simple",
            ProjectKind::Managed => "managed",
            ProjectKind::Native => "native",
        }
    }
}

impl fmt::Display for ProjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProjectKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "simple" => Ok(ProjectKind::Simple),
            "managed" => Ok(ProjectKind::Managed),
            "native" => Ok(ProjectKind::Native),
            other => Err(format!(
                "unknown project kind: {other} (expected \"simple\", \"managed\" or \"native\")"
            )),
        }
    }
}

/// Whether Valgrind findings are folded into native test results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ValgrindStrategy {
    /// Ignore Valgrind entirely.
    None,
    /// Attach the log to cases that already failed.
    OnFailOnly,
    /// Attach the log to every case; findings fail otherwise-passing cases.
    Always,
}

impl Default for ValgrindStrategy {
    fn default() -> Self {
        ValgrindStrategy::None
    }
}

impl FromStr for ValgrindStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "none" => Ok(ValgrindStrategy::None),
            "on-fail-only" => Ok(ValgrindStrategy::OnFailOnly),
            "always" => Ok(ValgrindStrategy::Always),
            other => Err(format!(
                "invalid valgrind strategy: {other} (expected \"none\", \"on-fail-only\" or \"always\")"
            )),
        }
    }
}

/// Which component executes the test suite once compilation succeeded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TestExecution {
    /// Spawn the bundled runner (or the build tool's test goal) as a process.
    Runner,
    /// Ask the multi-language execution backend.
    Backend,
}

impl Default for TestExecution {
    fn default() -> Self {
        TestExecution::Runner
    }
}

/// How strictly style violations are treated, as reported by the style backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ValidationStrategy {
    Fail,
    Warn,
    Disabled,
}

impl Default for ValidationStrategy {
    fn default() -> Self {
        ValidationStrategy::Fail
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn project_kind_parses_known_names() {
        assert_eq!("simple".parse::<ProjectKind>(), Ok(ProjectKind::Simple));
        assert_eq!(" Managed ".parse::<ProjectKind>(), Ok(ProjectKind::Managed));
        assert_eq!("native".parse::<ProjectKind>(), Ok(ProjectKind::Native));
    }

    #[test]
    fn project_kind_rejects_unknown_names() {
        let err = "gradle".parse::<ProjectKind>().unwrap_err();
        assert!(err.contains("unknown project kind: gradle"));
    }

    #[test]
    fn valgrind_strategy_parses_kebab_case() {
        assert_eq!(
            "on-fail-only".parse::<ValgrindStrategy>(),
            Ok(ValgrindStrategy::OnFailOnly)
        );
        assert!("sometimes".parse::<ValgrindStrategy>().is_err());
    }
}
