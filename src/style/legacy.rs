// src/style/legacy.rs

//! In-process style checker for Java projects, used when the execution
//! backend gives no style result.
//!
//! Only simple and managed projects are supported. Three line rules are
//! checked: tab indentation, trailing whitespace and line length.

use std::path::{Path, PathBuf};
use std::str::FromStr;

use tracing::debug;

use crate::errors::{ExerunError, Result};
use crate::fs::{compile_globs, walk_matching, FileSystem};
use crate::results::{StyleViolation, ValidationResult};
use crate::types::{ProjectKind, ValidationStrategy};

/// Message language.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Locale {
    #[default]
    En,
    Fi,
}

impl FromStr for Locale {
    type Err = ExerunError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "en" => Ok(Locale::En),
            "fi" => Ok(Locale::Fi),
            other => Err(ExerunError::Config(format!(
                "unsupported style locale '{other}' (expected en or fi)"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Rule {
    TabIndent,
    TrailingWhitespace,
    LineLength { max: usize, found: usize },
}

impl Rule {
    fn source(&self) -> &'static str {
        match self {
            Rule::TabIndent => "FileTabCharacterCheck",
            Rule::TrailingWhitespace => "RegexpSinglelineCheck",
            Rule::LineLength { .. } => "LineLengthCheck",
        }
    }

    fn message(&self, locale: Locale) -> String {
        match (self, locale) {
            (Rule::TabIndent, Locale::En) => "Line is indented with a tab character.".to_string(),
            (Rule::TabIndent, Locale::Fi) => "Rivi on sisennetty sarkainmerkillä.".to_string(),
            (Rule::TrailingWhitespace, Locale::En) => "Line has trailing whitespace.".to_string(),
            (Rule::TrailingWhitespace, Locale::Fi) => {
                "Rivin lopussa on tyhjiä merkkejä.".to_string()
            }
            (Rule::LineLength { max, found }, Locale::En) => {
                format!("Line is longer than {max} characters (found {found}).")
            }
            (Rule::LineLength { max, found }, Locale::Fi) => {
                format!("Rivi on pidempi kuin {max} merkkiä ({found}).")
            }
        }
    }
}

/// Source directory the legacy checker inspects, relative to the project
/// root. `None` for kinds it does not support.
pub fn legacy_source_dir(kind: ProjectKind) -> Option<PathBuf> {
    match kind {
        ProjectKind::Simple => Some(PathBuf::from("src")),
        ProjectKind::Managed => Some(["src", "main", "java"].iter().collect()),
        ProjectKind::Native => None,
    }
}

pub struct LegacyChecker<'a> {
    fs: &'a dyn FileSystem,
    locale: Locale,
    max_line_length: usize,
}

impl<'a> LegacyChecker<'a> {
    pub fn new(fs: &'a dyn FileSystem, locale: Locale, max_line_length: usize) -> Self {
        Self {
            fs,
            locale,
            max_line_length,
        }
    }

    /// Check every `*.java` file under the kind's source directory.
    ///
    /// Violations are ordered by file path, then by line and rule.
    pub fn check(&self, root: &Path, kind: ProjectKind) -> Result<ValidationResult> {
        let rel = legacy_source_dir(kind).ok_or_else(|| {
            ExerunError::Config(format!("no legacy style checker for {kind} projects"))
        })?;
        let source_dir = root.join(rel);
        if !self.fs.is_dir(&source_dir) {
            return Err(ExerunError::Config(format!(
                "source directory {} does not exist",
                source_dir.display()
            )));
        }

        let globs = compile_globs(&["**/*.java"])?;
        let mut violations = Vec::new();
        for file in walk_matching(self.fs, &source_dir, &globs)? {
            let text = self.fs.read_to_string(&file)?;
            violations.extend(self.check_source(&file, &text));
        }

        debug!(
            dir = %source_dir.display(),
            violations = violations.len(),
            "legacy style check finished"
        );
        Ok(ValidationResult::new(ValidationStrategy::Fail, violations))
    }

    fn check_source(&self, file: &Path, text: &str) -> Vec<StyleViolation> {
        let mut out = Vec::new();
        for (idx, line) in text.lines().enumerate() {
            for (rule, column) in self.check_line(line) {
                out.push(StyleViolation {
                    file: file.to_path_buf(),
                    line: idx + 1,
                    column,
                    message: rule.message(self.locale),
                    source: rule.source().to_string(),
                });
            }
        }
        out
    }

    /// Rules broken by `line`, with the 1-based column each one points at.
    fn check_line(&self, line: &str) -> Vec<(Rule, usize)> {
        let mut hits = Vec::new();

        let indent: String = line.chars().take_while(|c| c.is_whitespace()).collect();
        if let Some(pos) = indent.chars().position(|c| c == '\t') {
            hits.push((Rule::TabIndent, pos + 1));
        }

        let trimmed = line.trim_end();
        if trimmed.len() != line.len() && !trimmed.is_empty() {
            hits.push((Rule::TrailingWhitespace, trimmed.chars().count() + 1));
        }

        let found = line.chars().count();
        if found > self.max_line_length {
            hits.push((
                Rule::LineLength {
                    max: self.max_line_length,
                    found,
                },
                self.max_line_length + 1,
            ));
        }

        hits
    }
}
