// src/config/loader.rs

use std::fs;
use std::path::{Path, PathBuf};

use crate::config::model::{ProjectConfig, RawConfigFile};
use crate::errors::Result;

/// Name of the per-project configuration file.
pub const CONFIG_FILE_NAME: &str = "Exerun.toml";

/// Load a configuration file and return the raw, unvalidated `RawConfigFile`.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawConfigFile> {
    let contents = fs::read_to_string(path.as_ref())?;
    parse_str(&contents)
}

/// Deserialize configuration text without validating it.
pub fn parse_str(contents: &str) -> Result<RawConfigFile> {
    let config: RawConfigFile = toml::from_str(contents)?;
    Ok(config)
}

/// Load a configuration file and validate it.
///
/// This is the entry point for the rest of the application:
/// - reads TOML,
/// - applies defaults (handled by `serde` + `Default` impls),
/// - rejects unknown project kinds and inconsistent settings.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<ProjectConfig> {
    let raw_config = load_from_path(&path)?;
    ProjectConfig::try_from(raw_config)
}

/// Default config location for a project root: `<root>/Exerun.toml`.
pub fn default_config_path(project_root: &Path) -> PathBuf {
    project_root.join(CONFIG_FILE_NAME)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ExerunError;
    use crate::types::{ProjectKind, TestExecution, ValgrindStrategy};

    #[test]
    fn minimal_config_gets_defaults() {
        let raw = parse_str("[project]\nkind = \"managed\"\n").unwrap();
        let cfg = ProjectConfig::try_from(raw).unwrap();

        assert_eq!(cfg.kind, ProjectKind::Managed);
        assert_eq!(cfg.memory_limit, None);
        assert_eq!(cfg.valgrind, ValgrindStrategy::None);
        assert_eq!(cfg.test_execution, TestExecution::Runner);
        assert_eq!(cfg.tools.mvn, "mvn");
        assert_eq!(cfg.style.locale, "en");
        assert!(cfg.submit.is_none());
    }

    #[test]
    fn full_config_is_parsed() {
        let raw = parse_str(
            r#"
[project]
name = "viikko1-Tehtava1"
kind = "native"
memory_limit = 64
valgrind = "always"
test_execution = "backend"

[tools]
make = "/usr/bin/make"
langs = "tmc-langs-cli"

[style]
locale = "fi"
max_line_length = 80

[submit]
cmd = ["./submit.sh", "--quiet"]
auto = true
"#,
        )
        .unwrap();
        let cfg = ProjectConfig::try_from(raw).unwrap();

        assert_eq!(cfg.name.as_deref(), Some("viikko1-Tehtava1"));
        assert_eq!(cfg.kind, ProjectKind::Native);
        assert_eq!(cfg.memory_limit, Some(64));
        assert_eq!(cfg.valgrind, ValgrindStrategy::Always);
        assert_eq!(cfg.test_execution, TestExecution::Backend);
        assert_eq!(cfg.tools.make, "/usr/bin/make");
        assert_eq!(cfg.tools.langs.as_deref(), Some("tmc-langs-cli"));
        assert_eq!(cfg.style.max_line_length, 80);
        let submit = cfg.submit.unwrap();
        assert_eq!(submit.cmd, vec!["./submit.sh", "--quiet"]);
        assert!(submit.auto);
    }

    #[test]
    fn unknown_kind_is_config_error() {
        let raw = parse_str("[project]\nkind = \"gradle\"\n").unwrap();
        match ProjectConfig::try_from(raw) {
            Err(ExerunError::Config(msg)) => assert!(msg.contains("gradle")),
            other => panic!("expected Config error, got {other:?}"),
        }
    }

    #[test]
    fn backend_execution_requires_langs_tool() {
        let raw = parse_str("[project]\nkind = \"simple\"\ntest_execution = \"backend\"\n").unwrap();
        assert!(matches!(
            ProjectConfig::try_from(raw),
            Err(ExerunError::Config(_))
        ));
    }

    #[test]
    fn zero_memory_limit_is_rejected() {
        let raw = parse_str("[project]\nkind = \"simple\"\nmemory_limit = 0\n").unwrap();
        assert!(matches!(
            ProjectConfig::try_from(raw),
            Err(ExerunError::Config(_))
        ));
    }

    #[test]
    fn locale_is_case_insensitive() {
        let raw = parse_str("[project]\nkind = \"simple\"\n[style]\nlocale = \"FI\"\n").unwrap();
        assert!(ProjectConfig::try_from(raw).is_ok());

        let raw = parse_str("[project]\nkind = \"simple\"\n[style]\nlocale = \"sv\"\n").unwrap();
        assert!(matches!(
            ProjectConfig::try_from(raw),
            Err(ExerunError::Config(_))
        ));
    }

    #[test]
    fn descriptor_defaults_name_to_directory() {
        let cfg = ProjectConfig::for_kind(ProjectKind::Simple);
        let desc = cfg.descriptor("/home/student/exercises/week1-hello");
        assert_eq!(desc.name, "week1-hello");
        assert_eq!(desc.kind, ProjectKind::Simple);
    }
}
