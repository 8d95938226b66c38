// src/config/validate.rs

use crate::config::model::{ProjectConfig, RawConfigFile};
use crate::errors::{ExerunError, Result};
use crate::style::Locale;
use crate::types::{ProjectKind, TestExecution};

impl TryFrom<RawConfigFile> for ProjectConfig {
    type Error = ExerunError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        let kind = validate_kind(&raw)?;
        validate_memory_limit(&raw)?;
        validate_backend(&raw)?;
        validate_submit(&raw)?;
        validate_style(&raw)?;

        Ok(ProjectConfig {
            name: raw.project.name,
            kind,
            memory_limit: raw.project.memory_limit,
            valgrind: raw.project.valgrind,
            test_execution: raw.project.test_execution,
            tools: raw.tools,
            style: raw.style,
            submit: raw.submit,
        })
    }
}

fn validate_kind(cfg: &RawConfigFile) -> Result<ProjectKind> {
    cfg.project.kind.parse().map_err(ExerunError::Config)
}

fn validate_memory_limit(cfg: &RawConfigFile) -> Result<()> {
    if cfg.project.memory_limit == Some(0) {
        return Err(ExerunError::Config(
            "[project].memory_limit must be >= 1 (got 0)".to_string(),
        ));
    }
    Ok(())
}

fn validate_backend(cfg: &RawConfigFile) -> Result<()> {
    if cfg.project.test_execution == TestExecution::Backend && cfg.tools.langs.is_none() {
        return Err(ExerunError::Config(
            "test_execution = \"backend\" requires [tools].langs to be set".to_string(),
        ));
    }
    Ok(())
}

fn validate_submit(cfg: &RawConfigFile) -> Result<()> {
    if let Some(submit) = &cfg.submit {
        if submit.cmd.is_empty() {
            return Err(ExerunError::Config(
                "[submit].cmd must name at least the program to run".to_string(),
            ));
        }
    }
    Ok(())
}

fn validate_style(cfg: &RawConfigFile) -> Result<()> {
    cfg.style.locale.parse::<Locale>()?;
    if cfg.style.max_line_length == 0 {
        return Err(ExerunError::Config(
            "[style].max_line_length must be >= 1 (got 0)".to_string(),
        ));
    }
    Ok(())
}
