// src/errors.rs

//! Crate-wide error type and result alias.
//!
//! Stages convert tool-level failures into one of these variants before they
//! reach the caller, so nothing lower-level leaks across the pipeline boundary.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExerunError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("failed to start '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("working directory {0:?} does not exist or is not a directory")]
    InvalidWorkingDir(PathBuf),

    #[error("{stage} failed with exit status {status}")]
    ToolFailed {
        stage: String,
        status: i32,
        diagnostics: String,
    },

    #[error("Failed to read test results: {0}")]
    ResultFormat(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ExerunError {
    /// Raw diagnostic text captured from a tool, if this error carries any.
    pub fn diagnostics(&self) -> Option<&str> {
        match self {
            ExerunError::ToolFailed { diagnostics, .. } if !diagnostics.trim().is_empty() => {
                Some(diagnostics.as_str())
            }
            _ => None,
        }
    }

    /// Recover the crate error from a failed unit of work, wrapping anything
    /// else as `Other`.
    pub fn from_task_error(err: anyhow::Error) -> Self {
        match err.downcast::<ExerunError>() {
            Ok(e) => e,
            Err(other) => ExerunError::Other(other),
        }
    }

    /// Human-readable message with any captured diagnostics appended.
    pub fn user_message(&self) -> String {
        match self.diagnostics() {
            Some(diag) => format!("{self}\n{}", diag.trim_end()),
            None => self.to_string(),
        }
    }
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, ExerunError>;
