// src/collab/mod.rs

//! Collaborators the core calls into.
//!
//! The pipeline never talks to a UI directly. It is handed a
//! [`Collaborators`] bundle at construction time and reports through it.
//! The binary wires in the console implementations from [`console`]; tests
//! use recording fakes.

use std::sync::Arc;

use crate::config::ProjectDescriptor;
use crate::errors::ExerunError;
use crate::results::{TestRunResult, ValidationResult};

pub mod console;

/// Presents results to the user.
pub trait ResultDisplay: Send + Sync {
    /// Show a finished test run. Returns `true` when the user asked for the
    /// exercise to be submitted.
    fn show_test_run_result(&self, result: &TestRunResult) -> bool;

    fn show_validation_result(&self, result: &ValidationResult);
}

/// Hands a project over for submission. Fire-and-forget from the core's
/// perspective: failures are the submitter's own concern.
pub trait Submitter: Send + Sync {
    fn submit(&self, project: &ProjectDescriptor);
}

/// User-visible error channel. One call per failure.
pub trait ErrorReporter: Send + Sync {
    fn display_error(&self, message: &str, cause: Option<&ExerunError>);
}

/// Append-only channel for live process output, keyed by project name.
pub trait OutputSink: Send + Sync {
    fn append(&self, channel: &str, line: &str);
}

/// Sink that drops everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl OutputSink for NullSink {
    fn append(&self, _channel: &str, _line: &str) {}
}

/// Everything the pipeline and the style adapter report to.
#[derive(Clone)]
pub struct Collaborators {
    pub display: Arc<dyn ResultDisplay>,
    pub submitter: Arc<dyn Submitter>,
    pub errors: Arc<dyn ErrorReporter>,
    pub output: Arc<dyn OutputSink>,
}

impl std::fmt::Debug for Collaborators {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Collaborators").finish_non_exhaustive()
    }
}
