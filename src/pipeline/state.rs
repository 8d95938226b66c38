// src/pipeline/state.rs

//! Pipeline state machine.
//!
//! Pure bookkeeping: no I/O, no async. The driver in [`super`] calls
//! [`StateTracker::advance`] for every transition and keeps the history for
//! its report.

use std::fmt;

use anyhow::anyhow;
use tracing::debug;

use crate::errors::{ExerunError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PipelineState {
    Idle,
    Compiling,
    CompileFailed,
    Testing,
    TestRunFailed,
    ResultsReady,
    Submitting,
}

impl PipelineState {
    pub fn as_str(&self) -> &'static str {
        match self {
            PipelineState::Idle => "idle",
            PipelineState::Compiling => "compiling",
            PipelineState::CompileFailed => "compile-failed",
            PipelineState::Testing => "testing",
            PipelineState::TestRunFailed => "test-run-failed",
            PipelineState::ResultsReady => "results-ready",
            PipelineState::Submitting => "submitting",
        }
    }

    /// Whether `self -> next` is a legal transition. Cancellation returns a
    /// running stage straight to `Idle`.
    pub fn can_advance_to(self, next: PipelineState) -> bool {
        use PipelineState::*;
        matches!(
            (self, next),
            (Idle, Compiling)
                | (Compiling, CompileFailed | Testing | Idle)
                | (CompileFailed, Idle)
                | (Testing, TestRunFailed | ResultsReady | Idle)
                | (TestRunFailed, Idle)
                | (ResultsReady, Idle | Submitting)
                | (Submitting, Idle)
        )
    }
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Current state plus every state entered so far, starting at `Idle`.
#[derive(Debug, Clone)]
pub struct StateTracker {
    project: String,
    history: Vec<PipelineState>,
}

impl StateTracker {
    pub fn new(project: impl Into<String>) -> Self {
        Self {
            project: project.into(),
            history: vec![PipelineState::Idle],
        }
    }

    pub fn current(&self) -> PipelineState {
        self.history
            .last()
            .copied()
            .unwrap_or(PipelineState::Idle)
    }

    pub fn advance(&mut self, next: PipelineState) -> Result<()> {
        let current = self.current();
        if !current.can_advance_to(next) {
            return Err(ExerunError::Other(anyhow!(
                "invalid pipeline transition {current} -> {next}"
            )));
        }
        debug!(project = %self.project, from = %current, to = %next, "pipeline state changed");
        self.history.push(next);
        Ok(())
    }

    pub fn history(&self) -> &[PipelineState] {
        &self.history
    }

    pub fn into_history(self) -> Vec<PipelineState> {
        self.history
    }
}
