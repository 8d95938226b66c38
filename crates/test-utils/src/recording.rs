use std::sync::{Arc, Mutex};

use exerun::collab::{Collaborators, ErrorReporter, OutputSink, ResultDisplay, Submitter};
use exerun::config::ProjectDescriptor;
use exerun::errors::ExerunError;
use exerun::results::{TestRunResult, ValidationResult};

/// Display collaborator that records what it was shown.
#[derive(Default)]
pub struct RecordingDisplay {
    request_submit: bool,
    test_runs: Mutex<Vec<TestRunResult>>,
    validations: Mutex<Vec<ValidationResult>>,
}

impl RecordingDisplay {
    pub fn test_runs(&self) -> Vec<TestRunResult> {
        self.test_runs.lock().unwrap().clone()
    }

    pub fn validations(&self) -> Vec<ValidationResult> {
        self.validations.lock().unwrap().clone()
    }
}

impl ResultDisplay for RecordingDisplay {
    fn show_test_run_result(&self, result: &TestRunResult) -> bool {
        self.test_runs.lock().unwrap().push(result.clone());
        self.request_submit
    }

    fn show_validation_result(&self, result: &ValidationResult) {
        self.validations.lock().unwrap().push(result.clone());
    }
}

/// Records the names of submitted projects.
#[derive(Default)]
pub struct RecordingSubmitter {
    submitted: Mutex<Vec<String>>,
}

impl RecordingSubmitter {
    pub fn submitted(&self) -> Vec<String> {
        self.submitted.lock().unwrap().clone()
    }
}

impl Submitter for RecordingSubmitter {
    fn submit(&self, project: &ProjectDescriptor) {
        self.submitted.lock().unwrap().push(project.name.clone());
    }
}

/// One reported error: the headline plus the cause's user message, if any.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportedError {
    pub message: String,
    pub cause: Option<String>,
}

#[derive(Default)]
pub struct RecordingErrors {
    errors: Mutex<Vec<ReportedError>>,
}

impl RecordingErrors {
    pub fn errors(&self) -> Vec<ReportedError> {
        self.errors.lock().unwrap().clone()
    }
}

impl ErrorReporter for RecordingErrors {
    fn display_error(&self, message: &str, cause: Option<&ExerunError>) {
        self.errors.lock().unwrap().push(ReportedError {
            message: message.to_string(),
            cause: cause.map(ExerunError::user_message),
        });
    }
}

/// Records `(channel, line)` pairs.
#[derive(Default)]
pub struct RecordingSink {
    lines: Mutex<Vec<(String, String)>>,
}

impl RecordingSink {
    pub fn lines(&self) -> Vec<(String, String)> {
        self.lines.lock().unwrap().clone()
    }
}

impl OutputSink for RecordingSink {
    fn append(&self, channel: &str, line: &str) {
        self.lines
            .lock()
            .unwrap()
            .push((channel.to_string(), line.to_string()));
    }
}

/// All four recording collaborators, kept so tests can inspect them after
/// handing [`Recorder::collaborators`] to the code under test.
pub struct Recorder {
    pub display: Arc<RecordingDisplay>,
    pub submitter: Arc<RecordingSubmitter>,
    pub errors: Arc<RecordingErrors>,
    pub output: Arc<RecordingSink>,
}

impl Recorder {
    /// Recorder whose display never asks for submission.
    pub fn new() -> Self {
        Self::with_submit_request(false)
    }

    pub fn with_submit_request(request_submit: bool) -> Self {
        Self {
            display: Arc::new(RecordingDisplay {
                request_submit,
                ..RecordingDisplay::default()
            }),
            submitter: Arc::new(RecordingSubmitter::default()),
            errors: Arc::new(RecordingErrors::default()),
            output: Arc::new(RecordingSink::default()),
        }
    }

    pub fn collaborators(&self) -> Collaborators {
        Collaborators {
            display: self.display.clone(),
            submitter: self.submitter.clone(),
            errors: self.errors.clone(),
            output: self.output.clone(),
        }
    }
}

impl Default for Recorder {
    fn default() -> Self {
        Self::new()
    }
}
