use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

use exerun::config::{PipelineSettings, ProjectDescriptor, ToolsSection};
use exerun::results::{RawRunResult, RawTestResult, RunStatus};
use exerun::types::{ProjectKind, TestExecution, ValgrindStrategy};

/// An exercise project laid out in a temporary directory.
pub struct ExerciseFixture {
    dir: TempDir,
    name: String,
}

impl ExerciseFixture {
    pub fn new(name: &str) -> Self {
        Self {
            dir: tempfile::tempdir().expect("create fixture dir"),
            name: name.to_string(),
        }
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn path(&self, rel: &str) -> PathBuf {
        self.dir.path().join(rel)
    }

    /// Write `contents` to `rel`, creating parent directories.
    pub fn write(&self, rel: &str, contents: &str) -> PathBuf {
        let path = self.path(rel);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("create fixture subdir");
        }
        std::fs::write(&path, contents).expect("write fixture file");
        path
    }

    /// Write an executable `/bin/sh` script to `rel`.
    #[cfg(unix)]
    pub fn script(&self, rel: &str, body: &str) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;

        let path = self.write(rel, &format!("#!/bin/sh\n{body}\n"));
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755))
            .expect("chmod fixture script");
        path
    }

    pub fn descriptor(&self, kind: ProjectKind) -> ProjectDescriptor {
        ProjectDescriptor::new(&self.name, kind, self.root())
    }
}

/// Builder for `PipelineSettings`.
pub struct SettingsBuilder {
    settings: PipelineSettings,
}

impl SettingsBuilder {
    pub fn new() -> Self {
        Self {
            settings: PipelineSettings::default(),
        }
    }

    /// Run tests through the execution backend instead of a runner process.
    pub fn backend(mut self) -> Self {
        self.settings.test_execution = TestExecution::Backend;
        self
    }

    pub fn valgrind(mut self, strategy: ValgrindStrategy) -> Self {
        self.settings.valgrind = strategy;
        self
    }

    pub fn tools(mut self, f: impl FnOnce(&mut ToolsSection)) -> Self {
        f(&mut self.settings.tools);
        self
    }

    pub fn build(self) -> PipelineSettings {
        self.settings
    }
}

impl Default for SettingsBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Backend run result with the given `(name, successful)` cases.
pub fn raw_run_result(status: RunStatus, cases: &[(&str, bool)]) -> RawRunResult {
    RawRunResult {
        status,
        test_results: cases
            .iter()
            .map(|(name, ok)| RawTestResult {
                name: name.to_string(),
                successful: *ok,
                points: Vec::new(),
                message: if *ok { String::new() } else { format!("{name} failed") },
                exception: Vec::new(),
            })
            .collect(),
        logs: BTreeMap::new(),
    }
}
