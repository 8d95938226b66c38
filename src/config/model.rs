// src/config/model.rs

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::types::{ProjectKind, TestExecution, ValgrindStrategy};

/// Top-level `Exerun.toml` as read from disk, before validation.
///
/// ```toml
/// [project]
/// name = "hello-world"
/// kind = "simple"
/// memory_limit = 256
///
/// [tools]
/// java = "/usr/lib/jvm/java-17/bin/java"
///
/// [submit]
/// cmd = ["./submit.sh"]
/// ```
///
/// Every section except `[project]` is optional.
#[derive(Debug, Clone, Deserialize)]
pub struct RawConfigFile {
    pub project: ProjectSection,

    #[serde(default)]
    pub tools: ToolsSection,

    #[serde(default)]
    pub style: StyleSection,

    #[serde(default)]
    pub submit: Option<SubmitSection>,
}

/// `[project]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct ProjectSection {
    /// Display name; defaults to the project directory name.
    #[serde(default)]
    pub name: Option<String>,

    /// `"simple"`, `"managed"` or `"native"`. Kept as a string here so that an
    /// unknown kind is reported as a configuration error by validation.
    pub kind: String,

    /// Declared memory limit in megabytes.
    #[serde(default)]
    pub memory_limit: Option<u32>,

    #[serde(default)]
    pub valgrind: ValgrindStrategy,

    #[serde(default)]
    pub test_execution: TestExecution,
}

/// `[tools]` section: executables used by the build and test stages.
#[derive(Debug, Clone, Deserialize)]
pub struct ToolsSection {
    #[serde(default = "default_ant")]
    pub ant: String,
    #[serde(default = "default_mvn")]
    pub mvn: String,
    #[serde(default = "default_java")]
    pub java: String,
    #[serde(default = "default_make")]
    pub make: String,
    #[serde(default = "default_valgrind")]
    pub valgrind: String,
    /// Multi-language execution backend CLI. `None` disables the backend.
    #[serde(default)]
    pub langs: Option<String>,
}

fn default_ant() -> String {
    "ant".to_string()
}

fn default_mvn() -> String {
    "mvn".to_string()
}

fn default_java() -> String {
    "java".to_string()
}

fn default_make() -> String {
    "make".to_string()
}

fn default_valgrind() -> String {
    "valgrind".to_string()
}

impl Default for ToolsSection {
    fn default() -> Self {
        Self {
            ant: default_ant(),
            mvn: default_mvn(),
            java: default_java(),
            make: default_make(),
            valgrind: default_valgrind(),
            langs: None,
        }
    }
}

/// `[style]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct StyleSection {
    /// Message language for the legacy checker (`en` or `fi`).
    #[serde(default = "default_locale")]
    pub locale: String,

    #[serde(default = "default_max_line_length")]
    pub max_line_length: usize,
}

fn default_locale() -> String {
    "en".to_string()
}

fn default_max_line_length() -> usize {
    120
}

impl Default for StyleSection {
    fn default() -> Self {
        Self {
            locale: default_locale(),
            max_line_length: default_max_line_length(),
        }
    }
}

/// `[submit]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct SubmitSection {
    /// External command run (fire-and-forget) when a submission is requested.
    pub cmd: Vec<String>,

    /// Request submission automatically when every test case passed.
    #[serde(default)]
    pub auto: bool,
}

/// Validated project configuration.
///
/// Constructed through `TryFrom<RawConfigFile>` (see `validate.rs`).
#[derive(Debug, Clone)]
pub struct ProjectConfig {
    pub name: Option<String>,
    pub kind: ProjectKind,
    pub memory_limit: Option<u32>,
    pub valgrind: ValgrindStrategy,
    pub test_execution: TestExecution,
    pub tools: ToolsSection,
    pub style: StyleSection,
    pub submit: Option<SubmitSection>,
}

impl ProjectConfig {
    /// A configuration with defaults for everything but the kind.
    pub fn for_kind(kind: ProjectKind) -> Self {
        Self {
            name: None,
            kind,
            memory_limit: None,
            valgrind: ValgrindStrategy::default(),
            test_execution: TestExecution::default(),
            tools: ToolsSection::default(),
            style: StyleSection::default(),
            submit: None,
        }
    }

    /// Describe the project rooted at `root`.
    pub fn descriptor(&self, root: impl Into<PathBuf>) -> ProjectDescriptor {
        let root = root.into();
        let name = self
            .name
            .clone()
            .unwrap_or_else(|| dir_name(&root));
        ProjectDescriptor {
            name,
            kind: self.kind,
            root,
            memory_limit: self.memory_limit,
        }
    }

    /// Settings consumed by the compile/test pipeline.
    pub fn pipeline_settings(&self) -> PipelineSettings {
        PipelineSettings {
            test_execution: self.test_execution,
            valgrind: self.valgrind,
            tools: self.tools.clone(),
        }
    }
}

fn dir_name(root: &Path) -> String {
    root.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| root.display().to_string())
}

/// Everything the core needs to know about one exercise project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectDescriptor {
    pub name: String,
    pub kind: ProjectKind,
    pub root: PathBuf,
    /// Declared memory limit in megabytes.
    pub memory_limit: Option<u32>,
}

impl ProjectDescriptor {
    pub fn new(name: impl Into<String>, kind: ProjectKind, root: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            kind,
            root: root.into(),
            memory_limit: None,
        }
    }

    pub fn with_memory_limit(mut self, megabytes: u32) -> Self {
        self.memory_limit = Some(megabytes);
        self
    }
}

/// Per-invocation pipeline settings derived from the config.
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub test_execution: TestExecution,
    pub valgrind: ValgrindStrategy,
    pub tools: ToolsSection,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            test_execution: TestExecution::default(),
            valgrind: ValgrindStrategy::default(),
            tools: ToolsSection::default(),
        }
    }
}
