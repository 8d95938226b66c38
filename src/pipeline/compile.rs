// src/pipeline/compile.rs

//! Build-tool invocations, selected by project kind.
//!
//! This is the one place where the project kind picks a build strategy; the
//! match is exhaustive, so a new kind cannot be silently ignored.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::config::{ProjectDescriptor, ToolsSection};
use crate::errors::{ExerunError, Result};
use crate::exec::CommandSpec;
use crate::fs::FileSystem;
use crate::types::ProjectKind;

pub const BUILD_SCRIPT: &str = "build.xml";
pub const SIMPLE_COMPILE_TARGET: &str = "compile-test";
pub const MANAGED_COMPILE_GOAL: &str = "test-compile";
pub const MANAGED_TEST_GOAL: &str = "fi.helsinki.cs.tmc:tmc-maven-plugin:1.3:test";
pub const MANAGED_JVM_OPTS_PROPERTY: &str = "tmc.test.jvmOpts";
pub const NATIVE_COMPILE_TARGET: &str = "test";

/// One invocation of a build tool against a project directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildInvocation {
    /// Run named targets of a build script (`ant -f build.xml <targets>`).
    ScriptTarget {
        tool: String,
        script: PathBuf,
        targets: Vec<String>,
    },
    /// Run named goals with `-Dkey=value` properties (`mvn -B <goals>`).
    Goal {
        tool: String,
        goals: Vec<String>,
        properties: BTreeMap<String, String>,
    },
    /// Run makefile targets (`make <targets>`).
    MakeTarget { tool: String, targets: Vec<String> },
}

impl BuildInvocation {
    pub fn to_command(&self, project_dir: &Path) -> CommandSpec {
        match self {
            BuildInvocation::ScriptTarget {
                tool,
                script,
                targets,
            } => CommandSpec::new(tool, project_dir)
                .arg("-f")
                .arg(script.to_string_lossy())
                .args(targets.iter().cloned()),
            BuildInvocation::Goal {
                tool,
                goals,
                properties,
            } => CommandSpec::new(tool, project_dir)
                .arg("-B")
                .args(goals.iter().cloned())
                .args(properties.iter().map(|(k, v)| format!("-D{k}={v}"))),
            BuildInvocation::MakeTarget { tool, targets } => {
                CommandSpec::new(tool, project_dir).args(targets.iter().cloned())
            }
        }
    }
}

/// Properties passed to managed-project goals: a heap cap when the exercise
/// declares a memory limit.
pub fn managed_properties(project: &ProjectDescriptor) -> BTreeMap<String, String> {
    let mut props = BTreeMap::new();
    if let Some(limit) = project.memory_limit {
        props.insert(MANAGED_JVM_OPTS_PROPERTY.to_string(), format!("-Xmx{limit}m"));
    }
    props
}

/// Select the compile invocation for `project`.
///
/// A simple project without a build script is a configuration error.
pub fn compile_invocation(
    project: &ProjectDescriptor,
    tools: &ToolsSection,
    fs: &dyn FileSystem,
) -> Result<BuildInvocation> {
    match project.kind {
        ProjectKind::Simple => {
            let script = project.root.join(BUILD_SCRIPT);
            if !fs.is_file(&script) {
                return Err(ExerunError::Config(format!(
                    "project '{}' has no {BUILD_SCRIPT}",
                    project.name
                )));
            }
            Ok(BuildInvocation::ScriptTarget {
                tool: tools.ant.clone(),
                script: PathBuf::from(BUILD_SCRIPT),
                targets: vec![SIMPLE_COMPILE_TARGET.to_string()],
            })
        }
        ProjectKind::Managed => Ok(BuildInvocation::Goal {
            tool: tools.mvn.clone(),
            goals: vec![MANAGED_COMPILE_GOAL.to_string()],
            properties: managed_properties(project),
        }),
        ProjectKind::Native => Ok(BuildInvocation::MakeTarget {
            tool: tools.make.clone(),
            targets: vec![NATIVE_COMPILE_TARGET.to_string()],
        }),
    }
}

/// Compile command for `project`, ready for the process runner.
pub fn compile_command(
    project: &ProjectDescriptor,
    tools: &ToolsSection,
    fs: &dyn FileSystem,
) -> Result<CommandSpec> {
    Ok(compile_invocation(project, tools, fs)?.to_command(&project.root))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::mock::MockFileSystem;

    fn tools() -> ToolsSection {
        ToolsSection::default()
    }

    #[test]
    fn simple_project_runs_compile_test_target() {
        let fs = MockFileSystem::new();
        fs.add_file("/ex/hello/build.xml", "<project/>");
        let project = ProjectDescriptor::new("hello", ProjectKind::Simple, "/ex/hello");

        let cmd = compile_command(&project, &tools(), &fs).unwrap();
        assert_eq!(cmd.program, "ant");
        assert_eq!(cmd.args, vec!["-f", "build.xml", "compile-test"]);
        assert_eq!(cmd.cwd, PathBuf::from("/ex/hello"));
    }

    #[test]
    fn simple_project_without_build_script_is_config_error() {
        let fs = MockFileSystem::new();
        fs.add_dir("/ex/hello");
        let project = ProjectDescriptor::new("hello", ProjectKind::Simple, "/ex/hello");

        match compile_command(&project, &tools(), &fs) {
            Err(ExerunError::Config(msg)) => assert!(msg.contains("build.xml")),
            other => panic!("expected Config error, got {other:?}"),
        }
    }

    #[test]
    fn managed_project_adds_heap_property_for_memory_limit() {
        let fs = MockFileSystem::new();
        let project =
            ProjectDescriptor::new("calc", ProjectKind::Managed, "/ex/calc").with_memory_limit(256);

        let cmd = compile_command(&project, &tools(), &fs).unwrap();
        assert_eq!(cmd.program, "mvn");
        assert_eq!(
            cmd.args,
            vec!["-B", "test-compile", "-Dtmc.test.jvmOpts=-Xmx256m"]
        );
    }

    #[test]
    fn managed_project_without_limit_has_no_properties() {
        let fs = MockFileSystem::new();
        let project = ProjectDescriptor::new("calc", ProjectKind::Managed, "/ex/calc");

        let cmd = compile_command(&project, &tools(), &fs).unwrap();
        assert_eq!(cmd.args, vec!["-B", "test-compile"]);
    }

    #[test]
    fn native_project_runs_make_test() {
        let fs = MockFileSystem::new();
        let mut tools = tools();
        tools.make = "/usr/bin/make".to_string();
        let project = ProjectDescriptor::new("c-ex", ProjectKind::Native, "/ex/c");

        let cmd = compile_command(&project, &tools, &fs).unwrap();
        assert_eq!(cmd.program, "/usr/bin/make");
        assert_eq!(cmd.args, vec!["test"]);
    }
}
