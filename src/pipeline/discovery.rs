// src/pipeline/discovery.rs

//! Project layout discovery for the test stage: test directory, test
//! methods and the runner classpath.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use anyhow::Result;
use regex::Regex;
use tracing::debug;

use crate::config::ProjectDescriptor;
use crate::fs::{compile_globs, relative_str, walk_matching, FileSystem};
use crate::types::ProjectKind;

static PACKAGE_DECL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*package\s+([\w.]+)\s*;").expect("package pattern is valid")
});

static TEST_ANNOTATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"@(?:org\.junit\.)?Test\b").expect("annotation pattern is valid")
});

static METHOD_DECL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\bvoid\s+(\w+)\s*\(").expect("method pattern is valid")
});

/// A test method the bundled runner should execute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestMethod {
    /// Fully qualified class name.
    pub class_name: String,
    pub method_name: String,
}

impl fmt::Display for TestMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.class_name, self.method_name)
    }
}

/// Conventional test source directory for each project kind.
pub fn test_dir_for(project: &ProjectDescriptor) -> PathBuf {
    match project.kind {
        ProjectKind::Simple => project.root.join("test"),
        ProjectKind::Managed => project.root.join("src").join("test").join("java"),
        ProjectKind::Native => project.root.join("test"),
    }
}

/// The project's test directory, if it exists.
pub fn find_test_dir(project: &ProjectDescriptor, fs: &dyn FileSystem) -> Option<PathBuf> {
    let dir = test_dir_for(project);
    fs.is_dir(&dir).then_some(dir)
}

/// Scan `*.java` files under `test_dir` for `@Test` methods.
///
/// Methods are returned grouped by file (sorted by path) and in declaration
/// order within a file.
pub fn find_test_methods(fs: &dyn FileSystem, test_dir: &Path) -> Result<Vec<TestMethod>> {
    let globs = compile_globs(&["**/*.java"])?;
    let mut methods = Vec::new();

    for file in walk_matching(fs, test_dir, &globs)? {
        let source = fs.read_to_string(&file)?;
        let class_name = qualified_class_name(test_dir, &file, &source);
        let found = scan_test_methods(&source);
        debug!(class = %class_name, count = found.len(), "scanned test class");
        methods.extend(found.into_iter().map(|method_name| TestMethod {
            class_name: class_name.clone(),
            method_name,
        }));
    }

    Ok(methods)
}

fn qualified_class_name(test_dir: &Path, file: &Path, source: &str) -> String {
    let simple = file
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();

    let package = source
        .lines()
        .find_map(|line| PACKAGE_DECL.captures(line).map(|c| c[1].to_string()))
        .or_else(|| {
            // No declaration: fall back to the directory layout.
            let rel = relative_str(test_dir, file.parent()?)?;
            (!rel.is_empty()).then(|| rel.replace('/', "."))
        });

    match package {
        Some(pkg) => format!("{pkg}.{simple}"),
        None => simple,
    }
}

fn scan_test_methods(source: &str) -> Vec<String> {
    let mut methods = Vec::new();
    let mut pending = false;

    for line in source.lines() {
        let trimmed = line.trim_start();
        if trimmed.starts_with("//") {
            continue;
        }
        if TEST_ANNOTATION.is_match(line) {
            pending = true;
        }
        if pending {
            if let Some(caps) = METHOD_DECL.captures(line) {
                methods.push(caps[1].to_string());
                pending = false;
            }
        }
    }

    methods
}

/// Classpath for the bundled runner of a simple project: compiled classes,
/// project libraries and the runner's own jars from `lib/testrunner`.
pub fn runner_classpath(project: &ProjectDescriptor, fs: &dyn FileSystem) -> Result<String> {
    let root = &project.root;
    let mut entries = vec![
        root.join("build").join("classes"),
        root.join("build").join("test").join("classes"),
    ];
    entries.extend(jars_in(fs, &root.join("lib"))?);
    entries.extend(jars_in(fs, &root.join("lib").join("testrunner"))?);

    let separator = if cfg!(windows) { ";" } else { ":" };
    Ok(entries
        .iter()
        .map(|p| p.to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join(separator))
}

fn jars_in(fs: &dyn FileSystem, dir: &Path) -> Result<Vec<PathBuf>> {
    if !fs.is_dir(dir) {
        return Ok(Vec::new());
    }
    let mut jars: Vec<PathBuf> = fs
        .read_dir(dir)?
        .into_iter()
        .filter(|p| fs.is_file(p) && p.extension().is_some_and(|ext| ext == "jar"))
        .collect();
    jars.sort();
    Ok(jars)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::mock::MockFileSystem;

    const CALC_TEST: &str = r#"
package fi.example;

import org.junit.Test;
import static org.junit.Assert.*;

public class CalcTest {
    @Test
    public void sumWorks() {
        assertEquals(3, Calc.sum(1, 2));
    }

    // @Test
    // public void disabled() {}

    private void helper() {}

    @Test(timeout = 1000)
    public void productWorks() throws Exception {
    }

    @org.junit.Test public void inlineAnnotation() {}
}
"#;

    #[test]
    fn scans_annotated_methods_in_declaration_order() {
        assert_eq!(
            scan_test_methods(CALC_TEST),
            vec!["sumWorks", "productWorks", "inlineAnnotation"]
        );
    }

    #[test]
    fn finds_methods_with_qualified_names() {
        let fs = MockFileSystem::new();
        fs.add_file("/p/test/fi/example/CalcTest.java", CALC_TEST);
        fs.add_file("/p/test/util/NoPackageTest.java", "class NoPackageTest {\n @Test\n public void a() {}\n}\n");

        let methods = find_test_methods(&fs, Path::new("/p/test")).unwrap();
        let names: Vec<String> = methods.iter().map(ToString::to_string).collect();
        assert_eq!(
            names,
            vec![
                "fi.example.CalcTest.sumWorks",
                "fi.example.CalcTest.productWorks",
                "fi.example.CalcTest.inlineAnnotation",
                "util.NoPackageTest.a",
            ]
        );
    }

    #[test]
    fn test_dir_depends_on_kind() {
        let fs = MockFileSystem::new();
        fs.add_dir("/s/test");
        fs.add_dir("/m/src/test/java");

        let simple = ProjectDescriptor::new("s", ProjectKind::Simple, "/s");
        let managed = ProjectDescriptor::new("m", ProjectKind::Managed, "/m");
        let missing = ProjectDescriptor::new("x", ProjectKind::Simple, "/x");

        assert_eq!(find_test_dir(&simple, &fs), Some(PathBuf::from("/s/test")));
        assert_eq!(
            find_test_dir(&managed, &fs),
            Some(PathBuf::from("/m/src/test/java"))
        );
        assert_eq!(find_test_dir(&missing, &fs), None);
    }

    #[cfg(unix)]
    #[test]
    fn classpath_includes_runner_jars() {
        let fs = MockFileSystem::new();
        fs.add_file("/p/lib/junit-4.10.jar", "");
        fs.add_file("/p/lib/README", "");
        fs.add_file("/p/lib/testrunner/tmc-junit-runner.jar", "");
        let project = ProjectDescriptor::new("p", ProjectKind::Simple, "/p");

        let cp = runner_classpath(&project, &fs).unwrap();
        assert_eq!(
            cp,
            "/p/build/classes:/p/build/test/classes:/p/lib/junit-4.10.jar:/p/lib/testrunner/tmc-junit-runner.jar"
        );
    }
}
