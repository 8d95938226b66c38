// src/fs/mod.rs

//! Filesystem access used for project layout discovery.
//!
//! Test discovery, classpath assembly and the legacy style checker only look
//! at the project tree through [`FileSystem`], so they can run against the
//! in-memory [`mock::MockFileSystem`] in unit tests.

use std::fmt::Debug;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};

pub mod mock;

/// Abstract filesystem interface.
pub trait FileSystem: Send + Sync + Debug {
    fn read_to_string(&self, path: &Path) -> Result<String>;
    fn exists(&self, path: &Path) -> bool;
    fn is_file(&self, path: &Path) -> bool;
    fn is_dir(&self, path: &Path) -> bool;

    /// Return a list of entries in a directory.
    /// Returns full paths.
    fn read_dir(&self, path: &Path) -> Result<Vec<PathBuf>>;
}

/// Implementation that uses `std::fs`.
#[derive(Debug, Clone, Default)]
pub struct RealFileSystem;

impl FileSystem for RealFileSystem {
    fn read_to_string(&self, path: &Path) -> Result<String> {
        fs::read_to_string(path).with_context(|| format!("reading file {:?}", path))
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn is_file(&self, path: &Path) -> bool {
        path.is_file()
    }

    fn is_dir(&self, path: &Path) -> bool {
        path.is_dir()
    }

    fn read_dir(&self, path: &Path) -> Result<Vec<PathBuf>> {
        let mut entries = Vec::new();
        for entry in fs::read_dir(path).with_context(|| format!("reading dir {:?}", path))? {
            let entry = entry?;
            entries.push(entry.path());
        }
        Ok(entries)
    }
}

/// Compile a list of glob patterns (relative, forward slashes) into a set.
pub fn compile_globs(patterns: &[&str]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pat in patterns {
        let glob = Glob::new(pat).with_context(|| format!("invalid glob pattern '{pat}'"))?;
        builder.add(glob);
    }
    builder.build().context("building glob set")
}

/// Recursively collect files under `root` whose root-relative path matches
/// `globs`. Results are sorted so callers see a stable order on every
/// filesystem.
pub fn walk_matching(fs: &dyn FileSystem, root: &Path, globs: &GlobSet) -> Result<Vec<PathBuf>> {
    let mut found = Vec::new();
    if !fs.is_dir(root) {
        return Ok(found);
    }

    let mut stack = vec![root.to_path_buf()];
    while let Some(dir) = stack.pop() {
        for entry in fs.read_dir(&dir)? {
            if fs.is_dir(&entry) {
                stack.push(entry);
            } else if let Some(rel) = relative_str(root, &entry) {
                if globs.is_match(&rel) {
                    found.push(entry);
                }
            }
        }
    }

    found.sort();
    Ok(found)
}

/// Convert a path into a string relative to `root`, with forward slashes.
///
/// Returns `None` if `path` does not live under `root`.
pub fn relative_str(root: &Path, path: &Path) -> Option<String> {
    path.strip_prefix(root)
        .ok()
        .map(|rel| rel.to_string_lossy().replace('\\', "/"))
}

#[cfg(test)]
mod tests {
    use super::mock::MockFileSystem;
    use super::*;

    #[test]
    fn walk_matching_finds_nested_files_in_sorted_order() {
        let fs = MockFileSystem::new();
        fs.add_file("/p/test/b/BTest.java", "class BTest {}");
        fs.add_file("/p/test/ATest.java", "class ATest {}");
        fs.add_file("/p/test/notes.txt", "ignored");

        let globs = compile_globs(&["**/*.java"]).unwrap();
        let files = walk_matching(&fs, Path::new("/p/test"), &globs).unwrap();

        assert_eq!(
            files,
            vec![
                PathBuf::from("/p/test/ATest.java"),
                PathBuf::from("/p/test/b/BTest.java"),
            ]
        );
    }

    #[test]
    fn walk_matching_on_missing_root_is_empty() {
        let fs = MockFileSystem::new();
        let globs = compile_globs(&["**/*.java"]).unwrap();
        let files = walk_matching(&fs, Path::new("/nope"), &globs).unwrap();
        assert!(files.is_empty());
    }
}
