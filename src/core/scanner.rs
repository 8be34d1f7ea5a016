//! Source scanner - finds the C++ files to generate tests for

use anyhow::{Context, Result};
use ignore::WalkBuilder;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Extensions treated as C++ sources or headers (compared lower-case)
pub const CPP_EXTENSIONS: &[&str] = &["cpp", "cc", "cxx", "c++", "h", "hpp", "hxx", "h++"];

/// Any relative path containing one of these (lower-case) is skipped
pub const SKIP_FRAGMENTS: &[&str] = &["test", "third_party", "build", ".git"];

/// A discovered source file
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceFile {
    pub path: PathBuf,

    /// Path relative to the project root
    pub relative_path: PathBuf,
}

impl SourceFile {
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// Name of the test file generated for this source: `test_<stem>.cpp`
    pub fn test_file_name(&self) -> String {
        let stem = self
            .path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        format!("test_{}.cpp", stem)
    }
}

/// Walks a project tree and filters C++ files
#[derive(Debug, Clone)]
pub struct SourceScanner {
    root: PathBuf,
}

impl SourceScanner {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn is_cpp_file(path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .map(|e| CPP_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
            .unwrap_or(false)
    }

    pub fn is_skipped(relative_path: &Path) -> bool {
        let lowered = relative_path.to_string_lossy().to_lowercase();
        SKIP_FRAGMENTS.iter().any(|skip| lowered.contains(skip))
    }

    /// Find all C++ sources under the root, sorted by relative path
    pub fn scan(&self) -> Result<Vec<SourceFile>> {
        if !self.root.is_dir() {
            anyhow::bail!("Project path is not a directory: {}", self.root.display());
        }

        let mut files = Vec::new();

        for result in WalkBuilder::new(&self.root)
            .hidden(false)
            .ignore(false)
            .git_ignore(false)
            .git_global(false)
            .git_exclude(false)
            .parents(false)
            .follow_links(false)
            .build()
        {
            let entry = match result {
                Ok(entry) => entry,
                Err(err) => {
                    warn!("Failed to read directory entry: {}", err);
                    continue;
                }
            };

            let path = entry.path();
            if !entry.file_type().is_some_and(|t| t.is_file()) || !Self::is_cpp_file(path) {
                continue;
            }

            let relative_path = path
                .strip_prefix(&self.root)
                .with_context(|| format!("{} is outside the project root", path.display()))?
                .to_path_buf();

            if Self::is_skipped(&relative_path) {
                debug!("Skipping {}", relative_path.display());
                continue;
            }

            files.push(SourceFile {
                path: path.to_path_buf(),
                relative_path,
            });
        }

        files.sort_by(|a, b| a.relative_path.cmp(&b.relative_path));

        info!("Found {} C++ files to generate tests for", files.len());
        Ok(files)
    }
}
