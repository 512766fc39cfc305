//! Source provider abstraction for filesystem-independent scanning.
//!
//! The [`SourceProvider`] trait abstracts file enumeration and reading so the
//! graph builder and the orchestrator can run against an in-memory tree in
//! tests exactly as they do against a real project.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use globset::{Glob, GlobSet, GlobSetBuilder};
use serde::{Deserialize, Serialize};
use tracing::warn;
use walkdir::WalkDir;

/// Directory names skipped unless the caller overrides the exclusion list.
pub const DEFAULT_EXCLUDE: &[&str] = &["node_modules", ".git", "dist", "build"];
pub const DEFAULT_INCLUDE: &[&str] = &["**/*.{js,jsx,ts,tsx,mjs,cjs,mts,cts}"];
pub const DEFAULT_IGNORE: &[&str] = &["**/*.d.ts"];

/// Which files under the root take part in a scan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanOptions {
    /// Directory-name patterns; a directory whose name matches is not entered.
    pub exclude: Vec<String>,
    /// Globs (relative to the root) a file must match.
    pub include: Vec<String>,
    /// Globs (relative to the root) that drop an otherwise included file.
    pub ignore: Vec<String>,
}

impl Default for ScanOptions {
    fn default() -> Self {
        ScanOptions {
            exclude: DEFAULT_EXCLUDE.iter().map(|s| s.to_string()).collect(),
            include: DEFAULT_INCLUDE.iter().map(|s| s.to_string()).collect(),
            ignore: DEFAULT_IGNORE.iter().map(|s| s.to_string()).collect(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ScanError {
    #[error("invalid pattern '{pattern}': {message}")]
    Pattern { pattern: String, message: String },
    #[error("cannot read project root {}: {source}", root.display())]
    Root {
        root: PathBuf,
        source: std::io::Error,
    },
}

/// Compiled form of [`ScanOptions`].
pub struct SourceFilter {
    exclude: GlobSet,
    include: GlobSet,
    ignore: GlobSet,
}

impl SourceFilter {
    pub fn new(options: &ScanOptions) -> Result<Self, ScanError> {
        Ok(SourceFilter {
            exclude: build_set(&options.exclude)?,
            include: build_set(&options.include)?,
            ignore: build_set(&options.ignore)?,
        })
    }

    pub fn excludes_dir(&self, name: &str) -> bool {
        self.exclude.is_match(name)
    }

    /// `relative` is the file path relative to the scan root.
    pub fn accepts_file(&self, relative: &Path) -> bool {
        let dirs_ok = relative
            .parent()
            .map(|p| {
                p.components()
                    .all(|c| !self.excludes_dir(&c.as_os_str().to_string_lossy()))
            })
            .unwrap_or(true);
        dirs_ok && self.include.is_match(relative) && !self.ignore.is_match(relative)
    }
}

fn build_set(patterns: &[String]) -> Result<GlobSet, ScanError> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = Glob::new(pattern).map_err(|e| ScanError::Pattern {
            pattern: pattern.clone(),
            message: e.to_string(),
        })?;
        builder.add(glob);
    }
    builder.build().map_err(|e| ScanError::Pattern {
        pattern: patterns.join(","),
        message: e.to_string(),
    })
}

/// Stable cross-file order: parent directory first, then file name.
pub fn source_order(a: &Path, b: &Path) -> Ordering {
    (a.parent(), a.file_name()).cmp(&(b.parent(), b.file_name()))
}

/// Enumerates and reads source files.
pub trait SourceProvider: Send + Sync {
    /// All source files under `root` accepted by `options`, in
    /// [`source_order`].
    fn list_sources(&self, root: &Path, options: &ScanOptions) -> Result<Vec<PathBuf>, ScanError>;

    /// Read the source text for a given path.
    fn read_source(&self, path: &Path) -> Result<String, std::io::Error>;
}

/// Default filesystem-backed provider.
pub struct FileSystemProvider;

impl SourceProvider for FileSystemProvider {
    fn list_sources(&self, root: &Path, options: &ScanOptions) -> Result<Vec<PathBuf>, ScanError> {
        let filter = SourceFilter::new(options)?;
        std::fs::metadata(root).map_err(|source| ScanError::Root {
            root: root.to_path_buf(),
            source,
        })?;

        let mut files = Vec::new();
        let walker = WalkDir::new(root)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| {
                e.depth() == 0
                    || !e.file_type().is_dir()
                    || !filter.excludes_dir(&e.file_name().to_string_lossy())
            });
        for entry in walker {
            let entry = match entry {
                Ok(e) => e,
                Err(e) => {
                    warn!(error = %e, "skipping unreadable directory entry");
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }
            let relative = entry.path().strip_prefix(root).unwrap_or(entry.path());
            if filter.accepts_file(relative) {
                files.push(entry.into_path());
            }
        }
        files.sort_by(|a, b| source_order(a, b));
        Ok(files)
    }

    fn read_source(&self, path: &Path) -> Result<String, std::io::Error> {
        std::fs::read_to_string(path)
    }
}

/// In-memory source provider for testing.
pub struct InMemoryProvider {
    files: HashMap<PathBuf, String>,
}

impl InMemoryProvider {
    pub fn new(files: HashMap<PathBuf, String>) -> Self {
        Self { files }
    }

    /// Convenience constructor from `(path, text)` pairs.
    pub fn from_pairs<P: Into<PathBuf>, S: Into<String>>(pairs: impl IntoIterator<Item = (P, S)>) -> Self {
        Self::new(
            pairs
                .into_iter()
                .map(|(p, s)| (p.into(), s.into()))
                .collect(),
        )
    }
}

impl SourceProvider for InMemoryProvider {
    fn list_sources(&self, root: &Path, options: &ScanOptions) -> Result<Vec<PathBuf>, ScanError> {
        let filter = SourceFilter::new(options)?;
        let mut files: Vec<PathBuf> = self
            .files
            .keys()
            .filter(|p| {
                p.strip_prefix(root)
                    .map(|rel| filter.accepts_file(rel))
                    .unwrap_or(false)
            })
            .cloned()
            .collect();
        files.sort_by(|a, b| source_order(a, b));
        Ok(files)
    }

    fn read_source(&self, path: &Path) -> Result<String, std::io::Error> {
        self.files.get(path).cloned().ok_or_else(|| {
            std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("file not found in memory: {}", path.display()),
            )
        })
    }
}
