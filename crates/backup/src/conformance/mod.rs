//! Conformance test suite for `BackupStore` implementations.
//!
//! Backend-agnostic checks any store can run:
//!
//! - **Capture**: snapshots are listed, verifiable and carry file hashes
//! - **Recovery**: restore writes originals back byte for byte
//! - **Errors**: unknown ids and unreadable originals fail cleanly
//!
//! # Usage
//!
//! ```ignore
//! use migr8_backup::conformance::run_conformance_suite;
//!
//! #[tokio::test]
//! async fn my_store_conformance() {
//!     let work = tempfile::tempdir().unwrap();
//!     let report = run_conformance_suite(work.path(), || async { MyStore::new() }).await;
//!     assert!(report.failed == 0, "{report}");
//! }
//! ```

mod capture;
mod recovery;

use std::fmt;
use std::future::Future;
use std::path::{Path, PathBuf};

use crate::BackupStore;

/// Result of a single conformance test.
#[derive(Debug, Clone)]
pub struct TestResult {
    pub category: String,
    pub name: String,
    pub passed: bool,
    pub message: Option<String>,
}

impl TestResult {
    fn from_result(category: &str, name: &str, result: Result<(), String>) -> Self {
        Self {
            category: category.to_string(),
            name: name.to_string(),
            passed: result.is_ok(),
            message: result.err(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ConformanceReport {
    pub results: Vec<TestResult>,
    pub passed: usize,
    pub failed: usize,
    pub total: usize,
}

impl fmt::Display for ConformanceReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Conformance: {}/{} passed ({} failed)",
            self.passed, self.total, self.failed
        )?;
        for r in &self.results {
            if !r.passed {
                writeln!(
                    f,
                    "  FAIL [{}/{}]: {}",
                    r.category,
                    r.name,
                    r.message.as_deref().unwrap_or("(no message)")
                )?;
            }
        }
        Ok(())
    }
}

/// Run the full suite. `factory` is called once per test for a fresh,
/// empty store; each test writes its originals under its own directory
/// inside `workdir`.
pub async fn run_conformance_suite<S, F, Fut>(workdir: &Path, factory: F) -> ConformanceReport
where
    S: BackupStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let mut results = Vec::new();
    results.extend(capture::run_capture_tests(workdir, &factory).await);
    results.extend(recovery::run_recovery_tests(workdir, &factory).await);

    let passed = results.iter().filter(|r| r.passed).count();
    let total = results.len();
    ConformanceReport {
        results,
        passed,
        failed: total - passed,
        total,
    }
}

// ── Helpers ──────────────────────────────────────────────────────────

/// Write `files` under `workdir/<test>/` and return their paths.
async fn originals(workdir: &Path, test: &str, files: &[(&str, &str)]) -> Result<Vec<PathBuf>, String> {
    let dir = workdir.join(test);
    tokio::fs::create_dir_all(&dir)
        .await
        .map_err(|e| format!("create {}: {}", dir.display(), e))?;
    let mut paths = Vec::new();
    for (name, content) in files {
        let path = dir.join(name);
        tokio::fs::write(&path, content)
            .await
            .map_err(|e| format!("write {}: {}", path.display(), e))?;
        paths.push(path);
    }
    Ok(paths)
}

fn check(cond: bool, msg: impl Into<String>) -> Result<(), String> {
    if cond {
        Ok(())
    } else {
        Err(msg.into())
    }
}
