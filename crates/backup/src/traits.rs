use std::path::PathBuf;

use async_trait::async_trait;

use crate::error::BackupError;
use crate::record::{BackupId, BackupRecord};

/// Where originals go before a file is rewritten.
///
/// ## Write protocol
///
/// 1. `snapshot(files)` -- must have completed durably before any of
///    `files` is overwritten
/// 2. the caller writes the new content
/// 3. `verify(id)` -- the snapshot can still restore every original
///
/// A failed write is never rolled back automatically; the caller reports
/// the id and the user runs `restore(id)`.
///
/// ## Thread Safety
///
/// Implementations must be `Send + Sync + 'static` to be shared across
/// the write tasks of one run.
#[async_trait]
pub trait BackupStore: Send + Sync + 'static {
    // ── Capture ──────────────────────────────────────────────────────────

    /// Capture the current content of `files`.
    ///
    /// Returns `Err(BackupError::Io)` if any file cannot be read; nothing is
    /// recorded in that case.
    async fn snapshot(&self, files: &[PathBuf], description: &str)
        -> Result<BackupId, BackupError>;

    /// Check that every object of a snapshot is present and intact.
    ///
    /// Returns `Err(BackupError::NotFound)` for an unknown id.
    async fn verify(&self, id: &BackupId) -> Result<bool, BackupError>;

    // ── Queries and recovery ─────────────────────────────────────────────

    /// All snapshots, oldest first.
    async fn list(&self) -> Result<Vec<BackupRecord>, BackupError>;

    /// Write every original of a snapshot back to its path. Returns the
    /// restored paths.
    ///
    /// Returns `Err(BackupError::Corrupt)` without writing anything if any
    /// object fails its hash check.
    async fn restore(&self, id: &BackupId) -> Result<Vec<PathBuf>, BackupError>;
}
