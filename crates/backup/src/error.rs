use std::path::PathBuf;

use crate::record::BackupId;

/// All errors that can be returned by a BackupStore implementation.
#[derive(Debug, thiserror::Error)]
pub enum BackupError {
    /// Reading an original, or reading or writing the store itself, failed.
    #[error("{}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// No snapshot with this id.
    #[error("backup not found: {0}")]
    NotFound(BackupId),

    /// Stored content no longer matches the recorded hash.
    #[error("backup {id} is corrupt: {message}")]
    Corrupt { id: BackupId, message: String },

    /// A snapshot manifest could not be written or parsed.
    #[error("backup manifest {}: {source}", path.display())]
    Manifest {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl BackupError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        BackupError::Io {
            path: path.into(),
            source,
        }
    }
}
