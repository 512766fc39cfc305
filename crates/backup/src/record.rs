use std::fmt;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use time::macros::format_description;
use time::{OffsetDateTime, UtcOffset};

/// Identifies one snapshot: a compact UTC timestamp plus a short hash,
/// e.g. `20260301T141503-9f2c61d0`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BackupId(pub String);

impl BackupId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BackupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for BackupId {
    fn from(s: &str) -> Self {
        BackupId(s.to_string())
    }
}

/// One file captured by a snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackedUpFile {
    pub path: PathBuf,
    /// Hex SHA-256 of the original content.
    pub sha256: String,
    pub size: u64,
}

/// A snapshot manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackupRecord {
    pub id: BackupId,
    /// RFC 3339 timestamp string.
    pub created_at: String,
    pub description: String,
    pub files: Vec<BackedUpFile>,
}

/// Hex SHA-256 of `bytes`.
pub fn content_hash(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}

static SEQ: AtomicU64 = AtomicU64::new(0);

/// RFC 3339 form of `at` in UTC with fixed-width nanoseconds, so that
/// timestamps sort as strings.
pub(crate) fn timestamp(at: OffsetDateTime) -> String {
    at.to_offset(UtcOffset::UTC)
        .format(format_description!(
            "[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond digits:9]Z"
        ))
        .unwrap_or_else(|_| "unknown".to_string())
}

/// A fresh id for a snapshot taken at `at`. Ids taken in the same second
/// differ in their hash part.
pub(crate) fn new_backup_id(at: OffsetDateTime, description: &str, files: &[BackedUpFile]) -> BackupId {
    let stamp = at
        .format(format_description!("[year][month][day]T[hour][minute][second]"))
        .unwrap_or_else(|_| "00000000T000000".to_string());
    let mut hasher = Sha256::new();
    hasher.update(at.unix_timestamp_nanos().to_le_bytes());
    hasher.update(SEQ.fetch_add(1, Ordering::Relaxed).to_le_bytes());
    hasher.update(description.as_bytes());
    for file in files {
        hasher.update(file.path.to_string_lossy().as_bytes());
        hasher.update(file.sha256.as_bytes());
    }
    let hash = format!("{:x}", hasher.finalize());
    BackupId(format!("{}-{}", stamp, &hash[..8]))
}
