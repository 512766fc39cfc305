//! Filesystem-backed backup store.
//!
//! Layout under the store directory:
//!
//! ```text
//! objects/<sha256>        original file contents, shared between snapshots
//! snapshots/<id>.json     one manifest per snapshot
//! ```
//!
//! Objects and manifests are written to a temporary file, synced and then
//! renamed into place, so a manifest never names an object that is not on
//! disk.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use time::OffsetDateTime;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

use crate::error::BackupError;
use crate::record::{content_hash, new_backup_id, timestamp, BackedUpFile, BackupId, BackupRecord};
use crate::traits::BackupStore;

pub struct FsBackupStore {
    dir: PathBuf,
}

impl FsBackupStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        FsBackupStore { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn object_path(&self, hash: &str) -> PathBuf {
        self.dir.join("objects").join(hash)
    }

    fn manifest_path(&self, id: &BackupId) -> PathBuf {
        self.dir.join("snapshots").join(format!("{}.json", id))
    }

    async fn read_record(&self, id: &BackupId) -> Result<BackupRecord, BackupError> {
        let valid = !id.as_str().is_empty()
            && id
                .as_str()
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-');
        if !valid {
            return Err(BackupError::NotFound(id.clone()));
        }
        let path = self.manifest_path(id);
        let bytes = match fs::read(&path).await {
            Ok(b) => b,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(BackupError::NotFound(id.clone()))
            }
            Err(e) => return Err(BackupError::io(path, e)),
        };
        serde_json::from_slice(&bytes).map_err(|source| BackupError::Manifest { path, source })
    }

    /// Load and hash-check every object of a snapshot.
    async fn load_objects(&self, record: &BackupRecord) -> Result<Vec<Vec<u8>>, BackupError> {
        let mut out = Vec::with_capacity(record.files.len());
        for file in &record.files {
            let path = self.object_path(&file.sha256);
            let bytes = match fs::read(&path).await {
                Ok(b) => b,
                Err(e) if e.kind() == ErrorKind::NotFound => {
                    return Err(BackupError::Corrupt {
                        id: record.id.clone(),
                        message: format!("missing object for {}", file.path.display()),
                    })
                }
                Err(e) => return Err(BackupError::io(path, e)),
            };
            if content_hash(&bytes) != file.sha256 || bytes.len() as u64 != file.size {
                return Err(BackupError::Corrupt {
                    id: record.id.clone(),
                    message: format!("object for {} fails its hash check", file.path.display()),
                });
            }
            out.push(bytes);
        }
        Ok(out)
    }
}

async fn write_durable(path: &Path, bytes: &[u8]) -> Result<(), BackupError> {
    let tmp = path.with_extension("tmp");
    let mut file = fs::File::create(&tmp)
        .await
        .map_err(|e| BackupError::io(&tmp, e))?;
    file.write_all(bytes)
        .await
        .map_err(|e| BackupError::io(&tmp, e))?;
    file.sync_all().await.map_err(|e| BackupError::io(&tmp, e))?;
    drop(file);
    fs::rename(&tmp, path)
        .await
        .map_err(|e| BackupError::io(path, e))
}

async fn ensure_dir(path: &Path) -> Result<(), BackupError> {
    fs::create_dir_all(path)
        .await
        .map_err(|e| BackupError::io(path, e))
}

#[async_trait]
impl BackupStore for FsBackupStore {
    async fn snapshot(
        &self,
        files: &[PathBuf],
        description: &str,
    ) -> Result<BackupId, BackupError> {
        let mut captured = Vec::with_capacity(files.len());
        let mut contents = Vec::with_capacity(files.len());
        for path in files {
            let bytes = fs::read(path).await.map_err(|e| BackupError::io(path, e))?;
            captured.push(BackedUpFile {
                path: path.clone(),
                sha256: content_hash(&bytes),
                size: bytes.len() as u64,
            });
            contents.push(bytes);
        }

        ensure_dir(&self.dir.join("objects")).await?;
        ensure_dir(&self.dir.join("snapshots")).await?;
        for (file, bytes) in captured.iter().zip(&contents) {
            let path = self.object_path(&file.sha256);
            if fs::try_exists(&path).await.unwrap_or(false) {
                debug!(object = %file.sha256, "object already stored");
                continue;
            }
            write_durable(&path, bytes).await?;
        }

        let now = OffsetDateTime::now_utc();
        let record = BackupRecord {
            id: new_backup_id(now, description, &captured),
            created_at: timestamp(now),
            description: description.to_string(),
            files: captured,
        };
        let path = self.manifest_path(&record.id);
        let json = serde_json::to_vec_pretty(&record).map_err(|source| BackupError::Manifest {
            path: path.clone(),
            source,
        })?;
        write_durable(&path, &json).await?;
        info!(id = %record.id, files = record.files.len(), "snapshot taken");
        Ok(record.id)
    }

    async fn verify(&self, id: &BackupId) -> Result<bool, BackupError> {
        let record = self.read_record(id).await?;
        match self.load_objects(&record).await {
            Ok(_) => Ok(true),
            Err(BackupError::Corrupt { message, .. }) => {
                warn!(id = %id, "{}", message);
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }

    async fn list(&self) -> Result<Vec<BackupRecord>, BackupError> {
        let dir = self.dir.join("snapshots");
        let mut entries = match fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(BackupError::io(dir, e)),
        };
        let mut records = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| BackupError::io(&dir, e))?
        {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let parsed = fs::read(&path)
                .await
                .map_err(|e| e.to_string())
                .and_then(|b| serde_json::from_slice::<BackupRecord>(&b).map_err(|e| e.to_string()));
            match parsed {
                Ok(record) => records.push(record),
                Err(e) => warn!(manifest = %path.display(), "skipping unreadable manifest: {}", e),
            }
        }
        records.sort_by(|a, b| (&a.created_at, &a.id).cmp(&(&b.created_at, &b.id)));
        Ok(records)
    }

    async fn restore(&self, id: &BackupId) -> Result<Vec<PathBuf>, BackupError> {
        let record = self.read_record(id).await?;
        let contents = self.load_objects(&record).await?;
        let mut restored = Vec::with_capacity(record.files.len());
        for (file, bytes) in record.files.iter().zip(contents) {
            if let Some(parent) = file.path.parent() {
                if !parent.as_os_str().is_empty() {
                    ensure_dir(parent).await?;
                }
            }
            fs::write(&file.path, bytes)
                .await
                .map_err(|e| BackupError::io(&file.path, e))?;
            restored.push(file.path.clone());
        }
        info!(id = %id, files = restored.len(), "snapshot restored");
        Ok(restored)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn snapshot_writes_objects_and_manifest() {
        let tmp = tempfile::tempdir().unwrap();
        let src = tmp.path().join("App.jsx");
        std::fs::write(&src, "<Button />\n").unwrap();
        let store = FsBackupStore::new(tmp.path().join("store"));

        let id = store.snapshot(&[src.clone()], "test").await.unwrap();
        let records = store.list().await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].id, id);
        let hash = &records[0].files[0].sha256;
        assert!(tmp.path().join("store/objects").join(hash).is_file());
        assert!(store.manifest_path(&id).is_file());
        assert!(store.verify(&id).await.unwrap());
    }

    #[tokio::test]
    async fn tampered_object_fails_verify_and_blocks_restore() {
        let tmp = tempfile::tempdir().unwrap();
        let src = tmp.path().join("App.jsx");
        std::fs::write(&src, "original").unwrap();
        let store = FsBackupStore::new(tmp.path().join("store"));
        let id = store.snapshot(&[src.clone()], "test").await.unwrap();

        let record = store.read_record(&id).await.unwrap();
        std::fs::write(store.object_path(&record.files[0].sha256), "tampered").unwrap();
        std::fs::write(&src, "changed").unwrap();

        assert!(!store.verify(&id).await.unwrap());
        let err = store.restore(&id).await.unwrap_err();
        assert!(matches!(err, BackupError::Corrupt { .. }));
        assert_eq!(std::fs::read_to_string(&src).unwrap(), "changed");
    }

    #[tokio::test]
    async fn ids_with_path_characters_are_not_found() {
        let tmp = tempfile::tempdir().unwrap();
        let store = FsBackupStore::new(tmp.path());
        let err = store.verify(&BackupId::from("../etc")).await.unwrap_err();
        assert!(matches!(err, BackupError::NotFound(_)));
    }

    #[tokio::test]
    async fn unreadable_manifests_are_skipped() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(tmp.path().join("snapshots")).unwrap();
        std::fs::write(tmp.path().join("snapshots/bad.json"), "{").unwrap();
        let store = FsBackupStore::new(tmp.path());
        assert!(store.list().await.unwrap().is_empty());
    }
}
