//! In-memory backup store for tests and dry experiments. Originals are
//! still read from and restored to the real filesystem; only the store
//! itself lives in memory.

use std::collections::HashMap;
use std::path::PathBuf;

use async_trait::async_trait;
use time::OffsetDateTime;
use tokio::sync::Mutex;

use crate::error::BackupError;
use crate::record::{content_hash, new_backup_id, timestamp, BackedUpFile, BackupId, BackupRecord};
use crate::traits::BackupStore;

#[derive(Default)]
struct State {
    objects: HashMap<String, Vec<u8>>,
    records: Vec<BackupRecord>,
}

#[derive(Default)]
pub struct MemoryBackupStore {
    state: Mutex<State>,
}

impl MemoryBackupStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop the stored content of every file in a snapshot.
    pub async fn forget_objects(&self, id: &BackupId) {
        let mut state = self.state.lock().await;
        let hashes: Vec<String> = state
            .records
            .iter()
            .filter(|r| &r.id == id)
            .flat_map(|r| r.files.iter().map(|f| f.sha256.clone()))
            .collect();
        for hash in hashes {
            state.objects.remove(&hash);
        }
    }

    fn check(state: &State, record: &BackupRecord) -> Result<Vec<Vec<u8>>, BackupError> {
        record
            .files
            .iter()
            .map(|file| match state.objects.get(&file.sha256) {
                Some(bytes) if content_hash(bytes) == file.sha256 => Ok(bytes.clone()),
                _ => Err(BackupError::Corrupt {
                    id: record.id.clone(),
                    message: format!("missing object for {}", file.path.display()),
                }),
            })
            .collect()
    }
}

#[async_trait]
impl BackupStore for MemoryBackupStore {
    async fn snapshot(
        &self,
        files: &[PathBuf],
        description: &str,
    ) -> Result<BackupId, BackupError> {
        let mut captured = Vec::with_capacity(files.len());
        let mut contents = Vec::with_capacity(files.len());
        for path in files {
            let bytes = tokio::fs::read(path)
                .await
                .map_err(|e| BackupError::io(path, e))?;
            captured.push(BackedUpFile {
                path: path.clone(),
                sha256: content_hash(&bytes),
                size: bytes.len() as u64,
            });
            contents.push(bytes);
        }

        let now = OffsetDateTime::now_utc();
        let record = BackupRecord {
            id: new_backup_id(now, description, &captured),
            created_at: timestamp(now),
            description: description.to_string(),
            files: captured,
        };
        let id = record.id.clone();
        let mut state = self.state.lock().await;
        for (file, bytes) in record.files.iter().zip(contents) {
            state.objects.entry(file.sha256.clone()).or_insert(bytes);
        }
        state.records.push(record);
        Ok(id)
    }

    async fn verify(&self, id: &BackupId) -> Result<bool, BackupError> {
        let state = self.state.lock().await;
        let record = state
            .records
            .iter()
            .find(|r| &r.id == id)
            .ok_or_else(|| BackupError::NotFound(id.clone()))?;
        Ok(Self::check(&state, record).is_ok())
    }

    async fn list(&self) -> Result<Vec<BackupRecord>, BackupError> {
        let state = self.state.lock().await;
        let mut records = state.records.clone();
        records.sort_by(|a, b| (&a.created_at, &a.id).cmp(&(&b.created_at, &b.id)));
        Ok(records)
    }

    async fn restore(&self, id: &BackupId) -> Result<Vec<PathBuf>, BackupError> {
        let (record, contents) = {
            let state = self.state.lock().await;
            let record = state
                .records
                .iter()
                .find(|r| &r.id == id)
                .cloned()
                .ok_or_else(|| BackupError::NotFound(id.clone()))?;
            let contents = Self::check(&state, &record)?;
            (record, contents)
        };
        let mut restored = Vec::with_capacity(record.files.len());
        for (file, bytes) in record.files.iter().zip(contents) {
            tokio::fs::write(&file.path, bytes)
                .await
                .map_err(|e| BackupError::io(&file.path, e))?;
            restored.push(file.path.clone());
        }
        Ok(restored)
    }
}
