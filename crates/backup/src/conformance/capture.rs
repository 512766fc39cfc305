//! Snapshot capture, listing and verification.

use std::future::Future;
use std::path::Path;

use super::{check, originals, TestResult};
use crate::record::content_hash;
use crate::BackupStore;

pub(super) async fn run_capture_tests<S, F, Fut>(workdir: &Path, factory: &F) -> Vec<TestResult>
where
    S: BackupStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    vec![
        TestResult::from_result(
            "capture",
            "snapshot_is_listed_with_hashes",
            snapshot_is_listed_with_hashes(workdir, factory).await,
        ),
        TestResult::from_result(
            "capture",
            "fresh_snapshot_verifies",
            fresh_snapshot_verifies(workdir, factory).await,
        ),
        TestResult::from_result(
            "capture",
            "snapshot_ids_are_unique",
            snapshot_ids_are_unique(workdir, factory).await,
        ),
        TestResult::from_result(
            "capture",
            "list_is_oldest_first",
            list_is_oldest_first(workdir, factory).await,
        ),
    ]
}

async fn snapshot_is_listed_with_hashes<S, F, Fut>(workdir: &Path, factory: &F) -> Result<(), String>
where
    S: BackupStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let store = factory().await;
    let files = originals(workdir, "listed", &[("A.jsx", "<A />"), ("B.jsx", "<B />")]).await?;
    let id = store
        .snapshot(&files, "two files")
        .await
        .map_err(|e| e.to_string())?;
    let records = store.list().await.map_err(|e| e.to_string())?;
    check(records.len() == 1, format!("expected 1 record, got {}", records.len()))?;
    let record = &records[0];
    check(record.id == id, "listed id differs from returned id")?;
    check(record.description == "two files", "description not kept")?;
    check(record.files.len() == 2, "expected 2 files in record")?;
    check(
        record.files[0].path == files[0] && record.files[0].sha256 == content_hash(b"<A />"),
        "first file path or hash wrong",
    )?;
    check(record.files[1].size == 5, "size of second file wrong")
}

async fn fresh_snapshot_verifies<S, F, Fut>(workdir: &Path, factory: &F) -> Result<(), String>
where
    S: BackupStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let store = factory().await;
    let files = originals(workdir, "verifies", &[("A.jsx", "<A />")]).await?;
    let id = store.snapshot(&files, "x").await.map_err(|e| e.to_string())?;
    // Changing the original must not affect the snapshot.
    tokio::fs::write(&files[0], "<Changed />")
        .await
        .map_err(|e| e.to_string())?;
    let ok = store.verify(&id).await.map_err(|e| e.to_string())?;
    check(ok, "fresh snapshot did not verify")
}

async fn snapshot_ids_are_unique<S, F, Fut>(workdir: &Path, factory: &F) -> Result<(), String>
where
    S: BackupStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let store = factory().await;
    let files = originals(workdir, "unique", &[("A.jsx", "<A />")]).await?;
    let a = store.snapshot(&files, "same").await.map_err(|e| e.to_string())?;
    let b = store.snapshot(&files, "same").await.map_err(|e| e.to_string())?;
    check(a != b, format!("two snapshots share id {}", a))
}

async fn list_is_oldest_first<S, F, Fut>(workdir: &Path, factory: &F) -> Result<(), String>
where
    S: BackupStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let store = factory().await;
    let files = originals(workdir, "ordered", &[("A.jsx", "<A />")]).await?;
    let mut ids = Vec::new();
    for i in 0..3 {
        ids.push(
            store
                .snapshot(&files, &format!("run {}", i))
                .await
                .map_err(|e| e.to_string())?,
        );
    }
    let records = store.list().await.map_err(|e| e.to_string())?;
    let listed: Vec<_> = records.iter().map(|r| r.created_at.clone()).collect();
    let mut sorted = listed.clone();
    sorted.sort();
    check(records.len() == 3, "expected 3 records")?;
    check(listed == sorted, "records are not sorted by creation time")
}
