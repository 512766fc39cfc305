//! Restore and error behaviour.

use std::future::Future;
use std::path::Path;

use super::{check, originals, TestResult};
use crate::{BackupError, BackupId, BackupStore};

pub(super) async fn run_recovery_tests<S, F, Fut>(workdir: &Path, factory: &F) -> Vec<TestResult>
where
    S: BackupStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    vec![
        TestResult::from_result(
            "recovery",
            "restore_writes_originals_back",
            restore_writes_originals_back(workdir, factory).await,
        ),
        TestResult::from_result(
            "recovery",
            "unknown_id_is_not_found",
            unknown_id_is_not_found(factory).await,
        ),
        TestResult::from_result(
            "recovery",
            "missing_original_fails_snapshot",
            missing_original_fails_snapshot(workdir, factory).await,
        ),
    ]
}

async fn restore_writes_originals_back<S, F, Fut>(workdir: &Path, factory: &F) -> Result<(), String>
where
    S: BackupStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let store = factory().await;
    let files = originals(workdir, "restore", &[("A.jsx", "<A />\n"), ("B.jsx", "<B>é</B>\n")]).await?;
    let id = store.snapshot(&files, "x").await.map_err(|e| e.to_string())?;
    for path in &files {
        tokio::fs::write(path, "migrated")
            .await
            .map_err(|e| e.to_string())?;
    }
    let restored = store.restore(&id).await.map_err(|e| e.to_string())?;
    check(restored == files, "restore returned unexpected paths")?;
    let a = tokio::fs::read_to_string(&files[0]).await.map_err(|e| e.to_string())?;
    let b = tokio::fs::read_to_string(&files[1]).await.map_err(|e| e.to_string())?;
    check(a == "<A />\n" && b == "<B>é</B>\n", "restored content differs")
}

async fn unknown_id_is_not_found<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: BackupStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let store = factory().await;
    let id = BackupId::from("20000101T000000-deadbeef");
    match store.verify(&id).await {
        Err(BackupError::NotFound(_)) => {}
        other => return Err(format!("verify: expected NotFound, got {:?}", other)),
    }
    match store.restore(&id).await {
        Err(BackupError::NotFound(_)) => Ok(()),
        other => Err(format!("restore: expected NotFound, got {:?}", other)),
    }
}

async fn missing_original_fails_snapshot<S, F, Fut>(workdir: &Path, factory: &F) -> Result<(), String>
where
    S: BackupStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let store = factory().await;
    let missing = workdir.join("missing").join("Nope.jsx");
    match store.snapshot(&[missing], "x").await {
        Err(BackupError::Io { .. }) => {}
        other => return Err(format!("expected Io error, got {:?}", other)),
    }
    let records = store.list().await.map_err(|e| e.to_string())?;
    check(records.is_empty(), "failed snapshot left a record behind")
}
