use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use migr8_backup::{BackupError, BackupId, BackupRecord, BackupStore, MemoryBackupStore};
use migr8_core::{FileSystemProvider, InMemoryProvider};
use migr8_engine::{
    EventSink, FailureKind, MigrationError, MigrationEvent, Migrator, RunMode, RunOptions,
    RunReport,
};
use migr8_rules::{parse_rule_set, RuleBook};
use serde_json::json;

// ── Helpers ──────────────────────────────────────────────────────────

fn book(rules: serde_json::Value) -> RuleBook {
    let set = parse_rule_set("ui", Path::new("ui.json"), &rules.to_string()).unwrap();
    RuleBook::new(vec![set]).unwrap()
}

fn project(files: &[(&str, &str)]) -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    for (name, text) in files {
        let path = dir.path().join(name);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, text).unwrap();
    }
    dir
}

fn read(dir: &tempfile::TempDir, name: &str) -> String {
    std::fs::read_to_string(dir.path().join(name)).unwrap()
}

fn options(dir: &tempfile::TempDir, mode: RunMode) -> RunOptions {
    let mut opts = RunOptions::new(dir.path());
    opts.mode = mode;
    opts
}

fn migrator() -> Migrator {
    Migrator::new(Arc::new(FileSystemProvider)).with_backup(Arc::new(MemoryBackupStore::new()))
}

async fn apply(dir: &tempfile::TempDir, rules: &RuleBook) -> RunReport {
    migrator()
        .run(rules, &options(dir, RunMode::Apply))
        .await
        .unwrap()
}

fn button_rules() -> RuleBook {
    book(json!({
        "sourcePackage": "@old/ui",
        "rules": [{
            "component": "Button",
            "rename": { "variant": "kind" },
            "remove": ["size"]
        }]
    }))
}

const BUTTON_APP: &str = "import { Button } from '@old/ui';\n\nexport const App = () => (\n  <Button variant=\"primary\" size=\"large\">Go</Button>\n);\n";

// ── Worked examples ──────────────────────────────────────────────────

#[tokio::test]
async fn rename_and_remove_example() {
    let dir = project(&[("src/App.jsx", BUTTON_APP)]);
    let report = apply(&dir, &button_rules()).await;

    assert!(report.is_success(), "{report}");
    assert_eq!(report.elements.matched, 1);
    assert_eq!(report.written_files(), 1);
    assert!(read(&dir, "src/App.jsx").contains("<Button kind=\"primary\">Go</Button>"));
}

#[tokio::test]
async fn replace_with_template_example() {
    let dir = project(&[(
        "src/App.jsx",
        "import { Button } from '@old/ui';\nconst b = <Button variant=\"primary\" />;\n",
    )]);
    let rules = book(json!({
        "sourcePackage": "@old/ui",
        "lookup": { "variant": "look" },
        "rules": [{
            "component": "Button",
            "replaceWith": {
                "code": "<NewButton look={{OUTER}}>{{INNER}}</NewButton>",
                "outerPropNames": ["variant"],
                "innerPropNames": []
            }
        }]
    }));
    apply(&dir, &rules).await;
    assert!(read(&dir, "src/App.jsx").contains("const b = <NewButton look=\"primary\"></NewButton>;"));
}

// ── Run properties ───────────────────────────────────────────────────

#[tokio::test]
async fn dry_run_writes_nothing_and_emits_diffs() {
    let dir = project(&[("src/App.jsx", BUTTON_APP)]);
    let (sink, mut rx) = EventSink::channel();
    let report = Migrator::new(Arc::new(FileSystemProvider))
        .with_events(sink)
        .run(&button_rules(), &options(&dir, RunMode::DryRun))
        .await
        .unwrap();

    assert_eq!(read(&dir, "src/App.jsx"), BUTTON_APP);
    assert_eq!(report.changed_files(), 1);
    assert!(!report.files[0].written);
    assert!(report.files[0].diff.contains("+  <Button kind=\"primary\">Go</Button>"));

    let mut diffs = 0;
    while let Ok(event) = rx.try_recv() {
        if let MigrationEvent::Diff { diff, .. } = event {
            assert!(diff.contains("-  <Button variant=\"primary\" size=\"large\">Go</Button>"));
            diffs += 1;
        }
    }
    assert_eq!(diffs, 1);
}

#[tokio::test]
async fn second_run_is_a_no_op() {
    let dir = project(&[
        ("src/App.jsx", BUTTON_APP),
        (
            "src/Other.jsx",
            "import { Button as B } from '@old/ui';\nexport default () => <B size=\"s\" variant={v} />;\n",
        ),
    ]);
    let rules = button_rules();
    let first = apply(&dir, &rules).await;
    assert_eq!(first.written_files(), 2);

    let second = apply(&dir, &rules).await;
    assert_eq!(second.changed_files(), 0);
    assert_eq!(second.elements.matched, 2);
    assert!(read(&dir, "src/Other.jsx").contains("<B kind={v} />"));
}

#[tokio::test]
async fn import_only_files_are_migrated() {
    let dir = project(&[(
        "src/index.js",
        "import { Button } from '@old/ui';\nexport { Button };\n",
    )]);
    let rules = book(json!({
        "sourcePackage": "@old/ui",
        "rules": [{ "component": "Button", "importTo": "@new/ui" }]
    }));
    let report = apply(&dir, &rules).await;
    assert_eq!(report.written_files(), 1);
    assert_eq!(
        read(&dir, "src/index.js"),
        "import { Button } from '@new/ui';\nexport { Button };\n"
    );
}

#[tokio::test]
async fn placeholder_components_are_never_prop_edited() {
    let dir = project(&[(
        "src/App.jsx",
        "import { Button, Chip } from '@old/ui';\nconst a = <><Chip size=\"l\" variant=\"x\" /><Button size=\"l\" /></>;\n",
    )]);
    let rules = book(json!({
        "sourcePackage": "@old/ui",
        "rules": [
            { "component": "Button", "remove": ["size"], "rename": { "variant": "kind" } },
            { "component": "Chip" }
        ]
    }));
    let mut opts = options(&dir, RunMode::Apply);
    opts.plan.annotate_placeholders = false;
    let report = migrator().run(&rules, &opts).await.unwrap();

    assert_eq!(report.elements.placeholder, 1);
    assert_eq!(
        read(&dir, "src/App.jsx"),
        "import { Button, Chip } from '@old/ui';\nconst a = <><Chip size=\"l\" variant=\"x\" /><Button /></>;\n"
    );
}

#[tokio::test]
async fn conflicting_import_edits_keep_the_first() {
    let dir = project(&[(
        "src/Nav.jsx",
        "import { Menu } from '@old/ui';\nconst n = <Menu><Menu.Item /></Menu>;\n",
    )]);
    let rules = book(json!({
        "sourcePackage": "@old/ui",
        "rules": [
            { "component": "Menu", "importTo": "@new/menu" },
            { "component": "Menu.Item", "importTo": "@new/menu-item" }
        ]
    }));
    let report = apply(&dir, &rules).await;
    assert_eq!(report.import_conflicts.len(), 1);
    assert!(read(&dir, "src/Nav.jsx").starts_with("import { Menu } from '@new/menu';"));
}

#[tokio::test]
async fn unparsable_files_are_skipped_not_fatal() {
    let dir = project(&[
        ("src/App.jsx", BUTTON_APP),
        ("src/Broken.jsx", "const x = <Button>;\n"),
    ]);
    let report = apply(&dir, &button_rules()).await;
    assert_eq!(report.warnings.len(), 1);
    assert_eq!(report.written_files(), 1);
    assert_eq!(read(&dir, "src/Broken.jsx"), "const x = <Button>;\n");
}

#[tokio::test]
async fn element_errors_leave_the_element_alone() {
    let dir = project(&[(
        "src/App.jsx",
        "import { Button } from '@old/ui';\nconst a = <><Button variant=\"a\" kind=\"b\" /><Button size=\"l\" /></>;\n",
    )]);
    let report = apply(&dir, &button_rules()).await;
    assert_eq!(report.elements.errored, 1);
    assert_eq!(report.elements.matched, 1);
    assert!(read(&dir, "src/App.jsx").contains("<Button variant=\"a\" kind=\"b\" /><Button />"));
}

#[tokio::test]
async fn errored_element_keeps_its_import() {
    let src = "import { Button } from '@old/ui';\n<Button variant=\"a\" kind=\"b\" />;\n";
    let dir = project(&[("src/App.jsx", src)]);
    let rules = book(json!({
        "sourcePackage": "@old/ui",
        "rules": [{ "component": "Button", "rename": { "variant": "kind" }, "importTo": "@new/ui" }]
    }));
    let report = apply(&dir, &rules).await;
    assert_eq!(report.elements.errored, 1);
    assert_eq!(report.written_files(), 0);
    assert_eq!(read(&dir, "src/App.jsx"), src);
}

#[tokio::test]
async fn unmatched_branch_keeps_the_shared_import() {
    let src = "import { Button } from '@old/ui';\nconst a = <><Button size=\"l\" /><Button size=\"s\" /></>;\n";
    let dir = project(&[("src/App.jsx", src)]);
    let rules = book(json!({
        "sourcePackage": "@old/ui",
        "rules": [{
            "component": "Button",
            "matchConditions": [{ "when": { "size": "l" }, "set": { "size": "large" } }],
            "importTo": "@new/ui"
        }]
    }));
    apply(&dir, &rules).await;
    assert_eq!(
        read(&dir, "src/App.jsx"),
        "import { Button } from '@old/ui';\nconst a = <><Button size=\"large\" /><Button size=\"s\" /></>;\n"
    );
}

// ── Backups ──────────────────────────────────────────────────────────

#[tokio::test]
async fn written_files_can_be_restored_from_their_backup() {
    let dir = project(&[("src/App.jsx", BUTTON_APP)]);
    let store = Arc::new(MemoryBackupStore::new());
    let report = Migrator::new(Arc::new(FileSystemProvider))
        .with_backup(store.clone())
        .run(&button_rules(), &options(&dir, RunMode::Apply))
        .await
        .unwrap();

    let id = report.files[0].backup_id.clone().unwrap();
    assert_ne!(read(&dir, "src/App.jsx"), BUTTON_APP);
    store.restore(&BackupId(id)).await.unwrap();
    assert_eq!(read(&dir, "src/App.jsx"), BUTTON_APP);
}

struct FailingStore {
    attempts: AtomicUsize,
}

#[async_trait]
impl BackupStore for FailingStore {
    async fn snapshot(&self, files: &[PathBuf], _: &str) -> Result<BackupId, BackupError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        Err(BackupError::Io {
            path: files[0].clone(),
            source: std::io::Error::new(std::io::ErrorKind::Other, "disk full"),
        })
    }

    async fn verify(&self, id: &BackupId) -> Result<bool, BackupError> {
        Err(BackupError::NotFound(id.clone()))
    }

    async fn list(&self) -> Result<Vec<BackupRecord>, BackupError> {
        Ok(Vec::new())
    }

    async fn restore(&self, id: &BackupId) -> Result<Vec<PathBuf>, BackupError> {
        Err(BackupError::NotFound(id.clone()))
    }
}

#[tokio::test]
async fn failed_snapshot_is_retried_once_then_blocks_the_write() {
    let dir = project(&[("src/App.jsx", BUTTON_APP)]);
    let store = Arc::new(FailingStore {
        attempts: AtomicUsize::new(0),
    });
    let report = Migrator::new(Arc::new(FileSystemProvider))
        .with_backup(store.clone())
        .run(&button_rules(), &options(&dir, RunMode::Apply))
        .await
        .unwrap();

    assert_eq!(store.attempts.load(Ordering::SeqCst), 2);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].kind, FailureKind::Snapshot);
    assert_eq!(report.written_files(), 0);
    assert_eq!(read(&dir, "src/App.jsx"), BUTTON_APP);
}

#[tokio::test]
async fn apply_without_a_store_needs_no_backup() {
    let dir = project(&[("src/App.jsx", BUTTON_APP)]);
    let err = Migrator::new(Arc::new(FileSystemProvider))
        .run(&button_rules(), &options(&dir, RunMode::Apply))
        .await
        .unwrap_err();
    assert!(matches!(err, MigrationError::NoBackupStore));

    let mut opts = options(&dir, RunMode::Apply);
    opts.backup = false;
    let report = Migrator::new(Arc::new(FileSystemProvider))
        .run(&button_rules(), &opts)
        .await
        .unwrap();
    assert_eq!(report.written_files(), 1);
    assert!(report.files[0].backup_id.is_none());
}

#[tokio::test]
async fn cancelled_run_starts_no_writes() {
    let dir = project(&[("src/App.jsx", BUTTON_APP), ("src/Two.jsx", BUTTON_APP)]);
    let migrator = migrator();
    migrator.cancel_token().cancel();
    let report = migrator
        .run(&button_rules(), &options(&dir, RunMode::Apply))
        .await
        .unwrap();
    assert!(report.cancelled);
    assert_eq!(report.written_files(), 0);
    assert_eq!(read(&dir, "src/App.jsx"), BUTTON_APP);
}

#[tokio::test]
async fn files_changed_after_the_scan_are_not_overwritten() {
    let dir = project(&[("src/App.jsx", "// edited\n")]);
    // The provider still serves the text as it was when scanned.
    let provider = InMemoryProvider::from_pairs([(dir.path().join("src/App.jsx"), BUTTON_APP)]);
    let report = Migrator::new(Arc::new(provider))
        .with_backup(Arc::new(MemoryBackupStore::new()))
        .run(&button_rules(), &options(&dir, RunMode::Apply))
        .await
        .unwrap();

    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].kind, FailureKind::Stale);
    assert_eq!(report.written_files(), 0);
    assert_eq!(read(&dir, "src/App.jsx"), "// edited\n");
}
