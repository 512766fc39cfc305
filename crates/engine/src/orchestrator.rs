//! Drives a whole migration: scan, plan, apply, then either report diffs
//! (dry run) or snapshot, write and verify every changed file.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use migr8_backup::BackupStore;
use migr8_core::ast::{ElementUsage, ImportBinding};
use migr8_core::{scan_project, ProjectGraph, ProjectScan, ScanError, ScanOptions, SourceProvider};
use migr8_rules::RuleBook;
use rayon::prelude::*;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::apply::{apply_file, FileChange};
use crate::error::{ApplyError, MigrationError};
use crate::events::{EventSink, LogLevel, Phase};
use crate::plan::{FilePlan, PlanKind};
use crate::planner::{plan_file, PlanOptions};
use crate::report::{DroppedProps, FailureKind, FileFailure, FileOutcome, RunMode, RunReport};

/// Shared cancellation flag. Checked before each file's
/// snapshot-write-verify sequence starts; a sequence already running
/// always finishes.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone)]
pub struct RunOptions {
    pub root: PathBuf,
    pub scan: ScanOptions,
    pub mode: RunMode,
    /// Snapshot each file before writing it.
    pub backup: bool,
    pub plan: PlanOptions,
    /// Concurrent writes; defaults to the available parallelism.
    pub jobs: Option<usize>,
}

impl RunOptions {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        RunOptions {
            root: root.into(),
            scan: ScanOptions::default(),
            mode: RunMode::DryRun,
            backup: true,
            plan: PlanOptions::default(),
            jobs: None,
        }
    }
}

/// One scanned file after planning and edit application.
#[derive(Debug, Clone)]
pub struct PlannedFile {
    pub plan: FilePlan,
    pub original: String,
    /// `None` when nothing was planned for the file.
    pub change: Option<Result<FileChange, ApplyError>>,
}

#[derive(Debug, Clone, Default)]
pub struct Prepared {
    pub graph: ProjectGraph,
    pub files: Vec<PlannedFile>,
}

/// Scan, plan and apply in memory. Nothing is written.
pub fn prepare(
    provider: &dyn SourceProvider,
    book: &RuleBook,
    opts: &RunOptions,
) -> Result<Prepared, ScanError> {
    let ProjectScan { graph, sources } = scan_project(&opts.root, &opts.scan, provider)?;

    let mut by_file: HashMap<&Path, (Vec<ElementUsage>, Vec<ImportBinding>)> = HashMap::new();
    for el in &graph.elements {
        by_file.entry(el.file.as_path()).or_default().0.push(el.clone());
    }
    for binding in &graph.imports {
        by_file
            .entry(binding.file.as_path())
            .or_default()
            .1
            .push(binding.clone());
    }

    let entries: Vec<(&PathBuf, &String)> = sources.iter().collect();
    let files = entries
        .par_iter()
        .map(|(path, text)| {
            let (elements, bindings) = by_file
                .get(path.as_path())
                .map(|(e, b)| (e.as_slice(), b.as_slice()))
                .unwrap_or_default();
            let plan = plan_file(book, path, text, elements, bindings, &opts.plan);
            // Diff headers and apply errors name the file relative to the root.
            let label = path.strip_prefix(&opts.root).unwrap_or(path.as_path());
            let change = plan.has_edits().then(|| {
                apply_file(label, text, &plan).map(|c| FileChange {
                    path: path.to_path_buf(),
                    ..c
                })
            });
            PlannedFile {
                plan,
                original: (*text).clone(),
                change,
            }
        })
        .collect();

    Ok(Prepared { graph, files })
}

pub struct Migrator {
    provider: Arc<dyn SourceProvider>,
    backup: Option<Arc<dyn BackupStore>>,
    events: EventSink,
    cancel: CancelToken,
}

impl Migrator {
    pub fn new(provider: Arc<dyn SourceProvider>) -> Self {
        Migrator {
            provider,
            backup: None,
            events: EventSink::disabled(),
            cancel: CancelToken::new(),
        }
    }

    pub fn with_backup(mut self, store: Arc<dyn BackupStore>) -> Self {
        self.backup = Some(store);
        self
    }

    pub fn with_events(mut self, events: EventSink) -> Self {
        self.events = events;
        self
    }

    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    pub async fn run(&self, book: &RuleBook, opts: &RunOptions) -> Result<RunReport, MigrationError> {
        let store = match (opts.mode, opts.backup) {
            (RunMode::Apply, true) => Some(self.backup.clone().ok_or(MigrationError::NoBackupStore)?),
            _ => None,
        };

        self.events
            .progress(Phase::Scanning, 0, 0, Some(&opts.root), "scanning");
        let prepared = {
            let provider = Arc::clone(&self.provider);
            let book = book.clone();
            let opts = opts.clone();
            tokio::task::spawn_blocking(move || prepare(provider.as_ref(), &book, &opts))
                .await
                .map_err(|e| MigrationError::Task(e.to_string()))??
        };

        let mut report = RunReport {
            mode: opts.mode,
            files_scanned: prepared.graph.files.len(),
            warnings: prepared.graph.warnings.clone(),
            incomplete_rule_sets: book
                .sets()
                .iter()
                .filter(|s| s.incomplete)
                .map(|s| s.id.clone())
                .collect(),
            ..RunReport::default()
        };
        for w in &report.warnings {
            self.events.log(
                LogLevel::Warn,
                format!("skipped {}:{}: {}", w.file.display(), w.line, w.message),
            );
        }

        let total = prepared.files.len();
        let mut pending = Vec::new();
        for (i, file) in prepared.files.into_iter().enumerate() {
            let path = file.plan.path.clone();
            self.tally(&mut report, &file.plan);
            self.events
                .progress(Phase::Planning, total, i + 1, Some(&path), "planned");
            match file.change {
                None => {}
                Some(Err(e)) => {
                    warn!("{}", e);
                    self.events.log(LogLevel::Error, e.to_string());
                    report.failures.push(FileFailure {
                        path,
                        kind: FailureKind::Apply,
                        message: e.to_string(),
                        backup_id: None,
                    });
                }
                Some(Ok(change)) if !change.changed() => {
                    debug!(file = %path.display(), "edits leave the file unchanged");
                }
                Some(Ok(change)) => pending.push((change, file.original)),
            }
        }
        info!(
            files = total,
            changed = pending.len(),
            matched = report.elements.matched,
            "planning done"
        );

        match opts.mode {
            RunMode::DryRun => {
                for (change, _) in pending {
                    self.events.diff(&change.path, change.diff.clone());
                    report.files.push(outcome(&change, false, None));
                }
            }
            RunMode::Apply => self.write_all(pending, store, opts, &mut report).await?,
        }

        report.files.sort_by(|a, b| a.path.cmp(&b.path));
        report.failures.sort_by(|a, b| a.path.cmp(&b.path));
        self.events.progress(
            Phase::Done,
            report.changed_files(),
            report.written_files(),
            None,
            if report.cancelled { "cancelled" } else { "done" },
        );
        Ok(report)
    }

    fn tally(&self, report: &mut RunReport, plan: &FilePlan) {
        for kind in [PlanKind::Matched, PlanKind::Placeholder, PlanKind::Unmatched] {
            for _ in 0..plan.count(kind) {
                report.elements.record(kind);
            }
        }
        report.elements.errored += plan.errors.len();
        report.elements.superseded += plan.superseded;
        for err in &plan.errors {
            self.events.log(
                LogLevel::Error,
                format!("{}:{}: <{}>: {}", err.file.display(), err.line, err.component, err.error),
            );
        }
        for conflict in &plan.conflicts {
            self.events.log(LogLevel::Warn, conflict.to_string());
        }
        report.element_errors.extend(plan.errors.iter().cloned());
        report.import_conflicts.extend(plan.conflicts.iter().cloned());
        for p in plan.plans.iter().filter(|p| !p.dropped_props.is_empty()) {
            report.dropped_props.push(DroppedProps {
                file: p.element.file.clone(),
                line: p.element.line,
                component: p.element.component_name().to_string(),
                props: p.dropped_props.clone(),
            });
        }
    }

    async fn write_all(
        &self,
        pending: Vec<(FileChange, String)>,
        store: Option<Arc<dyn BackupStore>>,
        opts: &RunOptions,
        report: &mut RunReport,
    ) -> Result<(), MigrationError> {
        let jobs = opts
            .jobs
            .unwrap_or_else(|| std::thread::available_parallelism().map_or(4, |n| n.get()))
            .max(1);
        let semaphore = Arc::new(Semaphore::new(jobs));
        let total = pending.len();
        let mut tasks = JoinSet::new();

        for (change, original) in pending {
            if self.cancel.is_cancelled() {
                report.cancelled = true;
                break;
            }
            let permit = Arc::clone(&semaphore)
                .acquire_owned()
                .await
                .map_err(|e| MigrationError::Task(e.to_string()))?;
            if self.cancel.is_cancelled() {
                report.cancelled = true;
                break;
            }
            let store = store.clone();
            tasks.spawn(async move {
                let _permit = permit;
                write_one(change, original, store).await
            });
        }
        if report.cancelled {
            info!("cancelled; waiting for writes in progress");
        }

        let mut completed = 0;
        while let Some(joined) = tasks.join_next().await {
            let (outcome, failure) = joined.map_err(|e| MigrationError::Task(e.to_string()))?;
            completed += 1;
            let status = match &failure {
                Some(f) => {
                    self.events.log(LogLevel::Error, f.message.clone());
                    "failed"
                }
                None => "written",
            };
            self.events
                .progress(Phase::Writing, total, completed, Some(&outcome.path), status);
            report.files.push(outcome);
            report.failures.extend(failure);
        }
        Ok(())
    }
}

fn outcome(change: &FileChange, written: bool, backup_id: Option<String>) -> FileOutcome {
    FileOutcome {
        path: change.path.clone(),
        edits: change.edits,
        lines_added: change.stats.added,
        lines_removed: change.stats.removed,
        diff: change.diff.clone(),
        written,
        backup_id,
    }
}

/// Snapshot, write and verify one file.
async fn write_one(
    change: FileChange,
    original: String,
    store: Option<Arc<dyn BackupStore>>,
) -> (FileOutcome, Option<FileFailure>) {
    let path = change.path.clone();
    let fail = |kind: FailureKind, message: String, backup_id: Option<String>| {
        warn!(file = %path.display(), "{}", message);
        (
            outcome(&change, kind == FailureKind::Verify, backup_id.clone()),
            Some(FileFailure {
                path: path.clone(),
                kind,
                message,
                backup_id,
            }),
        )
    };

    match tokio::fs::read_to_string(&path).await {
        Ok(current) if current == original => {}
        Ok(_) => {
            return fail(
                FailureKind::Stale,
                format!("{}: changed on disk since it was scanned; not written", path.display()),
                None,
            )
        }
        Err(e) => return fail(FailureKind::Write, format!("{}: {}", path.display(), e), None),
    }

    let mut backup_id = None;
    if let Some(store) = &store {
        let files = vec![path.clone()];
        let description = format!("migr8 migrate {}", path.display());
        let id = match store.snapshot(&files, &description).await {
            Ok(id) => id,
            Err(first) => {
                warn!(file = %path.display(), "snapshot failed, retrying: {}", first);
                match store.snapshot(&files, &description).await {
                    Ok(id) => id,
                    Err(e) => {
                        return fail(
                            FailureKind::Snapshot,
                            format!("{}: snapshot failed: {}", path.display(), e),
                            None,
                        )
                    }
                }
            }
        };
        backup_id = Some(id);
    }
    let id_string = backup_id.as_ref().map(|id| id.to_string());

    if let Err(e) = tokio::fs::write(&path, &change.new_text).await {
        return fail(
            FailureKind::Write,
            format!("{}: write failed: {}", path.display(), e),
            id_string,
        );
    }

    if let (Some(store), Some(id)) = (&store, &backup_id) {
        match store.verify(id).await {
            Ok(true) => {}
            Ok(false) => {
                return fail(
                    FailureKind::Verify,
                    format!("{}: snapshot {} failed verification", path.display(), id),
                    id_string,
                )
            }
            Err(e) => {
                return fail(
                    FailureKind::Verify,
                    format!("{}: cannot verify snapshot {}: {}", path.display(), id, e),
                    id_string,
                )
            }
        }
    }
    match tokio::fs::read_to_string(&path).await {
        Ok(text) if text == change.new_text => {}
        Ok(_) => {
            return fail(
                FailureKind::Verify,
                format!("{}: content differs after write", path.display()),
                id_string,
            )
        }
        Err(e) => {
            return fail(
                FailureKind::Verify,
                format!("{}: cannot read back: {}", path.display(), e),
                id_string,
            )
        }
    }

    debug!(file = %path.display(), backup = ?id_string, "written");
    (outcome(&change, true, id_string), None)
}
