//! CLI migrate subcommand.
//!
//! Loads the rule book, then runs the migration pipeline: scan -> plan ->
//! apply in memory -> (with `--apply`) snapshot, write, verify. Without
//! `--apply` the diffs are printed and nothing is written.

use std::path::PathBuf;
use std::sync::Arc;

use migr8_backup::FsBackupStore;
use migr8_core::{FileSystemProvider, ScanOptions};
use migr8_engine::{
    EventSink, MigrationEvent, Migrator, Phase, PlanOptions, RunMode, RunOptions, RunReport,
};
use migr8_rules::load_rules_dir;
use tokio::sync::mpsc::UnboundedReceiver;

use crate::scan::rel;
use crate::{print_json, report_error, Ctx, OutputFormat};

pub struct MigrateOptions {
    pub root: PathBuf,
    pub rules_dir: PathBuf,
    pub backup_dir: PathBuf,
    pub rule_sets: Vec<String>,
    pub scan: ScanOptions,
    pub annotate_placeholders: bool,
    pub jobs: Option<usize>,
    pub apply: bool,
    pub backup: bool,
}

/// Run a migration. Returns whether it succeeded.
pub async fn cmd_migrate(opts: MigrateOptions, ctx: Ctx<'_>) -> bool {
    let book = match load_rules_dir(&opts.rules_dir).and_then(|b| b.select(&opts.rule_sets)) {
        Ok(b) => b,
        Err(e) => {
            report_error(&format!("error: {}", e), ctx.output, ctx.quiet);
            return false;
        }
    };

    let mode = if opts.apply {
        RunMode::Apply
    } else {
        RunMode::DryRun
    };
    let run = RunOptions {
        root: opts.root.clone(),
        scan: opts.scan,
        mode,
        backup: opts.backup,
        plan: PlanOptions {
            annotate_placeholders: opts.annotate_placeholders,
        },
        jobs: opts.jobs,
    };

    let (events, rx) = EventSink::channel();
    let mut migrator = Migrator::new(Arc::new(FileSystemProvider)).with_events(events);
    if opts.apply && opts.backup {
        migrator = migrator.with_backup(Arc::new(FsBackupStore::new(&opts.backup_dir)));
    }

    // Ctrl-C stops new files from being written; files in progress finish.
    let cancel = migrator.cancel_token();
    let signal = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupted; finishing files in progress");
            cancel.cancel();
        }
    });
    let show_progress = opts.apply && ctx.output == OutputFormat::Text && !ctx.quiet;
    let printer = tokio::spawn(print_progress(rx, opts.root.clone(), show_progress));

    let result = migrator.run(&book, &run).await;
    signal.abort();
    drop(migrator);
    let _ = printer.await;

    let report = match result {
        Ok(r) => r,
        Err(e) => {
            report_error(&format!("error: {}", e), ctx.output, ctx.quiet);
            return false;
        }
    };

    match ctx.output {
        OutputFormat::Json => print_json(&report),
        OutputFormat::Text => {
            if !ctx.quiet {
                print_text(&opts.root, &report);
            }
        }
    }
    report.is_success()
}

/// Writes progress to stderr until the sink is dropped.
async fn print_progress(mut rx: UnboundedReceiver<MigrationEvent>, root: PathBuf, show: bool) {
    while let Some(event) = rx.recv().await {
        match event {
            MigrationEvent::Progress {
                phase: Phase::Writing,
                total,
                completed,
                current_file: Some(file),
                status,
            } if show => {
                eprintln!("[{}/{}] {} {}", completed, total, status, rel(&root, &file));
            }
            MigrationEvent::Progress { phase, status, .. } => {
                tracing::trace!(?phase, %status, "progress");
            }
            MigrationEvent::Log { .. } | MigrationEvent::Diff { .. } => {}
        }
    }
}

fn print_text(root: &std::path::Path, report: &RunReport) {
    if report.mode == RunMode::DryRun {
        for file in &report.files {
            print!("{}", file.diff);
        }
        if !report.files.is_empty() {
            println!();
        }
    }
    // Summary lines name files relative to the root.
    let prefix = format!("{}/", root.display());
    print!("{}", report.to_string().replace(&prefix, ""));
    if report.mode == RunMode::DryRun && report.changed_files() > 0 {
        println!("dry run: nothing written; rerun with --apply to write changes");
    }
}
