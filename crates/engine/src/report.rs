//! End-of-run summary.

use std::fmt;
use std::path::PathBuf;

use migr8_core::GraphWarning;
use serde::Serialize;

use crate::plan::{ElementError, ImportConflict, PlanKind};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunMode {
    #[default]
    DryRun,
    Apply,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Planned edits could not be combined into new text.
    Apply,
    /// The file changed on disk after it was scanned; it was not written.
    Stale,
    /// The backup snapshot failed; the file was not written.
    Snapshot,
    /// Writing the new text failed after a snapshot was taken.
    Write,
    /// The written file or its snapshot did not check out.
    Verify,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileFailure {
    pub path: PathBuf,
    pub kind: FailureKind,
    pub message: String,
    /// Snapshot to restore from, when one was taken.
    pub backup_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileOutcome {
    pub path: PathBuf,
    pub edits: usize,
    pub lines_added: usize,
    pub lines_removed: usize,
    pub diff: String,
    pub written: bool,
    pub backup_id: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ElementCounts {
    pub matched: usize,
    pub placeholder: usize,
    pub unmatched: usize,
    pub errored: usize,
    pub superseded: usize,
}

impl ElementCounts {
    pub fn record(&mut self, kind: PlanKind) {
        match kind {
            PlanKind::Matched => self.matched += 1,
            PlanKind::Placeholder => self.placeholder += 1,
            PlanKind::Unmatched => self.unmatched += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.matched + self.placeholder + self.unmatched + self.errored + self.superseded
    }
}

/// Props a replacement template had no place for.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DroppedProps {
    pub file: PathBuf,
    pub line: u32,
    pub component: String,
    pub props: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RunReport {
    pub mode: RunMode,
    pub files_scanned: usize,
    pub elements: ElementCounts,
    /// Files with changes, sorted by path.
    pub files: Vec<FileOutcome>,
    pub failures: Vec<FileFailure>,
    pub element_errors: Vec<ElementError>,
    pub import_conflicts: Vec<ImportConflict>,
    /// Files that could not be read or parsed.
    pub warnings: Vec<GraphWarning>,
    pub dropped_props: Vec<DroppedProps>,
    pub incomplete_rule_sets: Vec<String>,
    pub cancelled: bool,
}

impl RunReport {
    pub fn changed_files(&self) -> usize {
        self.files.len()
    }

    pub fn written_files(&self) -> usize {
        self.files.iter().filter(|f| f.written).count()
    }

    /// No file failed and the run was not cancelled.
    pub fn is_success(&self) -> bool {
        self.failures.is_empty() && !self.cancelled
    }
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mode = match self.mode {
            RunMode::DryRun => "dry run",
            RunMode::Apply => "apply",
        };
        writeln!(f, "Migration ({}): {} files scanned", mode, self.files_scanned)?;
        let e = &self.elements;
        writeln!(
            f,
            "  elements: {} matched, {} placeholder, {} unmatched, {} errored, {} superseded",
            e.matched, e.placeholder, e.unmatched, e.errored, e.superseded
        )?;
        match self.mode {
            RunMode::DryRun => writeln!(f, "  files to change: {}", self.changed_files())?,
            RunMode::Apply => writeln!(
                f,
                "  files written: {} of {}",
                self.written_files(),
                self.changed_files()
            )?,
        }
        for file in &self.files {
            write!(
                f,
                "    {} (+{} -{})",
                file.path.display(),
                file.lines_added,
                file.lines_removed
            )?;
            if let Some(id) = &file.backup_id {
                write!(f, " [backup {}]", id)?;
            }
            writeln!(f)?;
        }
        if !self.failures.is_empty() {
            writeln!(f, "  failures:")?;
            for fail in &self.failures {
                write!(f, "    {}: {}", fail.path.display(), fail.message)?;
                if let Some(id) = &fail.backup_id {
                    write!(f, " (restore with: migr8 backups restore {})", id)?;
                }
                writeln!(f)?;
            }
        }
        for err in &self.element_errors {
            writeln!(
                f,
                "  error: {}:{}: <{}>: {}",
                err.file.display(),
                err.line,
                err.component,
                err.error
            )?;
        }
        for conflict in &self.import_conflicts {
            writeln!(f, "  warning: {}", conflict)?;
        }
        for w in &self.warnings {
            writeln!(f, "  skipped: {}:{}: {}", w.file.display(), w.line, w.message)?;
        }
        for d in &self.dropped_props {
            writeln!(
                f,
                "  dropped: {}:{}: <{}> lost {}",
                d.file.display(),
                d.line,
                d.component,
                d.props.join(", ")
            )?;
        }
        for id in &self.incomplete_rule_sets {
            writeln!(f, "  warning: rule set '{}' is marked incomplete", id)?;
        }
        if self.cancelled {
            writeln!(f, "  cancelled before all files were written")?;
        }
        Ok(())
    }
}
