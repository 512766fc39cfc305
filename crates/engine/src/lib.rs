//! migr8-engine: from rules and a project to edited files.
//!
//! # Pipeline
//!
//! 1. [`planner::plan_file`] -- match each element of a file against its
//!    package's rules and plan edits ([`FilePlan`])
//! 2. [`apply::apply_file`] -- turn a file plan into new text and a diff
//! 3. [`Migrator::run`] -- scan, plan and apply a whole project, then
//!    report (dry run) or snapshot, write and verify (apply)

pub mod apply;
pub mod diff;
pub mod error;
pub mod events;
pub mod matcher;
pub mod orchestrator;
pub mod plan;
pub mod planner;
pub mod report;
pub mod template;

// ── Convenience re-exports: key types ────────────────────────────────

pub use apply::{EditBuffer, FileChange, TextEdit};
pub use error::{ApplyError, MigrationError, PlanError};
pub use events::{EventSink, LogLevel, MigrationEvent, Phase};
pub use orchestrator::{CancelToken, Migrator, PlannedFile, Prepared, RunOptions};
pub use plan::{
    EditPlan, ElementError, FilePlan, ImportConflict, ImportEdit, PlanKind, PropEdit, SetTarget,
};
pub use planner::{PlanOptions, PLACEHOLDER_MARKER};
pub use report::{ElementCounts, FailureKind, FileFailure, FileOutcome, RunMode, RunReport};

// ── Convenience re-exports: entry points ─────────────────────────────

pub use apply::apply_file;
pub use diff::unified_diff;
pub use orchestrator::prepare;
pub use planner::plan_file;
