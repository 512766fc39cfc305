use std::path::PathBuf;

use migr8_core::ast::Span;

/// A matched rule that cannot be applied to one element. The element is
/// left untouched; the rest of the file is still migrated.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PlanError {
    #[error("template for <{component}> uses {{{{{placeholder}}}}} but the element has no such prop")]
    MissingPlaceholder {
        component: String,
        placeholder: String,
    },

    #[error("<{component}> has children but its replacement template has no {{{{INNER}}}} or {{{{CHILDREN}}}} slot")]
    ChildrenDropped { component: String },

    #[error("renaming '{from}' to '{to}' on <{component}> collides with an existing '{to}' prop")]
    RenameCollision {
        component: String,
        from: String,
        to: String,
    },
}

/// Failure turning a file's plans into new text.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ApplyError {
    #[error("{}: edits at {}..{} and {}..{} overlap", path.display(), first.start, first.end, second.start, second.end)]
    Overlap {
        path: PathBuf,
        first: Span,
        second: Span,
    },

    #[error("{}: edit {}..{} is outside the file ({} bytes) or not on a character boundary", path.display(), span.start, span.end, len)]
    OutOfBounds { path: PathBuf, span: Span, len: usize },
}

/// Run-fatal orchestrator failures. Everything per file or per element is
/// isolated into the run report instead.
#[derive(Debug, thiserror::Error)]
pub enum MigrationError {
    #[error(transparent)]
    Scan(#[from] migr8_core::ScanError),

    #[error(transparent)]
    Rules(#[from] migr8_rules::RuleError),

    #[error("--apply with backups enabled needs a backup store")]
    NoBackupStore,

    #[error("migration task failed: {0}")]
    Task(String),
}
