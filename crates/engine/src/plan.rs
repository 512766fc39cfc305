//! Edit plan types.
//!
//! Plans are computed per element, never mutate the project graph, and are
//! handed to the applier by value. Every edit carries the byte spans it
//! touches in the original file text.

use std::path::PathBuf;

use migr8_core::ast::{ElementUsage, ImportBinding, Span};
use migr8_rules::Literal;
use serde::Serialize;

use crate::error::PlanError;

/// Terminal state of one element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanKind {
    Matched,
    Placeholder,
    Unmatched,
}

/// Where a `set` directive writes its value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SetTarget {
    /// Replace an existing value (`"x"` or `{x}`).
    Value(Span),
    /// Give a bare attribute a value: insert `=value` at this offset.
    AppendValue(usize),
    /// Add a new attribute at this offset.
    Insert(usize),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum PropEdit {
    Remove {
        name: String,
        span: Span,
    },
    Rename {
        from: String,
        to: String,
        name_span: Span,
    },
    Set {
        name: String,
        value: Literal,
        target: SetTarget,
    },
}

/// Move one import binding to another module.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImportEdit {
    pub binding: ImportBinding,
    pub from: String,
    pub to: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Replacement {
    pub span: Span,
    pub text: String,
}

/// A marker comment inserted into the opening tag of a placeholder-governed
/// element.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Annotation {
    pub at: usize,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EditPlan {
    pub element: ElementUsage,
    pub kind: PlanKind,
    pub prop_edits: Vec<PropEdit>,
    pub replacement: Option<Replacement>,
    pub annotation: Option<Annotation>,
    /// The import change this element asked for; `None` when it lost a
    /// conflict to an earlier element.
    pub import_edit: Option<ImportEdit>,
    pub dropped_props: Vec<String>,
}

impl EditPlan {
    pub fn new(element: &ElementUsage, kind: PlanKind) -> Self {
        EditPlan {
            element: element.clone(),
            kind,
            prop_edits: Vec::new(),
            replacement: None,
            annotation: None,
            import_edit: None,
            dropped_props: Vec::new(),
        }
    }

    /// True when applying this plan changes the element itself.
    pub fn edits_element(&self) -> bool {
        !self.prop_edits.is_empty() || self.replacement.is_some() || self.annotation.is_some()
    }

    /// Spans no later element in the same file may be planned inside.
    pub fn claimed_spans(&self) -> Vec<Span> {
        if let Some(r) = &self.replacement {
            return vec![r.span];
        }
        self.prop_edits
            .iter()
            .filter_map(|e| match e {
                PropEdit::Remove { span, .. } => Some(*span),
                PropEdit::Set {
                    target: SetTarget::Value(span),
                    ..
                } => Some(*span),
                _ => None,
            })
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ElementError {
    pub file: PathBuf,
    pub line: u32,
    pub component: String,
    pub error: String,
}

impl ElementError {
    pub fn new(element: &ElementUsage, error: &PlanError) -> Self {
        ElementError {
            file: element.file.clone(),
            line: element.line,
            component: element.component_name().to_string(),
            error: error.to_string(),
        }
    }
}

/// Two rules disagreed on where one import binding should go. The first
/// one (in source order) won.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImportConflict {
    pub file: PathBuf,
    pub line: u32,
    pub local_name: String,
    pub kept: String,
    pub rejected: String,
}

impl std::fmt::Display for ImportConflict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}:{}: conflicting import edit for '{}': keeping '{}', ignoring '{}'",
            self.file.display(),
            self.line,
            self.local_name,
            self.kept,
            self.rejected
        )
    }
}

/// Everything planned for one file.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FilePlan {
    pub path: PathBuf,
    /// Plans for elements whose package has a rule set, in source order.
    pub plans: Vec<EditPlan>,
    /// At most one per binding.
    pub import_edits: Vec<ImportEdit>,
    /// Every import binding of the file, for statement splitting.
    pub bindings: Vec<ImportBinding>,
    pub errors: Vec<ElementError>,
    pub conflicts: Vec<ImportConflict>,
    /// Elements inside a span claimed by an earlier plan.
    pub superseded: usize,
}

impl FilePlan {
    pub fn count(&self, kind: PlanKind) -> usize {
        self.plans.iter().filter(|p| p.kind == kind).count()
    }

    /// True when there is anything for the applier to do.
    pub fn has_edits(&self) -> bool {
        !self.import_edits.is_empty() || self.plans.iter().any(EditPlan::edits_element)
    }
}
