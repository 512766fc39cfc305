//! Turning a file plan into new file text.
//!
//! Every planned change becomes a [`TextEdit`] against the original text.
//! Edits are collected in an [`EditBuffer`], which rejects overlapping
//! edits and applies the rest from the end of the file backwards so no
//! offset is ever shifted by an earlier edit.

use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use migr8_core::ast::{ImportBinding, ImportKind, Span};
use serde::Serialize;
use tracing::debug;

use crate::diff::{diff_stats, unified_diff, DiffStats};
use crate::error::ApplyError;
use crate::plan::{FilePlan, ImportEdit, PropEdit, SetTarget};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextEdit {
    pub span: Span,
    pub text: String,
    seq: usize,
}

pub struct EditBuffer<'a> {
    path: &'a Path,
    text: &'a str,
    edits: Vec<TextEdit>,
}

impl<'a> EditBuffer<'a> {
    pub fn new(path: &'a Path, text: &'a str) -> Self {
        EditBuffer {
            path,
            text,
            edits: Vec::new(),
        }
    }

    /// Queue a replacement of `span`. An identical edit already queued is
    /// ignored; one that overlaps a different edit is an error.
    pub fn replace(&mut self, span: Span, text: impl Into<String>) -> Result<(), ApplyError> {
        let text = text.into();
        self.validate_bounds(span)?;
        if self.edits.iter().any(|e| e.span == span && e.text == text) {
            debug!(path = %self.path.display(), start = span.start, end = span.end, "duplicate edit ignored");
            return Ok(());
        }
        if let Some(existing) = self.edits.iter().find(|e| e.span.overlaps(&span)) {
            return Err(ApplyError::Overlap {
                path: self.path.to_path_buf(),
                first: existing.span,
                second: span,
            });
        }
        let seq = self.edits.len();
        self.edits.push(TextEdit { span, text, seq });
        Ok(())
    }

    pub fn insert(&mut self, at: usize, text: impl Into<String>) -> Result<(), ApplyError> {
        self.replace(Span::new(at, at), text)
    }

    pub fn delete(&mut self, span: Span) -> Result<(), ApplyError> {
        self.replace(span, String::new())
    }

    fn validate_bounds(&self, span: Span) -> Result<(), ApplyError> {
        let ok = span.start <= span.end
            && span.end <= self.text.len()
            && self.text.is_char_boundary(span.start)
            && self.text.is_char_boundary(span.end);
        if ok {
            Ok(())
        } else {
            Err(ApplyError::OutOfBounds {
                path: self.path.to_path_buf(),
                span,
                len: self.text.len(),
            })
        }
    }

    pub fn len(&self) -> usize {
        self.edits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edits.is_empty()
    }

    /// Apply every queued edit. Inserts at the same offset keep the order
    /// they were queued in.
    pub fn render(mut self) -> String {
        self.edits.sort_by(|a, b| {
            (b.span.start, b.span.end, b.seq).cmp(&(a.span.start, a.span.end, a.seq))
        });
        let mut out = self.text.to_string();
        for edit in &self.edits {
            out.replace_range(edit.span.start..edit.span.end, &edit.text);
        }
        out
    }
}

/// The outcome of applying one file's plans.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileChange {
    pub path: PathBuf,
    #[serde(skip)]
    pub new_text: String,
    pub diff: String,
    pub stats: DiffStats,
    pub edits: usize,
}

impl FileChange {
    pub fn changed(&self) -> bool {
        !self.diff.is_empty()
    }
}

/// Apply everything planned for one file to its text.
pub fn apply_file(path: &Path, text: &str, plan: &FilePlan) -> Result<FileChange, ApplyError> {
    let mut buf = EditBuffer::new(path, text);

    for p in &plan.plans {
        if let Some(r) = &p.replacement {
            buf.replace(r.span, r.text.clone())?;
        }
        if let Some(a) = &p.annotation {
            buf.insert(a.at, a.text.clone())?;
        }
        // New attributes go after any value given to a bare attribute at
        // the same offset.
        let mut inserts = Vec::new();
        for edit in &p.prop_edits {
            match edit {
                PropEdit::Remove { span, .. } => {
                    buf.delete(Span::new(removal_start(text, span.start), span.end))?;
                }
                PropEdit::Rename { to, name_span, .. } => buf.replace(*name_span, to.clone())?,
                PropEdit::Set {
                    name,
                    value,
                    target,
                } => match target {
                    SetTarget::Value(span) => buf.replace(*span, value.to_jsx_value())?,
                    SetTarget::AppendValue(at) => {
                        buf.insert(*at, format!("={}", value.to_jsx_value()))?
                    }
                    SetTarget::Insert(at) => {
                        inserts.push((*at, format!(" {}={}", name, value.to_jsx_value())))
                    }
                },
            }
        }
        for (at, attr) in inserts {
            buf.insert(at, attr)?;
        }
    }

    rewrite_imports(&mut buf, text, plan)?;

    let edits = buf.len();
    let new_text = buf.render();
    Ok(FileChange {
        path: path.to_path_buf(),
        diff: unified_diff(path, text, &new_text),
        stats: diff_stats(text, &new_text),
        new_text,
        edits,
    })
}

/// Start of the text a removed attribute takes with it: the blanks before
/// it, and the line break before those unless that break ends a `//`
/// comment.
fn removal_start(text: &str, at: usize) -> usize {
    let bytes = text.as_bytes();
    let blank = |at: usize| {
        let mut at = at;
        while at > 0 && matches!(bytes[at - 1], b' ' | b'\t') {
            at -= 1;
        }
        at
    };
    let start = blank(at);
    if start == 0 || bytes[start - 1] != b'\n' {
        return start;
    }
    let mut eol = start - 1;
    if eol > 0 && bytes[eol - 1] == b'\r' {
        eol -= 1;
    }
    let line_start = text[..eol].rfind('\n').map_or(0, |i| i + 1);
    if text[line_start..eol].contains("//") {
        return start;
    }
    blank(eol)
}

// ── Import statements ────────────────────────────────────────────────

/// Moves import bindings between modules. A statement whose bindings all
/// move to one module only has its specifier rewritten; otherwise the
/// moved bindings are cut out and new statements are added after it.
fn rewrite_imports(
    buf: &mut EditBuffer<'_>,
    text: &str,
    plan: &FilePlan,
) -> Result<(), ApplyError> {
    let mut by_statement: IndexMap<Span, Vec<&ImportEdit>> = IndexMap::new();
    for edit in &plan.import_edits {
        by_statement
            .entry(edit.binding.statement)
            .or_default()
            .push(edit);
    }

    for (statement, moved) in by_statement {
        let specifier = moved[0].binding.specifier;
        let quote = text[specifier.start..specifier.end]
            .chars()
            .next()
            .unwrap_or('\'');
        let semi = if text[statement.start..statement.end].ends_with(';') {
            ";"
        } else {
            ""
        };

        let clause = cut_bindings(text, statement, specifier, &moved);
        let kept_nothing = clause_is_empty(&clause);
        let first_to = &moved[0].to;
        if kept_nothing && moved.iter().all(|e| e.to == *first_to) {
            buf.replace(specifier, format!("{q}{}{q}", first_to, q = quote))?;
            continue;
        }

        let mut lines = Vec::new();
        if !kept_nothing {
            lines.push(format!("{}{}", clause, &text[specifier.start..statement.end]));
        }
        let mut groups: IndexMap<&str, Vec<&ImportBinding>> = IndexMap::new();
        for edit in &moved {
            groups.entry(edit.to.as_str()).or_default().push(&edit.binding);
        }
        for (to, bindings) in groups {
            lines.push(import_statement(text, &bindings, to, quote, semi));
        }
        buf.replace(statement, lines.join("\n"))?;
    }
    Ok(())
}

/// The statement text up to the module specifier with every moved binding
/// removed, together with the comma that separated it.
fn cut_bindings(text: &str, statement: Span, specifier: Span, moved: &[&ImportEdit]) -> String {
    let base = statement.start;
    let mut clause = text[base..specifier.start].to_string();

    let mut spans: Vec<Span> = moved.iter().map(|e| e.binding.span).collect();
    spans.sort_by(|a, b| b.start.cmp(&a.start));
    for span in spans {
        let (s, e) = (span.start - base, span.end - base);
        let bytes = clause.as_bytes();
        let mut after = e;
        while after < bytes.len() && bytes[after].is_ascii_whitespace() {
            after += 1;
        }
        if bytes.get(after) == Some(&b',') {
            after += 1;
            while after < bytes.len() && matches!(bytes[after], b' ' | b'\t') {
                after += 1;
            }
            clause.replace_range(s..after, "");
            continue;
        }
        let before = leading_whitespace(&clause, s);
        if before > 0 && bytes[before - 1] == b',' {
            clause.replace_range(before - 1..e, "");
        } else {
            clause.replace_range(s..e, "");
        }
    }

    if let (Some(open), Some(close)) = (clause.find('{'), clause.find('}')) {
        let inside = &clause[open + 1..close];
        if open < close && inside.chars().all(|c| c.is_whitespace() || c == ',') {
            let before = leading_whitespace(&clause, open);
            let start = if before > 0 && clause.as_bytes()[before - 1] == b',' {
                before - 1
            } else {
                open
            };
            clause.replace_range(start..close + 1, "");
        }
    }
    clause
}

/// Offset of the first whitespace byte in the run that ends at `at`.
fn leading_whitespace(text: &str, at: usize) -> usize {
    let bytes = text.as_bytes();
    let mut at = at;
    while at > 0 && bytes[at - 1].is_ascii_whitespace() {
        at -= 1;
    }
    at
}

/// True when nothing is left between `import` and `from`.
fn clause_is_empty(clause: &str) -> bool {
    let body = clause.trim_start().strip_prefix("import").unwrap_or(clause);
    let body = body.trim_end();
    let body = body.strip_suffix("from").unwrap_or(body);
    body.trim().is_empty()
}

fn binding_text<'t>(text: &'t str, binding: &ImportBinding) -> &'t str {
    &text[binding.span.start..binding.span.end]
}

fn import_statement(
    text: &str,
    bindings: &[&ImportBinding],
    to: &str,
    quote: char,
    semi: &str,
) -> String {
    let mut parts: Vec<String> = bindings
        .iter()
        .filter(|b| b.kind == ImportKind::Default)
        .map(|b| binding_text(text, b).to_string())
        .collect();
    let named: Vec<&str> = bindings
        .iter()
        .filter(|b| b.kind == ImportKind::Named)
        .map(|b| binding_text(text, b))
        .collect();
    if !named.is_empty() {
        parts.push(format!("{{ {} }}", named.join(", ")));
    }
    format!(
        "import {} from {q}{}{q}{}",
        parts.join(", "),
        to,
        semi,
        q = quote
    )
}
