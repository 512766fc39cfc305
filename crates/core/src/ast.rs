//! The flat source model: import bindings and element usages.
//!
//! Everything here is produced by [`crate::parser::extract`] and is plain
//! data. Byte spans point into the text the model was extracted from and are
//! only meaningful together with that exact text.

use std::path::PathBuf;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Half-open byte range `[start, end)`.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Span { start, end }
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// True when `other` lies entirely within `self`.
    pub fn contains(&self, other: &Span) -> bool {
        self.start <= other.start && other.end <= self.end
    }

    pub fn overlaps(&self, other: &Span) -> bool {
        self.start < other.end && other.start < self.end
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImportKind {
    Default,
    Named,
    Namespace,
}

/// One name introduced by an import statement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportBinding {
    pub local_name: String,
    /// `"default"` for default imports, `"*"` for namespace imports.
    pub imported_name: String,
    pub source_package: String,
    pub file: PathBuf,
    pub line: u32,
    pub kind: ImportKind,
    /// The whole statement, including a trailing `;` when present.
    pub statement: Span,
    /// The module specifier literal, quotes included.
    pub specifier: Span,
    /// The binding clause as written: `A`, `A as B` or `* as NS`.
    pub span: Span,
}

/// A prop value as written in source. Only literals are ever compared;
/// expressions and spreads stay opaque.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum PropValue {
    Str(String),
    Number(f64),
    Bool(bool),
    Expr(String),
    Spread(String),
}

impl PropValue {
    pub fn is_literal(&self) -> bool {
        matches!(
            self,
            PropValue::Str(_) | PropValue::Number(_) | PropValue::Bool(_)
        )
    }

    /// Stable textual summary used when aggregating usage.
    pub fn shape(&self) -> String {
        match self {
            PropValue::Str(s) => format!("{:?}", s),
            PropValue::Number(n) => format_number(*n),
            PropValue::Bool(b) => b.to_string(),
            PropValue::Expr(_) => "{expression}".to_string(),
            PropValue::Spread(_) => "{...spread}".to_string(),
        }
    }
}

/// Render a number the way it would be written in source (`2`, not `2.0`).
pub fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.is_finite() && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}

/// One attribute of an element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prop {
    pub value: PropValue,
    /// The whole attribute (`name="value"`, `name`, or `{...spread}`).
    pub span: Span,
    pub name_span: Span,
    /// The value as written (`"x"` or `{x}`); `None` for bare attributes
    /// and spreads.
    pub value_span: Option<Span>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ElementSpans {
    /// From `<` to the end of the closing tag (or `/>`).
    pub element: Span,
    pub open_tag: Span,
    pub name: Span,
    /// Where new attributes are inserted: just after the last attribute,
    /// or after the tag name when there are none.
    pub attrs_end: usize,
    /// Content between the opening and closing tags.
    pub children: Option<Span>,
    pub self_closing: bool,
}

/// One instance of a component tag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElementUsage {
    pub file: PathBuf,
    pub line: u32,
    /// The tag as written, e.g. `Button` or `UI.Button`.
    pub component_local_name: String,
    /// The exported name the tag resolves to through its import binding.
    pub imported_name: Option<String>,
    pub import_ref: Option<ImportBinding>,
    /// Attributes keyed by name; a repeated attribute holds its last value.
    pub props: IndexMap<String, Prop>,
    /// Earlier occurrences of repeated attributes, in source order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub shadowed: Vec<(String, Prop)>,
    pub spans: ElementSpans,
}

impl ElementUsage {
    pub fn source_package(&self) -> Option<&str> {
        self.import_ref.as_ref().map(|b| b.source_package.as_str())
    }

    /// Name used for rule lookup: the imported name when resolvable,
    /// otherwise the tag as written.
    pub fn component_name(&self) -> &str {
        self.imported_name
            .as_deref()
            .unwrap_or(&self.component_local_name)
    }

    pub fn prop(&self, name: &str) -> Option<&PropValue> {
        self.props.get(name).map(|p| &p.value)
    }

    /// Every occurrence of an attribute, in source order.
    pub fn occurrences<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Prop> + 'a {
        self.shadowed
            .iter()
            .filter(move |(n, _)| n == name)
            .map(|(_, p)| p)
            .chain(self.props.get(name))
    }
}

/// Everything extracted from one file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FileModel {
    pub path: PathBuf,
    pub imports: Vec<ImportBinding>,
    pub elements: Vec<ElementUsage>,
}
