//! migr8-core: source model extraction and project usage analysis.
//!
//! Turns a tree of JS/TS source files into a [`ProjectGraph`] of import
//! bindings and component element usages, and summarises that graph into a
//! [`UsageReport`] for rule authoring.
//!
//! # Public API
//!
//! - [`extract()`] -- one file to a [`FileModel`]
//! - [`build_graph()`] -- a whole project to a [`ProjectGraph`]
//! - [`aggregate()`] -- a graph to a [`UsageReport`]
//! - [`SourceProvider`] -- filesystem or in-memory source enumeration

pub mod aggregate;
pub mod ast;
pub mod error;
pub mod graph;
pub mod lexer;
pub mod parser;
pub mod source;

// ── Convenience re-exports: key types ────────────────────────────────

pub use aggregate::{ComponentUsage, PropCombination, ProjectStats, UsageReport};
pub use ast::{
    ElementSpans, ElementUsage, FileModel, ImportBinding, ImportKind, Prop, PropValue, Span,
};
pub use error::ParseError;
pub use graph::{GraphWarning, ProjectGraph, ProjectScan};
pub use source::{
    FileSystemProvider, InMemoryProvider, ScanError, ScanOptions, SourceFilter, SourceProvider,
};

// ── Convenience re-exports: entry points ─────────────────────────────

pub use aggregate::aggregate;
pub use graph::{build_graph, scan_project};
pub use parser::extract;
