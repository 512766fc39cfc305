//! Source model extractor.
//!
//! Scans one JavaScript/TypeScript file just deeply enough to find import
//! statements and JSX elements. Everything else (statements, expressions,
//! types) is skipped over while keeping track of strings, comments,
//! template literals and brace nesting so that a `<` or `import` inside any
//! of those is never misread.
use std::collections::HashMap;
use std::path::Path;

use crate::ast::{ElementUsage, FileModel, ImportBinding, ImportKind};
use crate::error::ParseError;
use crate::lexer::{is_ident_start, Cursor};

mod imports;
mod jsx;

pub use jsx::classify_expression;

/// Keywords after which an expression (and so a regex or JSX) may start.
const EXPR_KEYWORDS: &[&str] = &[
    "return",
    "typeof",
    "case",
    "do",
    "else",
    "in",
    "of",
    "new",
    "delete",
    "void",
    "throw",
    "yield",
    "await",
    "instanceof",
    "default",
    "export",
];

/// What the previous significant token was, for `/` and `<` disambiguation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Prev {
    ExprStart,
    Operand,
    Dot,
}

struct Parser<'a> {
    cur: Cursor<'a>,
    path: &'a Path,
    jsx: bool,
    imports: Vec<ImportBinding>,
    elements: Vec<ElementUsage>,
}

/// Extract the import bindings and component element usages of one file.
pub fn extract(path: &Path, src: &str) -> Result<FileModel, ParseError> {
    let filename = path.to_string_lossy();
    let mut parser = Parser {
        cur: Cursor::new(src, &filename),
        path,
        jsx: jsx_enabled(path),
        imports: Vec::new(),
        elements: Vec::new(),
    };
    parser.scan_code(None)?;
    Ok(parser.finish())
}

/// Plain `.ts` files cannot contain JSX; `<` there is a generic or a cast.
pub fn jsx_enabled(path: &Path) -> bool {
    !matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("ts" | "mts" | "cts")
    )
}

impl<'a> Parser<'a> {
    /// Scan code until end of input, or (with `open` set to the offset of
    /// a `{`) until the matching `}` has been consumed.
    fn scan_code(&mut self, open: Option<usize>) -> Result<(), ParseError> {
        let mut depth = 0usize;
        let mut prev = Prev::ExprStart;
        loop {
            self.cur.skip_trivia()?;
            let Some(b) = self.cur.peek() else {
                return match open {
                    Some(at) => Err(self.cur.err_at(at, "unterminated '{' expression")),
                    None => Ok(()),
                };
            };
            match b {
                b'{' => {
                    depth += 1;
                    self.cur.bump();
                    prev = Prev::ExprStart;
                }
                b'}' => {
                    if depth == 0 {
                        if open.is_some() {
                            self.cur.bump();
                            return Ok(());
                        }
                        return Err(self.cur.err_at(self.cur.pos, "unbalanced '}'"));
                    }
                    depth -= 1;
                    self.cur.bump();
                    prev = Prev::ExprStart;
                }
                b')' | b']' => {
                    self.cur.bump();
                    prev = Prev::Operand;
                }
                b'"' | b'\'' => {
                    self.cur.read_js_string()?;
                    prev = Prev::Operand;
                }
                b'`' => {
                    self.scan_template()?;
                    prev = Prev::Operand;
                }
                b'/' => {
                    if prev == Prev::ExprStart {
                        prev = if self.cur.skip_regex() {
                            Prev::Operand
                        } else {
                            Prev::ExprStart
                        };
                    } else {
                        self.cur.bump();
                        prev = Prev::ExprStart;
                    }
                }
                b'<' => {
                    if self.jsx && prev == Prev::ExprStart && self.looks_like_jsx() {
                        self.parse_element()?;
                        prev = Prev::Operand;
                    } else {
                        self.cur.bump();
                        prev = Prev::ExprStart;
                    }
                }
                b'.' => {
                    if self.cur.peek_at(1).is_some_and(|d| d.is_ascii_digit()) {
                        self.cur.skip_number();
                        prev = Prev::Operand;
                    } else {
                        self.cur.bump();
                        prev = Prev::Dot;
                    }
                }
                b if b.is_ascii_digit() => {
                    self.cur.skip_number();
                    prev = Prev::Operand;
                }
                b if is_ident_start(b) => {
                    let start = self.cur.pos;
                    let word = self.cur.read_ident().unwrap_or_default();
                    if prev == Prev::Dot {
                        prev = Prev::Operand;
                        continue;
                    }
                    if word == "import" && depth == 0 && open.is_none() && self.try_import(start)? {
                        prev = Prev::ExprStart;
                        continue;
                    }
                    prev = if EXPR_KEYWORDS.contains(&word) {
                        Prev::ExprStart
                    } else {
                        Prev::Operand
                    };
                }
                _ => {
                    self.cur.bump();
                    prev = Prev::ExprStart;
                }
            }
        }
    }

    fn scan_template(&mut self) -> Result<(), ParseError> {
        let open = self.cur.pos;
        self.cur.bump();
        loop {
            match self.cur.peek() {
                None => return Err(self.cur.err_at(open, "unterminated template literal")),
                Some(b'`') => {
                    self.cur.bump();
                    return Ok(());
                }
                Some(b'\\') => {
                    self.cur.bump();
                    self.cur.bump();
                }
                Some(b'$') if self.cur.peek_at(1) == Some(b'{') => {
                    let at = self.cur.pos + 1;
                    self.cur.bump();
                    self.cur.bump();
                    self.scan_code(Some(at))?;
                }
                Some(_) => self.cur.bump(),
            }
        }
    }

    /// Resolve every recorded element against the file's import bindings.
    fn finish(self) -> FileModel {
        let Parser {
            path,
            imports,
            mut elements,
            ..
        } = self;

        let mut by_local: HashMap<&str, &ImportBinding> = HashMap::new();
        for binding in &imports {
            by_local.entry(binding.local_name.as_str()).or_insert(binding);
        }

        for el in &mut elements {
            let (root, rest) = match el.component_local_name.split_once('.') {
                Some((root, rest)) => (root, Some(rest)),
                None => (el.component_local_name.as_str(), None),
            };
            let Some(binding) = by_local.get(root) else {
                continue;
            };
            el.imported_name = match (binding.kind, rest) {
                (ImportKind::Namespace, Some(rest)) => Some(rest.to_string()),
                (ImportKind::Namespace, None) => None,
                // A default export has no name of its own; the local name is
                // what rule authors refer to.
                (ImportKind::Default, _) => Some(el.component_local_name.clone()),
                (ImportKind::Named, Some(rest)) => {
                    Some(format!("{}.{}", binding.imported_name, rest))
                }
                (ImportKind::Named, None) => Some(binding.imported_name.clone()),
            };
            el.import_ref = Some((*binding).clone());
        }

        FileModel {
            path: path.to_path_buf(),
            imports,
            elements,
        }
    }
}
