//! Import statements: default, named (with aliases and string names),
//! namespace, side-effect and type-only forms.

use crate::ast::{ImportBinding, ImportKind, Span};
use crate::error::ParseError;
use crate::lexer::is_ident_start;

use super::Parser;

/// Kind, imported name, local name, binding clause span.
type PendingBinding = (ImportKind, String, String, Span);

impl<'a> Parser<'a> {
    /// Parse an import statement whose `import` keyword starts at `start`
    /// (the cursor is just past the keyword). Returns `false` with the cursor
    /// restored for `import(...)`, `import.meta` and forms we do not model,
    /// such as `import x = require(...)`.
    pub(super) fn try_import(&mut self, start: usize) -> Result<bool, ParseError> {
        let after_kw = self.cur.pos;
        self.cur.skip_trivia()?;
        match self.cur.peek() {
            None | Some(b'(' | b'.') => {
                self.cur.pos = after_kw;
                return Ok(false);
            }
            Some(b'"' | b'\'') => {
                self.cur.read_js_string()?;
                self.finish_statement();
                return Ok(true);
            }
            _ => {}
        }

        let mut type_only = false;
        if self.cur.peek_ident() == Some("type") {
            let save = self.cur.pos;
            self.cur.read_ident();
            self.cur.skip_trivia()?;
            let binds_type_name = self.cur.peek_ident() == Some("from")
                || matches!(self.cur.peek(), Some(b',' | b'='));
            if binds_type_name {
                self.cur.pos = save;
            } else {
                type_only = true;
            }
        }

        let mut pending: Vec<PendingBinding> = Vec::new();
        let default_start = self.cur.pos;
        if let Some(local) = self.cur.read_ident() {
            let span = Span::new(default_start, self.cur.pos);
            pending.push((ImportKind::Default, "default".to_string(), local.to_string(), span));
            self.cur.skip_trivia()?;
            if self.cur.peek() == Some(b',') {
                self.cur.bump();
                self.cur.skip_trivia()?;
            }
        }

        match self.cur.peek() {
            Some(b'*') => {
                let ns_start = self.cur.pos;
                self.cur.bump();
                self.cur.skip_trivia()?;
                if self.cur.read_ident() != Some("as") {
                    return self.not_an_import(after_kw);
                }
                self.cur.skip_trivia()?;
                let Some(local) = self.cur.read_ident() else {
                    return self.not_an_import(after_kw);
                };
                let span = Span::new(ns_start, self.cur.pos);
                pending.push((ImportKind::Namespace, "*".to_string(), local.to_string(), span));
                self.cur.skip_trivia()?;
            }
            Some(b'{') => {
                self.cur.bump();
                if !self.parse_named_specifiers(&mut pending)? {
                    return self.not_an_import(after_kw);
                }
            }
            _ => {}
        }

        if self.cur.read_ident() != Some("from") {
            return self.not_an_import(after_kw);
        }
        self.cur.skip_trivia()?;
        let spec_start = self.cur.pos;
        if !matches!(self.cur.peek(), Some(b'"' | b'\'')) {
            return self.not_an_import(after_kw);
        }
        let source = self.cur.read_js_string()?;
        let specifier = Span::new(spec_start, self.cur.pos);
        self.skip_import_attributes()?;
        self.finish_statement();

        if type_only {
            return Ok(true);
        }
        let statement = Span::new(start, self.cur.pos);
        let line = self.cur.line_of(start);
        for (kind, imported_name, local_name, span) in pending {
            self.imports.push(ImportBinding {
                local_name,
                imported_name,
                source_package: source.clone(),
                file: self.path.to_path_buf(),
                line,
                kind,
                statement,
                specifier,
                span,
            });
        }
        Ok(true)
    }

    /// `{ A, B as C, type D, "string name" as E }`, cursor just past `{`.
    fn parse_named_specifiers(
        &mut self,
        out: &mut Vec<PendingBinding>,
    ) -> Result<bool, ParseError> {
        loop {
            self.cur.skip_trivia()?;
            let spec_start = self.cur.pos;
            let imported = match self.cur.peek() {
                Some(b'}') => {
                    self.cur.bump();
                    self.cur.skip_trivia()?;
                    return Ok(true);
                }
                Some(b',') => {
                    self.cur.bump();
                    continue;
                }
                Some(b'"' | b'\'') => self.cur.read_js_string()?,
                Some(b) if is_ident_start(b) => self.cur.read_ident().unwrap_or_default().to_string(),
                _ => return Ok(false),
            };

            let mut imported = imported;
            let mut inline_type = false;
            let mut spec_end = self.cur.pos;
            self.cur.skip_trivia()?;
            if imported == "type" {
                if let Some(next) = self.cur.peek_ident() {
                    if next != "as" {
                        inline_type = true;
                        imported = next.to_string();
                        self.cur.read_ident();
                        self.cur.skip_trivia()?;
                    }
                }
            }

            let mut local = imported.clone();
            if self.cur.peek_ident() == Some("as") {
                self.cur.read_ident();
                self.cur.skip_trivia()?;
                match self.cur.read_ident() {
                    Some(name) => local = name.to_string(),
                    None => return Ok(false),
                }
                spec_end = self.cur.pos;
            }
            if !inline_type {
                let span = Span::new(spec_start, spec_end);
                out.push((ImportKind::Named, imported, local, span));
            }
        }
    }

    /// `with { type: "json" }` or the older `assert { ... }`.
    fn skip_import_attributes(&mut self) -> Result<(), ParseError> {
        let save = self.cur.pos;
        self.cur.skip_trivia()?;
        if matches!(self.cur.peek_ident(), Some("with" | "assert")) {
            self.cur.read_ident();
            self.cur.skip_trivia()?;
            if self.cur.peek() == Some(b'{') {
                let at = self.cur.pos;
                self.cur.bump();
                self.scan_code(Some(at))?;
                return Ok(());
            }
        }
        self.cur.pos = save;
        Ok(())
    }

    /// Take a trailing `;` on the same line into the statement.
    fn finish_statement(&mut self) {
        let save = self.cur.pos;
        while matches!(self.cur.peek(), Some(b' ' | b'\t')) {
            self.cur.bump();
        }
        if self.cur.peek() == Some(b';') {
            self.cur.bump();
        } else {
            self.cur.pos = save;
        }
    }

    fn not_an_import(&mut self, after_kw: usize) -> Result<bool, ParseError> {
        self.cur.pos = after_kw;
        Ok(false)
    }
}

#[cfg(test)]
mod tests {
    use crate::ast::ImportKind;
    use crate::parser::extract;
    use std::path::PathBuf;

    fn imports(src: &str) -> Vec<(ImportKind, String, String, String)> {
        extract(&PathBuf::from("a.jsx"), src)
            .unwrap()
            .imports
            .into_iter()
            .map(|b| (b.kind, b.imported_name, b.local_name, b.source_package))
            .collect()
    }

    #[test]
    fn default_and_named_in_one_statement() {
        let got = imports("import React, { useState, Button as B } from 'react';");
        assert_eq!(got.len(), 3);
        assert_eq!(got[0].0, ImportKind::Default);
        assert_eq!(got[0].2, "React");
        assert_eq!(got[2].1, "Button");
        assert_eq!(got[2].2, "B");
        assert!(got.iter().all(|g| g.3 == "react"));
    }

    #[test]
    fn type_only_imports_bind_nothing() {
        assert!(imports("import type { Props } from './types';").is_empty());
        let got = imports("import { type Props, Button } from 'ui';");
        assert_eq!(got.len(), 1);
        assert_eq!(got[0].1, "Button");
    }

    #[test]
    fn default_binding_named_type_is_not_type_only() {
        let got = imports("import type from 'typelib';");
        assert_eq!(got.len(), 1);
        assert_eq!(got[0].2, "type");
    }

    #[test]
    fn side_effect_and_dynamic_imports_bind_nothing() {
        assert!(imports("import './styles.css';\nconst m = import('./lazy');\nconsole.log(import.meta.url);").is_empty());
    }

    #[test]
    fn require_style_import_is_skipped_not_fatal() {
        let model = extract(
            &PathBuf::from("a.tsx"),
            "import fs = require('fs');\nimport { X } from 'x';\n",
        )
        .unwrap();
        assert_eq!(model.imports.len(), 1);
        assert_eq!(model.imports[0].local_name, "X");
    }

    #[test]
    fn statement_and_specifier_spans() {
        let src = "import { A } from \"pkg\";\nconst x = 1;";
        let model = extract(&PathBuf::from("a.js"), src).unwrap();
        let b = &model.imports[0];
        assert_eq!(&src[b.statement.start..b.statement.end], "import { A } from \"pkg\";");
        assert_eq!(&src[b.specifier.start..b.specifier.end], "\"pkg\"");
    }

    #[test]
    fn binding_clause_spans() {
        let src = "import Def, { A, B as C } from 'pkg';
import * as NS from 'ns';";
        let model = extract(&PathBuf::from("a.js"), src).unwrap();
        let clauses: Vec<_> = model
            .imports
            .iter()
            .map(|b| &src[b.span.start..b.span.end])
            .collect();
        assert_eq!(clauses, ["Def", "A", "B as C", "* as NS"]);
    }

    #[test]
    fn multiline_named_imports_with_trailing_comma() {
        let got = imports("import {\n  Button,\n  // comment\n  Card as C,\n} from '@old/ui'\n");
        assert_eq!(got.len(), 2);
        assert_eq!(got[1].2, "C");
    }
}
