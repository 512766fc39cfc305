//! JSX elements, fragments, attributes and children.

use indexmap::IndexMap;

use crate::ast::{ElementSpans, ElementUsage, Prop, PropValue, Span};
use crate::error::ParseError;
use crate::lexer::{is_ident_start, is_jsx_name_continue};

use super::Parser;

/// Capitalized tags and member expressions are components; lowercase tags
/// are intrinsic elements and are not recorded.
fn is_component_name(name: &str) -> bool {
    name.contains('.') || name.as_bytes().first().is_some_and(|b| b.is_ascii_uppercase())
}

impl<'a> Parser<'a> {
    /// Called with the cursor on a `<` in expression position. Rejects TSX
    /// generic arrow heads such as `<T,>` and `<T extends U>`.
    pub(super) fn looks_like_jsx(&self) -> bool {
        let bytes = self.cur.src().as_bytes();
        let mut i = self.cur.pos + 1;
        while i < bytes.len() && bytes[i].is_ascii_whitespace() {
            i += 1;
        }
        match bytes.get(i) {
            Some(b'>') => return true,
            Some(&b) if is_ident_start(b) => {}
            _ => return false,
        }
        while i < bytes.len() && (is_jsx_name_continue(bytes[i]) || bytes[i] == b'.' || bytes[i] == b':') {
            i += 1;
        }
        while i < bytes.len() && bytes[i].is_ascii_whitespace() {
            i += 1;
        }
        let rest = &bytes[i..];
        !(rest.starts_with(b",") || rest.starts_with(b"extends ") || rest.starts_with(b"extends\n"))
    }

    pub(super) fn parse_element(&mut self) -> Result<(), ParseError> {
        let start = self.cur.pos;
        self.cur.bump();
        self.cur.skip_trivia()?;

        if self.cur.peek() == Some(b'>') {
            self.cur.bump();
            self.parse_children(start, "")?;
            return Ok(());
        }

        let name_start = self.cur.pos;
        let name = self
            .cur
            .read_jsx_name(true)
            .ok_or_else(|| self.cur.err_at(start, "expected element name after '<'"))?;
        let name_span = Span::new(name_start, self.cur.pos);
        let mut attrs_end = self.cur.pos;

        // Pushed before attributes and children are parsed so that the
        // element list stays in outer-before-inner order.
        let index = if is_component_name(name) {
            self.elements.push(ElementUsage {
                file: self.path.to_path_buf(),
                line: self.cur.line_of(start),
                component_local_name: name.to_string(),
                imported_name: None,
                import_ref: None,
                props: IndexMap::new(),
                shadowed: Vec::new(),
                spans: ElementSpans {
                    element: Span::new(start, start),
                    open_tag: Span::new(start, start),
                    name: name_span,
                    attrs_end,
                    children: None,
                    self_closing: false,
                },
            });
            Some(self.elements.len() - 1)
        } else {
            None
        };

        self.cur.skip_trivia()?;
        if self.cur.peek() == Some(b'<') {
            self.skip_type_args()?;
            attrs_end = self.cur.pos;
        }

        let mut props: IndexMap<String, Prop> = IndexMap::new();
        let mut shadowed = Vec::new();
        let self_closing = loop {
            self.cur.skip_trivia()?;
            match self.cur.peek() {
                None => {
                    return Err(self
                        .cur
                        .err_at(start, format!("unterminated opening tag <{}>", name)));
                }
                Some(b'/') => {
                    if self.cur.eat("/>") {
                        break true;
                    }
                    return Err(self
                        .cur
                        .err_at(self.cur.pos, format!("expected '/>' to close <{}>", name)));
                }
                Some(b'>') => {
                    self.cur.bump();
                    break false;
                }
                Some(b'{') => {
                    let (key, prop) = self.parse_spread()?;
                    attrs_end = prop.span.end;
                    if let Some(earlier) = props.insert(key.clone(), prop) {
                        shadowed.push((key, earlier));
                    }
                }
                Some(b) if is_ident_start(b) => {
                    let (key, prop) = self.parse_attribute()?;
                    attrs_end = prop.span.end;
                    if let Some(earlier) = props.insert(key.clone(), prop) {
                        shadowed.push((key, earlier));
                    }
                }
                Some(b) => {
                    return Err(self.cur.err_at(
                        self.cur.pos,
                        format!("unexpected '{}' in <{}>", b as char, name),
                    ));
                }
            }
        };
        let open_tag = Span::new(start, self.cur.pos);

        let children = if self_closing {
            None
        } else {
            let children_start = self.cur.pos;
            let close_start = self.parse_children(start, name)?;
            Some(Span::new(children_start, close_start))
        };

        if let Some(i) = index {
            let el = &mut self.elements[i];
            el.props = props;
            el.shadowed = shadowed;
            el.spans = ElementSpans {
                element: Span::new(start, self.cur.pos),
                open_tag,
                name: name_span,
                attrs_end,
                children,
                self_closing,
            };
        }
        Ok(())
    }

    /// Parse children up to and including the closing tag. Returns the
    /// offset of the closing tag's `<`.
    fn parse_children(&mut self, open: usize, name: &str) -> Result<usize, ParseError> {
        loop {
            match self.cur.peek() {
                None => {
                    return Err(self
                        .cur
                        .err_at(open, format!("unclosed element <{}>", name)));
                }
                Some(b'<') => {
                    let close_start = self.cur.pos;
                    self.cur.bump();
                    self.cur.skip_whitespace();
                    if self.cur.peek() != Some(b'/') {
                        self.cur.pos = close_start;
                        self.parse_element()?;
                        continue;
                    }
                    self.cur.bump();
                    self.cur.skip_whitespace();
                    let found = self.cur.read_jsx_name(true).unwrap_or("");
                    self.cur.skip_whitespace();
                    if !self.cur.eat(">") {
                        return Err(self
                            .cur
                            .err_at(close_start, format!("malformed closing tag </{}", found)));
                    }
                    if found != name {
                        return Err(self.cur.err_at(
                            close_start,
                            format!(
                                "mismatched closing tag: expected </{}>, found </{}>",
                                name, found
                            ),
                        ));
                    }
                    return Ok(close_start);
                }
                Some(b'{') => {
                    let at = self.cur.pos;
                    self.cur.bump();
                    self.scan_code(Some(at))?;
                }
                Some(_) => self.cur.bump(),
            }
        }
    }

    fn parse_attribute(&mut self) -> Result<(String, Prop), ParseError> {
        let attr_start = self.cur.pos;
        let name = self.cur.read_jsx_name(false).unwrap_or_default();
        let name_span = Span::new(attr_start, self.cur.pos);

        let after_name = self.cur.pos;
        self.cur.skip_trivia()?;
        if self.cur.peek() != Some(b'=') {
            self.cur.pos = after_name;
            let prop = Prop {
                value: PropValue::Bool(true),
                span: name_span,
                name_span,
                value_span: None,
            };
            return Ok((name.to_string(), prop));
        }
        self.cur.bump();
        self.cur.skip_trivia()?;

        let value_start = self.cur.pos;
        let value = match self.cur.peek() {
            Some(b'"' | b'\'') => PropValue::Str(self.cur.read_jsx_string()?.to_string()),
            Some(b'{') => {
                self.cur.bump();
                self.scan_code(Some(value_start))?;
                classify_expression(self.cur.slice(value_start + 1, self.cur.pos - 1))
            }
            Some(b'<') => {
                self.parse_element()?;
                PropValue::Expr(self.cur.slice(value_start, self.cur.pos).to_string())
            }
            _ => {
                return Err(self.cur.err_at(
                    value_start,
                    format!("expected a value for attribute '{}'", name),
                ));
            }
        };
        let prop = Prop {
            value,
            span: Span::new(attr_start, self.cur.pos),
            name_span,
            value_span: Some(Span::new(value_start, self.cur.pos)),
        };
        Ok((name.to_string(), prop))
    }

    /// `{...expr}` inside an opening tag. Keyed as `...expr`.
    fn parse_spread(&mut self) -> Result<(String, Prop), ParseError> {
        let start = self.cur.pos;
        self.cur.bump();
        self.cur.skip_trivia()?;
        if !self.cur.eat("...") {
            return Err(self.cur.err_at(start, "expected '...' in attribute spread"));
        }
        let expr_start = self.cur.pos;
        self.scan_code(Some(start))?;
        let expr = self.cur.slice(expr_start, self.cur.pos - 1).trim().to_string();
        let span = Span::new(start, self.cur.pos);
        let prop = Prop {
            value: PropValue::Spread(expr.clone()),
            span,
            name_span: span,
            value_span: None,
        };
        Ok((format!("...{}", expr), prop))
    }

    /// TS type arguments on a tag: `<Select<Option> ...>`.
    fn skip_type_args(&mut self) -> Result<(), ParseError> {
        let open = self.cur.pos;
        let mut depth = 0usize;
        loop {
            match self.cur.peek() {
                None => return Err(self.cur.err_at(open, "unterminated type arguments")),
                Some(b'<') => depth += 1,
                Some(b'>') => {
                    depth -= 1;
                    if depth == 0 {
                        self.cur.bump();
                        return Ok(());
                    }
                }
                _ => {}
            }
            self.cur.bump();
        }
    }
}

/// Classify the inside of an attribute expression container. Only plain
/// literals become literal values; anything else stays an opaque snippet.
pub fn classify_expression(inner: &str) -> PropValue {
    let t = inner.trim();
    match t {
        "true" => return PropValue::Bool(true),
        "false" => return PropValue::Bool(false),
        _ => {}
    }
    let numeric_start = t
        .as_bytes()
        .first()
        .is_some_and(|b| b.is_ascii_digit() || *b == b'-' || *b == b'.');
    if numeric_start {
        if let Ok(n) = t.parse::<f64>() {
            if n.is_finite() {
                return PropValue::Number(n);
            }
        }
    }
    if let Some(s) = simple_string(t) {
        return PropValue::Str(s);
    }
    PropValue::Expr(t.to_string())
}

/// A single quoted or substitution-free template string, decoded.
fn simple_string(t: &str) -> Option<String> {
    let bytes = t.as_bytes();
    if bytes.len() < 2 {
        return None;
    }
    let quote = bytes[0];
    if !matches!(quote, b'"' | b'\'' | b'`') || bytes[bytes.len() - 1] != quote {
        return None;
    }
    let body = &t[1..t.len() - 1];
    if quote == b'`' && body.contains("${") {
        return None;
    }
    let mut out = String::new();
    let mut chars = body.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.next()? {
                'n' => out.push('\n'),
                't' => out.push('\t'),
                other => out.push(other),
            }
        } else if c == quote as char {
            return None;
        } else {
            out.push(c);
        }
    }
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::extract;
    use std::path::PathBuf;

    #[test]
    fn literal_classification() {
        assert_eq!(classify_expression(" 42 "), PropValue::Number(42.0));
        assert_eq!(classify_expression("-1.5"), PropValue::Number(-1.5));
        assert_eq!(classify_expression("true"), PropValue::Bool(true));
        assert_eq!(classify_expression("'a'"), PropValue::Str("a".into()));
        assert_eq!(classify_expression("`plain`"), PropValue::Str("plain".into()));
        assert_eq!(
            classify_expression("`a${b}`"),
            PropValue::Expr("`a${b}`".into())
        );
        assert_eq!(
            classify_expression("'a' + 'b'"),
            PropValue::Expr("'a' + 'b'".into())
        );
        assert_eq!(classify_expression("Infinity"), PropValue::Expr("Infinity".into()));
        assert_eq!(classify_expression("size"), PropValue::Expr("size".into()));
    }

    #[test]
    fn attribute_forms_and_spans() {
        let src = "const x = <Button kind=\"a\" big count={3} {...rest} onClick={() => go(1)} />;";
        let m = extract(&PathBuf::from("x.jsx"), src).unwrap();
        let el = &m.elements[0];
        let keys: Vec<_> = el.props.keys().cloned().collect();
        assert_eq!(keys, ["kind", "big", "count", "...rest", "onClick"]);
        assert_eq!(el.prop("big"), Some(&PropValue::Bool(true)));
        assert_eq!(el.prop("...rest"), Some(&PropValue::Spread("rest".into())));
        assert_eq!(el.prop("onClick"), Some(&PropValue::Expr("() => go(1)".into())));

        let kind = &el.props["kind"];
        assert_eq!(&src[kind.span.start..kind.span.end], "kind=\"a\"");
        let vs = kind.value_span.unwrap();
        assert_eq!(&src[vs.start..vs.end], "\"a\"");
        assert!(el.spans.self_closing);
        assert_eq!(&src[el.spans.element.start..el.spans.element.end], &src[10..src.len() - 1]);
        assert_eq!(el.spans.attrs_end, el.props["onClick"].span.end);
    }

    #[test]
    fn repeated_attributes_keep_every_span() {
        let src = "<Button size=\"s\" kind size=\"l\" />";
        let m = extract(&PathBuf::from("x.jsx"), src).unwrap();
        let el = &m.elements[0];
        assert_eq!(el.prop("size"), Some(&PropValue::Str("l".into())));
        let spans: Vec<&str> = el
            .occurrences("size")
            .map(|p| &src[p.span.start..p.span.end])
            .collect();
        assert_eq!(spans, ["size=\"s\"", "size=\"l\""]);
        assert_eq!(el.occurrences("kind").count(), 1);
    }

    #[test]
    fn children_span_excludes_tags() {
        let src = "<Card title=\"t\">\n  hello {name}\n</Card>";
        let m = extract(&PathBuf::from("x.jsx"), src).unwrap();
        let c = m.elements[0].spans.children.unwrap();
        assert_eq!(&src[c.start..c.end], "\n  hello {name}\n");
    }

    #[test]
    fn fragments_and_jsx_comments() {
        let src = "const f = <>\n  {/* <Ghost /> */}\n  <Real />\n</>;";
        let m = extract(&PathBuf::from("x.jsx"), src).unwrap();
        assert_eq!(m.elements.len(), 1);
        assert_eq!(m.elements[0].component_local_name, "Real");
    }

    #[test]
    fn type_arguments_on_tag_are_skipped() {
        let src = "const s = <Select<Option> value={v} />;";
        let m = extract(&PathBuf::from("x.tsx"), src).unwrap();
        assert_eq!(m.elements[0].component_local_name, "Select");
        assert!(m.elements[0].props.contains_key("value"));
    }

    #[test]
    fn attribute_without_value_is_an_error() {
        let err = extract(&PathBuf::from("x.jsx"), "<Button size= />").unwrap_err();
        assert!(err.message.contains("size"));
    }
}
