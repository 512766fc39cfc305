//! Byte-level scanning primitives shared by the import and JSX parsers.
//!
//! JSX cannot be tokenized without knowing the parse context (`<` is either
//! a comparison or a tag, `/` either division or a regex), so instead of a
//! token stream the parser drives a [`Cursor`] directly and asks it for the
//! lexical pieces it needs at each point.

use crate::error::ParseError;

/// Maps byte offsets to 1-based line numbers.
#[derive(Debug, Clone)]
pub struct LineIndex {
    starts: Vec<usize>,
}

impl LineIndex {
    pub fn new(src: &str) -> Self {
        let mut starts = vec![0];
        for (i, b) in src.bytes().enumerate() {
            if b == b'\n' {
                starts.push(i + 1);
            }
        }
        LineIndex { starts }
    }

    pub fn line_of(&self, offset: usize) -> u32 {
        self.starts.partition_point(|&s| s <= offset) as u32
    }
}

pub fn is_ident_start(b: u8) -> bool {
    b.is_ascii_alphabetic() || b == b'_' || b == b'$' || b >= 0x80
}

pub fn is_ident_continue(b: u8) -> bool {
    is_ident_start(b) || b.is_ascii_digit()
}

/// JSX names additionally allow `-` (data attributes, custom elements).
pub fn is_jsx_name_continue(b: u8) -> bool {
    is_ident_continue(b) || b == b'-'
}

pub struct Cursor<'a> {
    src: &'a str,
    bytes: &'a [u8],
    pub pos: usize,
    filename: &'a str,
    lines: LineIndex,
}

impl<'a> Cursor<'a> {
    pub fn new(src: &'a str, filename: &'a str) -> Self {
        Cursor {
            src,
            bytes: src.as_bytes(),
            pos: 0,
            filename,
            lines: LineIndex::new(src),
        }
    }

    pub fn src(&self) -> &'a str {
        self.src
    }

    pub fn slice(&self, start: usize, end: usize) -> &'a str {
        &self.src[start..end]
    }

    pub fn line_of(&self, offset: usize) -> u32 {
        self.lines.line_of(offset)
    }

    pub fn err_at(&self, offset: usize, msg: impl Into<String>) -> ParseError {
        ParseError::new(self.filename, self.line_of(offset), msg)
    }

    pub fn eof(&self) -> bool {
        self.pos >= self.bytes.len()
    }

    pub fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    pub fn peek_at(&self, ahead: usize) -> Option<u8> {
        self.bytes.get(self.pos + ahead).copied()
    }

    pub fn bump(&mut self) {
        if self.pos < self.bytes.len() {
            self.pos += 1;
        }
    }

    pub fn starts_with(&self, s: &str) -> bool {
        self.bytes[self.pos.min(self.bytes.len())..].starts_with(s.as_bytes())
    }

    /// Consume `s` if the input continues with it.
    pub fn eat(&mut self, s: &str) -> bool {
        if self.starts_with(s) {
            self.pos += s.len();
            true
        } else {
            false
        }
    }

    pub fn skip_whitespace(&mut self) {
        while let Some(b) = self.peek() {
            if b.is_ascii_whitespace() {
                self.pos += 1;
            } else {
                break;
            }
        }
    }

    /// Skip whitespace and `//` / `/* */` comments.
    pub fn skip_trivia(&mut self) -> Result<(), ParseError> {
        loop {
            self.skip_whitespace();
            if self.starts_with("//") {
                while let Some(b) = self.peek() {
                    if b == b'\n' {
                        break;
                    }
                    self.pos += 1;
                }
                continue;
            }
            if self.starts_with("/*") {
                let open = self.pos;
                self.pos += 2;
                loop {
                    if self.eof() {
                        return Err(self.err_at(open, "unterminated block comment"));
                    }
                    if self.eat("*/") {
                        break;
                    }
                    self.pos += 1;
                }
                continue;
            }
            return Ok(());
        }
    }

    /// Read an identifier at the cursor, if one starts here.
    pub fn read_ident(&mut self) -> Option<&'a str> {
        let start = self.pos;
        match self.peek() {
            Some(b) if is_ident_start(b) => {}
            _ => return None,
        }
        while let Some(b) = self.peek() {
            if is_ident_continue(b) {
                self.pos += 1;
            } else {
                break;
            }
        }
        Some(&self.src[start..self.pos])
    }

    /// Look at the identifier at the cursor without consuming it.
    pub fn peek_ident(&self) -> Option<&'a str> {
        let mut end = self.pos;
        match self.bytes.get(end) {
            Some(&b) if is_ident_start(b) => {}
            _ => return None,
        }
        while let Some(&b) = self.bytes.get(end) {
            if is_ident_continue(b) {
                end += 1;
            } else {
                break;
            }
        }
        Some(&self.src[self.pos..end])
    }

    /// Read a JSX tag or attribute name (`Foo`, `UI.Button`, `data-id`, `xlink:href`).
    pub fn read_jsx_name(&mut self, allow_member: bool) -> Option<&'a str> {
        let start = self.pos;
        match self.peek() {
            Some(b) if is_ident_start(b) => {}
            _ => return None,
        }
        while let Some(b) = self.peek() {
            if is_jsx_name_continue(b) || b == b':' || (allow_member && b == b'.') {
                self.pos += 1;
            } else {
                break;
            }
        }
        Some(&self.src[start..self.pos])
    }

    /// Skip a JavaScript string literal starting at the cursor, honoring
    /// escapes. Returns the decoded content.
    pub fn read_js_string(&mut self) -> Result<String, ParseError> {
        let open = self.pos;
        let quote = match self.peek() {
            Some(q @ (b'"' | b'\'')) => q,
            _ => return Err(self.err_at(open, "expected string literal")),
        };
        self.pos += 1;
        let mut out = String::new();
        let mut run_start = self.pos;
        loop {
            match self.peek() {
                None | Some(b'\n') => {
                    return Err(self.err_at(open, "unterminated string literal"));
                }
                Some(b) if b == quote => {
                    out.push_str(&self.src[run_start..self.pos]);
                    self.pos += 1;
                    return Ok(out);
                }
                Some(b'\\') => {
                    out.push_str(&self.src[run_start..self.pos]);
                    self.pos += 1;
                    match self.peek() {
                        None => return Err(self.err_at(open, "unterminated escape in string")),
                        Some(b'n') => out.push('\n'),
                        Some(b't') => out.push('\t'),
                        Some(b'\n') => {}
                        Some(b) if b < 0x80 => out.push(b as char),
                        Some(_) => {
                            // Multi-byte escaped char: copy it whole below.
                            run_start = self.pos;
                            continue;
                        }
                    }
                    self.pos += 1;
                    run_start = self.pos;
                }
                Some(_) => self.pos += 1,
            }
        }
    }

    /// JSX attribute strings have no escapes and may span lines.
    pub fn read_jsx_string(&mut self) -> Result<&'a str, ParseError> {
        let open = self.pos;
        let quote = match self.peek() {
            Some(q @ (b'"' | b'\'')) => q,
            _ => return Err(self.err_at(open, "expected attribute string")),
        };
        self.pos += 1;
        let start = self.pos;
        loop {
            match self.peek() {
                None => return Err(self.err_at(open, "unterminated attribute string")),
                Some(b) if b == quote => {
                    let content = &self.src[start..self.pos];
                    self.pos += 1;
                    return Ok(content);
                }
                Some(_) => self.pos += 1,
            }
        }
    }

    /// Try to skip a regular-expression literal. On a line break before the
    /// closing slash the `/` was a division after all: the cursor is left
    /// just past it and `false` is returned.
    pub fn skip_regex(&mut self) -> bool {
        let open = self.pos;
        self.pos += 1;
        let mut in_class = false;
        loop {
            match self.peek() {
                None | Some(b'\n') => {
                    self.pos = open + 1;
                    return false;
                }
                Some(b'\\') => self.pos += 2,
                Some(b'[') => {
                    in_class = true;
                    self.pos += 1;
                }
                Some(b']') => {
                    in_class = false;
                    self.pos += 1;
                }
                Some(b'/') if !in_class => {
                    self.pos += 1;
                    while let Some(b) = self.peek() {
                        if b.is_ascii_alphabetic() {
                            self.pos += 1;
                        } else {
                            break;
                        }
                    }
                    return true;
                }
                Some(_) => self.pos += 1,
            }
        }
    }

    /// Skip a numeric literal (loosely: digits, letters, `_` and `.`).
    pub fn skip_number(&mut self) {
        while let Some(b) = self.peek() {
            if b.is_ascii_alphanumeric() || b == b'_' || b == b'.' {
                self.pos += 1;
            } else {
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_index_counts_from_one() {
        let idx = LineIndex::new("a\nbc\n\nd");
        assert_eq!(idx.line_of(0), 1);
        assert_eq!(idx.line_of(2), 2);
        assert_eq!(idx.line_of(5), 3);
        assert_eq!(idx.line_of(6), 4);
    }

    #[test]
    fn trivia_skips_both_comment_styles() {
        let mut c = Cursor::new("  // line\n /* block\n */ x", "t.js");
        c.skip_trivia().unwrap();
        assert_eq!(c.peek(), Some(b'x'));
    }

    #[test]
    fn unterminated_block_comment_reports_opening_line() {
        let mut c = Cursor::new("\n\n/* never closed", "t.js");
        let err = c.skip_trivia().unwrap_err();
        assert_eq!(err.line, 3);
        assert!(err.message.contains("block comment"));
    }

    #[test]
    fn js_string_decodes_escapes() {
        let mut c = Cursor::new(r#""a\"b\n" rest"#, "t.js");
        assert_eq!(c.read_js_string().unwrap(), "a\"b\n");
        assert_eq!(c.peek(), Some(b' '));
    }

    #[test]
    fn js_string_rejects_raw_newline() {
        let mut c = Cursor::new("'abc\n'", "t.js");
        assert!(c.read_js_string().is_err());
    }

    #[test]
    fn regex_with_class_containing_slash() {
        let mut c = Cursor::new("/[/]+/g.test(x)", "t.js");
        assert!(c.skip_regex());
        assert_eq!(c.peek(), Some(b'.'));
    }

    #[test]
    fn regex_falls_back_to_division_on_newline() {
        let mut c = Cursor::new("/ 2\nfoo", "t.js");
        assert!(!c.skip_regex());
        assert_eq!(c.pos, 1);
    }

    #[test]
    fn jsx_name_allows_members_and_dashes() {
        let mut c = Cursor::new("UI.Button data-x", "t.jsx");
        assert_eq!(c.read_jsx_name(true), Some("UI.Button"));
        c.skip_whitespace();
        assert_eq!(c.read_jsx_name(false), Some("data-x"));
    }
}
