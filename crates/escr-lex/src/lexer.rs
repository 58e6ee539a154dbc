//! The raw lexer (§4.1): turns a source string into a lazy sequence of
//! [`LexItem`]s. Whitespace and comments are still present as their own
//! items; numbers, strings and identifiers are fully decoded; everything
//! else — including brackets, punctuation and compound-operator characters
//! — comes back as one undifferentiated `Operator` run for the
//! [`crate::tokenizer::Tokenizer`] to split by maximal munch.

use escr_util::span::{FileId, Location};
use escr_util::{Handler, Span};

use crate::cursor::Cursor;
use crate::lex_item::{LexItem, LexKind, LexValue};
use crate::unicode::{hex_digit_to_value, is_ascii_ident_continue, is_ascii_ident_start};

const PUNCTUATION: &str = "+-*/%&|^~!=<>?:;,.()[]{}";

fn is_operator_char(c: char) -> bool {
    PUNCTUATION.contains(c)
}

pub struct Lexer<'a> {
    cursor: Cursor<'a>,
    file: FileId,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str, file: FileId) -> Self {
        // §6.3: an optional BOM at offset 0 is silently consumed.
        let source = source.strip_prefix('\u{feff}').unwrap_or(source);
        Self {
            cursor: Cursor::new(source),
            file,
        }
    }

    fn loc(&self) -> Location {
        Location::new(self.cursor.line(), self.cursor.column())
    }

    fn span_from(&self, begin: Location) -> Span {
        Span::with_file(begin, self.loc(), self.file)
    }

    /// Read and return the next raw item. Returns an `EndOfFile` item
    /// forever once the source is exhausted.
    pub fn next_item(&mut self, handler: &mut Handler) -> LexItem {
        if self.cursor.is_at_end() {
            let here = self.loc();
            return LexItem {
                kind: LexKind::EndOfFile,
                verbatim: String::new(),
                value: LexValue::None,
                span: Span::with_file(here, here, self.file),
            };
        }

        let c = self.cursor.current_char();
        if c.is_whitespace() {
            return self.scan_whitespace();
        }
        if c == '/' && self.cursor.peek_char(1) == '/' {
            return self.scan_line_comment();
        }
        if c == '/' && self.cursor.peek_char(1) == '*' {
            return self.scan_block_comment(handler);
        }
        if c == '"' {
            return self.scan_string_double(handler);
        }
        if c == '`' {
            return self.scan_string_back(handler);
        }
        if c.is_ascii_digit() {
            return self.scan_number(handler);
        }
        if is_ascii_ident_start(c) {
            return self.scan_identifier();
        }
        if is_operator_char(c) {
            return self.scan_operator();
        }

        let begin = self.loc();
        self.cursor.advance();
        let span = self.span_from(begin);
        handler.error(format!("unexpected character '{c}'"), span);
        LexItem {
            kind: LexKind::Operator,
            verbatim: c.to_string(),
            value: LexValue::None,
            span,
        }
    }

    fn scan_whitespace(&mut self) -> LexItem {
        let begin = self.loc();
        let start = self.cursor.position();
        while !self.cursor.is_at_end() && self.cursor.current_char().is_whitespace() {
            self.cursor.advance();
        }
        let verbatim = self.cursor.slice_from(start).to_string();
        LexItem {
            kind: LexKind::Whitespace,
            verbatim,
            value: LexValue::None,
            span: self.span_from(begin),
        }
    }

    fn scan_line_comment(&mut self) -> LexItem {
        let begin = self.loc();
        let start = self.cursor.position();
        while !self.cursor.is_at_end() && self.cursor.current_char() != '\n' {
            self.cursor.advance();
        }
        let verbatim = self.cursor.slice_from(start).to_string();
        LexItem {
            kind: LexKind::Comment,
            verbatim,
            value: LexValue::None,
            span: self.span_from(begin),
        }
    }

    fn scan_block_comment(&mut self, handler: &mut Handler) -> LexItem {
        let begin = self.loc();
        let start = self.cursor.position();
        self.cursor.advance_n(2); // consume "/*"
        let mut closed = false;
        while !self.cursor.is_at_end() {
            if self.cursor.current_char() == '*' && self.cursor.peek_char(1) == '/' {
                self.cursor.advance_n(2);
                closed = true;
                break;
            }
            self.cursor.advance();
        }
        let verbatim = self.cursor.slice_from(start).to_string();
        let span = self.span_from(begin);
        if !closed {
            handler.error("unterminated block comment", span);
        }
        LexItem {
            kind: LexKind::Comment,
            verbatim,
            value: LexValue::None,
            span,
        }
    }

    fn scan_identifier(&mut self) -> LexItem {
        let begin = self.loc();
        let start = self.cursor.position();
        self.cursor.advance();
        while !self.cursor.is_at_end() && is_ascii_ident_continue(self.cursor.current_char()) {
            self.cursor.advance();
        }
        let verbatim = self.cursor.slice_from(start).to_string();
        LexItem {
            kind: LexKind::Identifier,
            verbatim,
            value: LexValue::None,
            span: self.span_from(begin),
        }
    }

    fn scan_operator(&mut self) -> LexItem {
        let begin = self.loc();
        let start = self.cursor.position();
        while !self.cursor.is_at_end() && is_operator_char(self.cursor.current_char()) {
            // Stop before a '/' that begins a comment; the next call picks it up.
            if self.cursor.current_char() == '/'
                && matches!(self.cursor.peek_char(1), '/' | '*')
                && self.cursor.position() != start
            {
                break;
            }
            self.cursor.advance();
        }
        let verbatim = self.cursor.slice_from(start).to_string();
        LexItem {
            kind: LexKind::Operator,
            verbatim,
            value: LexValue::None,
            span: self.span_from(begin),
        }
    }

    fn scan_number(&mut self, handler: &mut Handler) -> LexItem {
        let begin = self.loc();
        let start = self.cursor.position();
        let mut is_float = false;

        if self.cursor.current_char() == '0'
            && matches!(self.cursor.peek_char(1), 'x' | 'X')
        {
            self.cursor.advance_n(2);
            let hex_start = self.cursor.position();
            while !self.cursor.is_at_end()
                && hex_digit_to_value(self.cursor.current_char()).is_some()
            {
                self.cursor.advance();
            }
            if self.cursor.position() == hex_start {
                let span = self.span_from(begin);
                handler.error("expected hex digits after '0x'", span);
            }
            let verbatim = self.cursor.slice_from(start).to_string();
            let span = self.span_from(begin);
            let hex_digits = &verbatim[2..];
            let value = u64::from_str_radix(hex_digits, 16).unwrap_or_else(|_| {
                handler.error("hexadecimal integer literal overflows 64 bits", span);
                0
            });
            return LexItem {
                kind: LexKind::Integer,
                verbatim,
                value: LexValue::Int(value),
                span,
            };
        }

        if self.cursor.current_char() == '0' {
            self.cursor.advance();
            if self.cursor.current_char().is_ascii_digit() {
                let err_begin = begin;
                while self.cursor.current_char().is_ascii_digit() {
                    self.cursor.advance();
                }
                let span = self.span_from(err_begin);
                handler.error("extraneous leading 0 in integer literal", span);
            }
        } else {
            while !self.cursor.is_at_end() && self.cursor.current_char().is_ascii_digit() {
                self.cursor.advance();
            }
        }

        if self.cursor.current_char() == '.' && self.cursor.peek_char(1).is_ascii_digit() {
            is_float = true;
            self.cursor.advance(); // '.'
            while !self.cursor.is_at_end() && self.cursor.current_char().is_ascii_digit() {
                self.cursor.advance();
            }
        }

        if matches!(self.cursor.current_char(), 'e' | 'E') {
            self.cursor.advance();
            if matches!(self.cursor.current_char(), '+' | '-') {
                self.cursor.advance();
            }
            if self.cursor.current_char().is_ascii_digit() {
                is_float = true;
                while !self.cursor.is_at_end() && self.cursor.current_char().is_ascii_digit() {
                    self.cursor.advance();
                }
            } else {
                let span = self.span_from(begin);
                handler.error("empty exponent in float literal", span);
                is_float = true;
            }
        }

        let verbatim = self.cursor.slice_from(start).to_string();
        let span = self.span_from(begin);

        if is_float {
            let value = verbatim.parse::<f64>().unwrap_or_else(|_| {
                handler.error("invalid float literal", span);
                0.0
            });
            LexItem {
                kind: LexKind::Float,
                verbatim,
                value: LexValue::Float(value),
                span,
            }
        } else {
            let value = verbatim.parse::<u64>().unwrap_or_else(|_| {
                handler.error("integer literal overflows 64 bits", span);
                0
            });
            LexItem {
                kind: LexKind::Integer,
                verbatim,
                value: LexValue::Int(value),
                span,
            }
        }
    }

    fn scan_string_double(&mut self, handler: &mut Handler) -> LexItem {
        let begin = self.loc();
        let start = self.cursor.position();
        self.cursor.advance(); // opening quote
        let mut decoded = String::new();
        let mut terminated = false;

        while !self.cursor.is_at_end() {
            let c = self.cursor.current_char();
            if c == '"' {
                self.cursor.advance();
                terminated = true;
                break;
            }
            if c == '\n' {
                break;
            }
            if c == '\\' {
                self.cursor.advance();
                self.scan_escape(handler, &mut decoded);
                continue;
            }
            decoded.push(c);
            self.cursor.advance();
        }

        let verbatim = self.cursor.slice_from(start).to_string();
        let span = self.span_from(begin);
        if !terminated {
            handler.error("unterminated string literal", span);
        }
        LexItem {
            kind: LexKind::String,
            verbatim,
            value: LexValue::Str(decoded),
            span,
        }
    }

    fn scan_escape(&mut self, handler: &mut Handler, out: &mut String) {
        if self.cursor.is_at_end() {
            handler.error("unterminated escape sequence", self.span_from(self.loc()));
            return;
        }
        let e = self.cursor.current_char();
        match e {
            '"' | '\\' | '/' => {
                out.push(e);
                self.cursor.advance();
            }
            '0' => {
                out.push('\0');
                self.cursor.advance();
            }
            'b' => {
                out.push('\u{8}');
                self.cursor.advance();
            }
            'f' => {
                out.push('\u{c}');
                self.cursor.advance();
            }
            'n' => {
                out.push('\n');
                self.cursor.advance();
            }
            'r' => {
                out.push('\r');
                self.cursor.advance();
            }
            't' => {
                out.push('\t');
                self.cursor.advance();
            }
            'u' => {
                let begin = self.loc();
                self.cursor.advance();
                let mut value: u32 = 0;
                let mut count = 0;
                while count < 4 {
                    match hex_digit_to_value(self.cursor.current_char()) {
                        Some(d) => {
                            value = value * 16 + d as u32;
                            self.cursor.advance();
                            count += 1;
                        }
                        None => break,
                    }
                }
                if count != 4 {
                    handler.error("\\u escape requires exactly 4 hex digits", self.span_from(begin));
                    return;
                }
                match char::from_u32(value) {
                    Some(ch) => out.push(ch),
                    None => handler.error("invalid code point in \\u escape", self.span_from(begin)),
                }
            }
            'U' => {
                let begin = self.loc();
                self.cursor.advance();
                let mut value: u32 = 0;
                let mut any = false;
                while let Some(d) = hex_digit_to_value(self.cursor.current_char()) {
                    value = value.saturating_mul(16).saturating_add(d as u32);
                    self.cursor.advance();
                    any = true;
                }
                if !any {
                    handler.error("\\U escape requires hex digits", self.span_from(begin));
                    return;
                }
                if self.cursor.current_char() == ';' {
                    self.cursor.advance();
                } else {
                    handler.error("\\U escape must be terminated by ';'", self.span_from(begin));
                    return;
                }
                if value > 0x10FFFF {
                    handler.error("code point out of range in \\U escape", self.span_from(begin));
                    return;
                }
                match char::from_u32(value) {
                    Some(ch) => out.push(ch),
                    None => handler.error("invalid code point in \\U escape", self.span_from(begin)),
                }
            }
            other => {
                let begin = self.loc();
                handler.error(format!("invalid escape sequence '\\{other}'"), self.span_from(begin));
                out.push(other);
                self.cursor.advance();
            }
        }
    }

    fn scan_string_back(&mut self, handler: &mut Handler) -> LexItem {
        let begin = self.loc();
        let start = self.cursor.position();
        self.cursor.advance(); // opening backtick
        let mut decoded = String::new();
        let mut terminated = false;

        while !self.cursor.is_at_end() {
            let c = self.cursor.current_char();
            if c == '`' {
                if self.cursor.peek_char(1) == '`' {
                    decoded.push('`');
                    self.cursor.advance_n(2);
                    continue;
                }
                self.cursor.advance();
                terminated = true;
                break;
            }
            decoded.push(c);
            self.cursor.advance();
        }

        let verbatim = self.cursor.slice_from(start).to_string();
        let span = self.span_from(begin);
        if !terminated {
            handler.error("unterminated backquoted string literal", span);
        }
        LexItem {
            kind: LexKind::String,
            verbatim,
            value: LexValue::Str(decoded),
            span,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn items(source: &str) -> (Vec<LexItem>, Handler) {
        let mut handler = Handler::new();
        let mut lexer = Lexer::new(source, FileId::DUMMY);
        let mut out = Vec::new();
        loop {
            let item = lexer.next_item(&mut handler);
            let done = item.kind == LexKind::EndOfFile;
            out.push(item);
            if done {
                break;
            }
        }
        (out, handler)
    }

    #[test]
    fn lexes_zero() {
        let (items, handler) = items("0");
        assert_eq!(items[0].kind, LexKind::Integer);
        assert_eq!(items[0].value, LexValue::Int(0));
        assert!(!handler.has_errors());
    }

    #[test]
    fn rejects_leading_zero() {
        let (_, handler) = items("007");
        assert!(handler.has_errors());
    }

    #[test]
    fn lexes_hex_integer() {
        let (items, _) = items("0xFF");
        assert_eq!(items[0].value, LexValue::Int(255));
    }

    #[test]
    fn lexes_float_with_exponent() {
        let (items, _) = items("1.5e2");
        assert_eq!(items[0].kind, LexKind::Float);
        assert_eq!(items[0].value, LexValue::Float(150.0));
    }

    #[test]
    fn rejects_empty_exponent() {
        let (_, handler) = items("1.5e");
        assert!(handler.has_errors());
    }

    #[test]
    fn lexes_double_quoted_escapes() {
        let (items, handler) = items(r#""a\nbA""#);
        assert_eq!(
            items[0].value,
            LexValue::Str("a\nbA".to_string())
        );
        assert!(!handler.has_errors());
    }

    #[test]
    fn lexes_backquoted_with_escaped_backtick() {
        let (items, _) = items("`a``b`");
        assert_eq!(items[0].value, LexValue::Str("a`b".to_string()));
    }

    #[test]
    fn splits_comment_out_of_operator_run() {
        let (items, _) = items("a/ /b");
        // Just verifies the run doesn't merge into the comment marker.
        assert!(items.iter().any(|i| i.kind == LexKind::Identifier));
    }

    #[test]
    fn unterminated_block_comment_is_an_error() {
        let (_, handler) = items("/* never closes");
        assert!(handler.has_errors());
    }
}
