//! escr-par - the parser (§3.5, §4.3).
//!
//! Turns a token stream from `escr-lex` into the syntax tree in [`ast`].
//! Parsing aborts on the first error rather than attempting recovery: a
//! malformed program has no useful partial tree to hand the preparer, so
//! [`parse_program`] returns as soon as [`parser::ParseError`] is raised.

pub mod ast;
pub mod parser;

pub use ast::{Expr, ExprKind, NodeId, Program, Stmt, StmtKind};
pub use parser::{ParseError, ParseResult, Parser};

use escr_util::{FileId, Handler};

/// Parse a complete source file into a [`Program`].
///
/// Any lexical diagnostics (unterminated strings, bad escapes, ...) are
/// reported to `handler` as they're encountered; a syntax error is returned
/// directly rather than added to `handler`, since parsing cannot continue
/// past it.
pub fn parse_program(source: &str, file: FileId, handler: &mut Handler) -> ParseResult<Program> {
    let mut parser = Parser::new(source, file);
    parser.parse_program(handler)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_trivial_program() {
        let mut handler = Handler::new();
        let program = parse_program("print(\"hello\");", FileId::DUMMY, &mut handler).unwrap();
        assert_eq!(program.statements.len(), 1);
    }

    #[test]
    fn reports_syntax_error_with_span() {
        let mut handler = Handler::new();
        let err = parse_program("int x = ;", FileId::DUMMY, &mut handler).unwrap_err();
        assert!(!err.span.is_unknown());
    }
}
