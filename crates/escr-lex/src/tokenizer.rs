//! The tokenizer (§4.2): wraps the raw [`crate::lexer::Lexer`], resolves
//! keywords, splits punctuation runs by maximal munch, tags each token with
//! whether whitespace/a comment preceded it, and buffers a lookahead deque
//! so the parser can peek arbitrarily far ahead with `mark`/`reset` (§4.3).

use std::collections::VecDeque;

use escr_util::span::FileId;
use escr_util::{Handler, Span, Symbol};

use crate::lex_item::{LexKind, LexValue};
use crate::lexer::Lexer;
use crate::token::{Token, TokenKind};

/// Operators and punctuators, longest first so a greedy scan picks the
/// maximal match (§4.2).
const OPERATORS: &[(&str, TokenKind)] = &[
    (">>>=", TokenKind::Shr3Eq),
    ("...", TokenKind::DotDotDot),
    ("??=", TokenKind::QuestionQuestionEq),
    ("&&=", TokenKind::AmpAmpEq),
    ("||=", TokenKind::PipePipeEq),
    ("<<=", TokenKind::ShlEq),
    (">>=", TokenKind::ShrEq),
    (">>>", TokenKind::Shr3),
    ("==", TokenKind::EqEq),
    ("!=", TokenKind::NotEq),
    ("<=", TokenKind::LtEq),
    (">=", TokenKind::GtEq),
    ("<<", TokenKind::Shl),
    (">>", TokenKind::Shr),
    ("&&", TokenKind::AmpAmp),
    ("||", TokenKind::PipePipe),
    ("??", TokenKind::QuestionQuestion),
    ("?.", TokenKind::QuestionDot),
    ("++", TokenKind::PlusPlus),
    ("--", TokenKind::MinusMinus),
    ("+=", TokenKind::PlusEq),
    ("-=", TokenKind::MinusEq),
    ("*=", TokenKind::StarEq),
    ("/=", TokenKind::SlashEq),
    ("%=", TokenKind::PercentEq),
    ("&=", TokenKind::AmpEq),
    ("|=", TokenKind::PipeEq),
    ("^=", TokenKind::CaretEq),
    ("+", TokenKind::Plus),
    ("-", TokenKind::Minus),
    ("*", TokenKind::Star),
    ("/", TokenKind::Slash),
    ("%", TokenKind::Percent),
    ("&", TokenKind::Amp),
    ("|", TokenKind::Pipe),
    ("^", TokenKind::Caret),
    ("~", TokenKind::Tilde),
    ("!", TokenKind::Bang),
    ("=", TokenKind::Assign),
    ("<", TokenKind::Lt),
    (">", TokenKind::Gt),
    ("?", TokenKind::Question),
    (":", TokenKind::Colon),
    (";", TokenKind::Semicolon),
    (",", TokenKind::Comma),
    (".", TokenKind::Dot),
    ("(", TokenKind::LParen),
    (")", TokenKind::RParen),
    ("{", TokenKind::LBrace),
    ("}", TokenKind::RBrace),
    ("[", TokenKind::LBracket),
    ("]", TokenKind::RBracket),
];

/// Split one raw punctuation run into maximal-munch operator tokens,
/// returning `(text, kind)` pairs in source order.
fn split_operator_run(run: &str) -> Vec<(&str, TokenKind)> {
    let mut out = Vec::new();
    let mut rest = run;
    while !rest.is_empty() {
        let matched = OPERATORS
            .iter()
            .find(|(text, _)| rest.starts_with(text))
            .expect("operator run contains only characters drawn from the operator table");
        out.push((matched.0, matched.1));
        rest = &rest[matched.0.len()..];
    }
    out
}

pub struct Tokenizer<'a> {
    lexer: Lexer<'a>,
    file: FileId,
    buffer: VecDeque<Token>,
}

impl<'a> Tokenizer<'a> {
    pub fn new(source: &'a str, file: FileId) -> Self {
        Self {
            lexer: Lexer::new(source, file),
            file,
            buffer: VecDeque::new(),
        }
    }

    /// Pull the next raw item(s) from the lexer until at least one real
    /// token (or EOF) is appended to the buffer.
    fn fill(&mut self, handler: &mut Handler) {
        let mut contiguous = true;
        loop {
            let item = self.lexer.next_item(handler);
            match item.kind {
                LexKind::Whitespace | LexKind::Comment => {
                    contiguous = false;
                    continue;
                }
                LexKind::EndOfFile => {
                    self.buffer.push_back(Token::new(
                        TokenKind::Eof,
                        item.span,
                        contiguous,
                    ));
                    return;
                }
                LexKind::Identifier => {
                    let kind = TokenKind::keyword(&item.verbatim)
                        .unwrap_or_else(|| TokenKind::Ident(Symbol::intern(&item.verbatim)));
                    self.buffer.push_back(Token::new(kind, item.span, contiguous));
                    return;
                }
                LexKind::Integer => {
                    let value = match item.value {
                        LexValue::Int(v) => v,
                        _ => 0,
                    };
                    self.buffer
                        .push_back(Token::new(TokenKind::Int(value), item.span, contiguous));
                    return;
                }
                LexKind::Float => {
                    let value = match item.value {
                        LexValue::Float(v) => v,
                        _ => 0.0,
                    };
                    self.buffer
                        .push_back(Token::new(TokenKind::Float(value), item.span, contiguous));
                    return;
                }
                LexKind::String => {
                    let text = match item.value {
                        LexValue::Str(s) => s,
                        _ => String::new(),
                    };
                    self.buffer.push_back(Token::new(
                        TokenKind::Str(Symbol::intern(&text)),
                        item.span,
                        contiguous,
                    ));
                    return;
                }
                LexKind::Operator => {
                    let split = split_operator_run(&item.verbatim);
                    let mut offset_line = item.span.begin.line;
                    let mut offset_col = item.span.begin.column;
                    let mut first = true;
                    for (text, kind) in split {
                        let begin = escr_util::span::Location::new(offset_line, offset_col);
                        let end_col = offset_col + text.chars().count() as u32;
                        let end = escr_util::span::Location::new(offset_line, end_col);
                        let span = Span::with_file(begin, end, self.file);
                        self.buffer.push_back(Token::new(
                            kind,
                            span,
                            if first { contiguous } else { true },
                        ));
                        offset_col = end_col;
                        first = false;
                    }
                    return;
                }
            }
        }
    }

    fn ensure(&mut self, count: usize, handler: &mut Handler) {
        while self.buffer.len() <= count {
            if matches!(self.buffer.back().map(|t| t.kind), Some(TokenKind::Eof)) {
                break;
            }
            self.fill(handler);
        }
    }

    /// Look `offset` tokens ahead without consuming (0 = the next token).
    pub fn peek(&mut self, offset: usize, handler: &mut Handler) -> Token {
        self.ensure(offset, handler);
        self.buffer
            .get(offset)
            .copied()
            .unwrap_or_else(|| *self.buffer.back().expect("buffer always holds at least Eof"))
    }

    /// Consume and return the next token.
    pub fn next_token(&mut self, handler: &mut Handler) -> Token {
        self.ensure(0, handler);
        if self.buffer.len() > 1 {
            self.buffer.pop_front().expect("checked non-empty above")
        } else {
            // Keep returning Eof once exhausted rather than draining it.
            *self.buffer.front().expect("buffer always holds at least Eof")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(source: &str) -> Vec<TokenKind> {
        let mut handler = Handler::new();
        let mut tokenizer = Tokenizer::new(source, FileId::DUMMY);
        let mut out = Vec::new();
        loop {
            let tok = tokenizer.next_token(&mut handler);
            let done = tok.kind == TokenKind::Eof;
            out.push(tok.kind);
            if done {
                break;
            }
        }
        out
    }

    #[test]
    fn keywords_resolve() {
        assert_eq!(tokens("if else"), vec![TokenKind::If, TokenKind::Else, TokenKind::Eof]);
    }

    #[test]
    fn maximal_munch_prefers_compound_operators() {
        assert_eq!(
            tokens("a??b"),
            vec![
                TokenKind::Ident(Symbol::intern("a")),
                TokenKind::QuestionQuestion,
                TokenKind::Ident(Symbol::intern("b")),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn triple_shift_beats_double_shift() {
        assert_eq!(
            tokens(">>>"),
            vec![TokenKind::Shr3, TokenKind::Eof]
        );
    }

    #[test]
    fn contiguity_flags_whitespace_separated_tokens() {
        let mut handler = Handler::new();
        let mut tokenizer = Tokenizer::new("a ?.b", FileId::DUMMY);
        let _a = tokenizer.next_token(&mut handler);
        let question_dot = tokenizer.next_token(&mut handler);
        assert!(!question_dot.contiguous);

        let mut tokenizer = Tokenizer::new("a?.b", FileId::DUMMY);
        let _a = tokenizer.next_token(&mut handler);
        let question_dot = tokenizer.next_token(&mut handler);
        assert!(question_dot.contiguous);
    }

    #[test]
    fn peek_does_not_consume() {
        let mut handler = Handler::new();
        let mut tokenizer = Tokenizer::new("a b", FileId::DUMMY);
        let peeked = tokenizer.peek(0, &mut handler);
        assert_eq!(peeked.kind, TokenKind::Ident(Symbol::intern("a")));
        let consumed = tokenizer.next_token(&mut handler);
        assert_eq!(consumed.kind, peeked.kind);
    }

    #[test]
    fn eof_repeats_past_end() {
        let mut handler = Handler::new();
        let mut tokenizer = Tokenizer::new("", FileId::DUMMY);
        assert_eq!(tokenizer.next_token(&mut handler).kind, TokenKind::Eof);
        assert_eq!(tokenizer.next_token(&mut handler).kind, TokenKind::Eof);
    }
}
