//! escr-lex - lexical analysis (§4.1, §4.2).
//!
//! Two layers, matching the original `ILexer`/tokenizer split this was
//! grounded on:
//!
//! - [`lexer::Lexer`] turns source text into a lazy sequence of
//!   [`lex_item::LexItem`]s — whitespace and comments included, operator
//!   characters still undifferentiated.
//! - [`tokenizer::Tokenizer`] consumes that sequence, resolves keywords,
//!   splits punctuation runs into maximal-munch [`token::Token`]s, tags
//!   contiguity, and buffers lookahead for the parser.
//!
//! Diagnostics (unterminated strings, leading-zero integers, bad escapes,
//! ...) are reported through an `escr_util::Handler` rather than returned
//! as `Result`s — a single malformed file can raise many of them and
//! lexing continues past each one (§7.1).

pub mod cursor;
pub mod lex_item;
pub mod lexer;
pub mod token;
pub mod tokenizer;
pub mod unicode;

pub use lex_item::{LexItem, LexKind, LexValue};
pub use lexer::Lexer;
pub use token::{Token, TokenKind};
pub use tokenizer::Tokenizer;
