//! escr-util - foundation types shared across the pipeline.
//!
//! Every later crate in the workspace (`escr-lex`, `escr-par`, `escr-sem`,
//! `escr-gc`, `escr-eval`, `escr`) depends on this one and nothing upstream
//! of it: source spans, interned symbols, typed index vectors, and the
//! diagnostic `Handler` all live here so the lexer, parser, and preparer can
//! share one notion of "where in the source did this come from" and one
//! place to report a problem without aborting the pipeline.
//!
//! - [`span`] — [`Location`]/[`Span`] and the [`span::SourceMap`] that turns
//!   a span back into `"<resource>(<line>,<col>)"` for diagnostics.
//! - [`symbol`] — [`Symbol`], an interned string handle used for every
//!   identifier and keyword so that scope-chain lookups are O(1).
//! - [`diagnostic`] — [`Diagnostic`]/[`Handler`]/[`DiagnosticBuilder`], the
//!   non-fatal reporting channel used during lexing, parsing, and
//!   preparation (§7 distinguishes this from the fatal `Result` errors in
//!   [`error`]).
//! - [`index_vec`] — [`Idx`]/[`IndexVec`], a typed arena vector used for
//!   scope ribs and type parameter lists.
//! - [`def_id`] — [`DefId`]/[`DefIdGenerator`], a dense identifier for every
//!   declaration the preparer resolves.

pub mod def_id;
pub mod diagnostic;
pub mod error;
pub mod index_vec;
pub mod span;
pub mod symbol;

pub use def_id::{DefId, DefIdGenerator};
pub use diagnostic::{Diagnostic, DiagnosticBuilder, Handler, Level};
pub use index_vec::{Idx, IndexVec};
pub use span::{FileId, Location, SourceFile, SourceMap, Span};
pub use symbol::Symbol;

pub use rustc_hash::FxHashMap;
pub use rustc_hash::FxHashSet;
