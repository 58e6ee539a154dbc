//! escr-sem - the preparer (§3.3, §3.4, §4.4).
//!
//! Performs the one semantic pass a script gets before it runs: resolves
//! every name against the lexical scope chain (§3.4), assigns every
//! expression a type from the type algebra (§3.3), and enforces the
//! type-checking contract table (assignability, arithmetic, `??`, `yield`
//! inside generators, unreachable code, ...). The output is a
//! [`analysis::TypeTable`] keyed by `escr_par::ast::NodeId` plus whatever
//! diagnostics were raised along the way — `escr-eval` consults the table
//! at evaluation time rather than re-deriving types from the tree.
//!
//! There's no separate HIR here: escr has no generics, traits, or pattern
//! matching to lower away, so the preparer walks `escr_par::ast` directly.

pub mod analysis;
pub mod infer;
pub mod scope;
pub mod types;

#[cfg(test)]
mod edge_cases;

pub use analysis::{Flags, Preparer, TypeTable};
pub use scope::{DuplicateDeclaration, Entry, EntryKind, RibKind, ScopeTree};
pub use types::{Assignability, FunctionType, Modifiability, Param, ParamFlags, Primitive, Type};

use escr_par::ast::Program;
use escr_util::Handler;

/// Run the preparer over a parsed program, returning the resolved
/// [`TypeTable`] alongside the symbol table it built. Diagnostics (errors
/// and warnings from the contract table) are reported to `handler` as they
/// are found; the caller checks `handler.has_errors()` before handing the
/// program to the evaluator.
pub fn prepare(program: &Program, handler: &mut Handler) -> (TypeTable, ScopeTree) {
    let mut preparer = Preparer::new(handler);
    preparer.prepare_program(program);
    (preparer.types, preparer.scope)
}

#[cfg(test)]
mod tests {
    use super::*;
    use escr_par::parse_program;
    use escr_util::FileId;

    #[test]
    fn prepare_resolves_builtin_call() {
        let mut parse_handler = Handler::new();
        let program = parse_program(r#"print("hello");"#, FileId::DUMMY, &mut parse_handler).expect("parse ok");
        let mut handler = Handler::new();
        let (_, _) = prepare(&program, &mut handler);
        assert!(!handler.has_errors());
    }

    #[test]
    fn prepare_reports_type_errors() {
        let mut parse_handler = Handler::new();
        let program = parse_program("int x = \"oops\";", FileId::DUMMY, &mut parse_handler).expect("parse ok");
        let mut handler = Handler::new();
        let (_, _) = prepare(&program, &mut handler);
        assert!(handler.has_errors());
    }
}
