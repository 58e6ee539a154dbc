//! The symbol table (§3.4): a lexical scope chain of ribs, each owning a map
//! from name to the binding declared there.

use crate::types::Type;
use escr_util::{DefId, DefIdGenerator, Idx, IndexVec, Span, Symbol};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RibId(pub u32);

impl Idx for RibId {
    fn from_usize(idx: usize) -> Self {
        RibId(idx as u32)
    }

    fn index(self) -> usize {
        self.0 as usize
    }
}

/// How a binding may be used. `Builtin` entries (`print`, `assert`, ...) are
/// seeded once into the module rib before the program is walked; `Readonly`
/// covers function and generator parameters along with `for`/`foreach`
/// induction variables; everything declared with `var`/a type keyword is
/// `ReadWrite`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    Builtin,
    Readonly,
    ReadWrite,
}

/// One symbol table entry. The evaluator keeps the actual runtime value in
/// its own scope chain (see `escr-eval::Scope`), keyed by the same `DefId` —
/// this table only needs to answer "what name, what kind, what type" during
/// preparation.
#[derive(Debug, Clone)]
pub struct Entry {
    pub kind: EntryKind,
    pub name: Symbol,
    pub ty: Type,
    /// Where this binding was declared, for "previous declaration was here".
    pub span: Span,
}

#[derive(Debug, Clone, Copy)]
pub enum RibKind {
    Module,
    Function,
    Block,
    Loop,
}

#[derive(Debug)]
pub struct Rib {
    pub bindings: HashMap<Symbol, DefId>,
    pub parent: Option<RibId>,
    pub kind: RibKind,
}

/// Raised by [`ScopeTree::declare`] when a name is already bound in the
/// *same* rib; callers turn this into the "previous declaration was here"
/// diagnostic pair.
pub struct DuplicateDeclaration {
    pub previous: Span,
}

pub struct ScopeTree {
    pub ribs: IndexVec<RibId, Rib>,
    pub current_rib: RibId,
    pub entries: IndexVec<DefId, Entry>,
    ids: DefIdGenerator,
}

impl ScopeTree {
    pub fn new() -> Self {
        let mut ribs = IndexVec::new();
        let root = ribs.push(Rib {
            bindings: HashMap::new(),
            parent: None,
            kind: RibKind::Module,
        });

        Self {
            ribs,
            current_rib: root,
            entries: IndexVec::new(),
            ids: DefIdGenerator::new(),
        }
    }

    pub fn enter_scope(&mut self, kind: RibKind) -> RibId {
        let new_rib = self.ribs.push(Rib {
            bindings: HashMap::new(),
            parent: Some(self.current_rib),
            kind,
        });
        self.current_rib = new_rib;
        new_rib
    }

    pub fn exit_scope(&mut self) {
        if let Some(parent) = self.ribs[self.current_rib].parent {
            self.current_rib = parent;
        }
    }

    /// Declare `name` in the current rib, returning the new binding's
    /// `DefId`. If `name` is already bound in this same rib that's a
    /// duplicate declaration error, not a shadow — the caller still gets a
    /// `DefId` back (for error recovery) alongside the conflict.
    pub fn declare(&mut self, kind: EntryKind, name: Symbol, ty: Type, span: Span) -> (DefId, Option<DuplicateDeclaration>) {
        let def_id = self.entries.push(Entry { kind, name, ty, span });
        let rib = &mut self.ribs[self.current_rib];
        let conflict = rib.bindings.get(&name).map(|&prev_id| DuplicateDeclaration {
            previous: self.entries[prev_id].span,
        });
        rib.bindings.insert(name, def_id);
        (def_id, conflict)
    }

    /// True if `name` is already visible from an *enclosing* rib (used to
    /// tell a genuine shadow, which only warns, from a same-rib redeclare,
    /// which errors).
    pub fn shadows_outer(&self, name: Symbol) -> bool {
        let Some(parent) = self.ribs[self.current_rib].parent else {
            return false;
        };
        self.resolve_from(parent, name).is_some()
    }

    pub fn resolve(&self, name: Symbol) -> Option<DefId> {
        self.resolve_from(self.current_rib, name)
    }

    fn resolve_from(&self, start: RibId, name: Symbol) -> Option<DefId> {
        let mut rib_id = start;
        loop {
            let rib = &self.ribs[rib_id];
            if let Some(&def_id) = rib.bindings.get(&name) {
                return Some(def_id);
            }
            match rib.parent {
                Some(parent) => rib_id = parent,
                None => return None,
            }
        }
    }

    pub fn entry(&self, id: DefId) -> &Entry {
        &self.entries[id]
    }

    /// Nearest enclosing `Loop`/`Function` rib, for validating `break`,
    /// `continue`, and `return`.
    pub fn enclosing(&self, predicate: impl Fn(&RibKind) -> bool) -> bool {
        let mut rib_id = self.current_rib;
        loop {
            if predicate(&self.ribs[rib_id].kind) {
                return true;
            }
            match self.ribs[rib_id].parent {
                Some(parent) => rib_id = parent,
                None => return false,
            }
        }
    }
}

impl Default for ScopeTree {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use escr_util::Span;

    fn sym(s: &str) -> Symbol {
        Symbol::intern(s)
    }

    #[test]
    fn resolves_through_parent_ribs() {
        let mut tree = ScopeTree::new();
        let (outer_id, conflict) = tree.declare(EntryKind::ReadWrite, sym("x"), Type::INT, Span::DUMMY);
        assert!(conflict.is_none());
        tree.enter_scope(RibKind::Block);
        assert_eq!(tree.resolve(sym("x")), Some(outer_id));
    }

    #[test]
    fn same_rib_redeclare_is_a_conflict() {
        let mut tree = ScopeTree::new();
        tree.declare(EntryKind::ReadWrite, sym("x"), Type::INT, Span::DUMMY);
        let (_, conflict) = tree.declare(EntryKind::ReadWrite, sym("x"), Type::STRING, Span::DUMMY);
        assert!(conflict.is_some());
    }

    #[test]
    fn inner_declare_shadows_without_conflict() {
        let mut tree = ScopeTree::new();
        tree.declare(EntryKind::ReadWrite, sym("x"), Type::INT, Span::DUMMY);
        tree.enter_scope(RibKind::Block);
        assert!(tree.shadows_outer(sym("x")));
        let (_, conflict) = tree.declare(EntryKind::ReadWrite, sym("x"), Type::STRING, Span::DUMMY);
        assert!(conflict.is_none());
    }

    #[test]
    fn exit_scope_drops_inner_bindings() {
        let mut tree = ScopeTree::new();
        tree.enter_scope(RibKind::Block);
        tree.declare(EntryKind::ReadWrite, sym("y"), Type::INT, Span::DUMMY);
        tree.exit_scope();
        assert_eq!(tree.resolve(sym("y")), None);
    }

    #[test]
    fn enclosing_finds_loop_through_blocks() {
        let mut tree = ScopeTree::new();
        tree.enter_scope(RibKind::Loop);
        tree.enter_scope(RibKind::Block);
        assert!(tree.enclosing(|k| matches!(k, RibKind::Loop)));
    }
}
