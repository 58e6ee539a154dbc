//! Runtime scope chain (§3.4, §4.5.1).
//!
//! This is the evaluator's own lexical chain, separate from `escr-sem`'s
//! `ScopeTree`. The preparer's table only needs to answer "what type does
//! this name have"; this one needs to answer "what memory cell does this
//! name refer to right now", which is a different lifetime (one scope node
//! per block/function *activation*, not per static rib) so it can't reuse
//! the preparer's result directly.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::{Rc, Weak};

use escr_util::Symbol;

use crate::object::VanillaObject;
use crate::value::{Cell, Value};

struct ScopeData {
    bindings: RefCell<HashMap<Symbol, Cell>>,
    parent: Option<Scope>,
}

/// A single activation's bindings, chained to its lexically enclosing scope.
///
/// Cloning a `Scope` is cheap (it's a reference-counted pointer to the same
/// node) - generators and closures hold onto one to keep their captured
/// environment alive after the statement that created them returns.
#[derive(Clone)]
pub struct Scope(Rc<ScopeData>);

impl Scope {
    /// A fresh root scope, holding the builtins and top-level declarations.
    pub fn root() -> Self {
        Scope(Rc::new(ScopeData {
            bindings: RefCell::new(HashMap::new()),
            parent: None,
        }))
    }

    /// A child scope nested under `self` (block, loop body, call frame, ...).
    pub fn child(&self) -> Self {
        Scope(Rc::new(ScopeData {
            bindings: RefCell::new(HashMap::new()),
            parent: Some(self.clone()),
        }))
    }

    /// Bind `name` to a fresh cell in *this* scope, shadowing any outer
    /// binding of the same name. Returns the cell so the caller (e.g. a
    /// `for`/`foreach` induction variable) can mutate it directly.
    pub fn declare(&self, name: Symbol, initial: Value) -> Cell {
        let cell: Cell = Rc::new(RefCell::new(initial));
        self.0.bindings.borrow_mut().insert(name, cell.clone());
        cell
    }

    /// Resolve `name` by walking outward from this scope. `None` means the
    /// name is undefined, which can't happen for a program that passed
    /// preparation - callers treat it as an internal-invariant violation.
    pub fn resolve(&self, name: Symbol) -> Option<Cell> {
        if let Some(cell) = self.0.bindings.borrow().get(&name) {
            return Some(cell.clone());
        }
        self.0.parent.as_ref().and_then(|p| p.resolve(name))
    }

    /// Report every object currently held directly in this chain (own
    /// bindings plus every enclosing scope) to a GC trace. Closures and
    /// generators keep a whole captured chain alive, not just their own
    /// frame, so this walks all the way to the root.
    pub fn trace_objects(&self, report: &mut dyn FnMut(&Weak<VanillaObject>)) {
        for cell in self.0.bindings.borrow().values() {
            if let Value::Object(rc) = &*cell.borrow() {
                report(&Rc::downgrade(rc));
            }
        }
        if let Some(parent) = &self.0.parent {
            parent.trace_objects(report);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sym(s: &str) -> Symbol {
        Symbol::intern(s)
    }

    #[test]
    fn resolves_through_parent_scopes() {
        let root = Scope::root();
        root.declare(sym("x"), Value::Int(1));
        let inner = root.child();
        let cell = inner.resolve(sym("x")).expect("x visible from child scope");
        assert!(matches!(*cell.borrow(), Value::Int(1)));
    }

    #[test]
    fn inner_declare_shadows_without_touching_outer_cell() {
        let root = Scope::root();
        let outer_cell = root.declare(sym("x"), Value::Int(1));
        let inner = root.child();
        inner.declare(sym("x"), Value::Int(2));
        assert!(matches!(*outer_cell.borrow(), Value::Int(1)));
        let resolved = inner.resolve(sym("x")).unwrap();
        assert!(matches!(*resolved.borrow(), Value::Int(2)));
    }

    #[test]
    fn undeclared_name_does_not_resolve() {
        let root = Scope::root();
        assert!(root.resolve(sym("missing")).is_none());
    }
}
