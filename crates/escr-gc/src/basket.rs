//! The mark-sweep basket (§5.3).
//!
//! A basket is a per-interpreter heap. Every object added to it is kept alive
//! by a basket-owned reference until a `collect` determines it unreachable
//! from a root, or a `purge` unconditionally drops everything.
//!
//! An object is a root while something outside the basket still holds a
//! handle to it: `Rc::strong_count` is 1 for a handle owned only by the
//! basket, so any count above that marks a root.

use std::cell::RefCell;

use rustc_hash::FxHashSet;

use crate::object::{identity, GcHandle};

/// A per-interpreter collectable heap.
#[derive(Default)]
pub struct Basket {
    members: RefCell<Vec<GcHandle>>,
}

impl Basket {
    /// Create an empty basket.
    pub fn new() -> Self {
        Self {
            members: RefCell::new(Vec::new()),
        }
    }

    /// Insert a collectable into the basket, taking a basket-owned reference.
    ///
    /// Idempotent: re-adding a handle already tracked by this basket is a
    /// harmless no-op (`link` relies on this when wiring up cyclic graphs).
    pub fn add(&self, object: GcHandle) {
        let key = identity(&object);
        let mut members = self.members.borrow_mut();
        if members.iter().any(|m| identity(m) == key) {
            return;
        }
        members.push(object);
    }

    /// Number of objects currently tracked, live or not yet collected.
    pub fn len(&self) -> usize {
        self.members.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.borrow().is_empty()
    }

    /// Mark-and-sweep: drop every object unreachable from a root.
    ///
    /// Returns the number of objects collected.
    pub fn collect(&self) -> usize {
        let roots: Vec<GcHandle> = self
            .members
            .borrow()
            .iter()
            .filter(|m| std::rc::Rc::strong_count(m) > 1)
            .cloned()
            .collect();

        let mut marked: FxHashSet<usize> = FxHashSet::default();
        let mut stack = roots;
        while let Some(object) = stack.pop() {
            if marked.insert(identity(&object)) {
                let mut children = Vec::new();
                object.trace(&mut |link| {
                    if let Some(linked) = link.upgrade() {
                        children.push(linked);
                    }
                });
                stack.extend(children);
            }
        }

        let mut members = self.members.borrow_mut();
        let before = members.len();
        members.retain(|m| marked.contains(&identity(m)));
        before - members.len()
    }

    /// Unconditionally release every object in the basket.
    ///
    /// Used at interpreter shutdown; unlike `collect`, roots are not spared.
    pub fn purge(&self) -> usize {
        let mut members = self.members.borrow_mut();
        let count = members.len();
        members.clear();
        count
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell as StdRefCell;
    use std::rc::Rc;

    struct Node {
        links: StdRefCell<Vec<GcLink>>,
    }

    impl GcObject for Node {
        fn trace(&self, visit: &mut dyn FnMut(&GcLink)) {
            for link in self.links.borrow().iter() {
                visit(link);
            }
        }
    }

    fn node() -> Rc<Node> {
        Rc::new(Node {
            links: StdRefCell::new(Vec::new()),
        })
    }

    fn link(handle: &Rc<Node>) -> GcLink {
        Rc::downgrade(handle) as GcLink
    }

    #[test]
    fn collect_keeps_rooted_objects() {
        let basket = Basket::new();
        let root = node();
        basket.add(root.clone() as GcHandle);
        assert_eq!(basket.collect(), 0);
        assert_eq!(basket.len(), 1);
        drop(root);
        assert_eq!(basket.collect(), 1);
        assert!(basket.is_empty());
    }

    #[test]
    fn collect_follows_cycles_with_no_external_root() {
        let basket = Basket::new();
        let a = node();
        let b = node();
        a.links.borrow_mut().push(link(&b));
        b.links.borrow_mut().push(link(&a));
        basket.add(a.clone() as GcHandle);
        basket.add(b.clone() as GcHandle);

        // Drop every external root; only the basket's own references and the
        // (non-owning) a<->b links remain, so the cycle must still collect.
        drop(a);
        drop(b);

        assert_eq!(basket.collect(), 2);
        assert!(basket.is_empty());
    }

    #[test]
    fn collect_spares_a_cycle_reachable_from_a_root() {
        let basket = Basket::new();
        let a = node();
        let b = node();
        a.links.borrow_mut().push(link(&b));
        b.links.borrow_mut().push(link(&a));
        basket.add(a.clone() as GcHandle);
        basket.add(b.clone() as GcHandle);

        drop(b);
        // `a` is still held externally, and reaches `b` through the link.
        assert_eq!(basket.collect(), 0);
        assert_eq!(basket.len(), 2);
    }

    #[test]
    fn purge_empties_regardless_of_roots() {
        let basket = Basket::new();
        let root = node();
        basket.add(root.clone() as GcHandle);
        assert_eq!(basket.purge(), 1);
        assert!(basket.is_empty());
    }
}
