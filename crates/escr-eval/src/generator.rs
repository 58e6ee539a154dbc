//! Stackless generator coroutines (§4.5.5).
//!
//! A generator's body is only ever re-entered through [`GeneratorState`]:
//! each `coexecute` call re-walks the body statement from the top, using
//! `frames` as a breadcrumb trail back to wherever the last `yield` left
//! off. Only `Block`/`do`/`for`/`while` need a frame of their own - `if`,
//! `switch` and `try` have no iteration state to resume, so control just
//! passes through them to whichever substatement was already chosen.
//!
//! Frames don't need to carry a copy of the statement they belong to; the
//! evaluator re-derives that from the (unchanging) body AST on every
//! resume, so a frame is mostly just "which iteration am I on". `for` and
//! `while` frames are the exception: they also carry the loop's own
//! `Scope`, since a variable bound by `init` or declared in the body before
//! a `yield` has to still be resolvable after the generator is resumed.

use std::rc::Rc;

use escr_par::ast;

use crate::scope::Scope;

#[derive(Clone, Copy, PartialEq, Eq)]
pub enum DoPhase {
    Body,
    Cond,
}

#[derive(Clone, Copy, PartialEq, Eq)]
pub enum ForPhase {
    Init,
    Cond,
    Body,
    Step,
}

#[derive(Clone)]
pub enum Frame {
    /// Sentinel occupying slot 0, so every real frame lives at cursor >= 1.
    Root,
    Block { index: usize },
    Do { phase: DoPhase },
    /// Carries the loop's own scope (bound once by `init`, e.g. the `i` in
    /// `for (var i = 0; ...)`) so it survives a `yield` inside the body
    /// instead of being rebuilt from scratch on every resume.
    For { phase: ForPhase, scope: Scope },
    /// Carries the current iteration's scope for the same reason: a
    /// variable declared in the body before a `yield` must still be there
    /// when the generator is resumed mid-iteration.
    While { scope: Scope },
}

/// A suspended generator activation: its own body, its bound parameters and
/// captured closure (together the generator's private `scope`), and the
/// resume breadcrumb trail.
pub struct GeneratorState {
    pub body: Rc<ast::Stmt>,
    pub scope: Scope,
    pub frames: Vec<Frame>,
    pub finished: bool,
}

impl GeneratorState {
    pub fn new(body: Rc<ast::Stmt>, scope: Scope) -> Self {
        Self {
            body,
            scope,
            frames: vec![Frame::Root],
            finished: false,
        }
    }
}
