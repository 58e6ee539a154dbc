//! Fatal evaluator errors (§3.8, §7.3).
//!
//! These are reserved for conditions that make continuing meaningless - not
//! for ordinary script-level failures, which surface as a thrown
//! `Exception` value instead and stay inside the `Value`/`FlowControl`
//! world. A script cannot trigger anything here by itself.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EvalError {
    #[error("generator frame stack was corrupted (expected a {expected} frame, found something else)")]
    CorruptedGeneratorState { expected: &'static str },
}

pub type EvalResult<T> = Result<T, EvalError>;
