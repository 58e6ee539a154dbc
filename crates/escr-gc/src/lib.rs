//! escr-gc - the mark-sweep object basket.
//!
//! The evaluator never frees an `Object` value directly; it hands a basket
//! the hard reference it acquires on construction (`Basket::add`) and relies
//! on `Basket::collect` to reclaim anything unreachable from a root. This is
//! deliberately simpler than a production collector: the interpreter is
//! single-threaded and synchronous (§5), so there is no concurrent marking,
//! no generations, and no compaction — just one basket per running program.
//!
//! Two kinds of outgoing pointer matter here:
//!
//! - A [`object::GcHandle`] is a hard reference: the basket's own membership
//!   list holds one, and a `Value::Object` living in a scope or on the
//!   evaluation stack holds another. Any object whose handle has more than
//!   one strong reference is a root.
//! - A [`object::GcLink`] is the non-owning edge between two collectables
//!   (an array element, a dictionary value, a captured upvalue). Links never
//!   bump the strong count, so a cycle with no external root is still
//!   reclaimed by `collect`.

pub mod basket;
pub mod object;

pub use basket::Basket;
pub use object::{GcHandle, GcLink, GcObject};
