//! The runtime value model (§3.2).
//!
//! `Value` is the tagged union every expression evaluates to. It is
//! deliberately flat: no trait objects, no virtual dispatch on the value
//! itself — [`crate::object::VanillaObject`] carries its own tag for the
//! handful of shapes an escr object can take.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use crate::object::VanillaObject;

/// An escr string: immutable UTF-8 with a cached codepoint count so
/// `.length` doesn't re-scan the bytes on every access.
#[derive(Clone)]
pub struct EscrString(Rc<EscrStringData>);

struct EscrStringData {
    text: String,
    char_len: usize,
}

impl EscrString {
    pub fn new(text: impl Into<String>) -> Self {
        let text = text.into();
        let char_len = text.chars().count();
        Self(Rc::new(EscrStringData { text, char_len }))
    }

    pub fn as_str(&self) -> &str {
        &self.0.text
    }

    /// Length in Unicode codepoints, not bytes (§3.2).
    pub fn char_len(&self) -> usize {
        self.0.char_len
    }
}

impl PartialEq for EscrString {
    fn eq(&self, other: &Self) -> bool {
        self.0.text == other.0.text
    }
}

impl fmt::Debug for EscrString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.0.text)
    }
}

/// A shared, mutable cell backing `Indirect` identifiers and `Pointer`
/// values (§3.2 - both use the same aliasing mechanism, `Pointer` is just
/// the one exposed to script code as `T*`).
pub type Cell = Rc<RefCell<Value>>;

/// What a `FlowControl` value is carrying control away from (§4.5.4).
#[derive(Clone)]
pub enum FlowControl {
    Break,
    Continue,
    Return(Value),
    Yield(Value),
    Throw(Value),
}

/// The result of evaluating any expression or statement.
///
/// `Void` is the sentinel a statement "returns" when it isn't an expression
/// statement producing a usable value; it is never assignable and never
/// compares equal to anything, including itself. `FlowControl` is how
/// `break`/`continue`/`return`/`yield`/`throw` propagate up through the
/// recursive evaluator — callers inspect it and either re-propagate or
/// consume it; it is never visible to script code.
#[derive(Clone)]
pub enum Value {
    Void,
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(EscrString),
    Object(Rc<VanillaObject>),
    Indirect(Cell),
    Pointer(Cell),
    FlowControl(Box<FlowControl>),
}

impl Value {
    pub fn string(s: impl Into<String>) -> Self {
        Value::String(EscrString::new(s))
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn is_flow_control(&self) -> bool {
        matches!(self, Value::FlowControl(_))
    }

    /// The runtime type name as returned by the `type()` builtin (§4.5.6).
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Void => "void",
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::String(_) => "string",
            Value::Object(obj) => obj.type_name(),
            Value::Indirect(cell) | Value::Pointer(cell) => cell.borrow().type_name(),
            Value::FlowControl(_) => "void",
        }
    }

    /// Following through `Indirect`/`Pointer` aliasing to the value
    /// underneath, since most operators need the actual payload rather than
    /// the cell wrapper.
    pub fn deref_alias(&self) -> Value {
        match self {
            Value::Indirect(cell) | Value::Pointer(cell) => cell.borrow().deref_alias(),
            other => other.clone(),
        }
    }

    /// `print`/`string()` stringification (§4.5.6). Objects format via their
    /// own `toString` where present, otherwise a bracketed summary.
    pub fn display_string(&self) -> String {
        match self.deref_alias() {
            Value::Void => String::new(),
            Value::Null => "null".to_string(),
            Value::Bool(b) => b.to_string(),
            Value::Int(i) => i.to_string(),
            Value::Float(f) => format_float(f),
            Value::String(s) => s.as_str().to_string(),
            Value::Object(obj) => obj.display_string(),
            Value::Indirect(_) | Value::Pointer(_) => unreachable!("deref_alias already resolved aliasing"),
            Value::FlowControl(_) => String::new(),
        }
    }

    /// Value equality per §3.2: `Int`/`Float` compare numerically across
    /// variants, `String` by bytes, `Object` by identity, everything else
    /// only equals its own variant; `FlowControl` never equals anything.
    pub fn value_eq(&self, other: &Value) -> bool {
        let a = self.deref_alias();
        let b = other.deref_alias();
        match (&a, &b) {
            (Value::FlowControl(_), _) | (_, Value::FlowControl(_)) => false,
            (Value::Void, Value::Void) => true,
            (Value::Null, Value::Null) => true,
            (Value::Bool(x), Value::Bool(y)) => x == y,
            (Value::Int(x), Value::Int(y)) => x == y,
            (Value::Float(x), Value::Float(y)) => x == y,
            (Value::Int(x), Value::Float(y)) | (Value::Float(y), Value::Int(x)) => (*x as f64) == *y,
            (Value::String(x), Value::String(y)) => x == y,
            (Value::Object(x), Value::Object(y)) => Rc::ptr_eq(x, y),
            _ => false,
        }
    }
}

fn format_float(f: f64) -> String {
    if f.is_nan() {
        "NaN".to_string()
    } else if f.is_infinite() {
        if f > 0.0 { "Infinity".to_string() } else { "-Infinity".to_string() }
    } else if f == f.trunc() && f.abs() < 1e15 {
        format!("{f:.1}")
    } else {
        format!("{f}")
    }
}
