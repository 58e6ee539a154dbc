//! Vanilla objects (§4.5.7): the handful of concrete shapes every
//! `Value::Object` can take. escr has no user-defined classes, so there is
//! no virtual dispatch here either - just a tagged enum, matched on, the
//! same way the evaluator matches on `ast::ExprKind` (§9 design notes).

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use escr_par::ast;
use escr_util::Symbol;
use indexmap::IndexMap;

use escr_gc::{GcHandle, GcLink, GcObject};

use crate::generator::GeneratorState;
use crate::scope::Scope;
use crate::value::{Cell, EscrString, Value};

/// A value as stored *inside* a collectable container.
///
/// Identical to [`Value`] except the `Object` case is a non-owning weak
/// link rather than a strong handle - a container must never keep its own
/// members rooted, or `Basket::collect` could never reclaim a cycle (§5.3).
#[derive(Clone)]
pub enum Slot {
    Void,
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(EscrString),
    Object(Weak<VanillaObject>),
    Indirect(Cell),
    Pointer(Cell),
}

impl Slot {
    pub fn from_value(value: &Value) -> Slot {
        match value {
            Value::Void => Slot::Void,
            Value::Null => Slot::Null,
            Value::Bool(b) => Slot::Bool(*b),
            Value::Int(i) => Slot::Int(*i),
            Value::Float(f) => Slot::Float(*f),
            Value::String(s) => Slot::String(s.clone()),
            Value::Object(rc) => Slot::Object(Rc::downgrade(rc)),
            Value::Indirect(cell) => Slot::Indirect(cell.clone()),
            Value::Pointer(cell) => Slot::Pointer(cell.clone()),
            Value::FlowControl(_) => unreachable!("flow control is never stored in a container"),
        }
    }

    /// Upgrade back to a usable `Value`. A dangling `Object` link (the
    /// pointee was already collected) can only happen if something read a
    /// container slot that no root still reaches, which can't happen
    /// through normal script evaluation - it degrades to `Null` rather than
    /// panicking.
    pub fn to_value(&self) -> Value {
        match self {
            Slot::Void => Value::Void,
            Slot::Null => Value::Null,
            Slot::Bool(b) => Value::Bool(*b),
            Slot::Int(i) => Value::Int(*i),
            Slot::Float(f) => Value::Float(*f),
            Slot::String(s) => Value::String(s.clone()),
            Slot::Object(weak) => weak.upgrade().map(Value::Object).unwrap_or(Value::Null),
            Slot::Indirect(cell) => Value::Indirect(cell.clone()),
            Slot::Pointer(cell) => Value::Pointer(cell.clone()),
        }
    }
}

/// A user-defined function or generator's signature and body, captured at
/// the point its `function`/`generator` statement ran (§4.5.1 - nested
/// scopes persist for as long as something still references them, which is
/// exactly what a closure needs).
pub struct FunctionDef {
    pub name: Symbol,
    pub params: Vec<ast::Param>,
    pub is_generator: bool,
    pub body: Rc<ast::Stmt>,
    pub closure: Scope,
}

pub enum ObjectKind {
    /// Zero-based, dense, growable on out-of-range set (§4.5.7).
    Array(RefCell<Vec<Slot>>),
    /// Insertion-ordered string-keyed map; `obj[key]` is sugar for `obj.key`.
    Dict(RefCell<IndexMap<Symbol, Slot>>),
    /// Exactly `key`/`value`, itself iterable as a two-entry dictionary.
    KeyValue { key: Symbol, value: RefCell<Slot> },
    /// A dictionary that always carries at least `message`/`location`.
    Exception(RefCell<IndexMap<Symbol, Slot>>),
    Function(Rc<FunctionDef>),
    Generator(RefCell<GeneratorState>),
}

pub struct VanillaObject {
    pub kind: ObjectKind,
}

impl VanillaObject {
    pub fn new(kind: ObjectKind) -> Rc<Self> {
        Rc::new(Self { kind })
    }

    pub fn array(items: Vec<Value>) -> Rc<Self> {
        Self::new(ObjectKind::Array(RefCell::new(items.iter().map(Slot::from_value).collect())))
    }

    pub fn dict(fields: Vec<(Symbol, Value)>) -> Rc<Self> {
        let map: IndexMap<Symbol, Slot> = fields.into_iter().map(|(k, v)| (k, Slot::from_value(&v))).collect();
        Self::new(ObjectKind::Dict(RefCell::new(map)))
    }

    pub fn key_value(key: Symbol, value: Value) -> Rc<Self> {
        Self::new(ObjectKind::KeyValue {
            key,
            value: RefCell::new(Slot::from_value(&value)),
        })
    }

    pub fn exception(message: impl Into<String>, location: impl Into<String>) -> Rc<Self> {
        let mut map = IndexMap::new();
        map.insert(Symbol::intern("message"), Slot::from_value(&Value::string(message.into())));
        map.insert(Symbol::intern("location"), Slot::from_value(&Value::string(location.into())));
        Self::new(ObjectKind::Exception(RefCell::new(map)))
    }

    pub fn function(def: FunctionDef) -> Rc<Self> {
        Self::new(ObjectKind::Function(Rc::new(def)))
    }

    pub fn generator(state: GeneratorState) -> Rc<Self> {
        Self::new(ObjectKind::Generator(RefCell::new(state)))
    }

    pub fn type_name(&self) -> &'static str {
        match &self.kind {
            ObjectKind::Array(_) => "Array",
            ObjectKind::Dict(_) => "Object",
            ObjectKind::KeyValue { .. } => "KeyValue",
            ObjectKind::Exception(_) => "Exception",
            ObjectKind::Function(def) if def.is_generator => "Generator",
            ObjectKind::Function(_) => "Function",
            ObjectKind::Generator(_) => "Generator",
        }
    }

    pub fn display_string(&self) -> String {
        match &self.kind {
            ObjectKind::Array(items) => {
                let parts: Vec<String> = items.borrow().iter().map(|s| s.to_value().display_string()).collect();
                format!("[{}]", parts.join(", "))
            }
            ObjectKind::Dict(map) => {
                let parts: Vec<String> = map
                    .borrow()
                    .iter()
                    .map(|(k, v)| format!("{}: {}", k, v.to_value().display_string()))
                    .collect();
                format!("{{{}}}", parts.join(", "))
            }
            ObjectKind::KeyValue { key, value } => {
                format!("{}: {}", key, value.borrow().to_value().display_string())
            }
            ObjectKind::Exception(map) => {
                let message = map
                    .borrow()
                    .get(&Symbol::intern("message"))
                    .map(|s| s.to_value().display_string())
                    .unwrap_or_default();
                message
            }
            ObjectKind::Function(def) => format!("<function {}>", def.name),
            ObjectKind::Generator(_) => "<generator>".to_string(),
        }
    }

    /// Entries this object directly references, for GC tracing and for
    /// `foreach`/KeyValue-style iteration, as `(key, value)` pairs in
    /// iteration order. Array elements report an `int`-typed key.
    pub fn entries(&self) -> Vec<(Symbol, Value)> {
        match &self.kind {
            ObjectKind::Array(items) => items
                .borrow()
                .iter()
                .enumerate()
                .map(|(i, s)| (Symbol::intern(&i.to_string()), s.to_value()))
                .collect(),
            ObjectKind::Dict(map) => map.borrow().iter().map(|(k, v)| (*k, v.to_value())).collect(),
            ObjectKind::KeyValue { key, value } => vec![(*key, value.borrow().to_value())],
            ObjectKind::Exception(map) => map.borrow().iter().map(|(k, v)| (*k, v.to_value())).collect(),
            ObjectKind::Function(_) | ObjectKind::Generator(_) => Vec::new(),
        }
    }
}

impl GcObject for VanillaObject {
    fn trace(&self, visit: &mut dyn FnMut(&GcLink)) {
        let mut report = |weak: &Weak<VanillaObject>| {
            if let Some(rc) = weak.upgrade() {
                let handle: GcHandle = rc;
                let link: GcLink = Rc::downgrade(&handle);
                visit(&link);
            }
        };
        match &self.kind {
            ObjectKind::Array(items) => {
                for slot in items.borrow().iter() {
                    if let Slot::Object(weak) = slot {
                        report(weak);
                    }
                }
            }
            ObjectKind::Dict(map) | ObjectKind::Exception(map) => {
                for slot in map.borrow().values() {
                    if let Slot::Object(weak) = slot {
                        report(weak);
                    }
                }
            }
            ObjectKind::KeyValue { value, .. } => {
                if let Slot::Object(weak) = &*value.borrow() {
                    report(weak);
                }
            }
            ObjectKind::Function(def) => {
                def.closure.trace_objects(&mut report);
            }
            ObjectKind::Generator(state) => {
                state.borrow().scope.trace_objects(&mut report);
            }
        }
    }
}
