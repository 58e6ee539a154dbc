//! The tree-walking evaluator (§4.5).
//!
//! Every statement and expression has a plain, non-resumable execution path
//! (`exec_stmt`/`eval_expr`) used everywhere except inside a generator body,
//! where `coexecute_stmt` takes over so a `yield` can suspend mid-statement
//! and pick back up later (§4.5.5). The two paths share the same operator
//! and built-in helpers; only the control-flow constructs that can contain
//! a `yield` (`Block`, `do`, `for`, `while`) need the dual implementation.

use std::rc::Rc;

use escr_par::ast::{self, BinOp, CaseLabel, Condition, Expr, ExprKind, Program, Stmt, StmtKind, TypeRefKind, UnaryOp};
use escr_util::{Span, Symbol};

use escr_gc::Basket;

use crate::builtins;
use crate::error::{EvalError, EvalResult};
use crate::generator::{DoPhase, ForPhase, Frame, GeneratorState};
use crate::object::{ObjectKind, VanillaObject};
use crate::ops;
use crate::scope::Scope;
use crate::value::{Cell, FlowControl, Value};

/// Where `print` sends its output.
///
/// `escr::Engine` adapts this into its `Logger`/`Source`/`Severity` model
/// (§6.2); this crate knows nothing about that interface, so it can run
/// scripts and be tested on its own. An uncaught exception is not reported
/// here - it comes back out of `Evaluator::run` as a `Value::FlowControl`,
/// and it's the caller's job to turn its `message`/`location` fields into a
/// Runtime/Error log line.
pub trait Output {
    fn print(&mut self, text: &str);
}

/// What a statement produced, whether the body stayed to completion or
/// suspended at a `yield` (§4.5.5).
enum CoResult {
    Done(Value),
    Yielded(Value),
}

fn as_flow(v: &Value) -> Option<&FlowControl> {
    match v {
        Value::FlowControl(fc) => Some(fc),
        _ => None,
    }
}

/// An addressable place: what `=`, compound-assignment and `++`/`--`
/// operate on (§4.5.2).
enum LValue {
    Cell(Cell),
    Index { object: Rc<VanillaObject>, index: Value },
    Dot { object: Rc<VanillaObject>, name: Symbol },
}

pub struct Evaluator<'o> {
    pub basket: Basket,
    output: &'o mut dyn Output,
    /// Mirrors `escr::EngineConfig::collect_after_statement` (§4.6) without
    /// this crate needing to know that type exists.
    pub collect_after_statement: bool,
    /// Where the most recently thrown value was thrown from. A thrown value
    /// can be anything (a bare string, as in `throw "boom";`) and doesn't
    /// carry its own span, so this is how the caller recovers a location for
    /// an uncaught exception once `run` returns (§6.2, §7.2).
    last_throw_span: std::cell::Cell<Span>,
}

impl<'o> Evaluator<'o> {
    pub fn new(output: &'o mut dyn Output) -> Self {
        Self {
            basket: Basket::new(),
            output,
            collect_after_statement: false,
            last_throw_span: std::cell::Cell::new(Span::DUMMY),
        }
    }

    /// The span of whatever `throw` produced the value an uncaught
    /// `Value::FlowControl(Throw(..))` is carrying.
    pub fn last_throw_span(&self) -> Span {
        self.last_throw_span.get()
    }

    /// Runs a whole program at module scope. Returns `Value::Void` on a
    /// clean finish, or a `Value::FlowControl(Throw(..))` if an exception
    /// escaped every `try`/`catch` in the program - the caller (`escr`)
    /// reports that as an uncaught runtime error at the module root (§7.2).
    pub fn run(&mut self, program: &Program) -> Value {
        let scope = Scope::root();
        self.exec_block(&program.statements, &scope)
    }

    fn exec_block(&mut self, stmts: &[Stmt], scope: &Scope) -> Value {
        for stmt in stmts {
            let result = self.exec_stmt(stmt, scope);
            if self.collect_after_statement {
                self.basket.collect();
            }
            if result.is_flow_control() {
                return result;
            }
        }
        Value::Void
    }

    fn throw(&self, message: impl Into<String>, span: escr_util::Span) -> Value {
        let obj = VanillaObject::exception(message, span.to_string());
        self.basket.add(obj.clone());
        self.last_throw_span.set(span);
        Value::FlowControl(Box::new(FlowControl::Throw(Value::Object(obj))))
    }

    // ---- statements (plain path) ----------------------------------------

    fn exec_stmt(&mut self, stmt: &Stmt, scope: &Scope) -> Value {
        match &stmt.kind {
            StmtKind::Block(stmts) => self.exec_block(stmts, &scope.child()),
            StmtKind::Declare { name, init, .. } => {
                let value = match init {
                    Some(expr) => {
                        let v = self.eval_expr(expr, scope);
                        if v.is_flow_control() {
                            return v;
                        }
                        v
                    }
                    None => Value::Null,
                };
                scope.declare(*name, value);
                Value::Void
            }
            StmtKind::Assign { target, value } => self.exec_assign(target, value, scope),
            StmtKind::Mutate { target, op, value } => self.exec_mutate(target, *op, value, stmt.span, scope),
            StmtKind::Break => Value::FlowControl(Box::new(FlowControl::Break)),
            StmtKind::Continue => Value::FlowControl(Box::new(FlowControl::Continue)),
            StmtKind::Do { body, cond } => self.exec_do(body, cond, scope),
            StmtKind::While { cond, body } => self.exec_while(cond, body, scope),
            StmtKind::If { cond, then_branch, else_branch } => self.exec_if(cond, then_branch, else_branch.as_deref(), scope),
            StmtKind::For { init, cond, step, body } => self.exec_for(init.as_deref(), cond, step.as_deref(), body, scope),
            StmtKind::ForEach { name, iter, body, .. } => self.exec_foreach(*name, iter, body, scope),
            StmtKind::FunctionDef { name, params, body, .. } => {
                let def = VanillaObject::function(crate::object::FunctionDef {
                    name: *name,
                    params: params.clone(),
                    is_generator: false,
                    body: Rc::new((**body).clone()),
                    closure: scope.clone(),
                });
                self.basket.add(def.clone());
                scope.declare(*name, Value::Object(def));
                Value::Void
            }
            StmtKind::GeneratorDef { name, params, body, .. } => {
                let def = VanillaObject::function(crate::object::FunctionDef {
                    name: *name,
                    params: params.clone(),
                    is_generator: true,
                    body: Rc::new((**body).clone()),
                    closure: scope.clone(),
                });
                self.basket.add(def.clone());
                scope.declare(*name, Value::Object(def));
                Value::Void
            }
            StmtKind::Return(value) => {
                let v = match value {
                    Some(expr) => {
                        let v = self.eval_expr(expr, scope);
                        if v.is_flow_control() {
                            return v;
                        }
                        v
                    }
                    None => Value::Void,
                };
                Value::FlowControl(Box::new(FlowControl::Return(v)))
            }
            StmtKind::Switch { subject, clauses } => self.exec_switch(subject, clauses, scope),
            StmtKind::Throw(expr) => {
                let v = self.eval_expr(expr, scope);
                if v.is_flow_control() {
                    return v;
                }
                self.last_throw_span.set(stmt.span);
                Value::FlowControl(Box::new(FlowControl::Throw(v)))
            }
            StmtKind::Try { body, catches, finally } => self.exec_try(body, catches, finally.as_deref(), scope),
            StmtKind::Yield(expr) => {
                let v = self.eval_expr(expr, scope);
                if v.is_flow_control() {
                    return v;
                }
                Value::FlowControl(Box::new(FlowControl::Yield(v)))
            }
            StmtKind::TypeDef { .. } => Value::Void,
            StmtKind::Expr(expr) => self.eval_expr(expr, scope),
        }
    }

    fn exec_assign(&mut self, target: &Expr, value: &Expr, scope: &Scope) -> Value {
        let lvalue = match self.eval_lvalue(target, scope) {
            Ok(l) => l,
            Err(flow) => return flow,
        };
        let rhs = self.eval_expr(value, scope);
        if rhs.is_flow_control() {
            return rhs;
        }
        self.set_lvalue(&lvalue, rhs);
        Value::Void
    }

    fn exec_mutate(&mut self, target: &Expr, op: BinOp, value: &Expr, span: escr_util::Span, scope: &Scope) -> Value {
        let lvalue = match self.eval_lvalue(target, scope) {
            Ok(l) => l,
            Err(flow) => return flow,
        };
        let current = self.get_lvalue(&lvalue);
        let rhs = self.eval_expr(value, scope);
        if rhs.is_flow_control() {
            return rhs;
        }
        let result = match self.apply_binop(op, &current, &rhs) {
            Ok(v) => v,
            Err(message) => return self.throw(message, span),
        };
        self.set_lvalue(&lvalue, result);
        Value::Void
    }

    fn exec_if(&mut self, cond: &Condition, then_branch: &Stmt, else_branch: Option<&Stmt>, scope: &Scope) -> Value {
        let inner = scope.child();
        let test = match self.eval_condition(cond, &inner) {
            Ok(v) => v,
            Err(flow) => return flow,
        };
        if test {
            self.exec_stmt(then_branch, &inner)
        } else if let Some(else_branch) = else_branch {
            self.exec_stmt(else_branch, &inner)
        } else {
            Value::Void
        }
    }

    fn exec_do(&mut self, body: &Stmt, cond: &Expr, scope: &Scope) -> Value {
        loop {
            let result = self.exec_stmt(body, scope);
            match as_flow(&result) {
                Some(FlowControl::Break) => return Value::Void,
                Some(FlowControl::Continue) => {}
                Some(FlowControl::Return(_)) | Some(FlowControl::Throw(_)) | Some(FlowControl::Yield(_)) => return result,
                None => {}
            }
            let test = self.eval_expr(cond, scope);
            if test.is_flow_control() {
                return test;
            }
            if !matches!(test, Value::Bool(true)) {
                return Value::Void;
            }
        }
    }

    fn exec_while(&mut self, cond: &Condition, body: &Stmt, scope: &Scope) -> Value {
        loop {
            let inner = scope.child();
            let test = match self.eval_condition(cond, &inner) {
                Ok(v) => v,
                Err(flow) => return flow,
            };
            if !test {
                return Value::Void;
            }
            let result = self.exec_stmt(body, &inner);
            match as_flow(&result) {
                Some(FlowControl::Break) => return Value::Void,
                Some(FlowControl::Continue) => continue,
                Some(FlowControl::Return(_)) | Some(FlowControl::Throw(_)) | Some(FlowControl::Yield(_)) => return result,
                None => {}
            }
        }
    }

    fn exec_for(&mut self, init: Option<&Stmt>, cond: Option<&Expr>, step: Option<&Stmt>, body: &Stmt, scope: &Scope) -> Value {
        let loop_scope = scope.child();
        if let Some(init) = init {
            let result = self.exec_stmt(init, &loop_scope);
            if result.is_flow_control() {
                return result;
            }
        }
        loop {
            if let Some(cond) = cond {
                let test = self.eval_expr(cond, &loop_scope);
                if test.is_flow_control() {
                    return test;
                }
                if !matches!(test, Value::Bool(true)) {
                    return Value::Void;
                }
            }
            let result = self.exec_stmt(body, &loop_scope);
            match as_flow(&result) {
                Some(FlowControl::Break) => return Value::Void,
                Some(FlowControl::Continue) => {}
                Some(FlowControl::Return(_)) | Some(FlowControl::Throw(_)) | Some(FlowControl::Yield(_)) => return result,
                None => {}
            }
            if let Some(step) = step {
                let result = self.exec_stmt(step, &loop_scope);
                if result.is_flow_control() {
                    return result;
                }
            }
        }
    }

    fn exec_foreach(&mut self, name: Symbol, iter: &Expr, body: &Stmt, scope: &Scope) -> Value {
        let iterable = self.eval_expr(iter, scope);
        if iterable.is_flow_control() {
            return iterable;
        }
        let elements = match self.iterate(&iterable) {
            Ok(elements) => elements,
            Err(flow) => return flow,
        };
        for element in elements {
            let inner = scope.child();
            inner.declare(name, element);
            let result = self.exec_stmt(body, &inner);
            match as_flow(&result) {
                Some(FlowControl::Break) => return Value::Void,
                Some(FlowControl::Continue) => continue,
                Some(FlowControl::Return(_)) | Some(FlowControl::Throw(_)) | Some(FlowControl::Yield(_)) => return result,
                None => {}
            }
        }
        Value::Void
    }

    /// Resolves "any iterable object" (§4.5.7) into a concrete element
    /// sequence. A generator is drained eagerly here since `foreach` always
    /// wants every element; calling it directly (`it()`) is how script code
    /// pulls one element at a time instead.
    fn iterate(&mut self, value: &Value) -> Result<Vec<Value>, Value> {
        match value.deref_alias() {
            Value::Object(obj) => match &obj.kind {
                ObjectKind::Array(_) | ObjectKind::Dict(_) | ObjectKind::KeyValue { .. } | ObjectKind::Exception(_) => {
                    Ok(self.iterate_entries(&obj))
                }
                ObjectKind::Generator(_) => {
                    let mut out = Vec::new();
                    loop {
                        let next = self.call_generator(&obj, scope_unused_span());
                        match next {
                            Value::FlowControl(fc) => match *fc {
                                FlowControl::Throw(v) => return Err(Value::FlowControl(Box::new(FlowControl::Throw(v)))),
                                _ => unreachable!("generator resume only yields Throw as a propagating flow"),
                            },
                            Value::Void => break,
                            other => out.push(other),
                        }
                    }
                    Ok(out)
                }
                _ => Err(self.throw("value is not iterable", escr_util::Span::DUMMY)),
            },
            other => Ok(match other {
                Value::Void => Vec::new(),
                v => vec![v],
            }),
        }
    }

    fn iterate_entries(&self, obj: &Rc<VanillaObject>) -> Vec<Value> {
        match &obj.kind {
            ObjectKind::Array(_) | ObjectKind::Dict(_) | ObjectKind::Exception(_) => obj
                .entries()
                .into_iter()
                .map(|(k, v)| Value::Object(VanillaObject::key_value(k, v)))
                .collect(),
            ObjectKind::KeyValue { key, value } => {
                let key_entry = VanillaObject::key_value(Symbol::intern("key"), Value::string(key.as_str()));
                let value_entry = VanillaObject::key_value(Symbol::intern("value"), value.borrow().to_value());
                vec![Value::Object(key_entry), Value::Object(value_entry)]
            }
            _ => Vec::new(),
        }
    }

    fn exec_switch(&mut self, subject: &Condition, clauses: &[ast::Clause], scope: &Scope) -> Value {
        let inner = scope.child();
        let subject_value = match self.eval_condition_value(subject, &inner) {
            Ok(v) => v,
            Err(flow) => return flow,
        };
        let Some(clause) = self.select_clause(clauses, &subject_value, &inner) else {
            return Value::Void;
        };
        let result = self.exec_block(&clause.body, &inner);
        match as_flow(&result) {
            Some(FlowControl::Break) => Value::Void,
            _ => result,
        }
    }

    fn select_clause<'c>(&mut self, clauses: &'c [ast::Clause], subject: &Value, scope: &Scope) -> Option<&'c ast::Clause> {
        let mut default_clause = None;
        for clause in clauses {
            for label in &clause.labels {
                match label {
                    CaseLabel::Case(expr) => {
                        let case_value = self.eval_expr(expr, scope);
                        if case_value.value_eq(subject) {
                            return Some(clause);
                        }
                    }
                    CaseLabel::Default => default_clause = Some(clause),
                }
            }
        }
        default_clause
    }

    fn exec_try(&mut self, body: &Stmt, catches: &[ast::Catch], finally: Option<&Stmt>, scope: &Scope) -> Value {
        let mut result = self.exec_stmt(body, &scope.child());
        if let Some(FlowControl::Throw(exc)) = as_flow(&result) {
            let exc = exc.clone();
            if let Some(catch) = catches.first() {
                let catch_scope = scope.child();
                catch_scope.declare(catch.name, exc);
                result = self.exec_stmt(&catch.body, &catch_scope);
            }
        }
        if let Some(finally) = finally {
            let finally_result = self.exec_stmt(finally, &scope.child());
            if finally_result.is_flow_control() {
                return finally_result;
            }
        }
        result
    }

    // ---- lvalues ----------------------------------------------------------

    fn eval_lvalue(&mut self, expr: &Expr, scope: &Scope) -> Result<LValue, Value> {
        match &expr.kind {
            ExprKind::Ident(name) => {
                let cell = scope.resolve(*name).unwrap_or_else(|| scope.declare(*name, Value::Null));
                Ok(LValue::Cell(cell))
            }
            ExprKind::Index { target, index } => {
                let target_value = self.eval_expr(target, scope);
                if target_value.is_flow_control() {
                    return Err(target_value);
                }
                let index_value = self.eval_expr(index, scope);
                if index_value.is_flow_control() {
                    return Err(index_value);
                }
                match target_value.deref_alias() {
                    Value::Object(obj) => Ok(LValue::Index { object: obj, index: index_value }),
                    _ => Err(self.throw("value is not indexable", expr.span)),
                }
            }
            ExprKind::Dot { target, name, .. } => {
                let target_value = self.eval_expr(target, scope);
                if target_value.is_flow_control() {
                    return Err(target_value);
                }
                match target_value.deref_alias() {
                    Value::Object(obj) => Ok(LValue::Dot { object: obj, name: *name }),
                    _ => Err(self.throw("value is not dotable", expr.span)),
                }
            }
            ExprKind::Unary { op: UnaryOp::Deref, operand } => {
                let pointer = self.eval_expr(operand, scope);
                if pointer.is_flow_control() {
                    return Err(pointer);
                }
                match pointer {
                    Value::Pointer(cell) | Value::Indirect(cell) => Ok(LValue::Cell(cell)),
                    _ => Err(self.throw("cannot dereference a non-pointer value", expr.span)),
                }
            }
            _ => Err(self.throw("expression is not assignable", expr.span)),
        }
    }

    fn get_lvalue(&self, lvalue: &LValue) -> Value {
        match lvalue {
            LValue::Cell(cell) => cell.borrow().clone(),
            LValue::Index { object, index } => self.index_get(object, index),
            LValue::Dot { object, name } => self.dot_get(object, *name),
        }
    }

    fn set_lvalue(&self, lvalue: &LValue, value: Value) {
        match lvalue {
            LValue::Cell(cell) => *cell.borrow_mut() = value,
            LValue::Index { object, index } => self.index_set(object, index, value),
            LValue::Dot { object, name } => self.dot_set(object, *name, value),
        }
    }

    fn index_get(&self, object: &Rc<VanillaObject>, index: &Value) -> Value {
        match &object.kind {
            ObjectKind::Array(items) => match index {
                Value::Int(i) if *i >= 0 => items.borrow().get(*i as usize).map(|s| s.to_value()).unwrap_or(Value::Null),
                _ => Value::Null,
            },
            ObjectKind::Dict(map) => {
                let key = Symbol::intern(&index.display_string());
                map.borrow().get(&key).map(|s| s.to_value()).unwrap_or(Value::Null)
            }
            _ => Value::Null,
        }
    }

    fn index_set(&self, object: &Rc<VanillaObject>, index: &Value, value: Value) {
        match &object.kind {
            ObjectKind::Array(items) => {
                if let Value::Int(i) = index {
                    if *i >= 0 {
                        let idx = *i as usize;
                        let mut items = items.borrow_mut();
                        if idx >= items.len() {
                            items.resize(idx + 1, crate::object::Slot::Null);
                        }
                        items[idx] = crate::object::Slot::from_value(&value);
                    }
                }
            }
            ObjectKind::Dict(map) => {
                let key = Symbol::intern(&index.display_string());
                map.borrow_mut().insert(key, crate::object::Slot::from_value(&value));
            }
            _ => {}
        }
    }

    fn dot_get(&self, object: &Rc<VanillaObject>, name: Symbol) -> Value {
        if name.as_str() == "length" {
            if let ObjectKind::Array(items) = &object.kind {
                return Value::Int(items.borrow().len() as i64);
            }
        }
        match &object.kind {
            ObjectKind::Dict(map) => map.borrow().get(&name).map(|s| s.to_value()).unwrap_or(Value::Null),
            ObjectKind::Exception(map) => map.borrow().get(&name).map(|s| s.to_value()).unwrap_or(Value::Null),
            ObjectKind::KeyValue { key, value } => match name.as_str() {
                "key" => Value::string(key.as_str()),
                "value" => value.borrow().to_value(),
                _ => Value::Null,
            },
            _ => Value::Null,
        }
    }

    fn dot_set(&self, object: &Rc<VanillaObject>, name: Symbol, value: Value) {
        if name.as_str() == "length" {
            if let ObjectKind::Array(items) = &object.kind {
                if let Value::Int(len) = value {
                    items.borrow_mut().resize(len.max(0) as usize, crate::object::Slot::Null);
                }
                return;
            }
        }
        match &object.kind {
            ObjectKind::Dict(map) => {
                map.borrow_mut().insert(name, crate::object::Slot::from_value(&value));
            }
            ObjectKind::Exception(map) => {
                map.borrow_mut().insert(name, crate::object::Slot::from_value(&value));
            }
            ObjectKind::KeyValue { value: slot, .. } => {
                *slot.borrow_mut() = crate::object::Slot::from_value(&value);
            }
            _ => {}
        }
    }

    // ---- expressions --------------------------------------------------------

    fn eval_condition(&mut self, cond: &Condition, scope: &Scope) -> Result<bool, Value> {
        let value = self.eval_condition_value(cond, scope)?;
        Ok(matches!(value, Value::Bool(true)))
    }

    fn eval_condition_value(&mut self, cond: &Condition, scope: &Scope) -> Result<Value, Value> {
        match cond {
            Condition::Expr(expr) => {
                let v = self.eval_expr(expr, scope);
                if v.is_flow_control() {
                    return Err(v);
                }
                Ok(v)
            }
            Condition::Guard { name, init, .. } => {
                let v = self.eval_expr(init, scope);
                if v.is_flow_control() {
                    return Err(v);
                }
                let is_non_null = !v.is_null();
                scope.declare(*name, v);
                Ok(Value::Bool(is_non_null))
            }
        }
    }

    fn eval_expr(&mut self, expr: &Expr, scope: &Scope) -> Value {
        match &expr.kind {
            ExprKind::Ident(name) => scope.resolve(*name).map(|c| c.borrow().clone()).unwrap_or(Value::Null),
            ExprKind::Null => Value::Null,
            ExprKind::Bool(b) => Value::Bool(*b),
            ExprKind::Int(i) => Value::Int(*i),
            ExprKind::Float(f) => Value::Float(*f),
            ExprKind::Str(s) => Value::string(s.as_str()),
            ExprKind::Array(items) => {
                let mut values = Vec::with_capacity(items.len());
                for item in items {
                    let v = self.eval_expr(item, scope);
                    if v.is_flow_control() {
                        return v;
                    }
                    values.push(v);
                }
                let obj = VanillaObject::array(values);
                self.basket.add(obj.clone());
                Value::Object(obj)
            }
            ExprKind::Object(fields) => {
                let mut values = Vec::with_capacity(fields.len());
                for (name, value_expr) in fields {
                    let v = self.eval_expr(value_expr, scope);
                    if v.is_flow_control() {
                        return v;
                    }
                    values.push((*name, v));
                }
                let obj = VanillaObject::dict(values);
                self.basket.add(obj.clone());
                Value::Object(obj)
            }
            ExprKind::NamedArg(_, inner) => self.eval_expr(inner, scope),
            ExprKind::Call { callee, args } => self.eval_call(callee, args, expr.span, scope),
            ExprKind::Index { target, index } => {
                let target_value = self.eval_expr(target, scope);
                if target_value.is_flow_control() {
                    return target_value;
                }
                let index_value = self.eval_expr(index, scope);
                if index_value.is_flow_control() {
                    return index_value;
                }
                match target_value.deref_alias() {
                    Value::String(s) => self.string_char_at(&s, &index_value),
                    Value::Object(obj) => self.index_get(&obj, &index_value),
                    _ => self.throw("value is not indexable", expr.span),
                }
            }
            ExprKind::Dot { target, name, optional } => {
                let target_value = self.eval_expr(target, scope);
                if target_value.is_flow_control() {
                    return target_value;
                }
                let resolved = target_value.deref_alias();
                if *optional && resolved.is_null() {
                    return Value::Null;
                }
                match resolved {
                    Value::String(s) if name.as_str() == "length" => builtins::string_length(&s),
                    Value::Object(obj) => self.dot_get(&obj, *name),
                    _ => self.throw(format!("'{}' is not a property of this value", name), expr.span),
                }
            }
            ExprKind::Unary { op, operand } => self.eval_unary(*op, operand, expr.span, scope),
            ExprKind::Binary { op, lhs, rhs } => self.eval_binary(*op, lhs, rhs, expr.span, scope),
            ExprKind::Ternary { cond, then_expr, else_expr } => {
                let test = self.eval_expr(cond, scope);
                if test.is_flow_control() {
                    return test;
                }
                if matches!(test, Value::Bool(true)) {
                    self.eval_expr(then_expr, scope)
                } else {
                    self.eval_expr(else_expr, scope)
                }
            }
            ExprKind::Predicate(inner) => self.eval_expr(inner, scope),
            ExprKind::Cast { ty, expr: inner } => {
                let v = self.eval_expr(inner, scope);
                if v.is_flow_control() {
                    return v;
                }
                match self.cast(&ty.kind, v) {
                    Ok(v) => v,
                    Err(message) => self.throw(message, expr.span),
                }
            }
        }
    }

    fn string_char_at(&self, s: &crate::value::EscrString, index: &Value) -> Value {
        match index {
            Value::Int(i) if *i >= 0 => s
                .as_str()
                .chars()
                .nth(*i as usize)
                .map(|c| Value::string(c.to_string()))
                .unwrap_or(Value::Null),
            _ => Value::Null,
        }
    }

    fn cast(&self, ty: &TypeRefKind, value: Value) -> Result<Value, String> {
        let value = value.deref_alias();
        match ty {
            TypeRefKind::Int => match value {
                Value::Int(i) => Ok(Value::Int(i)),
                Value::Float(f) => Ok(Value::Int(f as i64)),
                Value::String(s) => s.as_str().trim().parse::<i64>().map(Value::Int).map_err(|_| format!("cannot cast '{}' to 'int'", s.as_str())),
                Value::Bool(b) => Ok(Value::Int(b as i64)),
                _ => Err("value cannot be cast to 'int'".to_string()),
            },
            TypeRefKind::Float => match value {
                Value::Int(i) => Ok(Value::Float(i as f64)),
                Value::Float(f) => Ok(Value::Float(f)),
                Value::String(s) => s.as_str().trim().parse::<f64>().map(Value::Float).map_err(|_| format!("cannot cast '{}' to 'float'", s.as_str())),
                _ => Err("value cannot be cast to 'float'".to_string()),
            },
            TypeRefKind::String => Ok(Value::string(value.display_string())),
            TypeRefKind::Bool => match value {
                Value::Bool(b) => Ok(Value::Bool(b)),
                _ => Err("value cannot be cast to 'bool'".to_string()),
            },
            _ => Ok(value),
        }
    }

    fn eval_unary(&mut self, op: UnaryOp, operand: &Expr, span: escr_util::Span, scope: &Scope) -> Value {
        if matches!(op, UnaryOp::AddressOf) {
            return match self.eval_lvalue(operand, scope) {
                Ok(LValue::Cell(cell)) => Value::Pointer(cell),
                Ok(_) => self.throw("'&' is only supported on a plain variable", span),
                Err(flow) => flow,
            };
        }
        let value = self.eval_expr(operand, scope);
        if value.is_flow_control() {
            return value;
        }
        let value = value.deref_alias();
        match op {
            UnaryOp::Not => match value {
                Value::Bool(b) => Value::Bool(!b),
                _ => self.throw("'!' requires a 'bool' operand", span),
            },
            UnaryOp::BitNot => match value {
                Value::Int(i) => Value::Int(!i),
                _ => self.throw("'~' requires an 'int' operand", span),
            },
            UnaryOp::Neg => match value {
                Value::Int(i) => Value::Int(i.wrapping_neg()),
                Value::Float(f) => Value::Float(-f),
                _ => self.throw("unary '-' requires a numeric operand", span),
            },
            UnaryOp::Deref => match value {
                Value::Pointer(cell) | Value::Indirect(cell) => cell.borrow().clone(),
                _ => self.throw("'*' requires a pointer operand", span),
            },
            UnaryOp::Spread => value,
            UnaryOp::AddressOf => unreachable!("handled above"),
        }
    }

    fn eval_binary(&mut self, op: BinOp, lhs: &Expr, rhs: &Expr, span: escr_util::Span, scope: &Scope) -> Value {
        let lhs_value = self.eval_expr(lhs, scope);
        if lhs_value.is_flow_control() {
            return lhs_value;
        }
        let lhs_value = lhs_value.deref_alias();

        // Short-circuit: the right operand is only evaluated when needed (§5).
        match op {
            BinOp::And => {
                if !matches!(lhs_value, Value::Bool(true)) {
                    return Value::Bool(false);
                }
                return self.eval_expr(rhs, scope);
            }
            BinOp::Or => {
                if matches!(lhs_value, Value::Bool(true)) {
                    return Value::Bool(true);
                }
                return self.eval_expr(rhs, scope);
            }
            BinOp::NullCoalesce => {
                if !lhs_value.is_null() {
                    return lhs_value;
                }
                return self.eval_expr(rhs, scope);
            }
            _ => {}
        }

        let rhs_value = self.eval_expr(rhs, scope);
        if rhs_value.is_flow_control() {
            return rhs_value;
        }
        let rhs_value = rhs_value.deref_alias();
        match self.apply_binop(op, &lhs_value, &rhs_value) {
            Ok(v) => v,
            Err(message) => self.throw(message, span),
        }
    }

    fn apply_binop(&self, op: BinOp, lhs: &Value, rhs: &Value) -> Result<Value, String> {
        match op {
            BinOp::Add | BinOp::Sub | BinOp::Mul | BinOp::Div | BinOp::Mod => {
                if matches!(op, BinOp::Add) {
                    if let (Value::String(_), _) | (_, Value::String(_)) = (lhs, rhs) {
                        return Ok(Value::string(format!("{}{}", lhs.display_string(), rhs.display_string())));
                    }
                }
                ops::arithmetic(op, lhs, rhs)
            }
            BinOp::Shl | BinOp::Shr | BinOp::Shr3 => ops::shift(op, lhs, rhs),
            BinOp::BitAnd | BinOp::BitOr | BinOp::BitXor => ops::bitwise(op, lhs, rhs),
            BinOp::Eq | BinOp::NotEq | BinOp::Lt | BinOp::LtEq | BinOp::Gt | BinOp::GtEq => ops::compare(op, lhs, rhs),
            BinOp::And | BinOp::Or | BinOp::NullCoalesce => unreachable!("short-circuit ops handled by the caller"),
        }
    }

    // ---- calls --------------------------------------------------------------

    fn eval_call(&mut self, callee: &Expr, args: &[Expr], span: escr_util::Span, scope: &Scope) -> Value {
        // `string`/`type` are hard keywords (`is_type_keyword` in the
        // parser), so they can never show up as a plain `Ident` callee here
        // by accident - only `assert`/`print`/`string`/`type` are the
        // identifiers the parser deliberately synthesizes for its builtin
        // call forms, which is exactly why they need a special case instead
        // of a real scope binding.
        if let ExprKind::Ident(name) = &callee.kind {
            match name.as_str() {
                "assert" => return self.eval_assert(args, span, scope),
                "print" => return self.eval_print(args, scope),
                "string" => return self.eval_string_builtin(args, scope),
                "type" => return self.eval_type_builtin(args, span, scope),
                _ => {}
            }
        }
        if let ExprKind::Dot { target, name, .. } = &callee.kind {
            // `string.from(...)`/`type.of(...)` are how these keywords reach
            // here in their dotted form: the parser synthesizes an
            // `Ident("string")`/`Ident("type")` target for them.
            if let ExprKind::Ident(receiver) = &target.kind {
                if receiver.as_str() == "string" && name.as_str() == "from" {
                    return self.eval_string_builtin(args, scope);
                }
                if receiver.as_str() == "type" && name.as_str() == "of" {
                    return self.eval_type_builtin(args, span, scope);
                }
            }
            let target_value = self.eval_expr(target, scope);
            if target_value.is_flow_control() {
                return target_value;
            }
            if let Value::String(s) = target_value.deref_alias() {
                let arg_values = match self.eval_args(args, scope) {
                    Ok(v) => v,
                    Err(flow) => return flow,
                };
                return match builtins::call_string_method(&s, name.as_str(), &arg_values) {
                    Some(Ok(v)) => v,
                    Some(Err(message)) => self.throw(message, span),
                    None => self.throw(format!("'{}' is not a string method", name), span),
                };
            }
        }

        let callee_value = self.eval_expr(callee, scope);
        if callee_value.is_flow_control() {
            return callee_value;
        }
        let arg_values = match self.eval_args(args, scope) {
            Ok(v) => v,
            Err(flow) => return flow,
        };
        match callee_value.deref_alias() {
            Value::Object(obj) => match &obj.kind {
                ObjectKind::Function(def) if def.is_generator => self.start_generator(def.clone(), arg_values),
                ObjectKind::Function(def) => self.call_function(def.clone(), arg_values),
                ObjectKind::Generator(_) => self.call_generator(&obj, span),
                _ => self.throw("value is not callable", span),
            },
            _ => self.throw("value is not callable", span),
        }
    }

    fn eval_args(&mut self, args: &[Expr], scope: &Scope) -> Result<Vec<Value>, Value> {
        let mut values = Vec::with_capacity(args.len());
        for arg in args {
            let v = self.eval_expr(arg, scope);
            if v.is_flow_control() {
                return Err(v);
            }
            values.push(v);
        }
        Ok(values)
    }

    fn eval_assert(&mut self, args: &[Expr], span: escr_util::Span, scope: &Scope) -> Value {
        let Some(arg) = args.first() else {
            return self.throw("'assert' takes exactly one argument", span);
        };
        // Predicate promotion (§4.5.6): a comparison argument gets its
        // operands and operator attached to the exception so a failed
        // `assert(x == y)` reports what `x` and `y` actually were.
        if let ExprKind::Predicate(inner) = &arg.kind {
            if let ExprKind::Binary { op, lhs, rhs } = &inner.kind {
                let lhs_value = self.eval_expr(lhs, scope);
                if lhs_value.is_flow_control() {
                    return lhs_value;
                }
                let rhs_value = self.eval_expr(rhs, scope);
                if rhs_value.is_flow_control() {
                    return rhs_value;
                }
                let condition = match self.apply_binop(*op, &lhs_value.deref_alias(), &rhs_value.deref_alias()) {
                    Ok(v) => v,
                    Err(message) => return self.throw(message, span),
                };
                if matches!(condition, Value::Bool(true)) {
                    return Value::Void;
                }
                let exc = VanillaObject::exception("Assertion is untrue", span.to_string());
                if let ObjectKind::Exception(map) = &exc.kind {
                    let mut map = map.borrow_mut();
                    map.insert(Symbol::intern("left"), crate::object::Slot::from_value(&lhs_value));
                    map.insert(Symbol::intern("operator"), crate::object::Slot::from_value(&Value::string(ops::binop_symbol(*op))));
                    map.insert(Symbol::intern("right"), crate::object::Slot::from_value(&rhs_value));
                }
                self.basket.add(exc.clone());
                return Value::FlowControl(Box::new(FlowControl::Throw(Value::Object(exc))));
            }
        }
        let condition = self.eval_expr(arg, scope);
        if condition.is_flow_control() {
            return condition;
        }
        if matches!(condition, Value::Bool(true)) {
            Value::Void
        } else {
            self.throw("Assertion is untrue", span)
        }
    }

    fn eval_print(&mut self, args: &[Expr], scope: &Scope) -> Value {
        let values = match self.eval_args(args, scope) {
            Ok(v) => v,
            Err(flow) => return flow,
        };
        let text: String = values.iter().map(|v| v.display_string()).collect();
        self.output.print(&text);
        Value::Void
    }

    fn eval_string_builtin(&mut self, args: &[Expr], scope: &Scope) -> Value {
        let values = match self.eval_args(args, scope) {
            Ok(v) => v,
            Err(flow) => return flow,
        };
        Value::string(values.iter().map(|v| v.display_string()).collect::<String>())
    }

    /// `type(value)` / `type.of(value)` (§4.5.6): the runtime type name.
    fn eval_type_builtin(&mut self, args: &[Expr], span: escr_util::Span, scope: &Scope) -> Value {
        let Some(arg) = args.first() else {
            return self.throw("'type' takes exactly one argument", span);
        };
        let value = self.eval_expr(arg, scope);
        if value.is_flow_control() {
            return value;
        }
        Value::string(value.deref_alias().type_name())
    }

    fn call_function(&mut self, def: Rc<crate::object::FunctionDef>, args: Vec<Value>) -> Value {
        let call_scope = def.closure.child();
        self.bind_params(&def.params, args, &call_scope);
        let result = self.exec_stmt(&def.body, &call_scope);
        match as_flow(&result) {
            Some(FlowControl::Return(v)) => v.clone(),
            Some(FlowControl::Throw(_)) => result,
            _ => Value::Void,
        }
    }

    fn start_generator(&mut self, def: Rc<crate::object::FunctionDef>, args: Vec<Value>) -> Value {
        let call_scope = def.closure.child();
        self.bind_params(&def.params, args, &call_scope);
        let state = GeneratorState::new(def.body.clone(), call_scope);
        let obj = VanillaObject::generator(state);
        self.basket.add(obj.clone());
        Value::Object(obj)
    }

    fn bind_params(&mut self, params: &[ast::Param], args: Vec<Value>, scope: &Scope) {
        let mut positional = args.into_iter();
        for param in params {
            let value = positional.next().unwrap_or(Value::Null);
            scope.declare(param.name, value);
        }
    }

    /// Resumes a generator by one step (§4.5.5). A finished generator keeps
    /// returning `Void`, matching "falling off the end implicitly returns
    /// Void; subsequent resumes return Void" verbatim.
    fn call_generator(&mut self, gen_object: &Rc<VanillaObject>, span: escr_util::Span) -> Value {
        let ObjectKind::Generator(state_cell) = &gen_object.kind else {
            return self.throw("value is not a generator", span);
        };
        if state_cell.borrow().finished {
            return Value::Void;
        }
        let (body, scope_snapshot) = {
            let state = state_cell.borrow();
            (state.body.clone(), state.scope.clone())
        };
        let mut frames = std::mem::take(&mut state_cell.borrow_mut().frames);
        let outcome = self.coexecute_stmt(&body, &mut frames, 1, &scope_snapshot);
        let mut state = state_cell.borrow_mut();
        state.frames = frames;
        match outcome {
            Ok(CoResult::Yielded(v)) => v,
            Ok(CoResult::Done(v)) => {
                state.finished = true;
                match as_flow(&v) {
                    Some(FlowControl::Throw(_)) => v,
                    _ => Value::Void,
                }
            }
            Err(EvalError::CorruptedGeneratorState { expected }) => {
                state.finished = true;
                self.throw(format!("internal error: corrupted generator state (expected {expected})"), span)
            }
        }
    }

    // ---- resumable path (inside a generator body) --------------------------

    fn coexecute_stmt(&mut self, stmt: &Stmt, frames: &mut Vec<Frame>, cursor: usize, scope: &Scope) -> EvalResult<CoResult> {
        match &stmt.kind {
            StmtKind::Block(stmts) => self.coexecute_block(stmts, frames, cursor, &scope.child()),
            StmtKind::If { cond, then_branch, else_branch } => {
                let inner = scope.child();
                match self.eval_condition(cond, &inner) {
                    Ok(true) => self.coexecute_stmt(then_branch, frames, cursor, &inner),
                    Ok(false) => match else_branch {
                        Some(else_branch) => self.coexecute_stmt(else_branch, frames, cursor, &inner),
                        None => Ok(CoResult::Done(Value::Void)),
                    },
                    Err(flow) => Ok(CoResult::Done(flow)),
                }
            }
            StmtKind::Do { body, cond } => self.coexecute_do(body, cond, frames, cursor, scope),
            StmtKind::While { cond, body } => self.coexecute_while(cond, body, frames, cursor, scope),
            StmtKind::For { init, cond, step, body } => self.coexecute_for(init.as_deref(), cond, step.as_deref(), body, frames, cursor, scope),
            StmtKind::Switch { subject, clauses } => {
                let inner = scope.child();
                let subject_value = match self.eval_condition_value(subject, &inner) {
                    Ok(v) => v,
                    Err(flow) => return Ok(CoResult::Done(flow)),
                };
                match self.select_clause(clauses, &subject_value, &inner).cloned() {
                    Some(clause) => {
                        let outcome = self.coexecute_block(&clause.body, frames, cursor, &inner)?;
                        Ok(match outcome {
                            CoResult::Done(v) if matches!(as_flow(&v), Some(FlowControl::Break)) => CoResult::Done(Value::Void),
                            other => other,
                        })
                    }
                    None => Ok(CoResult::Done(Value::Void)),
                }
            }
            StmtKind::Try { body, catches, finally } => {
                let outcome = self.coexecute_stmt(body, frames, cursor, &scope.child())?;
                let mut outcome_value = match outcome {
                    CoResult::Yielded(v) => return Ok(CoResult::Yielded(v)),
                    CoResult::Done(v) => v,
                };
                if let Some(FlowControl::Throw(exc)) = as_flow(&outcome_value) {
                    let exc = exc.clone();
                    if let Some(catch) = catches.first() {
                        let catch_scope = scope.child();
                        catch_scope.declare(catch.name, exc);
                        frames.truncate(cursor);
                        match self.coexecute_stmt(&catch.body, frames, cursor, &catch_scope)? {
                            CoResult::Yielded(v) => return Ok(CoResult::Yielded(v)),
                            CoResult::Done(v) => outcome_value = v,
                        }
                    }
                }
                if let Some(finally) = finally {
                    frames.truncate(cursor);
                    match self.coexecute_stmt(finally, frames, cursor, &scope.child())? {
                        CoResult::Yielded(v) => return Ok(CoResult::Yielded(v)),
                        CoResult::Done(v) if v.is_flow_control() => return Ok(CoResult::Done(v)),
                        CoResult::Done(_) => {}
                    }
                }
                Ok(CoResult::Done(outcome_value))
            }
            StmtKind::Yield(expr) => {
                let v = self.eval_expr(expr, scope);
                if v.is_flow_control() {
                    return Ok(CoResult::Done(v));
                }
                Ok(CoResult::Yielded(v))
            }
            // Everything else has no suspension points of its own.
            _ => Ok(CoResult::Done(self.exec_stmt(stmt, scope))),
        }
    }

    fn coexecute_block(&mut self, stmts: &[Stmt], frames: &mut Vec<Frame>, cursor: usize, scope: &Scope) -> EvalResult<CoResult> {
        let mut index = if cursor < frames.len() {
            match &frames[cursor] {
                Frame::Block { index } => *index,
                _ => return Err(EvalError::CorruptedGeneratorState { expected: "Block" }),
            }
        } else {
            frames.push(Frame::Block { index: 0 });
            0
        };
        loop {
            if index >= stmts.len() {
                frames.truncate(cursor);
                return Ok(CoResult::Done(Value::Void));
            }
            match self.coexecute_stmt(&stmts[index], frames, cursor + 1, scope)? {
                CoResult::Yielded(v) => {
                    frames[cursor] = Frame::Block { index };
                    return Ok(CoResult::Yielded(v));
                }
                CoResult::Done(v) if v.is_flow_control() => {
                    frames.truncate(cursor);
                    return Ok(CoResult::Done(v));
                }
                CoResult::Done(_) => index += 1,
            }
        }
    }

    fn coexecute_do(&mut self, body: &Stmt, cond: &Expr, frames: &mut Vec<Frame>, cursor: usize, scope: &Scope) -> EvalResult<CoResult> {
        let mut phase = if cursor < frames.len() {
            match &frames[cursor] {
                Frame::Do { phase } => *phase,
                _ => return Err(EvalError::CorruptedGeneratorState { expected: "Do" }),
            }
        } else {
            frames.push(Frame::Do { phase: DoPhase::Body });
            DoPhase::Body
        };
        loop {
            match phase {
                DoPhase::Body => match self.coexecute_stmt(body, frames, cursor + 1, scope)? {
                    CoResult::Yielded(v) => {
                        frames[cursor] = Frame::Do { phase: DoPhase::Body };
                        return Ok(CoResult::Yielded(v));
                    }
                    CoResult::Done(v) => match as_flow(&v) {
                        Some(FlowControl::Break) => {
                            frames.truncate(cursor);
                            return Ok(CoResult::Done(Value::Void));
                        }
                        Some(FlowControl::Continue) | None => {
                            phase = DoPhase::Cond;
                        }
                        _ => {
                            frames.truncate(cursor);
                            return Ok(CoResult::Done(v));
                        }
                    },
                },
                DoPhase::Cond => {
                    let test = self.eval_expr(cond, scope);
                    if test.is_flow_control() {
                        frames.truncate(cursor);
                        return Ok(CoResult::Done(test));
                    }
                    if matches!(test, Value::Bool(true)) {
                        phase = DoPhase::Body;
                        frames[cursor] = Frame::Do { phase };
                    } else {
                        frames.truncate(cursor);
                        return Ok(CoResult::Done(Value::Void));
                    }
                }
            }
        }
    }

    fn coexecute_while(&mut self, cond: &Condition, body: &Stmt, frames: &mut Vec<Frame>, cursor: usize, scope: &Scope) -> EvalResult<CoResult> {
        let mut inner = if cursor < frames.len() {
            match &frames[cursor] {
                Frame::While { scope } => scope.clone(),
                _ => return Err(EvalError::CorruptedGeneratorState { expected: "While" }),
            }
        } else {
            let inner = scope.child();
            let test = match self.eval_condition(cond, &inner) {
                Ok(v) => v,
                Err(flow) => return Ok(CoResult::Done(flow)),
            };
            if !test {
                return Ok(CoResult::Done(Value::Void));
            }
            frames.push(Frame::While { scope: inner.clone() });
            inner
        };
        loop {
            match self.coexecute_stmt(body, frames, cursor + 1, &inner)? {
                CoResult::Yielded(v) => {
                    frames[cursor] = Frame::While { scope: inner.clone() };
                    return Ok(CoResult::Yielded(v));
                }
                CoResult::Done(v) => match as_flow(&v) {
                    Some(FlowControl::Break) => {
                        frames.truncate(cursor);
                        return Ok(CoResult::Done(Value::Void));
                    }
                    Some(FlowControl::Continue) | None => {
                        let test = match self.eval_condition(cond, &inner) {
                            Ok(v) => v,
                            Err(flow) => {
                                frames.truncate(cursor);
                                return Ok(CoResult::Done(flow));
                            }
                        };
                        if !test {
                            frames.truncate(cursor);
                            return Ok(CoResult::Done(Value::Void));
                        }
                        inner = scope.child();
                        frames[cursor] = Frame::While { scope: inner.clone() };
                    }
                    _ => {
                        frames.truncate(cursor);
                        return Ok(CoResult::Done(v));
                    }
                },
            }
        }
    }

    fn coexecute_for(
        &mut self,
        init: Option<&Stmt>,
        cond: Option<&Expr>,
        step: Option<&Stmt>,
        body: &Stmt,
        frames: &mut Vec<Frame>,
        cursor: usize,
        scope: &Scope,
    ) -> EvalResult<CoResult> {
        let (mut phase, loop_scope) = if cursor < frames.len() {
            match &frames[cursor] {
                Frame::For { phase, scope } => (*phase, scope.clone()),
                _ => return Err(EvalError::CorruptedGeneratorState { expected: "For" }),
            }
        } else {
            let loop_scope = scope.child();
            if let Some(init) = init {
                let result = self.exec_stmt(init, &loop_scope);
                if result.is_flow_control() {
                    return Ok(CoResult::Done(result));
                }
            }
            frames.push(Frame::For { phase: ForPhase::Cond, scope: loop_scope.clone() });
            (ForPhase::Cond, loop_scope)
        };
        loop {
            match phase {
                ForPhase::Init => unreachable!("init only runs once, before a frame exists"),
                ForPhase::Cond => {
                    if let Some(cond) = cond {
                        let test = self.eval_expr(cond, &loop_scope);
                        if test.is_flow_control() {
                            frames.truncate(cursor);
                            return Ok(CoResult::Done(test));
                        }
                        if !matches!(test, Value::Bool(true)) {
                            frames.truncate(cursor);
                            return Ok(CoResult::Done(Value::Void));
                        }
                    }
                    phase = ForPhase::Body;
                    frames[cursor] = Frame::For { phase, scope: loop_scope.clone() };
                }
                ForPhase::Body => match self.coexecute_stmt(body, frames, cursor + 1, &loop_scope)? {
                    CoResult::Yielded(v) => {
                        frames[cursor] = Frame::For { phase: ForPhase::Body, scope: loop_scope.clone() };
                        return Ok(CoResult::Yielded(v));
                    }
                    CoResult::Done(v) => match as_flow(&v) {
                        Some(FlowControl::Break) => {
                            frames.truncate(cursor);
                            return Ok(CoResult::Done(Value::Void));
                        }
                        Some(FlowControl::Continue) | None => {
                            phase = ForPhase::Step;
                            frames[cursor] = Frame::For { phase, scope: loop_scope.clone() };
                        }
                        _ => {
                            frames.truncate(cursor);
                            return Ok(CoResult::Done(v));
                        }
                    },
                },
                ForPhase::Step => {
                    if let Some(step) = step {
                        let result = self.exec_stmt(step, &loop_scope);
                        if result.is_flow_control() {
                            frames.truncate(cursor);
                            return Ok(CoResult::Done(result));
                        }
                    }
                    phase = ForPhase::Cond;
                    frames[cursor] = Frame::For { phase, scope: loop_scope.clone() };
                }
            }
        }
    }
}

/// A dummy span for the few places (eager `foreach` draining of a
/// generator) that need one syntactically but have no call-site expression
/// of their own to attribute it to.
fn scope_unused_span() -> escr_util::Span {
    escr_util::Span::DUMMY
}
