//! The preparer (§4.4): a single walk over the AST that resolves every
//! expression's type into a [`TypeTable`], seeds the root symbol table with
//! the built-ins (§4.5.6), and enforces the type-checking contract table.

use crate::scope::{EntryKind, RibKind, ScopeTree};
use crate::types::{Modifiability, Param as TypeParam, ParamFlags, Primitive, Type};
use escr_par::ast::{
    self, BinOp, CaseLabel, Condition, Expr, ExprKind, NodeId, Program, Stmt, StmtKind, TypeRef, TypeRefKind, UnaryOp,
};
use escr_util::{Handler, Span, Symbol};

/// The preparer's result flags. Unlike `Primitive`/`Modifiability` in
/// [`crate::types`] these don't describe a *type*, they describe what
/// happened while walking one subtree.
#[derive(Clone, Copy, PartialEq, Eq, Default)]
pub struct Flags(u8);

impl Flags {
    pub const NONE: Flags = Flags(0);
    /// Control can still reach the statement following this one.
    pub const FALLTHROUGH: Flags = Flags(1 << 0);
    /// This expression is a compile-time literal.
    pub const CONSTANT: Flags = Flags(1 << 1);
    /// This expression is a comparison promoted for `assert` (§4.5.6).
    pub const PREDICATE: Flags = Flags(1 << 2);
    /// This function/call involves a variadic parameter.
    pub const VARIADIC: Flags = Flags(1 << 3);
    /// This subtree unconditionally diverges (return/throw/break/continue).
    pub const ABANDON: Flags = Flags(1 << 4);

    pub fn contains(self, other: Flags) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn union(self, other: Flags) -> Flags {
        Flags(self.0 | other.0)
    }
}

impl std::ops::BitOr for Flags {
    type Output = Flags;
    fn bitor(self, rhs: Flags) -> Flags {
        self.union(rhs)
    }
}

/// Per-node resolved types, keyed by `ast::NodeId`. `escr-par` doesn't (and
/// shouldn't) know about this table — see the doc comment on `ast::Expr`.
#[derive(Default)]
pub struct TypeTable(Vec<Option<Type>>);

impl TypeTable {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    fn set(&mut self, id: NodeId, ty: Type) {
        let idx = id.0 as usize;
        if self.0.len() <= idx {
            self.0.resize(idx + 1, None);
        }
        self.0[idx] = Some(ty);
    }

    pub fn get(&self, id: NodeId) -> Option<&Type> {
        self.0.get(id.0 as usize).and_then(|t| t.as_ref())
    }
}

fn type_ref_to_type(ty: &TypeRef) -> Type {
    match &ty.kind {
        TypeRefKind::Void => Type::VOID,
        TypeRefKind::Bool => Type::BOOL,
        TypeRefKind::Int => Type::INT,
        TypeRefKind::Float => Type::FLOAT,
        TypeRefKind::String => Type::STRING,
        TypeRefKind::Object => Type::OBJECT,
        TypeRefKind::Any => Type::ANY,
        TypeRefKind::Var => Type::ANY,
        TypeRefKind::Named(_) => Type::OBJECT,
        TypeRefKind::Pointer(inner) => Type::Pointer(Box::new(type_ref_to_type(inner)), Modifiability::ALL),
        TypeRefKind::Nullable(inner) => type_ref_to_type(inner).union(&Type::NULL),
    }
}

fn binop_symbol(op: BinOp) -> &'static str {
    match op {
        BinOp::Add => "+",
        BinOp::Sub => "-",
        BinOp::Mul => "*",
        BinOp::Div => "/",
        BinOp::Mod => "%",
        BinOp::Shl => "<<",
        BinOp::Shr => ">>",
        BinOp::Shr3 => ">>>",
        BinOp::BitAnd => "&",
        BinOp::BitOr => "|",
        BinOp::BitXor => "^",
        BinOp::And => "&&",
        BinOp::Or => "||",
        BinOp::NullCoalesce => "??",
        BinOp::Eq => "==",
        BinOp::NotEq => "!=",
        BinOp::Lt => "<",
        BinOp::LtEq => "<=",
        BinOp::Gt => ">",
        BinOp::GtEq => ">=",
    }
}

/// Tracks what kind of construct a function body is being prepared in, so
/// `return`/`yield` can be checked against the right type.
enum Enclosing {
    Function { return_type: Type },
    Generator { yield_type: Type },
}

pub struct Preparer<'a> {
    pub scope: ScopeTree,
    pub types: TypeTable,
    handler: &'a mut Handler,
    enclosing: Vec<Enclosing>,
    loop_depth: u32,
    switch_depth: u32,
}

impl<'a> Preparer<'a> {
    pub fn new(handler: &'a mut Handler) -> Self {
        let mut scope = ScopeTree::new();
        seed_builtins(&mut scope);
        Self {
            scope,
            types: TypeTable::new(),
            handler,
            enclosing: Vec::new(),
            loop_depth: 0,
            switch_depth: 0,
        }
    }

    fn error(&mut self, message: impl Into<String>, span: Span) {
        self.handler.error(message, span);
    }

    fn warning(&mut self, message: impl Into<String>, span: Span) {
        self.handler.warning(message, span);
    }

    pub fn prepare_program(&mut self, program: &Program) -> Flags {
        self.prepare_block(&program.statements)
    }

    /// Pre-scans the block for duplicate declarations and hoists function
    /// and generator signatures so forward calls within the same block
    /// type-check, then walks the statements in order.
    fn prepare_block(&mut self, stmts: &[Stmt]) -> Flags {
        self.hoist_definitions(stmts);

        let mut flags = Flags::FALLTHROUGH;
        let mut reported_unreachable = false;
        for stmt in stmts {
            if !flags.contains(Flags::FALLTHROUGH) && !reported_unreachable {
                self.warning("Unreachable code", stmt.span);
                reported_unreachable = true;
            }
            let stmt_flags = self.prepare_stmt(stmt);
            flags = if flags.contains(Flags::FALLTHROUGH) {
                stmt_flags
            } else {
                flags
            };
        }
        flags
    }

    fn hoist_definitions(&mut self, stmts: &[Stmt]) {
        for stmt in stmts {
            match &stmt.kind {
                StmtKind::FunctionDef { ret, name, params, .. } => {
                    let ty = self.function_signature(ret, params);
                    self.declare_checked(EntryKind::Readonly, *name, ty, stmt.span);
                }
                StmtKind::GeneratorDef { yield_ty, name, params, .. } => {
                    let yield_type = type_ref_to_type(yield_ty);
                    let ty = self.generator_signature(yield_type, params);
                    self.declare_checked(EntryKind::Readonly, *name, ty, stmt.span);
                }
                _ => {}
            }
        }
    }

    fn function_signature(&self, ret: &TypeRef, params: &[ast::Param]) -> Type {
        let return_type = type_ref_to_type(ret);
        let type_params = params
            .iter()
            .map(|p| TypeParam {
                name: p.name,
                ty: type_ref_to_type(&p.ty),
                flags: ParamFlags::REQUIRED,
            })
            .collect();
        Type::function(return_type, type_params)
    }

    fn generator_signature(&self, yield_type: Type, params: &[ast::Param]) -> Type {
        let mut ty = Type::generator(yield_type);
        if let Type::Function(f) = &mut ty {
            f.params = params
                .iter()
                .map(|p| TypeParam {
                    name: p.name,
                    ty: type_ref_to_type(&p.ty),
                    flags: ParamFlags::REQUIRED,
                })
                .collect();
        }
        ty
    }

    fn declare_checked(&mut self, kind: EntryKind, name: Symbol, ty: Type, span: Span) {
        if self.scope.shadows_outer(name) {
            self.warning(format!("declaration of '{name}' shadows an outer binding"), span);
        }
        let (_, conflict) = self.scope.declare(kind, name, ty, span);
        if let Some(conflict) = conflict {
            self.error(format!("duplicate declaration of '{name}'"), span);
            self.handler.warning("previous declaration was here", conflict.previous);
        }
    }

    fn prepare_stmt(&mut self, stmt: &Stmt) -> Flags {
        match &stmt.kind {
            StmtKind::Block(stmts) => {
                self.scope.enter_scope(RibKind::Block);
                let flags = self.prepare_block(stmts);
                self.scope.exit_scope();
                flags
            }
            StmtKind::Declare { ty, name, init } => self.prepare_declare(ty, *name, init, stmt.span),
            StmtKind::Assign { target, value } => {
                self.prepare_assign(target, value, stmt.span);
                Flags::FALLTHROUGH
            }
            StmtKind::Mutate { target, op, value } => {
                let target_ty = self.prepare_expr(target);
                let value_ty = self.prepare_expr(value);
                self.check_arithmetic_like(*op, &target_ty, &value_ty, stmt.span);
                Flags::FALLTHROUGH
            }
            StmtKind::Break => {
                if self.loop_depth == 0 && self.switch_depth == 0 {
                    self.error("'break' outside loop or switch", stmt.span);
                }
                Flags::ABANDON
            }
            StmtKind::Continue => {
                if self.loop_depth == 0 {
                    self.error("'continue' outside loop", stmt.span);
                }
                Flags::ABANDON
            }
            StmtKind::Do { body, cond } => {
                self.loop_depth += 1;
                self.prepare_stmt(body);
                self.loop_depth -= 1;
                self.prepare_condition_expr(cond, "do-while");
                Flags::FALLTHROUGH
            }
            StmtKind::While { cond, body } => {
                self.prepare_condition(cond, "while");
                self.loop_depth += 1;
                self.scope.enter_scope(RibKind::Loop);
                self.prepare_stmt(body);
                self.scope.exit_scope();
                self.loop_depth -= 1;
                Flags::FALLTHROUGH
            }
            StmtKind::If { cond, then_branch, else_branch } => {
                self.prepare_condition(cond, "if");
                self.scope.enter_scope(RibKind::Block);
                let then_flags = self.prepare_stmt(then_branch);
                self.scope.exit_scope();
                let else_flags = if let Some(else_branch) = else_branch {
                    self.scope.enter_scope(RibKind::Block);
                    let f = self.prepare_stmt(else_branch);
                    self.scope.exit_scope();
                    f
                } else {
                    Flags::FALLTHROUGH
                };
                if then_flags.contains(Flags::FALLTHROUGH) || else_flags.contains(Flags::FALLTHROUGH) {
                    Flags::FALLTHROUGH
                } else {
                    Flags::ABANDON
                }
            }
            StmtKind::For { init, cond, step, body } => {
                self.scope.enter_scope(RibKind::Loop);
                if let Some(init) = init {
                    self.prepare_stmt(init);
                }
                if let Some(cond) = cond {
                    self.prepare_condition_expr(cond, "for");
                }
                if let Some(step) = step {
                    self.prepare_stmt(step);
                }
                self.loop_depth += 1;
                self.prepare_stmt(body);
                self.loop_depth -= 1;
                self.scope.exit_scope();
                Flags::FALLTHROUGH
            }
            StmtKind::ForEach { ty, name, iter, body } => {
                let iter_ty = self.prepare_expr(iter);
                if !iter_ty.iterable() {
                    self.error(format!("'{iter_ty}' is not iterable"), iter.span);
                }
                let elem_ty = iter_ty.iterated_element().unwrap_or(Type::ANY);
                let declared_ty = ty.as_ref().map(type_ref_to_type).unwrap_or(elem_ty);
                self.scope.enter_scope(RibKind::Loop);
                self.declare_checked(EntryKind::Readonly, *name, declared_ty, stmt.span);
                self.loop_depth += 1;
                self.prepare_stmt(body);
                self.loop_depth -= 1;
                self.scope.exit_scope();
                Flags::FALLTHROUGH
            }
            StmtKind::FunctionDef { ret, name, params, body } => {
                let return_type = type_ref_to_type(ret);
                self.enclosing.push(Enclosing::Function { return_type });
                self.scope.enter_scope(RibKind::Function);
                for param in params {
                    self.declare_checked(EntryKind::Readonly, param.name, type_ref_to_type(&param.ty), param.span);
                }
                self.prepare_stmt(body);
                self.scope.exit_scope();
                self.enclosing.pop();
                let _ = name;
                Flags::FALLTHROUGH
            }
            StmtKind::GeneratorDef { yield_ty, name, params, body } => {
                let yield_type = type_ref_to_type(yield_ty);
                self.enclosing.push(Enclosing::Generator { yield_type });
                self.scope.enter_scope(RibKind::Function);
                for param in params {
                    self.declare_checked(EntryKind::Readonly, param.name, type_ref_to_type(&param.ty), param.span);
                }
                self.prepare_stmt(body);
                self.scope.exit_scope();
                self.enclosing.pop();
                let _ = name;
                Flags::FALLTHROUGH
            }
            StmtKind::Return(value) => {
                let found = value.as_ref().map(|e| self.prepare_expr(e)).unwrap_or(Type::VOID);
                match self.enclosing.last() {
                    Some(Enclosing::Function { return_type }) => {
                        let return_type = return_type.clone();
                        if !found.assignable_to(&return_type).is_ok() {
                            self.error(
                                format!("{return_type} cannot be assigned a value of type {found}"),
                                stmt.span,
                            );
                        }
                    }
                    Some(Enclosing::Generator { .. }) => {
                        self.error("'return' with a value is not allowed in a generator", stmt.span);
                    }
                    None => self.error("'return' outside a function", stmt.span),
                }
                Flags::ABANDON
            }
            StmtKind::Switch { subject, clauses } => {
                self.prepare_condition(subject, "switch");
                self.switch_depth += 1;
                let mut any_default = false;
                let mut fallthrough = Flags::NONE;
                for clause in clauses {
                    self.scope.enter_scope(RibKind::Block);
                    for label in &clause.labels {
                        match label {
                            CaseLabel::Case(expr) => {
                                self.prepare_expr(expr);
                            }
                            CaseLabel::Default => {
                                if any_default {
                                    self.error("multiple 'default' clauses in 'switch'", clause.span);
                                }
                                any_default = true;
                            }
                        }
                    }
                    let clause_flags = self.prepare_block(&clause.body);
                    fallthrough = fallthrough.union(clause_flags);
                    self.scope.exit_scope();
                }
                self.switch_depth -= 1;
                if fallthrough.contains(Flags::FALLTHROUGH) || !any_default {
                    Flags::FALLTHROUGH
                } else {
                    Flags::ABANDON
                }
            }
            StmtKind::Throw(expr) => {
                self.prepare_expr(expr);
                Flags::ABANDON
            }
            StmtKind::Try { body, catches, finally } => {
                self.prepare_stmt(body);
                for catch in catches {
                    self.scope.enter_scope(RibKind::Block);
                    self.declare_checked(EntryKind::Readonly, catch.name, type_ref_to_type(&catch.ty), catch.span);
                    self.prepare_stmt(&catch.body);
                    self.scope.exit_scope();
                }
                if let Some(finally) = finally {
                    self.prepare_stmt(finally);
                }
                Flags::FALLTHROUGH
            }
            StmtKind::Yield(expr) => {
                let found = self.prepare_expr(expr);
                match self.enclosing.last() {
                    Some(Enclosing::Generator { yield_type }) => {
                        let yield_type = yield_type.clone();
                        if !found.assignable_to(&yield_type).is_ok() {
                            self.error(
                                format!("{yield_type} cannot be assigned a value of type {found}"),
                                stmt.span,
                            );
                        }
                    }
                    _ => self.error("'yield' outside a generator", stmt.span),
                }
                Flags::FALLTHROUGH
            }
            StmtKind::TypeDef { name, ty } => {
                self.declare_checked(EntryKind::Readonly, *name, type_ref_to_type(ty), stmt.span);
                Flags::FALLTHROUGH
            }
            StmtKind::Expr(expr) => {
                self.prepare_expr(expr);
                Flags::FALLTHROUGH
            }
        }
    }

    fn prepare_declare(&mut self, ty: &Option<TypeRef>, name: Symbol, init: &Option<Expr>, span: Span) -> Flags {
        let init_ty = init.as_ref().map(|e| self.prepare_expr(e));
        let declared = match (ty, &init_ty) {
            (Some(ty), Some(init_ty)) => {
                let declared = type_ref_to_type(ty);
                if !init_ty.assignable_to(&declared).is_ok() {
                    self.error(format!("Cannot initialize '{name}' of type '{declared}' with a value of type '{init_ty}'"), span);
                }
                declared
            }
            (Some(ty), None) => type_ref_to_type(ty),
            (None, Some(init_ty)) => init_ty.without_void(),
            (None, None) => {
                self.error("'var' declaration requires an initializer", span);
                Type::ANY
            }
        };
        self.declare_checked(EntryKind::ReadWrite, name, declared, span);
        Flags::FALLTHROUGH
    }

    fn prepare_assign(&mut self, target: &Expr, value: &Expr, span: Span) {
        let target_ty = self.prepare_expr(target);
        let value_ty = self.prepare_expr(value);
        if !value_ty.assignable_to(&target_ty).is_ok() {
            self.error(format!("{target_ty} cannot be assigned a value of type {value_ty}"), span);
        }
    }

    fn check_arithmetic_like(&mut self, op: BinOp, lhs: &Type, rhs: &Type, span: Span) {
        match op {
            BinOp::Add | BinOp::Sub | BinOp::Mul | BinOp::Div | BinOp::Mod => {
                self.check_side(lhs, Primitive::ARITHMETIC, "'int' or 'float'", binop_symbol(op), "left", span);
                self.check_side(rhs, Primitive::ARITHMETIC, "'int' or 'float'", binop_symbol(op), "right", span);
            }
            BinOp::Shl | BinOp::Shr | BinOp::Shr3 => {
                self.check_side(lhs, Primitive::INT, "'int'", binop_symbol(op), "left", span);
                self.check_side(rhs, Primitive::INT, "'int'", binop_symbol(op), "right", span);
            }
            BinOp::BitAnd | BinOp::BitOr | BinOp::BitXor => {
                self.check_side(lhs, Primitive::INT | Primitive::BOOL, "'int' or 'bool'", binop_symbol(op), "left", span);
                self.check_side(rhs, Primitive::INT | Primitive::BOOL, "'int' or 'bool'", binop_symbol(op), "right", span);
            }
            _ => {}
        }
    }

    fn check_side(&mut self, ty: &Type, expected: Primitive, expected_name: &str, op: &str, side: &str, span: Span) {
        let ok = matches!(ty, Type::Primitive(p) if p.intersects(expected));
        if !ok {
            self.error(format!("Expected {side} of '{op}' to be {expected_name}"), span);
        }
    }

    fn prepare_condition(&mut self, cond: &Condition, construct: &str) {
        match cond {
            Condition::Expr(expr) => self.prepare_condition_expr(expr, construct),
            Condition::Guard { ty, name, init } => {
                let init_ty = self.prepare_expr(init);
                if !init_ty.can_be_null() {
                    self.warning(format!("guard '{name}' can never be null"), init.span);
                }
                let declared_ty = if matches!(ty.kind, TypeRefKind::Var) {
                    init_ty.without_void().without_null()
                } else {
                    type_ref_to_type(ty)
                };
                self.declare_checked(EntryKind::ReadWrite, *name, declared_ty, init.span);
            }
        }
    }

    fn prepare_condition_expr(&mut self, expr: &Expr, construct: &str) {
        let ty = self.prepare_expr(expr);
        if !matches!(ty, Type::Primitive(p) if p.contains(Primitive::BOOL)) {
            self.error(format!("Expected condition of '{construct}' to be 'bool'"), expr.span);
        }
        if matches!(expr.kind, ExprKind::Bool(_)) {
            self.warning(format!("Condition in '{construct}' statement is constant"), expr.span);
        }
    }

    fn prepare_expr(&mut self, expr: &Expr) -> Type {
        let ty = self.compute_expr_type(expr);
        self.types.set(expr.id, ty.clone());
        ty
    }

    fn compute_expr_type(&mut self, expr: &Expr) -> Type {
        match &expr.kind {
            ExprKind::Ident(name) => match self.scope.resolve(*name) {
                Some(def_id) => self.scope.entry(def_id).ty.clone(),
                None => {
                    self.error(format!("undefined name '{name}'"), expr.span);
                    Type::ANY
                }
            },
            ExprKind::Null => Type::NULL,
            ExprKind::Bool(_) => Type::BOOL,
            ExprKind::Int(_) => Type::INT,
            ExprKind::Float(_) => Type::FLOAT,
            ExprKind::Str(_) => Type::STRING,
            ExprKind::Array(items) => {
                for item in items {
                    self.prepare_expr(item);
                }
                Type::OBJECT
            }
            ExprKind::Object(fields) => {
                for (_, value) in fields {
                    self.prepare_expr(value);
                }
                Type::OBJECT
            }
            ExprKind::NamedArg(_, value) => self.prepare_expr(value),
            ExprKind::Call { callee, args } => self.prepare_call(callee, args, expr.span),
            ExprKind::Index { target, index } => self.prepare_index(target, index, expr.span),
            ExprKind::Dot { target, name, optional } => self.prepare_dot(target, *name, *optional, expr.span),
            ExprKind::Unary { op, operand } => self.prepare_unary(*op, operand, expr.span),
            ExprKind::Binary { op, lhs, rhs } => self.prepare_binary(*op, lhs, rhs, expr.span),
            ExprKind::Ternary { cond, then_expr, else_expr } => {
                self.prepare_condition_expr(cond, "ternary");
                let then_ty = self.prepare_expr(then_expr);
                let else_ty = self.prepare_expr(else_expr);
                then_ty.union(&else_ty)
            }
            ExprKind::Predicate(inner) => self.prepare_expr(inner),
            ExprKind::Cast { ty, expr: inner } => {
                self.prepare_expr(inner);
                type_ref_to_type(ty)
            }
        }
    }

    fn prepare_call(&mut self, callee: &Expr, args: &[Expr], span: Span) -> Type {
        let callee_ty = self.prepare_expr(callee);
        let arg_types: Vec<Type> = args.iter().map(|a| self.prepare_expr(a)).collect();

        if let ExprKind::Ident(name) = &callee.kind {
            if name.as_str() == "assert" {
                if let [arg] = args {
                    if !matches!(arg.kind, ExprKind::Predicate(_)) {
                        let arg_ty = &arg_types[0];
                        if !matches!(arg_ty, Type::Primitive(p) if p.contains(Primitive::BOOL)) {
                            self.error("Expected argument of 'assert' to be 'bool'", arg.span);
                        }
                    }
                } else {
                    self.error("'assert' takes exactly one argument", span);
                }
                return Type::VOID;
            }
        }

        if !callee_ty.callable() {
            self.error(format!("'{callee_ty}' is not callable"), callee.span);
            return Type::ANY;
        }
        callee_ty.as_function().map(|f| f.return_type.clone()).unwrap_or(Type::ANY)
    }

    fn prepare_index(&mut self, target: &Expr, index: &Expr, span: Span) -> Type {
        let target_ty = self.prepare_expr(target);
        let index_ty = self.prepare_expr(index);
        if !target_ty.indexable() {
            self.error(format!("'{target_ty}' is not indexable"), target.span);
            return Type::ANY;
        }
        let expects_string = matches!(&target_ty, Type::Primitive(p) if p.intersects(Primitive::STRING) && !p.intersects(Primitive::OBJECT | Primitive::ANY));
        if expects_string && !matches!(&index_ty, Type::Primitive(p) if p.contains(Primitive::INT)) {
            self.error("Expected index of string to be 'int'", span);
        }
        Type::ANY
    }

    fn prepare_dot(&mut self, target: &Expr, name: Symbol, optional: bool, span: Span) -> Type {
        let target_ty = self.prepare_expr(target);
        if !target_ty.dotable(name) {
            self.error(format!("'{target_ty}' is not dotable"), target.span);
            return Type::ANY;
        }
        let _ = (optional, span);
        Type::ANY
    }

    fn prepare_unary(&mut self, op: UnaryOp, operand: &Expr, span: Span) -> Type {
        let ty = self.prepare_expr(operand);
        match op {
            UnaryOp::Not => {
                if !matches!(&ty, Type::Primitive(p) if p.contains(Primitive::BOOL)) {
                    self.error("Expected operand of '!' to be 'bool'", span);
                }
                Type::BOOL
            }
            UnaryOp::BitNot => {
                if !matches!(&ty, Type::Primitive(p) if p.contains(Primitive::INT)) {
                    self.error("Expected operand of '~' to be 'int'", span);
                }
                Type::INT
            }
            UnaryOp::Neg => {
                if !matches!(&ty, Type::Primitive(p) if p.intersects(Primitive::ARITHMETIC)) {
                    self.error("Expected operand of unary '-' to be 'int' or 'float'", span);
                }
                ty
            }
            UnaryOp::Deref => {
                if !ty.pointable() {
                    self.error("Expected operand of '*' to be pointable", span);
                    return Type::ANY;
                }
                ty.deref_target().cloned().unwrap_or(Type::ANY)
            }
            UnaryOp::AddressOf => Type::Pointer(Box::new(ty), Modifiability::ALL),
            UnaryOp::Spread => ty,
        }
    }

    fn prepare_binary(&mut self, op: BinOp, lhs: &Expr, rhs: &Expr, span: Span) -> Type {
        let lhs_ty = self.prepare_expr(lhs);
        let rhs_ty = self.prepare_expr(rhs);
        match op {
            BinOp::And | BinOp::Or => {
                if !matches!(&lhs_ty, Type::Primitive(p) if p.contains(Primitive::BOOL)) {
                    self.error(format!("Expected left of '{}' to be 'bool'", binop_symbol(op)), lhs.span);
                }
                if !matches!(&rhs_ty, Type::Primitive(p) if p.contains(Primitive::BOOL)) {
                    self.error(format!("Expected right of '{}' to be 'bool'", binop_symbol(op)), rhs.span);
                }
                Type::BOOL
            }
            BinOp::Add | BinOp::Sub | BinOp::Mul | BinOp::Div | BinOp::Mod => {
                self.check_arithmetic_like(op, &lhs_ty, &rhs_ty, span);
                crate::infer::arithmetic_result(&lhs_ty, &rhs_ty)
            }
            BinOp::Shl | BinOp::Shr | BinOp::Shr3 => {
                self.check_arithmetic_like(op, &lhs_ty, &rhs_ty, span);
                Type::INT
            }
            BinOp::BitAnd | BinOp::BitOr | BinOp::BitXor => {
                self.check_arithmetic_like(op, &lhs_ty, &rhs_ty, span);
                if matches!((&lhs_ty, &rhs_ty), (Type::Primitive(a), Type::Primitive(b)) if a.contains(Primitive::BOOL) && b.contains(Primitive::BOOL))
                {
                    Type::BOOL
                } else {
                    Type::INT
                }
            }
            BinOp::NullCoalesce => {
                if !lhs_ty.can_be_null() {
                    self.warning("Expected left-hand side of '??' to be possibly 'null'", lhs.span);
                }
                lhs_ty.without_null().union(&rhs_ty)
            }
            BinOp::Eq | BinOp::NotEq | BinOp::Lt | BinOp::LtEq | BinOp::Gt | BinOp::GtEq => Type::BOOL,
        }
    }
}

fn seed_builtins(scope: &mut ScopeTree) {
    let print_ty = Type::function(
        Type::VOID,
        vec![TypeParam {
            name: Symbol::intern("args"),
            ty: Type::ANY,
            flags: ParamFlags::VARIADIC,
        }],
    );
    let _ = scope.declare(EntryKind::Builtin, Symbol::intern("print"), print_ty, Span::DUMMY);

    let assert_ty = Type::function(
        Type::VOID,
        vec![TypeParam {
            name: Symbol::intern("condition"),
            ty: Type::BOOL,
            flags: ParamFlags::REQUIRED,
        }],
    );
    let _ = scope.declare(EntryKind::Builtin, Symbol::intern("assert"), assert_ty, Span::DUMMY);

    let string_ty = Type::function(
        Type::STRING,
        vec![TypeParam {
            name: Symbol::intern("args"),
            ty: Type::ANY,
            flags: ParamFlags::VARIADIC,
        }],
    );
    let _ = scope.declare(EntryKind::Builtin, Symbol::intern("string"), string_ty, Span::DUMMY);

    let type_ty = Type::function(
        Type::STRING,
        vec![TypeParam {
            name: Symbol::intern("value"),
            ty: Type::ANY,
            flags: ParamFlags::REQUIRED,
        }],
    );
    let _ = scope.declare(EntryKind::Builtin, Symbol::intern("type"), type_ty, Span::DUMMY);
}

#[cfg(test)]
mod tests {
    use super::*;
    use escr_par::parse_program;
    use escr_util::FileId;

    fn prepare(src: &str) -> (Handler, Flags) {
        let mut parse_handler = Handler::new();
        let program = parse_program(src, FileId::DUMMY, &mut parse_handler).expect("parse ok");
        let mut handler = Handler::new();
        let mut preparer = Preparer::new(&mut handler);
        let flags = preparer.prepare_program(&program);
        (handler, flags)
    }

    #[test]
    fn hello_world_has_no_errors() {
        let (handler, _) = prepare(r#"print("hello");"#);
        assert!(!handler.has_errors());
    }

    #[test]
    fn type_mismatch_in_declaration_is_an_error() {
        let (handler, _) = prepare("int x = \"oops\";");
        assert!(handler.has_errors());
    }

    #[test]
    fn int_widens_into_float_declaration() {
        let (handler, _) = prepare("float x = 1;");
        assert!(!handler.has_errors());
    }

    #[test]
    fn logical_and_requires_bool_operands() {
        let (handler, _) = prepare("bool b = 1 && true;");
        assert!(handler.has_errors());
    }

    #[test]
    fn break_outside_loop_is_an_error() {
        let (handler, _) = prepare("break;");
        assert!(handler.has_errors());
    }

    #[test]
    fn break_inside_while_is_fine() {
        let (handler, _) = prepare("while (true) { break; }");
        assert!(!handler.has_errors());
    }

    #[test]
    fn unreachable_code_after_return_warns() {
        let (handler, _) = prepare("void f() { return; print(\"dead\"); }");
        assert!(handler.warning_count() > 0);
    }

    #[test]
    fn constant_if_condition_warns() {
        let (handler, _) = prepare("if (true) { print(\"x\"); }");
        assert!(handler.warning_count() > 0);
    }

    #[test]
    fn duplicate_declaration_in_same_block_errors() {
        let (handler, _) = prepare("int x = 1; int x = 2;");
        assert!(handler.has_errors());
    }

    #[test]
    fn shadowing_in_inner_block_only_warns() {
        let (handler, _) = prepare("int x = 1; { int x = 2; }");
        assert!(!handler.has_errors());
        assert!(handler.warning_count() > 0);
    }

    #[test]
    fn var_without_initializer_is_an_error() {
        let (handler, _) = prepare("var x;");
        assert!(handler.has_errors());
    }

    #[test]
    fn generator_yield_checks_element_type() {
        let (handler, _) = prepare("int...gen() { yield \"oops\"; }");
        assert!(handler.has_errors());
    }

    #[test]
    fn forward_reference_to_function_in_same_block_resolves() {
        let (handler, _) = prepare("void f() { g(); } void g() { }");
        assert!(!handler.has_errors());
    }
}
