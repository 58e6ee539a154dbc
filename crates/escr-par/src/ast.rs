//! The syntax tree (§3.5). Every node carries its span; expression nodes
//! also carry a [`NodeId`] so the preparer can key a resolved-type side
//! table without this crate depending on `escr-sem`.

use escr_util::{Span, Symbol};

#[derive(Clone, Debug, PartialEq)]
pub struct Program {
    pub statements: Vec<Stmt>,
    pub span: Span,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Stmt {
    pub kind: StmtKind,
    pub span: Span,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Param {
    pub ty: TypeRef,
    pub name: Symbol,
    pub span: Span,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Catch {
    pub ty: TypeRef,
    pub name: Symbol,
    pub body: Box<Stmt>,
    pub span: Span,
}

#[derive(Clone, Debug, PartialEq)]
pub enum CaseLabel {
    Case(Expr),
    Default,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Clause {
    pub labels: Vec<CaseLabel>,
    pub body: Vec<Stmt>,
    pub span: Span,
}

/// The condition slot of `if`/`while`/`switch`: either a plain expression or
/// a guard `type id = expr` that narrows and binds `id` when non-null.
#[derive(Clone, Debug, PartialEq)]
pub enum Condition {
    Expr(Expr),
    Guard {
        ty: TypeRef,
        name: Symbol,
        init: Expr,
    },
}

#[derive(Clone, Debug, PartialEq)]
pub enum StmtKind {
    Block(Vec<Stmt>),
    /// `type id (= expr)?;` or `var id = expr;` (`ty == None` for `var`).
    Declare {
        ty: Option<TypeRef>,
        name: Symbol,
        init: Option<Expr>,
    },
    Assign {
        target: Expr,
        value: Expr,
    },
    /// A compound assignment (`+=`, `-=`, ...) or `++`/`--`, desugared to
    /// `target = target op value` by the preparer.
    Mutate {
        target: Expr,
        op: BinOp,
        value: Expr,
    },
    Break,
    Continue,
    Do {
        body: Box<Stmt>,
        cond: Expr,
    },
    While {
        cond: Condition,
        body: Box<Stmt>,
    },
    If {
        cond: Condition,
        then_branch: Box<Stmt>,
        else_branch: Option<Box<Stmt>>,
    },
    For {
        init: Option<Box<Stmt>>,
        cond: Option<Expr>,
        step: Option<Box<Stmt>>,
        body: Box<Stmt>,
    },
    ForEach {
        ty: Option<TypeRef>,
        name: Symbol,
        iter: Expr,
        body: Box<Stmt>,
    },
    FunctionDef {
        ret: TypeRef,
        name: Symbol,
        params: Vec<Param>,
        body: Box<Stmt>,
    },
    GeneratorDef {
        yield_ty: TypeRef,
        name: Symbol,
        params: Vec<Param>,
        body: Box<Stmt>,
    },
    Return(Option<Expr>),
    Switch {
        subject: Condition,
        clauses: Vec<Clause>,
    },
    Throw(Expr),
    Try {
        body: Box<Stmt>,
        catches: Vec<Catch>,
        finally: Option<Box<Stmt>>,
    },
    Yield(Expr),
    TypeDef {
        name: Symbol,
        ty: TypeRef,
    },
    Expr(Expr),
}

/// An expression node. The preparer does not mutate this tree in place —
/// since `escr-sem` depends on `escr-par` and not the other way around, it
/// instead caches each node's resolved type in a side table keyed by
/// `NodeId` (see `escr-sem::analysis::TypeTable`), matching §3.5's "cached
/// result type for expressions" without a back-dependency.
#[derive(Clone, Debug, PartialEq)]
pub struct Expr {
    pub kind: ExprKind,
    pub span: Span,
    pub id: NodeId,
}

/// Identifies one AST node for the preparer's side tables (types, flags).
/// Assigned by the parser in a single increasing sequence as nodes are
/// built, so `NodeId` doubles as a dense index for a `Vec`-backed table.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(pub u32);

impl Expr {
    pub fn new(kind: ExprKind, span: Span, id: NodeId) -> Self {
        Self { kind, span, id }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum ExprKind {
    Ident(Symbol),
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(Symbol),
    Array(Vec<Expr>),
    Object(Vec<(Symbol, Expr)>),
    NamedArg(Symbol, Box<Expr>),
    Call {
        callee: Box<Expr>,
        args: Vec<Expr>,
    },
    Index {
        target: Box<Expr>,
        index: Box<Expr>,
    },
    Dot {
        target: Box<Expr>,
        name: Symbol,
        optional: bool,
    },
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    Binary {
        op: BinOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Ternary {
        cond: Box<Expr>,
        then_expr: Box<Expr>,
        else_expr: Box<Expr>,
    },
    /// A binary comparison wrapped so the preparer can recognize it as a
    /// predicate for `assert`'s promotion rule (§4.5.6).
    Predicate(Box<Expr>),
    Cast {
        ty: TypeRef,
        expr: Box<Expr>,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UnaryOp {
    Not,
    AddressOf,
    Deref,
    Neg,
    BitNot,
    Spread,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Shl,
    Shr,
    Shr3,
    BitAnd,
    BitOr,
    BitXor,
    And,
    Or,
    NullCoalesce,
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
}

#[derive(Clone, Debug, PartialEq)]
pub struct TypeRef {
    pub kind: TypeRefKind,
    pub span: Span,
}

#[derive(Clone, Debug, PartialEq)]
pub enum TypeRefKind {
    Void,
    Bool,
    Int,
    Float,
    String,
    Object,
    Any,
    Var,
    Named(Symbol),
    Pointer(Box<TypeRef>),
    Nullable(Box<TypeRef>),
}
