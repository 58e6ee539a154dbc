//! The type algebra (§3.3).
//!
//! Types are immutable and compared structurally: a primitive flag set
//! (`Void | Null | Bool | Int | Float | String | Object | Any`), pointers
//! over a target with a modifiability set, and function signatures.
//! Generators don't get their own representation — a generator is a
//! `Function` marked `is_generator` whose return type is `Void | Y`.

use escr_util::Symbol;
use std::fmt;
use std::ops::{BitOr, BitOrAssign};

/// A set of primitive type flags. `Int | Float` is the union written
/// `int|float` in source; `Primitive::NONE` is the empty union (the type of
/// an expression that can never produce a value, e.g. a bare `throw`).
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Primitive(u8);

impl Primitive {
    pub const NONE: Primitive = Primitive(0);
    pub const VOID: Primitive = Primitive(1 << 0);
    pub const NULL: Primitive = Primitive(1 << 1);
    pub const BOOL: Primitive = Primitive(1 << 2);
    pub const INT: Primitive = Primitive(1 << 3);
    pub const FLOAT: Primitive = Primitive(1 << 4);
    pub const STRING: Primitive = Primitive(1 << 5);
    pub const OBJECT: Primitive = Primitive(1 << 6);
    pub const ANY: Primitive = Primitive(1 << 7);

    /// `Int|Float`, the set of types `+`, `-`, `*`, `/` accept.
    pub const ARITHMETIC: Primitive = Primitive(Self::INT.0 | Self::FLOAT.0);
    /// `Any|Null`, used by the `??` check ("can the left side ever be null").
    pub const ANY_Q: Primitive = Primitive(Self::ANY.0 | Self::NULL.0);

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn contains(self, other: Primitive) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn intersects(self, other: Primitive) -> bool {
        self.0 & other.0 != 0
    }

    pub fn intersection(self, other: Primitive) -> Primitive {
        Primitive(self.0 & other.0)
    }

    /// True if every flag set in `self` is also set in `other`.
    pub fn is_subset_of(self, other: Primitive) -> bool {
        self.0 & !other.0 == 0
    }

    fn flag_names(self) -> Vec<&'static str> {
        let table: [(Primitive, &str); 8] = [
            (Primitive::VOID, "void"),
            (Primitive::NULL, "null"),
            (Primitive::BOOL, "bool"),
            (Primitive::INT, "int"),
            (Primitive::FLOAT, "float"),
            (Primitive::STRING, "string"),
            (Primitive::OBJECT, "object"),
            (Primitive::ANY, "any"),
        ];
        table
            .into_iter()
            .filter(|(flag, _)| self.contains(*flag))
            .map(|(_, name)| name)
            .collect()
    }
}

impl BitOr for Primitive {
    type Output = Primitive;
    fn bitor(self, rhs: Primitive) -> Primitive {
        Primitive(self.0 | rhs.0)
    }
}

impl BitOrAssign for Primitive {
    fn bitor_assign(&mut self, rhs: Primitive) {
        self.0 |= rhs.0;
    }
}

impl fmt::Display for Primitive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return write!(f, "none");
        }
        write!(f, "{}", self.flag_names().join("|"))
    }
}

impl fmt::Debug for Primitive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Primitive({self})")
    }
}

/// Capabilities a pointer was declared with: `*p` needs only `Read`, binding
/// a new target needs `Write`, mutating through `p` (`p.field = x`) needs
/// `Mutate`.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Modifiability(u8);

impl Modifiability {
    pub const NONE: Modifiability = Modifiability(0);
    pub const READ: Modifiability = Modifiability(1 << 0);
    pub const WRITE: Modifiability = Modifiability(1 << 1);
    pub const MUTATE: Modifiability = Modifiability(1 << 2);
    pub const ALL: Modifiability = Modifiability(Self::READ.0 | Self::WRITE.0 | Self::MUTATE.0);

    pub fn contains(self, other: Modifiability) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn is_subset_of(self, other: Modifiability) -> bool {
        self.0 & !other.0 == 0
    }
}

impl BitOr for Modifiability {
    type Output = Modifiability;
    fn bitor(self, rhs: Modifiability) -> Modifiability {
        Modifiability(self.0 | rhs.0)
    }
}

impl fmt::Debug for Modifiability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::new();
        if self.contains(Modifiability::READ) {
            parts.push("read");
        }
        if self.contains(Modifiability::WRITE) {
            parts.push("write");
        }
        if self.contains(Modifiability::MUTATE) {
            parts.push("mutate");
        }
        write!(f, "{}", parts.join("+"))
    }
}

/// Flags on one function parameter.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ParamFlags(u8);

impl ParamFlags {
    pub const NONE: ParamFlags = ParamFlags(0);
    pub const REQUIRED: ParamFlags = ParamFlags(1 << 0);
    /// The parameter soaks up any trailing arguments into an array (`...`).
    pub const VARIADIC: ParamFlags = ParamFlags(1 << 1);
    /// The argument must be a `Predicate` expression (see `ast::ExprKind::Predicate`).
    pub const PREDICATE: ParamFlags = ParamFlags(1 << 2);

    pub fn contains(self, other: ParamFlags) -> bool {
        self.0 & other.0 == other.0
    }
}

impl BitOr for ParamFlags {
    type Output = ParamFlags;
    fn bitor(self, rhs: ParamFlags) -> ParamFlags {
        ParamFlags(self.0 | rhs.0)
    }
}

impl fmt::Debug for ParamFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::new();
        if self.contains(ParamFlags::REQUIRED) {
            parts.push("required");
        }
        if self.contains(ParamFlags::VARIADIC) {
            parts.push("variadic");
        }
        if self.contains(ParamFlags::PREDICATE) {
            parts.push("predicate");
        }
        write!(f, "{}", parts.join("+"))
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Param {
    pub name: Symbol,
    pub ty: Type,
    pub flags: ParamFlags,
}

#[derive(Clone, Debug, PartialEq)]
pub struct FunctionType {
    pub return_type: Type,
    pub params: Vec<Param>,
    /// True for the `(Void|Y)()` shape a generator's declared type takes
    /// (§3.3); `yield_type` then holds `Y` for `iterable()`.
    pub is_generator: bool,
    pub yield_type: Option<Box<Type>>,
}

/// One escr type. Compared structurally (`#[derive(PartialEq)]`), never by
/// identity — there is no nominal typing in this language.
#[derive(Clone, Debug, PartialEq)]
pub enum Type {
    Primitive(Primitive),
    Pointer(Box<Type>, Modifiability),
    Function(Box<FunctionType>),
}

impl Type {
    pub const VOID: Type = Type::Primitive(Primitive::VOID);
    pub const NULL: Type = Type::Primitive(Primitive::NULL);
    pub const BOOL: Type = Type::Primitive(Primitive::BOOL);
    pub const INT: Type = Type::Primitive(Primitive::INT);
    pub const FLOAT: Type = Type::Primitive(Primitive::FLOAT);
    pub const STRING: Type = Type::Primitive(Primitive::STRING);
    pub const OBJECT: Type = Type::Primitive(Primitive::OBJECT);
    pub const ANY: Type = Type::Primitive(Primitive::ANY);
    pub const ARITHMETIC: Type = Type::Primitive(Primitive::ARITHMETIC);
    pub const ANY_Q: Type = Type::Primitive(Primitive::ANY_Q);

    pub fn union(&self, other: &Type) -> Type {
        match (self, other) {
            (Type::Primitive(a), Type::Primitive(b)) => Type::Primitive(*a | *b),
            _ => self.clone(),
        }
    }

    pub fn generator(yield_type: Type) -> Type {
        let return_type = Type::VOID.union(&yield_type);
        Type::Function(Box::new(FunctionType {
            return_type,
            params: Vec::new(),
            is_generator: true,
            yield_type: Some(Box::new(yield_type)),
        }))
    }

    pub fn function(return_type: Type, params: Vec<Param>) -> Type {
        Type::Function(Box::new(FunctionType {
            return_type,
            params,
            is_generator: false,
            yield_type: None,
        }))
    }

    fn primitive(&self) -> Primitive {
        match self {
            Type::Primitive(p) => *p,
            _ => Primitive::NONE,
        }
    }

    /// Strip `Void` out of a union — a declared variable's type never
    /// carries it, even when inferred from a void-returning call (§4.4).
    pub fn without_void(&self) -> Type {
        match self {
            Type::Primitive(p) => Type::Primitive(Primitive(p.0 & !Primitive::VOID.0)),
            other => other.clone(),
        }
    }

    /// Strip `Null` too, for a declaration whose initializer was narrowed by
    /// a guard (`if (T x = expr)`).
    pub fn without_null(&self) -> Type {
        match self {
            Type::Primitive(p) => Type::Primitive(Primitive(p.0 & !Primitive::NULL.0)),
            other => other.clone(),
        }
    }

    pub fn can_be_null(&self) -> bool {
        matches!(self, Type::Primitive(p) if p.intersects(Primitive::NULL | Primitive::ANY))
    }

    pub fn callable(&self) -> bool {
        matches!(self, Type::Function(_))
    }

    pub fn as_function(&self) -> Option<&FunctionType> {
        match self {
            Type::Function(f) => Some(f),
            _ => None,
        }
    }

    pub fn pointable(&self) -> bool {
        matches!(self, Type::Pointer(_, _))
    }

    pub fn deref_target(&self) -> Option<&Type> {
        match self {
            Type::Pointer(inner, _) => Some(inner),
            _ => None,
        }
    }

    pub fn indexable(&self) -> bool {
        self.primitive().intersects(Primitive::STRING | Primitive::OBJECT | Primitive::ANY)
    }

    /// escr objects are dynamic dictionaries: any property name is legal on
    /// `Object` or `Any`. A closed (named) record type would instead check
    /// `property` against its declared fields; escr has no such types today.
    pub fn dotable(&self, _property: Symbol) -> bool {
        self.primitive().intersects(Primitive::OBJECT | Primitive::ANY) || self.callable()
    }

    pub fn iterable(&self) -> bool {
        if let Type::Function(f) = self {
            return f.is_generator;
        }
        self.primitive().intersects(Primitive::OBJECT | Primitive::ANY)
    }

    pub fn iterated_element(&self) -> Option<Type> {
        match self {
            Type::Function(f) if f.is_generator => f.yield_type.as_deref().cloned(),
            Type::Primitive(p) if p.intersects(Primitive::OBJECT | Primitive::ANY) => Some(Type::ANY),
            _ => None,
        }
    }

    /// §3.3's assignability ladder.
    pub fn assignable_to(&self, target: &Type) -> Assignability {
        if self == target {
            return Assignability::Always;
        }
        match (self, target) {
            (Type::Primitive(from), Type::Primitive(to)) => {
                if from.is_subset_of(*to) {
                    Assignability::Always
                } else if *from == Primitive::INT && to.contains(Primitive::FLOAT) {
                    Assignability::Always
                } else if from.intersects(*to) {
                    Assignability::Sometimes
                } else {
                    Assignability::Never
                }
            }
            (Type::Pointer(from_inner, from_mod), Type::Pointer(to_inner, to_mod)) => {
                if from_inner == to_inner && to_mod.is_subset_of(*from_mod) {
                    Assignability::Always
                } else {
                    Assignability::Never
                }
            }
            _ => Assignability::Never,
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Primitive(p) => write!(f, "{p}"),
            Type::Pointer(inner, _) => write!(f, "{inner}*"),
            Type::Function(func) if func.is_generator => {
                write!(f, "{}...", func.yield_type.as_deref().unwrap_or(&Type::VOID))
            }
            Type::Function(func) => {
                write!(f, "{}(", func.return_type)?;
                for (i, param) in func.params.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", param.ty)?;
                }
                write!(f, ")")
            }
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Assignability {
    Never,
    Sometimes,
    Always,
}

impl Assignability {
    pub fn is_ok(self) -> bool {
        !matches!(self, Assignability::Never)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_type_is_always_assignable() {
        assert_eq!(Type::INT.assignable_to(&Type::INT), Assignability::Always);
    }

    #[test]
    fn subset_union_is_always_assignable() {
        let int_or_float = Type::Primitive(Primitive::INT | Primitive::FLOAT);
        assert_eq!(Type::INT.assignable_to(&int_or_float), Assignability::Always);
    }

    #[test]
    fn int_widens_to_float() {
        assert_eq!(Type::INT.assignable_to(&Type::FLOAT), Assignability::Always);
    }

    #[test]
    fn intersecting_unions_are_sometimes() {
        let int_or_string = Type::Primitive(Primitive::INT | Primitive::STRING);
        let int_or_bool = Type::Primitive(Primitive::INT | Primitive::BOOL);
        assert_eq!(int_or_string.assignable_to(&int_or_bool), Assignability::Sometimes);
    }

    #[test]
    fn disjoint_types_are_never_assignable() {
        assert_eq!(Type::STRING.assignable_to(&Type::BOOL), Assignability::Never);
    }

    #[test]
    fn generator_is_callable_and_iterable_over_yield_type() {
        let gen = Type::generator(Type::INT);
        assert!(gen.callable());
        assert!(gen.iterable());
        assert_eq!(gen.iterated_element(), Some(Type::INT));
    }

    #[test]
    fn pointer_loses_capability_but_not_target() {
        let rw = Type::Pointer(Box::new(Type::INT), Modifiability::READ | Modifiability::WRITE);
        let ro = Type::Pointer(Box::new(Type::INT), Modifiability::READ);
        assert_eq!(rw.assignable_to(&ro), Assignability::Always);
        assert_eq!(ro.assignable_to(&rw), Assignability::Never);
    }

    #[test]
    fn any_q_admits_null() {
        assert!(Type::NULL.assignable_to(&Type::ANY_Q).is_ok());
    }

    #[test]
    fn without_void_strips_only_void() {
        let ty = Type::Primitive(Primitive::VOID | Primitive::INT);
        assert_eq!(ty.without_void(), Type::INT);
    }
}
