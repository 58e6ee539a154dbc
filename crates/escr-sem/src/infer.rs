//! Small, non-unifying inference rules used by the preparer (§4.4).
//!
//! escr has no generics and no polymorphic functions, so there is nothing
//! here resembling Hindley-Milner unification: every expression's type
//! follows directly from its operator and its operands' already-known
//! types. This module is just the lookup tables for that.

use crate::types::{Assignability, Primitive, Type};

/// Result type of `+ - * / %` once both operands are known to be
/// `Arithmetic`: `float` is dominant, matching §4.5.3's numeric promotion.
pub fn arithmetic_result(lhs: &Type, rhs: &Type) -> Type {
    let float = Type::Primitive(Primitive::FLOAT);
    if *lhs == float || *rhs == float {
        float
    } else {
        Type::Primitive(Primitive::INT)
    }
}

/// `var x = expr;` takes the initializer's type verbatim, minus `Void`
/// (never a storable value) and minus `Null` when the declaration sits in a
/// position that already guarantees non-null (a guard binding).
pub fn infer_declared_type(initializer: &Type, strip_null: bool) -> Type {
    let stripped = initializer.without_void();
    if strip_null {
        stripped.without_null()
    } else {
        stripped
    }
}

/// Whether `value`'s type can be assigned into a slot of `target`, per the
/// §3.3 ladder, collapsed to a plain bool for call sites that don't need to
/// distinguish `Sometimes` from `Always` (most do and should match on
/// `Type::assignable_to` directly instead).
pub fn is_assignable(value: &Type, target: &Type) -> bool {
    value.assignable_to(target).is_ok() || matches!(value.assignable_to(target), Assignability::Sometimes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mixed_arithmetic_is_float_dominant() {
        let int = Type::Primitive(Primitive::INT);
        let float = Type::Primitive(Primitive::FLOAT);
        assert_eq!(arithmetic_result(&int, &float), float);
        assert_eq!(arithmetic_result(&int, &int), int);
    }

    #[test]
    fn declared_type_drops_void_always_and_null_when_guarded() {
        let nullable_string = Type::Primitive(Primitive::STRING | Primitive::NULL);
        assert_eq!(infer_declared_type(&nullable_string, false), nullable_string);
        assert_eq!(
            infer_declared_type(&nullable_string, true),
            Type::Primitive(Primitive::STRING)
        );
    }
}
