//! Arithmetic, bitwise and comparison operators with numeric promotion
//! (§4.5.3).
//!
//! Every function here takes already-evaluated, already-dereferenced
//! operands - aliasing (`Indirect`/`Pointer`) and short-circuiting are the
//! evaluator's job, not this module's. A `Result::Err` is a runtime
//! exception message; the evaluator wraps it into an `Exception` object
//! with the right source location and raises it as `FlowControl::Throw`.

use escr_par::ast::BinOp;

use crate::value::Value;

fn as_number(v: &Value) -> Option<Num> {
    match v {
        Value::Int(i) => Some(Num::Int(*i)),
        Value::Float(f) => Some(Num::Float(*f)),
        _ => None,
    }
}

enum Num {
    Int(i64),
    Float(f64),
}

/// `+ - * / %`: `int` wraps on overflow, `float` follows IEEE-754, and a
/// mix of the two promotes to `float` (§4.5.3).
pub fn arithmetic(op: BinOp, lhs: &Value, rhs: &Value) -> Result<Value, String> {
    let (Some(a), Some(b)) = (as_number(lhs), as_number(rhs)) else {
        return Err(format!("'{}' requires numeric operands", binop_symbol(op)));
    };
    match (a, b) {
        (Num::Int(a), Num::Int(b)) => int_arithmetic(op, a, b),
        (Num::Float(a), Num::Float(b)) => Ok(Value::Float(float_arithmetic(op, a, b))),
        (Num::Int(a), Num::Float(b)) => Ok(Value::Float(float_arithmetic(op, a as f64, b))),
        (Num::Float(a), Num::Int(b)) => Ok(Value::Float(float_arithmetic(op, a, b as f64))),
    }
}

fn int_arithmetic(op: BinOp, a: i64, b: i64) -> Result<Value, String> {
    let result = match op {
        BinOp::Add => a.wrapping_add(b),
        BinOp::Sub => a.wrapping_sub(b),
        BinOp::Mul => a.wrapping_mul(b),
        BinOp::Div => {
            if b == 0 {
                return Err("Divide by zero".to_string());
            }
            a.wrapping_div(b)
        }
        BinOp::Mod => {
            if b == 0 {
                return Err("Divide by zero".to_string());
            }
            a.wrapping_rem(b)
        }
        _ => unreachable!("int_arithmetic called with non-arithmetic op"),
    };
    Ok(Value::Int(result))
}

fn float_arithmetic(op: BinOp, a: f64, b: f64) -> f64 {
    match op {
        BinOp::Add => a + b,
        BinOp::Sub => a - b,
        BinOp::Mul => a * b,
        BinOp::Div => a / b,
        BinOp::Mod => a % b,
        _ => unreachable!("float_arithmetic called with non-arithmetic op"),
    }
}

/// `<< >> >>>`: `int`-only. `>>` is arithmetic (sign-extending), `>>>` is
/// logical (zero-filling) - the distinction escr surfaces as two operators
/// rather than one operator plus a signedness flag.
pub fn shift(op: BinOp, lhs: &Value, rhs: &Value) -> Result<Value, String> {
    let (Value::Int(a), Value::Int(b)) = (lhs, rhs) else {
        return Err(format!("'{}' requires 'int' operands", binop_symbol(op)));
    };
    let shift_amount = (*b).rem_euclid(64) as u32;
    let result = match op {
        BinOp::Shl => a.wrapping_shl(shift_amount),
        BinOp::Shr => a.wrapping_shr(shift_amount),
        BinOp::Shr3 => ((*a as u64).wrapping_shr(shift_amount)) as i64,
        _ => unreachable!("shift called with non-shift op"),
    };
    Ok(Value::Int(result))
}

/// `& | ^`: `bool x bool -> bool`, otherwise `int x int -> int` (§4.5.2's
/// compound-assignment table, reused verbatim for the plain binary form).
pub fn bitwise(op: BinOp, lhs: &Value, rhs: &Value) -> Result<Value, String> {
    match (lhs, rhs) {
        (Value::Bool(a), Value::Bool(b)) => Ok(Value::Bool(match op {
            BinOp::BitAnd => *a && *b,
            BinOp::BitOr => *a || *b,
            BinOp::BitXor => *a != *b,
            _ => unreachable!("bitwise called with non-bitwise op"),
        })),
        (Value::Int(a), Value::Int(b)) => Ok(Value::Int(match op {
            BinOp::BitAnd => a & b,
            BinOp::BitOr => a | b,
            BinOp::BitXor => a ^ b,
            _ => unreachable!("bitwise called with non-bitwise op"),
        })),
        _ => Err(format!("'{}' requires 'int' or 'bool' operands", binop_symbol(op))),
    }
}

/// `== != < <= > >=`. Equality defers to `Value::value_eq`; ordering is
/// only meaningful for numbers and strings.
pub fn compare(op: BinOp, lhs: &Value, rhs: &Value) -> Result<Value, String> {
    if matches!(op, BinOp::Eq) {
        return Ok(Value::Bool(lhs.value_eq(rhs)));
    }
    if matches!(op, BinOp::NotEq) {
        return Ok(Value::Bool(!lhs.value_eq(rhs)));
    }
    let ordering = match (as_number(lhs), as_number(rhs)) {
        (Some(a), Some(b)) => {
            let (a, b) = match (a, b) {
                (Num::Int(a), Num::Int(b)) => (a as f64, b as f64),
                (Num::Float(a), Num::Float(b)) => (a, b),
                (Num::Int(a), Num::Float(b)) => (a as f64, b),
                (Num::Float(a), Num::Int(b)) => (a, b as f64),
            };
            a.partial_cmp(&b)
        }
        _ => match (lhs, rhs) {
            (Value::String(a), Value::String(b)) => Some(a.as_str().cmp(b.as_str())),
            _ => None,
        },
    };
    let Some(ordering) = ordering else {
        return Err(format!("'{}' requires comparable operands", binop_symbol(op)));
    };
    let result = match op {
        BinOp::Lt => ordering.is_lt(),
        BinOp::LtEq => ordering.is_le(),
        BinOp::Gt => ordering.is_gt(),
        BinOp::GtEq => ordering.is_ge(),
        _ => unreachable!("compare called with non-comparison op"),
    };
    Ok(Value::Bool(result))
}

pub fn binop_symbol(op: BinOp) -> &'static str {
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn int_overflow_wraps() {
        let result = arithmetic(BinOp::Add, &Value::Int(i64::MAX), &Value::Int(1)).unwrap();
        assert!(matches!(result, Value::Int(i) if i == i64::MIN));
    }

    #[test]
    fn int_div_by_zero_is_an_error() {
        assert!(arithmetic(BinOp::Div, &Value::Int(1), &Value::Int(0)).is_err());
    }

    #[test]
    fn float_div_by_zero_is_infinity() {
        let result = arithmetic(BinOp::Div, &Value::Float(1.0), &Value::Float(0.0)).unwrap();
        assert!(matches!(result, Value::Float(f) if f.is_infinite() && f > 0.0));
    }

    #[test]
    fn mixed_int_float_promotes_to_float() {
        let result = arithmetic(BinOp::Add, &Value::Int(1), &Value::Float(0.5)).unwrap();
        assert!(matches!(result, Value::Float(f) if f == 1.5));
    }

    #[test]
    fn logical_shift_right_is_zero_filling() {
        let result = shift(BinOp::Shr3, &Value::Int(-1), &Value::Int(60)).unwrap();
        assert!(matches!(result, Value::Int(i) if i == 0b1111));
    }

    #[test]
    fn string_equality_is_by_bytes() {
        let a = Value::string("abc");
        let b = Value::string("abc");
        assert!(matches!(compare(BinOp::Eq, &a, &b).unwrap(), Value::Bool(true)));
    }

    #[test]
    fn int_equals_float_numerically() {
        let result = compare(BinOp::Eq, &Value::Int(2), &Value::Float(2.0)).unwrap();
        assert!(matches!(result, Value::Bool(true)));
    }
}
