//! Operator semantics on rvalues
//!
//! Arithmetic follows the usual arithmetic conversions, pointer arithmetic is
//! scaled by the pointee size. Operators that need memory (`*`, `&`, `[]`)
//! live in the interpreter.

use std::cmp::Ordering;

use super::ast::{BinOp, UnaryOp};
use super::error::EvalError;
use super::pointer::Pointer;
use super::scalar::Scalar;
use super::types::{QualType, ScalarKind, Type};
use super::value::Value;

fn invalid_operands(op: BinOp, lhs: &Value, rhs: &Value) -> EvalError {
    EvalError::invalid_operand(format!(
        "invalid operands to binary expression ('{}' and '{}') for '{}'",
        lhs.type_name(),
        rhs.type_name(),
        op.as_str()
    ))
}

fn invalid_argument(op: UnaryOp, value: &Value) -> EvalError {
    EvalError::invalid_operand(format!(
        "invalid argument type '{}' to unary expression '{}'",
        value.type_name(),
        op.as_str()
    ))
}

/// Contextual conversion to `bool`.
pub fn as_bool(value: &Value) -> Result<bool, EvalError> {
    match value {
        Value::Scalar(s) => Ok(s.as_bool()),
        Value::Pointer(p) => Ok(p.as_bool()),
        Value::Aggregate(_) => Err(EvalError::invalid_operand(format!(
            "value of type '{}' is not contextually convertible to 'bool'",
            value.type_name()
        ))),
        Value::Invalid => Err(EvalError::unknown("use of an invalid value")),
    }
}

pub fn unary(op: UnaryOp, value: Value) -> Result<Value, EvalError> {
    match op {
        UnaryOp::LogicalNot => Ok(Value::bool(!as_bool(&value)?)),
        UnaryOp::Plus => match value {
            Value::Scalar(s) => Ok(Value::Scalar(s.convert(s.kind().promote()))),
            Value::Pointer(_) => Ok(value),
            _ => Err(invalid_argument(op, &value)),
        },
        UnaryOp::Neg => match value {
            Value::Scalar(s) => {
                let kind = s.kind().promote();
                let negated = if kind.is_floating() {
                    Scalar::from_float(kind, -s.as_f64())
                } else {
                    Scalar::from_int(kind, s.convert(kind).as_i128().wrapping_neg())
                };
                Ok(Value::Scalar(negated))
            }
            _ => Err(invalid_argument(op, &value)),
        },
        UnaryOp::BitNot => match value {
            Value::Scalar(s) if s.kind().is_integral() => {
                let kind = s.kind().promote();
                Ok(Value::Scalar(Scalar::from_int(kind, !s.convert(kind).as_i128())))
            }
            _ => Err(invalid_argument(op, &value)),
        },
        UnaryOp::Deref | UnaryOp::AddressOf => Err(EvalError::not_implemented(format!(
            "unary '{}' on an rvalue",
            op.as_str()
        ))),
    }
}

pub fn binary(op: BinOp, lhs: Value, rhs: Value) -> Result<Value, EvalError> {
    if !lhs.is_valid() || !rhs.is_valid() {
        return Err(EvalError::unknown("use of an invalid value"));
    }

    match op {
        BinOp::Add => match (&lhs, &rhs) {
            (Value::Pointer(p), Value::Scalar(i)) | (Value::Scalar(i), Value::Pointer(p))
                if i.kind().is_integral() =>
            {
                Ok(Value::Pointer(p.add(i.as_i128() as i64)?))
            }
            (Value::Scalar(a), Value::Scalar(b)) => arithmetic(op, *a, *b),
            _ => Err(invalid_operands(op, &lhs, &rhs)),
        },
        BinOp::Sub => match (&lhs, &rhs) {
            (Value::Pointer(p), Value::Scalar(i)) if i.kind().is_integral() => {
                Ok(Value::Pointer(p.add((i.as_i128() as i64).wrapping_neg())?))
            }
            (Value::Pointer(a), Value::Pointer(b)) => {
                let elements = a.difference(b)?;
                Ok(Value::Scalar(Scalar::from_int(ScalarKind::Long, elements as i128)))
            }
            (Value::Scalar(a), Value::Scalar(b)) => arithmetic(op, *a, *b),
            _ => Err(invalid_operands(op, &lhs, &rhs)),
        },
        BinOp::Mul
        | BinOp::Div
        | BinOp::Rem
        | BinOp::BitAnd
        | BinOp::BitXor
        | BinOp::BitOr => match (&lhs, &rhs) {
            (Value::Scalar(a), Value::Scalar(b)) => arithmetic(op, *a, *b),
            _ => Err(invalid_operands(op, &lhs, &rhs)),
        },
        BinOp::Shl | BinOp::Shr => match (&lhs, &rhs) {
            (Value::Scalar(a), Value::Scalar(b))
                if a.kind().is_integral() && b.kind().is_integral() =>
            {
                shift(op, *a, *b)
            }
            _ => Err(invalid_operands(op, &lhs, &rhs)),
        },
        // both sides are pure reads, so both are evaluated
        BinOp::LogicalAnd => Ok(Value::bool(as_bool(&lhs)? && as_bool(&rhs)?)),
        BinOp::LogicalOr => Ok(Value::bool(as_bool(&lhs)? || as_bool(&rhs)?)),
        BinOp::Lt | BinOp::Le | BinOp::Gt | BinOp::Ge | BinOp::Eq | BinOp::Ne => {
            compare(op, &lhs, &rhs)
        }
        BinOp::Subscript => Err(EvalError::not_implemented(
            "subscript of an rvalue",
        )),
    }
}

fn arithmetic(op: BinOp, lhs: Scalar, rhs: Scalar) -> Result<Value, EvalError> {
    let kind = ScalarKind::common(lhs.kind(), rhs.kind());

    if kind.is_floating() {
        let (a, b) = (lhs.as_f64(), rhs.as_f64());
        let result = match op {
            BinOp::Add => a + b,
            BinOp::Sub => a - b,
            BinOp::Mul => a * b,
            BinOp::Div => a / b,
            _ => {
                return Err(invalid_operands(
                    op,
                    &Value::Scalar(lhs),
                    &Value::Scalar(rhs),
                ))
            }
        };
        return Ok(Value::Scalar(Scalar::from_float(kind, result)));
    }

    let (a, b) = (lhs.convert(kind).as_i128(), rhs.convert(kind).as_i128());
    let result = match op {
        BinOp::Add => a.wrapping_add(b),
        BinOp::Sub => a.wrapping_sub(b),
        BinOp::Mul => a.wrapping_mul(b),
        BinOp::Div | BinOp::Rem if b == 0 => {
            return Err(EvalError::unknown("division by zero"));
        }
        BinOp::Div => a / b,
        BinOp::Rem => a % b,
        BinOp::BitAnd => a & b,
        BinOp::BitXor => a ^ b,
        BinOp::BitOr => a | b,
        _ => return Err(EvalError::not_implemented(format!("operator '{}'", op.as_str()))),
    };
    Ok(Value::Scalar(Scalar::from_int(kind, result)))
}

fn shift(op: BinOp, lhs: Scalar, rhs: Scalar) -> Result<Value, EvalError> {
    let kind = lhs.kind().promote();
    let count = rhs.as_i128();
    if count < 0 || count >= kind.bit_width() as i128 {
        return Err(EvalError::unknown(format!(
            "shift count {} is out of range for '{}'",
            count, kind
        )));
    }
    let value = lhs.convert(kind).as_i128();
    let result = if op == BinOp::Shl {
        value << count
    } else {
        value >> count
    };
    Ok(Value::Scalar(Scalar::from_int(kind, result)))
}

fn compare(op: BinOp, lhs: &Value, rhs: &Value) -> Result<Value, EvalError> {
    let ordering = match (lhs, rhs) {
        (Value::Scalar(a), Value::Scalar(b)) => {
            let kind = ScalarKind::common(a.kind(), b.kind());
            if kind.is_floating() {
                a.as_f64().partial_cmp(&b.as_f64())
            } else {
                Some(a.convert(kind).as_i128().cmp(&b.convert(kind).as_i128()))
            }
        }
        (Value::Pointer(a), Value::Pointer(b)) => {
            let compatible = a.pointee().same_unqualified(b.pointee())
                || a.is_pointer_to_void()
                || b.is_pointer_to_void();
            if !compatible {
                return Err(EvalError::invalid_operand(format!(
                    "comparison of distinct pointer types ('{}' and '{}')",
                    lhs.type_name(),
                    rhs.type_name()
                )));
            }
            Some(a.addr().cmp(&b.addr()))
        }
        (Value::Pointer(p), Value::Scalar(s)) if s.kind().is_integral() => {
            Some(p.addr().cmp(&s.as_u64()))
        }
        (Value::Scalar(s), Value::Pointer(p)) if s.kind().is_integral() => {
            Some(s.as_u64().cmp(&p.addr()))
        }
        _ => return Err(invalid_operands(op, lhs, rhs)),
    };

    let result = match op {
        BinOp::Lt => ordering == Some(Ordering::Less),
        BinOp::Le => matches!(ordering, Some(Ordering::Less | Ordering::Equal)),
        BinOp::Gt => ordering == Some(Ordering::Greater),
        BinOp::Ge => matches!(ordering, Some(Ordering::Greater | Ordering::Equal)),
        BinOp::Eq => ordering == Some(Ordering::Equal),
        _ => ordering != Some(Ordering::Equal),
    };
    Ok(Value::bool(result))
}

/// C-style conversion of an rvalue to `target`.
pub fn cast(value: Value, target: &QualType) -> Result<Value, EvalError> {
    let invalid = |value: &Value| {
        EvalError::invalid_operand(format!(
            "cannot cast from type '{}' to '{}'",
            value.type_name(),
            target
        ))
    };

    match (&target.ty, &value) {
        (Type::Reference(_), _) => Err(EvalError::not_implemented(format!(
            "casts to reference type '{}' are not supported",
            target
        ))),
        (Type::Scalar(kind), Value::Scalar(s)) if !kind.is_void() => {
            Ok(Value::Scalar(s.convert(*kind)))
        }
        (Type::Scalar(kind), Value::Pointer(p)) if kind.is_integral() => {
            Ok(Value::Scalar(Scalar::from_int(*kind, p.addr() as i128)))
        }
        (Type::Pointer(pointee), Value::Pointer(p)) => {
            Ok(Value::Pointer(p.cast((**pointee).clone())))
        }
        (Type::Pointer(pointee), Value::Scalar(s)) if s.kind().is_integral() => Ok(
            Value::Pointer(Pointer::new(s.as_u64(), (**pointee).clone())),
        ),
        _ => Err(invalid(&value)),
    }
}

/// Converts the selected branch of a conditional to the common type of both
/// branches.
pub fn conditional_result(selected: Value, other: &QualType) -> Value {
    match (&selected, other.ty.as_scalar()) {
        (Value::Scalar(s), Some(kind)) if !kind.is_void() && kind != s.kind() => {
            Value::Scalar(s.convert(ScalarKind::common(s.kind(), kind)))
        }
        _ => selected,
    }
}

/// Static result type of a binary operator, mirroring [`binary`] without
/// touching values.
pub fn binary_type(op: BinOp, lhs: &QualType, rhs: &QualType) -> Result<QualType, EvalError> {
    let mismatch = || {
        EvalError::invalid_operand(format!(
            "invalid operands to binary expression ('{}' and '{}') for '{}'",
            lhs,
            rhs,
            op.as_str()
        ))
    };

    if op.is_comparison() || matches!(op, BinOp::LogicalAnd | BinOp::LogicalOr) {
        return Ok(QualType::scalar(ScalarKind::Bool));
    }
    match (&lhs.ty, &rhs.ty) {
        (Type::Scalar(a), Type::Scalar(b)) if !a.is_void() && !b.is_void() => {
            if matches!(op, BinOp::Shl | BinOp::Shr) {
                Ok(QualType::scalar(a.promote()))
            } else {
                Ok(QualType::scalar(ScalarKind::common(*a, *b)))
            }
        }
        (Type::Pointer(_), Type::Scalar(_)) if matches!(op, BinOp::Add | BinOp::Sub) => {
            Ok(lhs.unqualified())
        }
        (Type::Scalar(_), Type::Pointer(_)) if op == BinOp::Add => Ok(rhs.unqualified()),
        (Type::Pointer(_), Type::Pointer(_)) if op == BinOp::Sub => {
            Ok(QualType::scalar(ScalarKind::Long))
        }
        _ => Err(mismatch()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::error::EvalErrorCode;

    fn scalar(kind: ScalarKind, value: i128) -> Value {
        Value::Scalar(Scalar::from_int(kind, value))
    }

    fn int_ptr(addr: u64) -> Value {
        Value::Pointer(Pointer::new(addr, QualType::scalar(ScalarKind::Int)))
    }

    #[test]
    fn test_usual_arithmetic_conversions() {
        let result = binary(BinOp::Add, Value::int(-1), scalar(ScalarKind::UnsignedInt, 1)).unwrap();
        assert_eq!(result.type_name(), "unsigned int");
        assert_eq!(result.as_scalar().unwrap().as_i128(), 0);

        let result = binary(
            BinOp::Mul,
            scalar(ScalarKind::Char, 100),
            scalar(ScalarKind::Char, 100),
        )
        .unwrap();
        assert_eq!(result.type_name(), "int");
        assert_eq!(result.as_scalar().unwrap().as_i128(), 10000);

        let result = binary(
            BinOp::Div,
            Value::int(7),
            Value::Scalar(Scalar::from_float(ScalarKind::Double, 2.0)),
        )
        .unwrap();
        assert_eq!(result.as_scalar().unwrap().as_f64(), 3.5);
    }

    #[test]
    fn test_signed_unsigned_comparison() {
        let result = binary(BinOp::Lt, Value::int(-1), scalar(ScalarKind::UnsignedInt, 1)).unwrap();
        assert_eq!(result, Value::bool(false));
        let result = binary(BinOp::Lt, Value::int(-1), scalar(ScalarKind::Long, 1)).unwrap();
        assert_eq!(result, Value::bool(true));
    }

    #[test]
    fn test_integer_overflow_wraps() {
        let result = binary(BinOp::Add, Value::int(i32::MAX), Value::int(1)).unwrap();
        assert_eq!(result.as_scalar().unwrap().as_i128(), i32::MIN as i128);
        let result = unary(UnaryOp::Neg, scalar(ScalarKind::UnsignedInt, 1)).unwrap();
        assert_eq!(result.as_scalar().unwrap().as_i128(), u32::MAX as i128);
    }

    #[test]
    fn test_division_and_shift_errors() {
        let err = binary(BinOp::Div, Value::int(1), Value::int(0)).unwrap_err();
        assert_eq!(err.code(), EvalErrorCode::Unknown);
        let err = binary(BinOp::Rem, Value::int(1), Value::int(0)).unwrap_err();
        assert_eq!(err.code(), EvalErrorCode::Unknown);
        let err = binary(BinOp::Shl, Value::int(1), Value::int(32)).unwrap_err();
        assert_eq!(err.code(), EvalErrorCode::Unknown);

        let ok = binary(BinOp::Shl, Value::int(1), Value::int(31)).unwrap();
        assert_eq!(ok.as_scalar().unwrap().as_i128(), i32::MIN as i128);
        let ok = binary(BinOp::Shr, Value::int(-8), Value::int(1)).unwrap();
        assert_eq!(ok.as_scalar().unwrap().as_i128(), -4);
    }

    #[test]
    fn test_pointer_arithmetic() {
        let result = binary(BinOp::Add, int_ptr(0x1000), Value::int(3)).unwrap();
        assert_eq!(result.as_pointer().unwrap().addr(), 0x100c);
        let result = binary(BinOp::Add, Value::int(3), int_ptr(0x1000)).unwrap();
        assert_eq!(result.as_pointer().unwrap().addr(), 0x100c);
        let result = binary(BinOp::Sub, int_ptr(0x1000), Value::int(1)).unwrap();
        assert_eq!(result.as_pointer().unwrap().addr(), 0x0ffc);

        let diff = binary(BinOp::Sub, int_ptr(0x1010), int_ptr(0x1000)).unwrap();
        assert_eq!(diff.type_name(), "long");
        assert_eq!(diff.as_scalar().unwrap().as_i128(), 4);

        let err = binary(BinOp::Add, int_ptr(0x1000), int_ptr(0x1000)).unwrap_err();
        assert_eq!(err.code(), EvalErrorCode::InvalidOperandType);
    }

    #[test]
    fn test_pointer_comparisons() {
        let void_ptr = Value::Pointer(Pointer::new(0x1000, QualType::scalar(ScalarKind::Void)));
        assert_eq!(binary(BinOp::Eq, int_ptr(0x1000), void_ptr).unwrap(), Value::bool(true));
        assert_eq!(binary(BinOp::Ne, int_ptr(0x1000), Value::int(0)).unwrap(), Value::bool(true));

        let char_ptr = Value::Pointer(Pointer::new(0x1000, QualType::scalar(ScalarKind::Char)));
        assert!(binary(BinOp::Eq, int_ptr(0x1000), char_ptr).is_err());

        let double = Value::Scalar(Scalar::from_float(ScalarKind::Double, 1.0));
        let err = binary(BinOp::Lt, int_ptr(0x1000), double).unwrap_err();
        assert_eq!(err.code(), EvalErrorCode::InvalidOperandType);
    }

    #[test]
    fn test_logical_operators() {
        assert_eq!(
            binary(BinOp::LogicalAnd, int_ptr(8), Value::int(2)).unwrap(),
            Value::bool(true)
        );
        assert_eq!(
            binary(BinOp::LogicalOr, int_ptr(0), Value::int(0)).unwrap(),
            Value::bool(false)
        );
        assert_eq!(unary(UnaryOp::LogicalNot, int_ptr(0)).unwrap(), Value::bool(true));
    }

    #[test]
    fn test_unary_rules() {
        let result = unary(UnaryOp::BitNot, scalar(ScalarKind::UnsignedChar, 0)).unwrap();
        assert_eq!(result.type_name(), "int");
        assert_eq!(result.as_scalar().unwrap().as_i128(), -1);

        let double = Value::Scalar(Scalar::from_float(ScalarKind::Double, 1.5));
        assert!(unary(UnaryOp::BitNot, double.clone()).is_err());
        assert_eq!(unary(UnaryOp::Neg, double).unwrap().as_scalar().unwrap().as_f64(), -1.5);
        assert!(unary(UnaryOp::Neg, int_ptr(8)).is_err());
    }

    #[test]
    fn test_casts() {
        let to_char = cast(Value::int(300), &QualType::scalar(ScalarKind::UnsignedChar)).unwrap();
        assert_eq!(to_char.as_scalar().unwrap().as_i128(), 44);

        let ptr = cast(Value::int(0x10), &QualType::scalar(ScalarKind::Char).pointer_to()).unwrap();
        assert_eq!(ptr.type_name(), "char*");
        assert_eq!(ptr.as_pointer().unwrap().addr(), 0x10);

        let addr = cast(int_ptr(0x20), &QualType::scalar(ScalarKind::UnsignedLong)).unwrap();
        assert_eq!(addr.as_scalar().unwrap().as_i128(), 0x20);

        let err = cast(int_ptr(0x20), &QualType::scalar(ScalarKind::Double)).unwrap_err();
        assert_eq!(err.code(), EvalErrorCode::InvalidOperandType);

        let err = cast(Value::int(1), &QualType::scalar(ScalarKind::Int).reference_to()).unwrap_err();
        assert_eq!(err.code(), EvalErrorCode::NotImplemented);
    }

    #[test]
    fn test_conditional_result_uses_common_type() {
        let result = conditional_result(Value::int(1), &QualType::scalar(ScalarKind::Double));
        assert_eq!(result.type_name(), "double");
        let result = conditional_result(
            scalar(ScalarKind::Char, 97),
            &QualType::scalar(ScalarKind::Char),
        );
        assert_eq!(result.type_name(), "char");
    }

    #[test]
    fn test_binary_type() {
        let int = QualType::scalar(ScalarKind::Int);
        let ptr = QualType::scalar(ScalarKind::Char).pointer_to();
        assert_eq!(binary_type(BinOp::Add, &ptr, &int).unwrap(), ptr);
        assert_eq!(
            binary_type(BinOp::Lt, &ptr, &int).unwrap(),
            QualType::scalar(ScalarKind::Bool)
        );
        assert!(binary_type(BinOp::Mul, &ptr, &int).is_err());
    }
}
