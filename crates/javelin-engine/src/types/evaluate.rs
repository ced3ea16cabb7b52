//! Operator evaluation on runtime values
//!
//! Evaluation is keyed on the static type of the left operand. Numeric
//! operations run in the widest domain of that type and the right operand's
//! representation, so an `int` stored in a `double` slot (no cast step is
//! emitted for that widening) still computes as a `double`.

use super::{collation, Operator, PrimitiveKind, Type};
use crate::vm::{RuntimeError, Value};
use std::cmp::Ordering;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Domain {
    Int,
    Float,
    Double,
}

impl Domain {
    fn of_kind(kind: PrimitiveKind) -> Domain {
        match kind {
            PrimitiveKind::Float => Domain::Float,
            PrimitiveKind::Double => Domain::Double,
            _ => Domain::Int,
        }
    }

    fn of_value(value: &Value) -> Domain {
        match value {
            Value::Float(_) => Domain::Float,
            Value::Double(_) => Domain::Double,
            _ => Domain::Int,
        }
    }
}

impl Type {
    /// Compute `lhs op rhs` (or `op lhs` when `rhs` is `None`)
    ///
    /// Only called after [`Type::result_type`] accepted the operation.
    pub fn evaluate(
        &self,
        op: Operator,
        lhs: &Value,
        rhs: Option<&Value>,
    ) -> Result<Value, RuntimeError> {
        match self.numeric_view() {
            Some(PrimitiveKind::Boolean) => evaluate_boolean(op, lhs, rhs),
            Some(PrimitiveKind::Char) => evaluate_char(op, lhs, rhs),
            Some(PrimitiveKind::Void) => Ok(Value::Null),
            Some(kind) => evaluate_numeric(Domain::of_kind(kind), op, lhs, rhs),
            None if self.is_string() => evaluate_string(op, lhs, rhs),
            None => evaluate_reference(op, lhs, rhs),
        }
    }
}

fn operand(rhs: Option<&Value>) -> Result<&Value, RuntimeError> {
    rhs.ok_or_else(|| RuntimeError::Message("missing right operand".to_string()))
}

fn number(value: &Value) -> Result<f64, RuntimeError> {
    match value {
        Value::Null => Err(RuntimeError::NullPointer),
        other => other.as_f64().ok_or_else(|| RuntimeError::InvalidOperand {
            expected: "number",
            found: other.kind_name(),
        }),
    }
}

fn concat(lhs: &Value, rhs: &Value) -> Value {
    let mut text = lhs.to_text().unwrap_or_default();
    text.push_str(&rhs.to_text().unwrap_or_default());
    Value::string(text)
}

fn comparison(op: Operator, ordering: Option<Ordering>) -> Option<bool> {
    let ordering = ordering?;
    Some(match op {
        Operator::Lower => ordering == Ordering::Less,
        Operator::Greater => ordering == Ordering::Greater,
        Operator::LowerOrEqual => ordering != Ordering::Greater,
        Operator::GreaterOrEqual => ordering != Ordering::Less,
        Operator::Equal => ordering == Ordering::Equal,
        Operator::NotEqual => ordering != Ordering::Equal,
        _ => return None,
    })
}

fn unsupported(op: Operator, type_name: &str) -> RuntimeError {
    RuntimeError::Message(format!("operator {} is not defined for {}", op, type_name))
}

// ============================================================================
// Numbers
// ============================================================================

fn evaluate_numeric(
    floor: Domain,
    op: Operator,
    lhs: &Value,
    rhs: Option<&Value>,
) -> Result<Value, RuntimeError> {
    if lhs.is_null() {
        return Err(RuntimeError::NullPointer);
    }
    if op == Operator::Plus {
        if let Some(rhs @ Value::Str(_)) = rhs {
            return Ok(concat(lhs, rhs));
        }
    }

    let Some(rhs) = rhs else {
        return evaluate_numeric_unary(floor, op, lhs);
    };

    let domain = floor.max(Domain::of_value(rhs));
    let a = number(lhs)?;
    let b = number(rhs)?;

    if op.is_comparison() {
        let result = comparison(op, a.partial_cmp(&b)).unwrap_or(op == Operator::NotEqual);
        return Ok(Value::Bool(result));
    }

    if domain == Domain::Int {
        return evaluate_int(op, a as i32, b as i32);
    }

    let integral_divisor = b.round() == b;
    let result = match op {
        Operator::Plus => a + b,
        Operator::Minus => a - b,
        Operator::Multiply => a * b,
        Operator::Divide if floor == Domain::Int && integral_divisor => (a / b).trunc(),
        Operator::Divide => a / b,
        Operator::Modulo if integral_divisor => (a % b).trunc(),
        Operator::Modulo => return Ok(Value::Int(1)),
        _ => return Err(unsupported(op, "floating point values")),
    };
    Ok(match domain {
        Domain::Float => Value::Float(result as f32),
        _ => Value::Double(result),
    })
}

fn evaluate_int(op: Operator, a: i32, b: i32) -> Result<Value, RuntimeError> {
    let result = match op {
        Operator::Plus => a.wrapping_add(b),
        Operator::Minus => a.wrapping_sub(b),
        Operator::Multiply => a.wrapping_mul(b),
        Operator::Divide => {
            if b == 0 {
                return Err(RuntimeError::DivisionByZero);
            }
            a.wrapping_div(b)
        }
        Operator::Modulo => {
            if b == 0 {
                return Err(RuntimeError::DivisionByZero);
            }
            a.wrapping_rem(b)
        }
        Operator::BitOr => a | b,
        Operator::BitXor => a ^ b,
        Operator::BitAnd => a & b,
        Operator::ShiftLeft => a.wrapping_shl(b as u32),
        Operator::ShiftRight => a.wrapping_shr(b as u32),
        Operator::ShiftRightUnsigned => (a as u32).wrapping_shr(b as u32) as i32,
        _ => return Err(unsupported(op, "int")),
    };
    Ok(Value::Int(result))
}

fn evaluate_numeric_unary(floor: Domain, op: Operator, lhs: &Value) -> Result<Value, RuntimeError> {
    let domain = floor.max(Domain::of_value(lhs));
    if domain == Domain::Int {
        let a = number(lhs)? as i32;
        let result = match op {
            Operator::Minus | Operator::Negation => a.wrapping_neg(),
            Operator::Tilde => !a,
            Operator::Increment => a.wrapping_add(1),
            Operator::Decrement => a.wrapping_sub(1),
            _ => return Err(unsupported(op, "int")),
        };
        return Ok(Value::Int(result));
    }

    let a = number(lhs)?;
    let result = match op {
        Operator::Minus | Operator::Negation => -a,
        Operator::Increment => a + 1.0,
        Operator::Decrement => a - 1.0,
        _ => return Err(unsupported(op, "floating point values")),
    };
    Ok(match domain {
        Domain::Float => Value::Float(result as f32),
        _ => Value::Double(result),
    })
}

// ============================================================================
// Booleans, chars, strings, references
// ============================================================================

fn evaluate_boolean(op: Operator, lhs: &Value, rhs: Option<&Value>) -> Result<Value, RuntimeError> {
    let a = lhs.as_bool().ok_or(RuntimeError::NullPointer)?;
    if op == Operator::Not {
        return Ok(Value::Bool(!a));
    }
    let rhs = operand(rhs)?;
    if op == Operator::Plus {
        return Ok(concat(lhs, rhs));
    }
    let b = rhs.as_bool().ok_or(RuntimeError::NullPointer)?;
    Ok(Value::Bool(match op {
        Operator::And => a && b,
        Operator::Or => a || b,
        Operator::Equal => a == b,
        Operator::NotEqual => a != b,
        _ => return Err(unsupported(op, "boolean")),
    }))
}

fn evaluate_char(op: Operator, lhs: &Value, rhs: Option<&Value>) -> Result<Value, RuntimeError> {
    let a = lhs.as_char().ok_or(RuntimeError::NullPointer)?;
    let rhs = operand(rhs)?;
    if op == Operator::Plus {
        return Ok(concat(lhs, rhs));
    }
    let b = rhs.as_char().ok_or(RuntimeError::NullPointer)?;
    comparison(op, Some(a.cmp(&b)))
        .map(Value::Bool)
        .ok_or_else(|| unsupported(op, "char"))
}

fn evaluate_string(op: Operator, lhs: &Value, rhs: Option<&Value>) -> Result<Value, RuntimeError> {
    let rhs = operand(rhs)?;
    match op {
        Operator::Equal | Operator::NotEqual => {
            let equal = match (lhs.as_text(), rhs.as_text()) {
                (Some(a), Some(b)) => a == b,
                _ => lhs.is_null() && rhs.is_null(),
            };
            Ok(Value::Bool(equal == (op == Operator::Equal)))
        }
        Operator::Plus => {
            if lhs.is_null() {
                return Err(RuntimeError::NullPointer);
            }
            Ok(concat(lhs, rhs))
        }
        _ => {
            let a = lhs.as_text().ok_or(RuntimeError::NullPointer)?;
            let b = rhs.as_text().ok_or(RuntimeError::NullPointer)?;
            comparison(op, Some(collation::compare(&a, &b)))
                .map(Value::Bool)
                .ok_or_else(|| unsupported(op, "String"))
        }
    }
}

fn evaluate_reference(op: Operator, lhs: &Value, rhs: Option<&Value>) -> Result<Value, RuntimeError> {
    let rhs = operand(rhs)?;
    match op {
        Operator::Equal => Ok(Value::Bool(lhs.identical(rhs))),
        Operator::NotEqual => Ok(Value::Bool(!lhs.identical(rhs))),
        _ => Err(unsupported(op, "references")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vm::ClassId;

    fn eval(ty: &Type, op: Operator, a: Value, b: Value) -> Value {
        ty.evaluate(op, &a, Some(&b)).unwrap()
    }

    #[test]
    fn test_int_division_truncates_toward_zero() {
        assert_eq!(eval(&Type::INT, Operator::Divide, Value::Int(7), Value::Int(2)), Value::Int(3));
        assert_eq!(eval(&Type::INT, Operator::Divide, Value::Int(-7), Value::Int(2)), Value::Int(-3));
    }

    #[test]
    fn test_int_division_by_integral_double_truncates() {
        assert_eq!(
            eval(&Type::INT, Operator::Divide, Value::Int(7), Value::Double(2.0)),
            Value::Double(3.0)
        );
        assert_eq!(
            eval(&Type::INT, Operator::Divide, Value::Int(7), Value::Double(2.5)),
            Value::Double(2.8)
        );
    }

    #[test]
    fn test_int_modulo_quirk() {
        assert_eq!(eval(&Type::INT, Operator::Modulo, Value::Int(7), Value::Int(3)), Value::Int(1));
        assert_eq!(eval(&Type::INT, Operator::Modulo, Value::Int(-7), Value::Int(3)), Value::Int(-1));
        assert_eq!(eval(&Type::INT, Operator::Modulo, Value::Int(9), Value::Double(2.5)), Value::Int(1));
        assert_eq!(
            eval(&Type::INT, Operator::Modulo, Value::Int(9), Value::Double(4.0)),
            Value::Double(1.0)
        );
    }

    #[test]
    fn test_int_division_by_zero_faults() {
        let err = Type::INT
            .evaluate(Operator::Divide, &Value::Int(1), Some(&Value::Int(0)))
            .unwrap_err();
        assert_eq!(err, RuntimeError::DivisionByZero);
    }

    #[test]
    fn test_floating_division_is_plain() {
        assert_eq!(
            eval(&Type::DOUBLE, Operator::Divide, Value::Double(7.0), Value::Int(2)),
            Value::Double(3.5)
        );
        assert_eq!(
            eval(&Type::FLOAT, Operator::Divide, Value::Float(7.0), Value::Int(2)),
            Value::Float(3.5)
        );
        // int stored in a double slot still divides as double
        assert_eq!(
            eval(&Type::DOUBLE, Operator::Divide, Value::Int(7), Value::Int(2)),
            Value::Double(3.5)
        );
    }

    #[test]
    fn test_int_wraps() {
        assert_eq!(
            eval(&Type::INT, Operator::Plus, Value::Int(i32::MAX), Value::Int(1)),
            Value::Int(i32::MIN)
        );
    }

    #[test]
    fn test_shifts() {
        assert_eq!(eval(&Type::INT, Operator::ShiftLeft, Value::Int(1), Value::Int(4)), Value::Int(16));
        assert_eq!(eval(&Type::INT, Operator::ShiftRight, Value::Int(-16), Value::Int(2)), Value::Int(-4));
        assert_eq!(
            eval(&Type::INT, Operator::ShiftRightUnsigned, Value::Int(-1), Value::Int(28)),
            Value::Int(15)
        );
    }

    #[test]
    fn test_unary() {
        assert_eq!(Type::INT.evaluate(Operator::Minus, &Value::Int(5), None).unwrap(), Value::Int(-5));
        assert_eq!(Type::INT.evaluate(Operator::Tilde, &Value::Int(0), None).unwrap(), Value::Int(-1));
        assert_eq!(
            Type::DOUBLE.evaluate(Operator::Increment, &Value::Double(1.5), None).unwrap(),
            Value::Double(2.5)
        );
        assert_eq!(
            Type::BOOLEAN.evaluate(Operator::Not, &Value::Bool(true), None).unwrap(),
            Value::Bool(false)
        );
    }

    #[test]
    fn test_concatenation() {
        assert_eq!(
            eval(&Type::STRING, Operator::Plus, Value::string("x = "), Value::Int(7)),
            Value::string("x = 7")
        );
        assert_eq!(
            eval(&Type::STRING, Operator::Plus, Value::string("d = "), Value::Double(2.0)),
            Value::string("d = 2")
        );
        assert_eq!(
            eval(&Type::INT, Operator::Plus, Value::Int(1), Value::string("a")),
            Value::string("1a")
        );
        assert_eq!(
            eval(&Type::BOOLEAN, Operator::Plus, Value::Bool(true), Value::string("!")),
            Value::string("true!")
        );
        assert_eq!(
            eval(&Type::CHAR, Operator::Plus, Value::Char('a'), Value::Char('b')),
            Value::string("ab")
        );
    }

    #[test]
    fn test_string_comparison_uses_collation() {
        assert_eq!(
            eval(&Type::STRING, Operator::Lower, Value::string("Apfel"), Value::string("apfel")),
            Value::Bool(true)
        );
        assert_eq!(
            eval(&Type::STRING, Operator::Lower, Value::string("apfel"), Value::string("Birne")),
            Value::Bool(true)
        );
        assert_eq!(
            eval(&Type::STRING, Operator::Equal, Value::string("a"), Value::Null),
            Value::Bool(false)
        );
    }

    #[test]
    fn test_null_boxed_operand_faults() {
        let integer = Type::Class(ClassId::INTEGER);
        let err = integer
            .evaluate(Operator::Plus, &Value::Null, Some(&Value::Int(1)))
            .unwrap_err();
        assert_eq!(err, RuntimeError::NullPointer);
    }

    #[test]
    fn test_reference_identity() {
        let ty = Type::Class(ClassId(50));
        let a = Value::Object(crate::vm::ObjectRef(1));
        assert_eq!(eval(&ty, Operator::Equal, a.clone(), a.clone()), Value::Bool(true));
        assert_eq!(eval(&ty, Operator::NotEqual, a, Value::Null), Value::Bool(true));
    }
}
