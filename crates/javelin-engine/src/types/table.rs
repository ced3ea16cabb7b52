//! Operation tables
//!
//! One table per primitive type (and `String`), mapping
//! operator -> operand type name -> result type. A missing entry means the
//! operation is illegal. Boxed wrappers on the left use their primitive's
//! table; reference types only support identity comparison.

use super::{Operator, PrimitiveKind, Type};
use crate::vm::ClassId;

/// Operand type names as they appear in the tables (`"none"` for unary)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Operand {
    None,
    Int,
    Integer,
    Float,
    FloatBoxed,
    Double,
    DoubleBoxed,
    Boolean,
    Char,
    String,
    Null,
    Reference,
    Other,
}

impl Operand {
    fn of(rhs: Option<&Type>) -> Operand {
        let Some(rhs) = rhs else {
            return Operand::None;
        };
        match rhs {
            Type::Primitive(PrimitiveKind::Int) => Operand::Int,
            Type::Primitive(PrimitiveKind::Float) => Operand::Float,
            Type::Primitive(PrimitiveKind::Double) => Operand::Double,
            Type::Primitive(PrimitiveKind::Boolean) => Operand::Boolean,
            Type::Primitive(PrimitiveKind::Char) => Operand::Char,
            Type::Primitive(PrimitiveKind::Void) | Type::Var => Operand::Other,
            Type::Null => Operand::Null,
            Type::Class(id) if *id == ClassId::STRING => Operand::String,
            Type::Class(id) if *id == ClassId::INTEGER => Operand::Integer,
            Type::Class(id) if *id == ClassId::FLOAT => Operand::FloatBoxed,
            Type::Class(id) if *id == ClassId::DOUBLE => Operand::DoubleBoxed,
            Type::Class(_) | Type::Interface(_) | Type::Enum(_) | Type::Array(_) => {
                Operand::Reference
            }
        }
    }

    fn is_numeric(self) -> bool {
        matches!(
            self,
            Operand::Int
                | Operand::Integer
                | Operand::Float
                | Operand::FloatBoxed
                | Operand::Double
                | Operand::DoubleBoxed
        )
    }
}

pub(super) fn result_type(lhs: &Type, op: Operator, rhs: Option<&Type>) -> Option<Type> {
    let operand = Operand::of(rhs);
    match lhs {
        Type::Primitive(kind) => primitive_table(*kind, op, operand),
        Type::Class(id) if *id == ClassId::STRING => string_table(op, operand),
        Type::Class(id) if id.boxed_primitive().is_some() => {
            primitive_table(id.boxed_primitive()?, op, operand)
        }
        Type::Class(_) | Type::Interface(_) | Type::Enum(_) | Type::Array(_) | Type::Null => {
            reference_table(op, operand)
        }
        Type::Var => None,
    }
}

fn primitive_table(kind: PrimitiveKind, op: Operator, rhs: Operand) -> Option<Type> {
    match kind {
        PrimitiveKind::Int => int_table(op, rhs),
        PrimitiveKind::Float => float_table(op, rhs),
        PrimitiveKind::Double => double_table(op, rhs),
        PrimitiveKind::Boolean => boolean_table(op, rhs),
        PrimitiveKind::Char => char_table(op, rhs),
        PrimitiveKind::Void => None,
    }
}

fn numeric_comparison(op: Operator, rhs: Operand) -> Option<Type> {
    (op.is_comparison() && rhs.is_numeric()).then_some(Type::BOOLEAN)
}

fn int_table(op: Operator, rhs: Operand) -> Option<Type> {
    use Operand as O;
    use Operator::*;
    match (op, rhs) {
        (Plus, O::Int | O::Integer) => Some(Type::INT),
        (Plus, O::Float | O::FloatBoxed) => Some(Type::FLOAT),
        (Plus, O::Double | O::DoubleBoxed) => Some(Type::DOUBLE),
        (Plus, O::String) => Some(Type::STRING),
        (Minus, O::None | O::Int | O::Integer) => Some(Type::INT),
        (Minus | Multiply | Divide, O::Float | O::FloatBoxed) => Some(Type::FLOAT),
        (Minus | Multiply | Divide, O::Double | O::DoubleBoxed) => Some(Type::DOUBLE),
        (Multiply | Divide | Modulo, O::Int | O::Integer) => Some(Type::INT),
        (Increment | Decrement | Negation | Tilde, O::None) => Some(Type::INT),
        (BitOr | BitXor | BitAnd | ShiftLeft | ShiftRight | ShiftRightUnsigned, O::Int | O::Integer) => {
            Some(Type::INT)
        }
        _ => numeric_comparison(op, rhs),
    }
}

fn float_table(op: Operator, rhs: Operand) -> Option<Type> {
    use Operand as O;
    use Operator::*;
    match (op, rhs) {
        (Plus | Minus | Multiply | Divide, O::Int | O::Integer | O::Float | O::FloatBoxed) => {
            Some(Type::FLOAT)
        }
        (Plus | Minus | Multiply | Divide, O::Double | O::DoubleBoxed) => Some(Type::DOUBLE),
        (Plus, O::String) => Some(Type::STRING),
        (Minus | Increment | Decrement | Negation, O::None) => Some(Type::FLOAT),
        _ => numeric_comparison(op, rhs),
    }
}

fn double_table(op: Operator, rhs: Operand) -> Option<Type> {
    use Operand as O;
    use Operator::*;
    match (op, rhs) {
        (Plus | Minus | Multiply | Divide, r) if r.is_numeric() => Some(Type::DOUBLE),
        (Plus, O::String) => Some(Type::STRING),
        (Minus | Increment | Decrement | Negation, O::None) => Some(Type::DOUBLE),
        _ => numeric_comparison(op, rhs),
    }
}

fn boolean_table(op: Operator, rhs: Operand) -> Option<Type> {
    use Operand as O;
    use Operator::*;
    match (op, rhs) {
        (Plus, O::String) => Some(Type::STRING),
        (And | Or | Equal | NotEqual, O::Boolean) => Some(Type::BOOLEAN),
        (Not, O::None) => Some(Type::BOOLEAN),
        _ => None,
    }
}

fn char_table(op: Operator, rhs: Operand) -> Option<Type> {
    use Operand as O;
    use Operator::*;
    match (op, rhs) {
        (Plus, O::String | O::Char) => Some(Type::STRING),
        (_, O::Char) if op.is_comparison() => Some(Type::BOOLEAN),
        _ => None,
    }
}

fn string_table(op: Operator, rhs: Operand) -> Option<Type> {
    use Operand as O;
    use Operator::*;
    match (op, rhs) {
        (Plus, O::String | O::Int | O::Float | O::Double | O::Boolean | O::Char) => {
            Some(Type::STRING)
        }
        (Equal | NotEqual, O::String | O::Null) => Some(Type::BOOLEAN),
        (Lower | Greater | LowerOrEqual | GreaterOrEqual, O::String) => Some(Type::BOOLEAN),
        _ => None,
    }
}

fn reference_table(op: Operator, rhs: Operand) -> Option<Type> {
    match (op, rhs) {
        (
            Operator::Equal | Operator::NotEqual,
            Operand::Reference | Operand::Null | Operand::String,
        ) => Some(Type::BOOLEAN),
        _ => None,
    }
}
