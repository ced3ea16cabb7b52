//! Cast tables and conversions
//!
//! A [`CastRule`] says whether a conversion happens implicitly (`automatic`)
//! and whether it changes the value so that a cast step must be emitted
//! (`needs_statement`). No entry means the cast is illegal.

use super::{PrimitiveKind, Type};
use crate::vm::{ArrayObject, ClassId, ClassRegistry, Heap, Value};
use serde::Serialize;

/// Cast table entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CastRule {
    /// Applied implicitly on assignment and argument passing
    pub automatic: bool,
    /// Requires a conversion step at run time
    pub needs_statement: bool,
}

impl CastRule {
    const fn new(automatic: bool, needs_statement: bool) -> Self {
        Self {
            automatic,
            needs_statement,
        }
    }

    /// Implicit conversion without a step
    pub const IDENTITY: CastRule = CastRule::new(true, false);
    /// Implicit conversion with a step
    pub const IMPLICIT: CastRule = CastRule::new(true, true);
    /// Explicit `(T)` cast with a step
    pub const EXPLICIT: CastRule = CastRule::new(false, true);
}

/// Target names used by the primitive cast tables
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Target {
    Primitive(PrimitiveKind),
    String,
    Boxed(PrimitiveKind),
}

impl Target {
    fn of(ty: &Type) -> Option<Target> {
        match ty {
            Type::Primitive(kind) => Some(Target::Primitive(*kind)),
            Type::Class(id) if *id == ClassId::STRING => Some(Target::String),
            Type::Class(id) => id.boxed_primitive().map(Target::Boxed),
            _ => None,
        }
    }
}

fn primitive_table(from: PrimitiveKind, to: Target) -> Option<CastRule> {
    use PrimitiveKind::*;
    use Target::{Boxed, Primitive as P, String as S};
    let (a, s) = (true, true);
    let rule = match (from, to) {
        (Int, P(Float) | P(Double) | P(Int) | Boxed(Int)) => CastRule::new(a, !s),
        (Int, S | P(Char)) => CastRule::new(a, s),

        (Float, P(Int)) => CastRule::new(!a, s),
        (Float, P(Double) | P(Float) | Boxed(Float) | Boxed(Double)) => CastRule::new(a, !s),
        (Float, S) => CastRule::new(a, s),

        (Double, P(Int)) => CastRule::new(!a, s),
        (Double, P(Float) | P(Double) | Boxed(Float) | Boxed(Double)) => CastRule::new(a, !s),
        (Double, S) => CastRule::new(a, s),

        (Boolean, S) => CastRule::new(a, s),
        (Boolean, P(Boolean) | Boxed(Boolean)) => CastRule::new(a, !s),

        (Char, P(Int) | P(Float) | P(Double)) => CastRule::new(a, s),
        (Char, S | P(Char) | Boxed(Char)) => CastRule::new(a, !s),

        _ => return None,
    };
    Some(rule)
}

/// Primitives a boxed wrapper unboxes to
fn unboxable_as(boxed: PrimitiveKind) -> &'static [PrimitiveKind] {
    use PrimitiveKind::*;
    match boxed {
        Int => &[Int, Float, Double],
        Float => &[Float, Double],
        Double => &[Double],
        Char => &[Char],
        Boolean => &[Boolean],
        Void => &[],
    }
}

pub(super) fn cast_rule(from: &Type, to: &Type, classes: &ClassRegistry) -> Option<CastRule> {
    if from == to {
        return Some(CastRule::IDENTITY);
    }
    match (from, to) {
        (Type::Primitive(kind), _) => {
            if *to == Type::OBJECT && *kind != PrimitiveKind::Void {
                return Some(CastRule::IDENTITY);
            }
            primitive_table(*kind, Target::of(to)?)
        }
        (Type::Null, target) => target.is_reference().then_some(CastRule::IDENTITY),
        (Type::Var, Type::Class(_) | Type::Interface(_)) => Some(CastRule::IDENTITY),
        (Type::Var, _) => None,
        (Type::Array(a), Type::Array(b)) => {
            let element = a.cast_rule(b, classes)?;
            Some(CastRule::new(element.automatic, true))
        }
        (Type::Array(_), _) => (*to == Type::OBJECT).then_some(CastRule::IDENTITY),
        (Type::Enum(_), Type::Primitive(PrimitiveKind::Int)) => Some(CastRule::EXPLICIT),
        (Type::Class(id), _) if id.boxed_primitive().is_some() && unbox_rule(*id, to).is_some() => {
            unbox_rule(*id, to)
        }
        (Type::Class(id), Type::Primitive(_) | Type::Array(_)) if *id == ClassId::OBJECT => {
            Some(CastRule::EXPLICIT)
        }
        (Type::Class(a) | Type::Interface(a) | Type::Enum(a), _) => {
            let b = to.class_id()?;
            if classes.is_subclass_of(*a, b) {
                Some(CastRule::IDENTITY)
            } else if classes.is_subclass_of(b, *a)
                || matches!(from, Type::Interface(_))
                || matches!(to, Type::Interface(_))
            {
                Some(CastRule::EXPLICIT)
            } else {
                None
            }
        }
        _ => None,
    }
}

fn unbox_rule(boxed: ClassId, to: &Type) -> Option<CastRule> {
    let kind = boxed.boxed_primitive()?;
    match Target::of(to)? {
        Target::Primitive(target) if unboxable_as(kind).contains(&target) => Some(CastRule::IDENTITY),
        Target::String => Some(CastRule::IMPLICIT),
        _ => None,
    }
}

impl Type {
    /// Convert `value` of this type to `target`
    ///
    /// Only defined where [`Type::can_cast_to`] holds. Array casts copy into
    /// a fresh backing store and never touch the source array.
    pub fn cast_to(&self, value: &Value, target: &Type, heap: &mut Heap) -> Value {
        if value.is_null() {
            return Value::Null;
        }
        if let (Type::Array(from), Type::Array(to)) = (self, target) {
            return cast_array(value, from, to, heap);
        }
        if let (Type::Enum(_), Some(PrimitiveKind::Int)) = (self, target.primitive()) {
            return value
                .as_object()
                .and_then(|r| heap.object(r).ok())
                .and_then(|o| o.ordinal)
                .map(|ordinal| Value::Int(ordinal as i32))
                .unwrap_or(Value::Null);
        }
        match Target::of(target) {
            Some(Target::Primitive(kind)) | Some(Target::Boxed(kind)) => convert_primitive(value, kind),
            Some(Target::String) => value
                .to_text()
                .map(Value::string)
                .unwrap_or_else(|| value.clone()),
            None => value.clone(),
        }
    }
}

fn convert_primitive(value: &Value, kind: PrimitiveKind) -> Value {
    match kind {
        PrimitiveKind::Int => match value {
            Value::Float(v) => Value::Int(v.trunc() as i32),
            Value::Double(v) => Value::Int(v.trunc() as i32),
            other => other.as_i32().map(Value::Int).unwrap_or_else(|| other.clone()),
        },
        PrimitiveKind::Float => value
            .as_f64()
            .map(|v| Value::Float(v as f32))
            .unwrap_or_else(|| value.clone()),
        PrimitiveKind::Double => value
            .as_f64()
            .map(Value::Double)
            .unwrap_or_else(|| value.clone()),
        PrimitiveKind::Char => match value {
            Value::Int(code) => Value::Char(
                char::from_u32((*code as u32) & 0xFFFF).unwrap_or(char::REPLACEMENT_CHARACTER),
            ),
            other => other.clone(),
        },
        PrimitiveKind::Boolean | PrimitiveKind::Void => value.clone(),
    }
}

fn cast_array(value: &Value, from: &Type, to: &Type, heap: &mut Heap) -> Value {
    let Some(source) = value.as_array().and_then(|r| heap.array(r).ok()) else {
        return value.clone();
    };
    let elements = source.elements.clone();
    let copied = elements
        .iter()
        .map(|element| from.cast_to(element, to, heap))
        .collect();
    Value::Array(heap.allocate_array(ArrayObject {
        element_type: to.clone(),
        elements: copied,
    }))
}
