//! Type lattice
//!
//! Every static type in the language is a [`Type`]. The closed enum carries
//! the shared capability set used by the code generator and the engine:
//!
//! - [`Type::result_type`]: what an operator yields for a given operand type
//! - [`Type::evaluate`]: compute an operator on runtime values
//! - [`Type::cast_rule`] / [`Type::can_cast_to`]: the cast tables
//! - [`Type::cast_to`]: perform a conversion
//! - [`Type::format`]: display text for debuggers and consoles
//!
//! `String` and the boxed wrappers are classes with well-known ids
//! (see [`ClassId::STRING`]) so they participate in both worlds: they have
//! operation tables like primitives and methods like classes.

mod cast;
mod collation;
mod evaluate;
mod format;
mod operator;
mod table;

pub use cast::CastRule;
pub use collation::{compare as collate, compare_ignore_case as collate_ignore_case};
pub use operator::Operator;

use crate::vm::{ClassId, ClassRegistry, Value};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Primitive type kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrimitiveKind {
    /// 32-bit integer
    Int,
    /// Single precision floating point
    Float,
    /// Double precision floating point
    Double,
    /// `true` / `false`
    Boolean,
    /// Single character
    Char,
    /// No value
    Void,
}

impl PrimitiveKind {
    /// Source name
    pub fn name(&self) -> &'static str {
        match self {
            PrimitiveKind::Int => "int",
            PrimitiveKind::Float => "float",
            PrimitiveKind::Double => "double",
            PrimitiveKind::Boolean => "boolean",
            PrimitiveKind::Char => "char",
            PrimitiveKind::Void => "void",
        }
    }

    /// Parse a primitive name
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "int" => PrimitiveKind::Int,
            "float" => PrimitiveKind::Float,
            "double" => PrimitiveKind::Double,
            "boolean" => PrimitiveKind::Boolean,
            "char" => PrimitiveKind::Char,
            "void" => PrimitiveKind::Void,
            _ => return None,
        })
    }

    /// Initial value of an attribute or array element of this kind
    pub fn default_value(&self) -> Value {
        match self {
            PrimitiveKind::Int => Value::Int(0),
            PrimitiveKind::Float => Value::Float(0.0),
            PrimitiveKind::Double => Value::Double(0.0),
            PrimitiveKind::Boolean => Value::Bool(false),
            PrimitiveKind::Char => Value::Char('\0'),
            PrimitiveKind::Void => Value::Null,
        }
    }

    /// Wrapper class boxing this primitive
    pub fn boxed_class(&self) -> Option<ClassId> {
        match self {
            PrimitiveKind::Int => Some(ClassId::INTEGER),
            PrimitiveKind::Float => Some(ClassId::FLOAT),
            PrimitiveKind::Double => Some(ClassId::DOUBLE),
            PrimitiveKind::Boolean => Some(ClassId::BOOLEAN),
            PrimitiveKind::Char => Some(ClassId::CHARACTER),
            PrimitiveKind::Void => None,
        }
    }

    pub(crate) fn is_numeric(&self) -> bool {
        matches!(
            self,
            PrimitiveKind::Int | PrimitiveKind::Float | PrimitiveKind::Double
        )
    }
}

/// A static type
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Type {
    /// Primitive type
    Primitive(PrimitiveKind),
    /// Type of the `null` literal
    Null,
    /// Inference placeholder for `var`
    Var,
    /// Array of the element type
    Array(Box<Type>),
    /// Class (including `String` and the boxed wrappers)
    Class(ClassId),
    /// Interface
    Interface(ClassId),
    /// Enum
    Enum(ClassId),
}

impl Type {
    /// `int`
    pub const INT: Type = Type::Primitive(PrimitiveKind::Int);
    /// `float`
    pub const FLOAT: Type = Type::Primitive(PrimitiveKind::Float);
    /// `double`
    pub const DOUBLE: Type = Type::Primitive(PrimitiveKind::Double);
    /// `boolean`
    pub const BOOLEAN: Type = Type::Primitive(PrimitiveKind::Boolean);
    /// `char`
    pub const CHAR: Type = Type::Primitive(PrimitiveKind::Char);
    /// `void`
    pub const VOID: Type = Type::Primitive(PrimitiveKind::Void);
    /// `String`
    pub const STRING: Type = Type::Class(ClassId::STRING);
    /// `Object`
    pub const OBJECT: Type = Type::Class(ClassId::OBJECT);

    /// Array type with this element type
    pub fn array_of(element: Type) -> Type {
        Type::Array(Box::new(element))
    }

    /// Type name as written in source (`int`, `Foo`, `String[]`)
    pub fn identifier(&self, classes: &ClassRegistry) -> String {
        match self {
            Type::Primitive(kind) => kind.name().to_string(),
            Type::Null => "null".to_string(),
            Type::Var => "var".to_string(),
            Type::Array(element) => format!("{}[]", element.identifier(classes)),
            Type::Class(id) | Type::Interface(id) | Type::Enum(id) => classes
                .get_class(*id)
                .map(|c| c.name.clone())
                .unwrap_or_else(|| format!("<class {}>", id.0)),
        }
    }

    /// Primitive kind, if primitive
    pub fn primitive(&self) -> Option<PrimitiveKind> {
        match self {
            Type::Primitive(kind) => Some(*kind),
            _ => None,
        }
    }

    /// Primitive wrapped by a boxed class type (`Integer` yields `int`)
    pub fn unboxed(&self) -> Option<PrimitiveKind> {
        match self {
            Type::Class(id) => id.boxed_primitive(),
            _ => None,
        }
    }

    /// Primitive kind of a primitive or boxed type
    pub fn numeric_view(&self) -> Option<PrimitiveKind> {
        self.primitive().or_else(|| self.unboxed())
    }

    /// `void`
    pub fn is_void(&self) -> bool {
        matches!(self, Type::Primitive(PrimitiveKind::Void))
    }

    /// Primitive `int`, `float` or `double`
    pub fn is_numeric(&self) -> bool {
        self.primitive().map(|k| k.is_numeric()).unwrap_or(false)
    }

    /// `String`
    pub fn is_string(&self) -> bool {
        matches!(self, Type::Class(id) if *id == ClassId::STRING)
    }

    /// Class, interface, enum, array or null (anything that may hold `null`)
    pub fn is_reference(&self) -> bool {
        !matches!(self, Type::Primitive(_) | Type::Var)
    }

    /// Class id of a class, interface or enum type
    pub fn class_id(&self) -> Option<ClassId> {
        match self {
            Type::Class(id) | Type::Interface(id) | Type::Enum(id) => Some(*id),
            _ => None,
        }
    }

    /// Element type of an array type
    pub fn element_type(&self) -> Option<&Type> {
        match self {
            Type::Array(element) => Some(element),
            _ => None,
        }
    }

    /// Initial value for an attribute, array element, or local of this type
    pub fn default_value(&self) -> Value {
        match self {
            Type::Primitive(kind) => kind.default_value(),
            _ => Value::Null,
        }
    }

    /// Resolve the result type of `self op rhs`
    ///
    /// `rhs` is `None` for unary operators. Returns `None` when the operation
    /// is not defined; there is no fallback.
    pub fn result_type(&self, op: Operator, rhs: Option<&Type>) -> Option<Type> {
        table::result_type(self, op, rhs)
    }

    /// Look up how a value of this type converts to `target`
    pub fn cast_rule(&self, target: &Type, classes: &ClassRegistry) -> Option<CastRule> {
        cast::cast_rule(self, target, classes)
    }

    /// Whether a value of this type may be cast to `target`
    pub fn can_cast_to(&self, target: &Type, classes: &ClassRegistry) -> bool {
        self.cast_rule(target, classes).is_some()
    }

    /// Whether a value of this type may be stored where `target` is expected
    /// without an explicit cast
    pub fn is_assignable_to(&self, target: &Type, classes: &ClassRegistry) -> bool {
        self.cast_rule(target, classes)
            .map(|rule| rule.automatic)
            .unwrap_or(false)
    }
}

impl fmt::Display for PrimitiveKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identifier() {
        let classes = ClassRegistry::new();
        assert_eq!(Type::INT.identifier(&classes), "int");
        assert_eq!(Type::STRING.identifier(&classes), "String");
        assert_eq!(
            Type::array_of(Type::array_of(Type::DOUBLE)).identifier(&classes),
            "double[][]"
        );
        assert_eq!(Type::Class(ClassId::INTEGER).identifier(&classes), "Integer");
    }

    #[test]
    fn test_default_values() {
        assert_eq!(Type::INT.default_value(), Value::Int(0));
        assert_eq!(Type::BOOLEAN.default_value(), Value::Bool(false));
        assert_eq!(Type::CHAR.default_value(), Value::Char('\0'));
        assert_eq!(Type::STRING.default_value(), Value::Null);
    }

    #[test]
    fn test_unboxed() {
        assert_eq!(Type::Class(ClassId::DOUBLE).unboxed(), Some(PrimitiveKind::Double));
        assert_eq!(Type::STRING.unboxed(), None);
        assert_eq!(Type::INT.numeric_view(), Some(PrimitiveKind::Int));
    }
}
