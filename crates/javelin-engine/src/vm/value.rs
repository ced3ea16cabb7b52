//! Runtime values
//!
//! Primitives are stored inline. Strings are immutable shared text. Class
//! instances and arrays live in the process [`Heap`](crate::vm::Heap) and
//! are addressed by index, so object graphs may contain cycles without
//! reference-counting loops.
//!
//! Boxed wrapper types (`Integer`, `Double`, ...) share the representation of
//! their primitive; a `null` wrapper is [`Value::Null`].

use serde::Serialize;
use std::borrow::Cow;
use std::fmt;
use std::rc::Rc;

/// Handle to a class instance on the heap
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ObjectRef(pub u32);

/// Handle to an array on the heap
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ArrayRef(pub u32);

/// A runtime value
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Value {
    /// `null`
    Null,
    /// `int` / `Integer` (32-bit, wrapping)
    Int(i32),
    /// `float` / `Float`
    Float(f32),
    /// `double` / `Double`
    Double(f64),
    /// `boolean` / `Boolean`
    Bool(bool),
    /// `char` / `Character`
    Char(char),
    /// `String`
    Str(Rc<str>),
    /// Class instance
    Object(ObjectRef),
    /// Array
    Array(ArrayRef),
}

impl Default for Value {
    fn default() -> Self {
        Value::Null
    }
}

impl Value {
    /// Create a string value
    pub fn string(text: impl AsRef<str>) -> Self {
        Value::Str(Rc::from(text.as_ref()))
    }

    /// Check for `null`
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Primitive, string, or boxed value (everything that is not a heap reference)
    pub fn is_primitive_like(&self) -> bool {
        !matches!(self, Value::Object(_) | Value::Array(_))
    }

    /// Numeric view as `i32` (chars yield their code point)
    pub fn as_i32(&self) -> Option<i32> {
        match self {
            Value::Int(v) => Some(*v),
            Value::Float(v) => Some(*v as i32),
            Value::Double(v) => Some(*v as i32),
            Value::Char(c) => Some(*c as i32),
            _ => None,
        }
    }

    /// Numeric view as `f64` (chars yield their code point)
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(v) => Some(*v as f64),
            Value::Float(v) => Some(*v as f64),
            Value::Double(v) => Some(*v),
            Value::Char(c) => Some(*c as u32 as f64),
            _ => None,
        }
    }

    /// Boolean view
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Char view
    pub fn as_char(&self) -> Option<char> {
        match self {
            Value::Char(c) => Some(*c),
            _ => None,
        }
    }

    /// Text view of a string value
    ///
    /// A `char` stored where a `String` is expected reads as a one-character
    /// string, since the `char` to `String` conversion emits no cast step.
    pub fn as_text(&self) -> Option<Cow<'_, str>> {
        match self {
            Value::Str(s) => Some(Cow::Borrowed(s)),
            Value::Char(c) => Some(Cow::Owned(c.to_string())),
            _ => None,
        }
    }

    /// Object handle
    pub fn as_object(&self) -> Option<ObjectRef> {
        match self {
            Value::Object(r) => Some(*r),
            _ => None,
        }
    }

    /// Array handle
    pub fn as_array(&self) -> Option<ArrayRef> {
        match self {
            Value::Array(r) => Some(*r),
            _ => None,
        }
    }

    /// Canonical text of a primitive-like value
    ///
    /// Integral floating values print without a fraction (`2.0` reads `2`).
    /// Heap references have no canonical text and yield `None`; their text
    /// form comes from a `toString` call.
    pub fn to_text(&self) -> Option<String> {
        match self {
            Value::Null => Some("null".to_string()),
            Value::Int(v) => Some(v.to_string()),
            Value::Float(v) => Some(float_text(*v as f64, v.to_string())),
            Value::Double(v) => Some(float_text(*v, v.to_string())),
            Value::Bool(b) => Some(b.to_string()),
            Value::Char(c) => Some(c.to_string()),
            Value::Str(s) => Some(s.to_string()),
            Value::Object(_) | Value::Array(_) => None,
        }
    }

    /// Reference identity for objects and arrays, value equality otherwise
    pub fn identical(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Object(a), Value::Object(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Null, Value::Null) => true,
            (a, b) if a.is_null() || b.is_null() => false,
            (a, b) => match (a.as_f64(), b.as_f64()) {
                (Some(x), Some(y)) => x == y,
                _ => a == b,
            },
        }
    }

    /// Short name of the value's representation (for error messages)
    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Double(_) => "double",
            Value::Bool(_) => "boolean",
            Value::Char(_) => "char",
            Value::Str(_) => "String",
            Value::Object(_) => "object",
            Value::Array(_) => "array",
        }
    }
}

fn float_text(v: f64, shortest: String) -> String {
    if v.is_infinite() {
        if v > 0.0 { "Infinity" } else { "-Infinity" }.to_string()
    } else {
        shortest
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Object(r) => write!(f, "object#{}", r.0),
            Value::Array(r) => write!(f, "array#{}", r.0),
            other => f.write_str(&other.to_text().unwrap_or_default()),
        }
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Double(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::string(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_text() {
        assert_eq!(Value::Int(7).to_text().unwrap(), "7");
        assert_eq!(Value::Double(2.0).to_text().unwrap(), "2");
        assert_eq!(Value::Double(2.5).to_text().unwrap(), "2.5");
        assert_eq!(Value::Float(0.1).to_text().unwrap(), "0.1");
        assert_eq!(Value::Bool(true).to_text().unwrap(), "true");
        assert_eq!(Value::Char('x').to_text().unwrap(), "x");
        assert_eq!(Value::Null.to_text().unwrap(), "null");
        assert_eq!(Value::Double(f64::INFINITY).to_text().unwrap(), "Infinity");
        assert!(Value::Object(ObjectRef(0)).to_text().is_none());
    }

    #[test]
    fn test_identical() {
        assert!(Value::Int(1).identical(&Value::Double(1.0)));
        assert!(Value::string("a").identical(&Value::string("a")));
        assert!(!Value::Object(ObjectRef(1)).identical(&Value::Object(ObjectRef(2))));
        assert!(!Value::Null.identical(&Value::Int(0)));
        assert!(Value::Null.identical(&Value::Null));
    }

    #[test]
    fn test_char_reads_as_text() {
        assert_eq!(Value::Char('q').as_text().unwrap(), "q");
        assert!(Value::Int(3).as_text().is_none());
    }
}
