//! Class, method and instance representation

use super::intrinsic::{IntrinsicData, IntrinsicKind};
use super::{LayoutError, ObjectRef, Process, Value, VmResult};
use crate::ast::{TextPosition, Visibility};
use crate::compiler::Program;
use crate::types::{PrimitiveKind, Type};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::rc::Rc;

/// Index of a class in the [`ClassRegistry`](super::ClassRegistry)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ClassId(pub usize);

impl ClassId {
    /// `Object`, root of every class chain
    pub const OBJECT: ClassId = ClassId(0);
    /// `String`
    pub const STRING: ClassId = ClassId(1);
    /// `Integer`
    pub const INTEGER: ClassId = ClassId(2);
    /// `Float`
    pub const FLOAT: ClassId = ClassId(3);
    /// `Double`
    pub const DOUBLE: ClassId = ClassId(4);
    /// `Character`
    pub const CHARACTER: ClassId = ClassId(5);
    /// `Boolean`
    pub const BOOLEAN: ClassId = ClassId(6);

    /// Primitive wrapped by this class, if it is a boxed wrapper
    pub fn boxed_primitive(self) -> Option<PrimitiveKind> {
        match self {
            ClassId::INTEGER => Some(PrimitiveKind::Int),
            ClassId::FLOAT => Some(PrimitiveKind::Float),
            ClassId::DOUBLE => Some(PrimitiveKind::Double),
            ClassId::CHARACTER => Some(PrimitiveKind::Char),
            ClassId::BOOLEAN => Some(PrimitiveKind::Boolean),
            _ => None,
        }
    }
}

/// Index of a method in the [`ClassRegistry`](super::ClassRegistry)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MethodId(pub usize);

/// Class kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassKind {
    /// Ordinary class
    Class,
    /// Interface (signatures only, no storage)
    Interface,
    /// Enum with a fixed set of instances
    Enum,
    /// Companion holding the static members of `owner`
    Static {
        /// Class whose statics this companion stores
        owner: ClassId,
    },
}

/// Attribute descriptor
#[derive(Debug, Clone, Serialize)]
pub struct Attribute {
    /// Attribute name
    pub identifier: String,
    /// Declared type
    pub ty: Type,
    /// Stored on the static companion
    pub is_static: bool,
    /// Skipped by serialization
    pub is_transient: bool,
    /// Access level
    pub visibility: Visibility,
    /// Slot assigned at layout finalization, unique across the base chain
    pub index: Option<usize>,
    /// Constant initializer baked into the attribute template
    pub initial_value: Option<Value>,
    /// Declaration position
    pub position: TextPosition,
}

impl Attribute {
    /// New instance attribute with no initializer
    pub fn new(identifier: impl Into<String>, ty: Type) -> Self {
        Self {
            identifier: identifier.into(),
            ty,
            is_static: false,
            is_transient: false,
            visibility: Visibility::Public,
            index: None,
            initial_value: None,
            position: TextPosition::synthetic(),
        }
    }

    /// Value the attribute holds before any initializer statement runs
    pub fn template_value(&self) -> Value {
        self.initial_value
            .clone()
            .unwrap_or_else(|| self.ty.default_value())
    }
}

/// Method parameter
#[derive(Debug, Clone, Serialize)]
pub struct Parameter {
    /// Parameter name
    pub name: String,
    /// Declared type
    pub ty: Type,
}

/// Native method body; the receiver (or static companion) is `args[0]`
pub type NativeFn = Rc<dyn Fn(&mut Process, &[Value]) -> VmResult<Value>>;

/// Executable body of a method
#[derive(Clone)]
pub enum MethodBody {
    /// Built-in implementation
    Native(NativeFn),
    /// Generated step sequence
    Program(Rc<Program>),
    /// Interface or abstract method
    Abstract,
    /// Declared, code not generated yet
    Pending,
}

impl fmt::Debug for MethodBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MethodBody::Native(_) => f.write_str("Native"),
            MethodBody::Program(program) => write!(f, "Program({} steps)", program.steps.len()),
            MethodBody::Abstract => f.write_str("Abstract"),
            MethodBody::Pending => f.write_str("Pending"),
        }
    }
}

/// Method descriptor
#[derive(Debug, Clone)]
pub struct Method {
    /// Method id
    pub id: MethodId,
    /// Method name (`<init>` for constructors)
    pub name: String,
    /// Parameters, excluding the receiver
    pub params: Vec<Parameter>,
    /// Return type (`void` for constructors' declared type)
    pub return_type: Type,
    /// Static method
    pub is_static: bool,
    /// Constructor
    pub is_constructor: bool,
    /// Abstract or interface method
    pub is_abstract: bool,
    /// Access level
    pub visibility: Visibility,
    /// Declaring class
    pub owner: ClassId,
    /// Code
    pub body: MethodBody,
    /// Declaration position
    pub declaration: TextPosition,
    /// Position of the first statement, if the method has a body
    pub first_statement: Option<TextPosition>,
    /// Call sites seen during generation
    pub usage_positions: Vec<TextPosition>,
}

impl Method {
    /// Constructor method name
    pub const CONSTRUCTOR: &'static str = "<init>";

    /// New public instance method
    pub fn new(name: impl Into<String>, owner: ClassId, params: Vec<Parameter>, return_type: Type) -> Self {
        Self {
            id: MethodId(usize::MAX),
            name: name.into(),
            params,
            return_type,
            is_static: false,
            is_constructor: false,
            is_abstract: false,
            visibility: Visibility::Public,
            owner,
            body: MethodBody::Pending,
            declaration: TextPosition::synthetic(),
            first_statement: None,
            usage_positions: Vec::new(),
        }
    }

    /// New native method
    pub fn native(
        name: impl Into<String>,
        owner: ClassId,
        params: Vec<Parameter>,
        return_type: Type,
        body: NativeFn,
    ) -> Self {
        Self {
            body: MethodBody::Native(body),
            ..Self::new(name, owner, params, return_type)
        }
    }

    /// Mark static
    pub fn with_static(mut self) -> Self {
        self.is_static = true;
        self
    }

    /// Same name and parameter types
    pub fn same_signature(&self, other: &Method) -> bool {
        self.name == other.name
            && self.params.len() == other.params.len()
            && self
                .params
                .iter()
                .zip(&other.params)
                .all(|(a, b)| a.ty == b.ty)
    }

    /// Most useful position for stack traces
    pub fn entry_position(&self) -> TextPosition {
        self.first_statement.unwrap_or(self.declaration)
    }
}

/// Finalized instance shape
#[derive(Debug, Clone, Serialize)]
pub struct Layout {
    /// Initial slot values, one per attribute index
    pub template: Vec<Value>,
}

impl Layout {
    /// Number of slots
    pub fn slot_count(&self) -> usize {
        self.template.len()
    }
}

/// One declared enum constant
#[derive(Debug, Clone, Serialize)]
pub struct EnumValue {
    /// Constant name
    pub identifier: String,
    /// Declaration order
    pub ordinal: usize,
    /// The single instance
    pub object: ObjectRef,
}

/// Class metadata
#[derive(Debug, Clone)]
pub struct Class {
    /// Class id
    pub id: ClassId,
    /// Class name
    pub name: String,
    /// Class kind
    pub kind: ClassKind,
    /// Base class (`None` only for `Object` and companions of root classes)
    pub base_class: Option<ClassId>,
    /// Implemented (or, for interfaces, extended) interfaces
    pub interfaces: Vec<ClassId>,
    /// Own attributes in declaration order
    pub attributes: Vec<Attribute>,
    /// Overload groups by method name
    pub method_groups: FxHashMap<String, Vec<MethodId>>,
    /// Own methods in declaration order
    pub methods: Vec<MethodId>,
    /// Static companion
    pub static_class: Option<ClassId>,
    /// Instance shape, set once by layout finalization
    pub layout: Option<Layout>,
    /// Cached companion singleton (on companions only)
    pub class_object: Option<ObjectRef>,
    /// Provided by the system module
    pub is_system: bool,
    /// Included in serialized graphs even if it is a system class
    pub serializable: bool,
    /// Enum constants in declaration order
    pub enum_values: Vec<EnumValue>,
    /// Helper attached to every instance
    pub intrinsic: Option<IntrinsicKind>,
    /// Declaration position
    pub position: TextPosition,
}

impl Class {
    /// Create a class with no members
    pub fn new(id: ClassId, name: impl Into<String>, kind: ClassKind) -> Self {
        Self {
            id,
            name: name.into(),
            kind,
            base_class: None,
            interfaces: Vec::new(),
            attributes: Vec::new(),
            method_groups: FxHashMap::default(),
            methods: Vec::new(),
            static_class: None,
            layout: None,
            class_object: None,
            is_system: false,
            serializable: false,
            enum_values: Vec::new(),
            intrinsic: None,
            position: TextPosition::synthetic(),
        }
    }

    /// Companion class
    pub fn is_static(&self) -> bool {
        matches!(self.kind, ClassKind::Static { .. })
    }

    /// Static type naming this class
    pub fn ty(&self) -> Type {
        match self.kind {
            ClassKind::Interface => Type::Interface(self.id),
            ClassKind::Enum => Type::Enum(self.id),
            ClassKind::Class | ClassKind::Static { .. } => Type::Class(self.id),
        }
    }

    /// Own attribute by name
    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes.iter().find(|a| a.identifier == name)
    }

    /// Own overloads of `name`
    pub fn overloads(&self, name: &str) -> &[MethodId] {
        self.method_groups
            .get(name)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Enum constant by ordinal
    pub fn enum_value(&self, ordinal: usize) -> Option<&EnumValue> {
        self.enum_values.get(ordinal)
    }
}

/// Class instance
#[derive(Debug, Clone)]
pub struct Object {
    /// Dynamic class
    pub class_id: ClassId,
    /// Attribute slots, sized to the finalized layout
    pub attributes: Vec<Value>,
    /// Ordinal of an enum constant
    pub ordinal: Option<usize>,
    /// Helpers of built-in collection classes
    pub intrinsic: IntrinsicData,
}

impl Object {
    /// Read a slot
    pub fn get(&self, index: usize) -> Result<&Value, LayoutError> {
        self.attributes
            .get(index)
            .ok_or(LayoutError::AttributeIndexOutOfRange {
                index,
                len: self.attributes.len(),
            })
    }

    /// Write a slot
    pub fn set(&mut self, index: usize, value: Value) -> Result<(), LayoutError> {
        let len = self.attributes.len();
        let slot = self
            .attributes
            .get_mut(index)
            .ok_or(LayoutError::AttributeIndexOutOfRange { index, len })?;
        *slot = value;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_boxed_primitive() {
        assert_eq!(ClassId::INTEGER.boxed_primitive(), Some(PrimitiveKind::Int));
        assert_eq!(ClassId::CHARACTER.boxed_primitive(), Some(PrimitiveKind::Char));
        assert_eq!(ClassId::STRING.boxed_primitive(), None);
    }

    #[test]
    fn test_slot_bounds() {
        let mut object = Object {
            class_id: ClassId(9),
            attributes: vec![Value::Int(0); 2],
            ordinal: None,
            intrinsic: IntrinsicData::default(),
        };
        object.set(1, Value::Int(5)).unwrap();
        assert_eq!(object.get(1), Ok(&Value::Int(5)));
        assert_eq!(
            object.set(2, Value::Null),
            Err(LayoutError::AttributeIndexOutOfRange { index: 2, len: 2 })
        );
    }

    #[test]
    fn test_same_signature() {
        let a = Method::new("f", ClassId(9), vec![Parameter { name: "x".into(), ty: Type::INT }], Type::VOID);
        let mut b = a.clone();
        b.params[0].name = "y".into();
        assert!(a.same_signature(&b));
        b.params[0].ty = Type::DOUBLE;
        assert!(!a.same_signature(&b));
    }
}
