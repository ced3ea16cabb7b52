//! Heap of class instances and arrays

use super::intrinsic::{Intrinsic, IntrinsicData};
use super::object::{ClassId, Object};
use super::{ArrayRef, ClassRegistry, LayoutError, ObjectRef, Value, VmError, VmResult};
use crate::ast::Visibility;
use crate::types::Type;

/// Array storage
#[derive(Debug, Clone, PartialEq)]
pub struct ArrayObject {
    /// Declared element type, fixed at creation
    pub element_type: Type,
    /// Elements
    pub elements: Vec<Value>,
}

/// One attribute of an instance as seen by an inspector
#[derive(Debug, Clone, PartialEq)]
pub struct AttributeView {
    /// Class declaring the attribute
    pub declaring_class: ClassId,
    /// Attribute name
    pub identifier: String,
    /// Declared type
    pub ty: Type,
    /// Access level
    pub visibility: Visibility,
    /// Current value
    pub value: Value,
}

/// Process heap
///
/// Instances are never freed while the process lives; handles stay valid.
#[derive(Debug, Default)]
pub struct Heap {
    objects: Vec<Object>,
    arrays: Vec<ArrayObject>,
}

impl Heap {
    /// Create an empty heap
    pub fn new() -> Self {
        Self::default()
    }

    /// Store an object
    pub fn allocate_object(&mut self, object: Object) -> ObjectRef {
        self.objects.push(object);
        ObjectRef(self.objects.len() as u32 - 1)
    }

    /// Store an array
    pub fn allocate_array(&mut self, array: ArrayObject) -> ArrayRef {
        self.arrays.push(array);
        ArrayRef(self.arrays.len() as u32 - 1)
    }

    /// Get an object
    pub fn object(&self, r: ObjectRef) -> VmResult<&Object> {
        self.objects
            .get(r.0 as usize)
            .ok_or_else(|| VmError::internal(format!("dangling object handle {}", r.0)))
    }

    /// Get a mutable object
    pub fn object_mut(&mut self, r: ObjectRef) -> VmResult<&mut Object> {
        self.objects
            .get_mut(r.0 as usize)
            .ok_or_else(|| VmError::internal(format!("dangling object handle {}", r.0)))
    }

    /// Get an array
    pub fn array(&self, r: ArrayRef) -> VmResult<&ArrayObject> {
        self.arrays
            .get(r.0 as usize)
            .ok_or_else(|| VmError::internal(format!("dangling array handle {}", r.0)))
    }

    /// Get a mutable array
    pub fn array_mut(&mut self, r: ArrayRef) -> VmResult<&mut ArrayObject> {
        self.arrays
            .get_mut(r.0 as usize)
            .ok_or_else(|| VmError::internal(format!("dangling array handle {}", r.0)))
    }

    /// Number of live objects
    pub fn object_count(&self) -> usize {
        self.objects.len()
    }

    /// Create an instance of a finalized class
    ///
    /// Ordinary classes clone the attribute template. Companions zero-fill
    /// and then seed defaults along the base chain. Collection classes get
    /// their helper attached.
    pub fn instantiate(&mut self, class: ClassId, classes: &ClassRegistry) -> VmResult<ObjectRef> {
        let descriptor = classes.class(class)?;
        let layout = descriptor
            .layout
            .as_ref()
            .ok_or_else(|| LayoutError::NotFinalized(descriptor.name.clone()))?;
        let attributes = if descriptor.is_static() {
            static_slots(class, layout.slot_count(), classes)
        } else {
            layout.template.clone()
        };
        let mut intrinsic = IntrinsicData::default();
        if let Some(kind) = classes
            .ancestors(class)
            .into_iter()
            .filter_map(|c| classes.get_class(c))
            .find_map(|c| c.intrinsic)
        {
            intrinsic.insert(Intrinsic::empty(kind));
        }
        Ok(self.allocate_object(Object {
            class_id: class,
            attributes,
            ordinal: None,
            intrinsic,
        }))
    }

    /// Create an array of `length` default elements
    pub fn new_array(&mut self, element_type: Type, length: usize) -> ArrayRef {
        let elements = vec![element_type.default_value(); length];
        self.allocate_array(ArrayObject {
            element_type,
            elements,
        })
    }

    /// Create nested arrays for `new T[a][b]...`
    ///
    /// `element_type` is the type of the innermost elements. Trailing
    /// unsized dimensions are covered by `extra_dimensions` and stay `null`.
    pub fn new_multi_array(&mut self, element_type: &Type, lengths: &[usize], extra_dimensions: usize) -> ArrayRef {
        let mut leaf = element_type.clone();
        for _ in 0..extra_dimensions {
            leaf = Type::array_of(leaf);
        }
        self.build_nested(&leaf, lengths)
    }

    fn build_nested(&mut self, leaf: &Type, lengths: &[usize]) -> ArrayRef {
        let Some((&length, rest)) = lengths.split_first() else {
            return self.new_array(leaf.clone(), 0);
        };
        if rest.is_empty() {
            return self.new_array(leaf.clone(), length);
        }
        let mut element_type = leaf.clone();
        for _ in 0..rest.len() {
            element_type = Type::array_of(element_type);
        }
        let elements = (0..length)
            .map(|_| Value::Array(self.build_nested(leaf, rest)))
            .collect();
        self.allocate_array(ArrayObject {
            element_type,
            elements,
        })
    }

    /// Attributes of an instance whose visibility is at least as open as
    /// `visibility`, in slot order
    pub fn inspect(
        &self,
        object: ObjectRef,
        classes: &ClassRegistry,
        visibility: Visibility,
    ) -> VmResult<Vec<AttributeView>> {
        let instance = self.object(object)?;
        let mut views = Vec::new();
        for (declaring_class, attribute) in classes.instance_attributes(instance.class_id) {
            if attribute.visibility > visibility {
                continue;
            }
            let index = attribute
                .index
                .ok_or_else(|| LayoutError::NotFinalized(attribute.identifier.clone()))?;
            views.push(AttributeView {
                declaring_class,
                identifier: attribute.identifier.clone(),
                ty: attribute.ty.clone(),
                visibility: attribute.visibility,
                value: instance.get(index)?.clone(),
            });
        }
        Ok(views)
    }
}

fn static_slots(companion: ClassId, slot_count: usize, classes: &ClassRegistry) -> Vec<Value> {
    let mut slots = vec![Value::Null; slot_count];
    for class in classes.ancestors(companion) {
        let Some(class) = classes.get_class(class) else {
            continue;
        };
        for attribute in &class.attributes {
            if let Some(slot) = attribute.index.and_then(|i| slots.get_mut(i)) {
                *slot = attribute.template_value();
            }
        }
    }
    slots
}
