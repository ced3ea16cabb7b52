//! Rebuilding instance graphs from JSON trees

use super::{DeserializeError, CLASS_KEY, INDEX_KEY};
use crate::types::{PrimitiveKind, Type};
use crate::vm::{ArrayObject, ArrayRef, ClassId, ClassKind, ObjectRef, Process, Value, VmError};
use rustc_hash::FxHashMap;
use serde_json::{Map, Value as Json};

/// Rebuild a value of type `expected` from `tree`
///
/// Objects get fresh heap instances. References to objects that are not yet
/// materialized are patched in a second pass.
pub fn deserialize(tree: &Json, expected: &Type, process: &mut Process) -> Result<Value, DeserializeError> {
    let mut decoder = Decoder {
        process,
        objects: FxHashMap::default(),
        fixups: Vec::new(),
    };
    let value = match decoder.decode(tree, expected)? {
        Decoded::Ready(value) => value,
        Decoded::Pending(index) => return Err(DeserializeError::UnresolvedReference(index)),
    };
    decoder.resolve_fixups()?;
    Ok(value)
}

/// Location waiting for a forward reference
#[derive(Debug, Clone, Copy)]
enum Slot {
    Attribute { object: ObjectRef, index: usize },
    Element { array: ArrayRef, index: usize },
}

enum Decoded {
    Ready(Value),
    /// Reference to an object index not materialized yet
    Pending(usize),
}

struct Decoder<'p> {
    process: &'p mut Process,
    objects: FxHashMap<usize, ObjectRef>,
    fixups: Vec<(Slot, usize)>,
}

impl Decoder<'_> {
    fn decode(&mut self, tree: &Json, expected: &Type) -> Result<Decoded, DeserializeError> {
        if tree.is_null() {
            return match expected {
                Type::Primitive(_) => Err(self.mismatch(expected, tree)),
                _ => Ok(Decoded::Ready(Value::Null)),
            };
        }
        if let Some(kind) = expected.numeric_view() {
            return self.primitive(tree, kind, expected).map(Decoded::Ready);
        }
        match expected {
            Type::Class(ClassId::STRING) => match tree {
                Json::String(s) => Ok(Decoded::Ready(Value::string(s))),
                _ => Err(self.mismatch(expected, tree)),
            },
            Type::Array(element) => self.array(tree, element, expected).map(Decoded::Ready),
            Type::Enum(class) => self.enum_value(tree, *class, expected).map(Decoded::Ready),
            Type::Class(class) | Type::Interface(class) => self.object(tree, *class, expected),
            _ => Err(self.mismatch(expected, tree)),
        }
    }

    fn mismatch(&self, expected: &Type, found: &Json) -> DeserializeError {
        let found = match found {
            Json::Null => "null",
            Json::Bool(_) => "boolean",
            Json::Number(_) => "number",
            Json::String(_) => "string",
            Json::Array(_) => "array",
            Json::Object(_) => "object",
        };
        DeserializeError::TypeMismatch {
            expected: expected.identifier(&self.process.classes),
            found: found.to_string(),
        }
    }

    fn primitive(&self, tree: &Json, kind: PrimitiveKind, expected: &Type) -> Result<Value, DeserializeError> {
        let value = match kind {
            PrimitiveKind::Int => tree
                .as_i64()
                .and_then(|v| i32::try_from(v).ok())
                .map(Value::Int),
            PrimitiveKind::Float => tree.as_f64().map(|v| Value::Float(v as f32)),
            PrimitiveKind::Double => tree.as_f64().map(Value::Double),
            PrimitiveKind::Boolean => tree.as_bool().map(Value::Bool),
            PrimitiveKind::Char => tree.as_str().and_then(|s| {
                let mut chars = s.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => Some(Value::Char(c)),
                    _ => None,
                }
            }),
            PrimitiveKind::Void => None,
        };
        value.ok_or_else(|| self.mismatch(expected, tree))
    }

    fn array(&mut self, tree: &Json, element: &Type, expected: &Type) -> Result<Value, DeserializeError> {
        let Json::Array(items) = tree else {
            return Err(self.mismatch(expected, tree));
        };
        let array = self.process.heap.allocate_array(ArrayObject {
            element_type: element.clone(),
            elements: vec![element.default_value(); items.len()],
        });
        for (index, item) in items.iter().enumerate() {
            let decoded = self.decode(item, element)?;
            self.store(Slot::Element { array, index }, decoded)?;
        }
        Ok(Value::Array(array))
    }

    fn enum_value(&self, tree: &Json, class: ClassId, expected: &Type) -> Result<Value, DeserializeError> {
        let object = tree
            .as_u64()
            .and_then(|ordinal| usize::try_from(ordinal).ok())
            .and_then(|ordinal| self.process.classes.get_class(class)?.enum_value(ordinal))
            .map(|value| value.object);
        object
            .map(Value::Object)
            .ok_or_else(|| self.mismatch(expected, tree))
    }

    fn object(&mut self, tree: &Json, expected_class: ClassId, expected: &Type) -> Result<Decoded, DeserializeError> {
        // boxed values and strings held in Object-typed slots
        match tree {
            Json::Bool(b) => return Ok(Decoded::Ready(Value::Bool(*b))),
            Json::String(s) => return Ok(Decoded::Ready(Value::string(s))),
            Json::Number(n) => {
                let value = match n.as_i64().and_then(|v| i32::try_from(v).ok()) {
                    Some(v) => Value::Int(v),
                    None => Value::Double(n.as_f64().unwrap_or_default()),
                };
                return Ok(Decoded::Ready(value));
            }
            _ => {}
        }
        let Json::Object(node) = tree else {
            return Err(self.mismatch(expected, tree));
        };
        let index = node
            .get(INDEX_KEY)
            .and_then(Json::as_u64)
            .and_then(|i| usize::try_from(i).ok())
            .ok_or_else(|| DeserializeError::Malformed(format!("object node without {}", INDEX_KEY)))?;

        let Some(class_name) = node.get(CLASS_KEY) else {
            return Ok(match self.objects.get(&index) {
                Some(object) => Decoded::Ready(Value::Object(*object)),
                None => Decoded::Pending(index),
            });
        };
        let class_name = class_name
            .as_str()
            .ok_or_else(|| DeserializeError::Malformed(format!("{} is not a string", CLASS_KEY)))?;
        let class = self
            .process
            .classes
            .get_class_by_name(class_name)
            .filter(|c| matches!(c.kind, ClassKind::Class))
            .map(|c| c.id)
            .ok_or_else(|| DeserializeError::UnknownClass(class_name.to_string()))?;
        if !self.process.classes.is_subclass_of(class, expected_class) {
            return Err(DeserializeError::TypeMismatch {
                expected: expected.identifier(&self.process.classes),
                found: class_name.to_string(),
            });
        }

        let object = self.process.instantiate(class)?;
        self.objects.insert(index, object);
        tracing::trace!(class = class_name, index, "materialized object");
        for owner in self.process.classes.ancestors(class) {
            self.attributes(node, object, owner)?;
        }
        Ok(Decoded::Ready(Value::Object(object)))
    }

    /// Fill the attributes `owner` declares from its section of `node`
    fn attributes(&mut self, node: &Map<String, Json>, object: ObjectRef, owner: ClassId) -> Result<(), DeserializeError> {
        let (name, attributes) = match self.process.classes.get_class(owner) {
            Some(class) => (
                class.name.clone(),
                class
                    .attributes
                    .iter()
                    .filter(|a| !a.is_static && !a.is_transient)
                    .filter_map(|a| a.index.map(|index| (a.identifier.clone(), a.ty.clone(), index)))
                    .collect::<Vec<_>>(),
            ),
            None => return Ok(()),
        };
        let Some(section) = node.get(&name) else {
            return Ok(());
        };
        let Json::Object(section) = section else {
            return Err(DeserializeError::Malformed(format!("section {} is not an object", name)));
        };
        for (identifier, ty, index) in attributes {
            let Some(value) = section.get(&identifier) else {
                continue;
            };
            let decoded = self.decode(value, &ty)?;
            self.store(Slot::Attribute { object, index }, decoded)?;
        }
        Ok(())
    }

    fn store(&mut self, slot: Slot, decoded: Decoded) -> Result<(), DeserializeError> {
        match decoded {
            Decoded::Ready(value) => self.write(slot, value),
            Decoded::Pending(index) => {
                self.fixups.push((slot, index));
                Ok(())
            }
        }
    }

    fn write(&mut self, slot: Slot, value: Value) -> Result<(), DeserializeError> {
        match slot {
            Slot::Attribute { object, index } => {
                self.process
                    .heap
                    .object_mut(object)?
                    .set(index, value)
                    .map_err(VmError::from)?;
            }
            Slot::Element { array, index } => {
                let array = self.process.heap.array_mut(array)?;
                match array.elements.get_mut(index) {
                    Some(element) => *element = value,
                    None => return Err(VmError::Internal(format!("element {} out of range", index)).into()),
                }
            }
        }
        Ok(())
    }

    fn resolve_fixups(&mut self) -> Result<(), DeserializeError> {
        for (slot, index) in std::mem::take(&mut self.fixups) {
            let object = self
                .objects
                .get(&index)
                .copied()
                .ok_or(DeserializeError::UnresolvedReference(index))?;
            self.write(slot, Value::Object(object))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vm::{Attribute, ClassKind};
    use serde_json::json;

    fn pair_class(process: &mut Process) -> ClassId {
        let pair = process.classes.create_class("Pair", ClassKind::Class, None);
        process
            .classes
            .add_attribute(pair, Attribute::new("left", Type::Class(pair)))
            .unwrap();
        process
            .classes
            .add_attribute(pair, Attribute::new("right", Type::Class(pair)))
            .unwrap();
        process.classes.finalize_layout(pair).unwrap();
        pair
    }

    #[test]
    fn test_forward_reference_is_fixed_up() {
        let mut process = Process::new();
        let pair = pair_class(&mut process);
        // the reference to object 1 appears before object 1 itself
        let tree = json!([
            {"!i": 1},
            {"!k": "Pair", "!i": 1, "Pair": {"left": null, "right": null}}
        ]);
        let value = deserialize(&tree, &Type::array_of(Type::Class(pair)), &mut process).unwrap();
        let array = process.heap.array(value.as_array().unwrap()).unwrap();
        assert_eq!(array.elements[0], array.elements[1]);
        assert!(array.elements[0].as_object().is_some());
    }

    #[test]
    fn test_errors() {
        let mut process = Process::new();
        let pair = pair_class(&mut process);
        assert!(matches!(
            deserialize(&json!({"!k": "Nope", "!i": 0}), &Type::Class(pair), &mut process),
            Err(DeserializeError::UnknownClass(name)) if name == "Nope"
        ));
        assert!(matches!(
            deserialize(&json!({"!k": "Pair", "!i": 0, "Pair": {"left": {"!i": 5}}}), &Type::Class(pair), &mut process),
            Err(DeserializeError::UnresolvedReference(5))
        ));
        assert!(matches!(
            deserialize(&json!("text"), &Type::INT, &mut process),
            Err(DeserializeError::TypeMismatch { .. })
        ));
        assert!(matches!(
            deserialize(&json!({"left": null}), &Type::Class(pair), &mut process),
            Err(DeserializeError::Malformed(_))
        ));
    }

    #[test]
    fn test_primitives() {
        let mut process = Process::new();
        assert_eq!(deserialize(&json!(4), &Type::INT, &mut process).unwrap(), Value::Int(4));
        assert_eq!(deserialize(&json!("c"), &Type::CHAR, &mut process).unwrap(), Value::Char('c'));
        assert_eq!(
            deserialize(&json!(2.5), &Type::Class(ClassId::DOUBLE), &mut process).unwrap(),
            Value::Double(2.5)
        );
        assert_eq!(deserialize(&json!(null), &Type::STRING, &mut process).unwrap(), Value::Null);
    }
}
