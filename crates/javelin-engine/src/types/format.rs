//! Display text for debuggers and consoles
//!
//! Compound values share the length budget with their parts: each element
//! gets half of the enclosing budget and output stops with `…` once the
//! budget is spent. Halving also bounds self-referencing graphs.

use super::Type;
use crate::vm::{ArrayRef, ClassKind, ClassRegistry, Heap, Object, ObjectRef, Value};

const ELLIPSIS: &str = "…";
const MIN_BUDGET: usize = 2;

impl Type {
    /// Format `value` of this type in at most about `max_len` characters
    pub fn format(&self, value: &Value, max_len: usize, heap: &Heap, classes: &ClassRegistry) -> String {
        match value {
            Value::Char(c) if self.is_string() => format!("\"{c}\""),
            Value::Char(c) => format!("'{c}'"),
            Value::Str(s) => format!("\"{s}\""),
            Value::Object(r) => format_object(*r, max_len, heap, classes),
            Value::Array(r) => format_array(*r, max_len, heap, classes),
            other => other.to_text().unwrap_or_default(),
        }
    }
}

fn format_array(r: ArrayRef, max_len: usize, heap: &Heap, classes: &ClassRegistry) -> String {
    let Ok(array) = heap.array(r) else {
        return "null".to_string();
    };
    let element_type = &array.element_type;
    let parts = array
        .elements
        .iter()
        .map(|element| element_type.format(element, max_len / 2, heap, classes));
    join_truncated("[", "]", parts, max_len)
}

fn format_object(r: ObjectRef, max_len: usize, heap: &Heap, classes: &ClassRegistry) -> String {
    let Some((object, class)) = heap
        .object(r)
        .ok()
        .and_then(|o| Some((o, classes.get_class(o.class_id)?)))
    else {
        return "null".to_string();
    };

    if class.kind == ClassKind::Enum {
        let name = object
            .ordinal
            .and_then(|ordinal| class.enum_value(ordinal))
            .map(|value| value.identifier.as_str())
            .unwrap_or("?");
        return format!("{}.{}", class.name, name);
    }
    if max_len < MIN_BUDGET {
        return format!("{} {{{ELLIPSIS}}}", class.name);
    }

    let budget = max_len / 2;
    if let Some(text) = format_collection(object, budget, max_len, heap, classes) {
        return format!("{} {}", class.name, text);
    }

    let parts = classes
        .instance_attributes(object.class_id)
        .into_iter()
        .filter_map(|(_, attribute)| {
            let value = object.get(attribute.index?).ok()?;
            Some(format!(
                "{}: {}",
                attribute.identifier,
                attribute.ty.format(value, budget, heap, classes)
            ))
        });
    format!("{} {}", class.name, join_truncated("{", "}", parts, max_len))
}

fn format_collection(
    object: &Object,
    budget: usize,
    max_len: usize,
    heap: &Heap,
    classes: &ClassRegistry,
) -> Option<String> {
    let element = |value: &Value| Type::OBJECT.format(value, budget, heap, classes);
    if let Some(list) = object.intrinsic.list() {
        return Some(join_truncated("[", "]", list.items.iter().map(element), max_len));
    }
    if let Some(set) = object.intrinsic.set() {
        return Some(join_truncated("[", "]", set.items().iter().map(element), max_len));
    }
    let map = object.intrinsic.map()?;
    let entries = map
        .entries()
        .map(|(key, value)| format!("{} => {}", element(key), element(value)));
    Some(join_truncated("[", "]", entries, max_len))
}

fn join_truncated(open: &str, close: &str, parts: impl Iterator<Item = String>, max_len: usize) -> String {
    let mut out = String::from(open);
    let mut length = open.chars().count();
    for (i, part) in parts.enumerate() {
        let separator = if i == 0 { "" } else { ", " };
        let part_length = part.chars().count() + separator.len();
        out.push_str(separator);
        if length + part_length > max_len {
            out.push_str(ELLIPSIS);
            break;
        }
        out.push_str(&part);
        length += part_length;
    }
    out.push_str(close);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vm::{ArrayObject, Attribute, EnumValue};

    fn format(ty: &Type, value: &Value, max_len: usize, heap: &Heap, classes: &ClassRegistry) -> String {
        ty.format(value, max_len, heap, classes)
    }

    #[test]
    fn test_primitives() {
        let (heap, classes) = (Heap::new(), ClassRegistry::new());
        assert_eq!(format(&Type::INT, &Value::Int(42), 40, &heap, &classes), "42");
        assert_eq!(format(&Type::DOUBLE, &Value::Double(1.5), 40, &heap, &classes), "1.5");
        assert_eq!(format(&Type::STRING, &Value::string("hi"), 40, &heap, &classes), "\"hi\"");
        assert_eq!(format(&Type::CHAR, &Value::Char('c'), 40, &heap, &classes), "'c'");
        assert_eq!(format(&Type::STRING, &Value::Null, 40, &heap, &classes), "null");
    }

    #[test]
    fn test_array_truncates() {
        let classes = ClassRegistry::new();
        let mut heap = Heap::new();
        let r = heap.allocate_array(ArrayObject {
            element_type: Type::INT,
            elements: (1..=20).map(Value::Int).collect(),
        });
        let short = format(&Type::array_of(Type::INT), &Value::Array(r), 12, &heap, &classes);
        assert_eq!(short, "[1, 2, 3, 4, …]");
        let long = format(&Type::array_of(Type::INT), &Value::Array(r), 200, &heap, &classes);
        assert!(long.ends_with("19, 20]"));
    }

    #[test]
    fn test_self_reference_terminates() {
        let mut classes = ClassRegistry::new();
        let node = classes.create_class("Node", ClassKind::Class, None);
        classes.add_attribute(node, Attribute::new("next", Type::Class(node))).unwrap();
        classes.finalize_layout(node).unwrap();
        let mut heap = Heap::new();
        let r = heap.instantiate(node, &classes).unwrap();
        heap.object_mut(r).unwrap().set(0, Value::Object(r)).unwrap();

        let text = format(&Type::Class(node), &Value::Object(r), 40, &heap, &classes);
        assert!(text.starts_with("Node {next: Node {next: "));
        assert!(text.contains(ELLIPSIS));
    }

    #[test]
    fn test_enum_constant() {
        let mut classes = ClassRegistry::new();
        let color = classes.create_class("Color", ClassKind::Enum, None);
        classes.finalize_layout(color).unwrap();
        let mut heap = Heap::new();
        let red = heap.instantiate(color, &classes).unwrap();
        heap.object_mut(red).unwrap().ordinal = Some(0);
        classes.get_class_mut(color).unwrap().enum_values.push(EnumValue {
            identifier: "RED".to_string(),
            ordinal: 0,
            object: red,
        });
        assert_eq!(format(&Type::Enum(color), &Value::Object(red), 40, &heap, &classes), "Color.RED");
    }
}
