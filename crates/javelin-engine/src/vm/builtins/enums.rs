//! Methods every enum gets

use super::{native, object};
use crate::types::Type;
use crate::vm::{ArrayObject, ClassId, ClassRegistry, Method, Process, Value, VmError, VmResult};
use std::rc::Rc;

/// Add `toString`, `toOrdinal` and static `getValues` to an enum class
pub fn install_enum_methods(classes: &mut ClassRegistry, enumeration: ClassId) {
    native(classes, enumeration, "toString", &[], Type::STRING, |process, args| {
        let (class, ordinal) = constant(process, args)?;
        let name = process
            .classes
            .class(class)?
            .enum_value(ordinal)
            .map(|value| value.identifier.clone())
            .ok_or_else(|| VmError::internal(format!("no enum constant with ordinal {ordinal}")))?;
        Ok(Value::string(name))
    });
    native(classes, enumeration, "toOrdinal", &[], Type::INT, |process, args| {
        let (_, ordinal) = constant(process, args)?;
        Ok(Value::Int(ordinal as i32))
    });

    let values = Method::native(
        "getValues",
        enumeration,
        Vec::new(),
        Type::array_of(Type::Enum(enumeration)),
        Rc::new(move |process: &mut Process, _: &[Value]| {
            let elements = process
                .classes
                .class(enumeration)?
                .enum_values
                .iter()
                .map(|value| Value::Object(value.object))
                .collect();
            let array = process.heap.allocate_array(ArrayObject {
                element_type: Type::Enum(enumeration),
                elements,
            });
            Ok(Value::Array(array))
        }),
    )
    .with_static();
    classes.add_method(enumeration, values);
}

fn constant(process: &Process, args: &[Value]) -> VmResult<(ClassId, usize)> {
    let receiver = process.heap.object(object(args, 0)?)?;
    let ordinal = receiver
        .ordinal
        .ok_or_else(|| VmError::internal("enum receiver without ordinal"))?;
    Ok((receiver.class_id, ordinal))
}
