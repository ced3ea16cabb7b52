//! `Object` methods

use super::{arg, native};
use crate::types::Type;
use crate::vm::{ClassId, ClassRegistry, Process, Value, VmResult};

pub(super) fn install(classes: &mut ClassRegistry) {
    native(classes, ClassId::OBJECT, "toString", &[], Type::STRING, |process, args| {
        Ok(Value::string(identity_text(process, arg(args, 0)?)))
    });
    native(
        classes,
        ClassId::OBJECT,
        "equals",
        &[("other", Type::OBJECT)],
        Type::BOOLEAN,
        |_, args| Ok(Value::Bool(arg(args, 0)?.identical(arg(args, 1)?))),
    );
    native(classes, ClassId::OBJECT, "hashCode", &[], Type::INT, |_, args| {
        Ok(Value::Int(hash_code(arg(args, 0)?)))
    });
}

/// `Class@n` for references, canonical text for everything else
fn identity_text(process: &Process, value: &Value) -> String {
    match value {
        Value::Object(r) => {
            let name = process
                .class_of(value)
                .and_then(|c| process.classes.get_class(c))
                .map(|c| c.name.as_str())
                .unwrap_or("Object");
            format!("{}@{}", name, r.0)
        }
        Value::Array(r) => {
            let name = process
                .heap
                .array(*r)
                .map(|a| Type::array_of(a.element_type.clone()).identifier(&process.classes))
                .unwrap_or_else(|_| "Array".to_string());
            format!("{}@{}", name, r.0)
        }
        other => other.to_text().unwrap_or_default(),
    }
}

/// Identity hash for references, content hash for strings
pub(super) fn hash_code(value: &Value) -> i32 {
    match value {
        Value::Null => 0,
        Value::Int(v) => *v,
        Value::Float(v) => v.to_bits() as i32,
        Value::Double(v) => {
            let bits = v.to_bits();
            (bits ^ (bits >> 32)) as i32
        }
        Value::Bool(b) => {
            if *b {
                1231
            } else {
                1237
            }
        }
        Value::Char(c) => *c as i32,
        Value::Str(s) => s
            .encode_utf16()
            .fold(0i32, |hash, unit| hash.wrapping_mul(31).wrapping_add(unit as i32)),
        Value::Object(r) => r.0 as i32,
        Value::Array(r) => r.0 as i32,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vm::builtins::call_native;
    use crate::vm::ClassKind;

    #[test]
    fn test_string_hash_matches_java() {
        assert_eq!(hash_code(&Value::string("")), 0);
        assert_eq!(hash_code(&Value::string("abc")), 96354);
        assert_eq!(hash_code(&Value::Bool(true)), 1231);
    }

    #[test]
    fn test_identity_text() {
        let mut process = Process::new();
        let point = process.classes.create_class("Point", ClassKind::Class, None);
        process.classes.finalize_layout(point).unwrap();
        let r = process.instantiate(point).unwrap();
        assert_eq!(identity_text(&process, &Value::Object(r)), format!("Point@{}", r.0));
        assert_eq!(identity_text(&process, &Value::Int(4)), "4");
    }

    #[test]
    fn test_equals_is_identity() {
        let mut process = Process::new();
        let a = Value::Object(process.instantiate(ClassId::OBJECT).unwrap());
        let b = Value::Object(process.instantiate(ClassId::OBJECT).unwrap());
        let same = call_native(&mut process, ClassId::OBJECT, "equals", &[a.clone(), a.clone()]).unwrap();
        let different = call_native(&mut process, ClassId::OBJECT, "equals", &[a, b]).unwrap();
        assert_eq!(same, Value::Bool(true));
        assert_eq!(different, Value::Bool(false));
    }
}
