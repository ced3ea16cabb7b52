//! `ArrayList`, `HashMap` and `HashSet`
//!
//! Instances keep their elements in an intrinsic helper instead of declared
//! attributes. `toString` goes through statement synthesis so element
//! classes' own `toString` overrides are honored.

use super::{arg, int, native, object};
use crate::types::Type;
use crate::vm::{
    ClassId, ClassKind, ClassRegistry, IntrinsicKind, ListHelper, MapHelper, Process, RuntimeError, SetHelper,
    Value, VmError, VmResult,
};

pub(super) fn install(classes: &mut ClassRegistry) {
    let list = collection_class(classes, "ArrayList", IntrinsicKind::List);
    install_list(classes, list);
    let map = collection_class(classes, "HashMap", IntrinsicKind::Map);
    install_map(classes, map);
    let set = collection_class(classes, "HashSet", IntrinsicKind::Set);
    install_set(classes, set);
}

fn collection_class(classes: &mut ClassRegistry, name: &str, kind: IntrinsicKind) -> ClassId {
    let id = classes.create_class(name, ClassKind::Class, None);
    if let Some(class) = classes.get_class_mut(id) {
        class.is_system = true;
        class.intrinsic = Some(kind);
    }
    if let Some(companion) = classes.companion(id).and_then(|c| classes.get_class_mut(c)) {
        companion.is_system = true;
    }
    if let Err(error) = classes.finalize_layout(id) {
        tracing::warn!(%error, class = name, "system class layout");
    }
    id
}

fn list_mut<'a>(process: &'a mut Process, args: &[Value]) -> VmResult<&'a mut ListHelper> {
    process
        .heap
        .object_mut(object(args, 0)?)?
        .intrinsic
        .list_mut()
        .ok_or_else(|| VmError::internal("receiver is not a list"))
}

fn map_mut<'a>(process: &'a mut Process, args: &[Value]) -> VmResult<&'a mut MapHelper> {
    process
        .heap
        .object_mut(object(args, 0)?)?
        .intrinsic
        .map_mut()
        .ok_or_else(|| VmError::internal("receiver is not a map"))
}

fn set_mut<'a>(process: &'a mut Process, args: &[Value]) -> VmResult<&'a mut SetHelper> {
    process
        .heap
        .object_mut(object(args, 0)?)?
        .intrinsic
        .set_mut()
        .ok_or_else(|| VmError::internal("receiver is not a set"))
}

fn size(len: usize) -> Value {
    Value::Int(len as i32)
}

// ============================================================================
// ArrayList
// ============================================================================

fn install_list(classes: &mut ClassRegistry, list: ClassId) {
    native(classes, list, "add", &[("element", Type::OBJECT)], Type::BOOLEAN, |process, args| {
        let element = arg(args, 1)?.clone();
        list_mut(process, args)?.items.push(element);
        Ok(Value::Bool(true))
    });
    native(classes, list, "get", &[("index", Type::INT)], Type::OBJECT, |process, args| {
        let index = int(args, 1)?;
        let items = &list_mut(process, args)?.items;
        usize::try_from(index)
            .ok()
            .and_then(|i| items.get(i))
            .cloned()
            .ok_or_else(|| {
                RuntimeError::IndexOutOfBounds {
                    index,
                    length: items.len(),
                }
                .into()
            })
    });
    native(classes, list, "size", &[], Type::INT, |process, args| {
        Ok(size(list_mut(process, args)?.items.len()))
    });
    native(classes, list, "isEmpty", &[], Type::BOOLEAN, |process, args| {
        Ok(Value::Bool(list_mut(process, args)?.items.is_empty()))
    });
    native(classes, list, "clear", &[], Type::VOID, |process, args| {
        list_mut(process, args)?.items.clear();
        Ok(Value::Null)
    });
    native(classes, list, "toString", &[], Type::STRING, |process, args| {
        let owner = object(args, 0)?;
        let helper = list_mut(process, args)?.clone();
        Ok(Value::string(helper.to_text(Some(owner), process)?))
    });
}

// ============================================================================
// HashMap
// ============================================================================

fn install_map(classes: &mut ClassRegistry, map: ClassId) {
    native(
        classes,
        map,
        "put",
        &[("key", Type::OBJECT), ("value", Type::OBJECT)],
        Type::OBJECT,
        |process, args| {
            let (key, value) = (arg(args, 1)?.clone(), arg(args, 2)?.clone());
            Ok(map_mut(process, args)?.put(key, value).unwrap_or(Value::Null))
        },
    );
    native(classes, map, "get", &[("key", Type::OBJECT)], Type::OBJECT, |process, args| {
        let key = arg(args, 1)?;
        Ok(map_mut(process, args)?.get(key).cloned().unwrap_or(Value::Null))
    });
    native(classes, map, "containsKey", &[("key", Type::OBJECT)], Type::BOOLEAN, |process, args| {
        let key = arg(args, 1)?;
        Ok(Value::Bool(map_mut(process, args)?.contains_key(key)))
    });
    native(
        classes,
        map,
        "containsValue",
        &[("value", Type::OBJECT)],
        Type::BOOLEAN,
        |process, args| {
            let value = arg(args, 1)?;
            Ok(Value::Bool(map_mut(process, args)?.contains_value(value)))
        },
    );
    native(classes, map, "size", &[], Type::INT, |process, args| {
        Ok(size(map_mut(process, args)?.len()))
    });
    native(classes, map, "isEmpty", &[], Type::BOOLEAN, |process, args| {
        Ok(Value::Bool(map_mut(process, args)?.is_empty()))
    });
    native(classes, map, "clear", &[], Type::VOID, |process, args| {
        map_mut(process, args)?.clear();
        Ok(Value::Null)
    });
    native(classes, map, "toString", &[], Type::STRING, |process, args| {
        let owner = object(args, 0)?;
        let helper = map_mut(process, args)?.clone();
        Ok(Value::string(helper.to_text(Some(owner), process)?))
    });
}

// ============================================================================
// HashSet
// ============================================================================

fn install_set(classes: &mut ClassRegistry, set: ClassId) {
    native(classes, set, "add", &[("element", Type::OBJECT)], Type::BOOLEAN, |process, args| {
        let element = arg(args, 1)?.clone();
        Ok(Value::Bool(set_mut(process, args)?.add(element)))
    });
    native(classes, set, "contains", &[("element", Type::OBJECT)], Type::BOOLEAN, |process, args| {
        let element = arg(args, 1)?;
        Ok(Value::Bool(set_mut(process, args)?.contains(element)))
    });
    native(classes, set, "remove", &[("element", Type::OBJECT)], Type::BOOLEAN, |process, args| {
        let element = arg(args, 1)?;
        Ok(Value::Bool(set_mut(process, args)?.remove(element)))
    });
    native(classes, set, "size", &[], Type::INT, |process, args| {
        Ok(size(set_mut(process, args)?.len()))
    });
    native(classes, set, "isEmpty", &[], Type::BOOLEAN, |process, args| {
        Ok(Value::Bool(set_mut(process, args)?.is_empty()))
    });
    native(classes, set, "clear", &[], Type::VOID, |process, args| {
        set_mut(process, args)?.clear();
        Ok(Value::Null)
    });
    native(
        classes,
        set,
        "addAll",
        &[("elements", Type::Class(set))],
        Type::BOOLEAN,
        |process, args| {
            let source = process.heap.object(object(args, 1)?)?;
            let elements = source
                .intrinsic
                .set()
                .map(|s| s.items().to_vec())
                .ok_or_else(|| VmError::internal("addAll argument is not a set"))?;
            let target = set_mut(process, args)?;
            let mut changed = false;
            for element in elements {
                changed |= target.add(element);
            }
            Ok(Value::Bool(changed))
        },
    );
    native(classes, set, "toString", &[], Type::STRING, |process, args| {
        let owner = object(args, 0)?;
        let helper = set_mut(process, args)?.clone();
        Ok(Value::string(helper.to_text(Some(owner), process)?))
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vm::builtins::call_native;

    fn new_instance(process: &mut Process, name: &str) -> (ClassId, Value) {
        let class = process.classes.get_class_by_name(name).unwrap().id;
        (class, Value::Object(process.instantiate(class).unwrap()))
    }

    #[test]
    fn test_list() {
        let mut process = Process::new();
        let (list, r) = new_instance(&mut process, "ArrayList");
        call_native(&mut process, list, "add", &[r.clone(), Value::Int(5)]).unwrap();
        call_native(&mut process, list, "add", &[r.clone(), Value::string("x")]).unwrap();
        assert_eq!(call_native(&mut process, list, "size", &[r.clone()]).unwrap(), Value::Int(2));
        assert_eq!(
            call_native(&mut process, list, "get", &[r.clone(), Value::Int(1)]).unwrap(),
            Value::string("x")
        );
        assert!(matches!(
            call_native(&mut process, list, "get", &[r.clone(), Value::Int(2)]),
            Err(VmError::Runtime(RuntimeError::IndexOutOfBounds { index: 2, length: 2 }))
        ));
        assert_eq!(
            call_native(&mut process, list, "toString", &[r]).unwrap(),
            Value::string("[5, x]")
        );
    }

    #[test]
    fn test_map_put_replaces_in_place() {
        let mut process = Process::new();
        let (map, r) = new_instance(&mut process, "HashMap");
        for (key, value) in [("a", 1), ("b", 2)] {
            call_native(&mut process, map, "put", &[r.clone(), Value::string(key), Value::Int(value)]).unwrap();
        }
        let old = call_native(&mut process, map, "put", &[r.clone(), Value::string("a"), Value::Int(3)]).unwrap();
        assert_eq!(old, Value::Int(1));
        assert_eq!(
            call_native(&mut process, map, "toString", &[r.clone()]).unwrap(),
            Value::string("[a => 3, b => 2]")
        );
        assert_eq!(
            call_native(&mut process, map, "get", &[r.clone(), Value::string("zz")]).unwrap(),
            Value::Null
        );
        assert_eq!(
            call_native(&mut process, map, "containsValue", &[r, Value::Int(2)]).unwrap(),
            Value::Bool(true)
        );
    }

    #[test]
    fn test_set_add_all() {
        let mut process = Process::new();
        let (set, a) = new_instance(&mut process, "HashSet");
        let (_, b) = new_instance(&mut process, "HashSet");
        call_native(&mut process, set, "add", &[a.clone(), Value::Int(1)]).unwrap();
        call_native(&mut process, set, "add", &[b.clone(), Value::Int(1)]).unwrap();
        call_native(&mut process, set, "add", &[b.clone(), Value::Int(2)]).unwrap();

        let changed = call_native(&mut process, set, "addAll", &[a.clone(), b]).unwrap();
        assert_eq!(changed, Value::Bool(true));
        assert_eq!(call_native(&mut process, set, "size", &[a.clone()]).unwrap(), Value::Int(2));
        assert_eq!(
            call_native(&mut process, set, "remove", &[a.clone(), Value::Int(1)]).unwrap(),
            Value::Bool(true)
        );
        assert_eq!(call_native(&mut process, set, "toString", &[a]).unwrap(), Value::string("[2]"));
    }
}
