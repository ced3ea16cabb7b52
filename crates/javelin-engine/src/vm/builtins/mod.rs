//! System module: native methods of the built-in classes
//!
//! Each submodule installs the methods of one class family into a
//! [`ClassRegistry`]. Native bodies receive the receiver (or the static
//! companion) at `args[0]`, followed by the call arguments.

mod boxed;
mod collections;
mod enums;
mod object;
mod string;

pub use enums::install_enum_methods;

use super::{ClassId, ClassRegistry, Method, MethodId, ObjectRef, Parameter, Process, RuntimeError, Value, VmError, VmResult};
use crate::types::Type;
use std::rc::Rc;

/// Install the system classes' methods
pub fn install(classes: &mut ClassRegistry) {
    object::install(classes);
    string::install(classes);
    boxed::install(classes);
    collections::install(classes);
    tracing::debug!(classes = classes.iter().count(), "system module installed");
}

/// Register a native instance method on `owner`
fn native<F>(
    classes: &mut ClassRegistry,
    owner: ClassId,
    name: &str,
    params: &[(&str, Type)],
    return_type: Type,
    body: F,
) -> MethodId
where
    F: Fn(&mut Process, &[Value]) -> VmResult<Value> + 'static,
{
    let params = params
        .iter()
        .map(|(name, ty)| Parameter {
            name: name.to_string(),
            ty: ty.clone(),
        })
        .collect();
    classes.add_method(owner, Method::native(name, owner, params, return_type, Rc::new(body)))
}

// ============================================================================
// Argument access
// ============================================================================

fn arg(args: &[Value], index: usize) -> VmResult<&Value> {
    args.get(index)
        .ok_or_else(|| VmError::internal(format!("native call is missing argument {index}")))
}

fn text(args: &[Value], index: usize) -> VmResult<String> {
    match arg(args, index)? {
        Value::Null => Err(RuntimeError::NullPointer.into()),
        value => value.as_text().map(|t| t.into_owned()).ok_or_else(|| {
            RuntimeError::InvalidOperand {
                expected: "String",
                found: value.kind_name(),
            }
            .into()
        }),
    }
}

fn int(args: &[Value], index: usize) -> VmResult<i32> {
    match arg(args, index)? {
        Value::Null => Err(RuntimeError::NullPointer.into()),
        value => value.as_i32().ok_or_else(|| {
            RuntimeError::InvalidOperand {
                expected: "int",
                found: value.kind_name(),
            }
            .into()
        }),
    }
}

fn object(args: &[Value], index: usize) -> VmResult<ObjectRef> {
    match arg(args, index)? {
        Value::Object(r) => Ok(*r),
        Value::Null => Err(RuntimeError::NullPointer.into()),
        value => Err(RuntimeError::InvalidOperand {
            expected: "object",
            found: value.kind_name(),
        }
        .into()),
    }
}

/// Call the native overload of `class.name` whose arity fits `args`
#[cfg(test)]
pub(crate) fn call_native(process: &mut Process, class: ClassId, name: &str, args: &[Value]) -> VmResult<Value> {
    use super::MethodBody;
    let body = process
        .classes
        .find_methods(class, name)
        .into_iter()
        .filter_map(|id| process.classes.method(id))
        .find(|m| m.params.len() + 1 == args.len())
        .and_then(|m| match &m.body {
            MethodBody::Native(body) => Some(body.clone()),
            _ => None,
        })
        .ok_or_else(|| VmError::internal(format!("no native {name}/{}", args.len() - 1)))?;
    body(process, args)
}
