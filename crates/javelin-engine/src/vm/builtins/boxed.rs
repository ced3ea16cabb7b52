//! Boxed wrapper shells
//!
//! `Integer`, `Float`, `Double`, `Character` and `Boolean` share their
//! primitive's representation; they only add `toString`.

use super::{arg, native};
use crate::types::Type;
use crate::vm::{ClassId, ClassRegistry, RuntimeError, Value};

pub(super) fn install(classes: &mut ClassRegistry) {
    for class in [
        ClassId::INTEGER,
        ClassId::FLOAT,
        ClassId::DOUBLE,
        ClassId::CHARACTER,
        ClassId::BOOLEAN,
    ] {
        native(classes, class, "toString", &[], Type::STRING, |_, args| {
            match arg(args, 0)? {
                Value::Null => Err(RuntimeError::NullPointer.into()),
                value => Ok(Value::string(value.to_text().unwrap_or_default())),
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vm::builtins::call_native;
    use crate::vm::Process;

    #[test]
    fn test_to_string() {
        let mut process = Process::new();
        let text = call_native(&mut process, ClassId::DOUBLE, "toString", &[Value::Double(2.5)]).unwrap();
        assert_eq!(text, Value::string("2.5"));
        let text = call_native(&mut process, ClassId::CHARACTER, "toString", &[Value::Char('z')]).unwrap();
        assert_eq!(text, Value::string("z"));
    }
}
