//! `String` methods
//!
//! Indices count characters, not bytes.

use super::{arg, int, native, text};
use crate::types::{collate, collate_ignore_case, Type};
use crate::vm::{ClassId, ClassRegistry, RuntimeError, Value, VmResult};
use std::cmp::Ordering;

const STRING: ClassId = ClassId::STRING;

pub(super) fn install(classes: &mut ClassRegistry) {
    native(classes, STRING, "length", &[], Type::INT, |_, args| {
        Ok(Value::Int(text(args, 0)?.chars().count() as i32))
    });
    native(classes, STRING, "charAt", &[("index", Type::INT)], Type::CHAR, |_, args| {
        let s = text(args, 0)?;
        let index = int(args, 1)?;
        usize::try_from(index)
            .ok()
            .and_then(|i| s.chars().nth(i))
            .map(Value::Char)
            .ok_or_else(|| out_of_bounds(index, &s))
    });
    native(classes, STRING, "equals", &[("other", Type::OBJECT)], Type::BOOLEAN, |_, args| {
        let s = text(args, 0)?;
        let equal = arg(args, 1)?.as_text().map(|o| o == s.as_str()).unwrap_or(false);
        Ok(Value::Bool(equal))
    });
    native(classes, STRING, "equalsIgnoreCase", &[("other", Type::STRING)], Type::BOOLEAN, |_, args| {
        let s = text(args, 0)?;
        let equal = arg(args, 1)?
            .as_text()
            .map(|o| o.to_lowercase() == s.to_lowercase())
            .unwrap_or(false);
        Ok(Value::Bool(equal))
    });
    native(classes, STRING, "compareTo", &[("other", Type::STRING)], Type::INT, |_, args| {
        Ok(ordering(collate(&text(args, 0)?, &text(args, 1)?)))
    });
    native(classes, STRING, "compareToIgnoreCase", &[("other", Type::STRING)], Type::INT, |_, args| {
        Ok(ordering(collate_ignore_case(&text(args, 0)?, &text(args, 1)?)))
    });
    native(classes, STRING, "startsWith", &[("prefix", Type::STRING)], Type::BOOLEAN, |_, args| {
        Ok(Value::Bool(text(args, 0)?.starts_with(text(args, 1)?.as_str())))
    });
    native(classes, STRING, "endsWith", &[("suffix", Type::STRING)], Type::BOOLEAN, |_, args| {
        Ok(Value::Bool(text(args, 0)?.ends_with(text(args, 1)?.as_str())))
    });
    native(classes, STRING, "toLowerCase", &[], Type::STRING, |_, args| {
        Ok(Value::string(text(args, 0)?.to_lowercase()))
    });
    native(classes, STRING, "toUpperCase", &[], Type::STRING, |_, args| {
        Ok(Value::string(text(args, 0)?.to_uppercase()))
    });
    native(classes, STRING, "substring", &[("begin", Type::INT)], Type::STRING, |_, args| {
        let s = text(args, 0)?;
        let length = s.chars().count() as i32;
        substring(&s, int(args, 1)?, length)
    });
    native(
        classes,
        STRING,
        "substring",
        &[("begin", Type::INT), ("end", Type::INT)],
        Type::STRING,
        |_, args| substring(&text(args, 0)?, int(args, 1)?, int(args, 2)?),
    );
    native(classes, STRING, "trim", &[], Type::STRING, |_, args| {
        Ok(Value::string(text(args, 0)?.trim()))
    });
    native(classes, STRING, "isEmpty", &[], Type::BOOLEAN, |_, args| {
        Ok(Value::Bool(text(args, 0)?.is_empty()))
    });
    native(classes, STRING, "indexOf", &[("needle", Type::STRING)], Type::INT, |_, args| {
        Ok(Value::Int(index_of(&text(args, 0)?, &text(args, 1)?, 0)))
    });
    native(
        classes,
        STRING,
        "indexOf",
        &[("needle", Type::STRING), ("from", Type::INT)],
        Type::INT,
        |_, args| Ok(Value::Int(index_of(&text(args, 0)?, &text(args, 1)?, int(args, 2)?))),
    );
    native(classes, STRING, "lastIndexOf", &[("needle", Type::STRING)], Type::INT, |_, args| {
        let s = text(args, 0)?;
        let found = s.rfind(text(args, 1)?.as_str()).map(|byte| char_index(&s, byte));
        Ok(Value::Int(found.unwrap_or(-1)))
    });
    native(
        classes,
        STRING,
        "replace",
        &[("target", Type::STRING), ("replacement", Type::STRING)],
        Type::STRING,
        |_, args| {
            let (s, target, replacement) = (text(args, 0)?, text(args, 1)?, text(args, 2)?);
            Ok(Value::string(s.replace(target.as_str(), &replacement)))
        },
    );
    native(classes, STRING, "toString", &[], Type::STRING, |_, args| {
        Ok(Value::string(text(args, 0)?))
    });
}

fn ordering(ordering: Ordering) -> Value {
    Value::Int(match ordering {
        Ordering::Less => -1,
        Ordering::Equal => 0,
        Ordering::Greater => 1,
    })
}

fn out_of_bounds(index: i32, s: &str) -> crate::vm::VmError {
    RuntimeError::IndexOutOfBounds {
        index,
        length: s.chars().count(),
    }
    .into()
}

fn substring(s: &str, begin: i32, end: i32) -> VmResult<Value> {
    let length = s.chars().count() as i32;
    if begin < 0 || begin > length {
        return Err(out_of_bounds(begin, s));
    }
    if end < begin || end > length {
        return Err(out_of_bounds(end, s));
    }
    let part: String = s
        .chars()
        .skip(begin as usize)
        .take((end - begin) as usize)
        .collect();
    Ok(Value::string(part))
}

fn char_index(s: &str, byte: usize) -> i32 {
    s[..byte].chars().count() as i32
}

fn index_of(s: &str, needle: &str, from: i32) -> i32 {
    let skip = from.max(0) as usize;
    let start = match s.char_indices().nth(skip) {
        Some((byte, _)) => byte,
        None if skip == s.chars().count() => s.len(),
        None => return -1,
    };
    s[start..]
        .find(needle)
        .map(|byte| char_index(s, start + byte))
        .unwrap_or(-1)
}
