//! Dynamic statement synthesis
//!
//! Native code that needs the text of arbitrary values (collection
//! `toString`) cannot call user `toString` overrides directly. When every
//! element is primitive-like the text is built in place; otherwise a throwaway
//! program concatenates the pieces, calling `toString` on each object, and
//! runs to completion on a nested thread.

use crate::ast::TextPosition;
use crate::compiler::{Dispatch, Instruction, Program};
use crate::types::{Operator, Type};
use crate::vm::{
    run_to_completion, ClassId, ListHelper, MapHelper, MethodId, ObjectRef, Process, SetHelper, Value, VmResult,
};
use std::rc::Rc;

/// One piece of synthesized text
#[derive(Debug, Clone, PartialEq)]
pub enum Piece {
    /// Fixed text such as separators
    Literal(String),
    /// Value rendered through its `toString`
    Element(Value),
}

impl Piece {
    fn is_primitive_like(&self) -> bool {
        match self {
            Piece::Literal(_) => true,
            Piece::Element(value) => value.is_primitive_like(),
        }
    }
}

impl ListHelper {
    /// `[a, b, c]` using each element's `toString`
    ///
    /// `owner` is the list instance itself; it prints as `(this Collection)`.
    pub fn to_text(&self, owner: Option<ObjectRef>, process: &mut Process) -> VmResult<String> {
        let entries = self.items.iter().map(|item| vec![item.clone()]);
        render(bracketed(entries, owner, "(this Collection)"), process)
    }
}

impl SetHelper {
    /// `[a, b, c]` in insertion order
    pub fn to_text(&self, owner: Option<ObjectRef>, process: &mut Process) -> VmResult<String> {
        let entries = self.items().iter().map(|item| vec![item.clone()]);
        render(bracketed(entries, owner, "(this Collection)"), process)
    }
}

impl MapHelper {
    /// `[k1 => v1, k2 => v2]` in insertion order
    pub fn to_text(&self, owner: Option<ObjectRef>, process: &mut Process) -> VmResult<String> {
        let entries = self.entries().map(|(key, value)| vec![key.clone(), value.clone()]);
        render(bracketed(entries, owner, "(this Map)"), process)
    }
}

/// `[` entries `]`, entries separated by `, ` and entry parts by ` => `
///
/// Parts equal to `owner` become the `self_text` literal.
fn bracketed(entries: impl Iterator<Item = Vec<Value>>, owner: Option<ObjectRef>, self_text: &str) -> Vec<Piece> {
    let mut pieces = vec![Piece::Literal("[".to_string())];
    for (i, entry) in entries.enumerate() {
        if i > 0 {
            pieces.push(Piece::Literal(", ".to_string()));
        }
        for (j, value) in entry.into_iter().enumerate() {
            if j > 0 {
                pieces.push(Piece::Literal(" => ".to_string()));
            }
            match value {
                Value::Object(r) if Some(r) == owner => pieces.push(Piece::Literal(self_text.to_string())),
                value => pieces.push(Piece::Element(value)),
            }
        }
    }
    pieces.push(Piece::Literal("]".to_string()));
    pieces
}

/// Concatenate `pieces`, running user `toString` methods when needed
pub fn render(pieces: Vec<Piece>, process: &mut Process) -> VmResult<String> {
    if pieces.iter().all(Piece::is_primitive_like) {
        return Ok(pieces.iter().map(literal_text).collect());
    }
    let program = build_to_string_program(&pieces, process);
    tracing::trace!(steps = program.steps.len(), "synthesized toString program");
    let value = run_to_completion(process, Rc::new(program), &[])?;
    Ok(value
        .as_text()
        .map(|text| text.into_owned())
        .unwrap_or_else(|| value.to_string()))
}

fn literal_text(piece: &Piece) -> String {
    match piece {
        Piece::Literal(text) => text.clone(),
        Piece::Element(value) => value.to_text().unwrap_or_default(),
    }
}

/// Build a program that returns the concatenated text of `pieces`
///
/// Primitive-like pieces become constants. Objects are pushed and their
/// resolved `toString` is called virtually.
pub fn build_to_string_program(pieces: &[Piece], process: &Process) -> Program {
    let position = TextPosition::new(1, 1, 1);
    let mut program = Program::new("<synthesized>", "toString");
    let mut first = true;
    for piece in pieces {
        match piece {
            Piece::Element(value) if !value.is_primitive_like() => match to_string_method(process, value) {
                Some(method) => {
                    program.push(Instruction::PushConstant { value: value.clone() }, position);
                    program.push(
                        Instruction::Call {
                            method,
                            arg_count: 0,
                            dispatch: Dispatch::Stringify,
                        },
                        position,
                    );
                }
                None => {
                    tracing::warn!(value = %value, "no toString method, using display text");
                    let text = process.format(value, &Type::OBJECT);
                    program.push(Instruction::PushConstant { value: Value::string(text) }, position);
                }
            },
            other => {
                program.push(
                    Instruction::PushConstant {
                        value: Value::string(literal_text(other)),
                    },
                    position,
                );
            }
        }
        if !first {
            program.push(
                Instruction::Binary {
                    op: Operator::Plus,
                    left: Type::STRING,
                },
                position,
            );
        }
        first = false;
    }
    if first {
        program.push(Instruction::PushConstant { value: Value::string("") }, position);
    }
    program.push(Instruction::Return { has_value: true }, position);
    program
}

fn to_string_method(process: &Process, value: &Value) -> Option<MethodId> {
    let class = process.class_of(value).unwrap_or(ClassId::OBJECT);
    process
        .classes
        .find_methods(class, "toString")
        .into_iter()
        .find(|id| {
            process
                .classes
                .method(*id)
                .map(|m| m.params.is_empty() && !m.is_static)
                .unwrap_or(false)
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vm::{ClassKind, Method, MethodBody};

    fn point_class(process: &mut Process) -> ClassId {
        let point = process.classes.create_class("Point", ClassKind::Class, None);
        process.classes.finalize_layout(point).unwrap();
        let mut body = Program::new("test", "Point.toString");
        body.stack_slot_count = 1;
        body.push(
            Instruction::PushConstant {
                value: Value::string("P"),
            },
            TextPosition::new(3, 5, 1),
        );
        body.push(Instruction::Return { has_value: true }, TextPosition::new(3, 5, 1));
        let mut method = Method::new("toString", point, Vec::new(), Type::STRING);
        method.body = MethodBody::Program(Rc::new(body));
        process.classes.add_method(point, method);
        point
    }

    #[test]
    fn test_fast_path_builds_no_program() {
        let mut process = Process::new();
        let mut map = MapHelper::default();
        map.put(Value::string("a"), Value::Int(1));
        map.put(Value::string("b"), Value::Int(2));
        assert_eq!(map.to_text(None, &mut process).unwrap(), "[a => 1, b => 2]");
        assert_eq!(ListHelper::default().to_text(None, &mut process).unwrap(), "[]");
    }

    #[test]
    fn test_user_to_string_is_called() {
        let mut process = Process::new();
        let point = point_class(&mut process);
        let p = Value::Object(process.instantiate(point).unwrap());
        let mut map = MapHelper::default();
        map.put(Value::string("origin"), p.clone());
        map.put(p, Value::Null);
        assert_eq!(map.to_text(None, &mut process).unwrap(), "[origin => P, P => null]");
    }

    #[test]
    fn test_owner_prints_as_this_collection() {
        let mut process = Process::new();
        let list = process.classes.get_class_by_name("ArrayList").unwrap().id;
        let owner = process.instantiate(list).unwrap();
        let mut helper = ListHelper::default();
        helper.items.push(Value::Int(1));
        helper.items.push(Value::Object(owner));
        assert_eq!(helper.to_text(Some(owner), &mut process).unwrap(), "[1, (this Collection)]");

        let mut map = MapHelper::default();
        map.put(Value::string("me"), Value::Object(owner));
        assert_eq!(map.to_text(Some(owner), &mut process).unwrap(), "[me => (this Map)]");
    }

    #[test]
    fn test_program_shape() {
        let mut process = Process::new();
        let point = point_class(&mut process);
        let p = Value::Object(process.instantiate(point).unwrap());
        let pieces = bracketed(std::iter::once(vec![p]), None, "(this Collection)");
        let program = build_to_string_program(&pieces, &process);
        let ops: Vec<_> = program.steps.iter().map(|s| &s.instruction).collect();
        assert!(matches!(ops[0], Instruction::PushConstant { .. }));
        assert!(matches!(ops[2], Instruction::Call { arg_count: 0, .. }));
        assert!(matches!(ops.last(), Some(Instruction::Return { has_value: true })));
    }
}
