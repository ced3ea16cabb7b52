//! Instruction dispatch
//!
//! `execute` runs one instruction against the thread and the process. The
//! program counter has already moved past the step when it runs, so branches
//! simply overwrite it.

use super::thread::Thread;
use crate::compiler::{Dispatch, Instruction};
use crate::types::Type;
use crate::vm::{
    ArrayObject, ArrayRef, ClassId, MethodBody, MethodId, ObjectRef, Process, RuntimeError, Value,
    VmError, VmResult,
};

impl Thread {
    pub(super) fn execute(&mut self, instruction: &Instruction, process: &mut Process) -> VmResult<()> {
        match instruction {
            Instruction::Noop => {}
            Instruction::PushConstant { value } => self.push(value.clone())?,
            Instruction::LoadLocal { offset } => {
                let slot = self.frame_base()? + offset;
                let value = self
                    .stack
                    .get(slot)
                    .cloned()
                    .ok_or_else(|| VmError::internal(format!("local slot {slot} out of range")))?;
                self.push(value)?;
            }
            Instruction::StoreLocal { offset, keep } => {
                let value = self.pop()?;
                let slot = self.frame_base()? + offset;
                let target = self
                    .stack
                    .get_mut(slot)
                    .ok_or_else(|| VmError::internal(format!("local slot {slot} out of range")))?;
                *target = value.clone();
                if *keep {
                    self.push(value)?;
                }
            }
            Instruction::Pop => {
                self.pop()?;
            }
            Instruction::Dup => {
                let value = self.peek()?.clone();
                self.push(value)?;
            }
            Instruction::PushStaticClass { class } => {
                let object = process.static_object(*class)?;
                self.push(Value::Object(object))?;
            }
            Instruction::LoadAttribute { index } => {
                let object = expect_object(self.pop()?)?;
                let value = process.heap.object(object)?.get(*index)?.clone();
                self.push(value)?;
            }
            Instruction::StoreAttribute { index, keep } => {
                let value = self.pop()?;
                let object = expect_object(self.pop()?)?;
                process.heap.object_mut(object)?.set(*index, value.clone())?;
                if *keep {
                    self.push(value)?;
                }
            }
            Instruction::LoadStatic { class, index } => {
                let object = process.static_object(*class)?;
                let value = process.heap.object(object)?.get(*index)?.clone();
                self.push(value)?;
            }
            Instruction::StoreStatic { class, index, keep } => {
                let value = self.pop()?;
                let object = process.static_object(*class)?;
                process.heap.object_mut(object)?.set(*index, value.clone())?;
                if *keep {
                    self.push(value)?;
                }
            }
            Instruction::NewObject { class } => {
                let object = process.instantiate(*class)?;
                self.push(Value::Object(object))?;
            }
            Instruction::NewArray {
                element,
                dimensions,
                extra_dimensions,
            } => {
                let mut lengths = Vec::with_capacity(*dimensions);
                for _ in 0..*dimensions {
                    let length = self.pop()?.as_i32().ok_or(RuntimeError::NullPointer)?;
                    let length = usize::try_from(length).map_err(|_| RuntimeError::NegativeArraySize)?;
                    lengths.push(length);
                }
                lengths.reverse();
                let array = process.heap.new_multi_array(element, &lengths, *extra_dimensions);
                self.push(Value::Array(array))?;
            }
            Instruction::ArrayLiteral { element, count } => {
                let start = self
                    .stack
                    .len()
                    .checked_sub(*count)
                    .ok_or_else(|| VmError::internal("operand stack underflow"))?;
                let elements = self.stack.split_off(start);
                let array = process.heap.allocate_array(ArrayObject {
                    element_type: element.clone(),
                    elements,
                });
                self.push(Value::Array(array))?;
            }
            Instruction::LoadElement => {
                let index = self.pop()?;
                let array = expect_array(self.pop()?)?;
                let elements = &process.heap.array(array)?.elements;
                let slot = element_index(&index, elements.len())?;
                let value = elements[slot].clone();
                self.push(value)?;
            }
            Instruction::StoreElement { keep } => {
                let value = self.pop()?;
                let index = self.pop()?;
                let array = expect_array(self.pop()?)?;
                let elements = &mut process.heap.array_mut(array)?.elements;
                let slot = element_index(&index, elements.len())?;
                elements[slot] = value.clone();
                if *keep {
                    self.push(value)?;
                }
            }
            Instruction::ArrayLength => {
                let array = expect_array(self.pop()?)?;
                let length = process.heap.array(array)?.elements.len();
                self.push(Value::Int(length as i32))?;
            }
            Instruction::Binary { op, left } => {
                let rhs = self.pop()?;
                let lhs = self.pop()?;
                let result = left.evaluate(*op, &lhs, Some(&rhs))?;
                self.push(result)?;
            }
            Instruction::Unary { op, operand } => {
                let value = self.pop()?;
                let result = operand.evaluate(*op, &value, None)?;
                self.push(result)?;
            }
            Instruction::Cast { from, to } => {
                let value = self.pop()?;
                let converted = from.cast_to(&value, to, &mut process.heap);
                self.push(converted)?;
            }
            Instruction::CheckCast { target } => {
                let value = self.peek()?;
                if !value.is_null() && !is_instance(process, value, *target) {
                    let from = match value {
                        Value::Array(r) => array_type_name(process, *r),
                        other => class_name(process, process.class_of(other)),
                    };
                    return Err(RuntimeError::ClassCast {
                        from,
                        to: class_name(process, Some(*target)),
                    }
                    .into());
                }
            }
            Instruction::InstanceOf { target } => {
                let value = self.pop()?;
                let result = !value.is_null() && is_instance(process, &value, *target);
                self.push(Value::Bool(result))?;
            }
            Instruction::Jump { target } => self.pc = *target,
            Instruction::JumpIfFalse { target } => {
                if !self.pop_condition()? {
                    self.pc = *target;
                }
            }
            Instruction::JumpIfTrue { target } => {
                if self.pop_condition()? {
                    self.pc = *target;
                }
            }
            Instruction::JumpIfFalseKeep { target } => {
                if self.peek_condition()? {
                    self.pop()?;
                } else {
                    self.pc = *target;
                }
            }
            Instruction::JumpIfTrueKeep { target } => {
                if self.peek_condition()? {
                    self.pc = *target;
                } else {
                    self.pop()?;
                }
            }
            Instruction::Call {
                method,
                arg_count,
                dispatch,
            } => self.call(*method, *arg_count, *dispatch, process)?,
            Instruction::CallMain {
                method,
                static_class,
            } => {
                let receiver = process.static_object(*static_class)?;
                let args = process.heap.new_array(Type::STRING, 0);
                self.push(Value::Object(receiver))?;
                self.push(Value::Array(args))?;
                self.call(*method, 1, Dispatch::Static, process)?;
            }
            Instruction::Return { has_value } => {
                let value = if *has_value { self.pop()? } else { Value::Null };
                self.leave(value)?;
            }
            Instruction::CloseStackFrame => self.leave(Value::Null)?,
            Instruction::Print { newline, has_value } => {
                let mut text = if *has_value {
                    let value = self.pop()?;
                    value.to_text().unwrap_or_else(|| value.to_string())
                } else {
                    String::new()
                };
                if *newline {
                    text.push('\n');
                }
                process.console.write(&text);
            }
        }
        Ok(())
    }

    fn pop_condition(&mut self) -> VmResult<bool> {
        let value = self.pop()?;
        value.as_bool().ok_or_else(|| RuntimeError::NullPointer.into())
    }

    fn peek_condition(&self) -> VmResult<bool> {
        self.peek()?
            .as_bool()
            .ok_or_else(|| RuntimeError::NullPointer.into())
    }

    /// Invoke a method whose receiver and arguments are on the stack
    fn call(&mut self, method: MethodId, arg_count: usize, dispatch: Dispatch, process: &mut Process) -> VmResult<()> {
        let receiver_slot = self
            .stack
            .len()
            .checked_sub(arg_count + 1)
            .ok_or_else(|| VmError::internal("call without receiver"))?;
        let receiver = &self.stack[receiver_slot];

        let target = match dispatch {
            Dispatch::Static | Dispatch::Super => method,
            Dispatch::Virtual | Dispatch::Stringify if receiver.is_null() => {
                if dispatch == Dispatch::Stringify {
                    self.stack.truncate(receiver_slot);
                    return self.push(Value::string("null"));
                }
                return Err(RuntimeError::NullPointer.into());
            }
            Dispatch::Virtual | Dispatch::Stringify => match process.class_of(receiver) {
                Some(class) => process.classes.resolve_virtual(class, method),
                None => method,
            },
        };

        let descriptor = process
            .classes
            .method(target)
            .ok_or_else(|| VmError::internal(format!("unknown method id {}", target.0)))?;
        tracing::trace!(method = %descriptor.name, ?dispatch, "call");
        match descriptor.body.clone() {
            MethodBody::Native(native) => {
                let args = self.stack.split_off(receiver_slot);
                let result = native(process, &args)?;
                self.push(result)
            }
            MethodBody::Program(program) => self.enter(program, receiver_slot),
            MethodBody::Abstract | MethodBody::Pending => Err(VmError::internal(format!(
                "method {} has no executable body",
                descriptor.name
            ))),
        }
    }
}

fn expect_object(value: Value) -> VmResult<ObjectRef> {
    match value {
        Value::Object(r) => Ok(r),
        Value::Null => Err(RuntimeError::NullPointer.into()),
        other => Err(RuntimeError::InvalidOperand {
            expected: "object",
            found: other.kind_name(),
        }
        .into()),
    }
}

fn expect_array(value: Value) -> VmResult<ArrayRef> {
    match value {
        Value::Array(r) => Ok(r),
        Value::Null => Err(RuntimeError::NullPointer.into()),
        other => Err(RuntimeError::InvalidOperand {
            expected: "array",
            found: other.kind_name(),
        }
        .into()),
    }
}

fn element_index(index: &Value, length: usize) -> VmResult<usize> {
    let index = index.as_i32().ok_or(RuntimeError::NullPointer)?;
    usize::try_from(index)
        .ok()
        .filter(|&i| i < length)
        .ok_or_else(|| RuntimeError::IndexOutOfBounds { index, length }.into())
}

fn is_instance(process: &Process, value: &Value, target: ClassId) -> bool {
    match value {
        Value::Array(_) => target == ClassId::OBJECT,
        other => process
            .class_of(other)
            .map(|class| process.classes.is_subclass_of(class, target))
            .unwrap_or(false),
    }
}

fn class_name(process: &Process, class: Option<ClassId>) -> String {
    class
        .and_then(|c| process.classes.get_class(c))
        .map(|c| c.name.clone())
        .unwrap_or_else(|| "null".to_string())
}

fn array_type_name(process: &Process, array: ArrayRef) -> String {
    process
        .heap
        .array(array)
        .map(|a| Type::array_of(a.element_type.clone()).identifier(&process.classes))
        .unwrap_or_else(|_| "array".to_string())
}
