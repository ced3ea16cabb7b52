//! Executable step sequences
//!
//! A [`Program`] is the compiled form of one method body, of a static
//! initializer, or of the top-level statements of a module. Steps carry every
//! stack offset explicitly so programs can be printed, serialized and
//! inspected by a debugger.

use crate::ast::TextPosition;
use crate::types::{Operator, Type};
use crate::vm::{ClassId, MethodId, Value};
use serde::Serialize;

/// How a [`Instruction::Call`] selects its target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Dispatch {
    /// Exact method, receiver is the static companion
    Static,
    /// Override of the method on the receiver's dynamic class
    Virtual,
    /// Exact method on the current receiver (`super.m()`, constructors)
    Super,
    /// Virtual `toString` that yields `"null"` for a null receiver
    Stringify,
}

/// One engine instruction
///
/// Stack effects are written as `[before] -> [after]`, top on the right.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Instruction {
    /// No effect
    Noop,
    /// `[] -> [value]`
    PushConstant {
        /// Constant
        value: Value,
    },
    /// `[] -> [local]`
    LoadLocal {
        /// Slot relative to the frame base
        offset: usize,
    },
    /// `[value] -> []` or `[value]` if `keep`
    StoreLocal {
        /// Slot relative to the frame base
        offset: usize,
        /// Leave the stored value on the stack
        keep: bool,
    },
    /// `[value] -> []`
    Pop,
    /// `[value] -> [value, value]`
    Dup,
    /// `[] -> [companion]`
    PushStaticClass {
        /// Class whose companion singleton is pushed
        class: ClassId,
    },
    /// `[object] -> [value]`
    LoadAttribute {
        /// Attribute slot
        index: usize,
    },
    /// `[object, value] -> []` or `[value]` if `keep`
    StoreAttribute {
        /// Attribute slot
        index: usize,
        /// Leave the stored value on the stack
        keep: bool,
    },
    /// `[] -> [value]`
    LoadStatic {
        /// Class declaring the static attribute
        class: ClassId,
        /// Slot in the companion
        index: usize,
    },
    /// `[value] -> []` or `[value]` if `keep`
    StoreStatic {
        /// Class declaring the static attribute
        class: ClassId,
        /// Slot in the companion
        index: usize,
        /// Leave the stored value on the stack
        keep: bool,
    },
    /// `[] -> [object]`, uninitialized until its constructor runs
    NewObject {
        /// Class to instantiate
        class: ClassId,
    },
    /// `[len_1 .. len_n] -> [array]`
    NewArray {
        /// Innermost element type of the sized dimensions
        element: Type,
        /// Number of sized dimensions popped
        dimensions: usize,
        /// Trailing `[]` without a size
        extra_dimensions: usize,
    },
    /// `[e_1 .. e_n] -> [array]`
    ArrayLiteral {
        /// Element type
        element: Type,
        /// Number of elements popped
        count: usize,
    },
    /// `[array, index] -> [value]`
    LoadElement,
    /// `[array, index, value] -> []` or `[value]` if `keep`
    StoreElement {
        /// Leave the stored value on the stack
        keep: bool,
    },
    /// `[array] -> [int]`
    ArrayLength,
    /// `[lhs, rhs] -> [result]`
    Binary {
        /// Operator
        op: Operator,
        /// Static type of the left operand, selects the operation table
        left: Type,
    },
    /// `[operand] -> [result]`
    Unary {
        /// Operator
        op: Operator,
        /// Static type of the operand
        operand: Type,
    },
    /// `[value] -> [converted]`
    Cast {
        /// Static source type
        from: Type,
        /// Target type
        to: Type,
    },
    /// `[value] -> [value]`, fails unless the value is null or an instance of `target`
    CheckCast {
        /// Required class
        target: ClassId,
    },
    /// `[value] -> [bool]`
    InstanceOf {
        /// Tested class
        target: ClassId,
    },
    /// Continue at `target`
    Jump {
        /// Step index
        target: usize,
    },
    /// `[bool] -> []`, jump when false
    JumpIfFalse {
        /// Step index
        target: usize,
    },
    /// `[bool] -> []`, jump when true
    JumpIfTrue {
        /// Step index
        target: usize,
    },
    /// `[bool] -> [bool]` and jump when false, else `[bool] -> []`
    JumpIfFalseKeep {
        /// Step index
        target: usize,
    },
    /// `[bool] -> [bool]` and jump when true, else `[bool] -> []`
    JumpIfTrueKeep {
        /// Step index
        target: usize,
    },
    /// `[receiver, a_1 .. a_n] -> [result]`
    ///
    /// Always leaves one value; void methods leave `null`.
    Call {
        /// Statically resolved method
        method: MethodId,
        /// Arguments, excluding the receiver
        arg_count: usize,
        /// Target selection
        dispatch: Dispatch,
    },
    /// Invoke `main(String[])` on the companion of `static_class`
    CallMain {
        /// Entry method
        method: MethodId,
        /// Class declaring it
        static_class: ClassId,
    },
    /// Leave the current program, `[value] -> ` if `has_value`
    Return {
        /// A return value is on the stack
        has_value: bool,
    },
    /// End of the entry program, behaves like a void return
    CloseStackFrame,
    /// `[text] -> []` if `has_value`
    Print {
        /// Append a line break
        newline: bool,
        /// A value is on the stack
        has_value: bool,
    },
}

impl Instruction {
    /// Jump target, if this is a branch
    pub fn jump_target(&self) -> Option<usize> {
        match self {
            Instruction::Jump { target }
            | Instruction::JumpIfFalse { target }
            | Instruction::JumpIfTrue { target }
            | Instruction::JumpIfFalseKeep { target }
            | Instruction::JumpIfTrueKeep { target } => Some(*target),
            _ => None,
        }
    }

    /// Mutable jump target, if this is a branch
    pub fn jump_target_mut(&mut self) -> Option<&mut usize> {
        match self {
            Instruction::Jump { target }
            | Instruction::JumpIfFalse { target }
            | Instruction::JumpIfTrue { target }
            | Instruction::JumpIfFalseKeep { target }
            | Instruction::JumpIfTrueKeep { target } => Some(target),
            _ => None,
        }
    }
}

/// Instruction with its source position
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Step {
    /// What to execute
    pub instruction: Instruction,
    /// Where it came from
    pub position: TextPosition,
}

/// Executable step sequence
#[derive(Debug, Clone, Default, Serialize)]
pub struct Program {
    /// Owning module name
    pub module: String,
    /// Method compiled into this program (`None` for entry, initializer and synthesized programs)
    pub method: Option<MethodId>,
    /// Human readable name for stack traces
    pub name: String,
    /// Steps
    pub steps: Vec<Step>,
    /// Frame size: receiver, parameters, locals and hidden temporaries
    pub stack_slot_count: usize,
}

impl Program {
    /// Empty program
    pub fn new(module: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            module: module.into(),
            name: name.into(),
            ..Default::default()
        }
    }

    /// Append a step and return its index
    pub fn push(&mut self, instruction: Instruction, position: TextPosition) -> usize {
        self.steps.push(Step {
            instruction,
            position,
        });
        self.steps.len() - 1
    }

    /// Insert steps at `at`, keeping branches pointing at the same steps
    ///
    /// Targets beyond `at` shift by the number of inserted steps; a target
    /// equal to `at` still lands on the first inserted step.
    pub fn insert_steps(&mut self, at: usize, steps: Vec<Step>) {
        let count = steps.len();
        for step in &mut self.steps {
            if let Some(target) = step.instruction.jump_target_mut() {
                if *target > at {
                    *target += count;
                }
            }
        }
        self.steps.splice(at..at, steps);
    }

    /// Index of the next step to be pushed
    pub fn next_index(&self) -> usize {
        self.steps.len()
    }

    /// Point the branch at `index` to `target`
    pub fn patch_jump(&mut self, index: usize, target: usize) {
        if let Some(slot) = self
            .steps
            .get_mut(index)
            .and_then(|step| step.instruction.jump_target_mut())
        {
            *slot = target;
        }
    }

    /// Position of the step at `pc`, or of the last step
    pub fn position_at(&self, pc: usize) -> TextPosition {
        self.steps
            .get(pc)
            .or_else(|| self.steps.last())
            .map(|step| step.position)
            .unwrap_or_default()
    }
}
