//! Javelin VM runtime
//!
//! This module provides the object model and execution engine:
//! - Class metadata, layout finalization and static companions
//! - Heap of class instances and arrays
//! - Step interpreter with debugging support
//! - System classes (Object, String, boxed wrappers, collections)

pub mod builtins;
mod class_registry;
mod heap;
mod intrinsic;
pub mod interpreter;
mod object;
mod options;
mod process;
mod value;

pub use class_registry::ClassRegistry;
pub use heap::{ArrayObject, AttributeView, Heap};
pub use interpreter::{
    run_to_completion, DebugState, ExecutionResult, Interpreter, PauseReason, StackTraceEntry,
    StepMode, Thread, ThreadFault, ThreadState,
};
pub use intrinsic::{
    Intrinsic, IntrinsicData, IntrinsicKind, ListHelper, MapHelper, SetHelper, ValueKey,
};
pub use object::{
    Attribute, Class, ClassId, ClassKind, EnumValue, Layout, Method, MethodBody, MethodId,
    NativeFn, Object, Parameter,
};
pub use options::EngineOptions;
pub use process::{Console, Process};
pub use value::{ArrayRef, ObjectRef, Value};

/// Layout invariant violations
///
/// These are programming errors in the generator or a native method, never
/// user-facing.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LayoutError {
    /// Attribute indices were already assigned
    #[error("layout of class {0} is already finalized")]
    AlreadyFinalized(String),

    /// Instantiation before layout finalization
    #[error("class {0} was instantiated before its layout was finalized")]
    NotFinalized(String),

    /// Attribute slot outside the instance
    #[error("attribute index {index} out of range for {len} slots")]
    AttributeIndexOutOfRange {
        /// Requested slot
        index: usize,
        /// Allocated slots
        len: usize,
    },

    /// Class id without registry entry
    #[error("unknown class id {0}")]
    UnknownClass(usize),
}

/// User-facing runtime errors raised by a step
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RuntimeError {
    /// Operand stack limit exceeded
    #[error("Stack overflow")]
    StackOverflow,

    /// Dereferenced `null`
    #[error("Null pointer exception")]
    NullPointer,

    /// Integer division or modulo by zero
    #[error("Division by zero")]
    DivisionByZero,

    /// Array index outside `0..length`
    #[error("Index {index} out of bounds for length {length}")]
    IndexOutOfBounds {
        /// Requested index
        index: i32,
        /// Array length
        length: usize,
    },

    /// Failed downcast
    #[error("{from} cannot be cast to {to}")]
    ClassCast {
        /// Dynamic class of the value
        from: String,
        /// Requested class
        to: String,
    },

    /// `new T[n]` with `n < 0`
    #[error("Negative array size")]
    NegativeArraySize,

    /// Operand of the wrong representation
    #[error("Invalid operand: expected {expected}, found {found}")]
    InvalidOperand {
        /// Expected representation
        expected: &'static str,
        /// Actual representation
        found: &'static str,
    },

    /// Any other runtime error
    #[error("{0}")]
    Message(String),
}

/// VM execution errors
#[derive(Debug, Clone, thiserror::Error)]
pub enum VmError {
    /// User-facing runtime error
    #[error(transparent)]
    Runtime(#[from] RuntimeError),

    /// Layout invariant violation
    #[error("Internal error: {0}")]
    Layout(#[from] LayoutError),

    /// Other invariant violation (corrupt program, bad handle)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl VmError {
    /// Programming error rather than a fault of the running program
    pub fn is_internal(&self) -> bool {
        !matches!(self, VmError::Runtime(_))
    }

    pub(crate) fn internal(message: impl Into<String>) -> Self {
        VmError::Internal(message.into())
    }
}

/// VM execution result
pub type VmResult<T> = Result<T, VmError>;
