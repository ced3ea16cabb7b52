//! Thread state: call stack, operand stack and frame bookkeeping

use crate::ast::TextPosition;
use crate::compiler::Program;
use crate::vm::{RuntimeError, Value, VmError, VmResult};
use serde::Serialize;
use std::fmt;
use std::rc::Rc;

/// Lifecycle of a thread
///
/// Only `Running` may move to another state. `Suspended` only resumes to
/// `Running`. `Faulted` and `Halted` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ThreadState {
    /// Executing steps
    Running,
    /// Waiting for the driver to resume
    Suspended,
    /// Stopped by a runtime error
    Faulted,
    /// Call stack exhausted normally
    Halted,
}

impl ThreadState {
    fn can_transition_to(self, next: ThreadState) -> bool {
        match self {
            ThreadState::Running => true,
            ThreadState::Suspended => next == ThreadState::Running,
            ThreadState::Faulted | ThreadState::Halted => false,
        }
    }
}

/// One frame of a stack trace
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StackTraceEntry {
    /// Program (method) name
    pub program: String,
    /// Position of the executing step
    pub position: TextPosition,
}

/// Error that stopped a thread, with the call stack at the time
#[derive(Debug, Clone)]
pub struct ThreadFault {
    /// What went wrong
    pub error: VmError,
    /// Innermost frame first
    pub trace: Vec<StackTraceEntry>,
}

impl fmt::Display for ThreadFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Exception: {}", self.error)?;
        for entry in &self.trace {
            write!(f, "\n    at {} ({})", entry.program, entry.position)?;
        }
        Ok(())
    }
}

impl std::error::Error for ThreadFault {}

/// One logical flow of control
#[derive(Debug)]
pub struct Thread {
    pub(super) program_stack: Vec<Rc<Program>>,
    pub(super) pc_stack: Vec<usize>,
    pub(super) current_program: Option<Rc<Program>>,
    pub(super) pc: usize,
    pub(super) stack: Vec<Value>,
    pub(super) stack_frames: Vec<usize>,
    pub(super) max_stack_size: usize,
    state: ThreadState,
    fault: Option<ThreadFault>,
    return_value: Option<Value>,
}

impl Thread {
    /// Create an idle (halted) thread
    pub fn new() -> Self {
        Self {
            program_stack: Vec::new(),
            pc_stack: Vec::new(),
            current_program: None,
            pc: 0,
            stack: Vec::new(),
            stack_frames: Vec::new(),
            max_stack_size: usize::MAX,
            state: ThreadState::Halted,
            fault: None,
            return_value: None,
        }
    }

    /// Reset and enter `program` with `args` in its first slots
    pub(super) fn start(&mut self, program: Rc<Program>, args: &[Value], max_stack_size: usize) {
        self.program_stack.clear();
        self.pc_stack.clear();
        self.stack.clear();
        self.stack.extend_from_slice(args);
        let slots = program.stack_slot_count.max(args.len());
        self.stack.resize(slots, Value::Null);
        self.stack_frames = vec![0];
        self.current_program = Some(program);
        self.pc = 0;
        self.max_stack_size = max_stack_size;
        self.state = ThreadState::Running;
        self.fault = None;
        self.return_value = None;
    }

    /// Current state
    pub fn state(&self) -> ThreadState {
        self.state
    }

    /// Fault, once the thread is `Faulted`
    pub fn fault(&self) -> Option<&ThreadFault> {
        self.fault.as_ref()
    }

    /// Value returned by the outermost program, once `Halted`
    pub fn return_value(&self) -> Option<&Value> {
        self.return_value.as_ref()
    }

    /// Program being executed
    pub fn current_program(&self) -> Option<&Rc<Program>> {
        self.current_program.as_ref()
    }

    /// Index of the next step
    pub fn pc(&self) -> usize {
        self.pc
    }

    /// Number of active programs
    pub fn depth(&self) -> usize {
        self.program_stack.len() + usize::from(self.current_program.is_some())
    }

    /// Operand stack, bottom first
    pub fn stack(&self) -> &[Value] {
        &self.stack
    }

    /// Slots of the current frame (receiver, parameters and locals)
    pub fn locals(&self) -> &[Value] {
        let base = self.stack_frames.last().copied().unwrap_or(0);
        let count = self
            .current_program
            .as_ref()
            .map(|p| p.stack_slot_count)
            .unwrap_or(0);
        let end = (base + count).min(self.stack.len());
        self.stack.get(base..end).unwrap_or(&[])
    }

    /// Position of the next step
    pub fn position(&self) -> TextPosition {
        self.current_program
            .as_ref()
            .map(|p| p.position_at(self.pc))
            .unwrap_or_default()
    }

    /// Move to another state, rejecting illegal transitions
    pub fn transition(&mut self, next: ThreadState) -> VmResult<()> {
        if !self.state.can_transition_to(next) {
            return Err(VmError::internal(format!(
                "illegal thread transition {:?} -> {:?}",
                self.state, next
            )));
        }
        self.state = next;
        Ok(())
    }

    pub(super) fn frame_base(&self) -> VmResult<usize> {
        self.stack_frames
            .last()
            .copied()
            .ok_or_else(|| VmError::internal("no active stack frame"))
    }

    pub(super) fn push(&mut self, value: Value) -> VmResult<()> {
        if self.stack.len() >= self.max_stack_size {
            return Err(RuntimeError::StackOverflow.into());
        }
        self.stack.push(value);
        Ok(())
    }

    pub(super) fn pop(&mut self) -> VmResult<Value> {
        let base = self.stack_frames.last().copied().unwrap_or(0);
        if self.stack.len() <= base {
            return Err(VmError::internal("operand stack underflow"));
        }
        self.stack
            .pop()
            .ok_or_else(|| VmError::internal("operand stack underflow"))
    }

    pub(super) fn peek(&self) -> VmResult<&Value> {
        self.stack
            .last()
            .ok_or_else(|| VmError::internal("operand stack underflow"))
    }

    /// Push a frame for `program` whose receiver sits at `base`
    pub(super) fn enter(&mut self, program: Rc<Program>, base: usize) -> VmResult<()> {
        let slots = base + program.stack_slot_count;
        if slots > self.max_stack_size {
            return Err(RuntimeError::StackOverflow.into());
        }
        if self.stack.len() < slots {
            self.stack.resize(slots, Value::Null);
        }
        if let Some(caller) = self.current_program.take() {
            self.program_stack.push(caller);
            self.pc_stack.push(self.pc);
        }
        self.stack_frames.push(base);
        self.current_program = Some(program);
        self.pc = 0;
        Ok(())
    }

    /// Pop the current frame and hand `value` to the caller
    ///
    /// Halts the thread when the outermost program returns.
    pub(super) fn leave(&mut self, value: Value) -> VmResult<()> {
        let base = self
            .stack_frames
            .pop()
            .ok_or_else(|| VmError::internal("return without stack frame"))?;
        self.stack.truncate(base);
        match self.program_stack.pop() {
            Some(caller) => {
                self.current_program = Some(caller);
                self.pc = self
                    .pc_stack
                    .pop()
                    .ok_or_else(|| VmError::internal("return address stack underflow"))?;
                self.push(value)
            }
            None => {
                self.current_program = None;
                self.return_value = Some(value);
                self.transition(ThreadState::Halted)
            }
        }
    }

    /// Record a fault, unwind every frame and stop
    pub(super) fn raise(&mut self, error: VmError) {
        let trace = self.capture_trace();
        self.program_stack.clear();
        self.pc_stack.clear();
        self.stack_frames.clear();
        self.stack.clear();
        self.current_program = None;
        self.fault = Some(ThreadFault { error, trace });
        self.state = ThreadState::Faulted;
    }

    /// Stack trace of the step that just executed, innermost first
    pub fn capture_trace(&self) -> Vec<StackTraceEntry> {
        let mut trace = Vec::new();
        if let Some(program) = &self.current_program {
            trace.push(StackTraceEntry {
                program: program.name.clone(),
                position: program.position_at(self.pc.saturating_sub(1)),
            });
        }
        for (program, return_address) in self.program_stack.iter().zip(&self.pc_stack).rev() {
            trace.push(StackTraceEntry {
                program: program.name.clone(),
                position: program.position_at(return_address.saturating_sub(1)),
            });
        }
        trace
    }
}

impl Default for Thread {
    fn default() -> Self {
        Self::new()
    }
}
