//! Step interpreter
//!
//! An [`Interpreter`] drives one [`Thread`] through its programs. Steps run to
//! completion; between steps the driver may pause for breakpoints, stepping or
//! an exhausted step budget. Nested synchronous execution (used by natives
//! that call back into user code) goes through [`run_to_completion`].

mod debug_state;
mod dispatch;
mod execution;
mod thread;

pub use debug_state::{DebugState, StepMode};
pub use execution::{ExecutionResult, PauseReason};
pub use thread::{StackTraceEntry, Thread, ThreadFault, ThreadState};

use crate::compiler::Program;
use crate::vm::{Process, RuntimeError, Value, VmError, VmResult};
use std::rc::Rc;

/// Driver of a single thread
#[derive(Debug, Default)]
pub struct Interpreter {
    thread: Thread,
    /// Breakpoints and step mode
    pub debug: DebugState,
    /// Skip the break check once after a pause so resuming makes progress
    skip_break_once: bool,
}

impl Interpreter {
    /// Create an idle interpreter
    pub fn new() -> Self {
        Self::default()
    }

    /// The driven thread
    pub fn thread(&self) -> &Thread {
        &self.thread
    }

    /// Reset the thread and enter `program`
    ///
    /// `args` fill the first slots of the frame; for a method program that is
    /// the receiver followed by the arguments.
    pub fn start(&mut self, process: &Process, program: Rc<Program>, args: &[Value]) {
        tracing::debug!(program = %program.name, "thread started");
        self.thread
            .start(program, args, process.options.max_stack_size);
        self.skip_break_once = false;
    }

    /// Execute exactly one step, ignoring breakpoints
    pub fn step(&mut self, process: &mut Process) -> ExecutionResult {
        if self.thread.state() == ThreadState::Suspended {
            if let Err(error) = self.thread.transition(ThreadState::Running) {
                return self.fail(error);
            }
        }
        if self.thread.state() != ThreadState::Running {
            return self.outcome();
        }
        self.execute_step(process);
        self.skip_break_once = false;
        if self.thread.state() == ThreadState::Running {
            self.suspend(PauseReason::Step)
        } else {
            self.outcome()
        }
    }

    /// Run until the thread halts, faults, pauses or spends the step budget
    pub fn run(&mut self, process: &mut Process) -> ExecutionResult {
        let budget = process.options.step_budget;
        self.run_with_budget(process, budget)
    }

    /// Continue a suspended thread
    pub fn resume(&mut self, process: &mut Process) -> VmResult<ExecutionResult> {
        self.thread.transition(ThreadState::Running)?;
        Ok(self.run(process))
    }

    /// Suspend a running thread before its next step
    pub fn pause(&mut self) -> VmResult<()> {
        self.thread.transition(ThreadState::Suspended)?;
        self.skip_break_once = true;
        Ok(())
    }

    fn run_with_budget(&mut self, process: &mut Process, budget: Option<u64>) -> ExecutionResult {
        if self.thread.state() == ThreadState::Suspended {
            if let Err(error) = self.thread.transition(ThreadState::Running) {
                return self.fail(error);
            }
        }
        let mut executed: u64 = 0;
        while self.thread.state() == ThreadState::Running {
            if !std::mem::take(&mut self.skip_break_once) {
                if let Some(reason) = self.debug.should_break(&self.thread) {
                    tracing::debug!(
                        ?reason,
                        position = %self.thread.position(),
                        "execution paused"
                    );
                    return self.suspend(reason);
                }
            }
            if budget.map(|limit| executed >= limit).unwrap_or(false) {
                return self.suspend(PauseReason::BudgetExhausted);
            }
            self.execute_step(process);
            executed += 1;
        }
        self.outcome()
    }

    fn execute_step(&mut self, process: &mut Process) {
        let Some(program) = self.thread.current_program.clone() else {
            self.thread.raise(VmError::internal("no program to execute"));
            return;
        };
        let pc = self.thread.pc;
        let result = match program.steps.get(pc) {
            Some(step) => {
                self.thread.pc += 1;
                if process.options.trace_steps {
                    tracing::trace!(
                        program = %program.name,
                        pc,
                        instruction = ?step.instruction,
                        depth = self.thread.depth(),
                        "step"
                    );
                }
                self.thread.execute(&step.instruction, process)
            }
            // running off the end is a void return
            None => self.thread.leave(Value::Null),
        };
        match result {
            Ok(()) if self.thread.state() == ThreadState::Halted => {
                tracing::debug!(program = %program.name, "thread halted");
            }
            Ok(()) => {}
            Err(error) => {
                tracing::debug!(%error, program = %program.name, pc, "thread faulted");
                self.thread.raise(error);
            }
        }
    }

    fn suspend(&mut self, reason: PauseReason) -> ExecutionResult {
        match self.thread.transition(ThreadState::Suspended) {
            Ok(()) => {
                self.skip_break_once = true;
                ExecutionResult::suspended(reason)
            }
            Err(error) => self.fail(error),
        }
    }

    fn fail(&mut self, error: VmError) -> ExecutionResult {
        self.thread.raise(error);
        self.outcome()
    }

    fn outcome(&self) -> ExecutionResult {
        match self.thread.state() {
            ThreadState::Halted => {
                ExecutionResult::completed(self.thread.return_value().cloned().unwrap_or(Value::Null))
            }
            ThreadState::Faulted => match self.thread.fault() {
                Some(fault) => ExecutionResult::failed(fault.clone()),
                None => ExecutionResult::failed(ThreadFault {
                    error: VmError::internal("faulted without a recorded error"),
                    trace: Vec::new(),
                }),
            },
            ThreadState::Running | ThreadState::Suspended => ExecutionResult::suspended(PauseReason::Requested),
        }
    }
}

/// Nesting limit of [`run_to_completion`]
///
/// Each level holds a native frame on the host stack, so a value whose text
/// refers back to itself must stop here rather than exhaust that stack.
pub const MAX_NESTED_RUNS: usize = 32;

/// Run `program` on a fresh thread until it returns
///
/// Ignores the step budget and breakpoints. A fault surfaces as its error.
/// Nesting deeper than [`MAX_NESTED_RUNS`] is a stack overflow.
pub fn run_to_completion(process: &mut Process, program: Rc<Program>, args: &[Value]) -> VmResult<Value> {
    if process.nested_runs >= MAX_NESTED_RUNS {
        return Err(RuntimeError::StackOverflow.into());
    }
    process.nested_runs += 1;
    let mut interpreter = Interpreter::new();
    interpreter.start(process, program, args);
    let result = interpreter.run_with_budget(process, None);
    process.nested_runs -= 1;
    match result {
        ExecutionResult::Completed(value) => Ok(value),
        ExecutionResult::Failed(fault) => Err(fault.error),
        ExecutionResult::Suspended(reason) => Err(VmError::internal(format!(
            "nested execution suspended ({reason:?})"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::TextPosition;
    use crate::compiler::Instruction;
    use crate::types::{Operator, Type};
    use crate::vm::EngineOptions;

    fn at(line: u32) -> TextPosition {
        TextPosition::new(line, 1, 0)
    }

    fn program(name: &str, steps: Vec<(Instruction, u32)>, slots: usize) -> Rc<Program> {
        let mut program = Program::new("test", name);
        for (instruction, line) in steps {
            program.push(instruction, at(line));
        }
        program.stack_slot_count = slots;
        Rc::new(program)
    }

    fn divide(lhs: i32, rhs: i32) -> Rc<Program> {
        program(
            "divide",
            vec![
                (Instruction::PushConstant { value: Value::Int(lhs) }, 1),
                (Instruction::PushConstant { value: Value::Int(rhs) }, 1),
                (Instruction::Binary { op: Operator::Divide, left: Type::INT }, 1),
                (Instruction::Return { has_value: true }, 2),
            ],
            0,
        )
    }

    #[test]
    fn test_integer_division_truncates() {
        let mut process = Process::new();
        let value = run_to_completion(&mut process, divide(7, 2), &[]).unwrap();
        assert_eq!(value, Value::Int(3));
    }

    #[test]
    fn test_fault_stops_execution() {
        let mut process = Process::new();
        let steps = vec![
            (Instruction::PushConstant { value: Value::Int(1) }, 1),
            (Instruction::PushConstant { value: Value::Int(0) }, 1),
            (Instruction::Binary { op: Operator::Divide, left: Type::INT }, 1),
            (Instruction::Print { newline: true, has_value: true }, 1),
            (Instruction::PushConstant { value: Value::string("unreachable") }, 2),
            (Instruction::Print { newline: true, has_value: true }, 2),
            (Instruction::CloseStackFrame, 3),
        ];
        let mut interpreter = Interpreter::new();
        interpreter.start(&process, program("main", steps, 0), &[]);

        let result = interpreter.run(&mut process);
        let ExecutionResult::Failed(fault) = result else {
            panic!("expected a fault, got {result:?}");
        };
        assert!(matches!(fault.error, VmError::Runtime(RuntimeError::DivisionByZero)));
        assert_eq!(fault.trace[0].program, "main");
        assert_eq!(interpreter.thread().state(), ThreadState::Faulted);
        assert_eq!(process.console.output(), "");
        assert!(interpreter.step(&mut process).is_failed());
    }

    #[test]
    fn test_local_slots_and_jumps() {
        // for (i = 0; i < 5; i++) sum += i;
        let steps = vec![
            (Instruction::PushConstant { value: Value::Int(0) }, 1),
            (Instruction::StoreLocal { offset: 0, keep: false }, 1),
            (Instruction::PushConstant { value: Value::Int(0) }, 1),
            (Instruction::StoreLocal { offset: 1, keep: false }, 1),
            (Instruction::LoadLocal { offset: 1 }, 2),
            (Instruction::PushConstant { value: Value::Int(5) }, 2),
            (Instruction::Binary { op: Operator::Lower, left: Type::INT }, 2),
            (Instruction::JumpIfFalse { target: 18 }, 2),
            (Instruction::LoadLocal { offset: 0 }, 3),
            (Instruction::LoadLocal { offset: 1 }, 3),
            (Instruction::Binary { op: Operator::Plus, left: Type::INT }, 3),
            (Instruction::StoreLocal { offset: 0, keep: false }, 3),
            (Instruction::LoadLocal { offset: 1 }, 4),
            (Instruction::PushConstant { value: Value::Int(1) }, 4),
            (Instruction::Binary { op: Operator::Plus, left: Type::INT }, 4),
            (Instruction::StoreLocal { offset: 1, keep: false }, 4),
            (Instruction::Jump { target: 4 }, 4),
            (Instruction::Noop, 4),
            (Instruction::LoadLocal { offset: 0 }, 5),
            (Instruction::Return { has_value: true }, 5),
        ];
        let mut process = Process::new();
        let value = run_to_completion(&mut process, program("loop", steps, 2), &[]).unwrap();
        assert_eq!(value, Value::Int(10));
    }

    #[test]
    fn test_breakpoint_and_resume() {
        let mut process = Process::new();
        let mut interpreter = Interpreter::new();
        interpreter.debug.add_breakpoint("divide", 2);
        interpreter.start(&process, divide(9, 3), &[]);

        let paused = interpreter.run(&mut process);
        assert!(matches!(paused, ExecutionResult::Suspended(PauseReason::Breakpoint)));
        assert_eq!(interpreter.thread().pc(), 2);
        assert_eq!(interpreter.thread().stack(), &[Value::Int(9), Value::Int(3)]);

        let finished = interpreter.resume(&mut process).unwrap();
        assert!(matches!(finished, ExecutionResult::Completed(Value::Int(3))));
        assert!(interpreter.resume(&mut process).is_err());
    }

    #[test]
    fn test_step_budget_suspends() {
        let mut process = Process::with_options(EngineOptions::with_step_budget(2));
        let mut interpreter = Interpreter::new();
        interpreter.start(&process, divide(8, 2), &[]);

        let first = interpreter.run(&mut process);
        assert!(matches!(first, ExecutionResult::Suspended(PauseReason::BudgetExhausted)));
        assert_eq!(interpreter.thread().pc(), 2);
        let second = interpreter.resume(&mut process).unwrap();
        assert!(second.is_completed());
    }

    #[test]
    fn test_single_step() {
        let mut process = Process::new();
        let mut interpreter = Interpreter::new();
        interpreter.start(&process, divide(4, 2), &[]);
        for _ in 0..3 {
            assert!(matches!(
                interpreter.step(&mut process),
                ExecutionResult::Suspended(PauseReason::Step)
            ));
        }
        assert!(interpreter.step(&mut process).is_completed());
    }

    #[test]
    fn test_step_over_pauses_on_next_line() {
        let mut process = Process::new();
        let mut interpreter = Interpreter::new();
        interpreter.debug.add_breakpoint("divide", 0);
        interpreter.start(&process, divide(6, 3), &[]);
        assert!(interpreter.run(&mut process).is_suspended());

        let thread = interpreter.thread();
        interpreter.debug.step_mode = StepMode::Over {
            target_depth: thread.depth(),
            start_line: thread.position().line,
        };
        let paused = interpreter.resume(&mut process).unwrap();
        assert!(matches!(paused, ExecutionResult::Suspended(PauseReason::Step)));
        assert_eq!(interpreter.thread().position().line, 2);
        assert_eq!(interpreter.debug.step_mode, StepMode::None);
    }
}
