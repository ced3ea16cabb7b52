//! Execution result types for the step interpreter
//!
//! The driver gets one of these back from `run`, `step` and `resume`:
//! - `Completed`: the outermost program returned
//! - `Suspended`: the thread paused and can be resumed
//! - `Failed`: a step raised an error and the thread is faulted

use super::thread::ThreadFault;
use crate::vm::{Value, VmResult};
use serde::Serialize;

/// Why execution was paused
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PauseReason {
    /// Reached a breakpoint
    Breakpoint,
    /// Step completed
    Step,
    /// Driver called `pause`
    Requested,
    /// The step budget of this `run` is spent
    BudgetExhausted,
}

/// Result of driving a thread
#[derive(Debug)]
pub enum ExecutionResult {
    /// Outermost program returned this value
    Completed(Value),

    /// Thread is suspended and can be resumed
    Suspended(PauseReason),

    /// Thread faulted
    Failed(ThreadFault),
}

impl ExecutionResult {
    /// Create a completed result
    pub fn completed(value: Value) -> Self {
        ExecutionResult::Completed(value)
    }

    /// Create a suspended result
    pub fn suspended(reason: PauseReason) -> Self {
        ExecutionResult::Suspended(reason)
    }

    /// Create a failed result
    pub fn failed(fault: ThreadFault) -> Self {
        ExecutionResult::Failed(fault)
    }

    /// Check if the result is completed
    pub fn is_completed(&self) -> bool {
        matches!(self, ExecutionResult::Completed(_))
    }

    /// Check if the result is suspended
    pub fn is_suspended(&self) -> bool {
        matches!(self, ExecutionResult::Suspended(_))
    }

    /// Check if the result is failed
    pub fn is_failed(&self) -> bool {
        matches!(self, ExecutionResult::Failed(_))
    }

    /// Split internal errors off program faults
    ///
    /// A fault whose error [`is_internal`](crate::vm::VmError::is_internal)
    /// becomes `Err`; everything else passes through.
    pub fn into_checked(self) -> VmResult<Self> {
        match self {
            ExecutionResult::Failed(fault) if fault.error.is_internal() => {
                tracing::error!(%fault, "internal error");
                Err(fault.error)
            }
            other => Ok(other),
        }
    }
}
