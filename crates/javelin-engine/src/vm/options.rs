//! Engine options

use serde::{Deserialize, Serialize};

/// Options for a [`Process`](super::Process)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineOptions {
    /// Maximum operand stack depth; exceeding it is a "Stack overflow"
    pub max_stack_size: usize,

    /// Steps executed per `run` before the thread suspends (None = unlimited)
    pub step_budget: Option<u64>,

    /// Length budget for [`Type::format`](crate::types::Type::format)
    pub format_max_length: usize,

    /// Emit a trace event per executed step
    pub trace_steps: bool,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            max_stack_size: 65536,
            step_budget: None,
            format_max_length: 40,
            trace_steps: false,
        }
    }
}

impl EngineOptions {
    /// Options with a step budget
    pub fn with_step_budget(budget: u64) -> Self {
        Self {
            step_budget: Some(budget),
            ..Default::default()
        }
    }
}
