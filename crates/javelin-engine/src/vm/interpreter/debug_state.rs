//! Breakpoints and stepping
//!
//! The interpreter asks `should_break` before every step. The driver owns the
//! state and edits it between runs, so nothing here needs locking.

use super::execution::PauseReason;
use super::thread::Thread;
use rustc_hash::{FxHashMap, FxHashSet};

/// Stepping mode, set by the driver and checked before each step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StepMode {
    /// Only break at breakpoints
    #[default]
    None,
    /// Step over: same or lower depth and line changed
    Over {
        /// Depth at the pause
        target_depth: usize,
        /// Line at the pause
        start_line: u32,
    },
    /// Step into: any depth and line changed
    Into {
        /// Line at the pause
        start_line: u32,
    },
    /// Step out: depth below target
    Out {
        /// Depth at the pause
        target_depth: usize,
    },
}

/// Debugger state for one interpreter
#[derive(Debug, Default)]
pub struct DebugState {
    /// Breakpoints: program name to step indices
    breakpoints: FxHashMap<String, FxHashSet<usize>>,

    /// Source lines that pause when execution enters them
    line_breakpoints: FxHashSet<u32>,

    /// Current step mode
    pub step_mode: StepMode,

    /// Line of the previous step (line breakpoints trigger on change)
    last_line: u32,
}

impl DebugState {
    /// Create a debug state with no breakpoints
    pub fn new() -> Self {
        Self::default()
    }

    /// Break before step `pc` of the program named `program`
    pub fn add_breakpoint(&mut self, program: impl Into<String>, pc: usize) {
        self.breakpoints.entry(program.into()).or_default().insert(pc);
    }

    /// Remove a step breakpoint, returning whether it existed
    pub fn remove_breakpoint(&mut self, program: &str, pc: usize) -> bool {
        let Some(offsets) = self.breakpoints.get_mut(program) else {
            return false;
        };
        let removed = offsets.remove(&pc);
        if offsets.is_empty() {
            self.breakpoints.remove(program);
        }
        removed
    }

    /// Break when execution reaches `line` in any program
    pub fn add_line_breakpoint(&mut self, line: u32) {
        self.line_breakpoints.insert(line);
    }

    /// Drop every breakpoint
    pub fn clear_breakpoints(&mut self) {
        self.breakpoints.clear();
        self.line_breakpoints.clear();
    }

    /// Pause at the next line in the current or a calling frame
    pub fn step_over(&mut self, thread: &Thread) {
        self.step_mode = StepMode::Over {
            target_depth: thread.depth(),
            start_line: thread.position().line,
        };
    }

    /// Pause at the next line, entering calls
    pub fn step_into(&mut self, thread: &Thread) {
        self.step_mode = StepMode::Into {
            start_line: thread.position().line,
        };
    }

    /// Pause once the current frame returned
    pub fn step_out(&mut self, thread: &Thread) {
        self.step_mode = StepMode::Out {
            target_depth: thread.depth(),
        };
    }

    /// Called before each step. Returns `Some(reason)` if execution should pause.
    ///
    /// A triggered step mode resets to [`StepMode::None`].
    pub fn should_break(&mut self, thread: &Thread) -> Option<PauseReason> {
        let Some(program) = thread.current_program() else {
            return None;
        };
        let line = thread.position().line;
        let depth = thread.depth();
        let line_changed = line != self.last_line;
        self.last_line = line;

        if self
            .breakpoints
            .get(&program.name)
            .map(|offsets| offsets.contains(&thread.pc()))
            .unwrap_or(false)
        {
            return Some(PauseReason::Breakpoint);
        }
        if line_changed && self.line_breakpoints.contains(&line) {
            return Some(PauseReason::Breakpoint);
        }

        let hit = match self.step_mode {
            StepMode::None => false,
            StepMode::Over {
                target_depth,
                start_line,
            } => depth <= target_depth && line != start_line && line != 0,
            StepMode::Into { start_line } => line != start_line && line != 0,
            StepMode::Out { target_depth } => depth < target_depth,
        };
        if hit {
            self.step_mode = StepMode::None;
            return Some(PauseReason::Step);
        }
        None
    }
}
