//! `javelin run`: compile a module and execute its entry program

use super::{display_name, load_module, load_source};
use crate::config::Config;
use crate::output;
use javelin_engine::vm::{Console, PauseReason};
use javelin_engine::{CodeGenerator, ExecutionResult, Process};
use std::path::PathBuf;
use std::process::ExitCode;
use termcolor::ColorChoice;

/// Exit status of a run stopped by `--max-steps`
const EXIT_STEP_LIMIT: u8 = 2;
/// Exit status when the engine itself failed
const EXIT_INTERNAL: u8 = 3;

pub struct RunArgs {
    pub module: PathBuf,
    pub max_steps: Option<u64>,
    pub config: Option<PathBuf>,
    pub source: Option<PathBuf>,
    pub color: ColorChoice,
}

pub fn execute(args: RunArgs) -> anyhow::Result<ExitCode> {
    let module = load_module(&args.module)?;
    let mut options = Config::load(args.config.as_deref())?.engine;
    if let Some(max_steps) = args.max_steps {
        options.step_budget = Some(max_steps);
    }

    let mut process = Process::with_options(options);
    process.console = Console::echoing();
    let generated = CodeGenerator::generate(&module, &mut process);
    if generated.has_errors() {
        let source = load_source(args.source.as_deref())?;
        output::emit_diagnostics(
            &generated.errors,
            &display_name(&args.module, args.source.as_deref()),
            source.as_deref(),
            args.color,
        )?;
        output::summary("compilation failed", true, args.color)?;
        return Ok(ExitCode::FAILURE);
    }

    let result = match generated.execute(&mut process) {
        Ok(result) => result,
        Err(error) if error.is_internal() => {
            output::summary(
                &format!("engine failure while running {}: {}", module.name, error),
                true,
                args.color,
            )?;
            return Ok(ExitCode::from(EXIT_INTERNAL));
        }
        // a static initializer faulted before the entry program started
        Err(error) => {
            eprintln!("Exception: {}", error);
            return Ok(ExitCode::FAILURE);
        }
    };
    match result {
        ExecutionResult::Completed(_) => Ok(ExitCode::SUCCESS),
        ExecutionResult::Failed(fault) => {
            eprintln!("{}", fault);
            Ok(ExitCode::FAILURE)
        }
        ExecutionResult::Suspended(PauseReason::BudgetExhausted) => {
            let limit = process.options.step_budget.unwrap_or_default();
            output::summary(&format!("stopped after {} steps", limit), true, args.color)?;
            Ok(ExitCode::from(EXIT_STEP_LIMIT))
        }
        ExecutionResult::Suspended(reason) => {
            anyhow::bail!("execution of {} paused unexpectedly ({:?})", module.name, reason)
        }
    }
}
