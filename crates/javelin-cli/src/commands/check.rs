//! `javelin check`: compile a module and report its diagnostics

use super::{display_name, load_module, load_source};
use crate::output;
use javelin_engine::{CodeGenerator, Process};
use std::path::Path;
use std::process::ExitCode;
use termcolor::ColorChoice;

pub fn execute(module_path: &Path, source_path: Option<&Path>, color: ColorChoice) -> anyhow::Result<ExitCode> {
    let module = load_module(module_path)?;
    let source = load_source(source_path)?;

    let mut process = Process::new();
    let generated = CodeGenerator::generate(&module, &mut process);
    output::emit_diagnostics(
        &generated.errors,
        &display_name(module_path, source_path),
        source.as_deref(),
        color,
    )?;

    let failed = generated.has_errors();
    let summary = match generated.errors.len() {
        0 => format!("{}: no problems found", module.name),
        n => format!("{}: {} problem(s) found", module.name, n),
    };
    output::summary(&summary, failed, color)?;
    Ok(if failed { ExitCode::FAILURE } else { ExitCode::SUCCESS })
}
