//! `javelin dump`: print generated programs as JSON

use super::load_module;
use anyhow::Context;
use javelin_engine::{CodeGenerator, GeneratedModule, Process};
use serde_json::{json, Value};
use std::path::Path;
use std::process::ExitCode;

pub fn execute(module_path: &Path) -> anyhow::Result<ExitCode> {
    let module = load_module(module_path)?;
    let mut process = Process::new();
    let generated = CodeGenerator::generate(&module, &mut process);
    let tree = to_json(&generated).context("failed to encode programs")?;
    println!("{}", serde_json::to_string_pretty(&tree)?);
    Ok(if generated.has_errors() {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}

/// Programs and diagnostics of a generated module
pub fn to_json(generated: &GeneratedModule) -> serde_json::Result<Value> {
    let programs = |list: &[std::rc::Rc<javelin_engine::Program>]| -> serde_json::Result<Vec<Value>> {
        list.iter().map(|p| serde_json::to_value(&**p)).collect()
    };
    let main = generated
        .main_program
        .as_ref()
        .map(|p| serde_json::to_value(&**p))
        .transpose()?;
    let diagnostics: Vec<String> = generated.errors.iter().map(|d| d.to_string()).collect();
    Ok(json!({
        "module": generated.name,
        "main": main,
        "static_initializers": programs(&generated.static_initializers)?,
        "programs": programs(&generated.programs)?,
        "diagnostics": diagnostics,
    }))
}
