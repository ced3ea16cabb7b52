//! Subcommand implementations

pub mod check;
pub mod dump;
pub mod run;

use anyhow::Context;
use javelin_engine::ast::Module;
use std::path::Path;

/// Read a module syntax tree from JSON
pub fn load_module(path: &Path) -> anyhow::Result<Module> {
    let text = std::fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    let module: Module =
        serde_json::from_str(&text).with_context(|| format!("{} is not a module syntax tree", path.display()))?;
    tracing::debug!(module = %module.name, classes = module.classes.len(), "module loaded");
    Ok(module)
}

/// Read the optional source text used to label diagnostics
pub fn load_source(path: Option<&Path>) -> anyhow::Result<Option<String>> {
    path.map(|path| std::fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display())))
        .transpose()
}

/// Name diagnostics are reported against
pub fn display_name(module: &Path, source: Option<&Path>) -> String {
    source.unwrap_or(module).display().to_string()
}
