//! `javelin.toml` loading
//!
//! ```toml
//! [engine]
//! max_stack_size = 4096
//! step_budget = 100000
//! ```

use anyhow::Context;
use javelin_engine::EngineOptions;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Configuration file looked up in the working directory
pub const CONFIG_FILE: &str = "javelin.toml";

/// Contents of a configuration file
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Engine limits and tracing
    pub engine: EngineOptions,
}

impl Config {
    /// Parse configuration text
    pub fn parse(text: &str) -> anyhow::Result<Self> {
        toml::from_str(text).context("invalid configuration")
    }

    /// Load `explicit`, or `javelin.toml` from the working directory when it exists
    pub fn load(explicit: Option<&Path>) -> anyhow::Result<Self> {
        let path = match explicit {
            Some(path) => path.to_path_buf(),
            None => {
                let default = PathBuf::from(CONFIG_FILE);
                if !default.exists() {
                    return Ok(Self::default());
                }
                default
            }
        };
        let text = std::fs::read_to_string(&path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        let config = Self::parse(&text).with_context(|| format!("in {}", path.display()))?;
        tracing::debug!(path = %path.display(), ?config, "configuration loaded");
        Ok(config)
    }
}
