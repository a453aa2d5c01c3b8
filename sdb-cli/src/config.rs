//! Configuration loading and parsing
//!
//! A config file describes the debugger bounds and the target to debug: its
//! initial registers and memory, plus a recorded trace of per-instruction
//! state changes that the trace target replays.

use anyhow::{Context, Result};
use sdb_core::{SdbConfig, Word};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// Main application configuration (loaded from a TOML file)
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AppConfig {
    #[serde(default)]
    pub debugger: SdbConfig,
    #[serde(default)]
    pub target: TargetConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TargetConfig {
    #[serde(default = "default_reset_vector")]
    pub pc: Word,
    #[serde(default = "default_reset_vector")]
    pub memory_base: Word,
    #[serde(default = "default_memory_size")]
    pub memory_size: usize,
    /// Initial register values by name
    #[serde(default)]
    pub registers: BTreeMap<String, Word>,
    /// Initial memory contents
    #[serde(default)]
    pub memory: Vec<MemoryWordConfig>,
    /// One entry per executed instruction
    #[serde(default)]
    pub steps: Vec<StepConfig>,
}

fn default_reset_vector() -> Word {
    0x8000_0000
}

fn default_memory_size() -> usize {
    4096
}

impl Default for TargetConfig {
    fn default() -> Self {
        Self {
            pc: default_reset_vector(),
            memory_base: default_reset_vector(),
            memory_size: default_memory_size(),
            registers: BTreeMap::new(),
            memory: Vec::new(),
            steps: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct MemoryWordConfig {
    pub addr: Word,
    pub value: Word,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct StepConfig {
    /// New pc after the step (defaults to pc + 4)
    pub pc: Option<Word>,
    #[serde(default)]
    pub registers: BTreeMap<String, Word>,
    #[serde(default)]
    pub memory: Vec<MemoryWordConfig>,
}

/// Load configuration from a TOML file
pub fn load_config(path: &Path) -> Result<AppConfig> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;

    let config: AppConfig = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {:?}", path))?;

    config
        .debugger
        .validate()
        .with_context(|| format!("Invalid debugger settings in {:?}", path))?;

    Ok(config)
}
