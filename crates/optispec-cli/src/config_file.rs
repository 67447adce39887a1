//! Discovery of `optispec.toml`.
//!
//! Search order:
//! 1. `--config <path>` when given
//! 2. Current working directory upward
//! 3. Built-in defaults

use anyhow::{Context, Result};
use optispec::EngineConfig;
use std::path::{Path, PathBuf};

pub const CONFIG_FILE_NAME: &str = "optispec.toml";

pub enum ConfigSource {
    File(PathBuf),
    Default,
}

/// Search upward from `start` for `optispec.toml`.
fn find_config_file(start: &Path) -> Option<PathBuf> {
    let mut current = start.to_path_buf();
    loop {
        let candidate = current.join(CONFIG_FILE_NAME);
        if candidate.is_file() {
            return Some(candidate);
        }
        if !current.pop() {
            return None;
        }
    }
}

pub fn parse_config(content: &str) -> Result<EngineConfig> {
    Ok(toml::from_str(content)?)
}

fn read_config(path: &Path) -> Result<EngineConfig> {
    let content =
        std::fs::read_to_string(path).with_context(|| format!("reading config {}", path.display()))?;
    parse_config(&content).with_context(|| format!("parsing config {}", path.display()))
}

pub fn load_config(explicit: Option<&Path>) -> Result<(EngineConfig, ConfigSource)> {
    if let Some(path) = explicit {
        return Ok((read_config(path)?, ConfigSource::File(path.to_path_buf())));
    }
    let found = std::env::current_dir()
        .ok()
        .and_then(|cwd| find_config_file(&cwd));
    match found {
        Some(path) => Ok((read_config(&path)?, ConfigSource::File(path))),
        None => Ok((EngineConfig::default(), ConfigSource::Default)),
    }
}
