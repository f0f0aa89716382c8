pub mod config;
pub mod scan;

use anyhow::{Context, Result};
use linehunt_core::Config;
use std::path::Path;

/// Load an explicit config file, or fall back to the default lookup
pub fn load_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => Config::load_from(path)
            .with_context(|| format!("Failed to load config from {}", path.display())),
        None => Ok(Config::load()),
    }
}
