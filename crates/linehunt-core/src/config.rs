use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{LinehuntError, Result};

/// Validated settings for a single scan run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanConfig {
    /// Number of lines the queue holds before the reader blocks
    pub capacity: usize,
    /// Number of worker threads
    pub workers: usize,
    /// Search term each line is tested against
    pub term: String,
    /// Case-insensitive matching
    pub ignore_case: bool,
}

impl ScanConfig {
    /// Build a scan config from file defaults and a search term
    pub fn from_config(config: &Config, term: impl Into<String>) -> Self {
        Self {
            capacity: config.queue.capacity,
            workers: config.workers.count,
            term: term.into(),
            ignore_case: config.workers.ignore_case,
        }
    }

    /// Reject configurations that cannot run before anything is allocated
    pub fn validate(&self) -> Result<()> {
        if self.capacity == 0 {
            return Err(LinehuntError::config("queue capacity must be at least 1"));
        }
        if self.workers == 0 {
            return Err(LinehuntError::config("worker count must be at least 1"));
        }
        if self.term.is_empty() {
            return Err(LinehuntError::config("search term must not be empty"));
        }
        Ok(())
    }
}

/// Global linehunt configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Queue configuration
    pub queue: QueueConfig,

    /// Worker pool configuration
    pub workers: WorkerConfig,

    /// Output formatting
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueConfig {
    /// Maximum number of lines buffered between reader and workers
    pub capacity: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerConfig {
    /// Number of worker threads
    pub count: usize,

    /// Match the term case-insensitively
    pub ignore_case: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Output format: plain, json, pretty
    pub format: String,

    /// Print the per-worker breakdown
    pub show_workers: bool,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self { capacity: 64 }
    }
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            count: std::thread::available_parallelism()
                .map(|n| n.get().min(8))
                .unwrap_or(2),
            ignore_case: false,
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: "plain".into(),
            show_workers: true,
        }
    }
}

impl Config {
    /// Load config from default locations (in order of precedence):
    /// 1. $PWD/.linehunt.toml
    /// 2. $XDG_CONFIG_HOME/linehunt/config.toml
    /// 3. Built-in defaults
    pub fn load() -> Self {
        if let Ok(content) = std::fs::read_to_string(".linehunt.toml") {
            match toml::from_str(&content) {
                Ok(config) => return config,
                Err(e) => tracing::warn!("Ignoring malformed .linehunt.toml: {}", e),
            }
        }

        if let Some(config_dir) = dirs::config_dir() {
            let config_path = config_dir.join("linehunt").join("config.toml");
            if let Ok(content) = std::fs::read_to_string(&config_path) {
                match toml::from_str(&content) {
                    Ok(config) => return config,
                    Err(e) => tracing::warn!("Ignoring malformed {}: {}", config_path.display(), e),
                }
            }
        }

        Self::default()
    }

    /// Load config from a specific file
    pub fn load_from(path: &Path) -> std::result::Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config = toml::from_str(&content)?;
        Ok(config)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

impl From<ConfigError> for LinehuntError {
    fn from(e: ConfigError) -> Self {
        LinehuntError::Config(e.to_string())
    }
}
