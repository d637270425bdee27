//! Command-line host configuration.
//!
//! Configuration is loaded in the following order (later overrides earlier):
//! 1. Default values
//! 2. YAML config file (if specified via MOVA_CONFIG or --config)
//! 3. Environment variables

use mova_core::{CompileOptions, NarrowingPolicy};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Host configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Compiler options.
    pub compiler: CompileOptions,
    /// Logging configuration.
    pub log: LogConfig,
    /// Interactive session configuration.
    pub repl: ReplConfig,
}

impl Config {
    /// Loads configuration from `path`, or from MOVA_CONFIG when no path is
    /// given, then applies environment variable overrides.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let path = path
            .map(Path::to_path_buf)
            .or_else(|| std::env::var_os("MOVA_CONFIG").map(PathBuf::from));

        let mut config = match path {
            Some(path) => Self::from_file(&path)?,
            None => Self::default(),
        };
        config.apply_env_overrides();
        Ok(config)
    }

    /// Loads configuration from a YAML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::IoError(path.to_path_buf(), e))?;
        let config: Config = serde_yaml::from_str(&content)
            .map_err(|e| ConfigError::ParseError(path.to_path_buf(), e))?;
        Ok(config)
    }

    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(policy) = var("MOVA_NARROWING") {
            match policy.parse::<NarrowingPolicy>() {
                Ok(policy) => self.compiler.narrowing = policy,
                Err(e) => tracing::warn!("ignoring MOVA_NARROWING: {}", e),
            }
        }

        if let Some(filter) = var("MOVA_LOG") {
            self.log.filter = filter;
        }

        if let Some(history) = var("MOVA_HISTORY") {
            self.repl.history = if history.is_empty() {
                None
            } else {
                Some(PathBuf::from(history))
            };
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Filter directive used when RUST_LOG is unset.
    pub filter: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            filter: "warn".to_string(),
        }
    }
}

/// Interactive session configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReplConfig {
    /// History file. `None` disables history.
    pub history: Option<PathBuf>,
    /// Prompt shown before each line.
    pub prompt: String,
}

impl Default for ReplConfig {
    fn default() -> Self {
        let history = std::env::var("HOME")
            .map(|h| PathBuf::from(h).join(".mova_history"))
            .unwrap_or_else(|_| PathBuf::from(".mova_history"));
        Self {
            history: Some(history),
            prompt: "mova>".to_string(),
        }
    }
}

/// Configuration error.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file '{}': {1}", .0.display())]
    IoError(PathBuf, #[source] std::io::Error),

    #[error("failed to parse config file '{}': {1}", .0.display())]
    ParseError(PathBuf, #[source] serde_yaml::Error),
}
