//! System configuration
//!
//! Loaded from `~/.config/shutwatch/config.toml` (or `--config`). Every
//! field has a default, so a missing file or section is fine. Command-line
//! flags are applied on top after loading.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use shutwatch_watcher::{RegistrationPolicy, RetryPolicy};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SystemConfig {
    pub watch: WatchConfig,
    pub read: ReadConfig,
    pub shutdown: ShutdownConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchConfig {
    /// Skip paths that cannot be watched instead of aborting
    pub keep_going: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReadConfig {
    /// Retries for transient read failures (0 = every failure is fatal)
    pub max_retries: u32,
    /// First retry delay, doubled on each further attempt
    pub retry_backoff_ms: u64,
}

impl Default for ReadConfig {
    fn default() -> Self {
        Self {
            max_retries: 0,
            retry_backoff_ms: 100,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShutdownConfig {
    /// Run `program` on access; otherwise only print the notice
    pub execute: bool,
    pub program: String,
    pub args: Vec<String>,
}

impl Default for ShutdownConfig {
    fn default() -> Self {
        Self {
            execute: false,
            program: "shutdown".to_string(),
            args: vec!["-h".to_string(), "now".to_string()],
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("read.max_retries must be at most 100 (got {0})")]
    TooManyRetries(u32),

    #[error("read.retry_backoff_ms must be between 1 and 60000 (got {0})")]
    BackoffOutOfRange(u64),

    #[error("shutdown.program must not be empty when shutdown.execute is set")]
    MissingProgram,
}

impl SystemConfig {
    /// Check value ranges
    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        if self.read.max_retries > 100 {
            return Err(ConfigError::TooManyRetries(self.read.max_retries));
        }
        if !(1..=60_000).contains(&self.read.retry_backoff_ms) {
            return Err(ConfigError::BackoffOutOfRange(self.read.retry_backoff_ms));
        }
        if self.shutdown.execute && self.shutdown.program.trim().is_empty() {
            return Err(ConfigError::MissingProgram);
        }
        Ok(())
    }

    pub fn registration_policy(&self) -> RegistrationPolicy {
        if self.watch.keep_going {
            RegistrationPolicy::Lenient
        } else {
            RegistrationPolicy::Strict
        }
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.read.max_retries,
            initial_backoff: Duration::from_millis(self.read.retry_backoff_ms),
        }
    }
}

/// Default config file location
pub fn config_file_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("shutwatch").join("config.toml"))
}

/// Load and validate the configuration
///
/// An explicit path must exist. The default path is optional.
pub fn load(explicit: Option<&Path>) -> Result<SystemConfig> {
    let config = match explicit {
        Some(path) => load_from(path)?,
        None => match config_file_path() {
            Some(path) if path.exists() => load_from(&path)?,
            _ => SystemConfig::default(),
        },
    };

    config.validate().context("Invalid configuration")?;
    Ok(config)
}

fn load_from(path: &Path) -> Result<SystemConfig> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file {}", path.display()))?;
    parse(&contents).with_context(|| format!("Failed to parse config file {}", path.display()))
}

fn parse(contents: &str) -> Result<SystemConfig> {
    Ok(toml::from_str(contents)?)
}
