//! Configuration structures for the function block runtime.
//!
//! Supports TOML deserialization with defaults suitable for embedded
//! targets; every section may be omitted.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, warn};

/// Top-level runtime configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Resource limits applied to every instance it creates.
    pub resource: ResourceConfig,

    /// Limits for configurable-arity blocks.
    pub generic: GenericConfig,

    /// Process-interface connection policy.
    pub process: ProcessConfig,
}

/// Resource-wide limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ResourceConfig {
    /// Resource name used in diagnostics.
    pub name: String,

    /// Upper bound for a single connection or variable buffer in bytes.
    pub max_buffer_bytes: usize,

    /// Upper bound for internal sub-blocks owned by one basic block.
    pub max_internal_fbs: usize,

    /// Deepest allowed chain of sub-blocks below a top-level instance.
    pub max_nesting_depth: usize,
}

impl Default for ResourceConfig {
    fn default() -> Self {
        Self {
            name: String::from("EMB_RES"),
            max_buffer_bytes: 64 * 1024, // 64 KiB
            max_internal_fbs: 256,
            max_nesting_depth: 16,
        }
    }
}

/// Generic block configuration limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GenericConfig {
    /// Largest accepted input count in a configuration string.
    pub max_inputs: usize,
}

impl Default for GenericConfig {
    fn default() -> Self {
        Self { max_inputs: 100 }
    }
}

/// Connection policy for process-interface blocks.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessConfig {
    /// Additional connection attempts after the first one fails.
    pub connect_retries: u32,

    /// Pause between connection attempts.
    #[serde(with = "humantime_serde")]
    pub retry_interval: Duration,
}

impl Default for ProcessConfig {
    fn default() -> Self {
        Self {
            connect_retries: 10,
            retry_interval: Duration::from_secs(1),
        }
    }
}

impl RuntimeConfig {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &std::path::Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            warn!(path = %path.display(), error = %e, "Failed to read runtime configuration");
            ConfigError::Io {
                path: path.to_path_buf(),
                source: e,
            }
        })?;
        let config = Self::from_toml(&content)?;
        debug!(
            path = %path.display(),
            resource = %config.resource.name,
            "Runtime configuration loaded"
        );
        Ok(config)
    }

    /// Parse configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML is invalid.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| {
            warn!(error = %e, "Invalid runtime configuration");
            ConfigError::Parse(e)
        })
    }

    /// Serialize configuration to TOML string.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(ConfigError::Serialize)
    }
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// File I/O error.
    #[error("failed to read config file {path}: {source}")]
    Io {
        /// Path to the configuration file.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// TOML parsing error.
    #[error("failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    /// TOML serialization error.
    #[error("failed to serialize TOML: {0}")]
    Serialize(#[from] toml::ser::Error),
}

/// Serde helper module for `Duration` using humantime format.
mod humantime_serde {
    use serde::{self, Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let s = humantime::format_duration(*duration).to_string();
        serializer.serialize_str(&s)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        humantime::parse_duration(&s).map_err(serde::de::Error::custom)
    }
}
