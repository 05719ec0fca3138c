//! Configuration sections.

use std::path::PathBuf;

use kanon_telemetry::LogConfig;
use serde::{Deserialize, Serialize};

/// Where the contract document lives.
///
/// The directory and the file name are configured separately so one
/// directory of contracts can serve several services.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ContractConfig {
    /// Directory holding the contract.
    #[serde(default = "default_file_path")]
    pub file_path: PathBuf,

    /// File name of the contract. `.json` is read as JSON, anything else
    /// as YAML.
    #[serde(default = "default_file_name")]
    pub file_name: String,
}

impl Default for ContractConfig {
    fn default() -> Self {
        Self {
            file_path: default_file_path(),
            file_name: default_file_name(),
        }
    }
}

impl ContractConfig {
    /// Full path of the contract file.
    #[must_use]
    pub fn path(&self) -> PathBuf {
        self.file_path.join(&self.file_name)
    }
}

fn default_file_path() -> PathBuf {
    PathBuf::from(".")
}

fn default_file_name() -> String {
    "openapi.yaml".to_string()
}

/// Log format.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// JSON lines (production).
    #[default]
    Json,
    /// Human-readable pretty format (development).
    Pretty,
}

/// Logging section.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Enable logging.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Filter directive (trace, debug, info, warn, error, or per-target).
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log output format.
    #[serde(default)]
    pub format: LogFormat,

    /// Include source file and line in logs.
    #[serde(default)]
    pub include_location: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            level: default_log_level(),
            format: LogFormat::default(),
            include_location: false,
        }
    }
}

impl LoggingConfig {
    /// Builds the subscriber settings for `service_name`.
    #[must_use]
    pub fn to_log_config(&self, service_name: &str) -> LogConfig {
        let base = match self.format {
            LogFormat::Json => LogConfig::production(),
            LogFormat::Pretty => LogConfig::development(),
        };
        LogConfig {
            enabled: self.enabled,
            level: self.level.clone(),
            file_line_info: self.include_location,
            service_name: service_name.to_string(),
            ..base
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_true() -> bool {
    true
}
