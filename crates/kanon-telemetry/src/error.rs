//! Telemetry error types.

use thiserror::Error;

/// Errors that can occur while setting up logging.
#[derive(Debug, Error)]
pub enum TelemetryError {
    /// The subscriber could not be installed.
    #[error("Failed to initialize logging: {0}")]
    LoggingInit(String),

    /// The filter directive could not be parsed.
    #[error("Invalid log filter {filter:?}: {reason}")]
    InvalidFilter {
        /// The rejected directive.
        filter: String,
        /// Parser message.
        reason: String,
    },
}

impl TelemetryError {
    /// Creates an invalid filter error.
    pub fn invalid_filter(filter: impl Into<String>, reason: impl ToString) -> Self {
        Self::InvalidFilter {
            filter: filter.into(),
            reason: reason.to_string(),
        }
    }
}
