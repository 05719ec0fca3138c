//! Structured logging setup.
//!
//! # Example
//!
//! ```rust,ignore
//! use kanon_telemetry::logging::{init_logging, LogConfig};
//!
//! init_logging(&LogConfig::development())?;
//!
//! tracing::debug!(request_id = %id, route = "getBook", "request validated");
//! ```

use crate::error::TelemetryError;
use crate::TelemetryResult;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogConfig {
    /// Whether logging is enabled.
    pub enabled: bool,

    /// Filter directive, e.g. `"info"` or `"kanon_contract=debug,info"`.
    pub level: String,

    /// Whether to output JSON lines.
    pub json_format: bool,

    /// Whether to emit span open/close events.
    pub span_events: bool,

    /// Whether to include file/line info.
    pub file_line_info: bool,

    /// Whether to include thread IDs.
    pub thread_ids: bool,

    /// Whether to include the target (module path).
    pub include_target: bool,

    /// Service name announced when logging starts.
    pub service_name: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self::production()
    }
}

impl LogConfig {
    /// Human-readable output at debug level.
    #[must_use]
    pub fn development() -> Self {
        Self {
            enabled: true,
            level: "debug".to_string(),
            json_format: false,
            span_events: true,
            file_line_info: true,
            thread_ids: false,
            include_target: true,
            service_name: "kanon".to_string(),
        }
    }

    /// JSON output at info level.
    #[must_use]
    pub fn production() -> Self {
        Self {
            enabled: true,
            level: "info".to_string(),
            json_format: true,
            span_events: false,
            file_line_info: false,
            thread_ids: false,
            include_target: true,
            service_name: "kanon".to_string(),
        }
    }

    /// Sets the service name.
    #[must_use]
    pub fn with_service_name(mut self, service_name: impl Into<String>) -> Self {
        self.service_name = service_name.into();
        self
    }

    /// Sets the filter directive.
    #[must_use]
    pub fn with_level(mut self, level: impl Into<String>) -> Self {
        self.level = level.into();
        self
    }
}

/// Installs the global subscriber described by `config`.
///
/// # Errors
///
/// Returns `TelemetryError::InvalidFilter` for a bad directive and
/// `TelemetryError::LoggingInit` if a global subscriber is already set.
pub fn init_logging(config: &LogConfig) -> TelemetryResult<()> {
    if !config.enabled {
        return Ok(());
    }

    let filter = create_env_filter(&config.level)?;

    let span_events = if config.span_events {
        FmtSpan::NEW | FmtSpan::CLOSE
    } else {
        FmtSpan::NONE
    };

    if config.json_format {
        let fmt_layer = tracing_subscriber::fmt::layer()
            .json()
            .with_span_events(span_events)
            .with_file(config.file_line_info)
            .with_line_number(config.file_line_info)
            .with_thread_ids(config.thread_ids)
            .with_target(config.include_target)
            .with_filter(filter);

        tracing_subscriber::registry()
            .with(fmt_layer)
            .try_init()
            .map_err(|e| TelemetryError::LoggingInit(e.to_string()))?;
    } else {
        let fmt_layer = tracing_subscriber::fmt::layer()
            .pretty()
            .with_span_events(span_events)
            .with_file(config.file_line_info)
            .with_line_number(config.file_line_info)
            .with_thread_ids(config.thread_ids)
            .with_target(config.include_target)
            .with_filter(filter);

        tracing_subscriber::registry()
            .with(fmt_layer)
            .try_init()
            .map_err(|e| TelemetryError::LoggingInit(e.to_string()))?;
    }

    tracing::info!(service.name = %config.service_name, level = %config.level, "logging initialized");
    Ok(())
}

/// Parses a filter directive.
///
/// # Errors
///
/// Returns `TelemetryError::InvalidFilter` if the directive does not parse.
pub fn create_env_filter(filter: &str) -> TelemetryResult<EnvFilter> {
    EnvFilter::try_new(filter).map_err(|e| TelemetryError::invalid_filter(filter, e))
}

/// Field names used across Kanon log events.
pub mod fields {
    /// Request ID.
    pub const REQUEST_ID: &str = "request_id";

    /// Combined W3C trace ID.
    pub const TRACE_ID: &str = "trace_id";

    /// Route label: operation id or `METHOD template`.
    pub const ROUTE: &str = "route";

    /// HTTP method.
    pub const METHOD: &str = "method";

    /// Request path.
    pub const PATH: &str = "path";

    /// HTTP status code.
    pub const STATUS: &str = "status";

    /// Stable error code, e.g. `ERR_OPENAPI_1003`.
    pub const CODE: &str = "code";

    /// Internal failure detail.
    pub const DETAIL: &str = "detail";

    /// Service name.
    pub const SERVICE_NAME: &str = "service.name";
}
