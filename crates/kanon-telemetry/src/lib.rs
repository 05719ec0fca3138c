//! Structured logging for Kanon.
//!
//! Every Kanon crate logs through `tracing` macros with structured fields.
//! This crate installs the subscriber that turns those events into output:
//! JSON lines in production, pretty text during development.
//!
//! # Example
//!
//! ```rust,ignore
//! use kanon_telemetry::{init_logging, LogConfig};
//!
//! init_logging(&LogConfig::production().with_service_name("orders"))?;
//!
//! tracing::info!(route = "createOrder", "contract loaded");
//! ```

#![warn(missing_docs)]

pub mod error;
pub mod logging;

pub use error::TelemetryError;
pub use logging::{create_env_filter, fields, init_logging, LogConfig};

/// Result type for telemetry operations.
pub type TelemetryResult<T> = Result<T, TelemetryError>;
