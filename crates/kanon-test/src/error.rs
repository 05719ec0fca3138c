//! Test error types.

use thiserror::Error;

/// Errors that can occur while building or reading test traffic.
#[derive(Debug, Error)]
pub enum TestError {
    /// The request could not be built.
    #[error("Request build error: {0}")]
    RequestBuild(String),

    /// A header name or value is invalid.
    #[error("Invalid header: {0}")]
    InvalidHeader(String),

    /// The response body is not what was asked for.
    #[error("Body read error: {0}")]
    BodyRead(String),

    /// JSON serialization or deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
