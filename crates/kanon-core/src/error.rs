//! Error types for Kanon.
//!
//! This module provides the [`KanonError`] type, the taxonomy shared by every
//! crate in the workspace, together with the JSON failure body that is sent
//! to clients.
//!
//! | Kind | Code | Status |
//! |---|---|---|
//! | `RouteNotFound` | `ERR_OPENAPI_1001` | 404 |
//! | `ValidatorContractViolation` | `ERR_OPENAPI_1002` | 500 |
//! | `ValidationFailed` | `ERR_OPENAPI_1003` | 400 |
//! | `LoadContract` | `ERR_OPENAPI_1004` | startup |
//! | `CreateRouter` | `ERR_OPENAPI_1005` | startup |
//! | `ResponseValidationFailed` | `ERR_OPENAPI_1006` | logged only |

use http::StatusCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias using [`KanonError`].
pub type KanonResult<T> = Result<T, KanonError>;

/// Stable, machine-readable error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorCode {
    /// The request path/method does not match any contract route.
    #[serde(rename = "ERR_OPENAPI_1001")]
    RouteNotFound,
    /// The validator returned an error shape the pipeline does not understand.
    #[serde(rename = "ERR_OPENAPI_1002")]
    ValidatorContractViolation,
    /// Request validation failed.
    #[serde(rename = "ERR_OPENAPI_1003")]
    ValidationFailed,
    /// The contract document could not be loaded.
    #[serde(rename = "ERR_OPENAPI_1004")]
    LoadContract,
    /// The route index could not be built from the contract.
    #[serde(rename = "ERR_OPENAPI_1005")]
    CreateRouter,
    /// The response did not match the contract.
    #[serde(rename = "ERR_OPENAPI_1006")]
    ResponseValidationFailed,
}

impl ErrorCode {
    /// Returns the code as it appears in logs.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::RouteNotFound => "ERR_OPENAPI_1001",
            Self::ValidatorContractViolation => "ERR_OPENAPI_1002",
            Self::ValidationFailed => "ERR_OPENAPI_1003",
            Self::LoadContract => "ERR_OPENAPI_1004",
            Self::CreateRouter => "ERR_OPENAPI_1005",
            Self::ResponseValidationFailed => "ERR_OPENAPI_1006",
        }
    }

    /// Returns the default message for this code.
    #[must_use]
    pub const fn default_message(&self) -> &'static str {
        match self {
            Self::RouteNotFound => "route not found",
            Self::ValidatorContractViolation => {
                "validation error is not of the expected multi error type"
            }
            Self::ValidationFailed => "openapi request validation failed",
            Self::LoadContract => "failed to load open api specification",
            Self::CreateRouter => "failed to create router for open api validation",
            Self::ResponseValidationFailed => "openapi response validation failed",
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Standard error type for Kanon.
///
/// Client-facing kinds map to an HTTP status through [`KanonError::status_code`].
/// Startup kinds (`LoadContract`, `CreateRouter`) and `ResponseValidationFailed`
/// are never sent to a client.
///
/// # Example
///
/// ```
/// use kanon_core::{KanonError, ErrorCode};
/// use http::StatusCode;
///
/// let err = KanonError::validation_failed("query-param:page invalid integer");
/// assert_eq!(err.code(), ErrorCode::ValidationFailed);
/// assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
/// ```
#[derive(Error, Debug)]
pub enum KanonError {
    /// No contract route matches the request.
    #[error("route not found: {method} {path}")]
    RouteNotFound {
        /// HTTP method of the request.
        method: String,
        /// Request path.
        path: String,
    },

    /// Request validation failed; `message` is the flattened, client-facing text.
    #[error("{message}")]
    ValidationFailed {
        /// Flattened validation message.
        message: String,
    },

    /// The validator broke its contract with the pipeline.
    #[error("validator contract violation: {detail}")]
    ValidatorContractViolation {
        /// Internal detail, logged but never sent to clients.
        detail: String,
    },

    /// The response did not match the contract.
    #[error("response validation failed: {detail}")]
    ResponseValidationFailed {
        /// Description of the mismatch.
        detail: String,
    },

    /// The contract document could not be read or parsed.
    #[error("failed to load contract: {message}")]
    LoadContract {
        /// Human-readable error message.
        message: String,
    },

    /// The route index could not be built.
    #[error("failed to create router: {message}")]
    CreateRouter {
        /// Human-readable error message.
        message: String,
    },
}

impl KanonError {
    /// Creates a route-not-found error.
    #[must_use]
    pub fn route_not_found(method: impl Into<String>, path: impl Into<String>) -> Self {
        Self::RouteNotFound {
            method: method.into(),
            path: path.into(),
        }
    }

    /// Creates a validation failure carrying the flattened message.
    #[must_use]
    pub fn validation_failed(message: impl Into<String>) -> Self {
        Self::ValidationFailed {
            message: message.into(),
        }
    }

    /// Creates a validator contract violation.
    #[must_use]
    pub fn contract_violation(detail: impl Into<String>) -> Self {
        Self::ValidatorContractViolation {
            detail: detail.into(),
        }
    }

    /// Creates a response validation failure.
    #[must_use]
    pub fn response_validation_failed(detail: impl Into<String>) -> Self {
        Self::ResponseValidationFailed {
            detail: detail.into(),
        }
    }

    /// Creates a contract load error.
    #[must_use]
    pub fn load_contract(message: impl Into<String>) -> Self {
        Self::LoadContract {
            message: message.into(),
        }
    }

    /// Creates a router construction error.
    #[must_use]
    pub fn create_router(message: impl Into<String>) -> Self {
        Self::CreateRouter {
            message: message.into(),
        }
    }

    /// Returns the stable error code.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::RouteNotFound { .. } => ErrorCode::RouteNotFound,
            Self::ValidationFailed { .. } => ErrorCode::ValidationFailed,
            Self::ValidatorContractViolation { .. } => ErrorCode::ValidatorContractViolation,
            Self::ResponseValidationFailed { .. } => ErrorCode::ResponseValidationFailed,
            Self::LoadContract { .. } => ErrorCode::LoadContract,
            Self::CreateRouter { .. } => ErrorCode::CreateRouter,
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::RouteNotFound { .. } => StatusCode::NOT_FOUND,
            Self::ValidationFailed { .. } => StatusCode::BAD_REQUEST,
            Self::ValidatorContractViolation { .. }
            | Self::ResponseValidationFailed { .. }
            | Self::LoadContract { .. }
            | Self::CreateRouter { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Returns the message that is safe to show to a client.
    ///
    /// Only `ValidationFailed` exposes its own text; every other kind falls
    /// back to the code's default message so internal detail never leaks.
    #[must_use]
    pub fn client_message(&self) -> String {
        match self {
            Self::ValidationFailed { message } => message.clone(),
            other => other.code().default_message().to_string(),
        }
    }

    /// Converts this error to the JSON failure body sent to clients.
    #[must_use]
    pub fn to_failure_body(&self) -> FailureBody {
        FailureBody::new(self.client_message())
    }
}

/// Serializable failure body: `{"success": false, "message": "..."}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureBody {
    /// Always `false`.
    pub success: bool,
    /// Human-readable message.
    pub message: String,
}

impl FailureBody {
    /// Creates a failure body with the given message.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
        }
    }
}
