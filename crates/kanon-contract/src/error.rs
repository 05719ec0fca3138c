//! Contract error types.

use std::path::PathBuf;

use kanon_core::KanonError;
use thiserror::Error;

/// Result type for contract operations.
pub type ContractResult<T> = Result<T, ContractError>;

/// Errors that can occur while loading or querying a contract.
#[derive(Debug, Error)]
pub enum ContractError {
    /// The contract file could not be read.
    #[error("failed to read contract {path}: {source}")]
    Io {
        /// File that was being read.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The contract document could not be parsed.
    #[error("failed to parse contract: {message}")]
    LoadSpec {
        /// Description of the problem.
        message: String,
    },

    /// The contract parsed but routes could not be built from it.
    #[error("failed to create router: {message}")]
    CreateRouter {
        /// Description of the problem.
        message: String,
    },

    /// No route matches the given method and path.
    #[error("no route found for {method} {path}")]
    RouteNotFound {
        /// HTTP method.
        method: String,
        /// Request path.
        path: String,
    },
}

impl ContractError {
    /// Creates a parse error.
    pub fn load_spec(message: impl Into<String>) -> Self {
        Self::LoadSpec {
            message: message.into(),
        }
    }

    /// Creates a router construction error.
    pub fn create_router(message: impl Into<String>) -> Self {
        Self::CreateRouter {
            message: message.into(),
        }
    }

    /// Creates a route-not-found error.
    pub fn route_not_found(method: impl Into<String>, path: impl Into<String>) -> Self {
        Self::RouteNotFound {
            method: method.into(),
            path: path.into(),
        }
    }
}

impl From<ContractError> for KanonError {
    fn from(err: ContractError) -> Self {
        match err {
            ContractError::Io { .. } | ContractError::LoadSpec { .. } => {
                Self::load_contract(err.to_string())
            }
            ContractError::CreateRouter { message } => Self::create_router(message),
            ContractError::RouteNotFound { method, path } => Self::route_not_found(method, path),
        }
    }
}
