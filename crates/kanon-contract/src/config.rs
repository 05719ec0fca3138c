//! Configuration for validation behavior.

use serde::{Deserialize, Serialize};

/// Options for the request validator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationOptions {
    /// Collect every failure into one `Multi` error instead of returning the
    /// first one bare.
    pub multi_error: bool,
}

impl Default for ValidationOptions {
    fn default() -> Self {
        Self { multi_error: true }
    }
}

impl ValidationOptions {
    /// Stop at the first failure.
    pub fn first_error() -> Self {
        Self { multi_error: false }
    }
}

/// Pipeline policy for one validator instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ValidationConfig {
    /// Validate responses after the handler runs. Failures are only logged.
    pub validate_responses: bool,
    /// Answer 400 with a generic message when a request fails validation but
    /// no failure can be described. When `false` such requests reach the
    /// handler.
    pub reject_unexplained_failures: bool,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self::request_only()
    }
}

impl ValidationConfig {
    /// Validate requests only.
    pub fn request_only() -> Self {
        Self {
            validate_responses: false,
            reject_unexplained_failures: false,
        }
    }

    /// Validate requests and responses.
    pub fn with_responses() -> Self {
        Self {
            validate_responses: true,
            ..Self::request_only()
        }
    }

    /// Validate everything and never let an undescribed failure through.
    pub fn strict() -> Self {
        Self {
            validate_responses: true,
            reject_unexplained_failures: true,
        }
    }
}
