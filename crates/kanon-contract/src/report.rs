//! Reporting of validation events that never reach the client.

use std::fmt;

use tracing::{debug, error, warn};

/// Receives diagnostic validation events.
///
/// Passed explicitly to the components that need it, so tests can observe
/// what would otherwise only be logged.
pub trait ValidationReporter: Send + Sync + fmt::Debug {
    /// The request validator returned an error of an unexpected shape.
    fn contract_violation(&self, method: &str, path: &str, detail: &str);

    /// A response did not match its declared definition.
    fn response_invalid(&self, method: &str, path: &str, status: u16, detail: &str);

    /// The branches of a combinator error could not be recovered while
    /// flattening.
    fn recovery_failed(&self, keyword: &str, detail: &str);
}

/// Emits every event as a `tracing` event.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingReporter;

impl ValidationReporter for TracingReporter {
    fn contract_violation(&self, method: &str, path: &str, detail: &str) {
        error!(method, path, detail, "validator returned an unexpected error shape");
    }

    fn response_invalid(&self, method: &str, path: &str, status: u16, detail: &str) {
        warn!(method, path, status, detail, "response validation failed");
    }

    fn recovery_failed(&self, keyword: &str, detail: &str) {
        debug!(keyword, detail, "combinator branches could not be recovered");
    }
}
