//! Request-scoped identifiers and diagnostics.
//!
//! - [`RequestId`] identifies one inbound request. It is taken from the
//!   `X-Request-ID` header when present, else generated as a UUID v7.
//! - [`TraceContext`] carries the W3C `traceparent` / `tracestate` pair.
//! - [`TraceLog`] is the per-request diagnostic sink. Validation code writes
//!   non-fatal problems here instead of failing the request.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Header carrying the request identifier.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Header carrying the W3C trace parent.
pub const TRACEPARENT_HEADER: &str = "traceparent";

/// Header carrying the W3C trace state.
pub const TRACESTATE_HEADER: &str = "tracestate";

/// A unique identifier for each request.
///
/// Generated IDs use UUID v7, which is time-ordered and sorts well in logs.
/// IDs supplied by a caller are kept verbatim.
///
/// # Example
///
/// ```
/// use kanon_core::RequestId;
///
/// let id = RequestId::new();
/// assert_eq!(id.as_str().len(), 36);
///
/// let upstream = RequestId::from_header("req-42");
/// assert_eq!(upstream.as_str(), "req-42");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(String);

impl RequestId {
    /// Creates a new unique request ID using UUID v7.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7().to_string())
    }

    /// Uses a caller-supplied value, generating a fresh ID when it is blank.
    #[must_use]
    pub fn from_header(value: &str) -> Self {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            Self::new()
        } else {
            Self(trimmed.to_string())
        }
    }

    /// Returns the ID as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<Uuid> for RequestId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid.to_string())
    }
}

/// W3C trace headers seen on the inbound request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceContext {
    traceparent: Option<String>,
    tracestate: Option<String>,
}

impl TraceContext {
    /// Creates a trace context from the raw header values.
    #[must_use]
    pub fn new(traceparent: Option<String>, tracestate: Option<String>) -> Self {
        Self {
            traceparent: traceparent.filter(|v| !v.is_empty()),
            tracestate: tracestate.filter(|v| !v.is_empty()),
        }
    }

    /// Returns the `traceparent` header value, if any.
    #[must_use]
    pub fn traceparent(&self) -> Option<&str> {
        self.traceparent.as_deref()
    }

    /// Returns the `tracestate` header value, if any.
    #[must_use]
    pub fn tracestate(&self) -> Option<&str> {
        self.tracestate.as_deref()
    }

    /// Returns the combined trace id, `"<traceparent>:<tracestate>"`.
    ///
    /// Returns `None` when neither header was present.
    #[must_use]
    pub fn trace_id(&self) -> Option<String> {
        match (&self.traceparent, &self.tracestate) {
            (None, None) => None,
            (parent, state) => Some(format!(
                "{}:{}",
                parent.as_deref().unwrap_or_default(),
                state.as_deref().unwrap_or_default()
            )),
        }
    }
}

/// Per-request diagnostic log.
///
/// `trace` records breadcrumbs, `errors` records non-fatal failures. Neither
/// list is ever sent to the client.
///
/// # Example
///
/// ```
/// use kanon_core::TraceLog;
///
/// let mut log = TraceLog::new();
/// log.add_trace(&["flatten", "anyOf", "recovered"]);
/// log.add_error("could not read combinator branches");
///
/// assert_eq!(log.trace(), ["flatten_anyOf_recovered"]);
/// assert_eq!(log.errors().len(), 1);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceLog {
    trace: Vec<String>,
    errors: Vec<String>,
}

impl TraceLog {
    /// Creates an empty trace log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a trace entry made of `parts` joined with `_`.
    pub fn add_trace<S: AsRef<str>>(&mut self, parts: &[S]) {
        let entry = parts
            .iter()
            .map(AsRef::as_ref)
            .collect::<Vec<_>>()
            .join("_");
        self.trace.push(entry);
    }

    /// Appends an error entry.
    pub fn add_error(&mut self, message: impl Into<String>) {
        self.errors.push(message.into());
    }

    /// Returns the trace entries in insertion order.
    #[must_use]
    pub fn trace(&self) -> &[String] {
        &self.trace
    }

    /// Returns the error entries in insertion order.
    #[must_use]
    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    /// Returns `true` if nothing has been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.trace.is_empty() && self.errors.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_id_new_generates_unique_ids() {
        let id1 = RequestId::new();
        let id2 = RequestId::new();
        assert_ne!(id1, id2, "Each RequestId should be unique");
    }

    #[test]
    fn test_request_id_is_uuid_v7() {
        let id = RequestId::new();
        let parsed = Uuid::parse_str(id.as_str()).expect("generated id should be a uuid");
        assert_eq!(parsed.get_version_num(), 7);
    }

    #[test]
    fn test_request_id_from_header() {
        assert_eq!(RequestId::from_header(" abc ").as_str(), "abc");
        assert_eq!(RequestId::from_header("").as_str().len(), 36);
    }

    #[test]
    fn test_request_id_serialization() {
        let id = RequestId::from_header("req-1");
        let json = serde_json::to_string(&id).expect("serialization should work");
        assert_eq!(json, "\"req-1\"");
        let parsed: RequestId = serde_json::from_str(&json).expect("deserialization should work");
        assert_eq!(id, parsed);
    }

    #[test]
    fn test_trace_id_combines_headers() {
        let ctx = TraceContext::new(Some("00-abc-def-01".into()), Some("vendor=1".into()));
        assert_eq!(ctx.trace_id().as_deref(), Some("00-abc-def-01:vendor=1"));

        let parent_only = TraceContext::new(Some("00-abc-def-01".into()), None);
        assert_eq!(parent_only.trace_id().as_deref(), Some("00-abc-def-01:"));

        assert!(TraceContext::default().trace_id().is_none());
        assert!(TraceContext::new(Some(String::new()), None).trace_id().is_none());
    }

    #[test]
    fn test_trace_log_keeps_lists_apart() {
        let mut log = TraceLog::new();
        assert!(log.is_empty());

        log.add_trace(&["a", "b"]);
        log.add_trace(&["single"]);
        log.add_error("boom");

        assert_eq!(log.trace(), ["a_b", "single"]);
        assert_eq!(log.errors(), ["boom"]);
        assert!(!log.is_empty());
    }
}
