//! # Kanon Core
//!
//! Core types shared by every Kanon crate.
//!
//! - [`RequestId`] - Request identifier, taken from `X-Request-ID` or generated
//! - [`TraceContext`] - W3C trace headers seen on the request
//! - [`TraceLog`] - Per-request diagnostic sink
//! - [`KanonError`] - Error taxonomy with stable codes and HTTP statuses
//! - [`FailureBody`] - The `{"success": false, "message": ...}` client body

#![doc(html_root_url = "https://docs.rs/kanon-core/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod context;
mod error;

pub use context::{
    RequestId, TraceContext, TraceLog, REQUEST_ID_HEADER, TRACEPARENT_HEADER, TRACESTATE_HEADER,
};
pub use error::{ErrorCode, FailureBody, KanonError, KanonResult};
