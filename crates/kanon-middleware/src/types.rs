//! Common types used throughout the middleware pipeline.

use bytes::Bytes;
use http::header::{HeaderValue, CONTENT_TYPE};
use http::StatusCode;
use http_body_util::{BodyExt, Full};
use kanon_core::{FailureBody, KanonError};

/// The HTTP request type used in the middleware pipeline.
///
/// Request bodies arrive fully buffered.
pub type Request = http::Request<Full<Bytes>>;

/// A boxed HTTP body.
pub type BoxBody = http_body_util::combinators::BoxBody<Bytes, std::convert::Infallible>;

/// The HTTP response type used in the middleware pipeline.
///
/// The body is boxed so stages can decorate it.
pub type Response = http::Response<BoxBody>;

/// Boxes a complete body.
pub fn full(bytes: impl Into<Bytes>) -> BoxBody {
    Full::new(bytes.into()).boxed()
}

/// Extension trait for building responses.
pub trait ResponseExt {
    /// Creates a plain-text response.
    fn text(status: StatusCode, body: &str) -> Response;

    /// Creates a `{"success": false, "message": ...}` response.
    fn failure(status: StatusCode, message: &str) -> Response;

    /// Creates the failure response for a Kanon error.
    fn from_error(error: &KanonError) -> Response;
}

impl ResponseExt for Response {
    fn text(status: StatusCode, body: &str) -> Response {
        let mut response = Response::new(full(body.to_string()));
        *response.status_mut() = status;
        response.headers_mut().insert(
            CONTENT_TYPE,
            HeaderValue::from_static("text/plain; charset=utf-8"),
        );
        response
    }

    fn failure(status: StatusCode, message: &str) -> Response {
        let body = serde_json::to_vec(&FailureBody::new(message)).unwrap_or_default();
        let mut response = Response::new(full(body));
        *response.status_mut() = status;
        response
            .headers_mut()
            .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        response
    }

    fn from_error(error: &KanonError) -> Response {
        Self::failure(error.status_code(), &error.client_message())
    }
}
