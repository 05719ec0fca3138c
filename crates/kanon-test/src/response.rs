//! Test response wrapper.

use crate::error::TestError;
use bytes::Bytes;
use http::{header, HeaderMap, HeaderValue, StatusCode};
use http_body_util::BodyExt;
use kanon_core::FailureBody;
use kanon_middleware::Response;
use serde::de::DeserializeOwned;
use std::fmt;

/// A response whose body has been read to the end.
pub struct TestResponse {
    status: StatusCode,
    headers: HeaderMap,
    body: Bytes,
}

impl TestResponse {
    /// Reads a pipeline response to the end.
    ///
    /// Dropping the consumed body completes any response capture attached
    /// to it.
    pub async fn from_http(response: Response) -> Self {
        let (parts, body) = response.into_parts();
        let body = match body.collect().await {
            Ok(collected) => collected.to_bytes(),
            Err(never) => match never {},
        };

        Self {
            status: parts.status,
            headers: parts.headers,
            body,
        }
    }

    /// Creates a response from its parts.
    pub fn new(status: StatusCode, headers: HeaderMap, body: Bytes) -> Self {
        Self {
            status,
            headers,
            body,
        }
    }

    /// Returns the status.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Returns the status as a number.
    #[must_use]
    pub fn status_code(&self) -> u16 {
        self.status.as_u16()
    }

    /// Returns the headers.
    #[must_use]
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Returns a header value.
    #[must_use]
    pub fn header(&self, name: impl AsRef<str>) -> Option<&HeaderValue> {
        self.headers.get(name.as_ref())
    }

    /// Returns a header value as a string, if it is valid ASCII.
    #[must_use]
    pub fn header_str(&self, name: impl AsRef<str>) -> Option<&str> {
        self.header(name).and_then(|v| v.to_str().ok())
    }

    /// Returns the Content-Type header.
    #[must_use]
    pub fn content_type(&self) -> Option<&str> {
        self.header_str(header::CONTENT_TYPE.as_str())
    }

    /// Returns the raw body.
    #[must_use]
    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Returns the body as UTF-8 text.
    pub fn text(&self) -> Result<String, TestError> {
        String::from_utf8(self.body.to_vec())
            .map_err(|e| TestError::BodyRead(format!("Invalid UTF-8: {e}")))
    }

    /// Deserializes the body as JSON.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, TestError> {
        Ok(serde_json::from_slice(&self.body)?)
    }

    /// Parses the body as a JSON value.
    pub fn json_value(&self) -> Result<serde_json::Value, TestError> {
        self.json()
    }

    /// Parses the body as a `{"success": false, "message": ...}` failure.
    pub fn failure(&self) -> Result<FailureBody, TestError> {
        self.json()
    }

    /// Asserts the status.
    pub fn assert_status(&self, expected: StatusCode) -> &Self {
        assert_eq!(
            self.status, expected,
            "Expected status {}, got {}: {}",
            expected,
            self.status,
            String::from_utf8_lossy(&self.body)
        );
        self
    }

    /// Asserts a header value.
    pub fn assert_header(&self, name: impl AsRef<str>, expected: impl AsRef<str>) -> &Self {
        let name = name.as_ref();
        let expected = expected.as_ref();
        let actual = self
            .header_str(name)
            .unwrap_or_else(|| panic!("Header '{name}' not found"));
        assert_eq!(actual, expected, "Header '{name}': expected '{expected}', got '{actual}'");
        self
    }

    /// Asserts the body text.
    pub fn assert_body_eq(&self, expected: impl AsRef<str>) -> &Self {
        let body = String::from_utf8_lossy(&self.body);
        assert_eq!(body, expected.as_ref(), "Body mismatch");
        self
    }

    /// Asserts the JSON body.
    pub fn assert_json_eq(&self, expected: &serde_json::Value) -> &Self {
        let actual = self
            .json_value()
            .unwrap_or_else(|e| panic!("Body should be valid JSON: {e}"));
        assert_eq!(&actual, expected, "JSON body mismatch");
        self
    }

    /// Asserts a failure response with the given status and message.
    pub fn assert_failure(&self, status: StatusCode, message: impl AsRef<str>) -> &Self {
        self.assert_status(status);
        let failure = self
            .failure()
            .unwrap_or_else(|e| panic!("Body should be a failure body: {e}"));
        assert!(!failure.success, "failure body must have success = false");
        assert_eq!(failure.message, message.as_ref(), "Failure message mismatch");
        self
    }
}

impl fmt::Debug for TestResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TestResponse")
            .field("status", &self.status)
            .field("headers", &self.headers)
            .field("body_len", &self.body.len())
            .finish()
    }
}
