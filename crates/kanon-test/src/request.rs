//! Test request building.

use crate::error::TestError;
use bytes::Bytes;
use http::{header, HeaderMap, HeaderName, HeaderValue, Method, Uri};
use http_body_util::Full;
use kanon_middleware::Request;
use serde::Serialize;

/// A fully built test request.
#[derive(Debug, Clone)]
pub struct TestRequest {
    /// HTTP method.
    pub method: Method,
    /// Request URI, path and query.
    pub uri: Uri,
    /// Request headers.
    pub headers: HeaderMap,
    /// Request body.
    pub body: Bytes,
}

impl TestRequest {
    /// Starts a GET request.
    pub fn get(uri: impl AsRef<str>) -> TestRequestBuilder {
        TestRequestBuilder::new(Method::GET, uri)
    }

    /// Starts a POST request.
    pub fn post(uri: impl AsRef<str>) -> TestRequestBuilder {
        TestRequestBuilder::new(Method::POST, uri)
    }

    /// Starts a PUT request.
    pub fn put(uri: impl AsRef<str>) -> TestRequestBuilder {
        TestRequestBuilder::new(Method::PUT, uri)
    }

    /// Starts a PATCH request.
    pub fn patch(uri: impl AsRef<str>) -> TestRequestBuilder {
        TestRequestBuilder::new(Method::PATCH, uri)
    }

    /// Starts a DELETE request.
    pub fn delete(uri: impl AsRef<str>) -> TestRequestBuilder {
        TestRequestBuilder::new(Method::DELETE, uri)
    }

    /// Converts into the pipeline's request type.
    pub fn into_http_request(self) -> Request {
        let mut request = Request::new(Full::new(self.body));
        *request.method_mut() = self.method;
        *request.uri_mut() = self.uri;
        *request.headers_mut() = self.headers;
        request
    }
}

/// Builder for [`TestRequest`].
///
/// Invalid input is remembered and reported by [`build`](Self::build).
#[must_use]
#[derive(Debug)]
pub struct TestRequestBuilder {
    method: Method,
    uri: String,
    headers: HeaderMap,
    body: Option<Bytes>,
    error: Option<TestError>,
}

impl TestRequestBuilder {
    /// Starts a request with any method.
    pub fn new(method: Method, uri: impl AsRef<str>) -> Self {
        Self {
            method,
            uri: uri.as_ref().to_string(),
            headers: HeaderMap::new(),
            body: None,
            error: None,
        }
    }

    /// Appends a header. Repeated names keep every value.
    pub fn header(mut self, name: impl AsRef<str>, value: impl AsRef<str>) -> Self {
        if self.error.is_some() {
            return self;
        }
        let name = name.as_ref();
        match (
            HeaderName::try_from(name),
            HeaderValue::try_from(value.as_ref()),
        ) {
            (Ok(name), Ok(value)) => {
                self.headers.append(name, value);
            }
            (Err(e), _) => self.error = Some(TestError::InvalidHeader(format!("{name}: {e}"))),
            (_, Err(e)) => self.error = Some(TestError::InvalidHeader(format!("{name}: {e}"))),
        }
        self
    }

    /// Sets the Content-Type header.
    pub fn content_type(mut self, content_type: impl AsRef<str>) -> Self {
        self.headers.remove(header::CONTENT_TYPE);
        self.header(header::CONTENT_TYPE.as_str(), content_type)
    }

    /// Adds a cookie to the Cookie header.
    pub fn cookie(self, name: impl AsRef<str>, value: impl AsRef<str>) -> Self {
        self.header(
            header::COOKIE.as_str(),
            format!("{}={}", name.as_ref(), value.as_ref()),
        )
    }

    /// Sets the raw request body.
    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Sets a JSON body and the matching content type.
    pub fn json<T: Serialize>(mut self, value: &T) -> Self {
        match serde_json::to_vec(value) {
            Ok(bytes) => self.body = Some(Bytes::from(bytes)),
            Err(e) => {
                self.error.get_or_insert(TestError::Json(e));
            }
        }
        self.content_type("application/json")
    }

    /// Builds the request.
    ///
    /// # Errors
    ///
    /// Returns the first invalid header or body, or an invalid URI.
    pub fn build(self) -> Result<TestRequest, TestError> {
        if let Some(error) = self.error {
            return Err(error);
        }

        let uri: Uri = self
            .uri
            .parse()
            .map_err(|e| TestError::RequestBuild(format!("Invalid URI: {e}")))?;

        Ok(TestRequest {
            method: self.method,
            uri,
            headers: self.headers,
            body: self.body.unwrap_or_default(),
        })
    }
}
