//! Test client for in-memory HTTP testing.

use crate::error::TestError;
use crate::request::{TestRequest, TestRequestBuilder};
use crate::response::TestResponse;
use bytes::Bytes;
use http::{Method, StatusCode};
use kanon_contract::{Contract, ValidationConfig};
use kanon_middleware::stages::{OpenApiValidator, RequestIdMiddleware};
use kanon_middleware::{full, BoxFuture, MiddlewareContext, Pipeline, Request, Response};
use std::future::Future;
use std::sync::Arc;

/// Handler invoked at the end of the pipeline.
pub type TestHandler = Arc<dyn Fn(Request) -> BoxFuture<'static, Response> + Send + Sync>;

/// A client that sends requests through a [`Pipeline`] without a network.
///
/// # Example
///
/// ```ignore
/// use kanon_test::TestClient;
///
/// let client = TestClient::for_contract(contract, ValidationConfig::default(), |req| async move {
///     Response::text(StatusCode::OK, "ok")
/// });
///
/// client
///     .get("/books/seven")
///     .send()
///     .await
///     .assert_failure(StatusCode::BAD_REQUEST, "path-param:bookId invalid integer");
/// ```
#[must_use]
pub struct TestClient {
    pipeline: Pipeline,
    handler: TestHandler,
    default_headers: Vec<(String, String)>,
}

impl TestClient {
    /// Creates a client for `pipeline` in front of `handler`.
    pub fn new<F, Fut>(pipeline: Pipeline, handler: F) -> Self
    where
        F: Fn(Request) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Response> + Send + 'static,
    {
        Self {
            pipeline,
            handler: Arc::new(move |req| -> BoxFuture<'static, Response> { Box::pin(handler(req)) }),
            default_headers: Vec::new(),
        }
    }

    /// Creates a client with the standard stages: request ID, then contract
    /// validation with `config`.
    pub fn for_contract<F, Fut>(contract: Arc<Contract>, config: ValidationConfig, handler: F) -> Self
    where
        F: Fn(Request) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Response> + Send + 'static,
    {
        let pipeline = Pipeline::builder()
            .add_pre_handler_stage(RequestIdMiddleware::new())
            .add_pre_handler_stage(OpenApiValidator::from_config(contract, config))
            .build();
        Self::new(pipeline, handler)
    }

    /// Creates a client whose handler always returns `status` and `body`.
    pub fn fixed_response(pipeline: Pipeline, status: StatusCode, body: impl Into<Bytes>) -> Self {
        let body = body.into();
        Self::new(pipeline, move |_req| {
            let body = body.clone();
            async move {
                let mut response = Response::new(full(body));
                *response.status_mut() = status;
                response
            }
        })
    }

    /// Adds a header sent with every request.
    pub fn with_default_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.default_headers.push((name.into(), value.into()));
        self
    }

    /// Returns the pipeline.
    #[must_use]
    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    /// Starts a GET request.
    pub fn get(&self, uri: impl AsRef<str>) -> TestClientRequest<'_> {
        TestClientRequest::new(self, TestRequest::get(uri))
    }

    /// Starts a POST request.
    pub fn post(&self, uri: impl AsRef<str>) -> TestClientRequest<'_> {
        TestClientRequest::new(self, TestRequest::post(uri))
    }

    /// Starts a PUT request.
    pub fn put(&self, uri: impl AsRef<str>) -> TestClientRequest<'_> {
        TestClientRequest::new(self, TestRequest::put(uri))
    }

    /// Starts a PATCH request.
    pub fn patch(&self, uri: impl AsRef<str>) -> TestClientRequest<'_> {
        TestClientRequest::new(self, TestRequest::patch(uri))
    }

    /// Starts a DELETE request.
    pub fn delete(&self, uri: impl AsRef<str>) -> TestClientRequest<'_> {
        TestClientRequest::new(self, TestRequest::delete(uri))
    }

    /// Starts a request with any method.
    pub fn request(&self, method: Method, uri: impl AsRef<str>) -> TestClientRequest<'_> {
        TestClientRequest::new(self, TestRequestBuilder::new(method, uri))
    }

    /// Sends a built request, returning the response and the final context.
    pub async fn execute(&self, request: TestRequest) -> (TestResponse, MiddlewareContext) {
        let handler = Arc::clone(&self.handler);
        let mut ctx = MiddlewareContext::new();
        let response = self
            .pipeline
            .run(&mut ctx, request.into_http_request(), move |_ctx, req| handler(req))
            .await;
        (TestResponse::from_http(response).await, ctx)
    }
}

impl std::fmt::Debug for TestClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TestClient")
            .field("pipeline", &self.pipeline)
            .field("default_headers", &self.default_headers)
            .finish_non_exhaustive()
    }
}

/// A request builder bound to a test client.
#[must_use]
pub struct TestClientRequest<'a> {
    client: &'a TestClient,
    builder: TestRequestBuilder,
}

impl<'a> TestClientRequest<'a> {
    fn new(client: &'a TestClient, builder: TestRequestBuilder) -> Self {
        let builder = client
            .default_headers
            .iter()
            .fold(builder, |builder, (name, value)| builder.header(name, value));
        Self { client, builder }
    }

    /// Appends a header.
    pub fn header(mut self, name: impl AsRef<str>, value: impl AsRef<str>) -> Self {
        self.builder = self.builder.header(name, value);
        self
    }

    /// Sets the Content-Type header.
    pub fn content_type(mut self, content_type: impl AsRef<str>) -> Self {
        self.builder = self.builder.content_type(content_type);
        self
    }

    /// Adds a cookie.
    pub fn cookie(mut self, name: impl AsRef<str>, value: impl AsRef<str>) -> Self {
        self.builder = self.builder.cookie(name, value);
        self
    }

    /// Sets the raw body.
    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.builder = self.builder.body(body);
        self
    }

    /// Sets a JSON body.
    pub fn json<T: serde::Serialize>(mut self, value: &T) -> Self {
        self.builder = self.builder.json(value);
        self
    }

    /// Sends the request.
    ///
    /// # Panics
    ///
    /// Panics if the request could not be built; use
    /// [`try_send`](Self::try_send) to handle that case.
    pub async fn send(self) -> TestResponse {
        match self.try_send().await {
            Ok(response) => response,
            Err(e) => panic!("test request could not be built: {e}"),
        }
    }

    /// Sends the request.
    ///
    /// # Errors
    ///
    /// Returns `TestError` if the request could not be built.
    pub async fn try_send(self) -> Result<TestResponse, TestError> {
        let (response, _) = self.try_send_with_context().await?;
        Ok(response)
    }

    /// Sends the request and also returns the context it ran with, so
    /// pipeline state and the trace log can be inspected.
    ///
    /// # Errors
    ///
    /// Returns `TestError` if the request could not be built.
    pub async fn try_send_with_context(self) -> Result<(TestResponse, MiddlewareContext), TestError> {
        let request = self.builder.build()?;
        Ok(self.client.execute(request).await)
    }
}
