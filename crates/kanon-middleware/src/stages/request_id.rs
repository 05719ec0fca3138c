//! Request ID and trace header middleware.
//!
//! Every request gets an ID: the caller's `X-Request-ID` when one is sent,
//! otherwise a fresh UUID v7. The ID is echoed on the response. The W3C
//! `traceparent` / `tracestate` headers are copied into the context as they
//! are, so later stages can log the combined trace ID.

use crate::context::MiddlewareContext;
use crate::middleware::{BoxFuture, Middleware, Next};
use crate::types::{Request, Response};
use http::HeaderValue;
use kanon_core::{RequestId, TraceContext, REQUEST_ID_HEADER, TRACEPARENT_HEADER, TRACESTATE_HEADER};
use tracing::debug;

/// Middleware that assigns request IDs and extracts trace headers.
///
/// # Example
///
/// ```ignore
/// use kanon_middleware::stages::RequestIdMiddleware;
///
/// let pipeline = Pipeline::builder()
///     .add_pre_handler_stage(RequestIdMiddleware::new())
///     .build();
/// ```
#[derive(Debug, Clone)]
pub struct RequestIdMiddleware {
    /// Whether to honour incoming `X-Request-ID` headers.
    trust_incoming: bool,
}

impl Default for RequestIdMiddleware {
    fn default() -> Self {
        Self {
            trust_incoming: true,
        }
    }
}

impl RequestIdMiddleware {
    /// Creates a middleware that honours incoming request IDs.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a middleware that always generates a fresh ID.
    #[must_use]
    pub fn always_generate() -> Self {
        Self {
            trust_incoming: false,
        }
    }

    fn extract_request_id(&self, request: &Request) -> RequestId {
        if !self.trust_incoming {
            return RequestId::new();
        }
        request
            .headers()
            .get(REQUEST_ID_HEADER)
            .and_then(|value| value.to_str().ok())
            .map_or_else(RequestId::new, RequestId::from_header)
    }
}

fn header_string(request: &Request, name: &str) -> Option<String> {
    request
        .headers()
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string)
}

impl Middleware for RequestIdMiddleware {
    fn name(&self) -> &'static str {
        "request_id"
    }

    fn process<'a>(
        &'a self,
        ctx: &'a mut MiddlewareContext,
        request: Request,
        next: Next<'a>,
    ) -> BoxFuture<'a, Response> {
        Box::pin(async move {
            let request_id = self.extract_request_id(&request);
            let trace = TraceContext::new(
                header_string(&request, TRACEPARENT_HEADER),
                header_string(&request, TRACESTATE_HEADER),
            );
            debug!(
                request_id = %request_id,
                trace_id = trace.trace_id().as_deref().unwrap_or_default(),
                "request received"
            );

            ctx.set_request_id(request_id.clone());
            ctx.set_trace(trace);

            let mut response = next.run(ctx, request).await;

            if let Ok(value) = HeaderValue::from_str(request_id.as_str()) {
                response.headers_mut().insert(REQUEST_ID_HEADER, value);
            }

            response
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ResponseExt;
    use bytes::Bytes;
    use http::{Request as HttpRequest, StatusCode};
    use http_body_util::Full;

    fn create_test_request() -> Request {
        HttpRequest::builder()
            .uri("/test")
            .body(Full::new(Bytes::new()))
            .unwrap()
    }

    fn create_request_with_id(request_id: &str) -> Request {
        HttpRequest::builder()
            .uri("/test")
            .header(REQUEST_ID_HEADER, request_id)
            .body(Full::new(Bytes::new()))
            .unwrap()
    }

    fn create_handler<'a>() -> Next<'a> {
        Next::handler(|_ctx, _req| Box::pin(async { Response::text(StatusCode::OK, "OK") }))
    }

    fn header_id(response: &Response) -> &str {
        response
            .headers()
            .get(REQUEST_ID_HEADER)
            .unwrap()
            .to_str()
            .unwrap()
    }

    #[tokio::test]
    async fn test_generates_request_id_when_missing() {
        let middleware = RequestIdMiddleware::new();
        let mut ctx = MiddlewareContext::new();

        let response = middleware
            .process(&mut ctx, create_test_request(), create_handler())
            .await;

        let id = header_id(&response);
        assert_eq!(id.len(), 36);
        assert_eq!(ctx.request_id().as_str(), id);
    }

    #[tokio::test]
    async fn test_uses_incoming_id() {
        let middleware = RequestIdMiddleware::new();
        let mut ctx = MiddlewareContext::new();

        let response = middleware
            .process(&mut ctx, create_request_with_id("req-abc"), create_handler())
            .await;

        assert_eq!(header_id(&response), "req-abc");
        assert_eq!(ctx.request_id().as_str(), "req-abc");
    }

    #[tokio::test]
    async fn test_ignores_incoming_id_when_generating() {
        let middleware = RequestIdMiddleware::always_generate();
        let mut ctx = MiddlewareContext::new();

        let response = middleware
            .process(&mut ctx, create_request_with_id("req-abc"), create_handler())
            .await;

        assert_ne!(header_id(&response), "req-abc");
    }

    #[tokio::test]
    async fn test_extracts_trace_headers() {
        let middleware = RequestIdMiddleware::new();
        let mut ctx = MiddlewareContext::new();
        let request = HttpRequest::builder()
            .uri("/test")
            .header(TRACEPARENT_HEADER, "00-4bf92f-00f067-01")
            .header(TRACESTATE_HEADER, "vendor=1")
            .body(Full::new(Bytes::new()))
            .unwrap();

        middleware.process(&mut ctx, request, create_handler()).await;

        assert_eq!(ctx.trace().traceparent(), Some("00-4bf92f-00f067-01"));
        assert_eq!(
            ctx.trace().trace_id().as_deref(),
            Some("00-4bf92f-00f067-01:vendor=1")
        );
    }

    #[test]
    fn test_middleware_name() {
        assert_eq!(RequestIdMiddleware::new().name(), "request_id");
    }
}
