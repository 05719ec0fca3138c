//! Core middleware trait and types.
//!
//! This module defines the [`Middleware`] trait that all stages implement.
//! Middleware processes requests before they reach handlers and responses after
//! handlers complete.
//!
//! # Example
//!
//! ```ignore
//! use kanon_middleware::{Middleware, Next, Request, Response, BoxFuture};
//! use kanon_middleware::context::MiddlewareContext;
//!
//! struct LoggingMiddleware;
//!
//! impl Middleware for LoggingMiddleware {
//!     fn name(&self) -> &'static str {
//!         "logging"
//!     }
//!
//!     fn process<'a>(
//!         &'a self,
//!         ctx: &'a mut MiddlewareContext,
//!         request: Request,
//!         next: Next<'a>,
//!     ) -> BoxFuture<'a, Response> {
//!         Box::pin(async move {
//!             tracing::info!(request_id = %ctx.request_id(), "request");
//!             let response = next.run(ctx, request).await;
//!             tracing::info!(status = %response.status(), "response");
//!             response
//!         })
//!     }
//! }
//! ```

use crate::context::MiddlewareContext;
use crate::types::{Request, Response};
use std::future::Future;
use std::pin::Pin;

/// A boxed future that returns a response.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// The terminal handler of a pipeline run.
pub type Handler<'a> =
    Box<dyn FnOnce(&mut MiddlewareContext, Request) -> BoxFuture<'static, Response> + Send + 'a>;

/// The core middleware trait.
///
/// Middleware receives a mutable context, the incoming request, and a
/// [`Next`] callback to invoke the rest of the chain.
///
/// # Invariants
///
/// - Middleware MUST call `next.run()` at most once
/// - Not calling it short-circuits the pipeline with the stage's own response
pub trait Middleware: Send + Sync + 'static {
    /// Returns the unique name of this middleware stage.
    fn name(&self) -> &'static str;

    /// Process the request through this middleware.
    fn process<'a>(
        &'a self,
        ctx: &'a mut MiddlewareContext,
        request: Request,
        next: Next<'a>,
    ) -> BoxFuture<'a, Response>;
}

/// Callback to invoke the next middleware in the chain.
///
/// Consumed on use, so the rest of the chain runs at most once.
pub struct Next<'a> {
    inner: NextInner<'a>,
}

enum NextInner<'a> {
    /// More middleware to process
    Chain {
        middleware: &'a dyn Middleware,
        next: Box<Next<'a>>,
    },
    /// End of chain
    Handler(Handler<'a>),
}

impl<'a> Next<'a> {
    /// Creates a `Next` that will invoke the given middleware.
    pub(crate) fn new(middleware: &'a dyn Middleware, next: Next<'a>) -> Self {
        Self {
            inner: NextInner::Chain {
                middleware,
                next: Box::new(next),
            },
        }
    }

    /// Creates a terminal `Next` that invokes the handler.
    pub fn handler<F>(f: F) -> Self
    where
        F: FnOnce(&mut MiddlewareContext, Request) -> BoxFuture<'static, Response> + Send + 'a,
    {
        Self {
            inner: NextInner::Handler(Box::new(f)),
        }
    }

    /// Invokes the next middleware or handler in the chain.
    pub async fn run(self, ctx: &mut MiddlewareContext, request: Request) -> Response {
        match self.inner {
            NextInner::Chain { middleware, next } => {
                middleware.process(ctx, request, *next).await
            }
            NextInner::Handler(handler) => handler(ctx, request).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ResponseExt, Response};
    use bytes::Bytes;
    use http::{Request as HttpRequest, StatusCode};
    use http_body_util::Full;

    struct TestMiddleware {
        name: &'static str,
    }

    impl Middleware for TestMiddleware {
        fn name(&self) -> &'static str {
            self.name
        }

        fn process<'a>(
            &'a self,
            ctx: &'a mut MiddlewareContext,
            request: Request,
            next: Next<'a>,
        ) -> BoxFuture<'a, Response> {
            Box::pin(async move {
                ctx.trace_log_mut().add_trace(&["visited", self.name]);
                next.run(ctx, request).await
            })
        }
    }

    fn create_test_request() -> Request {
        HttpRequest::builder()
            .uri("/test")
            .body(Full::new(Bytes::new()))
            .unwrap()
    }

    fn ok_handler<'a>() -> Next<'a> {
        Next::handler(|_ctx, _req| Box::pin(async { Response::text(StatusCode::OK, "OK") }))
    }

    #[test]
    fn test_middleware_name() {
        let mw = TestMiddleware { name: "test" };
        assert_eq!(mw.name(), "test");
    }

    #[tokio::test]
    async fn test_next_handler() {
        let mut ctx = MiddlewareContext::new();
        let response = ok_handler().run(&mut ctx, create_test_request()).await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_middleware_chain() {
        let mw1 = TestMiddleware { name: "first" };
        let mw2 = TestMiddleware { name: "second" };
        let mut ctx = MiddlewareContext::new();

        let next = Next::new(&mw1, Next::new(&mw2, ok_handler()));
        let response = next.run(&mut ctx, create_test_request()).await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(ctx.trace_log().trace(), ["visited_first", "visited_second"]);
    }
}
