//! Middleware pipeline.
//!
//! A [`Pipeline`] is an ordered list of stages built once and shared by every
//! request. Stages run in insertion order, followed by the handler. Each
//! stage sees the response on the way back out in reverse order.
//!
//! ```text
//! Request → RequestId → OpenApiValidator → Handler
//!                                            ↓
//! Response ← RequestId ← OpenApiValidator ←──┘
//! ```

use crate::context::MiddlewareContext;
use crate::middleware::{BoxFuture, Middleware, Next};
use crate::types::{Request, Response};
use std::sync::Arc;

/// A type-erased middleware that can be stored in a vector.
pub type BoxedMiddleware = Arc<dyn Middleware>;

/// An immutable middleware pipeline.
///
/// # Example
///
/// ```ignore
/// use kanon_middleware::pipeline::Pipeline;
/// use kanon_middleware::stages::{OpenApiValidator, RequestIdMiddleware};
///
/// let pipeline = Pipeline::builder()
///     .add_pre_handler_stage(RequestIdMiddleware::new())
///     .add_pre_handler_stage(OpenApiValidator::new(contract))
///     .build();
///
/// let response = pipeline.handle(request, handler).await;
/// ```
#[derive(Clone)]
pub struct Pipeline {
    pre_handler_stages: Vec<BoxedMiddleware>,
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("stages", &self.stage_names())
            .finish()
    }
}

impl Pipeline {
    /// Creates a new pipeline builder.
    #[must_use]
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::new()
    }

    /// Runs a request through every stage and then `handler`.
    pub async fn process<H>(
        &self,
        mut ctx: MiddlewareContext,
        request: Request,
        handler: H,
    ) -> Response
    where
        H: FnOnce(&mut MiddlewareContext, Request) -> BoxFuture<'static, Response> + Send + 'static,
    {
        self.run(&mut ctx, request, handler).await
    }

    /// Like [`process`](Self::process), leaving the context with the caller
    /// so stage state can be inspected afterwards.
    pub async fn run<H>(&self, ctx: &mut MiddlewareContext, request: Request, handler: H) -> Response
    where
        H: FnOnce(&mut MiddlewareContext, Request) -> BoxFuture<'static, Response> + Send + 'static,
    {
        self.build_chain(handler).run(ctx, request).await
    }

    /// Runs a request with a fresh context.
    pub async fn handle<H>(&self, request: Request, handler: H) -> Response
    where
        H: FnOnce(&mut MiddlewareContext, Request) -> BoxFuture<'static, Response> + Send + 'static,
    {
        self.process(MiddlewareContext::new(), request, handler).await
    }

    fn build_chain<'a, H>(&'a self, handler: H) -> Next<'a>
    where
        H: FnOnce(&mut MiddlewareContext, Request) -> BoxFuture<'static, Response> + Send + 'a,
    {
        let mut next = Next::handler(handler);

        for middleware in self.pre_handler_stages.iter().rev() {
            next = Next::new(middleware.as_ref(), next);
        }

        next
    }

    /// Returns the names of all middleware stages in order.
    #[must_use]
    pub fn stage_names(&self) -> Vec<&'static str> {
        self.pre_handler_stages
            .iter()
            .map(|mw| mw.name())
            .collect()
    }

    /// Returns the number of middleware stages.
    #[must_use]
    pub fn stage_count(&self) -> usize {
        self.pre_handler_stages.len()
    }
}

/// Builder for constructing a [`Pipeline`].
#[derive(Default)]
pub struct PipelineBuilder {
    pre_handler_stages: Vec<BoxedMiddleware>,
}

impl PipelineBuilder {
    /// Creates an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a stage that runs before the handler.
    #[must_use]
    pub fn add_pre_handler_stage<M: Middleware>(mut self, middleware: M) -> Self {
        self.pre_handler_stages.push(Arc::new(middleware));
        self
    }

    /// Builds the pipeline.
    #[must_use]
    pub fn build(self) -> Pipeline {
        Pipeline {
            pre_handler_stages: self.pre_handler_stages,
        }
    }
}
