//! Middleware context types.
//!
//! The [`MiddlewareContext`] carries per-request state through the pipeline:
//! the request ID, the incoming trace headers, the trace log that diagnostic
//! stages write to, and typed extensions.

use kanon_core::{RequestId, TraceContext, TraceLog};
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::time::Instant;

/// Context that flows through the middleware pipeline.
///
/// Owned by exactly one request; nothing in it is shared.
///
/// # Example
///
/// ```
/// use kanon_middleware::context::MiddlewareContext;
///
/// let mut ctx = MiddlewareContext::new();
/// ctx.trace_log_mut().add_error("could not read combinator branches");
///
/// assert_eq!(ctx.trace_log().errors().len(), 1);
/// ```
#[derive(Debug)]
pub struct MiddlewareContext {
    /// Unique identifier for this request.
    request_id: RequestId,

    /// `traceparent` / `tracestate` as received.
    trace: TraceContext,

    /// Diagnostic entries recorded while handling the request.
    trace_log: TraceLog,

    /// Label of the matched route.
    route: Option<String>,

    /// When the request started processing.
    started_at: Instant,

    /// Type-erased extension data.
    extensions: HashMap<TypeId, Box<dyn Any + Send + Sync>>,
}

impl MiddlewareContext {
    /// Creates a new middleware context with a fresh request ID.
    #[must_use]
    pub fn new() -> Self {
        Self::with_request_id(RequestId::new())
    }

    /// Creates a context with a specific request ID.
    #[must_use]
    pub fn with_request_id(request_id: RequestId) -> Self {
        Self {
            request_id,
            trace: TraceContext::default(),
            trace_log: TraceLog::new(),
            route: None,
            started_at: Instant::now(),
            extensions: HashMap::new(),
        }
    }

    /// Returns the request ID.
    #[must_use]
    pub fn request_id(&self) -> &RequestId {
        &self.request_id
    }

    /// Sets the request ID.
    pub fn set_request_id(&mut self, request_id: RequestId) {
        self.request_id = request_id;
    }

    /// Returns the trace context.
    #[must_use]
    pub fn trace(&self) -> &TraceContext {
        &self.trace
    }

    /// Sets the trace context.
    pub fn set_trace(&mut self, trace: TraceContext) {
        self.trace = trace;
    }

    /// Returns the trace log.
    #[must_use]
    pub fn trace_log(&self) -> &TraceLog {
        &self.trace_log
    }

    /// Returns the trace log for writing.
    pub fn trace_log_mut(&mut self) -> &mut TraceLog {
        &mut self.trace_log
    }

    /// Returns the matched route label, if resolved.
    #[must_use]
    pub fn route(&self) -> Option<&str> {
        self.route.as_deref()
    }

    /// Records the matched route label.
    pub fn set_route(&mut self, route: impl Into<String>) {
        self.route = Some(route.into());
    }

    /// Returns the elapsed time since the request started.
    #[must_use]
    pub fn elapsed(&self) -> std::time::Duration {
        self.started_at.elapsed()
    }

    /// Stores a typed extension value, replacing any previous one.
    pub fn set_extension<T: Send + Sync + 'static>(&mut self, value: T) {
        self.extensions.insert(TypeId::of::<T>(), Box::new(value));
    }

    /// Retrieves a typed extension value.
    #[must_use]
    pub fn get_extension<T: Send + Sync + 'static>(&self) -> Option<&T> {
        self.extensions
            .get(&TypeId::of::<T>())
            .and_then(|v| v.downcast_ref())
    }

    /// Removes and returns a typed extension value.
    pub fn remove_extension<T: Send + Sync + 'static>(&mut self) -> Option<T> {
        self.extensions
            .remove(&TypeId::of::<T>())
            .and_then(|v| v.downcast().ok())
            .map(|b| *b)
    }

    /// Checks if an extension of the given type exists.
    #[must_use]
    pub fn has_extension<T: Send + Sync + 'static>(&self) -> bool {
        self.extensions.contains_key(&TypeId::of::<T>())
    }
}

impl Default for MiddlewareContext {
    fn default() -> Self {
        Self::new()
    }
}
