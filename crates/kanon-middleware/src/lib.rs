//! # Kanon Middleware
//!
//! The request pipeline that puts a contract in front of a handler.
//!
//! ```text
//! Request → RequestId → OpenApiValidator → Handler
//!                                            ↓
//! Response ← RequestId ← OpenApiValidator ←──┘
//!                               │
//!                               └─► CaptureBody ─► response check (spawned)
//! ```
//!
//! Stages implement [`Middleware`] and are composed into an immutable
//! [`Pipeline`]. The [`OpenApiValidator`](stages::OpenApiValidator) stage
//! resolves the route, validates the buffered request, turns failures into
//! `{"success": false, "message": ...}` responses, and optionally checks the
//! response once it has been delivered.
//!
//! ## Example
//!
//! ```ignore
//! use kanon_middleware::stages::{OpenApiValidator, RequestIdMiddleware};
//! use kanon_middleware::Pipeline;
//!
//! let pipeline = Pipeline::builder()
//!     .add_pre_handler_stage(RequestIdMiddleware::new())
//!     .add_pre_handler_stage(OpenApiValidator::with_response_validation(contract))
//!     .build();
//!
//! let response = pipeline.handle(request, |_ctx, req| Box::pin(handle(req))).await;
//! ```

#![doc(html_root_url = "https://docs.rs/kanon-middleware/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod capture;
pub mod context;
pub mod middleware;
pub mod pipeline;
pub mod stages;
pub mod types;

pub use capture::{capture, CaptureBody};
pub use context::MiddlewareContext;
pub use middleware::{BoxFuture, Handler, Middleware, Next};
pub use pipeline::{BoxedMiddleware, Pipeline, PipelineBuilder};
pub use stages::{OpenApiValidator, PipelineState, RequestIdMiddleware};
pub use types::{full, BoxBody, Request, Response, ResponseExt};
