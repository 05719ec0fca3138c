//! Built-in pipeline stages.
//!
//! - [`request_id`]: assign the request ID and pick up trace headers
//! - [`openapi`]: validate requests and responses against the contract

pub mod openapi;
pub mod request_id;

pub use openapi::{OpenApiValidator, PipelineState};
pub use request_id::RequestIdMiddleware;
