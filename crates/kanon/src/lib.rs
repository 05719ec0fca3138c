//! # Kanon
//!
//! **Contract-driven HTTP request and response validation**
//!
//! Kanon loads an OpenAPI 3 contract once and enforces it on every request:
//!
//! - Requests for routes the contract does not declare get a 404
//! - Parameters and bodies that break the contract get a 400 with a flat,
//!   field-qualified message such as `body:age value must be an integer`
//! - Responses can be captured and checked in the background without
//!   delaying the client
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use kanon::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ConfigLoader::new()
//!         .with_production()
//!         .with_optional_file("kanon.toml")?
//!         .with_env_prefix("KANON")
//!         .load()?;
//!
//!     let kanon = Kanon::from_config(config).await?;
//!     kanon.init_logging()?;
//!
//!     let pipeline = kanon.pipeline();
//!     // hand requests to `pipeline.handle(request, handler)`
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! Request → RequestId → OpenApiValidator ─┬─ 404 route not found
//!                                         ├─ 400 flattened message
//!                                         ├─ 500 validator contract violation
//!                                         └─ Handler → CaptureBody → Client
//!                                                           ↓ (after drop)
//!                                                  response validation (logged)
//! ```

#![doc(html_root_url = "https://docs.rs/kanon/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod app;

pub use app::{BootstrapError, Kanon};

// Re-export core types
pub use kanon_core as core;

// Re-export the schema engine
pub use kanon_schema as schema;

// Re-export contract loading and validation
pub use kanon_contract as contract;

// Re-export middleware types
pub use kanon_middleware as middleware;

// Re-export logging setup
pub use kanon_telemetry as telemetry;

// Re-export configuration
pub use kanon_config as config;

pub use kanon_config::{ConfigLoader, KanonConfig};

/// Prelude module for convenient imports.
///
/// # Example
///
/// ```rust,ignore
/// use kanon::prelude::*;
/// ```
pub mod prelude {
    pub use crate::{BootstrapError, Kanon};

    pub use kanon_core::{FailureBody, KanonError, KanonResult, RequestId};

    pub use kanon_contract::{
        Contract, ContractLoader, TracingReporter, ValidationConfig, ValidationReporter,
    };

    pub use kanon_config::{ConfigLoader, KanonConfig};

    pub use kanon_middleware::stages::{OpenApiValidator, PipelineState, RequestIdMiddleware};
    pub use kanon_middleware::{
        Middleware, MiddlewareContext, Pipeline, Request, Response, ResponseExt,
    };
}
