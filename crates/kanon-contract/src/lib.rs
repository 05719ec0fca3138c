//! # Kanon Contract
//!
//! OpenAPI contract loading, request and response validation, and error
//! flattening.
//!
//! # Overview
//!
//! A [`Contract`] is loaded once at startup and shared by every request:
//! - [`ContractLoader`] reads an OpenAPI 3.x document and builds the routes
//! - [`RouteIndex`] maps a method and path to a [`RouteDefinition`]
//! - [`OpenApiRequestValidator`] checks parameters and bodies
//! - [`Flattener`] turns the resulting error tree into client messages
//! - [`OpenApiResponseValidator`] checks captured responses
//!
//! # Architecture
//!
//! ```text
//!                      ┌────────────────────────────┐
//!                      │   contract.yaml / .json    │
//!                      └──────────┬─────────────────┘
//!                                 │ load
//!                      ┌──────────▼─────────────────┐
//!                      │   ContractLoader           │
//!                      └──────────┬─────────────────┘
//!                                 │ build
//!      HTTP Request    ┌──────────▼─────────────────┐
//!          │           │   RouteIndex               │
//!          ▼           │   (method + path → route)  │
//!     ┌────────────┐   └──────────┬─────────────────┘
//!     │ validator  │──────────────▼
//!     └─────┬──────┘   RouteDefinition + PathParams
//!           │ ValidationError
//!     ┌─────▼──────┐
//!     │ Flattener  │ → "body:age value must be an integer"
//!     └────────────┘
//! ```
//!
//! # Example
//!
//! ```ignore
//! use kanon_contract::{ContractLoader, RequestValidator};
//!
//! let contract = ContractLoader::from_file("contract.yaml").await?;
//!
//! let resolved = contract.resolve("GET", "/users/123")?;
//! assert_eq!(resolved.path_params.get("userId"), Some(&"123".to_string()));
//!
//! let validator = contract.request_validator();
//! validator.validate(&request, &resolved.route, &resolved.path_params)?;
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod compat;
pub mod config;
pub mod document;
pub mod error;
pub mod flatten;
pub mod loader;
pub mod report;
pub mod request;
pub mod resolver;
pub mod response;
pub mod route;

use std::sync::Arc;

use kanon_schema::{Components, FieldCause, MultiError, ValidationError};

// Re-exports for convenience
pub use config::{ValidationConfig, ValidationOptions};
pub use document::Info;
pub use error::{ContractError, ContractResult};
pub use flatten::{flatten, flatten_to_string, join_messages, Flattener};
pub use loader::{ContractLoader, DocumentFormat};
pub use report::{TracingReporter, ValidationReporter};
pub use request::{OpenApiRequestValidator, RequestValidator};
pub use resolver::{ResolvedRoute, RouteIndex};
pub use response::{CapturedResponse, OpenApiResponseValidator, ResponseError};
pub use route::{ParameterDefinition, PathParams, RequestBodyDefinition, ResponseDefinition, RouteDefinition};

/// A loaded contract.
///
/// Immutable once built. Share it through an `Arc`.
#[derive(Debug)]
pub struct Contract {
    info: Info,
    components: Arc<Components>,
    index: RouteIndex,
}

impl Contract {
    /// Builds a contract from resolved routes and the named schemas they
    /// refer to.
    pub fn new(
        info: Info,
        schemas: Components,
        routes: impl IntoIterator<Item = RouteDefinition>,
    ) -> ContractResult<Self> {
        let index = RouteIndex::new(routes.into_iter().map(Arc::new))?;
        Ok(Self {
            info,
            components: Arc::new(schemas),
            index,
        })
    }

    /// The contract title.
    pub fn title(&self) -> &str {
        &self.info.title
    }

    /// The contract version.
    pub fn version(&self) -> &str {
        &self.info.version
    }

    /// Number of routes.
    pub fn route_count(&self) -> usize {
        self.index.len()
    }

    /// Every route, in no particular order.
    pub fn routes(&self) -> impl Iterator<Item = &Arc<RouteDefinition>> {
        self.index.routes()
    }

    /// Named schemas under `components/schemas`.
    pub fn components(&self) -> &Arc<Components> {
        &self.components
    }

    /// Resolve a request to a route.
    pub fn resolve(&self, method: &str, path: &str) -> ContractResult<ResolvedRoute> {
        self.index.resolve(method, path)
    }

    /// Check if a route exists for the given method and path.
    pub fn has_route(&self, method: &str, path: &str) -> bool {
        self.index.has_route(method, path)
    }

    /// A request validator in multi-error mode.
    pub fn request_validator(&self) -> OpenApiRequestValidator {
        OpenApiRequestValidator::new(Arc::clone(&self.components))
    }

    /// A response validator.
    pub fn response_validator(&self) -> OpenApiResponseValidator {
        OpenApiResponseValidator::new(Arc::clone(&self.components))
    }
}

/// Wraps engine failures as a field cause, unwrapping a lone schema error.
pub(crate) fn schema_cause(errors: MultiError) -> FieldCause {
    let mut errors = errors.into_inner();
    if let [ValidationError::Schema(_)] = errors.as_slice() {
        if let Some(ValidationError::Schema(schema)) = errors.pop() {
            return FieldCause::Schema(schema);
        }
    }
    FieldCause::Multi(MultiError::from(errors))
}
