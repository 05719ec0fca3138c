//! Contract validation stage.
//!
//! [`OpenApiValidator`] runs every request through the contract:
//!
//! ```text
//! RouteResolve ──no route──────────────────────────────► Error (404)
//!      │
//! RequestValidate ──unexpected error shape─────────────► Error (500)
//!      │          ──failure with a message─────────────► Error (400)
//!      │
//! HandlerExec ──response validation off──► Done
//!      │
//! ResponseValidate ──► Done
//! ```
//!
//! The state the request ended in is left in the context as a
//! [`PipelineState`] extension.
//!
//! Response validation never delays the client. The response body is wrapped
//! in a [`CaptureBody`](crate::capture::CaptureBody) and checked on a spawned
//! task once the transport has finished with it. Failures are only reported.

use std::sync::Arc;

use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use kanon_contract::{
    join_messages, Contract, Flattener, OpenApiResponseValidator, RequestValidator,
    ResolvedRoute, TracingReporter, ValidationConfig, ValidationReporter,
};
use kanon_core::KanonError;
use kanon_schema::ValidationError;
use tracing::{debug, trace};

use crate::capture::capture;
use crate::context::MiddlewareContext;
use crate::middleware::{BoxFuture, Middleware, Next};
use crate::types::{Request, Response, ResponseExt};

/// Message used when a failed request has nothing describable to report.
pub const UNEXPLAINED_FAILURE_MESSAGE: &str = "request validation failed";

/// Where a request's trip through [`OpenApiValidator`] ended, or currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PipelineState {
    /// Looking up the route.
    RouteResolve,
    /// Validating the request.
    RequestValidate,
    /// Running the handler.
    HandlerExec,
    /// Response validation has been scheduled.
    ResponseValidate,
    /// The handler ran.
    Done,
    /// The request was rejected.
    Error,
}

impl PipelineState {
    /// Returns the state name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::RouteResolve => "route_resolve",
            Self::RequestValidate => "request_validate",
            Self::HandlerExec => "handler_exec",
            Self::ResponseValidate => "response_validate",
            Self::Done => "done",
            Self::Error => "error",
        }
    }

    /// Returns `true` for `Done` and `Error`.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Error)
    }
}

/// Validates requests, and optionally responses, against a contract.
///
/// # Example
///
/// ```ignore
/// use kanon_middleware::stages::OpenApiValidator;
///
/// let contract = Arc::new(ContractLoader::from_file("contract.yaml").await?);
///
/// // Requests only
/// let validator = OpenApiValidator::new(Arc::clone(&contract));
///
/// // Requests and responses
/// let validator = OpenApiValidator::with_response_validation(contract);
/// ```
#[derive(Clone)]
pub struct OpenApiValidator {
    contract: Arc<Contract>,
    request_validator: Arc<dyn RequestValidator>,
    response_validator: Option<OpenApiResponseValidator>,
    reporter: Arc<dyn ValidationReporter>,
    config: ValidationConfig,
}

impl std::fmt::Debug for OpenApiValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenApiValidator")
            .field("contract", &self.contract.title())
            .field("config", &self.config)
            .field("reporter", &self.reporter)
            .finish_non_exhaustive()
    }
}

impl OpenApiValidator {
    /// Validates requests only.
    #[must_use]
    pub fn new(contract: Arc<Contract>) -> Self {
        Self::from_config(contract, ValidationConfig::request_only())
    }

    /// Validates requests and responses.
    #[must_use]
    pub fn with_response_validation(contract: Arc<Contract>) -> Self {
        Self::from_config(contract, ValidationConfig::with_responses())
    }

    /// Builds a validator with an explicit policy.
    #[must_use]
    pub fn from_config(contract: Arc<Contract>, config: ValidationConfig) -> Self {
        let request_validator = Arc::new(contract.request_validator());
        let response_validator = config
            .validate_responses
            .then(|| contract.response_validator());
        Self {
            contract,
            request_validator,
            response_validator,
            reporter: Arc::new(TracingReporter),
            config,
        }
    }

    /// Replaces the request validator.
    #[must_use]
    pub fn with_request_validator(mut self, validator: impl RequestValidator + 'static) -> Self {
        self.request_validator = Arc::new(validator);
        self
    }

    /// Replaces the reporter that receives diagnostic events.
    #[must_use]
    pub fn with_reporter(mut self, reporter: Arc<dyn ValidationReporter>) -> Self {
        self.reporter = reporter;
        self
    }

    /// Returns `true` if responses are validated.
    #[must_use]
    pub fn validates_responses(&self) -> bool {
        self.response_validator.is_some()
    }

    /// Validates a buffered request, returning the rejection to send if any.
    fn check_request(
        &self,
        ctx: &mut MiddlewareContext,
        request: &http::Request<Bytes>,
        resolved: &ResolvedRoute,
    ) -> Option<KanonError> {
        let error = match self
            .request_validator
            .validate(request, &resolved.route, &resolved.path_params)
        {
            Ok(()) => return None,
            Err(error) => error,
        };

        let ValidationError::Multi(_) = &error else {
            let detail = error.to_string();
            self.reporter.contract_violation(
                request.method().as_str(),
                request.uri().path(),
                &detail,
            );
            return Some(KanonError::contract_violation(detail));
        };

        let messages = Flattener::new(ctx.trace_log_mut(), self.reporter.as_ref()).flatten(&error);
        let message = join_messages(&messages);

        if !message.is_empty() {
            return Some(KanonError::validation_failed(message));
        }

        if self.config.reject_unexplained_failures {
            return Some(KanonError::validation_failed(UNEXPLAINED_FAILURE_MESSAGE));
        }

        debug!(
            request_id = %ctx.request_id(),
            route = ctx.route().unwrap_or_default(),
            "request failed validation without a describable message, continuing"
        );
        None
    }

    fn schedule_response_validation(
        &self,
        validator: &OpenApiResponseValidator,
        ctx: &MiddlewareContext,
        resolved: ResolvedRoute,
        method: http::Method,
        path: String,
        response: Response,
    ) -> Response {
        let (response, receiver) = capture(response);
        let validator = validator.clone();
        let reporter = Arc::clone(&self.reporter);
        let request_id = ctx.request_id().clone();

        tokio::spawn(async move {
            let Ok(captured) = receiver.await else {
                trace!(request_id = %request_id, "response not fully delivered, skipping validation");
                return;
            };
            match validator.validate(&captured, &resolved.route, &resolved.path_params) {
                Ok(()) => trace!(request_id = %request_id, "response matches contract"),
                Err(err) => reporter.response_invalid(
                    method.as_str(),
                    &path,
                    captured.status().as_u16(),
                    &err.to_string(),
                ),
            }
        });

        response
    }
}

fn reject(ctx: &mut MiddlewareContext, error: &KanonError) -> Response {
    debug!(
        request_id = %ctx.request_id(),
        code = %error.code(),
        status = error.status_code().as_u16(),
        "request rejected"
    );
    ctx.set_extension(PipelineState::Error);
    Response::from_error(error)
}

impl Middleware for OpenApiValidator {
    fn name(&self) -> &'static str {
        "openapi_validator"
    }

    fn process<'a>(
        &'a self,
        ctx: &'a mut MiddlewareContext,
        request: Request,
        next: Next<'a>,
    ) -> BoxFuture<'a, Response> {
        Box::pin(async move {
            ctx.set_extension(PipelineState::RouteResolve);
            let method = request.method().clone();
            let path = request.uri().path().to_string();

            let resolved = match self.contract.resolve(method.as_str(), &path) {
                Ok(resolved) => resolved,
                Err(err) => return reject(ctx, &KanonError::from(err)),
            };
            ctx.set_route(resolved.route.label());

            ctx.set_extension(PipelineState::RequestValidate);
            let (parts, body) = request.into_parts();
            let bytes = match body.collect().await {
                Ok(collected) => collected.to_bytes(),
                Err(never) => match never {},
            };
            let buffered = http::Request::from_parts(parts, bytes);

            if let Some(error) = self.check_request(ctx, &buffered, &resolved) {
                return reject(ctx, &error);
            }

            let (parts, bytes) = buffered.into_parts();
            let request = http::Request::from_parts(parts, Full::new(bytes));

            ctx.set_extension(PipelineState::HandlerExec);
            let response = next.run(ctx, request).await;

            let Some(validator) = &self.response_validator else {
                ctx.set_extension(PipelineState::Done);
                return response;
            };

            ctx.set_extension(PipelineState::ResponseValidate);
            let response =
                self.schedule_response_validation(validator, ctx, resolved, method, path, response);
            ctx.set_extension(PipelineState::Done);
            response
        })
    }
}
