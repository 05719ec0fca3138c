//! Response validation.
//!
//! Responses are checked after they have been delivered, so failures here are
//! only ever reported, never returned to the client.

use std::sync::Arc;

use bytes::Bytes;
use http::header::CONTENT_TYPE;
use http::{HeaderMap, StatusCode};
use kanon_schema::{Components, SchemaValidator, ValidationError};
use serde_json::Value;
use thiserror::Error;

use crate::route::{is_json_media_type, match_media_type, PathParams, RouteDefinition};

/// A response as it was sent to the client.
#[derive(Debug, Clone)]
pub struct CapturedResponse {
    status: StatusCode,
    headers: HeaderMap,
    body: Bytes,
}

impl CapturedResponse {
    /// Creates a captured response.
    pub fn new(status: StatusCode, headers: HeaderMap, body: Bytes) -> Self {
        Self {
            status,
            headers,
            body,
        }
    }

    /// Status code.
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Headers.
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Every body byte, in order.
    pub fn body(&self) -> &Bytes {
        &self.body
    }
}

/// A response that does not match its route's definition.
#[derive(Debug, Error)]
pub enum ResponseError {
    /// The route declares no response for this status.
    #[error("status code {status} is not declared for this operation")]
    StatusNotSupported {
        /// Observed status code.
        status: u16,
    },

    /// The media type is not declared for this status.
    #[error("response Content-Type {content_type:?} is not declared")]
    ContentType {
        /// Observed content type, empty when the header is missing.
        content_type: String,
    },

    /// The body could not be decoded.
    #[error("response body is invalid: {message}")]
    InvalidBody {
        /// Decoder message.
        message: String,
    },

    /// The body does not match its schema.
    #[error("response body doesn't match schema: {0}")]
    Body(ValidationError),
}

/// Validates captured responses against route definitions.
#[derive(Debug, Clone)]
pub struct OpenApiResponseValidator {
    components: Arc<Components>,
}

impl OpenApiResponseValidator {
    /// Creates a validator resolving schema references through `components`.
    pub fn new(components: Arc<Components>) -> Self {
        Self { components }
    }

    /// Validate `response` against `route`.
    ///
    /// Path parameters are accepted for symmetry with request validation;
    /// response definitions do not depend on them.
    pub fn validate(
        &self,
        response: &CapturedResponse,
        route: &RouteDefinition,
        _path_params: &PathParams,
    ) -> Result<(), ResponseError> {
        let status = response.status().as_u16();
        let definition = route
            .response_for(status)
            .ok_or(ResponseError::StatusNotSupported { status })?;

        if definition.content.is_empty() {
            return Ok(());
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default();

        if content_type.is_empty() && response.body().is_empty() {
            return Ok(());
        }

        let (media_type, schema) = match_media_type(&definition.content, content_type).ok_or_else(
            || ResponseError::ContentType {
                content_type: content_type.to_string(),
            },
        )?;

        let Some(schema) = schema else {
            return Ok(());
        };
        if !is_json_media_type(content_type) && !is_json_media_type(media_type) {
            return Ok(());
        }

        let value: Value =
            serde_json::from_slice(response.body()).map_err(|e| ResponseError::InvalidBody {
                message: e.to_string(),
            })?;

        SchemaValidator::new(&self.components)
            .validate(schema, &value)
            .map_err(|errors| ResponseError::Body(ValidationError::Multi(errors)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::{ContractLoader, DocumentFormat};
    use crate::Contract;
    use http::HeaderValue;

    const CONTRACT: &str = r#"
openapi: 3.0.3
info: {title: Users, version: "1"}
paths:
  /users/{id}:
    get:
      operationId: getUser
      parameters:
        - {name: id, in: path, required: true, schema: {type: string}}
      responses:
        "200":
          description: ok
          content:
            application/json:
              schema:
                type: object
                required: [id, name]
                properties:
                  id: {type: string}
                  name: {type: string}
        "204":
          description: empty
        4XX:
          description: client error
          content:
            application/json:
              schema: {type: object, required: [message]}
"#;

    fn contract() -> Contract {
        ContractLoader::from_str(CONTRACT, DocumentFormat::Yaml).expect("test contract loads")
    }

    fn captured(status: u16, content_type: Option<&str>, body: &'static str) -> CapturedResponse {
        let mut headers = HeaderMap::new();
        if let Some(ct) = content_type {
            headers.insert(CONTENT_TYPE, HeaderValue::from_str(ct).unwrap());
        }
        CapturedResponse::new(
            StatusCode::from_u16(status).unwrap(),
            headers,
            Bytes::from_static(body.as_bytes()),
        )
    }

    fn check(response: &CapturedResponse) -> Result<(), ResponseError> {
        let contract = contract();
        let resolved = contract.resolve("GET", "/users/7").unwrap();
        contract
            .response_validator()
            .validate(response, &resolved.route, &resolved.path_params)
    }

    #[test]
    fn test_valid_response() {
        let response = captured(200, Some("application/json"), r#"{"id":"7","name":"Ada"}"#);
        assert!(check(&response).is_ok());
    }

    #[test]
    fn test_empty_declared_response() {
        assert!(check(&captured(204, None, "")).is_ok());
    }

    #[test]
    fn test_range_status_lookup() {
        let response = captured(404, Some("application/json"), r#"{"message":"gone"}"#);
        assert!(check(&response).is_ok());

        let missing = captured(422, Some("application/json"), "{}");
        assert!(matches!(check(&missing), Err(ResponseError::Body(_))));
    }

    #[test]
    fn test_undeclared_status() {
        let response = captured(500, Some("application/json"), "{}");
        assert!(matches!(
            check(&response),
            Err(ResponseError::StatusNotSupported { status: 500 })
        ));
    }

    #[test]
    fn test_undeclared_content_type() {
        let response = captured(200, Some("text/html"), "<p>hi</p>");
        assert!(matches!(
            check(&response),
            Err(ResponseError::ContentType { ref content_type }) if content_type == "text/html"
        ));
    }

    #[test]
    fn test_invalid_json_body() {
        let response = captured(200, Some("application/json"), "{oops");
        assert!(matches!(check(&response), Err(ResponseError::InvalidBody { .. })));
    }

    #[test]
    fn test_schema_mismatch() {
        let response = captured(200, Some("application/json"), r#"{"id":7}"#);
        match check(&response) {
            Err(ResponseError::Body(ValidationError::Multi(errors))) => assert_eq!(errors.len(), 2),
            other => panic!("expected body error, got {other:?}"),
        }
    }
}
