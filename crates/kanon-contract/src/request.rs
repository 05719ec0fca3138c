//! Request validation.
//!
//! [`OpenApiRequestValidator`] checks every declared parameter and the body of
//! a request against its [`RouteDefinition`]. In multi-error mode the result
//! is always a [`ValidationError::Multi`] of [`FieldError`]s, one per failing
//! parameter or body.

use std::sync::Arc;

use bytes::Bytes;
use http::header::{CONTENT_TYPE, COOKIE};
use http::Request;
use kanon_schema::{
    Components, FieldCause, FieldError, InstanceType, MultiError, ParameterLocation, ParseError,
    ParseErrorKind, Schema, SchemaValidator, ValidationError,
};
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use crate::config::ValidationOptions;
use crate::route::{
    is_json_media_type, match_media_type, ParameterDefinition, PathParams, RequestBodyDefinition,
    RouteDefinition,
};
use crate::schema_cause;

/// A required parameter or body is absent.
#[derive(Debug, Clone, Copy, Error)]
#[error("value is required but missing")]
pub struct RequiredValueMissing;

/// The request body's media type is not accepted by the route.
#[derive(Debug, Clone, Error)]
pub enum ContentTypeError {
    /// No `Content-Type` header was sent.
    #[error("header Content-Type is missing")]
    Missing,
    /// The media type is not declared for this route.
    #[error("header Content-Type has unexpected value {0:?}")]
    Unsupported(String),
}

/// Validates requests against a route definition.
///
/// Implementations must return [`ValidationError::Multi`] on failure; the
/// pipeline treats any other top-level shape as a broken validator.
pub trait RequestValidator: Send + Sync {
    /// Validate `request` against `route`.
    fn validate(
        &self,
        request: &Request<Bytes>,
        route: &RouteDefinition,
        path_params: &PathParams,
    ) -> Result<(), ValidationError>;
}

/// The default request validator.
#[derive(Debug, Clone)]
pub struct OpenApiRequestValidator {
    components: Arc<Components>,
    options: ValidationOptions,
}

impl OpenApiRequestValidator {
    /// Creates a validator resolving schema references through `components`.
    pub fn new(components: Arc<Components>) -> Self {
        Self {
            components,
            options: ValidationOptions::default(),
        }
    }

    /// Sets the validation options.
    pub fn with_options(mut self, options: ValidationOptions) -> Self {
        self.options = options;
        self
    }

    fn validate_parameter(
        &self,
        param: &ParameterDefinition,
        raw: &[String],
    ) -> Result<(), FieldError> {
        if raw.is_empty() {
            if param.required {
                return Err(FieldError::parameter(
                    param.locator(),
                    FieldCause::Other(Box::new(RequiredValueMissing)),
                ));
            }
            return Ok(());
        }

        let Some(schema) = &param.schema else {
            return Ok(());
        };

        let value = coerce_parameter(param, schema, raw, &self.components).map_err(|cause| {
            FieldError::parameter(param.locator(), FieldCause::Parse(cause))
        })?;

        SchemaValidator::new(&self.components)
            .validate(schema, &value)
            .map_err(|errors| FieldError::parameter(param.locator(), schema_cause(errors)))
    }

    fn validate_body(
        &self,
        definition: &RequestBodyDefinition,
        request: &Request<Bytes>,
    ) -> Result<(), FieldError> {
        let body = request.body();
        if body.is_empty() {
            if definition.required {
                return Err(FieldError::body(
                    "request body is required",
                    FieldCause::Other(Box::new(RequiredValueMissing)),
                ));
            }
            return Ok(());
        }

        let Some(content_type) = request
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
        else {
            return Err(FieldError::body(
                "unsupported content type",
                FieldCause::Other(Box::new(ContentTypeError::Missing)),
            ));
        };

        let Some((media_type, schema)) = match_media_type(&definition.content, content_type)
        else {
            return Err(FieldError::body(
                "unsupported content type",
                FieldCause::Other(Box::new(ContentTypeError::Unsupported(
                    content_type.to_string(),
                ))),
            ));
        };

        let Some(schema) = schema else {
            return Ok(());
        };

        let value = if is_json_media_type(content_type) || is_json_media_type(media_type) {
            serde_json::from_slice::<Value>(body).map_err(|e| {
                FieldError::body(
                    "failed to decode request body",
                    FieldCause::Parse(ParseError::body(
                        ParseErrorKind::InvalidJson,
                        format!("invalid JSON: {e}"),
                    )),
                )
            })?
        } else if content_type.trim_start().starts_with("text/") {
            Value::String(String::from_utf8_lossy(body).into_owned())
        } else {
            debug!(media_type, "no decoder for media type, skipping body schema");
            return Ok(());
        };

        SchemaValidator::new(&self.components)
            .validate(schema, &value)
            .map_err(|errors| FieldError::body("doesn't match schema", schema_cause(errors)))
    }
}

impl RequestValidator for OpenApiRequestValidator {
    fn validate(
        &self,
        request: &Request<Bytes>,
        route: &RouteDefinition,
        path_params: &PathParams,
    ) -> Result<(), ValidationError> {
        let query = parse_query(request.uri().query().unwrap_or_default());
        let cookies = parse_cookies(request);
        let mut failures = MultiError::new();

        for param in &route.parameters {
            let raw: Vec<String> = match param.location {
                ParameterLocation::Path => path_params.get(&param.name).cloned().into_iter().collect(),
                ParameterLocation::Query => matching(&query, &param.name),
                ParameterLocation::Cookie => matching(&cookies, &param.name),
                ParameterLocation::Header => request
                    .headers()
                    .get_all(param.name.as_str())
                    .iter()
                    .filter_map(|v| v.to_str().ok())
                    .map(str::to_string)
                    .collect(),
            };

            if let Err(err) = self.validate_parameter(param, &raw) {
                if !self.options.multi_error {
                    return Err(ValidationError::Field(err));
                }
                failures.push(err);
            }
        }

        if let Some(body) = &route.request_body {
            if let Err(err) = self.validate_body(body, request) {
                if !self.options.multi_error {
                    return Err(ValidationError::Field(err));
                }
                failures.push(err);
            }
        }

        if failures.is_empty() {
            Ok(())
        } else {
            debug!(
                route = %route.label(),
                failures = failures.len(),
                "request validation failed"
            );
            Err(ValidationError::Multi(failures))
        }
    }
}

fn matching(pairs: &[(String, String)], name: &str) -> Vec<String> {
    pairs
        .iter()
        .filter(|(key, _)| key == name)
        .map(|(_, value)| value.clone())
        .collect()
}

fn parse_query(query: &str) -> Vec<(String, String)> {
    // Repeated keys are kept in order so arrays can be rebuilt from them
    serde_urlencoded::from_str(query).unwrap_or_default()
}

fn parse_cookies(request: &Request<Bytes>) -> Vec<(String, String)> {
    request
        .headers()
        .get_all(COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|header| header.split(';'))
        .filter_map(|pair| {
            let (key, value) = pair.trim().split_once('=')?;
            Some((key.trim().to_string(), value.trim().to_string()))
        })
        .collect()
}

/// Follows `$ref`s until a schema with its own keywords is reached.
fn effective<'a>(schema: &'a Schema, components: &'a Components) -> &'a Schema {
    let mut current = schema;
    for _ in 0..kanon_schema::MAX_REF_DEPTH {
        let Some(next) = current
            .reference
            .as_deref()
            .and_then(kanon_schema::component_name)
            .and_then(|name| components.get(name))
        else {
            break;
        };
        current = next;
    }
    current
}

fn primary_type(schema: &Schema) -> Option<InstanceType> {
    schema
        .schema_type
        .as_ref()
        .and_then(|t| t.types().iter().copied().find(|ty| *ty != InstanceType::Null))
}

fn coerce_parameter(
    param: &ParameterDefinition,
    schema: &Schema,
    raw: &[String],
    components: &Components,
) -> Result<Value, ParseError> {
    let schema = effective(schema, components);
    let fail = |reason: &str| ParseError::parameter(param.locator(), reason);

    match primary_type(schema) {
        Some(InstanceType::Array) => {
            let items: Vec<&str> = if param.explode {
                raw.iter().map(String::as_str).collect()
            } else {
                raw.last()
                    .map(|joined| joined.split(',').collect())
                    .unwrap_or_default()
            };
            let item_type = schema
                .items
                .as_deref()
                .map(|items| effective(items, components))
                .and_then(primary_type);
            items
                .into_iter()
                .map(|item| coerce_scalar(item_type, item).map_err(fail))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::Array)
        }
        Some(InstanceType::Object) => Err(ParseError {
            parameter: Some(param.locator()),
            kind: ParseErrorKind::Unsupported,
            reason: "object parameters are not supported".to_string(),
        }),
        ty => coerce_scalar(ty, &raw[0]).map_err(fail),
    }
}

fn coerce_scalar(ty: Option<InstanceType>, raw: &str) -> Result<Value, &'static str> {
    match ty {
        Some(InstanceType::Integer) => raw
            .parse::<i64>()
            .map(Value::from)
            .or_else(|_| raw.parse::<u64>().map(Value::from))
            .map_err(|_| "invalid integer"),
        Some(InstanceType::Number) => {
            if let Ok(int) = raw.parse::<i64>() {
                return Ok(Value::from(int));
            }
            raw.parse::<f64>()
                .ok()
                .and_then(serde_json::Number::from_f64)
                .map(Value::Number)
                .ok_or("invalid number")
        }
        Some(InstanceType::Boolean) => match raw {
            "true" => Ok(Value::Bool(true)),
            "false" => Ok(Value::Bool(false)),
            _ => Err("invalid boolean"),
        },
        _ => Ok(Value::String(raw.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::{ContractLoader, DocumentFormat};
    use crate::Contract;
    use kanon_schema::{ParameterLocator, SchemaError};

    const CONTRACT: &str = r#"{
        "openapi": "3.0.3",
        "paths": {
            "/items/{id}": {
                "get": {
                    "parameters": [
                        {"name": "id", "in": "path", "schema": {"type": "integer"}},
                        {"name": "page", "in": "query", "required": true, "schema": {"type": "integer", "minimum": 1}},
                        {"name": "tags", "in": "query", "schema": {"type": "array", "items": {"type": "string"}}},
                        {"name": "ids", "in": "query", "explode": false, "schema": {"type": "array", "items": {"type": "integer"}}},
                        {"name": "X-Trace", "in": "header", "schema": {"type": "string", "minLength": 3}},
                        {"name": "session", "in": "cookie", "required": true, "schema": {"type": "string"}}
                    ],
                    "responses": {}
                }
            },
            "/people": {
                "post": {
                    "requestBody": {
                        "required": true,
                        "content": {"application/json": {"schema": {
                            "type": "object",
                            "required": ["age"],
                            "properties": {"age": {"type": "integer"}, "name": {"type": "string"}}
                        }}}
                    },
                    "responses": {}
                }
            }
        }
    }"#;

    fn contract() -> Contract {
        ContractLoader::from_str(CONTRACT, DocumentFormat::Json).expect("test contract loads")
    }

    fn run(contract: &Contract, request: Request<Bytes>) -> Result<(), ValidationError> {
        let resolved = contract
            .resolve(request.method().as_str(), request.uri().path())
            .expect("route exists");
        contract
            .request_validator()
            .validate(&request, &resolved.route, &resolved.path_params)
    }

    fn failures(err: ValidationError) -> Vec<FieldError> {
        match err {
            ValidationError::Multi(multi) => multi
                .into_iter()
                .map(|e| match e {
                    ValidationError::Field(f) => f,
                    other => panic!("expected field error, got {other:?}"),
                })
                .collect(),
            other => panic!("expected multi error, got {other:?}"),
        }
    }

    fn get(uri: &str) -> http::request::Builder {
        Request::builder().method("GET").uri(uri)
    }

    #[test]
    fn test_valid_request_passes() {
        let contract = contract();
        let request = get("/items/5?page=2&tags=a&tags=b&ids=1,2,3")
            .header("x-trace", "abcd")
            .header("cookie", "theme=dark; session=s1")
            .body(Bytes::new())
            .unwrap();

        assert!(run(&contract, request).is_ok());
    }

    #[test]
    fn test_missing_required_parameters() {
        let contract = contract();
        let request = get("/items/5").body(Bytes::new()).unwrap();

        let errors = failures(run(&contract, request).unwrap_err());
        assert_eq!(errors.len(), 2);
        assert_eq!(errors[0].parameter, Some(ParameterLocator::query("page")));
        assert!(matches!(
            &errors[0].cause,
            Some(FieldCause::Other(e)) if e.to_string() == "value is required but missing"
        ));
        assert_eq!(errors[1].parameter, Some(ParameterLocator::cookie("session")));
    }

    #[test]
    fn test_unparseable_parameter() {
        let contract = contract();
        let request = get("/items/abc?page=x")
            .header("cookie", "session=s1")
            .body(Bytes::new())
            .unwrap();

        let errors = failures(run(&contract, request).unwrap_err());
        assert_eq!(errors.len(), 2);
        match &errors[1].cause {
            Some(FieldCause::Parse(parse)) => {
                assert_eq!(parse.reason, "invalid integer");
                assert_eq!(parse.parameter, Some(ParameterLocator::query("page")));
            }
            other => panic!("expected parse cause, got {other:?}"),
        }
    }

    #[test]
    fn test_parameter_schema_failure() {
        let contract = contract();
        let request = get("/items/5?page=0&ids=1,x")
            .header("X-Trace", "ab")
            .header("cookie", "session=s1")
            .body(Bytes::new())
            .unwrap();

        let errors = failures(run(&contract, request).unwrap_err());
        let located: Vec<_> = errors
            .iter()
            .map(|e| e.parameter.clone().expect("parameter errors carry a locator"))
            .collect();
        assert_eq!(
            located,
            vec![
                ParameterLocator::query("page"),
                ParameterLocator::query("ids"),
                ParameterLocator::header("X-Trace"),
            ]
        );
        assert!(matches!(
            &errors[0].cause,
            Some(FieldCause::Schema(SchemaError { keyword, .. })) if keyword == "minimum"
        ));
    }

    #[test]
    fn test_body_schema_failure() {
        let contract = contract();
        let request = Request::builder()
            .method("POST")
            .uri("/people")
            .header("content-type", "application/json")
            .body(Bytes::from_static(br#"{"age": "ten"}"#))
            .unwrap();

        let errors = failures(run(&contract, request).unwrap_err());
        assert_eq!(errors.len(), 1);
        assert!(errors[0].parameter.is_none());
        match &errors[0].cause {
            Some(FieldCause::Schema(schema)) => {
                assert_eq!(schema.reason, "value must be an integer");
            }
            other => panic!("expected schema cause, got {other:?}"),
        }
    }

    #[test]
    fn test_body_invalid_json() {
        let contract = contract();
        let request = Request::builder()
            .method("POST")
            .uri("/people")
            .header("content-type", "application/json; charset=utf-8")
            .body(Bytes::from_static(b"{not json"))
            .unwrap();

        let errors = failures(run(&contract, request).unwrap_err());
        match &errors[0].cause {
            Some(FieldCause::Parse(parse)) => {
                assert_eq!(parse.kind, ParseErrorKind::InvalidJson);
                assert!(parse.reason.starts_with("invalid JSON: "));
            }
            other => panic!("expected parse cause, got {other:?}"),
        }
    }

    #[test]
    fn test_body_missing_and_wrong_content_type() {
        let contract = contract();
        let missing = Request::builder()
            .method("POST")
            .uri("/people")
            .body(Bytes::new())
            .unwrap();
        let errors = failures(run(&contract, missing).unwrap_err());
        assert!(matches!(&errors[0].cause, Some(FieldCause::Other(_))));

        let xml = Request::builder()
            .method("POST")
            .uri("/people")
            .header("content-type", "application/xml")
            .body(Bytes::from_static(b"<age>1</age>"))
            .unwrap();
        let errors = failures(run(&contract, xml).unwrap_err());
        assert!(matches!(
            &errors[0].cause,
            Some(FieldCause::Other(e)) if e.to_string().contains("application/xml")
        ));
    }

    #[test]
    fn test_first_error_mode_returns_bare_field_error() {
        let contract = contract();
        let validator = contract
            .request_validator()
            .with_options(ValidationOptions::first_error());
        let request = get("/items/5").body(Bytes::new()).unwrap();
        let resolved = contract.resolve("GET", "/items/5").unwrap();

        let err = validator
            .validate(&request, &resolved.route, &resolved.path_params)
            .unwrap_err();
        assert!(matches!(err, ValidationError::Field(_)));
    }

    #[test]
    fn test_query_decoding() {
        assert_eq!(
            parse_query("a=1&b=hello+world&c=%2Fx&flag"),
            vec![
                ("a".to_string(), "1".to_string()),
                ("b".to_string(), "hello world".to_string()),
                ("c".to_string(), "/x".to_string()),
                ("flag".to_string(), String::new()),
            ]
        );
    }

    #[test]
    fn test_query_repeated_keys_and_raw_values() {
        assert_eq!(
            parse_query("tag=a&name=caf%C3%A9&tag=b&eq=b=c"),
            vec![
                ("tag".to_string(), "a".to_string()),
                ("name".to_string(), "café".to_string()),
                ("tag".to_string(), "b".to_string()),
                ("eq".to_string(), "b=c".to_string()),
            ]
        );
        assert!(parse_query("").is_empty());
    }
}
