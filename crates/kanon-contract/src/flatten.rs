//! Flattening of validation error trees into client-facing messages.
//!
//! A [`ValidationError`] tree is walked depth first and every leaf becomes at
//! most one message:
//!
//! | Failure | Message |
//! |---|---|
//! | parameter parse or schema failure | `query-param:page invalid integer` |
//! | body parse failure | `body:invalid JSON: ...` |
//! | body schema failure | `body:items[2] value must be >= 0` |
//!
//! A schema error whose origin is a declared group (`allOf`) yields its own
//! summary line followed by the lines of its children. An `anyOf` / `oneOf`
//! failure yields the lines of every failed branch. When those branches
//! cannot be recovered the node yields nothing and a diagnostic is written
//! to the request's [`TraceLog`] instead. A chain of schema errors is only
//! followed to reach such a combinator; otherwise the outermost reason is
//! the single message.
//!
//! Field errors that carry neither a parse nor a schema failure only produce
//! a message when they name a parameter.

use kanon_core::TraceLog;
use kanon_schema::{
    BoxError, FieldCause, FieldError, Origin, ParameterLocator, ParseError, PathSegment, SchemaError,
    ValidationError,
};

use crate::compat::recover_branches;
use crate::report::{TracingReporter, ValidationReporter};

/// Paths deeper than this are truncated when rendered.
pub const MAX_RENDERED_SEGMENTS: usize = 4;

/// Flattens validation errors for one request.
pub struct Flattener<'a> {
    log: &'a mut TraceLog,
    reporter: &'a dyn ValidationReporter,
}

impl<'a> Flattener<'a> {
    /// Creates a flattener writing diagnostics to `log` and `reporter`.
    pub fn new(log: &'a mut TraceLog, reporter: &'a dyn ValidationReporter) -> Self {
        Self { log, reporter }
    }

    /// Returns the messages for `error`, in tree order.
    pub fn flatten(&mut self, error: &ValidationError) -> Vec<String> {
        let mut messages = Vec::new();
        self.visit(error, None, &mut messages);
        messages
    }

    fn visit(
        &mut self,
        error: &ValidationError,
        locator: Option<&ParameterLocator>,
        out: &mut Vec<String>,
    ) {
        match error {
            ValidationError::Multi(children) => {
                for child in children {
                    self.visit(child, locator, out);
                }
            }
            ValidationError::Field(field) => self.visit_field(field, locator, out),
            ValidationError::Schema(schema) => self.visit_schema(schema, locator, out),
            ValidationError::Parse(parse) => out.push(parse_message(parse, locator)),
        }
    }

    fn visit_field(
        &mut self,
        field: &FieldError,
        inherited: Option<&ParameterLocator>,
        out: &mut Vec<String>,
    ) {
        let locator = field.parameter.as_ref().or(inherited);

        match &field.cause {
            Some(FieldCause::Multi(children)) => {
                for child in children {
                    self.visit(child, locator, out);
                }
            }
            Some(FieldCause::Parse(parse)) => out.push(parse_message(parse, locator)),
            Some(FieldCause::Schema(schema)) => self.visit_schema(schema, locator, out),
            Some(FieldCause::Other(cause)) => {
                if let Some(locator) = locator {
                    let reason = if field.reason.is_empty() {
                        cause.to_string()
                    } else {
                        field.reason.clone()
                    };
                    if !reason.is_empty() {
                        out.push(parameter_message(locator, &reason));
                    }
                }
            }
            None => {
                if let (Some(locator), false) = (locator, field.reason.is_empty()) {
                    out.push(parameter_message(locator, &field.reason));
                }
            }
        }
    }

    fn visit_schema(
        &mut self,
        schema: &SchemaError,
        locator: Option<&ParameterLocator>,
        out: &mut Vec<String>,
    ) {
        // Parameters are reported once, with the outermost reason
        if let Some(locator) = locator {
            out.push(parameter_message(locator, &schema.reason));
            return;
        }

        match schema.origin.as_ref() {
            Some(Origin::Multi(children)) => {
                out.push(body_message(&schema.path, &schema.reason));
                for child in children {
                    self.visit(child, None, out);
                }
            }
            Some(Origin::Wrapped(wrapped)) => self.visit_wrapped(schema, wrapped, out),
            Some(Origin::Schema(inner)) => match chained_wrapper(inner) {
                Some(wrapped) => self.visit_wrapped(schema, wrapped, out),
                None => out.push(body_message(&schema.path, &schema.reason)),
            },
            None => out.push(body_message(&schema.path, &schema.reason)),
        }
    }

    fn visit_wrapped(&mut self, schema: &SchemaError, wrapped: &BoxError, out: &mut Vec<String>) {
        match recover_branches(wrapped) {
            Ok(branches) => {
                for child in branches.into_iter().flatten() {
                    self.visit(child, None, out);
                }
            }
            Err(err) => {
                let detail = format!("{} at {:?}: {err}", schema.keyword, schema.json_pointer());
                self.log.add_error(format!("flatten_recovery_failed: {detail}"));
                self.reporter.recovery_failed(&schema.keyword, &err.to_string());
            }
        }
    }
}

/// Follows a chain of schema origins to an opaque combinator at its end.
fn chained_wrapper(mut schema: &SchemaError) -> Option<&BoxError> {
    loop {
        match schema.origin.as_ref()? {
            Origin::Schema(inner) => schema = inner,
            Origin::Wrapped(wrapped) => return Some(wrapped),
            Origin::Multi(_) => return None,
        }
    }
}

/// Flattens `error`, reporting diagnostics through `tracing`.
pub fn flatten(error: &ValidationError, log: &mut TraceLog) -> Vec<String> {
    Flattener::new(log, &TracingReporter).flatten(error)
}

/// Joins messages into the client-facing text.
///
/// Double quotes are removed so contract literals do not leak raw quoting.
pub fn join_messages(messages: &[String]) -> String {
    messages.join(", ").replace('"', "")
}

/// Flattens `error` straight into the client-facing text.
pub fn flatten_to_string(error: &ValidationError, log: &mut TraceLog) -> String {
    join_messages(&flatten(error, log))
}

fn parameter_message(locator: &ParameterLocator, reason: &str) -> String {
    format!("{}-param:{} {}", locator.location.as_str(), locator.name, reason)
}

fn parse_message(parse: &ParseError, inherited: Option<&ParameterLocator>) -> String {
    match parse.parameter.as_ref().or(inherited) {
        Some(locator) => parameter_message(locator, &parse.reason),
        None => format!("body:{}", parse.reason),
    }
}

fn body_message(path: &[PathSegment], reason: &str) -> String {
    if path.is_empty() {
        format!("body:{reason}")
    } else {
        format!("body:{} {reason}", render_path(path))
    }
}

/// Renders `["items", 2, "name"]` as `items[2][name]`.
fn render_path(path: &[PathSegment]) -> String {
    let mut rendered = String::new();
    for (i, segment) in path.iter().take(MAX_RENDERED_SEGMENTS).enumerate() {
        let text = match segment {
            PathSegment::Key(key) => key.clone(),
            PathSegment::Index(index) => index.to_string(),
        };
        if i == 0 {
            rendered.push_str(&text);
        } else {
            rendered.push('[');
            rendered.push_str(&text);
            rendered.push(']');
        }
    }
    rendered
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use kanon_schema::{
        Components, MultiError, ParseErrorKind, Schema, SchemaValidator,
    };
    use proptest::prelude::*;
    use serde_json::json;

    use crate::request::RequiredValueMissing;

    #[derive(Debug, Default)]
    struct RecordingReporter {
        recoveries: Mutex<Vec<String>>,
    }

    impl ValidationReporter for RecordingReporter {
        fn contract_violation(&self, _method: &str, _path: &str, _detail: &str) {}

        fn response_invalid(&self, _method: &str, _path: &str, _status: u16, _detail: &str) {}

        fn recovery_failed(&self, keyword: &str, _detail: &str) {
            self.recoveries.lock().unwrap().push(keyword.to_string());
        }
    }

    fn path(segments: &[&str]) -> Vec<PathSegment> {
        segments
            .iter()
            .map(|s| match s.parse::<usize>() {
                Ok(index) => PathSegment::Index(index),
                Err(_) => PathSegment::from(*s),
            })
            .collect()
    }

    fn leaf(segments: &[&str], reason: &str) -> SchemaError {
        SchemaError::new("type", reason, path(segments))
    }

    fn run(error: &ValidationError) -> Vec<String> {
        flatten(error, &mut TraceLog::new())
    }

    #[test]
    fn test_query_parse_error() {
        let error = ValidationError::Multi(MultiError::from(vec![FieldError::parameter(
            ParameterLocator::query("page"),
            FieldCause::Parse(ParseError::parameter(
                ParameterLocator::query("page"),
                "invalid integer",
            )),
        )
        .into()]));

        assert_eq!(run(&error), vec!["query-param:page invalid integer"]);
    }

    #[test]
    fn test_body_parse_error() {
        let error = ValidationError::Field(FieldError::body(
            "failed to decode request body",
            FieldCause::Parse(ParseError::body(ParseErrorKind::InvalidJson, "invalid JSON: eof")),
        ));

        assert_eq!(run(&error), vec!["body:invalid JSON: eof"]);
    }

    #[test]
    fn test_body_schema_leaf() {
        let error = ValidationError::Schema(leaf(&["items", "2"], "value must be >= 0"));
        assert_eq!(run(&error), vec!["body:items[2] value must be >= 0"]);
    }

    #[test]
    fn test_empty_path_renders_bare_reason() {
        let error = ValidationError::Schema(leaf(&[], "value must be an object"));
        assert_eq!(run(&error), vec!["body:value must be an object"]);
    }

    #[test]
    fn test_path_truncated_to_four_segments() {
        let error = ValidationError::Schema(leaf(&["a", "0", "b", "1", "c"], "too deep"));
        assert_eq!(run(&error), vec!["body:a[0][b][1] too deep"]);
    }

    #[test]
    fn test_declared_group_summary_precedes_children() {
        let error = ValidationError::Schema(
            SchemaError::new("allOf", "doesn't match all schemas", path(&["pet"])).with_origin(
                Origin::Multi(MultiError::from(vec![
                    leaf(&["pet", "name"], "value must be a string").into(),
                    leaf(&["pet", "age"], "number must be at least 0").into(),
                ])),
            ),
        );

        assert_eq!(
            run(&error),
            vec![
                "body:pet doesn't match all schemas",
                "body:pet[name] value must be a string",
                "body:pet[age] number must be at least 0",
            ]
        );
    }

    #[test]
    fn test_schema_chain_is_a_single_leaf() {
        let inner = SchemaError::new("items", "inner reason", path(&["list", "0"])).with_origin(
            Origin::Multi(MultiError::from(vec![leaf(&["list", "0", "id"], "missing").into()])),
        );
        let error = ValidationError::Schema(
            SchemaError::new("items", "outer reason", path(&["list"]))
                .with_origin(Origin::Schema(Box::new(inner))),
        );

        assert_eq!(run(&error), vec!["body:list outer reason"]);
    }

    #[test]
    fn test_schema_chain_reaches_wrapped_combinator() {
        let inner = SchemaError::new("oneOf", "doesn't match exactly one schema", path(&["id"]))
            .with_origin(Origin::Wrapped(Box::new(std::io::Error::other("opaque"))));
        let error = ValidationError::Schema(
            SchemaError::new("oneOf", "outer reason", path(&["id"]))
                .with_origin(Origin::Schema(Box::new(inner))),
        );

        let mut log = TraceLog::new();
        let reporter = RecordingReporter::default();
        let messages = Flattener::new(&mut log, &reporter).flatten(&error);

        assert!(messages.is_empty());
        assert_eq!(log.errors().len(), 1);
        assert_eq!(*reporter.recoveries.lock().unwrap(), vec!["oneOf".to_string()]);
    }

    #[test]
    fn test_parameter_schema_uses_outer_reason() {
        let nested = SchemaError::new("allOf", "outer", vec![]).with_origin(Origin::Schema(
            Box::new(leaf(&[], "inner")),
        ));
        let error = ValidationError::Field(FieldError::parameter(
            ParameterLocator::header("X-Trace"),
            FieldCause::Schema(nested),
        ));

        assert_eq!(run(&error), vec!["header-param:X-Trace outer"]);
    }

    #[test]
    fn test_nested_multi_inherits_locator() {
        let error = ValidationError::Field(FieldError::parameter(
            ParameterLocator::path("id"),
            FieldCause::Multi(MultiError::from(vec![
                leaf(&[], "number must be at least 1").into(),
                leaf(&[], "number must be a multiple of 2").into(),
            ])),
        ));

        assert_eq!(
            run(&error),
            vec![
                "path-param:id number must be at least 1",
                "path-param:id number must be a multiple of 2",
            ]
        );
    }

    #[test]
    fn test_other_cause_with_locator() {
        let error = ValidationError::Field(FieldError::parameter(
            ParameterLocator::cookie("session"),
            FieldCause::Other(Box::new(RequiredValueMissing)),
        ));

        assert_eq!(run(&error), vec!["cookie-param:session value is required but missing"]);
    }

    #[test]
    fn test_other_cause_without_locator_is_dropped() {
        let error = ValidationError::Field(FieldError::body(
            "request body is required",
            FieldCause::Other(Box::new(RequiredValueMissing)),
        ));

        let mut log = TraceLog::new();
        assert!(flatten(&error, &mut log).is_empty());
        assert!(log.is_empty());
    }

    #[test]
    fn test_engine_combinator_branches_are_recovered() {
        let components = Components::new();
        let schema = Schema::from_value(json!({
            "type": "object",
            "properties": {
                "id": {"oneOf": [{"type": "string", "format": "uuid"}, {"type": "integer", "minimum": 1}]}
            }
        }))
        .unwrap();
        let errors = SchemaValidator::new(&components)
            .validate(&schema, &json!({"id": 0}))
            .unwrap_err();

        assert_eq!(
            run(&ValidationError::Multi(errors)),
            vec![
                "body:id value must be a string",
                "body:id number must be at least 1",
            ]
        );
    }

    #[test]
    fn test_unrecoverable_combinator_degrades() {
        let error = ValidationError::Multi(MultiError::from(vec![
            ValidationError::Schema(
                SchemaError::new("anyOf", "doesn't match any schema", path(&["a"])).with_origin(
                    Origin::Wrapped(Box::new(std::io::Error::other("opaque"))),
                ),
            ),
            leaf(&["b"], "value must be a string").into(),
        ]));

        let mut log = TraceLog::new();
        let reporter = RecordingReporter::default();
        let messages = Flattener::new(&mut log, &reporter).flatten(&error);

        assert_eq!(messages, vec!["body:b value must be a string"]);
        assert_eq!(log.errors().len(), 1);
        assert!(log.errors()[0].contains("anyOf"));
        assert_eq!(*reporter.recoveries.lock().unwrap(), vec!["anyOf".to_string()]);
    }

    #[test]
    fn test_quotes_are_stripped() {
        let error = ValidationError::Schema(leaf(
            &["kind"],
            "value is not one of the allowed values [\"cat\",\"dog\"]",
        ));
        let mut log = TraceLog::new();

        assert_eq!(
            flatten_to_string(&error, &mut log),
            "body:kind value is not one of the allowed values [cat,dog]"
        );
    }

    #[test]
    fn test_join_messages() {
        let messages = vec!["a \"x\"".to_string(), "b".to_string()];
        assert_eq!(join_messages(&messages), "a x, b");
        assert_eq!(join_messages(&[]), "");
    }

    #[derive(Debug, Clone)]
    enum Shape {
        Parse(String, String),
        Leaf(Vec<String>, String),
        Group(Vec<Shape>),
        Summary(Vec<Shape>),
    }

    fn build(shape: &Shape) -> ValidationError {
        match shape {
            Shape::Parse(name, reason) => {
                ParseError::parameter(ParameterLocator::query(name.as_str()), reason.as_str()).into()
            }
            Shape::Leaf(segments, reason) => SchemaError::new(
                "type",
                reason.as_str(),
                segments.iter().map(|s| PathSegment::from(s.as_str())).collect(),
            )
            .into(),
            Shape::Group(children) => {
                ValidationError::Multi(children.iter().map(build).collect())
            }
            Shape::Summary(children) => SchemaError::new("allOf", "summary", vec![])
                .with_origin(Origin::Multi(children.iter().map(build).collect()))
                .into(),
        }
    }

    fn shape() -> impl Strategy<Value = Shape> {
        let leaf = prop_oneof![
            ("[a-z]{1,6}", "[a-z ]{1,12}").prop_map(|(name, reason)| Shape::Parse(name, reason)),
            (prop::collection::vec("[a-z]{1,4}", 0..6), "[a-z ]{1,12}")
                .prop_map(|(segments, reason)| Shape::Leaf(segments, reason)),
        ];
        leaf.prop_recursive(3, 24, 4, |inner| {
            prop_oneof![
                prop::collection::vec(inner.clone(), 0..4).prop_map(Shape::Group),
                prop::collection::vec(inner, 1..3).prop_map(Shape::Summary),
            ]
        })
    }

    proptest! {
        #[test]
        fn prop_flatten_is_associative(a in shape(), b in shape()) {
            let combined = ValidationError::Multi(MultiError::from(vec![build(&a), build(&b)]));

            let mut expected = run(&build(&a));
            expected.extend(run(&build(&b)));

            prop_assert_eq!(run(&combined), expected);
        }
    }
}
