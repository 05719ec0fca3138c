//! Checks JSON values against [`Schema`]s.
//!
//! The validator never stops at the first failure: every mismatch found in
//! the document is reported, each as a [`SchemaError`] carrying its absolute
//! path. `allOf` failures keep their children as a declared
//! [`Origin::Multi`]; `anyOf` / `oneOf` failures keep theirs behind an opaque
//! [`CombinatorMismatch`].

use std::collections::HashSet;

use serde_json::{Map, Number, Value};
use tracing::trace;

use crate::error::{CombinatorMismatch, MultiError, Origin, PathSegment, SchemaError, ValidationError};
use crate::format::{self, FormatCheck};
use crate::schema::{component_name, AdditionalProperties, Components, ExclusiveBound, InstanceType, Schema};

/// Maximum number of `$ref` hops followed along one path.
pub const MAX_REF_DEPTH: usize = 64;

/// Validates values against schemas, resolving `$ref`s through `components`.
///
/// # Example
///
/// ```
/// use kanon_schema::{Components, Schema, SchemaValidator};
/// use serde_json::json;
///
/// let components = Components::new();
/// let schema = Schema::from_value(json!({
///     "type": "object",
///     "properties": {"age": {"type": "integer"}}
/// })).unwrap();
///
/// let validator = SchemaValidator::new(&components);
/// assert!(validator.validate(&schema, &json!({"age": 7})).is_ok());
///
/// let errors = validator.validate(&schema, &json!({"age": "ten"})).unwrap_err();
/// assert_eq!(errors.len(), 1);
/// ```
#[derive(Debug, Clone, Copy)]
pub struct SchemaValidator<'a> {
    components: &'a Components,
}

impl<'a> SchemaValidator<'a> {
    /// Creates a validator over a set of named schemas.
    #[must_use]
    pub fn new(components: &'a Components) -> Self {
        Self { components }
    }

    /// Validates `value`, returning every mismatch found.
    pub fn validate(&self, schema: &Schema, value: &Value) -> Result<(), MultiError> {
        let mut errors = Vec::new();
        self.check(schema, value, &mut Vec::new(), &mut errors, 0);
        if errors.is_empty() {
            Ok(())
        } else {
            trace!(error_count = errors.len(), "schema validation failed");
            Err(MultiError::from(errors))
        }
    }

    /// Returns `true` if `value` matches `schema`.
    #[must_use]
    pub fn is_valid(&self, schema: &Schema, value: &Value) -> bool {
        self.validate(schema, value).is_ok()
    }

    fn check(
        &self,
        schema: &Schema,
        value: &Value,
        path: &mut Vec<PathSegment>,
        errors: &mut Vec<ValidationError>,
        depth: usize,
    ) {
        if let Some(reference) = &schema.reference {
            self.check_reference(reference, value, path, errors, depth);
            return;
        }

        if value.is_null() {
            if schema.accepts_null() {
                return;
            }
            if schema.schema_type.is_some() {
                errors.push(leaf("nullable", "value must not be null", path));
                return;
            }
        }

        if let Some(declared) = &schema.schema_type {
            let types = declared.types();
            if !types.iter().any(|ty| matches_type(*ty, value)) {
                let reason = match types {
                    [single] => format!("value must be {}", single.described()),
                    many => format!(
                        "value must be one of {}",
                        many.iter().map(InstanceType::as_str).collect::<Vec<_>>().join(", ")
                    ),
                };
                errors.push(leaf("type", reason, path));
                return;
            }
        }

        if let Some(allowed) = &schema.enumeration {
            if !allowed.contains(value) {
                let rendered = serde_json::to_string(allowed).unwrap_or_default();
                errors.push(leaf(
                    "enum",
                    format!("value is not one of the allowed values {rendered}"),
                    path,
                ));
            }
        }

        if let Some(constant) = &schema.constant {
            if constant != value {
                errors.push(leaf("const", format!("value must be {constant}"), path));
            }
        }

        match value {
            Value::Number(n) => check_number(schema, n, path, errors),
            Value::String(s) => check_string(schema, s, path, errors),
            Value::Array(items) => self.check_array(schema, items, path, errors, depth),
            Value::Object(map) => self.check_object(schema, map, path, errors, depth),
            Value::Bool(_) | Value::Null => {}
        }

        self.check_combinators(schema, value, path, errors, depth);
    }

    fn check_reference(
        &self,
        reference: &str,
        value: &Value,
        path: &mut Vec<PathSegment>,
        errors: &mut Vec<ValidationError>,
        depth: usize,
    ) {
        if depth >= MAX_REF_DEPTH {
            errors.push(leaf(
                "$ref",
                format!("reference depth exceeded at {reference:?}"),
                path,
            ));
            return;
        }
        match component_name(reference).and_then(|name| self.components.get(name)) {
            Some(target) => self.check(target, value, path, errors, depth + 1),
            None => errors.push(leaf(
                "$ref",
                format!("unresolved reference {reference:?}"),
                path,
            )),
        }
    }

    fn check_array(
        &self,
        schema: &Schema,
        items: &[Value],
        path: &mut Vec<PathSegment>,
        errors: &mut Vec<ValidationError>,
        depth: usize,
    ) {
        if let Some(min) = schema.min_items {
            if items.len() < min {
                errors.push(leaf("minItems", format!("minimum number of items is {min}"), path));
            }
        }
        if let Some(max) = schema.max_items {
            if items.len() > max {
                errors.push(leaf("maxItems", format!("maximum number of items is {max}"), path));
            }
        }
        if schema.unique_items && has_duplicates(items) {
            errors.push(leaf("uniqueItems", "duplicate items found", path));
        }
        if let Some(item_schema) = &schema.items {
            for (index, item) in items.iter().enumerate() {
                path.push(PathSegment::Index(index));
                self.check(item_schema, item, path, errors, depth);
                path.pop();
            }
        }
    }

    fn check_object(
        &self,
        schema: &Schema,
        map: &Map<String, Value>,
        path: &mut Vec<PathSegment>,
        errors: &mut Vec<ValidationError>,
        depth: usize,
    ) {
        for name in &schema.required {
            if !map.contains_key(name) {
                path.push(PathSegment::Key(name.clone()));
                errors.push(leaf("required", format!("property {name:?} is missing"), path));
                path.pop();
            }
        }

        if let Some(min) = schema.min_properties {
            if map.len() < min {
                errors.push(leaf(
                    "minProperties",
                    format!("there must be at least {min} properties"),
                    path,
                ));
            }
        }
        if let Some(max) = schema.max_properties {
            if map.len() > max {
                errors.push(leaf(
                    "maxProperties",
                    format!("there must be at most {max} properties"),
                    path,
                ));
            }
        }

        for (name, property) in map {
            path.push(PathSegment::Key(name.clone()));
            match (schema.properties.get(name), &schema.additional_properties) {
                (Some(declared), _) => self.check(declared, property, path, errors, depth),
                (None, Some(AdditionalProperties::Schema(extra))) => {
                    self.check(extra, property, path, errors, depth);
                }
                (None, Some(AdditionalProperties::Allowed(false))) => {
                    errors.push(leaf(
                        "additionalProperties",
                        format!("property {name:?} is unsupported"),
                        path,
                    ));
                }
                (None, _) => {}
            }
            path.pop();
        }
    }

    fn check_combinators(
        &self,
        schema: &Schema,
        value: &Value,
        path: &mut Vec<PathSegment>,
        errors: &mut Vec<ValidationError>,
        depth: usize,
    ) {
        if !schema.all_of.is_empty() {
            let mut failures = Vec::new();
            for branch in &schema.all_of {
                self.check(branch, value, path, &mut failures, depth);
            }
            if !failures.is_empty() {
                errors.push(ValidationError::Schema(
                    SchemaError::new("allOf", "doesn't match all schemas from \"allOf\"", path.clone())
                        .with_origin(Origin::Multi(MultiError::from(failures))),
                ));
            }
        }

        if !schema.any_of.is_empty() {
            let (matched, branches) = self.try_branches(&schema.any_of, value, path, depth);
            if matched == 0 {
                errors.push(combinator_failure(
                    "anyOf",
                    "doesn't match any schema from \"anyOf\"",
                    branches,
                    path,
                ));
            }
        }

        if !schema.one_of.is_empty() {
            let (matched, branches) = self.try_branches(&schema.one_of, value, path, depth);
            match matched {
                0 => errors.push(combinator_failure(
                    "oneOf",
                    "doesn't match any schema from \"oneOf\"",
                    branches,
                    path,
                )),
                1 => {}
                _ => errors.push(leaf(
                    "oneOf",
                    "value matches more than one schema from \"oneOf\"",
                    path,
                )),
            }
        }

        if let Some(negated) = &schema.not {
            let mut failures = Vec::new();
            self.check(negated, value, path, &mut failures, depth);
            if failures.is_empty() {
                errors.push(leaf("not", "value must not match the schema in \"not\"", path));
            }
        }
    }

    /// Runs every branch, returning how many matched and the failures of
    /// those that did not, one `Multi` per failed branch.
    fn try_branches(
        &self,
        branches: &[Schema],
        value: &Value,
        path: &mut Vec<PathSegment>,
        depth: usize,
    ) -> (usize, Vec<ValidationError>) {
        let mut matched = 0;
        let mut failed = Vec::new();
        for branch in branches {
            let mut failures = Vec::new();
            self.check(branch, value, path, &mut failures, depth);
            if failures.is_empty() {
                matched += 1;
            } else {
                failed.push(ValidationError::Multi(MultiError::from(failures)));
            }
        }
        (matched, failed)
    }
}

fn leaf(keyword: &str, reason: impl Into<String>, path: &[PathSegment]) -> ValidationError {
    ValidationError::Schema(SchemaError::new(keyword, reason, path.to_vec()))
}

fn combinator_failure(
    keyword: &'static str,
    reason: &str,
    branches: Vec<ValidationError>,
    path: &[PathSegment],
) -> ValidationError {
    let mismatch = CombinatorMismatch::new(keyword, branches);
    ValidationError::Schema(
        SchemaError::new(keyword, reason, path.to_vec())
            .with_origin(Origin::Wrapped(Box::new(mismatch))),
    )
}

fn matches_type(ty: InstanceType, value: &Value) -> bool {
    match (ty, value) {
        (InstanceType::Integer, Value::Number(n)) => is_integer(n),
        (InstanceType::Number, Value::Number(_))
        | (InstanceType::String, Value::String(_))
        | (InstanceType::Boolean, Value::Bool(_))
        | (InstanceType::Object, Value::Object(_))
        | (InstanceType::Array, Value::Array(_))
        | (InstanceType::Null, Value::Null) => true,
        _ => false,
    }
}

fn is_integer(n: &Number) -> bool {
    n.is_i64() || n.is_u64() || n.as_f64().map_or(false, |f| f.is_finite() && f.fract() == 0.0)
}

fn check_number(schema: &Schema, n: &Number, path: &[PathSegment], errors: &mut Vec<ValidationError>) {
    let Some(x) = n.as_f64() else {
        return;
    };

    let exclusive_min_flag = matches!(schema.exclusive_minimum, Some(ExclusiveBound::Flag(true)));
    if let Some(min) = schema.minimum {
        if exclusive_min_flag && x <= min {
            errors.push(leaf("minimum", format!("number must be more than {min}"), path));
        } else if x < min {
            errors.push(leaf("minimum", format!("number must be at least {min}"), path));
        }
    }
    if let Some(ExclusiveBound::Value(bound)) = schema.exclusive_minimum {
        if x <= bound {
            errors.push(leaf("exclusiveMinimum", format!("number must be more than {bound}"), path));
        }
    }

    let exclusive_max_flag = matches!(schema.exclusive_maximum, Some(ExclusiveBound::Flag(true)));
    if let Some(max) = schema.maximum {
        if exclusive_max_flag && x >= max {
            errors.push(leaf("maximum", format!("number must be less than {max}"), path));
        } else if x > max {
            errors.push(leaf("maximum", format!("number must be at most {max}"), path));
        }
    }
    if let Some(ExclusiveBound::Value(bound)) = schema.exclusive_maximum {
        if x >= bound {
            errors.push(leaf("exclusiveMaximum", format!("number must be less than {bound}"), path));
        }
    }

    if let Some(divisor) = schema.multiple_of {
        if divisor > 0.0 {
            let quotient = x / divisor;
            if (quotient - quotient.round()).abs() > 1e-9 {
                errors.push(leaf(
                    "multipleOf",
                    format!("number must be a multiple of {divisor}"),
                    path,
                ));
            }
        }
    }
}

fn check_string(schema: &Schema, s: &str, path: &[PathSegment], errors: &mut Vec<ValidationError>) {
    let length = s.chars().count();
    if let Some(min) = schema.min_length {
        if length < min {
            errors.push(leaf("minLength", format!("minimum string length is {min}"), path));
        }
    }
    if let Some(max) = schema.max_length {
        if length > max {
            errors.push(leaf("maxLength", format!("maximum string length is {max}"), path));
        }
    }
    if let Some(pattern) = &schema.pattern {
        if !pattern.is_match(s) {
            errors.push(leaf(
                "pattern",
                format!("string doesn't match the regular expression {:?}", pattern.as_str()),
                path,
            ));
        }
    }
    if let Some(name) = &schema.format {
        if format::check(name, s) == FormatCheck::Invalid {
            errors.push(leaf(
                "format",
                format!("string doesn't match the format {name:?}"),
                path,
            ));
        }
    }
}

fn has_duplicates(items: &[Value]) -> bool {
    // Object keys serialize in sorted order, so equal values give equal text
    let mut seen = HashSet::with_capacity(items.len());
    !items.iter().all(|item| seen.insert(item.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn schema(value: Value) -> Schema {
        Schema::from_value(value).expect("test schema should parse")
    }

    fn reasons(errors: &MultiError) -> Vec<String> {
        errors
            .iter()
            .map(|e| match e {
                ValidationError::Schema(s) => s.reason.clone(),
                other => other.to_string(),
            })
            .collect()
    }

    fn only_schema_error(errors: MultiError) -> SchemaError {
        let mut children = errors.into_inner();
        assert_eq!(children.len(), 1, "expected exactly one error");
        match children.remove(0) {
            ValidationError::Schema(s) => s,
            other => panic!("expected schema error, got {other:?}"),
        }
    }

    #[test]
    fn test_type_mismatch_reports_path() {
        let components = Components::new();
        let validator = SchemaValidator::new(&components);
        let s = schema(json!({
            "type": "object",
            "properties": {"age": {"type": "integer"}}
        }));

        let err = validator
            .validate(&s, &json!({"age": "ten"}))
            .expect_err("string is not an integer");
        let err = only_schema_error(err);
        assert_eq!(err.reason, "value must be an integer");
        assert_eq!(err.path, vec![PathSegment::Key("age".into())]);
        assert_eq!(err.keyword, "type");
    }

    #[test]
    fn test_integer_accepts_whole_floats() {
        let components = Components::new();
        let validator = SchemaValidator::new(&components);
        let s = schema(json!({"type": "integer"}));

        assert!(validator.is_valid(&s, &json!(3)));
        assert!(validator.is_valid(&s, &json!(3.0)));
        assert!(!validator.is_valid(&s, &json!(3.5)));
    }

    #[test]
    fn test_collects_every_failure() {
        let components = Components::new();
        let validator = SchemaValidator::new(&components);
        let s = schema(json!({
            "type": "object",
            "required": ["name", "email"],
            "properties": {
                "name": {"type": "string", "minLength": 2},
                "email": {"type": "string", "format": "email"},
                "items": {"type": "array", "items": {"type": "integer", "minimum": 0}}
            },
            "additionalProperties": false
        }));

        let err = validator
            .validate(&s, &json!({"name": "a", "items": [1, 2, -1], "extra": true}))
            .expect_err("several failures");

        let mut found = reasons(&err);
        found.sort();
        assert_eq!(
            found,
            vec![
                "minimum string length is 2",
                "number must be at least 0",
                "property \"email\" is missing",
                "property \"extra\" is unsupported",
            ]
        );
    }

    #[test]
    fn test_nested_item_path() {
        let components = Components::new();
        let validator = SchemaValidator::new(&components);
        let s = schema(json!({
            "type": "object",
            "properties": {"items": {"type": "array", "items": {"type": "integer", "minimum": 0}}}
        }));

        let err = only_schema_error(
            validator
                .validate(&s, &json!({"items": [0, 1, -5]}))
                .expect_err("negative item"),
        );
        assert_eq!(err.path, vec![PathSegment::Key("items".into()), PathSegment::Index(2)]);
    }

    #[test]
    fn test_nullable() {
        let components = Components::new();
        let validator = SchemaValidator::new(&components);

        assert!(validator.is_valid(&schema(json!({"type": "string", "nullable": true})), &Value::Null));
        let err = only_schema_error(
            validator
                .validate(&schema(json!({"type": "string"})), &Value::Null)
                .expect_err("null not allowed"),
        );
        assert_eq!(err.reason, "value must not be null");
    }

    #[test]
    fn test_enum_and_bounds() {
        let components = Components::new();
        let validator = SchemaValidator::new(&components);

        let err = only_schema_error(
            validator
                .validate(&schema(json!({"type": "string", "enum": ["a", "b"]})), &json!("c"))
                .expect_err("not in enum"),
        );
        assert_eq!(err.reason, "value is not one of the allowed values [\"a\",\"b\"]");

        let bounded = schema(json!({"type": "number", "minimum": 1, "maximum": 5, "exclusiveMaximum": true}));
        assert!(validator.is_valid(&bounded, &json!(4.5)));
        assert!(!validator.is_valid(&bounded, &json!(5)));
        assert!(!validator.is_valid(&bounded, &json!(0)));
    }

    #[test]
    fn test_pattern_and_unique_items() {
        let components = Components::new();
        let validator = SchemaValidator::new(&components);

        let err = only_schema_error(
            validator
                .validate(&schema(json!({"type": "string", "pattern": "^[a-z]+$"})), &json!("ABC"))
                .expect_err("pattern mismatch"),
        );
        assert_eq!(err.reason, "string doesn't match the regular expression \"^[a-z]+$\"");

        assert!(!validator.is_valid(
            &schema(json!({"type": "array", "uniqueItems": true})),
            &json!([1, 2, 1])
        ));
    }

    #[test]
    fn test_unique_items_compares_whole_values() {
        assert!(has_duplicates(&[json!({"a": 1, "b": [true]}), json!({"b": [true], "a": 1})]));
        assert!(has_duplicates(&[json!("x"), json!(null), json!("x")]));
        assert!(!has_duplicates(&[json!(1), json!(1.0), json!("1")]));
        assert!(!has_duplicates(&[json!({"a": 1}), json!({"a": 2}), json!([1])]));
        assert!(!has_duplicates(&[]));
    }

    #[test]
    fn test_all_of_declares_children() {
        let components = Components::new();
        let validator = SchemaValidator::new(&components);
        let s = schema(json!({
            "allOf": [
                {"type": "object", "required": ["a"]},
                {"type": "object", "required": ["b"]}
            ]
        }));

        let err = only_schema_error(validator.validate(&s, &json!({})).expect_err("both missing"));
        assert_eq!(err.keyword, "allOf");
        match err.origin {
            Some(Origin::Multi(children)) => assert_eq!(children.len(), 2),
            other => panic!("expected declared multi origin, got {other:?}"),
        }
    }

    #[test]
    fn test_any_of_wraps_branches() {
        let components = Components::new();
        let validator = SchemaValidator::new(&components);
        let s = schema(json!({"anyOf": [{"type": "string"}, {"type": "integer"}]}));

        assert!(validator.is_valid(&s, &json!(3)));

        let err = only_schema_error(validator.validate(&s, &json!(true)).expect_err("no branch"));
        assert_eq!(err.reason, "doesn't match any schema from \"anyOf\"");
        let Some(Origin::Wrapped(wrapped)) = err.origin else {
            panic!("anyOf should wrap its branches");
        };
        let mismatch = wrapped
            .downcast_ref::<CombinatorMismatch>()
            .expect("wrapped error should be a combinator mismatch");
        assert_eq!(mismatch.keyword(), "anyOf");
        assert_eq!(mismatch.branch_count(), 2);
    }

    #[test]
    fn test_one_of_matching_twice_is_a_leaf() {
        let components = Components::new();
        let validator = SchemaValidator::new(&components);
        let s = schema(json!({"oneOf": [{"type": "number"}, {"type": "integer"}]}));

        assert!(validator.is_valid(&s, &json!(1.5)));
        let err = only_schema_error(validator.validate(&s, &json!(2)).expect_err("both match"));
        assert_eq!(err.reason, "value matches more than one schema from \"oneOf\"");
        assert!(err.origin.is_none());
    }

    #[test]
    fn test_not() {
        let components = Components::new();
        let validator = SchemaValidator::new(&components);
        let s = schema(json!({"not": {"type": "string"}}));

        assert!(validator.is_valid(&s, &json!(1)));
        assert!(!validator.is_valid(&s, &json!("x")));
    }

    #[test]
    fn test_references_resolve_through_components() {
        let mut components = Components::new();
        components.insert(
            "Pet".to_string(),
            schema(json!({"type": "object", "required": ["name"]})),
        );
        let validator = SchemaValidator::new(&components);
        let s = schema(json!({"type": "array", "items": {"$ref": "#/components/schemas/Pet"}}));

        assert!(validator.is_valid(&s, &json!([{"name": "rex"}])));
        let err = only_schema_error(validator.validate(&s, &json!([{}])).expect_err("missing name"));
        assert_eq!(err.path, vec![PathSegment::Index(0), PathSegment::Key("name".into())]);
    }

    #[test]
    fn test_self_reference_is_bounded() {
        let mut components = Components::new();
        components.insert("Loop".to_string(), schema(json!({"$ref": "#/components/schemas/Loop"})));
        let validator = SchemaValidator::new(&components);

        let err = only_schema_error(
            validator
                .validate(&schema(json!({"$ref": "#/components/schemas/Loop"})), &json!(1))
                .expect_err("cycle"),
        );
        assert_eq!(err.keyword, "$ref");
    }
}
