//! Schema Object model.
//!
//! Covers the subset of the OpenAPI 3.0 / 3.1 Schema Object that request and
//! response validation need. Unknown keywords (`description`, `example`, ...)
//! are accepted and ignored.

use indexmap::IndexMap;
use regex::Regex;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Named schemas, as found under `components.schemas`.
pub type Components = IndexMap<String, Schema>;

/// JSON instance types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InstanceType {
    /// `"string"`
    String,
    /// `"number"`
    Number,
    /// `"integer"`
    Integer,
    /// `"boolean"`
    Boolean,
    /// `"object"`
    Object,
    /// `"array"`
    Array,
    /// `"null"` (3.1 only)
    Null,
}

impl InstanceType {
    /// Lowercase keyword value.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Number => "number",
            Self::Integer => "integer",
            Self::Boolean => "boolean",
            Self::Object => "object",
            Self::Array => "array",
            Self::Null => "null",
        }
    }

    /// Article + name, used in mismatch reasons.
    #[must_use]
    pub const fn described(&self) -> &'static str {
        match self {
            Self::String => "a string",
            Self::Number => "a number",
            Self::Integer => "an integer",
            Self::Boolean => "a boolean",
            Self::Object => "an object",
            Self::Array => "an array",
            Self::Null => "null",
        }
    }
}

/// The `type` keyword: a single type or, in 3.1, a list.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum SchemaType {
    /// `type: integer`
    Single(InstanceType),
    /// `type: [integer, "null"]`
    Many(Vec<InstanceType>),
}

impl SchemaType {
    /// The declared types as a slice.
    #[must_use]
    pub fn types(&self) -> &[InstanceType] {
        match self {
            Self::Single(t) => std::slice::from_ref(t),
            Self::Many(ts) => ts,
        }
    }

    /// Returns `true` if `null` is one of the declared types.
    #[must_use]
    pub fn allows_null(&self) -> bool {
        self.types().contains(&InstanceType::Null)
    }
}

/// `exclusiveMinimum` / `exclusiveMaximum`: a flag in 3.0, a bound in 3.1.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum ExclusiveBound {
    /// 3.0 style, modifies `minimum`/`maximum`.
    Flag(bool),
    /// 3.1 style, a bound of its own.
    Value(f64),
}

/// `additionalProperties`.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum AdditionalProperties {
    /// `true` allows anything, `false` allows nothing.
    Allowed(bool),
    /// Extra properties must match this schema.
    Schema(Box<Schema>),
}

/// A compiled `pattern`.
#[derive(Debug, Clone)]
pub struct Pattern(Regex);

impl Pattern {
    /// Compiles a pattern.
    pub fn new(source: &str) -> Result<Self, regex::Error> {
        Regex::new(source).map(Self)
    }

    /// The pattern source text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    /// Returns `true` if the pattern matches anywhere in `value`.
    #[must_use]
    pub fn is_match(&self, value: &str) -> bool {
        self.0.is_match(value)
    }
}

impl<'de> Deserialize<'de> for Pattern {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let source = String::deserialize(deserializer)?;
        Self::new(&source).map_err(serde::de::Error::custom)
    }
}

/// A Schema Object.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Schema {
    /// `$ref` to a named schema.
    #[serde(rename = "$ref")]
    pub reference: Option<String>,

    /// Declared type(s).
    #[serde(rename = "type")]
    pub schema_type: Option<SchemaType>,
    /// `format`, e.g. `uuid` or `date-time`.
    pub format: Option<String>,
    /// 3.0 `nullable`.
    #[serde(default)]
    pub nullable: bool,
    /// Allowed values.
    #[serde(rename = "enum")]
    pub enumeration: Option<Vec<Value>>,
    /// Single allowed value (3.1).
    #[serde(rename = "const")]
    pub constant: Option<Value>,

    /// Inclusive lower bound.
    pub minimum: Option<f64>,
    /// Inclusive upper bound.
    pub maximum: Option<f64>,
    /// Exclusive lower bound.
    pub exclusive_minimum: Option<ExclusiveBound>,
    /// Exclusive upper bound.
    pub exclusive_maximum: Option<ExclusiveBound>,
    /// The value must be a multiple of this.
    pub multiple_of: Option<f64>,

    /// Minimum string length in characters.
    pub min_length: Option<usize>,
    /// Maximum string length in characters.
    pub max_length: Option<usize>,
    /// Regular expression the string must match.
    pub pattern: Option<Pattern>,

    /// Item schema.
    pub items: Option<Box<Schema>>,
    /// Minimum array length.
    pub min_items: Option<usize>,
    /// Maximum array length.
    pub max_items: Option<usize>,
    /// Items must be pairwise distinct.
    #[serde(default)]
    pub unique_items: bool,

    /// Property schemas.
    #[serde(default)]
    pub properties: IndexMap<String, Schema>,
    /// Required property names.
    #[serde(default)]
    pub required: Vec<String>,
    /// Rule for properties not listed in `properties`.
    pub additional_properties: Option<AdditionalProperties>,
    /// Minimum number of properties.
    pub min_properties: Option<usize>,
    /// Maximum number of properties.
    pub max_properties: Option<usize>,

    /// All of these must match.
    #[serde(default)]
    pub all_of: Vec<Schema>,
    /// At least one of these must match.
    #[serde(default)]
    pub any_of: Vec<Schema>,
    /// Exactly one of these must match.
    #[serde(default)]
    pub one_of: Vec<Schema>,
    /// This must not match.
    pub not: Option<Box<Schema>>,
}

impl Schema {
    /// Parses a schema from JSON.
    pub fn from_value(value: Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(value)
    }

    /// Returns `true` if `null` is an acceptable value.
    #[must_use]
    pub fn accepts_null(&self) -> bool {
        self.nullable
            || self
                .schema_type
                .as_ref()
                .map_or(false, SchemaType::allows_null)
    }

    /// Every `$ref` in this schema and its subschemas.
    #[must_use]
    pub fn references(&self) -> Vec<&str> {
        let mut refs = Vec::new();
        self.collect_references(&mut refs);
        refs
    }

    fn collect_references<'a>(&'a self, refs: &mut Vec<&'a str>) {
        if let Some(reference) = &self.reference {
            refs.push(reference);
        }
        let children = self
            .properties
            .values()
            .chain(self.items.as_deref())
            .chain(self.not.as_deref())
            .chain(&self.all_of)
            .chain(&self.any_of)
            .chain(&self.one_of);
        for child in children {
            child.collect_references(refs);
        }
        if let Some(AdditionalProperties::Schema(extra)) = &self.additional_properties {
            extra.collect_references(refs);
        }
    }
}

/// Prefix of local component references.
pub const COMPONENT_REF_PREFIX: &str = "#/components/schemas/";

/// Returns the component name a local `$ref` points to.
#[must_use]
pub fn component_name(reference: &str) -> Option<&str> {
    reference.strip_prefix(COMPONENT_REF_PREFIX)
}
