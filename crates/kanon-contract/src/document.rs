//! OpenAPI 3.x document model.
//!
//! Only the parts needed to build routes are modelled. Everything else in the
//! document is ignored during deserialization.

use indexmap::IndexMap;
use kanon_schema::{Components as SchemaComponents, Schema};
use serde::Deserialize;

/// Top-level OpenAPI document.
#[derive(Debug, Clone, Deserialize)]
pub struct OpenApiDocument {
    /// `openapi` version string, e.g. `3.0.3`.
    pub openapi: String,
    /// Document metadata.
    #[serde(default)]
    pub info: Info,
    /// Path items keyed by path template.
    #[serde(default)]
    pub paths: IndexMap<String, PathItem>,
    /// Reusable objects.
    #[serde(default)]
    pub components: Components,
}

/// `info` object.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Info {
    /// API title.
    #[serde(default)]
    pub title: String,
    /// API version.
    #[serde(default)]
    pub version: String,
}

/// Either an inline object or a `$ref` to one under `components`.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RefOr<T> {
    /// `{"$ref": "#/components/..."}`
    Ref {
        /// Reference target.
        #[serde(rename = "$ref")]
        reference: String,
    },
    /// Inline object.
    Item(T),
}

/// `components` object.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Components {
    /// Named schemas.
    #[serde(default)]
    pub schemas: SchemaComponents,
    /// Named parameters.
    #[serde(default)]
    pub parameters: IndexMap<String, Parameter>,
    /// Named request bodies.
    #[serde(default)]
    pub request_bodies: IndexMap<String, RequestBody>,
    /// Named responses.
    #[serde(default)]
    pub responses: IndexMap<String, Response>,
}

/// A path item: operations sharing one path template.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PathItem {
    /// Parameters shared by every operation on this path.
    #[serde(default)]
    pub parameters: Vec<RefOr<Parameter>>,
    /// `GET` operation.
    pub get: Option<Operation>,
    /// `PUT` operation.
    pub put: Option<Operation>,
    /// `POST` operation.
    pub post: Option<Operation>,
    /// `DELETE` operation.
    pub delete: Option<Operation>,
    /// `OPTIONS` operation.
    pub options: Option<Operation>,
    /// `HEAD` operation.
    pub head: Option<Operation>,
    /// `PATCH` operation.
    pub patch: Option<Operation>,
    /// `TRACE` operation.
    pub trace: Option<Operation>,
}

impl PathItem {
    /// Declared operations with their uppercase method names.
    pub fn operations(&self) -> impl Iterator<Item = (&'static str, &Operation)> {
        [
            ("GET", &self.get),
            ("PUT", &self.put),
            ("POST", &self.post),
            ("DELETE", &self.delete),
            ("OPTIONS", &self.options),
            ("HEAD", &self.head),
            ("PATCH", &self.patch),
            ("TRACE", &self.trace),
        ]
        .into_iter()
        .filter_map(|(method, op)| op.as_ref().map(|op| (method, op)))
    }
}

/// An operation on a path.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Operation {
    /// Unique operation identifier.
    pub operation_id: Option<String>,
    /// Operation-level parameters; these override path-level ones.
    #[serde(default)]
    pub parameters: Vec<RefOr<Parameter>>,
    /// Request body definition.
    pub request_body: Option<RefOr<RequestBody>>,
    /// Responses keyed by status code, `NXX` range, or `default`.
    #[serde(default)]
    pub responses: IndexMap<String, RefOr<Response>>,
}

/// Where a parameter lives, as spelled in the document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParameterIn {
    /// `in: query`
    Query,
    /// `in: path`
    Path,
    /// `in: header`
    Header,
    /// `in: cookie`
    Cookie,
}

/// A parameter definition.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Parameter {
    /// Parameter name.
    pub name: String,
    /// Location.
    #[serde(rename = "in")]
    pub location: ParameterIn,
    /// Whether the parameter must be present.
    #[serde(default)]
    pub required: bool,
    /// Serialization style, e.g. `form` or `simple`.
    pub style: Option<String>,
    /// Whether arrays are sent as repeated values.
    pub explode: Option<bool>,
    /// Value schema.
    pub schema: Option<Schema>,
}

/// A request body definition.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RequestBody {
    /// Whether a body must be sent.
    #[serde(default)]
    pub required: bool,
    /// Accepted media types.
    #[serde(default)]
    pub content: IndexMap<String, MediaType>,
}

/// A response definition.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Response {
    /// Human-readable description.
    #[serde(default)]
    pub description: String,
    /// Produced media types.
    #[serde(default)]
    pub content: IndexMap<String, MediaType>,
}

/// A media type entry.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MediaType {
    /// Body schema.
    pub schema: Option<Schema>,
}
