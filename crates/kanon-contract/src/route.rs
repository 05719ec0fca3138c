//! Route definitions built from a contract.
//!
//! A [`RouteDefinition`] is one operation with every `$ref` to parameters,
//! request bodies and responses already resolved. Schema `$ref`s are kept and
//! resolved at validation time against the contract's components.

use std::collections::HashMap;

use http::Method;
use indexmap::IndexMap;
use kanon_schema::{ParameterLocation, ParameterLocator, Schema};

/// Path parameter values extracted by the resolver.
pub type PathParams = HashMap<String, String>;

/// A resolved operation.
#[derive(Debug, Clone)]
pub struct RouteDefinition {
    /// `operationId`, if the contract declares one.
    pub operation_id: Option<String>,
    /// HTTP method.
    pub method: Method,
    /// Path template, e.g. `/users/{id}`.
    pub path_template: String,
    /// Path-level and operation-level parameters, merged.
    pub parameters: Vec<ParameterDefinition>,
    /// Request body, if any.
    pub request_body: Option<RequestBodyDefinition>,
    /// Responses keyed by status code, `NXX` range, or `default`.
    pub responses: IndexMap<String, ResponseDefinition>,
}

impl RouteDefinition {
    /// A short label for logs: the operation id, or `METHOD template`.
    #[must_use]
    pub fn label(&self) -> String {
        match &self.operation_id {
            Some(id) => id.clone(),
            None => format!("{} {}", self.method, self.path_template),
        }
    }

    /// Looks up the response definition for a status code.
    ///
    /// Tries the exact code, then the `NXX` range, then `default`.
    #[must_use]
    pub fn response_for(&self, status: u16) -> Option<&ResponseDefinition> {
        let exact = status.to_string();
        if let Some(def) = self.responses.get(&exact) {
            return Some(def);
        }
        let class = status / 100;
        let range_upper = format!("{class}XX");
        let range_lower = format!("{class}xx");
        self.responses
            .get(&range_upper)
            .or_else(|| self.responses.get(&range_lower))
            .or_else(|| self.responses.get("default"))
    }
}

/// A parameter the route accepts.
#[derive(Debug, Clone)]
pub struct ParameterDefinition {
    /// Parameter name.
    pub name: String,
    /// Where it lives.
    pub location: ParameterLocation,
    /// Whether it must be present.
    pub required: bool,
    /// Whether array values arrive as repeated keys.
    pub explode: bool,
    /// Value schema.
    pub schema: Option<Schema>,
}

impl ParameterDefinition {
    /// The locator used in error reports.
    #[must_use]
    pub fn locator(&self) -> ParameterLocator {
        ParameterLocator::new(self.location, self.name.clone())
    }
}

/// A request body the route accepts.
#[derive(Debug, Clone, Default)]
pub struct RequestBodyDefinition {
    /// Whether a body must be sent.
    pub required: bool,
    /// Schemas keyed by media type.
    pub content: IndexMap<String, Option<Schema>>,
}

/// A response the route may produce.
#[derive(Debug, Clone, Default)]
pub struct ResponseDefinition {
    /// Schemas keyed by media type.
    pub content: IndexMap<String, Option<Schema>>,
}

/// Finds the declared media type matching a `Content-Type` value.
///
/// Parameters such as `charset` are ignored. Tries an exact match, then
/// `type/*`, then `*/*`.
pub(crate) fn match_media_type<'a>(
    content: &'a IndexMap<String, Option<Schema>>,
    content_type: &str,
) -> Option<(&'a str, Option<&'a Schema>)> {
    let essence = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    let wildcard = essence
        .split_once('/')
        .map(|(kind, _)| format!("{kind}/*"))
        .unwrap_or_default();

    // Bound so the borrows of `essence` and `wildcard` end before they drop
    #[allow(clippy::let_and_return)]
    let matched = [essence.as_str(), wildcard.as_str(), "*/*"]
        .into_iter()
        .filter(|candidate| !candidate.is_empty())
        .find_map(|candidate| {
            content
                .iter()
                .find(|(declared, _)| declared.eq_ignore_ascii_case(candidate))
        })
        .map(|(declared, schema)| (declared.as_str(), schema.as_ref()));
    matched
}

/// Returns `true` for `application/json` and `+json` media types.
pub(crate) fn is_json_media_type(media_type: &str) -> bool {
    let essence = media_type.split(';').next().unwrap_or_default().trim();
    essence.eq_ignore_ascii_case("application/json")
        || essence.to_ascii_lowercase().ends_with("+json")
}
