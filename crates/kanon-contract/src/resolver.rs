//! Route resolution from HTTP requests.
//!
//! The [`RouteIndex`] maps an incoming method and path to the contract route
//! that serves it, extracting path parameters on the way. It is built once
//! and never mutated, so it can be shared across requests without locking.

use std::borrow::Cow;
use std::collections::HashMap;
use std::sync::Arc;

use regex::Regex;
use tracing::debug;

use crate::error::{ContractError, ContractResult};
use crate::route::{PathParams, RouteDefinition};

/// Result of resolving a request to a route.
#[derive(Debug, Clone)]
pub struct ResolvedRoute {
    /// The matched route.
    pub route: Arc<RouteDefinition>,
    /// Extracted path parameters.
    pub path_params: PathParams,
}

/// Routing table built from a contract.
#[derive(Debug)]
pub struct RouteIndex {
    /// Routes indexed by uppercase HTTP method.
    routes: HashMap<String, Vec<CompiledRoute>>,
}

/// A compiled route for efficient matching.
#[derive(Debug)]
struct CompiledRoute {
    /// Regex for matching paths.
    pattern: Regex,
    /// Parameter names in order.
    param_names: Vec<String>,
    /// The route itself.
    route: Arc<RouteDefinition>,
}

impl RouteIndex {
    /// Builds an index over `routes`.
    pub fn new(routes: impl IntoIterator<Item = Arc<RouteDefinition>>) -> ContractResult<Self> {
        let mut index: HashMap<String, Vec<CompiledRoute>> = HashMap::new();

        for route in routes {
            let (pattern, param_names) = Self::compile_path(&route.path_template)?;
            index
                .entry(route.method.as_str().to_uppercase())
                .or_default()
                .push(CompiledRoute {
                    pattern,
                    param_names,
                    route,
                });
        }

        // Literal routes win over templated ones
        for method_routes in index.values_mut() {
            method_routes.sort_by(|a, b| {
                Self::route_specificity(&a.route.path_template, &b.route.path_template)
            });
        }

        debug!(
            methods = index.len(),
            total_routes = index.values().map(Vec::len).sum::<usize>(),
            "route index initialized"
        );

        Ok(Self { routes: index })
    }

    /// Resolve a request to a route.
    pub fn resolve(&self, method: &str, path: &str) -> ContractResult<ResolvedRoute> {
        let not_found = || ContractError::route_not_found(method, path);
        let routes = self
            .routes
            .get(&method.to_uppercase())
            .ok_or_else(not_found)?;

        routes
            .iter()
            .find_map(|compiled| {
                compiled.pattern.captures(path).map(|captures| {
                    let path_params = compiled
                        .param_names
                        .iter()
                        .enumerate()
                        .filter_map(|(i, name)| {
                            captures
                                .get(i + 1)
                                .map(|value| (name.clone(), decode_segment(value.as_str())))
                        })
                        .collect();
                    ResolvedRoute {
                        route: Arc::clone(&compiled.route),
                        path_params,
                    }
                })
            })
            .ok_or_else(not_found)
    }

    /// Check if a route exists for the given method and path.
    pub fn has_route(&self, method: &str, path: &str) -> bool {
        self.resolve(method, path).is_ok()
    }

    /// Number of routes in the index.
    pub fn len(&self) -> usize {
        self.routes.values().map(Vec::len).sum()
    }

    /// Returns `true` if the index holds no routes.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Get all routes for a specific method.
    pub fn routes_for_method(&self, method: &str) -> Vec<&str> {
        self.routes
            .get(&method.to_uppercase())
            .map(|routes| {
                routes
                    .iter()
                    .map(|r| r.route.path_template.as_str())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Every route, in no particular order.
    pub fn routes(&self) -> impl Iterator<Item = &Arc<RouteDefinition>> {
        self.routes.values().flatten().map(|compiled| &compiled.route)
    }

    fn compile_path(template: &str) -> ContractResult<(Regex, Vec<String>)> {
        if template == "/" {
            let regex = Regex::new("^/$").map_err(|e| ContractError::create_router(e.to_string()))?;
            return Ok((regex, Vec::new()));
        }

        let mut pattern = String::from("^");
        let mut param_names = Vec::new();

        for segment in template.split('/') {
            if segment.is_empty() {
                continue;
            }

            pattern.push('/');

            // A segment may mix literals and parameters, e.g. `{name}.{ext}`
            let mut rest = segment;
            while let Some(start) = rest.find('{') {
                pattern.push_str(&regex::escape(&rest[..start]));
                let Some(len) = rest[start..].find('}') else {
                    return Err(ContractError::create_router(format!(
                        "path {template:?} has unbalanced braces"
                    )));
                };
                param_names.push(rest[start + 1..start + len].to_string());
                pattern.push_str("([^/]+?)");
                rest = &rest[start + len + 1..];
            }
            pattern.push_str(&regex::escape(rest));
        }

        pattern.push_str("/?$");

        let regex = Regex::new(&pattern).map_err(|e| {
            ContractError::create_router(format!("path {template:?} cannot be compiled: {e}"))
        })?;
        Ok((regex, param_names))
    }

    /// Compare route specificity for sorting.
    /// More specific routes (fewer parameters, longer literals) come first.
    fn route_specificity(a: &str, b: &str) -> std::cmp::Ordering {
        let a_params = a.matches('{').count();
        let b_params = b.matches('{').count();

        // Fewer parameters = more specific
        if a_params != b_params {
            return a_params.cmp(&b_params);
        }

        // Longer path = more specific (among same param count)
        b.len().cmp(&a.len())
    }
}

/// Decodes `%XX` escapes in a path segment. Results that are not UTF-8
/// are kept as received.
fn decode_segment(raw: &str) -> String {
    urlencoding::decode(raw).map_or_else(|_| raw.to_string(), Cow::into_owned)
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::Method;
    use indexmap::IndexMap;

    fn route(method: Method, path: &str, id: &str) -> Arc<RouteDefinition> {
        Arc::new(RouteDefinition {
            operation_id: Some(id.to_string()),
            method,
            path_template: path.to_string(),
            parameters: vec![],
            request_body: None,
            responses: IndexMap::new(),
        })
    }

    fn create_test_index() -> RouteIndex {
        RouteIndex::new(vec![
            route(Method::GET, "/users/{userId}", "getUser"),
            route(Method::GET, "/users", "listUsers"),
            route(Method::GET, "/users/me", "getMe"),
            route(Method::POST, "/users", "createUser"),
            route(Method::GET, "/users/{userId}/orders", "getUserOrders"),
            route(Method::GET, "/files/{name}.{ext}", "getFile"),
            route(Method::GET, "/", "root"),
        ])
        .expect("index should build")
    }

    fn operation_id(resolved: &ResolvedRoute) -> &str {
        resolved.route.operation_id.as_deref().unwrap_or_default()
    }

    #[test]
    fn test_resolve_simple_path() {
        let index = create_test_index();

        let resolved = index.resolve("GET", "/users").unwrap();
        assert_eq!(operation_id(&resolved), "listUsers");
        assert!(resolved.path_params.is_empty());
    }

    #[test]
    fn test_resolve_with_path_param() {
        let index = create_test_index();

        let resolved = index.resolve("GET", "/users/123").unwrap();
        assert_eq!(operation_id(&resolved), "getUser");
        assert_eq!(resolved.path_params.get("userId"), Some(&"123".to_string()));
    }

    #[test]
    fn test_literal_beats_template() {
        let index = create_test_index();

        let resolved = index.resolve("GET", "/users/me").unwrap();
        assert_eq!(operation_id(&resolved), "getMe");
    }

    #[test]
    fn test_resolve_nested_path() {
        let index = create_test_index();

        let resolved = index.resolve("GET", "/users/456/orders").unwrap();
        assert_eq!(operation_id(&resolved), "getUserOrders");
        assert_eq!(resolved.path_params.get("userId"), Some(&"456".to_string()));
    }

    #[test]
    fn test_mixed_segment() {
        let index = create_test_index();

        let resolved = index.resolve("GET", "/files/report.final.pdf").unwrap();
        assert_eq!(operation_id(&resolved), "getFile");
        assert_eq!(resolved.path_params["name"], "report");
        assert_eq!(resolved.path_params["ext"], "final.pdf");
    }

    #[test]
    fn test_path_params_are_decoded() {
        let index = create_test_index();

        let resolved = index.resolve("GET", "/users/a%20b").unwrap();
        assert_eq!(resolved.path_params["userId"], "a b");
    }

    #[test]
    fn test_resolve_different_methods() {
        let index = create_test_index();

        assert_eq!(operation_id(&index.resolve("GET", "/users").unwrap()), "listUsers");
        assert_eq!(operation_id(&index.resolve("POST", "/users").unwrap()), "createUser");
    }

    #[test]
    fn test_resolve_not_found() {
        let index = create_test_index();

        let result = index.resolve("GET", "/nonexistent");
        assert!(matches!(result, Err(ContractError::RouteNotFound { .. })));

        let result = index.resolve("DELETE", "/users");
        assert!(matches!(result, Err(ContractError::RouteNotFound { .. })));
    }

    #[test]
    fn test_case_insensitive_method() {
        let index = create_test_index();

        assert!(index.resolve("get", "/users").is_ok());
        assert!(index.resolve("Get", "/users").is_ok());
        assert!(index.resolve("GET", "/users").is_ok());
    }

    #[test]
    fn test_trailing_slash() {
        let index = create_test_index();

        assert!(index.resolve("GET", "/users").is_ok());
        assert!(index.resolve("GET", "/users/").is_ok());
        assert!(index.resolve("GET", "/").is_ok());
    }

    #[test]
    fn test_index_size() {
        let index = create_test_index();
        assert_eq!(index.len(), 7);
        assert!(!index.is_empty());
        assert_eq!(index.routes_for_method("POST"), vec!["/users"]);
    }

    #[test]
    fn test_decode_segment() {
        assert_eq!(decode_segment("plain"), "plain");
        assert_eq!(decode_segment("a%2Fb"), "a/b");
        assert_eq!(decode_segment("caf%C3%A9"), "café");
        assert_eq!(decode_segment("a+b"), "a+b");
        assert_eq!(decode_segment("%FF"), "%FF");
    }
}
