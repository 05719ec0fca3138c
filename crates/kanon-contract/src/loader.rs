//! Contract loading.
//!
//! [`ContractLoader`] reads an OpenAPI 3.x document, resolves component
//! references and produces a [`Contract`] ready to serve requests. Any
//! failure here is fatal: the service must not start with a broken contract.

use std::collections::HashSet;
use std::path::Path;

use http::Method;
use indexmap::IndexMap;
use kanon_schema::{component_name, ParameterLocation, Schema, COMPONENT_REF_PREFIX};
use tokio::fs;
use tracing::{debug, info};

use crate::document::{
    Components, MediaType, OpenApiDocument, Parameter, ParameterIn, RefOr, RequestBody, Response,
};
use crate::error::{ContractError, ContractResult};
use crate::route::{ParameterDefinition, RequestBodyDefinition, ResponseDefinition, RouteDefinition};
use crate::Contract;

/// Serialization of a contract document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    /// JSON.
    Json,
    /// YAML.
    Yaml,
}

impl DocumentFormat {
    /// Picks the format from a file extension. Anything that is not `.json`
    /// is read as YAML, which also accepts JSON.
    #[must_use]
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => Self::Json,
            _ => Self::Yaml,
        }
    }
}

/// Loads contracts from files or strings.
pub struct ContractLoader;

impl ContractLoader {
    /// Load a contract from a file.
    pub async fn from_file(path: impl AsRef<Path>) -> ContractResult<Contract> {
        let path = path.as_ref();
        info!(path = %path.display(), "loading contract from file");

        let content = fs::read_to_string(path)
            .await
            .map_err(|source| ContractError::Io {
                path: path.to_path_buf(),
                source,
            })?;

        Self::from_str(&content, DocumentFormat::from_path(path))
    }

    /// Load a contract from a string.
    pub fn from_str(content: &str, format: DocumentFormat) -> ContractResult<Contract> {
        let document: OpenApiDocument = match format {
            DocumentFormat::Json => serde_json::from_str(content)
                .map_err(|e| ContractError::load_spec(format!("invalid JSON document: {e}")))?,
            DocumentFormat::Yaml => serde_yaml::from_str(content)
                .map_err(|e| ContractError::load_spec(format!("invalid YAML document: {e}")))?,
        };

        Self::from_document(document)
    }

    /// Build a contract from a parsed document.
    pub fn from_document(document: OpenApiDocument) -> ContractResult<Contract> {
        if !document.openapi.starts_with("3.") {
            return Err(ContractError::load_spec(format!(
                "unsupported openapi version {:?}, expected 3.x",
                document.openapi
            )));
        }

        let mut routes = Vec::new();
        let mut operation_ids = HashSet::new();

        for (template, item) in &document.paths {
            check_template(template)?;

            let shared = item
                .parameters
                .iter()
                .map(|p| resolve_parameter(p, &document.components))
                .collect::<ContractResult<Vec<_>>>()?;

            for (method, operation) in item.operations() {
                if let Some(id) = &operation.operation_id {
                    if !operation_ids.insert(id.clone()) {
                        return Err(ContractError::create_router(format!(
                            "duplicate operationId {id:?}"
                        )));
                    }
                }

                let own = operation
                    .parameters
                    .iter()
                    .map(|p| resolve_parameter(p, &document.components))
                    .collect::<ContractResult<Vec<_>>>()?;

                let request_body = operation
                    .request_body
                    .as_ref()
                    .map(|body| resolve_request_body(body, &document.components))
                    .transpose()?;

                let responses = operation
                    .responses
                    .iter()
                    .map(|(status, response)| {
                        resolve_response(response, &document.components)
                            .map(|def| (status.clone(), def))
                    })
                    .collect::<ContractResult<IndexMap<_, _>>>()?;

                let method = Method::from_bytes(method.as_bytes())
                    .map_err(|e| ContractError::create_router(e.to_string()))?;

                routes.push(RouteDefinition {
                    operation_id: operation.operation_id.clone(),
                    method,
                    path_template: template.clone(),
                    parameters: merge_parameters(&shared, own),
                    request_body,
                    responses,
                });
            }
        }

        check_schema_references(&routes, &document.components)?;

        debug!(
            title = %document.info.title,
            version = %document.info.version,
            routes = routes.len(),
            schemas = document.components.schemas.len(),
            "contract built"
        );

        Contract::new(document.info, document.components.schemas, routes)
    }
}

fn check_template(template: &str) -> ContractResult<()> {
    if !template.starts_with('/') {
        return Err(ContractError::create_router(format!(
            "path {template:?} must start with '/'"
        )));
    }
    let mut open = false;
    for c in template.chars() {
        let balanced = match c {
            '{' => !std::mem::replace(&mut open, true),
            '}' => std::mem::replace(&mut open, false),
            '/' => !open,
            _ => true,
        };
        if !balanced {
            open = true;
            break;
        }
    }
    if open {
        return Err(ContractError::create_router(format!(
            "path {template:?} has unbalanced braces"
        )));
    }
    Ok(())
}

fn lookup<'a, T>(
    item: &'a RefOr<T>,
    prefix: &str,
    registry: &'a IndexMap<String, T>,
) -> ContractResult<&'a T> {
    match item {
        RefOr::Item(value) => Ok(value),
        RefOr::Ref { reference } => reference
            .strip_prefix(prefix)
            .and_then(|name| registry.get(name))
            .ok_or_else(|| {
                ContractError::create_router(format!("unresolved reference {reference:?}"))
            }),
    }
}

fn resolve_parameter(
    item: &RefOr<Parameter>,
    components: &Components,
) -> ContractResult<ParameterDefinition> {
    let param = lookup(item, "#/components/parameters/", &components.parameters)?;
    let location = match param.location {
        ParameterIn::Query => ParameterLocation::Query,
        ParameterIn::Path => ParameterLocation::Path,
        ParameterIn::Header => ParameterLocation::Header,
        ParameterIn::Cookie => ParameterLocation::Cookie,
    };
    // form style (query, cookie) explodes by default, simple style does not
    let default_explode = matches!(location, ParameterLocation::Query | ParameterLocation::Cookie)
        && param.style.as_deref().map_or(true, |style| style == "form");

    Ok(ParameterDefinition {
        name: param.name.clone(),
        location,
        required: param.required || location == ParameterLocation::Path,
        explode: param.explode.unwrap_or(default_explode),
        schema: param.schema.clone(),
    })
}

fn content_schemas(content: &IndexMap<String, MediaType>) -> IndexMap<String, Option<Schema>> {
    content
        .iter()
        .map(|(media, entry)| (media.clone(), entry.schema.clone()))
        .collect()
}

fn resolve_request_body(
    item: &RefOr<RequestBody>,
    components: &Components,
) -> ContractResult<RequestBodyDefinition> {
    let body = lookup(item, "#/components/requestBodies/", &components.request_bodies)?;
    Ok(RequestBodyDefinition {
        required: body.required,
        content: content_schemas(&body.content),
    })
}

fn resolve_response(
    item: &RefOr<Response>,
    components: &Components,
) -> ContractResult<ResponseDefinition> {
    let response = lookup(item, "#/components/responses/", &components.responses)?;
    Ok(ResponseDefinition {
        content: content_schemas(&response.content),
    })
}

/// Operation parameters replace path-level ones with the same name and location.
fn merge_parameters(
    shared: &[ParameterDefinition],
    own: Vec<ParameterDefinition>,
) -> Vec<ParameterDefinition> {
    let mut merged: Vec<ParameterDefinition> = shared
        .iter()
        .filter(|s| {
            !own
                .iter()
                .any(|o| o.name == s.name && o.location == s.location)
        })
        .cloned()
        .collect();
    merged.extend(own);
    merged
}

fn check_schema_references(
    routes: &[RouteDefinition],
    components: &Components,
) -> ContractResult<()> {
    let route_schemas = routes.iter().flat_map(|route| {
        let params = route.parameters.iter().filter_map(|p| p.schema.as_ref());
        let body = route
            .request_body
            .iter()
            .flat_map(|b| b.content.values().flatten());
        let responses = route
            .responses
            .values()
            .flat_map(|r| r.content.values().flatten());
        params.chain(body).chain(responses)
    });

    for schema in route_schemas.chain(components.schemas.values()) {
        for reference in schema.references() {
            let known = component_name(reference)
                .map_or(false, |name| components.schemas.contains_key(name));
            if !known {
                return Err(ContractError::create_router(format!(
                    "unresolved schema reference {reference:?}, only {COMPONENT_REF_PREFIX}* is supported"
                )));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const PETS_YAML: &str = r##"
openapi: 3.0.3
info:
  title: Pets
  version: 1.0.0
paths:
  /pets:
    post:
      operationId: createPet
      requestBody:
        required: true
        content:
          application/json:
            schema:
              $ref: "#/components/schemas/Pet"
      responses:
        "201":
          $ref: "#/components/responses/PetCreated"
  /pets/{petId}:
    parameters:
      - name: petId
        in: path
        schema:
          type: integer
      - name: verbose
        in: query
        schema:
          type: boolean
    get:
      operationId: getPet
      parameters:
        - name: verbose
          in: query
          required: true
          schema:
            type: string
      responses:
        "200":
          description: ok
components:
  schemas:
    Pet:
      type: object
      required: [name]
      properties:
        name:
          type: string
  responses:
    PetCreated:
      description: created
      content:
        application/json:
          schema:
            $ref: "#/components/schemas/Pet"
"##;

    #[test]
    fn test_format_from_path() {
        assert_eq!(DocumentFormat::from_path(Path::new("api.json")), DocumentFormat::Json);
        assert_eq!(DocumentFormat::from_path(Path::new("api.yaml")), DocumentFormat::Yaml);
        assert_eq!(DocumentFormat::from_path(Path::new("api.yml")), DocumentFormat::Yaml);
    }

    #[test]
    fn test_load_yaml_document() {
        let contract = ContractLoader::from_str(PETS_YAML, DocumentFormat::Yaml)
            .expect("contract should load");

        assert_eq!(contract.title(), "Pets");
        assert_eq!(contract.route_count(), 2);

        let create = contract.resolve("POST", "/pets").expect("route exists");
        let body = create.route.request_body.as_ref().expect("body declared");
        assert!(body.required);
        assert!(create.route.responses["201"].content.contains_key("application/json"));
    }

    #[test]
    fn test_operation_parameters_override_path_parameters() {
        let contract = ContractLoader::from_str(PETS_YAML, DocumentFormat::Yaml)
            .expect("contract should load");
        let resolved = contract.resolve("GET", "/pets/7").expect("route exists");

        let params = &resolved.route.parameters;
        assert_eq!(params.len(), 2);
        let pet_id = params.iter().find(|p| p.name == "petId").expect("petId");
        assert!(pet_id.required, "path parameters are always required");
        let verbose = params.iter().find(|p| p.name == "verbose").expect("verbose");
        assert!(verbose.required);
        assert!(verbose.explode);
    }

    #[test]
    fn test_rejects_unsupported_version() {
        let result = ContractLoader::from_str(
            r#"{"openapi": "2.0", "paths": {}}"#,
            DocumentFormat::Json,
        );
        assert!(matches!(result, Err(ContractError::LoadSpec { .. })));
    }

    #[test]
    fn test_rejects_malformed_document() {
        let result = ContractLoader::from_str("openapi: [", DocumentFormat::Yaml);
        assert!(matches!(result, Err(ContractError::LoadSpec { .. })));
    }

    #[test]
    fn test_rejects_dangling_schema_reference() {
        let doc = r##"{
            "openapi": "3.0.0",
            "paths": {
                "/x": {"post": {
                    "requestBody": {"content": {"application/json": {"schema": {"$ref": "#/components/schemas/Missing"}}}},
                    "responses": {}
                }}
            }
        }"##;
        let result = ContractLoader::from_str(doc, DocumentFormat::Json);
        assert!(matches!(result, Err(ContractError::CreateRouter { .. })));
    }

    #[test]
    fn test_rejects_unbalanced_template() {
        let doc = r#"{"openapi": "3.0.0", "paths": {"/x/{id": {"get": {"responses": {}}}}}"#;
        let result = ContractLoader::from_str(doc, DocumentFormat::Json);
        assert!(matches!(result, Err(ContractError::CreateRouter { .. })));
    }

    #[test]
    fn test_rejects_duplicate_operation_ids() {
        let doc = r#"{"openapi": "3.0.0", "paths": {
            "/a": {"get": {"operationId": "same", "responses": {}}},
            "/b": {"get": {"operationId": "same", "responses": {}}}
        }}"#;
        let result = ContractLoader::from_str(doc, DocumentFormat::Json);
        assert!(matches!(result, Err(ContractError::CreateRouter { .. })));
    }

    #[tokio::test]
    async fn test_from_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("pets.yaml");
        std::fs::write(&path, PETS_YAML).expect("write contract");

        let contract = ContractLoader::from_file(&path).await.expect("load from file");
        assert_eq!(contract.route_count(), 2);

        let missing = ContractLoader::from_file(dir.path().join("missing.yaml")).await;
        assert!(matches!(missing, Err(ContractError::Io { .. })));
    }
}
