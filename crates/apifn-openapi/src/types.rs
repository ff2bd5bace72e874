//! Data structures for OpenAPI documents and generated function definitions.
//!
//! Decoding is structural and lenient: unknown fields are ignored and missing
//! or `null` fields fall back to their defaults, so a partially filled document
//! still loads.

use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Value, json};

/// Treat an explicit `null` the same as an absent field.
fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Root of an OpenAPI 3.x document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Document {
    /// Version string from the `openapi` field (e.g. "3.0.0")
    #[serde(deserialize_with = "null_as_default")]
    pub openapi: String,
    /// API metadata
    #[serde(deserialize_with = "null_as_default")]
    pub info: Info,
    /// Path template -> path item
    #[serde(deserialize_with = "null_as_default")]
    pub paths: IndexMap<String, PathItem>,
    /// Reusable objects, the resolution target for parameter references
    #[serde(skip_serializing_if = "Option::is_none")]
    pub components: Option<Components>,
}

/// API metadata.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Info {
    #[serde(deserialize_with = "null_as_default")]
    pub title: String,
    #[serde(deserialize_with = "null_as_default")]
    pub description: String,
    #[serde(deserialize_with = "null_as_default")]
    pub version: String,
}

/// Reusable objects. Only parameters are used.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Components {
    #[serde(
        deserialize_with = "null_as_default",
        skip_serializing_if = "IndexMap::is_empty"
    )]
    pub parameters: IndexMap<String, Parameter>,
}

/// The operations available under one path template.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathItem {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub get: Option<Operation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub post: Option<Operation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub put: Option<Operation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delete: Option<Operation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub patch: Option<Operation>,
}

impl PathItem {
    /// Present operations paired with their upper-case HTTP method,
    /// in GET, POST, PUT, DELETE, PATCH order.
    pub fn operations(&self) -> Vec<(&'static str, &Operation)> {
        [
            ("GET", &self.get),
            ("POST", &self.post),
            ("PUT", &self.put),
            ("DELETE", &self.delete),
            ("PATCH", &self.patch),
        ]
        .into_iter()
        .filter_map(|(method, op)| op.as_ref().map(|op| (method, op)))
        .collect()
    }
}

/// One HTTP-method handler under a path.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Operation {
    #[serde(deserialize_with = "null_as_default")]
    pub summary: String,
    #[serde(deserialize_with = "null_as_default")]
    pub description: String,
    #[serde(
        deserialize_with = "null_as_default",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub parameters: Vec<Parameter>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_body: Option<RequestBody>,
}

impl Operation {
    /// Summary, followed by a line break and the description when one is present.
    pub fn composed_description(&self) -> String {
        if self.description.is_empty() {
            self.summary.clone()
        } else {
            format!("{}\n{}", self.summary, self.description)
        }
    }
}

/// Location where a parameter appears in the request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParameterLocation {
    /// Path parameter (e.g., /users/{id})
    Path,
    /// Query parameter (e.g., ?search=value)
    Query,
    /// Header parameter, parsed but never surfaced as an argument
    Header,
    /// Cookie parameter, parsed but never surfaced as an argument
    Cookie,
    /// Missing or unrecognized location, including unresolved reference stubs
    #[default]
    #[serde(other)]
    Other,
}

impl std::fmt::Display for ParameterLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParameterLocation::Path => write!(f, "path"),
            ParameterLocation::Query => write!(f, "query"),
            ParameterLocation::Header => write!(f, "header"),
            ParameterLocation::Cookie => write!(f, "cookie"),
            ParameterLocation::Other => write!(f, "other"),
        }
    }
}

/// A declared operation parameter, or a `$ref` stub pointing at one.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Parameter {
    #[serde(deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(rename = "in", deserialize_with = "null_as_default")]
    pub location: ParameterLocation,
    #[serde(deserialize_with = "null_as_default")]
    pub description: String,
    #[serde(deserialize_with = "null_as_default")]
    pub required: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema: Option<SchemaNode>,
    /// Reference string; when non-empty the other fields are meaningless
    #[serde(
        rename = "$ref",
        deserialize_with = "null_as_default",
        skip_serializing_if = "String::is_empty"
    )]
    pub reference: String,
}

impl Parameter {
    /// A stub that only carries a reference.
    pub fn reference(reference: impl Into<String>) -> Self {
        Self {
            reference: reference.into(),
            ..Default::default()
        }
    }

    /// Whether this parameter is still an unresolved `$ref` stub.
    pub fn is_reference(&self) -> bool {
        !self.reference.is_empty()
    }
}

/// Request body definition keyed by media type.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RequestBody {
    #[serde(deserialize_with = "null_as_default")]
    pub content: IndexMap<String, MediaType>,
}

impl RequestBody {
    /// The schema used for the `requestBody` argument: `application/json` when it
    /// declares one, otherwise the first media type (in document order) that does.
    pub fn preferred_schema(&self) -> Option<&SchemaNode> {
        self.content
            .get("application/json")
            .and_then(|media| media.schema.as_ref())
            .or_else(|| {
                self.content
                    .values()
                    .find_map(|media| media.schema.as_ref())
            })
    }
}

/// Media type entry in a request body.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MediaType {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema: Option<SchemaNode>,
}

/// Recursive JSON-Schema-like node, used for document schemas and for the
/// generated function parameter schemas.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchemaNode {
    #[serde(rename = "type", deserialize_with = "null_as_default")]
    pub schema_type: String,
    #[serde(
        deserialize_with = "null_as_default",
        skip_serializing_if = "String::is_empty"
    )]
    pub format: String,
    #[serde(
        deserialize_with = "null_as_default",
        skip_serializing_if = "String::is_empty"
    )]
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub properties: Option<IndexMap<String, SchemaNode>>,
    #[serde(
        deserialize_with = "null_as_default",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub required: Vec<String>,
}

impl SchemaNode {
    /// A node with only a type set.
    pub fn of_type(schema_type: impl Into<String>) -> Self {
        Self {
            schema_type: schema_type.into(),
            ..Default::default()
        }
    }

    /// An empty `object` node with an (empty) property table.
    pub fn object() -> Self {
        Self {
            schema_type: "object".to_string(),
            properties: Some(IndexMap::new()),
            ..Default::default()
        }
    }
}

/// A model-callable function derived from one operation.
///
/// Only `name`, `description` and `parameters` are serialized; the remaining
/// fields drive request execution.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FunctionDefinition {
    pub name: String,
    pub description: String,
    pub parameters: SchemaNode,
    /// Upper-case HTTP method of the originating operation
    #[serde(skip)]
    pub method: String,
    /// Originating path template (e.g. "/pets/{id}")
    #[serde(skip)]
    pub path: String,
    /// Argument names substituted into the path template
    #[serde(skip)]
    pub path_params: Vec<String>,
    /// Argument names sent as query parameters
    #[serde(skip)]
    pub query_params: Vec<String>,
}

impl FunctionDefinition {
    /// The (name, description, parameters) triple handed to a model provider.
    pub fn tool_schema(&self) -> Value {
        json!({
            "name": self.name,
            "description": self.description,
            "parameters": self.parameters,
        })
    }
}
