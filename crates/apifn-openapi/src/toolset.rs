//! Owned set of function definitions generated from one document.

use crate::converter::convert;
use crate::error::{Error, Result};
use crate::executor::{ApiClient, Arguments, parse_arguments};
use crate::parser::{load_spec, load_spec_file, load_spec_url};
use crate::types::{Document, FunctionDefinition};
use serde_json::Value;
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, info};

/// Function definitions keyed by generated name.
///
/// Built once from a document and read-only afterwards; share it behind an
/// `Arc` to serve concurrent tool calls.
///
/// # Example
///
/// ```no_run
/// use apifn_openapi::{ApiClient, AuthConfig, FunctionSet};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), apifn_openapi::Error> {
/// let functions = FunctionSet::from_file("./api/openapi.yaml")?;
/// let client = ApiClient::new("https://api.example.com", AuthConfig::bearer("token"))?;
///
/// // Register `functions.tool_schemas()` with the model, then dispatch its calls:
/// let result = functions
///     .execute_json(&client, "get_pets_id", r#"{"id": 42}"#)
///     .await?;
/// println!("{result}");
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Default)]
pub struct FunctionSet {
    functions: HashMap<String, FunctionDefinition>,
}

impl FunctionSet {
    /// Convert a loaded document.
    pub fn from_document(doc: &Document) -> Self {
        Self {
            functions: convert(doc),
        }
    }

    /// Decode raw bytes (JSON or YAML) and convert.
    pub fn from_slice(data: &[u8]) -> Result<Self> {
        Ok(Self::from_document(&load_spec(data)?))
    }

    /// Parse a spec string (JSON or YAML) and convert.
    ///
    /// # Example
    ///
    /// ```
    /// use apifn_openapi::FunctionSet;
    ///
    /// let spec = r#"
    /// openapi: 3.0.0
    /// info:
    ///   title: Example API
    ///   version: 1.0.0
    /// paths:
    ///   /users:
    ///     get:
    ///       summary: List all users
    /// "#;
    ///
    /// let functions = FunctionSet::from_str(spec)?;
    /// assert!(functions.get("get_users").is_some());
    /// # Ok::<(), apifn_openapi::Error>(())
    /// ```
    pub fn from_str(content: &str) -> Result<Self> {
        debug!("Parsing OpenAPI spec from string");
        Self::from_slice(content.as_bytes())
    }

    /// Load a spec file and convert.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let set = Self::from_document(&load_spec_file(path)?);
        info!("Generated {} functions", set.len());
        Ok(set)
    }

    /// Fetch a spec over HTTP and convert.
    pub async fn from_url(url: &str) -> Result<Self> {
        let set = Self::from_document(&load_spec_url(url).await?);
        info!("Generated {} functions", set.len());
        Ok(set)
    }

    pub fn get(&self, name: &str) -> Option<&FunctionDefinition> {
        self.functions.get(name)
    }

    /// Function names in sorted order.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.functions.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &FunctionDefinition)> {
        self.functions.iter()
    }

    /// The (name, description, parameters) objects to register with a model,
    /// sorted by name.
    pub fn tool_schemas(&self) -> Vec<Value> {
        self.names()
            .iter()
            .filter_map(|name| self.functions.get(name))
            .map(FunctionDefinition::tool_schema)
            .collect()
    }

    pub fn into_inner(self) -> HashMap<String, FunctionDefinition> {
        self.functions
    }

    /// Execute the named function with a decoded argument map.
    pub async fn execute(&self, client: &ApiClient, name: &str, args: &Arguments) -> Result<Value> {
        let function = self
            .get(name)
            .ok_or_else(|| Error::FunctionNotFound(name.to_string()))?;
        client.execute(function, args).await
    }

    /// Execute the named function with the raw arguments string of a tool call.
    pub async fn execute_json(&self, client: &ApiClient, name: &str, arguments: &str) -> Result<Value> {
        let args = parse_arguments(arguments)?;
        self.execute(client, name, &args).await
    }
}

impl From<HashMap<String, FunctionDefinition>> for FunctionSet {
    fn from(functions: HashMap<String, FunctionDefinition>) -> Self {
        Self { functions }
    }
}
