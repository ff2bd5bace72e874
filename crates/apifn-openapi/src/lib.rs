//! # apifn OpenAPI function bridge
//!
//! Turns an OpenAPI 3.x document into flat, JSON-Schema-shaped function
//! definitions for LLM function calling, and executes the model's tool calls
//! as HTTP requests against the described API.
//!
//! ## Features
//!
//! - Load OpenAPI documents from JSON or YAML, with format auto-detection
//! - Resolve same-document `#/components/parameters/...` references
//! - Generate one function per path and method, merging path, query and body
//!   arguments into a single parameter schema
//! - Rebuild and send the HTTP request from a flat argument map
//! - Authentication: basic, API key (header or cookie), bearer, OAuth2 with
//!   refresh, and fixed cookies
//!
//! ## Example
//!
//! ```no_run
//! use apifn_openapi::{ApiClient, AuthConfig, FunctionSet};
//! use std::env;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let functions = FunctionSet::from_file("./api/openapi.yaml")?;
//! let client = ApiClient::new(
//!     "https://api.example.com",
//!     AuthConfig::api_key_header("X-API-Key", env::var("API_KEY")?),
//! )?;
//!
//! // Hand these to the model provider as tool definitions.
//! let tools = functions.tool_schemas();
//! println!("Generated {} functions", tools.len());
//!
//! // Dispatch a tool call returned by the model.
//! let result = functions
//!     .execute_json(&client, "get_pets_id", r#"{"id": 42}"#)
//!     .await?;
//! println!("{result}");
//! # Ok(())
//! # }
//! ```

mod auth;
mod config;
mod converter;
mod error;
mod executor;
mod oauth;
mod parser;
mod resolver;
mod toolset;
mod transport;
mod types;

pub use auth::{AuthConfig, AuthType, Cookie};
pub use config::{AuthSettings, ClientConfig};
pub use converter::{REQUEST_BODY_ARG, convert, generate_name};
pub use error::{Error, Result};
pub use executor::{ApiClient, Arguments, parse_arguments};
pub use oauth::{RefreshTokenSource, StaticTokenSource, Token, TokenSource};
pub use parser::{load_from_json, load_from_yaml, load_spec, load_spec_file, load_spec_url};
pub use resolver::resolve;
pub use toolset::FunctionSet;
pub use transport::{AuthTransport, ClientOptions};
pub use types::{
    Components, Document, FunctionDefinition, Info, MediaType, Operation, Parameter,
    ParameterLocation, PathItem, RequestBody, SchemaNode,
};
