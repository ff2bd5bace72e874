//! Error types for spec loading, conversion and request execution.

use thiserror::Error;

/// Result type for this crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by the loader, executor and authenticated transport.
///
/// Conversion itself is infallible; unresolved references and unknown
/// parameter locations degrade silently instead of producing an error.
#[derive(Error, Debug)]
pub enum Error {
    /// Document failed to decode as JSON
    #[error("JSON decode error: {0}")]
    Json(#[source] serde_json::Error),

    /// Document failed to decode as YAML (also reported when auto-detection fails)
    #[error("YAML decode error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// IO error while reading a spec or config file
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP transport failure
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// URL parsing error
    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    /// Response body was not valid JSON
    #[error("Failed to decode response body: {0}")]
    Decode(#[source] serde_json::Error),

    /// Request body could not be serialized
    #[error("Failed to encode request body: {0}")]
    Encode(#[source] serde_json::Error),

    /// Tool-call arguments were not a JSON object
    #[error("Invalid function arguments: {0}")]
    InvalidArguments(String),

    /// Stored HTTP method is not a valid method token
    #[error("Invalid HTTP method: {0}")]
    InvalidMethod(String),

    /// Missing or unusable authentication material
    #[error("Authentication error: {0}")]
    Auth(String),

    /// Auth type string does not name a supported strategy
    #[error("unsupported auth type: {0}")]
    UnsupportedAuthType(String),

    /// No function with this name in the set
    #[error("Function '{0}' not found")]
    FunctionNotFound(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Helper for creating authentication errors
    pub fn auth_error(msg: impl Into<String>) -> Self {
        Error::Auth(msg.into())
    }

    /// Helper for creating configuration errors
    pub fn config_error(msg: impl Into<String>) -> Self {
        Error::Config(msg.into())
    }
}
