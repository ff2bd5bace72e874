//! OpenAPI document loading.
//!
//! Documents are decoded structurally into [`Document`]; there is no separate
//! validation pass.

use crate::error::{Error, Result};
use crate::types::Document;
use std::path::Path;
use tracing::{debug, info};

/// Decode a document, detecting the format.
///
/// JSON is tried first and YAML second. When both fail the YAML error is
/// returned; call [`load_from_json`] for the JSON diagnostic.
pub fn load_spec(data: &[u8]) -> Result<Document> {
    match serde_json::from_slice(data) {
        Ok(doc) => {
            debug!("Decoded OpenAPI document as JSON");
            Ok(doc)
        }
        Err(json_err) => {
            debug!("JSON decode failed ({}), trying YAML", json_err);
            load_from_yaml(data)
        }
    }
}

/// Decode a JSON document.
pub fn load_from_json(data: &[u8]) -> Result<Document> {
    serde_json::from_slice(data).map_err(Error::Json)
}

/// Decode a YAML document.
pub fn load_from_yaml(data: &[u8]) -> Result<Document> {
    Ok(serde_yaml::from_slice(data)?)
}

/// Read a document from disk, detecting the format.
pub fn load_spec_file(path: impl AsRef<Path>) -> Result<Document> {
    let path = path.as_ref();
    info!("Loading OpenAPI spec from file: {}", path.display());
    let data = std::fs::read(path)?;
    load_spec(&data)
}

/// Fetch a document over HTTP, detecting the format.
pub async fn load_spec_url(url: &str) -> Result<Document> {
    info!("Loading OpenAPI spec from URL: {}", url);
    let response = reqwest::get(url).await?.error_for_status()?;
    let data = response.bytes().await?;
    load_spec(&data)
}
