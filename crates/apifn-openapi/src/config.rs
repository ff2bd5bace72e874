//! Client configuration.
//!
//! Loaded from TOML. String values of the form `${VAR_NAME}` are replaced
//! with the environment variable's value; a reference to an unset variable
//! clears the field.
//!
//! ```toml
//! base_url = "https://api.example.com/v1"
//! spec = "openapi.yaml"
//! timeout_secs = 30
//!
//! [auth]
//! type = "bearer"
//! token = "${API_TOKEN}"
//! ```

use crate::auth::{AuthConfig, AuthType, Cookie};
use crate::error::{Error, Result};
use crate::executor::ApiClient;
use crate::oauth::{RefreshTokenSource, TokenSource};
use crate::toolset::FunctionSet;
use crate::transport::ClientOptions;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

/// Client configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Base URL that function path templates are joined to
    pub base_url: String,

    /// Path to the OpenAPI document, relative paths resolved against the config file
    #[serde(default)]
    pub spec: Option<PathBuf>,

    /// Client-wide request timeout
    #[serde(default)]
    pub timeout_secs: Option<u64>,

    #[serde(default)]
    pub user_agent: Option<String>,

    #[serde(default)]
    pub auth: AuthSettings,
}

/// Authentication settings. Which fields are read depends on `type`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthSettings {
    /// none | basic | apikey-header | apikey-cookie | bearer | oauth2 | cookie
    #[serde(rename = "type")]
    pub auth_type: String,

    pub username: Option<String>,
    pub password: Option<String>,

    /// Header or cookie name for API key auth
    pub api_key_name: Option<String>,
    pub api_key_value: Option<String>,

    /// Bearer token, or the static OAuth2 access token
    pub token: Option<String>,

    /// Cookie name -> value
    pub cookies: IndexMap<String, String>,

    // OAuth2 refresh grant
    pub token_url: Option<String>,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub refresh_token: Option<String>,
}

impl ClientConfig {
    /// Load configuration from a TOML file.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        tracing::debug!("Loading configuration from: {:?}", path);

        let contents = fs::read_to_string(path)?;
        let mut config = Self::from_toml_str(&contents)?;

        if let (Some(spec), Some(dir)) = (config.spec.as_ref(), path.parent()) {
            if spec.is_relative() {
                config.spec = Some(dir.join(spec));
            }
        }

        Ok(config)
    }

    /// Parse configuration from a TOML string and resolve `${VAR}` references.
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let mut config: ClientConfig = toml::from_str(contents)
            .map_err(|e| Error::config_error(format!("Failed to parse config: {e}")))?;
        config.resolve_env_vars();
        Ok(config)
    }

    /// Build an [`ApiClient`] from this configuration.
    pub fn build_client(&self) -> Result<ApiClient> {
        if self.base_url.is_empty() {
            return Err(Error::config_error("base_url is required"));
        }

        let mut options = ClientOptions::default();
        if let Some(secs) = self.timeout_secs {
            options = options.with_timeout(Duration::from_secs(secs));
        }
        if let Some(user_agent) = &self.user_agent {
            options = options.with_user_agent(user_agent);
        }

        ApiClient::with_options(&self.base_url, self.auth.to_auth_config()?, options)
    }

    /// Load and convert the configured spec file.
    pub fn load_functions(&self) -> Result<FunctionSet> {
        let spec = self
            .spec
            .as_ref()
            .ok_or_else(|| Error::config_error("spec path is not configured"))?;
        FunctionSet::from_file(spec)
    }

    fn resolve_env_vars(&mut self) {
        resolve_in_place(&mut self.base_url);
        resolve_option(&mut self.user_agent);

        let auth = &mut self.auth;
        resolve_in_place(&mut auth.auth_type);
        for field in [
            &mut auth.username,
            &mut auth.password,
            &mut auth.api_key_name,
            &mut auth.api_key_value,
            &mut auth.token,
            &mut auth.token_url,
            &mut auth.client_id,
            &mut auth.client_secret,
            &mut auth.refresh_token,
        ] {
            resolve_option(field);
        }
        for value in auth.cookies.values_mut() {
            resolve_in_place(value);
        }
    }
}

impl AuthSettings {
    /// Turn the settings into an [`AuthConfig`].
    ///
    /// Unknown `type` strings fail with [`Error::UnsupportedAuthType`].
    pub fn to_auth_config(&self) -> Result<AuthConfig> {
        let value = |field: &Option<String>| field.clone().unwrap_or_default();

        let auth = match self.auth_type.parse::<AuthType>()? {
            AuthType::None => AuthConfig::None,
            AuthType::Basic => AuthConfig::basic(value(&self.username), value(&self.password)),
            AuthType::ApiKeyHeader => {
                AuthConfig::api_key_header(value(&self.api_key_name), value(&self.api_key_value))
            }
            AuthType::ApiKeyCookie => {
                AuthConfig::api_key_cookie(value(&self.api_key_name), value(&self.api_key_value))
            }
            AuthType::Bearer => AuthConfig::bearer(value(&self.token)),
            AuthType::OAuth2 => {
                let token_source = match (&self.token_url, &self.refresh_token) {
                    (Some(token_url), Some(refresh_token)) => {
                        let mut source = RefreshTokenSource::new(
                            token_url,
                            value(&self.client_id),
                            refresh_token,
                        );
                        if let Some(secret) = &self.client_secret {
                            source = source.with_client_secret(secret);
                        }
                        Some(Arc::new(source) as Arc<dyn TokenSource>)
                    }
                    _ => None,
                };
                AuthConfig::OAuth2 {
                    token_source,
                    token: self.token.clone(),
                }
            }
            AuthType::Cookie => AuthConfig::cookies(
                self.cookies
                    .iter()
                    .map(|(name, value)| Cookie::new(name, value)),
            ),
        };

        Ok(auth)
    }
}

/// Resolve a single `${VAR_NAME}` reference. `None` when the variable is unset.
fn resolve_env_var(value: &str) -> Option<String> {
    match value.strip_prefix("${").and_then(|rest| rest.strip_suffix('}')) {
        Some(var_name) => env::var(var_name).ok(),
        None => Some(value.to_string()),
    }
}

fn resolve_in_place(value: &mut String) {
    *value = resolve_env_var(value).unwrap_or_default();
}

fn resolve_option(value: &mut Option<String>) {
    *value = value.as_deref().and_then(resolve_env_var);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bearer_config_with_env() {
        // SAFETY: the variable name is unique to this test.
        unsafe { env::set_var("APIFN_TEST_BEARER_TOKEN", "from-env") };

        let config = ClientConfig::from_toml_str(
            r#"
base_url = "https://api.example.com"
timeout_secs = 5

[auth]
type = "bearer"
token = "${APIFN_TEST_BEARER_TOKEN}"
"#,
        )
        .unwrap();

        assert_eq!(config.timeout_secs, Some(5));
        assert_eq!(config.auth.token.as_deref(), Some("from-env"));
        assert!(matches!(
            config.auth.to_auth_config().unwrap(),
            AuthConfig::Bearer { token } if token == "from-env"
        ));
        assert!(config.build_client().is_ok());
    }

    #[test]
    fn test_unset_env_clears_field() {
        let config = ClientConfig::from_toml_str(
            r#"
base_url = "https://api.example.com"
[auth]
type = "oauth2"
token = "${APIFN_TEST_DEFINITELY_UNSET}"
"#,
        )
        .unwrap();
        assert!(config.auth.token.is_none());
    }

    #[test]
    fn test_defaults_to_no_auth() {
        let config = ClientConfig::from_toml_str(r#"base_url = "https://api.example.com""#).unwrap();
        assert_eq!(config.auth.to_auth_config().unwrap().auth_type(), AuthType::None);
        assert!(config.spec.is_none());
    }

    #[test]
    fn test_unsupported_type() {
        let config = ClientConfig::from_toml_str(
            r#"
base_url = "https://api.example.com"
[auth]
type = "ntlm"
"#,
        )
        .unwrap();
        assert!(matches!(
            config.build_client(),
            Err(Error::UnsupportedAuthType(t)) if t == "ntlm"
        ));
    }

    #[test]
    fn test_cookie_and_oauth2_settings() {
        let config = ClientConfig::from_toml_str(
            r#"
base_url = "https://api.example.com"
[auth]
type = "cookie"
cookies = { sessionid = "abc123", csrftoken = "xyz789" }
"#,
        )
        .unwrap();
        match config.auth.to_auth_config().unwrap() {
            AuthConfig::Cookie { cookies } => {
                assert_eq!(
                    cookies,
                    vec![Cookie::new("sessionid", "abc123"), Cookie::new("csrftoken", "xyz789")]
                );
            }
            other => panic!("unexpected auth: {other:?}"),
        }

        let config = ClientConfig::from_toml_str(
            r#"
base_url = "https://api.example.com"
[auth]
type = "oauth2"
token_url = "https://auth.example.com/token"
client_id = "app"
refresh_token = "r1"
"#,
        )
        .unwrap();
        assert!(matches!(
            config.auth.to_auth_config().unwrap(),
            AuthConfig::OAuth2 { token_source: Some(_), token: None }
        ));
    }

    #[test]
    fn test_missing_base_url() {
        let config = ClientConfig::default();
        assert!(matches!(config.build_client(), Err(Error::Config(_))));
    }

    #[test]
    fn test_load_from_file_resolves_spec_path() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("openapi.yaml"),
            "paths:\n  /pets:\n    get:\n      summary: List pets\n",
        )
        .unwrap();
        let config_path = dir.path().join("apifn.toml");
        std::fs::write(
            &config_path,
            "base_url = \"https://api.example.com\"\nspec = \"openapi.yaml\"\n",
        )
        .unwrap();

        let config = ClientConfig::load_from(&config_path).unwrap();
        assert_eq!(config.spec.as_deref(), Some(dir.path().join("openapi.yaml").as_path()));

        let functions = config.load_functions().unwrap();
        assert_eq!(functions.names(), vec!["get_pets"]);
    }
}
