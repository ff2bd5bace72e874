//! Authentication strategies for outgoing API requests.
//!
//! The strategies are:
//! - none (pass-through)
//! - HTTP Basic
//! - API key in a header or in a cookie
//! - Bearer token
//! - OAuth2, from a refreshing [`TokenSource`] or a static token
//! - a fixed set of cookies

use crate::error::Error;
use crate::oauth::TokenSource;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// Names of the supported strategies, as used in configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AuthType {
    None,
    Basic,
    ApiKeyHeader,
    ApiKeyCookie,
    Bearer,
    OAuth2,
    Cookie,
}

impl AuthType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthType::None => "none",
            AuthType::Basic => "basic",
            AuthType::ApiKeyHeader => "apikey-header",
            AuthType::ApiKeyCookie => "apikey-cookie",
            AuthType::Bearer => "bearer",
            AuthType::OAuth2 => "oauth2",
            AuthType::Cookie => "cookie",
        }
    }
}

impl fmt::Display for AuthType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AuthType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "" | "none" => Ok(AuthType::None),
            "basic" => Ok(AuthType::Basic),
            "apikey-header" => Ok(AuthType::ApiKeyHeader),
            "apikey-cookie" => Ok(AuthType::ApiKeyCookie),
            "bearer" => Ok(AuthType::Bearer),
            "oauth2" => Ok(AuthType::OAuth2),
            "cookie" => Ok(AuthType::Cookie),
            other => Err(Error::UnsupportedAuthType(other.to_string())),
        }
    }
}

/// A cookie sent with every request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cookie {
    pub name: String,
    pub value: String,
}

impl Cookie {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

impl fmt::Display for Cookie {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.name, self.value)
    }
}

/// Authentication configuration for API requests.
///
/// Fixed at client construction and never mutated afterwards.
#[derive(Clone, Default)]
pub enum AuthConfig {
    /// No authentication
    #[default]
    None,

    /// HTTP Basic authentication (Authorization: Basic <base64>)
    Basic { username: String, password: String },

    /// API key sent in a named header
    ApiKeyHeader { name: String, value: String },

    /// API key sent as a named cookie
    ApiKeyCookie { name: String, value: String },

    /// Bearer token authentication (Authorization: Bearer <token>)
    Bearer { token: String },

    /// OAuth2: the token source wins when present, the static token is the fallback
    OAuth2 {
        token_source: Option<Arc<dyn TokenSource>>,
        token: Option<String>,
    },

    /// A fixed list of cookies
    Cookie { cookies: Vec<Cookie> },
}

impl fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthConfig::Basic { username, .. } => f
                .debug_struct("Basic")
                .field("username", username)
                .finish_non_exhaustive(),
            AuthConfig::ApiKeyHeader { name, .. } => f
                .debug_struct("ApiKeyHeader")
                .field("name", name)
                .finish_non_exhaustive(),
            AuthConfig::ApiKeyCookie { name, .. } => f
                .debug_struct("ApiKeyCookie")
                .field("name", name)
                .finish_non_exhaustive(),
            AuthConfig::OAuth2 {
                token_source,
                token,
            } => f
                .debug_struct("OAuth2")
                .field("has_token_source", &token_source.is_some())
                .field("has_token", &token.is_some())
                .finish(),
            AuthConfig::Cookie { cookies } => f
                .debug_struct("Cookie")
                .field("names", &cookies.iter().map(|c| &c.name).collect::<Vec<_>>())
                .finish_non_exhaustive(),
            AuthConfig::None | AuthConfig::Bearer { .. } => f.write_str(self.auth_type().as_str()),
        }
    }
}

impl AuthConfig {
    /// Create basic authentication.
    ///
    /// # Example
    ///
    /// ```
    /// use apifn_openapi::AuthConfig;
    ///
    /// let auth = AuthConfig::basic("username", "password");
    /// ```
    pub fn basic(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self::Basic {
            username: username.into(),
            password: password.into(),
        }
    }

    /// Create API key authentication in a header.
    ///
    /// # Example
    ///
    /// ```
    /// use apifn_openapi::AuthConfig;
    ///
    /// let auth = AuthConfig::api_key_header("X-API-Key", "my-secret-key");
    /// ```
    pub fn api_key_header(header_name: impl Into<String>, key: impl Into<String>) -> Self {
        Self::ApiKeyHeader {
            name: header_name.into(),
            value: key.into(),
        }
    }

    /// Create API key authentication in a cookie.
    pub fn api_key_cookie(cookie_name: impl Into<String>, key: impl Into<String>) -> Self {
        Self::ApiKeyCookie {
            name: cookie_name.into(),
            value: key.into(),
        }
    }

    /// Create bearer token authentication.
    ///
    /// # Example
    ///
    /// ```
    /// use apifn_openapi::AuthConfig;
    ///
    /// let auth = AuthConfig::bearer("my-bearer-token");
    /// ```
    pub fn bearer(token: impl Into<String>) -> Self {
        Self::Bearer {
            token: token.into(),
        }
    }

    /// OAuth2 backed by a token source, which handles refresh.
    pub fn oauth2(token_source: Arc<dyn TokenSource>) -> Self {
        Self::OAuth2 {
            token_source: Some(token_source),
            token: None,
        }
    }

    /// OAuth2 with a static access token.
    pub fn oauth2_token(token: impl Into<String>) -> Self {
        Self::OAuth2 {
            token_source: None,
            token: Some(token.into()),
        }
    }

    /// Send a fixed set of cookies with every request.
    ///
    /// # Example
    ///
    /// ```
    /// use apifn_openapi::{AuthConfig, Cookie};
    ///
    /// let auth = AuthConfig::cookies([
    ///     Cookie::new("sessionid", "abc123"),
    ///     Cookie::new("csrftoken", "xyz789"),
    /// ]);
    /// ```
    pub fn cookies(cookies: impl IntoIterator<Item = Cookie>) -> Self {
        Self::Cookie {
            cookies: cookies.into_iter().collect(),
        }
    }

    /// The strategy this configuration selects.
    pub fn auth_type(&self) -> AuthType {
        match self {
            AuthConfig::None => AuthType::None,
            AuthConfig::Basic { .. } => AuthType::Basic,
            AuthConfig::ApiKeyHeader { .. } => AuthType::ApiKeyHeader,
            AuthConfig::ApiKeyCookie { .. } => AuthType::ApiKeyCookie,
            AuthConfig::Bearer { .. } => AuthType::Bearer,
            AuthConfig::OAuth2 { .. } => AuthType::OAuth2,
            AuthConfig::Cookie { .. } => AuthType::Cookie,
        }
    }

    /// Cookie-based strategies get a cookie jar so server-set cookies persist.
    pub fn uses_cookie_jar(&self) -> bool {
        matches!(self.auth_type(), AuthType::ApiKeyCookie | AuthType::Cookie)
    }
}
