//! OAuth2 tokens and token sources.
//!
//! A [`TokenSource`] hands out access tokens on demand. [`StaticTokenSource`]
//! always returns the same token; [`RefreshTokenSource`] caches a token and
//! runs the `refresh_token` grant against a token endpoint once it expires.

use crate::error::{Error, Result};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, info, instrument};

/// Tokens are treated as expired this long before their actual expiry.
const EXPIRY_DELTA_SECS: i64 = 10;

/// An OAuth2 access token.
#[derive(Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Token {
    pub access_token: String,
    /// Token type as issued (usually "Bearer"); empty means Bearer
    #[serde(default)]
    pub token_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    /// Absolute expiry; `None` never expires
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiry: Option<DateTime<Utc>>,
}

impl std::fmt::Debug for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Token")
            .field("token_type", &self.token_type)
            .field("has_refresh_token", &self.refresh_token.is_some())
            .field("expiry", &self.expiry)
            .finish_non_exhaustive()
    }
}

impl Token {
    /// A non-expiring bearer token.
    pub fn new(access_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            ..Default::default()
        }
    }

    /// Token type as used in the `Authorization` header.
    pub fn header_type(&self) -> &str {
        let token_type = self.token_type.as_str();
        if token_type.is_empty() || token_type.eq_ignore_ascii_case("bearer") {
            "Bearer"
        } else if token_type.eq_ignore_ascii_case("mac") {
            "MAC"
        } else if token_type.eq_ignore_ascii_case("basic") {
            "Basic"
        } else {
            token_type
        }
    }

    /// Value for the `Authorization` header.
    pub fn authorization_value(&self) -> String {
        format!("{} {}", self.header_type(), self.access_token)
    }

    /// Whether the token is non-empty and not about to expire.
    pub fn is_valid(&self) -> bool {
        if self.access_token.is_empty() {
            return false;
        }
        match self.expiry {
            Some(expiry) => expiry > Utc::now() + Duration::seconds(EXPIRY_DELTA_SECS),
            None => true,
        }
    }
}

/// Supplies OAuth2 tokens, refreshing them as needed.
#[async_trait]
pub trait TokenSource: Send + Sync {
    /// Return a currently valid token.
    async fn token(&self) -> Result<Token>;
}

/// A token source that always returns the same token.
#[derive(Debug, Clone)]
pub struct StaticTokenSource {
    token: Token,
}

impl StaticTokenSource {
    pub fn new(token: Token) -> Self {
        Self { token }
    }
}

#[async_trait]
impl TokenSource for StaticTokenSource {
    async fn token(&self) -> Result<Token> {
        Ok(self.token.clone())
    }
}

/// Token endpoint response.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    token_type: Option<String>,
    expires_in: Option<i64>,
    refresh_token: Option<String>,
}

/// A token source that refreshes through the OAuth2 `refresh_token` grant.
///
/// The cached token is guarded by an async mutex, so concurrent callers
/// share one refresh.
pub struct RefreshTokenSource {
    http_client: reqwest::Client,
    token_url: String,
    client_id: String,
    client_secret: Option<String>,
    refresh_token: String,
    current: Mutex<Option<Token>>,
}

impl RefreshTokenSource {
    /// Create a source for the given token endpoint and refresh token.
    pub fn new(
        token_url: impl Into<String>,
        client_id: impl Into<String>,
        refresh_token: impl Into<String>,
    ) -> Self {
        Self {
            http_client: reqwest::Client::new(),
            token_url: token_url.into(),
            client_id: client_id.into(),
            client_secret: None,
            refresh_token: refresh_token.into(),
            current: Mutex::new(None),
        }
    }

    /// Send a client secret with refresh requests.
    pub fn with_client_secret(mut self, secret: impl Into<String>) -> Self {
        self.client_secret = Some(secret.into());
        self
    }

    /// Seed the cache with an already issued token.
    pub fn with_token(mut self, token: Token) -> Self {
        self.current = Mutex::new(Some(token));
        self
    }

    /// Use a specific HTTP client for token requests.
    pub fn with_http_client(mut self, client: reqwest::Client) -> Self {
        self.http_client = client;
        self
    }

    #[instrument(skip(self, refresh_token), fields(token_url = %self.token_url))]
    async fn refresh(&self, refresh_token: &str) -> Result<Token> {
        let mut params = vec![
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
            ("client_id", self.client_id.as_str()),
        ];
        if let Some(secret) = &self.client_secret {
            params.push(("client_secret", secret.as_str()));
        }

        let response = self
            .http_client
            .post(&self.token_url)
            .form(&params)
            .send()
            .await
            .map_err(|e| Error::auth_error(format!("Token refresh failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::auth_error(format!(
                "Token refresh failed: HTTP {status} - {body}"
            )));
        }

        let token_response: TokenResponse = response
            .json()
            .await
            .map_err(|e| Error::auth_error(format!("Failed to parse refresh response: {e}")))?;

        let expiry = match token_response.expires_in {
            Some(secs) => Some(
                Duration::try_seconds(secs)
                    .and_then(|lifetime| Utc::now().checked_add_signed(lifetime))
                    .ok_or_else(|| Error::auth_error(format!("invalid expires_in: {secs}")))?,
            ),
            None => None,
        };

        info!("Token refreshed successfully");

        Ok(Token {
            access_token: token_response.access_token,
            token_type: token_response.token_type.unwrap_or_default(),
            // Servers that do not rotate refresh tokens expect the old one again.
            refresh_token: token_response
                .refresh_token
                .or_else(|| Some(refresh_token.to_string())),
            expiry,
        })
    }
}

#[async_trait]
impl TokenSource for RefreshTokenSource {
    async fn token(&self) -> Result<Token> {
        let mut current = self.current.lock().await;

        if let Some(token) = current.as_ref().filter(|t| t.is_valid()) {
            return Ok(token.clone());
        }

        let refresh_token = current
            .as_ref()
            .and_then(|t| t.refresh_token.clone())
            .unwrap_or_else(|| self.refresh_token.clone());
        debug!("Cached token missing or expired, refreshing");

        let token = self.refresh(&refresh_token).await?;
        *current = Some(token.clone());
        Ok(token)
    }
}
