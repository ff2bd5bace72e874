//! Authenticated HTTP transport.
//!
//! [`AuthTransport`] owns the `reqwest` client and decorates each outgoing
//! request according to its [`AuthConfig`]. Requests are taken by value, so
//! the caller's request is never modified behind its back.

use crate::auth::{AuthConfig, Cookie};
use crate::error::{Error, Result};
use crate::oauth::Token;
use base64::{Engine as _, engine::general_purpose::STANDARD};
use reqwest::cookie::{CookieStore, Jar};
use reqwest::header::{AUTHORIZATION, COOKIE, HeaderName, HeaderValue};
use reqwest::{Request, Response};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Optional settings for the underlying HTTP client.
#[derive(Debug, Clone, Default)]
pub struct ClientOptions {
    /// Client-wide timeout applied to every request
    pub timeout: Option<Duration>,
    /// User-Agent header value
    pub user_agent: Option<String>,
}

impl ClientOptions {
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }
}

/// An HTTP client that authenticates every request it sends.
///
/// Cookie-based strategies get a shared cookie jar, so cookies set by the
/// server persist across calls made through the same transport.
#[derive(Debug, Clone)]
pub struct AuthTransport {
    client: reqwest::Client,
    auth: AuthConfig,
    jar: Option<Arc<Jar>>,
}

impl AuthTransport {
    /// Build a transport with default client settings.
    pub fn new(auth: AuthConfig) -> Result<Self> {
        Self::with_options(auth, ClientOptions::default())
    }

    /// Build a transport with custom client settings.
    pub fn with_options(auth: AuthConfig, options: ClientOptions) -> Result<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = options.timeout {
            builder = builder.timeout(timeout);
        }
        if let Some(user_agent) = &options.user_agent {
            builder = builder.user_agent(user_agent);
        }

        let jar = auth.uses_cookie_jar().then(|| Arc::new(Jar::default()));
        if let Some(jar) = &jar {
            builder = builder.cookie_provider(Arc::clone(jar));
        }

        debug!("Building HTTP client with {} auth", auth.auth_type());

        Ok(Self {
            client: builder.build()?,
            auth,
            jar,
        })
    }

    /// The underlying client, for building requests.
    pub fn client(&self) -> &reqwest::Client {
        &self.client
    }

    pub fn auth(&self) -> &AuthConfig {
        &self.auth
    }

    /// The cookie jar, present for cookie-based strategies.
    pub fn cookie_jar(&self) -> Option<&Arc<Jar>> {
        self.jar.as_ref()
    }

    /// Apply the configured credentials to a request.
    pub async fn authorize(&self, mut request: Request) -> Result<Request> {
        match &self.auth {
            AuthConfig::None => {}
            AuthConfig::Basic { username, password } => {
                let encoded = STANDARD.encode(format!("{username}:{password}"));
                set_sensitive(&mut request, AUTHORIZATION, &format!("Basic {encoded}"))?;
            }
            AuthConfig::ApiKeyHeader { name, value } => {
                if !name.is_empty() && !value.is_empty() {
                    let header = HeaderName::from_bytes(name.as_bytes()).map_err(|e| {
                        Error::auth_error(format!("invalid API key header name '{name}': {e}"))
                    })?;
                    set_sensitive(&mut request, header, value)?;
                }
            }
            AuthConfig::ApiKeyCookie { name, value } => {
                if !name.is_empty() && !value.is_empty() {
                    self.attach_cookies(&mut request, &[Cookie::new(name, value)])?;
                }
            }
            AuthConfig::Bearer { token } => {
                if !token.is_empty() {
                    set_sensitive(&mut request, AUTHORIZATION, &format!("Bearer {token}"))?;
                }
            }
            AuthConfig::OAuth2 {
                token_source,
                token,
            } => {
                let token = match (token_source, token.as_deref()) {
                    (Some(source), _) => source.token().await.map_err(|e| {
                        Error::auth_error(format!("failed to get OAuth2 token: {e}"))
                    })?,
                    (None, Some(static_token)) if !static_token.is_empty() => {
                        Token::new(static_token)
                    }
                    _ => {
                        return Err(Error::auth_error(
                            "OAuth2 requires either a token or a token source",
                        ));
                    }
                };
                set_sensitive(&mut request, AUTHORIZATION, &token.authorization_value())?;
            }
            AuthConfig::Cookie { cookies } => {
                self.attach_cookies(&mut request, cookies)?;
            }
        }

        Ok(request)
    }

    /// Authorize and send a request.
    pub async fn send(&self, request: Request) -> Result<Response> {
        let request = self.authorize(request).await?;
        Ok(self.client.execute(request).await?)
    }

    /// Append cookies to the request's `Cookie` header.
    ///
    /// Once a `Cookie` header is present reqwest no longer consults the jar,
    /// so stored cookies for the URL are merged in here. Order is existing
    /// header, then jar, then the configured cookies.
    fn attach_cookies(&self, request: &mut Request, cookies: &[Cookie]) -> Result<()> {
        if cookies.is_empty() {
            return Ok(());
        }

        let mut parts: Vec<String> = Vec::new();
        if let Some(existing) = request.headers().get(COOKIE).and_then(|v| v.to_str().ok()) {
            parts.push(existing.to_string());
        }
        if let Some(stored) = self
            .jar
            .as_ref()
            .and_then(|jar| jar.cookies(request.url()))
            .and_then(|v| v.to_str().ok().map(str::to_string))
        {
            parts.push(stored);
        }
        parts.extend(cookies.iter().map(Cookie::to_string));

        let value = HeaderValue::from_str(&parts.join("; "))
            .map_err(|e| Error::auth_error(format!("invalid cookie value: {e}")))?;
        request.headers_mut().insert(COOKIE, value);
        Ok(())
    }
}

fn set_sensitive(request: &mut Request, name: HeaderName, value: &str) -> Result<()> {
    let mut value = HeaderValue::from_str(value)
        .map_err(|e| Error::auth_error(format!("invalid {} header value: {e}", name.as_str())))?;
    value.set_sensitive(true);
    request.headers_mut().insert(name, value);
    Ok(())
}
