//! Request execution for generated functions.
//!
//! [`ApiClient`] turns a [`FunctionDefinition`] plus the flat argument map a
//! model returns into a concrete HTTP request, sends it through the
//! authenticated transport and decodes the JSON response.

use crate::auth::AuthConfig;
use crate::converter::REQUEST_BODY_ARG;
use crate::error::{Error, Result};
use crate::transport::{AuthTransport, ClientOptions};
use crate::types::FunctionDefinition;
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use reqwest::header::{CONTENT_TYPE, HeaderValue};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use tokio::time::Instant;
use tracing::{debug, instrument};
use url::Url;

/// Flat argument map decoded from a tool call.
pub type Arguments = Map<String, Value>;

/// Characters escaped inside a single path segment. Unreserved characters and
/// `$ & + : = @` pass through.
const PATH_SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~')
    .remove(b'$')
    .remove(b'&')
    .remove(b'+')
    .remove(b':')
    .remove(b'=')
    .remove(b'@');

/// Decode the arguments string of a tool call. Empty input is an empty map.
pub fn parse_arguments(raw: &str) -> Result<Arguments> {
    if raw.trim().is_empty() {
        return Ok(Arguments::new());
    }
    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(other) => Err(Error::InvalidArguments(format!(
            "expected a JSON object, got {other}"
        ))),
        Err(e) => Err(Error::InvalidArguments(e.to_string())),
    }
}

/// String form of an argument: strings verbatim, JSON text for everything
/// else, and the empty string for null or missing values. Integral floats
/// drop the fractional part, so `1e3` renders as `1000`.
fn argument_string(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => match n.as_f64() {
            Some(f) if n.is_f64() && f.fract() == 0.0 && f.abs() < 1e21 => format!("{f:.0}"),
            _ => n.to_string(),
        },
        Some(other) => other.to_string(),
    }
}

/// Client for the API described by a converted document.
#[derive(Debug, Clone)]
pub struct ApiClient {
    base_url: Url,
    transport: AuthTransport,
}

impl ApiClient {
    /// Create a client for `base_url` with the given authentication.
    ///
    /// # Example
    ///
    /// ```
    /// use apifn_openapi::{ApiClient, AuthConfig};
    ///
    /// let client = ApiClient::new("https://api.example.com/v1", AuthConfig::bearer("token"))?;
    /// # Ok::<(), apifn_openapi::Error>(())
    /// ```
    pub fn new(base_url: &str, auth: AuthConfig) -> Result<Self> {
        Self::with_options(base_url, auth, ClientOptions::default())
    }

    /// Create a client with custom HTTP client settings.
    pub fn with_options(base_url: &str, auth: AuthConfig, options: ClientOptions) -> Result<Self> {
        Ok(Self {
            base_url: Url::parse(base_url)?,
            transport: AuthTransport::with_options(auth, options)?,
        })
    }

    /// Create a client from a prebuilt transport.
    pub fn from_transport(base_url: &str, transport: AuthTransport) -> Result<Self> {
        Ok(Self {
            base_url: Url::parse(base_url)?,
            transport,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn transport(&self) -> &AuthTransport {
        &self.transport
    }

    /// Build the target URL: base URL joined with the path template, path
    /// arguments substituted and query arguments set.
    pub fn build_url(&self, function: &FunctionDefinition, args: &Arguments) -> Url {
        let mut path = function.path.clone();
        for name in &function.path_params {
            let value = argument_string(args.get(name));
            let escaped = utf8_percent_encode(&value, PATH_SEGMENT).to_string();
            path = path.replace(&format!("{{{name}}}"), &escaped);
        }

        let mut url = self.base_url.clone();
        let joined = format!(
            "{}/{}",
            url.path().trim_end_matches('/'),
            path.trim_start_matches('/')
        );
        url.set_path(&joined);

        if !function.query_params.is_empty() {
            let mut query: BTreeMap<String, Vec<String>> = BTreeMap::new();
            for (key, value) in url.query_pairs() {
                query
                    .entry(key.into_owned())
                    .or_default()
                    .push(value.into_owned());
            }
            for name in &function.query_params {
                query.insert(name.clone(), vec![argument_string(args.get(name))]);
            }

            url.set_query(None);
            url.query_pairs_mut().extend_pairs(
                query
                    .iter()
                    .flat_map(|(key, values)| values.iter().map(move |v| (key, v))),
            );
        }

        url
    }

    /// Build the HTTP request for a function call.
    ///
    /// A non-null `requestBody` argument is sent as a JSON body; without one
    /// no body and no `Content-Type` header are set.
    pub fn build_request(
        &self,
        function: &FunctionDefinition,
        args: &Arguments,
    ) -> Result<reqwest::Request> {
        let method = reqwest::Method::from_bytes(function.method.as_bytes())
            .map_err(|_| Error::InvalidMethod(function.method.clone()))?;
        let url = self.build_url(function, args);
        debug!("Request URL: {} {}", method, url);

        let mut builder = self.transport.client().request(method, url);

        if let Some(body) = args.get(REQUEST_BODY_ARG).filter(|v| !v.is_null()) {
            let bytes = serde_json::to_vec(body).map_err(Error::Encode)?;
            builder = builder
                .header(CONTENT_TYPE, HeaderValue::from_static("application/json"))
                .body(bytes);
        }

        Ok(builder.build()?)
    }

    /// Execute a function call and decode the JSON response.
    ///
    /// Status codes are not inspected: any response whose body decodes as JSON
    /// is returned.
    #[instrument(skip(self, function, args), fields(function = %function.name))]
    pub async fn execute(&self, function: &FunctionDefinition, args: &Arguments) -> Result<Value> {
        let request = self.build_request(function, args)?;
        self.send(request).await
    }

    /// Like [`execute`](Self::execute), bounded by a deadline that is applied
    /// to the outgoing request as its timeout.
    #[instrument(skip(self, function, args), fields(function = %function.name))]
    pub async fn execute_with_deadline(
        &self,
        function: &FunctionDefinition,
        args: &Arguments,
        deadline: Instant,
    ) -> Result<Value> {
        let mut request = self.build_request(function, args)?;
        *request.timeout_mut() = Some(deadline.saturating_duration_since(Instant::now()));
        self.send(request).await
    }

    async fn send(&self, request: reqwest::Request) -> Result<Value> {
        let response = self.transport.send(request).await?;
        debug!("Response status: {}", response.status());

        let bytes = response.bytes().await?;
        serde_json::from_slice(&bytes).map_err(Error::Decode)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;
    use serde_json::json;
    use std::time::Duration;

    fn function(method: &str, path: &str, path_params: &[&str], query_params: &[&str]) -> FunctionDefinition {
        FunctionDefinition {
            name: "test_fn".to_string(),
            method: method.to_string(),
            path: path.to_string(),
            path_params: path_params.iter().map(|s| s.to_string()).collect(),
            query_params: query_params.iter().map(|s| s.to_string()).collect(),
            ..Default::default()
        }
    }

    fn args(value: Value) -> Arguments {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_build_url_path_substitution() {
        let client = ApiClient::new("https://api.example.com/v1/", AuthConfig::None).unwrap();
        let f = function("GET", "/pets/{id}", &["id"], &[]);

        let url = client.build_url(&f, &args(json!({"id": 42})));
        assert_eq!(url.as_str(), "https://api.example.com/v1/pets/42");

        let url = client.build_url(&f, &args(json!({"id": "a b/c?"})));
        assert_eq!(url.as_str(), "https://api.example.com/v1/pets/a%20b%2Fc%3F");
    }

    #[test]
    fn test_build_url_missing_path_argument() {
        let client = ApiClient::new("https://api.example.com", AuthConfig::None).unwrap();
        let f = function("GET", "/pets/{id}/toys", &["id"], &[]);

        let url = client.build_url(&f, &Arguments::new());
        assert_eq!(url.as_str(), "https://api.example.com/pets//toys");
    }

    #[test]
    fn test_build_url_query() {
        let client =
            ApiClient::new("https://api.example.com/?zeta=1&limit=5", AuthConfig::None).unwrap();
        let f = function("GET", "/pets", &[], &["limit", "tag", "missing"]);

        let url = client.build_url(&f, &args(json!({"limit": 10, "tag": "good dog"})));
        assert_eq!(url.path(), "/pets");
        assert_eq!(url.query(), Some("limit=10&missing=&tag=good+dog&zeta=1"));
    }

    #[test]
    fn test_argument_string() {
        assert_eq!(argument_string(None), "");
        assert_eq!(argument_string(Some(&Value::Null)), "");
        assert_eq!(argument_string(Some(&json!("a b"))), "a b");
        assert_eq!(argument_string(Some(&json!(42))), "42");
        assert_eq!(argument_string(Some(&json!(-7))), "-7");
        assert_eq!(argument_string(Some(&json!(1e3))), "1000");
        assert_eq!(argument_string(Some(&json!(2.5))), "2.5");
        assert_eq!(argument_string(Some(&json!(true))), "true");
        assert_eq!(argument_string(Some(&json!({"a": 1}))), r#"{"a":1}"#);

        let client = ApiClient::new("https://api.example.com", AuthConfig::None).unwrap();
        let f = function("GET", "/pets/{id}", &["id"], &["limit"]);
        let url = client.build_url(&f, &args(json!({"id": 4.0, "limit": 1e2})));
        assert_eq!(url.as_str(), "https://api.example.com/pets/4?limit=100");
    }

    #[test]
    fn test_build_request_body() {
        let client = ApiClient::new("https://api.example.com", AuthConfig::None).unwrap();
        let f = function("POST", "/pets", &[], &[]);

        let request = client
            .build_request(&f, &args(json!({"requestBody": {"name": "Rex"}})))
            .unwrap();
        assert_eq!(request.method(), reqwest::Method::POST);
        assert_eq!(request.headers()[CONTENT_TYPE], "application/json");
        let body = request.body().and_then(|b| b.as_bytes()).unwrap();
        assert_eq!(serde_json::from_slice::<Value>(body).unwrap(), json!({"name": "Rex"}));

        let request = client
            .build_request(&f, &args(json!({"requestBody": null})))
            .unwrap();
        assert!(request.body().is_none());
        assert!(!request.headers().contains_key(CONTENT_TYPE));
    }

    #[test]
    fn test_invalid_method() {
        let client = ApiClient::new("https://api.example.com", AuthConfig::None).unwrap();
        let err = client
            .build_request(&function("BAD METHOD", "/x", &[], &[]), &Arguments::new())
            .unwrap_err();
        assert!(matches!(err, Error::InvalidMethod(_)));
    }

    #[test]
    fn test_parse_arguments() {
        assert!(parse_arguments("").unwrap().is_empty());
        assert_eq!(parse_arguments(r#"{"id": 7}"#).unwrap()["id"], json!(7));
        assert!(matches!(parse_arguments("[1]"), Err(Error::InvalidArguments(_))));
        assert!(matches!(parse_arguments("{"), Err(Error::InvalidArguments(_))));
    }

    #[tokio::test]
    async fn test_execute_get_without_body() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/items/7")
            .match_query(Matcher::Exact("verbose=true".to_string()))
            .match_header("content-type", Matcher::Missing)
            .match_body(Matcher::Exact(String::new()))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"id": "7", "verbose": true}"#)
            .create_async()
            .await;

        let client = ApiClient::new(&server.url(), AuthConfig::None).unwrap();
        let f = function("GET", "/items/{id}", &["id"], &["verbose"]);

        let result = client
            .execute(&f, &args(json!({"id": "7", "verbose": "true"})))
            .await
            .unwrap();
        assert_eq!(result, json!({"id": "7", "verbose": true}));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_execute_post_with_body_and_auth() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/pets")
            .match_header("authorization", "Bearer T")
            .match_header("content-type", "application/json")
            .match_body(Matcher::Json(json!({"name": "Rex", "age": 3})))
            .with_status(201)
            .with_body(r#"{"id": 1}"#)
            .create_async()
            .await;

        let client = ApiClient::new(&server.url(), AuthConfig::bearer("T")).unwrap();
        let f = function("POST", "/pets", &[], &[]);

        let result = client
            .execute(&f, &args(json!({"requestBody": {"name": "Rex", "age": 3}})))
            .await
            .unwrap();
        assert_eq!(result["id"], json!(1));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_error_status_still_decoded() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("DELETE", "/pets/9")
            .with_status(404)
            .with_body(r#"{"error": "not found"}"#)
            .create_async()
            .await;

        let client = ApiClient::new(&server.url(), AuthConfig::None).unwrap();
        let f = function("DELETE", "/pets/{id}", &["id"], &[]);

        let result = client.execute(&f, &args(json!({"id": 9}))).await.unwrap();
        assert_eq!(result, json!({"error": "not found"}));
    }

    #[tokio::test]
    async fn test_non_json_response_is_decode_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/health")
            .with_status(200)
            .with_body("OK")
            .create_async()
            .await;

        let client = ApiClient::new(&server.url(), AuthConfig::None).unwrap();
        let err = client
            .execute(&function("GET", "/health", &[], &[]), &Arguments::new())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Decode(_)));
    }

    #[tokio::test]
    async fn test_truncated_and_trailing_bodies_are_decode_errors() {
        let mut server = mockito::Server::new_async().await;
        let _truncated = server
            .mock("GET", "/truncated")
            .with_status(200)
            .with_body(r#"{"id": 1, "name": "Re"#)
            .create_async()
            .await;
        let _trailing = server
            .mock("GET", "/trailing")
            .with_status(200)
            .with_body(r#"{"id": 1} {"id": 2}"#)
            .create_async()
            .await;

        let client = ApiClient::new(&server.url(), AuthConfig::None).unwrap();
        for path in ["/truncated", "/trailing"] {
            let err = client
                .execute(&function("GET", path, &[], &[]), &Arguments::new())
                .await
                .unwrap_err();
            assert!(matches!(err, Error::Decode(_)), "{path}: {err:?}");
        }
    }

    #[tokio::test]
    async fn test_transport_failure() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client = ApiClient::new(&format!("http://{addr}"), AuthConfig::None).unwrap();
        let err = client
            .execute(&function("GET", "/x", &[], &[]), &Arguments::new())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Http(_)));
    }

    #[tokio::test]
    async fn test_deadline_bounds_request() {
        // Accepts connections but never answers.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let client = ApiClient::new(&format!("http://{addr}"), AuthConfig::None).unwrap();
        let deadline = Instant::now() + Duration::from_millis(100);
        let err = client
            .execute_with_deadline(&function("GET", "/slow", &[], &[]), &Arguments::new(), deadline)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Http(ref e) if e.is_timeout()));
        drop(listener);
    }
}
