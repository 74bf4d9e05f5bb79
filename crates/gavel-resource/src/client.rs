//! The resource client: one place where REST calls are made.
//!
//! Callers describe a call with a [`Request`] (method, path, optional JSON
//! body). The client attaches the bearer token, sends it, and classifies
//! the response into `Ok(payload)` or a [`ResourceError`].
//!
//! A 401/403 answer to a request that carried a session token is reported
//! back to the [`TokenSource`] so the session manager can sign out, then
//! returned to the caller like any other error.

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use gavel_session::TokenSource;
use reqwest::StatusCode;
use reqwest::header::CONTENT_TYPE;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::ResourceError;

/// Default per-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

// ---------------------------------------------------------------------------
// Request
// ---------------------------------------------------------------------------

/// HTTP method of a [`Request`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl Method {
    fn as_reqwest(self) -> reqwest::Method {
        match self {
            Self::Get => reqwest::Method::GET,
            Self::Post => reqwest::Method::POST,
            Self::Put => reqwest::Method::PUT,
            Self::Patch => reqwest::Method::PATCH,
            Self::Delete => reqwest::Method::DELETE,
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_reqwest().as_str())
    }
}

/// Which token a request presents.
#[derive(Clone, PartialEq, Eq)]
enum Credential {
    /// Whatever the token source currently holds.
    Session,
    /// A specific token, e.g. one being confirmed.
    Explicit(String),
}

/// Describes one REST call.
///
/// ```rust
/// use gavel_resource::Request;
///
/// let request = Request::post("/api/rooms/7/bid")
///     .json(&serde_json::json!({ "amount": 120 }))
///     .unwrap();
/// assert_eq!(request.path(), "/api/rooms/7/bid");
/// ```
#[derive(Clone)]
pub struct Request {
    method: Method,
    path: String,
    body: Option<Value>,
    credential: Credential,
}

impl Request {
    /// A request with no body that presents the session token.
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            body: None,
            credential: Credential::Session,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::Get, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::Post, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::Put, path)
    }

    pub fn patch(path: impl Into<String>) -> Self {
        Self::new(Method::Patch, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::Delete, path)
    }

    /// Attaches a JSON body.
    ///
    /// # Errors
    /// `ValidationFailed` if `body` can't be represented as JSON.
    pub fn json<T: Serialize + ?Sized>(
        mut self,
        body: &T,
    ) -> Result<Self, ResourceError> {
        let value = serde_json::to_value(body).map_err(|e| {
            ResourceError::ValidationFailed(format!("request body: {e}"))
        })?;
        self.body = Some(value);
        Ok(self)
    }

    /// Presents `token` instead of the session's token.
    pub fn bearer(mut self, token: impl Into<String>) -> Self {
        self.credential = Credential::Explicit(token.into());
        self
    }

    pub fn method(&self) -> Method {
        self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn body(&self) -> Option<&Value> {
        self.body.as_ref()
    }
}

impl fmt::Debug for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Request")
            .field("method", &self.method)
            .field("path", &self.path)
            .field("has_body", &self.body.is_some())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// ResourceClient
// ---------------------------------------------------------------------------

/// Sends [`Request`]s to the REST API.
///
/// Cheap to clone; clones share the connection pool and token source.
#[derive(Clone)]
pub struct ResourceClient {
    http: reqwest::Client,
    base_url: Arc<str>,
    tokens: Option<Arc<dyn TokenSource>>,
}

impl ResourceClient {
    /// Creates an anonymous client for `base_url` (e.g.
    /// `http://localhost:8080`).
    ///
    /// # Errors
    /// `NetworkUnavailable` if the HTTP stack can't be initialised.
    pub fn new(
        base_url: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, ResourceError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ResourceError::NetworkUnavailable(e.to_string()))?;
        let base_url: String = base_url.into();
        Ok(Self {
            http,
            base_url: Arc::from(base_url.trim_end_matches('/')),
            tokens: None,
        })
    }

    /// Attaches the token source consulted for every request.
    pub fn with_token_source(mut self, tokens: Arc<dyn TokenSource>) -> Self {
        self.tokens = Some(tokens);
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// `true` if the token source currently holds a token.
    pub fn is_authenticated(&self) -> bool {
        self.tokens.as_ref().is_some_and(|t| t.bearer().is_some())
    }

    /// Fails with `Unauthorized` without touching the network when signed
    /// out. Owner-scoped collaborators call this first.
    pub fn require_session(&self) -> Result<(), ResourceError> {
        if self.is_authenticated() {
            Ok(())
        } else {
            Err(ResourceError::Unauthorized)
        }
    }

    /// Sends `request` and returns the JSON payload.
    ///
    /// An empty 2xx body is `Value::Null`. A 2xx plain-text body is
    /// returned as `Value::String`.
    ///
    /// # Errors
    /// See [`ResourceError`] for the status mapping.
    pub async fn send(&self, request: Request) -> Result<Value, ResourceError> {
        let token = match &request.credential {
            Credential::Session => self.tokens.as_ref().and_then(|t| t.bearer()),
            Credential::Explicit(token) => Some(token.clone()),
        };

        let url = format!("{}{}", self.base_url, request.path);
        let mut builder = self.http.request(request.method.as_reqwest(), &url);
        if let Some(token) = &token {
            builder = builder.bearer_auth(token);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let started = Instant::now();
        let response = match builder.send().await {
            Ok(response) => response,
            Err(e) => {
                tracing::debug!(
                    method = %request.method,
                    path = %request.path,
                    error = %e,
                    "request failed before a response"
                );
                return Err(ResourceError::NetworkUnavailable(e.to_string()));
            }
        };

        let status = response.status();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned);
        let text = response
            .text()
            .await
            .map_err(|e| ResourceError::NetworkUnavailable(e.to_string()))?;

        tracing::debug!(
            method = %request.method,
            path = %request.path,
            status = status.as_u16(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "request finished"
        );

        let outcome = classify(status, content_type.as_deref(), text);
        if matches!(outcome, Err(ResourceError::Unauthorized)) {
            if let (Some(tokens), Some(token)) = (&self.tokens, &token) {
                tokens.on_unauthorized(token);
            }
        }
        outcome
    }

    /// Sends `request` and decodes the payload as `T`.
    ///
    /// # Errors
    /// As [`send`](Self::send); a payload that doesn't fit `T` is
    /// `ServerError`.
    pub async fn send_as<T: DeserializeOwned>(
        &self,
        request: Request,
    ) -> Result<T, ResourceError> {
        let value = self.send(request).await?;
        serde_json::from_value(value).map_err(|e| {
            ResourceError::ServerError(format!("unexpected response shape: {e}"))
        })
    }
}

impl fmt::Debug for ResourceClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceClient")
            .field("base_url", &self.base_url)
            .field("has_token_source", &self.tokens.is_some())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Classification
// ---------------------------------------------------------------------------

fn classify(
    status: StatusCode,
    content_type: Option<&str>,
    body: String,
) -> Result<Value, ResourceError> {
    match status.as_u16() {
        200..=299 => parse_success(content_type, body),
        401 | 403 => Err(ResourceError::Unauthorized),
        404 => Err(ResourceError::NotFound),
        409 => Err(ResourceError::Conflict(reason(status, &body))),
        400..=499 => Err(ResourceError::ValidationFailed(reason(status, &body))),
        _ => Err(ResourceError::ServerError(reason(status, &body))),
    }
}

fn parse_success(
    content_type: Option<&str>,
    body: String,
) -> Result<Value, ResourceError> {
    if body.trim().is_empty() {
        return Ok(Value::Null);
    }
    match serde_json::from_str(&body) {
        Ok(value) => Ok(value),
        Err(_) if is_plain_text(content_type) => Ok(Value::String(body)),
        Err(e) => Err(ResourceError::ServerError(format!(
            "malformed response body: {e}"
        ))),
    }
}

fn is_plain_text(content_type: Option<&str>) -> bool {
    content_type.is_none_or(|ct| ct.trim_start().starts_with("text/"))
}

/// The server's reason for an error status: a JSON `error`/`message`
/// field, else the body text, else the canonical status reason.
fn reason(status: StatusCode, body: &str) -> String {
    let body = body.trim();
    if let Ok(Value::Object(map)) = serde_json::from_str::<Value>(body) {
        for key in ["error", "message"] {
            if let Some(Value::String(text)) = map.get(key) {
                return text.clone();
            }
        }
    }
    if body.is_empty() {
        status
            .canonical_reason()
            .unwrap_or("unknown status")
            .to_owned()
    } else {
        body.to_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status(code: u16) -> StatusCode {
        StatusCode::from_u16(code).unwrap()
    }

    #[test]
    fn test_classify_status_mapping() {
        let ok = classify(status(200), Some("application/json"), "{}".into());
        assert_eq!(ok, Ok(Value::Object(Default::default())));

        assert_eq!(
            classify(status(401), None, String::new()),
            Err(ResourceError::Unauthorized)
        );
        assert_eq!(
            classify(status(403), None, String::new()),
            Err(ResourceError::Unauthorized)
        );
        assert_eq!(
            classify(status(404), None, "Room not found".into()),
            Err(ResourceError::NotFound)
        );
        assert_eq!(
            classify(status(409), None, "Username exists".into()),
            Err(ResourceError::Conflict("Username exists".into()))
        );
        assert_eq!(
            classify(status(422), None, "bad".into()),
            Err(ResourceError::ValidationFailed("bad".into()))
        );
        assert_eq!(
            classify(status(418), None, String::new()),
            Err(ResourceError::ValidationFailed("I'm a teapot".into()))
        );
        assert_eq!(
            classify(status(503), None, "busy".into()),
            Err(ResourceError::ServerError("busy".into()))
        );
    }

    #[test]
    fn test_classify_error_prefers_json_reason_field() {
        let result = classify(
            status(400),
            Some("application/json"),
            r#"{"success":false,"message":"Bid too low"}"#.into(),
        );
        assert_eq!(
            result,
            Err(ResourceError::ValidationFailed("Bid too low".into()))
        );
    }

    #[test]
    fn test_parse_success_empty_body_is_null() {
        assert_eq!(parse_success(None, "  ".into()), Ok(Value::Null));
    }

    #[test]
    fn test_parse_success_plain_text_becomes_string() {
        let value = parse_success(Some("text/plain"), "Room started".into());
        assert_eq!(value, Ok(Value::String("Room started".into())));
    }

    #[test]
    fn test_parse_success_malformed_json_is_server_error() {
        let result = parse_success(Some("application/json"), "{oops".into());
        assert!(matches!(result, Err(ResourceError::ServerError(_))));
    }

    #[test]
    fn test_request_json_sets_body() {
        let request = Request::put("/api/me/products/1")
            .json(&serde_json::json!({"name": "Lamp"}))
            .unwrap();
        assert_eq!(request.method(), Method::Put);
        assert_eq!(request.body().unwrap()["name"], "Lamp");
    }

    #[test]
    fn test_method_display_uses_http_verb() {
        assert_eq!(Method::Patch.to_string(), "PATCH");
    }
}
