//! Authenticated request sender
//!
//! All protocol requests go through the [`RequestSender`] trait so the
//! uploader never deals with authentication or transport details.
//! [`HttpRequestSender`] is the `reqwest` backed implementation used in
//! production; tests substitute a mock.
//!
//! # Example
//!
//! ```no_run
//! use asset_uploadr::client::{HttpRequestSender, RequestOptions, RequestSender};
//! use reqwest::Method;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let sender = HttpRequestSender::builder()
//!     .base_url("https://assets.example.com")
//!     .token("permanent-token")
//!     .build()?;
//!
//! let prepared = sender
//!     .send(Method::POST, "v7/file_cmds/upload/prepare", RequestOptions::new())
//!     .await?;
//! println!("fileId: {}", prepared["fileId"]);
//! # Ok(())
//! # }
//! ```

use crate::config::ApiConfig;
use async_trait::async_trait;
use bytes::Bytes;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION, USER_AGENT};
use reqwest::Method;
use std::time::Duration;
use thiserror::Error;

/// Default timeout for API requests (60 seconds)
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Client identification sent with every request unless overridden
pub fn default_user_agent() -> String {
    format!("asset-uploadr/{}", crate::VERSION)
}

/// Request sender errors
#[derive(Error, Debug)]
pub enum SendError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Request error: {0}")]
    Request(String),

    #[error("Server returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Response decode error: {0}")]
    Decode(String),
}

/// Request body variants understood by the sender
#[derive(Debug, Clone, Default, PartialEq)]
pub enum RequestBody {
    #[default]
    Empty,
    /// Raw bytes, sent as `application/octet-stream`
    Bytes(Bytes),
    /// Form fields, sent as `application/x-www-form-urlencoded`
    Form(Vec<(String, String)>),
}

/// Per-request options: extra headers and a body
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestOptions {
    pub headers: Vec<(String, String)>,
    pub body: RequestBody,
}

impl RequestOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a request header
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Send raw bytes as the body
    pub fn bytes(mut self, data: Bytes) -> Self {
        self.body = RequestBody::Bytes(data);
        self
    }

    /// Send form fields as the body
    pub fn form<I, K, V>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.body = RequestBody::Form(
            fields
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        );
        self
    }

    /// Look up a header value by (case-insensitive) name
    pub fn header_value(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Look up a form field by name
    pub fn form_field(&self, name: &str) -> Option<&str> {
        match &self.body {
            RequestBody::Form(fields) => fields
                .iter()
                .find(|(k, _)| k == name)
                .map(|(_, v)| v.as_str()),
            _ => None,
        }
    }
}

/// Sends one authenticated request against the asset API
///
/// Implementations inject authentication and client identification,
/// resolve `path` against a fixed base URL and decode the response body
/// as JSON. Non-2xx responses and transport failures are errors.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RequestSender: Send + Sync {
    async fn send(
        &self,
        method: Method,
        path: &str,
        options: RequestOptions,
    ) -> Result<serde_json::Value, SendError>;
}

/// `reqwest` backed [`RequestSender`]
#[derive(Debug, Clone)]
pub struct HttpRequestSender {
    base_url: String,
    client: reqwest::Client,
}

/// Builder for HttpRequestSender
#[derive(Default)]
pub struct HttpRequestSenderBuilder {
    base_url: Option<String>,
    token: Option<String>,
    timeout: Option<Duration>,
    user_agent: Option<String>,
}

impl HttpRequestSenderBuilder {
    /// Set the API base URL
    pub fn base_url(mut self, url: &str) -> Self {
        self.base_url = Some(url.to_string());
        self
    }

    /// Set the bearer token
    pub fn token(mut self, token: &str) -> Self {
        self.token = Some(token.to_string());
        self
    }

    /// Set the request timeout
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Override the client identification header
    pub fn user_agent(mut self, user_agent: &str) -> Self {
        self.user_agent = Some(user_agent.to_string());
        self
    }

    /// Build the HttpRequestSender
    pub fn build(self) -> Result<HttpRequestSender, SendError> {
        let base_url = self
            .base_url
            .ok_or_else(|| SendError::Config("API base URL is required".into()))?;
        if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
            return Err(SendError::Config(format!(
                "Invalid base URL '{}': must start with http:// or https://",
                base_url
            )));
        }

        let mut headers = HeaderMap::new();
        let user_agent = self.user_agent.unwrap_or_else(default_user_agent);
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&user_agent)
                .map_err(|e| SendError::Config(format!("Invalid user agent: {}", e)))?,
        );
        if let Some(token) = self.token.filter(|t| !t.is_empty()) {
            let mut value = HeaderValue::from_str(&format!("Bearer {}", token))
                .map_err(|e| SendError::Config(format!("Invalid token: {}", e)))?;
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
        }

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(self.timeout.unwrap_or(DEFAULT_TIMEOUT))
            .build()
            .map_err(|e| SendError::Config(e.to_string()))?;

        Ok(HttpRequestSender {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }
}

impl HttpRequestSender {
    /// Create a new builder for HttpRequestSender
    pub fn builder() -> HttpRequestSenderBuilder {
        HttpRequestSenderBuilder::default()
    }

    /// Create a sender from the `api` configuration section
    pub fn from_config(config: &ApiConfig) -> Result<Self, SendError> {
        let mut builder = Self::builder()
            .base_url(&config.base_url)
            .timeout(Duration::from_secs(config.timeout_seconds))
            .user_agent(&config.user_agent);
        if let Some(ref token) = config.token {
            builder = builder.token(token);
        }
        builder.build()
    }

    /// Get the base URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Resolve a protocol path against the base URL
    pub fn build_url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }
}

#[async_trait]
impl RequestSender for HttpRequestSender {
    #[tracing::instrument(
        name = "api.send",
        skip(self, options),
        fields(
            http.method = %method,
            http.path = %path,
            http.status_code = tracing::field::Empty
        ),
        err
    )]
    async fn send(
        &self,
        method: Method,
        path: &str,
        options: RequestOptions,
    ) -> Result<serde_json::Value, SendError> {
        let url = self.build_url(path);
        let mut request = self.client.request(method, &url);

        for (name, value) in &options.headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| SendError::Request(format!("Invalid header name: {}", e)))?;
            let value = HeaderValue::from_str(value)
                .map_err(|e| SendError::Request(format!("Invalid header value: {}", e)))?;
            request = request.header(name, value);
        }

        request = match options.body {
            RequestBody::Empty => request,
            RequestBody::Bytes(data) => request
                .header(reqwest::header::CONTENT_TYPE, "application/octet-stream")
                .body(data),
            RequestBody::Form(fields) => request.form(&fields),
        };

        let response = request
            .send()
            .await
            .map_err(|e| SendError::Request(e.to_string()))?;

        let status = response.status();
        tracing::Span::current().record("http.status_code", status.as_u16());

        let body = response
            .bytes()
            .await
            .map_err(|e| SendError::Request(e.to_string()))?;

        if !status.is_success() {
            return Err(SendError::Status {
                status: status.as_u16(),
                body: String::from_utf8_lossy(&body).into_owned(),
            });
        }

        decode_body(&body)
    }
}

/// Decode a response body; an empty body is `null`
fn decode_body(body: &[u8]) -> Result<serde_json::Value, SendError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(serde_json::Value::Null);
    }
    serde_json::from_slice(body).map_err(|e| SendError::Decode(e.to_string()))
}
