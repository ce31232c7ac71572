//! Vendor HTTP client
//!
//! A thin wrapper over `reqwest` that gives every vendor the same
//! behaviour:
//! - JSON `Accept` header and a 5 minute timeout
//! - keep-alive disabled
//! - non-2xx responses turned into an end-user message built from the
//!   vendor's own error envelope
//! - transport failures reported against the URL that was called

use crate::auth::{Authentication, Authenticator};
use crate::error::{Error, Result};
use bytes::Bytes;
use reqwest::header::HeaderMap;
use reqwest::multipart::Form;
use reqwest::{Client, Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, warn};

/// Default request timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(300);

/// MIME type for JSON documents
pub const MIME_TYPE_JSON: &str = "application/json";

// ============================================================================
// Error envelopes
// ============================================================================

/// A vendor error payload that can yield a human-readable message
pub trait ErrorBody: DeserializeOwned {
    /// The message to show, if the payload carries one
    fn message(&self) -> Option<String>;
}

/// Function that pulls a message out of a raw error body
pub type ErrorExtractor = fn(&[u8]) -> Option<String>;

fn extract_message<E: ErrorBody>(body: &[u8]) -> Option<String> {
    serde_json::from_slice::<E>(body)
        .ok()
        .and_then(|e| e.message())
        .filter(|m| !m.is_empty())
}

// ============================================================================
// Client configuration
// ============================================================================

/// Configuration for a vendor client
#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    /// Vendor display name used in error messages
    pub vendor: String,
    /// Base URL for all requests
    pub base_url: Option<String>,
    /// Request timeout
    pub timeout: Duration,
    /// Default headers for all requests
    pub default_headers: HashMap<String, String>,
    /// User agent string
    pub user_agent: String,
    /// Error envelope decoder
    pub error_extractor: Option<ErrorExtractor>,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        let mut default_headers = HashMap::new();
        default_headers.insert("Accept".to_string(), MIME_TYPE_JSON.to_string());

        Self {
            vendor: "Vendor".to_string(),
            base_url: None,
            timeout: DEFAULT_TIMEOUT,
            default_headers,
            user_agent: format!("vdp-connector/{}", env!("CARGO_PKG_VERSION")),
            error_extractor: None,
        }
    }
}

impl HttpClientConfig {
    /// Create a new config builder
    pub fn builder() -> HttpClientConfigBuilder {
        HttpClientConfigBuilder::default()
    }
}

/// Builder for vendor client config
#[derive(Default)]
pub struct HttpClientConfigBuilder {
    config: HttpClientConfig,
}

impl HttpClientConfigBuilder {
    /// Set the vendor display name
    pub fn vendor(mut self, vendor: impl Into<String>) -> Self {
        self.config.vendor = vendor.into();
        self
    }

    /// Set the base URL
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.config.base_url = Some(url.into());
        self
    }

    /// Set the request timeout
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    /// Add a default header
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.config.default_headers.insert(key.into(), value.into());
        self
    }

    /// Send `Authorization: Bearer <token>` on every request
    pub fn bearer_auth(self, token: &str) -> Self {
        self.header("Authorization", format!("Bearer {token}"))
    }

    /// Set user agent
    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.config.user_agent = agent.into();
        self
    }

    /// Decode error bodies as `E` to build end-user messages
    pub fn error_body<E: ErrorBody>(mut self) -> Self {
        self.config.error_extractor = Some(extract_message::<E>);
        self
    }

    /// Build the config
    pub fn build(self) -> HttpClientConfig {
        self.config
    }
}

// ============================================================================
// Requests
// ============================================================================

/// Request payload
#[derive(Debug)]
pub enum Body {
    /// JSON document
    Json(Value),
    /// multipart/form-data
    Multipart(Form),
    /// Raw bytes with an explicit content type
    Bytes {
        /// Content-Type header value
        content_type: String,
        /// Payload
        data: Vec<u8>,
    },
}

/// Configuration for a single request
#[derive(Debug, Default)]
pub struct RequestConfig {
    /// Query parameters, in order
    pub query: Vec<(String, String)>,
    /// Request headers
    pub headers: HashMap<String, String>,
    /// Request body
    pub body: Option<Body>,
    /// Override timeout for this request
    pub timeout: Option<Duration>,
}

impl RequestConfig {
    /// Create a new request config
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a query parameter
    #[must_use]
    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    /// Add a header
    #[must_use]
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    /// Set JSON body
    #[must_use]
    pub fn json(mut self, body: Value) -> Self {
        self.body = Some(Body::Json(body));
        self
    }

    /// Set multipart body
    #[must_use]
    pub fn multipart(mut self, form: Form) -> Self {
        self.body = Some(Body::Multipart(form));
        self
    }

    /// Set raw body
    #[must_use]
    pub fn bytes(mut self, content_type: impl Into<String>, data: Vec<u8>) -> Self {
        self.body = Some(Body::Bytes {
            content_type: content_type.into(),
            data,
        });
        self
    }

    /// Set timeout
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// A fully read response
#[derive(Debug, Clone)]
pub struct HttpResponse {
    /// Status code
    pub status: StatusCode,
    /// Response headers
    pub headers: HeaderMap,
    /// Raw body
    pub body: Bytes,
}

impl HttpResponse {
    /// Body as lossy UTF-8
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

// ============================================================================
// Client
// ============================================================================

/// HTTP client bound to one vendor
pub struct HttpClient {
    client: Client,
    config: HttpClientConfig,
    authenticator: Option<Authenticator>,
}

impl HttpClient {
    /// Create a new client with custom configuration
    pub fn with_config(config: HttpClientConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent(&config.user_agent)
            .pool_max_idle_per_host(0)
            .build()
            .map_err(|e| Error::config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            config,
            authenticator: None,
        })
    }

    /// Create a client that authenticates every request
    pub fn with_auth(config: HttpClientConfig, auth: Authentication) -> Result<Self> {
        let mut client = Self::with_config(config)?;
        client.authenticator = Some(Authenticator::new(auth));
        Ok(client)
    }

    /// Vendor display name
    pub fn vendor(&self) -> &str {
        &self.config.vendor
    }

    /// Send a request and fail on non-2xx statuses
    pub async fn request(
        &self,
        method: Method,
        path: &str,
        config: RequestConfig,
    ) -> Result<HttpResponse> {
        let response = self.send_unchecked(method, path, config).await?;
        if response.status.is_success() {
            return Ok(response);
        }

        warn!(
            vendor = %self.config.vendor,
            status = response.status.as_u16(),
            body = %response.text(),
            "HTTP request failed"
        );
        Err(self.status_error(&response))
    }

    /// Send a request and return the response whatever its status
    ///
    /// Only transport failures are errors.
    pub async fn send_unchecked(
        &self,
        method: Method,
        path: &str,
        config: RequestConfig,
    ) -> Result<HttpResponse> {
        let full_url = self.build_url(path);
        let mut req = self.client.request(method.clone(), &full_url);

        for (key, value) in &self.config.default_headers {
            req = req.header(key.as_str(), value.as_str());
        }
        for (key, value) in &config.headers {
            req = req.header(key.as_str(), value.as_str());
        }
        if !config.query.is_empty() {
            req = req.query(&config.query);
        }
        if let Some(timeout) = config.timeout {
            req = req.timeout(timeout);
        }
        req = match config.body {
            Some(Body::Json(body)) => req.json(&body),
            Some(Body::Multipart(form)) => req.multipart(form),
            Some(Body::Bytes { content_type, data }) => {
                req.header("Content-Type", content_type).body(data)
            }
            None => req,
        };
        if let Some(ref auth) = self.authenticator {
            req = auth.apply(req)?;
        }

        let response = req.send().await.map_err(|source| {
            warn!(url = %full_url, error = %source, "HTTP transport error");
            Error::Transport {
                url: full_url.clone(),
                source,
            }
        })?;

        let status = response.status();
        let headers = response.headers().clone();
        let body = response.bytes().await.map_err(|source| Error::Transport {
            url: full_url.clone(),
            source,
        })?;

        debug!(%method, url = %full_url, status = status.as_u16(), "Request completed");
        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }

    /// Send a request and decode a JSON response
    pub async fn request_json<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        config: RequestConfig,
    ) -> Result<T> {
        let response = self.request(method, path, config).await?;
        self.decode(&response)
    }

    /// GET and decode a JSON response
    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        self.request_json(Method::GET, path, RequestConfig::default())
            .await
    }

    /// POST a JSON body and decode a JSON response
    pub async fn post_json<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T> {
        let body = serde_json::to_value(body)?;
        self.request_json(Method::POST, path, RequestConfig::new().json(body))
            .await
    }

    /// Decode a response body as JSON
    pub fn decode<T: DeserializeOwned>(&self, response: &HttpResponse) -> Result<T> {
        serde_json::from_slice(&response.body)
            .map_err(|e| Error::decode(&self.config.vendor, e.to_string()))
    }

    /// Build the end-user error for a non-2xx response
    fn status_error(&self, response: &HttpResponse) -> Error {
        let message = self
            .config
            .error_extractor
            .and_then(|extract| extract(&response.body))
            .or_else(|| {
                let raw = response.text();
                let raw = raw.trim();
                (!raw.is_empty()).then(|| raw.to_string())
            })
            .unwrap_or_else(|| {
                format!(
                    "Please refer to {}'s API reference for more information.",
                    self.config.vendor
                )
            });

        Error::vendor(&self.config.vendor, response.status.as_u16(), message)
    }

    /// Build full URL from path
    fn build_url(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            return path.to_string();
        }

        match &self.config.base_url {
            Some(base) => {
                let base = base.trim_end_matches('/');
                let path = path.trim_start_matches('/');
                if path.is_empty() {
                    base.to_string()
                } else {
                    format!("{base}/{path}")
                }
            }
            None => path.to_string(),
        }
    }
}

impl std::fmt::Debug for HttpClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpClient")
            .field("vendor", &self.config.vendor)
            .field("base_url", &self.config.base_url)
            .field("has_authenticator", &self.authenticator.is_some())
            .finish_non_exhaustive()
    }
}
