//! HTTP transport
//!
//! The [`Transport`] trait is the seam between the client and the network.
//! [`HttpTransport`] is the production implementation on top of `reqwest`;
//! tests substitute an in-memory transport.

use crate::error::{DashboardError, Result};
use async_trait::async_trait;
use serde_json::Value;
use std::time::{Duration, Instant};
use url::Url;
use uuid::Uuid;

/// Header carrying the per-request correlation id
pub const REQUEST_ID_HEADER: &str = "X-Request-Id";

/// Default fixed request timeout
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// HTTP method
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
        }
    }
}

/// One API request, identified by a correlation id
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    /// Method
    pub method: Method,
    /// Absolute path plus query string, e.g. `/api/devices?page=1`
    pub path_and_query: String,
    /// JSON body
    pub body: Option<Value>,
    /// Correlation id sent as `X-Request-Id`
    pub request_id: Uuid,
}

impl ApiRequest {
    /// GET request
    pub fn get(path_and_query: impl Into<String>) -> Self {
        Self {
            method: Method::Get,
            path_and_query: path_and_query.into(),
            body: None,
            request_id: Uuid::new_v4(),
        }
    }

    /// POST request with an optional JSON body
    pub fn post(path_and_query: impl Into<String>, body: Option<Value>) -> Self {
        Self {
            method: Method::Post,
            path_and_query: path_and_query.into(),
            body,
            request_id: Uuid::new_v4(),
        }
    }

    /// Path without the query string
    pub fn path(&self) -> &str {
        self.path_and_query
            .split_once('?')
            .map_or(self.path_and_query.as_str(), |(path, _)| path)
    }

    /// Query string without the leading `?`
    pub fn query(&self) -> &str {
        self.path_and_query
            .split_once('?')
            .map_or("", |(_, query)| query)
    }
}

/// Raw response: status plus body text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: String,
}

impl ApiResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// 200 with a JSON body
    pub fn json(value: &Value) -> Self {
        Self::new(200, value.to_string())
    }

    /// 2xx
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Executes API requests.
///
/// Implementations report only transport-level failures (connect, timeout)
/// as errors; every HTTP status, including 4xx and 5xx, is returned as an
/// [`ApiResponse`] and classified by the client.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send `request` and return the raw response
    async fn execute(&self, request: ApiRequest) -> Result<ApiResponse>;
}

/// `reqwest`-backed transport with a base URL, fixed timeout and optional bearer token
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: Url,
    token: Option<String>,
    timeout: Duration,
}

impl HttpTransport {
    /// Create a transport for `base_url` with the given request timeout
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let base_url = Url::parse(base_url)
            .map_err(|e| DashboardError::config(format!("invalid base URL '{}': {}", base_url, e)))?;
        if base_url.cannot_be_a_base() {
            return Err(DashboardError::config(format!(
                "base URL '{}' cannot carry paths",
                base_url
            )));
        }

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("netdash/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            base_url,
            token: None,
            timeout,
        })
    }

    /// Send `Authorization: Bearer <token>` with every request
    pub fn with_token(mut self, token: Option<String>) -> Self {
        self.token = token.filter(|t| !t.is_empty());
        self
    }

    /// Base URL requests are resolved against
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn resolve(&self, path_and_query: &str) -> Result<Url> {
        Ok(self.base_url.join(path_and_query)?)
    }

    fn map_send_error(&self, url: &Url, err: reqwest::Error) -> DashboardError {
        if err.is_timeout() {
            DashboardError::Timeout {
                url: url.to_string(),
                seconds: self.timeout.as_secs(),
            }
        } else {
            DashboardError::network(url.as_str(), err.to_string())
        }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn execute(&self, request: ApiRequest) -> Result<ApiResponse> {
        let url = self.resolve(&request.path_and_query)?;
        let started = Instant::now();

        let mut builder = match request.method {
            Method::Get => self.client.get(url.clone()),
            Method::Post => self.client.post(url.clone()),
        }
        .header(REQUEST_ID_HEADER, request.request_id.to_string())
        .header(reqwest::header::ACCEPT, "application/json");

        if let Some(token) = &self.token {
            builder = builder.bearer_auth(token);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        tracing::debug!(
            request_id = %request.request_id,
            method = request.method.as_str(),
            url = %url,
            "sending request"
        );

        let response = builder
            .send()
            .await
            .map_err(|e| self.map_send_error(&url, e))?;
        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| self.map_send_error(&url, e))?;

        tracing::info!(
            request_id = %request.request_id,
            method = request.method.as_str(),
            url = %url,
            status,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "request completed"
        );

        Ok(ApiResponse { status, body })
    }
}
