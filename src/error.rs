//! Error types for NetDash
//!
//! This module defines the error taxonomy shared by the transport, the query
//! cache and the views. Errors are cloneable so a single failed request can be
//! handed to every caller waiting on the same query key.

use thiserror::Error;

/// Main error type for NetDash operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DashboardError {
    /// The request never reached the server (DNS, connect, reset)
    #[error("Network error for '{url}': {message}")]
    Network { url: String, message: String },

    /// The server answered with a 5xx status
    #[error("Server error {status} for '{url}': {message}")]
    Server {
        status: u16,
        url: String,
        message: String,
    },

    /// The server rejected the request with a 4xx status
    #[error("Client error {status} for '{url}': {message}")]
    Client {
        status: u16,
        url: String,
        message: String,
    },

    /// 401/403: credentials missing or rejected
    #[error("Unauthorized ({status}) for '{url}'")]
    Unauthorized { status: u16, url: String },

    /// 404: the requested resource does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// The transport's fixed request timeout elapsed
    #[error("Request to '{url}' timed out after {seconds} seconds")]
    Timeout { url: String, seconds: u64 },

    /// Response body could not be decoded
    #[error("Failed to decode response: {0}")]
    Decode(String),

    /// Malformed URL or query-string state
    #[error("Invalid URL state: {0}")]
    InvalidState(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// The request was abandoned before it completed
    #[error("Request cancelled")]
    Cancelled,

    /// Generic error with context
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<DashboardError>,
    },
}

/// Coarse classification used by views to pick a user-facing state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Request never reached the server (includes timeouts)
    Network,
    /// 5xx
    Server,
    /// 4xx other than 401/403/404
    Client,
    /// 404
    NotFound,
    /// 401/403
    Unauthorized,
    /// Local failures: decoding, configuration, cancellation
    Other,
}

impl DashboardError {
    /// Create a network error
    pub fn network(url: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Network {
            url: url.into(),
            message: message.into(),
        }
    }

    /// Create a server (5xx) error
    pub fn server(status: u16, url: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Server {
            status,
            url: url.into(),
            message: message.into(),
        }
    }

    /// Create a client (4xx) error
    pub fn client(status: u16, url: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Client {
            status,
            url: url.into(),
            message: message.into(),
        }
    }

    /// Map an HTTP status and body to the matching error variant.
    ///
    /// Returns `None` for non-error statuses.
    pub fn from_status(status: u16, url: impl Into<String>, body: impl Into<String>) -> Option<Self> {
        let url = url.into();
        match status {
            401 | 403 => Some(Self::Unauthorized { status, url }),
            404 => Some(Self::NotFound(url)),
            400..=499 => Some(Self::client(status, url, body)),
            500..=599 => Some(Self::server(status, url, body)),
            _ => None,
        }
    }

    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::ConfigError(message.into())
    }

    /// Add context to an error
    pub fn with_context(self, context: impl Into<String>) -> Self {
        Self::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Classify this error for presentation
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Network { .. } | Self::Timeout { .. } => ErrorKind::Network,
            Self::Server { .. } => ErrorKind::Server,
            Self::Client { .. } => ErrorKind::Client,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::Unauthorized { .. } => ErrorKind::Unauthorized,
            Self::WithContext { source, .. } => source.kind(),
            Self::Decode(_) | Self::InvalidState(_) | Self::ConfigError(_) | Self::Cancelled => {
                ErrorKind::Other
            }
        }
    }

    /// Check if this error is recoverable (can be retried)
    pub fn is_recoverable(&self) -> bool {
        matches!(self.kind(), ErrorKind::Network | ErrorKind::Server)
    }

    /// Check if this error is any 4xx rejection
    pub fn is_client_error(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::Client | ErrorKind::NotFound | ErrorKind::Unauthorized
        )
    }

    /// HTTP status carried by this error, if any
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Server { status, .. }
            | Self::Client { status, .. }
            | Self::Unauthorized { status, .. } => Some(*status),
            Self::NotFound(_) => Some(404),
            Self::WithContext { source, .. } => source.status(),
            _ => None,
        }
    }

    /// Short message suitable for an error banner
    pub fn user_message(&self) -> String {
        match self.kind() {
            ErrorKind::Unauthorized => "Your session has expired. Please sign in again.".to_string(),
            ErrorKind::NotFound => "The requested item was not found.".to_string(),
            ErrorKind::Network => "Unable to reach the server. Check your connection.".to_string(),
            ErrorKind::Server => "The server encountered an error. Please try again.".to_string(),
            ErrorKind::Client | ErrorKind::Other => format!("Something went wrong: {}", self),
        }
    }
}

/// Result type alias for NetDash operations
pub type Result<T> = std::result::Result<T, DashboardError>;

impl From<serde_json::Error> for DashboardError {
    fn from(err: serde_json::Error) -> Self {
        DashboardError::Decode(err.to_string())
    }
}

impl From<url::ParseError> for DashboardError {
    fn from(err: url::ParseError) -> Self {
        DashboardError::InvalidState(err.to_string())
    }
}

impl From<reqwest::Error> for DashboardError {
    fn from(err: reqwest::Error) -> Self {
        let url = err.url().map(|u| u.to_string()).unwrap_or_default();
        if err.is_timeout() {
            DashboardError::Timeout { url, seconds: 0 }
        } else if err.is_decode() {
            DashboardError::Decode(err.to_string())
        } else if let Some(status) = err.status() {
            DashboardError::from_status(status.as_u16(), url.clone(), err.to_string())
                .unwrap_or_else(|| DashboardError::network(url, err.to_string()))
        } else {
            DashboardError::network(url, err.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_status_classification() {
        let url = "/api/devices";
        assert_eq!(DashboardError::from_status(200, url, ""), None);
        assert_eq!(
            DashboardError::from_status(404, url, "").unwrap().kind(),
            ErrorKind::NotFound
        );
        assert_eq!(
            DashboardError::from_status(401, url, "").unwrap().kind(),
            ErrorKind::Unauthorized
        );
        assert_eq!(
            DashboardError::from_status(422, url, "bad").unwrap().kind(),
            ErrorKind::Client
        );
        assert_eq!(
            DashboardError::from_status(503, url, "down").unwrap().kind(),
            ErrorKind::Server
        );
    }

    #[test]
    fn test_error_recoverability() {
        assert!(DashboardError::server(500, "/api", "boom").is_recoverable());
        assert!(DashboardError::network("/api", "reset").is_recoverable());
        assert!(DashboardError::Timeout { url: "/api".into(), seconds: 30 }.is_recoverable());

        assert!(!DashboardError::client(400, "/api", "bad").is_recoverable());
        assert!(!DashboardError::NotFound("/api/devices/9".into()).is_recoverable());
        assert!(!DashboardError::Decode("eof".into()).is_recoverable());
    }

    #[test]
    fn test_context_preserves_kind() {
        let err = DashboardError::server(502, "/api", "gateway").with_context("loading devices");
        assert_eq!(err.kind(), ErrorKind::Server);
        assert_eq!(err.status(), Some(502));
        assert!(err.is_recoverable());
        assert!(err.to_string().starts_with("loading devices:"));
    }

    #[test]
    fn test_user_message() {
        let err = DashboardError::from_status(401, "/api/devices", "").unwrap();
        assert!(err.user_message().contains("sign in"));
        let err = DashboardError::NotFound("/api/devices/1".into());
        assert!(err.user_message().contains("not found"));
    }
}
