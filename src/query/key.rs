//! Query keys
//!
//! A key is the endpoint plus its parameters, sorted so that the same logical
//! request always yields the same key no matter how it was assembled.

use crate::url_state::QueryParams;
use std::fmt;

/// Deterministic identifier for a cached request
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QueryKey {
    endpoint: String,
    params: Vec<(String, String)>,
}

impl QueryKey {
    /// Key for `endpoint` with no parameters
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            params: Vec::new(),
        }
    }

    /// Key for `endpoint` with the given parameters
    pub fn with_params<K, V, I>(endpoint: impl Into<String>, params: I) -> Self
    where
        K: Into<String>,
        V: Into<String>,
        I: IntoIterator<Item = (K, V)>,
    {
        let mut key = Self::new(endpoint);
        for (k, v) in params {
            key.params.push((k.into(), v.into()));
        }
        key.params.sort();
        key
    }

    /// Add one parameter
    pub fn param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.push((key.into(), value.into()));
        self.params.sort();
        self
    }

    /// Endpoint path
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Parameters in canonical order
    pub fn params(&self) -> &[(String, String)] {
        &self.params
    }

    /// Whether this key targets `endpoint` exactly
    pub fn is_endpoint(&self, endpoint: &str) -> bool {
        self.endpoint == endpoint
    }

    /// Whether this key's endpoint lies under `prefix` (`/api/devices` covers
    /// `/api/devices/7/alerts` but not `/api/devices-archive`)
    pub fn is_under(&self, prefix: &str) -> bool {
        let prefix = prefix.trim_end_matches('/');
        match self.endpoint.strip_prefix(prefix) {
            Some(rest) => rest.is_empty() || rest.starts_with('/'),
            None => false,
        }
    }

    /// Encoded query string in canonical order
    pub fn query_string(&self) -> String {
        self.params.iter().cloned().collect::<QueryParams>().to_query_string()
    }

    /// `endpoint?query`, or just the endpoint without parameters
    pub fn path_and_query(&self) -> String {
        if self.params.is_empty() {
            self.endpoint.clone()
        } else {
            format!("{}?{}", self.endpoint, self.query_string())
        }
    }
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path_and_query())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_is_order_independent() {
        let a = QueryKey::with_params("/api/devices", [("page", "1"), ("search", "core")]);
        let b = QueryKey::new("/api/devices")
            .param("search", "core")
            .param("page", "1");
        assert_eq!(a, b);
        assert_eq!(a.path_and_query(), "/api/devices?page=1&search=core");
    }

    #[test]
    fn test_key_distinguishes_params() {
        let a = QueryKey::new("/api/devices").param("page", "1");
        let b = QueryKey::new("/api/devices").param("page", "2");
        assert_ne!(a, b);
    }

    #[test]
    fn test_is_under() {
        let key = QueryKey::new("/api/devices/7/alerts");
        assert!(key.is_under("/api/devices"));
        assert!(key.is_under("/api/devices/"));
        assert!(key.is_under("/api/devices/7/alerts"));
        assert!(!key.is_under("/api/metrics"));
        assert!(!QueryKey::new("/api/devices-archive").is_under("/api/devices"));
    }

    #[test]
    fn test_path_without_params() {
        assert_eq!(QueryKey::new("/api/devices/7").to_string(), "/api/devices/7");
    }
}
