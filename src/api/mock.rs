//! In-memory transport for tests

use super::transport::{ApiRequest, ApiResponse, Method, Transport};
use crate::error::{DashboardError, Result};
use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::time::Duration;

/// Scripted responses per `(method, path)`; records every request.
///
/// Queued responses are served in order and the last one repeats.
#[derive(Default)]
pub(crate) struct MockTransport {
    routes: Mutex<HashMap<(Method, String), VecDeque<Result<ApiResponse>>>>,
    requests: Mutex<Vec<ApiRequest>>,
    delay: Duration,
}

impl MockTransport {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Delay every response by `delay`
    pub(crate) fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Queue a response for `method path`
    pub(crate) fn respond(&self, method: Method, path: &str, status: u16, body: impl Into<String>) -> &Self {
        self.push(method, path, Ok(ApiResponse::new(status, body)))
    }

    /// Queue a 200 JSON response for `GET path`
    pub(crate) fn respond_json(&self, path: &str, value: Value) -> &Self {
        self.push(Method::Get, path, Ok(ApiResponse::json(&value)))
    }

    /// Queue a transport failure for `method path`
    pub(crate) fn fail(&self, method: Method, path: &str, message: &str) -> &Self {
        self.push(method, path, Err(DashboardError::network(path, message)))
    }

    fn push(&self, method: Method, path: &str, response: Result<ApiResponse>) -> &Self {
        self.routes
            .lock()
            .entry((method, path.to_string()))
            .or_default()
            .push_back(response);
        self
    }

    /// Every request received so far
    pub(crate) fn requests(&self) -> Vec<ApiRequest> {
        self.requests.lock().clone()
    }

    /// Requests received for `path`
    pub(crate) fn requests_to(&self, path: &str) -> Vec<ApiRequest> {
        self.requests
            .lock()
            .iter()
            .filter(|r| r.path() == path)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn execute(&self, request: ApiRequest) -> Result<ApiResponse> {
        let route = (request.method, request.path().to_string());
        self.requests.lock().push(request);

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        let mut routes = self.routes.lock();
        match routes.get_mut(&route) {
            Some(queue) if queue.len() > 1 => queue
                .pop_front()
                .unwrap_or_else(|| Ok(ApiResponse::new(404, ""))),
            Some(queue) => queue
                .front()
                .cloned()
                .unwrap_or_else(|| Ok(ApiResponse::new(404, ""))),
            None => Ok(ApiResponse::new(404, r#"{"message":"no route"}"#)),
        }
    }
}
