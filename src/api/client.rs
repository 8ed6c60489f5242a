//! Dashboard API client
//!
//! Typed operations over the device API. Reads go through the injected
//! [`QueryCache`]; writes are optimistic mutations over the cached reads they
//! affect.

use super::models::*;
use super::transport::{ApiRequest, Transport};
use crate::error::{DashboardError, Result};
use crate::query::{traced_fetcher, Attempt, Fetcher, QueryCache, QueryKey};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;
use url::form_urlencoded;

/// Device collection endpoint
pub const DEVICES_PATH: &str = "/api/devices";

/// Metrics endpoint
pub const METRICS_PATH: &str = "/api/metrics";

/// Client for the device API
#[derive(Clone)]
pub struct DashboardClient {
    transport: Arc<dyn Transport>,
    cache: QueryCache,
}

impl std::fmt::Debug for DashboardClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DashboardClient")
            .field("cache", &self.cache)
            .finish_non_exhaustive()
    }
}

impl DashboardClient {
    /// Create a client over `transport`, caching reads in `cache`
    pub fn new(transport: Arc<dyn Transport>, cache: QueryCache) -> Self {
        Self { transport, cache }
    }

    /// Shared query cache
    pub fn cache(&self) -> &QueryCache {
        &self.cache
    }

    /// Execute `request` and decode its JSON body.
    ///
    /// Non-2xx statuses become the matching [`DashboardError`]; an empty body
    /// decodes as `null`.
    pub async fn send(&self, request: ApiRequest) -> Result<Value> {
        send_request(self.transport.as_ref(), request).await
    }

    /// Fetcher issuing `GET` for the key's path and query
    pub fn fetcher_for(&self, key: &QueryKey) -> Fetcher {
        // Only the transport is captured: the cache keeps fetchers alive.
        let transport = Arc::clone(&self.transport);
        let path = key.path_and_query();
        traced_fetcher(move || {
            let transport = Arc::clone(&transport);
            let request = ApiRequest::get(path.clone());
            async move {
                let request_id = request.request_id;
                Attempt::new(request_id, send_request(transport.as_ref(), request).await)
            }
        })
    }

    /// Cached `GET` for `key`
    pub async fn get_json(&self, key: &QueryKey) -> Result<Arc<Value>> {
        self.cache.fetch(key, self.fetcher_for(key)).await
    }

    /// Uncached `GET` for `key`: always issues a new request and stores the result
    pub async fn refetch_json(&self, key: &QueryKey) -> Result<Arc<Value>> {
        self.cache.refetch(key, self.fetcher_for(key)).await
    }

    /// Cached `GET` for `key`, decoded as `T`
    pub async fn get<T: DeserializeOwned>(&self, key: &QueryKey) -> Result<T> {
        self.cache.fetch_as(key, self.fetcher_for(key)).await
    }

    /// Cache key of a device list page
    pub fn devices_key(query: &DeviceListQuery) -> QueryKey {
        QueryKey::with_params(DEVICES_PATH, query.to_params())
    }

    /// Cache key of one device
    pub fn device_key(id: &str) -> QueryKey {
        QueryKey::new(format!("{}/{}", DEVICES_PATH, path_segment(id)))
    }

    /// Cache key of a device's alerts
    pub fn alerts_key(device_id: &str) -> QueryKey {
        QueryKey::new(format!("{}/{}/alerts", DEVICES_PATH, path_segment(device_id)))
    }

    /// Cache key of a device's interfaces
    pub fn interfaces_key(device_id: &str) -> QueryKey {
        QueryKey::new(format!("{}/{}/interfaces", DEVICES_PATH, path_segment(device_id)))
    }

    /// Cache key of a metric series
    pub fn metrics_key(query: &MetricsQuery) -> QueryKey {
        QueryKey::with_params(METRICS_PATH, query.to_params())
    }

    /// `GET /api/devices`
    pub async fn list_devices(&self, query: &DeviceListQuery) -> Result<ListResponse<Device>> {
        self.get(&Self::devices_key(query)).await
    }

    /// `GET /api/devices/{id}`
    pub async fn get_device(&self, id: &str) -> Result<Device> {
        self.get(&Self::device_key(id)).await
    }

    /// `GET /api/devices/{id}/alerts`
    pub async fn device_alerts(&self, device_id: &str) -> Result<ListResponse<DeviceAlert>> {
        self.get(&Self::alerts_key(device_id)).await
    }

    /// `GET /api/devices/{id}/interfaces`
    pub async fn device_interfaces(&self, device_id: &str) -> Result<ListResponse<DeviceInterface>> {
        self.get(&Self::interfaces_key(device_id)).await
    }

    /// `GET /api/metrics`
    pub async fn metrics(&self, query: &MetricsQuery) -> Result<MetricSeries> {
        self.get(&Self::metrics_key(query)).await
    }

    /// `POST /api/devices/{id}/alerts/{alertId}/acknowledge`.
    ///
    /// The cached alert list shows the alert as acknowledged while the
    /// request is in flight; a failure restores it.
    pub async fn acknowledge_alert(&self, device_id: &str, alert_id: &str) -> Result<()> {
        let key = Self::alerts_key(device_id);
        let request = ApiRequest::post(
            format!(
                "{}/{}/alerts/{}/acknowledge",
                DEVICES_PATH,
                path_segment(device_id),
                path_segment(alert_id)
            ),
            None,
        );

        self.cache
            .mutate(
                &[key],
                |_, current| mark_acknowledged(current, alert_id),
                async { self.send(request).await.map(|_| ()) },
            )
            .await
    }
}

/// Execute `request` on `transport`, classify the status and decode the body
async fn send_request(transport: &dyn Transport, request: ApiRequest) -> Result<Value> {
    let request_id = request.request_id;
    let method = request.method;
    let path = request.path_and_query.clone();

    let response = match transport.execute(request).await {
        Ok(response) => response,
        Err(e) => {
            tracing::warn!(request_id = %request_id, method = method.as_str(), path = %path, error = %e, "request failed");
            return Err(e);
        }
    };

    if let Some(err) = DashboardError::from_status(
        response.status,
        path.as_str(),
        ApiErrorBody::message_from(&response.body),
    ) {
        tracing::warn!(
            request_id = %request_id,
            method = method.as_str(),
            path = %path,
            status = response.status,
            "request rejected"
        );
        return Err(err);
    }
    if !response.is_success() {
        tracing::warn!(
            request_id = %request_id,
            method = method.as_str(),
            path = %path,
            status = response.status,
            "unexpected response status"
        );
        return Err(DashboardError::network(
            path,
            format!("unexpected status {}", response.status),
        ));
    }

    if response.body.trim().is_empty() {
        return Ok(Value::Null);
    }
    serde_json::from_str(&response.body).map_err(|e| {
        tracing::warn!(
            request_id = %request_id,
            method = method.as_str(),
            path = %path,
            error = %e,
            "response body is not valid JSON"
        );
        DashboardError::Decode(format!("{}: {}", path, e))
    })
}

/// Percent-encode an id for use as one path segment
fn path_segment(id: &str) -> String {
    form_urlencoded::byte_serialize(id.as_bytes()).collect()
}

/// Copy of an alert list with `alert_id` marked acknowledged
fn mark_acknowledged(list: &Value, alert_id: &str) -> Option<Value> {
    let mut next = list.clone();
    let alert = next
        .get_mut("items")?
        .as_array_mut()?
        .iter_mut()
        .find(|alert| alert.get("id").and_then(Value::as_str) == Some(alert_id))?;
    alert["acknowledged"] = Value::Bool(true);
    Some(next)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::mock::MockTransport;
    use crate::api::Method;
    use crate::error::ErrorKind;
    use crate::query::{CacheConfig, RetryPolicy};
    use serde_json::json;

    fn client_with(mock: Arc<MockTransport>) -> DashboardClient {
        let cache = QueryCache::new(CacheConfig {
            retry: RetryPolicy::none(),
            ..CacheConfig::default()
        });
        DashboardClient::new(mock, cache)
    }

    fn alerts_body(acknowledged: bool) -> Value {
        json!({
            "items": [
                { "id": "a1", "deviceId": "7", "severity": "critical", "message": "BGP down", "acknowledged": acknowledged },
                { "id": "a2", "deviceId": "7", "severity": "minor", "message": "fan", "acknowledged": false }
            ],
            "totalCount": 2
        })
    }

    #[tokio::test]
    async fn test_list_devices_decodes_envelope() {
        let mock = Arc::new(MockTransport::new());
        mock.respond_json(
            DEVICES_PATH,
            json!({ "items": [{ "id": "1", "hostName": "router-01" }], "totalCount": 1 }),
        );
        let client = client_with(Arc::clone(&mock));

        let page = client.list_devices(&DeviceListQuery::new(10)).await.unwrap();
        assert_eq!(page.total_count, 1);
        assert_eq!(page.items[0].host_name, "router-01");

        // second read is served from cache
        client.list_devices(&DeviceListQuery::new(10)).await.unwrap();
        assert_eq!(mock.requests().len(), 1);
    }

    #[tokio::test]
    async fn test_status_classification() {
        let mock = Arc::new(MockTransport::new());
        mock.respond(Method::Get, "/api/devices/9", 404, r#"{"message":"no such device"}"#);
        mock.respond(Method::Get, "/api/devices/8", 401, "");
        mock.respond(Method::Get, "/api/devices/7", 422, r#"{"message":"bad id"}"#);
        let client = client_with(mock);

        assert_eq!(client.get_device("9").await.unwrap_err().kind(), ErrorKind::NotFound);
        assert_eq!(client.get_device("8").await.unwrap_err().kind(), ErrorKind::Unauthorized);
        let err = client.get_device("7").await.unwrap_err();
        assert_eq!(
            err,
            DashboardError::client(422, "/api/devices/7", "bad id")
        );
    }

    #[tokio::test]
    async fn test_undecodable_body() {
        let mock = Arc::new(MockTransport::new());
        mock.respond(Method::Get, "/api/devices/1", 200, "<html>");
        let client = client_with(mock);

        let err = client.get_device("1").await.unwrap_err();
        assert!(matches!(err, DashboardError::Decode(_)));
    }

    #[tokio::test]
    async fn test_error_state_names_the_failing_request() {
        let mock = Arc::new(MockTransport::new());
        mock.respond(Method::Get, "/api/devices/3", 503, r#"{"message":"maintenance"}"#);
        mock.respond(Method::Get, "/api/devices/4", 200, "not json");
        let client = client_with(Arc::clone(&mock));

        for id in ["3", "4"] {
            assert!(client.get_device(id).await.is_err());
            let state = client.cache().state(&DashboardClient::device_key(id));
            let sent = &mock.requests_to(&format!("{}/{}", DEVICES_PATH, id))[0];
            assert!(state.is_error());
            assert_eq!(state.request_id, Some(sent.request_id));
        }
    }

    #[tokio::test]
    async fn test_metrics_query_params() {
        let mock = Arc::new(MockTransport::new());
        mock.respond_json(
            METRICS_PATH,
            json!({ "metric": "cpu", "points": [{ "timestamp": "2024-05-01T10:00:00Z", "value": 12.5 }] }),
        );
        let client = client_with(Arc::clone(&mock));

        let series = client.metrics(&MetricsQuery::new("7", "cpu")).await.unwrap();
        assert_eq!(series.points.len(), 1);

        let request = &mock.requests()[0];
        assert_eq!(request.path(), METRICS_PATH);
        assert_eq!(request.query(), "deviceId=7&metric=cpu");
    }

    #[tokio::test]
    async fn test_ids_are_encoded_as_one_segment() {
        assert_eq!(DashboardClient::device_key("a/b").endpoint(), "/api/devices/a%2Fb");
        assert_eq!(DashboardClient::alerts_key("7").endpoint(), "/api/devices/7/alerts");
    }

    #[tokio::test]
    async fn test_acknowledge_alert_commits() {
        let mock = Arc::new(MockTransport::new());
        mock.respond_json("/api/devices/7/alerts", alerts_body(false));
        mock.respond(Method::Post, "/api/devices/7/alerts/a1/acknowledge", 204, "");
        let client = client_with(Arc::clone(&mock));

        client.device_alerts("7").await.unwrap();
        client.acknowledge_alert("7", "a1").await.unwrap();

        let key = DashboardClient::alerts_key("7");
        let state = client.cache().state(&key);
        assert!(state.is_stale);
        assert_eq!(state.data.unwrap()["items"][0]["acknowledged"], json!(true));
        assert_eq!(mock.requests_to("/api/devices/7/alerts/a1/acknowledge").len(), 1);
    }

    #[tokio::test]
    async fn test_acknowledge_alert_rolls_back_on_failure() {
        let mock = Arc::new(MockTransport::new());
        mock.respond_json("/api/devices/7/alerts", alerts_body(false));
        mock.respond(Method::Post, "/api/devices/7/alerts/a1/acknowledge", 500, "boom");
        let client = client_with(Arc::clone(&mock));

        let before = client.device_alerts("7").await.unwrap();
        let err = client.acknowledge_alert("7", "a1").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Server);

        let after = client.device_alerts("7").await.unwrap();
        assert_eq!(before, after);
        assert!(!after.items[0].acknowledged);
        assert_eq!(mock.requests_to("/api/devices/7/alerts").len(), 1);
    }

    #[test]
    fn test_mark_acknowledged_unknown_alert() {
        assert!(mark_acknowledged(&alerts_body(false), "zz").is_none());
        assert!(mark_acknowledged(&json!({ "items": "oops" }), "a1").is_none());
    }
}
