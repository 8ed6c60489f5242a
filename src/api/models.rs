//! API Data Models
//!
//! Wire types for the device REST API. JSON field names are camelCase.

use crate::filter::FilterComposer;
use crate::url_state::{ListState, PageState, SortState};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Device operational status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DeviceStatus {
    Up,
    Down,
    Degraded,
    Maintenance,
    #[default]
    #[serde(other)]
    Unknown,
}

impl DeviceStatus {
    /// Wire name
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Up => "up",
            Self::Down => "down",
            Self::Degraded => "degraded",
            Self::Maintenance => "maintenance",
            Self::Unknown => "unknown",
        }
    }
}

/// Physical location of a device
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceLocation {
    /// Site code
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub site: Option<String>,
    /// Rack identifier
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rack: Option<String>,
}

/// Network device
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Device {
    /// Unique device ID
    pub id: String,
    /// Hostname
    pub host_name: String,
    /// Management IP address
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip_address: Option<String>,
    /// Vendor (cisco, juniper, arista, ...)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vendor: Option<String>,
    /// Hardware model
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    /// Operational status
    #[serde(default)]
    pub status: DeviceStatus,
    /// Location
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<DeviceLocation>,
    /// Last time the device was polled successfully
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_seen: Option<DateTime<Utc>>,
    /// Free-form tags
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
}

/// Alert severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AlertSeverity {
    Critical,
    Major,
    Minor,
    Warning,
    #[default]
    #[serde(other)]
    Info,
}

/// Alert raised for a device
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceAlert {
    /// Alert ID
    pub id: String,
    /// Device the alert belongs to
    pub device_id: String,
    /// Severity
    #[serde(default)]
    pub severity: AlertSeverity,
    /// Human-readable message
    pub message: String,
    /// When the alert was raised
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raised_at: Option<DateTime<Utc>>,
    /// Whether an operator acknowledged the alert
    #[serde(default)]
    pub acknowledged: bool,
}

/// Interface link status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub enum InterfaceStatus {
    Up,
    Down,
    AdminDown,
    #[default]
    #[serde(other)]
    Unknown,
}

/// Network interface of a device
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceInterface {
    /// Interface name (e.g. `xe-0/0/1`)
    pub name: String,
    /// Link status
    #[serde(default)]
    pub status: InterfaceStatus,
    /// Negotiated speed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speed_mbps: Option<u64>,
    /// MAC address
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mac_address: Option<String>,
    /// Bytes received
    #[serde(default)]
    pub rx_bytes: u64,
    /// Bytes transmitted
    #[serde(default)]
    pub tx_bytes: u64,
}

/// One sample of a metric
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetricPoint {
    pub timestamp: DateTime<Utc>,
    pub value: f64,
}

/// Time series for one metric of one device
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricSeries {
    /// Device ID
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_id: Option<String>,
    /// Metric name (e.g. `cpu`, `ifInOctets`)
    pub metric: String,
    /// Unit of the values
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    /// Samples in time order
    #[serde(default)]
    pub points: Vec<MetricPoint>,
}

/// Min/max/average over a series
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MetricSummary {
    pub min: f64,
    pub max: f64,
    pub avg: f64,
    pub latest: MetricPoint,
}

impl MetricSeries {
    /// Summary statistics, or `None` for an empty series
    pub fn summary(&self) -> Option<MetricSummary> {
        let latest = *self.points.last()?;
        let (mut min, mut max, mut sum) = (f64::INFINITY, f64::NEG_INFINITY, 0.0);
        for point in &self.points {
            min = min.min(point.value);
            max = max.max(point.value);
            sum += point.value;
        }
        Some(MetricSummary {
            min,
            max,
            avg: sum / self.points.len() as f64,
            latest,
        })
    }
}

/// List envelope: one page of items plus the total across all pages
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListResponse<T> {
    /// Items on this page
    pub items: Vec<T>,
    /// Total items across all pages
    #[serde(default)]
    pub total_count: u64,
}

impl<T> ListResponse<T> {
    pub fn new(items: Vec<T>, total_count: u64) -> Self {
        Self { items, total_count }
    }

    /// Whether this page holds no items
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Error body returned by the API
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiErrorBody {
    /// Error code
    #[serde(default)]
    pub code: Option<String>,
    /// Error message
    pub message: String,
    /// Additional details
    #[serde(default)]
    pub details: Option<serde_json::Value>,
}

impl ApiErrorBody {
    /// Best message for an error response: the JSON `message` field when
    /// present, otherwise the raw body
    pub fn message_from(body: &str) -> String {
        match serde_json::from_str::<ApiErrorBody>(body) {
            Ok(parsed) => parsed.message,
            Err(_) => body.trim().chars().take(200).collect(),
        }
    }
}

/// Parameters of `GET /api/devices`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceListQuery {
    /// Page and page size
    pub page: PageState,
    /// Sort column and direction
    pub sort: Option<SortState>,
    /// Free-text search
    pub search: Option<String>,
    /// Active filters
    pub filters: FilterComposer,
}

impl DeviceListQuery {
    /// First page, unsorted, unfiltered
    pub fn new(page_size: u32) -> Self {
        Self::from(&ListState::new(page_size))
    }

    /// Backend query parameters
    pub fn to_params(&self) -> Vec<(String, String)> {
        let mut params = vec![
            ("pageSize".to_string(), self.page.page_size.to_string()),
            ("page".to_string(), self.page.page.to_string()),
        ];
        if let Some(sort) = &self.sort {
            params.push(("sort".to_string(), sort.column.clone()));
            params.push(("direction".to_string(), sort.direction.as_str().to_string()));
        }
        if let Some(search) = &self.search {
            params.push(("search".to_string(), search.clone()));
        }
        params.extend(self.filters.to_backend_params());
        params
    }
}

impl From<&ListState> for DeviceListQuery {
    fn from(state: &ListState) -> Self {
        Self {
            page: state.page,
            sort: state.sort.clone(),
            search: state.search.clone(),
            filters: state.filters.clone(),
        }
    }
}

/// Parameters of `GET /api/metrics`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricsQuery {
    pub device_id: String,
    pub metric: String,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

impl MetricsQuery {
    pub fn new(device_id: impl Into<String>, metric: impl Into<String>) -> Self {
        Self {
            device_id: device_id.into(),
            metric: metric.into(),
            from: None,
            to: None,
        }
    }

    /// Restrict to `[from, to]`
    pub fn between(mut self, from: Option<DateTime<Utc>>, to: Option<DateTime<Utc>>) -> Self {
        self.from = from;
        self.to = to;
        self
    }

    /// Backend query parameters; timestamps are RFC 3339
    pub fn to_params(&self) -> Vec<(String, String)> {
        let mut params = vec![
            ("deviceId".to_string(), self.device_id.clone()),
            ("metric".to_string(), self.metric.clone()),
        ];
        if let Some(from) = self.from {
            params.push(("from".to_string(), from.to_rfc3339()));
        }
        if let Some(to) = self.to {
            params.push(("to".to_string(), to.to_rfc3339()));
        }
        params
    }
}
