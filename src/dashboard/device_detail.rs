//! Device detail and metric views
//!
//! Per-device pages: the device record, optionally its alerts and
//! interfaces, and metric series. Lists reuse the table renderer so they
//! share cell formatting with the device list.

use crate::api::{DashboardClient, Device, DeviceAlert, DeviceInterface, ListResponse, MetricSeries};
use crate::error::Result;
use crate::table::{
    plain_text, Align, Column, RenderedTable, TableRenderer, TableView, BYTES_RENDERER,
    STATUS_RENDERER, TIMESTAMP_RENDERER,
};
use crate::url_state::PageState;
use comfy_table::presets::UTF8_FULL_CONDENSED;
use comfy_table::{modifiers::UTF8_ROUND_CORNERS, Table};
use serde::Serialize;
use serde_json::Value;

/// Columns of the alerts table
pub fn alert_columns() -> Vec<Column> {
    vec![
        Column::new("severity", "Severity").renderer(STATUS_RENDERER),
        Column::new("message", "Message"),
        Column::new("raisedAt", "Raised").renderer(TIMESTAMP_RENDERER),
        Column::new("acknowledged", "Ack").align(Align::Center),
    ]
}

/// Columns of the interfaces table
pub fn interface_columns() -> Vec<Column> {
    vec![
        Column::new("name", "Interface"),
        Column::new("status", "Status").renderer(STATUS_RENDERER).align(Align::Center),
        Column::new("speedMbps", "Speed (Mb/s)").align(Align::Right),
        Column::new("macAddress", "MAC"),
        Column::new("rxBytes", "RX").renderer(BYTES_RENDERER).align(Align::Right),
        Column::new("txBytes", "TX").renderer(BYTES_RENDERER).align(Align::Right),
    ]
}

/// Columns of a metric series table
pub fn metric_columns() -> Vec<Column> {
    vec![
        Column::new("timestamp", "Time").renderer(TIMESTAMP_RENDERER),
        Column::new("value", "Value").align(Align::Right),
    ]
}

/// Render a complete (unpaginated) list of items as a table
pub fn render_items<T: Serialize>(table: &TableRenderer, items: &[T]) -> Result<RenderedTable> {
    let rows = items
        .iter()
        .map(serde_json::to_value)
        .collect::<std::result::Result<Vec<Value>, _>>()?;
    let page = PageState::first(rows.len().max(1) as u32);
    Ok(table.render(
        TableView::Loaded {
            rows: &rows,
            total_count: rows.len() as u64,
        },
        None,
        &page,
    ))
}

/// A device with the related lists that were requested
#[derive(Debug, Clone, Serialize)]
pub struct DeviceDetail {
    pub device: Device,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alerts: Option<ListResponse<DeviceAlert>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interfaces: Option<ListResponse<DeviceInterface>>,
}

impl DeviceDetail {
    /// Load a device and, concurrently, the related lists asked for
    pub async fn load(client: &DashboardClient, id: &str, alerts: bool, interfaces: bool) -> Result<Self> {
        let alerts_fut = async {
            match alerts {
                true => client.device_alerts(id).await.map(Some),
                false => Ok(None),
            }
        };
        let interfaces_fut = async {
            match interfaces {
                true => client.device_interfaces(id).await.map(Some),
                false => Ok(None),
            }
        };
        let (device, alerts, interfaces) =
            tokio::try_join!(client.get_device(id), alerts_fut, interfaces_fut)?;
        Ok(Self {
            device,
            alerts,
            interfaces,
        })
    }

    /// Key/value summary of the device record
    pub fn summary_text(&self) -> String {
        let device = &self.device;
        let location = device.location.as_ref();
        let last_seen = device
            .last_seen
            .map(|t| t.format("%Y-%m-%d %H:%M:%S UTC").to_string());

        let fields: [(&str, Option<String>); 9] = [
            ("ID", Some(device.id.clone())),
            ("Host", Some(device.host_name.clone())),
            ("IP address", device.ip_address.clone()),
            ("Vendor", device.vendor.clone()),
            ("Model", device.model.clone()),
            ("Status", Some(device.status.as_str().to_uppercase())),
            ("Site", location.and_then(|l| l.site.clone())),
            ("Rack", location.and_then(|l| l.rack.clone())),
            ("Last seen", last_seen),
        ];

        let mut table = Table::new();
        table
            .load_preset(UTF8_FULL_CONDENSED)
            .apply_modifier(UTF8_ROUND_CORNERS);
        for (label, value) in fields {
            table.add_row(vec![label.to_string(), value.unwrap_or_else(|| "-".to_string())]);
        }
        if !device.tags.is_empty() {
            let tags = Value::from(device.tags.clone());
            table.add_row(vec!["Tags".to_string(), plain_text(&tags)]);
        }
        table.to_string()
    }

    /// Alerts table, when alerts were loaded
    pub fn alerts_table(&self) -> Result<Option<RenderedTable>> {
        let Some(alerts) = &self.alerts else {
            return Ok(None);
        };
        let table = TableRenderer::new(alert_columns()).with_empty_message("No alerts.");
        render_items(&table, &alerts.items).map(Some)
    }

    /// Interfaces table, when interfaces were loaded
    pub fn interfaces_table(&self) -> Result<Option<RenderedTable>> {
        let Some(interfaces) = &self.interfaces else {
            return Ok(None);
        };
        let table = TableRenderer::new(interface_columns())
            .with_row_id(|row: &Value| plain_text(&row["name"]))
            .with_empty_message("No interfaces.");
        render_items(&table, &interfaces.items).map(Some)
    }
}

/// Table of a metric series' samples
pub fn metrics_table(series: &MetricSeries) -> Result<RenderedTable> {
    let table = TableRenderer::new(metric_columns())
        .with_row_id(|row: &Value| plain_text(&row["timestamp"]))
        .with_empty_message("No samples in the selected range.");
    render_items(&table, &series.points)
}

/// One-line min/avg/max/latest summary of a series
pub fn metrics_summary(series: &MetricSeries) -> Option<String> {
    let summary = series.summary()?;
    let unit = series.unit.as_deref().unwrap_or("");
    Some(format!(
        "{} over {} samples: min {:.2}{unit} avg {:.2}{unit} max {:.2}{unit} latest {:.2}{unit}",
        series.metric,
        series.points.len(),
        summary.min,
        summary.avg,
        summary.max,
        summary.latest.value,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::mock::MockTransport;
    use crate::query::{CacheConfig, QueryCache, RetryPolicy};
    use serde_json::json;
    use std::sync::Arc;

    fn client(mock: &Arc<MockTransport>) -> DashboardClient {
        let cache = QueryCache::new(CacheConfig {
            retry: RetryPolicy::none(),
            ..CacheConfig::default()
        });
        DashboardClient::new(mock.clone(), cache)
    }

    fn device_json() -> Value {
        json!({
            "id": "42",
            "hostName": "core-1",
            "ipAddress": "10.0.0.1",
            "status": "up",
            "location": { "site": "ams1" },
            "tags": ["edge", "lab"]
        })
    }

    #[tokio::test]
    async fn test_load_device_only() {
        let mock = Arc::new(MockTransport::new());
        mock.respond_json("/api/devices/42", device_json());
        let client = client(&mock);

        let detail = DeviceDetail::load(&client, "42", false, false).await.unwrap();
        assert_eq!(detail.device.host_name, "core-1");
        assert!(detail.alerts.is_none());
        assert!(detail.alerts_table().unwrap().is_none());
        assert_eq!(mock.requests().len(), 1);

        let text = detail.summary_text();
        assert!(text.contains("core-1"));
        assert!(text.contains("UP"));
        assert!(text.contains("edge, lab"));
    }

    #[tokio::test]
    async fn test_load_with_related_lists() {
        let mock = Arc::new(MockTransport::new());
        mock.respond_json("/api/devices/42", device_json());
        mock.respond_json(
            "/api/devices/42/alerts",
            json!({
                "items": [{ "id": "a1", "deviceId": "42", "severity": "major", "message": "BGP down" }],
                "totalCount": 1
            }),
        );
        mock.respond_json(
            "/api/devices/42/interfaces",
            json!({
                "items": [{ "name": "xe-0/0/1", "status": "up", "rxBytes": 2048, "txBytes": 0 }],
                "totalCount": 1
            }),
        );
        let client = client(&mock);

        let detail = DeviceDetail::load(&client, "42", true, true).await.unwrap();
        let alerts = detail.alerts_table().unwrap().unwrap();
        assert_eq!(alerts.row_count(), 1);
        assert_eq!(alerts.cell(0, 0), Some("[MAJOR]"));
        assert_eq!(alerts.cell(0, 1), Some("BGP down"));
        assert!(alerts.pagination.is_none());

        let interfaces = detail.interfaces_table().unwrap().unwrap();
        assert_eq!(interfaces.rows()[0].id, "xe-0/0/1");
        assert_eq!(interfaces.cell(0, 1), Some("[UP]"));
        assert_eq!(mock.requests().len(), 3);
    }

    #[tokio::test]
    async fn test_missing_device_fails_whole_load() {
        let mock = Arc::new(MockTransport::new());
        mock.respond(crate::api::Method::Get, "/api/devices/7", 404, r#"{"message": "no such device"}"#);
        let client = client(&mock);

        let err = DeviceDetail::load(&client, "7", false, false).await.unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::NotFound);
    }

    #[test]
    fn test_empty_alerts_render_empty_state() {
        let detail = DeviceDetail {
            device: serde_json::from_value(device_json()).unwrap(),
            alerts: Some(ListResponse::new(Vec::new(), 0)),
            interfaces: None,
        };
        let table = detail.alerts_table().unwrap().unwrap();
        assert!(table.is_empty_state());
    }

    #[test]
    fn test_metrics_table_and_summary() {
        let series: MetricSeries = serde_json::from_value(json!({
            "metric": "cpu",
            "unit": "%",
            "points": [
                { "timestamp": "2024-05-01T00:00:00Z", "value": 10.0 },
                { "timestamp": "2024-05-01T00:01:00Z", "value": 30.0 }
            ]
        }))
        .unwrap();

        let table = metrics_table(&series).unwrap();
        assert_eq!(table.row_count(), 2);
        assert_eq!(table.cell(1, 0), Some("2024-05-01 00:01:00 UTC"));
        assert_eq!(table.cell(1, 1), Some("30.0"));

        let summary = metrics_summary(&series).unwrap();
        assert!(summary.starts_with("cpu over 2 samples"));
        assert!(summary.contains("avg 20.00%"));

        let empty = MetricSeries {
            points: Vec::new(),
            ..series
        };
        assert!(metrics_summary(&empty).is_none());
        assert!(metrics_table(&empty).unwrap().is_empty_state());
    }
}
