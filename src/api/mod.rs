//! NetDash Device API
//!
//! Client side of the network-device REST API: wire models, the transport
//! seam and the typed client that reads through the query cache.
//!
//! ## API Endpoints
//!
//! | Endpoint | Method | Description |
//! |----------|--------|-------------|
//! | `/api/devices` | GET | Paginated, sorted, filtered device list |
//! | `/api/devices/{id}` | GET | Device details |
//! | `/api/devices/{id}/alerts` | GET | Alerts raised for a device |
//! | `/api/devices/{id}/interfaces` | GET | Interfaces of a device |
//! | `/api/devices/{id}/alerts/{alertId}/acknowledge` | POST | Acknowledge an alert |
//! | `/api/metrics` | GET | Metric time series (`deviceId`, `metric`, `from`, `to`) |
//!
//! List endpoints answer with `{"items": [...], "totalCount": N}`. Device
//! list filters are sent as `filter[field][operator]=value`.

mod client;
#[cfg(test)]
pub(crate) mod mock;
mod models;
mod transport;

pub use client::*;
pub use models::*;
pub use transport::*;
