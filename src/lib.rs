//! # NetDash - Network Device Dashboard Core
//!
//! NetDash is the client core of a network-device dashboard: it keeps list
//! state in the URL, fetches through a de-duplicating query cache, and
//! renders API data as tables.
//!
//! ## Features
//!
//! - **URL State**: page, sort, search and filters round-trip through the query string
//! - **Query Cache**: request de-duplication, stale-while-revalidate, retries with backoff
//! - **Optimistic Mutations**: snapshot, apply, then commit or roll back
//! - **Filter Composer**: typed `field operator value` clauses, one per field/operator
//! - **Table Renderer**: column descriptors, pluggable cell renderers, loading/empty/error states
//! - **API Client**: typed device, alert, interface and metric endpoints over `reqwest`
//!
//! ## Quick Start
//!
//! ```no_run
//! use netdash::api::{DashboardClient, HttpTransport, DEFAULT_REQUEST_TIMEOUT};
//! use netdash::dashboard::DeviceListView;
//! use netdash::query::{CacheConfig, QueryCache};
//! use netdash::url_state::UrlStateManager;
//! use std::sync::Arc;
//!
//! # async fn run() -> netdash::Result<()> {
//! let transport = HttpTransport::new("http://127.0.0.1:8080", DEFAULT_REQUEST_TIMEOUT)?;
//! let cache = QueryCache::new(CacheConfig::default());
//! let client = DashboardClient::new(Arc::new(transport), cache.clone());
//!
//! let url = UrlStateManager::from_location("/devices?sort=hostName&search=core")?;
//! let mut view = DeviceListView::new(client, url, 25);
//!
//! println!("{}", view.load().await);
//!
//! view.click_header("hostName");
//! println!("{}", view.location());
//!
//! cache.dispose();
//! # Ok(())
//! # }
//! ```
//!
//! ## Filters
//!
//! ```
//! use netdash::filter::{FilterClause, FilterComposer, FilterOperator};
//!
//! let mut filters = FilterComposer::new();
//! filters.add(FilterClause::new("status", FilterOperator::Equals, "down"));
//! filters.add(FilterClause::new("status", FilterOperator::Equals, "degraded"));
//!
//! assert_eq!(filters.len(), 1);
//! assert_eq!(
//!     filters.to_backend_params(),
//!     vec![("filter[status][equals]".to_string(), "degraded".to_string())]
//! );
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod api;
pub mod config;
pub mod dashboard;
pub mod error;
pub mod filter;
pub mod progress;
pub mod query;
pub mod table;
pub mod url_state;

// Re-export commonly used types
pub use config::DashboardConfig;
pub use error::{DashboardError, Result};
pub use query::QueryCache;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Prelude module for convenient imports
pub mod prelude {
    //! Convenient re-exports for common usage
    //!
    //! ```no_run
    //! use netdash::prelude::*;
    //! ```

    pub use crate::api::{DashboardClient, DeviceListQuery, HttpTransport, MetricsQuery, Transport};
    pub use crate::config::{CliArgs, DashboardConfig};
    pub use crate::dashboard::{DeviceDetail, DeviceListView};
    pub use crate::error::{DashboardError, ErrorKind, Result};
    pub use crate::filter::{FilterClause, FilterComposer, FilterOperator};
    pub use crate::progress::LoadingSpinner;
    pub use crate::query::{CacheConfig, Mutation, QueryCache, QueryKey, RetryPolicy};
    pub use crate::table::{Column, RenderedTable, RendererRegistry, TableRenderer};
    pub use crate::url_state::{ListState, Navigation, SortState, UrlStateManager};
}
