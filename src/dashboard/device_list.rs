//! Device list view
//!
//! The URL is the source of truth. Every user action edits the URL state;
//! the query key, the request and the rendered table are derived from it.

use crate::api::{DashboardClient, DeviceListQuery, ListResponse};
use crate::error::{DashboardError, Result};
use crate::filter::{FilterClause, FilterOperator};
use crate::query::{QueryKey, QueryStatus};
use crate::table::{
    Align, Column, RenderedTable, TableRenderer, TableView, STATUS_RENDERER, TIMESTAMP_RENDERER,
};
use crate::url_state::{ListState, Navigation, SortState, UrlStateManager};
use serde_json::Value;
use std::sync::Arc;

/// Default columns of the device table
pub fn device_columns() -> Vec<Column> {
    vec![
        Column::new("hostName", "Host").sortable(),
        Column::new("ipAddress", "IP Address"),
        Column::new("vendor", "Vendor").sortable(),
        Column::new("model", "Model"),
        Column::new("status", "Status")
            .sortable()
            .renderer(STATUS_RENDERER)
            .align(Align::Center),
        Column::new("location.site", "Site").sortable(),
        Column::new("lastSeen", "Last Seen")
            .sortable()
            .renderer(TIMESTAMP_RENDERER),
    ]
}

/// Paginated, sortable, filterable device list
#[derive(Debug)]
pub struct DeviceListView {
    client: DashboardClient,
    url: UrlStateManager,
    table: TableRenderer,
    default_page_size: u32,
}

impl DeviceListView {
    /// Create a view over `client` whose state lives in `url`
    pub fn new(client: DashboardClient, url: UrlStateManager, default_page_size: u32) -> Self {
        Self {
            client,
            url,
            table: TableRenderer::new(device_columns()).with_empty_message("No devices match the current filters."),
            default_page_size: default_page_size.max(1),
        }
    }

    /// Replace the table renderer (columns, renderers, row callbacks)
    pub fn with_table(mut self, table: TableRenderer) -> Self {
        self.table = table;
        self
    }

    pub fn table(&self) -> &TableRenderer {
        &self.table
    }

    pub fn url(&self) -> &UrlStateManager {
        &self.url
    }

    /// Current location, e.g. `/devices?page=2&pageSize=25`
    pub fn location(&self) -> String {
        self.url.location()
    }

    /// List state parsed from the URL
    pub fn list_state(&self) -> ListState {
        ListState::from_url(&self.url, self.default_page_size)
    }

    /// Request parameters for the current state
    pub fn query(&self) -> DeviceListQuery {
        DeviceListQuery::from(&self.list_state())
    }

    /// Cache key for the current state
    pub fn query_key(&self) -> QueryKey {
        DashboardClient::devices_key(&self.query())
    }

    /// Fetch the current page (from cache when fresh) and render it.
    ///
    /// Failures render as the error state rather than returning an error.
    pub async fn load(&self) -> RenderedTable {
        let key = self.query_key();
        let _observer = self.client.cache().observe(&key);
        let result = self.client.get_json(&key).await;
        self.render_result(result)
    }

    /// Re-issue the identical request, bypassing cached data and errors
    pub async fn retry(&self) -> RenderedTable {
        let key = self.query_key();
        let _observer = self.client.cache().observe(&key);
        tracing::info!(key = %key, "retrying device list");
        let result = self.client.refetch_json(&key).await;
        self.render_result(result)
    }

    /// Render whatever the cache holds for the current state without fetching
    pub fn render_current(&self) -> RenderedTable {
        let state = self.client.cache().state(&self.query_key());
        match (&state.data, &state.error) {
            (Some(data), _) => self.render_result(Ok(Arc::clone(data))),
            (None, Some(error)) if state.status == QueryStatus::Error => {
                self.render_result(Err(error.clone()))
            }
            _ => self.render_view(TableView::Loading),
        }
    }

    /// Header click: toggles or switches the sort. Page is kept.
    pub fn click_header(&mut self, column: &str) -> bool {
        let mut state = self.list_state();
        let Some(sort) = self.table.header_click(column, state.sort.as_ref()) else {
            return false;
        };
        state.sort = Some(sort);
        state.write_to(&mut self.url, Navigation::Push)
    }

    /// Sort by a column in an explicit direction. Unsortable columns are ignored.
    pub fn set_sort(&mut self, sort: SortState) -> bool {
        if !self.table.column(&sort.column).is_some_and(|c| c.sortable) {
            tracing::debug!(column = %sort.column, "ignoring sort on unsortable column");
            return false;
        }
        self.edit(Navigation::Push, |state| {
            if state.sort.as_ref() == Some(&sort) {
                return false;
            }
            state.sort = Some(sort);
            true
        })
    }

    /// Change the search text; typing replaces the current history entry
    pub fn set_search(&mut self, search: &str) -> bool {
        self.edit(Navigation::Replace, |state| state.set_search(Some(search)))
    }

    pub fn set_page_size(&mut self, page_size: u32) -> bool {
        self.edit(Navigation::Push, |state| state.set_page_size(page_size))
    }

    pub fn go_to_page(&mut self, page: u32) -> bool {
        self.edit(Navigation::Push, |state| state.go_to_page(page))
    }

    /// Upsert a filter clause (an empty value removes it)
    pub fn apply_filter(&mut self, clause: FilterClause) -> bool {
        self.edit(Navigation::Push, |state| state.apply_filter(clause))
    }

    pub fn remove_filter(&mut self, field: &str, operator: FilterOperator) -> bool {
        self.edit(Navigation::Push, |state| state.remove_filter(field, operator))
    }

    pub fn clear_filters(&mut self) -> bool {
        self.edit(Navigation::Push, ListState::clear_filters)
    }

    pub fn back(&mut self) -> bool {
        self.url.back()
    }

    pub fn forward(&mut self) -> bool {
        self.url.forward()
    }

    fn edit(&mut self, mode: Navigation, change: impl FnOnce(&mut ListState) -> bool) -> bool {
        let mut state = self.list_state();
        if !change(&mut state) {
            return false;
        }
        state.write_to(&mut self.url, mode)
    }

    fn render_result(&self, result: Result<Arc<Value>>) -> RenderedTable {
        let page = result.and_then(|data| {
            serde_json::from_value::<ListResponse<Value>>((*data).clone()).map_err(DashboardError::from)
        });
        match page {
            Ok(page) => self.render_view(TableView::Loaded {
                rows: &page.items,
                total_count: page.total_count,
            }),
            Err(error) => self.render_view(TableView::Error(&error)),
        }
    }

    fn render_view(&self, view: TableView<'_>) -> RenderedTable {
        let state = self.list_state();
        self.table.render(view, state.sort.as_ref(), &state.page)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::mock::MockTransport;
    use crate::api::{Method, DEVICES_PATH};
    use crate::query::{CacheConfig, QueryCache, RetryPolicy};
    use crate::table::{ErrorAction, SortIndicator};
    use crate::url_state::QueryParams;
    use serde_json::json;
    use std::time::Duration;

    fn view(mock: &Arc<MockTransport>, location: &str) -> DeviceListView {
        view_with(
            mock,
            location,
            CacheConfig {
                retry: RetryPolicy::none(),
                ..CacheConfig::default()
            },
        )
    }

    fn view_with(mock: &Arc<MockTransport>, location: &str, config: CacheConfig) -> DeviceListView {
        let client = DashboardClient::new(Arc::clone(mock) as _, QueryCache::new(config));
        DeviceListView::new(client, UrlStateManager::from_location(location).unwrap(), 25)
    }

    fn one_router(host_name: &str) -> Value {
        json!({ "items": [{ "id": "1", "hostName": host_name }], "totalCount": 1 })
    }

    #[tokio::test]
    async fn test_single_router_renders_one_row_without_pagination() {
        let mock = Arc::new(MockTransport::new());
        mock.respond_json(
            DEVICES_PATH,
            json!({ "items": [{ "id": "1", "hostName": "router-01" }], "totalCount": 1 }),
        );
        let view = view(
            &mock,
            "/devices?pageSize=10&page=1&sort=hostName&direction=asc&search=router",
        );

        let table = view.load().await;

        assert_eq!(table.row_count(), 1);
        assert_eq!(table.cell(0, 0), Some("router-01"));
        assert!(table.pagination.is_none());
        assert_eq!(table.headers[0].indicator, SortIndicator::Ascending);

        let requests = mock.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].method, Method::Get);
        let sent = QueryParams::parse(requests[0].query());
        assert_eq!(sent.get("pageSize"), Some("10"));
        assert_eq!(sent.get("page"), Some("1"));
        assert_eq!(sent.get("sort"), Some("hostName"));
        assert_eq!(sent.get("direction"), Some("asc"));
        assert_eq!(sent.get("search"), Some("router"));
        assert_eq!(sent.len(), 5);
    }

    #[tokio::test]
    async fn test_server_error_renders_retry_and_retry_reissues_same_request() {
        let mock = Arc::new(MockTransport::new());
        mock.respond(Method::Get, DEVICES_PATH, 500, r#"{"message":"database unavailable"}"#);
        mock.respond_json(
            DEVICES_PATH,
            json!({ "items": [{ "id": "1", "hostName": "router-01" }], "totalCount": 1 }),
        );
        let view = view(&mock, "/devices?page=1");

        let table = view.load().await;
        assert!(table.is_error());
        assert_eq!(table.retry_action(), Some(ErrorAction::Retry));
        assert_eq!(view.render_current(), table);

        let table = view.retry().await;
        assert_eq!(table.row_count(), 1);

        let requests = mock.requests_to(DEVICES_PATH);
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].path_and_query, requests[1].path_and_query);
        assert_ne!(requests[0].request_id, requests[1].request_id);
    }

    #[tokio::test(start_paused = true)]
    async fn test_loading_skeleton_while_in_flight() {
        let mock = Arc::new(MockTransport::new().with_delay(Duration::from_millis(100)));
        mock.respond_json(DEVICES_PATH, json!({ "items": [], "totalCount": 0 }));
        let view = view(&mock, "/devices");

        assert!(view.render_current().is_loading());
        let (loaded, during) = tokio::join!(view.load(), async {
            tokio::task::yield_now().await;
            view.render_current()
        });

        assert!(during.is_loading());
        assert!(loaded.is_empty_state());
        assert!(view.render_current().is_empty_state());
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_page_is_replaced_after_background_refetch() {
        let mock = Arc::new(MockTransport::new());
        mock.respond_json(DEVICES_PATH, one_router("router-01"));
        mock.respond_json(DEVICES_PATH, one_router("router-02"));
        let view = view_with(
            &mock,
            "/devices",
            CacheConfig {
                stale_time: Duration::from_secs(10),
                retry: RetryPolicy::none(),
                ..CacheConfig::default()
            },
        );

        assert_eq!(view.load().await.cell(0, 0), Some("router-01"));
        tokio::time::advance(Duration::from_secs(11)).await;

        // stale data renders at once while the refetch runs
        assert_eq!(view.load().await.cell(0, 0), Some("router-01"));
        tokio::time::sleep(Duration::from_secs(1)).await;

        assert_eq!(view.render_current().cell(0, 0), Some("router-02"));
        assert_eq!(mock.requests_to(DEVICES_PATH).len(), 2);
        assert!(!view.client.cache().state(&view.query_key()).is_stale);
    }

    #[tokio::test(start_paused = true)]
    async fn test_connection_failures_are_retried_until_loaded() {
        let mock = Arc::new(MockTransport::new());
        mock.fail(Method::Get, DEVICES_PATH, "connection reset by peer");
        mock.fail(Method::Get, DEVICES_PATH, "connection refused");
        mock.respond_json(DEVICES_PATH, one_router("router-01"));
        let view = view_with(
            &mock,
            "/devices",
            CacheConfig {
                retry: RetryPolicy {
                    max_retries: 2,
                    base_delay: Duration::from_millis(500),
                    max_delay: Duration::from_secs(5),
                },
                ..CacheConfig::default()
            },
        );

        let table = view.load().await;

        assert!(!table.is_error());
        assert_eq!(table.row_count(), 1);
        assert_eq!(table.cell(0, 0), Some("router-01"));
        let requests = mock.requests_to(DEVICES_PATH);
        assert_eq!(requests.len(), 3);
        assert_eq!(
            view.client.cache().state(&view.query_key()).request_id,
            Some(requests[2].request_id)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_connection_failures_past_retry_limit_render_retry() {
        let mock = Arc::new(MockTransport::new());
        mock.fail(Method::Get, DEVICES_PATH, "connection refused");
        let view = view_with(
            &mock,
            "/devices",
            CacheConfig {
                retry: RetryPolicy {
                    max_retries: 1,
                    base_delay: Duration::from_millis(100),
                    max_delay: Duration::from_secs(1),
                },
                ..CacheConfig::default()
            },
        );

        let table = view.load().await;

        assert!(table.is_error());
        assert_eq!(table.retry_action(), Some(ErrorAction::Retry));
        assert_eq!(mock.requests_to(DEVICES_PATH).len(), 2);
    }

    #[tokio::test]
    async fn test_url_actions() {
        let mock = Arc::new(MockTransport::new());
        let mut view = view(&mock, "/devices?page=4&view=compact");

        assert!(view.click_header("hostName"));
        assert_eq!(view.list_state().page.page, 4);
        assert!(view.click_header("hostName"));
        assert_eq!(view.url().get("direction"), Some("desc"));
        assert!(!view.click_header("ipAddress"));

        assert!(view.set_search("core"));
        assert_eq!(view.list_state().page.page, 1);

        view.go_to_page(3);
        assert!(view.apply_filter(FilterClause::new("status", FilterOperator::Equals, "up")));
        assert_eq!(view.list_state().page.page, 1);
        assert_eq!(view.url().get("status.equals"), Some("up"));
        assert_eq!(view.url().get("view"), Some("compact"));

        let key = view.query_key();
        assert!(key.params().contains(&("filter[status][equals]".to_string(), "up".to_string())));

        assert!(view.back());
        assert_eq!(view.url().get("status.equals"), None);
        assert_eq!(view.list_state().page.page, 3);
        assert!(view.forward());
        assert_eq!(view.url().get("status.equals"), Some("up"));

        assert!(view.remove_filter("status", FilterOperator::Equals));
        assert!(!view.clear_filters());
        assert!(view.set_page_size(50));
        assert_eq!(view.url().get("pageSize"), Some("50"));
    }

    #[tokio::test]
    async fn test_set_sort() {
        let mock = Arc::new(MockTransport::new());
        let mut view = view(&mock, "/devices?page=2");

        assert!(view.set_sort(SortState::descending("status")));
        assert_eq!(view.url().get("sort"), Some("status"));
        assert_eq!(view.url().get("direction"), Some("desc"));
        assert_eq!(view.list_state().page.page, 2);

        assert!(!view.set_sort(SortState::descending("status")));
        assert!(!view.set_sort(SortState::ascending("model")));
        assert_eq!(view.url().get("sort"), Some("status"));
    }

    #[tokio::test]
    async fn test_distinct_states_use_distinct_keys() {
        let mock = Arc::new(MockTransport::new());
        mock.respond_json(DEVICES_PATH, json!({ "items": [], "totalCount": 0 }));
        let mut view = view(&mock, "/devices");

        view.load().await;
        view.load().await;
        assert_eq!(mock.requests().len(), 1);

        view.go_to_page(2);
        view.load().await;
        assert_eq!(mock.requests().len(), 2);

        view.back();
        view.load().await;
        assert_eq!(mock.requests().len(), 2);
    }

    #[tokio::test]
    async fn test_pagination_for_multiple_pages() {
        let mock = Arc::new(MockTransport::new());
        let items: Vec<Value> = (0..10)
            .map(|i| json!({ "id": i.to_string(), "hostName": format!("sw-{:02}", i) }))
            .collect();
        mock.respond_json(DEVICES_PATH, json!({ "items": items, "totalCount": 35 }));
        let view = view(&mock, "/devices?pageSize=10&page=2");

        let table = view.load().await;
        let controls = table.pagination.unwrap();
        assert_eq!(controls.total_pages, 4);
        assert_eq!(controls.page, 2);
        assert_eq!(table.rows()[3].id, "3");
    }

    #[tokio::test]
    async fn test_not_found_has_no_retry() {
        let mock = Arc::new(MockTransport::new());
        mock.respond(Method::Get, DEVICES_PATH, 404, "");
        let view = view(&mock, "/devices");

        let table = view.load().await;
        assert!(table.is_error());
        assert_eq!(table.retry_action(), None);
    }
}
