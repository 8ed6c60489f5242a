//! Pagination, sort and list state carried in the URL

use super::manager::{Navigation, UrlStateManager};
use super::query_string::QueryParams;
use crate::filter::{FilterClause, FilterComposer, FilterOperator};
use serde::{Deserialize, Serialize};

/// Query-string key for the 1-based page number
pub const PAGE_KEY: &str = "page";
/// Query-string key for the page size
pub const PAGE_SIZE_KEY: &str = "pageSize";
/// Query-string key for the sort column
pub const SORT_KEY: &str = "sort";
/// Query-string key for the sort direction
pub const DIRECTION_KEY: &str = "direction";
/// Query-string key for free-text search
pub const SEARCH_KEY: &str = "search";

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    /// Ascending
    #[default]
    Asc,
    /// Descending
    Desc,
}

impl SortDirection {
    /// URL representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }

    /// Parse the URL representation (case-insensitive)
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "asc" => Some(Self::Asc),
            "desc" => Some(Self::Desc),
            _ => None,
        }
    }

    /// The opposite direction
    pub fn toggled(self) -> Self {
        match self {
            Self::Asc => Self::Desc,
            Self::Desc => Self::Asc,
        }
    }
}

/// Active sort column and direction
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SortState {
    /// Column key
    pub column: String,
    /// Direction
    pub direction: SortDirection,
}

impl SortState {
    /// Ascending sort on `column`
    pub fn ascending(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            direction: SortDirection::Asc,
        }
    }

    /// Descending sort on `column`
    pub fn descending(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            direction: SortDirection::Desc,
        }
    }

    /// Next sort after a header click on `column`.
    ///
    /// Clicking the active column toggles its direction; any other column
    /// starts ascending. There is no way back to unsorted.
    pub fn after_click(current: Option<&SortState>, column: &str) -> SortState {
        match current {
            Some(active) if active.column == column => SortState {
                column: active.column.clone(),
                direction: active.direction.toggled(),
            },
            _ => SortState::ascending(column),
        }
    }

    /// Read from `sort`/`direction`; a missing or unknown direction means ascending
    pub fn from_params(params: &QueryParams) -> Option<Self> {
        let column = params.get(SORT_KEY).filter(|c| !c.is_empty())?;
        let direction = params
            .get(DIRECTION_KEY)
            .and_then(SortDirection::parse)
            .unwrap_or_default();
        Some(Self {
            column: column.to_string(),
            direction,
        })
    }
}

/// Page number and size
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PageState {
    /// 1-based page number
    pub page: u32,
    /// Rows per page, always > 0
    pub page_size: u32,
}

impl PageState {
    /// Create a page state, clamping page to ≥ 1 and page size to > 0
    pub fn new(page: u32, page_size: u32) -> Self {
        Self {
            page: page.max(1),
            page_size: page_size.max(1),
        }
    }

    /// First page with the given size
    pub fn first(page_size: u32) -> Self {
        Self::new(1, page_size)
    }

    /// Number of rows to skip
    pub fn offset(&self) -> u64 {
        u64::from(self.page - 1) * u64::from(self.page_size)
    }

    /// Pages needed for `total` rows (at least one)
    pub fn total_pages(&self, total: u64) -> u32 {
        let pages = total.div_ceil(u64::from(self.page_size));
        u32::try_from(pages).unwrap_or(u32::MAX).max(1)
    }

    /// Read from `page`/`pageSize`; invalid values fall back to defaults
    pub fn from_params(params: &QueryParams, default_page_size: u32) -> Self {
        let page = params
            .get(PAGE_KEY)
            .and_then(|s| s.parse::<u32>().ok())
            .filter(|p| *p >= 1)
            .unwrap_or(1);
        let page_size = params
            .get(PAGE_SIZE_KEY)
            .and_then(|s| s.parse::<u32>().ok())
            .filter(|s| *s >= 1)
            .unwrap_or(default_page_size);
        Self::new(page, page_size)
    }
}

/// Everything a list view keeps in the URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListState {
    /// Pagination
    pub page: PageState,
    /// Active sort, if any
    pub sort: Option<SortState>,
    /// Free-text search, never empty when present
    pub search: Option<String>,
    /// Active filters
    pub filters: FilterComposer,
}

impl ListState {
    /// Default state: first page, unsorted, unfiltered
    pub fn new(page_size: u32) -> Self {
        Self {
            page: PageState::first(page_size),
            sort: None,
            search: None,
            filters: FilterComposer::new(),
        }
    }

    /// Read the full list state from query parameters
    pub fn from_params(params: &QueryParams, default_page_size: u32) -> Self {
        Self {
            page: PageState::from_params(params, default_page_size),
            sort: SortState::from_params(params),
            search: params
                .get(SEARCH_KEY)
                .filter(|s| !s.is_empty())
                .map(str::to_string),
            filters: FilterComposer::from_params(params),
        }
    }

    /// Read the list state from the current URL
    pub fn from_url(url: &UrlStateManager, default_page_size: u32) -> Self {
        Self::from_params(url.params(), default_page_size)
    }

    /// Write the keys this state owns, leaving every other key untouched
    pub fn write_params(&self, params: &mut QueryParams) {
        params.set(PAGE_KEY, self.page.page.to_string());
        params.set(PAGE_SIZE_KEY, self.page.page_size.to_string());

        match &self.sort {
            Some(sort) => {
                params.set(SORT_KEY, sort.column.as_str());
                params.set(DIRECTION_KEY, sort.direction.as_str());
            }
            None => {
                params.remove(SORT_KEY);
                params.remove(DIRECTION_KEY);
            }
        }

        match &self.search {
            Some(search) if !search.is_empty() => params.set(SEARCH_KEY, search.as_str()),
            _ => {
                params.remove(SEARCH_KEY);
            }
        }

        self.filters.write_params(params);
    }

    /// Write this state into the URL as one navigation
    pub fn write_to(&self, url: &mut UrlStateManager, mode: Navigation) -> bool {
        url.update(mode, |params| self.write_params(params))
    }

    /// Change the search text; resets to page 1 on change
    pub fn set_search(&mut self, search: Option<&str>) -> bool {
        let search = search
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string);
        if search == self.search {
            return false;
        }
        self.search = search;
        self.reset_page();
        true
    }

    /// Change the page size; resets to page 1 on change
    pub fn set_page_size(&mut self, page_size: u32) -> bool {
        let page_size = page_size.max(1);
        if page_size == self.page.page_size {
            return false;
        }
        self.page = PageState::first(page_size);
        true
    }

    /// Jump to a page (clamped to ≥ 1)
    pub fn go_to_page(&mut self, page: u32) -> bool {
        let page = page.max(1);
        if page == self.page.page {
            return false;
        }
        self.page.page = page;
        true
    }

    /// Upsert a filter; resets to page 1 on change
    pub fn apply_filter(&mut self, clause: FilterClause) -> bool {
        let changed = self.filters.add(clause);
        if changed {
            self.reset_page();
        }
        changed
    }

    /// Remove a filter; resets to page 1 on change
    pub fn remove_filter(&mut self, field: &str, operator: FilterOperator) -> bool {
        let changed = self.filters.remove(field, operator);
        if changed {
            self.reset_page();
        }
        changed
    }

    /// Drop every filter; resets to page 1 on change
    pub fn clear_filters(&mut self) -> bool {
        let changed = self.filters.clear();
        if changed {
            self.reset_page();
        }
        changed
    }

    /// Header click on `column`
    pub fn click_sort(&mut self, column: &str) -> &SortState {
        self.sort.insert(SortState::after_click(self.sort.as_ref(), column))
    }

    fn reset_page(&mut self) {
        self.page.page = 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::FilterValue;
    use proptest::prelude::*;

    #[test]
    fn test_sort_toggle_sequence() {
        let mut state = ListState::new(25);
        assert_eq!(state.sort, None);

        assert_eq!(state.click_sort("name"), &SortState::ascending("name"));
        assert_eq!(state.click_sort("name"), &SortState::descending("name"));
        assert_eq!(state.click_sort("name"), &SortState::ascending("name"));

        state.click_sort("name");
        assert_eq!(state.click_sort("status"), &SortState::ascending("status"));
    }

    #[test]
    fn test_page_resets_on_filter_change() {
        let mut state = ListState::new(25);
        state.go_to_page(5);

        state.apply_filter(FilterClause::new("status", FilterOperator::Equals, "up"));
        assert_eq!(state.page.page, 1);

        state.go_to_page(5);
        state.remove_filter("status", FilterOperator::Equals);
        assert_eq!(state.page.page, 1);
    }

    #[test]
    fn test_page_resets_on_search_and_page_size() {
        let mut state = ListState::new(25);
        state.go_to_page(4);
        assert!(state.set_search(Some("router")));
        assert_eq!(state.page.page, 1);

        state.go_to_page(4);
        assert!(!state.set_search(Some(" router ")));
        assert_eq!(state.page.page, 4);

        assert!(state.set_page_size(50));
        assert_eq!(state.page, PageState::new(1, 50));
    }

    #[test]
    fn test_sort_does_not_reset_page() {
        let mut state = ListState::new(25);
        state.go_to_page(3);
        state.click_sort("hostName");
        assert_eq!(state.page.page, 3);
    }

    #[test]
    fn test_invalid_page_params_fall_back() {
        let params = QueryParams::parse("page=0&pageSize=abc");
        assert_eq!(PageState::from_params(&params, 25), PageState::new(1, 25));

        let params = QueryParams::parse("page=-3&pageSize=0");
        assert_eq!(PageState::from_params(&params, 10), PageState::new(1, 10));
    }

    #[test]
    fn test_total_pages() {
        let page = PageState::new(1, 10);
        assert_eq!(page.total_pages(0), 1);
        assert_eq!(page.total_pages(1), 1);
        assert_eq!(page.total_pages(10), 1);
        assert_eq!(page.total_pages(11), 2);
        assert_eq!(PageState::new(3, 10).offset(), 20);
    }

    #[test]
    fn test_write_leaves_unrelated_keys() {
        let mut url = UrlStateManager::from_location("/devices?tab=alerts&page=2").unwrap();
        let mut state = ListState::from_url(&url, 25);
        state.set_search(Some("core"));
        state.write_to(&mut url, Navigation::Push);

        assert_eq!(url.get("tab"), Some("alerts"));
        assert_eq!(url.get("page"), Some("1"));
        assert_eq!(url.get("search"), Some("core"));

        assert!(url.back());
        assert_eq!(url.get("page"), Some("2"));
        assert_eq!(url.get("search"), None);
    }

    #[test]
    fn test_clearing_sort_and_search_removes_keys() {
        let mut url =
            UrlStateManager::from_location("/devices?sort=hostName&direction=desc&search=x").unwrap();
        let mut state = ListState::from_url(&url, 25);
        state.sort = None;
        state.set_search(None);
        state.write_to(&mut url, Navigation::Replace);
        assert!(!url.params().contains(SORT_KEY));
        assert!(!url.params().contains(DIRECTION_KEY));
        assert!(!url.params().contains(SEARCH_KEY));
    }

    fn operator_strategy() -> impl Strategy<Value = FilterOperator> {
        prop::sample::select(FilterOperator::all().to_vec())
    }

    fn clause_strategy() -> impl Strategy<Value = FilterClause> {
        (
            "[a-z][a-zA-Z]{0,7}(\\.[a-z]{1,4})?",
            operator_strategy(),
            "[a-z0-9][a-z0-9 _-]{0,9}",
            prop::collection::vec("[a-z0-9-]{1,8}", 1..4),
        )
            .prop_map(|(field, operator, single, list)| {
                let value = if operator == FilterOperator::In {
                    FilterValue::List(list)
                } else {
                    FilterValue::Single(single)
                };
                FilterClause::new(field, operator, value)
            })
    }

    proptest! {
        #[test]
        fn prop_list_state_round_trips(
            page in 1u32..500,
            page_size in 1u32..200,
            sort in prop::option::of(("[a-z][a-zA-Z]{0,9}", any::<bool>())),
            search in prop::option::of("[a-z0-9][a-z0-9 ]{0,10}[a-z0-9]"),
            clauses in prop::collection::vec(clause_strategy(), 0..6),
        ) {
            let mut filters = FilterComposer::new();
            for clause in clauses {
                filters.add(clause);
            }
            let state = ListState {
                page: PageState::new(page, page_size),
                sort: sort.map(|(column, desc)| if desc {
                    SortState::descending(column)
                } else {
                    SortState::ascending(column)
                }),
                search,
                filters,
            };

            let mut url = UrlStateManager::new("/devices");
            state.write_to(&mut url, Navigation::Push);
            let reparsed = UrlStateManager::from_location(&url.location()).unwrap();
            prop_assert_eq!(ListState::from_url(&reparsed, 25), state);
        }

        #[test]
        fn prop_filter_change_resets_page(page in 2u32..100, clause in clause_strategy()) {
            let mut state = ListState::new(25);
            state.go_to_page(page);
            prop_assert!(state.apply_filter(clause));
            prop_assert_eq!(state.page.page, 1);
        }
    }
}
