//! Table rendering
//!
//! [`TableRenderer`] turns rows plus column descriptors into a
//! [`RenderedTable`]: header cells with sort indicators, a body in one of
//! four states (rows, empty, loading, error) and pagination controls.

use super::column::{Align, Column};
use super::renderers::{plain_text, RendererRegistry};
use crate::error::{DashboardError, ErrorKind};
use crate::url_state::{PageState, SortDirection, SortState};
use comfy_table::modifiers::UTF8_ROUND_CORNERS;
use comfy_table::presets::UTF8_FULL_CONDENSED;
use comfy_table::{Attribute, Cell, CellAlignment, ContentArrangement, Table};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// Default number of placeholder rows while loading
pub const DEFAULT_SKELETON_ROWS: usize = 5;

/// Default message for an empty result
pub const DEFAULT_EMPTY_MESSAGE: &str = "No results match the current filters.";

type RowIdFn = Arc<dyn Fn(&Value) -> String + Send + Sync>;
type RowClickFn = Arc<dyn Fn(&RenderedRow) + Send + Sync>;

/// What the table is asked to show
#[derive(Debug, Clone, Copy)]
pub enum TableView<'a> {
    /// A load is in flight and nothing can be shown yet
    Loading,
    /// The load failed
    Error(&'a DashboardError),
    /// One page of rows and the total across all pages
    Loaded { rows: &'a [Value], total_count: u64 },
}

/// Sort indicator shown on a header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortIndicator {
    None,
    Ascending,
    Descending,
}

impl SortIndicator {
    /// Arrow appended to the header label
    pub fn arrow(&self) -> &'static str {
        match self {
            Self::None => "",
            Self::Ascending => " ▲",
            Self::Descending => " ▼",
        }
    }
}

/// Rendered header cell
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderCell {
    pub key: String,
    pub label: String,
    /// Clicking the header changes the sort
    pub sortable: bool,
    pub indicator: SortIndicator,
}

/// Rendered body row
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedRow {
    /// Row identity
    pub id: String,
    /// Display text, one per column
    pub cells: Vec<String>,
    /// Source row
    pub source: Value,
}

/// Action offered next to an error message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorAction {
    /// Re-issue the failed request
    Retry,
    /// Credentials are missing or expired
    SignIn,
    /// Nothing to offer (e.g. the resource does not exist)
    None,
}

impl ErrorAction {
    fn for_kind(kind: ErrorKind) -> Self {
        match kind {
            ErrorKind::Unauthorized => Self::SignIn,
            ErrorKind::NotFound => Self::None,
            _ => Self::Retry,
        }
    }

    /// Control label
    pub fn label(&self) -> Option<&'static str> {
        match self {
            Self::Retry => Some("Retry"),
            Self::SignIn => Some("Sign in"),
            Self::None => None,
        }
    }
}

/// Table body
#[derive(Debug, Clone, PartialEq)]
pub enum TableBody {
    /// Loaded rows
    Rows(Vec<RenderedRow>),
    /// Loaded, nothing matched
    Empty { message: String },
    /// Placeholder while loading
    Loading { skeleton_rows: usize },
    /// Load failed
    Error {
        message: String,
        kind: ErrorKind,
        action: ErrorAction,
    },
}

/// Pagination controls
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaginationControls {
    pub page: u32,
    pub page_size: u32,
    pub total_pages: u32,
    pub total_count: u64,
}

impl PaginationControls {
    pub fn has_previous(&self) -> bool {
        self.page > 1
    }

    pub fn has_next(&self) -> bool {
        self.page < self.total_pages
    }

    /// `"11-20 of 42"`, or `"0 of 42"` for a page past the last one
    pub fn range_label(&self) -> String {
        let offset = u64::from(self.page.saturating_sub(1)) * u64::from(self.page_size);
        if offset >= self.total_count {
            return format!("0 of {}", self.total_count);
        }
        let last = (offset + u64::from(self.page_size)).min(self.total_count);
        format!("{}-{} of {}", offset + 1, last, self.total_count)
    }

    /// `"Page 2 of 5"`
    pub fn page_label(&self) -> String {
        format!("Page {} of {}", self.page, self.total_pages)
    }
}

/// Result of a render
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedTable {
    pub headers: Vec<HeaderCell>,
    pub body: TableBody,
    /// Present only when there is more than one page
    pub pagination: Option<PaginationControls>,
    aligns: Vec<Align>,
}

impl RenderedTable {
    /// Number of body rows (zero unless loaded and non-empty)
    pub fn row_count(&self) -> usize {
        match &self.body {
            TableBody::Rows(rows) => rows.len(),
            _ => 0,
        }
    }

    /// Body rows
    pub fn rows(&self) -> &[RenderedRow] {
        match &self.body {
            TableBody::Rows(rows) => rows,
            _ => &[],
        }
    }

    /// Text of the cell at `row`, `column`
    pub fn cell(&self, row: usize, column: usize) -> Option<&str> {
        self.rows().get(row)?.cells.get(column).map(String::as_str)
    }

    pub fn is_loading(&self) -> bool {
        matches!(self.body, TableBody::Loading { .. })
    }

    pub fn is_empty_state(&self) -> bool {
        matches!(self.body, TableBody::Empty { .. })
    }

    pub fn is_error(&self) -> bool {
        matches!(self.body, TableBody::Error { .. })
    }

    /// Retry control, if the body is an error that offers one
    pub fn retry_action(&self) -> Option<ErrorAction> {
        match &self.body {
            TableBody::Error { action, .. } if *action == ErrorAction::Retry => Some(*action),
            _ => None,
        }
    }

    /// Terminal rendering
    pub fn to_text(&self) -> String {
        let mut table = Table::new();
        table
            .load_preset(UTF8_FULL_CONDENSED)
            .apply_modifier(UTF8_ROUND_CORNERS)
            .set_content_arrangement(ContentArrangement::Dynamic);
        table.set_header(
            self.headers
                .iter()
                .map(|h| Cell::new(format!("{}{}", h.label, h.indicator.arrow())).add_attribute(Attribute::Bold))
                .collect::<Vec<_>>(),
        );

        let mut footer = None;
        match &self.body {
            TableBody::Rows(rows) => {
                for row in rows {
                    table.add_row(row.cells.iter().map(Cell::new).collect::<Vec<_>>());
                }
            }
            TableBody::Loading { skeleton_rows } => {
                for _ in 0..*skeleton_rows {
                    table.add_row(self.headers.iter().map(|_| Cell::new("···")).collect::<Vec<_>>());
                }
            }
            TableBody::Empty { message } => footer = Some(message.clone()),
            TableBody::Error { message, action, .. } => {
                footer = Some(match action.label() {
                    Some(label) => format!("{} [{}]", message, label),
                    None => message.clone(),
                });
            }
        }

        for (index, align) in self.aligns.iter().enumerate() {
            if let Some(column) = table.column_mut(index) {
                column.set_cell_alignment(match align {
                    Align::Left => CellAlignment::Left,
                    Align::Center => CellAlignment::Center,
                    Align::Right => CellAlignment::Right,
                });
            }
        }

        let mut text = table.to_string();
        if let Some(footer) = footer {
            text.push('\n');
            text.push_str(&footer);
        }
        if let Some(pagination) = &self.pagination {
            text.push('\n');
            text.push_str(&format!("{} ({})", pagination.page_label(), pagination.range_label()));
        }
        text
    }
}

impl fmt::Display for RenderedTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_text())
    }
}

/// Renders rows through column descriptors and a renderer registry
#[derive(Clone)]
pub struct TableRenderer {
    columns: Vec<Column>,
    registry: RendererRegistry,
    row_id: RowIdFn,
    on_row_click: Option<RowClickFn>,
    empty_message: String,
    skeleton_rows: usize,
}

impl fmt::Debug for TableRenderer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TableRenderer")
            .field("columns", &self.columns)
            .field("registry", &self.registry)
            .field("on_row_click", &self.on_row_click.is_some())
            .finish_non_exhaustive()
    }
}

impl TableRenderer {
    /// Renderer for `columns` with the built-in cell renderers; rows are
    /// identified by their `id` field
    pub fn new(columns: Vec<Column>) -> Self {
        Self {
            columns,
            registry: RendererRegistry::with_builtins(),
            row_id: Arc::new(|row: &Value| plain_text(row.get("id").unwrap_or(&Value::Null))),
            on_row_click: None,
            empty_message: DEFAULT_EMPTY_MESSAGE.to_string(),
            skeleton_rows: DEFAULT_SKELETON_ROWS,
        }
    }

    /// Use `registry` for cell rendering
    pub fn with_registry(mut self, registry: RendererRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Identify rows with `row_id`
    pub fn with_row_id(mut self, row_id: impl Fn(&Value) -> String + Send + Sync + 'static) -> Self {
        self.row_id = Arc::new(row_id);
        self
    }

    /// Invoke `callback` when a row is clicked
    pub fn on_row_click(mut self, callback: impl Fn(&RenderedRow) + Send + Sync + 'static) -> Self {
        self.on_row_click = Some(Arc::new(callback));
        self
    }

    pub fn with_empty_message(mut self, message: impl Into<String>) -> Self {
        self.empty_message = message.into();
        self
    }

    pub fn with_skeleton_rows(mut self, rows: usize) -> Self {
        self.skeleton_rows = rows;
        self
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Column with the given key
    pub fn column(&self, key: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.key == key)
    }

    /// Render `view` with the current sort and page
    pub fn render(&self, view: TableView<'_>, sort: Option<&SortState>, page: &PageState) -> RenderedTable {
        let headers = self.headers(sort);
        let aligns = self.columns.iter().map(|c| c.align).collect();

        let (body, pagination) = match view {
            TableView::Loading => (
                TableBody::Loading {
                    skeleton_rows: self.skeleton_rows,
                },
                None,
            ),
            TableView::Error(error) => (
                TableBody::Error {
                    message: error.user_message(),
                    kind: error.kind(),
                    action: ErrorAction::for_kind(error.kind()),
                },
                None,
            ),
            TableView::Loaded { rows, total_count } => {
                let body = if rows.is_empty() {
                    TableBody::Empty {
                        message: self.empty_message.clone(),
                    }
                } else {
                    TableBody::Rows(rows.iter().map(|row| self.render_row(row)).collect())
                };
                (body, Self::pagination(page, total_count))
            }
        };

        RenderedTable {
            headers,
            body,
            pagination,
            aligns,
        }
    }

    /// Next sort after clicking the header of `key`; `None` for unsortable
    /// or unknown columns
    pub fn header_click(&self, key: &str, current: Option<&SortState>) -> Option<SortState> {
        let column = self.column(key).filter(|c| c.sortable)?;
        Some(SortState::after_click(current, &column.key))
    }

    /// Report a click on `row` to the callback; returns whether one is set.
    /// The table itself is not changed.
    pub fn click_row(&self, row: &RenderedRow) -> bool {
        match &self.on_row_click {
            Some(callback) => {
                callback(row);
                true
            }
            None => false,
        }
    }

    fn headers(&self, sort: Option<&SortState>) -> Vec<HeaderCell> {
        self.columns
            .iter()
            .map(|column| {
                let indicator = match sort {
                    Some(s) if s.column == column.key => match s.direction {
                        SortDirection::Asc => SortIndicator::Ascending,
                        SortDirection::Desc => SortIndicator::Descending,
                    },
                    _ => SortIndicator::None,
                };
                HeaderCell {
                    key: column.key.clone(),
                    label: column.label.clone(),
                    sortable: column.sortable,
                    indicator,
                }
            })
            .collect()
    }

    fn render_row(&self, row: &Value) -> RenderedRow {
        RenderedRow {
            id: (self.row_id)(row),
            cells: self
                .columns
                .iter()
                .map(|column| self.registry.render(column, row))
                .collect(),
            source: row.clone(),
        }
    }

    fn pagination(page: &PageState, total_count: u64) -> Option<PaginationControls> {
        let total_pages = page.total_pages(total_count);
        (total_pages > 1).then(|| PaginationControls {
            page: page.page,
            page_size: page.page_size,
            total_pages,
            total_count,
        })
    }
}
