//! Cell renderers
//!
//! Columns name their renderer; the [`RendererRegistry`] maps names to
//! implementations. Unknown or missing names fall back to plain text.

use super::column::Column;
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Plain text
pub const TEXT_RENDERER: &str = "text";
/// `[UP]`-style status badge
pub const STATUS_RENDERER: &str = "status";
/// RFC 3339 or Unix-seconds timestamp shown in UTC
pub const TIMESTAMP_RENDERER: &str = "timestamp";
/// Byte count in binary units
pub const BYTES_RENDERER: &str = "bytes";
/// Array joined with `, `
pub const LIST_RENDERER: &str = "list";

/// Turns a cell value into display text
pub trait CellRenderer: Send + Sync {
    /// Render `value`; `row` is the whole row for renderers that combine fields
    fn render(&self, value: &Value, row: &Value) -> String;
}

impl<F> CellRenderer for F
where
    F: Fn(&Value, &Value) -> String + Send + Sync,
{
    fn render(&self, value: &Value, row: &Value) -> String {
        self(value, row)
    }
}

/// Plain text rendering of any JSON value
pub fn plain_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Array(items) => items.iter().map(plain_text).collect::<Vec<_>>().join(", "),
        other => other.to_string(),
    }
}

struct TextRenderer;

impl CellRenderer for TextRenderer {
    fn render(&self, value: &Value, _row: &Value) -> String {
        plain_text(value)
    }
}

struct StatusBadgeRenderer;

impl CellRenderer for StatusBadgeRenderer {
    fn render(&self, value: &Value, _row: &Value) -> String {
        match plain_text(value) {
            text if text.is_empty() => String::new(),
            text => format!("[{}]", text.to_uppercase()),
        }
    }
}

struct TimestampRenderer;

impl CellRenderer for TimestampRenderer {
    fn render(&self, value: &Value, _row: &Value) -> String {
        let parsed = match value {
            Value::String(s) => DateTime::parse_from_rfc3339(s)
                .ok()
                .map(|t| t.with_timezone(&Utc)),
            Value::Number(n) => n.as_i64().and_then(|secs| DateTime::from_timestamp(secs, 0)),
            _ => None,
        };
        match parsed {
            Some(time) => time.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
            None => plain_text(value),
        }
    }
}

struct BytesRenderer;

impl CellRenderer for BytesRenderer {
    fn render(&self, value: &Value, _row: &Value) -> String {
        match value.as_u64() {
            Some(bytes) => humansize::format_size(bytes, humansize::BINARY),
            None => plain_text(value),
        }
    }
}

struct ListRenderer;

impl CellRenderer for ListRenderer {
    fn render(&self, value: &Value, _row: &Value) -> String {
        match value {
            Value::Array(items) => items
                .iter()
                .map(plain_text)
                .filter(|s| !s.is_empty())
                .collect::<Vec<_>>()
                .join(", "),
            other => plain_text(other),
        }
    }
}

/// Capability table of named cell renderers
#[derive(Clone)]
pub struct RendererRegistry {
    renderers: HashMap<String, Arc<dyn CellRenderer>>,
}

impl fmt::Debug for RendererRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&str> = self.renderers.keys().map(String::as_str).collect();
        names.sort_unstable();
        f.debug_struct("RendererRegistry").field("renderers", &names).finish()
    }
}

impl Default for RendererRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

impl RendererRegistry {
    /// Registry without any renderer; every column renders as text
    pub fn empty() -> Self {
        Self {
            renderers: HashMap::new(),
        }
    }

    /// Registry with the built-in renderers
    pub fn with_builtins() -> Self {
        let mut registry = Self::empty();
        registry.register(TEXT_RENDERER, TextRenderer);
        registry.register(STATUS_RENDERER, StatusBadgeRenderer);
        registry.register(TIMESTAMP_RENDERER, TimestampRenderer);
        registry.register(BYTES_RENDERER, BytesRenderer);
        registry.register(LIST_RENDERER, ListRenderer);
        registry
    }

    /// Register (or replace) the renderer called `name`
    pub fn register(&mut self, name: impl Into<String>, renderer: impl CellRenderer + 'static) -> &mut Self {
        self.renderers.insert(name.into(), Arc::new(renderer));
        self
    }

    /// Renderer called `name`
    pub fn get(&self, name: &str) -> Option<&Arc<dyn CellRenderer>> {
        self.renderers.get(name)
    }

    /// Whether a renderer called `name` exists
    pub fn contains(&self, name: &str) -> bool {
        self.renderers.contains_key(name)
    }

    /// Render `column` of `row`
    pub fn render(&self, column: &Column, row: &Value) -> String {
        let value = column.value(row).unwrap_or(&Value::Null);
        match column.renderer.as_deref() {
            Some(name) => match self.get(name) {
                Some(renderer) => renderer.render(value, row),
                None => {
                    tracing::debug!(column = %column.key, renderer = name, "unknown renderer, using text");
                    plain_text(value)
                }
            },
            None => plain_text(value),
        }
    }
}
