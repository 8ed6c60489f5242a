//! Column descriptors

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Horizontal alignment of a column's cells
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Align {
    #[default]
    Left,
    Center,
    Right,
}

/// One table column
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    /// Dotted path of the value in a row, also the sort key
    pub key: String,
    /// Header label
    pub label: String,
    /// Whether clicking the header sorts by this column
    #[serde(default)]
    pub sortable: bool,
    /// Name of the cell renderer; plain text when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub renderer: Option<String>,
    /// Cell alignment
    #[serde(default)]
    pub align: Align,
}

impl Column {
    /// Unsortable text column
    pub fn new(key: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            label: label.into(),
            sortable: false,
            renderer: None,
            align: Align::Left,
        }
    }

    /// Make the column sortable
    pub fn sortable(mut self) -> Self {
        self.sortable = true;
        self
    }

    /// Render cells with the named renderer
    pub fn renderer(mut self, name: impl Into<String>) -> Self {
        self.renderer = Some(name.into());
        self
    }

    /// Set the cell alignment
    pub fn align(mut self, align: Align) -> Self {
        self.align = align;
        self
    }

    /// This column's value in `row`
    pub fn value<'a>(&self, row: &'a Value) -> Option<&'a Value> {
        lookup(row, &self.key)
    }
}

/// Look up a dotted path such as `location.site` or `tags.0`
pub fn lookup<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.').try_fold(value, |current, segment| match current {
        Value::Object(map) => map.get(segment),
        Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_builder() {
        let column = Column::new("status", "Status")
            .sortable()
            .renderer("status")
            .align(Align::Center);
        assert!(column.sortable);
        assert_eq!(column.renderer.as_deref(), Some("status"));
        assert_eq!(column.align, Align::Center);
    }

    #[test]
    fn test_lookup() {
        let row = json!({
            "hostName": "core-1",
            "location": { "site": "ams1" },
            "tags": ["edge", "lab"]
        });
        assert_eq!(lookup(&row, "hostName"), Some(&json!("core-1")));
        assert_eq!(lookup(&row, "location.site"), Some(&json!("ams1")));
        assert_eq!(lookup(&row, "tags.1"), Some(&json!("lab")));
        assert_eq!(lookup(&row, "location.rack"), None);
        assert_eq!(lookup(&row, "hostName.length"), None);
    }

    #[test]
    fn test_columns_from_json() {
        let column: Column = serde_json::from_value(json!({
            "key": "rxBytes",
            "label": "RX",
            "renderer": "bytes",
            "align": "right"
        }))
        .unwrap();
        assert!(!column.sortable);
        assert_eq!(column.align, Align::Right);
    }
}
