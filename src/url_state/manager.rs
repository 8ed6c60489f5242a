//! URL state manager with navigation history
//!
//! Owns the current location (path + query string) and a browser-like
//! history stack. Writes only ever touch the keys they name, so the
//! pagination, sort, search and filter groups can be updated independently.

use super::query_string::QueryParams;
use crate::error::{DashboardError, Result};
use url::Url;

/// How a state change is recorded in history
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Navigation {
    /// Add a new history entry (back returns to the previous state)
    #[default]
    Push,
    /// Overwrite the current history entry
    Replace,
}

/// Query-string backed state with back/forward navigation
#[derive(Debug, Clone)]
pub struct UrlStateManager {
    path: String,
    entries: Vec<QueryParams>,
    index: usize,
}

impl UrlStateManager {
    /// Create a manager for `path` with an empty query string
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            entries: vec![QueryParams::new()],
            index: 0,
        }
    }

    /// Create a manager from a location such as `/devices?page=2&search=core`.
    ///
    /// Absolute URLs are accepted too; only their path and query are kept.
    pub fn from_location(location: &str) -> Result<Self> {
        let base = Url::parse("http://localhost/")?;
        let url = base.join(location)?;
        if url.cannot_be_a_base() {
            return Err(DashboardError::InvalidState(format!(
                "'{}' is not a navigable location",
                location
            )));
        }

        let params = QueryParams::parse(url.query().unwrap_or(""));
        Ok(Self {
            path: url.path().to_string(),
            entries: vec![params],
            index: 0,
        })
    }

    /// Path component of the current location
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Current parameters
    pub fn params(&self) -> &QueryParams {
        &self.entries[self.index]
    }

    /// Current location as `path?query` (no `?` when the query is empty)
    pub fn location(&self) -> String {
        let query = self.params().to_query_string();
        if query.is_empty() {
            self.path.clone()
        } else {
            format!("{}?{}", self.path, query)
        }
    }

    /// Current value of `key`
    pub fn get(&self, key: &str) -> Option<&str> {
        self.params().get(key)
    }

    /// Current list value of `key`
    pub fn get_list(&self, key: &str) -> Vec<String> {
        self.params().get_list(key)
    }

    /// Set a single key. An empty value removes the key instead.
    pub fn set(&mut self, key: &str, value: &str, mode: Navigation) -> bool {
        self.update(mode, |params| {
            if value.is_empty() {
                params.remove(key);
            } else {
                params.set(key, value);
            }
        })
    }

    /// Set a list-valued key. An empty list removes the key instead.
    pub fn set_list<S: AsRef<str>>(&mut self, key: &str, values: &[S], mode: Navigation) -> bool {
        let non_empty: Vec<&str> = values
            .iter()
            .map(|v| v.as_ref())
            .filter(|v| !v.is_empty())
            .collect();
        self.update(mode, |params| {
            if non_empty.is_empty() {
                params.remove(key);
            } else {
                params.set_list(key, &non_empty);
            }
        })
    }

    /// Remove a key
    pub fn remove(&mut self, key: &str, mode: Navigation) -> bool {
        self.update(mode, |params| {
            params.remove(key);
        })
    }

    /// Apply several edits as one navigation.
    ///
    /// Returns `false` and records nothing when the edits leave the query
    /// string unchanged.
    pub fn update(&mut self, mode: Navigation, edit: impl FnOnce(&mut QueryParams)) -> bool {
        let mut next = self.params().clone();
        edit(&mut next);
        if &next == self.params() {
            return false;
        }

        match mode {
            Navigation::Push => {
                self.entries.truncate(self.index + 1);
                self.entries.push(next);
                self.index += 1;
            }
            Navigation::Replace => {
                self.entries[self.index] = next;
            }
        }

        tracing::debug!(location = %self.location(), ?mode, "URL state updated");
        true
    }

    /// Step back in history; returns `false` at the oldest entry
    pub fn back(&mut self) -> bool {
        if self.index == 0 {
            return false;
        }
        self.index -= 1;
        true
    }

    /// Step forward in history; returns `false` at the newest entry
    pub fn forward(&mut self) -> bool {
        if self.index + 1 >= self.entries.len() {
            return false;
        }
        self.index += 1;
        true
    }

    /// Whether `back` would move
    pub fn can_go_back(&self) -> bool {
        self.index > 0
    }

    /// Whether `forward` would move
    pub fn can_go_forward(&self) -> bool {
        self.index + 1 < self.entries.len()
    }

    /// Number of history entries
    pub fn history_len(&self) -> usize {
        self.entries.len()
    }
}
