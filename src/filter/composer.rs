//! Filter composer
//!
//! Keeps the active filter clauses, one per `(field, operator)` pair, and
//! moves them between the URL and backend query parameters.

use super::clause::{parse_url_key, FilterClause, FilterOperator};
use crate::url_state::{Navigation, QueryParams, UrlStateManager};

/// Ordered set of active filter clauses
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterComposer {
    clauses: Vec<FilterClause>,
}

impl FilterComposer {
    /// Create an empty composer
    pub fn new() -> Self {
        Self::default()
    }

    /// Upsert a clause by `(field, operator)`.
    ///
    /// An empty value removes the existing clause instead. Returns whether
    /// the active set changed.
    pub fn add(&mut self, clause: FilterClause) -> bool {
        if clause.is_empty() {
            return self.remove(&clause.field, clause.operator);
        }

        match self
            .clauses
            .iter_mut()
            .find(|c| c.matches(&clause.field, clause.operator))
        {
            Some(existing) if *existing == clause => false,
            Some(existing) => {
                *existing = clause;
                true
            }
            None => {
                self.clauses.push(clause);
                true
            }
        }
    }

    /// Remove the clause for `(field, operator)`
    pub fn remove(&mut self, field: &str, operator: FilterOperator) -> bool {
        let before = self.clauses.len();
        self.clauses.retain(|c| !c.matches(field, operator));
        before != self.clauses.len()
    }

    /// Remove every clause
    pub fn clear(&mut self) -> bool {
        let changed = !self.clauses.is_empty();
        self.clauses.clear();
        changed
    }

    /// Clause for `(field, operator)`
    pub fn get(&self, field: &str, operator: FilterOperator) -> Option<&FilterClause> {
        self.clauses.iter().find(|c| c.matches(field, operator))
    }

    /// Active clauses in insertion order
    pub fn clauses(&self) -> &[FilterClause] {
        &self.clauses
    }

    /// Number of active clauses
    pub fn len(&self) -> usize {
        self.clauses.len()
    }

    /// Whether no filter is active
    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    /// Whether a URL key belongs to the filter group
    pub fn is_filter_key(key: &str) -> bool {
        parse_url_key(key).is_some()
    }

    /// Read clauses from URL parameters; unrelated keys and empty values are ignored
    pub fn from_params(params: &QueryParams) -> Self {
        let mut composer = Self::new();
        for (key, value) in params.iter() {
            if let Some(clause) = FilterClause::from_url_pair(key, value) {
                composer.add(clause);
            }
        }
        composer
    }

    /// Replace the filter group in `params`, leaving other keys untouched
    pub fn write_params(&self, params: &mut QueryParams) {
        params.remove_where(Self::is_filter_key);
        for clause in &self.clauses {
            params.append(&clause.url_key(), clause.value.encode());
        }
    }

    /// Read the filter group from the current URL
    pub fn from_url(url: &UrlStateManager) -> Self {
        Self::from_params(url.params())
    }

    /// Write the filter group into the URL as one navigation
    pub fn write_to_url(&self, url: &mut UrlStateManager, mode: Navigation) -> bool {
        url.update(mode, |params| self.write_params(params))
    }

    /// Backend query parameters: `filter[field][operator]=value`
    pub fn to_backend_params(&self) -> Vec<(String, String)> {
        self.clauses
            .iter()
            .map(|c| (c.backend_key(), c.value.encode()))
            .collect()
    }
}

impl FromIterator<FilterClause> for FilterComposer {
    fn from_iter<I: IntoIterator<Item = FilterClause>>(iter: I) -> Self {
        let mut composer = Self::new();
        for clause in iter {
            composer.add(clause);
        }
        composer
    }
}
