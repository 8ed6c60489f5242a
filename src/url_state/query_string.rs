//! Ordered query-string parameters
//!
//! Keeps parameters in first-seen order so that rewriting one key never
//! reshuffles the rest of the address bar.

use url::form_urlencoded;

/// Delimiter used for list-valued parameters
pub const LIST_DELIMITER: char = ',';

/// Ordered multimap of query-string parameters
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryParams {
    pairs: Vec<(String, String)>,
}

impl QueryParams {
    /// Create an empty parameter set
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a query string, with or without the leading `?`
    pub fn parse(query: &str) -> Self {
        let query = query.strip_prefix('?').unwrap_or(query);
        let pairs = form_urlencoded::parse(query.as_bytes())
            .filter(|(key, _)| !key.is_empty())
            .map(|(key, value)| (key.into_owned(), value.into_owned()))
            .collect();
        Self { pairs }
    }

    /// First value for `key`
    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Every value for `key`, in order
    pub fn get_all(&self, key: &str) -> Vec<&str> {
        self.pairs
            .iter()
            .filter(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
            .collect()
    }

    /// All values for `key` split on the list delimiter, blanks dropped
    pub fn get_list(&self, key: &str) -> Vec<String> {
        self.get_all(key)
            .into_iter()
            .flat_map(split_list)
            .collect()
    }

    /// Set `key` to a single value.
    ///
    /// The first occurrence is replaced in place and any duplicates dropped;
    /// a new key is appended at the end.
    pub fn set(&mut self, key: &str, value: impl Into<String>) {
        let value = value.into();
        match self.pairs.iter().position(|(k, _)| k == key) {
            Some(index) => {
                self.pairs[index].1 = value;
                let mut seen = false;
                self.pairs.retain(|(k, _)| {
                    if k != key {
                        return true;
                    }
                    let keep = !seen;
                    seen = true;
                    keep
                });
            }
            None => self.pairs.push((key.to_string(), value)),
        }
    }

    /// Set `key` to a list value, joined with the list delimiter
    pub fn set_list<S: AsRef<str>>(&mut self, key: &str, values: &[S]) {
        let joined = join_list(values);
        self.set(key, joined);
    }

    /// Append a value without touching existing ones
    pub fn append(&mut self, key: &str, value: impl Into<String>) {
        self.pairs.push((key.to_string(), value.into()));
    }

    /// Remove every occurrence of `key`; returns whether anything was removed
    pub fn remove(&mut self, key: &str) -> bool {
        let before = self.pairs.len();
        self.pairs.retain(|(k, _)| k != key);
        before != self.pairs.len()
    }

    /// Remove every pair whose key matches the predicate
    pub fn remove_where(&mut self, mut predicate: impl FnMut(&str) -> bool) -> bool {
        let before = self.pairs.len();
        self.pairs.retain(|(k, _)| !predicate(k));
        before != self.pairs.len()
    }

    /// Whether `key` is present
    pub fn contains(&self, key: &str) -> bool {
        self.pairs.iter().any(|(k, _)| k == key)
    }

    /// Iterate over all pairs in order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.pairs.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Number of pairs
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    /// Whether there are no pairs
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Encode as `application/x-www-form-urlencoded` without a leading `?`
    pub fn to_query_string(&self) -> String {
        form_urlencoded::Serializer::new(String::new())
            .extend_pairs(self.pairs.iter())
            .finish()
    }
}

impl std::fmt::Display for QueryParams {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_query_string())
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for QueryParams {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            pairs: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

/// Split a list value on the delimiter, trimming items and dropping blanks
pub fn split_list(value: &str) -> Vec<String> {
    value
        .split(LIST_DELIMITER)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Join list items with the delimiter
pub fn join_list<S: AsRef<str>>(values: &[S]) -> String {
    values
        .iter()
        .map(|v| v.as_ref())
        .collect::<Vec<_>>()
        .join(",")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_query_string() {
        let params = QueryParams::parse("?page=1&pageSize=20&search=hello+world");
        assert_eq!(params.get("page"), Some("1"));
        assert_eq!(params.get("pageSize"), Some("20"));
        assert_eq!(params.get("search"), Some("hello world"));
        assert_eq!(params.get("missing"), None);
    }

    #[test]
    fn test_percent_decoding() {
        let params = QueryParams::parse("q=test%2Fpath&name=a%20b");
        assert_eq!(params.get("q"), Some("test/path"));
        assert_eq!(params.get("name"), Some("a b"));
    }

    #[test]
    fn test_set_preserves_order_and_unrelated_keys() {
        let mut params = QueryParams::parse("a=1&b=2&c=3");
        params.set("b", "20");
        params.set("d", "4");
        assert_eq!(params.to_query_string(), "a=1&b=20&c=3&d=4");
    }

    #[test]
    fn test_set_collapses_duplicates() {
        let mut params = QueryParams::parse("tag=x&other=1&tag=y");
        assert_eq!(params.get_all("tag"), vec!["x", "y"]);
        params.set("tag", "z");
        assert_eq!(params.get_all("tag"), vec!["z"]);
        assert_eq!(params.to_query_string(), "tag=z&other=1");
    }

    #[test]
    fn test_list_values() {
        let mut params = QueryParams::new();
        params.set_list("status", &["up", "down"]);
        assert_eq!(params.get("status"), Some("up,down"));

        let reparsed = QueryParams::parse(&params.to_query_string());
        assert_eq!(reparsed.get_list("status"), vec!["up", "down"]);

        let params = QueryParams::parse("status=up,,%20down%20");
        assert_eq!(params.get_list("status"), vec!["up", "down"]);
    }

    #[test]
    fn test_remove() {
        let mut params = QueryParams::parse("a=1&b=2&a=3");
        assert!(params.remove("a"));
        assert!(!params.remove("a"));
        assert_eq!(params.to_query_string(), "b=2");
    }

    #[test]
    fn test_empty_keys_ignored() {
        let params = QueryParams::parse("=orphan&&a=1");
        assert_eq!(params.len(), 1);
    }
}
