//! Filter clause types
//!
//! A clause is one `field operator value` condition. In the URL it appears
//! as `field.operator=value`; list values are comma-joined.

use crate::url_state::{join_list, split_list};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Filter operators understood by the device API
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FilterOperator {
    /// Substring match
    Contains,
    /// Exact match
    Equals,
    /// Prefix match
    StartsWith,
    /// Timestamp strictly after
    After,
    /// Timestamp strictly before
    Before,
    /// Membership in a list
    In,
}

impl FilterOperator {
    /// All operators in display order
    pub fn all() -> &'static [FilterOperator] {
        &[
            Self::Contains,
            Self::Equals,
            Self::StartsWith,
            Self::After,
            Self::Before,
            Self::In,
        ]
    }

    /// Name used in URL keys and backend parameters
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Contains => "contains",
            Self::Equals => "equals",
            Self::StartsWith => "startsWith",
            Self::After => "after",
            Self::Before => "before",
            Self::In => "in",
        }
    }

    /// Parse a URL operator name (exact match)
    pub fn parse(name: &str) -> Option<Self> {
        Self::all().iter().copied().find(|op| op.as_str() == name)
    }

    /// Display label for dropdowns
    pub fn label(&self) -> &'static str {
        match self {
            Self::Contains => "contains",
            Self::Equals => "is",
            Self::StartsWith => "starts with",
            Self::After => "after",
            Self::Before => "before",
            Self::In => "is any of",
        }
    }

    /// Whether the operator takes a list of values
    pub fn is_list(&self) -> bool {
        matches!(self, Self::In)
    }
}

impl fmt::Display for FilterOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Filter value: a single string or a list of strings
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FilterValue {
    /// One value
    Single(String),
    /// Several values
    List(Vec<String>),
}

impl FilterValue {
    /// Whether this value means "no filter"
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Single(value) => value.trim().is_empty(),
            Self::List(values) => values.iter().all(|v| v.trim().is_empty()),
        }
    }

    /// Encoded form used in the URL and backend parameters
    pub fn encode(&self) -> String {
        match self {
            Self::Single(value) => value.clone(),
            Self::List(values) => join_list(values),
        }
    }

    /// Values as a list (a single value becomes a one-item list)
    pub fn as_list(&self) -> Vec<&str> {
        match self {
            Self::Single(value) => vec![value.as_str()],
            Self::List(values) => values.iter().map(String::as_str).collect(),
        }
    }
}

impl From<&str> for FilterValue {
    fn from(value: &str) -> Self {
        Self::Single(value.to_string())
    }
}

impl From<String> for FilterValue {
    fn from(value: String) -> Self {
        Self::Single(value)
    }
}

impl From<Vec<String>> for FilterValue {
    fn from(values: Vec<String>) -> Self {
        Self::List(values)
    }
}

impl From<Vec<&str>> for FilterValue {
    fn from(values: Vec<&str>) -> Self {
        Self::List(values.into_iter().map(str::to_string).collect())
    }
}

/// A single `field operator value` condition
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FilterClause {
    /// Field path, e.g. `status` or `location.site`
    pub field: String,
    /// Operator
    pub operator: FilterOperator,
    /// Value
    pub value: FilterValue,
}

impl FilterClause {
    /// Create a clause, normalising the value to the operator's shape.
    ///
    /// List operators get a list with blank items dropped; scalar operators
    /// get a single comma-joined value.
    pub fn new(field: impl Into<String>, operator: FilterOperator, value: impl Into<FilterValue>) -> Self {
        let value = match (operator.is_list(), value.into()) {
            (true, FilterValue::Single(value)) => FilterValue::List(split_list(&value)),
            (true, FilterValue::List(values)) => FilterValue::List(
                values.iter().flat_map(|v| split_list(v)).collect(),
            ),
            (false, FilterValue::List(values)) => FilterValue::Single(join_list(&values)),
            (false, single) => single,
        };

        Self {
            field: field.into(),
            operator,
            value,
        }
    }

    /// URL key: `field.operator`
    pub fn url_key(&self) -> String {
        url_key(&self.field, self.operator)
    }

    /// Backend parameter key: `filter[field][operator]`
    pub fn backend_key(&self) -> String {
        format!("filter[{}][{}]", self.field, self.operator.as_str())
    }

    /// Whether this clause means "no filter"
    pub fn is_empty(&self) -> bool {
        self.field.is_empty() || self.value.is_empty()
    }

    /// Whether this clause has the given identity
    pub fn matches(&self, field: &str, operator: FilterOperator) -> bool {
        self.field == field && self.operator == operator
    }

    /// Parse a URL pair such as `status.in=up,down`.
    ///
    /// Returns `None` when the key is not a filter key or the value is empty.
    pub fn from_url_pair(key: &str, value: &str) -> Option<Self> {
        let (field, operator) = parse_url_key(key)?;
        let clause = Self::new(field, operator, value);
        (!clause.is_empty()).then_some(clause)
    }
}

impl fmt::Display for FilterClause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.field, self.operator.label(), self.value.encode())
    }
}

/// Build the URL key for a `(field, operator)` pair
pub fn url_key(field: &str, operator: FilterOperator) -> String {
    format!("{}.{}", field, operator.as_str())
}

/// Split a URL key into field and operator.
///
/// The operator is the suffix after the last `.`, so dotted field paths work.
pub fn parse_url_key(key: &str) -> Option<(&str, FilterOperator)> {
    let (field, operator) = key.rsplit_once('.')?;
    if field.is_empty() {
        return None;
    }
    Some((field, FilterOperator::parse(operator)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operator_names_round_trip() {
        for op in FilterOperator::all() {
            assert_eq!(FilterOperator::parse(op.as_str()), Some(*op));
        }
        assert_eq!(FilterOperator::parse("startswith"), None);
        assert_eq!(FilterOperator::parse("between"), None);
    }

    #[test]
    fn test_url_key() {
        let clause = FilterClause::new("location.site", FilterOperator::StartsWith, "ams");
        assert_eq!(clause.url_key(), "location.site.startsWith");
        assert_eq!(
            parse_url_key("location.site.startsWith"),
            Some(("location.site", FilterOperator::StartsWith))
        );
        assert_eq!(parse_url_key("pageSize"), None);
        assert_eq!(parse_url_key(".equals"), None);
        assert_eq!(parse_url_key("status.unknown"), None);
    }

    #[test]
    fn test_value_normalisation() {
        let clause = FilterClause::new("status", FilterOperator::In, "up, down,,");
        assert_eq!(clause.value, FilterValue::List(vec!["up".into(), "down".into()]));

        let clause = FilterClause::new("hostName", FilterOperator::Contains, vec!["a", "b"]);
        assert_eq!(clause.value, FilterValue::Single("a,b".into()));
    }

    #[test]
    fn test_empty_values() {
        assert!(FilterClause::new("status", FilterOperator::Equals, "").is_empty());
        assert!(FilterClause::new("status", FilterOperator::Equals, "   ").is_empty());
        assert!(FilterClause::new("status", FilterOperator::In, Vec::<String>::new()).is_empty());
        assert!(FilterClause::new("status", FilterOperator::In, ",,").is_empty());
        assert!(FilterClause::from_url_pair("status.equals", "").is_none());
    }

    #[test]
    fn test_backend_key() {
        let clause = FilterClause::new("vendor", FilterOperator::Equals, "cisco");
        assert_eq!(clause.backend_key(), "filter[vendor][equals]");
    }
}
