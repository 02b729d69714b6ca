//! Filter conditions for document queries
//!
//! A filter is a list of [`FilterCondition`]s that must all hold. Each
//! condition names a field, an operator and a value.
//!
//! # Example
//!
//! ```rust
//! use tour_service::store::{FilterCondition, FilterOperator};
//!
//! let filters = vec![
//!     FilterCondition::eq("difficulty", "easy"),
//!     FilterCondition::gte("duration", 5_i64),
//! ];
//! assert_eq!(filters[1].operator, FilterOperator::GreaterThanOrEqual);
//! ```

use std::cmp::Ordering;
use std::fmt;

use chrono::{DateTime, Utc};
use serde_json::Value;

use super::document::{resolve, Document};
use super::value::{comparable, compare_values, format_date, number_to_value, values_equal};

/// Comparison operators for filter conditions
///
/// # Example
///
/// ```rust
/// use tour_service::store::FilterOperator;
///
/// assert_eq!(format!("{}", FilterOperator::GreaterThanOrEqual), "$gte");
/// assert_eq!(FilterOperator::from_keyword("lt"), Some(FilterOperator::LessThan));
/// assert_eq!(FilterOperator::from_keyword("ne"), None);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FilterOperator {
    /// Equal to
    Equal,
    /// Not equal to (also matches documents missing the field)
    NotEqual,
    /// Greater than
    GreaterThan,
    /// Greater than or equal to
    GreaterThanOrEqual,
    /// Less than
    LessThan,
    /// Less than or equal to
    LessThanOrEqual,
    /// Value is one of a list
    In,
}

impl FilterOperator {
    /// Map a range keyword used in query strings (`gte`, `gt`, `lte`, `lt`)
    ///
    /// Only these four keywords are recognised; anything else yields `None`.
    #[must_use]
    pub fn from_keyword(keyword: &str) -> Option<Self> {
        match keyword {
            "gte" => Some(Self::GreaterThanOrEqual),
            "gt" => Some(Self::GreaterThan),
            "lte" => Some(Self::LessThanOrEqual),
            "lt" => Some(Self::LessThan),
            _ => None,
        }
    }

    /// Whether this operator is a range comparison
    #[must_use]
    pub const fn is_range(&self) -> bool {
        matches!(
            self,
            Self::GreaterThan | Self::GreaterThanOrEqual | Self::LessThan | Self::LessThanOrEqual
        )
    }
}

impl fmt::Display for FilterOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Equal => write!(f, "$eq"),
            Self::NotEqual => write!(f, "$ne"),
            Self::GreaterThan => write!(f, "$gt"),
            Self::GreaterThanOrEqual => write!(f, "$gte"),
            Self::LessThan => write!(f, "$lt"),
            Self::LessThanOrEqual => write!(f, "$lte"),
            Self::In => write!(f, "$in"),
        }
    }
}

/// A value that can be used in filter conditions
///
/// Values parsed from a query string start out as [`FilterValue::String`];
/// the owning schema casts them to the declared field type before the query
/// reaches the store.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterValue {
    /// String value (also the raw, uncast form)
    String(String),
    /// Numeric value
    Number(f64),
    /// Boolean value
    Boolean(bool),
    /// Timestamp value
    Date(DateTime<Utc>),
    /// List of values (for `In`)
    List(Vec<FilterValue>),
    /// Null value
    Null,
}

impl FilterValue {
    /// The JSON form compared against stored documents
    #[must_use]
    pub fn to_json(&self) -> Value {
        match self {
            Self::String(s) => Value::String(s.clone()),
            Self::Number(n) => number_to_value(*n),
            Self::Boolean(b) => Value::Bool(*b),
            Self::Date(d) => Value::String(format_date(d)),
            Self::List(items) => Value::Array(items.iter().map(Self::to_json).collect()),
            Self::Null => Value::Null,
        }
    }

    /// The raw text of an uncast value
    #[must_use]
    pub fn as_raw(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }
}

impl From<&str> for FilterValue {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<String> for FilterValue {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<i64> for FilterValue {
    fn from(n: i64) -> Self {
        Self::Number(n as f64)
    }
}

impl From<f64> for FilterValue {
    fn from(n: f64) -> Self {
        Self::Number(n)
    }
}

impl From<bool> for FilterValue {
    fn from(b: bool) -> Self {
        Self::Boolean(b)
    }
}

impl From<DateTime<Utc>> for FilterValue {
    fn from(d: DateTime<Utc>) -> Self {
        Self::Date(d)
    }
}

impl From<Vec<String>> for FilterValue {
    fn from(list: Vec<String>) -> Self {
        Self::List(list.into_iter().map(Self::String).collect())
    }
}

/// A single filter condition
#[derive(Debug, Clone, PartialEq)]
pub struct FilterCondition {
    /// The field path to filter on
    pub field: String,
    /// The comparison operator
    pub operator: FilterOperator,
    /// The value to compare against
    pub value: FilterValue,
}

impl FilterCondition {
    /// Create a new filter condition
    pub fn new(field: impl Into<String>, operator: FilterOperator, value: FilterValue) -> Self {
        Self {
            field: field.into(),
            operator,
            value,
        }
    }

    /// Create an equality filter
    pub fn eq(field: impl Into<String>, value: impl Into<FilterValue>) -> Self {
        Self::new(field, FilterOperator::Equal, value.into())
    }

    /// Create a not-equal filter
    pub fn ne(field: impl Into<String>, value: impl Into<FilterValue>) -> Self {
        Self::new(field, FilterOperator::NotEqual, value.into())
    }

    /// Create a greater-than filter
    pub fn gt(field: impl Into<String>, value: impl Into<FilterValue>) -> Self {
        Self::new(field, FilterOperator::GreaterThan, value.into())
    }

    /// Create a greater-than-or-equal filter
    pub fn gte(field: impl Into<String>, value: impl Into<FilterValue>) -> Self {
        Self::new(field, FilterOperator::GreaterThanOrEqual, value.into())
    }

    /// Create a less-than filter
    pub fn lt(field: impl Into<String>, value: impl Into<FilterValue>) -> Self {
        Self::new(field, FilterOperator::LessThan, value.into())
    }

    /// Create a less-than-or-equal filter
    pub fn lte(field: impl Into<String>, value: impl Into<FilterValue>) -> Self {
        Self::new(field, FilterOperator::LessThanOrEqual, value.into())
    }

    /// Create a membership filter
    pub fn in_list(field: impl Into<String>, values: Vec<FilterValue>) -> Self {
        Self::new(field, FilterOperator::In, FilterValue::List(values))
    }

    /// Evaluate the condition against a document
    ///
    /// Array fields match when any element satisfies the condition.
    #[must_use]
    pub fn matches(&self, doc: &Document) -> bool {
        let target = resolve(doc, &self.field);
        let expected = self.value.to_json();

        match self.operator {
            FilterOperator::Equal => equals(target, &expected),
            FilterOperator::NotEqual => !equals(target, &expected),
            FilterOperator::In => match &expected {
                Value::Array(options) => options.iter().any(|option| equals(target, option)),
                other => equals(target, other),
            },
            op => match target {
                Some(Value::Array(items)) => items.iter().any(|item| in_range(op, item, &expected)),
                Some(value) => in_range(op, value, &expected),
                None => false,
            },
        }
    }
}

/// Check whether every condition holds for a document
#[must_use]
pub fn matches_all(filters: &[FilterCondition], doc: &Document) -> bool {
    filters.iter().all(|condition| condition.matches(doc))
}

fn equals(target: Option<&Value>, expected: &Value) -> bool {
    match target {
        None => expected.is_null(),
        Some(Value::Array(items)) if !expected.is_array() => {
            items.iter().any(|item| values_equal(item, expected))
        }
        Some(value) => values_equal(value, expected),
    }
}

fn in_range(op: FilterOperator, value: &Value, expected: &Value) -> bool {
    if !comparable(value, expected) {
        return false;
    }
    let ordering = compare_values(value, expected);
    match op {
        FilterOperator::GreaterThan => ordering == Ordering::Greater,
        FilterOperator::GreaterThanOrEqual => ordering != Ordering::Less,
        FilterOperator::LessThan => ordering == Ordering::Less,
        FilterOperator::LessThanOrEqual => ordering != Ordering::Greater,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn doc(value: Value) -> Document {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_filter_operator_display() {
        assert_eq!(format!("{}", FilterOperator::Equal), "$eq");
        assert_eq!(format!("{}", FilterOperator::NotEqual), "$ne");
        assert_eq!(format!("{}", FilterOperator::GreaterThan), "$gt");
        assert_eq!(format!("{}", FilterOperator::GreaterThanOrEqual), "$gte");
        assert_eq!(format!("{}", FilterOperator::LessThan), "$lt");
        assert_eq!(format!("{}", FilterOperator::LessThanOrEqual), "$lte");
        assert_eq!(format!("{}", FilterOperator::In), "$in");
    }

    #[test]
    fn test_from_keyword_whole_words_only() {
        assert_eq!(FilterOperator::from_keyword("gte"), Some(FilterOperator::GreaterThanOrEqual));
        assert_eq!(FilterOperator::from_keyword("gt"), Some(FilterOperator::GreaterThan));
        assert_eq!(FilterOperator::from_keyword("lte"), Some(FilterOperator::LessThanOrEqual));
        assert_eq!(FilterOperator::from_keyword("lt"), Some(FilterOperator::LessThan));
        assert_eq!(FilterOperator::from_keyword("gtx"), None);
        assert_eq!(FilterOperator::from_keyword("GTE"), None);
        assert_eq!(FilterOperator::from_keyword("eq"), None);
    }

    #[test]
    fn test_filter_value_to_json() {
        assert_eq!(FilterValue::from(5_i64).to_json(), json!(5));
        assert_eq!(FilterValue::from(4.7).to_json(), json!(4.7));
        assert_eq!(FilterValue::from(true).to_json(), json!(true));
        let date = Utc.with_ymd_and_hms(2021, 1, 1, 0, 0, 0).unwrap();
        assert_eq!(FilterValue::from(date).to_json(), json!("2021-01-01T00:00:00.000Z"));
        assert_eq!(
            FilterValue::from(vec!["easy".to_string()]).to_json(),
            json!(["easy"])
        );
    }

    #[test]
    fn test_equality_and_inequality() {
        let d = doc(json!({"difficulty": "easy", "duration": 5}));
        assert!(FilterCondition::eq("difficulty", "easy").matches(&d));
        assert!(!FilterCondition::eq("difficulty", "medium").matches(&d));
        assert!(FilterCondition::eq("duration", 5.0).matches(&d));
        assert!(FilterCondition::ne("difficulty", "medium").matches(&d));
    }

    #[test]
    fn test_not_equal_matches_missing_field() {
        let d = doc(json!({"name": "The Park Camper"}));
        assert!(FilterCondition::ne("secretTour", true).matches(&d));
        assert!(!FilterCondition::eq("secretTour", true).matches(&d));
    }

    #[test]
    fn test_range_operators() {
        let d = doc(json!({"duration": 7, "price": 497}));
        assert!(FilterCondition::gte("duration", 7_i64).matches(&d));
        assert!(!FilterCondition::gt("duration", 7_i64).matches(&d));
        assert!(FilterCondition::lt("price", 500_i64).matches(&d));
        assert!(FilterCondition::lte("price", 497_i64).matches(&d));
        assert!(!FilterCondition::lt("missing", 10_i64).matches(&d));
    }

    #[test]
    fn test_range_requires_same_type() {
        let d = doc(json!({"duration": "7"}));
        assert!(!FilterCondition::gte("duration", 5_i64).matches(&d));
    }

    #[test]
    fn test_array_fields_match_any_element() {
        let d = doc(json!({"images": ["tour-1-1.jpg", "tour-1-2.jpg"], "scores": [2, 9]}));
        assert!(FilterCondition::eq("images", "tour-1-2.jpg").matches(&d));
        assert!(FilterCondition::gt("scores", 8_i64).matches(&d));
        assert!(!FilterCondition::gt("scores", 9_i64).matches(&d));
    }

    #[test]
    fn test_in_list() {
        let d = doc(json!({"difficulty": "medium"}));
        let filter = FilterCondition::in_list(
            "difficulty",
            vec!["easy".into(), "medium".into()],
        );
        assert!(filter.matches(&d));
        let miss = FilterCondition::in_list("difficulty", vec!["difficult".into()]);
        assert!(!miss.matches(&d));
    }

    #[test]
    fn test_matches_all() {
        let d = doc(json!({"difficulty": "easy", "duration": 5}));
        let filters = vec![
            FilterCondition::eq("difficulty", "easy"),
            FilterCondition::gte("duration", 5_i64),
        ];
        assert!(matches_all(&filters, &d));
        assert!(matches_all(&[], &d));
        let failing = vec![FilterCondition::gte("duration", 6_i64)];
        assert!(!matches_all(&failing, &d));
    }
}
