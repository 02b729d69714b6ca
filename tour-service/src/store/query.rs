//! Find queries: filter, ordering, projection and paging
//!
//! [`FindQuery`] is an immutable value. Every `with_*` method consumes the
//! query and returns the extended one, so a query handed to one caller can
//! never be altered by another.
//!
//! # Example
//!
//! ```rust
//! use tour_service::store::{FilterCondition, FindQuery, Projection, SortKey};
//!
//! let query = FindQuery::new()
//!     .with_filter(FilterCondition::eq("difficulty", "easy"))
//!     .with_sort(vec![SortKey::descending("ratingsAverage")])
//!     .with_projection(Projection::exclude(["__v"]))
//!     .with_skip(5)
//!     .with_limit(5);
//!
//! assert_eq!(query.skip, 5);
//! assert_eq!(query.limit, Some(5));
//! ```

use std::cmp::Ordering;
use std::fmt;

use super::document::{remove_field, resolve, set_field, Document, ID_FIELD};
use super::filter::FilterCondition;
use super::value::compare_values;

/// Direction for ordering results
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OrderDirection {
    /// Sort in ascending order
    #[default]
    Ascending,
    /// Sort in descending order
    Descending,
}

impl fmt::Display for OrderDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ascending => write!(f, "asc"),
            Self::Descending => write!(f, "desc"),
        }
    }
}

/// One key of a multi-key sort
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortKey {
    /// Field path to order by
    pub field: String,
    /// Ordering direction
    pub direction: OrderDirection,
}

impl SortKey {
    /// Ascending sort on a field
    pub fn ascending(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: OrderDirection::Ascending,
        }
    }

    /// Descending sort on a field
    pub fn descending(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: OrderDirection::Descending,
        }
    }
}

/// Stable multi-key sort; documents with equal keys keep their input order
pub fn sort_documents(docs: &mut [Document], keys: &[SortKey]) {
    if keys.is_empty() {
        return;
    }
    docs.sort_by(|a, b| {
        for key in keys {
            let left = resolve(a, &key.field).unwrap_or(&serde_json::Value::Null);
            let right = resolve(b, &key.field).unwrap_or(&serde_json::Value::Null);
            let ordering = match key.direction {
                OrderDirection::Ascending => compare_values(left, right),
                OrderDirection::Descending => compare_values(left, right).reverse(),
            };
            if ordering != Ordering::Equal {
                return ordering;
            }
        }
        Ordering::Equal
    });
}

/// Field selection applied to returned documents
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Projection {
    /// Return only the listed fields (plus `_id` unless `keep_id` is false)
    Include {
        /// Selected field paths
        fields: Vec<String>,
        /// Whether the identifier is returned
        keep_id: bool,
    },
    /// Return everything except the listed fields
    Exclude(Vec<String>),
}

impl Projection {
    /// Inclusion projection that keeps the identifier
    pub fn include<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Include {
            fields: fields.into_iter().map(Into::into).collect(),
            keep_id: true,
        }
    }

    /// Exclusion projection
    pub fn exclude<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Exclude(fields.into_iter().map(Into::into).collect())
    }

    /// Add fields that must never be returned unless selected explicitly
    ///
    /// Exclusion projections gain the hidden fields; inclusion projections
    /// are left alone because the caller named every field they want.
    #[must_use]
    pub fn hiding(self, hidden: &[&str]) -> Self {
        match self {
            Self::Exclude(mut fields) => {
                for field in hidden {
                    if !fields.iter().any(|f| f == field) {
                        fields.push((*field).to_string());
                    }
                }
                Self::Exclude(fields)
            }
            include => include,
        }
    }

    /// Drop fields that must never be returned, even when selected
    ///
    /// Inclusion projections lose any path rooted at a withheld field;
    /// exclusion projections gain the withheld fields.
    #[must_use]
    pub fn withholding(self, secret: &[&str]) -> Self {
        let rooted_at_secret = |path: &str| {
            let root = path.split('.').next().unwrap_or_default();
            secret.contains(&root)
        };
        match self {
            Self::Include { mut fields, keep_id } => {
                fields.retain(|f| !rooted_at_secret(f));
                Self::Include { fields, keep_id }
            }
            exclude => exclude.hiding(secret),
        }
    }

    /// Whether a top-level field survives this projection
    #[must_use]
    pub fn retains(&self, field: &str) -> bool {
        match self {
            Self::Include { fields, keep_id } => {
                (field == ID_FIELD && *keep_id) || fields.iter().any(|f| f == field)
            }
            Self::Exclude(fields) => !fields.iter().any(|f| f == field),
        }
    }

    /// Apply the projection to a document
    #[must_use]
    pub fn apply(&self, mut doc: Document) -> Document {
        match self {
            Self::Include { fields, keep_id } => {
                let mut projected = Document::new();
                if *keep_id {
                    if let Some(id) = doc.get(ID_FIELD) {
                        projected.insert(ID_FIELD.to_string(), id.clone());
                    }
                }
                for field in fields {
                    if let Some(value) = resolve(&doc, field) {
                        set_field(&mut projected, field, value.clone());
                    }
                }
                projected
            }
            Self::Exclude(fields) => {
                for field in fields {
                    remove_field(&mut doc, field);
                }
                doc
            }
        }
    }
}

/// A composed find query
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FindQuery {
    /// Conditions that must all hold
    pub filters: Vec<FilterCondition>,
    /// Ordering keys, applied in sequence
    pub sort: Vec<SortKey>,
    /// Field selection; `None` returns whole documents
    pub projection: Option<Projection>,
    /// Number of matching documents to skip
    pub skip: u64,
    /// Maximum number of documents to return
    pub limit: Option<u64>,
}

impl FindQuery {
    /// An unrestricted query
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A query selecting a single document by identifier
    pub fn by_id(id: impl Into<String>) -> Self {
        let id: String = id.into();
        Self::new()
            .with_filter(FilterCondition::eq(ID_FIELD, id))
            .with_limit(1)
    }

    /// Add a filter condition
    #[must_use]
    pub fn with_filter(mut self, condition: FilterCondition) -> Self {
        self.filters.push(condition);
        self
    }

    /// Add several filter conditions
    #[must_use]
    pub fn with_filters(mut self, conditions: impl IntoIterator<Item = FilterCondition>) -> Self {
        self.filters.extend(conditions);
        self
    }

    /// Replace the ordering keys
    #[must_use]
    pub fn with_sort(mut self, keys: Vec<SortKey>) -> Self {
        self.sort = keys;
        self
    }

    /// Replace the projection
    #[must_use]
    pub fn with_projection(mut self, projection: Projection) -> Self {
        self.projection = Some(projection);
        self
    }

    /// Set the number of documents to skip
    #[must_use]
    pub fn with_skip(mut self, skip: u64) -> Self {
        self.skip = skip;
        self
    }

    /// Set the maximum number of documents to return
    #[must_use]
    pub fn with_limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }
}
