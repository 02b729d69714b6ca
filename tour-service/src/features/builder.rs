//! Chainable query builder driven by query-string parameters

use std::sync::LazyLock;

use regex::Regex;

use crate::store::{
    FilterCondition, FilterOperator, FilterValue, FindQuery, Projection, QueryError, SortKey,
    ID_FIELD, VERSION_FIELD,
};

use super::params::QueryParams;

/// Parameters that drive sorting, projection and paging instead of filtering
pub const RESERVED_KEYS: &[&str] = &["page", "sort", "limit", "fields"];

/// Sort used when the caller gives none
pub const DEFAULT_SORT: &str = "-ratingsAverage";

pub const DEFAULT_PAGE: u64 = 1;

pub const DEFAULT_LIMIT: u64 = 100;

/// `field[op]` keys, where `op` is one of the four range keywords
static OPERATOR_KEY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([^\[\]]+)\[(gte|gt|lte|lt)\]$").expect("operator key regex is valid")
});

/// Resolved paging values
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    /// 1-based page number
    pub page: u64,
    /// Page size
    pub limit: u64,
    /// Documents skipped before this page
    pub skip: u64,
    /// Whether the caller sent a non-empty `page` parameter
    pub explicit: bool,
}

/// Builds a [`FindQuery`] from query-string parameters
///
/// Each stage consumes the builder and returns it, so stages chain:
///
/// ```rust
/// use tour_service::features::{QueryFeatures, QueryParams};
/// use tour_service::store::{FindQuery, OrderDirection};
///
/// let params = QueryParams::from_pairs([
///     ("duration[gte]", "5"),
///     ("sort", "price,-ratingsAverage"),
///     ("fields", "name,price"),
///     ("page", "2"),
///     ("limit", "3"),
/// ]);
/// let query = QueryFeatures::new(FindQuery::new(), params)
///     .filter()
///     .sort()
///     .limit_fields()
///     .unwrap()
///     .paginate()
///     .into_query();
///
/// assert_eq!(query.filters.len(), 1);
/// assert_eq!(query.sort[1].direction, OrderDirection::Descending);
/// assert_eq!((query.skip, query.limit), (3, Some(3)));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct QueryFeatures {
    query: FindQuery,
    params: QueryParams,
    default_limit: u64,
    window: Option<PageWindow>,
}

impl QueryFeatures {
    pub fn new(query: FindQuery, params: QueryParams) -> Self {
        Self {
            query,
            params,
            default_limit: DEFAULT_LIMIT,
            window: None,
        }
    }

    /// Page size used when `limit` is absent or invalid
    #[must_use]
    pub fn with_default_limit(mut self, limit: u64) -> Self {
        self.default_limit = if limit == 0 { DEFAULT_LIMIT } else { limit };
        self
    }

    /// Turn every non-reserved parameter into a filter condition
    ///
    /// `field[gte]`, `field[gt]`, `field[lte]` and `field[lt]` become range
    /// conditions. Any other key, including `field[other]`, is an equality
    /// condition on the key as written; repeated keys become a membership
    /// condition. Values stay raw strings until the repository casts them.
    #[must_use]
    pub fn filter(mut self) -> Self {
        let remaining = self.params.without(RESERVED_KEYS);

        for (key, values) in remaining.grouped() {
            let operator_key = OPERATOR_KEY.captures(key).and_then(|captures| {
                let field = captures.get(1)?.as_str();
                let operator = FilterOperator::from_keyword(captures.get(2)?.as_str())?;
                Some((field, operator))
            });

            match operator_key {
                Some((field, operator)) => {
                    for value in values {
                        self.query.filters.push(FilterCondition::new(
                            field,
                            operator,
                            FilterValue::String(value.to_string()),
                        ));
                    }
                }
                None => {
                    let condition = match values.as_slice() {
                        [single] => FilterCondition::eq(key, *single),
                        many => FilterCondition::in_list(
                            key,
                            many.iter().map(|v| FilterValue::from(*v)).collect(),
                        ),
                    };
                    self.query.filters.push(condition);
                }
            }
        }

        tracing::trace!(filters = self.query.filters.len(), "filter stage");
        self
    }

    /// Order by `sort=a,-b`; descending `ratingsAverage` when absent or empty
    #[must_use]
    pub fn sort(mut self) -> Self {
        let keys = self.params.get("sort").map(sort_keys).unwrap_or_default();
        self.query.sort = if keys.is_empty() {
            sort_keys(DEFAULT_SORT)
        } else {
            keys
        };
        self
    }

    /// Select fields with `fields=a,b` (or `fields=-a,-b`)
    ///
    /// Without `fields` only the revision counter is dropped. `-_id` may
    /// accompany an inclusion list; any other mix fails.
    pub fn limit_fields(mut self) -> Result<Self, QueryError> {
        let Some(raw) = self.params.get("fields").filter(|raw| !raw.trim().is_empty()) else {
            self.query.projection = Some(Projection::exclude([VERSION_FIELD]));
            return Ok(self);
        };

        let mut include = Vec::new();
        let mut exclude = Vec::new();
        for token in tokens(raw) {
            match token.strip_prefix('-') {
                Some("") => {}
                Some(field) => exclude.push(field.to_string()),
                None => include.push(token.to_string()),
            }
        }

        let projection = if include.is_empty() {
            Projection::Exclude(exclude)
        } else {
            let drops_id = exclude.iter().any(|f| f == ID_FIELD);
            if exclude.iter().any(|f| f != ID_FIELD) {
                return Err(QueryError::MixedProjection(raw.to_string()));
            }
            Projection::Include {
                fields: include,
                keep_id: !drops_id,
            }
        };

        self.query.projection = Some(projection);
        Ok(self)
    }

    /// Apply `page` and `limit`
    ///
    /// Values that are not positive integers fall back to the defaults.
    /// No range check happens here; see [`QueryFeatures::ensure_page_exists`].
    #[must_use]
    pub fn paginate(mut self) -> Self {
        let page = positive(self.params.get("page")).unwrap_or(DEFAULT_PAGE);
        let limit = positive(self.params.get("limit")).unwrap_or(self.default_limit);
        let skip = (page - 1).saturating_mul(limit);
        let explicit = self.params.get("page").is_some_and(|raw| !raw.is_empty());

        self.query.skip = skip;
        self.query.limit = Some(limit);
        self.window = Some(PageWindow {
            page,
            limit,
            skip,
            explicit,
        });
        self
    }

    /// Fail when an explicitly requested page starts at or past `total`
    pub fn ensure_page_exists(&self, total: u64) -> Result<(), QueryError> {
        match self.window {
            Some(window) if window.explicit && window.skip >= total => {
                Err(QueryError::PageNotFound { page: window.page })
            }
            _ => Ok(()),
        }
    }

    /// Run every stage in order: filter, sort, fields, paging
    pub fn apply_all(self) -> Result<Self, QueryError> {
        Ok(self.filter().sort().limit_fields()?.paginate())
    }

    /// Paging values, once [`QueryFeatures::paginate`] has run
    #[must_use]
    pub fn page(&self) -> Option<PageWindow> {
        self.window
    }

    #[must_use]
    pub fn query(&self) -> &FindQuery {
        &self.query
    }

    #[must_use]
    pub fn into_query(self) -> FindQuery {
        self.query
    }
}

fn tokens(raw: &str) -> impl Iterator<Item = &str> {
    raw.split(|c: char| c == ',' || c.is_whitespace())
        .filter(|token| !token.is_empty())
}

fn sort_keys(raw: &str) -> Vec<SortKey> {
    tokens(raw)
        .filter_map(|token| match token.strip_prefix('-') {
            Some("") => None,
            Some(field) => Some(SortKey::descending(field)),
            None => Some(SortKey::ascending(token)),
        })
        .collect()
}

fn positive(raw: Option<&str>) -> Option<u64> {
    raw?.trim().parse::<u64>().ok().filter(|n| *n > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::OrderDirection;

    fn features(pairs: &[(&str, &str)]) -> QueryFeatures {
        QueryFeatures::new(FindQuery::new(), QueryParams::from_pairs(pairs.iter().copied()))
    }

    #[test]
    fn test_filter_drops_reserved_keys_and_keeps_the_rest() {
        let query = features(&[
            ("difficulty", "easy"),
            ("page", "2"),
            ("sort", "price"),
            ("limit", "10"),
            ("fields", "name"),
            ("duration", "5"),
        ])
        .filter()
        .into_query();

        assert_eq!(
            query.filters,
            vec![
                FilterCondition::eq("difficulty", "easy"),
                FilterCondition::eq("duration", "5"),
            ]
        );
    }

    #[test]
    fn test_filter_rewrites_range_keywords() {
        let query = features(&[
            ("duration[gte]", "5"),
            ("price[lt]", "1500"),
            ("ratingsAverage[gt]", "4.7"),
            ("maxGroupSize[lte]", "10"),
        ])
        .filter()
        .into_query();

        let ops: Vec<_> = query
            .filters
            .iter()
            .map(|f| (f.field.as_str(), f.operator))
            .collect();
        assert_eq!(
            ops,
            vec![
                ("duration", FilterOperator::GreaterThanOrEqual),
                ("price", FilterOperator::LessThan),
                ("ratingsAverage", FilterOperator::GreaterThan),
                ("maxGroupSize", FilterOperator::LessThanOrEqual),
            ]
        );
        assert_eq!(query.filters[0].value, FilterValue::String("5".into()));
    }

    #[test]
    fn test_filter_only_rewrites_whole_keywords() {
        let query = features(&[
            ("duration[gtx]", "5"),
            ("price[ne]", "1"),
            ("name", "gte"),
        ])
        .filter()
        .into_query();

        assert_eq!(
            query.filters,
            vec![
                FilterCondition::eq("duration[gtx]", "5"),
                FilterCondition::eq("price[ne]", "1"),
                FilterCondition::eq("name", "gte"),
            ]
        );
    }

    #[test]
    fn test_filter_repeated_keys() {
        let query = features(&[
            ("difficulty", "easy"),
            ("difficulty", "medium"),
            ("price[gte]", "100"),
            ("price[gte]", "200"),
        ])
        .filter()
        .into_query();

        assert_eq!(
            query.filters[0],
            FilterCondition::in_list(
                "difficulty",
                vec![FilterValue::from("easy"), FilterValue::from("medium")]
            )
        );
        assert_eq!(query.filters.len(), 3);
    }

    #[test]
    fn test_filter_keeps_base_query_filters() {
        let base = FindQuery::new().with_filter(FilterCondition::eq("difficulty", "easy"));
        let query = QueryFeatures::new(base, QueryParams::from_pairs([("price", "1")]))
            .filter()
            .into_query();
        assert_eq!(query.filters.len(), 2);
    }

    #[test]
    fn test_sort_parses_keys_in_order() {
        let query = features(&[("sort", "price,-ratingsAverage")]).sort().into_query();
        assert_eq!(
            query.sort,
            vec![
                SortKey::ascending("price"),
                SortKey::descending("ratingsAverage")
            ]
        );
    }

    #[test]
    fn test_sort_defaults_to_rating_descending() {
        for pairs in [&[][..], &[("sort", "")][..], &[("sort", " , -")][..]] {
            let query = features(pairs).sort().into_query();
            assert_eq!(query.sort, vec![SortKey::descending("ratingsAverage")]);
            assert_eq!(query.sort[0].direction, OrderDirection::Descending);
        }
    }

    #[test]
    fn test_limit_fields_include() {
        let query = features(&[("fields", "name,duration,price")])
            .limit_fields()
            .unwrap()
            .into_query();
        assert_eq!(
            query.projection,
            Some(Projection::include(["name", "duration", "price"]))
        );
    }

    #[test]
    fn test_limit_fields_include_without_id() {
        let query = features(&[("fields", "name,-_id")])
            .limit_fields()
            .unwrap()
            .into_query();
        assert_eq!(
            query.projection,
            Some(Projection::Include {
                fields: vec!["name".into()],
                keep_id: false
            })
        );
    }

    #[test]
    fn test_limit_fields_exclude_and_default() {
        let query = features(&[("fields", "-summary,-description")])
            .limit_fields()
            .unwrap()
            .into_query();
        assert_eq!(
            query.projection,
            Some(Projection::exclude(["summary", "description"]))
        );

        let query = features(&[]).limit_fields().unwrap().into_query();
        assert_eq!(query.projection, Some(Projection::exclude(["__v"])));
    }

    #[test]
    fn test_limit_fields_rejects_mixed_selection() {
        let err = features(&[("fields", "name,-price")]).limit_fields().unwrap_err();
        assert_eq!(err, QueryError::MixedProjection("name,-price".into()));
    }

    #[test]
    fn test_paginate_arithmetic() {
        let f = features(&[("page", "3"), ("limit", "10")]).paginate();
        assert_eq!(
            f.page(),
            Some(PageWindow {
                page: 3,
                limit: 10,
                skip: 20,
                explicit: true
            })
        );
        let query = f.into_query();
        assert_eq!((query.skip, query.limit), (20, Some(10)));
    }

    #[test]
    fn test_paginate_defaults_and_fallbacks() {
        let f = features(&[]).paginate();
        assert_eq!(
            f.page(),
            Some(PageWindow {
                page: 1,
                limit: 100,
                skip: 0,
                explicit: false
            })
        );

        for bad in ["abc", "0", "-2", "1.5", ""] {
            let window = features(&[("page", bad), ("limit", bad)])
                .paginate()
                .page()
                .unwrap();
            assert_eq!((window.page, window.limit, window.skip), (1, 100, 0), "{bad}");
        }

        let window = features(&[]).with_default_limit(20).paginate().page().unwrap();
        assert_eq!(window.limit, 20);
    }

    #[test]
    fn test_ensure_page_exists() {
        let f = features(&[("page", "3"), ("limit", "5")]).paginate();
        assert!(f.ensure_page_exists(11).is_ok());
        assert_eq!(
            f.ensure_page_exists(10).unwrap_err(),
            QueryError::PageNotFound { page: 3 }
        );

        let implicit = features(&[("limit", "5")]).paginate();
        assert!(implicit.ensure_page_exists(0).is_ok());
        assert!(features(&[]).ensure_page_exists(0).is_ok());
    }

    #[test]
    fn test_apply_all_chains_every_stage() {
        let f = features(&[("price[lte]", "500"), ("fields", "name")])
            .apply_all()
            .unwrap();
        let query = f.query();
        assert_eq!(query.filters.len(), 1);
        assert_eq!(query.sort, vec![SortKey::descending("ratingsAverage")]);
        assert_eq!(query.projection, Some(Projection::include(["name"])));
        assert_eq!(query.limit, Some(100));
    }
}
