//! Raw query-string parameters

/// Query-string parameters in the order they were received
///
/// A key may appear more than once (`?difficulty=easy&difficulty=medium`).
/// Single-valued lookups see the last occurrence.
///
/// # Example
///
/// ```rust
/// use tour_service::features::QueryParams;
///
/// let params = QueryParams::from_pairs([("sort", "price"), ("duration", "5"), ("sort", "-price")]);
/// assert_eq!(params.get("sort"), Some("-price"));
/// assert_eq!(params.without(&["sort"]).len(), 1);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryParams {
    pairs: Vec<(String, String)>,
}

impl QueryParams {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            pairs: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Last value supplied for `key`
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs
            .iter()
            .rev()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.pairs.iter().any(|(k, _)| k == key)
    }

    /// Values per key, keys in order of first appearance
    #[must_use]
    pub fn grouped(&self) -> Vec<(&str, Vec<&str>)> {
        let mut groups: Vec<(&str, Vec<&str>)> = Vec::new();
        for (key, value) in &self.pairs {
            let (key, value) = (key.as_str(), value.as_str());
            match groups.iter_mut().find(|group| group.0 == key) {
                Some(group) => group.1.push(value),
                None => groups.push((key, vec![value])),
            }
        }
        groups
    }

    /// Copy without the given keys
    #[must_use]
    pub fn without(&self, keys: &[&str]) -> Self {
        Self {
            pairs: self
                .pairs
                .iter()
                .filter(|(k, _)| !keys.contains(&k.as_str()))
                .cloned()
                .collect(),
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

impl From<Vec<(String, String)>> for QueryParams {
    fn from(pairs: Vec<(String, String)>) -> Self {
        Self { pairs }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_returns_last_value() {
        let params = QueryParams::from_pairs([("page", "1"), ("page", "3")]);
        assert_eq!(params.get("page"), Some("3"));
        assert_eq!(params.get("limit"), None);
        assert!(params.contains("page"));
    }

    #[test]
    fn test_grouped_keeps_first_appearance_order() {
        let params = QueryParams::from_pairs([
            ("difficulty", "easy"),
            ("duration[gte]", "5"),
            ("difficulty", "medium"),
        ]);
        assert_eq!(
            params.grouped(),
            vec![
                ("difficulty", vec!["easy", "medium"]),
                ("duration[gte]", vec!["5"]),
            ]
        );
    }

    #[test]
    fn test_without_leaves_original_untouched() {
        let params = QueryParams::from_pairs([("sort", "price"), ("price", "500")]);
        let filtered = params.without(&["sort", "page"]);
        assert_eq!(filtered, QueryParams::from_pairs([("price", "500")]));
        assert_eq!(params.len(), 2);
        assert!(QueryParams::new().is_empty());
    }
}
