//! Query-string driven list features
//!
//! [`QueryFeatures`] turns `?duration[gte]=5&sort=-price&fields=name&page=2`
//! into a [`FindQuery`](crate::store::FindQuery) through four chainable
//! stages: filter, sort, field limiting and pagination.

mod builder;
mod params;

pub use builder::{
    PageWindow, QueryFeatures, DEFAULT_LIMIT, DEFAULT_PAGE, DEFAULT_SORT, RESERVED_KEYS,
};
pub use params::QueryParams;
