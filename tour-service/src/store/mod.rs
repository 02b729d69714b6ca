//! Document storage
//!
//! This module provides the storage abstraction the models are persisted
//! through, plus the in-process engine the service ships with.
//!
//! # Overview
//!
//! - [`DocumentStore`]: engine trait (find / count / insert / update /
//!   delete / aggregate) using RPITIT
//! - [`FindQuery`], [`FilterCondition`], [`Projection`], [`SortKey`]:
//!   composable query values
//! - [`Pipeline`] and [`Stage`]: multi-stage aggregation
//! - [`MemoryStore`]: the `memory://` engine
//!
//! Store operations know nothing about schemas or hooks. Reads and writes
//! issued directly against a store therefore bypass every model hook.

use std::future::Future;

mod document;
mod error;
mod filter;
mod memory;
mod pipeline;
mod query;
mod value;

pub use document::{
    document_id, remove_field, resolve, set_field, Document, ID_FIELD, VERSION_FIELD,
};
pub use error::{QueryError, StoreError, StoreResult};
pub use filter::{matches_all, FilterCondition, FilterOperator, FilterValue};
pub use memory::{MemoryStore, MEMORY_SCHEME};
pub use pipeline::{Accumulator, Expr, Pipeline, Stage};
pub use query::{sort_documents, FindQuery, OrderDirection, Projection, SortKey};
pub use value::{compare_values, format_date, number_to_value, parse_date, values_equal};

/// Storage engine for JSON documents grouped into named collections
pub trait DocumentStore: Send + Sync {
    /// Declare a unique index on a top-level field
    fn ensure_unique(
        &self,
        collection: &str,
        field: &str,
    ) -> impl Future<Output = StoreResult<()>> + Send;

    /// Insert a document; the store sets the revision counter to `0`
    fn insert(
        &self,
        collection: &str,
        doc: Document,
    ) -> impl Future<Output = StoreResult<Document>> + Send;

    /// Run a find query
    fn find(
        &self,
        collection: &str,
        query: &FindQuery,
    ) -> impl Future<Output = StoreResult<Vec<Document>>> + Send;

    /// Count documents matching every filter
    fn count(
        &self,
        collection: &str,
        filters: &[FilterCondition],
    ) -> impl Future<Output = StoreResult<u64>> + Send;

    /// Rewrite one document atomically, bumping its revision
    ///
    /// The document is addressed by `id` and must also satisfy every filter.
    /// `apply` receives the stored copy and returns its replacement; no other
    /// write to the collection can interleave between the read and the write.
    /// An error from `apply` leaves the stored document untouched.
    fn update<F, E>(
        &self,
        collection: &str,
        id: &str,
        filters: &[FilterCondition],
        apply: F,
    ) -> impl Future<Output = Result<Document, E>> + Send
    where
        F: FnOnce(Document) -> Result<Document, E> + Send,
        E: From<StoreError> + Send;

    /// Delete by identifier; `false` when nothing was removed
    fn delete(&self, collection: &str, id: &str) -> impl Future<Output = StoreResult<bool>> + Send;

    /// Run an aggregation pipeline over a whole collection
    fn aggregate(
        &self,
        collection: &str,
        pipeline: &Pipeline,
    ) -> impl Future<Output = StoreResult<Vec<Document>>> + Send;

    /// Check that the engine is reachable
    fn ping(&self) -> impl Future<Output = StoreResult<()>> + Send;
}
