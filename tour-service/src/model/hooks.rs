//! Model lifecycle hooks
//!
//! Hooks run inside the repository around store calls:
//!
//! - [`SaveHook`]: before a document is inserted or replaced
//! - [`QueryHook`]: before a find query is issued, and after it returns
//! - [`AggregateHook`]: before an aggregation pipeline runs
//!
//! A [`HookPipeline`] holds the hooks registered for one model and runs
//! them in registration order. Any hook may abort the operation with a
//! [`HookError`].

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;

use crate::store::{Document, FilterCondition, FindQuery, Pipeline, Stage};

use super::slug::slugify;

/// A hook refused to let an operation continue
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HookError {
    /// Name of the failing hook
    pub hook: &'static str,
    /// Why it failed
    pub message: String,
}

impl HookError {
    pub fn new(hook: &'static str, message: impl Into<String>) -> Self {
        Self {
            hook,
            message: message.into(),
        }
    }
}

impl fmt::Display for HookError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "hook {} failed: {}", self.hook, self.message)
    }
}

impl std::error::Error for HookError {}

/// Runs before a document is written
pub trait SaveHook: Send + Sync {
    fn name(&self) -> &'static str;

    /// Mutate the document about to be written
    fn before_save(&self, doc: &mut Document) -> Result<(), HookError>;
}

/// Runs around find queries
pub trait QueryHook: Send + Sync {
    fn name(&self) -> &'static str;

    /// Rewrite the query about to be issued
    fn before_find(&self, query: FindQuery) -> Result<FindQuery, HookError> {
        Ok(query)
    }

    /// Observe a completed query
    fn after_find(&self, _collection: &str, _elapsed: Duration, _returned: usize) {}
}

/// Runs before an aggregation pipeline
pub trait AggregateHook: Send + Sync {
    fn name(&self) -> &'static str;

    /// Rewrite the pipeline about to run
    fn before_aggregate(&self, pipeline: Pipeline) -> Result<Pipeline, HookError>;
}

/// Ordered hook registrations for one model
#[derive(Clone, Default)]
pub struct HookPipeline {
    save: Vec<Arc<dyn SaveHook>>,
    query: Vec<Arc<dyn QueryHook>>,
    aggregate: Vec<Arc<dyn AggregateHook>>,
}

impl fmt::Debug for HookPipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HookPipeline")
            .field("save", &self.save.iter().map(|h| h.name()).collect::<Vec<_>>())
            .field("query", &self.query.iter().map(|h| h.name()).collect::<Vec<_>>())
            .field(
                "aggregate",
                &self.aggregate.iter().map(|h| h.name()).collect::<Vec<_>>(),
            )
            .finish()
    }
}

impl HookPipeline {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_save_hook(mut self, hook: impl SaveHook + 'static) -> Self {
        self.save.push(Arc::new(hook));
        self
    }

    #[must_use]
    pub fn with_query_hook(mut self, hook: impl QueryHook + 'static) -> Self {
        self.query.push(Arc::new(hook));
        self
    }

    #[must_use]
    pub fn with_aggregate_hook(mut self, hook: impl AggregateHook + 'static) -> Self {
        self.aggregate.push(Arc::new(hook));
        self
    }

    pub fn before_save(&self, doc: &mut Document) -> Result<(), HookError> {
        self.save.iter().try_for_each(|hook| hook.before_save(doc))
    }

    pub fn before_find(&self, query: FindQuery) -> Result<FindQuery, HookError> {
        self.query
            .iter()
            .try_fold(query, |query, hook| hook.before_find(query))
    }

    pub fn after_find(&self, collection: &str, elapsed: Duration, returned: usize) {
        for hook in &self.query {
            hook.after_find(collection, elapsed, returned);
        }
    }

    pub fn before_aggregate(&self, pipeline: Pipeline) -> Result<Pipeline, HookError> {
        self.aggregate
            .iter()
            .try_fold(pipeline, |pipeline, hook| hook.before_aggregate(pipeline))
    }
}

/// Derives `slug` from `name` on every save
///
/// Documents without a string name lose their slug.
#[derive(Debug, Clone, Copy, Default)]
pub struct SlugHook;

impl SaveHook for SlugHook {
    fn name(&self) -> &'static str {
        "slug"
    }

    fn before_save(&self, doc: &mut Document) -> Result<(), HookError> {
        match doc.get("name").and_then(Value::as_str) {
            Some(name) => {
                let slug = slugify(name);
                doc.insert("slug".to_string(), Value::String(slug));
            }
            None => {
                doc.remove("slug");
            }
        }
        Ok(())
    }
}

/// Keeps documents flagged `secretTour: true` out of reads and reports
#[derive(Debug, Clone, Copy, Default)]
pub struct SecretTourFilter;

impl SecretTourFilter {
    pub const FIELD: &'static str = "secretTour";

    fn condition() -> FilterCondition {
        FilterCondition::ne(Self::FIELD, true)
    }
}

impl QueryHook for SecretTourFilter {
    fn name(&self) -> &'static str {
        "secret_tour"
    }

    fn before_find(&self, query: FindQuery) -> Result<FindQuery, HookError> {
        Ok(query.with_filter(Self::condition()))
    }
}

impl AggregateHook for SecretTourFilter {
    fn name(&self) -> &'static str {
        "secret_tour"
    }

    fn before_aggregate(&self, pipeline: Pipeline) -> Result<Pipeline, HookError> {
        Ok(pipeline.with_leading_stage(Stage::Match(vec![Self::condition()])))
    }
}

/// Logs how long each find query took
#[derive(Debug, Clone, Copy, Default)]
pub struct QueryTimer;

impl QueryHook for QueryTimer {
    fn name(&self) -> &'static str {
        "query_timer"
    }

    fn after_find(&self, collection: &str, elapsed: Duration, returned: usize) {
        tracing::debug!(
            collection,
            elapsed_ms = elapsed.as_secs_f64() * 1000.0,
            returned,
            "query completed"
        );
    }
}
