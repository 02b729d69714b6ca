//! In-process document store
//!
//! Collections live in a [`DashMap`]; each operation holds one collection
//! shard for the duration of its synchronous work and never across an
//! `.await`. Documents keep insertion order, which is the natural order
//! used to break sort ties.

use std::sync::Arc;

use dashmap::DashMap;
use serde_json::Value;

use super::document::{document_id, Document, ID_FIELD, VERSION_FIELD};
use super::error::{StoreError, StoreResult};
use super::filter::{matches_all, FilterCondition};
use super::pipeline::Pipeline;
use super::query::{sort_documents, FindQuery};
use super::value::values_equal;
use super::DocumentStore;

/// Connection-string scheme served by [`MemoryStore`]
pub const MEMORY_SCHEME: &str = "memory://";

#[derive(Debug, Default)]
struct Collection {
    documents: Vec<Document>,
    unique: Vec<String>,
}

impl Collection {
    fn check_unique(&self, name: &str, doc: &Document) -> StoreResult<()> {
        let id = document_id(doc);
        for field in &self.unique {
            let Some(value) = doc.get(field).filter(|v| !v.is_null()) else {
                continue;
            };
            let clash = self.documents.iter().any(|existing| {
                document_id(existing) != id
                    && existing.get(field).is_some_and(|other| values_equal(other, value))
            });
            if clash {
                return Err(StoreError::DuplicateKey {
                    collection: name.to_string(),
                    field: field.clone(),
                    value: value.to_string(),
                });
            }
        }
        Ok(())
    }

    fn position(&self, id: &str) -> Option<usize> {
        self.documents
            .iter()
            .position(|doc| document_id(doc) == Some(id))
    }
}

/// Document store held entirely in memory
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    name: String,
    collections: Arc<DashMap<String, Collection>>,
}

impl MemoryStore {
    /// Create an empty store with the given database name
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            collections: Arc::new(DashMap::new()),
        }
    }

    /// Open a store from a `memory://<name>` connection string
    ///
    /// # Example
    ///
    /// ```rust
    /// use tour_service::store::MemoryStore;
    ///
    /// let store = MemoryStore::connect("memory://natours").unwrap();
    /// assert_eq!(store.name(), "natours");
    /// assert!(MemoryStore::connect("mongodb://localhost/natours").is_err());
    /// ```
    pub fn connect(url: &str) -> StoreResult<Self> {
        let name = url
            .strip_prefix(MEMORY_SCHEME)
            .ok_or_else(|| StoreError::UnsupportedScheme(redact(url)))?;
        let name = name.split(['?', '/']).next().unwrap_or_default();
        Ok(Self::new(if name.is_empty() { "default" } else { name }))
    }

    /// Database name
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of collections that have been touched
    #[must_use]
    pub fn collection_count(&self) -> usize {
        self.collections.len()
    }
}

/// Strip credentials from a connection string before it is logged or returned
fn redact(url: &str) -> String {
    match (url.find("://"), url.rfind('@')) {
        (Some(scheme_end), Some(at)) if at > scheme_end => {
            format!("{}://***{}", &url[..scheme_end], &url[at..])
        }
        _ => url.to_string(),
    }
}

impl DocumentStore for MemoryStore {
    async fn ensure_unique(&self, collection: &str, field: &str) -> StoreResult<()> {
        let mut entry = self.collections.entry(collection.to_string()).or_default();
        if !entry.unique.iter().any(|f| f == field) {
            entry.unique.push(field.to_string());
        }
        Ok(())
    }

    async fn insert(&self, collection: &str, mut doc: Document) -> StoreResult<Document> {
        let mut entry = self.collections.entry(collection.to_string()).or_default();
        doc.insert(VERSION_FIELD.to_string(), Value::from(0));
        entry.check_unique(collection, &doc)?;
        entry.documents.push(doc.clone());
        tracing::trace!(collection, id = ?document_id(&doc), "document inserted");
        Ok(doc)
    }

    async fn find(&self, collection: &str, query: &FindQuery) -> StoreResult<Vec<Document>> {
        let Some(entry) = self.collections.get(collection) else {
            return Ok(Vec::new());
        };
        let mut matched: Vec<Document> = entry
            .documents
            .iter()
            .filter(|doc| matches_all(&query.filters, doc))
            .cloned()
            .collect();
        drop(entry);

        sort_documents(&mut matched, &query.sort);

        let limit = query.limit.map_or(usize::MAX, |n| n as usize);
        Ok(matched
            .into_iter()
            .skip(query.skip as usize)
            .take(limit)
            .map(|doc| match &query.projection {
                Some(projection) => projection.apply(doc),
                None => doc,
            })
            .collect())
    }

    async fn count(&self, collection: &str, filters: &[FilterCondition]) -> StoreResult<u64> {
        Ok(self.collections.get(collection).map_or(0, |entry| {
            entry
                .documents
                .iter()
                .filter(|doc| matches_all(filters, doc))
                .count() as u64
        }))
    }

    async fn update<F, E>(
        &self,
        collection: &str,
        id: &str,
        filters: &[FilterCondition],
        apply: F,
    ) -> Result<Document, E>
    where
        F: FnOnce(Document) -> Result<Document, E> + Send,
        E: From<StoreError> + Send,
    {
        let not_found = || StoreError::NotFound {
            collection: collection.to_string(),
            id: id.to_string(),
        };
        let mut entry = self.collections.get_mut(collection).ok_or_else(not_found)?;
        let index = entry
            .position(id)
            .filter(|&index| matches_all(filters, &entry.documents[index]))
            .ok_or_else(not_found)?;

        let current = entry.documents[index].clone();
        let version = current
            .get(VERSION_FIELD)
            .and_then(Value::as_u64)
            .unwrap_or(0);

        let mut doc = apply(current)?;
        doc.insert(ID_FIELD.to_string(), Value::String(id.to_string()));
        doc.insert(VERSION_FIELD.to_string(), Value::from(version + 1));

        entry.check_unique(collection, &doc)?;
        entry.documents[index] = doc.clone();
        Ok(doc)
    }

    async fn delete(&self, collection: &str, id: &str) -> StoreResult<bool> {
        let Some(mut entry) = self.collections.get_mut(collection) else {
            return Ok(false);
        };
        Ok(match entry.position(id) {
            Some(index) => {
                entry.documents.remove(index);
                true
            }
            None => false,
        })
    }

    async fn aggregate(&self, collection: &str, pipeline: &Pipeline) -> StoreResult<Vec<Document>> {
        let docs = self
            .collections
            .get(collection)
            .map(|entry| entry.documents.clone())
            .unwrap_or_default();
        Ok(pipeline.execute(docs))
    }

    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }
}
