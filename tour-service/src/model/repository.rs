//! Schema-aware repository over a document store
//!
//! [`ModelRepository`] is the only path handlers use to reach the store. It
//! casts filters against the [`Schema`], validates writes, assigns TypeID
//! identifiers and runs the model's [`HookPipeline`] around every call.

use std::sync::Arc;
use std::time::Instant;

use serde_json::Value;

use crate::ids::DocumentId;
use crate::store::{
    Document, DocumentStore, FilterCondition, FindQuery, Pipeline, Projection, QueryError,
    SortKey, StoreError, ID_FIELD,
};

use super::error::{RepositoryError, RepositoryOperation, RepositoryResult};
use super::hooks::HookPipeline;
use super::schema::Schema;

/// Why an atomic update was abandoned
enum UpdateFailure {
    Store(StoreError),
    Rejected(RepositoryError),
}

impl From<StoreError> for UpdateFailure {
    fn from(error: StoreError) -> Self {
        Self::Store(error)
    }
}

/// Repository for one entity
#[derive(Debug)]
pub struct ModelRepository<S> {
    store: Arc<S>,
    schema: Arc<Schema>,
    hooks: HookPipeline,
}

impl<S> Clone for ModelRepository<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            schema: Arc::clone(&self.schema),
            hooks: self.hooks.clone(),
        }
    }
}

impl<S: DocumentStore> ModelRepository<S> {
    pub fn new(store: Arc<S>, schema: Schema, hooks: HookPipeline) -> Self {
        Self {
            store,
            schema: Arc::new(schema),
            hooks,
        }
    }

    /// Declare the schema's unique indexes on the store
    pub async fn init(&self) -> RepositoryResult<()> {
        for field in self.schema.unique_fields() {
            self.store
                .ensure_unique(self.schema.collection(), field)
                .await
                .map_err(|e| self.store_error(RepositoryOperation::Create, e))?;
        }
        tracing::debug!(
            entity = self.schema.entity(),
            collection = self.schema.collection(),
            "repository initialized"
        );
        Ok(())
    }

    #[must_use]
    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    #[must_use]
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    fn store_error(&self, operation: RepositoryOperation, error: StoreError) -> RepositoryError {
        RepositoryError::from_store(operation, self.schema.entity(), error)
    }

    fn parse_id(&self, operation: RepositoryOperation, id: &str) -> RepositoryResult<String> {
        DocumentId::parse(self.schema.id_prefix(), id)
            .map(String::from)
            .map_err(|e| {
                let error = QueryError::InvalidId(format!("{id} ({e})"));
                RepositoryError::from_query(operation, &error).with_entity(self.schema.entity(), id)
            })
    }

    fn cast_filters(
        &self,
        operation: RepositoryOperation,
        filters: Vec<FilterCondition>,
    ) -> RepositoryResult<Vec<FilterCondition>> {
        filters
            .into_iter()
            .map(|condition| self.schema.cast_filter(condition))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| RepositoryError::from_query(operation, &e))
    }

    fn check_sort(&self, operation: RepositoryOperation, sort: &[SortKey]) -> RepositoryResult<()> {
        match sort.iter().find(|key| self.schema.is_secret_path(&key.field)) {
            Some(key) => Err(RepositoryError::from_query(
                operation,
                &QueryError::UnknownField(key.field.clone()),
            )),
            None => Ok(()),
        }
    }

    /// Apply find hooks, then run the query without touching its projection
    async fn hooked_find(
        &self,
        operation: RepositoryOperation,
        query: FindQuery,
    ) -> RepositoryResult<Vec<Document>> {
        let query = self
            .hooks
            .before_find(query)
            .map_err(|e| RepositoryError::from_hook(operation, &e))?;

        let started = Instant::now();
        let docs = self
            .store
            .find(self.schema.collection(), &query)
            .await
            .map_err(|e| self.store_error(operation, e))?;
        self.hooks
            .after_find(self.schema.collection(), started.elapsed(), docs.len());
        Ok(docs)
    }

    /// Hidden fields stay out unless an inclusion projection names them;
    /// secret fields stay out regardless
    fn output_projection(&self, projection: Option<Projection>) -> Projection {
        let hidden = self.schema.hidden_fields();
        let secret = self.schema.secret_fields();
        projection
            .unwrap_or_else(|| Projection::Exclude(Vec::new()))
            .hiding(&hidden)
            .withholding(&secret)
    }

    fn finish(&self, docs: Vec<Document>) -> Vec<Document> {
        docs.into_iter()
            .map(|mut doc| {
                self.schema.apply_virtuals(&mut doc);
                doc
            })
            .collect()
    }

    /// Run a find query built from caller input
    ///
    /// Filters are cast against the schema, so unknown fields and values
    /// that do not fit the declared type fail as malformed queries.
    pub async fn find(&self, mut query: FindQuery) -> RepositoryResult<Vec<Document>> {
        let operation = RepositoryOperation::FindAll;
        query.filters = self.cast_filters(operation, std::mem::take(&mut query.filters))?;
        self.check_sort(operation, &query.sort)?;
        query.projection = Some(self.output_projection(query.projection.take()));

        let docs = self.hooked_find(operation, query).await?;
        tracing::debug!(entity = self.schema.entity(), returned = docs.len(), "find");
        Ok(self.finish(docs))
    }

    /// Count documents visible to find queries with the given filters
    pub async fn count(&self, filters: Vec<FilterCondition>) -> RepositoryResult<u64> {
        let operation = RepositoryOperation::Count;
        let filters = self.cast_filters(operation, filters)?;
        let query = self
            .hooks
            .before_find(FindQuery::new().with_filters(filters))
            .map_err(|e| RepositoryError::from_hook(operation, &e))?;
        self.store
            .count(self.schema.collection(), &query.filters)
            .await
            .map_err(|e| self.store_error(operation, e))
    }

    async fn lookup(&self, operation: RepositoryOperation, id: &str) -> RepositoryResult<Document> {
        let id = self.parse_id(operation, id)?;
        self.hooked_find(operation, FindQuery::by_id(id.clone()))
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| {
                RepositoryError::not_found(self.schema.entity(), id).with_operation(operation)
            })
    }

    /// Fetch one document by identifier
    pub async fn find_by_id(&self, id: &str) -> RepositoryResult<Document> {
        let doc = self.lookup(RepositoryOperation::FindById, id).await?;
        Ok(self.schema.present(doc))
    }

    /// Validate and insert a new document
    pub async fn create(&self, input: Value) -> RepositoryResult<Document> {
        let operation = RepositoryOperation::Create;
        let mut doc = self
            .schema
            .prepare_insert(input)
            .map_err(|e| RepositoryError::from_validation(operation, &e))?;
        self.hooks
            .before_save(&mut doc)
            .map_err(|e| RepositoryError::from_hook(operation, &e))?;

        let id = DocumentId::generate(self.schema.id_prefix());
        doc.insert(ID_FIELD.to_string(), Value::String(id.to_string()));

        let stored = self
            .store
            .insert(self.schema.collection(), doc)
            .await
            .map_err(|e| self.store_error(operation, e))?;

        tracing::info!(entity = self.schema.entity(), id = %id, "document created");
        Ok(self.schema.present(stored))
    }

    /// Merge a partial update into the stored document
    ///
    /// Validation and save hooks run again over the merged document, so a
    /// changed `name` also yields a new `slug`. The read, merge and write
    /// happen as one store operation, so concurrent patches to the same
    /// document are applied one after the other.
    pub async fn update(&self, id: &str, patch: Value) -> RepositoryResult<Document> {
        let operation = RepositoryOperation::Update;
        let id = self.parse_id(operation, id)?;
        let query = self
            .hooks
            .before_find(FindQuery::by_id(id.clone()))
            .map_err(|e| RepositoryError::from_hook(operation, &e))?;

        let merge = |existing: Document| -> Result<Document, UpdateFailure> {
            let mut doc = self
                .schema
                .prepare_update(existing, patch)
                .map_err(|e| UpdateFailure::Rejected(RepositoryError::from_validation(operation, &e)))?;
            self.hooks
                .before_save(&mut doc)
                .map_err(|e| UpdateFailure::Rejected(RepositoryError::from_hook(operation, &e)))?;
            Ok(doc)
        };

        let started = Instant::now();
        let stored = self
            .store
            .update(self.schema.collection(), &id, &query.filters, merge)
            .await
            .map_err(|failure| match failure {
                UpdateFailure::Store(e) => self.store_error(operation, e),
                UpdateFailure::Rejected(e) => e,
            })?;
        self.hooks
            .after_find(self.schema.collection(), started.elapsed(), 1);

        tracing::info!(entity = self.schema.entity(), id = %id, "document updated");
        Ok(self.schema.present(stored))
    }

    /// Delete a document visible to find queries
    pub async fn delete(&self, id: &str) -> RepositoryResult<()> {
        let operation = RepositoryOperation::Delete;
        self.lookup(operation, id).await?;
        let id = self.parse_id(operation, id)?;

        let removed = self
            .store
            .delete(self.schema.collection(), &id)
            .await
            .map_err(|e| self.store_error(operation, e))?;
        if !removed {
            return Err(RepositoryError::not_found(self.schema.entity(), id).with_operation(operation));
        }

        tracing::info!(entity = self.schema.entity(), id = %id, "document deleted");
        Ok(())
    }

    /// Run an aggregation pipeline after the aggregate hooks
    pub async fn aggregate(&self, pipeline: Pipeline) -> RepositoryResult<Vec<Document>> {
        let operation = RepositoryOperation::Aggregate;
        let pipeline = self
            .hooks
            .before_aggregate(pipeline)
            .map_err(|e| RepositoryError::from_hook(operation, &e))?;
        self.store
            .aggregate(self.schema.collection(), &pipeline)
            .await
            .map_err(|e| self.store_error(operation, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{
        FieldDef, HookError, RepositoryErrorKind, SaveHook, SecretTourFilter, SlugHook,
    };
    use crate::store::{MemoryStore, Stage, VERSION_FIELD};
    use serde_json::json;

    fn schema() -> Schema {
        Schema::new("Thing", "things", "thing")
            .with_field(FieldDef::string("name").required("A thing must have a name").unique())
            .with_field(FieldDef::number("price").required("A thing must have a price"))
            .with_field(FieldDef::string("slug").managed())
            .with_field(FieldDef::boolean("secretTour").default_value(|| json!(false)))
            .with_field(FieldDef::string("secret").hidden())
            .with_field(FieldDef::string("pin").secret())
            .with_virtual("double", |doc| {
                doc.get("price").and_then(Value::as_f64).map(|p| json!(p * 2.0))
            })
    }

    async fn repository() -> ModelRepository<MemoryStore> {
        let hooks = HookPipeline::new()
            .with_save_hook(SlugHook)
            .with_query_hook(SecretTourFilter)
            .with_aggregate_hook(SecretTourFilter);
        let repo = ModelRepository::new(Arc::new(MemoryStore::new("test")), schema(), hooks);
        repo.init().await.unwrap();
        repo
    }

    #[tokio::test]
    async fn test_create_assigns_id_slug_and_hides_fields() {
        let repo = repository().await;
        let created = repo
            .create(json!({"name": "Big Thing", "price": 10, "slug": "custom", "secret": "x"}))
            .await
            .unwrap();
        let id = created[ID_FIELD].as_str().unwrap();
        assert!(id.starts_with("thing_"));
        assert_eq!(created["slug"], json!("big-thing"));
        assert_eq!(created[VERSION_FIELD], json!(0));
        assert_eq!(created["double"], json!(20.0));
        assert!(!created.contains_key("secret"));
    }

    #[tokio::test]
    async fn test_create_validation_and_duplicates() {
        let repo = repository().await;
        let err = repo.create(json!({"name": "A"})).await.unwrap_err();
        assert_eq!(err.kind, RepositoryErrorKind::ValidationFailed);
        assert!(err.message.contains("A thing must have a price"));

        repo.create(json!({"name": "A", "price": 1})).await.unwrap();
        let err = repo.create(json!({"name": "A", "price": 2})).await.unwrap_err();
        assert_eq!(err.kind, RepositoryErrorKind::AlreadyExists);
    }

    #[tokio::test]
    async fn test_find_casts_filters_and_hides_secrets() {
        let repo = repository().await;
        repo.create(json!({"name": "A", "price": 1})).await.unwrap();
        repo.create(json!({"name": "B", "price": 5})).await.unwrap();
        repo.create(json!({"name": "C", "price": 9, "secretTour": true}))
            .await
            .unwrap();

        let found = repo
            .find(FindQuery::new().with_filter(FilterCondition::gte("price", "2")))
            .await
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0]["name"], json!("B"));
        assert!(!found[0].contains_key("secret"));

        assert_eq!(repo.count(Vec::new()).await.unwrap(), 2);
        assert_eq!(repo.store().count("things", &[]).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_secret_fields_never_leave_the_store() {
        let repo = repository().await;
        repo.create(json!({"name": "A", "price": 1, "pin": "1234", "secret": "x"}))
            .await
            .unwrap();

        let selected = repo
            .find(FindQuery::new().with_projection(Projection::include(["name", "pin", "secret"])))
            .await
            .unwrap();
        assert_eq!(selected[0]["name"], json!("A"));
        assert_eq!(selected[0]["secret"], json!("x"));
        assert!(!selected[0].contains_key("pin"));

        let err = repo
            .find(FindQuery::new().with_filter(FilterCondition::eq("pin", "1234")))
            .await
            .unwrap_err();
        assert_eq!(err.kind, RepositoryErrorKind::MalformedQuery);

        let err = repo
            .find(FindQuery::new().with_sort(vec![SortKey::ascending("pin")]))
            .await
            .unwrap_err();
        assert_eq!(err.kind, RepositoryErrorKind::MalformedQuery);
    }

    #[tokio::test]
    async fn test_find_rejects_unknown_fields_and_bad_values() {
        let repo = repository().await;
        let err = repo
            .find(FindQuery::new().with_filter(FilterCondition::eq("colour", "red")))
            .await
            .unwrap_err();
        assert_eq!(err.kind, RepositoryErrorKind::MalformedQuery);

        let err = repo
            .find(FindQuery::new().with_filter(FilterCondition::eq("price", "cheap")))
            .await
            .unwrap_err();
        assert_eq!(err.kind, RepositoryErrorKind::MalformedQuery);
    }

    #[tokio::test]
    async fn test_find_by_id() {
        let repo = repository().await;
        let created = repo.create(json!({"name": "A", "price": 1})).await.unwrap();
        let id = created[ID_FIELD].as_str().unwrap();

        let found = repo.find_by_id(id).await.unwrap();
        assert_eq!(found["name"], json!("A"));

        let missing = DocumentId::generate("thing").to_string();
        let err = repo.find_by_id(&missing).await.unwrap_err();
        assert_eq!(err.kind, RepositoryErrorKind::NotFound);

        let err = repo.find_by_id("not-an-id").await.unwrap_err();
        assert_eq!(err.kind, RepositoryErrorKind::MalformedQuery);
    }

    #[tokio::test]
    async fn test_secret_documents_are_invisible_by_id() {
        let repo = repository().await;
        let secret = repo
            .create(json!({"name": "S", "price": 1, "secretTour": true}))
            .await
            .unwrap();
        let id = secret[ID_FIELD].as_str().unwrap();
        assert_eq!(
            repo.find_by_id(id).await.unwrap_err().kind,
            RepositoryErrorKind::NotFound
        );
        assert_eq!(
            repo.delete(id).await.unwrap_err().kind,
            RepositoryErrorKind::NotFound
        );
    }

    #[tokio::test]
    async fn test_update_rederives_slug_and_bumps_version() {
        let repo = repository().await;
        let created = repo.create(json!({"name": "Old Name", "price": 1})).await.unwrap();
        let id = created[ID_FIELD].as_str().unwrap();

        let updated = repo.update(id, json!({"name": "New Name"})).await.unwrap();
        assert_eq!(updated["slug"], json!("new-name"));
        assert_eq!(updated["price"], json!(1));
        assert_eq!(updated[VERSION_FIELD], json!(1));

        let err = repo.update(id, json!({"price": "free"})).await.unwrap_err();
        assert_eq!(err.kind, RepositoryErrorKind::ValidationFailed);
        assert_eq!(err.operation, RepositoryOperation::Update);
        assert_eq!(repo.find_by_id(id).await.unwrap()[VERSION_FIELD], json!(1));
    }

    #[tokio::test]
    async fn test_update_reports_duplicates_and_hidden_documents() {
        let repo = repository().await;
        repo.create(json!({"name": "Taken", "price": 1})).await.unwrap();
        let created = repo.create(json!({"name": "Free", "price": 1})).await.unwrap();
        let id = created[ID_FIELD].as_str().unwrap();

        let err = repo.update(id, json!({"name": "Taken"})).await.unwrap_err();
        assert_eq!(err.kind, RepositoryErrorKind::AlreadyExists);
        assert_eq!(err.operation, RepositoryOperation::Update);

        let secret = repo
            .create(json!({"name": "S", "price": 1, "secretTour": true}))
            .await
            .unwrap();
        let err = repo
            .update(secret[ID_FIELD].as_str().unwrap(), json!({"price": 2}))
            .await
            .unwrap_err();
        assert_eq!(err.kind, RepositoryErrorKind::NotFound);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_patches_to_different_fields_are_both_kept() {
        let repo = repository().await;
        let created = repo.create(json!({"name": "Busy", "price": 1})).await.unwrap();
        let id = created[ID_FIELD].as_str().unwrap().to_string();

        for round in 0..200_i64 {
            let left = {
                let (repo, id) = (repo.clone(), id.clone());
                tokio::spawn(async move { repo.update(&id, json!({"price": round + 10})).await })
            };
            let right = {
                let (repo, id) = (repo.clone(), id.clone());
                tokio::spawn(async move { repo.update(&id, json!({"secret": round.to_string()})).await })
            };
            left.await.unwrap().unwrap();
            right.await.unwrap().unwrap();

            let stored = repo
                .store()
                .find("things", &FindQuery::by_id(id.clone()))
                .await
                .unwrap();
            assert_eq!(stored[0]["price"], json!(round + 10), "round {round}");
            assert_eq!(stored[0]["secret"], json!(round.to_string()), "round {round}");
        }
    }

    #[tokio::test]
    async fn test_delete() {
        let repo = repository().await;
        let created = repo.create(json!({"name": "A", "price": 1})).await.unwrap();
        let id = created[ID_FIELD].as_str().unwrap();

        repo.delete(id).await.unwrap();
        assert_eq!(
            repo.delete(id).await.unwrap_err().kind,
            RepositoryErrorKind::NotFound
        );
    }

    #[tokio::test]
    async fn test_aggregate_excludes_secret_documents() {
        let repo = repository().await;
        repo.create(json!({"name": "A", "price": 1})).await.unwrap();
        repo.create(json!({"name": "S", "price": 1, "secretTour": true}))
            .await
            .unwrap();
        let out = repo
            .aggregate(Pipeline::new().with_stage(Stage::Limit(10)))
            .await
            .unwrap();
        assert_eq!(out.len(), 1);
    }

    struct Refuse;

    impl SaveHook for Refuse {
        fn name(&self) -> &'static str {
            "refuse"
        }

        fn before_save(&self, _doc: &mut Document) -> Result<(), HookError> {
            Err(HookError::new("refuse", "read only"))
        }
    }

    #[tokio::test]
    async fn test_failing_hook_aborts_write() {
        let repo = ModelRepository::new(
            Arc::new(MemoryStore::new("test")),
            schema(),
            HookPipeline::new().with_save_hook(Refuse),
        );
        let err = repo.create(json!({"name": "A", "price": 1})).await.unwrap_err();
        assert_eq!(err.kind, RepositoryErrorKind::HookFailed);
        assert_eq!(repo.store().count("things", &[]).await.unwrap(), 0);
    }
}
