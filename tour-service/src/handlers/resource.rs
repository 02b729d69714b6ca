//! Schema-driven implementation of [`CollectionHandler`]

use serde_json::Value;

use super::error::{ApiError, ApiOperation};
use super::response::SuccessResponse;
use super::traits::CollectionHandler;
use crate::config::FeaturesConfig;
use crate::features::{QueryFeatures, QueryParams};
use crate::model::ModelRepository;
use crate::store::{DocumentStore, FindQuery};

/// Envelope keys for one collection, e.g. `tours` / `tour`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResourceKeys {
    pub list: &'static str,
    pub item: &'static str,
}

impl ResourceKeys {
    pub const fn new(list: &'static str, item: &'static str) -> Self {
        Self { list, item }
    }
}

/// List/get/create/update/delete over one [`ModelRepository`]
///
/// Everything entity specific lives in the repository's schema and hooks,
/// so the same handler serves tours and users.
#[derive(Debug)]
pub struct ResourceHandler<'a, S> {
    repository: &'a ModelRepository<S>,
    keys: ResourceKeys,
    default_limit: u64,
    reject_out_of_range_pages: bool,
}

impl<'a, S: DocumentStore> ResourceHandler<'a, S> {
    pub fn new(repository: &'a ModelRepository<S>, keys: ResourceKeys) -> Self {
        Self {
            repository,
            keys,
            default_limit: crate::features::DEFAULT_LIMIT,
            reject_out_of_range_pages: true,
        }
    }

    /// Apply the list settings from configuration
    #[must_use]
    pub fn with_features(mut self, features: &FeaturesConfig) -> Self {
        self.default_limit = features.default_page_size;
        self.reject_out_of_range_pages = features.reject_out_of_range_pages;
        self
    }
}

impl<S: DocumentStore> CollectionHandler for ResourceHandler<'_, S> {
    async fn list(&self, params: QueryParams) -> Result<SuccessResponse, ApiError> {
        let features = QueryFeatures::new(FindQuery::new(), params)
            .with_default_limit(self.default_limit)
            .apply_all()?;

        if self.reject_out_of_range_pages && features.page().is_some_and(|w| w.explicit) {
            let total = self
                .repository
                .count(features.query().filters.clone())
                .await
                .map_err(|e| ApiError::from(e).with_operation(ApiOperation::List))?;
            features.ensure_page_exists(total)?;
        }

        let docs = self
            .repository
            .find(features.into_query())
            .await
            .map_err(|e| ApiError::from(e).with_operation(ApiOperation::List))?;
        Ok(SuccessResponse::list(self.keys.list, docs))
    }

    async fn get(&self, id: &str) -> Result<SuccessResponse, ApiError> {
        let doc = self
            .repository
            .find_by_id(id)
            .await
            .map_err(|e| ApiError::from(e).with_operation(ApiOperation::Get))?;
        Ok(SuccessResponse::ok(self.keys.item, doc))
    }

    async fn create(&self, body: Value) -> Result<SuccessResponse, ApiError> {
        let doc = self.repository.create(body).await.map_err(ApiError::from)?;
        Ok(SuccessResponse::created(self.keys.item, doc))
    }

    async fn update(&self, id: &str, body: Value) -> Result<SuccessResponse, ApiError> {
        let doc = self
            .repository
            .update(id, body)
            .await
            .map_err(ApiError::from)?;
        Ok(SuccessResponse::ok(self.keys.item, doc))
    }

    async fn delete(&self, id: &str) -> Result<(), ApiError> {
        self.repository.delete(id).await.map_err(ApiError::from)
    }
}
