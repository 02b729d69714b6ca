//! Handler trait for the REST collection pattern

use std::future::Future;

use serde_json::Value;

use super::error::ApiError;
use super::response::SuccessResponse;
use crate::features::QueryParams;

/// The five operations every exposed collection answers
///
/// Bodies are raw JSON: casting and validation belong to the entity's
/// schema, not to the HTTP layer.
pub trait CollectionHandler: Send + Sync {
    /// List documents shaped by query-string features
    fn list(
        &self,
        params: QueryParams,
    ) -> impl Future<Output = Result<SuccessResponse, ApiError>> + Send;

    fn get(&self, id: &str) -> impl Future<Output = Result<SuccessResponse, ApiError>> + Send;

    /// Responds `201 Created`
    fn create(&self, body: Value)
        -> impl Future<Output = Result<SuccessResponse, ApiError>> + Send;

    /// Merge a partial body into the stored document
    fn update(
        &self,
        id: &str,
        body: Value,
    ) -> impl Future<Output = Result<SuccessResponse, ApiError>> + Send;

    fn delete(&self, id: &str) -> impl Future<Output = Result<(), ApiError>> + Send;
}
