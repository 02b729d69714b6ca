//! `/api/v1/tours` endpoints

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde_json::Value;

use super::error::ApiError;
use super::resource::{ResourceHandler, ResourceKeys};
use super::traits::CollectionHandler;
use crate::state::AppState;
use crate::store::MemoryStore;

pub const TOUR_KEYS: ResourceKeys = ResourceKeys::new("tours", "tour");

fn handler(state: &AppState) -> ResourceHandler<'_, MemoryStore> {
    ResourceHandler::new(state.tours(), TOUR_KEYS).with_features(&state.config().features)
}

/// GET /tours
pub async fn list_tours(
    State(state): State<AppState>,
    Query(params): Query<Vec<(String, String)>>,
) -> Result<impl IntoResponse, ApiError> {
    handler(&state).list(params.into()).await
}

/// GET /tours/{id}
pub async fn get_tour(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    handler(&state).get(&id).await
}

/// POST /tours
pub async fn create_tour(
    State(state): State<AppState>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(body) = body?;
    handler(&state).create(body).await
}

/// PATCH /tours/{id}
pub async fn update_tour(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(body) = body?;
    handler(&state).update(&id, body).await
}

/// DELETE /tours/{id}
pub async fn delete_tour(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    handler(&state).delete(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}
