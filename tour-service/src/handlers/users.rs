//! `/api/v1/users` endpoints

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

pub const USER_KEYS: ResourceKeys = ResourceKeys::new("users", "user");

fn handler(state: &AppState) -> ResourceHandler<'_, MemoryStore> {
    ResourceHandler::new(state.users(), USER_KEYS).with_features(&state.config().features)
}

/// GET /users
pub async fn list_users(
    State(state): State<AppState>,
    Query(params): Query<Vec<(String, String)>>,
) -> Result<impl IntoResponse, ApiError> {
    handler(&state).list(params.into()).await
}

/// GET /users/{id}
pub async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    handler(&state).get(&id).await
}

/// POST /users
pub async fn create_user(
    State(state): State<AppState>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(body) = body?;
    handler(&state).create(body).await
}

/// PATCH /users/{id}
pub async fn update_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(body) = body?;
    handler(&state).update(&id, body).await
}

/// DELETE /users/{id}
pub async fn delete_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    handler(&state).delete(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}
