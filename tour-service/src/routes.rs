//! Route table

use axum::{
    http::Uri,
    routing::get,
    Router,
};

use crate::{
    handlers::{reports, tours, users, ApiError, ApiErrorKind, ApiOperation},
    health,
    state::AppState,
};

pub const API_PREFIX: &str = "/api/v1";

/// Versioned resource routes
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/tours", get(tours::list_tours).post(tours::create_tour))
        .route("/tours/tour-stats", get(reports::tour_stats))
        .route("/tours/monthly-plan/{year}", get(reports::monthly_plan))
        .route(
            "/tours/{id}",
            get(tours::get_tour)
                .patch(tours::update_tour)
                .delete(tours::delete_tour),
        )
        .route("/users", get(users::list_users).post(users::create_user))
        .route(
            "/users/{id}",
            get(users::get_user)
                .patch(users::update_user)
                .delete(users::delete_user),
        )
}

/// Full application router with health endpoints
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health))
        .route("/ready", get(health::readiness))
        .nest(API_PREFIX, api_routes())
        .fallback(not_found)
        .with_state(state)
}

async fn not_found(uri: Uri) -> ApiError {
    ApiError::new(
        ApiOperation::Get,
        ApiErrorKind::NotFound,
        format!("Can't find {} on this server!", uri.path()),
    )
}
