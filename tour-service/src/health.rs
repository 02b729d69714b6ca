//! Health check handlers

use std::collections::HashMap;

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde::{Deserialize, Serialize};

use crate::{state::AppState, store::DocumentStore};

/// Health check response
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Service status
    pub status: String,

    /// Service name
    pub service: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

/// Readiness check response with dependency status
#[derive(Debug, Serialize, Deserialize)]
pub struct ReadinessResponse {
    pub ready: bool,

    pub service: String,

    pub dependencies: HashMap<String, DependencyStatus>,
}

/// Individual dependency status
#[derive(Debug, Serialize, Deserialize)]
pub struct DependencyStatus {
    pub healthy: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Liveness probe: 200 while the process is serving
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let response = HealthResponse {
        status: "healthy".to_string(),
        service: state.config().service.name.clone(),
        version: Some(env!("CARGO_PKG_VERSION").to_string()),
    };

    (StatusCode::OK, Json(response))
}

/// Readiness probe: 503 when the document store does not answer
pub async fn readiness(State(state): State<AppState>) -> impl IntoResponse {
    let mut dependencies = HashMap::new();

    let store_status = match state.store().ping().await {
        Ok(()) => DependencyStatus {
            healthy: true,
            message: Some(format!(
                "Connected to {} ({} collections)",
                state.store().name(),
                state.store().collection_count()
            )),
        },
        Err(e) => {
            tracing::error!("Document store health check failed: {}", e);
            DependencyStatus {
                healthy: false,
                message: Some(format!("Ping failed: {}", e)),
            }
        }
    };
    let ready = store_status.healthy;
    dependencies.insert("store".to_string(), store_status);

    let response = ReadinessResponse {
        ready,
        service: state.config().service.name.clone(),
        dependencies,
    };

    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status, Json(response))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use axum::body::to_bytes;

    #[tokio::test]
    async fn test_readiness_reports_store() {
        let state = AppState::initialize(Config::default()).await.unwrap();
        let response = readiness(State(state)).await.into_response();
        assert_eq!(response.status(), StatusCode::OK);

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let readiness: ReadinessResponse = serde_json::from_slice(&body).unwrap();
        assert!(readiness.ready);
        assert!(readiness.dependencies["store"].healthy);
    }

    #[tokio::test]
    async fn test_health_names_service() {
        let state = AppState::initialize(Config::default()).await.unwrap();
        let response = health(State(state)).await.into_response();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let health: HealthResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(health.status, "healthy");
        assert_eq!(health.service, "tour-service");
    }
}
