//! API error types for handler operations
//!
//! Every handler failure becomes an [`ApiError`], which renders as the
//! failure envelope: `{"status": "fail", "message": ...}` for client
//! errors and `{"status": "error", "message": ...}` for server errors.
//!
//! # Example
//!
//! ```rust
//! use axum::http::StatusCode;
//! use tour_service::handlers::{ApiError, ApiErrorKind};
//!
//! let error = ApiError::not_found("Tour", "tour_01h455vb4pex5vsknk084sn02q");
//! assert!(matches!(error.kind, ApiErrorKind::NotFound));
//! assert_eq!(error.kind.status_code(), StatusCode::NOT_FOUND);
//! assert_eq!(error.kind.envelope_status(), "fail");
//! ```

use std::fmt;

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::model::{RepositoryError, RepositoryErrorKind, RepositoryOperation};
use crate::store::QueryError;

/// Operation being performed when the API error occurred
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ApiOperation {
    /// Listing entities
    List,
    /// Getting a single entity by ID
    Get,
    /// Creating a new entity
    Create,
    /// Updating an existing entity
    Update,
    /// Deleting an entity
    Delete,
    /// Running a read-only report
    Report,
}

impl fmt::Display for ApiOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::List => write!(f, "list"),
            Self::Get => write!(f, "get"),
            Self::Create => write!(f, "create"),
            Self::Update => write!(f, "update"),
            Self::Delete => write!(f, "delete"),
            Self::Report => write!(f, "report"),
        }
    }
}

/// Category of API error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ApiErrorKind {
    /// Entity (or requested page) was not found
    NotFound,
    /// A unique field clashed with an existing entity
    AlreadyExists,
    /// Request body failed validation
    ValidationFailed,
    /// Invalid request format or parameters
    BadRequest,
    /// Internal server error
    InternalError,
}

impl fmt::Display for ApiErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound => write!(f, "not_found"),
            Self::AlreadyExists => write!(f, "already_exists"),
            Self::ValidationFailed => write!(f, "validation_failed"),
            Self::BadRequest => write!(f, "bad_request"),
            Self::InternalError => write!(f, "internal_error"),
        }
    }
}

impl ApiErrorKind {
    /// Get the HTTP status code for this error kind
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::AlreadyExists | Self::ValidationFailed | Self::BadRequest => {
                StatusCode::BAD_REQUEST
            }
            Self::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// `status` value of the failure envelope
    #[must_use]
    pub fn envelope_status(&self) -> &'static str {
        if self.status_code().is_server_error() {
            "error"
        } else {
            "fail"
        }
    }

    /// Get the error code string for this error kind
    #[must_use]
    pub fn error_code(&self) -> String {
        self.to_string().to_uppercase()
    }
}

/// Structured API error with operation context
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    /// The operation being performed when the error occurred
    pub operation: ApiOperation,
    /// The category of error
    pub kind: ApiErrorKind,
    /// Human-readable error message, returned to the caller
    pub message: String,
    /// The type of entity involved (e.g., "Tour", "User")
    pub entity_type: Option<String>,
    /// The ID of the entity involved
    pub entity_id: Option<String>,
}

impl ApiError {
    pub fn new(operation: ApiOperation, kind: ApiErrorKind, message: impl Into<String>) -> Self {
        Self {
            operation,
            kind,
            message: message.into(),
            entity_type: None,
            entity_id: None,
        }
    }

    /// Create a "not found" error with entity context
    pub fn not_found(entity_type: impl Into<String>, entity_id: impl Into<String>) -> Self {
        Self::new(
            ApiOperation::Get,
            ApiErrorKind::NotFound,
            "No document found with that ID",
        )
        .with_entity(entity_type, entity_id)
    }

    /// Create a bad request error
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(ApiOperation::List, ApiErrorKind::BadRequest, message)
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ApiOperation::Get, ApiErrorKind::InternalError, message)
    }

    /// Add entity context to an existing error
    #[must_use]
    pub fn with_entity(
        mut self,
        entity_type: impl Into<String>,
        entity_id: impl Into<String>,
    ) -> Self {
        self.entity_type = Some(entity_type.into());
        self.entity_id = Some(entity_id.into());
        self
    }

    /// Set the operation that caused the error
    #[must_use]
    pub fn with_operation(mut self, operation: ApiOperation) -> Self {
        self.operation = operation;
        self
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "API {} error during {}: {}",
            self.kind, self.operation, self.message
        )?;
        if let (Some(entity_type), Some(entity_id)) = (&self.entity_type, &self.entity_id) {
            write!(f, " [{entity_type}: {entity_id}]")?;
        }
        Ok(())
    }
}

impl std::error::Error for ApiError {}

/// Failure envelope
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiErrorResponse {
    pub status: String,
    pub message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.kind.status_code();

        if status.is_server_error() {
            tracing::error!(
                operation = %self.operation,
                kind = %self.kind,
                entity_type = ?self.entity_type,
                entity_id = ?self.entity_id,
                "API error: {}", self.message
            );
        } else {
            tracing::warn!(
                operation = %self.operation,
                kind = %self.kind,
                entity_type = ?self.entity_type,
                entity_id = ?self.entity_id,
                "API error: {}", self.message
            );
        }

        let response = ApiErrorResponse {
            status: self.kind.envelope_status().to_string(),
            message: self.message,
        };

        (status, Json(response)).into_response()
    }
}

fn repository_operation_to_api_operation(op: RepositoryOperation) -> ApiOperation {
    match op {
        RepositoryOperation::FindById => ApiOperation::Get,
        RepositoryOperation::FindAll | RepositoryOperation::Count => ApiOperation::List,
        RepositoryOperation::Create => ApiOperation::Create,
        RepositoryOperation::Update => ApiOperation::Update,
        RepositoryOperation::Delete => ApiOperation::Delete,
        RepositoryOperation::Aggregate => ApiOperation::Report,
    }
}

impl From<RepositoryError> for ApiError {
    fn from(err: RepositoryError) -> Self {
        let operation = repository_operation_to_api_operation(err.operation);

        let kind = match err.kind {
            RepositoryErrorKind::NotFound => ApiErrorKind::NotFound,
            RepositoryErrorKind::AlreadyExists => ApiErrorKind::AlreadyExists,
            RepositoryErrorKind::ValidationFailed => ApiErrorKind::ValidationFailed,
            RepositoryErrorKind::MalformedQuery | RepositoryErrorKind::HookFailed => {
                ApiErrorKind::BadRequest
            }
            RepositoryErrorKind::DatabaseError => ApiErrorKind::InternalError,
        };

        // Internal details stay in the logs
        let message = match kind {
            ApiErrorKind::InternalError => {
                tracing::error!(error = %err, "repository failure");
                "Something went wrong".to_string()
            }
            _ => err.message,
        };

        Self {
            operation,
            kind,
            message,
            entity_type: err.entity_type,
            entity_id: err.entity_id,
        }
    }
}

impl From<QueryError> for ApiError {
    fn from(err: QueryError) -> Self {
        let kind = match err {
            QueryError::PageNotFound { .. } => ApiErrorKind::NotFound,
            _ => ApiErrorKind::BadRequest,
        };
        Self::new(ApiOperation::List, kind, err.to_string())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::new(
            ApiOperation::Create,
            ApiErrorKind::BadRequest,
            format!("Invalid request body: {}", rejection.body_text()),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    #[test]
    fn test_api_error_kind_status_codes() {
        assert_eq!(ApiErrorKind::NotFound.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(ApiErrorKind::AlreadyExists.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiErrorKind::ValidationFailed.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiErrorKind::BadRequest.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(
            ApiErrorKind::InternalError.status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_envelope_status() {
        assert_eq!(ApiErrorKind::NotFound.envelope_status(), "fail");
        assert_eq!(ApiErrorKind::ValidationFailed.envelope_status(), "fail");
        assert_eq!(ApiErrorKind::InternalError.envelope_status(), "error");
        assert_eq!(ApiErrorKind::BadRequest.error_code(), "BAD_REQUEST");
    }

    #[test]
    fn test_from_repository_error_keeps_client_messages() {
        let repo_error = RepositoryError::validation_failed("Tour validation failed: price: A tour must have a price")
            .with_operation(RepositoryOperation::Update);
        let api_error = ApiError::from(repo_error);
        assert_eq!(api_error.kind, ApiErrorKind::ValidationFailed);
        assert_eq!(api_error.operation, ApiOperation::Update);
        assert!(api_error.message.contains("A tour must have a price"));
    }

    #[test]
    fn test_from_repository_error_hides_internal_details() {
        let repo_error = RepositoryError::database_error(RepositoryOperation::Aggregate, "engine exploded");
        let api_error = ApiError::from(repo_error);
        assert_eq!(api_error.kind, ApiErrorKind::InternalError);
        assert_eq!(api_error.operation, ApiOperation::Report);
        assert_eq!(api_error.message, "Something went wrong");
    }

    #[test]
    fn test_from_query_error() {
        let page = ApiError::from(QueryError::PageNotFound { page: 9 });
        assert_eq!(page.kind, ApiErrorKind::NotFound);
        assert_eq!(page.message, "This page does not exist");

        let mixed = ApiError::from(QueryError::MixedProjection("name,-price".into()));
        assert_eq!(mixed.kind, ApiErrorKind::BadRequest);
    }

    #[tokio::test]
    async fn test_into_response_envelope() {
        let response = ApiError::not_found("Tour", "tour_x").into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"status": "fail", "message": "No document found with that ID"})
        );
    }
}
