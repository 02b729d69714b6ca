//! Repository error types
//!
//! Every model operation fails with a [`RepositoryError`] naming the
//! operation, a coarse kind, and (when known) the entity involved.
//!
//! # Example
//!
//! ```rust
//! use tour_service::model::{RepositoryError, RepositoryErrorKind};
//!
//! let error = RepositoryError::not_found("Tour", "tour_01h455vb4pex5vsknk084sn02q");
//! assert!(matches!(error.kind, RepositoryErrorKind::NotFound));
//! assert!(error.entity_id.is_some());
//! ```

use std::fmt;

use crate::store::{QueryError, StoreError};

use super::hooks::HookError;
use super::schema::ValidationError;

/// Operation being performed when the repository error occurred
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RepositoryOperation {
    /// Finding a single entity by ID
    FindById,
    /// Finding multiple entities with filters
    FindAll,
    /// Counting entities matching filters
    Count,
    /// Creating a new entity
    Create,
    /// Updating an existing entity
    Update,
    /// Deleting an entity
    Delete,
    /// Running an aggregation pipeline
    Aggregate,
}

impl fmt::Display for RepositoryOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FindById => write!(f, "find_by_id"),
            Self::FindAll => write!(f, "find_all"),
            Self::Count => write!(f, "count"),
            Self::Create => write!(f, "create"),
            Self::Update => write!(f, "update"),
            Self::Delete => write!(f, "delete"),
            Self::Aggregate => write!(f, "aggregate"),
        }
    }
}

/// Category of repository error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RepositoryErrorKind {
    /// Entity was not found
    NotFound,
    /// A unique field clashed with an existing entity
    AlreadyExists,
    /// Schema validation rejected the document
    ValidationFailed,
    /// Query parameters could not be turned into a query
    MalformedQuery,
    /// A model hook aborted the operation
    HookFailed,
    /// Underlying store error
    DatabaseError,
}

impl fmt::Display for RepositoryErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound => write!(f, "not_found"),
            Self::AlreadyExists => write!(f, "already_exists"),
            Self::ValidationFailed => write!(f, "validation_failed"),
            Self::MalformedQuery => write!(f, "malformed_query"),
            Self::HookFailed => write!(f, "hook_failed"),
            Self::DatabaseError => write!(f, "database_error"),
        }
    }
}

/// Structured repository error with operation context
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryError {
    /// The operation being performed when the error occurred
    pub operation: RepositoryOperation,
    /// The category of error
    pub kind: RepositoryErrorKind,
    /// Human-readable error message
    pub message: String,
    /// The type of entity involved (e.g., "Tour", "User")
    pub entity_type: Option<String>,
    /// The ID of the entity involved
    pub entity_id: Option<String>,
}

impl RepositoryError {
    /// Create a new repository error
    pub fn new(
        operation: RepositoryOperation,
        kind: RepositoryErrorKind,
        message: impl Into<String>,
    ) -> Self {
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
            RepositoryOperation::FindById,
            RepositoryErrorKind::NotFound,
            "No document found with that ID",
        )
        .with_entity(entity_type, entity_id)
    }

    /// Create an "already exists" error for a unique-field clash
    ///
    /// ```rust
    /// use tour_service::model::RepositoryError;
    ///
    /// let error = RepositoryError::already_exists("Tour", "\"The Forest Hiker\"");
    /// assert_eq!(
    ///     error.message,
    ///     "Duplicate field value: \"The Forest Hiker\". Please use another value!"
    /// );
    /// ```
    pub fn already_exists(entity_type: impl Into<String>, value: impl Into<String>) -> Self {
        let value = value.into();
        Self::new(
            RepositoryOperation::Create,
            RepositoryErrorKind::AlreadyExists,
            format!("Duplicate field value: {value}. Please use another value!"),
        )
        .with_entity(entity_type, value)
    }

    /// Create a validation failed error
    pub fn validation_failed(message: impl Into<String>) -> Self {
        Self::new(
            RepositoryOperation::Create,
            RepositoryErrorKind::ValidationFailed,
            message,
        )
    }

    /// Create a malformed query error
    pub fn malformed_query(operation: RepositoryOperation, message: impl Into<String>) -> Self {
        Self::new(operation, RepositoryErrorKind::MalformedQuery, message)
    }

    /// Create a database error
    pub fn database_error(operation: RepositoryOperation, message: impl Into<String>) -> Self {
        Self::new(operation, RepositoryErrorKind::DatabaseError, message)
    }

    /// Translate an engine failure raised during `operation`
    pub fn from_store(operation: RepositoryOperation, entity_type: &str, error: StoreError) -> Self {
        match error {
            StoreError::DuplicateKey { value, .. } => {
                Self::already_exists(entity_type, value).with_operation(operation)
            }
            StoreError::NotFound { id, .. } => {
                Self::not_found(entity_type, id).with_operation(operation)
            }
            other @ StoreError::UnsupportedScheme(_) => {
                Self::database_error(operation, other.to_string())
            }
        }
    }

    /// Translate a query that could not be built
    pub fn from_query(operation: RepositoryOperation, error: &QueryError) -> Self {
        Self::malformed_query(operation, error.to_string())
    }

    /// Translate a schema validation failure
    pub fn from_validation(operation: RepositoryOperation, error: &ValidationError) -> Self {
        Self::validation_failed(error.to_string()).with_operation(operation)
    }

    /// Translate an aborted hook
    pub fn from_hook(operation: RepositoryOperation, error: &HookError) -> Self {
        Self::new(operation, RepositoryErrorKind::HookFailed, error.to_string())
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
    pub fn with_operation(mut self, operation: RepositoryOperation) -> Self {
        self.operation = operation;
        self
    }
}

impl fmt::Display for RepositoryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Repository {} error during {}: {}",
            self.kind, self.operation, self.message
        )?;
        if let (Some(entity_type), Some(entity_id)) = (&self.entity_type, &self.entity_id) {
            write!(f, " [{entity_type}: {entity_id}]")?;
        }
        Ok(())
    }
}

impl std::error::Error for RepositoryError {}

/// Shorthand result type for model operations
pub type RepositoryResult<T> = std::result::Result<T, RepositoryError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repository_operation_display() {
        assert_eq!(RepositoryOperation::FindById.to_string(), "find_by_id");
        assert_eq!(RepositoryOperation::FindAll.to_string(), "find_all");
        assert_eq!(RepositoryOperation::Aggregate.to_string(), "aggregate");
    }

    #[test]
    fn test_repository_error_kind_display() {
        assert_eq!(RepositoryErrorKind::MalformedQuery.to_string(), "malformed_query");
        assert_eq!(RepositoryErrorKind::HookFailed.to_string(), "hook_failed");
        assert_eq!(RepositoryErrorKind::AlreadyExists.to_string(), "already_exists");
    }

    #[test]
    fn test_display_with_entity() {
        let error = RepositoryError::not_found("Tour", "tour_123");
        assert_eq!(
            error.to_string(),
            "Repository not_found error during find_by_id: No document found with that ID [Tour: tour_123]"
        );
    }

    #[test]
    fn test_from_store_duplicate_key() {
        let error = RepositoryError::from_store(
            RepositoryOperation::Update,
            "Tour",
            StoreError::DuplicateKey {
                collection: "tours".into(),
                field: "name".into(),
                value: "\"The Sea Explorer\"".into(),
            },
        );
        assert_eq!(error.kind, RepositoryErrorKind::AlreadyExists);
        assert_eq!(error.operation, RepositoryOperation::Update);
    }

    #[test]
    fn test_from_store_unsupported_scheme_is_database_error() {
        let error = RepositoryError::from_store(
            RepositoryOperation::FindAll,
            "Tour",
            StoreError::UnsupportedScheme("mongodb://x".into()),
        );
        assert_eq!(error.kind, RepositoryErrorKind::DatabaseError);
        assert_eq!(error.message, "unsupported connection string: mongodb://x");
    }

    #[test]
    fn test_from_query() {
        let error = RepositoryError::from_query(
            RepositoryOperation::FindAll,
            &QueryError::UnknownField("nope".into()),
        );
        assert_eq!(error.kind, RepositoryErrorKind::MalformedQuery);
        assert_eq!(error.message, "Unknown field in query: nope");
    }
}
