//! Store and query error types

use thiserror::Error;

/// Failure raised by a document store engine
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// A unique index rejected the write
    #[error("duplicate key on {collection}.{field}: {value}")]
    DuplicateKey {
        collection: String,
        field: String,
        value: String,
    },

    /// The addressed document does not exist
    #[error("document {id} not found in {collection}")]
    NotFound { collection: String, id: String },

    /// The connection string names an engine this build does not ship
    #[error("unsupported connection string: {0}")]
    UnsupportedScheme(String),
}

/// Shorthand result type for store operations
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// A query that cannot be executed as written
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryError {
    /// A raw parameter could not be cast to the field's declared type
    #[error("Invalid {field}: cannot cast \"{value}\" to {expected}")]
    Cast {
        field: String,
        value: String,
        expected: &'static str,
    },

    /// The field is not declared on the entity
    #[error("Unknown field in query: {0}")]
    UnknownField(String),

    /// Field selection mixes inclusion and exclusion
    #[error("Cannot mix field inclusion and exclusion in projection: {0}")]
    MixedProjection(String),

    /// An identifier is not well-formed
    #[error("Invalid _id: {0}")]
    InvalidId(String),

    /// An explicitly requested page starts past the last matching document
    #[error("This page does not exist")]
    PageNotFound { page: u64 },
}
