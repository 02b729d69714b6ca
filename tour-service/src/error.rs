//! Service-level error types
//!
//! Request-path failures are modelled in [`crate::model`] and
//! [`crate::handlers`]. This type covers startup: loading configuration,
//! connecting the store and importing seed data.

use thiserror::Error;

use crate::model::RepositoryError;
use crate::store::StoreError;

/// Result type alias using our custom Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while bringing the service up
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(Box<figment::Error>),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The document store could not be opened
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// A model operation failed outside a request
    #[error("{0}")]
    Repository(#[from] RepositoryError),

    /// Seed data could not be read or imported
    #[error("Seed error: {0}")]
    Seed(String),

    /// Internal server error
    #[error("Internal error: {0}")]
    Internal(String),
}

// Boxed to keep the enum small
impl From<figment::Error> for Error {
    fn from(err: figment::Error) -> Self {
        Error::Config(Box::new(err))
    }
}
