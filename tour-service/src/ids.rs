//! Type-safe identifiers using the TypeID specification
//!
//! Both request IDs and document IDs are prefixed TypeIDs backed by
//! UUIDv7, so they sort by creation time and say what they identify:
//!
//! ```rust
//! use tour_service::ids::{DocumentId, RequestId};
//!
//! let request_id = RequestId::new();
//! assert!(request_id.as_str().starts_with("req_"));
//!
//! let tour_id = DocumentId::generate("tour");
//! assert_eq!(tour_id.prefix(), "tour");
//! assert!(DocumentId::parse("tour", tour_id.as_str()).is_ok());
//! assert!(DocumentId::parse("user", tour_id.as_str()).is_err());
//! ```

use http::Request;
use mti::prelude::*;
use std::fmt;
use std::str::FromStr;
use tower_http::request_id::{MakeRequestId, RequestId as TowerRequestId};

/// Request identifier, propagated in the `x-request-id` header
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RequestId(MagicTypeId);

impl RequestId {
    pub const PREFIX: &'static str = "req";

    #[must_use]
    pub fn new() -> Self {
        Self(Self::PREFIX.create_type_id::<V7>())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    #[must_use]
    pub fn prefix(&self) -> &str {
        self.0.prefix().as_str()
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for RequestId {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_prefixed(Self::PREFIX, s).map(Self)
    }
}

/// Identifier of a stored document, prefixed with its entity kind
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DocumentId(MagicTypeId);

impl DocumentId {
    /// Generate a fresh, time-ordered identifier
    #[must_use]
    pub fn generate(prefix: &str) -> Self {
        Self(prefix.create_type_id::<V7>())
    }

    /// Parse an identifier, requiring the given prefix
    pub fn parse(prefix: &str, s: &str) -> Result<Self, IdError> {
        parse_prefixed(prefix, s).map(Self)
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    #[must_use]
    pub fn prefix(&self) -> &str {
        self.0.prefix().as_str()
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<DocumentId> for String {
    fn from(id: DocumentId) -> Self {
        id.0.to_string()
    }
}

fn parse_prefixed(expected: &str, s: &str) -> Result<MagicTypeId, IdError> {
    let mti = MagicTypeId::from_str(s).map_err(IdError::Parse)?;

    if mti.prefix().as_str() != expected {
        return Err(IdError::InvalidPrefix {
            expected: expected.to_string(),
            actual: mti.prefix().as_str().to_string(),
        });
    }

    Ok(mti)
}

#[derive(Debug, thiserror::Error)]
pub enum IdError {
    #[error("failed to parse ID: {0}")]
    Parse(#[from] MagicTypeIdError),

    #[error("invalid prefix: expected '{expected}', got '{actual}'")]
    InvalidPrefix { expected: String, actual: String },
}

/// Generates `req_` TypeIDs for the request-id middleware
#[derive(Debug, Clone, Copy, Default)]
pub struct MakeTypedRequestId;

impl MakeRequestId for MakeTypedRequestId {
    fn make_request_id<B>(&mut self, _request: &Request<B>) -> Option<TowerRequestId> {
        let id = RequestId::new();
        let header_value = http::HeaderValue::from_str(id.as_str()).ok()?;
        Some(TowerRequestId::new(header_value))
    }
}
