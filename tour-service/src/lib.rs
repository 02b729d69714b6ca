//! # tour-service
//!
//! REST API for a tour catalogue and its users, backed by a document store.
//!
//! ## Features
//!
//! - **Query features**: filtering (`price[lt]=1000`), sorting, field
//!   selection and pagination straight from the query string
//! - **Schemas**: per-entity field registries that cast, default and
//!   validate documents
//! - **Hooks**: slug derivation on save, secret tours hidden from finds and
//!   aggregations, query timing
//! - **Reports**: difficulty statistics and a monthly start-date plan
//! - **Service surface**: health and readiness probes, request ids,
//!   graceful shutdown
//!
//! ## Example
//!
//! ```rust,no_run
//! use tour_service::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let config = Config::load()?;
//!     init_tracing(&config)?;
//!
//!     let state = AppState::initialize(config.clone()).await?;
//!     let app = build_router(state);
//!
//!     Server::new(config).serve(app).await
//! }
//! ```

pub mod config;
pub mod error;
pub mod features;
pub mod handlers;
pub mod health;
pub mod ids;
pub mod middleware;
pub mod model;
pub mod observability;
pub mod routes;
pub mod seed;
pub mod server;
pub mod state;
pub mod store;

pub mod prelude {
    pub use crate::config::{Config, DatabaseConfig, FeaturesConfig, MiddlewareConfig};
    pub use crate::error::{Error, Result};
    pub use crate::features::{QueryFeatures, QueryParams};
    pub use crate::handlers::{
        ApiError, ApiErrorKind, CollectionHandler, ResourceHandler, ResourceKeys, SuccessResponse,
    };
    pub use crate::health::{health, readiness};
    pub use crate::ids::{DocumentId, MakeTypedRequestId, RequestId};
    pub use crate::model::{
        tour_repository, user_repository, ModelRepository, RepositoryError, Schema,
        TourRepository, UserRepository,
    };
    pub use crate::observability::init_tracing;
    pub use crate::routes::{api_routes, build_router};
    pub use crate::server::Server;
    pub use crate::state::AppState;
    pub use crate::store::{DocumentStore, FindQuery, MemoryStore};

    pub use axum::{
        extract::{Path, Query, State},
        routing::{delete, get, patch, post},
        Json, Router,
    };
}
