//! HTTP handlers for the tour and user collections
//!
//! # Overview
//!
//! - [`CollectionHandler`]: list, get, create, update and delete
//! - [`ResourceHandler`]: the implementation shared by every collection,
//!   driven by the entity's repository
//! - [`SuccessResponse`] and [`ApiError`]: the response envelopes
//!
//! The axum handler functions in [`tours`], [`users`] and [`reports`]
//! extract the request, build a [`ResourceHandler`] over the state's
//! repository and return its envelope.
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use serde_json::json;
//! use tour_service::features::QueryParams;
//! use tour_service::handlers::{CollectionHandler, ResourceHandler, ResourceKeys};
//! use tour_service::model::user_repository;
//! use tour_service::store::MemoryStore;
//!
//! # tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(async {
//! let users = user_repository(Arc::new(MemoryStore::new("natours")));
//! users.init().await.unwrap();
//!
//! let handler = ResourceHandler::new(&users, ResourceKeys::new("users", "user"));
//! handler
//!     .create(json!({
//!         "name": "Leo Gillespie",
//!         "email": "leo@example.io",
//!         "password": "pass1234",
//!         "passwordConfirm": "pass1234"
//!     }))
//!     .await
//!     .unwrap();
//!
//! let listed = handler.list(QueryParams::new()).await.unwrap();
//! assert_eq!(listed.results(), Some(1));
//! assert!(listed.data()["users"][0].get("password").is_none());
//! # });
//! ```

mod error;
mod resource;
mod response;
mod traits;

pub mod reports;
pub mod tours;
pub mod users;

pub use error::{ApiError, ApiErrorKind, ApiErrorResponse, ApiOperation};
pub use resource::{ResourceHandler, ResourceKeys};
pub use response::SuccessResponse;
pub use traits::CollectionHandler;
