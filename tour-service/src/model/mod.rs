//! Entities, their field registries, and the hooks around persistence
//!
//! # Overview
//!
//! - [`Schema`] / [`FieldDef`]: declared fields, casting and validation
//! - [`HookPipeline`]: save, find and aggregate interceptors
//! - [`ModelRepository`]: the schema- and hook-aware path to the store
//! - [`tour`] and [`user`]: the two entities this service exposes
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use serde_json::json;
//! use tour_service::model::tour_repository;
//! use tour_service::store::MemoryStore;
//!
//! # tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(async {
//! let tours = tour_repository(Arc::new(MemoryStore::new("natours")));
//! tours.init().await.unwrap();
//!
//! let tour = tours
//!     .create(json!({
//!         "name": "The Sea Explorer",
//!         "duration": 7,
//!         "maxGroupSize": 15,
//!         "difficulty": "medium",
//!         "price": 497,
//!         "summary": "Exploring the jaw-dropping US east coast by foot and by boat",
//!         "imageCover": "tour-2-cover.jpg"
//!     }))
//!     .await
//!     .unwrap();
//! assert_eq!(tour["slug"], json!("the-sea-explorer"));
//! # });
//! ```

mod error;
mod hooks;
mod repository;
mod schema;
mod slug;
pub mod tour;
pub mod user;

pub use error::{RepositoryError, RepositoryErrorKind, RepositoryOperation, RepositoryResult};
pub use hooks::{
    AggregateHook, HookError, HookPipeline, QueryHook, QueryTimer, SaveHook, SecretTourFilter,
    SlugHook,
};
pub use repository::ModelRepository;
pub use schema::{FieldDef, FieldError, FieldType, Schema, ValidationError, Virtual};
pub use slug::slugify;
pub use tour::{tour_repository, tour_schema, DifficultyStats, MonthlyPlan, TourRepository};
pub use user::{user_repository, user_schema, UserRepository};
