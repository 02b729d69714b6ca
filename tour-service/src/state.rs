//! Application state shared by every handler

use std::sync::Arc;

use crate::{
    config::Config,
    error::Result,
    model::{tour_repository, user_repository, TourRepository, UserRepository},
    store::MemoryStore,
};

/// Shared application state
///
/// Cloning is cheap: every field is reference counted.
#[derive(Debug, Clone)]
pub struct AppState {
    config: Arc<Config>,
    store: Arc<MemoryStore>,
    tours: TourRepository<MemoryStore>,
    users: UserRepository<MemoryStore>,
}

impl AppState {
    /// Wire repositories over an already opened store
    ///
    /// Unique indexes are not declared here; see [`AppState::initialize`].
    pub fn new(config: Config, store: Arc<MemoryStore>) -> Self {
        Self {
            config: Arc::new(config),
            tours: tour_repository(store.clone()),
            users: user_repository(store.clone()),
            store,
        }
    }

    /// Open the configured store and declare every unique index
    pub async fn initialize(config: Config) -> Result<Self> {
        let store = MemoryStore::connect(&config.database.connection_string())?;
        tracing::info!(
            database = %config.database.name,
            store = %store.name(),
            "Document store connected"
        );

        let state = Self::new(config, Arc::new(store));
        state.tours.init().await?;
        state.users.init().await?;
        Ok(state)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn store(&self) -> &Arc<MemoryStore> {
        &self.store
    }

    pub fn tours(&self) -> &TourRepository<MemoryStore> {
        &self.tours
    }

    pub fn users(&self) -> &UserRepository<MemoryStore> {
        &self.users
    }
}
