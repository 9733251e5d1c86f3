//! Shared application state assembled from [`EngineConfig`].

use std::sync::Arc;

use crate::config::EngineConfig;
use crate::domain::{AchievementCatalog, NotificationBus};
use crate::error::GamificationError;
use crate::persistence::{
    GamificationStore, MemoryStore, PostgresStats, PostgresStore, StatsProvider, postgres,
};
use crate::service::GamificationService;

/// Everything the engine needs at runtime.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Gamification service for all business logic.
    pub gamification: Arc<GamificationService>,
    /// Notification bus for subscribers.
    pub notifications: NotificationBus,
    /// Store the service writes to.
    pub store: Arc<dyn GamificationStore>,
}

impl AppState {
    /// Loads the catalog, opens the store and seeds the catalog into it.
    ///
    /// # Errors
    ///
    /// Returns [`GamificationError::InvalidCatalog`] if the configured
    /// catalog file is unreadable or invalid, and
    /// [`GamificationError::Store`] if the database cannot be reached.
    pub async fn build(config: &EngineConfig) -> Result<Self, GamificationError> {
        let catalog = match &config.achievement_catalog_path {
            Some(path) => AchievementCatalog::from_json_file(path)?,
            None => AchievementCatalog::builtin(),
        };
        let catalog = Arc::new(catalog);

        let (store, stats): (Arc<dyn GamificationStore>, Arc<dyn StatsProvider>) =
            if config.persistence_enabled {
                let pool = postgres::connect(config).await?;
                tracing::info!("using postgres store");
                (
                    Arc::new(PostgresStore::new(pool.clone())),
                    Arc::new(PostgresStats::new(pool)),
                )
            } else {
                tracing::info!("using in-memory store");
                let memory = Arc::new(MemoryStore::new());
                (Arc::clone(&memory) as _, memory as _)
            };

        let seeded = store.seed_catalog(&catalog).await?;
        tracing::info!(
            achievements = catalog.len(),
            seeded,
            "achievement catalog loaded"
        );

        let notifications = NotificationBus::new(config.notification_bus_capacity);
        let gamification = GamificationService::new(
            Arc::clone(&store),
            stats,
            catalog,
            notifications.clone(),
        )
        .with_engagement_flush_every(config.engagement_flush_every);

        Ok(Self {
            gamification: Arc::new(gamification),
            notifications,
            store,
        })
    }
}
