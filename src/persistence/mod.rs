//! Persistence layer: store and statistics seams.
//!
//! [`GamificationStore`] owns the engine's per-user records. The concrete
//! implementations are [`MemoryStore`] (tests, single-process demos) and
//! [`PostgresStore`] over `sqlx::PgPool`. [`StatsProvider`] is the
//! read-only window onto the host application's own tables.

#[cfg(test)]
pub(crate) mod failing;
pub mod memory;
pub mod models;
pub mod postgres;

use std::collections::HashSet;

use async_trait::async_trait;

use crate::domain::{
    AchievementCatalog, ActivityCounts, Notification, Streak, StreakType, UserAchievement,
    UserId, UserLevel, XpEvent,
};
use crate::error::GamificationError;

pub use memory::MemoryStore;
pub use models::{EngagementCounters, NotificationRecord};
pub use postgres::{PostgresStats, PostgresStore};

/// Durable storage for streaks, levels, unlocks and bookkeeping.
///
/// Each method is a single read or a single write; callers do the
/// read-modify-write themselves. Every method returns
/// [`GamificationError::Store`] on backend failure.
#[async_trait]
pub trait GamificationStore: Send + Sync + std::fmt::Debug {
    /// Loads the streak for `(user_id, streak_type)`.
    async fn load_streak(
        &self,
        user_id: UserId,
        streak_type: StreakType,
    ) -> Result<Option<Streak>, GamificationError>;

    /// Loads every streak of a user.
    async fn load_streaks(&self, user_id: UserId) -> Result<Vec<Streak>, GamificationError>;

    /// Inserts or replaces a streak.
    async fn save_streak(&self, streak: &Streak) -> Result<(), GamificationError>;

    /// Loads a user's level record.
    async fn load_level(&self, user_id: UserId) -> Result<Option<UserLevel>, GamificationError>;

    /// Inserts or replaces a user's level record.
    async fn save_level(&self, level: &UserLevel) -> Result<(), GamificationError>;

    /// Appends a row to the XP ledger.
    async fn append_xp_event(&self, event: &XpEvent) -> Result<(), GamificationError>;

    /// Most recent XP ledger rows of a user, newest first.
    async fn xp_history(
        &self,
        user_id: UserId,
        limit: usize,
    ) -> Result<Vec<XpEvent>, GamificationError>;

    /// Ids of the achievements a user holds.
    async fn unlocked_achievement_ids(
        &self,
        user_id: UserId,
    ) -> Result<HashSet<String>, GamificationError>;

    /// Records an unlock if the user does not hold it yet.
    ///
    /// Returns `false` when the unlock already existed.
    async fn record_unlock(&self, unlock: &UserAchievement) -> Result<bool, GamificationError>;

    /// Adds an engagement delta onto the persisted counters.
    async fn add_engagement(&self, delta: &EngagementCounters) -> Result<(), GamificationError>;

    /// Loads a user's persisted engagement counters.
    async fn load_engagement(
        &self,
        user_id: UserId,
    ) -> Result<Option<EngagementCounters>, GamificationError>;

    /// Appends a notification to the notification log.
    async fn append_notification(
        &self,
        notification: &Notification,
    ) -> Result<(), GamificationError>;

    /// Inserts catalog entries that are not stored yet. Returns how many
    /// were inserted.
    async fn seed_catalog(&self, catalog: &AchievementCatalog) -> Result<u64, GamificationError>;
}

/// Read-only aggregate counts from the host application.
#[async_trait]
pub trait StatsProvider: Send + Sync + std::fmt::Debug {
    /// Current counts for a user.
    ///
    /// Returns [`GamificationError::Stats`] if the counts cannot be read.
    async fn activity_counts(&self, user_id: UserId) -> Result<ActivityCounts, GamificationError>;
}
