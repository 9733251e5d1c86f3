//! Store and stats double that fails selected calls on demand.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use async_trait::async_trait;

use super::memory::MemoryStore;
use super::models::EngagementCounters;
use super::{GamificationStore, StatsProvider};
use crate::domain::{
    AchievementCatalog, ActivityCounts, Notification, Streak, StreakType, UserAchievement,
    UserId, UserLevel, XpEvent,
};
use crate::error::GamificationError;

/// [`MemoryStore`] with switchable failures.
#[derive(Debug, Default)]
pub(crate) struct FailingStore {
    pub(crate) inner: MemoryStore,
    stats_down: AtomicBool,
    engagement_down: AtomicBool,
    notification_failures: AtomicU32,
}

impl FailingStore {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn fail_stats(&self, down: bool) {
        self.stats_down.store(down, Ordering::SeqCst);
    }

    pub(crate) fn fail_engagement(&self, down: bool) {
        self.engagement_down.store(down, Ordering::SeqCst);
    }

    /// Fails the next `count` notification appends.
    pub(crate) fn fail_next_notifications(&self, count: u32) {
        self.notification_failures.store(count, Ordering::SeqCst);
    }

    fn take_notification_failure(&self) -> bool {
        self.notification_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

fn down(what: &str) -> GamificationError {
    GamificationError::Store(format!("{what}: connection refused"))
}

#[async_trait]
impl GamificationStore for FailingStore {
    async fn load_streak(
        &self,
        user_id: UserId,
        streak_type: StreakType,
    ) -> Result<Option<Streak>, GamificationError> {
        self.inner.load_streak(user_id, streak_type).await
    }

    async fn load_streaks(&self, user_id: UserId) -> Result<Vec<Streak>, GamificationError> {
        self.inner.load_streaks(user_id).await
    }

    async fn save_streak(&self, streak: &Streak) -> Result<(), GamificationError> {
        self.inner.save_streak(streak).await
    }

    async fn load_level(&self, user_id: UserId) -> Result<Option<UserLevel>, GamificationError> {
        self.inner.load_level(user_id).await
    }

    async fn save_level(&self, level: &UserLevel) -> Result<(), GamificationError> {
        self.inner.save_level(level).await
    }

    async fn append_xp_event(&self, event: &XpEvent) -> Result<(), GamificationError> {
        self.inner.append_xp_event(event).await
    }

    async fn xp_history(
        &self,
        user_id: UserId,
        limit: usize,
    ) -> Result<Vec<XpEvent>, GamificationError> {
        self.inner.xp_history(user_id, limit).await
    }

    async fn unlocked_achievement_ids(
        &self,
        user_id: UserId,
    ) -> Result<HashSet<String>, GamificationError> {
        self.inner.unlocked_achievement_ids(user_id).await
    }

    async fn record_unlock(&self, unlock: &UserAchievement) -> Result<bool, GamificationError> {
        self.inner.record_unlock(unlock).await
    }

    async fn add_engagement(&self, delta: &EngagementCounters) -> Result<(), GamificationError> {
        if self.engagement_down.load(Ordering::SeqCst) {
            return Err(down("engagement_counters"));
        }
        self.inner.add_engagement(delta).await
    }

    async fn load_engagement(
        &self,
        user_id: UserId,
    ) -> Result<Option<EngagementCounters>, GamificationError> {
        self.inner.load_engagement(user_id).await
    }

    async fn append_notification(
        &self,
        notification: &Notification,
    ) -> Result<(), GamificationError> {
        if self.take_notification_failure() {
            return Err(down("notifications"));
        }
        self.inner.append_notification(notification).await
    }

    async fn seed_catalog(&self, catalog: &AchievementCatalog) -> Result<u64, GamificationError> {
        self.inner.seed_catalog(catalog).await
    }
}

#[async_trait]
impl StatsProvider for FailingStore {
    async fn activity_counts(&self, user_id: UserId) -> Result<ActivityCounts, GamificationError> {
        if self.stats_down.load(Ordering::SeqCst) {
            return Err(GamificationError::Stats("stats query timed out".to_string()));
        }
        self.inner.activity_counts(user_id).await
    }
}
