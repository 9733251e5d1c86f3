//! In-memory store with a single async lock.
//!
//! [`MemoryStore`] keeps every record in `HashMap`s behind one
//! [`tokio::sync::RwLock`]. It backs tests and runs with
//! `PERSISTENCE_ENABLED=false`. Nothing survives a restart.

use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use super::models::{EngagementCounters, NotificationRecord};
use super::{GamificationStore, StatsProvider};
use crate::domain::{
    Achievement, AchievementCatalog, ActivityCounts, Notification, Streak, StreakType,
    UserAchievement, UserId, UserLevel, XpEvent,
};
use crate::error::GamificationError;

/// Notifications kept by [`MemoryStore::new`] before the oldest are dropped.
pub const DEFAULT_NOTIFICATION_LOG_CAPACITY: usize = 1_000;

#[derive(Debug, Default)]
struct MemoryState {
    streaks: HashMap<(UserId, StreakType), Streak>,
    levels: HashMap<UserId, UserLevel>,
    xp_events: HashMap<UserId, Vec<XpEvent>>,
    unlocks: HashMap<UserId, BTreeMap<String, UserAchievement>>,
    engagement: HashMap<UserId, EngagementCounters>,
    notifications: VecDeque<NotificationRecord>,
    notifications_logged: i64,
    catalog: BTreeMap<String, Achievement>,
    counts: HashMap<UserId, ActivityCounts>,
}

/// Process-local [`GamificationStore`] and [`StatsProvider`].
///
/// Activity counts are set by the caller through
/// [`MemoryStore::set_activity_counts`] since there is no host database.
/// The notification log is a ring: only the most recent entries are kept.
#[derive(Debug)]
pub struct MemoryStore {
    state: RwLock<MemoryState>,
    notification_capacity: usize,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::with_notification_capacity(DEFAULT_NOTIFICATION_LOG_CAPACITY)
    }
}

impl MemoryStore {
    /// Creates an empty store keeping the last
    /// [`DEFAULT_NOTIFICATION_LOG_CAPACITY`] notifications.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty store keeping at most `capacity` notifications.
    #[must_use]
    pub fn with_notification_capacity(capacity: usize) -> Self {
        Self {
            state: RwLock::new(MemoryState::default()),
            notification_capacity: capacity,
        }
    }

    /// Replaces the activity counts reported for `user_id`.
    pub async fn set_activity_counts(&self, user_id: UserId, counts: ActivityCounts) {
        self.state.write().await.counts.insert(user_id, counts);
    }

    /// Retained notifications, oldest first.
    pub async fn notifications(&self) -> Vec<NotificationRecord> {
        self.state.read().await.notifications.iter().cloned().collect()
    }

    /// Number of catalog entries seeded so far.
    pub async fn catalog_len(&self) -> usize {
        self.state.read().await.catalog.len()
    }

    /// Unlock records of a user ordered by achievement id.
    pub async fn unlocks(&self, user_id: UserId) -> Vec<UserAchievement> {
        self.state
            .read()
            .await
            .unlocks
            .get(&user_id)
            .map(|m| m.values().cloned().collect())
            .unwrap_or_default()
    }
}

#[async_trait]
impl GamificationStore for MemoryStore {
    async fn load_streak(
        &self,
        user_id: UserId,
        streak_type: StreakType,
    ) -> Result<Option<Streak>, GamificationError> {
        let state = self.state.read().await;
        Ok(state.streaks.get(&(user_id, streak_type)).cloned())
    }

    async fn load_streaks(&self, user_id: UserId) -> Result<Vec<Streak>, GamificationError> {
        let state = self.state.read().await;
        let mut streaks: Vec<Streak> = state
            .streaks
            .values()
            .filter(|s| s.user_id == user_id)
            .cloned()
            .collect();
        streaks.sort_by_key(|s| s.streak_type);
        Ok(streaks)
    }

    async fn save_streak(&self, streak: &Streak) -> Result<(), GamificationError> {
        let mut state = self.state.write().await;
        state
            .streaks
            .insert((streak.user_id, streak.streak_type), streak.clone());
        Ok(())
    }

    async fn load_level(&self, user_id: UserId) -> Result<Option<UserLevel>, GamificationError> {
        Ok(self.state.read().await.levels.get(&user_id).cloned())
    }

    async fn save_level(&self, level: &UserLevel) -> Result<(), GamificationError> {
        let mut state = self.state.write().await;
        state.levels.insert(level.user_id, level.clone());
        Ok(())
    }

    async fn append_xp_event(&self, event: &XpEvent) -> Result<(), GamificationError> {
        let mut state = self.state.write().await;
        state
            .xp_events
            .entry(event.user_id)
            .or_default()
            .push(event.clone());
        Ok(())
    }

    async fn xp_history(
        &self,
        user_id: UserId,
        limit: usize,
    ) -> Result<Vec<XpEvent>, GamificationError> {
        let state = self.state.read().await;
        Ok(state
            .xp_events
            .get(&user_id)
            .map(|events| events.iter().rev().take(limit).cloned().collect())
            .unwrap_or_default())
    }

    async fn unlocked_achievement_ids(
        &self,
        user_id: UserId,
    ) -> Result<HashSet<String>, GamificationError> {
        let state = self.state.read().await;
        Ok(state
            .unlocks
            .get(&user_id)
            .map(|m| m.keys().cloned().collect())
            .unwrap_or_default())
    }

    async fn record_unlock(&self, unlock: &UserAchievement) -> Result<bool, GamificationError> {
        let mut state = self.state.write().await;
        let held = state.unlocks.entry(unlock.user_id).or_default();
        if held.contains_key(&unlock.achievement_id) {
            return Ok(false);
        }
        held.insert(unlock.achievement_id.clone(), unlock.clone());
        Ok(true)
    }

    async fn add_engagement(&self, delta: &EngagementCounters) -> Result<(), GamificationError> {
        let mut state = self.state.write().await;
        state
            .engagement
            .entry(delta.user_id)
            .or_insert_with(|| EngagementCounters::new(delta.user_id))
            .merge(delta);
        Ok(())
    }

    async fn load_engagement(
        &self,
        user_id: UserId,
    ) -> Result<Option<EngagementCounters>, GamificationError> {
        Ok(self.state.read().await.engagement.get(&user_id).cloned())
    }

    async fn append_notification(
        &self,
        notification: &Notification,
    ) -> Result<(), GamificationError> {
        let payload = serde_json::to_value(notification)?;
        let mut state = self.state.write().await;
        state.notifications_logged = state.notifications_logged.saturating_add(1);
        let id = state.notifications_logged;
        state.notifications.push_back(NotificationRecord {
            id,
            user_id: notification.user_id(),
            kind: notification.kind_str().to_string(),
            payload,
            created_at: Utc::now(),
        });
        while state.notifications.len() > self.notification_capacity {
            state.notifications.pop_front();
        }
        Ok(())
    }

    async fn seed_catalog(&self, catalog: &AchievementCatalog) -> Result<u64, GamificationError> {
        let mut state = self.state.write().await;
        let mut inserted = 0;
        for achievement in catalog.all() {
            if !state.catalog.contains_key(&achievement.id) {
                state
                    .catalog
                    .insert(achievement.id.clone(), achievement.clone());
                inserted += 1;
            }
        }
        Ok(inserted)
    }
}

#[async_trait]
impl StatsProvider for MemoryStore {
    async fn activity_counts(&self, user_id: UserId) -> Result<ActivityCounts, GamificationError> {
        Ok(self
            .state
            .read()
            .await
            .counts
            .get(&user_id)
            .copied()
            .unwrap_or_default())
    }
}
