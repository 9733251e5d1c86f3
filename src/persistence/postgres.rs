//! PostgreSQL implementation of the store and statistics seams.
//!
//! Tables are owned by the host application's migrations. The queries
//! assume `streaks`, `user_levels`, `xp_events`, `achievements`,
//! `user_achievements`, `engagement_counters` and `notifications` for the
//! engine, plus the host's `transactions`, `goals` and `categories`.

use std::collections::HashSet;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use uuid::Uuid;

use super::models::EngagementCounters;
use super::{GamificationStore, StatsProvider};
use crate::config::EngineConfig;
use crate::domain::{
    AchievementCatalog, ActivityCounts, Notification, Streak, StreakType, UserAchievement,
    UserId, UserLevel, XpEvent, XpReason,
};
use crate::error::GamificationError;

type StreakRow = (
    Uuid,
    String,
    i32,
    i32,
    NaiveDate,
    bool,
    Option<DateTime<Utc>>,
    Vec<i32>,
);

type XpEventRow = (Uuid, Uuid, i64, serde_json::Value, i64, i32, DateTime<Utc>);

/// Opens a connection pool sized by the configuration.
///
/// # Errors
///
/// Returns [`GamificationError::Store`] if the database is unreachable.
pub async fn connect(config: &EngineConfig) -> Result<PgPool, GamificationError> {
    let pool = PgPoolOptions::new()
        .max_connections(config.database_max_connections)
        .min_connections(config.database_min_connections)
        .acquire_timeout(Duration::from_secs(config.database_connect_timeout_secs))
        .connect(&config.database_url)
        .await?;
    Ok(pool)
}

fn to_i64(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

fn to_u64(value: i64) -> u64 {
    u64::try_from(value).unwrap_or(0)
}

fn to_i32(value: u32) -> i32 {
    i32::try_from(value).unwrap_or(i32::MAX)
}

fn to_u32(value: i32) -> u32 {
    u32::try_from(value).unwrap_or(0)
}

fn streak_from_row(row: StreakRow) -> Result<Streak, GamificationError> {
    let (user_id, streak_type, current, best, last, is_active, claimed_at, claimed) = row;
    Ok(Streak {
        user_id: UserId::from_uuid(user_id),
        streak_type: streak_type.parse()?,
        current_count: to_u32(current),
        best_count: to_u32(best),
        last_activity_date: last,
        is_active,
        bonus_claimed_at: claimed_at,
        claimed_milestones: claimed.into_iter().map(to_u32).collect(),
    })
}

fn xp_event_from_row(row: XpEventRow) -> Result<XpEvent, GamificationError> {
    let (id, user_id, amount, reason, total_after, level_after, created_at) = row;
    let reason: XpReason = serde_json::from_value(reason)?;
    Ok(XpEvent {
        id,
        user_id: UserId::from_uuid(user_id),
        amount: to_u64(amount),
        reason,
        total_after: to_u64(total_after),
        level_after: to_u32(level_after),
        created_at,
    })
}

/// PostgreSQL-backed [`GamificationStore`] using `sqlx::PgPool`.
#[derive(Debug, Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Creates a store over an existing connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl GamificationStore for PostgresStore {
    async fn load_streak(
        &self,
        user_id: UserId,
        streak_type: StreakType,
    ) -> Result<Option<Streak>, GamificationError> {
        let row = sqlx::query_as::<_, StreakRow>(
            "SELECT user_id, streak_type, current_count, best_count, last_activity_date, \
             is_active, bonus_claimed_at, claimed_milestones \
             FROM streaks WHERE user_id = $1 AND streak_type = $2",
        )
        .bind(*user_id.as_uuid())
        .bind(streak_type.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.map(streak_from_row).transpose()
    }

    async fn load_streaks(&self, user_id: UserId) -> Result<Vec<Streak>, GamificationError> {
        let rows = sqlx::query_as::<_, StreakRow>(
            "SELECT user_id, streak_type, current_count, best_count, last_activity_date, \
             is_active, bonus_claimed_at, claimed_milestones \
             FROM streaks WHERE user_id = $1",
        )
        .bind(*user_id.as_uuid())
        .fetch_all(&self.pool)
        .await?;

        let mut streaks = rows
            .into_iter()
            .map(streak_from_row)
            .collect::<Result<Vec<_>, _>>()?;
        streaks.sort_by_key(|s| s.streak_type);
        Ok(streaks)
    }

    async fn save_streak(&self, streak: &Streak) -> Result<(), GamificationError> {
        let claimed: Vec<i32> = streak.claimed_milestones.iter().copied().map(to_i32).collect();
        sqlx::query(
            "INSERT INTO streaks (user_id, streak_type, current_count, best_count, \
             last_activity_date, is_active, bonus_claimed_at, claimed_milestones) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
             ON CONFLICT (user_id, streak_type) DO UPDATE SET \
             current_count = EXCLUDED.current_count, best_count = EXCLUDED.best_count, \
             last_activity_date = EXCLUDED.last_activity_date, is_active = EXCLUDED.is_active, \
             bonus_claimed_at = EXCLUDED.bonus_claimed_at, \
             claimed_milestones = EXCLUDED.claimed_milestones",
        )
        .bind(*streak.user_id.as_uuid())
        .bind(streak.streak_type.as_str())
        .bind(to_i32(streak.current_count))
        .bind(to_i32(streak.best_count))
        .bind(streak.last_activity_date)
        .bind(streak.is_active)
        .bind(streak.bonus_claimed_at)
        .bind(claimed)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn load_level(&self, user_id: UserId) -> Result<Option<UserLevel>, GamificationError> {
        let row = sqlx::query_as::<_, (i32, i64, DateTime<Utc>)>(
            "SELECT level, total_xp, updated_at FROM user_levels WHERE user_id = $1",
        )
        .bind(*user_id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|(level, total_xp, updated_at)| UserLevel {
            user_id,
            level: to_u32(level).max(1),
            total_xp: to_u64(total_xp),
            updated_at,
        }))
    }

    async fn save_level(&self, level: &UserLevel) -> Result<(), GamificationError> {
        sqlx::query(
            "INSERT INTO user_levels (user_id, level, total_xp, updated_at) \
             VALUES ($1, $2, $3, $4) \
             ON CONFLICT (user_id) DO UPDATE SET level = EXCLUDED.level, \
             total_xp = EXCLUDED.total_xp, updated_at = EXCLUDED.updated_at",
        )
        .bind(*level.user_id.as_uuid())
        .bind(to_i32(level.level))
        .bind(to_i64(level.total_xp))
        .bind(level.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn append_xp_event(&self, event: &XpEvent) -> Result<(), GamificationError> {
        let reason = serde_json::to_value(&event.reason)?;
        sqlx::query(
            "INSERT INTO xp_events (id, user_id, amount, reason, total_after, level_after, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(event.id)
        .bind(*event.user_id.as_uuid())
        .bind(to_i64(event.amount))
        .bind(reason)
        .bind(to_i64(event.total_after))
        .bind(to_i32(event.level_after))
        .bind(event.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn xp_history(
        &self,
        user_id: UserId,
        limit: usize,
    ) -> Result<Vec<XpEvent>, GamificationError> {
        let rows = sqlx::query_as::<_, XpEventRow>(
            "SELECT id, user_id, amount, reason, total_after, level_after, created_at \
             FROM xp_events WHERE user_id = $1 ORDER BY created_at DESC LIMIT $2",
        )
        .bind(*user_id.as_uuid())
        .bind(i64::try_from(limit).unwrap_or(i64::MAX))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(xp_event_from_row).collect()
    }

    async fn unlocked_achievement_ids(
        &self,
        user_id: UserId,
    ) -> Result<HashSet<String>, GamificationError> {
        let ids = sqlx::query_scalar::<_, String>(
            "SELECT achievement_id FROM user_achievements WHERE user_id = $1",
        )
        .bind(*user_id.as_uuid())
        .fetch_all(&self.pool)
        .await?;
        Ok(ids.into_iter().collect())
    }

    async fn record_unlock(&self, unlock: &UserAchievement) -> Result<bool, GamificationError> {
        let result = sqlx::query(
            "INSERT INTO user_achievements (user_id, achievement_id, unlocked_at, triggered_by, reference_id) \
             VALUES ($1, $2, $3, $4, $5) ON CONFLICT (user_id, achievement_id) DO NOTHING",
        )
        .bind(*unlock.user_id.as_uuid())
        .bind(&unlock.achievement_id)
        .bind(unlock.unlocked_at)
        .bind(unlock.triggered_by.as_str())
        .bind(unlock.reference_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn add_engagement(&self, delta: &EngagementCounters) -> Result<(), GamificationError> {
        sqlx::query(
            "INSERT INTO engagement_counters (user_id, events_total, logins, transactions, \
             goal_updates, categories, last_flushed_at) VALUES ($1, $2, $3, $4, $5, $6, $7) \
             ON CONFLICT (user_id) DO UPDATE SET \
             events_total = engagement_counters.events_total + EXCLUDED.events_total, \
             logins = engagement_counters.logins + EXCLUDED.logins, \
             transactions = engagement_counters.transactions + EXCLUDED.transactions, \
             goal_updates = engagement_counters.goal_updates + EXCLUDED.goal_updates, \
             categories = engagement_counters.categories + EXCLUDED.categories, \
             last_flushed_at = COALESCE(EXCLUDED.last_flushed_at, engagement_counters.last_flushed_at)",
        )
        .bind(*delta.user_id.as_uuid())
        .bind(to_i64(delta.events_total))
        .bind(to_i64(delta.logins))
        .bind(to_i64(delta.transactions))
        .bind(to_i64(delta.goal_updates))
        .bind(to_i64(delta.categories))
        .bind(delta.last_flushed_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn load_engagement(
        &self,
        user_id: UserId,
    ) -> Result<Option<EngagementCounters>, GamificationError> {
        let row = sqlx::query_as::<_, (i64, i64, i64, i64, i64, Option<DateTime<Utc>>)>(
            "SELECT events_total, logins, transactions, goal_updates, categories, last_flushed_at \
             FROM engagement_counters WHERE user_id = $1",
        )
        .bind(*user_id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(
            |(events_total, logins, transactions, goal_updates, categories, last_flushed_at)| {
                EngagementCounters {
                    user_id,
                    events_total: to_u64(events_total),
                    logins: to_u64(logins),
                    transactions: to_u64(transactions),
                    goal_updates: to_u64(goal_updates),
                    categories: to_u64(categories),
                    last_flushed_at,
                }
            },
        ))
    }

    async fn append_notification(
        &self,
        notification: &Notification,
    ) -> Result<(), GamificationError> {
        let payload = serde_json::to_value(notification)?;
        sqlx::query("INSERT INTO notifications (user_id, kind, payload) VALUES ($1, $2, $3)")
            .bind(*notification.user_id().as_uuid())
            .bind(notification.kind_str())
            .bind(payload)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn seed_catalog(&self, catalog: &AchievementCatalog) -> Result<u64, GamificationError> {
        let mut inserted = 0;
        for a in catalog.all() {
            let criteria = serde_json::to_value(&a.criteria)?;
            let rarity = serde_json::to_value(a.rarity)?;
            let result = sqlx::query(
                "INSERT INTO achievements (id, name, description, icon, color, type, criteria, \
                 points, rarity, is_active) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) \
                 ON CONFLICT (id) DO NOTHING",
            )
            .bind(&a.id)
            .bind(&a.name)
            .bind(&a.description)
            .bind(&a.icon)
            .bind(&a.color)
            .bind(&a.achievement_type)
            .bind(criteria)
            .bind(to_i64(a.points))
            .bind(rarity.as_str().unwrap_or("common").to_string())
            .bind(a.is_active)
            .execute(&self.pool)
            .await?;
            inserted += result.rows_affected();
        }
        Ok(inserted)
    }
}

/// Reads activity counts from the host application's tables.
#[derive(Debug, Clone)]
pub struct PostgresStats {
    pool: PgPool,
}

impl PostgresStats {
    /// Creates a provider over an existing connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl StatsProvider for PostgresStats {
    async fn activity_counts(&self, user_id: UserId) -> Result<ActivityCounts, GamificationError> {
        let (transactions, goals_created, goals_completed, categories) =
            sqlx::query_as::<_, (i64, i64, i64, i64)>(
                "SELECT \
                 (SELECT COUNT(*) FROM transactions WHERE user_id = $1), \
                 (SELECT COUNT(*) FROM goals WHERE user_id = $1), \
                 (SELECT COUNT(*) FROM goals WHERE user_id = $1 AND completed_at IS NOT NULL), \
                 (SELECT COUNT(*) FROM categories WHERE user_id = $1)",
            )
            .bind(*user_id.as_uuid())
            .fetch_one(&self.pool)
            .await
            .map_err(|e| GamificationError::Stats(e.to_string()))?;

        Ok(ActivityCounts {
            transactions: to_u64(transactions),
            goals_created: to_u64(goals_created),
            goals_completed: to_u64(goals_completed),
            categories: to_u64(categories),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::level_for_xp;

    #[test]
    fn numeric_conversions_clamp() {
        assert_eq!(to_i64(u64::MAX), i64::MAX);
        assert_eq!(to_u64(-1), 0);
        assert_eq!(to_i32(u32::MAX), i32::MAX);
        assert_eq!(to_u32(-5), 0);
    }

    #[test]
    fn saturated_level_survives_storage() {
        let mut level = UserLevel::new(UserId::new());
        let _ = level.apply_xp(u64::MAX, Utc::now());
        let stored = to_i64(level.total_xp);
        assert_eq!(to_u64(stored), level.total_xp);
        assert_eq!(level_for_xp(to_u64(stored)), level.level);
    }

    #[test]
    fn streak_row_round_trips_milestones() {
        let user = Uuid::new_v4();
        let row: StreakRow = (
            user,
            "daily_login".to_string(),
            14,
            20,
            NaiveDate::from_ymd_opt(2024, 1, 14).unwrap_or_default(),
            true,
            None,
            vec![7, 14],
        );
        let streak = streak_from_row(row);
        assert!(matches!(
            streak,
            Ok(ref s) if s.claimed_milestones.len() == 2 && s.streak_type == StreakType::DailyLogin
        ));
    }

    #[test]
    fn unknown_streak_type_in_row_is_an_error() {
        let row: StreakRow = (
            Uuid::new_v4(),
            "yearly".to_string(),
            1,
            1,
            NaiveDate::default(),
            true,
            None,
            vec![],
        );
        assert!(streak_from_row(row).is_err());
    }
}
