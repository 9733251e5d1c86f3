//! Achievements, their unlock criteria and the statistics they test.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{GamificationEvent, StreakType, UserId};

/// How hard an achievement is to get.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rarity {
    /// Most users unlock it.
    Common,
    /// Takes sustained effort.
    Rare,
    /// Takes months of effort.
    Epic,
    /// Reserved for the most dedicated users.
    Legendary,
}

/// A user statistic a criterion can test.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    /// Number of recorded transactions.
    Transactions,
    /// Number of financial goals created.
    GoalsCreated,
    /// Number of financial goals completed.
    GoalsCompleted,
    /// Number of budget categories created.
    Categories,
    /// Current level.
    Level,
    /// Lifetime XP.
    TotalXp,
    /// Best run ever recorded for a streak type.
    BestStreak(StreakType),
}

/// Unlock predicate of an achievement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Criterion {
    /// `metric >= threshold`.
    MinCount {
        /// Statistic under test.
        metric: Metric,
        /// Inclusive lower bound.
        threshold: u64,
    },
    /// Every nested criterion holds.
    AllOf {
        /// Nested criteria.
        criteria: Vec<Criterion>,
    },
    /// At least one nested criterion holds.
    AnyOf {
        /// Nested criteria.
        criteria: Vec<Criterion>,
    },
}

impl Criterion {
    /// Shorthand for a [`Criterion::MinCount`].
    #[must_use]
    pub const fn min(metric: Metric, threshold: u64) -> Self {
        Self::MinCount { metric, threshold }
    }

    /// Evaluates the criterion against a user's statistics.
    #[must_use]
    pub fn is_satisfied(&self, stats: &UserStats) -> bool {
        match self {
            Self::MinCount { metric, threshold } => stats.value(*metric) >= *threshold,
            Self::AllOf { criteria } => criteria.iter().all(|c| c.is_satisfied(stats)),
            Self::AnyOf { criteria } => criteria.iter().any(|c| c.is_satisfied(stats)),
        }
    }

    /// Returns `true` if no composite in the tree is empty.
    #[must_use]
    pub fn is_well_formed(&self) -> bool {
        match self {
            Self::MinCount { .. } => true,
            Self::AllOf { criteria } | Self::AnyOf { criteria } => {
                !criteria.is_empty() && criteria.iter().all(Self::is_well_formed)
            }
        }
    }
}

/// Catalog entry describing an unlockable badge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Achievement {
    /// Stable slug, unique within the catalog.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Display description.
    pub description: String,
    /// Icon name understood by the client.
    pub icon: String,
    /// Badge color (hex).
    pub color: String,
    /// Grouping shown in the client (e.g. `"transactions"`).
    #[serde(rename = "type")]
    pub achievement_type: String,
    /// Unlock predicate.
    pub criteria: Criterion,
    /// XP awarded on unlock.
    pub points: u64,
    /// Rarity tier.
    pub rarity: Rarity,
    /// Inactive entries are never unlocked.
    #[serde(default = "default_active")]
    pub is_active: bool,
}

const fn default_active() -> bool {
    true
}

/// Aggregate counts owned by the host application.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityCounts {
    /// Recorded transactions.
    pub transactions: u64,
    /// Created goals.
    pub goals_created: u64,
    /// Completed goals.
    pub goals_completed: u64,
    /// Created categories.
    pub categories: u64,
}

/// Everything a criterion may look at for one user.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct UserStats {
    /// Counts from the host application.
    pub counts: ActivityCounts,
    /// Current level.
    pub level: u32,
    /// Lifetime XP.
    pub total_xp: u64,
    /// Best run per streak type; missing types count as zero.
    pub best_streaks: BTreeMap<StreakType, u32>,
}

impl UserStats {
    /// Value of `metric` for this user.
    #[must_use]
    pub fn value(&self, metric: Metric) -> u64 {
        match metric {
            Metric::Transactions => self.counts.transactions,
            Metric::GoalsCreated => self.counts.goals_created,
            Metric::GoalsCompleted => self.counts.goals_completed,
            Metric::Categories => self.counts.categories,
            Metric::Level => u64::from(self.level),
            Metric::TotalXp => self.total_xp,
            Metric::BestStreak(t) => self
                .best_streaks
                .get(&t)
                .copied()
                .map_or(0, u64::from),
        }
    }
}

/// Record that a user holds an achievement. Written once, never removed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserAchievement {
    /// Holder.
    pub user_id: UserId,
    /// Catalog id.
    pub achievement_id: String,
    /// Unlock timestamp.
    pub unlocked_at: DateTime<Utc>,
    /// Event whose evaluation unlocked it.
    pub triggered_by: GamificationEvent,
    /// Host-side entity (transaction, goal) that caused the event, if known.
    pub reference_id: Option<Uuid>,
}
