//! User-facing notifications produced by engine state changes.
//!
//! Every successful mutation publishes a [`Notification`] through the
//! [`super::NotificationBus`]. Delivery to the user (push, in-app feed)
//! belongs to the host application.

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::{Rarity, StreakTransition, StreakType, UserId};

/// Notification emitted after an engine state change.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Notification {
    /// A streak trigger was recorded.
    StreakUpdated {
        /// Streak owner.
        user_id: UserId,
        /// Streak type.
        streak_type: StreakType,
        /// How the count moved.
        transition: StreakTransition,
        /// Count after the trigger.
        current_count: u32,
        /// Best count after the trigger.
        best_count: u32,
        /// Trigger timestamp.
        timestamp: DateTime<Utc>,
    },

    /// A streak landed on a multiple of 7.
    MilestoneReached {
        /// Streak owner.
        user_id: UserId,
        /// Streak type.
        streak_type: StreakType,
        /// Milestone count.
        milestone: u32,
        /// Bonus XP the user can claim.
        bonus_xp: u64,
        /// Celebration message.
        message: String,
        /// Timestamp.
        timestamp: DateTime<Utc>,
    },

    /// A milestone bonus was claimed and credited.
    BonusClaimed {
        /// Streak owner.
        user_id: UserId,
        /// Streak type.
        streak_type: StreakType,
        /// Milestone count.
        milestone: u32,
        /// XP credited.
        bonus_xp: u64,
        /// Timestamp.
        timestamp: DateTime<Utc>,
    },

    /// The user gained one or more levels.
    LevelUp {
        /// User.
        user_id: UserId,
        /// Level after the grant.
        new_level: u32,
        /// Levels gained by the grant.
        levels_gained: u32,
        /// Lifetime XP after the grant.
        total_xp: u64,
        /// Celebration message for the new level.
        message: String,
        /// Timestamp.
        timestamp: DateTime<Utc>,
    },

    /// An achievement was unlocked.
    AchievementUnlocked {
        /// User.
        user_id: UserId,
        /// Catalog id.
        achievement_id: String,
        /// Display name.
        name: String,
        /// XP awarded.
        points: u64,
        /// Rarity tier.
        rarity: Rarity,
        /// Timestamp.
        timestamp: DateTime<Utc>,
    },
}

impl Notification {
    /// Returns the user the notification is addressed to.
    #[must_use]
    pub const fn user_id(&self) -> UserId {
        match self {
            Self::StreakUpdated { user_id, .. }
            | Self::MilestoneReached { user_id, .. }
            | Self::BonusClaimed { user_id, .. }
            | Self::LevelUp { user_id, .. }
            | Self::AchievementUnlocked { user_id, .. } => *user_id,
        }
    }

    /// Returns the notification kind as a static string slice.
    #[must_use]
    pub const fn kind_str(&self) -> &'static str {
        match self {
            Self::StreakUpdated { .. } => "streak_updated",
            Self::MilestoneReached { .. } => "milestone_reached",
            Self::BonusClaimed { .. } => "bonus_claimed",
            Self::LevelUp { .. } => "level_up",
            Self::AchievementUnlocked { .. } => "achievement_unlocked",
        }
    }
}
