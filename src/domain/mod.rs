//! Domain layer: streak rules, XP/level math, achievements and
//! notifications.
//!
//! Everything here is pure and synchronous except the notification bus.
//! Persistence and orchestration live in [`crate::persistence`] and
//! [`crate::service`].

pub mod achievement;
pub mod catalog;
pub mod clock;
pub mod event;
pub mod level;
pub mod notification;
pub mod notification_bus;
pub mod streak;
pub mod tiers;
pub mod user_id;

pub use achievement::{
    Achievement, ActivityCounts, Criterion, Metric, Rarity, UserAchievement, UserStats,
};
pub use catalog::AchievementCatalog;
pub use clock::{Clock, FixedClock, SystemClock};
pub use event::{EventContext, GamificationEvent};
pub use level::{
    LevelProgress, MAX_TOTAL_XP, UserLevel, XpEvent, XpReason, level_for_xp, level_up_message,
    xp_required_for_level,
};
pub use notification::Notification;
pub use notification_bus::NotificationBus;
pub use streak::{Streak, StreakTransition, StreakType};
pub use tiers::TierTable;
pub use user_id::UserId;
