//! Service layer: business logic orchestration.
//!
//! [`GamificationService`] coordinates streaks, XP and achievements over a
//! [`crate::persistence::GamificationStore`] and emits notifications
//! through the [`super::domain::NotificationBus`].

pub mod engagement;
pub mod gamification_service;
pub mod relay;
pub mod results;

pub use engagement::EngagementTracker;
pub use gamification_service::{ALREADY_RECORDED_TODAY, GamificationService};
pub use relay::spawn_notification_relay;
pub use results::{BonusClaim, EventOutcome, LevelResult, Profile, StreakResult, UnlockResult};
