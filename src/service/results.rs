//! Values returned by [`super::GamificationService`] operations.
//!
//! "Nothing happened" outcomes (already recorded today, no bonus to claim,
//! no new achievements) are ordinary values here, never errors.

use serde::Serialize;

use crate::domain::{
    Achievement, GamificationEvent, LevelProgress, Streak, StreakTransition, UserId,
};
use crate::persistence::EngagementCounters;

/// Outcome of a streak trigger.
#[derive(Debug, Clone, Serialize)]
pub struct StreakResult {
    /// `false` only when the activity was already recorded today.
    pub success: bool,
    /// Streak state after the trigger.
    pub streak: Streak,
    /// How the count moved.
    pub transition: StreakTransition,
    /// Bonus XP offered if the trigger landed on a milestone.
    pub bonus_xp: u64,
    /// Whether the current milestone's bonus can be claimed.
    pub can_claim_bonus: bool,
    /// Next multiple of 7 above the current count.
    pub next_milestone: u32,
    /// Human-readable summary.
    pub message: String,
}

/// Outcome of an XP grant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LevelResult {
    /// XP granted by this call.
    pub xp_awarded: u64,
    /// Lifetime XP after the grant.
    pub total_xp: u64,
    /// Level before the grant.
    pub previous_level: u32,
    /// Level after the grant.
    pub new_level: u32,
    /// `new_level - previous_level`.
    pub levels_gained: u32,
}

/// Outcome of a milestone bonus claim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BonusClaim {
    /// `false` when there was no unclaimed milestone.
    pub claimed: bool,
    /// Milestone that was claimed.
    pub milestone: Option<u32>,
    /// XP credited.
    pub bonus_xp: u64,
    /// Level change caused by the credit.
    pub level: Option<LevelResult>,
}

impl BonusClaim {
    pub(crate) const fn nothing() -> Self {
        Self {
            claimed: false,
            milestone: None,
            bonus_xp: 0,
            level: None,
        }
    }
}

/// Outcome of an achievement evaluation.
#[derive(Debug, Clone, Default, Serialize)]
pub struct UnlockResult {
    /// Achievements unlocked by this evaluation, in catalog order.
    pub newly_unlocked: Vec<Achievement>,
    /// XP credited for the unlocks.
    pub xp_awarded: u64,
    /// Level state after the last credit, if anything was unlocked.
    pub level: Option<LevelResult>,
}

impl UnlockResult {
    /// Returns `true` if nothing was unlocked.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.newly_unlocked.is_empty()
    }
}

/// Everything a single host event caused.
#[derive(Debug, Clone, Serialize)]
pub struct EventOutcome {
    /// Event that was recorded.
    pub event: GamificationEvent,
    /// XP grant for the event, if it carries a reward.
    pub xp: Option<LevelResult>,
    /// Streak trigger, if the event drives a streak.
    pub streak: Option<StreakResult>,
    /// Achievements unlocked afterwards.
    pub achievements: UnlockResult,
}

/// Read model of a user's gamification state.
#[derive(Debug, Clone, Serialize)]
pub struct Profile {
    /// User.
    pub user_id: UserId,
    /// Level and progress to the next one.
    pub progress: LevelProgress,
    /// Streaks with `is_active` recomputed for today.
    pub streaks: Vec<Streak>,
    /// Held achievement ids, sorted.
    pub achievements: Vec<String>,
    /// Persisted engagement counters plus anything not flushed yet.
    pub engagement: EngagementCounters,
}
