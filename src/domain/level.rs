//! Experience points and levels.
//!
//! Levels are a pure function of total XP. The XP needed to *reach* a
//! level follows `(level-1)*100 + (level-1)*(level-2)*10`, which gives
//! thresholds 0, 100, 220, 360, 520, … and makes every level cost more
//! than the previous one.

use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{StreakType, TierTable, UserId};

/// Level-up celebration message keyed by the new level.
static LEVEL_UP_MESSAGES: LazyLock<TierTable<&'static str>> = LazyLock::new(|| {
    TierTable::new(
        vec![
            (10, "Double digits! Your budgeting habit is taking shape."),
            (25, "Level 25. You are a seasoned money manager."),
            (50, "Halfway to a hundred. Impressive discipline!"),
            (75, "Level 75. Few budgets are this well kept."),
            (100, "Level 100. A true budgeting legend!"),
        ],
        "Level up! Keep tracking to grow further.",
    )
});

/// Ceiling for lifetime XP: the largest value a signed 64-bit column holds.
pub const MAX_TOTAL_XP: u64 = i64::MAX.unsigned_abs();

/// Total XP needed to reach `level`, as `u128` so large levels never wrap.
fn xp_threshold(level: u32) -> u128 {
    let l = u128::from(level.max(1)) - 1;
    l * 100 + l * l.saturating_sub(1) * 10
}

/// Total XP a user must have accumulated to be at `level`.
///
/// `xp_required_for_level(1) == 0`. Level `0` is treated as level `1`.
/// Saturates at `u64::MAX` for levels whose threshold does not fit.
#[must_use]
pub fn xp_required_for_level(level: u32) -> u64 {
    u64::try_from(xp_threshold(level)).unwrap_or(u64::MAX)
}

/// Highest level whose threshold is `<= total_xp`.
#[must_use]
pub fn level_for_xp(total_xp: u64) -> u32 {
    let xp = u128::from(total_xp);
    let (mut lo, mut hi) = (1_u32, u32::MAX);
    while lo < hi {
        let mid = lo + (hi - lo).div_ceil(2);
        if xp_threshold(mid) <= xp {
            lo = mid;
        } else {
            hi = mid - 1;
        }
    }
    lo
}

/// Celebration message for reaching `level`.
#[must_use]
pub fn level_up_message(level: u32) -> &'static str {
    LEVEL_UP_MESSAGES.lookup(u64::from(level))
}

/// Why XP was granted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum XpReason {
    /// A transaction was recorded.
    TransactionCreated,
    /// A financial goal was created.
    GoalCreated,
    /// Progress was logged against a goal.
    GoalProgress,
    /// A financial goal was completed.
    GoalCompleted,
    /// A category was created.
    CategoryCreated,
    /// First login of the day.
    DailyLogin,
    /// A streak milestone bonus was claimed.
    StreakBonus {
        /// Streak the bonus belongs to.
        streak_type: StreakType,
        /// Milestone count that was claimed.
        milestone: u32,
    },
    /// An achievement was unlocked.
    Achievement {
        /// Catalog id of the achievement.
        achievement_id: String,
    },
    /// Grant made by an operator or a migration.
    Manual {
        /// Free-form note stored with the ledger row.
        note: String,
    },
}

impl XpReason {
    /// Standard reward for fixed-size grants; `None` for variable ones.
    #[must_use]
    pub const fn standard_amount(&self) -> Option<u64> {
        match self {
            Self::TransactionCreated => Some(10),
            Self::GoalCreated => Some(20),
            Self::GoalProgress => Some(5),
            Self::GoalCompleted => Some(100),
            Self::CategoryCreated => Some(5),
            Self::DailyLogin => Some(5),
            Self::StreakBonus { .. } | Self::Achievement { .. } | Self::Manual { .. } => None,
        }
    }

    /// Short label for logs and the ledger's reason column.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::TransactionCreated => "transaction_created",
            Self::GoalCreated => "goal_created",
            Self::GoalProgress => "goal_progress",
            Self::GoalCompleted => "goal_completed",
            Self::CategoryCreated => "category_created",
            Self::DailyLogin => "daily_login",
            Self::StreakBonus { .. } => "streak_bonus",
            Self::Achievement { .. } => "achievement",
            Self::Manual { .. } => "manual",
        }
    }
}

/// Persisted level state of one user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserLevel {
    /// Owner.
    pub user_id: UserId,
    /// Current level, always `level_for_xp(total_xp)`.
    pub level: u32,
    /// Lifetime XP. Never decreases and never exceeds [`MAX_TOTAL_XP`].
    pub total_xp: u64,
    /// Last time XP was added.
    pub updated_at: DateTime<Utc>,
}

impl UserLevel {
    /// Fresh level record: level 1, no XP.
    #[must_use]
    pub fn new(user_id: UserId) -> Self {
        Self {
            user_id,
            level: 1,
            total_xp: 0,
            updated_at: Utc::now(),
        }
    }

    /// Adds XP and recomputes the level. Returns the number of levels gained.
    pub fn apply_xp(&mut self, amount: u64, now: DateTime<Utc>) -> u32 {
        let previous = self.level;
        self.total_xp = self.total_xp.saturating_add(amount).min(MAX_TOTAL_XP);
        // A stored level above the formula (hand-edited row) is kept.
        self.level = level_for_xp(self.total_xp).max(previous);
        if amount > 0 {
            self.updated_at = now;
        }
        self.level - previous
    }

    /// Progress towards the next level.
    #[must_use]
    pub fn progress(&self) -> LevelProgress {
        LevelProgress::for_xp(self.total_xp)
    }
}

/// Where a user sits between two level thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LevelProgress {
    /// Current level.
    pub level: u32,
    /// Lifetime XP.
    pub total_xp: u64,
    /// Threshold of the current level.
    pub level_floor_xp: u64,
    /// Threshold of the next level.
    pub next_level_xp: u64,
    /// XP earned since reaching the current level.
    pub xp_into_level: u64,
    /// XP still missing for the next level.
    pub xp_to_next_level: u64,
    /// `xp_into_level / (next_level_xp - level_floor_xp)`, in `[0, 1)`.
    pub fraction: f64,
}

impl LevelProgress {
    /// Computes progress for a lifetime XP total.
    #[must_use]
    pub fn for_xp(total_xp: u64) -> Self {
        let level = level_for_xp(total_xp);
        let level_floor_xp = xp_required_for_level(level);
        let next_level_xp = xp_required_for_level(level.saturating_add(1));
        let span = next_level_xp.saturating_sub(level_floor_xp);
        let xp_into_level = total_xp.saturating_sub(level_floor_xp);
        #[allow(clippy::cast_precision_loss)]
        let fraction = if span == 0 {
            0.0
        } else {
            xp_into_level as f64 / span as f64
        };
        Self {
            level,
            total_xp,
            level_floor_xp,
            next_level_xp,
            xp_into_level,
            xp_to_next_level: next_level_xp.saturating_sub(total_xp),
            fraction,
        }
    }
}

/// Append-only XP ledger row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct XpEvent {
    /// Row id.
    pub id: Uuid,
    /// User who received the XP.
    pub user_id: UserId,
    /// Amount granted.
    pub amount: u64,
    /// Why it was granted.
    pub reason: XpReason,
    /// Lifetime XP after the grant.
    pub total_after: u64,
    /// Level after the grant.
    pub level_after: u32,
    /// Grant timestamp.
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_one_needs_no_xp() {
        assert_eq!(xp_required_for_level(1), 0);
        assert_eq!(xp_required_for_level(0), 0);
    }

    #[test]
    fn known_thresholds() {
        assert_eq!(xp_required_for_level(2), 100);
        assert_eq!(xp_required_for_level(3), 220);
        assert_eq!(xp_required_for_level(4), 360);
        assert_eq!(xp_required_for_level(5), 520);
        assert_eq!(xp_required_for_level(11), 1_000 + 900);
    }

    #[test]
    fn thresholds_strictly_increase_with_growing_steps() {
        let mut previous_step = 0;
        for level in 2..500 {
            let step = xp_required_for_level(level + 1) - xp_required_for_level(level);
            assert!(xp_required_for_level(level + 1) > xp_required_for_level(level));
            assert!(step > previous_step);
            previous_step = step;
        }
    }

    #[test]
    fn level_for_xp_inverts_thresholds() {
        assert_eq!(level_for_xp(0), 1);
        assert_eq!(level_for_xp(99), 1);
        assert_eq!(level_for_xp(100), 2);
        assert_eq!(level_for_xp(219), 2);
        assert_eq!(level_for_xp(220), 3);
        assert_eq!(level_for_xp(250), 3);
        for level in 1..300 {
            let xp = xp_required_for_level(level);
            assert_eq!(level_for_xp(xp), level);
            if xp > 0 {
                assert_eq!(level_for_xp(xp - 1), level - 1);
            }
        }
    }

    #[test]
    fn level_for_xp_handles_u64_max() {
        let level = level_for_xp(u64::MAX);
        assert!(xp_threshold(level) <= u128::from(u64::MAX));
        assert!(xp_threshold(level + 1) > u128::from(u64::MAX));
    }

    #[test]
    fn apply_zero_xp_keeps_level() {
        let mut lvl = UserLevel::new(UserId::new());
        let _ = lvl.apply_xp(150, Utc::now());
        let before = lvl.clone();
        assert_eq!(lvl.apply_xp(0, Utc::now()), 0);
        assert_eq!(lvl, before);
    }

    #[test]
    fn apply_large_grant_crosses_several_levels() {
        let mut lvl = UserLevel::new(UserId::new());
        assert_eq!(lvl.apply_xp(250, Utc::now()), 2);
        assert_eq!(lvl.level, 3);
        assert_eq!(lvl.total_xp, 250);
    }

    #[test]
    fn apply_saturates_total_at_storable_ceiling() {
        let mut lvl = UserLevel::new(UserId::new());
        let _ = lvl.apply_xp(u64::MAX, Utc::now());
        let _ = lvl.apply_xp(10, Utc::now());
        assert_eq!(lvl.total_xp, MAX_TOTAL_XP);
        assert_eq!(lvl.level, level_for_xp(lvl.total_xp));
    }

    #[test]
    fn progress_between_levels() {
        let p = LevelProgress::for_xp(250);
        assert_eq!(p.level, 3);
        assert_eq!(p.level_floor_xp, 220);
        assert_eq!(p.next_level_xp, 360);
        assert_eq!(p.xp_into_level, 30);
        assert_eq!(p.xp_to_next_level, 110);
        assert!(p.fraction > 0.2 && p.fraction < 0.22);
    }

    #[test]
    fn level_up_message_tiers() {
        assert_eq!(
            level_up_message(2),
            "Level up! Keep tracking to grow further."
        );
        assert_eq!(level_up_message(10), level_up_message(24));
        assert_ne!(level_up_message(24), level_up_message(25));
        assert_eq!(level_up_message(150), level_up_message(100));
    }

    #[test]
    fn reason_amounts() {
        assert_eq!(XpReason::TransactionCreated.standard_amount(), Some(10));
        assert_eq!(XpReason::GoalCompleted.standard_amount(), Some(100));
        assert_eq!(
            XpReason::Manual {
                note: "import".to_string()
            }
            .standard_amount(),
            None
        );
    }
}
