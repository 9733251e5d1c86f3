//! Consecutive-day streaks.
//!
//! A [`Streak`] counts consecutive calendar days on which a user performed
//! an activity of one [`StreakType`]. Transition rules live here as pure
//! methods taking "today" explicitly; the service layer supplies the date
//! from its clock and persists the result.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::{TierTable, UserId};
use crate::error::GamificationError;

/// Streak counts that are multiples of this value are milestones.
pub const MILESTONE_INTERVAL: u32 = 7;

/// Bonus XP offered for a milestone count, keyed by day thresholds. The
/// lowest threshold is the first milestone.
static BONUS_TIERS: LazyLock<TierTable<u64>> = LazyLock::new(|| {
    TierTable::new(
        vec![
            (7, 50),
            (14, 100),
            (30, 250),
            (50, 400),
            (100, 1_000),
        ],
        0,
    )
});

/// Celebration message for a milestone, keyed by day thresholds.
static MILESTONE_MESSAGES: LazyLock<TierTable<&'static str>> = LazyLock::new(|| {
    TierTable::new(
        vec![
            (7, "One full week in a row. Keep it going!"),
            (14, "Two weeks strong. This is becoming a habit."),
            (21, "Three weeks in a row. The habit has stuck."),
            (28, "Four weeks without a break!"),
            (30, "Over a month without a miss!"),
            (50, "Fifty days and counting. Your budget thanks you."),
            (100, "Triple digits! A legendary streak."),
        ],
        "Nice streak!",
    )
});

/// Kind of recurring activity a streak tracks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StreakType {
    /// User opened the app.
    DailyLogin,
    /// User recorded at least one transaction.
    DailyTransaction,
    /// User stayed within their weekly budget.
    WeeklyBudget,
    /// User put money aside for savings.
    MonthlySaving,
}

impl StreakType {
    /// Every streak type, in declaration order.
    pub const ALL: [Self; 4] = [
        Self::DailyLogin,
        Self::DailyTransaction,
        Self::WeeklyBudget,
        Self::MonthlySaving,
    ];

    /// Returns the snake_case wire name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::DailyLogin => "daily_login",
            Self::DailyTransaction => "daily_transaction",
            Self::WeeklyBudget => "weekly_budget",
            Self::MonthlySaving => "monthly_saving",
        }
    }
}

impl fmt::Display for StreakType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StreakType {
    type Err = GamificationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| GamificationError::UnknownStreakType(s.to_string()))
    }
}

/// What a call to [`Streak::record_activity`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StreakTransition {
    /// First activity ever for this user and type.
    Started,
    /// Activity on the day after the last one; the count grew.
    Continued,
    /// Activity after a gap; the count restarted at 1.
    Reset {
        /// Count of the run that was broken.
        previous_count: u32,
    },
    /// Activity was already recorded today; nothing changed.
    AlreadyRecorded,
}

impl StreakTransition {
    /// Returns `true` if the streak row changed.
    #[must_use]
    pub const fn is_recorded(self) -> bool {
        !matches!(self, Self::AlreadyRecorded)
    }
}

/// Persisted streak state for one `(user, type)` pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Streak {
    /// Owner of the streak.
    pub user_id: UserId,
    /// Activity tracked by the streak.
    pub streak_type: StreakType,
    /// Length of the current run in days.
    pub current_count: u32,
    /// Longest run ever observed. Always `>= current_count`.
    pub best_count: u32,
    /// Calendar day of the last recorded activity.
    pub last_activity_date: NaiveDate,
    /// Whether the run is still alive (last activity today or yesterday).
    pub is_active: bool,
    /// When a milestone bonus was last claimed.
    pub bonus_claimed_at: Option<DateTime<Utc>>,
    /// Milestone counts already claimed during the current run.
    #[serde(default)]
    pub claimed_milestones: BTreeSet<u32>,
}

impl Streak {
    /// Creates a streak for a first activity on `today`.
    #[must_use]
    pub fn start(user_id: UserId, streak_type: StreakType, today: NaiveDate) -> Self {
        Self {
            user_id,
            streak_type,
            current_count: 1,
            best_count: 1,
            last_activity_date: today,
            is_active: true,
            bonus_claimed_at: None,
            claimed_milestones: BTreeSet::new(),
        }
    }

    /// Applies an activity on `today` and reports the transition.
    ///
    /// A last activity date after `today` (clock skew, timezone change)
    /// is treated like a gap.
    pub fn record_activity(&mut self, today: NaiveDate) -> StreakTransition {
        if self.last_activity_date == today {
            return StreakTransition::AlreadyRecorded;
        }

        let transition = if today.pred_opt() == Some(self.last_activity_date) {
            self.current_count = self.current_count.saturating_add(1);
            StreakTransition::Continued
        } else {
            let previous_count = self.current_count;
            self.current_count = 1;
            self.claimed_milestones.clear();
            StreakTransition::Reset { previous_count }
        };

        self.best_count = self.best_count.max(self.current_count);
        self.last_activity_date = today;
        self.is_active = true;
        transition
    }

    /// Returns `true` if the run is still alive as of `today`.
    #[must_use]
    pub fn is_alive_on(&self, today: NaiveDate) -> bool {
        self.last_activity_date == today || today.pred_opt() == Some(self.last_activity_date)
    }

    /// Recomputes `is_active` against `today`.
    pub fn refresh(&mut self, today: NaiveDate) {
        self.is_active = self.is_alive_on(today);
    }

    /// Returns `true` if the current count is a positive multiple of 7.
    #[must_use]
    pub const fn is_at_milestone(&self) -> bool {
        self.current_count > 0 && self.current_count % MILESTONE_INTERVAL == 0
    }

    /// Smallest multiple of 7 strictly greater than the current count.
    #[must_use]
    pub const fn next_milestone(&self) -> u32 {
        (self.current_count / MILESTONE_INTERVAL + 1).saturating_mul(MILESTONE_INTERVAL)
    }

    /// Returns `true` if the current milestone's bonus has not been claimed
    /// during this run.
    #[must_use]
    pub fn can_claim_bonus(&self) -> bool {
        self.is_at_milestone() && !self.claimed_milestones.contains(&self.current_count)
    }

    /// Bonus XP offered if the streak sits on a milestone, zero otherwise.
    #[must_use]
    pub fn milestone_bonus(&self) -> u64 {
        if self.is_at_milestone() {
            bonus_xp_for(self.current_count)
        } else {
            0
        }
    }

    /// Marks the current milestone as claimed and returns its bonus.
    ///
    /// Returns `None` when [`Self::can_claim_bonus`] is false.
    pub fn claim_bonus(&mut self, now: DateTime<Utc>) -> Option<u64> {
        if !self.can_claim_bonus() {
            return None;
        }
        self.claimed_milestones.insert(self.current_count);
        self.bonus_claimed_at = Some(now);
        Some(bonus_xp_for(self.current_count))
    }
}

/// Bonus XP for a streak of `count` days. Non-decreasing in `count`.
#[must_use]
pub fn bonus_xp_for(count: u32) -> u64 {
    *BONUS_TIERS.lookup(u64::from(count))
}

/// Celebration message for reaching a streak of `count` days.
#[must_use]
pub fn milestone_message(count: u32) -> &'static str {
    MILESTONE_MESSAGES.lookup(u64::from(count))
}
