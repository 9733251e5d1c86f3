//! Storage-only models that have no role in the rule engine itself.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{GamificationEvent, UserId};

/// Per-user engagement counters.
///
/// The in-memory tracker accumulates a delta of this shape and the store
/// adds it onto the persisted totals on flush.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngagementCounters {
    /// Counter owner.
    pub user_id: UserId,
    /// All recorded events.
    pub events_total: u64,
    /// Login events.
    pub logins: u64,
    /// Transaction events.
    pub transactions: u64,
    /// Goal created / progress / completed events.
    pub goal_updates: u64,
    /// Category events.
    pub categories: u64,
    /// When the counters were last written to the store.
    pub last_flushed_at: Option<DateTime<Utc>>,
}

impl EngagementCounters {
    /// Empty counters for `user_id`.
    #[must_use]
    pub fn new(user_id: UserId) -> Self {
        Self {
            user_id,
            ..Self::default()
        }
    }

    /// Counts one event.
    pub fn record(&mut self, event: GamificationEvent) {
        self.events_total = self.events_total.saturating_add(1);
        let field = match event {
            GamificationEvent::Login => &mut self.logins,
            GamificationEvent::TransactionCreated => &mut self.transactions,
            GamificationEvent::GoalCreated
            | GamificationEvent::GoalProgressUpdated
            | GamificationEvent::GoalCompleted => &mut self.goal_updates,
            GamificationEvent::CategoryCreated => &mut self.categories,
        };
        *field = field.saturating_add(1);
    }

    /// Adds another set of counters onto this one.
    pub fn merge(&mut self, delta: &Self) {
        self.events_total = self.events_total.saturating_add(delta.events_total);
        self.logins = self.logins.saturating_add(delta.logins);
        self.transactions = self.transactions.saturating_add(delta.transactions);
        self.goal_updates = self.goal_updates.saturating_add(delta.goal_updates);
        self.categories = self.categories.saturating_add(delta.categories);
        if delta.last_flushed_at.is_some() {
            self.last_flushed_at = delta.last_flushed_at;
        }
    }
}

/// A persisted notification log row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationRecord {
    /// Auto-increment row id.
    pub id: i64,
    /// Addressee.
    pub user_id: UserId,
    /// Notification kind (e.g. `"level_up"`).
    pub kind: String,
    /// Full notification as JSON.
    pub payload: serde_json::Value,
    /// Server-side creation timestamp.
    pub created_at: DateTime<Utc>,
}
