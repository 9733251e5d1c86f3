//! Host-application events that feed the engine.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{StreakType, XpReason};
use crate::error::GamificationError;

/// Qualifying action reported by the host application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GamificationEvent {
    /// A transaction was recorded (manually or by bank sync).
    TransactionCreated,
    /// A goal was created.
    GoalCreated,
    /// Progress was logged against a goal.
    GoalProgressUpdated,
    /// A goal reached its target.
    GoalCompleted,
    /// A category was created.
    CategoryCreated,
    /// The user logged in.
    Login,
}

impl GamificationEvent {
    /// Every event type, in declaration order.
    pub const ALL: [Self; 6] = [
        Self::TransactionCreated,
        Self::GoalCreated,
        Self::GoalProgressUpdated,
        Self::GoalCompleted,
        Self::CategoryCreated,
        Self::Login,
    ];

    /// Returns the snake_case wire name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::TransactionCreated => "transaction_created",
            Self::GoalCreated => "goal_created",
            Self::GoalProgressUpdated => "goal_progress_updated",
            Self::GoalCompleted => "goal_completed",
            Self::CategoryCreated => "category_created",
            Self::Login => "login",
        }
    }

    /// Streak advanced by this event, if any.
    #[must_use]
    pub const fn streak_type(self) -> Option<StreakType> {
        match self {
            Self::TransactionCreated => Some(StreakType::DailyTransaction),
            Self::Login => Some(StreakType::DailyLogin),
            Self::GoalCreated
            | Self::GoalProgressUpdated
            | Self::GoalCompleted
            | Self::CategoryCreated => None,
        }
    }

    /// XP reason for the standard reward of this event.
    ///
    /// Logins are rewarded through the daily-login streak instead, so that
    /// repeated logins on one day earn nothing.
    #[must_use]
    pub const fn xp_reason(self) -> Option<XpReason> {
        match self {
            Self::TransactionCreated => Some(XpReason::TransactionCreated),
            Self::GoalCreated => Some(XpReason::GoalCreated),
            Self::GoalProgressUpdated => Some(XpReason::GoalProgress),
            Self::GoalCompleted => Some(XpReason::GoalCompleted),
            Self::CategoryCreated => Some(XpReason::CategoryCreated),
            Self::Login => None,
        }
    }
}

impl fmt::Display for GamificationEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GamificationEvent {
    type Err = GamificationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|e| e.as_str() == s)
            .ok_or_else(|| GamificationError::UnknownEventType(s.to_string()))
    }
}

/// Optional details the host attaches to an event.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventContext {
    /// Host-side entity id (transaction, goal, category).
    pub reference_id: Option<Uuid>,
    /// When the action happened, if different from "now".
    pub occurred_at: Option<DateTime<Utc>>,
}

impl EventContext {
    /// Context pointing at a host-side entity.
    #[must_use]
    pub fn for_reference(reference_id: Uuid) -> Self {
        Self {
            reference_id: Some(reference_id),
            occurred_at: None,
        }
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn parses_every_wire_name() {
        for event in GamificationEvent::ALL {
            let Ok(parsed) = event.as_str().parse::<GamificationEvent>() else {
                panic!("{event} should parse");
            };
            assert_eq!(parsed, event);
        }
    }

    #[test]
    fn unknown_event_is_rejected() {
        let Err(err) = "account_linked".parse::<GamificationEvent>() else {
            panic!("unknown event must not parse");
        };
        assert_eq!(err.error_code(), 1003);
    }

    #[test]
    fn only_transactions_and_logins_drive_streaks() {
        let driving: Vec<_> = GamificationEvent::ALL
            .into_iter()
            .filter_map(GamificationEvent::streak_type)
            .collect();
        assert_eq!(
            driving,
            vec![StreakType::DailyTransaction, StreakType::DailyLogin]
        );
    }

    #[test]
    fn serde_uses_snake_case() {
        let json = serde_json::to_string(&GamificationEvent::GoalProgressUpdated)
            .unwrap_or_default();
        assert_eq!(json, "\"goal_progress_updated\"");
    }
}
