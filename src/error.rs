//! Engine error types with numeric error codes.
//!
//! [`GamificationError`] is the central error type for the engine. Expected
//! non-events ("already recorded today", "no new achievements") are never
//! errors; they are reported as ordinary result values.

/// Engine error enum.
///
/// # Error Code Ranges
///
/// | Range     | Category                  | Retry?               |
/// |-----------|---------------------------|----------------------|
/// | 1000–1999 | Invalid input             | never with same input|
/// | 3000–3999 | Collaborator / internal   | caller's decision    |
#[derive(Debug, thiserror::Error)]
pub enum GamificationError {
    /// XP grant amount was negative.
    #[error("invalid xp amount {0}: must be a non-negative integer")]
    InvalidAmount(i64),

    /// Streak type string did not match any known streak type.
    #[error("unknown streak type: {0}")]
    UnknownStreakType(String),

    /// Event type string did not match any known gamification event.
    #[error("unknown event type: {0}")]
    UnknownEventType(String),

    /// The achievement catalog failed validation or could not be loaded.
    #[error("invalid achievement catalog: {0}")]
    InvalidCatalog(String),

    /// Store (persistence) failure.
    #[error("store error: {0}")]
    Store(String),

    /// Aggregate statistics could not be read from the host application.
    #[error("stats provider error: {0}")]
    Stats(String),

    /// Internal error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl GamificationError {
    /// Returns the numeric error code for this variant.
    #[must_use]
    pub const fn error_code(&self) -> u32 {
        match self {
            Self::InvalidAmount(_) => 1001,
            Self::UnknownStreakType(_) => 1002,
            Self::UnknownEventType(_) => 1003,
            Self::InvalidCatalog(_) => 1004,
            Self::Internal(_) => 3000,
            Self::Store(_) => 3001,
            Self::Stats(_) => 3002,
        }
    }

    /// Returns `true` if the failure came from a collaborator and the same
    /// call may succeed later.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Store(_) | Self::Stats(_))
    }
}

impl From<sqlx::Error> for GamificationError {
    fn from(err: sqlx::Error) -> Self {
        Self::Store(err.to_string())
    }
}

impl From<serde_json::Error> for GamificationError {
    fn from(err: serde_json::Error) -> Self {
        Self::Internal(format!("json: {err}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_codes_are_in_1000_range() {
        let errors = [
            GamificationError::InvalidAmount(-5),
            GamificationError::UnknownStreakType("hourly".to_string()),
            GamificationError::UnknownEventType("x".to_string()),
            GamificationError::InvalidCatalog("dup".to_string()),
        ];
        for err in &errors {
            assert!((1000..2000).contains(&err.error_code()));
            assert!(!err.is_retryable());
        }
    }

    #[test]
    fn collaborator_failures_are_retryable() {
        assert!(GamificationError::Store("down".to_string()).is_retryable());
        assert!(GamificationError::Stats("timeout".to_string()).is_retryable());
        assert!(!GamificationError::Internal("bug".to_string()).is_retryable());
    }

    #[test]
    fn message_names_the_precondition() {
        let msg = GamificationError::InvalidAmount(-10).to_string();
        assert!(msg.contains("-10"));
        assert!(msg.contains("non-negative"));
    }
}
