//! Immutable achievement catalog snapshot.
//!
//! The catalog is loaded once at startup (built-in or from a JSON file),
//! validated, and shared as `Arc<AchievementCatalog>`. Evaluation never
//! reaches for a global list.

use std::collections::HashSet;
use std::path::Path;

use super::achievement::{Achievement, Criterion, Metric, Rarity};
use super::StreakType;
use crate::error::GamificationError;

/// Validated, read-only list of achievements.
#[derive(Debug, Clone)]
pub struct AchievementCatalog {
    achievements: Vec<Achievement>,
}

impl AchievementCatalog {
    /// Builds a catalog after validating it.
    ///
    /// # Errors
    ///
    /// Returns [`GamificationError::InvalidCatalog`] if two entries share an
    /// id, an id is blank, or a criterion contains an empty composite.
    pub fn new(achievements: Vec<Achievement>) -> Result<Self, GamificationError> {
        let mut seen = HashSet::with_capacity(achievements.len());
        for a in &achievements {
            if a.id.trim().is_empty() {
                return Err(GamificationError::InvalidCatalog(
                    "achievement id must not be blank".to_string(),
                ));
            }
            if !seen.insert(a.id.as_str()) {
                return Err(GamificationError::InvalidCatalog(format!(
                    "duplicate achievement id {}",
                    a.id
                )));
            }
            if !a.criteria.is_well_formed() {
                return Err(GamificationError::InvalidCatalog(format!(
                    "achievement {} has an empty composite criterion",
                    a.id
                )));
            }
        }
        Ok(Self { achievements })
    }

    /// Parses and validates a JSON array of achievements.
    ///
    /// # Errors
    ///
    /// Returns [`GamificationError::InvalidCatalog`] on malformed JSON or a
    /// failed validation.
    pub fn from_json_str(json: &str) -> Result<Self, GamificationError> {
        let achievements: Vec<Achievement> = serde_json::from_str(json)
            .map_err(|e| GamificationError::InvalidCatalog(e.to_string()))?;
        Self::new(achievements)
    }

    /// Reads a catalog from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns [`GamificationError::InvalidCatalog`] if the file cannot be
    /// read or does not hold a valid catalog.
    pub fn from_json_file(path: &Path) -> Result<Self, GamificationError> {
        let json = std::fs::read_to_string(path).map_err(|e| {
            GamificationError::InvalidCatalog(format!("{}: {e}", path.display()))
        })?;
        Self::from_json_str(&json)
    }

    /// Every entry, active or not.
    #[must_use]
    pub fn all(&self) -> &[Achievement] {
        &self.achievements
    }

    /// Entries that can still be unlocked.
    pub fn active(&self) -> impl Iterator<Item = &Achievement> {
        self.achievements.iter().filter(|a| a.is_active)
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.achievements.len()
    }

    /// Returns `true` if the catalog has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.achievements.is_empty()
    }

    /// The catalog shipped with the engine.
    #[must_use]
    pub fn builtin() -> Self {
        Self {
            achievements: builtin_achievements(),
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn entry(
    id: &str,
    name: &str,
    description: &str,
    icon: &str,
    color: &str,
    achievement_type: &str,
    criteria: Criterion,
    points: u64,
    rarity: Rarity,
) -> Achievement {
    Achievement {
        id: id.to_string(),
        name: name.to_string(),
        description: description.to_string(),
        icon: icon.to_string(),
        color: color.to_string(),
        achievement_type: achievement_type.to_string(),
        criteria,
        points,
        rarity,
        is_active: true,
    }
}

fn builtin_achievements() -> Vec<Achievement> {
    use Metric::{BestStreak, Categories, GoalsCompleted, GoalsCreated, Level, Transactions};

    vec![
        entry(
            "first_transaction",
            "First Steps",
            "Record your first transaction.",
            "receipt",
            "#4CAF50",
            "transactions",
            Criterion::min(Transactions, 1),
            10,
            Rarity::Common,
        ),
        entry(
            "bookkeeper",
            "Bookkeeper",
            "Record 50 transactions.",
            "book",
            "#2196F3",
            "transactions",
            Criterion::min(Transactions, 50),
            50,
            Rarity::Rare,
        ),
        entry(
            "ledger_master",
            "Ledger Master",
            "Record 500 transactions.",
            "library",
            "#673AB7",
            "transactions",
            Criterion::min(Transactions, 500),
            200,
            Rarity::Epic,
        ),
        entry(
            "dreamer",
            "Dreamer",
            "Create your first financial goal.",
            "star",
            "#FFC107",
            "goals",
            Criterion::min(GoalsCreated, 1),
            10,
            Rarity::Common,
        ),
        entry(
            "goal_getter",
            "Goal Getter",
            "Complete a financial goal.",
            "flag",
            "#FF9800",
            "goals",
            Criterion::min(GoalsCompleted, 1),
            50,
            Rarity::Common,
        ),
        entry(
            "dream_achiever",
            "Dream Achiever",
            "Complete 10 financial goals.",
            "trophy",
            "#E91E63",
            "goals",
            Criterion::min(GoalsCompleted, 10),
            250,
            Rarity::Epic,
        ),
        entry(
            "organizer",
            "Organizer",
            "Create 5 budget categories.",
            "folder",
            "#009688",
            "categories",
            Criterion::min(Categories, 5),
            25,
            Rarity::Common,
        ),
        entry(
            "week_warrior",
            "Week Warrior",
            "Log in 7 days in a row.",
            "flame",
            "#FF5722",
            "streaks",
            Criterion::min(BestStreak(StreakType::DailyLogin), 7),
            50,
            Rarity::Rare,
        ),
        entry(
            "monthly_devotee",
            "Monthly Devotee",
            "Log in 30 days in a row.",
            "calendar",
            "#F44336",
            "streaks",
            Criterion::min(BestStreak(StreakType::DailyLogin), 30),
            150,
            Rarity::Epic,
        ),
        entry(
            "unbreakable",
            "Unbreakable",
            "Record transactions 100 days in a row.",
            "shield",
            "#9C27B0",
            "streaks",
            Criterion::min(BestStreak(StreakType::DailyTransaction), 100),
            500,
            Rarity::Legendary,
        ),
        entry(
            "saver",
            "Saver",
            "Save three months in a row or complete three goals.",
            "piggy-bank",
            "#8BC34A",
            "savings",
            Criterion::AnyOf {
                criteria: vec![
                    Criterion::min(BestStreak(StreakType::MonthlySaving), 3),
                    Criterion::min(GoalsCompleted, 3),
                ],
            },
            75,
            Rarity::Rare,
        ),
        entry(
            "rising_star",
            "Rising Star",
            "Reach level 10.",
            "rocket",
            "#03A9F4",
            "levels",
            Criterion::min(Level, 10),
            100,
            Rarity::Rare,
        ),
        entry(
            "finance_legend",
            "Finance Legend",
            "Reach level 50 with 1000 recorded transactions.",
            "crown",
            "#FFD700",
            "levels",
            Criterion::AllOf {
                criteria: vec![
                    Criterion::min(Level, 50),
                    Criterion::min(Transactions, 1_000),
                ],
            },
            1_000,
            Rarity::Legendary,
        ),
    ]
}
