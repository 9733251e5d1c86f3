//! Gamification service: streaks, XP and achievements for one user at a
//! time.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::domain::{
    AchievementCatalog, Clock, EventContext, GamificationEvent, LevelProgress, Notification,
    NotificationBus, Streak, StreakTransition, StreakType, SystemClock, UserAchievement, UserId,
    UserLevel, UserStats, XpEvent, XpReason, level_up_message, streak,
};
use crate::error::GamificationError;
use crate::persistence::{EngagementCounters, GamificationStore, StatsProvider};

use super::engagement::EngagementTracker;
use super::results::{
    BonusClaim, EventOutcome, LevelResult, Profile, StreakResult, UnlockResult,
};

/// Message returned when a streak was already advanced today.
pub const ALREADY_RECORDED_TODAY: &str = "already recorded today";

/// Orchestration layer for the gamification engine.
///
/// Every mutation follows the same pattern: load the user's record →
/// apply the pure domain rule → save → publish notifications → return the
/// result. No lock is held across calls; two triggers racing for the same
/// user and day may both count.
#[derive(Debug)]
pub struct GamificationService {
    store: Arc<dyn GamificationStore>,
    stats: Arc<dyn StatsProvider>,
    catalog: Arc<AchievementCatalog>,
    notifications: NotificationBus,
    engagement: EngagementTracker,
    clock: Arc<dyn Clock>,
}

impl GamificationService {
    /// Creates a service on the system clock, flushing engagement counters
    /// every 10 events.
    #[must_use]
    pub fn new(
        store: Arc<dyn GamificationStore>,
        stats: Arc<dyn StatsProvider>,
        catalog: Arc<AchievementCatalog>,
        notifications: NotificationBus,
    ) -> Self {
        let engagement = EngagementTracker::new(Arc::clone(&store), 10);
        Self {
            store,
            stats,
            catalog,
            notifications,
            engagement,
            clock: Arc::new(SystemClock),
        }
    }

    /// Replaces the clock.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Changes how many events are buffered per user before the engagement
    /// counters are written.
    #[must_use]
    pub fn with_engagement_flush_every(mut self, flush_every: u64) -> Self {
        self.engagement = EngagementTracker::new(Arc::clone(&self.store), flush_every);
        self
    }

    /// Returns a reference to the inner [`NotificationBus`].
    #[must_use]
    pub fn notifications(&self) -> &NotificationBus {
        &self.notifications
    }

    /// Returns the achievement catalog snapshot.
    #[must_use]
    pub fn catalog(&self) -> &Arc<AchievementCatalog> {
        &self.catalog
    }

    /// Returns the engagement tracker.
    #[must_use]
    pub fn engagement(&self) -> &EngagementTracker {
        &self.engagement
    }

    /// Advances a user's streak for today.
    ///
    /// A second trigger on the same day returns `success = false` and
    /// changes nothing.
    ///
    /// # Errors
    ///
    /// Returns [`GamificationError::Store`] if the streak cannot be read
    /// or written.
    pub async fn trigger_streak(
        &self,
        user_id: UserId,
        streak_type: StreakType,
    ) -> Result<StreakResult, GamificationError> {
        let today = self.clock.today();
        let (streak, transition) = match self.store.load_streak(user_id, streak_type).await? {
            Some(mut streak) => {
                let transition = streak.record_activity(today);
                (streak, transition)
            }
            None => (
                Streak::start(user_id, streak_type, today),
                StreakTransition::Started,
            ),
        };

        if !transition.is_recorded() {
            tracing::debug!(%user_id, %streak_type, "streak already recorded today");
            return Ok(StreakResult {
                success: false,
                bonus_xp: 0,
                can_claim_bonus: streak.can_claim_bonus(),
                next_milestone: streak.next_milestone(),
                message: ALREADY_RECORDED_TODAY.to_string(),
                transition,
                streak,
            });
        }

        self.store.save_streak(&streak).await?;

        let now = self.clock.now();
        let bonus_xp = streak.milestone_bonus();
        let message = if streak.is_at_milestone() {
            streak::milestone_message(streak.current_count).to_string()
        } else {
            match transition {
                StreakTransition::Started => "Streak started. Come back tomorrow!".to_string(),
                StreakTransition::Reset { .. } => "Streak restarted at day 1.".to_string(),
                _ => format!("{} days in a row!", streak.current_count),
            }
        };

        let _ = self.notifications.publish(Notification::StreakUpdated {
            user_id,
            streak_type,
            transition,
            current_count: streak.current_count,
            best_count: streak.best_count,
            timestamp: now,
        });
        if streak.is_at_milestone() {
            let _ = self.notifications.publish(Notification::MilestoneReached {
                user_id,
                streak_type,
                milestone: streak.current_count,
                bonus_xp,
                message: message.clone(),
                timestamp: now,
            });
        }

        tracing::info!(
            %user_id,
            %streak_type,
            current = streak.current_count,
            best = streak.best_count,
            ?transition,
            "streak recorded"
        );

        Ok(StreakResult {
            success: true,
            bonus_xp,
            can_claim_bonus: streak.can_claim_bonus(),
            next_milestone: streak.next_milestone(),
            message,
            transition,
            streak,
        })
    }

    /// Claims the bonus of the milestone a streak currently sits on and
    /// credits it as XP.
    ///
    /// Returns `claimed = false` when the streak does not exist, is not on
    /// a milestone, or the milestone was already claimed in this run.
    ///
    /// # Errors
    ///
    /// Returns [`GamificationError::Store`] on persistence failure.
    pub async fn claim_streak_bonus(
        &self,
        user_id: UserId,
        streak_type: StreakType,
    ) -> Result<BonusClaim, GamificationError> {
        let Some(mut streak) = self.store.load_streak(user_id, streak_type).await? else {
            return Ok(BonusClaim::nothing());
        };
        // A milestone from a broken run cannot be claimed.
        if !streak.is_alive_on(self.clock.today()) {
            return Ok(BonusClaim::nothing());
        }
        let now = self.clock.now();
        let Some(bonus_xp) = streak.claim_bonus(now) else {
            return Ok(BonusClaim::nothing());
        };
        let milestone = streak.current_count;

        // Claim is persisted before the credit so a retry cannot pay twice.
        self.store.save_streak(&streak).await?;
        let level = self
            .grant_xp(
                user_id,
                bonus_xp,
                XpReason::StreakBonus {
                    streak_type,
                    milestone,
                },
            )
            .await?;

        let _ = self.notifications.publish(Notification::BonusClaimed {
            user_id,
            streak_type,
            milestone,
            bonus_xp,
            timestamp: now,
        });
        tracing::info!(%user_id, %streak_type, milestone, bonus_xp, "streak bonus claimed");

        Ok(BonusClaim {
            claimed: true,
            milestone: Some(milestone),
            bonus_xp,
            level: Some(level),
        })
    }

    /// Adds XP to a user and recomputes their level.
    ///
    /// Zero is a valid grant that changes nothing.
    ///
    /// # Errors
    ///
    /// Returns [`GamificationError::InvalidAmount`] for negative amounts
    /// and [`GamificationError::Store`] on persistence failure.
    pub async fn add_xp(
        &self,
        user_id: UserId,
        amount: i64,
        reason: XpReason,
    ) -> Result<LevelResult, GamificationError> {
        let amount = u64::try_from(amount).map_err(|_| GamificationError::InvalidAmount(amount))?;
        self.grant_xp(user_id, amount, reason).await
    }

    async fn grant_xp(
        &self,
        user_id: UserId,
        amount: u64,
        reason: XpReason,
    ) -> Result<LevelResult, GamificationError> {
        let mut level = self
            .store
            .load_level(user_id)
            .await?
            .unwrap_or_else(|| UserLevel::new(user_id));
        let previous_level = level.level;
        let now = self.clock.now();
        let levels_gained = level.apply_xp(amount, now);

        let result = LevelResult {
            xp_awarded: amount,
            total_xp: level.total_xp,
            previous_level,
            new_level: level.level,
            levels_gained,
        };
        if amount == 0 {
            return Ok(result);
        }

        self.store.save_level(&level).await?;
        self.store
            .append_xp_event(&XpEvent {
                id: uuid::Uuid::new_v4(),
                user_id,
                amount,
                reason: reason.clone(),
                total_after: level.total_xp,
                level_after: level.level,
                created_at: now,
            })
            .await?;

        if levels_gained > 0 {
            let _ = self.notifications.publish(Notification::LevelUp {
                user_id,
                new_level: level.level,
                levels_gained,
                total_xp: level.total_xp,
                message: level_up_message(level.level).to_string(),
                timestamp: now,
            });
            tracing::info!(%user_id, new_level = level.level, levels_gained, "level up");
        }
        tracing::debug!(%user_id, amount, reason = reason.label(), total = level.total_xp, "xp granted");

        Ok(result)
    }

    /// Unlocks every active achievement the user now qualifies for and does
    /// not hold yet, crediting each one's points as XP.
    ///
    /// Points credited by one unlock can qualify the user for level-based
    /// achievements, so evaluation repeats until nothing new unlocks.
    ///
    /// # Errors
    ///
    /// Returns [`GamificationError::Stats`] if the host counts cannot be
    /// read and [`GamificationError::Store`] on persistence failure.
    pub async fn evaluate_achievements(
        &self,
        user_id: UserId,
        event: GamificationEvent,
        context: &EventContext,
    ) -> Result<UnlockResult, GamificationError> {
        let mut held = self.store.unlocked_achievement_ids(user_id).await?;
        let mut stats = self.user_stats(user_id).await?;
        let mut result = UnlockResult::default();

        loop {
            let candidates: Vec<_> = self
                .catalog
                .active()
                .filter(|a| !held.contains(&a.id) && a.criteria.is_satisfied(&stats))
                .cloned()
                .collect();
            if candidates.is_empty() {
                break;
            }

            for achievement in candidates {
                held.insert(achievement.id.clone());
                let unlock = UserAchievement {
                    user_id,
                    achievement_id: achievement.id.clone(),
                    unlocked_at: context.occurred_at.unwrap_or_else(|| self.clock.now()),
                    triggered_by: event,
                    reference_id: context.reference_id,
                };
                if !self.store.record_unlock(&unlock).await? {
                    // Unlocked by a concurrent evaluation.
                    continue;
                }

                let level = self
                    .grant_xp(
                        user_id,
                        achievement.points,
                        XpReason::Achievement {
                            achievement_id: achievement.id.clone(),
                        },
                    )
                    .await?;
                stats.level = level.new_level;
                stats.total_xp = level.total_xp;
                result.xp_awarded = result.xp_awarded.saturating_add(achievement.points);
                result.level = Some(level);

                let _ = self.notifications.publish(Notification::AchievementUnlocked {
                    user_id,
                    achievement_id: achievement.id.clone(),
                    name: achievement.name.clone(),
                    points: achievement.points,
                    rarity: achievement.rarity,
                    timestamp: unlock.unlocked_at,
                });
                tracing::info!(
                    %user_id,
                    achievement = %achievement.id,
                    %event,
                    points = achievement.points,
                    "achievement unlocked"
                );
                result.newly_unlocked.push(achievement);
            }
        }

        Ok(result)
    }

    /// Records a host event end to end: streak trigger, standard XP reward,
    /// achievement evaluation, then engagement counters.
    ///
    /// A login earns the daily login reward only when it advances the
    /// login streak, so repeated logins on one day earn nothing. An event
    /// that fails part way is not counted as engagement.
    ///
    /// # Errors
    ///
    /// Propagates store and stats failures from the underlying operations.
    pub async fn record_event(
        &self,
        user_id: UserId,
        event: GamificationEvent,
        context: &EventContext,
    ) -> Result<EventOutcome, GamificationError> {
        let streak = match event.streak_type() {
            Some(streak_type) => Some(self.trigger_streak(user_id, streak_type).await?),
            None => None,
        };

        let reward = match (event, &streak) {
            (GamificationEvent::Login, Some(s)) if s.success => Some(XpReason::DailyLogin),
            _ => event.xp_reason(),
        };
        let xp = match reward {
            Some(reason) => {
                let amount = reason.standard_amount().unwrap_or(0);
                Some(self.grant_xp(user_id, amount, reason).await?)
            }
            None => None,
        };

        let achievements = self.evaluate_achievements(user_id, event, context).await?;
        let _ = self.engagement.record(user_id, event).await;

        Ok(EventOutcome {
            event,
            xp,
            streak,
            achievements,
        })
    }

    /// Parses string inputs and records the event.
    ///
    /// # Errors
    ///
    /// Returns [`GamificationError::UnknownEventType`] for an unknown event
    /// name, otherwise as [`Self::record_event`].
    pub async fn record_event_named(
        &self,
        user_id: UserId,
        event: &str,
        context: &EventContext,
    ) -> Result<EventOutcome, GamificationError> {
        let event: GamificationEvent = event.parse()?;
        self.record_event(user_id, event, context).await
    }

    /// Parses a streak type name and triggers the streak.
    ///
    /// # Errors
    ///
    /// Returns [`GamificationError::UnknownStreakType`] for an unknown
    /// name, otherwise as [`Self::trigger_streak`].
    pub async fn trigger_streak_named(
        &self,
        user_id: UserId,
        streak_type: &str,
    ) -> Result<StreakResult, GamificationError> {
        let streak_type: StreakType = streak_type.parse()?;
        self.trigger_streak(user_id, streak_type).await
    }

    /// A user's streaks with `is_active` recomputed for today.
    ///
    /// # Errors
    ///
    /// Returns [`GamificationError::Store`] on persistence failure.
    pub async fn streaks(&self, user_id: UserId) -> Result<Vec<Streak>, GamificationError> {
        let today = self.clock.today();
        let mut streaks = self.store.load_streaks(user_id).await?;
        for streak in &mut streaks {
            streak.refresh(today);
        }
        Ok(streaks)
    }

    /// Most recent XP grants of a user, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`GamificationError::Store`] on persistence failure.
    pub async fn xp_history(
        &self,
        user_id: UserId,
        limit: usize,
    ) -> Result<Vec<XpEvent>, GamificationError> {
        self.store.xp_history(user_id, limit).await
    }

    /// Level, streaks, achievements and engagement of a user.
    ///
    /// # Errors
    ///
    /// Returns [`GamificationError::Store`] on persistence failure.
    pub async fn profile(&self, user_id: UserId) -> Result<Profile, GamificationError> {
        let total_xp = self
            .store
            .load_level(user_id)
            .await?
            .map_or(0, |level| level.total_xp);
        let streaks = self.streaks(user_id).await?;
        let mut achievements: Vec<String> = self
            .store
            .unlocked_achievement_ids(user_id)
            .await?
            .into_iter()
            .collect();
        achievements.sort();

        let mut engagement = self
            .store
            .load_engagement(user_id)
            .await?
            .unwrap_or_else(|| EngagementCounters::new(user_id));
        if let Some(pending) = self.engagement.pending_for(user_id).await {
            engagement.merge(&pending);
        }

        Ok(Profile {
            user_id,
            progress: LevelProgress::for_xp(total_xp),
            streaks,
            achievements,
            engagement,
        })
    }

    async fn user_stats(&self, user_id: UserId) -> Result<UserStats, GamificationError> {
        let counts = self.stats.activity_counts(user_id).await?;
        let level = self
            .store
            .load_level(user_id)
            .await?
            .unwrap_or_else(|| UserLevel::new(user_id));
        let best_streaks: BTreeMap<StreakType, u32> = self
            .store
            .load_streaks(user_id)
            .await?
            .into_iter()
            .map(|s| (s.streak_type, s.best_count))
            .collect();

        Ok(UserStats {
            counts,
            level: level.level,
            total_xp: level.total_xp,
            best_streaks,
        })
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::domain::{ActivityCounts, FixedClock, streak::bonus_xp_for};
    use crate::persistence::MemoryStore;
    use crate::persistence::failing::FailingStore;
    use chrono::NaiveDate;

    struct Harness {
        store: Arc<MemoryStore>,
        clock: Arc<FixedClock>,
        service: GamificationService,
    }

    fn start_date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 1).unwrap_or_default()
    }

    fn harness() -> Harness {
        let store = Arc::new(MemoryStore::new());
        let clock = Arc::new(FixedClock::new(start_date()));
        let service = GamificationService::new(
            Arc::clone(&store) as _,
            Arc::clone(&store) as _,
            Arc::new(AchievementCatalog::builtin()),
            NotificationBus::new(256),
        )
        .with_clock(Arc::clone(&clock) as _);
        Harness {
            store,
            clock,
            service,
        }
    }

    async fn seed_streak(h: &Harness, user: UserId, count: u32, best: u32, last: NaiveDate) {
        let streak = Streak {
            current_count: count,
            best_count: best,
            ..Streak::start(user, StreakType::DailyLogin, last)
        };
        let Ok(()) = h.store.save_streak(&streak).await else {
            panic!("seed streak");
        };
    }

    #[tokio::test]
    async fn first_trigger_creates_streak() {
        let h = harness();
        let user = UserId::new();
        let Ok(result) = h.service.trigger_streak(user, StreakType::DailyLogin).await else {
            panic!("trigger failed");
        };
        assert!(result.success);
        assert_eq!(result.transition, StreakTransition::Started);
        assert_eq!(result.streak.current_count, 1);
        assert_eq!(result.streak.best_count, 1);
        assert_eq!(result.streak.last_activity_date, start_date());
        assert_eq!(result.next_milestone, 7);
    }

    #[tokio::test]
    async fn second_trigger_same_day_is_rejected() {
        let h = harness();
        let user = UserId::new();
        let _ = h.service.trigger_streak(user, StreakType::DailyLogin).await;
        let Ok(second) = h.service.trigger_streak(user, StreakType::DailyLogin).await else {
            panic!("trigger failed");
        };
        assert!(!second.success);
        assert_eq!(second.message, ALREADY_RECORDED_TODAY);
        assert_eq!(second.streak.current_count, 1);
    }

    #[tokio::test]
    async fn next_day_increments_and_gap_resets() {
        let h = harness();
        let user = UserId::new();
        let _ = h.service.trigger_streak(user, StreakType::DailyTransaction).await;
        h.clock.advance_days(1);
        let Ok(next) = h.service.trigger_streak(user, StreakType::DailyTransaction).await else {
            panic!("trigger failed");
        };
        assert_eq!(next.streak.current_count, 2);

        h.clock.advance_days(3);
        let Ok(after_gap) = h.service.trigger_streak(user, StreakType::DailyTransaction).await
        else {
            panic!("trigger failed");
        };
        assert_eq!(after_gap.streak.current_count, 1);
        assert_eq!(after_gap.streak.best_count, 2);
        assert_eq!(
            after_gap.transition,
            StreakTransition::Reset { previous_count: 2 }
        );
    }

    #[tokio::test]
    async fn seventh_day_reaches_milestone_with_bonus() {
        let h = harness();
        let user = UserId::new();
        let mut rx = h.service.notifications().subscribe();
        seed_streak(&h, user, 6, 6, start_date().pred_opt().unwrap_or_default()).await;

        let Ok(result) = h.service.trigger_streak(user, StreakType::DailyLogin).await else {
            panic!("trigger failed");
        };
        assert_eq!(result.streak.current_count, 7);
        assert!(result.streak.is_at_milestone());
        assert!(result.can_claim_bonus);
        assert_eq!(result.bonus_xp, bonus_xp_for(7));
        assert!(result.bonus_xp > 0);

        let (Ok(first), Ok(second)) = (rx.recv().await, rx.recv().await) else {
            panic!("expected two notifications");
        };
        assert_eq!(first.kind_str(), "streak_updated");
        assert_eq!(second.kind_str(), "milestone_reached");
    }

    #[tokio::test]
    async fn reset_keeps_best_count() {
        let h = harness();
        let user = UserId::new();
        let two_days_ago = start_date() - chrono::Duration::days(2);
        seed_streak(&h, user, 10, 10, two_days_ago).await;

        let Ok(result) = h.service.trigger_streak(user, StreakType::DailyLogin).await else {
            panic!("trigger failed");
        };
        assert!(result.success);
        assert_eq!(result.streak.current_count, 1);
        assert_eq!(result.streak.best_count, 10);
    }

    #[tokio::test]
    async fn bonus_claim_credits_xp_once() {
        let h = harness();
        let user = UserId::new();
        seed_streak(&h, user, 6, 6, start_date().pred_opt().unwrap_or_default()).await;
        let _ = h.service.trigger_streak(user, StreakType::DailyLogin).await;

        let Ok(claim) = h.service.claim_streak_bonus(user, StreakType::DailyLogin).await else {
            panic!("claim failed");
        };
        assert!(claim.claimed);
        assert_eq!(claim.milestone, Some(7));
        let Some(level) = claim.level else {
            panic!("claim should credit xp");
        };
        assert_eq!(level.total_xp, bonus_xp_for(7));

        let Ok(again) = h.service.claim_streak_bonus(user, StreakType::DailyLogin).await else {
            panic!("claim failed");
        };
        assert!(!again.claimed);
        assert_eq!(again.bonus_xp, 0);
    }

    #[tokio::test]
    async fn claim_without_milestone_is_a_non_event() {
        let h = harness();
        let user = UserId::new();
        let Ok(claim) = h.service.claim_streak_bonus(user, StreakType::WeeklyBudget).await else {
            panic!("claim failed");
        };
        assert_eq!(claim, BonusClaim::nothing());
    }

    #[tokio::test]
    async fn stale_milestone_cannot_be_claimed() {
        let h = harness();
        let user = UserId::new();
        seed_streak(&h, user, 7, 7, start_date() - chrono::Duration::days(3)).await;
        let Ok(claim) = h.service.claim_streak_bonus(user, StreakType::DailyLogin).await else {
            panic!("claim failed");
        };
        assert!(!claim.claimed);
    }

    #[tokio::test]
    async fn add_xp_levels_up_across_thresholds() {
        let h = harness();
        let user = UserId::new();
        let mut rx = h.service.notifications().subscribe();
        let Ok(result) = h
            .service
            .add_xp(user, 250, XpReason::Manual { note: "test".to_string() })
            .await
        else {
            panic!("add_xp failed");
        };
        assert_eq!(result.previous_level, 1);
        assert_eq!(result.new_level, 3);
        assert_eq!(result.levels_gained, 2);
        assert_eq!(result.total_xp, 250);

        let Ok(n) = rx.recv().await else {
            panic!("expected level up");
        };
        assert_eq!(n.kind_str(), "level_up");
    }

    #[tokio::test]
    async fn add_zero_xp_is_a_no_op() {
        let h = harness();
        let user = UserId::new();
        let _ = h.service.add_xp(user, 150, XpReason::GoalCompleted).await;
        let Ok(result) = h.service.add_xp(user, 0, XpReason::GoalProgress).await else {
            panic!("zero grant failed");
        };
        assert_eq!(result.levels_gained, 0);
        assert_eq!(result.new_level, result.previous_level);
        let history = h.service.xp_history(user, 10).await.unwrap_or_default();
        assert_eq!(history.len(), 1);
    }

    #[tokio::test]
    async fn negative_xp_is_rejected() {
        let h = harness();
        let result = h
            .service
            .add_xp(UserId::new(), -1, XpReason::TransactionCreated)
            .await;
        assert!(matches!(result, Err(GamificationError::InvalidAmount(-1))));
    }

    #[tokio::test]
    async fn evaluation_is_idempotent() {
        let h = harness();
        let user = UserId::new();
        h.store
            .set_activity_counts(
                user,
                ActivityCounts {
                    transactions: 1,
                    ..ActivityCounts::default()
                },
            )
            .await;
        let ctx = EventContext::default();

        let Ok(first) = h
            .service
            .evaluate_achievements(user, GamificationEvent::TransactionCreated, &ctx)
            .await
        else {
            panic!("evaluation failed");
        };
        let ids: Vec<&str> = first.newly_unlocked.iter().map(|a| a.id.as_str()).collect();
        assert_eq!(ids, vec!["first_transaction"]);
        assert_eq!(first.xp_awarded, 10);

        let Ok(second) = h
            .service
            .evaluate_achievements(user, GamificationEvent::TransactionCreated, &ctx)
            .await
        else {
            panic!("evaluation failed");
        };
        assert!(second.is_empty());
        assert_eq!(second.xp_awarded, 0);
    }

    #[tokio::test]
    async fn unlock_points_can_cascade_into_level_achievements() {
        let h = harness();
        let user = UserId::new();
        // Level 10 needs 1 620 XP; start just below it.
        let _ = h
            .service
            .add_xp(user, 1_615, XpReason::Manual { note: "import".to_string() })
            .await;
        h.store
            .set_activity_counts(
                user,
                ActivityCounts {
                    transactions: 1,
                    ..ActivityCounts::default()
                },
            )
            .await;

        let Ok(result) = h
            .service
            .evaluate_achievements(user, GamificationEvent::TransactionCreated, &EventContext::default())
            .await
        else {
            panic!("evaluation failed");
        };
        let ids: Vec<&str> = result.newly_unlocked.iter().map(|a| a.id.as_str()).collect();
        assert_eq!(ids, vec!["first_transaction", "rising_star"]);
    }

    #[tokio::test]
    async fn login_event_rewards_only_first_login_of_the_day() {
        let h = harness();
        let user = UserId::new();
        let ctx = EventContext::default();

        let Ok(first) = h.service.record_event(user, GamificationEvent::Login, &ctx).await else {
            panic!("record failed");
        };
        assert_eq!(first.xp.map(|x| x.xp_awarded), Some(5));

        let Ok(second) = h.service.record_event(user, GamificationEvent::Login, &ctx).await else {
            panic!("record failed");
        };
        assert!(second.xp.is_none());
        assert!(second.streak.is_some_and(|s| !s.success));
    }

    #[tokio::test]
    async fn named_inputs_are_validated() {
        let h = harness();
        let user = UserId::new();
        assert!(matches!(
            h.service.trigger_streak_named(user, "yearly").await,
            Err(GamificationError::UnknownStreakType(_))
        ));
        assert!(matches!(
            h.service
                .record_event_named(user, "bank_synced", &EventContext::default())
                .await,
            Err(GamificationError::UnknownEventType(_))
        ));
    }

    #[tokio::test]
    async fn streaks_report_broken_runs_inactive() {
        let h = harness();
        let user = UserId::new();
        let _ = h.service.trigger_streak(user, StreakType::DailyLogin).await;
        h.clock.advance_days(2);
        let streaks = h.service.streaks(user).await.unwrap_or_default();
        assert_eq!(streaks.len(), 1);
        assert!(streaks.iter().all(|s| !s.is_active));
    }

    #[tokio::test]
    async fn profile_merges_pending_engagement() {
        let h = harness();
        let user = UserId::new();
        let _ = h
            .service
            .record_event(user, GamificationEvent::GoalCreated, &EventContext::default())
            .await;
        let Ok(profile) = h.service.profile(user).await else {
            panic!("profile failed");
        };
        assert_eq!(profile.engagement.goal_updates, 1);
        assert_eq!(profile.progress.total_xp, 20);
        assert!(profile.achievements.is_empty());
    }

    fn failing_service(store: &Arc<FailingStore>) -> GamificationService {
        GamificationService::new(
            Arc::clone(store) as _,
            Arc::clone(store) as _,
            Arc::new(AchievementCatalog::builtin()),
            NotificationBus::new(16),
        )
        .with_clock(Arc::new(FixedClock::new(start_date())))
    }

    #[tokio::test]
    async fn stats_failure_aborts_evaluation() {
        let store = Arc::new(FailingStore::new());
        let service = failing_service(&store);
        let user = UserId::new();
        store
            .inner
            .set_activity_counts(
                user,
                ActivityCounts {
                    transactions: 1,
                    ..ActivityCounts::default()
                },
            )
            .await;
        store.fail_stats(true);

        let result = service
            .evaluate_achievements(user, GamificationEvent::TransactionCreated, &EventContext::default())
            .await;
        let Err(err) = result else {
            panic!("stats failure must propagate");
        };
        assert!(matches!(err, GamificationError::Stats(_)));
        assert!(err.is_retryable());
        assert!(store.inner.unlocks(user).await.is_empty());
        let Ok(None) = store.load_level(user).await else {
            panic!("no xp granted");
        };

        store.fail_stats(false);
        let Ok(retried) = service
            .evaluate_achievements(user, GamificationEvent::TransactionCreated, &EventContext::default())
            .await
        else {
            panic!("evaluation recovers");
        };
        assert_eq!(retried.newly_unlocked.len(), 1);
    }

    #[tokio::test]
    async fn failed_event_is_not_counted_as_engagement() {
        let store = Arc::new(FailingStore::new());
        let service = failing_service(&store);
        let user = UserId::new();
        store.fail_stats(true);

        let result = service
            .record_event(user, GamificationEvent::GoalCreated, &EventContext::default())
            .await;
        assert!(matches!(result, Err(GamificationError::Stats(_))));
        assert!(service.engagement().pending_for(user).await.is_none());

        store.fail_stats(false);
        let Ok(_) = service
            .record_event(user, GamificationEvent::GoalCreated, &EventContext::default())
            .await
        else {
            panic!("record failed");
        };
        let Some(pending) = service.engagement().pending_for(user).await else {
            panic!("successful event is counted");
        };
        assert_eq!(pending.events_total, 1);
    }
}
