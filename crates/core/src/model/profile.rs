use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::model::hearts::{Hearts, MAX_HEARTS};
use crate::model::ids::UserId;
use crate::model::progress::LessonCompletion;

/// Daily activity streak.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Streak {
    pub count: u32,
    pub longest: u32,
    /// A freeze forgives exactly one missed day, then is consumed.
    pub frozen: bool,
    pub last_activity: Option<NaiveDate>,
}

impl Streak {
    /// Registers learning activity on `today`.
    pub fn record_activity(&mut self, today: NaiveDate) {
        let Some(last) = self.last_activity else {
            self.count = 1;
            self.longest = self.longest.max(1);
            self.last_activity = Some(today);
            return;
        };

        match (today - last).num_days() {
            days if days <= 0 => {}
            1 => {
                self.count = self.count.saturating_add(1);
                self.longest = self.longest.max(self.count);
                self.frozen = false;
                self.last_activity = Some(today);
            }
            2 if self.frozen => {
                self.frozen = false;
                self.last_activity = Some(today);
            }
            _ => {
                self.count = 1;
                self.longest = self.longest.max(1);
                self.last_activity = Some(today);
            }
        }
    }
}

/// Authoritative learner resources, as returned by the profile service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LearnerProfile {
    pub user_id: UserId,
    pub hearts: u32,
    pub points: u32,
    pub xp: u32,
    #[serde(default)]
    pub streak: Streak,
    #[serde(default)]
    pub subscription_active: bool,
}

impl LearnerProfile {
    #[must_use]
    pub fn new(user_id: UserId) -> Self {
        Self {
            user_id,
            hearts: MAX_HEARTS,
            points: 0,
            xp: 0,
            streak: Streak::default(),
            subscription_active: false,
        }
    }

    /// Hearts a new session starts with.
    #[must_use]
    pub fn session_hearts(&self) -> Hearts {
        if self.subscription_active {
            Hearts::Unlimited
        } else {
            Hearts::Finite(self.hearts)
        }
    }

    /// Applies a finished lesson: points count as both xp and spendable points,
    /// hearts spent in the session are deducted.
    pub fn apply_completion(&mut self, completion: &LessonCompletion, today: NaiveDate) {
        self.xp = self.xp.saturating_add(completion.points_earned);
        self.points = self.points.saturating_add(completion.points_earned);
        self.hearts = self.hearts.saturating_sub(completion.hearts_used);
        self.streak.record_activity(today);
    }

    pub fn refill_hearts(&mut self) {
        self.hearts = MAX_HEARTS;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, d).unwrap()
    }

    #[test]
    fn first_activity_starts_streak() {
        let mut streak = Streak::default();
        streak.record_activity(day(1));
        assert_eq!(streak.count, 1);
        assert_eq!(streak.longest, 1);
        assert_eq!(streak.last_activity, Some(day(1)));
    }

    #[test]
    fn consecutive_days_extend_streak() {
        let mut streak = Streak::default();
        streak.record_activity(day(1));
        streak.record_activity(day(2));
        streak.record_activity(day(2));
        streak.record_activity(day(3));
        assert_eq!(streak.count, 3);
        assert_eq!(streak.longest, 3);
    }

    #[test]
    fn freeze_covers_one_missed_day() {
        let mut streak = Streak {
            count: 4,
            longest: 4,
            frozen: true,
            last_activity: Some(day(1)),
        };
        streak.record_activity(day(3));
        assert_eq!(streak.count, 4);
        assert!(!streak.frozen);
        assert_eq!(streak.last_activity, Some(day(3)));
    }

    #[test]
    fn gap_resets_streak_but_keeps_longest() {
        let mut streak = Streak {
            count: 6,
            longest: 6,
            frozen: false,
            last_activity: Some(day(1)),
        };
        streak.record_activity(day(5));
        assert_eq!(streak.count, 1);
        assert_eq!(streak.longest, 6);
    }

    #[test]
    fn subscription_grants_unlimited_hearts() {
        let mut profile = LearnerProfile::new(UserId::new(1));
        assert_eq!(profile.session_hearts(), Hearts::Finite(MAX_HEARTS));
        profile.subscription_active = true;
        assert_eq!(profile.session_hearts(), Hearts::Unlimited);
    }

    #[test]
    fn completion_credits_points_and_spends_hearts() {
        let mut profile = LearnerProfile::new(UserId::new(1));
        let completion = LessonCompletion {
            lesson_id: crate::model::LessonId::new(1),
            hearts_used: 2,
            points_earned: 10,
        };
        profile.apply_completion(&completion, day(1));
        assert_eq!(profile.xp, 10);
        assert_eq!(profile.points, 10);
        assert_eq!(profile.hearts, 3);
        assert_eq!(profile.streak.count, 1);

        let greedy = LessonCompletion {
            hearts_used: 9,
            ..completion
        };
        profile.apply_completion(&greedy, day(1));
        assert_eq!(profile.hearts, 0);
    }
}
