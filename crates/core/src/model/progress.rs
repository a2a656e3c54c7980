use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::hearts::Hearts;
use crate::model::ids::{LessonId, UserId};

/// Points awarded once per completed lesson.
pub const DEFAULT_LESSON_POINTS: u32 = 10;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ProgressError {
    #[error("value out of range for {field}: {value}")]
    OutOfRange { field: &'static str, value: i64 },
}

/// Metrics submitted to the progress service when a lesson is finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LessonCompletion {
    pub lesson_id: LessonId,
    pub hearts_used: u32,
    pub points_earned: u32,
}

impl LessonCompletion {
    /// Builds the completion record from the hearts at load and at the end.
    #[must_use]
    pub fn from_session(
        lesson_id: LessonId,
        initial: Hearts,
        last: Hearts,
        points_earned: u32,
    ) -> Self {
        Self {
            lesson_id,
            hearts_used: last.used_since(initial),
            points_earned,
        }
    }
}

/// Persisted completion state of one lesson for one learner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LessonProgress {
    user_id: UserId,
    lesson_id: LessonId,
    completed: bool,
    hearts_used: u32,
    points_earned: u32,
}

impl LessonProgress {
    #[must_use]
    pub fn completed(user_id: UserId, completion: &LessonCompletion) -> Self {
        Self {
            user_id,
            lesson_id: completion.lesson_id,
            completed: true,
            hearts_used: completion.hearts_used,
            points_earned: completion.points_earned,
        }
    }

    /// Rehydrate a progress row from persisted storage.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError::OutOfRange` if a counter does not fit in `u32`.
    pub fn from_persisted(
        user_id: UserId,
        lesson_id: LessonId,
        completed: bool,
        hearts_used: i64,
        points_earned: i64,
    ) -> Result<Self, ProgressError> {
        let to_u32 = |field: &'static str, value: i64| {
            u32::try_from(value).map_err(|_| ProgressError::OutOfRange { field, value })
        };
        Ok(Self {
            user_id,
            lesson_id,
            completed,
            hearts_used: to_u32("hearts_used", hearts_used)?,
            points_earned: to_u32("points_earned", points_earned)?,
        })
    }

    #[must_use]
    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    #[must_use]
    pub fn lesson_id(&self) -> LessonId {
        self.lesson_id
    }

    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.completed
    }

    #[must_use]
    pub fn hearts_used(&self) -> u32 {
        self.hearts_used
    }

    #[must_use]
    pub fn points_earned(&self) -> u32 {
        self.points_earned
    }
}
