use serde::{Deserialize, Serialize};

use crate::model::challenge::{Challenge, ContentError};
use crate::model::ids::LessonId;

/// An ordered, immutable list of challenges delivered by the content service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lesson {
    pub id: LessonId,
    pub title: String,
    pub challenges: Vec<Challenge>,
}

impl Lesson {
    #[must_use]
    pub fn new(id: LessonId, title: impl Into<String>, challenges: Vec<Challenge>) -> Self {
        Self {
            id,
            title: title.into(),
            challenges,
        }
    }

    /// Index of the first challenge not yet completed, or 0 when all are.
    #[must_use]
    pub fn resume_index(&self) -> usize {
        self.challenges
            .iter()
            .position(|challenge| !challenge.completed)
            .unwrap_or(0)
    }

    /// Checks every challenge in order.
    ///
    /// # Errors
    ///
    /// Returns `ContentError::EmptyLesson` for an empty lesson, otherwise the first
    /// challenge-level error.
    pub fn validate(&self) -> Result<(), ContentError> {
        if self.challenges.is_empty() {
            return Err(ContentError::EmptyLesson);
        }
        self.challenges.iter().try_for_each(Challenge::validate)
    }
}
