use std::collections::HashSet;
use std::sync::{Arc, PoisonError, RwLock};

use lesson_core::model::{LearnerProfile, LessonCompletion, LessonId, LessonProgress, UserId};
use storage::repository::{ProfileRepository, ProgressRepository};
use tracing::instrument;

use crate::Clock;
use crate::error::ReportError;

/// Lessons finished during this process, marked before the profile refresh.
///
/// Marks are never reverted, even when a later report for the same lesson fails.
#[derive(Debug, Clone, Default)]
pub struct CompletedLessons {
    inner: Arc<RwLock<HashSet<LessonId>>>,
}

impl CompletedLessons {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mark(&self, lesson_id: LessonId) {
        self.inner
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(lesson_id);
    }

    #[must_use]
    pub fn contains(&self, lesson_id: LessonId) -> bool {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(&lesson_id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// What the backend returned for a delivered completion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionReceipt {
    pub progress: LessonProgress,
    /// Refreshed learner totals; `None` when the refresh failed.
    pub profile: Option<LearnerProfile>,
}

/// Submits lesson completions and resynchronizes learner totals.
#[derive(Clone)]
pub struct CompletionReporter {
    clock: Clock,
    progress: Arc<dyn ProgressRepository>,
    profiles: Arc<dyn ProfileRepository>,
    completed: CompletedLessons,
}

impl CompletionReporter {
    #[must_use]
    pub fn new(
        clock: Clock,
        progress: Arc<dyn ProgressRepository>,
        profiles: Arc<dyn ProfileRepository>,
    ) -> Self {
        Self {
            clock,
            progress,
            profiles,
            completed: CompletedLessons::new(),
        }
    }

    /// Share an existing completion cache with the caller.
    #[must_use]
    pub fn with_completed(mut self, completed: CompletedLessons) -> Self {
        self.completed = completed;
        self
    }

    #[must_use]
    pub fn completed(&self) -> &CompletedLessons {
        &self.completed
    }

    /// Submit `completion`, mark the lesson locally, then refresh the profile.
    ///
    /// A failed refresh is logged and leaves `profile` empty.
    ///
    /// # Errors
    ///
    /// Returns `ReportError::NetworkSync` if the submission fails.
    #[instrument(
        skip(self, completion),
        fields(lesson_id = %completion.lesson_id, hearts_used = completion.hearts_used)
    )]
    pub async fn report(
        &self,
        user_id: UserId,
        completion: &LessonCompletion,
    ) -> Result<CompletionReceipt, ReportError> {
        let progress = self
            .progress
            .complete_lesson(user_id, completion, self.clock.now())
            .await
            .map_err(|source| ReportError::NetworkSync {
                lesson: completion.lesson_id,
                source,
            })?;

        self.completed.mark(completion.lesson_id);

        let profile = match self.profiles.get_profile(user_id).await {
            Ok(profile) => Some(profile),
            Err(err) => {
                tracing::warn!(error = %err, "profile refresh failed after completion");
                None
            }
        };

        tracing::info!(points = completion.points_earned, "lesson completion reported");
        Ok(CompletionReceipt { progress, profile })
    }
}
