use async_trait::async_trait;
use chrono::{DateTime, Utc};
use lesson_core::model::{
    Challenge, ChallengeId, ChallengeKind, ChallengeOption, ContentError, LearnerProfile, Lesson,
    LessonCompletion, LessonId, LessonProgress, MediaRef, OptionId, UserId,
};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("conflict")]
    Conflict,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("backend does not accept writes")]
    ReadOnly,
}

//
// ─── RECORDS ───────────────────────────────────────────────────────────────────
//

/// Persisted shape of an answer option.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChallengeOptionRecord {
    pub id: OptionId,
    pub text: String,
    pub correct: bool,
    pub image_ref: Option<String>,
    pub audio_ref: Option<String>,
}

impl ChallengeOptionRecord {
    #[must_use]
    pub fn from_option(option: &ChallengeOption) -> Self {
        Self {
            id: option.id,
            text: option.text.clone(),
            correct: option.correct,
            image_ref: option.image_ref.as_ref().map(|m| m.as_str().to_owned()),
            audio_ref: option.audio_ref.as_ref().map(|m| m.as_str().to_owned()),
        }
    }

    fn into_option(self) -> ChallengeOption {
        ChallengeOption {
            id: self.id,
            text: self.text,
            correct: self.correct,
            image_ref: self.image_ref.map(MediaRef::new),
            audio_ref: self.audio_ref.map(MediaRef::new),
        }
    }
}

/// Persisted shape of a challenge.
///
/// The kind is kept as the raw wire tag so unknown types surface when the
/// record is turned into a domain `Challenge`, not when it is read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChallengeRecord {
    pub id: ChallengeId,
    pub kind: String,
    pub question: String,
    pub correct_text: Option<String>,
    pub audio_ref: Option<String>,
    pub position: u32,
    pub options: Vec<ChallengeOptionRecord>,
    /// Per-learner flag filled in by the repository on read.
    pub completed: bool,
}

impl ChallengeRecord {
    #[must_use]
    pub fn from_challenge(challenge: &Challenge, position: u32) -> Self {
        Self {
            id: challenge.id,
            kind: challenge.kind.as_tag().to_owned(),
            question: challenge.question.clone(),
            correct_text: challenge.correct_text.clone(),
            audio_ref: challenge.audio_ref.as_ref().map(|m| m.as_str().to_owned()),
            position,
            options: challenge
                .options
                .iter()
                .map(ChallengeOptionRecord::from_option)
                .collect(),
            completed: challenge.completed,
        }
    }

    /// Convert the record into a domain `Challenge`.
    ///
    /// # Errors
    ///
    /// Returns `ContentError::UnsupportedChallengeType` for an unknown kind tag.
    pub fn into_challenge(self) -> Result<Challenge, ContentError> {
        let kind: ChallengeKind = self.kind.parse()?;
        Ok(Challenge {
            id: self.id,
            kind,
            question: self.question,
            correct_text: self.correct_text,
            audio_ref: self.audio_ref.map(MediaRef::new),
            options: self
                .options
                .into_iter()
                .map(ChallengeOptionRecord::into_option)
                .collect(),
            completed: self.completed,
        })
    }
}

/// Persisted shape of a lesson with its ordered challenges.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LessonRecord {
    pub id: LessonId,
    pub title: String,
    pub challenges: Vec<ChallengeRecord>,
}

impl LessonRecord {
    #[must_use]
    pub fn from_lesson(lesson: &Lesson) -> Self {
        Self {
            id: lesson.id,
            title: lesson.title.clone(),
            challenges: lesson
                .challenges
                .iter()
                .zip(0_u32..)
                .map(|(challenge, position)| ChallengeRecord::from_challenge(challenge, position))
                .collect(),
        }
    }

    /// Convert the record into a domain `Lesson`, ordered by position.
    ///
    /// # Errors
    ///
    /// Returns the first `ContentError` raised by a challenge.
    pub fn into_lesson(mut self) -> Result<Lesson, ContentError> {
        self.challenges.sort_by_key(|c| c.position);
        let challenges = self
            .challenges
            .into_iter()
            .map(ChallengeRecord::into_challenge)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Lesson::new(self.id, self.title, challenges))
    }
}

//
// ─── CONTRACTS ─────────────────────────────────────────────────────────────────
//

/// Read access to lesson content.
#[async_trait]
pub trait LessonRepository: Send + Sync {
    /// Fetch a lesson with challenges flagged completed for `user_id`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the lesson does not exist.
    async fn get_lesson(
        &self,
        user_id: UserId,
        lesson_id: LessonId,
    ) -> Result<LessonRecord, StorageError>;

    /// Persist or replace a lesson and its challenges.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the lesson cannot be stored.
    async fn upsert_lesson(&self, lesson: &LessonRecord) -> Result<(), StorageError>;
}

/// Completion bookkeeping.
#[async_trait]
pub trait ProgressRepository: Send + Sync {
    /// Record a finished lesson: upsert the progress row, credit points and
    /// xp, deduct the hearts used, and advance the streak.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the learner does not exist.
    async fn complete_lesson(
        &self,
        user_id: UserId,
        completion: &LessonCompletion,
        completed_at: DateTime<Utc>,
    ) -> Result<LessonProgress, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` if the lookup fails.
    async fn lesson_progress(
        &self,
        user_id: UserId,
        lesson_id: LessonId,
    ) -> Result<Option<LessonProgress>, StorageError>;
}

/// Authoritative learner resources.
#[async_trait]
pub trait ProfileRepository: Send + Sync {
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the learner does not exist.
    async fn get_profile(&self, user_id: UserId) -> Result<LearnerProfile, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` if the profile cannot be stored.
    async fn upsert_profile(&self, profile: &LearnerProfile) -> Result<(), StorageError>;

    /// Restore hearts to the maximum and return the updated profile.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the learner does not exist.
    async fn refill_hearts(&self, user_id: UserId) -> Result<LearnerProfile, StorageError>;
}

//
// ─── IN-MEMORY ─────────────────────────────────────────────────────────────────
//

/// Simple in-memory repository implementation for testing and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    lessons: Arc<Mutex<HashMap<LessonId, LessonRecord>>>,
    profiles: Arc<Mutex<HashMap<UserId, LearnerProfile>>>,
    progress: Arc<Mutex<HashMap<(UserId, LessonId), LessonProgress>>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned<E: std::fmt::Display>(e: E) -> StorageError {
    StorageError::Connection(e.to_string())
}

#[async_trait]
impl LessonRepository for InMemoryRepository {
    async fn get_lesson(
        &self,
        user_id: UserId,
        lesson_id: LessonId,
    ) -> Result<LessonRecord, StorageError> {
        let mut lesson = {
            let guard = self.lessons.lock().map_err(poisoned)?;
            guard.get(&lesson_id).cloned().ok_or(StorageError::NotFound)?
        };
        let done = self
            .progress
            .lock()
            .map_err(poisoned)?
            .get(&(user_id, lesson_id))
            .is_some_and(LessonProgress::is_completed);
        for challenge in &mut lesson.challenges {
            challenge.completed = done;
        }
        Ok(lesson)
    }

    async fn upsert_lesson(&self, lesson: &LessonRecord) -> Result<(), StorageError> {
        let mut seen = HashSet::new();
        if !lesson.challenges.iter().all(|c| seen.insert(c.id)) {
            return Err(StorageError::Conflict);
        }
        let mut guard = self.lessons.lock().map_err(poisoned)?;
        guard.insert(lesson.id, lesson.clone());
        Ok(())
    }
}

#[async_trait]
impl ProgressRepository for InMemoryRepository {
    async fn complete_lesson(
        &self,
        user_id: UserId,
        completion: &LessonCompletion,
        completed_at: DateTime<Utc>,
    ) -> Result<LessonProgress, StorageError> {
        {
            let mut profiles = self.profiles.lock().map_err(poisoned)?;
            let profile = profiles.get_mut(&user_id).ok_or(StorageError::NotFound)?;
            profile.apply_completion(completion, completed_at.date_naive());
        }
        let progress = LessonProgress::completed(user_id, completion);
        self.progress
            .lock()
            .map_err(poisoned)?
            .insert((user_id, completion.lesson_id), progress.clone());
        Ok(progress)
    }

    async fn lesson_progress(
        &self,
        user_id: UserId,
        lesson_id: LessonId,
    ) -> Result<Option<LessonProgress>, StorageError> {
        let guard = self.progress.lock().map_err(poisoned)?;
        Ok(guard.get(&(user_id, lesson_id)).cloned())
    }
}

#[async_trait]
impl ProfileRepository for InMemoryRepository {
    async fn get_profile(&self, user_id: UserId) -> Result<LearnerProfile, StorageError> {
        let guard = self.profiles.lock().map_err(poisoned)?;
        guard.get(&user_id).cloned().ok_or(StorageError::NotFound)
    }

    async fn upsert_profile(&self, profile: &LearnerProfile) -> Result<(), StorageError> {
        let mut guard = self.profiles.lock().map_err(poisoned)?;
        guard.insert(profile.user_id, profile.clone());
        Ok(())
    }

    async fn refill_hearts(&self, user_id: UserId) -> Result<LearnerProfile, StorageError> {
        let mut guard = self.profiles.lock().map_err(poisoned)?;
        let profile = guard.get_mut(&user_id).ok_or(StorageError::NotFound)?;
        profile.refill_hearts();
        Ok(profile.clone())
    }
}

/// Aggregates the repositories behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub lessons: Arc<dyn LessonRepository>,
    pub progress: Arc<dyn ProgressRepository>,
    pub profiles: Arc<dyn ProfileRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        let repo = InMemoryRepository::new();
        Self::from_repo(repo)
    }

    /// One backend serving all three contracts.
    #[must_use]
    pub fn from_repo<R>(repo: R) -> Self
    where
        R: LessonRepository + ProgressRepository + ProfileRepository + Clone + 'static,
    {
        let lessons: Arc<dyn LessonRepository> = Arc::new(repo.clone());
        let progress: Arc<dyn ProgressRepository> = Arc::new(repo.clone());
        let profiles: Arc<dyn ProfileRepository> = Arc::new(repo);
        Self {
            lessons,
            progress,
            profiles,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lesson_core::model::{DEFAULT_LESSON_POINTS, MAX_HEARTS};
    use lesson_core::time::fixed_now;

    fn lesson_record(id: u64) -> LessonRecord {
        let challenge = Challenge::new(ChallengeId::new(1), ChallengeKind::Select, "Which one?")
            .with_options(vec![
                ChallengeOption::new(OptionId::new(1), "a", true).with_audio("/a.mp3"),
                ChallengeOption::new(OptionId::new(2), "b", false),
            ]);
        LessonRecord::from_lesson(&Lesson::new(LessonId::new(id), "Basics", vec![challenge]))
    }

    #[test]
    fn unknown_kind_tag_fails_conversion() {
        let mut record = lesson_record(1);
        record.challenges[0].kind = "DRAG_DROP".into();
        let err = record.into_lesson().unwrap_err();
        assert_eq!(
            err,
            ContentError::UnsupportedChallengeType {
                tag: "DRAG_DROP".into()
            }
        );
    }

    #[test]
    fn records_are_ordered_by_position() {
        let mut record = lesson_record(1);
        let mut second = record.challenges[0].clone();
        second.id = ChallengeId::new(2);
        second.position = 0;
        record.challenges[0].position = 1;
        record.challenges.push(second);

        let lesson = record.into_lesson().unwrap();
        assert_eq!(lesson.challenges[0].id, ChallengeId::new(2));
        assert_eq!(lesson.challenges[1].id, ChallengeId::new(1));
    }

    #[tokio::test]
    async fn completion_credits_profile_and_flags_challenges() {
        let repo = InMemoryRepository::new();
        let user = UserId::new(7);
        repo.upsert_lesson(&lesson_record(1)).await.unwrap();
        repo.upsert_profile(&LearnerProfile::new(user)).await.unwrap();

        let fresh = repo.get_lesson(user, LessonId::new(1)).await.unwrap();
        assert!(!fresh.challenges[0].completed);

        let completion = LessonCompletion {
            lesson_id: LessonId::new(1),
            hearts_used: 2,
            points_earned: DEFAULT_LESSON_POINTS,
        };
        let progress = repo
            .complete_lesson(user, &completion, fixed_now())
            .await
            .unwrap();
        assert!(progress.is_completed());
        assert_eq!(progress.hearts_used(), 2);

        let profile = repo.get_profile(user).await.unwrap();
        assert_eq!(profile.xp, 10);
        assert_eq!(profile.points, 10);
        assert_eq!(profile.streak.count, 1);
        assert_eq!(profile.hearts, MAX_HEARTS - 2);

        let replay = repo.get_lesson(user, LessonId::new(1)).await.unwrap();
        assert!(replay.challenges[0].completed);
        let stored = repo.lesson_progress(user, LessonId::new(1)).await.unwrap();
        assert_eq!(stored, Some(progress));
    }

    #[tokio::test]
    async fn completion_for_unknown_user_is_not_found() {
        let repo = InMemoryRepository::new();
        let completion = LessonCompletion {
            lesson_id: LessonId::new(1),
            hearts_used: 0,
            points_earned: 10,
        };
        let err = repo
            .complete_lesson(UserId::new(1), &completion, fixed_now())
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::NotFound));
    }

    #[tokio::test]
    async fn refill_restores_max_hearts() {
        let repo = InMemoryRepository::new();
        let mut profile = LearnerProfile::new(UserId::new(3));
        profile.hearts = 1;
        repo.upsert_profile(&profile).await.unwrap();

        let refilled = repo.refill_hearts(UserId::new(3)).await.unwrap();
        assert_eq!(refilled.hearts, MAX_HEARTS);
    }
}
