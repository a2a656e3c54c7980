use std::sync::Arc;

use lesson_core::model::{Hearts, LessonCompletion, LessonId, OptionId, UserId};
use lesson_core::{MatchItemId, Selection};
use storage::repository::{LessonRepository, ProfileRepository};
use tracing::instrument;

use crate::Clock;
use crate::audio::{AudioPlayer, Cue, SilentPlayer, play_best_effort};
use crate::config::SessionConfig;
use crate::error::{ContentLoadError, ReportError, SessionError};
use crate::report::{CompletionReceipt, CompletionReporter};

use super::service::{Advance, Feedback, QuizSession};

/// Delivery state of the completion report for one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportState {
    /// Lesson not finished yet.
    Pending,
    /// Submission failed; `retry_report` may resend it.
    Failed(LessonCompletion),
    Delivered,
}

/// A learner playing one lesson.
#[derive(Debug)]
pub struct LessonRun {
    user_id: UserId,
    session: QuizSession,
    report: ReportState,
}

impl LessonRun {
    #[must_use]
    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    #[must_use]
    pub fn session(&self) -> &QuizSession {
        &self.session
    }

    /// Direct access for input that has no side effects (word bank, typed text).
    pub fn session_mut(&mut self) -> &mut QuizSession {
        &mut self.session
    }

    #[must_use]
    pub fn report_state(&self) -> ReportState {
        self.report
    }
}

/// Result of `LessonLoopService::advance`.
#[derive(Debug)]
pub enum Step {
    Next(usize),
    Retry,
    /// Emitted once per run, with the outcome of the first report attempt.
    Completed {
        completion: LessonCompletion,
        report: Result<CompletionReceipt, ReportError>,
    },
}

/// Loads lessons, drives sessions and reports completions.
#[derive(Clone)]
pub struct LessonLoopService {
    clock: Clock,
    config: SessionConfig,
    lessons: Arc<dyn LessonRepository>,
    profiles: Arc<dyn ProfileRepository>,
    reporter: CompletionReporter,
    audio: Arc<dyn AudioPlayer>,
}

impl LessonLoopService {
    #[must_use]
    pub fn new(
        clock: Clock,
        config: SessionConfig,
        lessons: Arc<dyn LessonRepository>,
        profiles: Arc<dyn ProfileRepository>,
        reporter: CompletionReporter,
    ) -> Self {
        Self {
            clock,
            config,
            lessons,
            profiles,
            reporter,
            audio: Arc::new(SilentPlayer),
        }
    }

    #[must_use]
    pub fn with_audio(mut self, audio: Arc<dyn AudioPlayer>) -> Self {
        self.audio = audio;
        self
    }

    #[must_use]
    pub fn reporter(&self) -> &CompletionReporter {
        &self.reporter
    }

    /// Fetch the lesson and the learner's hearts, then start a session.
    ///
    /// Resuming a partly completed lesson starts from the share before the resume
    /// point; a fully completed lesson is replayed from zero.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::ContentLoad` if the lesson is missing or malformed,
    /// `SessionError::Storage` if the learner profile cannot be read.
    #[instrument(skip_all, fields(user_id = %user_id, lesson_id = %lesson_id))]
    pub async fn start(
        &self,
        user_id: UserId,
        lesson_id: LessonId,
    ) -> Result<LessonRun, SessionError> {
        let record = self
            .lessons
            .get_lesson(user_id, lesson_id)
            .await
            .map_err(ContentLoadError::from)?;
        let lesson = record.into_lesson()?;
        let profile = self.profiles.get_profile(user_id).await?;

        let percentage = resume_percentage(lesson.resume_index(), lesson.challenges.len());

        let session = QuizSession::load(lesson, profile.session_hearts(), percentage, self.config)?;
        tracing::debug!(
            start = session.current_index(),
            total = session.challenges().len(),
            hearts = %session.hearts(),
            "lesson session started"
        );

        Ok(LessonRun {
            user_id,
            session,
            report: ReportState::Pending,
        })
    }

    /// Pick an option, playing its audio clip if it has one.
    ///
    /// # Errors
    ///
    /// See [`QuizSession::pick_option`].
    pub fn pick_option(&self, run: &mut LessonRun, option: OptionId) -> Result<bool, SessionError> {
        let picked = run.session.pick_option(option)?;
        if picked {
            let audio = run
                .session
                .current_challenge()
                .and_then(|c| c.option(option))
                .and_then(|o| o.audio_ref.clone());
            if let Some(audio) = audio {
                play_best_effort(self.audio.as_ref(), audio);
            }
        }
        Ok(picked)
    }

    /// Tap a matching tile now, playing the tile's audio clip.
    ///
    /// # Errors
    ///
    /// See [`QuizSession::tap_pair`].
    pub fn tap_pair(
        &self,
        run: &mut LessonRun,
        item: MatchItemId,
    ) -> Result<Selection, SessionError> {
        let selection = run.session.tap_pair(item, self.clock.now())?;
        if let Some(audio) = selection.audio.clone() {
            play_best_effort(self.audio.as_ref(), audio);
        }
        Ok(selection)
    }

    /// Play the current challenge's prompt clip. Returns `false` when it has none.
    pub fn play_prompt(&self, run: &LessonRun) -> bool {
        let audio = run
            .session
            .current_challenge()
            .and_then(|c| c.audio_ref.clone());
        match audio {
            Some(audio) => {
                play_best_effort(self.audio.as_ref(), audio);
                true
            }
            None => false,
        }
    }

    /// Releases an expired mismatch flash.
    pub fn tick(&self, run: &mut LessonRun) -> bool {
        run.session.tick(self.clock.now())
    }

    /// Grade the answer and play its cue.
    ///
    /// # Errors
    ///
    /// See [`QuizSession::check`].
    pub fn check(&self, run: &mut LessonRun) -> Result<Feedback, SessionError> {
        let feedback = run.session.check()?;
        play_best_effort(self.audio.as_ref(), feedback.cue);
        Ok(feedback)
    }

    /// Continue after a checked answer; reports the lesson when it completes.
    ///
    /// # Errors
    ///
    /// See [`QuizSession::advance`]. Report failures are returned inside
    /// `Step::Completed` and never fail the step.
    ///
    /// The completion report is awaited here; callers that move on before it
    /// resolves spawn this future themselves.
    pub async fn advance(&self, run: &mut LessonRun) -> Result<Step, SessionError> {
        match run.session.advance()? {
            Advance::Next(index) => Ok(Step::Next(index)),
            Advance::Retry => Ok(Step::Retry),
            Advance::Completed(completion) => {
                play_best_effort(self.audio.as_ref(), Cue::LessonFinished);
                let report = self.deliver(run, completion).await;
                Ok(Step::Completed { completion, report })
            }
        }
    }

    /// Resend a completion whose first report failed.
    ///
    /// # Errors
    ///
    /// - `ReportError::NotCompleted` before the lesson is finished.
    /// - `ReportError::AlreadyReported` once a report went through.
    /// - `ReportError::NetworkSync` if the submission fails again.
    pub async fn retry_report(&self, run: &mut LessonRun) -> Result<CompletionReceipt, ReportError> {
        match run.report {
            ReportState::Pending => Err(ReportError::NotCompleted),
            ReportState::Delivered => Err(ReportError::AlreadyReported),
            ReportState::Failed(completion) => self.deliver(run, completion).await,
        }
    }

    /// Refill the learner's hearts and hand them to the running session.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Storage` if the profile service refuses the refill.
    #[instrument(skip_all, fields(user_id = %run.user_id))]
    pub async fn refill_hearts(&self, run: &mut LessonRun) -> Result<Hearts, SessionError> {
        let profile = self.profiles.refill_hearts(run.user_id).await?;
        let hearts = profile.session_hearts();
        run.session.restore_hearts(hearts);
        Ok(hearts)
    }

    async fn deliver(
        &self,
        run: &mut LessonRun,
        completion: LessonCompletion,
    ) -> Result<CompletionReceipt, ReportError> {
        match self.reporter.report(run.user_id, &completion).await {
            Ok(receipt) => {
                run.report = ReportState::Delivered;
                Ok(receipt)
            }
            Err(err) => {
                tracing::warn!(error = %err, "completion report failed");
                run.report = ReportState::Failed(completion);
                Err(err)
            }
        }
    }
}

/// Share of the lesson before `resume`. Every challenge from the resume point
/// on is replayed and adds its own share.
#[allow(clippy::cast_precision_loss)]
fn resume_percentage(resume: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        resume as f64 * 100.0 / total as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lesson_core::model::{
        Challenge, ChallengeId, ChallengeKind, ChallengeOption, LearnerProfile, Lesson,
    };
    use async_trait::async_trait;
    use lesson_core::time::fixed_clock;
    use std::sync::Mutex;
    use storage::repository::{InMemoryRepository, LessonRecord, Storage, StorageError};

    use crate::audio::{AudioError, Sound};

    #[derive(Default)]
    struct RecordingPlayer {
        played: Mutex<Vec<Sound>>,
    }

    impl AudioPlayer for RecordingPlayer {
        fn play(&self, sound: &Sound) -> Result<(), AudioError> {
            self.played.lock().unwrap().push(sound.clone());
            Ok(())
        }
    }

    fn choice(id: u64) -> Challenge {
        Challenge::new(ChallengeId::new(id), ChallengeKind::Select, "Which one?").with_options(
            vec![
                ChallengeOption::new(OptionId::new(id * 10), "yes", true).with_audio("/yes.mp3"),
                ChallengeOption::new(OptionId::new(id * 10 + 1), "no", false),
            ],
        )
    }

    async fn setup() -> (LessonLoopService, Arc<RecordingPlayer>) {
        let storage = Storage::from_repo(InMemoryRepository::new());
        let lesson = Lesson::new(LessonId::new(1), "Greetings", vec![choice(1), choice(2)]);
        storage
            .lessons
            .upsert_lesson(&LessonRecord::from_lesson(&lesson))
            .await
            .unwrap();
        storage
            .profiles
            .upsert_profile(&LearnerProfile::new(UserId::new(1)))
            .await
            .unwrap();

        let reporter = CompletionReporter::new(
            fixed_clock(),
            Arc::clone(&storage.progress),
            Arc::clone(&storage.profiles),
        );
        let player = Arc::new(RecordingPlayer::default());
        let service = LessonLoopService::new(
            fixed_clock(),
            SessionConfig::default(),
            Arc::clone(&storage.lessons),
            Arc::clone(&storage.profiles),
            reporter,
        )
        .with_audio(Arc::clone(&player) as Arc<dyn AudioPlayer>);
        (service, player)
    }

    #[tokio::test]
    async fn full_run_reports_once_and_plays_cues() {
        let (service, player) = setup().await;
        let mut run = service.start(UserId::new(1), LessonId::new(1)).await.unwrap();
        assert!(matches!(
            service.retry_report(&mut run).await,
            Err(ReportError::NotCompleted)
        ));

        service.pick_option(&mut run, OptionId::new(10)).unwrap();
        service.check(&mut run).unwrap();
        assert!(matches!(service.advance(&mut run).await.unwrap(), Step::Next(1)));

        service.pick_option(&mut run, OptionId::new(20)).unwrap();
        service.check(&mut run).unwrap();
        let Step::Completed { completion, report } = service.advance(&mut run).await.unwrap()
        else {
            panic!("expected completion");
        };
        assert_eq!(completion.hearts_used, 0);
        let receipt = report.unwrap();
        assert_eq!(receipt.profile.unwrap().points, 10);
        assert_eq!(run.report_state(), ReportState::Delivered);
        assert!(service.reporter().completed().contains(LessonId::new(1)));

        assert!(matches!(
            service.retry_report(&mut run).await,
            Err(ReportError::AlreadyReported)
        ));
        assert!(matches!(
            service.advance(&mut run).await,
            Err(SessionError::Completed)
        ));

        let played = player.played.lock().unwrap().clone();
        assert_eq!(
            played,
            vec![
                Sound::Media(lesson_core::model::MediaRef::new("/yes.mp3")),
                Sound::Cue(Cue::Correct),
                Sound::Media(lesson_core::model::MediaRef::new("/yes.mp3")),
                Sound::Cue(Cue::Correct),
                Sound::Cue(Cue::LessonFinished),
            ]
        );
    }

    #[tokio::test]
    async fn replaying_a_completed_lesson_starts_at_zero() {
        let (service, _) = setup().await;
        let mut run = service.start(UserId::new(1), LessonId::new(1)).await.unwrap();
        for option in [10, 20] {
            service.pick_option(&mut run, OptionId::new(option)).unwrap();
            service.check(&mut run).unwrap();
            service.advance(&mut run).await.unwrap();
        }

        let replay = service.start(UserId::new(1), LessonId::new(1)).await.unwrap();
        assert_eq!(replay.session().current_index(), 0);
        assert_eq!(replay.session().percentage(), 0.0);
    }

    /// Serves one lesson with per-challenge completed flags as given.
    struct FlaggedLessons(LessonRecord);

    #[async_trait]
    impl LessonRepository for FlaggedLessons {
        async fn get_lesson(
            &self,
            _user_id: UserId,
            lesson_id: LessonId,
        ) -> Result<LessonRecord, StorageError> {
            if lesson_id == self.0.id {
                Ok(self.0.clone())
            } else {
                Err(StorageError::NotFound)
            }
        }

        async fn upsert_lesson(&self, _lesson: &LessonRecord) -> Result<(), StorageError> {
            Err(StorageError::ReadOnly)
        }
    }

    async fn service_over(lesson: &Lesson) -> (LessonLoopService, Arc<RecordingPlayer>) {
        let storage = Storage::from_repo(InMemoryRepository::new());
        storage
            .profiles
            .upsert_profile(&LearnerProfile::new(UserId::new(1)))
            .await
            .unwrap();
        let reporter = CompletionReporter::new(
            fixed_clock(),
            Arc::clone(&storage.progress),
            Arc::clone(&storage.profiles),
        );
        let player = Arc::new(RecordingPlayer::default());
        let service = LessonLoopService::new(
            fixed_clock(),
            SessionConfig::default(),
            Arc::new(FlaggedLessons(LessonRecord::from_lesson(lesson))),
            Arc::clone(&storage.profiles),
            reporter,
        )
        .with_audio(Arc::clone(&player) as Arc<dyn AudioPlayer>);
        (service, player)
    }

    #[tokio::test]
    async fn scattered_completed_flags_resume_from_the_first_gap() {
        let lesson = Lesson::new(
            LessonId::new(1),
            "Greetings",
            vec![
                choice(1).mark_completed(false),
                choice(2).mark_completed(true),
                choice(3).mark_completed(false),
            ],
        );
        let (service, _) = service_over(&lesson).await;
        let mut run = service.start(UserId::new(1), LessonId::new(1)).await.unwrap();
        assert_eq!(run.session().current_index(), 0);
        assert_eq!(run.session().percentage(), 0.0);

        let step = 100.0 / 3.0;
        let mut before = run.session().percentage();
        for id in 1..=3u64 {
            service.pick_option(&mut run, OptionId::new(id * 10)).unwrap();
            let feedback = service.check(&mut run).unwrap();
            assert!((feedback.percentage - before - step).abs() < 1e-9);
            before = feedback.percentage;
            service.advance(&mut run).await.unwrap();
        }
        assert!(run.session().is_complete());
        assert!((run.session().percentage() - 100.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn completed_prefix_counts_toward_the_starting_share() {
        let lesson = Lesson::new(
            LessonId::new(1),
            "Greetings",
            vec![choice(1).mark_completed(true), choice(2), choice(3), choice(4)],
        );
        let (service, _) = service_over(&lesson).await;
        let run = service.start(UserId::new(1), LessonId::new(1)).await.unwrap();
        assert_eq!(run.session().current_index(), 1);
        assert_eq!(run.session().percentage(), 25.0);
    }

    #[tokio::test]
    async fn prompt_audio_plays_only_when_the_challenge_has_a_clip() {
        let listen = Challenge::new(
            ChallengeId::new(5),
            ChallengeKind::ListenType,
            "Type what you hear",
        )
        .with_correct_text("Ke a leboga")
        .with_audio("/audio/ke_a_leboga.mp3");
        let lesson = Lesson::new(LessonId::new(1), "Listening", vec![choice(1), listen]);
        let (service, player) = service_over(&lesson).await;
        let mut run = service.start(UserId::new(1), LessonId::new(1)).await.unwrap();

        assert!(!service.play_prompt(&run));
        service.pick_option(&mut run, OptionId::new(10)).unwrap();
        service.check(&mut run).unwrap();
        service.advance(&mut run).await.unwrap();
        assert!(service.play_prompt(&run));

        let played = player.played.lock().unwrap().clone();
        assert_eq!(
            played.last(),
            Some(&Sound::Media(lesson_core::model::MediaRef::new(
                "/audio/ke_a_leboga.mp3"
            )))
        );
    }

    #[tokio::test]
    async fn missing_lesson_is_a_content_load_error() {
        let (service, _) = setup().await;
        let err = service
            .start(UserId::new(1), LessonId::new(99))
            .await
            .unwrap_err();
        assert!(matches!(err, SessionError::ContentLoad(_)));
    }

    #[tokio::test]
    async fn refill_restores_session_hearts() {
        let (service, _) = setup().await;
        let mut run = service.start(UserId::new(1), LessonId::new(1)).await.unwrap();
        service.pick_option(&mut run, OptionId::new(11)).unwrap();
        service.check(&mut run).unwrap();
        assert_eq!(run.session().hearts(), Hearts::Finite(4));

        let hearts = service.refill_hearts(&mut run).await.unwrap();
        assert_eq!(hearts, Hearts::Finite(5));
        assert_eq!(run.session().hearts(), Hearts::Finite(5));
    }
}
