use chrono::{DateTime, Utc};
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::fmt;

use lesson_core::model::{
    Answer, Challenge, ChallengeStatus, Hearts, InputMode, Lesson, LessonCompletion, LessonId,
    MatchOutcome, OptionId,
};
use lesson_core::{AnswerEvaluator, MatchEvent, MatchItemId, Selection};

use super::interaction::Interaction;
use super::progress::SessionProgress;
use crate::audio::Cue;
use crate::config::{SessionConfig, ZeroHeartsPolicy};
use crate::error::{InteractionError, SessionError};

//
// ─── RESULTS ───────────────────────────────────────────────────────────────────
//

/// Outcome of `check()`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Feedback {
    pub correct: bool,
    pub cue: Cue,
    pub hearts: Hearts,
    pub percentage: f64,
}

/// Outcome of `advance()`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Advance {
    /// Moved on to the challenge at this index.
    Next(usize),
    /// Same challenge, fresh attempt.
    Retry,
    /// Last challenge passed. Returned once per session.
    Completed(LessonCompletion),
}

//
// ─── SESSION ───────────────────────────────────────────────────────────────────
//

/// In-memory quiz over one lesson.
///
/// Walks the challenges in order. A correct answer raises the percentage and
/// moves on; a wrong answer costs a heart (unless unlimited) and the same
/// challenge is retried. `Completed` is terminal.
pub struct QuizSession {
    lesson_id: LessonId,
    challenges: Vec<Challenge>,
    current: usize,
    initial_hearts: Hearts,
    hearts: Hearts,
    initial_percentage: f64,
    correct_answers: usize,
    status: ChallengeStatus,
    selected: Option<Answer>,
    interaction: Interaction,
    config: SessionConfig,
    rng: StdRng,
}

impl QuizSession {
    /// Start a session, resuming at the first challenge not yet completed.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::ContentLoad` if the lesson is empty or malformed.
    pub fn load(
        lesson: Lesson,
        hearts: Hearts,
        percentage: f64,
        config: SessionConfig,
    ) -> Result<Self, SessionError> {
        Self::load_with_rng(lesson, hearts, percentage, config, StdRng::from_rng(&mut rand::rng()))
    }

    /// Same as [`QuizSession::load`] with a caller-provided shuffle source.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::ContentLoad` if the lesson is empty or malformed.
    pub fn load_with_rng(
        lesson: Lesson,
        hearts: Hearts,
        percentage: f64,
        config: SessionConfig,
        mut rng: StdRng,
    ) -> Result<Self, SessionError> {
        lesson.validate()?;
        let current = lesson.resume_index();
        let interaction = Interaction::for_challenge(
            &lesson.challenges[current],
            config.mismatch_window,
            &mut rng,
        )?;

        let initial_percentage = if percentage.is_finite() {
            percentage.clamp(0.0, 100.0)
        } else {
            0.0
        };

        Ok(Self {
            lesson_id: lesson.id,
            challenges: lesson.challenges,
            current,
            initial_hearts: hearts,
            hearts,
            initial_percentage,
            correct_answers: 0,
            status: ChallengeStatus::None,
            selected: None,
            interaction,
            config,
            rng,
        })
    }

    #[must_use]
    pub fn lesson_id(&self) -> LessonId {
        self.lesson_id
    }

    #[must_use]
    pub fn challenges(&self) -> &[Challenge] {
        &self.challenges
    }

    #[must_use]
    pub fn current_index(&self) -> usize {
        self.current
    }

    #[must_use]
    pub fn current_challenge(&self) -> Option<&Challenge> {
        self.challenges.get(self.current)
    }

    #[must_use]
    pub fn hearts(&self) -> Hearts {
        self.hearts
    }

    #[must_use]
    pub fn initial_hearts(&self) -> Hearts {
        self.initial_hearts
    }

    /// Progress in `[0, 100]`: the loaded share plus `100 / len` per correct answer.
    #[must_use]
    pub fn percentage(&self) -> f64 {
        #[allow(clippy::cast_precision_loss)]
        let gained = self.correct_answers as f64 * 100.0 / self.challenges.len() as f64;
        (self.initial_percentage + gained).min(100.0)
    }

    #[must_use]
    pub fn status(&self) -> ChallengeStatus {
        self.status
    }

    #[must_use]
    pub fn selected(&self) -> Option<&Answer> {
        self.selected.as_ref()
    }

    #[must_use]
    pub fn interaction(&self) -> &Interaction {
        &self.interaction
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.status == ChallengeStatus::Completed
    }

    #[must_use]
    pub fn progress(&self) -> SessionProgress {
        SessionProgress {
            index: self.current,
            total: self.challenges.len(),
            percentage: self.percentage(),
            hearts: self.hearts,
            status: self.status,
            title: self.current_challenge().map(|c| c.kind.title()),
        }
    }

    /// Metrics to report once the lesson is finished.
    #[must_use]
    pub fn completion(&self) -> Option<LessonCompletion> {
        self.is_complete().then(|| {
            LessonCompletion::from_session(
                self.lesson_id,
                self.initial_hearts,
                self.hearts,
                self.config.points_per_lesson,
            )
        })
    }

    /// Hearts granted from outside the session (refill or subscription).
    pub fn restore_hearts(&mut self, hearts: Hearts) {
        self.hearts = hearts;
    }

    //
    // ─── ANSWERING ─────────────────────────────────────────────────────────────
    //

    /// Records the pending answer. Returns `false` (and changes nothing) once
    /// the answer was checked or the session is over.
    pub fn select(&mut self, answer: Answer) -> bool {
        if !self.status.accepts_input() {
            return false;
        }
        self.selected = Some(answer);
        true
    }

    /// Pick an option of a choice challenge.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Interaction` if the challenge takes no option or the
    /// option belongs to another challenge.
    pub fn pick_option(&mut self, option: OptionId) -> Result<bool, SessionError> {
        let challenge = self.require_input(InputMode::Choice)?;
        if challenge.option(option).is_none() {
            return Err(InteractionError::UnknownOption(option).into());
        }
        Ok(self.select(Answer::Option(option)))
    }

    /// Move `available[index]` into the sentence. Returns the new candidate.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Interaction` outside word-bank challenges, after
    /// checking, or for a bad index.
    pub fn add_word(&mut self, index: usize) -> Result<String, SessionError> {
        self.require_input(InputMode::WordBank)?;
        let Interaction::WordBank(builder) = &mut self.interaction else {
            return Err(self.wrong_input(InputMode::WordBank));
        };
        let candidate = builder.add_word(index).map_err(InteractionError::from)?;
        self.select_text(candidate.clone());
        Ok(candidate)
    }

    /// Move `selected[index]` back to the pool. Returns the new candidate.
    ///
    /// # Errors
    ///
    /// See [`QuizSession::add_word`].
    pub fn remove_word(&mut self, index: usize) -> Result<String, SessionError> {
        self.require_input(InputMode::WordBank)?;
        let Interaction::WordBank(builder) = &mut self.interaction else {
            return Err(self.wrong_input(InputMode::WordBank));
        };
        let candidate = builder.remove_word(index).map_err(InteractionError::from)?;
        self.select_text(candidate.clone());
        Ok(candidate)
    }

    /// Typed answer or speech transcript.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Interaction` outside free-text challenges.
    pub fn type_text(&mut self, text: &str) -> Result<bool, SessionError> {
        self.require_input(InputMode::FreeText)?;
        if !self.status.accepts_input() {
            return Ok(false);
        }
        self.select_text(text.to_owned());
        Ok(true)
    }

    /// Tap a tile of the matching board at `now`.
    ///
    /// Completing the board selects `Matched` as the answer.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Interaction` outside matching challenges or for
    /// an unknown tile.
    pub fn tap_pair(
        &mut self,
        item: MatchItemId,
        now: DateTime<Utc>,
    ) -> Result<Selection, SessionError> {
        self.require_input(InputMode::Pairs)?;
        if !self.status.accepts_input() {
            return Ok(Selection {
                event: MatchEvent::Ignored,
                audio: None,
            });
        }
        let Interaction::Pairs(board) = &mut self.interaction else {
            return Err(self.wrong_input(InputMode::Pairs));
        };
        let selection = board.select(item, now).map_err(InteractionError::from)?;
        if selection.event == MatchEvent::Completed {
            self.select(Answer::Match(MatchOutcome::Matched));
        }
        Ok(selection)
    }

    /// Releases an expired mismatch flash. Returns `true` if the board changed.
    pub fn tick(&mut self, now: DateTime<Utc>) -> bool {
        match &mut self.interaction {
            Interaction::Pairs(board) => board.tick(now),
            _ => false,
        }
    }

    /// Grade the selected answer.
    ///
    /// # Errors
    ///
    /// - `SessionError::Completed` after the last challenge.
    /// - `SessionError::AlreadyChecked` if the current answer was graded.
    /// - `SessionError::NoAnswerSelected` without a selection.
    /// - `SessionError::OutOfHearts` at zero hearts under the blocking policy.
    /// - `SessionError::Evaluation` if the answer cannot be graded; state is unchanged.
    pub fn check(&mut self) -> Result<Feedback, SessionError> {
        match self.status {
            ChallengeStatus::Completed => return Err(SessionError::Completed),
            ChallengeStatus::Correct | ChallengeStatus::Wrong => {
                return Err(SessionError::AlreadyChecked);
            }
            ChallengeStatus::None => {}
        }
        let answer = self.selected.as_ref().ok_or(SessionError::NoAnswerSelected)?;
        if self.hearts.is_exhausted() && self.config.zero_hearts == ZeroHeartsPolicy::Block {
            return Err(SessionError::OutOfHearts);
        }

        let challenge = &self.challenges[self.current];
        let correct = AnswerEvaluator::is_correct(challenge, answer)?;

        let cue = if correct {
            self.correct_answers += 1;
            self.status = ChallengeStatus::Correct;
            Cue::Correct
        } else {
            self.hearts = self.hearts.lose_one();
            self.status = ChallengeStatus::Wrong;
            Cue::Wrong
        };
        self.interaction.lock();

        Ok(Feedback {
            correct,
            cue,
            hearts: self.hearts,
            percentage: self.percentage(),
        })
    }

    /// The Next/Retry action after `check()`.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NotChecked` before `check()` and
    /// `SessionError::Completed` once the session is over.
    pub fn advance(&mut self) -> Result<Advance, SessionError> {
        match self.status {
            ChallengeStatus::Completed => Err(SessionError::Completed),
            ChallengeStatus::None => Err(SessionError::NotChecked),
            ChallengeStatus::Wrong => {
                self.status = ChallengeStatus::None;
                self.selected = None;
                self.rebuild_interaction()?;
                Ok(Advance::Retry)
            }
            ChallengeStatus::Correct => {
                self.current += 1;
                self.selected = None;
                if self.current == self.challenges.len() {
                    self.status = ChallengeStatus::Completed;
                    let completion = LessonCompletion::from_session(
                        self.lesson_id,
                        self.initial_hearts,
                        self.hearts,
                        self.config.points_per_lesson,
                    );
                    return Ok(Advance::Completed(completion));
                }
                self.status = ChallengeStatus::None;
                self.rebuild_interaction()?;
                Ok(Advance::Next(self.current))
            }
        }
    }

    fn rebuild_interaction(&mut self) -> Result<(), SessionError> {
        let challenge = &self.challenges[self.current];
        self.interaction =
            Interaction::for_challenge(challenge, self.config.mismatch_window, &mut self.rng)?;
        Ok(())
    }

    fn select_text(&mut self, text: String) {
        if !self.status.accepts_input() {
            return;
        }
        // An empty sentence counts as no answer.
        self.selected = if text.trim().is_empty() {
            None
        } else {
            Some(Answer::Text(text))
        };
    }

    fn require_input(&self, input: InputMode) -> Result<&Challenge, SessionError> {
        let challenge = self.current_challenge().ok_or(SessionError::Completed)?;
        if challenge.kind.input() == input {
            Ok(challenge)
        } else {
            Err(self.wrong_input(input))
        }
    }

    fn wrong_input(&self, input: InputMode) -> SessionError {
        match self.current_challenge() {
            Some(challenge) => InteractionError::WrongInput {
                kind: challenge.kind,
                input: Interaction::describe(input),
            }
            .into(),
            None => SessionError::Completed,
        }
    }
}

impl fmt::Debug for QuizSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QuizSession")
            .field("lesson_id", &self.lesson_id)
            .field("challenges_len", &self.challenges.len())
            .field("current", &self.current)
            .field("hearts", &self.hearts)
            .field("percentage", &self.percentage())
            .field("status", &self.status)
            .finish_non_exhaustive()
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
