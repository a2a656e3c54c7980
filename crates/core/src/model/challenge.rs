use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::matching::{MatchPair, MatchingError};
use crate::model::ids::{ChallengeId, OptionId};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

/// Content that cannot be played as delivered.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ContentError {
    #[error("unsupported challenge type: {tag}")]
    UnsupportedChallengeType { tag: String },

    #[error("lesson has no challenges")]
    EmptyLesson,

    #[error("challenge {challenge} has an empty question")]
    EmptyQuestion { challenge: ChallengeId },

    #[error("challenge {challenge} has no option marked correct")]
    NoCorrectOption { challenge: ChallengeId },

    #[error("challenge {challenge} is missing its correct text")]
    MissingCorrectText { challenge: ChallengeId },

    #[error("challenge {challenge} has an empty word bank")]
    EmptyWordBank { challenge: ChallengeId },

    #[error("challenge {challenge} repeats option {option}")]
    DuplicateOption {
        challenge: ChallengeId,
        option: OptionId,
    },

    #[error("challenge {challenge} has invalid pairs: {source}")]
    InvalidPairs {
        challenge: ChallengeId,
        #[source]
        source: MatchingError,
    },
}

//
// ─── MEDIA ─────────────────────────────────────────────────────────────────────
//

/// Opaque reference to an image or audio asset (path or URL).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MediaRef(String);

impl MediaRef {
    #[must_use]
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MediaRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

//
// ─── CHALLENGE KIND ────────────────────────────────────────────────────────────
//

/// How the learner produces an answer for a challenge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    /// Pick one option by id.
    Choice,
    /// Assemble a sentence from the option texts.
    WordBank,
    /// Type (or dictate) the answer.
    FreeText,
    /// Play the pair-matching mini-game.
    Pairs,
}

/// Every challenge type the engine knows how to render and grade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChallengeKind {
    Select,
    Assist,
    Translate,
    Match,
    TapHear,
    ListenType,
    ListenSelect,
    Speak,
}

impl ChallengeKind {
    pub const ALL: [ChallengeKind; 8] = [
        ChallengeKind::Select,
        ChallengeKind::Assist,
        ChallengeKind::Translate,
        ChallengeKind::Match,
        ChallengeKind::TapHear,
        ChallengeKind::ListenType,
        ChallengeKind::ListenSelect,
        ChallengeKind::Speak,
    ];

    /// Wire tag used by the content service.
    #[must_use]
    pub fn as_tag(self) -> &'static str {
        match self {
            ChallengeKind::Select => "SELECT",
            ChallengeKind::Assist => "ASSIST",
            ChallengeKind::Translate => "TRANSLATE",
            ChallengeKind::Match => "MATCH",
            ChallengeKind::TapHear => "TAP_HEAR",
            ChallengeKind::ListenType => "LISTEN_TYPE",
            ChallengeKind::ListenSelect => "LISTEN_SELECT",
            ChallengeKind::Speak => "SPEAK",
        }
    }

    /// Heading shown above the challenge.
    #[must_use]
    pub fn title(self) -> &'static str {
        match self {
            ChallengeKind::Select | ChallengeKind::TapHear => "Select the correct option",
            ChallengeKind::Assist => "Select the correct meaning",
            ChallengeKind::Translate => "Translate this sentence",
            ChallengeKind::Match => "Match the pairs",
            ChallengeKind::ListenType | ChallengeKind::ListenSelect => {
                "Listen and complete the challenge"
            }
            ChallengeKind::Speak => "Speak this sentence",
        }
    }

    #[must_use]
    pub fn input(self) -> InputMode {
        match self {
            ChallengeKind::Select | ChallengeKind::Assist | ChallengeKind::ListenSelect => {
                InputMode::Choice
            }
            ChallengeKind::Translate | ChallengeKind::TapHear => InputMode::WordBank,
            ChallengeKind::ListenType | ChallengeKind::Speak => InputMode::FreeText,
            ChallengeKind::Match => InputMode::Pairs,
        }
    }
}

impl fmt::Display for ChallengeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_tag())
    }
}

impl FromStr for ChallengeKind {
    type Err = ContentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let tag = s.trim();
        ChallengeKind::ALL
            .into_iter()
            .find(|kind| kind.as_tag().eq_ignore_ascii_case(tag))
            .ok_or_else(|| ContentError::UnsupportedChallengeType {
                tag: tag.to_owned(),
            })
    }
}

//
// ─── CHALLENGE ─────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChallengeOption {
    pub id: OptionId,
    pub text: String,
    pub correct: bool,
    #[serde(default)]
    pub image_ref: Option<MediaRef>,
    #[serde(default)]
    pub audio_ref: Option<MediaRef>,
}

impl ChallengeOption {
    #[must_use]
    pub fn new(id: OptionId, text: impl Into<String>, correct: bool) -> Self {
        Self {
            id,
            text: text.into(),
            correct,
            image_ref: None,
            audio_ref: None,
        }
    }

    #[must_use]
    pub fn with_image(mut self, image: impl Into<String>) -> Self {
        self.image_ref = Some(MediaRef::new(image));
        self
    }

    #[must_use]
    pub fn with_audio(mut self, audio: impl Into<String>) -> Self {
        self.audio_ref = Some(MediaRef::new(audio));
        self
    }
}

/// One graded question unit of a lesson.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Challenge {
    pub id: ChallengeId,
    pub kind: ChallengeKind,
    pub question: String,
    #[serde(default)]
    pub correct_text: Option<String>,
    #[serde(default)]
    pub audio_ref: Option<MediaRef>,
    #[serde(default)]
    pub options: Vec<ChallengeOption>,
    /// Set by the content service when the learner already passed this challenge.
    #[serde(default)]
    pub completed: bool,
}

impl Challenge {
    #[must_use]
    pub fn new(id: ChallengeId, kind: ChallengeKind, question: impl Into<String>) -> Self {
        Self {
            id,
            kind,
            question: question.into(),
            correct_text: None,
            audio_ref: None,
            options: Vec::new(),
            completed: false,
        }
    }

    #[must_use]
    pub fn with_correct_text(mut self, text: impl Into<String>) -> Self {
        self.correct_text = Some(text.into());
        self
    }

    #[must_use]
    pub fn with_audio(mut self, audio: impl Into<String>) -> Self {
        self.audio_ref = Some(MediaRef::new(audio));
        self
    }

    #[must_use]
    pub fn with_options(mut self, options: Vec<ChallengeOption>) -> Self {
        self.options = options;
        self
    }

    #[must_use]
    pub fn mark_completed(mut self, completed: bool) -> Self {
        self.completed = completed;
        self
    }

    /// First option flagged correct. Content with several wins on order.
    #[must_use]
    pub fn correct_option(&self) -> Option<&ChallengeOption> {
        self.options.iter().find(|option| option.correct)
    }

    #[must_use]
    pub fn option(&self, id: OptionId) -> Option<&ChallengeOption> {
        self.options.iter().find(|option| option.id == id)
    }

    /// Words offered to the sentence builder, in content order.
    #[must_use]
    pub fn word_bank(&self) -> Vec<String> {
        self.options.iter().map(|option| option.text.clone()).collect()
    }

    /// Pairs for the matching mini-game derived from the options.
    ///
    /// # Errors
    ///
    /// Returns `MatchingError` when a target is missing or there are too few pairs.
    pub fn match_pairs(&self) -> Result<Vec<MatchPair>, MatchingError> {
        MatchPair::from_options(&self.options)
    }

    /// Checks the challenge can be rendered and graded for its kind.
    ///
    /// # Errors
    ///
    /// Returns the first `ContentError` found.
    pub fn validate(&self) -> Result<(), ContentError> {
        let challenge = self.id;
        if self.question.trim().is_empty() {
            return Err(ContentError::EmptyQuestion { challenge });
        }

        let mut seen = HashSet::with_capacity(self.options.len());
        for option in &self.options {
            if !seen.insert(option.id) {
                return Err(ContentError::DuplicateOption {
                    challenge,
                    option: option.id,
                });
            }
        }

        match self.kind.input() {
            InputMode::Choice => {
                if self.correct_option().is_none() {
                    return Err(ContentError::NoCorrectOption { challenge });
                }
            }
            InputMode::WordBank | InputMode::FreeText => {
                let has_text = self
                    .correct_text
                    .as_deref()
                    .is_some_and(|text| !text.trim().is_empty());
                if !has_text {
                    return Err(ContentError::MissingCorrectText { challenge });
                }
                if self.kind.input() == InputMode::WordBank && self.options.is_empty() {
                    return Err(ContentError::EmptyWordBank { challenge });
                }
            }
            InputMode::Pairs => {
                self.match_pairs()
                    .map_err(|source| ContentError::InvalidPairs { challenge, source })?;
            }
        }

        Ok(())
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
