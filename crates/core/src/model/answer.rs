use serde::{Deserialize, Serialize};
use std::fmt;

use crate::model::ids::OptionId;

/// Result of the pair-matching mini-game, consumed as an ordinary answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MatchOutcome {
    Matched,
    NotMatched,
}

/// A learner's pending answer for the current challenge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "value")]
pub enum Answer {
    Option(OptionId),
    Text(String),
    Match(MatchOutcome),
}

impl Answer {
    #[must_use]
    pub fn text(value: impl Into<String>) -> Self {
        Answer::Text(value.into())
    }

    /// Short label used in logs and error messages.
    #[must_use]
    pub fn shape(&self) -> &'static str {
        match self {
            Answer::Option(_) => "option",
            Answer::Text(_) => "text",
            Answer::Match(_) => "match",
        }
    }
}

impl From<OptionId> for Answer {
    fn from(id: OptionId) -> Self {
        Answer::Option(id)
    }
}

impl From<MatchOutcome> for Answer {
    fn from(outcome: MatchOutcome) -> Self {
        Answer::Match(outcome)
    }
}

/// Grading state of the challenge at the session cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChallengeStatus {
    #[default]
    None,
    Correct,
    Wrong,
    Completed,
}

impl ChallengeStatus {
    /// Answers may only be changed while nothing has been checked yet.
    #[must_use]
    pub fn accepts_input(self) -> bool {
        self == ChallengeStatus::None
    }
}

impl fmt::Display for ChallengeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ChallengeStatus::None => "none",
            ChallengeStatus::Correct => "correct",
            ChallengeStatus::Wrong => "wrong",
            ChallengeStatus::Completed => "completed",
        };
        f.write_str(label)
    }
}
