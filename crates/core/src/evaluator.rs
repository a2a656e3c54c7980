//! Correctness judgment for a single challenge.
//!
//! Pure functions only: the evaluator holds no state and never guesses. Each
//! input mode has its own strategy and an answer of the wrong shape is an error.

use thiserror::Error;

use crate::model::{Answer, Challenge, ChallengeId, ChallengeKind, InputMode, MatchOutcome};

/// Characters dropped before comparing free-text answers.
const PUNCTUATION: &[char] = &[
    '.', ',', '/', '#', '!', '$', '%', '^', '&', '*', ';', ':', '{', '}', '=', '-', '_', '`',
    '~', '(', ')',
];

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum EvaluationError {
    #[error("{kind} challenge expects a `{expected}` answer, got `{found}`")]
    AnswerShape {
        kind: ChallengeKind,
        expected: &'static str,
        found: &'static str,
    },

    #[error("challenge {0} has no option marked correct")]
    NoCorrectOption(ChallengeId),

    #[error("challenge {0} has no correct text to compare against")]
    MissingCorrectText(ChallengeId),
}

/// Canonical form used to compare free-text answers.
///
/// Lowercases, removes punctuation, collapses whitespace runs into a single space
/// and trims. Applying it twice gives the same result as applying it once.
#[must_use]
pub fn normalize_text(input: &str) -> String {
    let stripped: String = input
        .to_lowercase()
        .chars()
        .filter(|c| !PUNCTUATION.contains(c))
        .collect();
    stripped.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Type-dispatched grading of an answer against a challenge.
#[derive(Debug, Clone, Copy, Default)]
pub struct AnswerEvaluator;

impl AnswerEvaluator {
    /// Returns whether `answer` is correct for `challenge`.
    ///
    /// # Errors
    ///
    /// Returns `EvaluationError` when the answer does not fit the challenge kind or
    /// the challenge lacks the data needed to grade it.
    pub fn is_correct(challenge: &Challenge, answer: &Answer) -> Result<bool, EvaluationError> {
        match (challenge.kind.input(), answer) {
            (InputMode::Choice, Answer::Option(selected)) => {
                let correct = challenge
                    .correct_option()
                    .ok_or(EvaluationError::NoCorrectOption(challenge.id))?;
                Ok(correct.id == *selected)
            }
            (InputMode::WordBank | InputMode::FreeText, Answer::Text(text)) => {
                let expected = challenge
                    .correct_text
                    .as_deref()
                    .ok_or(EvaluationError::MissingCorrectText(challenge.id))?;
                Ok(normalize_text(text) == normalize_text(expected))
            }
            // Pairing was already checked by the mini-game; the sentinel is trusted.
            (InputMode::Pairs, Answer::Match(outcome)) => Ok(*outcome == MatchOutcome::Matched),
            (mode, other) => Err(EvaluationError::AnswerShape {
                kind: challenge.kind,
                expected: expected_shape(mode),
                found: other.shape(),
            }),
        }
    }
}

fn expected_shape(mode: InputMode) -> &'static str {
    match mode {
        InputMode::Choice => "option",
        InputMode::WordBank | InputMode::FreeText => "text",
        InputMode::Pairs => "match",
    }
}
