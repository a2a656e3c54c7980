//! Per-challenge input state behind the renderer contract.
//!
//! Each input mode gets its own widget state: a plain option pick, a word bank
//! driven by `SentenceBuilder`, typed text, or a `MatchingPairs` board. The
//! session rebuilds it whenever a new challenge becomes current or a wrong
//! answer is retried.

use chrono::Duration;
use lesson_core::model::{Challenge, InputMode};
use lesson_core::{MatchingPairs, SentenceBuilder};
use rand::Rng;

use crate::error::InteractionError;

#[derive(Debug, Clone)]
pub enum Interaction {
    Choice,
    WordBank(SentenceBuilder),
    FreeText,
    Pairs(MatchingPairs),
}

impl Interaction {
    pub(crate) fn for_challenge<R: Rng + ?Sized>(
        challenge: &Challenge,
        mismatch_window: Duration,
        rng: &mut R,
    ) -> Result<Self, InteractionError> {
        Ok(match challenge.kind.input() {
            InputMode::Choice => Interaction::Choice,
            InputMode::WordBank => Interaction::WordBank(SentenceBuilder::new(challenge.word_bank())),
            InputMode::FreeText => Interaction::FreeText,
            InputMode::Pairs => {
                let pairs = challenge.match_pairs()?;
                Interaction::Pairs(
                    MatchingPairs::new(&pairs, rng)?.with_mismatch_window(mismatch_window),
                )
            }
        })
    }

    /// Freezes input once the answer has been checked.
    pub(crate) fn lock(&mut self) {
        if let Interaction::WordBank(builder) = self {
            builder.lock();
        }
    }

    #[must_use]
    pub fn sentence(&self) -> Option<&SentenceBuilder> {
        match self {
            Interaction::WordBank(builder) => Some(builder),
            _ => None,
        }
    }

    #[must_use]
    pub fn board(&self) -> Option<&MatchingPairs> {
        match self {
            Interaction::Pairs(board) => Some(board),
            _ => None,
        }
    }

    /// Label used in `InteractionError::WrongInput`.
    pub(crate) fn describe(input: InputMode) -> &'static str {
        match input {
            InputMode::Choice => "option picks",
            InputMode::WordBank => "word bank moves",
            InputMode::FreeText => "typed text",
            InputMode::Pairs => "pair taps",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lesson_core::model::{ChallengeId, ChallengeKind, ChallengeOption, OptionId};
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn window() -> Duration {
        Duration::milliseconds(500)
    }

    #[test]
    fn word_bank_kinds_get_a_sentence_builder() {
        for kind in [ChallengeKind::Translate, ChallengeKind::TapHear] {
            let challenge = Challenge::new(ChallengeId::new(1), kind, "Translate")
                .with_correct_text("Dumêla rra")
                .with_options(vec![
                    ChallengeOption::new(OptionId::new(1), "rra", true),
                    ChallengeOption::new(OptionId::new(2), "Dumêla", true),
                ]);
            let interaction =
                Interaction::for_challenge(&challenge, window(), &mut StdRng::seed_from_u64(1))
                    .unwrap();
            let builder = interaction.sentence().unwrap();
            assert_eq!(builder.available(), ["rra", "Dumêla"]);
        }
    }

    #[test]
    fn match_builds_a_board_from_options() {
        let challenge = Challenge::new(ChallengeId::new(2), ChallengeKind::Match, "Match")
            .with_options(vec![
                ChallengeOption::new(OptionId::new(1), "Man", true).with_image("rra"),
                ChallengeOption::new(OptionId::new(2), "Woman", true).with_image("mma"),
            ]);
        let interaction =
            Interaction::for_challenge(&challenge, window(), &mut StdRng::seed_from_u64(1))
                .unwrap();
        assert_eq!(interaction.board().unwrap().items().len(), 4);
    }

    #[test]
    fn broken_match_content_fails_fast() {
        let challenge = Challenge::new(ChallengeId::new(3), ChallengeKind::Match, "Match")
            .with_options(vec![
                ChallengeOption::new(OptionId::new(1), "Man", true).with_image("rra"),
            ]);
        let err = Interaction::for_challenge(&challenge, window(), &mut StdRng::seed_from_u64(1))
            .unwrap_err();
        assert!(matches!(err, InteractionError::Matching(_)));
    }
}
