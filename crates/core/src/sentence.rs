//! Word-bank sentence construction for translate-style challenges.

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SentenceError {
    #[error("the answer is locked until the challenge is retried")]
    Locked,

    #[error("no available word at position {0}")]
    NoAvailableWord(usize),

    #[error("no selected word at position {0}")]
    NoSelectedWord(usize),
}

/// Moves words between an `available` pool and an ordered `selected` sequence.
///
/// Every operation preserves the original word multiset across both lists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentenceBuilder {
    words: Vec<String>,
    selected: Vec<String>,
    available: Vec<String>,
    locked: bool,
}

impl SentenceBuilder {
    #[must_use]
    pub fn new<I, S>(words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let words: Vec<String> = words.into_iter().map(Into::into).collect();
        Self {
            available: words.clone(),
            selected: Vec::with_capacity(words.len()),
            words,
            locked: false,
        }
    }

    #[must_use]
    pub fn selected(&self) -> &[String] {
        &self.selected
    }

    #[must_use]
    pub fn available(&self) -> &[String] {
        &self.available
    }

    /// Selected words joined by single spaces.
    #[must_use]
    pub fn candidate(&self) -> String {
        self.selected.join(" ")
    }

    #[must_use]
    pub fn is_locked(&self) -> bool {
        self.locked
    }

    /// Moves `available[index]` to the end of the sentence.
    ///
    /// # Errors
    ///
    /// `SentenceError::Locked` after the answer was checked, or
    /// `SentenceError::NoAvailableWord` for an out-of-range index.
    pub fn add_word(&mut self, index: usize) -> Result<String, SentenceError> {
        self.ensure_unlocked()?;
        if index >= self.available.len() {
            return Err(SentenceError::NoAvailableWord(index));
        }
        let word = self.available.remove(index);
        self.selected.push(word);
        Ok(self.candidate())
    }

    /// Moves `selected[index]` back to the end of the pool.
    ///
    /// # Errors
    ///
    /// `SentenceError::Locked` after the answer was checked, or
    /// `SentenceError::NoSelectedWord` for an out-of-range index.
    pub fn remove_word(&mut self, index: usize) -> Result<String, SentenceError> {
        self.ensure_unlocked()?;
        if index >= self.selected.len() {
            return Err(SentenceError::NoSelectedWord(index));
        }
        let word = self.selected.remove(index);
        self.available.push(word);
        Ok(self.candidate())
    }

    pub fn lock(&mut self) {
        self.locked = true;
    }

    /// Puts every word back in its original position and unlocks.
    pub fn reset(&mut self) {
        self.selected.clear();
        self.available.clone_from(&self.words);
        self.locked = false;
    }

    fn ensure_unlocked(&self) -> Result<(), SentenceError> {
        if self.locked {
            Err(SentenceError::Locked)
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluator::AnswerEvaluator;
    use crate::model::{Answer, Challenge, ChallengeId, ChallengeKind, ChallengeOption, OptionId};

    fn sorted(mut words: Vec<String>) -> Vec<String> {
        words.sort();
        words
    }

    fn multiset(builder: &SentenceBuilder) -> Vec<String> {
        sorted(
            builder
                .selected()
                .iter()
                .chain(builder.available())
                .cloned()
                .collect(),
        )
    }

    #[test]
    fn words_are_conserved_across_moves() {
        let words = ["the", "cat", "the", "dog", "sat"];
        let original = sorted(words.iter().map(|w| (*w).to_owned()).collect());
        let mut builder = SentenceBuilder::new(words);

        let steps: [(bool, usize); 8] = [
            (true, 0),
            (true, 2),
            (true, 0),
            (false, 1),
            (true, 1),
            (false, 0),
            (true, 3),
            (false, 2),
        ];
        for (add, index) in steps {
            if add {
                builder.add_word(index).unwrap();
            } else {
                builder.remove_word(index).unwrap();
            }
            assert_eq!(multiset(&builder), original);
        }

        // Out-of-range moves leave the lists untouched.
        assert!(builder.add_word(99).is_err());
        assert!(builder.remove_word(99).is_err());
        assert_eq!(multiset(&builder), original);
    }

    #[test]
    fn add_and_remove_emit_the_candidate() {
        let mut builder = SentenceBuilder::new(["world", "hello", "there"]);
        assert_eq!(builder.add_word(1).unwrap(), "hello");
        assert_eq!(builder.add_word(0).unwrap(), "hello world");
        assert_eq!(builder.available(), ["there"]);

        assert_eq!(builder.remove_word(0).unwrap(), "world");
        assert_eq!(builder.available(), ["there", "hello"]);
    }

    #[test]
    fn locked_builder_rejects_moves_until_reset() {
        let mut builder = SentenceBuilder::new(["a", "b"]);
        builder.add_word(0).unwrap();
        builder.lock();

        assert_eq!(builder.add_word(0), Err(SentenceError::Locked));
        assert_eq!(builder.remove_word(0), Err(SentenceError::Locked));
        assert_eq!(builder.candidate(), "a");

        builder.reset();
        assert!(!builder.is_locked());
        assert!(builder.selected().is_empty());
        assert_eq!(builder.available(), ["a", "b"]);
    }

    #[test]
    fn built_sentence_is_graded_after_normalization() {
        let challenge = Challenge::new(ChallengeId::new(1), ChallengeKind::Translate, "Dumêla lefatshe")
            .with_correct_text("hello world")
            .with_options(vec![
                ChallengeOption::new(OptionId::new(1), "World!", false),
                ChallengeOption::new(OptionId::new(2), "Hello,", false),
                ChallengeOption::new(OptionId::new(3), "cat", false),
            ]);

        let mut builder = SentenceBuilder::new(challenge.word_bank());
        builder.add_word(1).unwrap();
        let candidate = builder.add_word(0).unwrap();
        assert_eq!(candidate, "Hello, World!");

        let answer = Answer::text(candidate);
        assert!(AnswerEvaluator::is_correct(&challenge, &answer).unwrap());
    }
}
