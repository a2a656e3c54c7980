#![forbid(unsafe_code)]

pub mod error;
pub mod evaluator;
pub mod matching;
pub mod model;
pub mod sentence;
pub mod time;

pub use error::Error;
pub use evaluator::{AnswerEvaluator, EvaluationError, normalize_text};
pub use matching::{MatchEvent, MatchItem, MatchItemId, MatchPair, MatchRole, MatchingError, MatchingPairs, Selection};
pub use sentence::{SentenceBuilder, SentenceError};
pub use time::Clock;
