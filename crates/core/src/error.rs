use thiserror::Error;

use crate::evaluator::EvaluationError;
use crate::matching::MatchingError;
use crate::model::{ContentError, ParseIdError, ProgressError};
use crate::sentence::SentenceError;

/// Any failure raised by the pure lesson domain.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum Error {
    #[error(transparent)]
    Content(#[from] ContentError),
    #[error(transparent)]
    Evaluation(#[from] EvaluationError),
    #[error(transparent)]
    Matching(#[from] MatchingError),
    #[error(transparent)]
    Sentence(#[from] SentenceError),
    #[error(transparent)]
    Progress(#[from] ProgressError),
    #[error(transparent)]
    ParseId(#[from] ParseIdError),
}
