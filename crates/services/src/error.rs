//! Shared error types for the services crate.

use thiserror::Error;

use lesson_core::model::{ChallengeKind, ContentError, LessonId, OptionId};
use lesson_core::{EvaluationError, MatchingError, SentenceError};
use storage::repository::StorageError;
use storage::sqlite::SqliteInitError;

/// The lesson could not be turned into a playable session.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ContentLoadError {
    #[error(transparent)]
    Content(#[from] ContentError),
    #[error("lesson content unavailable: {0}")]
    Storage(#[from] StorageError),
}

/// Input routed to a challenge that cannot take it.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum InteractionError {
    #[error("{kind} challenge does not accept {input}")]
    WrongInput {
        kind: ChallengeKind,
        input: &'static str,
    },
    #[error("option {0} is not part of the current challenge")]
    UnknownOption(OptionId),
    #[error(transparent)]
    Sentence(#[from] SentenceError),
    #[error(transparent)]
    Matching(#[from] MatchingError),
}

/// Errors emitted by the quiz session.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SessionError {
    #[error(transparent)]
    ContentLoad(#[from] ContentLoadError),
    #[error("no answer selected")]
    NoAnswerSelected,
    #[error("answer already checked")]
    AlreadyChecked,
    #[error("answer has not been checked yet")]
    NotChecked,
    #[error("session already completed")]
    Completed,
    #[error("no hearts left")]
    OutOfHearts,
    #[error(transparent)]
    Evaluation(#[from] EvaluationError),
    #[error(transparent)]
    Interaction(#[from] InteractionError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl From<ContentError> for SessionError {
    fn from(err: ContentError) -> Self {
        SessionError::ContentLoad(ContentLoadError::Content(err))
    }
}

/// Errors emitted while reporting a finished lesson.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ReportError {
    #[error("could not sync completion of lesson {lesson}: {source}")]
    NetworkSync {
        lesson: LessonId,
        #[source]
        source: StorageError,
    },
    #[error("lesson is not completed yet")]
    NotCompleted,
    #[error("completion already reported")]
    AlreadyReported,
}

/// Errors emitted by the HTTP backend.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum RemoteError {
    #[error("request failed with status {0}")]
    HttpStatus(reqwest::StatusCode),
    #[error("request timed out")]
    Timeout,
    #[error("server unreachable: {0}")]
    Unreachable(String),
    #[error("unexpected response body: {0}")]
    Decode(String),
    #[error(transparent)]
    Http(reqwest::Error),
}

impl From<reqwest::Error> for RemoteError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            RemoteError::Timeout
        } else if err.is_connect() {
            RemoteError::Unreachable(err.to_string())
        } else if err.is_decode() {
            RemoteError::Decode(err.to_string())
        } else {
            RemoteError::Http(err)
        }
    }
}

impl From<RemoteError> for StorageError {
    fn from(err: RemoteError) -> Self {
        match err {
            RemoteError::HttpStatus(status) if status == reqwest::StatusCode::NOT_FOUND => {
                StorageError::NotFound
            }
            RemoteError::HttpStatus(status) if status == reqwest::StatusCode::CONFLICT => {
                StorageError::Conflict
            }
            RemoteError::Decode(msg) => StorageError::Serialization(msg),
            other => StorageError::Connection(other.to_string()),
        }
    }
}

/// Errors emitted while bootstrapping app services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AppServicesError {
    #[error(transparent)]
    Sqlite(#[from] SqliteInitError),
    #[error(transparent)]
    Remote(#[from] RemoteError),
}
