#![forbid(unsafe_code)]

pub mod app_services;
pub mod audio;
pub mod config;
pub mod error;
pub mod remote;
pub mod report;
pub mod sessions;

pub use lesson_core::Clock;
pub use sessions as session;

pub use app_services::AppServices;
pub use audio::{AudioPlayer, Cue, SilentPlayer, Sound};
pub use config::{RemoteConfig, SessionConfig, ZeroHeartsPolicy};
pub use error::{
    AppServicesError, ContentLoadError, InteractionError, RemoteError, ReportError, SessionError,
};
pub use remote::RemoteBackend;
pub use report::{CompletedLessons, CompletionReceipt, CompletionReporter};
pub use sessions::{
    Advance, Feedback, Interaction, LessonLoopService, LessonRun, QuizSession, ReportState,
    SessionProgress, Step,
};
