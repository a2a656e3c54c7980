mod interaction;
mod progress;
mod service;
mod workflow;

// Public API of the session subsystem.
pub use crate::error::SessionError;
pub use interaction::Interaction;
pub use progress::SessionProgress;
pub use service::{Advance, Feedback, QuizSession};
pub use workflow::{LessonLoopService, LessonRun, ReportState, Step};
