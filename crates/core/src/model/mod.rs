mod answer;
mod challenge;
mod hearts;
mod ids;
mod lesson;
mod profile;
mod progress;

pub use answer::{Answer, ChallengeStatus, MatchOutcome};
pub use challenge::{Challenge, ChallengeKind, ChallengeOption, ContentError, InputMode, MediaRef};
pub use hearts::{Hearts, MAX_HEARTS};
pub use ids::{ChallengeId, LessonId, OptionId, ParseIdError, UserId};
pub use lesson::Lesson;
pub use profile::{LearnerProfile, Streak};
pub use progress::{DEFAULT_LESSON_POINTS, LessonCompletion, LessonProgress, ProgressError};
