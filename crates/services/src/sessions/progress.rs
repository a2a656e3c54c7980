use lesson_core::model::{ChallengeStatus, Hearts};

/// Snapshot of a running session for the header and footer.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionProgress {
    pub index: usize,
    pub total: usize,
    pub percentage: f64,
    pub hearts: Hearts,
    pub status: ChallengeStatus,
    /// Prompt title of the current challenge, `None` once completed.
    pub title: Option<&'static str>,
}

impl SessionProgress {
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.status == ChallengeStatus::Completed
    }
}
