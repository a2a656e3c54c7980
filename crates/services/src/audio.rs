//! Sound feedback. Playback is best-effort: failures are logged and never
//! change the outcome of an answer.

use lesson_core::model::MediaRef;
use thiserror::Error;

/// Fixed feedback sounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cue {
    Correct,
    Wrong,
    LessonFinished,
}

impl Cue {
    #[must_use]
    pub fn asset(self) -> &'static str {
        match self {
            Cue::Correct => "/assets/correct.mp3",
            Cue::Wrong => "/assets/wrong.mp3",
            Cue::LessonFinished => "/assets/lesson_finish.mp3",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Sound {
    Cue(Cue),
    Media(MediaRef),
}

impl From<Cue> for Sound {
    fn from(cue: Cue) -> Self {
        Sound::Cue(cue)
    }
}

impl From<MediaRef> for Sound {
    fn from(media: MediaRef) -> Self {
        Sound::Media(media)
    }
}

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AudioError {
    #[error("audio output unavailable: {0}")]
    Unavailable(String),
    #[error("cannot play {0}")]
    Playback(String),
}

pub trait AudioPlayer: Send + Sync {
    /// # Errors
    ///
    /// Returns `AudioError` when the sound cannot be played.
    fn play(&self, sound: &Sound) -> Result<(), AudioError>;
}

/// Discards every sound.
#[derive(Debug, Clone, Copy, Default)]
pub struct SilentPlayer;

impl AudioPlayer for SilentPlayer {
    fn play(&self, _sound: &Sound) -> Result<(), AudioError> {
        Ok(())
    }
}

pub(crate) fn play_best_effort(player: &dyn AudioPlayer, sound: impl Into<Sound>) {
    let sound = sound.into();
    if let Err(err) = player.play(&sound) {
        tracing::warn!(?sound, error = %err, "audio playback failed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Broken;

    impl AudioPlayer for Broken {
        fn play(&self, _sound: &Sound) -> Result<(), AudioError> {
            Err(AudioError::Unavailable("no device".into()))
        }
    }

    #[test]
    fn playback_failures_are_swallowed() {
        play_best_effort(&Broken, Cue::Wrong);
        play_best_effort(&SilentPlayer, MediaRef::new("/audio/rra.mp3"));
    }
}
