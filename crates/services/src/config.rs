use std::env;
use std::str::FromStr;

use chrono::Duration;
use lesson_core::matching::DEFAULT_MISMATCH_WINDOW_MS;
use lesson_core::model::DEFAULT_LESSON_POINTS;

/// What `check()` does once a finite heart count reaches zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ZeroHeartsPolicy {
    /// Refuse further answers until hearts are refilled.
    #[default]
    Block,
    /// Keep playing at zero hearts.
    Allow,
}

impl FromStr for ZeroHeartsPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "block" => Ok(ZeroHeartsPolicy::Block),
            "allow" => Ok(ZeroHeartsPolicy::Allow),
            other => Err(format!("unknown hearts policy: {other}")),
        }
    }
}

/// Tunables for a quiz session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionConfig {
    pub points_per_lesson: u32,
    pub zero_hearts: ZeroHeartsPolicy,
    pub mismatch_window: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            points_per_lesson: DEFAULT_LESSON_POINTS,
            zero_hearts: ZeroHeartsPolicy::default(),
            mismatch_window: Duration::milliseconds(DEFAULT_MISMATCH_WINDOW_MS),
        }
    }
}

impl SessionConfig {
    /// Reads `QUIZ_POINTS_PER_LESSON`, `QUIZ_HEARTS_AT_ZERO` and
    /// `QUIZ_MISMATCH_WINDOW_MS`, keeping defaults for unset or invalid values.
    #[must_use]
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            points_per_lesson: env_parse("QUIZ_POINTS_PER_LESSON")
                .unwrap_or(defaults.points_per_lesson),
            zero_hearts: env_parse("QUIZ_HEARTS_AT_ZERO").unwrap_or(defaults.zero_hearts),
            mismatch_window: env_parse::<u32>("QUIZ_MISMATCH_WINDOW_MS")
                .map_or(defaults.mismatch_window, |ms| {
                    Duration::milliseconds(i64::from(ms))
                }),
        }
    }
}

/// Location and credentials of the HTTP backend.
#[derive(Clone, Debug)]
pub struct RemoteConfig {
    pub base_url: String,
    pub token: Option<String>,
}

impl RemoteConfig {
    /// `None` unless `QUIZ_API_URL` is set.
    #[must_use]
    pub fn from_env() -> Option<Self> {
        let base_url = env::var("QUIZ_API_URL").ok()?;
        if base_url.trim().is_empty() {
            return None;
        }
        let token = env::var("QUIZ_API_TOKEN")
            .ok()
            .filter(|token| !token.trim().is_empty());
        Some(Self { base_url, token })
    }
}

fn env_parse<T: FromStr>(key: &str) -> Option<T> {
    let raw = env::var(key).ok()?;
    match raw.parse() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!(key, value = %raw, "ignoring invalid configuration value");
            None
        }
    }
}
