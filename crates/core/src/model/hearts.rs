use serde::{Deserialize, Serialize};
use std::fmt;

/// Full heart count for a learner after a refill.
pub const MAX_HEARTS: u32 = 5;

/// Depletable resource lost on wrong answers.
///
/// Learners with an active subscription play with `Unlimited` hearts and never lose any.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Hearts {
    Finite(u32),
    Unlimited,
}

impl Hearts {
    /// Hearts after one wrong answer; never goes below zero.
    #[must_use]
    pub fn lose_one(self) -> Self {
        match self {
            Hearts::Finite(n) => Hearts::Finite(n.saturating_sub(1)),
            Hearts::Unlimited => Hearts::Unlimited,
        }
    }

    #[must_use]
    pub fn is_exhausted(self) -> bool {
        matches!(self, Hearts::Finite(0))
    }

    /// Remaining hearts, `None` when unlimited.
    #[must_use]
    pub fn remaining(self) -> Option<u32> {
        match self {
            Hearts::Finite(n) => Some(n),
            Hearts::Unlimited => None,
        }
    }

    /// Hearts spent going from `initial` to `self`. Zero whenever either side is unlimited.
    #[must_use]
    pub fn used_since(self, initial: Hearts) -> u32 {
        match (initial, self) {
            (Hearts::Finite(start), Hearts::Finite(now)) => start.saturating_sub(now),
            _ => 0,
        }
    }
}

impl fmt::Display for Hearts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Hearts::Finite(n) => write!(f, "{n}"),
            Hearts::Unlimited => f.write_str("unlimited"),
        }
    }
}
