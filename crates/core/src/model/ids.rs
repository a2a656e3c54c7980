use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Error type for parsing an identifier from a string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseIdError {
    kind: &'static str,
}

impl fmt::Display for ParseIdError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "failed to parse {} from string", self.kind)
    }
}

impl std::error::Error for ParseIdError {}

macro_rules! numeric_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(u64);

        impl $name {
            #[must_use]
            pub const fn new(id: u64) -> Self {
                Self(id)
            }

            /// Returns the underlying u64 value
            #[must_use]
            pub const fn value(&self) -> u64 {
                self.0
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!(stringify!($name), "({})"), self.0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = ParseIdError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                s.trim()
                    .parse::<u64>()
                    .map(Self::new)
                    .map_err(|_| ParseIdError {
                        kind: stringify!($name),
                    })
            }
        }
    };
}

numeric_id! {
    /// Identifier of a lesson (an ordered list of challenges).
    LessonId
}

numeric_id! {
    /// Identifier of a single challenge within a lesson.
    ChallengeId
}

numeric_id! {
    /// Identifier of a selectable challenge option.
    OptionId
}

numeric_id! {
    /// Identifier of a learner.
    UserId
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lesson_id_display_and_parse() {
        let id = LessonId::new(42);
        assert_eq!(id.to_string(), "42");
        assert_eq!("42".parse::<LessonId>().unwrap(), id);
    }

    #[test]
    fn option_id_parse_trims_whitespace() {
        assert_eq!(" 7 ".parse::<OptionId>().unwrap(), OptionId::new(7));
    }

    #[test]
    fn invalid_id_reports_kind() {
        let err = "abc".parse::<ChallengeId>().unwrap_err();
        assert_eq!(err.to_string(), "failed to parse ChallengeId from string");
    }

    #[test]
    fn debug_includes_type_name() {
        assert_eq!(format!("{:?}", UserId::new(3)), "UserId(3)");
    }

    #[test]
    fn ids_serialize_as_plain_numbers() {
        let json = serde_json::to_string(&OptionId::new(9)).unwrap();
        assert_eq!(json, "9");
    }
}
