use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Error type for parsing an ID from a string.
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

macro_rules! entity_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Wraps an existing UUID, typically one read from the remote store.
            #[must_use]
            pub fn new(id: Uuid) -> Self {
                Self(id)
            }

            /// Generates a fresh random (v4) identifier.
            #[must_use]
            pub fn generate() -> Self {
                Self(Uuid::new_v4())
            }

            /// Returns the underlying UUID.
            #[must_use]
            pub fn value(&self) -> Uuid {
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
                s.parse::<Uuid>()
                    .map($name::new)
                    .map_err(|_| ParseIdError {
                        kind: stringify!($name),
                    })
            }
        }
    };
}

entity_id!(
    /// Unique identifier for a learner account.
    UserId
);
entity_id!(
    /// Unique identifier for a Course.
    CourseId
);
entity_id!(
    /// Unique identifier for a Chapter.
    ChapterId
);
entity_id!(
    /// Unique identifier for a Slide.
    SlideId
);
entity_id!(
    /// Unique identifier for a quiz or exam Question.
    QuestionId
);
entity_id!(
    /// Unique identifier for a final Exam definition.
    ExamId
);
entity_id!(
    /// Unique identifier for a recorded exam Attempt.
    AttemptId
);
entity_id!(
    /// Unique identifier for an issued Certificate.
    CertificateId
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_round_trips_through_from_str() {
        let id = CourseId::generate();
        let parsed: CourseId = id.to_string().parse().unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn from_str_rejects_non_uuid() {
        let result = "not-a-uuid".parse::<SlideId>();
        assert!(result.is_err());
    }

    #[test]
    fn debug_includes_type_name() {
        let id = UserId::new(Uuid::nil());
        let rendered = format!("{id:?}");
        assert!(rendered.starts_with("UserId("));
    }

    #[test]
    fn generated_ids_are_distinct() {
        assert_ne!(SlideId::generate(), SlideId::generate());
    }
}
