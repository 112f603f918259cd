use chrono::{DateTime, Utc};

use crate::model::ids::{CourseId, UserId};

/// Learner profile as held by the remote store. The full name is optional at
/// the account level but required before a certificate can be issued.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Profile {
    id: UserId,
    full_name: Option<String>,
}

impl Profile {
    #[must_use]
    pub fn new(id: UserId, full_name: Option<String>) -> Self {
        Self { id, full_name }
    }

    #[must_use]
    pub fn id(&self) -> UserId {
        self.id
    }

    /// The trimmed display name, when one is set and non-blank.
    #[must_use]
    pub fn display_name(&self) -> Option<&str> {
        self.full_name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
    }
}

/// Purchase/enrollment state for a (user, course) pair. Flipped to paid by
/// payment verification; the progression engine only ever reads it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Enrollment {
    user_id: UserId,
    course_id: CourseId,
    paid: bool,
    updated_at: DateTime<Utc>,
}

impl Enrollment {
    #[must_use]
    pub fn new(user_id: UserId, course_id: CourseId, paid: bool, updated_at: DateTime<Utc>) -> Self {
        Self {
            user_id,
            course_id,
            paid,
            updated_at,
        }
    }

    #[must_use]
    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    #[must_use]
    pub fn course_id(&self) -> CourseId {
        self.course_id
    }

    #[must_use]
    pub fn paid(&self) -> bool {
        self.paid
    }

    #[must_use]
    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }
}
