use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use crate::model::ids::{ChapterId, CourseId, SlideId};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum CourseError {
    #[error("course slug cannot be empty")]
    EmptySlug,

    #[error("course title cannot be empty")]
    EmptyTitle,

    #[error("chapter title cannot be empty")]
    EmptyChapterTitle,

    #[error("slide title cannot be empty")]
    EmptySlideTitle,

    #[error("slide needs body text or a media reference")]
    EmptySlideContent,

    #[error("media reference is not a valid URL: {0}")]
    InvalidMediaRef(String),

    #[error("quiz question count must be > 0")]
    InvalidQuizQuestionCount,

    #[error("quiz time limit must be > 0 seconds")]
    InvalidQuizTimeLimit,
}

//
// ─── DELIVERY MODE ─────────────────────────────────────────────────────────────
//

/// How a course's content is delivered to the learner.
///
/// `Standard` courses are slide-by-slide with chapter quizzes and a final exam.
/// `Interactive` courses embed an externally-authored package and carry a
/// content pointer instead of slides.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryMode {
    Standard,
    Interactive,
}

impl DeliveryMode {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            DeliveryMode::Standard => "standard",
            DeliveryMode::Interactive => "interactive",
        }
    }
}

//
// ─── SETTINGS ──────────────────────────────────────────────────────────────────
//

/// Per-course defaults for chapter quizzes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CourseSettings {
    quiz_question_count: u32,
    quiz_time_limit_secs: u32,
}

impl CourseSettings {
    pub const DEFAULT_QUIZ_QUESTION_COUNT: u32 = 10;
    pub const DEFAULT_QUIZ_TIME_LIMIT_SECS: u32 = 300;

    /// Creates settings with explicit values.
    ///
    /// # Errors
    ///
    /// Returns `CourseError` if either value is zero.
    pub fn new(quiz_question_count: u32, quiz_time_limit_secs: u32) -> Result<Self, CourseError> {
        if quiz_question_count == 0 {
            return Err(CourseError::InvalidQuizQuestionCount);
        }
        if quiz_time_limit_secs == 0 {
            return Err(CourseError::InvalidQuizTimeLimit);
        }
        Ok(Self {
            quiz_question_count,
            quiz_time_limit_secs,
        })
    }

    #[must_use]
    pub fn quiz_question_count(&self) -> u32 {
        self.quiz_question_count
    }

    #[must_use]
    pub fn quiz_time_limit_secs(&self) -> u32 {
        self.quiz_time_limit_secs
    }
}

impl Default for CourseSettings {
    fn default() -> Self {
        Self {
            quiz_question_count: Self::DEFAULT_QUIZ_QUESTION_COUNT,
            quiz_time_limit_secs: Self::DEFAULT_QUIZ_TIME_LIMIT_SECS,
        }
    }
}

//
// ─── MEDIA REFERENCE ───────────────────────────────────────────────────────────
//

/// Validated pointer to slide media hosted outside the store (image, video).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaRef(Url);

impl MediaRef {
    /// Parses a media URL.
    ///
    /// # Errors
    ///
    /// Returns `CourseError::InvalidMediaRef` if the string is empty or not a URL.
    pub fn parse(raw: impl AsRef<str>) -> Result<Self, CourseError> {
        let raw = raw.as_ref().trim();
        if raw.is_empty() {
            return Err(CourseError::InvalidMediaRef(String::new()));
        }
        let url = Url::parse(raw).map_err(|_| CourseError::InvalidMediaRef(raw.to_owned()))?;
        Ok(Self(url))
    }

    #[must_use]
    pub fn url(&self) -> &Url {
        &self.0
    }
}

//
// ─── COURSE ────────────────────────────────────────────────────────────────────
//

/// A published course. Immutable from the progression engine's viewpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct Course {
    id: CourseId,
    slug: String,
    title: String,
    description: Option<String>,
    delivery_mode: DeliveryMode,
    interactive_path: Option<String>,
    settings: CourseSettings,
    created_at: DateTime<Utc>,
}

impl Course {
    /// Creates a course after validating slug and title.
    ///
    /// # Errors
    ///
    /// Returns `CourseError::EmptySlug` or `CourseError::EmptyTitle`.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: CourseId,
        slug: impl Into<String>,
        title: impl Into<String>,
        description: Option<String>,
        delivery_mode: DeliveryMode,
        interactive_path: Option<String>,
        settings: CourseSettings,
        created_at: DateTime<Utc>,
    ) -> Result<Self, CourseError> {
        let slug = slug.into();
        if slug.trim().is_empty() {
            return Err(CourseError::EmptySlug);
        }
        let title = title.into();
        if title.trim().is_empty() {
            return Err(CourseError::EmptyTitle);
        }
        Ok(Self {
            id,
            slug,
            title,
            description,
            delivery_mode,
            interactive_path,
            settings,
            created_at,
        })
    }

    #[must_use]
    pub fn id(&self) -> CourseId {
        self.id
    }

    #[must_use]
    pub fn slug(&self) -> &str {
        &self.slug
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    #[must_use]
    pub fn delivery_mode(&self) -> DeliveryMode {
        self.delivery_mode
    }

    /// Content pointer for `Interactive` delivery, when one is mapped.
    #[must_use]
    pub fn interactive_path(&self) -> Option<&str> {
        self.interactive_path.as_deref()
    }

    #[must_use]
    pub fn settings(&self) -> &CourseSettings {
        &self.settings
    }

    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

//
// ─── CHAPTER ───────────────────────────────────────────────────────────────────
//

/// An ordered chapter within a course. Owns slides and at most one quiz pool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chapter {
    id: ChapterId,
    course_id: CourseId,
    position: u32,
    title: String,
}

impl Chapter {
    /// Creates a chapter after validating the title.
    ///
    /// # Errors
    ///
    /// Returns `CourseError::EmptyChapterTitle`.
    pub fn new(
        id: ChapterId,
        course_id: CourseId,
        position: u32,
        title: impl Into<String>,
    ) -> Result<Self, CourseError> {
        let title = title.into();
        if title.trim().is_empty() {
            return Err(CourseError::EmptyChapterTitle);
        }
        Ok(Self {
            id,
            course_id,
            position,
            title,
        })
    }

    #[must_use]
    pub fn id(&self) -> ChapterId {
        self.id
    }

    #[must_use]
    pub fn course_id(&self) -> CourseId {
        self.course_id
    }

    #[must_use]
    pub fn position(&self) -> u32 {
        self.position
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }
}

//
// ─── SLIDE ─────────────────────────────────────────────────────────────────────
//

/// An ordered slide within a chapter. Total order over a course is
/// (chapter position, slide position).
#[derive(Debug, Clone, PartialEq)]
pub struct Slide {
    id: SlideId,
    chapter_id: ChapterId,
    position: u32,
    title: String,
    body: String,
    media: Option<MediaRef>,
}

impl Slide {
    /// Creates a slide after validating title and content.
    ///
    /// # Errors
    ///
    /// Returns `CourseError::EmptySlideTitle` if the title is blank, or
    /// `CourseError::EmptySlideContent` if both body and media are absent.
    pub fn new(
        id: SlideId,
        chapter_id: ChapterId,
        position: u32,
        title: impl Into<String>,
        body: impl Into<String>,
        media: Option<MediaRef>,
    ) -> Result<Self, CourseError> {
        let title = title.into();
        if title.trim().is_empty() {
            return Err(CourseError::EmptySlideTitle);
        }
        let body = body.into();
        if body.trim().is_empty() && media.is_none() {
            return Err(CourseError::EmptySlideContent);
        }
        Ok(Self {
            id,
            chapter_id,
            position,
            title,
            body,
            media,
        })
    }

    #[must_use]
    pub fn id(&self) -> SlideId {
        self.id
    }

    #[must_use]
    pub fn chapter_id(&self) -> ChapterId {
        self.chapter_id
    }

    #[must_use]
    pub fn position(&self) -> u32 {
        self.position
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn body(&self) -> &str {
        &self.body
    }

    #[must_use]
    pub fn media(&self) -> Option<&MediaRef> {
        self.media.as_ref()
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
