//! Wire rows for the remote store's REST endpoints, and their conversions
//! into domain types. Conversion failures surface as `Serialization` errors;
//! the store itself is trusted but rows may predate current validation rules.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use kds_core::model::{
    AttemptId, AttemptMeta, Certificate, CertificateId, Chapter, ChapterId, Course, CourseId,
    CourseSettings, DeliveryMode, Enrollment, Exam, ExamAttempt, ExamId, MediaRef, Profile,
    Question, QuestionId, Slide, SlideId, UserId,
};

use crate::repository::StorageError;

fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

fn count_u32(field: &'static str, v: i64) -> Result<u32, StorageError> {
    u32::try_from(v).map_err(|_| StorageError::Serialization(format!("invalid {field}: {v}")))
}

#[derive(Debug, Deserialize)]
pub(super) struct CourseRow {
    pub id: Uuid,
    pub slug: String,
    pub title: String,
    pub description: Option<String>,
    pub delivery_mode: Option<String>,
    pub interactive_path: Option<String>,
    pub quiz_question_count: Option<i64>,
    pub quiz_time_limit_secs: Option<i64>,
    pub created_at: DateTime<Utc>,
}

impl CourseRow {
    pub fn into_course(self) -> Result<Course, StorageError> {
        let delivery_mode = match self.delivery_mode.as_deref() {
            None | Some("standard") => DeliveryMode::Standard,
            Some("interactive") => DeliveryMode::Interactive,
            Some(other) => {
                return Err(StorageError::Serialization(format!(
                    "unknown delivery mode: {other}"
                )));
            }
        };
        let settings = match (self.quiz_question_count, self.quiz_time_limit_secs) {
            (None, None) => CourseSettings::default(),
            (count, limit) => CourseSettings::new(
                count
                    .map(|v| count_u32("quiz_question_count", v))
                    .transpose()?
                    .unwrap_or(CourseSettings::DEFAULT_QUIZ_QUESTION_COUNT),
                limit
                    .map(|v| count_u32("quiz_time_limit_secs", v))
                    .transpose()?
                    .unwrap_or(CourseSettings::DEFAULT_QUIZ_TIME_LIMIT_SECS),
            )
            .map_err(ser)?,
        };
        Course::new(
            CourseId::new(self.id),
            self.slug,
            self.title,
            self.description,
            delivery_mode,
            self.interactive_path,
            settings,
            self.created_at,
        )
        .map_err(ser)
    }
}

#[derive(Debug, Deserialize)]
pub(super) struct ChapterRow {
    pub id: Uuid,
    pub course_id: Uuid,
    pub position: i64,
    pub title: String,
}

impl ChapterRow {
    pub fn into_chapter(self) -> Result<Chapter, StorageError> {
        Chapter::new(
            ChapterId::new(self.id),
            CourseId::new(self.course_id),
            count_u32("position", self.position)?,
            self.title,
        )
        .map_err(ser)
    }
}

#[derive(Debug, Deserialize)]
pub(super) struct SlideRow {
    pub id: Uuid,
    pub chapter_id: Uuid,
    pub position: i64,
    pub title: String,
    pub body: Option<String>,
    pub media_url: Option<String>,
}

impl SlideRow {
    pub fn into_slide(self) -> Result<Slide, StorageError> {
        let media = self
            .media_url
            .as_deref()
            .filter(|raw| !raw.trim().is_empty())
            .map(MediaRef::parse)
            .transpose()
            .map_err(ser)?;
        Slide::new(
            SlideId::new(self.id),
            ChapterId::new(self.chapter_id),
            count_u32("position", self.position)?,
            self.title,
            self.body.unwrap_or_default(),
            media,
        )
        .map_err(ser)
    }
}

#[derive(Debug, Deserialize)]
pub(super) struct QuestionRow {
    pub id: Uuid,
    pub chapter_id: Option<Uuid>,
    pub prompt: String,
    pub options: Vec<String>,
    pub correct_index: i64,
}

impl QuestionRow {
    pub fn into_question(self) -> Result<Question, StorageError> {
        let correct = usize::try_from(self.correct_index)
            .map_err(|_| StorageError::Serialization(format!(
                "invalid correct_index: {}",
                self.correct_index
            )))?;
        Question::new(
            QuestionId::new(self.id),
            self.chapter_id.map(ChapterId::new),
            self.prompt,
            self.options,
            correct,
        )
        .map_err(ser)
    }
}

/// Bare chapter-id projection used when probing which chapters own pools.
#[derive(Debug, Deserialize)]
pub(super) struct QuestionChapterRow {
    pub chapter_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
pub(super) struct ExamRow {
    pub id: Uuid,
    pub course_id: Uuid,
    pub pass_mark: i64,
    pub question_count: i64,
    pub time_limit_secs: i64,
}

impl ExamRow {
    pub fn into_exam(self) -> Result<Exam, StorageError> {
        let pass_mark = u8::try_from(self.pass_mark)
            .map_err(|_| StorageError::Serialization(format!("invalid pass_mark: {}", self.pass_mark)))?;
        Exam::new(
            ExamId::new(self.id),
            CourseId::new(self.course_id),
            pass_mark,
            count_u32("question_count", self.question_count)?,
            count_u32("time_limit_secs", self.time_limit_secs)?,
        )
        .map_err(ser)
    }
}

#[derive(Debug, Deserialize)]
pub(super) struct SlideCompletionWire {
    pub slide_id: Uuid,
    pub completed_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub(super) struct QuizCompletionWire {
    pub chapter_id: Uuid,
    pub completed_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub(super) struct SlideCompletionInsert {
    pub user_id: Uuid,
    pub course_id: Uuid,
    pub slide_id: Uuid,
    pub completed_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub(super) struct QuizCompletionInsert {
    pub user_id: Uuid,
    pub course_id: Uuid,
    pub chapter_id: Uuid,
    pub completed_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub(super) struct QuizResultInsert {
    pub user_id: Uuid,
    pub chapter_id: Uuid,
    pub total_count: u32,
    pub correct_count: u32,
    pub score_pct: u8,
    pub auto_submitted: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub(super) struct AttemptInsert {
    pub id: Uuid,
    pub user_id: Uuid,
    pub exam_id: Uuid,
    pub score: u8,
    pub passed: bool,
    pub meta: AttemptMeta,
    pub created_at: DateTime<Utc>,
}

impl AttemptInsert {
    pub fn from_attempt(attempt: &ExamAttempt) -> Self {
        Self {
            id: attempt.id().value(),
            user_id: attempt.user_id().value(),
            exam_id: attempt.exam_id().value(),
            score: attempt.score_pct(),
            passed: attempt.passed(),
            meta: attempt.meta(),
            created_at: attempt.created_at(),
        }
    }
}

/// Id-only projection for existence probes.
#[derive(Debug, Deserialize)]
pub(super) struct IdRow {
    #[allow(dead_code)]
    pub id: Uuid,
}

#[derive(Debug, Deserialize)]
pub(super) struct CertificateRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub course_id: Uuid,
    pub attempt_id: Uuid,
    pub certificate_no: String,
    pub score_pct: i64,
    pub issued_at: DateTime<Utc>,
}

impl CertificateRow {
    pub fn into_certificate(self) -> Result<Certificate, StorageError> {
        let score = u8::try_from(self.score_pct)
            .map_err(|_| StorageError::Serialization(format!("invalid score_pct: {}", self.score_pct)))?;
        Certificate::new(
            CertificateId::new(self.id),
            UserId::new(self.user_id),
            CourseId::new(self.course_id),
            AttemptId::new(self.attempt_id),
            self.certificate_no,
            score,
            self.issued_at,
        )
        .map_err(ser)
    }
}

#[derive(Debug, Serialize)]
pub(super) struct CertificateInsert {
    pub id: Uuid,
    pub user_id: Uuid,
    pub course_id: Uuid,
    pub attempt_id: Uuid,
    pub certificate_no: String,
    pub score_pct: u8,
    pub issued_at: DateTime<Utc>,
}

impl CertificateInsert {
    pub fn from_certificate(certificate: &Certificate) -> Self {
        Self {
            id: certificate.id().value(),
            user_id: certificate.user_id().value(),
            course_id: certificate.course_id().value(),
            attempt_id: certificate.attempt_id().value(),
            certificate_no: certificate.certificate_no().to_owned(),
            score_pct: certificate.score_pct(),
            issued_at: certificate.issued_at(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub(super) struct EnrollmentRow {
    pub user_id: Uuid,
    pub course_id: Uuid,
    pub paid: bool,
    pub updated_at: DateTime<Utc>,
}

impl EnrollmentRow {
    pub fn from_enrollment(enrollment: &Enrollment) -> Self {
        Self {
            user_id: enrollment.user_id().value(),
            course_id: enrollment.course_id().value(),
            paid: enrollment.paid(),
            updated_at: enrollment.updated_at(),
        }
    }

    pub fn into_enrollment(self) -> Enrollment {
        Enrollment::new(
            UserId::new(self.user_id),
            CourseId::new(self.course_id),
            self.paid,
            self.updated_at,
        )
    }
}

#[derive(Debug, Deserialize)]
pub(super) struct ProfileRow {
    pub id: Uuid,
    pub full_name: Option<String>,
}

impl ProfileRow {
    pub fn into_profile(self) -> Profile {
        Profile::new(UserId::new(self.id), self.full_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn course_row_defaults_missing_settings_and_mode() {
        let row = CourseRow {
            id: Uuid::new_v4(),
            slug: "ghie-business-ethics".into(),
            title: "Business Ethics".into(),
            description: None,
            delivery_mode: None,
            interactive_path: None,
            quiz_question_count: None,
            quiz_time_limit_secs: None,
            created_at: kds_core::time::fixed_now(),
        };
        let course = row.into_course().unwrap();
        assert_eq!(course.delivery_mode(), DeliveryMode::Standard);
        assert_eq!(course.settings().quiz_question_count(), 10);
    }

    #[test]
    fn course_row_rejects_unknown_mode() {
        let row = CourseRow {
            id: Uuid::new_v4(),
            slug: "x".into(),
            title: "X".into(),
            description: None,
            delivery_mode: Some("hologram".into()),
            interactive_path: None,
            quiz_question_count: None,
            quiz_time_limit_secs: None,
            created_at: kds_core::time::fixed_now(),
        };
        assert!(matches!(
            row.into_course().unwrap_err(),
            StorageError::Serialization(_)
        ));
    }

    #[test]
    fn question_row_rejects_negative_correct_index() {
        let row = QuestionRow {
            id: Uuid::new_v4(),
            chapter_id: None,
            prompt: "p".into(),
            options: vec!["a".into(), "b".into()],
            correct_index: -1,
        };
        assert!(row.into_question().is_err());
    }

    #[test]
    fn slide_row_treats_blank_media_as_none() {
        let row = SlideRow {
            id: Uuid::new_v4(),
            chapter_id: Uuid::new_v4(),
            position: 0,
            title: "Intro".into(),
            body: Some("text".into()),
            media_url: Some("   ".into()),
        };
        let slide = row.into_slide().unwrap();
        assert!(slide.media().is_none());
    }
}
