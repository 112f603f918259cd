use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use kds_core::model::{
    Certificate, Chapter, ChapterId, ChapterQuizResult, Course, CourseId, Enrollment, Exam,
    ExamAttempt, ExamId, Profile, Question, Slide, SlideId, UserId,
};

use super::rows::{
    AttemptInsert, CertificateInsert, CertificateRow, ChapterRow, CourseRow, EnrollmentRow,
    ExamRow, IdRow, ProfileRow, QuestionChapterRow, QuestionRow, QuizCompletionInsert,
    QuizCompletionWire, QuizResultInsert, SlideCompletionInsert, SlideCompletionWire, SlideRow,
};
use super::{in_filter, RestStore};
use crate::repository::{
    AttemptRepository, CertificateRepository, CourseRepository, EnrollmentRepository,
    ProfileRepository, ProgressRepository, QuestionRepository, QuizCompletionRow,
    QuizResultRepository, SlideCompletionRow, Storage, StorageError,
};

fn eq<T: std::fmt::Display>(value: T) -> String {
    format!("eq.{value}")
}

#[async_trait]
impl CourseRepository for RestStore {
    async fn get_course(&self, id: CourseId) -> Result<Option<Course>, StorageError> {
        let rows: Vec<CourseRow> = self
            .select("courses", &[("id", eq(id)), ("limit", "1".into())])
            .await?;
        rows.into_iter().next().map(CourseRow::into_course).transpose()
    }

    async fn get_course_by_slug(&self, slug: &str) -> Result<Option<Course>, StorageError> {
        let rows: Vec<CourseRow> = self
            .select("courses", &[("slug", eq(slug)), ("limit", "1".into())])
            .await?;
        rows.into_iter().next().map(CourseRow::into_course).transpose()
    }

    async fn list_chapters(&self, course_id: CourseId) -> Result<Vec<Chapter>, StorageError> {
        let rows: Vec<ChapterRow> = self
            .select(
                "chapters",
                &[("course_id", eq(course_id)), ("order", "position.asc".into())],
            )
            .await?;
        rows.into_iter().map(ChapterRow::into_chapter).collect()
    }

    async fn list_slides(&self, course_id: CourseId) -> Result<Vec<Slide>, StorageError> {
        // Slides carry no course column; filter through the chapter list.
        let chapters = self.list_chapters(course_id).await?;
        if chapters.is_empty() {
            return Ok(Vec::new());
        }
        let filter = in_filter(chapters.iter().map(|c| c.id()));
        let rows: Vec<SlideRow> = self
            .select(
                "slides",
                &[("chapter_id", filter), ("order", "position.asc".into())],
            )
            .await?;
        rows.into_iter().map(SlideRow::into_slide).collect()
    }
}

#[async_trait]
impl QuestionRepository for RestStore {
    async fn list_chapter_questions(
        &self,
        chapter_id: ChapterId,
    ) -> Result<Vec<Question>, StorageError> {
        let rows: Vec<QuestionRow> = self
            .select("questions", &[("chapter_id", eq(chapter_id))])
            .await?;
        rows.into_iter().map(QuestionRow::into_question).collect()
    }

    async fn list_quiz_chapters(
        &self,
        chapter_ids: &[ChapterId],
    ) -> Result<HashSet<ChapterId>, StorageError> {
        if chapter_ids.is_empty() {
            return Ok(HashSet::new());
        }
        let rows: Vec<QuestionChapterRow> = self
            .select(
                "questions",
                &[
                    ("select", "chapter_id".into()),
                    ("chapter_id", in_filter(chapter_ids.iter())),
                ],
            )
            .await?;
        Ok(rows
            .into_iter()
            .filter_map(|row| row.chapter_id.map(ChapterId::new))
            .collect())
    }

    async fn get_exam(&self, course_id: CourseId) -> Result<Option<Exam>, StorageError> {
        let rows: Vec<ExamRow> = self
            .select("exams", &[("course_id", eq(course_id)), ("limit", "1".into())])
            .await?;
        rows.into_iter().next().map(ExamRow::into_exam).transpose()
    }

    async fn list_exam_questions(&self, exam_id: ExamId) -> Result<Vec<Question>, StorageError> {
        let rows: Vec<QuestionRow> = self
            .select("questions", &[("exam_id", eq(exam_id))])
            .await?;
        rows.into_iter().map(QuestionRow::into_question).collect()
    }
}

#[async_trait]
impl ProgressRepository for RestStore {
    async fn list_slide_completions(
        &self,
        user_id: UserId,
        course_id: CourseId,
    ) -> Result<Vec<SlideCompletionRow>, StorageError> {
        let rows: Vec<SlideCompletionWire> = self
            .select(
                "slide_completions",
                &[
                    ("select", "slide_id,completed_at".into()),
                    ("user_id", eq(user_id)),
                    ("course_id", eq(course_id)),
                ],
            )
            .await?;
        Ok(rows
            .into_iter()
            .map(|row| SlideCompletionRow {
                slide_id: SlideId::new(row.slide_id),
                completed_at: row.completed_at,
            })
            .collect())
    }

    async fn upsert_slide_completion(
        &self,
        user_id: UserId,
        course_id: CourseId,
        slide_id: SlideId,
        completed_at: DateTime<Utc>,
    ) -> Result<(), StorageError> {
        self.upsert(
            "slide_completions",
            "user_id,course_id,slide_id",
            &SlideCompletionInsert {
                user_id: user_id.value(),
                course_id: course_id.value(),
                slide_id: slide_id.value(),
                completed_at,
            },
        )
        .await
    }

    async fn list_quiz_completions(
        &self,
        user_id: UserId,
        course_id: CourseId,
    ) -> Result<Vec<QuizCompletionRow>, StorageError> {
        let rows: Vec<QuizCompletionWire> = self
            .select(
                "chapter_quiz_completions",
                &[
                    ("select", "chapter_id,completed_at".into()),
                    ("user_id", eq(user_id)),
                    ("course_id", eq(course_id)),
                ],
            )
            .await?;
        Ok(rows
            .into_iter()
            .map(|row| QuizCompletionRow {
                chapter_id: ChapterId::new(row.chapter_id),
                completed_at: row.completed_at,
            })
            .collect())
    }

    async fn upsert_quiz_completion(
        &self,
        user_id: UserId,
        course_id: CourseId,
        chapter_id: ChapterId,
        completed_at: DateTime<Utc>,
    ) -> Result<(), StorageError> {
        self.upsert(
            "chapter_quiz_completions",
            "user_id,course_id,chapter_id",
            &QuizCompletionInsert {
                user_id: user_id.value(),
                course_id: course_id.value(),
                chapter_id: chapter_id.value(),
                completed_at,
            },
        )
        .await
    }
}

#[async_trait]
impl QuizResultRepository for RestStore {
    async fn append_quiz_result(&self, result: &ChapterQuizResult) -> Result<(), StorageError> {
        self.insert(
            "chapter_quiz_results",
            &QuizResultInsert {
                user_id: result.user_id().value(),
                chapter_id: result.chapter_id().value(),
                total_count: result.total_count(),
                correct_count: result.correct_count(),
                score_pct: result.score_pct(),
                auto_submitted: result.auto_submitted(),
                created_at: result.created_at(),
            },
        )
        .await
    }
}

#[async_trait]
impl AttemptRepository for RestStore {
    async fn append_attempt(&self, attempt: &ExamAttempt) -> Result<(), StorageError> {
        self.insert("attempts", &AttemptInsert::from_attempt(attempt))
            .await
    }

    async fn has_attempt(&self, user_id: UserId, exam_id: ExamId) -> Result<bool, StorageError> {
        let rows: Vec<IdRow> = self
            .select(
                "attempts",
                &[
                    ("select", "id".into()),
                    ("user_id", eq(user_id)),
                    ("exam_id", eq(exam_id)),
                    ("limit", "1".into()),
                ],
            )
            .await?;
        Ok(!rows.is_empty())
    }
}

#[async_trait]
impl CertificateRepository for RestStore {
    async fn find_certificate(
        &self,
        user_id: UserId,
        course_id: CourseId,
    ) -> Result<Option<Certificate>, StorageError> {
        let rows: Vec<CertificateRow> = self
            .select(
                "certificates",
                &[
                    ("user_id", eq(user_id)),
                    ("course_id", eq(course_id)),
                    ("limit", "1".into()),
                ],
            )
            .await?;
        rows.into_iter()
            .next()
            .map(CertificateRow::into_certificate)
            .transpose()
    }

    async fn insert_certificate(&self, certificate: &Certificate) -> Result<(), StorageError> {
        self.insert(
            "certificates",
            &CertificateInsert::from_certificate(certificate),
        )
        .await
    }
}

#[async_trait]
impl EnrollmentRepository for RestStore {
    async fn get_enrollment(
        &self,
        user_id: UserId,
        course_id: CourseId,
    ) -> Result<Option<Enrollment>, StorageError> {
        let rows: Vec<EnrollmentRow> = self
            .select(
                "enrollments",
                &[
                    ("user_id", eq(user_id)),
                    ("course_id", eq(course_id)),
                    ("limit", "1".into()),
                ],
            )
            .await?;
        Ok(rows.into_iter().next().map(EnrollmentRow::into_enrollment))
    }

    async fn upsert_enrollment(&self, enrollment: &Enrollment) -> Result<(), StorageError> {
        self.upsert(
            "enrollments",
            "user_id,course_id",
            &EnrollmentRow::from_enrollment(enrollment),
        )
        .await
    }
}

#[async_trait]
impl ProfileRepository for RestStore {
    async fn get_profile(&self, user_id: UserId) -> Result<Option<Profile>, StorageError> {
        let rows: Vec<ProfileRow> = self
            .select(
                "profiles",
                &[
                    ("select", "id,full_name".into()),
                    ("id", eq(user_id)),
                    ("limit", "1".into()),
                ],
            )
            .await?;
        Ok(rows.into_iter().next().map(ProfileRow::into_profile))
    }
}

impl Storage {
    /// Builds a `Storage` whose every repository is the remote REST store.
    #[must_use]
    pub fn from_rest(store: RestStore) -> Self {
        Self {
            courses: Arc::new(store.clone()),
            questions: Arc::new(store.clone()),
            progress: Arc::new(store.clone()),
            quiz_results: Arc::new(store.clone()),
            attempts: Arc::new(store.clone()),
            certificates: Arc::new(store.clone()),
            enrollments: Arc::new(store.clone()),
            profiles: Arc::new(store),
        }
    }
}
