use std::sync::Arc;

use kds_core::model::{Chapter, CourseId, CourseOutline, Exam, Question};
use storage::repository::{CourseRepository, QuestionRepository};

use crate::error::ContentError;

/// Loads course content from the backing store and assembles the ordered
/// outline the gating engine works over. Content is read-only here; a course
/// is loaded once per session.
#[derive(Clone)]
pub struct CourseContentService {
    courses: Arc<dyn CourseRepository>,
    questions: Arc<dyn QuestionRepository>,
}

impl CourseContentService {
    #[must_use]
    pub fn new(courses: Arc<dyn CourseRepository>, questions: Arc<dyn QuestionRepository>) -> Self {
        Self { courses, questions }
    }

    /// Load a course by id and assemble its outline.
    ///
    /// # Errors
    ///
    /// Returns `ContentError::CourseNotFound` if the course does not exist,
    /// or storage/assembly failures.
    pub async fn load_outline(&self, course_id: CourseId) -> Result<CourseOutline, ContentError> {
        let course = self
            .courses
            .get_course(course_id)
            .await?
            .ok_or(ContentError::CourseNotFound)?;
        self.assemble(course).await
    }

    /// Load a course by its public slug and assemble its outline.
    ///
    /// # Errors
    ///
    /// Returns `ContentError::CourseNotFound` if the slug is unknown, or
    /// storage/assembly failures.
    pub async fn load_outline_by_slug(&self, slug: &str) -> Result<CourseOutline, ContentError> {
        let course = self
            .courses
            .get_course_by_slug(slug)
            .await?
            .ok_or(ContentError::CourseNotFound)?;
        self.assemble(course).await
    }

    async fn assemble(
        &self,
        course: kds_core::model::Course,
    ) -> Result<CourseOutline, ContentError> {
        let chapters = self.courses.list_chapters(course.id()).await?;
        let slides = self.courses.list_slides(course.id()).await?;
        let chapter_ids: Vec<_> = chapters.iter().map(Chapter::id).collect();
        let quiz_chapters = self.questions.list_quiz_chapters(&chapter_ids).await?;
        Ok(CourseOutline::assemble(
            course,
            chapters,
            slides,
            &quiz_chapters,
        )?)
    }

    /// The course's final-exam definition, when one is published.
    ///
    /// # Errors
    ///
    /// Returns `ContentError::Storage` on repository failures.
    pub async fn load_exam(&self, course_id: CourseId) -> Result<Option<Exam>, ContentError> {
        Ok(self.questions.get_exam(course_id).await?)
    }

    /// A chapter's quiz pool, empty when the chapter has none.
    ///
    /// # Errors
    ///
    /// Returns `ContentError::Storage` on repository failures.
    pub async fn load_chapter_pool(
        &self,
        chapter_id: kds_core::model::ChapterId,
    ) -> Result<Vec<Question>, ContentError> {
        Ok(self.questions.list_chapter_questions(chapter_id).await?)
    }
}
