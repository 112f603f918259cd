use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use kds_core::model::{
    Certificate, Chapter, ChapterId, ChapterQuizResult, Course, CourseId, Enrollment, Exam,
    ExamAttempt, ExamId, Profile, Question, Slide, SlideId, UserId,
};

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("conflict")]
    Conflict,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// One completed slide as persisted for a (user, course) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlideCompletionRow {
    pub slide_id: SlideId,
    pub completed_at: DateTime<Utc>,
}

/// One quiz-complete chapter as persisted for a (user, course) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuizCompletionRow {
    pub chapter_id: ChapterId,
    pub completed_at: DateTime<Utc>,
}

//
// ─── REPOSITORY CONTRACTS ──────────────────────────────────────────────────────
//

/// Read access to published course content.
#[async_trait]
pub trait CourseRepository: Send + Sync {
    /// Fetch a course by id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on adapter failures; a missing course is `Ok(None)`.
    async fn get_course(&self, id: CourseId) -> Result<Option<Course>, StorageError>;

    /// Fetch a course by its public slug.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on adapter failures; a missing course is `Ok(None)`.
    async fn get_course_by_slug(&self, slug: &str) -> Result<Option<Course>, StorageError>;

    /// All chapters of a course, in no guaranteed order.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on adapter failures.
    async fn list_chapters(&self, course_id: CourseId) -> Result<Vec<Chapter>, StorageError>;

    /// All slides of a course, in no guaranteed order.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on adapter failures.
    async fn list_slides(&self, course_id: CourseId) -> Result<Vec<Slide>, StorageError>;
}

/// Read access to quiz pools and exam definitions.
#[async_trait]
pub trait QuestionRepository: Send + Sync {
    /// Quiz pool for a chapter; empty when the chapter has none.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on adapter failures.
    async fn list_chapter_questions(
        &self,
        chapter_id: ChapterId,
    ) -> Result<Vec<Question>, StorageError>;

    /// Of the given chapters, the ones that own a non-empty quiz pool.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on adapter failures.
    async fn list_quiz_chapters(
        &self,
        chapter_ids: &[ChapterId],
    ) -> Result<HashSet<ChapterId>, StorageError>;

    /// Final-exam definition for a course, when one is published.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on adapter failures.
    async fn get_exam(&self, course_id: CourseId) -> Result<Option<Exam>, StorageError>;

    /// Full question pool for a final exam.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on adapter failures.
    async fn list_exam_questions(&self, exam_id: ExamId) -> Result<Vec<Question>, StorageError>;
}

/// Completion state for a (user, course) pair. Implemented by the remote
/// store and by the local cache; writes must be upserts so retries and
/// re-marks stay idempotent.
#[async_trait]
pub trait ProgressRepository: Send + Sync {
    /// All recorded slide completions.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on adapter failures.
    async fn list_slide_completions(
        &self,
        user_id: UserId,
        course_id: CourseId,
    ) -> Result<Vec<SlideCompletionRow>, StorageError>;

    /// Record a slide completion, keyed on (user, course, slide).
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on adapter failures.
    async fn upsert_slide_completion(
        &self,
        user_id: UserId,
        course_id: CourseId,
        slide_id: SlideId,
        completed_at: DateTime<Utc>,
    ) -> Result<(), StorageError>;

    /// All recorded chapter-quiz completions.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on adapter failures.
    async fn list_quiz_completions(
        &self,
        user_id: UserId,
        course_id: CourseId,
    ) -> Result<Vec<QuizCompletionRow>, StorageError>;

    /// Record a chapter-quiz completion, keyed on (user, course, chapter).
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on adapter failures.
    async fn upsert_quiz_completion(
        &self,
        user_id: UserId,
        course_id: CourseId,
        chapter_id: ChapterId,
        completed_at: DateTime<Utc>,
    ) -> Result<(), StorageError>;
}

/// Append-only chapter-quiz result log.
#[async_trait]
pub trait QuizResultRepository: Send + Sync {
    /// Append one result row.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on adapter failures.
    async fn append_quiz_result(&self, result: &ChapterQuizResult) -> Result<(), StorageError>;
}

/// Append-only final-exam attempt log.
#[async_trait]
pub trait AttemptRepository: Send + Sync {
    /// Append one attempt row.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on adapter failures.
    async fn append_attempt(&self, attempt: &ExamAttempt) -> Result<(), StorageError>;

    /// Whether any attempt exists for (user, exam).
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on adapter failures.
    async fn has_attempt(&self, user_id: UserId, exam_id: ExamId) -> Result<bool, StorageError>;
}

/// Certificate records, unique per (user, course).
#[async_trait]
pub trait CertificateRepository: Send + Sync {
    /// Fetch the certificate for (user, course), when one exists.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on adapter failures.
    async fn find_certificate(
        &self,
        user_id: UserId,
        course_id: CourseId,
    ) -> Result<Option<Certificate>, StorageError>;

    /// Insert a new certificate.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Conflict` when one already exists for the
    /// (user, course) pair, or other adapter failures.
    async fn insert_certificate(&self, certificate: &Certificate) -> Result<(), StorageError>;
}

/// Enrollment/purchase flags, upserted by payment verification.
#[async_trait]
pub trait EnrollmentRepository: Send + Sync {
    /// Fetch the enrollment for (user, course), when one exists.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on adapter failures.
    async fn get_enrollment(
        &self,
        user_id: UserId,
        course_id: CourseId,
    ) -> Result<Option<Enrollment>, StorageError>;

    /// Insert or update an enrollment keyed on (user, course).
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on adapter failures.
    async fn upsert_enrollment(&self, enrollment: &Enrollment) -> Result<(), StorageError>;
}

/// Learner profiles.
#[async_trait]
pub trait ProfileRepository: Send + Sync {
    /// Fetch a profile by user id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on adapter failures; a missing profile is `Ok(None)`.
    async fn get_profile(&self, user_id: UserId) -> Result<Option<Profile>, StorageError>;
}

//
// ─── IN-MEMORY IMPLEMENTATION ──────────────────────────────────────────────────
//

/// In-memory store implementing every repository contract, for tests and
/// prototyping. Content is seeded through the inherent `put_*` methods.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    inner: Arc<Mutex<InMemoryInner>>,
}

#[derive(Default)]
struct InMemoryInner {
    courses: HashMap<CourseId, Course>,
    chapters: HashMap<CourseId, Vec<Chapter>>,
    slides: HashMap<CourseId, Vec<Slide>>,
    chapter_questions: HashMap<ChapterId, Vec<Question>>,
    exams: HashMap<CourseId, Exam>,
    exam_questions: HashMap<ExamId, Vec<Question>>,
    slide_completions: HashMap<(UserId, CourseId), HashMap<SlideId, DateTime<Utc>>>,
    quiz_completions: HashMap<(UserId, CourseId), HashMap<ChapterId, DateTime<Utc>>>,
    quiz_results: Vec<ChapterQuizResult>,
    attempts: Vec<ExamAttempt>,
    certificates: HashMap<(UserId, CourseId), Certificate>,
    enrollments: HashMap<(UserId, CourseId), Enrollment>,
    profiles: HashMap<UserId, Profile>,
}

impl InMemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, InMemoryInner>, StorageError> {
        self.inner
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))
    }

    /// Seed or replace a course.
    ///
    /// # Panics
    ///
    /// Panics if the store mutex is poisoned.
    pub fn put_course(&self, course: Course) {
        let mut inner = self.inner.lock().expect("store lock");
        inner.courses.insert(course.id(), course);
    }

    /// Seed a chapter under its course.
    ///
    /// # Panics
    ///
    /// Panics if the store mutex is poisoned.
    pub fn put_chapter(&self, chapter: Chapter) {
        let mut inner = self.inner.lock().expect("store lock");
        inner
            .chapters
            .entry(chapter.course_id())
            .or_default()
            .push(chapter);
    }

    /// Seed a slide under its course.
    ///
    /// # Panics
    ///
    /// Panics if the store mutex is poisoned.
    pub fn put_slide(&self, course_id: CourseId, slide: Slide) {
        let mut inner = self.inner.lock().expect("store lock");
        inner.slides.entry(course_id).or_default().push(slide);
    }

    /// Seed (or replace) a chapter's quiz pool.
    ///
    /// # Panics
    ///
    /// Panics if the store mutex is poisoned.
    pub fn put_chapter_questions(&self, chapter_id: ChapterId, questions: Vec<Question>) {
        let mut inner = self.inner.lock().expect("store lock");
        inner.chapter_questions.insert(chapter_id, questions);
    }

    /// Seed a course's final exam and its question pool.
    ///
    /// # Panics
    ///
    /// Panics if the store mutex is poisoned.
    pub fn put_exam(&self, exam: Exam, questions: Vec<Question>) {
        let mut inner = self.inner.lock().expect("store lock");
        inner.exam_questions.insert(exam.id(), questions);
        inner.exams.insert(exam.course_id(), exam);
    }

    /// Seed a learner profile.
    ///
    /// # Panics
    ///
    /// Panics if the store mutex is poisoned.
    pub fn put_profile(&self, profile: Profile) {
        let mut inner = self.inner.lock().expect("store lock");
        inner.profiles.insert(profile.id(), profile);
    }

    /// All recorded quiz results, for assertions in tests.
    ///
    /// # Panics
    ///
    /// Panics if the store mutex is poisoned.
    #[must_use]
    pub fn quiz_results(&self) -> Vec<ChapterQuizResult> {
        self.inner.lock().expect("store lock").quiz_results.clone()
    }

    /// All recorded exam attempts, for assertions in tests.
    ///
    /// # Panics
    ///
    /// Panics if the store mutex is poisoned.
    #[must_use]
    pub fn attempts(&self) -> Vec<ExamAttempt> {
        self.inner.lock().expect("store lock").attempts.clone()
    }
}

#[async_trait]
impl CourseRepository for InMemoryStore {
    async fn get_course(&self, id: CourseId) -> Result<Option<Course>, StorageError> {
        Ok(self.lock()?.courses.get(&id).cloned())
    }

    async fn get_course_by_slug(&self, slug: &str) -> Result<Option<Course>, StorageError> {
        Ok(self
            .lock()?
            .courses
            .values()
            .find(|c| c.slug() == slug)
            .cloned())
    }

    async fn list_chapters(&self, course_id: CourseId) -> Result<Vec<Chapter>, StorageError> {
        Ok(self.lock()?.chapters.get(&course_id).cloned().unwrap_or_default())
    }

    async fn list_slides(&self, course_id: CourseId) -> Result<Vec<Slide>, StorageError> {
        Ok(self.lock()?.slides.get(&course_id).cloned().unwrap_or_default())
    }
}

#[async_trait]
impl QuestionRepository for InMemoryStore {
    async fn list_chapter_questions(
        &self,
        chapter_id: ChapterId,
    ) -> Result<Vec<Question>, StorageError> {
        Ok(self
            .lock()?
            .chapter_questions
            .get(&chapter_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn list_quiz_chapters(
        &self,
        chapter_ids: &[ChapterId],
    ) -> Result<HashSet<ChapterId>, StorageError> {
        let inner = self.lock()?;
        Ok(chapter_ids
            .iter()
            .copied()
            .filter(|id| {
                inner
                    .chapter_questions
                    .get(id)
                    .is_some_and(|pool| !pool.is_empty())
            })
            .collect())
    }

    async fn get_exam(&self, course_id: CourseId) -> Result<Option<Exam>, StorageError> {
        Ok(self.lock()?.exams.get(&course_id).cloned())
    }

    async fn list_exam_questions(&self, exam_id: ExamId) -> Result<Vec<Question>, StorageError> {
        Ok(self
            .lock()?
            .exam_questions
            .get(&exam_id)
            .cloned()
            .unwrap_or_default())
    }
}

#[async_trait]
impl ProgressRepository for InMemoryStore {
    async fn list_slide_completions(
        &self,
        user_id: UserId,
        course_id: CourseId,
    ) -> Result<Vec<SlideCompletionRow>, StorageError> {
        Ok(self
            .lock()?
            .slide_completions
            .get(&(user_id, course_id))
            .map(|rows| {
                rows.iter()
                    .map(|(&slide_id, &completed_at)| SlideCompletionRow {
                        slide_id,
                        completed_at,
                    })
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn upsert_slide_completion(
        &self,
        user_id: UserId,
        course_id: CourseId,
        slide_id: SlideId,
        completed_at: DateTime<Utc>,
    ) -> Result<(), StorageError> {
        let mut inner = self.lock()?;
        let rows = inner
            .slide_completions
            .entry((user_id, course_id))
            .or_default();
        let entry = rows.entry(slide_id).or_insert(completed_at);
        if completed_at < *entry {
            *entry = completed_at;
        }
        Ok(())
    }

    async fn list_quiz_completions(
        &self,
        user_id: UserId,
        course_id: CourseId,
    ) -> Result<Vec<QuizCompletionRow>, StorageError> {
        Ok(self
            .lock()?
            .quiz_completions
            .get(&(user_id, course_id))
            .map(|rows| {
                rows.iter()
                    .map(|(&chapter_id, &completed_at)| QuizCompletionRow {
                        chapter_id,
                        completed_at,
                    })
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn upsert_quiz_completion(
        &self,
        user_id: UserId,
        course_id: CourseId,
        chapter_id: ChapterId,
        completed_at: DateTime<Utc>,
    ) -> Result<(), StorageError> {
        let mut inner = self.lock()?;
        let rows = inner
            .quiz_completions
            .entry((user_id, course_id))
            .or_default();
        let entry = rows.entry(chapter_id).or_insert(completed_at);
        if completed_at < *entry {
            *entry = completed_at;
        }
        Ok(())
    }
}

#[async_trait]
impl QuizResultRepository for InMemoryStore {
    async fn append_quiz_result(&self, result: &ChapterQuizResult) -> Result<(), StorageError> {
        self.lock()?.quiz_results.push(result.clone());
        Ok(())
    }
}

#[async_trait]
impl AttemptRepository for InMemoryStore {
    async fn append_attempt(&self, attempt: &ExamAttempt) -> Result<(), StorageError> {
        self.lock()?.attempts.push(attempt.clone());
        Ok(())
    }

    async fn has_attempt(&self, user_id: UserId, exam_id: ExamId) -> Result<bool, StorageError> {
        Ok(self
            .lock()?
            .attempts
            .iter()
            .any(|a| a.user_id() == user_id && a.exam_id() == exam_id))
    }
}

#[async_trait]
impl CertificateRepository for InMemoryStore {
    async fn find_certificate(
        &self,
        user_id: UserId,
        course_id: CourseId,
    ) -> Result<Option<Certificate>, StorageError> {
        Ok(self.lock()?.certificates.get(&(user_id, course_id)).cloned())
    }

    async fn insert_certificate(&self, certificate: &Certificate) -> Result<(), StorageError> {
        let mut inner = self.lock()?;
        let key = (certificate.user_id(), certificate.course_id());
        if inner.certificates.contains_key(&key) {
            return Err(StorageError::Conflict);
        }
        inner.certificates.insert(key, certificate.clone());
        Ok(())
    }
}

#[async_trait]
impl EnrollmentRepository for InMemoryStore {
    async fn get_enrollment(
        &self,
        user_id: UserId,
        course_id: CourseId,
    ) -> Result<Option<Enrollment>, StorageError> {
        Ok(self.lock()?.enrollments.get(&(user_id, course_id)).cloned())
    }

    async fn upsert_enrollment(&self, enrollment: &Enrollment) -> Result<(), StorageError> {
        self.lock()?.enrollments.insert(
            (enrollment.user_id(), enrollment.course_id()),
            enrollment.clone(),
        );
        Ok(())
    }
}

#[async_trait]
impl ProfileRepository for InMemoryStore {
    async fn get_profile(&self, user_id: UserId) -> Result<Option<Profile>, StorageError> {
        Ok(self.lock()?.profiles.get(&user_id).cloned())
    }
}

//
// ─── STORAGE AGGREGATE ─────────────────────────────────────────────────────────
//

/// Aggregates the repository contracts behind trait objects for easy backend
/// swapping (remote REST store in production, in-memory in tests).
#[derive(Clone)]
pub struct Storage {
    pub courses: Arc<dyn CourseRepository>,
    pub questions: Arc<dyn QuestionRepository>,
    pub progress: Arc<dyn ProgressRepository>,
    pub quiz_results: Arc<dyn QuizResultRepository>,
    pub attempts: Arc<dyn AttemptRepository>,
    pub certificates: Arc<dyn CertificateRepository>,
    pub enrollments: Arc<dyn EnrollmentRepository>,
    pub profiles: Arc<dyn ProfileRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        let store = InMemoryStore::new();
        Self::from_in_memory(&store)
    }

    /// Builds a `Storage` sharing the given in-memory store, so tests can
    /// keep a handle for seeding and assertions.
    #[must_use]
    pub fn from_in_memory(store: &InMemoryStore) -> Self {
        Self {
            courses: Arc::new(store.clone()),
            questions: Arc::new(store.clone()),
            progress: Arc::new(store.clone()),
            quiz_results: Arc::new(store.clone()),
            attempts: Arc::new(store.clone()),
            certificates: Arc::new(store.clone()),
            enrollments: Arc::new(store.clone()),
            profiles: Arc::new(store.clone()),
        }
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
