use std::sync::{Arc, Mutex, PoisonError};

use kds_core::Clock;
use kds_core::model::{ChapterId, ChapterQuizResult, Course, UserId};
use storage::repository::{QuestionRepository, QuizResultRepository};

use crate::error::QuizError;
use crate::progress_tracker::{MarkOutcome, ProgressTracker};
use crate::shuffle::sample_questions;
use super::session::ChapterQuizSession;

/// What a quiz submission produced: the recorded result row plus the
/// quiz-completion write outcome (which may report a degraded sync).
#[derive(Debug, Clone)]
pub struct QuizOutcome {
    pub result: ChapterQuizResult,
    pub completion: MarkOutcome,
}

/// Runs chapter quizzes: samples the pool, seeds the countdown, scores on
/// submit, records the result, and marks the chapter quiz-complete.
///
/// One session at a time: `begin` refuses while another session is running,
/// mirroring the single-interval rule for countdown timers.
#[derive(Clone)]
pub struct ChapterQuizService {
    clock: Clock,
    questions: Arc<dyn QuestionRepository>,
    quiz_results: Arc<dyn QuizResultRepository>,
    progress: ProgressTracker,
    active: Arc<Mutex<Option<ChapterId>>>,
}

impl ChapterQuizService {
    #[must_use]
    pub fn new(
        clock: Clock,
        questions: Arc<dyn QuestionRepository>,
        quiz_results: Arc<dyn QuizResultRepository>,
        progress: ProgressTracker,
    ) -> Self {
        Self {
            clock,
            questions,
            quiz_results,
            progress,
            active: Arc::new(Mutex::new(None)),
        }
    }

    /// Start a quiz for the chapter: samples
    /// `min(pool, configured count)` questions in random order and seeds the
    /// countdown from the course settings.
    ///
    /// # Errors
    ///
    /// Returns `QuizError::NoQuestionPool` when the chapter has no questions,
    /// `QuizError::AlreadyRunning` while another session is active, or
    /// storage failures.
    pub async fn begin(
        &self,
        course: &Course,
        chapter_id: ChapterId,
    ) -> Result<ChapterQuizSession, QuizError> {
        {
            let active = self.active.lock().unwrap_or_else(PoisonError::into_inner);
            if active.is_some() {
                return Err(QuizError::AlreadyRunning);
            }
        }

        let pool = self.questions.list_chapter_questions(chapter_id).await?;
        if pool.is_empty() {
            return Err(QuizError::NoQuestionPool);
        }

        let settings = course.settings();
        let served = sample_questions(&pool, settings.quiz_question_count());
        let session = ChapterQuizSession::new(
            chapter_id,
            served,
            settings.quiz_time_limit_secs(),
            self.clock.now(),
        );

        *self.active.lock().unwrap_or_else(PoisonError::into_inner) = Some(chapter_id);
        Ok(session)
    }

    /// Score and record the session. `auto` marks a timeout-triggered
    /// submission in the result row. Finalizes the session and frees the
    /// active-session slot.
    ///
    /// # Errors
    ///
    /// Returns `QuizError::AlreadySubmitted` on double submission, or
    /// storage failures from the result append. A degraded quiz-completion
    /// write is reported through the outcome, not an error.
    pub async fn submit(
        &self,
        user_id: UserId,
        course: &Course,
        session: &mut ChapterQuizSession,
        auto: bool,
    ) -> Result<QuizOutcome, QuizError> {
        if session.is_finished() {
            return Err(QuizError::AlreadySubmitted);
        }

        let (correct, total) = session.score();
        let result = ChapterQuizResult::new(
            user_id,
            session.chapter_id(),
            correct,
            total,
            auto,
            self.clock.now(),
        )?;
        self.quiz_results.append_quiz_result(&result).await?;

        let completion = self
            .progress
            .mark_quiz_done(user_id, course.id(), session.chapter_id())
            .await?;

        session.finish();
        self.release(session.chapter_id());

        Ok(QuizOutcome { result, completion })
    }

    /// Close an unfinished session without recording anything, freeing the
    /// active-session slot. (Submitting frees it automatically.)
    pub fn abandon(&self, session: ChapterQuizSession) {
        self.release(session.chapter_id());
    }

    fn release(&self, chapter_id: ChapterId) {
        let mut active = self.active.lock().unwrap_or_else(PoisonError::into_inner);
        if *active == Some(chapter_id) {
            *active = None;
        }
    }
}
