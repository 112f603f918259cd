use chrono::{DateTime, Utc};

use kds_core::model::{ChapterId, Question};

use crate::error::QuizError;

/// One second of countdown progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuizTick {
    Running { remaining_secs: u32 },
    /// The countdown reached zero; the driver must submit with `auto = true`.
    Expired,
}

/// An in-flight chapter quiz: sampled questions, the learner's selections,
/// and a second-granularity countdown driven by the caller's timer.
///
/// Construction goes through `ChapterQuizService::begin`, which enforces the
/// one-active-session rule and the non-empty-pool precondition.
pub struct ChapterQuizSession {
    chapter_id: ChapterId,
    questions: Vec<Question>,
    answers: Vec<Option<usize>>,
    remaining_secs: u32,
    started_at: DateTime<Utc>,
    finished: bool,
}

impl ChapterQuizSession {
    pub(crate) fn new(
        chapter_id: ChapterId,
        questions: Vec<Question>,
        time_limit_secs: u32,
        started_at: DateTime<Utc>,
    ) -> Self {
        let answers = vec![None; questions.len()];
        Self {
            chapter_id,
            questions,
            answers,
            remaining_secs: time_limit_secs,
            started_at,
            finished: false,
        }
    }

    #[must_use]
    pub fn chapter_id(&self) -> ChapterId {
        self.chapter_id
    }

    #[must_use]
    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    #[must_use]
    pub fn total_questions(&self) -> u32 {
        u32::try_from(self.questions.len()).unwrap_or(u32::MAX)
    }

    #[must_use]
    pub fn answers(&self) -> &[Option<usize>] {
        &self.answers
    }

    #[must_use]
    pub fn remaining_secs(&self) -> u32 {
        self.remaining_secs
    }

    #[must_use]
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Record the learner's choice for a question. Re-selection overwrites.
    ///
    /// # Errors
    ///
    /// Returns `QuizError::AlreadySubmitted` after submission, or
    /// `QuizError::InvalidSelection` for out-of-range indices.
    pub fn select_answer(
        &mut self,
        question_index: usize,
        option_index: usize,
    ) -> Result<(), QuizError> {
        if self.finished {
            return Err(QuizError::AlreadySubmitted);
        }
        let valid = self
            .questions
            .get(question_index)
            .is_some_and(|q| option_index < q.options().len());
        if !valid {
            return Err(QuizError::InvalidSelection {
                question_index,
                option_index,
            });
        }
        self.answers[question_index] = Some(option_index);
        Ok(())
    }

    /// Advance the countdown by one second of driver time.
    pub fn tick(&mut self) -> QuizTick {
        if self.finished || self.remaining_secs == 0 {
            return QuizTick::Expired;
        }
        self.remaining_secs -= 1;
        if self.remaining_secs == 0 {
            QuizTick::Expired
        } else {
            QuizTick::Running {
                remaining_secs: self.remaining_secs,
            }
        }
    }

    /// (correct, total) over the served questions; unanswered counts wrong.
    pub(crate) fn score(&self) -> (u32, u32) {
        let correct = self
            .questions
            .iter()
            .zip(&self.answers)
            .filter(|(question, answer)| answer.is_some_and(|chosen| question.is_correct(chosen)))
            .count();
        (
            u32::try_from(correct).unwrap_or(u32::MAX),
            self.total_questions(),
        )
    }

    pub(crate) fn finish(&mut self) {
        self.finished = true;
    }
}
