use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, Utc};

use kds_core::model::{CourseId, Exam, ExamId, Question, UserId};

use super::guards::GuardSet;
use crate::error::ExamError;

/// One second of countdown progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExamTick {
    Running { remaining_secs: u32 },
    /// The countdown reached zero; the driver must submit with `auto = true`.
    Expired,
}

/// Host events that force an automatic submission while the exam runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExamInterrupt {
    /// The tab was switched away (visibility changed to hidden).
    TabHidden,
    /// The page is about to close; submit as synchronously as possible.
    PageUnload,
}

/// Proof that the locked → confirm transition succeeded: all slides done,
/// all chapter quizzes resolved, a non-empty exam published, and no prior
/// attempt. Produced by `FinalExamService::confirm`, consumed by `begin`.
#[derive(Debug, Clone)]
pub struct ExamConfirmation {
    pub(crate) user_id: UserId,
    pub(crate) course_id: CourseId,
    pub(crate) exam: Exam,
    pub(crate) pool: Vec<Question>,
}

impl ExamConfirmation {
    #[must_use]
    pub fn exam(&self) -> &Exam {
        &self.exam
    }

    /// Size of the full question pool (the served set may be smaller).
    #[must_use]
    pub fn pool_size(&self) -> usize {
        self.pool.len()
    }
}

/// A running final exam: served questions (order and options randomized),
/// the learner's selections, the countdown, and the engaged guard set.
///
/// Every exit path (submit, expiry, interrupt, drop) releases the guards
/// and frees the one-active-exam slot.
pub struct FinalExamSession {
    user_id: UserId,
    course_id: CourseId,
    exam: Exam,
    questions: Vec<Question>,
    answers: Vec<Option<usize>>,
    remaining_secs: u32,
    started_at: DateTime<Utc>,
    guards: GuardSet,
    active: Arc<Mutex<Option<ExamId>>>,
    finished: bool,
}

impl FinalExamSession {
    pub(crate) fn new(
        confirmation: &ExamConfirmation,
        questions: Vec<Question>,
        mut guards: GuardSet,
        active: Arc<Mutex<Option<ExamId>>>,
        started_at: DateTime<Utc>,
    ) -> Self {
        guards.engage();
        let answers = vec![None; questions.len()];
        let remaining_secs = confirmation.exam.time_limit_secs();
        Self {
            user_id: confirmation.user_id,
            course_id: confirmation.course_id,
            exam: confirmation.exam.clone(),
            questions,
            answers,
            remaining_secs,
            started_at,
            guards,
            active,
            finished: false,
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
    pub fn exam(&self) -> &Exam {
        &self.exam
    }

    #[must_use]
    pub fn questions(&self) -> &[Question] {
        &self.questions
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

    #[must_use]
    pub fn guards_engaged(&self) -> bool {
        self.guards.is_engaged()
    }

    /// Record the learner's choice for a question. Re-selection overwrites.
    ///
    /// # Errors
    ///
    /// Returns `ExamError::AlreadySubmitted` after submission, or
    /// `ExamError::InvalidSelection` for out-of-range indices.
    pub fn select_answer(
        &mut self,
        question_index: usize,
        option_index: usize,
    ) -> Result<(), ExamError> {
        if self.finished {
            return Err(ExamError::AlreadySubmitted);
        }
        let valid = self
            .questions
            .get(question_index)
            .is_some_and(|q| option_index < q.options().len());
        if !valid {
            return Err(ExamError::InvalidSelection {
                question_index,
                option_index,
            });
        }
        self.answers[question_index] = Some(option_index);
        Ok(())
    }

    /// Advance the countdown by one second of driver time.
    pub fn tick(&mut self) -> ExamTick {
        if self.finished || self.remaining_secs == 0 {
            return ExamTick::Expired;
        }
        self.remaining_secs -= 1;
        if self.remaining_secs == 0 {
            ExamTick::Expired
        } else {
            ExamTick::Running {
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
        let total = u32::try_from(self.questions.len()).unwrap_or(u32::MAX);
        (u32::try_from(correct).unwrap_or(u32::MAX), total)
    }

    /// Finalize: release guards and free the active-exam slot. Idempotent.
    pub(crate) fn finish(&mut self) {
        self.finished = true;
        self.guards.release();
        self.clear_active();
    }

    fn clear_active(&self) {
        let mut active = self.active.lock().unwrap_or_else(PoisonError::into_inner);
        if *active == Some(self.exam.id()) {
            *active = None;
        }
    }
}

impl Drop for FinalExamSession {
    fn drop(&mut self) {
        // Unmount path: guards release via GuardSet's own drop; the active
        // slot still needs freeing here.
        self.clear_active();
    }
}
