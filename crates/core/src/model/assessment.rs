use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::ids::{AttemptId, ChapterId, CourseId, ExamId, UserId};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum AssessmentError {
    #[error("correct count {correct} exceeds total count {total}")]
    CorrectExceedsTotal { correct: u32, total: u32 },

    #[error("exam pass mark must be between 1 and 100, got {0}")]
    InvalidPassMark(u8),

    #[error("exam question count must be > 0")]
    InvalidQuestionCount,

    #[error("exam time limit must be > 0 seconds")]
    InvalidTimeLimit,
}

//
// ─── SCORING ───────────────────────────────────────────────────────────────────
//

/// Percentage score, rounded to the nearest whole percent. Zero total scores
/// zero.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn score_pct(correct: u32, total: u32) -> u8 {
    if total == 0 {
        return 0;
    }
    let pct = (f64::from(correct) / f64::from(total) * 100.0).round();
    pct.clamp(0.0, 100.0) as u8
}

//
// ─── EXAM DEFINITION ───────────────────────────────────────────────────────────
//

/// Final-exam parameters for a course.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Exam {
    id: ExamId,
    course_id: CourseId,
    pass_mark: u8,
    question_count: u32,
    time_limit_secs: u32,
}

impl Exam {
    /// Creates an exam definition after validating its parameters.
    ///
    /// # Errors
    ///
    /// Returns `AssessmentError` for a pass mark outside 1..=100, a zero
    /// question count, or a zero time limit.
    pub fn new(
        id: ExamId,
        course_id: CourseId,
        pass_mark: u8,
        question_count: u32,
        time_limit_secs: u32,
    ) -> Result<Self, AssessmentError> {
        if pass_mark == 0 || pass_mark > 100 {
            return Err(AssessmentError::InvalidPassMark(pass_mark));
        }
        if question_count == 0 {
            return Err(AssessmentError::InvalidQuestionCount);
        }
        if time_limit_secs == 0 {
            return Err(AssessmentError::InvalidTimeLimit);
        }
        Ok(Self {
            id,
            course_id,
            pass_mark,
            question_count,
            time_limit_secs,
        })
    }

    #[must_use]
    pub fn id(&self) -> ExamId {
        self.id
    }

    #[must_use]
    pub fn course_id(&self) -> CourseId {
        self.course_id
    }

    #[must_use]
    pub fn pass_mark(&self) -> u8 {
        self.pass_mark
    }

    /// Number of questions served per attempt (the pool may be larger).
    #[must_use]
    pub fn question_count(&self) -> u32 {
        self.question_count
    }

    #[must_use]
    pub fn time_limit_secs(&self) -> u32 {
        self.time_limit_secs
    }

    /// Grades a finished attempt against this exam's pass mark.
    ///
    /// # Errors
    ///
    /// Returns `AssessmentError::CorrectExceedsTotal` if `correct > total`.
    pub fn grade(&self, correct: u32, total: u32) -> Result<ExamGrade, AssessmentError> {
        if correct > total {
            return Err(AssessmentError::CorrectExceedsTotal { correct, total });
        }
        let score = score_pct(correct, total);
        Ok(ExamGrade {
            total_count: total,
            correct_count: correct,
            score_pct: score,
            passed: score >= self.pass_mark,
        })
    }
}

/// Outcome of grading a final-exam submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExamGrade {
    pub total_count: u32,
    pub correct_count: u32,
    pub score_pct: u8,
    pub passed: bool,
}

//
// ─── CHAPTER QUIZ RESULT ───────────────────────────────────────────────────────
//

/// One chapter-quiz attempt in time. Append-only; the gating engine only
/// checks that at least one result exists per chapter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChapterQuizResult {
    user_id: UserId,
    chapter_id: ChapterId,
    total_count: u32,
    correct_count: u32,
    score_pct: u8,
    auto_submitted: bool,
    created_at: DateTime<Utc>,
}

impl ChapterQuizResult {
    /// Builds a result row, computing the score percentage.
    ///
    /// # Errors
    ///
    /// Returns `AssessmentError::CorrectExceedsTotal` if `correct > total`.
    pub fn new(
        user_id: UserId,
        chapter_id: ChapterId,
        correct_count: u32,
        total_count: u32,
        auto_submitted: bool,
        created_at: DateTime<Utc>,
    ) -> Result<Self, AssessmentError> {
        if correct_count > total_count {
            return Err(AssessmentError::CorrectExceedsTotal {
                correct: correct_count,
                total: total_count,
            });
        }
        Ok(Self {
            user_id,
            chapter_id,
            total_count,
            correct_count,
            score_pct: score_pct(correct_count, total_count),
            auto_submitted,
            created_at,
        })
    }

    #[must_use]
    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    #[must_use]
    pub fn chapter_id(&self) -> ChapterId {
        self.chapter_id
    }

    #[must_use]
    pub fn total_count(&self) -> u32 {
        self.total_count
    }

    #[must_use]
    pub fn correct_count(&self) -> u32 {
        self.correct_count
    }

    #[must_use]
    pub fn score_pct(&self) -> u8 {
        self.score_pct
    }

    #[must_use]
    pub fn auto_submitted(&self) -> bool {
        self.auto_submitted
    }

    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

//
// ─── EXAM ATTEMPT ──────────────────────────────────────────────────────────────
//

/// Metadata recorded with every exam attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttemptMeta {
    #[serde(rename = "autoSubmit")]
    pub auto_submit: bool,
    pub total: u32,
    #[serde(rename = "correctCount")]
    pub correct_count: u32,
}

/// One final-exam attempt. Append-only; any existing attempt exhausts the
/// single-attempt policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExamAttempt {
    id: AttemptId,
    user_id: UserId,
    exam_id: ExamId,
    score_pct: u8,
    passed: bool,
    meta: AttemptMeta,
    created_at: DateTime<Utc>,
}

impl ExamAttempt {
    #[must_use]
    pub fn new(
        id: AttemptId,
        user_id: UserId,
        exam_id: ExamId,
        score_pct: u8,
        passed: bool,
        meta: AttemptMeta,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            user_id,
            exam_id,
            score_pct,
            passed,
            meta,
            created_at,
        }
    }

    #[must_use]
    pub fn id(&self) -> AttemptId {
        self.id
    }

    #[must_use]
    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    #[must_use]
    pub fn exam_id(&self) -> ExamId {
        self.exam_id
    }

    #[must_use]
    pub fn score_pct(&self) -> u8 {
        self.score_pct
    }

    #[must_use]
    pub fn passed(&self) -> bool {
        self.passed
    }

    #[must_use]
    pub fn meta(&self) -> AttemptMeta {
        self.meta
    }

    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
