//! Shared error types for the services crate.

use thiserror::Error;

use kds_core::model::{AssessmentError, OutlineError, QuestionError};
use storage::repository::StorageError;
use storage::sqlite::SqliteInitError;

/// Errors emitted by `CourseContentService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ContentError {
    #[error("course not found")]
    CourseNotFound,
    #[error(transparent)]
    Outline(#[from] OutlineError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `ProgressTracker`.
///
/// Degraded paths (remote down, cache down) are not errors; they surface in
/// the returned outcome. An error here means neither side accepted the
/// operation.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ProgressError {
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl From<ProgressError> for QuizError {
    fn from(e: ProgressError) -> Self {
        match e {
            ProgressError::Storage(inner) => QuizError::Storage(inner),
        }
    }
}

/// Errors emitted by `ChapterQuizService` and quiz sessions.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum QuizError {
    #[error("chapter has no quiz question pool")]
    NoQuestionPool,
    #[error("another quiz session is already running")]
    AlreadyRunning,
    #[error("quiz session already submitted")]
    AlreadySubmitted,
    #[error("selection out of range: question {question_index}, option {option_index}")]
    InvalidSelection {
        question_index: usize,
        option_index: usize,
    },
    #[error(transparent)]
    Assessment(#[from] AssessmentError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `FinalExamService` and exam sessions.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ExamError {
    #[error("{remaining} slide(s) still incomplete")]
    ContentIncomplete { remaining: usize },
    #[error("{pending} chapter quiz(zes) still unresolved")]
    QuizzesIncomplete { pending: usize },
    #[error("no final exam with questions is published for this course")]
    ExamUnavailable,
    #[error("final exam already attempted; no retry is available")]
    AlreadyAttempted,
    #[error("network connection required to start the exam")]
    Offline,
    #[error("exam policy must be acknowledged before starting")]
    PolicyNotAcknowledged,
    #[error("another exam session is already running")]
    AnotherSessionActive,
    #[error("exam session already submitted")]
    AlreadySubmitted,
    #[error("selection out of range: question {question_index}, option {option_index}")]
    InvalidSelection {
        question_index: usize,
        option_index: usize,
    },
    #[error(transparent)]
    Assessment(#[from] AssessmentError),
    #[error(transparent)]
    Question(#[from] QuestionError),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Certificate(#[from] CertificateIssueError),
}

/// Errors emitted by `CertificateService`, each mapping to a distinct
/// remedial action in the UI.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CertificateIssueError {
    /// No signed-in profile; the learner must re-authenticate.
    #[error("not signed in")]
    NotAuthenticated,
    /// The profile has no display name, which is baked into the certificate.
    #[error("add your full name to your profile before issuing a certificate")]
    MissingFullName,
    /// The passing attempt could not be recorded.
    #[error("could not record attempt")]
    AttemptFailed(#[source] StorageError),
    /// Certificate lookup or insert failed; safe to retry.
    #[error("could not issue certificate: {0}")]
    CertFailed(String),
}

/// Errors emitted by `PaymentService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum PaymentError {
    #[error("payment verification is not configured")]
    Disabled,
    #[error("payment gateway returned status {0}")]
    HttpStatus(reqwest::StatusCode),
    #[error(transparent)]
    Http(#[from] reqwest::Error),
    #[error("transaction not successful (yet)")]
    NotSuccessful,
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted while bootstrapping app services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AppServicesError {
    #[error(transparent)]
    Sqlite(#[from] SqliteInitError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}
