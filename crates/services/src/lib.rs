#![forbid(unsafe_code)]

pub mod app_services;
pub mod certificate_service;
pub mod content_service;
pub mod error;
pub mod exam;
pub mod payments;
pub mod progress_tracker;
pub mod quiz;
pub mod shuffle;

pub use kds_core::Clock;

pub use app_services::AppServices;
pub use certificate_service::{CertificateService, IssueStatus, IssuedCertificate};
pub use content_service::CourseContentService;
pub use error::{
    AppServicesError, CertificateIssueError, ContentError, ExamError, PaymentError, ProgressError,
    QuizError,
};
pub use exam::{
    AlwaysOnline, ConnectivityProbe, ExamConfirmation, ExamInterrupt, ExamOutcome, ExamTick,
    FinalExamService, FinalExamSession, GuardSet, SideChannelGuard,
};
pub use payments::{PaymentService, PaystackConfig, VerifiedPayment};
pub use progress_tracker::{CourseProgress, MarkOutcome, ProgressSource, ProgressTracker};
pub use quiz::{ChapterQuizService, ChapterQuizSession, QuizOutcome, QuizTick};
