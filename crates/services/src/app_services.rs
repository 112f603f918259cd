use std::sync::Arc;

use kds_core::Clock;
use storage::repository::{ProgressRepository, Storage};
use storage::sqlite::SqliteProgressCache;

use crate::certificate_service::CertificateService;
use crate::content_service::CourseContentService;
use crate::error::AppServicesError;
use crate::exam::{ConnectivityProbe, FinalExamService};
use crate::payments::PaymentService;
use crate::progress_tracker::ProgressTracker;
use crate::quiz::ChapterQuizService;

/// Assembles the app-facing services over a remote store and a local
/// progress cache.
#[derive(Clone)]
pub struct AppServices {
    content: Arc<CourseContentService>,
    progress: Arc<ProgressTracker>,
    quizzes: Arc<ChapterQuizService>,
    exams: Arc<FinalExamService>,
    certificates: Arc<CertificateService>,
    payments: Arc<PaymentService>,
}

impl AppServices {
    /// Build services over the given remote storage and progress cache.
    #[must_use]
    pub fn new(
        remote: &Storage,
        cache: Arc<dyn ProgressRepository>,
        clock: Clock,
        connectivity: Arc<dyn ConnectivityProbe>,
    ) -> Self {
        let content = Arc::new(CourseContentService::new(
            Arc::clone(&remote.courses),
            Arc::clone(&remote.questions),
        ));
        let progress = ProgressTracker::new(clock, Arc::clone(&remote.progress), cache);
        let certificates = CertificateService::new(
            clock,
            Arc::clone(&remote.profiles),
            Arc::clone(&remote.attempts),
            Arc::clone(&remote.certificates),
        );
        let quizzes = Arc::new(ChapterQuizService::new(
            clock,
            Arc::clone(&remote.questions),
            Arc::clone(&remote.quiz_results),
            progress.clone(),
        ));
        let exams = Arc::new(FinalExamService::new(
            clock,
            Arc::clone(&remote.questions),
            Arc::clone(&remote.attempts),
            certificates.clone(),
            connectivity,
        ));
        let payments = Arc::new(PaymentService::from_env(
            Arc::clone(&remote.enrollments),
            clock,
        ));

        Self {
            content,
            progress: Arc::new(progress),
            quizzes,
            exams,
            certificates: Arc::new(certificates),
            payments,
        }
    }

    /// Build services with a `SQLite`-backed local progress cache.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if the cache cannot be opened or migrated.
    pub async fn with_sqlite_cache(
        remote: &Storage,
        cache_db_url: &str,
        clock: Clock,
        connectivity: Arc<dyn ConnectivityProbe>,
    ) -> Result<Self, AppServicesError> {
        let cache = SqliteProgressCache::connect(cache_db_url).await?;
        Ok(Self::new(remote, Arc::new(cache), clock, connectivity))
    }

    #[must_use]
    pub fn content(&self) -> Arc<CourseContentService> {
        Arc::clone(&self.content)
    }

    #[must_use]
    pub fn progress(&self) -> Arc<ProgressTracker> {
        Arc::clone(&self.progress)
    }

    #[must_use]
    pub fn quizzes(&self) -> Arc<ChapterQuizService> {
        Arc::clone(&self.quizzes)
    }

    #[must_use]
    pub fn exams(&self) -> Arc<FinalExamService> {
        Arc::clone(&self.exams)
    }

    #[must_use]
    pub fn certificates(&self) -> Arc<CertificateService> {
        Arc::clone(&self.certificates)
    }

    #[must_use]
    pub fn payments(&self) -> Arc<PaymentService> {
        Arc::clone(&self.payments)
    }
}
