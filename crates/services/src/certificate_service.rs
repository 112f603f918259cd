use std::sync::Arc;

use rand::Rng;
use tracing::warn;

use kds_core::Clock;
use kds_core::model::{
    format_certificate_no, AttemptId, AttemptMeta, Certificate, CertificateId, CourseId, Exam,
    ExamAttempt, ExamGrade, UserId,
};
use storage::repository::{
    AttemptRepository, CertificateRepository, ProfileRepository, StorageError,
};

use crate::error::CertificateIssueError;

/// Whether issuance created a fresh certificate or found the existing one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IssueStatus {
    Created,
    Existing,
}

/// Result of a successful issuance call.
#[derive(Debug, Clone)]
pub struct IssuedCertificate {
    pub status: IssueStatus,
    pub certificate: Certificate,
    pub attempt_id: AttemptId,
}

/// Issues course certificates after a passing final exam.
///
/// The call records the passing attempt, then creates the certificate, or
/// returns the existing one, since a (user, course) pair gets at most one.
/// Failure modes are typed so the UI can direct the learner to the right
/// remedial action.
#[derive(Clone)]
pub struct CertificateService {
    clock: Clock,
    profiles: Arc<dyn ProfileRepository>,
    attempts: Arc<dyn AttemptRepository>,
    certificates: Arc<dyn CertificateRepository>,
}

impl CertificateService {
    #[must_use]
    pub fn new(
        clock: Clock,
        profiles: Arc<dyn ProfileRepository>,
        attempts: Arc<dyn AttemptRepository>,
        certificates: Arc<dyn CertificateRepository>,
    ) -> Self {
        Self {
            clock,
            profiles,
            attempts,
            certificates,
        }
    }

    /// Issue (or return the existing) certificate for a passing grade.
    ///
    /// # Errors
    ///
    /// * `NotAuthenticated`: no profile for the user.
    /// * `MissingFullName`: profile lacks the display name printed on the
    ///   certificate.
    /// * `AttemptFailed`: the passing attempt row could not be written.
    /// * `CertFailed`: certificate lookup/insert failed; retryable.
    pub async fn issue(
        &self,
        user_id: UserId,
        course_id: CourseId,
        exam: &Exam,
        grade: ExamGrade,
        auto_submit: bool,
    ) -> Result<IssuedCertificate, CertificateIssueError> {
        let profile = self
            .profiles
            .get_profile(user_id)
            .await
            .map_err(|_| CertificateIssueError::NotAuthenticated)?
            .ok_or(CertificateIssueError::NotAuthenticated)?;
        if profile.display_name().is_none() {
            return Err(CertificateIssueError::MissingFullName);
        }

        let now = self.clock.now();
        let attempt = ExamAttempt::new(
            AttemptId::generate(),
            user_id,
            exam.id(),
            grade.score_pct,
            true,
            AttemptMeta {
                auto_submit,
                total: grade.total_count,
                correct_count: grade.correct_count,
            },
            now,
        );
        self.attempts
            .append_attempt(&attempt)
            .await
            .map_err(CertificateIssueError::AttemptFailed)?;

        if let Some(existing) = self
            .certificates
            .find_certificate(user_id, course_id)
            .await
            .map_err(|e| CertificateIssueError::CertFailed(e.to_string()))?
        {
            return Ok(IssuedCertificate {
                status: IssueStatus::Existing,
                certificate: existing,
                attempt_id: attempt.id(),
            });
        }

        let entropy: [u8; 3] = rand::rng().random();
        let certificate_no = format_certificate_no(now.date_naive(), entropy);
        let certificate = Certificate::new(
            CertificateId::generate(),
            user_id,
            course_id,
            attempt.id(),
            certificate_no,
            grade.score_pct,
            now,
        )
        .map_err(|e| CertificateIssueError::CertFailed(e.to_string()))?;

        match self.certificates.insert_certificate(&certificate).await {
            Ok(()) => Ok(IssuedCertificate {
                status: IssueStatus::Created,
                certificate,
                attempt_id: attempt.id(),
            }),
            // Lost a race with a concurrent pass: reuse the winner's record.
            Err(StorageError::Conflict) => {
                warn!(%user_id, %course_id, "certificate insert conflicted; reusing existing");
                let existing = self
                    .certificates
                    .find_certificate(user_id, course_id)
                    .await
                    .map_err(|e| CertificateIssueError::CertFailed(e.to_string()))?
                    .ok_or_else(|| {
                        CertificateIssueError::CertFailed(
                            "conflict reported but no certificate found".into(),
                        )
                    })?;
                Ok(IssuedCertificate {
                    status: IssueStatus::Existing,
                    certificate: existing,
                    attempt_id: attempt.id(),
                })
            }
            Err(e) => Err(CertificateIssueError::CertFailed(e.to_string())),
        }
    }
}
