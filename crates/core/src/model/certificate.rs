use chrono::{DateTime, NaiveDate, Utc};
use thiserror::Error;

use crate::model::ids::{AttemptId, CertificateId, CourseId, UserId};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum CertificateError {
    #[error("certificate number cannot be empty")]
    EmptyCertificateNo,
}

//
// ─── CERTIFICATE NUMBER ────────────────────────────────────────────────────────
//

/// Formats a certificate number: `PV-YYYYMMDD-XXXXXX` (issue date plus three
/// random bytes as uppercase hex). The caller supplies the entropy so this
/// stays deterministic under test.
#[must_use]
pub fn format_certificate_no(issued_on: NaiveDate, entropy: [u8; 3]) -> String {
    format!(
        "PV-{}-{:02X}{:02X}{:02X}",
        issued_on.format("%Y%m%d"),
        entropy[0],
        entropy[1],
        entropy[2],
    )
}

//
// ─── CERTIFICATE ───────────────────────────────────────────────────────────────
//

/// An issued course certificate. Created at most once per (user, course);
/// issuance is idempotent and later passes reuse the existing record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Certificate {
    id: CertificateId,
    user_id: UserId,
    course_id: CourseId,
    attempt_id: AttemptId,
    certificate_no: String,
    score_pct: u8,
    issued_at: DateTime<Utc>,
}

impl Certificate {
    /// Builds a certificate record.
    ///
    /// # Errors
    ///
    /// Returns `CertificateError::EmptyCertificateNo` if the number is blank.
    pub fn new(
        id: CertificateId,
        user_id: UserId,
        course_id: CourseId,
        attempt_id: AttemptId,
        certificate_no: impl Into<String>,
        score_pct: u8,
        issued_at: DateTime<Utc>,
    ) -> Result<Self, CertificateError> {
        let certificate_no = certificate_no.into();
        if certificate_no.trim().is_empty() {
            return Err(CertificateError::EmptyCertificateNo);
        }
        Ok(Self {
            id,
            user_id,
            course_id,
            attempt_id,
            certificate_no,
            score_pct,
            issued_at,
        })
    }

    #[must_use]
    pub fn id(&self) -> CertificateId {
        self.id
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
    pub fn attempt_id(&self) -> AttemptId {
        self.attempt_id
    }

    #[must_use]
    pub fn certificate_no(&self) -> &str {
        &self.certificate_no
    }

    #[must_use]
    pub fn score_pct(&self) -> u8 {
        self.score_pct
    }

    #[must_use]
    pub fn issued_at(&self) -> DateTime<Utc> {
        self.issued_at
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
