use std::env;
use std::sync::Arc;

use reqwest::Client;
use serde::Deserialize;
use tracing::warn;
use uuid::Uuid;

use kds_core::Clock;
use kds_core::model::{CourseId, Enrollment, UserId};
use storage::repository::EnrollmentRepository;

use crate::error::PaymentError;

/// Gateway connection parameters.
#[derive(Clone, Debug)]
pub struct PaystackConfig {
    pub secret_key: String,
    pub base_url: String,
}

impl PaystackConfig {
    /// Reads configuration from the environment. Returns `None` when no
    /// secret key is set, which disables payment verification.
    #[must_use]
    pub fn from_env() -> Option<Self> {
        let secret_key = env::var("KDS_PAYSTACK_SECRET_KEY").ok()?;
        if secret_key.trim().is_empty() {
            return None;
        }
        let base_url = env::var("KDS_PAYSTACK_BASE_URL")
            .unwrap_or_else(|_| "https://api.paystack.co".into());
        Some(Self {
            secret_key,
            base_url,
        })
    }
}

/// A verified transaction. `unlocked` names the (user, course) whose
/// enrollment flag the verification flipped, when the purchase was a course.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedPayment {
    pub reference: String,
    pub amount_minor: i64,
    pub currency: String,
    pub unlocked: Option<(UserId, CourseId)>,
}

/// Verifies gateway transactions by reference and flips the enrollment paid
/// flag. The progression engine never sees this service; it only observes
/// the resulting flag. Checkout and webhook handling stay with the gateway.
#[derive(Clone)]
pub struct PaymentService {
    client: Client,
    config: Option<PaystackConfig>,
    enrollments: Arc<dyn EnrollmentRepository>,
    clock: Clock,
}

impl PaymentService {
    #[must_use]
    pub fn new(
        config: Option<PaystackConfig>,
        enrollments: Arc<dyn EnrollmentRepository>,
        clock: Clock,
    ) -> Self {
        Self {
            client: Client::new(),
            config,
            enrollments,
            clock,
        }
    }

    #[must_use]
    pub fn from_env(enrollments: Arc<dyn EnrollmentRepository>, clock: Clock) -> Self {
        Self::new(PaystackConfig::from_env(), enrollments, clock)
    }

    #[must_use]
    pub fn enabled(&self) -> bool {
        self.config.is_some()
    }

    /// Verify a transaction reference against the gateway. A successful
    /// course purchase upserts the enrollment paid flag keyed on
    /// (user, course), which is idempotent and safe to re-verify.
    ///
    /// # Errors
    ///
    /// Returns `PaymentError::Disabled` when unconfigured, HTTP/transport
    /// errors, `NotSuccessful` for a pending or failed transaction, or
    /// `Storage` when the enrollment upsert fails.
    pub async fn verify(&self, reference: &str) -> Result<VerifiedPayment, PaymentError> {
        let config = self.config.as_ref().ok_or(PaymentError::Disabled)?;

        let url = format!(
            "{}/transaction/verify/{reference}",
            config.base_url.trim_end_matches('/')
        );
        let response = self
            .client
            .get(url)
            .bearer_auth(&config.secret_key)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(PaymentError::HttpStatus(response.status()));
        }

        let body: VerifyResponse = response.json().await?;
        let data = match body.data {
            Some(data) if body.status && data.status == "success" => data,
            _ => return Err(PaymentError::NotSuccessful),
        };

        let unlocked = match data.metadata.as_ref().and_then(PurchaseMeta::course_key) {
            Some((user_id, course_id)) => {
                let enrollment = Enrollment::new(user_id, course_id, true, self.clock.now());
                self.enrollments.upsert_enrollment(&enrollment).await?;
                Some((user_id, course_id))
            }
            None => {
                warn!(reference, "verified payment carries no course metadata");
                None
            }
        };

        Ok(VerifiedPayment {
            reference: data.reference,
            amount_minor: data.amount,
            currency: data.currency,
            unlocked,
        })
    }

    /// Whether the paywall is open for (user, course). Reads the enrollment
    /// flag only; works without gateway configuration.
    ///
    /// # Errors
    ///
    /// Returns `PaymentError::Storage` on repository failures.
    pub async fn is_course_unlocked(
        &self,
        user_id: UserId,
        course_id: CourseId,
    ) -> Result<bool, PaymentError> {
        Ok(self
            .enrollments
            .get_enrollment(user_id, course_id)
            .await?
            .is_some_and(|enrollment| enrollment.paid()))
    }
}

#[derive(Debug, Deserialize)]
struct VerifyResponse {
    status: bool,
    data: Option<VerifyData>,
}

#[derive(Debug, Deserialize)]
struct VerifyData {
    status: String,
    reference: String,
    amount: i64,
    currency: String,
    metadata: Option<PurchaseMeta>,
}

#[derive(Debug, Deserialize)]
struct PurchaseMeta {
    kind: Option<String>,
    user_id: Option<Uuid>,
    course_id: Option<Uuid>,
}

impl PurchaseMeta {
    fn course_key(&self) -> Option<(UserId, CourseId)> {
        if self.kind.as_deref() != Some("course") {
            return None;
        }
        Some((UserId::new(self.user_id?), CourseId::new(self.course_id?)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kds_core::time::fixed_clock;
    use storage::repository::InMemoryStore;

    #[tokio::test]
    async fn unconfigured_service_is_disabled() {
        let store = InMemoryStore::new();
        let service = PaymentService::new(None, Arc::new(store), fixed_clock());
        assert!(!service.enabled());
        let err = service.verify("ref-123").await.unwrap_err();
        assert!(matches!(err, PaymentError::Disabled));
    }

    #[tokio::test]
    async fn paywall_reads_the_enrollment_flag() {
        use storage::repository::EnrollmentRepository;

        let store = InMemoryStore::new();
        let service = PaymentService::new(None, Arc::new(store.clone()), fixed_clock());
        let user = UserId::generate();
        let course = CourseId::generate();

        assert!(!service.is_course_unlocked(user, course).await.unwrap());

        let enrollment = Enrollment::new(user, course, true, kds_core::time::fixed_now());
        store.upsert_enrollment(&enrollment).await.unwrap();
        assert!(service.is_course_unlocked(user, course).await.unwrap());
    }

    #[test]
    fn course_key_requires_complete_metadata() {
        let full = PurchaseMeta {
            kind: Some("course".into()),
            user_id: Some(Uuid::new_v4()),
            course_id: Some(Uuid::new_v4()),
        };
        assert!(full.course_key().is_some());

        let ebook = PurchaseMeta {
            kind: Some("ebook".into()),
            user_id: Some(Uuid::new_v4()),
            course_id: Some(Uuid::new_v4()),
        };
        assert!(ebook.course_key().is_none());

        let missing = PurchaseMeta {
            kind: Some("course".into()),
            user_id: None,
            course_id: Some(Uuid::new_v4()),
        };
        assert!(missing.course_key().is_none());
    }

    #[test]
    fn verify_response_parses_gateway_shape() {
        let body = r#"{
            "status": true,
            "data": {
                "status": "success",
                "reference": "ref-9",
                "amount": 150000,
                "currency": "GHS",
                "metadata": {"kind": "course", "user_id": null, "course_id": null}
            }
        }"#;
        let parsed: VerifyResponse = serde_json::from_str(body).unwrap();
        let data = parsed.data.unwrap();
        assert_eq!(data.reference, "ref-9");
        assert_eq!(data.amount, 150_000);
        assert!(data.metadata.unwrap().course_key().is_none());
    }
}
