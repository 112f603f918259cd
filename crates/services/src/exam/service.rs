use std::sync::{Arc, Mutex, PoisonError};

use kds_core::Clock;
use kds_core::gating::{content_complete, quizzes_complete};
use kds_core::model::{
    AttemptId, AttemptMeta, CourseOutline, ExamAttempt, ExamGrade, ExamId, UserId,
};
use storage::repository::{AttemptRepository, QuestionRepository};

use super::guards::{GuardSet, SideChannelGuard};
use super::session::{ExamConfirmation, ExamInterrupt, FinalExamSession};
use crate::certificate_service::{CertificateService, IssuedCertificate};
use crate::error::ExamError;
use crate::progress_tracker::CourseProgress;
use crate::shuffle::randomized_exam_set;

/// Network liveness check consulted before an exam may start.
pub trait ConnectivityProbe: Send + Sync {
    fn is_online(&self) -> bool;
}

/// Default probe for hosts without connectivity reporting.
pub struct AlwaysOnline;

impl ConnectivityProbe for AlwaysOnline {
    fn is_online(&self) -> bool {
        true
    }
}

/// What an exam submission produced. A failing grade records the attempt and
/// nothing else; a passing grade carries the issued certificate.
#[derive(Debug, Clone)]
pub struct ExamOutcome {
    pub grade: ExamGrade,
    pub attempt_id: AttemptId,
    pub certificate: Option<IssuedCertificate>,
}

/// Runs the final exam: `locked → confirm → running → graded`.
///
/// The locked state is implicit: `confirm` either returns a token proving
/// the prerequisites held, or the specific violation. `begin` turns a token
/// into a running session; `submit` grades it. One attempt, ever: any
/// recorded attempt permanently blocks another confirm.
#[derive(Clone)]
pub struct FinalExamService {
    clock: Clock,
    questions: Arc<dyn QuestionRepository>,
    attempts: Arc<dyn AttemptRepository>,
    certificates: CertificateService,
    connectivity: Arc<dyn ConnectivityProbe>,
    guards: Vec<Arc<dyn SideChannelGuard>>,
    active: Arc<Mutex<Option<ExamId>>>,
}

impl FinalExamService {
    #[must_use]
    pub fn new(
        clock: Clock,
        questions: Arc<dyn QuestionRepository>,
        attempts: Arc<dyn AttemptRepository>,
        certificates: CertificateService,
        connectivity: Arc<dyn ConnectivityProbe>,
    ) -> Self {
        Self {
            clock,
            questions,
            attempts,
            certificates,
            connectivity,
            guards: Vec::new(),
            active: Arc::new(Mutex::new(None)),
        }
    }

    /// Register a side-channel guard to engage for every session.
    #[must_use]
    pub fn with_guard(mut self, guard: Arc<dyn SideChannelGuard>) -> Self {
        self.guards.push(guard);
        self
    }

    /// The locked → confirm transition. Re-checks every prerequisite and
    /// returns a confirmation token, or the specific violation. No state is
    /// mutated.
    ///
    /// # Errors
    ///
    /// * `ContentIncomplete`: slides remain.
    /// * `QuizzesIncomplete`: chapters with quizzes lack results.
    /// * `ExamUnavailable`: no exam, or an empty question pool.
    /// * `AlreadyAttempted`: the single attempt is spent.
    /// * `Storage`: repository failures.
    pub async fn confirm(
        &self,
        user_id: UserId,
        outline: &CourseOutline,
        progress: &CourseProgress,
    ) -> Result<ExamConfirmation, ExamError> {
        if !content_complete(outline, &progress.slides) {
            let remaining = outline
                .slides()
                .filter(|slide| !progress.slides.contains(slide.id()))
                .count();
            return Err(ExamError::ContentIncomplete { remaining });
        }
        if !quizzes_complete(outline, &progress.quizzes) {
            let pending = outline
                .quiz_chapters()
                .filter(|chapter_id| !progress.quizzes.contains(*chapter_id))
                .count();
            return Err(ExamError::QuizzesIncomplete { pending });
        }

        let course_id = outline.course().id();
        let exam = self
            .questions
            .get_exam(course_id)
            .await?
            .ok_or(ExamError::ExamUnavailable)?;
        let pool = self.questions.list_exam_questions(exam.id()).await?;
        if pool.is_empty() {
            return Err(ExamError::ExamUnavailable);
        }

        if self.attempts.has_attempt(user_id, exam.id()).await? {
            return Err(ExamError::AlreadyAttempted);
        }

        Ok(ExamConfirmation {
            user_id,
            course_id,
            exam,
            pool,
        })
    }

    /// The confirm → running transition. Requires the connectivity probe to
    /// report online and an explicit acknowledgement of the exam policy
    /// (timed, no pause, no tab switch, single attempt). Shuffles the
    /// question order and each question's options, engages the guard set,
    /// and starts the countdown.
    ///
    /// # Errors
    ///
    /// Returns `Offline`, `PolicyNotAcknowledged`, `AnotherSessionActive`,
    /// or a `Question` error from option shuffling.
    pub fn begin(
        &self,
        confirmation: ExamConfirmation,
        policy_acknowledged: bool,
    ) -> Result<FinalExamSession, ExamError> {
        if !self.connectivity.is_online() {
            return Err(ExamError::Offline);
        }
        if !policy_acknowledged {
            return Err(ExamError::PolicyNotAcknowledged);
        }

        {
            let mut active = self.active.lock().unwrap_or_else(PoisonError::into_inner);
            if active.is_some() {
                return Err(ExamError::AnotherSessionActive);
            }
            *active = Some(confirmation.exam.id());
        }

        let served = randomized_exam_set(&confirmation.pool, confirmation.exam.question_count())
            .inspect_err(|_| self.clear_active(confirmation.exam.id()))?;

        let guards = GuardSet::new(self.guards.clone());
        Ok(FinalExamSession::new(
            &confirmation,
            served,
            guards,
            Arc::clone(&self.active),
            self.clock.now(),
        ))
    }

    /// The running → graded transition. Always finalizes the session first
    /// (guards released, active slot freed), then writes exactly one attempt
    /// row: through certificate issuance on a pass, directly on a fail.
    ///
    /// # Errors
    ///
    /// Returns `AlreadySubmitted` on double submission, `Storage` for a
    /// failed fail-path attempt write, or `Certificate` when pass-path
    /// issuance reports a typed failure.
    pub async fn submit(
        &self,
        session: &mut FinalExamSession,
        auto: bool,
    ) -> Result<ExamOutcome, ExamError> {
        if session.is_finished() {
            return Err(ExamError::AlreadySubmitted);
        }

        let (correct, total) = session.score();
        let grade = session.exam().grade(correct, total)?;
        session.finish();

        if grade.passed {
            let issued = self
                .certificates
                .issue(
                    session.user_id(),
                    session.course_id(),
                    session.exam(),
                    grade,
                    auto,
                )
                .await?;
            Ok(ExamOutcome {
                grade,
                attempt_id: issued.attempt_id,
                certificate: Some(issued),
            })
        } else {
            let attempt = ExamAttempt::new(
                AttemptId::generate(),
                session.user_id(),
                session.exam().id(),
                grade.score_pct,
                false,
                AttemptMeta {
                    auto_submit: auto,
                    total: grade.total_count,
                    correct_count: grade.correct_count,
                },
                self.clock.now(),
            );
            self.attempts.append_attempt(&attempt).await?;
            Ok(ExamOutcome {
                grade,
                attempt_id: attempt.id(),
                certificate: None,
            })
        }
    }

    /// Force an automatic submission for a host interrupt (tab hidden, page
    /// unload). Same write path as a manual submit, flagged auto.
    ///
    /// # Errors
    ///
    /// Same as [`FinalExamService::submit`].
    pub async fn interrupt(
        &self,
        session: &mut FinalExamSession,
        _reason: ExamInterrupt,
    ) -> Result<ExamOutcome, ExamError> {
        self.submit(session, true).await
    }

    fn clear_active(&self, exam_id: ExamId) {
        let mut active = self.active.lock().unwrap_or_else(PoisonError::into_inner);
        if *active == Some(exam_id) {
            *active = None;
        }
    }
}
