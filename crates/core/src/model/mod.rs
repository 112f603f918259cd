mod account;
mod assessment;
mod certificate;
mod course;
mod ids;
mod outline;
mod question;

pub use account::{Enrollment, Profile};
pub use assessment::{
    score_pct, AssessmentError, AttemptMeta, ChapterQuizResult, Exam, ExamAttempt, ExamGrade,
};
pub use certificate::{format_certificate_no, Certificate, CertificateError};
pub use course::{
    Chapter, Course, CourseError, CourseSettings, DeliveryMode, MediaRef, Slide,
};
pub use ids::{
    AttemptId, CertificateId, ChapterId, CourseId, ExamId, ParseIdError, QuestionId, SlideId,
    UserId,
};
pub use outline::{ChapterSection, CourseOutline, OutlineError};
pub use question::{Question, QuestionError};
