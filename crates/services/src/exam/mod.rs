//! Final exam sessions: `locked → confirm → running → graded`.

mod guards;
mod service;
mod session;

pub use guards::{GuardSet, SideChannelGuard};
pub use service::{AlwaysOnline, ConnectivityProbe, ExamOutcome, FinalExamService};
pub use session::{ExamConfirmation, ExamInterrupt, ExamTick, FinalExamSession};
