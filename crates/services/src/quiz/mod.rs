//! Chapter quiz sessions: `idle → running → submitted`.

mod service;
mod session;

pub use service::{ChapterQuizService, QuizOutcome};
pub use session::{ChapterQuizSession, QuizTick};
