use thiserror::Error;

use crate::model::ids::{ChapterId, QuestionId};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum QuestionError {
    #[error("question prompt cannot be empty")]
    EmptyPrompt,

    #[error("question needs at least two options, got {0}")]
    TooFewOptions(usize),

    #[error("correct option index {index} out of range for {count} options")]
    CorrectIndexOutOfRange { index: usize, count: usize },

    #[error("option order must be a permutation of 0..{count}")]
    InvalidPermutation { count: usize },
}

//
// ─── QUESTION ──────────────────────────────────────────────────────────────────
//

/// A multiple-choice question from a chapter quiz pool or a final exam.
///
/// The correct-option index always points at the semantically correct option
/// in `options`, including after display-order permutation via
/// [`Question::with_order`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Question {
    id: QuestionId,
    chapter_id: Option<ChapterId>,
    prompt: String,
    options: Vec<String>,
    correct_index: usize,
}

impl Question {
    /// Creates a question after validating prompt, options and correct index.
    ///
    /// `chapter_id` is set for chapter-quiz pool questions and `None` for
    /// final-exam questions.
    ///
    /// # Errors
    ///
    /// Returns `QuestionError` if the prompt is blank, fewer than two options
    /// are given, or the correct index is out of range.
    pub fn new(
        id: QuestionId,
        chapter_id: Option<ChapterId>,
        prompt: impl Into<String>,
        options: Vec<String>,
        correct_index: usize,
    ) -> Result<Self, QuestionError> {
        let prompt = prompt.into();
        if prompt.trim().is_empty() {
            return Err(QuestionError::EmptyPrompt);
        }
        if options.len() < 2 {
            return Err(QuestionError::TooFewOptions(options.len()));
        }
        if correct_index >= options.len() {
            return Err(QuestionError::CorrectIndexOutOfRange {
                index: correct_index,
                count: options.len(),
            });
        }
        Ok(Self {
            id,
            chapter_id,
            prompt,
            options,
            correct_index,
        })
    }

    #[must_use]
    pub fn id(&self) -> QuestionId {
        self.id
    }

    #[must_use]
    pub fn chapter_id(&self) -> Option<ChapterId> {
        self.chapter_id
    }

    #[must_use]
    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    #[must_use]
    pub fn options(&self) -> &[String] {
        &self.options
    }

    #[must_use]
    pub fn correct_index(&self) -> usize {
        self.correct_index
    }

    #[must_use]
    pub fn correct_option(&self) -> &str {
        &self.options[self.correct_index]
    }

    /// Whether choosing `option_index` answers this question correctly.
    #[must_use]
    pub fn is_correct(&self, option_index: usize) -> bool {
        option_index == self.correct_index
    }

    /// Re-applies a display-order permutation, carrying the correct index
    /// along with the options.
    ///
    /// `order[new_position] = old_position`: the option displayed at
    /// `new_position` is the one that previously sat at `old_position`. The
    /// correct answer's text stays the correct answer after reordering.
    ///
    /// # Errors
    ///
    /// Returns `QuestionError::InvalidPermutation` unless `order` is a
    /// permutation of `0..options.len()`.
    pub fn with_order(&self, order: &[usize]) -> Result<Self, QuestionError> {
        let count = self.options.len();
        if order.len() != count {
            return Err(QuestionError::InvalidPermutation { count });
        }
        let mut seen = vec![false; count];
        for &old in order {
            if old >= count || seen[old] {
                return Err(QuestionError::InvalidPermutation { count });
            }
            seen[old] = true;
        }

        let options: Vec<String> = order.iter().map(|&old| self.options[old].clone()).collect();
        let correct_index = order
            .iter()
            .position(|&old| old == self.correct_index)
            .unwrap_or(self.correct_index);

        Ok(Self {
            id: self.id,
            chapter_id: self.chapter_id,
            prompt: self.prompt.clone(),
            options,
            correct_index,
        })
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
