//! Uniform, seedless randomization for quiz and exam question serving.
//!
//! Sampling is a Fisher–Yates shuffle followed by a slice, so every subset of
//! the requested size is equally likely. Option shuffling goes through
//! [`Question::with_order`], which carries the correct index along with the
//! options array.

use rand::rng;
use rand::seq::SliceRandom;

use kds_core::model::{Question, QuestionError};

/// Uniformly samples up to `count` questions from the pool, in random order.
#[must_use]
pub fn sample_questions(pool: &[Question], count: u32) -> Vec<Question> {
    let mut sampled: Vec<Question> = pool.to_vec();
    sampled.shuffle(&mut rng());
    sampled.truncate(usize::try_from(count).unwrap_or(usize::MAX));
    sampled
}

/// Returns the question with its options in a fresh random display order,
/// correct index recomputed to follow the permutation.
///
/// # Errors
///
/// Propagates `QuestionError` from permutation application (cannot occur for
/// the generated order, but the contract stays explicit).
pub fn shuffle_options(question: &Question) -> Result<Question, QuestionError> {
    let mut order: Vec<usize> = (0..question.options().len()).collect();
    order.shuffle(&mut rng());
    question.with_order(&order)
}

/// Samples `count` exam questions and randomizes each one's option order.
///
/// # Errors
///
/// Propagates `QuestionError` from option shuffling.
pub fn randomized_exam_set(pool: &[Question], count: u32) -> Result<Vec<Question>, QuestionError> {
    sample_questions(pool, count)
        .iter()
        .map(shuffle_options)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use kds_core::model::QuestionId;
    use proptest::prelude::*;
    use std::collections::HashSet;

    fn build_pool(size: usize) -> Vec<Question> {
        (0..size)
            .map(|i| {
                Question::new(
                    QuestionId::generate(),
                    None,
                    format!("Question {i}"),
                    vec!["a".into(), "b".into(), "c".into(), "d".into()],
                    i % 4,
                )
                .unwrap()
            })
            .collect()
    }

    #[test]
    fn sampling_never_repeats_questions() {
        let pool = build_pool(10);
        let sampled = sample_questions(&pool, 5);
        assert_eq!(sampled.len(), 5);
        let ids: HashSet<_> = sampled.iter().map(Question::id).collect();
        assert_eq!(ids.len(), 5);
    }

    #[test]
    fn sampling_caps_at_pool_size() {
        let pool = build_pool(3);
        assert_eq!(sample_questions(&pool, 10).len(), 3);
    }

    proptest! {
        /// The load-bearing invariant: after any option shuffle, the tracked
        /// correct index still selects the originally-correct option text.
        #[test]
        fn shuffling_preserves_the_correct_answer(
            options in proptest::collection::vec("[a-z]{1,8}", 2..8),
            correct_seed in 0usize..8,
        ) {
            let correct = correct_seed % options.len();
            let question = Question::new(
                QuestionId::generate(),
                None,
                "prompt",
                options.clone(),
                correct,
            )
            .unwrap();

            let shuffled = shuffle_options(&question).unwrap();

            prop_assert_eq!(shuffled.correct_option(), question.correct_option());
            prop_assert!(shuffled.is_correct(shuffled.correct_index()));

            let mut original = question.options().to_vec();
            let mut permuted = shuffled.options().to_vec();
            original.sort();
            permuted.sort();
            prop_assert_eq!(original, permuted);
        }

        #[test]
        fn exam_set_respects_count_and_keeps_answers(count in 1u32..12) {
            let pool = build_pool(8);
            let served = randomized_exam_set(&pool, count).unwrap();
            prop_assert_eq!(served.len(), (count as usize).min(8));
            for question in &served {
                let original = pool.iter().find(|q| q.id() == question.id()).unwrap();
                prop_assert_eq!(question.correct_option(), original.correct_option());
            }
        }
    }
}
