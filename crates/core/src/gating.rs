//! Sequential-unlock gating over a course outline.
//!
//! A learner may only reach slides up to an accessible index computed from
//! two predicates: the first incomplete slide, and the first chapter whose
//! slides are all complete but whose quiz is still unresolved.

use crate::model::CourseOutline;
use crate::progress::{CompletionSet, QuizCompletionSet};

/// Furthest flat slide index the learner may access.
///
/// * `first_incomplete`: index of the first slide not in `completed`, or the
///   last index when every slide is complete.
/// * `boundary`: walking chapters in course order, the first chapter whose
///   slides are all complete but whose quiz (when one exists) has no recorded
///   result pins the boundary at that chapter's last slide.
///
/// The result is the minimum of the two. Zero-slide chapters impose no
/// boundary and occupy no positions; an empty outline yields 0.
#[must_use]
pub fn accessible_up_to(
    outline: &CourseOutline,
    completed: &CompletionSet,
    quiz_done: &QuizCompletionSet,
) -> usize {
    let total = outline.total_slides();
    if total == 0 {
        return 0;
    }
    let last = total - 1;

    let first_incomplete = outline
        .slides()
        .position(|slide| !completed.contains(slide.id()))
        .unwrap_or(last);

    let mut boundary = last;
    let mut index = 0usize;
    for section in outline.sections() {
        if section.is_empty() {
            continue;
        }
        let chapter_last = index + section.slides().len() - 1;
        let all_complete = section
            .slides()
            .iter()
            .all(|slide| completed.contains(slide.id()));
        if all_complete && section.has_quiz() && !quiz_done.contains(section.chapter().id()) {
            boundary = chapter_last;
            break;
        }
        index = chapter_last + 1;
    }

    first_incomplete.min(boundary)
}

/// Whether the slide at `index` is accessible under the current state.
#[must_use]
pub fn is_accessible(
    outline: &CourseOutline,
    completed: &CompletionSet,
    quiz_done: &QuizCompletionSet,
    index: usize,
) -> bool {
    index < outline.total_slides()
        && index <= accessible_up_to(outline, completed, quiz_done)
}

/// Whether every slide of the outline is in the completion set.
#[must_use]
pub fn content_complete(outline: &CourseOutline, completed: &CompletionSet) -> bool {
    outline.slides().all(|slide| completed.contains(slide.id()))
}

/// Whether every chapter that owns a quiz pool has a recorded result.
#[must_use]
pub fn quizzes_complete(outline: &CourseOutline, quiz_done: &QuizCompletionSet) -> bool {
    outline
        .quiz_chapters()
        .all(|chapter_id| quiz_done.contains(chapter_id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{
        Chapter, ChapterId, Course, CourseId, CourseSettings, DeliveryMode, Slide, SlideId,
    };
    use crate::time::fixed_now;
    use std::collections::HashSet;

    /// Builds an outline with the given slides-per-chapter counts; chapters in
    /// `quiz_at` (zero-based) own a quiz pool.
    fn build_outline(slide_counts: &[usize], quiz_at: &[usize]) -> CourseOutline {
        let course = Course::new(
            CourseId::generate(),
            "course",
            "Course",
            None,
            DeliveryMode::Standard,
            None,
            CourseSettings::default(),
            fixed_now(),
        )
        .unwrap();

        let mut chapters = Vec::new();
        let mut slides = Vec::new();
        let mut quiz_chapters = HashSet::new();
        for (chapter_pos, &count) in slide_counts.iter().enumerate() {
            let chapter = Chapter::new(
                ChapterId::generate(),
                course.id(),
                u32::try_from(chapter_pos).unwrap(),
                format!("Chapter {chapter_pos}"),
            )
            .unwrap();
            if quiz_at.contains(&chapter_pos) {
                quiz_chapters.insert(chapter.id());
            }
            for slide_pos in 0..count {
                slides.push(
                    Slide::new(
                        SlideId::generate(),
                        chapter.id(),
                        u32::try_from(slide_pos).unwrap(),
                        format!("Slide {chapter_pos}.{slide_pos}"),
                        "body",
                        None,
                    )
                    .unwrap(),
                );
            }
            chapters.push(chapter);
        }

        CourseOutline::assemble(course, chapters, slides, &quiz_chapters).unwrap()
    }

    fn complete_first(outline: &CourseOutline, n: usize) -> CompletionSet {
        outline
            .slides()
            .take(n)
            .map(|slide| (slide.id(), fixed_now()))
            .collect()
    }

    fn quiz_done_for(outline: &CourseOutline, chapters: &[usize]) -> QuizCompletionSet {
        outline
            .sections()
            .iter()
            .enumerate()
            .filter(|(i, _)| chapters.contains(i))
            .map(|(_, section)| (section.chapter().id(), fixed_now()))
            .collect()
    }

    #[test]
    fn nothing_complete_unlocks_only_the_first_slide() {
        let outline = build_outline(&[3, 3], &[]);
        let access = accessible_up_to(&outline, &CompletionSet::new(), &QuizCompletionSet::new());
        assert_eq!(access, 0);
        assert!(is_accessible(
            &outline,
            &CompletionSet::new(),
            &QuizCompletionSet::new(),
            0
        ));
        assert!(!is_accessible(
            &outline,
            &CompletionSet::new(),
            &QuizCompletionSet::new(),
            1
        ));
    }

    #[test]
    fn access_never_passes_the_first_incomplete_slide() {
        let outline = build_outline(&[4, 4], &[]);
        for n in 0..outline.total_slides() {
            let completed = complete_first(&outline, n);
            let access = accessible_up_to(&outline, &completed, &QuizCompletionSet::new());
            assert_eq!(access, n, "completing {n} slides should unlock index {n}");
        }
    }

    #[test]
    fn all_complete_unlocks_the_last_slide() {
        let outline = build_outline(&[2, 2], &[]);
        let completed = complete_first(&outline, 4);
        let access = accessible_up_to(&outline, &completed, &QuizCompletionSet::new());
        assert_eq!(access, 3);
    }

    #[test]
    fn completed_chapter_with_pending_quiz_freezes_the_boundary() {
        let outline = build_outline(&[3, 3], &[0]);
        // Entire course complete, chapter 1 quiz untouched.
        let completed = complete_first(&outline, 6);
        let access = accessible_up_to(&outline, &completed, &QuizCompletionSet::new());
        assert_eq!(access, 2, "boundary is chapter 1's last slide");

        let quiz_done = quiz_done_for(&outline, &[0]);
        let access = accessible_up_to(&outline, &completed, &quiz_done);
        assert_eq!(access, 5);
    }

    #[test]
    fn first_pending_quiz_boundary_is_binding() {
        let outline = build_outline(&[2, 2, 2], &[0, 1]);
        let completed = complete_first(&outline, 6);
        // Both quizzes pending: chapter 1's boundary binds.
        let access = accessible_up_to(&outline, &completed, &QuizCompletionSet::new());
        assert_eq!(access, 1);
        // Resolve chapter 1: chapter 2's boundary binds next.
        let quiz_done = quiz_done_for(&outline, &[0]);
        let access = accessible_up_to(&outline, &completed, &quiz_done);
        assert_eq!(access, 3);
    }

    #[test]
    fn chapter_without_quiz_imposes_no_boundary() {
        let outline = build_outline(&[2, 2], &[1]);
        let completed = complete_first(&outline, 2);
        // Chapter 1 has no quiz; finishing its slides moves straight on.
        let access = accessible_up_to(&outline, &completed, &QuizCompletionSet::new());
        assert_eq!(access, 2);
    }

    #[test]
    fn zero_slide_chapters_are_skipped() {
        let outline = build_outline(&[2, 0, 2], &[1]);
        let completed = complete_first(&outline, 2);
        // The empty quiz chapter cannot pin a boundary.
        let access = accessible_up_to(&outline, &completed, &QuizCompletionSet::new());
        assert_eq!(access, 2);
    }

    #[test]
    fn empty_outline_grants_nothing() {
        let outline = build_outline(&[], &[]);
        assert_eq!(
            accessible_up_to(&outline, &CompletionSet::new(), &QuizCompletionSet::new()),
            0
        );
        assert!(!is_accessible(
            &outline,
            &CompletionSet::new(),
            &QuizCompletionSet::new(),
            0
        ));
    }

    #[test]
    fn partial_chapter_completion_gates_on_first_incomplete() {
        let outline = build_outline(&[3, 3], &[0]);
        // Two of three chapter-1 slides done: quiz boundary not yet relevant.
        let completed = complete_first(&outline, 2);
        let access = accessible_up_to(&outline, &completed, &QuizCompletionSet::new());
        assert_eq!(access, 2);
    }

    #[test]
    fn completion_order_does_not_matter_for_the_bound() {
        // Mark slides out of order; access still stops at the first gap.
        let outline = build_outline(&[3, 3], &[]);
        let ids: Vec<SlideId> = outline.slides().map(Slide::id).collect();
        let mut completed = CompletionSet::new();
        completed.insert(ids[0], fixed_now());
        completed.insert(ids[4], fixed_now());
        completed.insert(ids[5], fixed_now());

        let access = accessible_up_to(&outline, &completed, &QuizCompletionSet::new());
        assert_eq!(access, 1, "index 1 is the first incomplete slide");
    }

    #[test]
    fn content_and_quiz_completion_predicates() {
        let outline = build_outline(&[2, 2], &[0]);
        let completed = complete_first(&outline, 4);
        assert!(content_complete(&outline, &completed));
        assert!(!content_complete(&outline, &complete_first(&outline, 3)));

        assert!(!quizzes_complete(&outline, &QuizCompletionSet::new()));
        assert!(quizzes_complete(&outline, &quiz_done_for(&outline, &[0])));
    }
}
