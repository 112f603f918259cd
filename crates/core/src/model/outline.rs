use std::collections::{HashMap, HashSet};

use thiserror::Error;

use crate::model::course::{Chapter, Course, Slide};
use crate::model::ids::{ChapterId, SlideId};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum OutlineError {
    #[error("slide {0} references a chapter that is not part of the course")]
    OrphanSlide(SlideId),
}

//
// ─── CHAPTER SECTION ───────────────────────────────────────────────────────────
//

/// One chapter of the assembled outline: its slides in order, plus whether a
/// quiz pool exists for it.
#[derive(Debug, Clone, PartialEq)]
pub struct ChapterSection {
    chapter: Chapter,
    slides: Vec<Slide>,
    has_quiz: bool,
}

impl ChapterSection {
    #[must_use]
    pub fn chapter(&self) -> &Chapter {
        &self.chapter
    }

    #[must_use]
    pub fn slides(&self) -> &[Slide] {
        &self.slides
    }

    #[must_use]
    pub fn has_quiz(&self) -> bool {
        self.has_quiz
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slides.is_empty()
    }
}

//
// ─── COURSE OUTLINE ────────────────────────────────────────────────────────────
//

/// Assembled, ordered view of a course's content.
///
/// Chapters are sorted by position (id as tiebreaker), slides likewise within
/// each chapter. The flat slide order, (chapter position, slide position),
/// is the total order the gating engine reasons over. Built once per session;
/// read-only afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct CourseOutline {
    course: Course,
    sections: Vec<ChapterSection>,
    index_by_slide: HashMap<SlideId, usize>,
}

impl CourseOutline {
    /// Assembles the outline from loaded rows.
    ///
    /// `quiz_chapters` holds the ids of chapters that own a non-empty quiz
    /// pool.
    ///
    /// # Errors
    ///
    /// Returns `OutlineError::OrphanSlide` if a slide references a chapter
    /// that is not part of the course.
    pub fn assemble(
        course: Course,
        mut chapters: Vec<Chapter>,
        slides: Vec<Slide>,
        quiz_chapters: &HashSet<ChapterId>,
    ) -> Result<Self, OutlineError> {
        chapters.sort_by_key(|c| (c.position(), c.id()));

        let mut by_chapter: HashMap<ChapterId, Vec<Slide>> = HashMap::new();
        let known: HashSet<ChapterId> = chapters.iter().map(Chapter::id).collect();
        for slide in slides {
            if !known.contains(&slide.chapter_id()) {
                return Err(OutlineError::OrphanSlide(slide.id()));
            }
            by_chapter.entry(slide.chapter_id()).or_default().push(slide);
        }

        let mut sections = Vec::with_capacity(chapters.len());
        let mut index_by_slide = HashMap::new();
        let mut next_index = 0usize;
        for chapter in chapters {
            let mut slides = by_chapter.remove(&chapter.id()).unwrap_or_default();
            slides.sort_by_key(|s| (s.position(), s.id()));
            for slide in &slides {
                index_by_slide.insert(slide.id(), next_index);
                next_index += 1;
            }
            let has_quiz = quiz_chapters.contains(&chapter.id());
            sections.push(ChapterSection {
                chapter,
                slides,
                has_quiz,
            });
        }

        Ok(Self {
            course,
            sections,
            index_by_slide,
        })
    }

    #[must_use]
    pub fn course(&self) -> &Course {
        &self.course
    }

    #[must_use]
    pub fn sections(&self) -> &[ChapterSection] {
        &self.sections
    }

    /// Number of slides across all chapters.
    #[must_use]
    pub fn total_slides(&self) -> usize {
        self.index_by_slide.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.index_by_slide.is_empty()
    }

    /// All slides in course order.
    pub fn slides(&self) -> impl Iterator<Item = &Slide> {
        self.sections.iter().flat_map(|s| s.slides.iter())
    }

    /// Slide at a flat position, if in range.
    #[must_use]
    pub fn slide_at(&self, index: usize) -> Option<&Slide> {
        self.slides().nth(index)
    }

    /// Flat position of a slide, if it belongs to this course.
    #[must_use]
    pub fn index_of(&self, slide_id: SlideId) -> Option<usize> {
        self.index_by_slide.get(&slide_id).copied()
    }

    /// Flat position of the last slide of the given chapter, skipping empty
    /// chapters.
    #[must_use]
    pub fn last_index_of_chapter(&self, chapter_id: ChapterId) -> Option<usize> {
        let mut index = 0usize;
        for section in &self.sections {
            if section.chapter.id() == chapter_id {
                if section.slides.is_empty() {
                    return None;
                }
                return Some(index + section.slides.len() - 1);
            }
            index += section.slides.len();
        }
        None
    }

    /// Ids of chapters that carry a quiz pool.
    pub fn quiz_chapters(&self) -> impl Iterator<Item = ChapterId> + '_ {
        self.sections
            .iter()
            .filter(|s| s.has_quiz)
            .map(|s| s.chapter.id())
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::course::{CourseSettings, DeliveryMode};
    use crate::model::ids::CourseId;
    use crate::time::fixed_now;

    fn build_course() -> Course {
        Course::new(
            CourseId::generate(),
            "ghie-business-ethics",
            "Business Ethics",
            None,
            DeliveryMode::Standard,
            None,
            CourseSettings::default(),
            fixed_now(),
        )
        .unwrap()
    }

    fn build_chapter(course: &Course, position: u32) -> Chapter {
        Chapter::new(
            ChapterId::generate(),
            course.id(),
            position,
            format!("Chapter {position}"),
        )
        .unwrap()
    }

    fn build_slide(chapter: &Chapter, position: u32) -> Slide {
        Slide::new(
            SlideId::generate(),
            chapter.id(),
            position,
            format!("Slide {position}"),
            "body",
            None,
        )
        .unwrap()
    }

    #[test]
    fn outline_orders_by_chapter_then_slide() {
        let course = build_course();
        let ch1 = build_chapter(&course, 1);
        let ch2 = build_chapter(&course, 2);
        let s_a = build_slide(&ch2, 1);
        let s_b = build_slide(&ch1, 2);
        let s_c = build_slide(&ch1, 1);

        // Supplied out of order on purpose.
        let outline = CourseOutline::assemble(
            course,
            vec![ch2.clone(), ch1.clone()],
            vec![s_a.clone(), s_b.clone(), s_c.clone()],
            &HashSet::new(),
        )
        .unwrap();

        let ordered: Vec<SlideId> = outline.slides().map(Slide::id).collect();
        assert_eq!(ordered, vec![s_c.id(), s_b.id(), s_a.id()]);
        assert_eq!(outline.index_of(s_c.id()), Some(0));
        assert_eq!(outline.index_of(s_a.id()), Some(2));
        assert_eq!(outline.last_index_of_chapter(ch1.id()), Some(1));
        assert_eq!(outline.last_index_of_chapter(ch2.id()), Some(2));
    }

    #[test]
    fn outline_rejects_orphan_slides() {
        let course = build_course();
        let ch1 = build_chapter(&course, 1);
        let stray = Chapter::new(ChapterId::generate(), course.id(), 9, "Stray").unwrap();
        let slide = build_slide(&stray, 1);

        let err = CourseOutline::assemble(course, vec![ch1], vec![slide.clone()], &HashSet::new())
            .unwrap_err();
        assert_eq!(err, OutlineError::OrphanSlide(slide.id()));
    }

    #[test]
    fn empty_chapter_occupies_no_positions() {
        let course = build_course();
        let ch1 = build_chapter(&course, 1);
        let ch2 = build_chapter(&course, 2);
        let slide = build_slide(&ch2, 1);

        let outline = CourseOutline::assemble(
            course,
            vec![ch1.clone(), ch2.clone()],
            vec![slide.clone()],
            &HashSet::new(),
        )
        .unwrap();

        assert_eq!(outline.total_slides(), 1);
        assert_eq!(outline.last_index_of_chapter(ch1.id()), None);
        assert_eq!(outline.index_of(slide.id()), Some(0));
    }

    #[test]
    fn quiz_chapters_follow_the_pool_set() {
        let course = build_course();
        let ch1 = build_chapter(&course, 1);
        let ch2 = build_chapter(&course, 2);
        let slides = vec![build_slide(&ch1, 1), build_slide(&ch2, 1)];
        let pools: HashSet<ChapterId> = [ch1.id()].into_iter().collect();

        let outline =
            CourseOutline::assemble(course, vec![ch1.clone(), ch2.clone()], slides, &pools)
                .unwrap();

        let quiz: Vec<ChapterId> = outline.quiz_chapters().collect();
        assert_eq!(quiz, vec![ch1.id()]);
        assert!(outline.sections()[0].has_quiz());
        assert!(!outline.sections()[1].has_quiz());
    }
}
