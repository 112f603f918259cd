use std::sync::Arc;

use kds_core::model::{
    Chapter, ChapterId, Course, CourseId, CourseSettings, DeliveryMode, Question, QuestionId,
    Slide, SlideId, UserId,
};
use kds_core::time::{fixed_clock, fixed_now};
use services::{ChapterQuizService, ProgressTracker, QuizError, QuizTick};
use storage::repository::{InMemoryStore, ProgressRepository};

fn build_course() -> Course {
    Course::new(
        CourseId::generate(),
        "ghie-business-ethics",
        "Business Ethics",
        None,
        DeliveryMode::Standard,
        None,
        // Five questions per quiz, three-second countdown for the tests.
        CourseSettings::new(5, 3).unwrap(),
        fixed_now(),
    )
    .unwrap()
}

fn build_pool(chapter_id: ChapterId, size: usize) -> Vec<Question> {
    (0..size)
        .map(|i| {
            Question::new(
                QuestionId::generate(),
                Some(chapter_id),
                format!("Question {i}"),
                vec!["a".into(), "b".into(), "c".into(), "d".into()],
                i % 4,
            )
            .unwrap()
        })
        .collect()
}

fn build_service(remote: &InMemoryStore, cache: &InMemoryStore) -> ChapterQuizService {
    let tracker = ProgressTracker::new(
        fixed_clock(),
        Arc::new(remote.clone()),
        Arc::new(cache.clone()),
    );
    ChapterQuizService::new(
        fixed_clock(),
        Arc::new(remote.clone()),
        Arc::new(remote.clone()),
        tracker,
    )
}

#[tokio::test]
async fn quiz_scores_and_records_the_scenario() {
    // Pool of 10, configured count 5, 4 answered correctly -> 4/5, 80%.
    let remote = InMemoryStore::new();
    let cache = InMemoryStore::new();
    let course = build_course();
    let chapter = Chapter::new(ChapterId::generate(), course.id(), 1, "One").unwrap();
    remote.put_chapter_questions(chapter.id(), build_pool(chapter.id(), 10));

    let service = build_service(&remote, &cache);
    let user = UserId::generate();
    let mut session = service.begin(&course, chapter.id()).await.unwrap();
    assert_eq!(session.total_questions(), 5);

    let picks: Vec<(usize, usize)> = session
        .questions()
        .iter()
        .enumerate()
        .map(|(i, q)| {
            let right = q.correct_index();
            if i < 4 {
                (i, right)
            } else {
                (i, (right + 1) % q.options().len())
            }
        })
        .collect();
    for (i, pick) in picks {
        session.select_answer(i, pick).unwrap();
    }

    let outcome = service
        .submit(user, &course, &mut session, false)
        .await
        .unwrap();
    assert_eq!(outcome.result.correct_count(), 4);
    assert_eq!(outcome.result.total_count(), 5);
    assert_eq!(outcome.result.score_pct(), 80);
    assert!(!outcome.result.auto_submitted());
    assert!(outcome.completion.synced);

    // Result row recorded, chapter quiz-complete in both stores.
    assert_eq!(remote.quiz_results().len(), 1);
    let remote_rows = remote
        .list_quiz_completions(user, course.id())
        .await
        .unwrap();
    assert_eq!(remote_rows.len(), 1);
    assert_eq!(remote_rows[0].chapter_id, chapter.id());
    let cached_rows = cache.list_quiz_completions(user, course.id()).await.unwrap();
    assert_eq!(cached_rows.len(), 1);
}

#[tokio::test]
async fn countdown_expiry_flags_auto_submission() {
    let remote = InMemoryStore::new();
    let cache = InMemoryStore::new();
    let course = build_course();
    let chapter = Chapter::new(ChapterId::generate(), course.id(), 1, "One").unwrap();
    remote.put_chapter_questions(chapter.id(), build_pool(chapter.id(), 4));

    let service = build_service(&remote, &cache);
    let mut session = service.begin(&course, chapter.id()).await.unwrap();

    // Three configured seconds tick down to expiry.
    assert_eq!(session.tick(), QuizTick::Running { remaining_secs: 2 });
    assert_eq!(session.tick(), QuizTick::Running { remaining_secs: 1 });
    assert_eq!(session.tick(), QuizTick::Expired);

    let outcome = service
        .submit(UserId::generate(), &course, &mut session, true)
        .await
        .unwrap();
    assert!(outcome.result.auto_submitted());
    assert_eq!(outcome.result.correct_count(), 0);
    assert_eq!(outcome.result.total_count(), 4);
}

#[tokio::test]
async fn chapter_without_pool_refuses_to_start() {
    let remote = InMemoryStore::new();
    let cache = InMemoryStore::new();
    let course = build_course();

    let service = build_service(&remote, &cache);
    let err = service
        .begin(&course, ChapterId::generate())
        .await
        .unwrap_err();
    assert!(matches!(err, QuizError::NoQuestionPool));
}

#[tokio::test]
async fn one_quiz_session_at_a_time() {
    let remote = InMemoryStore::new();
    let cache = InMemoryStore::new();
    let course = build_course();
    let first = Chapter::new(ChapterId::generate(), course.id(), 1, "One").unwrap();
    let second = Chapter::new(ChapterId::generate(), course.id(), 2, "Two").unwrap();
    remote.put_chapter_questions(first.id(), build_pool(first.id(), 3));
    remote.put_chapter_questions(second.id(), build_pool(second.id(), 3));

    let service = build_service(&remote, &cache);
    let session = service.begin(&course, first.id()).await.unwrap();

    let err = service.begin(&course, second.id()).await.unwrap_err();
    assert!(matches!(err, QuizError::AlreadyRunning));

    // Closing the running session frees the slot.
    service.abandon(session);
    assert!(service.begin(&course, second.id()).await.is_ok());
    assert!(remote.quiz_results().is_empty());
}

#[tokio::test]
async fn double_submission_is_rejected() {
    let remote = InMemoryStore::new();
    let cache = InMemoryStore::new();
    let course = build_course();
    let chapter = Chapter::new(ChapterId::generate(), course.id(), 1, "One").unwrap();
    remote.put_chapter_questions(chapter.id(), build_pool(chapter.id(), 3));

    let service = build_service(&remote, &cache);
    let user = UserId::generate();
    let mut session = service.begin(&course, chapter.id()).await.unwrap();

    service
        .submit(user, &course, &mut session, false)
        .await
        .unwrap();
    let err = service
        .submit(user, &course, &mut session, false)
        .await
        .unwrap_err();
    assert!(matches!(err, QuizError::AlreadySubmitted));
    assert_eq!(remote.quiz_results().len(), 1);
}

#[tokio::test]
async fn quiz_completion_unlocks_the_next_chapter() {
    use kds_core::gating::accessible_up_to;
    use kds_core::model::CourseOutline;
    use std::collections::HashSet;

    let remote = InMemoryStore::new();
    let cache = InMemoryStore::new();
    let course = build_course();
    let gated = Chapter::new(ChapterId::generate(), course.id(), 1, "Gated").unwrap();
    let next = Chapter::new(ChapterId::generate(), course.id(), 2, "Next").unwrap();
    remote.put_chapter_questions(gated.id(), build_pool(gated.id(), 3));

    let mut slides = Vec::new();
    for (chapter, position) in [(&gated, 1u32), (&gated, 2), (&next, 1), (&next, 2)] {
        slides.push(
            Slide::new(
                SlideId::generate(),
                chapter.id(),
                position,
                "Slide",
                "body",
                None,
            )
            .unwrap(),
        );
    }
    let quiz_chapters: HashSet<ChapterId> = [gated.id()].into_iter().collect();
    let outline = CourseOutline::assemble(
        course.clone(),
        vec![gated.clone(), next.clone()],
        slides.clone(),
        &quiz_chapters,
    )
    .unwrap();

    let tracker = ProgressTracker::new(
        fixed_clock(),
        Arc::new(remote.clone()),
        Arc::new(cache.clone()),
    );
    let user = UserId::generate();

    // Finish chapter 1's slides: the pending quiz pins access to index 1.
    for slide in &slides[..2] {
        tracker.mark_done(user, course.id(), slide.id()).await.unwrap();
    }
    let progress = tracker.load(user, course.id()).await.unwrap();
    assert_eq!(
        accessible_up_to(&outline, &progress.slides, &progress.quizzes),
        1
    );

    // Submitting the quiz moves the boundary.
    let service = build_service(&remote, &cache);
    let mut session = service.begin(&course, gated.id()).await.unwrap();
    service
        .submit(user, &course, &mut session, false)
        .await
        .unwrap();

    let progress = tracker.load(user, course.id()).await.unwrap();
    assert_eq!(
        accessible_up_to(&outline, &progress.slides, &progress.quizzes),
        2
    );
}
