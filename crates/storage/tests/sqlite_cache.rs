use chrono::Duration;

use kds_core::model::{ChapterId, CourseId, SlideId, UserId};
use kds_core::time::fixed_now;
use storage::repository::ProgressRepository;
use storage::sqlite::SqliteProgressCache;

async fn connect() -> SqliteProgressCache {
    SqliteProgressCache::connect("sqlite::memory:")
        .await
        .expect("in-memory sqlite")
}

#[tokio::test]
async fn slide_completions_round_trip() {
    let cache = connect().await;
    let user = UserId::generate();
    let course = CourseId::generate();
    let slide = SlideId::generate();
    let now = fixed_now();

    cache
        .upsert_slide_completion(user, course, slide, now)
        .await
        .unwrap();

    let rows = cache.list_slide_completions(user, course).await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].slide_id, slide);
    assert_eq!(rows[0].completed_at, now);

    // Scoped per (user, course).
    let other = cache
        .list_slide_completions(user, CourseId::generate())
        .await
        .unwrap();
    assert!(other.is_empty());
}

#[tokio::test]
async fn remark_keeps_earliest_timestamp() {
    let cache = connect().await;
    let user = UserId::generate();
    let course = CourseId::generate();
    let slide = SlideId::generate();
    let now = fixed_now();

    cache
        .upsert_slide_completion(user, course, slide, now + Duration::minutes(10))
        .await
        .unwrap();
    cache
        .upsert_slide_completion(user, course, slide, now)
        .await
        .unwrap();
    cache
        .upsert_slide_completion(user, course, slide, now + Duration::hours(2))
        .await
        .unwrap();

    let rows = cache.list_slide_completions(user, course).await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].completed_at, now);
}

#[tokio::test]
async fn quiz_completions_round_trip() {
    let cache = connect().await;
    let user = UserId::generate();
    let course = CourseId::generate();
    let chapter = ChapterId::generate();
    let now = fixed_now();

    cache
        .upsert_quiz_completion(user, course, chapter, now)
        .await
        .unwrap();
    cache
        .upsert_quiz_completion(user, course, chapter, now + Duration::days(1))
        .await
        .unwrap();

    let rows = cache.list_quiz_completions(user, course).await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].chapter_id, chapter);
    assert_eq!(rows[0].completed_at, now);
}

#[tokio::test]
async fn migrations_are_idempotent() {
    let cache = connect().await;
    cache.migrate().await.unwrap();
    cache.migrate().await.unwrap();
}
