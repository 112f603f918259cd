//! Degraded-network behavior of the progress tracker: cache fallback on
//! load, optimistic mark-done when the remote write fails, and union
//! reconciliation once the remote store is reachable again.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use kds_core::model::{ChapterId, CourseId, SlideId, UserId};
use kds_core::time::fixed_clock;
use services::{ProgressSource, ProgressTracker};
use storage::repository::{
    InMemoryStore, ProgressRepository, QuizCompletionRow, SlideCompletionRow, StorageError,
};

/// Remote store that refuses every call, as during an outage.
struct DownstreamDown;

#[async_trait]
impl ProgressRepository for DownstreamDown {
    async fn list_slide_completions(
        &self,
        _user_id: UserId,
        _course_id: CourseId,
    ) -> Result<Vec<SlideCompletionRow>, StorageError> {
        Err(StorageError::Connection("network unreachable".into()))
    }

    async fn upsert_slide_completion(
        &self,
        _user_id: UserId,
        _course_id: CourseId,
        _slide_id: SlideId,
        _completed_at: DateTime<Utc>,
    ) -> Result<(), StorageError> {
        Err(StorageError::Connection("network unreachable".into()))
    }

    async fn list_quiz_completions(
        &self,
        _user_id: UserId,
        _course_id: CourseId,
    ) -> Result<Vec<QuizCompletionRow>, StorageError> {
        Err(StorageError::Connection("network unreachable".into()))
    }

    async fn upsert_quiz_completion(
        &self,
        _user_id: UserId,
        _course_id: CourseId,
        _chapter_id: ChapterId,
        _completed_at: DateTime<Utc>,
    ) -> Result<(), StorageError> {
        Err(StorageError::Connection("network unreachable".into()))
    }
}

#[tokio::test]
async fn load_falls_back_to_cache_when_remote_is_down() {
    let cache = InMemoryStore::new();
    let user = UserId::generate();
    let course = CourseId::generate();
    let slide = SlideId::generate();
    cache
        .upsert_slide_completion(user, course, slide, kds_core::time::fixed_now())
        .await
        .unwrap();

    let tracker = ProgressTracker::new(
        fixed_clock(),
        Arc::new(DownstreamDown),
        Arc::new(cache.clone()),
    );

    let progress = tracker.load(user, course).await.unwrap();
    assert_eq!(progress.source, ProgressSource::CacheOnly);
    assert!(progress.slides.contains(slide));
}

#[tokio::test]
async fn mark_done_survives_remote_failure_optimistically() {
    let cache = InMemoryStore::new();
    let user = UserId::generate();
    let course = CourseId::generate();
    let slide = SlideId::generate();

    let tracker = ProgressTracker::new(
        fixed_clock(),
        Arc::new(DownstreamDown),
        Arc::new(cache.clone()),
    );

    let outcome = tracker.mark_done(user, course, slide).await.unwrap();
    assert!(!outcome.synced);
    assert!(outcome.cached);

    // The completion is visible on the next (degraded) load.
    let progress = tracker.load(user, course).await.unwrap();
    assert!(progress.slides.contains(slide));
}

#[tokio::test]
async fn recovery_unions_cache_back_into_the_loaded_state() {
    let remote = InMemoryStore::new();
    let cache = InMemoryStore::new();
    let user = UserId::generate();
    let course = CourseId::generate();
    let offline_slide = SlideId::generate();
    let other_device_slide = SlideId::generate();
    let now = kds_core::time::fixed_now();

    // Recorded locally during the outage; recorded remotely from another
    // device meanwhile.
    cache
        .upsert_slide_completion(user, course, offline_slide, now)
        .await
        .unwrap();
    remote
        .upsert_slide_completion(user, course, other_device_slide, now)
        .await
        .unwrap();

    let tracker = ProgressTracker::new(
        fixed_clock(),
        Arc::new(remote.clone()),
        Arc::new(cache.clone()),
    );
    let progress = tracker.load(user, course).await.unwrap();

    assert_eq!(progress.source, ProgressSource::Remote);
    assert!(progress.slides.contains(offline_slide));
    assert!(progress.slides.contains(other_device_slide));

    // Write-back caught the cache up with the other device's row.
    let cached = cache.list_slide_completions(user, course).await.unwrap();
    assert_eq!(cached.len(), 2);
}
