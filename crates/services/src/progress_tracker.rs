use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::warn;

use kds_core::Clock;
use kds_core::model::{ChapterId, CourseId, SlideId, UserId};
use kds_core::progress::{CompletionSet, QuizCompletionSet};
use storage::repository::{ProgressRepository, QuizCompletionRow, SlideCompletionRow};

use crate::error::ProgressError;

/// Where the loaded completion state came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressSource {
    /// Remote rows, unioned with the cache and written back.
    Remote,
    /// Remote fetch failed; cache contents served as the fallback.
    CacheOnly,
}

/// Completion state for a (user, course) pair, assembled on load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CourseProgress {
    pub slides: CompletionSet,
    pub quizzes: QuizCompletionSet,
    pub source: ProgressSource,
}

/// Outcome of a mark-done write. The completion is always reflected in the
/// returned state; `synced` / `cached` report which stores acknowledged it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MarkOutcome {
    pub completed_at: DateTime<Utc>,
    /// Remote upsert acknowledged.
    pub synced: bool,
    /// Local cache write acknowledged.
    pub cached: bool,
}

/// Dual-store progress tracking: the remote store is the source of truth, the
/// local cache is a monotonic-union fallback that never shrinks it. Writes go
/// to both; a single-side failure degrades to a visible-but-non-blocking
/// outcome.
#[derive(Clone)]
pub struct ProgressTracker {
    clock: Clock,
    remote: Arc<dyn ProgressRepository>,
    cache: Arc<dyn ProgressRepository>,
}

impl ProgressTracker {
    #[must_use]
    pub fn new(
        clock: Clock,
        remote: Arc<dyn ProgressRepository>,
        cache: Arc<dyn ProgressRepository>,
    ) -> Self {
        Self {
            clock,
            remote,
            cache,
        }
    }

    /// Load completion state: remote ∪ cache on success, cache alone when the
    /// remote fetch fails. On success the union is written back so the cache
    /// catches up with rows recorded from other devices.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError` only when the remote fetch fails *and* the
    /// cache cannot be read either.
    pub async fn load(
        &self,
        user_id: UserId,
        course_id: CourseId,
    ) -> Result<CourseProgress, ProgressError> {
        let remote_slides = self.remote.list_slide_completions(user_id, course_id).await;
        let remote_quizzes = self.remote.list_quiz_completions(user_id, course_id).await;

        match (remote_slides, remote_quizzes) {
            (Ok(slide_rows), Ok(quiz_rows)) => {
                let mut slides = slide_set(&slide_rows);
                let mut quizzes = quiz_set(&quiz_rows);

                match self.cache.list_slide_completions(user_id, course_id).await {
                    Ok(rows) => slides.union(&slide_set(&rows)),
                    Err(e) => warn!(%user_id, %course_id, error = %e, "progress cache read failed"),
                }
                match self.cache.list_quiz_completions(user_id, course_id).await {
                    Ok(rows) => quizzes.union(&quiz_set(&rows)),
                    Err(e) => warn!(%user_id, %course_id, error = %e, "quiz cache read failed"),
                }

                self.write_back(user_id, course_id, &slides, &quizzes).await;

                Ok(CourseProgress {
                    slides,
                    quizzes,
                    source: ProgressSource::Remote,
                })
            }
            (slides_result, quizzes_result) => {
                if let Some(e) = slides_result.err().or_else(|| quizzes_result.err()) {
                    warn!(%user_id, %course_id, error = %e, "remote progress fetch failed; serving cache");
                }
                let slide_rows = self.cache.list_slide_completions(user_id, course_id).await?;
                let quiz_rows = self.cache.list_quiz_completions(user_id, course_id).await?;
                Ok(CourseProgress {
                    slides: slide_set(&slide_rows),
                    quizzes: quiz_set(&quiz_rows),
                    source: ProgressSource::CacheOnly,
                })
            }
        }
    }

    /// Record a slide completion: cache first (optimistic), then the remote
    /// upsert keyed on (user, course, slide). A failed remote write reports
    /// `synced: false` without rolling anything back.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError` only when both stores reject the write.
    pub async fn mark_done(
        &self,
        user_id: UserId,
        course_id: CourseId,
        slide_id: SlideId,
    ) -> Result<MarkOutcome, ProgressError> {
        let completed_at = self.clock.now();

        let cached = match self
            .cache
            .upsert_slide_completion(user_id, course_id, slide_id, completed_at)
            .await
        {
            Ok(()) => true,
            Err(e) => {
                warn!(%user_id, %slide_id, error = %e, "progress cache write failed");
                false
            }
        };

        match self
            .remote
            .upsert_slide_completion(user_id, course_id, slide_id, completed_at)
            .await
        {
            Ok(()) => Ok(MarkOutcome {
                completed_at,
                synced: true,
                cached,
            }),
            Err(e) if cached => {
                warn!(%user_id, %slide_id, error = %e, "remote completion write failed; cached locally");
                Ok(MarkOutcome {
                    completed_at,
                    synced: false,
                    cached,
                })
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Record a chapter-quiz completion with the same dual-write discipline
    /// as [`ProgressTracker::mark_done`].
    ///
    /// # Errors
    ///
    /// Returns `ProgressError` only when both stores reject the write.
    pub async fn mark_quiz_done(
        &self,
        user_id: UserId,
        course_id: CourseId,
        chapter_id: ChapterId,
    ) -> Result<MarkOutcome, ProgressError> {
        let completed_at = self.clock.now();

        let cached = match self
            .cache
            .upsert_quiz_completion(user_id, course_id, chapter_id, completed_at)
            .await
        {
            Ok(()) => true,
            Err(e) => {
                warn!(%user_id, %chapter_id, error = %e, "quiz cache write failed");
                false
            }
        };

        match self
            .remote
            .upsert_quiz_completion(user_id, course_id, chapter_id, completed_at)
            .await
        {
            Ok(()) => Ok(MarkOutcome {
                completed_at,
                synced: true,
                cached,
            }),
            Err(e) if cached => {
                warn!(%user_id, %chapter_id, error = %e, "remote quiz-completion write failed; cached locally");
                Ok(MarkOutcome {
                    completed_at,
                    synced: false,
                    cached,
                })
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Fire-and-forget union write-back into the cache. Failures are logged,
    /// never surfaced; the cache only supplements the remote store.
    async fn write_back(
        &self,
        user_id: UserId,
        course_id: CourseId,
        slides: &CompletionSet,
        quizzes: &QuizCompletionSet,
    ) {
        for (slide_id, completed_at) in slides.iter() {
            if let Err(e) = self
                .cache
                .upsert_slide_completion(user_id, course_id, slide_id, completed_at)
                .await
            {
                warn!(%user_id, %course_id, error = %e, "cache write-back failed");
                return;
            }
        }
        for (chapter_id, completed_at) in quizzes.iter() {
            if let Err(e) = self
                .cache
                .upsert_quiz_completion(user_id, course_id, chapter_id, completed_at)
                .await
            {
                warn!(%user_id, %course_id, error = %e, "quiz cache write-back failed");
                return;
            }
        }
    }
}

fn slide_set(rows: &[SlideCompletionRow]) -> CompletionSet {
    rows.iter()
        .map(|row| (row.slide_id, row.completed_at))
        .collect()
}

fn quiz_set(rows: &[QuizCompletionRow]) -> QuizCompletionSet {
    rows.iter()
        .map(|row| (row.chapter_id, row.completed_at))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use kds_core::time::fixed_clock;
    use storage::repository::InMemoryStore;

    fn tracker(remote: &InMemoryStore, cache: &InMemoryStore) -> ProgressTracker {
        ProgressTracker::new(
            fixed_clock(),
            Arc::new(remote.clone()),
            Arc::new(cache.clone()),
        )
    }

    #[tokio::test]
    async fn load_unions_remote_and_cache_and_writes_back() {
        let remote = InMemoryStore::new();
        let cache = InMemoryStore::new();
        let user = UserId::generate();
        let course = CourseId::generate();
        let remote_slide = SlideId::generate();
        let cached_slide = SlideId::generate();
        let now = kds_core::time::fixed_now();

        remote
            .upsert_slide_completion(user, course, remote_slide, now)
            .await
            .unwrap();
        cache
            .upsert_slide_completion(user, course, cached_slide, now)
            .await
            .unwrap();

        let progress = tracker(&remote, &cache).load(user, course).await.unwrap();
        assert_eq!(progress.source, ProgressSource::Remote);
        assert!(progress.slides.contains(remote_slide));
        assert!(progress.slides.contains(cached_slide));

        // Write-back: the cache now carries the remote row too.
        let cached_rows = cache.list_slide_completions(user, course).await.unwrap();
        assert_eq!(cached_rows.len(), 2);
    }

    #[tokio::test]
    async fn mark_done_writes_both_stores() {
        let remote = InMemoryStore::new();
        let cache = InMemoryStore::new();
        let user = UserId::generate();
        let course = CourseId::generate();
        let slide = SlideId::generate();

        let outcome = tracker(&remote, &cache)
            .mark_done(user, course, slide)
            .await
            .unwrap();
        assert!(outcome.synced);
        assert!(outcome.cached);

        assert_eq!(
            remote
                .list_slide_completions(user, course)
                .await
                .unwrap()
                .len(),
            1
        );
        assert_eq!(
            cache
                .list_slide_completions(user, course)
                .await
                .unwrap()
                .len(),
            1
        );
    }

    #[tokio::test]
    async fn remark_is_idempotent() {
        let remote = InMemoryStore::new();
        let cache = InMemoryStore::new();
        let user = UserId::generate();
        let course = CourseId::generate();
        let slide = SlideId::generate();
        let tracker = tracker(&remote, &cache);

        tracker.mark_done(user, course, slide).await.unwrap();
        tracker.mark_done(user, course, slide).await.unwrap();

        let rows = remote.list_slide_completions(user, course).await.unwrap();
        assert_eq!(rows.len(), 1);
    }
}
