use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::Row;
use uuid::Uuid;

use kds_core::model::{ChapterId, CourseId, SlideId, UserId};

use super::SqliteProgressCache;
use crate::repository::{ProgressRepository, QuizCompletionRow, SlideCompletionRow, StorageError};

fn conn<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Connection(e.to_string())
}

fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

fn uuid_from_text(field: &'static str, raw: &str) -> Result<Uuid, StorageError> {
    raw.parse::<Uuid>()
        .map_err(|_| StorageError::Serialization(format!("invalid {field}: {raw}")))
}

#[async_trait]
impl ProgressRepository for SqliteProgressCache {
    async fn list_slide_completions(
        &self,
        user_id: UserId,
        course_id: CourseId,
    ) -> Result<Vec<SlideCompletionRow>, StorageError> {
        let rows = sqlx::query(
            r"
                SELECT slide_id, completed_at
                FROM slide_completions
                WHERE user_id = ?1 AND course_id = ?2
                ORDER BY completed_at ASC, slide_id ASC
            ",
        )
        .bind(user_id.value().to_string())
        .bind(course_id.value().to_string())
        .fetch_all(self.pool())
        .await
        .map_err(conn)?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            let raw: String = row.try_get("slide_id").map_err(ser)?;
            let completed_at: DateTime<Utc> = row.try_get("completed_at").map_err(ser)?;
            out.push(SlideCompletionRow {
                slide_id: SlideId::new(uuid_from_text("slide_id", &raw)?),
                completed_at,
            });
        }
        Ok(out)
    }

    async fn upsert_slide_completion(
        &self,
        user_id: UserId,
        course_id: CourseId,
        slide_id: SlideId,
        completed_at: DateTime<Utc>,
    ) -> Result<(), StorageError> {
        sqlx::query(
            r"
                INSERT INTO slide_completions (user_id, course_id, slide_id, completed_at)
                VALUES (?1, ?2, ?3, ?4)
                ON CONFLICT(user_id, course_id, slide_id)
                DO UPDATE SET completed_at =
                    MIN(slide_completions.completed_at, excluded.completed_at)
            ",
        )
        .bind(user_id.value().to_string())
        .bind(course_id.value().to_string())
        .bind(slide_id.value().to_string())
        .bind(completed_at)
        .execute(self.pool())
        .await
        .map_err(conn)?;
        Ok(())
    }

    async fn list_quiz_completions(
        &self,
        user_id: UserId,
        course_id: CourseId,
    ) -> Result<Vec<QuizCompletionRow>, StorageError> {
        let rows = sqlx::query(
            r"
                SELECT chapter_id, completed_at
                FROM chapter_quiz_completions
                WHERE user_id = ?1 AND course_id = ?2
                ORDER BY completed_at ASC, chapter_id ASC
            ",
        )
        .bind(user_id.value().to_string())
        .bind(course_id.value().to_string())
        .fetch_all(self.pool())
        .await
        .map_err(conn)?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            let raw: String = row.try_get("chapter_id").map_err(ser)?;
            let completed_at: DateTime<Utc> = row.try_get("completed_at").map_err(ser)?;
            out.push(QuizCompletionRow {
                chapter_id: ChapterId::new(uuid_from_text("chapter_id", &raw)?),
                completed_at,
            });
        }
        Ok(out)
    }

    async fn upsert_quiz_completion(
        &self,
        user_id: UserId,
        course_id: CourseId,
        chapter_id: ChapterId,
        completed_at: DateTime<Utc>,
    ) -> Result<(), StorageError> {
        sqlx::query(
            r"
                INSERT INTO chapter_quiz_completions (user_id, course_id, chapter_id, completed_at)
                VALUES (?1, ?2, ?3, ?4)
                ON CONFLICT(user_id, course_id, chapter_id)
                DO UPDATE SET completed_at =
                    MIN(chapter_quiz_completions.completed_at, excluded.completed_at)
            ",
        )
        .bind(user_id.value().to_string())
        .bind(course_id.value().to_string())
        .bind(chapter_id.value().to_string())
        .bind(completed_at)
        .execute(self.pool())
        .await
        .map_err(conn)?;
        Ok(())
    }
}
