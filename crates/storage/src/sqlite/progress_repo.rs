use chrono::{DateTime, Utc};
use lesson_core::model::{LessonCompletion, LessonId, LessonProgress, UserId};

use super::SqliteRepository;
use super::mapping::{conn, id_to_i64, map_progress_row};
use crate::repository::{ProgressRepository, StorageError};

#[async_trait::async_trait]
impl ProgressRepository for SqliteRepository {
    async fn complete_lesson(
        &self,
        user_id: UserId,
        completion: &LessonCompletion,
        completed_at: DateTime<Utc>,
    ) -> Result<LessonProgress, StorageError> {
        let mut tx = self.pool.begin().await.map_err(conn)?;

        let mut profile = Self::fetch_profile(&mut *tx, user_id).await?;
        profile.apply_completion(completion, completed_at.date_naive());
        Self::write_profile(&mut *tx, &profile).await?;

        // Replays overwrite the previous metrics.
        sqlx::query(
            r"
            INSERT INTO user_progress (user_id, lesson_id, completed, hearts_used, points_earned, completed_at)
            VALUES (?1, ?2, 1, ?3, ?4, ?5)
            ON CONFLICT(user_id, lesson_id) DO UPDATE SET
                completed = 1,
                hearts_used = excluded.hearts_used,
                points_earned = excluded.points_earned,
                completed_at = excluded.completed_at
            ",
        )
        .bind(id_to_i64("user_id", user_id.value())?)
        .bind(id_to_i64("lesson_id", completion.lesson_id.value())?)
        .bind(i64::from(completion.hearts_used))
        .bind(i64::from(completion.points_earned))
        .bind(completed_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(db) if db.is_foreign_key_violation() => StorageError::NotFound,
            other => conn(other),
        })?;

        tx.commit().await.map_err(conn)?;
        tracing::info!(
            user = %user_id,
            lesson = %completion.lesson_id,
            hearts_used = completion.hearts_used,
            points = completion.points_earned,
            "lesson completed"
        );
        Ok(LessonProgress::completed(user_id, completion))
    }

    async fn lesson_progress(
        &self,
        user_id: UserId,
        lesson_id: LessonId,
    ) -> Result<Option<LessonProgress>, StorageError> {
        let row = sqlx::query(
            r"
            SELECT user_id, lesson_id, completed, hearts_used, points_earned
            FROM user_progress
            WHERE user_id = ?1 AND lesson_id = ?2
            ",
        )
        .bind(id_to_i64("user_id", user_id.value())?)
        .bind(id_to_i64("lesson_id", lesson_id.value())?)
        .fetch_optional(&self.pool)
        .await
        .map_err(conn)?;

        row.as_ref().map(map_progress_row).transpose()
    }
}
