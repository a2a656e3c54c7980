use std::collections::HashMap;

use lesson_core::model::{ChallengeId, LessonId, UserId};
use sqlx::Row;

use super::SqliteRepository;
use super::mapping::{
    challenge_id_from_i64, conn, id_to_i64, lesson_id_from_i64, option_id_from_i64, ser,
    u32_from_i64,
};
use crate::repository::{
    ChallengeOptionRecord, ChallengeRecord, LessonRecord, LessonRepository, StorageError,
};

#[async_trait::async_trait]
impl LessonRepository for SqliteRepository {
    async fn get_lesson(
        &self,
        user_id: UserId,
        lesson_id: LessonId,
    ) -> Result<LessonRecord, StorageError> {
        let lesson_key = id_to_i64("lesson_id", lesson_id.value())?;

        let lesson_row = sqlx::query("SELECT id, title FROM lessons WHERE id = ?1")
            .bind(lesson_key)
            .fetch_optional(&self.pool)
            .await
            .map_err(conn)?
            .ok_or(StorageError::NotFound)?;

        let completed = sqlx::query(
            r"
            SELECT completed FROM user_progress
            WHERE user_id = ?1 AND lesson_id = ?2
            ",
        )
        .bind(id_to_i64("user_id", user_id.value())?)
        .bind(lesson_key)
        .fetch_optional(&self.pool)
        .await
        .map_err(conn)?
        .map(|row| row.try_get::<i64, _>("completed").map(|v| v != 0))
        .transpose()
        .map_err(ser)?
        .unwrap_or(false);

        let option_rows = sqlx::query(
            r"
            SELECT o.id, o.challenge_id, o.text, o.correct, o.image_ref, o.audio_ref
            FROM challenge_options o
            JOIN challenges c ON c.id = o.challenge_id
            WHERE c.lesson_id = ?1
            ORDER BY o.challenge_id ASC, o.position ASC, o.id ASC
            ",
        )
        .bind(lesson_key)
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        let mut options: HashMap<ChallengeId, Vec<ChallengeOptionRecord>> = HashMap::new();
        for row in option_rows {
            let challenge_id = challenge_id_from_i64(row.try_get("challenge_id").map_err(ser)?)?;
            options
                .entry(challenge_id)
                .or_default()
                .push(ChallengeOptionRecord {
                    id: option_id_from_i64(row.try_get("id").map_err(ser)?)?,
                    text: row.try_get("text").map_err(ser)?,
                    correct: row.try_get::<i64, _>("correct").map_err(ser)? != 0,
                    image_ref: row.try_get("image_ref").map_err(ser)?,
                    audio_ref: row.try_get("audio_ref").map_err(ser)?,
                });
        }

        let challenge_rows = sqlx::query(
            r"
            SELECT id, kind, question, correct_text, audio_ref, position
            FROM challenges
            WHERE lesson_id = ?1
            ORDER BY position ASC, id ASC
            ",
        )
        .bind(lesson_key)
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        let mut challenges = Vec::with_capacity(challenge_rows.len());
        for row in challenge_rows {
            let id = challenge_id_from_i64(row.try_get("id").map_err(ser)?)?;
            challenges.push(ChallengeRecord {
                id,
                kind: row.try_get("kind").map_err(ser)?,
                question: row.try_get("question").map_err(ser)?,
                correct_text: row.try_get("correct_text").map_err(ser)?,
                audio_ref: row.try_get("audio_ref").map_err(ser)?,
                position: u32_from_i64("position", row.try_get("position").map_err(ser)?)?,
                options: options.remove(&id).unwrap_or_default(),
                completed,
            });
        }

        Ok(LessonRecord {
            id: lesson_id_from_i64(lesson_row.try_get("id").map_err(ser)?)?,
            title: lesson_row.try_get("title").map_err(ser)?,
            challenges,
        })
    }

    async fn upsert_lesson(&self, lesson: &LessonRecord) -> Result<(), StorageError> {
        let lesson_key = id_to_i64("lesson_id", lesson.id.value())?;
        let mut tx = self.pool.begin().await.map_err(conn)?;

        sqlx::query(
            r"
            INSERT INTO lessons (id, title) VALUES (?1, ?2)
            ON CONFLICT(id) DO UPDATE SET title = excluded.title
            ",
        )
        .bind(lesson_key)
        .bind(&lesson.title)
        .execute(&mut *tx)
        .await
        .map_err(conn)?;

        // Options cascade with their challenge.
        sqlx::query("DELETE FROM challenges WHERE lesson_id = ?1")
            .bind(lesson_key)
            .execute(&mut *tx)
            .await
            .map_err(conn)?;

        for challenge in &lesson.challenges {
            let challenge_key = id_to_i64("challenge_id", challenge.id.value())?;
            sqlx::query(
                r"
                INSERT INTO challenges (id, lesson_id, kind, question, correct_text, audio_ref, position)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                ",
            )
            .bind(challenge_key)
            .bind(lesson_key)
            .bind(&challenge.kind)
            .bind(&challenge.question)
            .bind(&challenge.correct_text)
            .bind(&challenge.audio_ref)
            .bind(i64::from(challenge.position))
            .execute(&mut *tx)
            .await
            .map_err(|e| match e {
                sqlx::Error::Database(db) if db.is_unique_violation() => StorageError::Conflict,
                other => conn(other),
            })?;

            for (option, position) in challenge.options.iter().zip(0_i64..) {
                sqlx::query(
                    r"
                    INSERT INTO challenge_options (id, challenge_id, text, correct, image_ref, audio_ref, position)
                    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                    ",
                )
                .bind(id_to_i64("option_id", option.id.value())?)
                .bind(challenge_key)
                .bind(&option.text)
                .bind(i64::from(option.correct))
                .bind(&option.image_ref)
                .bind(&option.audio_ref)
                .bind(position)
                .execute(&mut *tx)
                .await
                .map_err(|e| match e {
                    sqlx::Error::Database(db) if db.is_unique_violation() => {
                        StorageError::Conflict
                    }
                    other => conn(other),
                })?;
            }
        }

        tx.commit().await.map_err(conn)?;
        tracing::debug!(
            lesson = %lesson.id,
            challenges = lesson.challenges.len(),
            "stored lesson"
        );
        Ok(())
    }
}
