use lesson_core::model::{LearnerProfile, MAX_HEARTS, UserId};

use super::SqliteRepository;
use super::mapping::{conn, id_to_i64, map_profile_row};
use crate::repository::{ProfileRepository, StorageError};

const SELECT_PROFILE: &str = r"
    SELECT id, hearts, points, xp, streak_count, longest_streak, streak_frozen,
           last_activity_date, subscription_active
    FROM users WHERE id = ?1
";

impl SqliteRepository {
    pub(crate) async fn fetch_profile<'e, E>(
        executor: E,
        user_id: UserId,
    ) -> Result<LearnerProfile, StorageError>
    where
        E: sqlx::Executor<'e, Database = sqlx::Sqlite>,
    {
        let row = sqlx::query(SELECT_PROFILE)
            .bind(id_to_i64("user_id", user_id.value())?)
            .fetch_optional(executor)
            .await
            .map_err(conn)?
            .ok_or(StorageError::NotFound)?;
        map_profile_row(&row)
    }

    pub(crate) async fn write_profile<'e, E>(
        executor: E,
        profile: &LearnerProfile,
    ) -> Result<(), StorageError>
    where
        E: sqlx::Executor<'e, Database = sqlx::Sqlite>,
    {
        sqlx::query(
            r"
            INSERT INTO users (id, hearts, points, xp, streak_count, longest_streak,
                               streak_frozen, last_activity_date, subscription_active)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            ON CONFLICT(id) DO UPDATE SET
                hearts = excluded.hearts,
                points = excluded.points,
                xp = excluded.xp,
                streak_count = excluded.streak_count,
                longest_streak = excluded.longest_streak,
                streak_frozen = excluded.streak_frozen,
                last_activity_date = excluded.last_activity_date,
                subscription_active = excluded.subscription_active
            ",
        )
        .bind(id_to_i64("user_id", profile.user_id.value())?)
        .bind(i64::from(profile.hearts))
        .bind(i64::from(profile.points))
        .bind(i64::from(profile.xp))
        .bind(i64::from(profile.streak.count))
        .bind(i64::from(profile.streak.longest))
        .bind(i64::from(profile.streak.frozen))
        .bind(profile.streak.last_activity)
        .bind(i64::from(profile.subscription_active))
        .execute(executor)
        .await
        .map_err(conn)?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl ProfileRepository for SqliteRepository {
    async fn get_profile(&self, user_id: UserId) -> Result<LearnerProfile, StorageError> {
        Self::fetch_profile(&self.pool, user_id).await
    }

    async fn upsert_profile(&self, profile: &LearnerProfile) -> Result<(), StorageError> {
        Self::write_profile(&self.pool, profile).await
    }

    async fn refill_hearts(&self, user_id: UserId) -> Result<LearnerProfile, StorageError> {
        let res = sqlx::query("UPDATE users SET hearts = ?1 WHERE id = ?2")
            .bind(i64::from(MAX_HEARTS))
            .bind(id_to_i64("user_id", user_id.value())?)
            .execute(&self.pool)
            .await
            .map_err(conn)?;
        if res.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }
        Self::fetch_profile(&self.pool, user_id).await
    }
}
