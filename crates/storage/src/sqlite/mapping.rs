use chrono::NaiveDate;
use lesson_core::model::{
    ChallengeId, LearnerProfile, LessonId, LessonProgress, OptionId, Streak, UserId,
};
use sqlx::Row;
use sqlx::sqlite::SqliteRow;

use crate::repository::StorageError;

pub(crate) fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

pub(crate) fn conn<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Connection(e.to_string())
}

fn i64_to_u64(field: &'static str, v: i64) -> Result<u64, StorageError> {
    u64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} sign overflow")))
}

pub(crate) fn u32_from_i64(field: &'static str, v: i64) -> Result<u32, StorageError> {
    u32::try_from(v).map_err(|_| StorageError::Serialization(format!("invalid {field}: {v}")))
}

pub(crate) fn id_to_i64(field: &'static str, v: u64) -> Result<i64, StorageError> {
    i64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} overflow")))
}

pub(crate) fn lesson_id_from_i64(v: i64) -> Result<LessonId, StorageError> {
    Ok(LessonId::new(i64_to_u64("lesson_id", v)?))
}

pub(crate) fn challenge_id_from_i64(v: i64) -> Result<ChallengeId, StorageError> {
    Ok(ChallengeId::new(i64_to_u64("challenge_id", v)?))
}

pub(crate) fn option_id_from_i64(v: i64) -> Result<OptionId, StorageError> {
    Ok(OptionId::new(i64_to_u64("option_id", v)?))
}

pub(crate) fn user_id_from_i64(v: i64) -> Result<UserId, StorageError> {
    Ok(UserId::new(i64_to_u64("user_id", v)?))
}

pub(crate) fn map_profile_row(row: &SqliteRow) -> Result<LearnerProfile, StorageError> {
    let last_activity: Option<NaiveDate> = row.try_get("last_activity_date").map_err(ser)?;
    let streak = Streak {
        count: u32_from_i64("streak_count", row.try_get("streak_count").map_err(ser)?)?,
        longest: u32_from_i64("longest_streak", row.try_get("longest_streak").map_err(ser)?)?,
        frozen: row.try_get::<i64, _>("streak_frozen").map_err(ser)? != 0,
        last_activity,
    };

    Ok(LearnerProfile {
        user_id: user_id_from_i64(row.try_get("id").map_err(ser)?)?,
        hearts: u32_from_i64("hearts", row.try_get("hearts").map_err(ser)?)?,
        points: u32_from_i64("points", row.try_get("points").map_err(ser)?)?,
        xp: u32_from_i64("xp", row.try_get("xp").map_err(ser)?)?,
        streak,
        subscription_active: row.try_get::<i64, _>("subscription_active").map_err(ser)? != 0,
    })
}

pub(crate) fn map_progress_row(row: &SqliteRow) -> Result<LessonProgress, StorageError> {
    LessonProgress::from_persisted(
        user_id_from_i64(row.try_get("user_id").map_err(ser)?)?,
        lesson_id_from_i64(row.try_get("lesson_id").map_err(ser)?)?,
        row.try_get::<i64, _>("completed").map_err(ser)? != 0,
        row.try_get("hearts_used").map_err(ser)?,
        row.try_get("points_earned").map_err(ser)?,
    )
    .map_err(ser)
}
