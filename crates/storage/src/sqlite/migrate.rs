use chrono::Utc;
use sqlx::SqlitePool;

use super::SqliteInitError;

const SCHEMA_V1: &[&str] = &[
    r"
    CREATE TABLE IF NOT EXISTS lessons (
        id INTEGER PRIMARY KEY,
        title TEXT NOT NULL
    );
    ",
    r"
    CREATE TABLE IF NOT EXISTS challenges (
        id INTEGER PRIMARY KEY,
        lesson_id INTEGER NOT NULL,
        kind TEXT NOT NULL,
        question TEXT NOT NULL,
        correct_text TEXT,
        audio_ref TEXT,
        position INTEGER NOT NULL CHECK (position >= 0),
        FOREIGN KEY (lesson_id) REFERENCES lessons(id) ON DELETE CASCADE
    );
    ",
    r"
    CREATE TABLE IF NOT EXISTS challenge_options (
        id INTEGER PRIMARY KEY,
        challenge_id INTEGER NOT NULL,
        text TEXT NOT NULL,
        correct INTEGER NOT NULL CHECK (correct IN (0, 1)),
        image_ref TEXT,
        audio_ref TEXT,
        position INTEGER NOT NULL CHECK (position >= 0),
        FOREIGN KEY (challenge_id) REFERENCES challenges(id) ON DELETE CASCADE
    );
    ",
    r"
    CREATE TABLE IF NOT EXISTS users (
        id INTEGER PRIMARY KEY,
        hearts INTEGER NOT NULL CHECK (hearts >= 0),
        points INTEGER NOT NULL CHECK (points >= 0),
        xp INTEGER NOT NULL CHECK (xp >= 0),
        streak_count INTEGER NOT NULL DEFAULT 0 CHECK (streak_count >= 0),
        longest_streak INTEGER NOT NULL DEFAULT 0 CHECK (longest_streak >= 0),
        streak_frozen INTEGER NOT NULL DEFAULT 0,
        last_activity_date TEXT,
        subscription_active INTEGER NOT NULL DEFAULT 0
    );
    ",
    r"
    CREATE TABLE IF NOT EXISTS user_progress (
        user_id INTEGER NOT NULL,
        lesson_id INTEGER NOT NULL,
        completed INTEGER NOT NULL DEFAULT 0,
        hearts_used INTEGER NOT NULL CHECK (hearts_used >= 0),
        points_earned INTEGER NOT NULL CHECK (points_earned >= 0),
        completed_at TEXT NOT NULL,
        PRIMARY KEY (user_id, lesson_id),
        FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE,
        FOREIGN KEY (lesson_id) REFERENCES lessons(id) ON DELETE CASCADE
    );
    ",
    r"
    CREATE INDEX IF NOT EXISTS idx_challenges_lesson_position
        ON challenges(lesson_id, position);
    ",
    r"
    CREATE INDEX IF NOT EXISTS idx_challenge_options_challenge_position
        ON challenge_options(challenge_id, position);
    ",
];

/// Applies pending schema versions, each in its own transaction.
pub async fn run_migrations(pool: &SqlitePool) -> Result<(), SqliteInitError> {
    async fn is_applied(pool: &SqlitePool, version: i64) -> Result<bool, sqlx::Error> {
        let row = sqlx::query("SELECT 1 FROM schema_migrations WHERE version = ?1")
            .bind(version)
            .fetch_optional(pool)
            .await?;
        Ok(row.is_some())
    }

    sqlx::query(
        r"
            CREATE TABLE IF NOT EXISTS schema_migrations (
                version INTEGER PRIMARY KEY,
                applied_at TEXT NOT NULL
            );
            ",
    )
    .execute(pool)
    .await?;

    // Version 1: lessons, learners and progress.
    if !is_applied(pool, 1).await? {
        let mut tx = pool.begin().await?;
        for statement in SCHEMA_V1 {
            sqlx::query(statement).execute(&mut *tx).await?;
        }

        sqlx::query(
            r"
                INSERT INTO schema_migrations (version, applied_at)
                VALUES (?1, ?2)
                ON CONFLICT(version) DO NOTHING
            ",
        )
        .bind(1_i64)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        tracing::info!(version = 1, "applied schema migration");
    }

    Ok(())
}
