use chrono::Utc;
use sqlx::SqlitePool;

use super::SqliteInitError;
use super::mapping::ts_to_text;

/// Table definitions for schema version 1, applied in order.
const SCHEMA_V1: &[&str] = &[
    r"
        CREATE TABLE IF NOT EXISTS words (
            id INTEGER PRIMARY KEY,
            japanese TEXT NOT NULL,
            romaji TEXT NOT NULL,
            english TEXT NOT NULL
        );
    ",
    r"
        CREATE TABLE IF NOT EXISTS vocab_groups (
            id INTEGER PRIMARY KEY,
            name TEXT NOT NULL
        );
    ",
    r"
        CREATE TABLE IF NOT EXISTS group_words (
            group_id INTEGER NOT NULL,
            word_id INTEGER NOT NULL,
            PRIMARY KEY (group_id, word_id),
            FOREIGN KEY (group_id) REFERENCES vocab_groups(id) ON DELETE CASCADE,
            FOREIGN KEY (word_id) REFERENCES words(id) ON DELETE CASCADE
        );
    ",
    r"
        CREATE TABLE IF NOT EXISTS study_activities (
            id INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            thumbnail_url TEXT NOT NULL,
            description TEXT NOT NULL
        );
    ",
    r"
        CREATE TABLE IF NOT EXISTS study_sessions (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            group_id INTEGER NOT NULL,
            study_activity_id INTEGER NOT NULL,
            created_at TEXT NOT NULL,
            FOREIGN KEY (group_id) REFERENCES vocab_groups(id),
            FOREIGN KEY (study_activity_id) REFERENCES study_activities(id)
        );
    ",
    r"
        CREATE TABLE IF NOT EXISTS word_review_items (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            word_id INTEGER NOT NULL,
            study_session_id INTEGER NOT NULL,
            correct INTEGER NOT NULL CHECK (correct IN (0, 1)),
            created_at TEXT NOT NULL,
            FOREIGN KEY (word_id) REFERENCES words(id),
            FOREIGN KEY (study_session_id) REFERENCES study_sessions(id)
        );
    ",
    r"
        CREATE TABLE IF NOT EXISTS word_review_counters (
            word_id INTEGER PRIMARY KEY,
            correct_count INTEGER NOT NULL CHECK (correct_count >= 0),
            wrong_count INTEGER NOT NULL CHECK (wrong_count >= 0)
        );
    ",
    r"
        CREATE INDEX IF NOT EXISTS idx_study_sessions_created
            ON study_sessions (created_at, id);
    ",
    r"
        CREATE INDEX IF NOT EXISTS idx_study_sessions_activity
            ON study_sessions (study_activity_id, created_at);
    ",
    r"
        CREATE INDEX IF NOT EXISTS idx_word_review_items_session
            ON word_review_items (study_session_id);
    ",
    r"
        CREATE INDEX IF NOT EXISTS idx_word_review_items_word
            ON word_review_items (word_id);
    ",
    r"
        CREATE INDEX IF NOT EXISTS idx_word_review_items_created
            ON word_review_items (created_at, id);
    ",
];

/// Runs the versioned migrations for the current schema.
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

    // Version 1: catalog, sessions, review log and counters.
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
        .bind(ts_to_text(Utc::now()))
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        tracing::info!(version = 1, "applied schema migration");
    }

    Ok(())
}
