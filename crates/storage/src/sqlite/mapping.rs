use chrono::{DateTime, Utc};
use portal_core::model::{
    Group, GroupId, ReviewEvent, ReviewEventId, StudyActivity, StudyActivityId, StudySession,
    StudySessionId, Word, WordCounter, WordId,
};
use sqlx::Row;
use sqlx::sqlite::SqliteRow;

use crate::repository::StorageError;

pub(crate) fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

pub(crate) fn conn(e: sqlx::Error) -> StorageError {
    StorageError::Connection(e.to_string())
}

/// Like [`conn`], but a violated foreign key means a referenced row is missing.
pub(crate) fn conn_or_missing(e: sqlx::Error) -> StorageError {
    if let sqlx::Error::Database(db) = &e {
        if db.is_foreign_key_violation() {
            return StorageError::NotFound;
        }
    }
    conn(e)
}

pub(crate) fn id_i64(field: &'static str, v: u64) -> Result<i64, StorageError> {
    i64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} overflow")))
}

pub(crate) fn u64_from_i64(field: &'static str, v: i64) -> Result<u64, StorageError> {
    u64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} sign overflow")))
}

/// Timestamps are stored as fixed-width UTC text so that lexical order
/// matches chronological order.
pub(crate) fn ts_to_text(at: DateTime<Utc>) -> String {
    at.format("%Y-%m-%dT%H:%M:%S%.6fZ").to_string()
}

pub(crate) fn ts_from_text(raw: &str) -> Result<DateTime<Utc>, StorageError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| StorageError::Serialization(format!("invalid timestamp {raw:?}: {e}")))
}

fn get_id(row: &SqliteRow, column: &'static str) -> Result<u64, StorageError> {
    u64_from_i64(column, row.try_get::<i64, _>(column).map_err(ser)?)
}

fn get_ts(row: &SqliteRow, column: &'static str) -> Result<DateTime<Utc>, StorageError> {
    ts_from_text(&row.try_get::<String, _>(column).map_err(ser)?)
}

pub(crate) fn map_word_row(row: &SqliteRow) -> Result<Word, StorageError> {
    Word::new(
        WordId::new(get_id(row, "id")?),
        row.try_get::<String, _>("japanese").map_err(ser)?,
        row.try_get::<String, _>("romaji").map_err(ser)?,
        row.try_get::<String, _>("english").map_err(ser)?,
    )
    .map_err(ser)
}

pub(crate) fn map_group_row(row: &SqliteRow) -> Result<Group, StorageError> {
    Group::new(
        GroupId::new(get_id(row, "id")?),
        row.try_get::<String, _>("name").map_err(ser)?,
    )
    .map_err(ser)
}

pub(crate) fn map_activity_row(row: &SqliteRow) -> Result<StudyActivity, StorageError> {
    StudyActivity::new(
        StudyActivityId::new(get_id(row, "id")?),
        row.try_get::<String, _>("name").map_err(ser)?,
        row.try_get::<String, _>("thumbnail_url").map_err(ser)?,
        row.try_get::<String, _>("description").map_err(ser)?,
    )
    .map_err(ser)
}

pub(crate) fn map_session_row(row: &SqliteRow) -> Result<StudySession, StorageError> {
    Ok(StudySession {
        id: StudySessionId::new(get_id(row, "id")?),
        group_id: GroupId::new(get_id(row, "group_id")?),
        study_activity_id: StudyActivityId::new(get_id(row, "study_activity_id")?),
        created_at: get_ts(row, "created_at")?,
    })
}

pub(crate) fn map_event_row(row: &SqliteRow) -> Result<ReviewEvent, StorageError> {
    let correct: i64 = row.try_get("correct").map_err(ser)?;
    let correct = match correct {
        0 => false,
        1 => true,
        other => {
            return Err(StorageError::Serialization(format!(
                "invalid correct flag: {other}"
            )));
        }
    };
    Ok(ReviewEvent {
        id: ReviewEventId::new(get_id(row, "id")?),
        session_id: StudySessionId::new(get_id(row, "study_session_id")?),
        word_id: WordId::new(get_id(row, "word_id")?),
        correct,
        reviewed_at: get_ts(row, "created_at")?,
    })
}

pub(crate) fn map_counter_row(row: &SqliteRow) -> Result<WordCounter, StorageError> {
    Ok(WordCounter {
        word_id: WordId::new(get_id(row, "word_id")?),
        correct_count: u64_from_i64("correct_count", row.try_get("correct_count").map_err(ser)?)?,
        wrong_count: u64_from_i64("wrong_count", row.try_get("wrong_count").map_err(ser)?)?,
    })
}
