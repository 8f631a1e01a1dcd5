use std::collections::BTreeSet;

use portal_core::model::{GroupId, NewStudySession, StudyActivityId, StudySession, StudySessionId};
use sqlx::Row;

use super::{
    SqliteRepository,
    mapping::{conn, conn_or_missing, id_i64, map_session_row, ser, ts_to_text, u64_from_i64},
};
use crate::repository::{SessionRepository, StorageError};

const SESSION_COLUMNS: &str = "id, group_id, study_activity_id, created_at";

#[async_trait::async_trait]
impl SessionRepository for SqliteRepository {
    async fn insert_session(
        &self,
        session: NewStudySession,
    ) -> Result<StudySession, StorageError> {
        let res = sqlx::query(
            r"
                INSERT INTO study_sessions (group_id, study_activity_id, created_at)
                VALUES (?1, ?2, ?3)
            ",
        )
        .bind(id_i64("group_id", session.group_id.value())?)
        .bind(id_i64("study_activity_id", session.study_activity_id.value())?)
        .bind(ts_to_text(session.created_at))
        .execute(&self.pool)
        .await
        .map_err(conn_or_missing)?;

        let id = u64_from_i64("study_session_id", res.last_insert_rowid())?;
        Ok(session.into_session(StudySessionId::new(id)))
    }

    async fn get_session(&self, id: StudySessionId) -> Result<Option<StudySession>, StorageError> {
        let row = sqlx::query(&format!(
            "SELECT {SESSION_COLUMNS} FROM study_sessions WHERE id = ?1"
        ))
        .bind(id_i64("study_session_id", id.value())?)
        .fetch_optional(&self.pool)
        .await
        .map_err(conn)?;
        row.as_ref().map(map_session_row).transpose()
    }

    async fn last_session(&self) -> Result<Option<StudySession>, StorageError> {
        let row = sqlx::query(&format!(
            "SELECT {SESSION_COLUMNS} FROM study_sessions ORDER BY created_at DESC, id DESC LIMIT 1"
        ))
        .fetch_optional(&self.pool)
        .await
        .map_err(conn)?;
        row.as_ref().map(map_session_row).transpose()
    }

    async fn count_sessions(&self) -> Result<u64, StorageError> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM study_sessions")
            .fetch_one(&self.pool)
            .await
            .map_err(conn)?;
        u64_from_i64("session_count", total)
    }

    async fn distinct_active_group_ids(&self) -> Result<BTreeSet<GroupId>, StorageError> {
        let rows = sqlx::query("SELECT DISTINCT group_id FROM study_sessions")
            .fetch_all(&self.pool)
            .await
            .map_err(conn)?;

        let mut out = BTreeSet::new();
        for row in rows {
            let raw: i64 = row.try_get("group_id").map_err(ser)?;
            out.insert(GroupId::new(u64_from_i64("group_id", raw)?));
        }
        Ok(out)
    }

    async fn list_sessions(
        &self,
        activity: Option<StudyActivityId>,
        offset: u64,
        limit: u32,
    ) -> Result<Vec<StudySession>, StorageError> {
        let activity = activity
            .map(|a| id_i64("study_activity_id", a.value()))
            .transpose()?;

        let rows = sqlx::query(&format!(
            r"
                SELECT {SESSION_COLUMNS}
                FROM study_sessions
                WHERE ?1 IS NULL OR study_activity_id = ?1
                ORDER BY created_at DESC, id DESC
                LIMIT ?2 OFFSET ?3
            "
        ))
        .bind(activity)
        .bind(i64::from(limit))
        // past the last row either way
        .bind(i64::try_from(offset).unwrap_or(i64::MAX))
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            out.push(map_session_row(&row)?);
        }
        Ok(out)
    }

    async fn count_sessions_for_activity(
        &self,
        id: StudyActivityId,
    ) -> Result<u64, StorageError> {
        let total: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM study_sessions WHERE study_activity_id = ?1")
                .bind(id_i64("study_activity_id", id.value())?)
                .fetch_one(&self.pool)
                .await
                .map_err(conn)?;
        u64_from_i64("session_count", total)
    }
}
