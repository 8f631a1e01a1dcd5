use portal_core::model::{Group, GroupId, StudyActivity, StudyActivityId, Word, WordId};

use super::{
    SqliteRepository,
    mapping::{
        conn, conn_or_missing, id_i64, map_activity_row, map_group_row, map_word_row,
        u64_from_i64,
    },
};
use crate::repository::{CatalogRepository, StorageError};

#[async_trait::async_trait]
impl CatalogRepository for SqliteRepository {
    async fn upsert_word(&self, word: &Word) -> Result<(), StorageError> {
        sqlx::query(
            r"
                INSERT INTO words (id, japanese, romaji, english)
                VALUES (?1, ?2, ?3, ?4)
                ON CONFLICT(id) DO UPDATE SET
                    japanese = excluded.japanese,
                    romaji = excluded.romaji,
                    english = excluded.english
            ",
        )
        .bind(id_i64("word_id", word.id().value())?)
        .bind(word.japanese())
        .bind(word.romaji())
        .bind(word.english())
        .execute(&self.pool)
        .await
        .map_err(conn)?;
        Ok(())
    }

    async fn upsert_group(&self, group: &Group) -> Result<(), StorageError> {
        sqlx::query(
            r"
                INSERT INTO vocab_groups (id, name)
                VALUES (?1, ?2)
                ON CONFLICT(id) DO UPDATE SET name = excluded.name
            ",
        )
        .bind(id_i64("group_id", group.id().value())?)
        .bind(group.name())
        .execute(&self.pool)
        .await
        .map_err(conn)?;
        Ok(())
    }

    async fn add_word_to_group(
        &self,
        group_id: GroupId,
        word_id: WordId,
    ) -> Result<(), StorageError> {
        sqlx::query(
            r"
                INSERT INTO group_words (group_id, word_id)
                VALUES (?1, ?2)
                ON CONFLICT(group_id, word_id) DO NOTHING
            ",
        )
        .bind(id_i64("group_id", group_id.value())?)
        .bind(id_i64("word_id", word_id.value())?)
        .execute(&self.pool)
        .await
        .map_err(conn_or_missing)?;
        Ok(())
    }

    async fn upsert_study_activity(&self, activity: &StudyActivity) -> Result<(), StorageError> {
        sqlx::query(
            r"
                INSERT INTO study_activities (id, name, thumbnail_url, description)
                VALUES (?1, ?2, ?3, ?4)
                ON CONFLICT(id) DO UPDATE SET
                    name = excluded.name,
                    thumbnail_url = excluded.thumbnail_url,
                    description = excluded.description
            ",
        )
        .bind(id_i64("study_activity_id", activity.id().value())?)
        .bind(activity.name())
        .bind(activity.thumbnail_url())
        .bind(activity.description())
        .execute(&self.pool)
        .await
        .map_err(conn)?;
        Ok(())
    }

    async fn get_word(&self, id: WordId) -> Result<Option<Word>, StorageError> {
        let row = sqlx::query("SELECT id, japanese, romaji, english FROM words WHERE id = ?1")
            .bind(id_i64("word_id", id.value())?)
            .fetch_optional(&self.pool)
            .await
            .map_err(conn)?;
        row.as_ref().map(map_word_row).transpose()
    }

    async fn get_group(&self, id: GroupId) -> Result<Option<Group>, StorageError> {
        let row = sqlx::query("SELECT id, name FROM vocab_groups WHERE id = ?1")
            .bind(id_i64("group_id", id.value())?)
            .fetch_optional(&self.pool)
            .await
            .map_err(conn)?;
        row.as_ref().map(map_group_row).transpose()
    }

    async fn get_study_activity(
        &self,
        id: StudyActivityId,
    ) -> Result<Option<StudyActivity>, StorageError> {
        let row = sqlx::query(
            "SELECT id, name, thumbnail_url, description FROM study_activities WHERE id = ?1",
        )
        .bind(id_i64("study_activity_id", id.value())?)
        .fetch_optional(&self.pool)
        .await
        .map_err(conn)?;
        row.as_ref().map(map_activity_row).transpose()
    }

    async fn total_word_count(&self) -> Result<u64, StorageError> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM words")
            .fetch_one(&self.pool)
            .await
            .map_err(conn)?;
        u64_from_i64("word_count", total)
    }

    async fn group_word_count(&self, id: GroupId) -> Result<u64, StorageError> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM group_words WHERE group_id = ?1")
            .bind(id_i64("group_id", id.value())?)
            .fetch_one(&self.pool)
            .await
            .map_err(conn)?;
        u64_from_i64("group_word_count", total)
    }
}
