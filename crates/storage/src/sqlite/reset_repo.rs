use sqlx::{Sqlite, Transaction};

use super::{
    SqliteRepository,
    mapping::{conn, id_i64},
};
use crate::repository::{ResetRepository, StorageError};
use crate::seed::SeedCatalog;

const HISTORY_TABLES: &[&str] = &["word_review_items", "word_review_counters", "study_sessions"];
const CATALOG_TABLES: &[&str] = &["group_words", "words", "vocab_groups", "study_activities"];

async fn truncate(tx: &mut Transaction<'_, Sqlite>, tables: &[&str]) -> Result<(), StorageError> {
    for table in tables {
        sqlx::query(&format!("DELETE FROM {table}"))
            .execute(&mut **tx)
            .await
            .map_err(conn)?;
    }
    Ok(())
}

async fn load_seed(
    tx: &mut Transaction<'_, Sqlite>,
    seed: &SeedCatalog,
) -> Result<(), StorageError> {
    for word in &seed.words {
        sqlx::query("INSERT INTO words (id, japanese, romaji, english) VALUES (?1, ?2, ?3, ?4)")
            .bind(id_i64("word_id", word.id().value())?)
            .bind(word.japanese())
            .bind(word.romaji())
            .bind(word.english())
            .execute(&mut **tx)
            .await
            .map_err(conn)?;
    }
    for group in &seed.groups {
        sqlx::query("INSERT INTO vocab_groups (id, name) VALUES (?1, ?2)")
            .bind(id_i64("group_id", group.id().value())?)
            .bind(group.name())
            .execute(&mut **tx)
            .await
            .map_err(conn)?;
    }
    for activity in &seed.activities {
        sqlx::query(
            r"
                INSERT INTO study_activities (id, name, thumbnail_url, description)
                VALUES (?1, ?2, ?3, ?4)
            ",
        )
        .bind(id_i64("study_activity_id", activity.id().value())?)
        .bind(activity.name())
        .bind(activity.thumbnail_url())
        .bind(activity.description())
        .execute(&mut **tx)
        .await
        .map_err(conn)?;
    }
    for (group_id, word_id) in &seed.memberships {
        sqlx::query("INSERT INTO group_words (group_id, word_id) VALUES (?1, ?2)")
            .bind(id_i64("group_id", group_id.value())?)
            .bind(id_i64("word_id", word_id.value())?)
            .execute(&mut **tx)
            .await
            .map_err(conn)?;
    }
    Ok(())
}

#[async_trait::async_trait]
impl ResetRepository for SqliteRepository {
    async fn reset_history(&self) -> Result<(), StorageError> {
        let mut tx = self.pool.begin().await.map_err(conn)?;
        truncate(&mut tx, HISTORY_TABLES).await?;
        tx.commit().await.map_err(conn)?;
        tracing::info!("study history cleared");
        Ok(())
    }

    async fn full_reset(&self, seed: &SeedCatalog) -> Result<(), StorageError> {
        let mut tx = self.pool.begin().await.map_err(conn)?;
        truncate(&mut tx, HISTORY_TABLES).await?;
        truncate(&mut tx, CATALOG_TABLES).await?;
        load_seed(&mut tx, seed).await?;
        tx.commit().await.map_err(conn)?;
        tracing::info!(
            words = seed.words.len(),
            groups = seed.groups.len(),
            activities = seed.activities.len(),
            "catalog reset to seed"
        );
        Ok(())
    }
}
