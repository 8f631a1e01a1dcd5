use portal_core::model::{
    NewReviewEvent, ReviewEvent, ReviewEventId, StudySessionId, WordCounter, WordId,
};

use sqlx::sqlite::SqliteRow;

use super::{
    SqliteRepository,
    mapping::{
        conn, conn_or_missing, id_i64, map_counter_row, map_event_row, ts_to_text, u64_from_i64,
    },
};
use crate::repository::{ReviewHistory, ReviewRepository, ReviewTotals, StorageError};

const EVENT_COLUMNS: &str = "id, word_id, study_session_id, correct, created_at";
const COUNTER_COLUMNS: &str = "word_id, correct_count, wrong_count";

fn events_from_rows(rows: &[SqliteRow]) -> Result<Vec<ReviewEvent>, StorageError> {
    rows.iter().map(map_event_row).collect()
}

fn counters_from_rows(rows: &[SqliteRow]) -> Result<Vec<WordCounter>, StorageError> {
    rows.iter().map(map_counter_row).collect()
}

impl SqliteRepository {
    async fn fetch_events(
        &self,
        filter: &str,
        bind: Option<i64>,
    ) -> Result<Vec<ReviewEvent>, StorageError> {
        let sql = format!("SELECT {EVENT_COLUMNS} FROM word_review_items {filter}");
        let mut query = sqlx::query(&sql);
        if let Some(value) = bind {
            query = query.bind(value);
        }
        let rows = query.fetch_all(&self.pool).await.map_err(conn)?;
        events_from_rows(&rows)
    }
}

#[async_trait::async_trait]
impl ReviewRepository for SqliteRepository {
    async fn append_review(&self, review: NewReviewEvent) -> Result<ReviewEvent, StorageError> {
        let word_id = id_i64("word_id", review.word_id.value())?;
        let session_id = id_i64("study_session_id", review.session_id.value())?;
        let (correct_inc, wrong_inc) = if review.correct { (1_i64, 0_i64) } else { (0, 1) };

        let mut tx = self.pool.begin().await.map_err(conn)?;

        let res = sqlx::query(
            r"
                INSERT INTO word_review_items (word_id, study_session_id, correct, created_at)
                VALUES (?1, ?2, ?3, ?4)
            ",
        )
        .bind(word_id)
        .bind(session_id)
        .bind(i64::from(review.correct))
        .bind(ts_to_text(review.reviewed_at))
        .execute(&mut *tx)
        .await
        .map_err(conn_or_missing)?;

        // Single statement increment; concurrent appends for one word cannot lose updates.
        sqlx::query(
            r"
                INSERT INTO word_review_counters (word_id, correct_count, wrong_count)
                VALUES (?1, ?2, ?3)
                ON CONFLICT(word_id) DO UPDATE SET
                    correct_count = correct_count + excluded.correct_count,
                    wrong_count = wrong_count + excluded.wrong_count
            ",
        )
        .bind(word_id)
        .bind(correct_inc)
        .bind(wrong_inc)
        .execute(&mut *tx)
        .await
        .map_err(conn)?;

        tx.commit().await.map_err(conn)?;

        let id = u64_from_i64("review_id", res.last_insert_rowid())?;
        Ok(review.into_event(ReviewEventId::new(id)))
    }

    async fn events_for_session(
        &self,
        id: StudySessionId,
    ) -> Result<Vec<ReviewEvent>, StorageError> {
        let session = id_i64("study_session_id", id.value())?;
        self.fetch_events("WHERE study_session_id = ?1 ORDER BY id ASC", Some(session))
            .await
    }

    async fn events_for_word(&self, id: WordId) -> Result<Vec<ReviewEvent>, StorageError> {
        let word = id_i64("word_id", id.value())?;
        self.fetch_events("WHERE word_id = ?1 ORDER BY id ASC", Some(word))
            .await
    }

    async fn all_events_ordered(&self) -> Result<Vec<ReviewEvent>, StorageError> {
        self.fetch_events("ORDER BY created_at ASC, id ASC", None)
            .await
    }

    async fn review_totals(&self) -> Result<ReviewTotals, StorageError> {
        let (total, correct, distinct): (i64, i64, i64) = sqlx::query_as(
            r"
                SELECT
                    COUNT(*),
                    COALESCE(SUM(correct), 0),
                    COUNT(DISTINCT word_id)
                FROM word_review_items
            ",
        )
        .fetch_one(&self.pool)
        .await
        .map_err(conn)?;

        Ok(ReviewTotals {
            total: u64_from_i64("review_total", total)?,
            correct: u64_from_i64("review_correct", correct)?,
            distinct_words: u64_from_i64("distinct_words", distinct)?,
        })
    }

    async fn counters_for_word(&self, id: WordId) -> Result<WordCounter, StorageError> {
        let sql = format!("SELECT {COUNTER_COLUMNS} FROM word_review_counters WHERE word_id = ?1");
        let row = sqlx::query(&sql)
        .bind(id_i64("word_id", id.value())?)
        .fetch_optional(&self.pool)
        .await
        .map_err(conn)?;

        match row {
            Some(row) => map_counter_row(&row),
            None => Ok(WordCounter::zero(id)),
        }
    }

    async fn all_counters(&self) -> Result<Vec<WordCounter>, StorageError> {
        let sql = format!("SELECT {COUNTER_COLUMNS} FROM word_review_counters ORDER BY word_id");
        let rows = sqlx::query(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(conn)?;
        counters_from_rows(&rows)
    }

    async fn review_history(&self) -> Result<ReviewHistory, StorageError> {
        // Under WAL a read transaction keeps the snapshot taken by its first
        // SELECT, so both result sets describe the same commit.
        let mut tx = self.pool.begin().await.map_err(conn)?;

        let sql = format!(
            "SELECT {EVENT_COLUMNS} FROM word_review_items ORDER BY created_at ASC, id ASC"
        );
        let event_rows = sqlx::query(&sql)
            .fetch_all(&mut *tx)
            .await
            .map_err(conn)?;

        let sql = format!("SELECT {COUNTER_COLUMNS} FROM word_review_counters ORDER BY word_id");
        let counter_rows = sqlx::query(&sql)
            .fetch_all(&mut *tx)
            .await
            .map_err(conn)?;

        tx.commit().await.map_err(conn)?;

        Ok(ReviewHistory {
            events: events_from_rows(&event_rows)?,
            counters: counters_from_rows(&counter_rows)?,
        })
    }

    async fn rebuild_counters(&self) -> Result<usize, StorageError> {
        let mut tx = self.pool.begin().await.map_err(conn)?;

        sqlx::query("DELETE FROM word_review_counters")
            .execute(&mut *tx)
            .await
            .map_err(conn)?;

        let res = sqlx::query(
            r"
                INSERT INTO word_review_counters (word_id, correct_count, wrong_count)
                SELECT
                    word_id,
                    SUM(CASE WHEN correct = 1 THEN 1 ELSE 0 END),
                    SUM(CASE WHEN correct = 1 THEN 0 ELSE 1 END)
                FROM word_review_items
                GROUP BY word_id
            ",
        )
        .execute(&mut *tx)
        .await
        .map_err(conn)?;

        tx.commit().await.map_err(conn)?;

        let words = usize::try_from(res.rows_affected())
            .map_err(|_| StorageError::Serialization("counter rows overflow".into()))?;
        tracing::debug!(words, "rebuilt word counters from review log");
        Ok(words)
    }
}
