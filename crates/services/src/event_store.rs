use std::sync::Arc;

use chrono::{DateTime, Utc};
use portal_core::model::{NewReviewEvent, ReviewEvent, StudySessionId, WordId};
use storage::repository::{CatalogRepository, ReviewRepository, SessionRepository, StorageError};

use crate::Clock;
use crate::dataset::Dataset;
use crate::error::{EntityKind, ProgressError};

/// Append-only log of word reviews.
///
/// Each append also bumps the word's counter inside the same storage
/// transaction, so readers never see one without the other.
#[derive(Clone)]
pub struct EventStore {
    clock: Clock,
    catalog: Arc<dyn CatalogRepository>,
    sessions: Arc<dyn SessionRepository>,
    reviews: Arc<dyn ReviewRepository>,
}

impl EventStore {
    #[must_use]
    pub fn new(dataset: &Dataset) -> Self {
        let storage = dataset.storage();
        Self {
            clock: dataset.clock(),
            catalog: Arc::clone(&storage.catalog),
            sessions: Arc::clone(&storage.sessions),
            reviews: Arc::clone(&storage.reviews),
        }
    }

    /// Record a review outcome stamped with the current time.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError::NotFound` if the session or word does not exist.
    /// Returns `ProgressError::Storage` if persistence fails.
    pub async fn append_review(
        &self,
        session_id: StudySessionId,
        word_id: WordId,
        correct: bool,
    ) -> Result<ReviewEvent, ProgressError> {
        self.append_review_at(session_id, word_id, correct, self.clock.now())
            .await
    }

    /// Record a review outcome with a caller-supplied timestamp.
    ///
    /// # Errors
    ///
    /// Same as [`EventStore::append_review`].
    pub async fn append_review_at(
        &self,
        session_id: StudySessionId,
        word_id: WordId,
        correct: bool,
        at: DateTime<Utc>,
    ) -> Result<ReviewEvent, ProgressError> {
        if self.sessions.get_session(session_id).await?.is_none() {
            return Err(ProgressError::not_found(
                EntityKind::StudySession,
                session_id.value(),
            ));
        }
        if !self.catalog.word_exists(word_id).await? {
            return Err(ProgressError::not_found(EntityKind::Word, word_id.value()));
        }

        let event = self
            .reviews
            .append_review(NewReviewEvent::new(session_id, word_id, correct, at))
            .await
            .map_err(|e| match e {
                // a reference vanished between the check and the insert
                StorageError::NotFound => {
                    ProgressError::not_found(EntityKind::StudySession, session_id.value())
                }
                other => ProgressError::Storage(other),
            })?;

        tracing::debug!(
            event_id = %event.id,
            session_id = %session_id,
            word_id = %word_id,
            correct,
            "review appended"
        );
        Ok(event)
    }

    /// # Errors
    ///
    /// Returns `ProgressError::Storage` if repository access fails.
    pub async fn events_for_session(
        &self,
        session_id: StudySessionId,
    ) -> Result<Vec<ReviewEvent>, ProgressError> {
        Ok(self.reviews.events_for_session(session_id).await?)
    }

    /// # Errors
    ///
    /// Returns `ProgressError::Storage` if repository access fails.
    pub async fn events_for_word(&self, word_id: WordId) -> Result<Vec<ReviewEvent>, ProgressError> {
        Ok(self.reviews.events_for_word(word_id).await?)
    }

    /// Whole log ascending by timestamp, then id. The returned vector can be
    /// iterated any number of times.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError::Storage` if repository access fails.
    pub async fn all_events_ordered_by_time(&self) -> Result<Vec<ReviewEvent>, ProgressError> {
        Ok(self.reviews.all_events_ordered().await?)
    }
}
