use std::collections::BTreeSet;
use std::sync::Arc;

use portal_core::model::{GroupId, NewStudySession, StudyActivityId, StudySession, StudySessionId};
use storage::repository::{CatalogRepository, SessionRepository, StorageError};

use crate::Clock;
use crate::dataset::Dataset;
use crate::error::{EntityKind, ProgressError};

/// Owns study sessions: creation, lookup and the "most recent" query.
#[derive(Clone)]
pub struct SessionLedger {
    clock: Clock,
    catalog: Arc<dyn CatalogRepository>,
    sessions: Arc<dyn SessionRepository>,
}

impl SessionLedger {
    #[must_use]
    pub fn new(dataset: &Dataset) -> Self {
        let storage = dataset.storage();
        Self {
            clock: dataset.clock(),
            catalog: Arc::clone(&storage.catalog),
            sessions: Arc::clone(&storage.sessions),
        }
    }

    /// Start a session for `group_id` using `study_activity_id`, stamped now.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError::NotFound` if the group or activity is unknown.
    /// Returns `ProgressError::Storage` if persistence fails.
    pub async fn create_session(
        &self,
        group_id: GroupId,
        study_activity_id: StudyActivityId,
    ) -> Result<StudySession, ProgressError> {
        if !self.catalog.group_exists(group_id).await? {
            return Err(ProgressError::not_found(EntityKind::Group, group_id.value()));
        }
        if !self.catalog.study_activity_exists(study_activity_id).await? {
            return Err(ProgressError::not_found(
                EntityKind::StudyActivity,
                study_activity_id.value(),
            ));
        }

        let session = self
            .sessions
            .insert_session(NewStudySession::new(
                group_id,
                study_activity_id,
                self.clock.now(),
            ))
            .await
            .map_err(|e| match e {
                StorageError::NotFound => {
                    ProgressError::not_found(EntityKind::Group, group_id.value())
                }
                other => ProgressError::Storage(other),
            })?;

        tracing::debug!(
            session_id = %session.id,
            group_id = %group_id,
            study_activity_id = %study_activity_id,
            "study session created"
        );
        Ok(session)
    }

    /// # Errors
    ///
    /// Returns `ProgressError::NotFound` if no session has this id.
    pub async fn get_session(&self, id: StudySessionId) -> Result<StudySession, ProgressError> {
        self.sessions
            .get_session(id)
            .await?
            .ok_or_else(|| ProgressError::not_found(EntityKind::StudySession, id.value()))
    }

    /// Session with the latest creation time; ties go to the greater id.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError::NoData` if no session exists yet.
    pub async fn last_session(&self) -> Result<StudySession, ProgressError> {
        self.sessions
            .last_session()
            .await?
            .ok_or(ProgressError::NoData)
    }

    /// # Errors
    ///
    /// Returns `ProgressError::Storage` if repository access fails.
    pub async fn count_sessions(&self) -> Result<u64, ProgressError> {
        Ok(self.sessions.count_sessions().await?)
    }

    /// Groups referenced by any session, ever.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError::Storage` if repository access fails.
    pub async fn distinct_active_group_ids(&self) -> Result<BTreeSet<GroupId>, ProgressError> {
        Ok(self.sessions.distinct_active_group_ids().await?)
    }
}
