//! Paginated session listings built from the ledger and the review log.

use std::collections::BTreeMap;
use std::sync::Arc;

use portal_core::ReportingZone;
use portal_core::model::{StudyActivityId, StudySession, StudySessionId, WordCounter, WordId};
use serde::Serialize;
use storage::repository::{CatalogRepository, ReviewRepository, SessionRepository};

use crate::dataset::Dataset;
use crate::error::{EntityKind, ProgressError};

pub const ITEMS_PER_PAGE: u32 = 100;

/// One page of a listing plus the numbers needed to fetch the others.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub current_page: u64,
    pub total_pages: u64,
    pub total_items: u64,
    pub items_per_page: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct PageWindow {
    current_page: u64,
    total_pages: u64,
    offset: u64,
}

/// Pages are 1-based; page 0 is read as page 1.
fn page_window(page: u64, total_items: u64) -> PageWindow {
    let current_page = page.max(1);
    PageWindow {
        current_page,
        total_pages: total_items.div_ceil(u64::from(ITEMS_PER_PAGE)),
        offset: (current_page - 1).saturating_mul(u64::from(ITEMS_PER_PAGE)),
    }
}

impl PageWindow {
    /// True when the requested page starts after the last item.
    fn is_past_end(&self, total_items: u64) -> bool {
        self.offset >= total_items
    }
}

impl<T> Page<T> {
    fn new(items: Vec<T>, window: PageWindow, total_items: u64) -> Self {
        Self {
            items,
            current_page: window.current_page,
            total_pages: window.total_pages,
            total_items,
            items_per_page: ITEMS_PER_PAGE,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionListItem {
    pub id: StudySessionId,
    pub activity_name: String,
    pub group_name: String,
    pub start_time: String,
    /// Time of the last review, or the start time if nothing was reviewed.
    pub end_time: String,
    pub review_items_count: u64,
}

/// Per-word tallies within a single session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionWordStats {
    pub word_id: WordId,
    pub japanese: String,
    pub romaji: String,
    pub english: String,
    pub correct_count: u64,
    pub wrong_count: u64,
}

#[derive(Clone)]
pub struct SessionListing {
    zone: ReportingZone,
    catalog: Arc<dyn CatalogRepository>,
    sessions: Arc<dyn SessionRepository>,
    reviews: Arc<dyn ReviewRepository>,
}

impl SessionListing {
    #[must_use]
    pub fn new(dataset: &Dataset) -> Self {
        let storage = dataset.storage();
        Self {
            zone: dataset.zone(),
            catalog: Arc::clone(&storage.catalog),
            sessions: Arc::clone(&storage.sessions),
            reviews: Arc::clone(&storage.reviews),
        }
    }

    /// All sessions, newest first.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError::Storage` if repository access fails.
    pub async fn study_sessions(&self, page: u64) -> Result<Page<SessionListItem>, ProgressError> {
        let total = self.sessions.count_sessions().await?;
        self.session_page(None, page, total).await
    }

    /// Sessions launched from one activity, newest first.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError::NotFound` if the activity does not exist.
    pub async fn study_activity_sessions(
        &self,
        activity_id: StudyActivityId,
        page: u64,
    ) -> Result<Page<SessionListItem>, ProgressError> {
        if !self.catalog.study_activity_exists(activity_id).await? {
            return Err(ProgressError::not_found(
                EntityKind::StudyActivity,
                activity_id.value(),
            ));
        }
        let total = self.sessions.count_sessions_for_activity(activity_id).await?;
        self.session_page(Some(activity_id), page, total).await
    }

    /// # Errors
    ///
    /// Returns `ProgressError::NotFound` if the session does not exist.
    pub async fn study_session(&self, id: StudySessionId) -> Result<SessionListItem, ProgressError> {
        let session = self
            .sessions
            .get_session(id)
            .await?
            .ok_or_else(|| ProgressError::not_found(EntityKind::StudySession, id.value()))?;
        let mut items = self.describe(vec![session]).await?;
        items
            .pop()
            .ok_or_else(|| ProgressError::not_found(EntityKind::StudySession, id.value()))
    }

    /// Words reviewed in one session with their in-session tallies, by word id.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError::NotFound` if the session does not exist.
    pub async fn study_session_words(
        &self,
        id: StudySessionId,
        page: u64,
    ) -> Result<Page<SessionWordStats>, ProgressError> {
        if self.sessions.get_session(id).await?.is_none() {
            return Err(ProgressError::not_found(EntityKind::StudySession, id.value()));
        }

        let mut tallies: BTreeMap<WordId, WordCounter> = BTreeMap::new();
        for event in self.reviews.events_for_session(id).await? {
            tallies
                .entry(event.word_id)
                .or_insert_with(|| WordCounter::zero(event.word_id))
                .record(event.correct);
        }

        let total = u64::try_from(tallies.len()).unwrap_or(u64::MAX);
        let window = page_window(page, total);
        let mut items = Vec::new();
        for counter in tallies
            .into_values()
            .skip(usize::try_from(window.offset).unwrap_or(usize::MAX))
            .take(ITEMS_PER_PAGE as usize)
        {
            let Some(word) = self.catalog.get_word(counter.word_id).await? else {
                tracing::warn!(word_id = %counter.word_id, "reviewed word missing from catalog");
                continue;
            };
            items.push(SessionWordStats {
                word_id: word.id(),
                japanese: word.japanese().to_owned(),
                romaji: word.romaji().to_owned(),
                english: word.english().to_owned(),
                correct_count: counter.correct_count,
                wrong_count: counter.wrong_count,
            });
        }
        Ok(Page::new(items, window, total))
    }

    async fn session_page(
        &self,
        activity: Option<StudyActivityId>,
        page: u64,
        total: u64,
    ) -> Result<Page<SessionListItem>, ProgressError> {
        let window = page_window(page, total);
        if window.is_past_end(total) {
            return Ok(Page::new(Vec::new(), window, total));
        }
        let sessions = self
            .sessions
            .list_sessions(activity, window.offset, ITEMS_PER_PAGE)
            .await?;
        Ok(Page::new(self.describe(sessions).await?, window, total))
    }

    async fn describe(
        &self,
        sessions: Vec<StudySession>,
    ) -> Result<Vec<SessionListItem>, ProgressError> {
        let mut activity_names = BTreeMap::new();
        let mut group_names = BTreeMap::new();
        let mut out = Vec::with_capacity(sessions.len());

        for session in sessions {
            if !activity_names.contains_key(&session.study_activity_id) {
                let name = self
                    .catalog
                    .get_study_activity(session.study_activity_id)
                    .await?
                    .map(|a| a.name().to_owned())
                    .unwrap_or_default();
                activity_names.insert(session.study_activity_id, name);
            }
            if !group_names.contains_key(&session.group_id) {
                let name = self
                    .catalog
                    .group_name(session.group_id)
                    .await?
                    .unwrap_or_default();
                group_names.insert(session.group_id, name);
            }

            let events = self.reviews.events_for_session(session.id).await?;
            let ended_at = events
                .iter()
                .map(|e| e.reviewed_at)
                .max()
                .unwrap_or(session.created_at);

            out.push(SessionListItem {
                id: session.id,
                activity_name: activity_names
                    .get(&session.study_activity_id)
                    .cloned()
                    .unwrap_or_default(),
                group_name: group_names
                    .get(&session.group_id)
                    .cloned()
                    .unwrap_or_default(),
                start_time: self.zone.format_timestamp(session.created_at),
                end_time: self.zone.format_timestamp(ended_at),
                review_items_count: u64::try_from(events.len()).unwrap_or(u64::MAX),
            });
        }
        Ok(out)
    }
}
