use async_trait::async_trait;
use portal_core::model::{
    CounterTable, Group, GroupId, NewReviewEvent, NewStudySession, ReviewEvent, ReviewEventId,
    StudyActivity, StudyActivityId, StudySession, StudySessionId, Word, WordCounter, WordId,
};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex, MutexGuard};
use thiserror::Error;

use crate::seed::SeedCatalog;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("conflict")]
    Conflict,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// The review log and the stored counters as of one point in time.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReviewHistory {
    /// Ascending by timestamp then id.
    pub events: Vec<ReviewEvent>,
    pub counters: Vec<WordCounter>,
}

/// Whole-log review tallies.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReviewTotals {
    pub total: u64,
    pub correct: u64,
    /// Distinct word ids with at least one review.
    pub distinct_words: u64,
}

//
// ─── CONTRACTS ─────────────────────────────────────────────────────────────────
//

/// Read access to reference data (words, groups, activities), plus the
/// upserts used for seeding.
#[async_trait]
pub trait CatalogRepository: Send + Sync {
    /// Persist or update a word.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the word cannot be stored.
    async fn upsert_word(&self, word: &Word) -> Result<(), StorageError>;

    /// Persist or update a group.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the group cannot be stored.
    async fn upsert_group(&self, group: &Group) -> Result<(), StorageError>;

    /// Add a word to a group. Adding an existing membership is a no-op.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if either side is missing.
    async fn add_word_to_group(&self, group_id: GroupId, word_id: WordId)
    -> Result<(), StorageError>;

    /// Persist or update a study activity.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the activity cannot be stored.
    async fn upsert_study_activity(&self, activity: &StudyActivity) -> Result<(), StorageError>;

    async fn get_word(&self, id: WordId) -> Result<Option<Word>, StorageError>;

    async fn get_group(&self, id: GroupId) -> Result<Option<Group>, StorageError>;

    async fn get_study_activity(
        &self,
        id: StudyActivityId,
    ) -> Result<Option<StudyActivity>, StorageError>;

    async fn total_word_count(&self) -> Result<u64, StorageError>;

    /// Membership size of a group; `0` for unknown groups.
    async fn group_word_count(&self, id: GroupId) -> Result<u64, StorageError>;

    async fn word_exists(&self, id: WordId) -> Result<bool, StorageError> {
        Ok(self.get_word(id).await?.is_some())
    }

    async fn group_exists(&self, id: GroupId) -> Result<bool, StorageError> {
        Ok(self.get_group(id).await?.is_some())
    }

    async fn study_activity_exists(&self, id: StudyActivityId) -> Result<bool, StorageError> {
        Ok(self.get_study_activity(id).await?.is_some())
    }

    async fn group_name(&self, id: GroupId) -> Result<Option<String>, StorageError> {
        Ok(self.get_group(id).await?.map(|g| g.name().to_owned()))
    }
}

/// Study session ledger.
#[async_trait]
pub trait SessionRepository: Send + Sync {
    /// Persist a new session and assign its identity.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the group or activity is missing
    /// (where the backend enforces references), or other storage errors.
    async fn insert_session(&self, session: NewStudySession)
    -> Result<StudySession, StorageError>;

    async fn get_session(&self, id: StudySessionId) -> Result<Option<StudySession>, StorageError>;

    /// Session with the greatest creation time, ties broken by greatest id.
    async fn last_session(&self) -> Result<Option<StudySession>, StorageError>;

    async fn count_sessions(&self) -> Result<u64, StorageError>;

    /// Groups referenced by at least one session.
    async fn distinct_active_group_ids(&self) -> Result<BTreeSet<GroupId>, StorageError>;

    /// Sessions newest first, optionally restricted to one activity.
    async fn list_sessions(
        &self,
        activity: Option<StudyActivityId>,
        offset: u64,
        limit: u32,
    ) -> Result<Vec<StudySession>, StorageError>;

    async fn count_sessions_for_activity(&self, id: StudyActivityId)
    -> Result<u64, StorageError>;
}

/// Append-only review log together with its materialized word counters.
#[async_trait]
pub trait ReviewRepository: Send + Sync {
    /// Append a review and increment the word's counter as one atomic unit.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the session (or, where enforced,
    /// the word) is missing. Nothing is recorded on error.
    async fn append_review(&self, review: NewReviewEvent) -> Result<ReviewEvent, StorageError>;

    /// Events of one session in insertion order.
    async fn events_for_session(
        &self,
        id: StudySessionId,
    ) -> Result<Vec<ReviewEvent>, StorageError>;

    /// Events of one word in insertion order.
    async fn events_for_word(&self, id: WordId) -> Result<Vec<ReviewEvent>, StorageError>;

    /// Every event, ascending by timestamp then id.
    async fn all_events_ordered(&self) -> Result<Vec<ReviewEvent>, StorageError>;

    async fn review_totals(&self) -> Result<ReviewTotals, StorageError>;

    /// Stored counters for one word; `(0, 0)` if it was never reviewed.
    async fn counters_for_word(&self, id: WordId) -> Result<WordCounter, StorageError>;

    async fn all_counters(&self) -> Result<Vec<WordCounter>, StorageError>;

    /// Every event and every stored counter, read from one snapshot.
    ///
    /// No append can land between the two reads.
    async fn review_history(&self) -> Result<ReviewHistory, StorageError>;

    /// Discard all counters and recompute them from the log in one transaction.
    ///
    /// Returns the number of words that have counters afterwards.
    async fn rebuild_counters(&self) -> Result<usize, StorageError>;
}

/// Bulk-delete utilities.
#[async_trait]
pub trait ResetRepository: Send + Sync {
    /// Delete every review event, session and counter.
    async fn reset_history(&self) -> Result<(), StorageError>;

    /// Delete everything, then load `seed` as the new catalog.
    async fn full_reset(&self, seed: &SeedCatalog) -> Result<(), StorageError>;
}

//
// ─── IN-MEMORY BACKEND ─────────────────────────────────────────────────────────
//

#[derive(Default)]
struct CatalogTables {
    words: BTreeMap<WordId, Word>,
    groups: BTreeMap<GroupId, Group>,
    memberships: BTreeSet<(GroupId, WordId)>,
    activities: BTreeMap<StudyActivityId, StudyActivity>,
}

impl CatalogTables {
    fn load(&mut self, seed: &SeedCatalog) {
        *self = Self::default();
        for word in &seed.words {
            self.words.insert(word.id(), word.clone());
        }
        for group in &seed.groups {
            self.groups.insert(group.id(), group.clone());
        }
        for activity in &seed.activities {
            self.activities.insert(activity.id(), activity.clone());
        }
        self.memberships.extend(seed.memberships.iter().copied());
    }
}

/// Sessions, events and counters live under one lock so an append and its
/// counter increment are observed together.
#[derive(Default)]
struct HistoryTables {
    sessions: BTreeMap<StudySessionId, StudySession>,
    events: Vec<ReviewEvent>,
    counters: CounterTable,
    last_session_id: u64,
    last_event_id: u64,
}

impl HistoryTables {
    fn clear(&mut self) {
        // ids keep increasing across resets
        self.sessions.clear();
        self.events.clear();
        self.counters.clear();
    }
}

/// Simple in-memory repository implementation for testing and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    catalog: Arc<Mutex<CatalogTables>>,
    history: Arc<Mutex<HistoryTables>>,
}

fn lock<T>(m: &Mutex<T>) -> Result<MutexGuard<'_, T>, StorageError> {
    m.lock().map_err(|e| StorageError::Connection(e.to_string()))
}

fn count(n: usize) -> u64 {
    u64::try_from(n).unwrap_or(u64::MAX)
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Repository pre-loaded with `seed` as its catalog.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Connection` if the catalog lock is poisoned.
    pub fn with_catalog(seed: &SeedCatalog) -> Result<Self, StorageError> {
        let repo = Self::new();
        lock(&repo.catalog)?.load(seed);
        Ok(repo)
    }
}

#[async_trait]
impl CatalogRepository for InMemoryRepository {
    async fn upsert_word(&self, word: &Word) -> Result<(), StorageError> {
        lock(&self.catalog)?.words.insert(word.id(), word.clone());
        Ok(())
    }

    async fn upsert_group(&self, group: &Group) -> Result<(), StorageError> {
        lock(&self.catalog)?.groups.insert(group.id(), group.clone());
        Ok(())
    }

    async fn add_word_to_group(
        &self,
        group_id: GroupId,
        word_id: WordId,
    ) -> Result<(), StorageError> {
        let mut guard = lock(&self.catalog)?;
        if !guard.groups.contains_key(&group_id) || !guard.words.contains_key(&word_id) {
            return Err(StorageError::NotFound);
        }
        guard.memberships.insert((group_id, word_id));
        Ok(())
    }

    async fn upsert_study_activity(&self, activity: &StudyActivity) -> Result<(), StorageError> {
        lock(&self.catalog)?
            .activities
            .insert(activity.id(), activity.clone());
        Ok(())
    }

    async fn get_word(&self, id: WordId) -> Result<Option<Word>, StorageError> {
        Ok(lock(&self.catalog)?.words.get(&id).cloned())
    }

    async fn get_group(&self, id: GroupId) -> Result<Option<Group>, StorageError> {
        Ok(lock(&self.catalog)?.groups.get(&id).cloned())
    }

    async fn get_study_activity(
        &self,
        id: StudyActivityId,
    ) -> Result<Option<StudyActivity>, StorageError> {
        Ok(lock(&self.catalog)?.activities.get(&id).cloned())
    }

    async fn total_word_count(&self) -> Result<u64, StorageError> {
        Ok(count(lock(&self.catalog)?.words.len()))
    }

    async fn group_word_count(&self, id: GroupId) -> Result<u64, StorageError> {
        let guard = lock(&self.catalog)?;
        Ok(count(
            guard
                .memberships
                .range((id, WordId::new(0))..=(id, WordId::new(u64::MAX)))
                .count(),
        ))
    }
}

#[async_trait]
impl SessionRepository for InMemoryRepository {
    async fn insert_session(
        &self,
        session: NewStudySession,
    ) -> Result<StudySession, StorageError> {
        let mut guard = lock(&self.history)?;
        guard.last_session_id += 1;
        let stored = session.into_session(StudySessionId::new(guard.last_session_id));
        guard.sessions.insert(stored.id, stored.clone());
        Ok(stored)
    }

    async fn get_session(&self, id: StudySessionId) -> Result<Option<StudySession>, StorageError> {
        Ok(lock(&self.history)?.sessions.get(&id).cloned())
    }

    async fn last_session(&self) -> Result<Option<StudySession>, StorageError> {
        Ok(lock(&self.history)?
            .sessions
            .values()
            .max_by_key(|s| s.recency_key())
            .cloned())
    }

    async fn count_sessions(&self) -> Result<u64, StorageError> {
        Ok(count(lock(&self.history)?.sessions.len()))
    }

    async fn distinct_active_group_ids(&self) -> Result<BTreeSet<GroupId>, StorageError> {
        Ok(lock(&self.history)?
            .sessions
            .values()
            .map(|s| s.group_id)
            .collect())
    }

    async fn list_sessions(
        &self,
        activity: Option<StudyActivityId>,
        offset: u64,
        limit: u32,
    ) -> Result<Vec<StudySession>, StorageError> {
        let guard = lock(&self.history)?;
        let mut sessions: Vec<StudySession> = guard
            .sessions
            .values()
            .filter(|s| activity.is_none_or(|a| s.study_activity_id == a))
            .cloned()
            .collect();
        sessions.sort_by_key(|s| std::cmp::Reverse(s.recency_key()));
        Ok(sessions
            .into_iter()
            .skip(usize::try_from(offset).unwrap_or(usize::MAX))
            .take(limit as usize)
            .collect())
    }

    async fn count_sessions_for_activity(
        &self,
        id: StudyActivityId,
    ) -> Result<u64, StorageError> {
        Ok(count(
            lock(&self.history)?
                .sessions
                .values()
                .filter(|s| s.study_activity_id == id)
                .count(),
        ))
    }
}

#[async_trait]
impl ReviewRepository for InMemoryRepository {
    async fn append_review(&self, review: NewReviewEvent) -> Result<ReviewEvent, StorageError> {
        let mut guard = lock(&self.history)?;
        if !guard.sessions.contains_key(&review.session_id) {
            return Err(StorageError::NotFound);
        }
        guard.last_event_id += 1;
        let event = review.into_event(ReviewEventId::new(guard.last_event_id));
        guard.counters.on_review_appended(&event);
        guard.events.push(event.clone());
        Ok(event)
    }

    async fn events_for_session(
        &self,
        id: StudySessionId,
    ) -> Result<Vec<ReviewEvent>, StorageError> {
        Ok(lock(&self.history)?
            .events
            .iter()
            .filter(|e| e.session_id == id)
            .cloned()
            .collect())
    }

    async fn events_for_word(&self, id: WordId) -> Result<Vec<ReviewEvent>, StorageError> {
        Ok(lock(&self.history)?
            .events
            .iter()
            .filter(|e| e.word_id == id)
            .cloned()
            .collect())
    }

    async fn all_events_ordered(&self) -> Result<Vec<ReviewEvent>, StorageError> {
        let mut events = lock(&self.history)?.events.clone();
        events.sort_by_key(ReviewEvent::replay_key);
        Ok(events)
    }

    async fn review_totals(&self) -> Result<ReviewTotals, StorageError> {
        let guard = lock(&self.history)?;
        let correct = guard.events.iter().filter(|e| e.correct).count();
        let words: BTreeSet<WordId> = guard.events.iter().map(|e| e.word_id).collect();
        Ok(ReviewTotals {
            total: count(guard.events.len()),
            correct: count(correct),
            distinct_words: count(words.len()),
        })
    }

    async fn counters_for_word(&self, id: WordId) -> Result<WordCounter, StorageError> {
        Ok(lock(&self.history)?.counters.get(id))
    }

    async fn all_counters(&self) -> Result<Vec<WordCounter>, StorageError> {
        Ok(lock(&self.history)?.counters.iter().copied().collect())
    }

    async fn review_history(&self) -> Result<ReviewHistory, StorageError> {
        let guard = lock(&self.history)?;
        let mut events = guard.events.clone();
        events.sort_by_key(ReviewEvent::replay_key);
        Ok(ReviewHistory {
            events,
            counters: guard.counters.iter().copied().collect(),
        })
    }

    async fn rebuild_counters(&self) -> Result<usize, StorageError> {
        let mut guard = lock(&self.history)?;
        let rebuilt = CounterTable::from_events(&guard.events);
        let words = rebuilt.len();
        guard.counters = rebuilt;
        Ok(words)
    }
}

#[async_trait]
impl ResetRepository for InMemoryRepository {
    async fn reset_history(&self) -> Result<(), StorageError> {
        lock(&self.history)?.clear();
        Ok(())
    }

    async fn full_reset(&self, seed: &SeedCatalog) -> Result<(), StorageError> {
        let mut catalog = lock(&self.catalog)?;
        let mut history = lock(&self.history)?;
        history.clear();
        catalog.load(seed);
        Ok(())
    }
}

//
// ─── AGGREGATE HANDLE ──────────────────────────────────────────────────────────
//

/// Aggregates repositories behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub catalog: Arc<dyn CatalogRepository>,
    pub sessions: Arc<dyn SessionRepository>,
    pub reviews: Arc<dyn ReviewRepository>,
    pub resets: Arc<dyn ResetRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        Self::from_in_memory(InMemoryRepository::new())
    }

    #[must_use]
    pub fn from_in_memory(repo: InMemoryRepository) -> Self {
        Self::from_repository(repo)
    }

    /// Share one backend that implements every repository trait.
    #[must_use]
    pub fn from_repository<R>(repo: R) -> Self
    where
        R: CatalogRepository
            + SessionRepository
            + ReviewRepository
            + ResetRepository
            + Clone
            + 'static,
    {
        Self {
            catalog: Arc::new(repo.clone()),
            sessions: Arc::new(repo.clone()),
            reviews: Arc::new(repo.clone()),
            resets: Arc::new(repo),
        }
    }
}
