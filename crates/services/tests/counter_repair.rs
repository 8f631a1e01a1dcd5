use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use portal_core::model::{
    GroupId, NewReviewEvent, ReviewEvent, StudyActivityId, StudySessionId, WordCounter, WordId,
};
use portal_core::time::fixed_clock;
use services::{Api, Dataset, Portal, ProgressError, ReportingZone};
use storage::repository::{
    InMemoryRepository, ReviewHistory, ReviewRepository, ReviewTotals, Storage, StorageError,
};
use storage::seed::SeedCatalog;

/// Reports inflated counters for word 1 until the next rebuild.
struct DriftingReviews {
    inner: InMemoryRepository,
    drifted: AtomicBool,
}

#[async_trait]
impl ReviewRepository for DriftingReviews {
    async fn append_review(&self, review: NewReviewEvent) -> Result<ReviewEvent, StorageError> {
        self.inner.append_review(review).await
    }

    async fn events_for_session(
        &self,
        id: StudySessionId,
    ) -> Result<Vec<ReviewEvent>, StorageError> {
        self.inner.events_for_session(id).await
    }

    async fn events_for_word(&self, id: WordId) -> Result<Vec<ReviewEvent>, StorageError> {
        self.inner.events_for_word(id).await
    }

    async fn all_events_ordered(&self) -> Result<Vec<ReviewEvent>, StorageError> {
        self.inner.all_events_ordered().await
    }

    async fn review_totals(&self) -> Result<ReviewTotals, StorageError> {
        self.inner.review_totals().await
    }

    async fn counters_for_word(&self, id: WordId) -> Result<WordCounter, StorageError> {
        let mut counter = self.inner.counters_for_word(id).await?;
        if self.drifted.load(Ordering::SeqCst) && id == WordId::new(1) {
            counter.correct_count += 10;
        }
        Ok(counter)
    }

    async fn all_counters(&self) -> Result<Vec<WordCounter>, StorageError> {
        let mut counters = self.inner.all_counters().await?;
        if self.drifted.load(Ordering::SeqCst) {
            for c in &mut counters {
                if c.word_id == WordId::new(1) {
                    c.correct_count += 10;
                }
            }
        }
        Ok(counters)
    }

    async fn review_history(&self) -> Result<ReviewHistory, StorageError> {
        let mut history = self.inner.review_history().await?;
        if self.drifted.load(Ordering::SeqCst) {
            for c in &mut history.counters {
                if c.word_id == WordId::new(1) {
                    c.correct_count += 10;
                }
            }
        }
        Ok(history)
    }

    async fn rebuild_counters(&self) -> Result<usize, StorageError> {
        self.drifted.store(false, Ordering::SeqCst);
        self.inner.rebuild_counters().await
    }
}

/// Every read and write fails as if the database were unreachable.
struct BrokenReviews;

#[async_trait]
impl ReviewRepository for BrokenReviews {
    async fn append_review(&self, _review: NewReviewEvent) -> Result<ReviewEvent, StorageError> {
        Err(StorageError::Connection("disk I/O error".into()))
    }

    async fn events_for_session(
        &self,
        _id: StudySessionId,
    ) -> Result<Vec<ReviewEvent>, StorageError> {
        Err(StorageError::Connection("disk I/O error".into()))
    }

    async fn events_for_word(&self, _id: WordId) -> Result<Vec<ReviewEvent>, StorageError> {
        Err(StorageError::Connection("disk I/O error".into()))
    }

    async fn all_events_ordered(&self) -> Result<Vec<ReviewEvent>, StorageError> {
        Err(StorageError::Connection("disk I/O error".into()))
    }

    async fn review_totals(&self) -> Result<ReviewTotals, StorageError> {
        Err(StorageError::Connection("disk I/O error".into()))
    }

    async fn counters_for_word(&self, _id: WordId) -> Result<WordCounter, StorageError> {
        Err(StorageError::Connection("disk I/O error".into()))
    }

    async fn all_counters(&self) -> Result<Vec<WordCounter>, StorageError> {
        Err(StorageError::Connection("disk I/O error".into()))
    }

    async fn review_history(&self) -> Result<ReviewHistory, StorageError> {
        Err(StorageError::Connection("disk I/O error".into()))
    }

    async fn rebuild_counters(&self) -> Result<usize, StorageError> {
        Err(StorageError::Connection("disk I/O error".into()))
    }
}

fn portal_with_reviews(
    repo: InMemoryRepository,
    reviews: Arc<dyn ReviewRepository>,
) -> Portal {
    let mut storage = Storage::from_in_memory(repo);
    storage.reviews = reviews;
    Portal::new(Dataset::new(storage, fixed_clock(), ReportingZone::utc()))
}

fn seeded_repo() -> InMemoryRepository {
    InMemoryRepository::with_catalog(&SeedCatalog::default_catalog().unwrap()).unwrap()
}

#[tokio::test]
async fn verify_detects_and_repairs_drift() {
    let repo = seeded_repo();
    let reviews = Arc::new(DriftingReviews {
        inner: repo.clone(),
        drifted: AtomicBool::new(false),
    });
    let portal = portal_with_reviews(repo, reviews.clone());

    let session = portal
        .ledger()
        .create_session(GroupId::new(1), StudyActivityId::new(1))
        .await
        .unwrap();
    portal
        .events()
        .append_review(session.id, WordId::new(1), true)
        .await
        .unwrap();
    reviews.drifted.store(true, Ordering::SeqCst);

    assert_eq!(
        portal
            .counters()
            .counters_for_word(WordId::new(1))
            .await
            .unwrap()
            .counts(),
        (11, 0)
    );

    let audit = portal.counters().verify().await.unwrap();
    assert_eq!(audit.repaired.len(), 1);
    assert_eq!(audit.repaired[0].word_id, WordId::new(1));
    assert_eq!(audit.repaired[0].expected, (1, 0));
    assert_eq!(audit.repaired[0].found, (11, 0));

    assert_eq!(
        portal
            .counters()
            .counters_for_word(WordId::new(1))
            .await
            .unwrap()
            .counts(),
        (1, 0)
    );
    assert!(portal.counters().verify().await.unwrap().repaired.is_empty());
}

#[tokio::test]
async fn storage_failures_surface_as_server_errors() {
    let portal = portal_with_reviews(seeded_repo(), Arc::new(BrokenReviews));
    let session = portal
        .ledger()
        .create_session(GroupId::new(1), StudyActivityId::new(1))
        .await
        .unwrap();

    let err = portal
        .events()
        .append_review(session.id, WordId::new(1), true)
        .await
        .unwrap_err();
    assert!(matches!(err, ProgressError::Storage(_)));
    assert!(!err.is_not_found());

    let api = Api::new(portal);
    let reply = api.handle("GET", "/dashboard/quick-stats", None).await;
    assert_eq!(reply.status, 500);
    assert!(
        reply.body["error"]
            .as_str()
            .unwrap()
            .contains("disk I/O error")
    );

    // Session-only endpoints do not touch the review log.
    let reply = api.handle("GET", "/dashboard/last_study_session", None).await;
    assert_eq!(reply.status, 200);
}
