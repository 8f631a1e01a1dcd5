//! On-demand aggregate metrics over the review log and session ledger.

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use portal_core::model::{GroupId, ReviewEvent, StudyActivityId, StudySessionId, WordId};
use portal_core::stats;
use portal_core::{Clock, ReportingZone};
use storage::repository::{CatalogRepository, ReviewRepository};

use crate::dataset::Dataset;
use crate::error::ProgressError;
use crate::session_ledger::SessionLedger;

/// Every dashboard metric computed in one pass. Never persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregateSnapshot {
    pub success_rate: f64,
    pub total_study_sessions: u64,
    pub total_active_groups: u64,
    pub study_streak_days: u32,
    pub total_words_studied: u64,
    pub total_available_words: u64,
}

/// The most recent session joined with its group's name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LastSessionSummary {
    pub id: StudySessionId,
    pub group_id: GroupId,
    pub created_at: DateTime<Utc>,
    pub study_activity_id: StudyActivityId,
    pub group_name: String,
}

/// Reads the event log (never the cached counters) to compute metrics.
#[derive(Clone)]
pub struct AggregateCalculator {
    clock: Clock,
    zone: ReportingZone,
    ledger: SessionLedger,
    catalog: Arc<dyn CatalogRepository>,
    reviews: Arc<dyn ReviewRepository>,
}

impl AggregateCalculator {
    #[must_use]
    pub fn new(dataset: &Dataset) -> Self {
        let storage = dataset.storage();
        Self {
            clock: dataset.clock(),
            zone: dataset.zone(),
            ledger: SessionLedger::new(dataset),
            catalog: Arc::clone(&storage.catalog),
            reviews: Arc::clone(&storage.reviews),
        }
    }

    /// Correct reviews over all reviews; `0.0` for an empty log.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError::Storage` if repository access fails.
    pub async fn success_rate(&self) -> Result<f64, ProgressError> {
        let totals = self.reviews.review_totals().await?;
        Ok(stats::success_rate(totals.correct, totals.total))
    }

    /// # Errors
    ///
    /// Returns `ProgressError::Storage` if repository access fails.
    pub async fn total_study_sessions(&self) -> Result<u64, ProgressError> {
        self.ledger.count_sessions().await
    }

    /// # Errors
    ///
    /// Returns `ProgressError::Storage` if repository access fails.
    pub async fn total_active_groups(&self) -> Result<u64, ProgressError> {
        let groups = self.ledger.distinct_active_group_ids().await?;
        Ok(u64::try_from(groups.len()).unwrap_or(u64::MAX))
    }

    /// Consecutive study days ending today (or yesterday, while today has no
    /// reviews yet), in the reporting zone.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError::Storage` if repository access fails.
    pub async fn study_streak_days(&self) -> Result<u32, ProgressError> {
        let events = self.reviews.all_events_ordered().await?;
        Ok(self.streak_over(&events))
    }

    fn streak_over(&self, events: &[ReviewEvent]) -> u32 {
        let today = self.zone.local_date(self.clock.now());
        stats::streak_days(
            events.iter().map(|e| self.zone.local_date(e.reviewed_at)),
            today,
        )
    }

    /// Distinct words with at least one review.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError::Storage` if repository access fails.
    pub async fn total_words_studied(&self) -> Result<u64, ProgressError> {
        Ok(self.reviews.review_totals().await?.distinct_words)
    }

    /// # Errors
    ///
    /// Returns `ProgressError::Storage` if repository access fails.
    pub async fn total_available_words(&self) -> Result<u64, ProgressError> {
        Ok(self.catalog.total_word_count().await?)
    }

    /// # Errors
    ///
    /// Returns `ProgressError::NoData` if no session exists.
    pub async fn last_session_summary(&self) -> Result<LastSessionSummary, ProgressError> {
        let session = self.ledger.last_session().await?;
        let group_name = self
            .catalog
            .group_name(session.group_id)
            .await?
            .unwrap_or_default();
        Ok(LastSessionSummary {
            id: session.id,
            group_id: session.group_id,
            created_at: session.created_at,
            study_activity_id: session.study_activity_id,
            group_name,
        })
    }

    /// All metrics at once.
    ///
    /// The review-derived figures (success rate, streak, words studied) come
    /// from a single read of the log and always agree with each other. Session
    /// counts and the catalog size are separate reads: a session created
    /// while the snapshot is taken may be counted without its reviews.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError::Storage` if repository access fails.
    pub async fn snapshot(&self) -> Result<AggregateSnapshot, ProgressError> {
        let events = self.reviews.all_events_ordered().await?;
        let total = u64::try_from(events.len()).unwrap_or(u64::MAX);
        let correct = events.iter().filter(|e| e.correct).count();
        let correct = u64::try_from(correct).unwrap_or(u64::MAX);
        let words: BTreeSet<WordId> = events.iter().map(|e| e.word_id).collect();

        Ok(AggregateSnapshot {
            success_rate: stats::success_rate(correct, total),
            total_study_sessions: self.total_study_sessions().await?,
            total_active_groups: self.total_active_groups().await?,
            study_streak_days: self.streak_over(&events),
            total_words_studied: u64::try_from(words.len()).unwrap_or(u64::MAX),
            total_available_words: self.total_available_words().await?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event_store::EventStore;
    use crate::test_support::{dataset_at, seeded_dataset};
    use chrono::Duration;
    use portal_core::model::{StudySession, WordId};
    use portal_core::time::fixed_now;

    async fn session(dataset: &Dataset, group: u64) -> StudySession {
        SessionLedger::new(dataset)
            .create_session(GroupId::new(group), StudyActivityId::new(1))
            .await
            .unwrap()
    }

    async fn review_on_days(dataset: &Dataset, days_ago: &[i64]) {
        let s = session(dataset, 1).await;
        let store = EventStore::new(dataset);
        for d in days_ago {
            store
                .append_review_at(s.id, WordId::new(1), true, fixed_now() - Duration::days(*d))
                .await
                .unwrap();
        }
    }

    #[tokio::test]
    async fn empty_dataset_reports_zeroes() {
        let calc = AggregateCalculator::new(&seeded_dataset().await);
        let snap = calc.snapshot().await.unwrap();
        assert_eq!(
            snap,
            AggregateSnapshot {
                success_rate: 0.0,
                total_study_sessions: 0,
                total_active_groups: 0,
                study_streak_days: 0,
                total_words_studied: 0,
                total_available_words: 3,
            }
        );
        assert!(matches!(
            calc.last_session_summary().await.unwrap_err(),
            ProgressError::NoData
        ));
    }

    #[tokio::test]
    async fn streak_counts_consecutive_days_through_today() {
        let dataset = seeded_dataset().await;
        review_on_days(&dataset, &[3, 2, 1, 0]).await;
        let calc = AggregateCalculator::new(&dataset);
        assert_eq!(calc.study_streak_days().await.unwrap(), 4);
    }

    #[tokio::test]
    async fn streak_with_stale_gap_is_zero() {
        let dataset = seeded_dataset().await;
        review_on_days(&dataset, &[5, 3]).await;
        let calc = AggregateCalculator::new(&dataset);
        assert_eq!(calc.study_streak_days().await.unwrap(), 0);

        let dataset = seeded_dataset().await;
        review_on_days(&dataset, &[3, 2, 1]).await;
        let calc = AggregateCalculator::new(&dataset);
        assert_eq!(calc.study_streak_days().await.unwrap(), 3);
    }

    #[tokio::test]
    async fn streak_uses_reporting_zone_days() {
        // Review at 2023-11-14T22:13:20Z, which is 2023-11-15 in Tokyo.
        let dataset = seeded_dataset().await;
        review_on_days(&dataset, &[0]).await;
        let now = fixed_now() + Duration::hours(26);

        let utc = dataset_at(&dataset, now);
        assert_eq!(
            AggregateCalculator::new(&utc)
                .study_streak_days()
                .await
                .unwrap(),
            0
        );

        let tokyo = Dataset::new(
            dataset.storage().clone(),
            Clock::fixed(now),
            "+09:00".parse().unwrap(),
        );
        assert_eq!(
            AggregateCalculator::new(&tokyo)
                .study_streak_days()
                .await
                .unwrap(),
            1
        );
    }

    #[tokio::test]
    async fn rate_groups_and_words_follow_the_log() {
        let dataset = seeded_dataset().await;
        let store = EventStore::new(&dataset);
        let first = session(&dataset, 1).await;
        let _second = session(&dataset, 1).await;
        let third = session(&dataset, 2).await;

        for (word, correct) in [(1, true), (1, false), (2, true), (2, true)] {
            store
                .append_review(first.id, WordId::new(word), correct)
                .await
                .unwrap();
        }

        let calc = AggregateCalculator::new(&dataset);
        assert_eq!(calc.success_rate().await.unwrap(), 0.75);
        assert_eq!(calc.total_study_sessions().await.unwrap(), 3);
        assert_eq!(calc.total_active_groups().await.unwrap(), 2);
        assert_eq!(calc.total_words_studied().await.unwrap(), 2);
        assert_eq!(calc.total_available_words().await.unwrap(), 3);

        let snap = calc.snapshot().await.unwrap();
        assert_eq!(snap.success_rate, 0.75);
        assert_eq!(snap.total_words_studied, 2);
        assert_eq!(snap.study_streak_days, 1);
        assert_eq!(snap.total_study_sessions, 3);

        let last = calc.last_session_summary().await.unwrap();
        assert_eq!(last.id, third.id);
        assert_eq!(last.group_name, "Basic Words");
        assert_eq!(last.created_at, fixed_now());
    }
}
