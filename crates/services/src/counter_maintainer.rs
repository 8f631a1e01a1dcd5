use std::sync::Arc;

use portal_core::model::{CounterDrift, CounterTable, GroupCounter, GroupId, WordCounter, WordId};
use serde::Serialize;
use storage::repository::{CatalogRepository, ReviewRepository};

use crate::dataset::Dataset;
use crate::error::{EntityKind, ProgressError};

/// Outcome of comparing stored counters against a replay of the log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CounterAudit {
    /// Words with counters after the check.
    pub words_checked: usize,
    /// Words whose stored counters had drifted and were rebuilt.
    pub repaired: Vec<RepairedCounter>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RepairedCounter {
    pub word_id: WordId,
    pub expected: (u64, u64),
    pub found: (u64, u64),
}

impl From<CounterDrift> for RepairedCounter {
    fn from(d: CounterDrift) -> Self {
        Self {
            word_id: d.word_id,
            expected: d.expected,
            found: d.actual,
        }
    }
}

/// Keeps per-word and per-group counters consistent with the review log.
///
/// Incremental updates happen inside `ReviewRepository::append_review`; this
/// service reads them, rebuilds them from scratch, and audits them.
#[derive(Clone)]
pub struct CounterMaintainer {
    catalog: Arc<dyn CatalogRepository>,
    reviews: Arc<dyn ReviewRepository>,
}

impl CounterMaintainer {
    #[must_use]
    pub fn new(dataset: &Dataset) -> Self {
        let storage = dataset.storage();
        Self {
            catalog: Arc::clone(&storage.catalog),
            reviews: Arc::clone(&storage.reviews),
        }
    }

    /// `(0, 0)` for words that were never reviewed.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError::Storage` if repository access fails.
    pub async fn counters_for_word(&self, word_id: WordId) -> Result<WordCounter, ProgressError> {
        Ok(self.reviews.counters_for_word(word_id).await?)
    }

    /// Recompute every word counter by replaying the full log.
    ///
    /// Returns the number of words that have counters afterwards.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError::Storage` if the rebuild transaction fails.
    pub async fn rebuild_from_log(&self) -> Result<usize, ProgressError> {
        let words = self.reviews.rebuild_counters().await?;
        tracing::info!(words, "word counters rebuilt from review log");
        Ok(words)
    }

    /// Log and counters come from one storage snapshot, so a concurrent
    /// append never shows up as drift.
    async fn drift(&self) -> Result<(usize, Vec<CounterDrift>), ProgressError> {
        let history = self.reviews.review_history().await?;
        let replayed = CounterTable::from_events(&history.events);
        let stored = CounterTable::from_counters(history.counters);
        Ok((replayed.len(), replayed.diff(&stored)))
    }

    /// Compare stored counters with a replay of the log and repair any drift.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError::Inconsistency` if counters still disagree after
    /// the rebuild. Returns `ProgressError::Storage` on repository failures.
    pub async fn verify(&self) -> Result<CounterAudit, ProgressError> {
        let (words_checked, drift) = self.drift().await?;
        if drift.is_empty() {
            tracing::debug!(words_checked, "word counters match review log");
            return Ok(CounterAudit {
                words_checked,
                repaired: Vec::new(),
            });
        }

        for d in &drift {
            tracing::warn!(
                word_id = %d.word_id,
                expected = ?d.expected,
                found = ?d.actual,
                "word counter drifted from review log"
            );
        }
        self.rebuild_from_log().await?;

        let (words_checked, remaining) = self.drift().await?;
        if !remaining.is_empty() {
            tracing::error!(words = remaining.len(), "counter rebuild did not converge");
            return Err(ProgressError::Inconsistency {
                words: remaining.len(),
            });
        }

        Ok(CounterAudit {
            words_checked,
            repaired: drift.into_iter().map(RepairedCounter::from).collect(),
        })
    }

    /// Membership size of a group.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError::NotFound` if the group does not exist.
    pub async fn group_counter(&self, group_id: GroupId) -> Result<GroupCounter, ProgressError> {
        if !self.catalog.group_exists(group_id).await? {
            return Err(ProgressError::not_found(EntityKind::Group, group_id.value()));
        }
        Ok(GroupCounter {
            group_id,
            total_word_count: self.catalog.group_word_count(group_id).await?,
        })
    }
}
