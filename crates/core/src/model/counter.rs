use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::model::ids::{GroupId, WordId};
use crate::model::review::ReviewEvent;

//
// ─── WORD COUNTER ──────────────────────────────────────────────────────────────
//

/// Derived correct/wrong tallies for one word.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WordCounter {
    pub word_id: WordId,
    pub correct_count: u64,
    pub wrong_count: u64,
}

impl WordCounter {
    #[must_use]
    pub fn zero(word_id: WordId) -> Self {
        Self {
            word_id,
            correct_count: 0,
            wrong_count: 0,
        }
    }

    /// Count one more review outcome.
    pub fn record(&mut self, correct: bool) {
        if correct {
            self.correct_count = self.correct_count.saturating_add(1);
        } else {
            self.wrong_count = self.wrong_count.saturating_add(1);
        }
    }

    #[must_use]
    pub fn counts(&self) -> (u64, u64) {
        (self.correct_count, self.wrong_count)
    }

    #[must_use]
    pub fn total(&self) -> u64 {
        self.correct_count.saturating_add(self.wrong_count)
    }
}

//
// ─── GROUP COUNTER ─────────────────────────────────────────────────────────────
//

/// Membership size of a group. Independent of reviews.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupCounter {
    pub group_id: GroupId,
    pub total_word_count: u64,
}

//
// ─── COUNTER TABLE ─────────────────────────────────────────────────────────────
//

/// A word whose stored counters disagree with a replay of the event log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CounterDrift {
    pub word_id: WordId,
    /// Counts obtained by replaying the log.
    pub expected: (u64, u64),
    /// Counts currently stored.
    pub actual: (u64, u64),
}

/// Materialized per-word counters, keyed by word id.
///
/// Words that were never reviewed have no entry; lookups default to zero.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CounterTable {
    counters: BTreeMap<WordId, WordCounter>,
}

impl CounterTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replay a sequence of events from scratch.
    pub fn from_events<'a, I>(events: I) -> Self
    where
        I: IntoIterator<Item = &'a ReviewEvent>,
    {
        let mut table = Self::new();
        for event in events {
            table.on_review_appended(event);
        }
        table
    }

    /// Rehydrate from stored counter rows. Later duplicates overwrite earlier ones.
    pub fn from_counters<I>(counters: I) -> Self
    where
        I: IntoIterator<Item = WordCounter>,
    {
        Self {
            counters: counters.into_iter().map(|c| (c.word_id, c)).collect(),
        }
    }

    /// Apply the effect of one freshly appended event.
    pub fn on_review_appended(&mut self, event: &ReviewEvent) {
        self.counters
            .entry(event.word_id)
            .or_insert_with(|| WordCounter::zero(event.word_id))
            .record(event.correct);
    }

    #[must_use]
    pub fn get(&self, word_id: WordId) -> WordCounter {
        self.counters
            .get(&word_id)
            .copied()
            .unwrap_or_else(|| WordCounter::zero(word_id))
    }

    pub fn iter(&self) -> impl Iterator<Item = &WordCounter> {
        self.counters.values()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.counters.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.counters.is_empty()
    }

    pub fn clear(&mut self) {
        self.counters.clear();
    }

    /// Compare `self` (the replayed truth) against `stored`.
    ///
    /// A missing entry counts as `(0, 0)`, so an all-zero stored row never
    /// registers as drift.
    #[must_use]
    pub fn diff(&self, stored: &CounterTable) -> Vec<CounterDrift> {
        let mut words: Vec<WordId> = self.counters.keys().copied().collect();
        words.extend(stored.counters.keys().copied());
        words.sort_unstable();
        words.dedup();

        words
            .into_iter()
            .filter_map(|word_id| {
                let expected = self.get(word_id).counts();
                let actual = stored.get(word_id).counts();
                (expected != actual).then_some(CounterDrift {
                    word_id,
                    expected,
                    actual,
                })
            })
            .collect()
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
