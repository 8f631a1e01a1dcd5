use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::ids::{ReviewEventId, StudySessionId, WordId};

//
// ─── REVIEW EVENT ─────────────────────────────────────────────────────────────
//

/// Record of a single word review inside a study session.
///
/// Events are append-only: created once when a review is submitted and never
/// mutated or deleted individually. Every derived counter is a pure function
/// of the sequence of these records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewEvent {
    pub id: ReviewEventId,
    pub session_id: StudySessionId,
    pub word_id: WordId,
    pub correct: bool,
    pub reviewed_at: DateTime<Utc>,
}

impl ReviewEvent {
    /// Ordering key for time-ordered replay: timestamp, then identity.
    #[must_use]
    pub fn replay_key(&self) -> (DateTime<Utc>, ReviewEventId) {
        (self.reviewed_at, self.id)
    }
}

/// A review outcome that has not been appended to the log yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NewReviewEvent {
    pub session_id: StudySessionId,
    pub word_id: WordId,
    pub correct: bool,
    pub reviewed_at: DateTime<Utc>,
}

impl NewReviewEvent {
    #[must_use]
    pub fn new(
        session_id: StudySessionId,
        word_id: WordId,
        correct: bool,
        reviewed_at: DateTime<Utc>,
    ) -> Self {
        Self {
            session_id,
            word_id,
            correct,
            reviewed_at,
        }
    }

    #[must_use]
    pub fn into_event(self, id: ReviewEventId) -> ReviewEvent {
        ReviewEvent {
            id,
            session_id: self.session_id,
            word_id: self.word_id,
            correct: self.correct,
            reviewed_at: self.reviewed_at,
        }
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
