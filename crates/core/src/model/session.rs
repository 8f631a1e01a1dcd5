use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::ids::{GroupId, StudyActivityId, StudySessionId};

/// One instance of a learner engaging a study activity against a group.
///
/// Sessions are created once at session start and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudySession {
    pub id: StudySessionId,
    pub group_id: GroupId,
    pub study_activity_id: StudyActivityId,
    pub created_at: DateTime<Utc>,
}

/// A session that has not been assigned an identity by storage yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NewStudySession {
    pub group_id: GroupId,
    pub study_activity_id: StudyActivityId,
    pub created_at: DateTime<Utc>,
}

impl NewStudySession {
    #[must_use]
    pub fn new(
        group_id: GroupId,
        study_activity_id: StudyActivityId,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            group_id,
            study_activity_id,
            created_at,
        }
    }

    /// Attach the identity assigned by storage.
    #[must_use]
    pub fn into_session(self, id: StudySessionId) -> StudySession {
        StudySession {
            id,
            group_id: self.group_id,
            study_activity_id: self.study_activity_id,
            created_at: self.created_at,
        }
    }
}

impl StudySession {
    /// Ordering key used to pick the most recent session: creation time, then id.
    #[must_use]
    pub fn recency_key(&self) -> (DateTime<Utc>, StudySessionId) {
        (self.created_at, self.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;

    #[test]
    fn recency_breaks_ties_by_id() {
        let now = fixed_now();
        let draft = NewStudySession::new(GroupId::new(1), StudyActivityId::new(1), now);
        let first = draft.into_session(StudySessionId::new(1));
        let second = draft.into_session(StudySessionId::new(2));
        assert!(second.recency_key() > first.recency_key());
    }
}
