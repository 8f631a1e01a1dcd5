mod catalog;
mod counter;
mod ids;
mod review;
mod session;

pub use ids::{GroupId, ParseIdError, ReviewEventId, StudyActivityId, StudySessionId, WordId};

pub use catalog::{CatalogError, Group, StudyActivity, Word};
pub use counter::{CounterDrift, CounterTable, GroupCounter, WordCounter};
pub use review::{NewReviewEvent, ReviewEvent};
pub use session::{NewStudySession, StudySession};
