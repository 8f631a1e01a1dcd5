use portal_core::{Clock, ReportingZone};
use storage::repository::Storage;

/// One independent study dataset: storage handles plus the clock and zone
/// every service reads time through.
#[derive(Clone)]
pub struct Dataset {
    storage: Storage,
    clock: Clock,
    zone: ReportingZone,
}

impl Dataset {
    #[must_use]
    pub fn new(storage: Storage, clock: Clock, zone: ReportingZone) -> Self {
        Self {
            storage,
            clock,
            zone,
        }
    }

    /// Empty in-memory dataset reporting in UTC.
    #[must_use]
    pub fn in_memory(clock: Clock) -> Self {
        Self::new(Storage::in_memory(), clock, ReportingZone::utc())
    }

    #[must_use]
    pub fn storage(&self) -> &Storage {
        &self.storage
    }

    #[must_use]
    pub fn clock(&self) -> Clock {
        self.clock
    }

    #[must_use]
    pub fn zone(&self) -> ReportingZone {
        self.zone
    }
}
