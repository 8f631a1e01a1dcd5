use portal_core::{Clock, ReportingZone};
use storage::repository::Storage;

use crate::aggregate::AggregateCalculator;
use crate::counter_maintainer::CounterMaintainer;
use crate::dataset::Dataset;
use crate::error::PortalInitError;
use crate::event_store::EventStore;
use crate::listing::SessionListing;
use crate::reporter::ProgressReporter;
use crate::reset::ResetService;
use crate::session_ledger::SessionLedger;

/// Every service wired against one dataset.
#[derive(Clone)]
pub struct Portal {
    dataset: Dataset,
    events: EventStore,
    ledger: SessionLedger,
    counters: CounterMaintainer,
    calculator: AggregateCalculator,
    reporter: ProgressReporter,
    listing: SessionListing,
    resets: ResetService,
}

impl Portal {
    #[must_use]
    pub fn new(dataset: Dataset) -> Self {
        Self {
            events: EventStore::new(&dataset),
            ledger: SessionLedger::new(&dataset),
            counters: CounterMaintainer::new(&dataset),
            calculator: AggregateCalculator::new(&dataset),
            reporter: ProgressReporter::new(&dataset),
            listing: SessionListing::new(&dataset),
            resets: ResetService::new(&dataset),
            dataset,
        }
    }

    /// Build services backed by `SQLite` storage.
    ///
    /// # Errors
    ///
    /// Returns `PortalInitError` if the database cannot be opened or migrated.
    pub async fn new_sqlite(
        db_url: &str,
        clock: Clock,
        zone: ReportingZone,
    ) -> Result<Self, PortalInitError> {
        let storage = Storage::sqlite(db_url).await?;
        Ok(Self::new(Dataset::new(storage, clock, zone)))
    }

    #[must_use]
    pub fn dataset(&self) -> &Dataset {
        &self.dataset
    }

    #[must_use]
    pub fn events(&self) -> &EventStore {
        &self.events
    }

    #[must_use]
    pub fn ledger(&self) -> &SessionLedger {
        &self.ledger
    }

    #[must_use]
    pub fn counters(&self) -> &CounterMaintainer {
        &self.counters
    }

    #[must_use]
    pub fn calculator(&self) -> &AggregateCalculator {
        &self.calculator
    }

    #[must_use]
    pub fn reporter(&self) -> &ProgressReporter {
        &self.reporter
    }

    #[must_use]
    pub fn listing(&self) -> &SessionListing {
        &self.listing
    }

    #[must_use]
    pub fn resets(&self) -> &ResetService {
        &self.resets
    }
}
