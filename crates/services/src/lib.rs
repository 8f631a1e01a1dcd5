#![forbid(unsafe_code)]

pub mod aggregate;
pub mod api;
pub mod counter_maintainer;
pub mod dataset;
pub mod error;
pub mod event_store;
pub mod listing;
pub mod portal;
pub mod reporter;
pub mod reset;
pub mod session_ledger;

pub use portal_core::{Clock, ReportingZone};

pub use aggregate::{AggregateCalculator, AggregateSnapshot, LastSessionSummary};
pub use api::{Api, Reply};
pub use counter_maintainer::{CounterAudit, CounterMaintainer};
pub use dataset::Dataset;
pub use error::{EntityKind, PortalInitError, ProgressError};
pub use event_store::EventStore;
pub use listing::{Page, SessionListItem, SessionListing, SessionWordStats};
pub use portal::Portal;
pub use reporter::{LastStudySession, ProgressReporter, QuickStats, StudyProgress};
pub use reset::ResetService;
pub use session_ledger::SessionLedger;
