//! Shared error types for the services crate.

use std::fmt;

use thiserror::Error;

use portal_core::model::CatalogError;
use storage::repository::StorageError;
use storage::sqlite::SqliteInitError;

/// Kind of record a lookup failed to find.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Word,
    Group,
    StudyActivity,
    StudySession,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EntityKind::Word => "word",
            EntityKind::Group => "group",
            EntityKind::StudyActivity => "study activity",
            EntityKind::StudySession => "study session",
        };
        f.write_str(name)
    }
}

/// Errors emitted by the review and progress services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ProgressError {
    #[error("{entity} with ID {id} does not exist")]
    NotFound { entity: EntityKind, id: u64 },

    #[error("no study sessions found")]
    NoData,

    #[error("{words} word counter(s) still disagree with the review log after a rebuild")]
    Inconsistency { words: usize },

    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl ProgressError {
    #[must_use]
    pub fn not_found(entity: EntityKind, id: u64) -> Self {
        Self::NotFound { entity, id }
    }

    /// True for the variants that mean "nothing to report" rather than a failure.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. } | Self::NoData)
    }
}

/// Errors emitted while bootstrapping the portal services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum PortalInitError {
    #[error(transparent)]
    Sqlite(#[from] SqliteInitError),
}
