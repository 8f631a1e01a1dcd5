use std::sync::Arc;

use storage::repository::ResetRepository;
use storage::seed::SeedCatalog;

use crate::counter_maintainer::CounterMaintainer;
use crate::dataset::Dataset;
use crate::error::ProgressError;

/// Bulk resets. Counters are resynchronized with the log afterwards.
#[derive(Clone)]
pub struct ResetService {
    resets: Arc<dyn ResetRepository>,
    counters: CounterMaintainer,
}

impl ResetService {
    #[must_use]
    pub fn new(dataset: &Dataset) -> Self {
        Self {
            resets: Arc::clone(&dataset.storage().resets),
            counters: CounterMaintainer::new(dataset),
        }
    }

    /// Delete all sessions and reviews, keeping the catalog.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError::Storage` if the reset or the rebuild fails.
    pub async fn reset_history(&self) -> Result<(), ProgressError> {
        self.resets.reset_history().await?;
        self.counters.rebuild_from_log().await?;
        tracing::info!("study history reset");
        Ok(())
    }

    /// Delete everything and reload the starter catalog.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError::Catalog` if the starter catalog is invalid.
    /// Returns `ProgressError::Storage` if the reset or the rebuild fails.
    pub async fn full_reset(&self) -> Result<(), ProgressError> {
        let seed = SeedCatalog::default_catalog()?;
        self.resets.full_reset(&seed).await?;
        self.counters.rebuild_from_log().await?;
        tracing::info!("system fully reset");
        Ok(())
    }
}
