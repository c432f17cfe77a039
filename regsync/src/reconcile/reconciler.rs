//! Set difference between two inventories.

use std::path::{Path, PathBuf};
use tracing::{info, warn};

use super::MigrationWorkList;
use crate::errors::Result;
use crate::inventory::{ArtifactSet, Inventory};

/// How many pending identifiers are echoed to the log.
pub const PREVIEW_LIMIT: usize = 10;

/// Computes what the destination is missing and persists it.
#[derive(Debug, Clone)]
pub struct Reconciler {
    work_list_path: PathBuf,
}

impl Reconciler {
    /// Creates a reconciler persisting to `work_list_path`.
    #[must_use]
    pub fn new(work_list_path: impl Into<PathBuf>) -> Self {
        Self {
            work_list_path: work_list_path.into(),
        }
    }

    /// Where the work list is written.
    #[must_use]
    pub fn work_list_path(&self) -> &Path {
        &self.work_list_path
    }

    /// Returns `source - destination`, written to disk before returning.
    ///
    /// Matching is exact on the canonical string.
    pub fn reconcile(&self, source: &ArtifactSet, destination: &ArtifactSet) -> Result<MigrationWorkList> {
        let work_list = difference(source, destination);
        work_list.write_to(&self.work_list_path)?;

        info!(
            source = source.len(),
            destination = destination.len(),
            pending = work_list.len(),
            path = %self.work_list_path.display(),
            "Reconciled inventories"
        );
        self.log_preview(&work_list);
        Ok(work_list)
    }

    /// Lists both inventories concurrently, then reconciles them.
    ///
    /// Either listing failing aborts before anything is written.
    pub async fn reconcile_inventories(
        &self,
        source: &dyn Inventory,
        destination: &dyn Inventory,
    ) -> Result<MigrationWorkList> {
        let (source_set, destination_set) = tokio::try_join!(source.list(), destination.list())?;
        info!(
            source = source.name(),
            destination = destination.name(),
            "Listed both inventories"
        );
        self.reconcile(&source_set, &destination_set)
    }

    fn log_preview(&self, work_list: &MigrationWorkList) {
        if work_list.is_empty() {
            info!("Destination already holds every source artifact");
            return;
        }
        warn!("{} artifacts missing from destination", work_list.len());
        for id in work_list.iter().take(PREVIEW_LIMIT) {
            warn!("  - {id}");
        }
        if work_list.len() > PREVIEW_LIMIT {
            warn!("  ... (see full list in {})", self.work_list_path.display());
        }
    }
}

/// The identifiers in `source` that `destination` lacks, in canonical order.
#[must_use]
pub fn difference(source: &ArtifactSet, destination: &ArtifactSet) -> MigrationWorkList {
    source.difference(destination).cloned().collect()
}
