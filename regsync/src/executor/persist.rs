//! Post-run files: the remaining list and the JSON report.

use std::path::Path;
use tracing::info;

use crate::core::MigrationReport;
use crate::errors::Result;
use crate::reconcile::MigrationWorkList;
use crate::utils::write_atomic;

/// Writes the failed and never-attempted identifiers in work list format.
///
/// The file is always rewritten, so an empty run clears stale content.
pub fn write_remaining(report: &MigrationReport, path: impl AsRef<Path>) -> Result<MigrationWorkList> {
    let path = path.as_ref();
    let remaining = MigrationWorkList::new(report.remaining());
    remaining.write_to(path)?;
    info!(
        remaining = remaining.len(),
        path = %path.display(),
        "Wrote remaining list"
    );
    Ok(remaining)
}

/// Writes the report as pretty JSON.
pub fn write_report(report: &MigrationReport, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    let json = report.to_json()?;
    write_atomic(path, json.as_bytes())?;
    info!(path = %path.display(), "Wrote migration report");
    Ok(())
}
