//! Aggregated results of a migration run.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use super::{ArtifactIdentifier, CopyOutcome};

/// Counts for a finished run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MigrationSummary {
    /// Artifacts in the work list.
    pub total: usize,
    /// Artifacts copied.
    pub succeeded: usize,
    /// Artifacts whose copy failed.
    pub failed: usize,
    /// Artifacts never dispatched (cancelled runs only).
    pub not_attempted: usize,
}

impl MigrationSummary {
    /// Whether every artifact was copied.
    #[must_use]
    pub const fn is_clean(&self) -> bool {
        self.failed == 0 && self.not_attempted == 0
    }
}

impl fmt::Display for MigrationSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} succeeded, {} failed", self.succeeded, self.failed)?;
        if self.not_attempted > 0 {
            write!(f, ", {} not attempted", self.not_attempted)?;
        }
        Ok(())
    }
}

/// Full record of one executor run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MigrationReport {
    /// Unique run id.
    pub run_id: Uuid,
    /// When dispatch began.
    pub started_at: DateTime<Utc>,
    /// When the last outcome was collected.
    pub finished_at: DateTime<Utc>,
    /// Outcomes in completion order.
    pub outcomes: Vec<CopyOutcome>,
    /// Work list entries that were never dispatched.
    pub not_attempted: Vec<ArtifactIdentifier>,
    /// Whether the run was cancelled.
    pub cancelled: bool,
}

impl MigrationReport {
    /// Computes the summary counts.
    #[must_use]
    pub fn summary(&self) -> MigrationSummary {
        let succeeded = self.outcomes.iter().filter(|o| o.is_success()).count();
        MigrationSummary {
            total: self.outcomes.len() + self.not_attempted.len(),
            succeeded,
            failed: self.outcomes.len() - succeeded,
            not_attempted: self.not_attempted.len(),
        }
    }

    /// Outcomes that did not succeed.
    pub fn failures(&self) -> impl Iterator<Item = &CopyOutcome> {
        self.outcomes.iter().filter(|o| !o.is_success())
    }

    /// Identifiers still missing from the destination: failures plus the
    /// never-attempted entries, sorted.
    #[must_use]
    pub fn remaining(&self) -> Vec<ArtifactIdentifier> {
        let mut remaining: Vec<_> = self
            .failures()
            .map(|o| o.identifier.clone())
            .chain(self.not_attempted.iter().cloned())
            .collect();
        remaining.sort();
        remaining.dedup();
        remaining
    }

    /// Elapsed wall time in milliseconds.
    #[must_use]
    pub fn duration_ms(&self) -> i64 {
        (self.finished_at - self.started_at).num_milliseconds()
    }

    /// Serializes the report as pretty JSON.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn id(tag: &str) -> ArtifactIdentifier {
        ArtifactIdentifier::new("repo", "app", tag).unwrap()
    }

    fn report(outcomes: Vec<CopyOutcome>, not_attempted: Vec<ArtifactIdentifier>) -> MigrationReport {
        let now = Utc::now();
        MigrationReport {
            run_id: Uuid::now_v7(),
            started_at: now,
            finished_at: now,
            outcomes,
            not_attempted,
            cancelled: false,
        }
    }

    #[test]
    fn test_summary_display() {
        let r = report(vec![CopyOutcome::succeeded(id("2.0"), "d/app:2.0", 1)], vec![]);
        assert_eq!(r.summary().to_string(), "1 succeeded, 0 failed");
        assert!(r.summary().is_clean());
    }

    #[test]
    fn test_summary_with_not_attempted() {
        let r = report(
            vec![CopyOutcome::exhausted(id("1.0"), "d/app:1.0", 2, "x")],
            vec![id("3.0")],
        );
        let summary = r.summary();
        assert_eq!(summary.total, 2);
        assert_eq!(summary.to_string(), "0 succeeded, 1 failed, 1 not attempted");
        assert!(!summary.is_clean());
    }

    #[test]
    fn test_remaining_sorted() {
        let r = report(
            vec![
                CopyOutcome::exhausted(id("9.0"), "d/app:9.0", 2, "x"),
                CopyOutcome::succeeded(id("5.0"), "d/app:5.0", 1),
            ],
            vec![id("1.0")],
        );
        assert_eq!(r.remaining(), vec![id("1.0"), id("9.0")]);
    }
}
