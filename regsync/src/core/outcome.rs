//! Per-artifact copy outcomes.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::ArtifactIdentifier;

/// Terminal status of one artifact's copy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CopyStatus {
    /// The copy primitive succeeded on some attempt.
    Succeeded,
    /// Every allowed attempt failed.
    FailedExhausted,
    /// A failure outside the copy primitive; not retried.
    FailedUnexpected,
}

impl CopyStatus {
    /// Whether the artifact reached the destination.
    #[must_use]
    pub const fn is_success(self) -> bool {
        matches!(self, Self::Succeeded)
    }
}

impl fmt::Display for CopyStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Succeeded => write!(f, "succeeded"),
            Self::FailedExhausted => write!(f, "failed_exhausted"),
            Self::FailedUnexpected => write!(f, "failed_unexpected"),
        }
    }
}

/// The recorded result of copying one artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CopyOutcome {
    /// The artifact.
    pub identifier: ArtifactIdentifier,
    /// Where it was copied to, when a target could be computed.
    pub target: Option<String>,
    /// Terminal status.
    pub status: CopyStatus,
    /// Number of copy primitive invocations made. Zero when the artifact
    /// never reached the primitive or its worker task was lost.
    pub attempts: u32,
    /// The last error seen, if any.
    pub last_error: Option<String>,
    /// Wall time spent on this artifact, including retry sleeps.
    pub duration_ms: f64,
}

impl CopyOutcome {
    /// Creates a successful outcome.
    #[must_use]
    pub fn succeeded(identifier: ArtifactIdentifier, target: impl Into<String>, attempts: u32) -> Self {
        Self {
            identifier,
            target: Some(target.into()),
            status: CopyStatus::Succeeded,
            attempts,
            last_error: None,
            duration_ms: 0.0,
        }
    }

    /// Creates an outcome for an artifact whose attempts all failed.
    #[must_use]
    pub fn exhausted(
        identifier: ArtifactIdentifier,
        target: impl Into<String>,
        attempts: u32,
        error: impl Into<String>,
    ) -> Self {
        Self {
            identifier,
            target: Some(target.into()),
            status: CopyStatus::FailedExhausted,
            attempts,
            last_error: Some(error.into()),
            duration_ms: 0.0,
        }
    }

    /// Creates an outcome for a failure outside the copy primitive.
    #[must_use]
    pub fn unexpected(
        identifier: ArtifactIdentifier,
        target: Option<String>,
        attempts: u32,
        error: impl Into<String>,
    ) -> Self {
        Self {
            identifier,
            target,
            status: CopyStatus::FailedUnexpected,
            attempts,
            last_error: Some(error.into()),
            duration_ms: 0.0,
        }
    }

    /// Sets the elapsed duration.
    #[must_use]
    pub fn with_duration_ms(mut self, duration_ms: f64) -> Self {
        self.duration_ms = duration_ms;
        self
    }

    /// Whether the artifact was copied.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.status.is_success()
    }
}
