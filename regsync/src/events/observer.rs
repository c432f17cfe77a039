//! Copy observer trait and implementations.

use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::core::ArtifactIdentifier;

/// Something that happened while copying one artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CopyEvent {
    /// An attempt is about to invoke the copy primitive.
    AttemptStarted {
        /// The artifact.
        identifier: ArtifactIdentifier,
        /// The target location.
        target: String,
        /// 1-based attempt number.
        attempt: u32,
        /// Attempt budget.
        max_attempts: u32,
    },
    /// The copy primitive reported failure.
    AttemptFailed {
        /// The artifact.
        identifier: ArtifactIdentifier,
        /// The target location.
        target: String,
        /// 1-based attempt number.
        attempt: u32,
        /// The failure message.
        error: String,
    },
    /// The artifact was copied.
    Succeeded {
        /// The artifact.
        identifier: ArtifactIdentifier,
        /// The target location.
        target: String,
        /// Attempts used.
        attempts: u32,
    },
    /// Every attempt failed.
    GaveUp {
        /// The artifact.
        identifier: ArtifactIdentifier,
        /// Attempts used.
        attempts: u32,
        /// The last failure message.
        error: String,
    },
    /// A failure outside the copy primitive ended the artifact early.
    Unexpected {
        /// The artifact.
        identifier: ArtifactIdentifier,
        /// The failure message.
        error: String,
    },
}

impl CopyEvent {
    /// Dotted event type, e.g. `copy.attempt_failed`.
    #[must_use]
    pub const fn event_type(&self) -> &'static str {
        match self {
            Self::AttemptStarted { .. } => "copy.attempt_started",
            Self::AttemptFailed { .. } => "copy.attempt_failed",
            Self::Succeeded { .. } => "copy.succeeded",
            Self::GaveUp { .. } => "copy.gave_up",
            Self::Unexpected { .. } => "copy.unexpected",
        }
    }

    /// The artifact this event concerns.
    #[must_use]
    pub const fn identifier(&self) -> &ArtifactIdentifier {
        match self {
            Self::AttemptStarted { identifier, .. }
            | Self::AttemptFailed { identifier, .. }
            | Self::Succeeded { identifier, .. }
            | Self::GaveUp { identifier, .. }
            | Self::Unexpected { identifier, .. } => identifier,
        }
    }
}

/// Receives copy progress events.
///
/// Observers are called from worker tasks and must not block.
pub trait CopyObserver: Send + Sync {
    /// Handles one event.
    fn observe(&self, event: &CopyEvent);
}

/// An observer that discards all events.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpCopyObserver;

impl CopyObserver for NoOpCopyObserver {
    fn observe(&self, _event: &CopyEvent) {}
}

/// An observer that logs events using the tracing framework.
///
/// Per-attempt failures are warnings; giving up and unexpected failures are
/// errors, so they also land in the error log file.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingCopyObserver;

impl CopyObserver for LoggingCopyObserver {
    fn observe(&self, event: &CopyEvent) {
        match event {
            CopyEvent::AttemptStarted {
                identifier,
                target,
                attempt,
                max_attempts,
            } => {
                if *attempt == 1 {
                    info!(source = %identifier, %target, "Copying {} -> {}", identifier, target);
                } else {
                    debug!(source = %identifier, %target, attempt, max_attempts, "Retrying copy");
                }
            }
            CopyEvent::AttemptFailed {
                identifier,
                attempt,
                error,
                ..
            } => {
                warn!(source = %identifier, attempt, %error, "Attempt {} failed for {}", attempt, identifier);
            }
            CopyEvent::Succeeded {
                identifier,
                attempts,
                ..
            } => {
                info!(source = %identifier, attempts, "Successfully copied {}", identifier);
            }
            CopyEvent::GaveUp {
                identifier,
                attempts,
                error,
            } => {
                error!(source = %identifier, attempts, %error, "Giving up on {}", identifier);
            }
            CopyEvent::Unexpected { identifier, error } => {
                error!(source = %identifier, %error, "Unexpected error copying {}", identifier);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id() -> ArtifactIdentifier {
        ArtifactIdentifier::new("repo", "app", "1.0").unwrap()
    }

    #[test]
    fn test_event_types() {
        let started = CopyEvent::AttemptStarted {
            identifier: id(),
            target: "d/app:1.0".to_string(),
            attempt: 1,
            max_attempts: 3,
        };
        assert_eq!(started.event_type(), "copy.attempt_started");
        assert_eq!(started.identifier(), &id());

        let gave_up = CopyEvent::GaveUp {
            identifier: id(),
            attempts: 3,
            error: "x".to_string(),
        };
        assert_eq!(gave_up.event_type(), "copy.gave_up");
    }

    #[test]
    fn test_event_serializes_tagged() {
        let event = CopyEvent::Succeeded {
            identifier: id(),
            target: "d/app:1.0".to_string(),
            attempts: 2,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "succeeded");
        assert_eq!(json["identifier"], "repo/app:1.0");
        assert_eq!(json["attempts"], 2);
    }

    #[test]
    fn test_noop_and_logging_do_not_panic() {
        let event = CopyEvent::Unexpected {
            identifier: id(),
            error: "e".to_string(),
        };
        NoOpCopyObserver.observe(&event);
        LoggingCopyObserver.observe(&event);
    }
}
