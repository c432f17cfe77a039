//! Error types for regsync.
//!
//! Run-fatal failures (inventory enumeration, persistence, configuration) are
//! carried by [`RegsyncError`]. Per-artifact copy failures are carried by
//! [`CopyError`] and never abort a run; the executor records them as outcomes.

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Convenience alias for results carrying a [`RegsyncError`].
pub type Result<T> = std::result::Result<T, RegsyncError>;

/// The main error type for regsync operations.
#[derive(Debug, Error)]
pub enum RegsyncError {
    /// An inventory could not be fully enumerated.
    #[error("Inventory '{inventory}' unavailable: {reason}")]
    InventoryUnavailable {
        /// Which inventory failed (e.g. "nexus").
        inventory: String,
        /// What went wrong.
        reason: String,
    },

    /// The work list, remaining list, report or error log could not be
    /// read or written.
    #[error("Persistence error at {}: {source}", .path.display())]
    Persistence {
        /// The file involved.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// A configuration value could not be parsed.
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// A persisted work list line could not be parsed.
    #[error("Malformed work list entry at {}:{line}: '{entry}'", .path.display())]
    MalformedEntry {
        /// The work list file.
        path: PathBuf,
        /// One-based line number.
        line: usize,
        /// The offending text.
        entry: String,
    },

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl RegsyncError {
    /// Creates an inventory unavailable error.
    #[must_use]
    pub fn inventory(inventory: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InventoryUnavailable {
            inventory: inventory.into(),
            reason: reason.into(),
        }
    }

    /// Creates a persistence error for the given path.
    #[must_use]
    pub fn persistence(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Self::Persistence {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    /// Creates a configuration error.
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }
}

/// Errors from a single copy attempt.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CopyError {
    /// The copy primitive ran and reported failure. Retryable.
    #[error("copy exited with {}: {stderr}", .code.map_or_else(|| "signal".to_string(), |c| format!("status {c}")))]
    Failed {
        /// Process exit code, `None` when terminated by a signal.
        code: Option<i32>,
        /// Captured standard error, trimmed.
        stderr: String,
    },

    /// Something outside the primitive's own error channel went wrong.
    /// Never retried.
    #[error("unexpected error: {0}")]
    Unexpected(String),
}

impl CopyError {
    /// Creates a primitive failure.
    #[must_use]
    pub fn failed(code: Option<i32>, stderr: impl Into<String>) -> Self {
        Self::Failed {
            code,
            stderr: stderr.into(),
        }
    }

    /// Creates an unexpected failure.
    #[must_use]
    pub fn unexpected(message: impl Into<String>) -> Self {
        Self::Unexpected(message.into())
    }

    /// Whether another attempt may be made after this error.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }

    /// The text recorded as an outcome's last error.
    #[must_use]
    pub fn detail(&self) -> String {
        match self {
            Self::Unexpected(reason) => reason.clone(),
            failed @ Self::Failed { .. } => failed.to_string(),
        }
    }
}
