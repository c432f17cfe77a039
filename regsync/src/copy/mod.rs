//! Copying artifacts between registries.
//!
//! This module provides:
//! - [`CopyPrimitive`], the port to the external point-to-point copier
//! - [`CraneCopier`], the `crane cp` implementation
//! - [`CopyWorker`], one artifact's copy with bounded retry
//! - [`RetryPolicy`] and its backoff strategies

mod backoff;
mod crane;
mod worker;

use async_trait::async_trait;

use crate::errors::CopyError;

pub use backoff::{BackoffStrategy, JitterStrategy, RetryPolicy};
pub use crane::CraneCopier;
pub use worker::CopyWorker;

/// The external copy operation: copy the artifact at `source` to
/// `destination`, succeed or fail.
///
/// Implementations return [`CopyError::Failed`] when the copier ran and
/// reported failure, and [`CopyError::Unexpected`] when it could not be run
/// at all.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CopyPrimitive: Send + Sync {
    /// Copies one artifact.
    async fn copy(&self, source: &str, destination: &str) -> Result<(), CopyError>;
}
