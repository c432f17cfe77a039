//! One artifact's copy, with bounded retry.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;

use futures::FutureExt;

use super::{CopyPrimitive, RetryPolicy};
use crate::core::{ArtifactIdentifier, CopyOutcome, DestinationTransform};
use crate::errors::CopyError;
use crate::events::{CopyEvent, CopyObserver, NoOpCopyObserver};

/// Copies single artifacts, retrying primitive failures per a [`RetryPolicy`].
///
/// A worker holds no per-artifact state, so one instance is shared by every
/// task in the executor's pool.
#[derive(Clone)]
pub struct CopyWorker {
    primitive: Arc<dyn CopyPrimitive>,
    transform: DestinationTransform,
    policy: RetryPolicy,
    observer: Arc<dyn CopyObserver>,
}

impl CopyWorker {
    /// Creates a worker.
    #[must_use]
    pub fn new(
        primitive: Arc<dyn CopyPrimitive>,
        transform: DestinationTransform,
        policy: RetryPolicy,
    ) -> Self {
        Self {
            primitive,
            transform,
            policy,
            observer: Arc::new(NoOpCopyObserver),
        }
    }

    /// Sets the observer that receives per-attempt events.
    #[must_use]
    pub fn with_observer(mut self, observer: Arc<dyn CopyObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// The retry policy in use.
    #[must_use]
    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// The prefix rewrite in use.
    #[must_use]
    pub fn transform(&self) -> &DestinationTransform {
        &self.transform
    }

    /// Copies one artifact, returning its terminal outcome.
    ///
    /// Primitive failures are retried until the attempt budget is spent,
    /// sleeping the policy's delay between attempts. Anything else, including
    /// a panic inside the primitive, ends the artifact immediately as
    /// `FailedUnexpected` with the attempt it happened on.
    pub async fn copy(&self, identifier: &ArtifactIdentifier) -> CopyOutcome {
        let started = Instant::now();
        let elapsed_ms = || started.elapsed().as_secs_f64() * 1000.0;

        let Some(target) = self.transform.apply(identifier) else {
            let error = format!(
                "identifier is not under source prefix '{}'",
                self.transform.source_prefix()
            );
            self.emit(CopyEvent::Unexpected {
                identifier: identifier.clone(),
                error: error.clone(),
            });
            return CopyOutcome::unexpected(identifier.clone(), None, 0, error)
                .with_duration_ms(elapsed_ms());
        };

        let max_attempts = self.policy.attempts();
        let mut attempt = 1;

        loop {
            self.emit(CopyEvent::AttemptStarted {
                identifier: identifier.clone(),
                target: target.clone(),
                attempt,
                max_attempts,
            });

            let result = AssertUnwindSafe(self.primitive.copy(identifier.as_str(), &target))
                .catch_unwind()
                .await
                .unwrap_or_else(|payload| {
                    Err(CopyError::unexpected(format!(
                        "copy panicked: {}",
                        panic_message(payload.as_ref())
                    )))
                });

            match result {
                Ok(()) => {
                    self.emit(CopyEvent::Succeeded {
                        identifier: identifier.clone(),
                        target: target.clone(),
                        attempts: attempt,
                    });
                    return CopyOutcome::succeeded(identifier.clone(), target, attempt)
                        .with_duration_ms(elapsed_ms());
                }
                Err(err) if !err.is_retryable() => {
                    let error = err.detail();
                    self.emit(CopyEvent::Unexpected {
                        identifier: identifier.clone(),
                        error: error.clone(),
                    });
                    return CopyOutcome::unexpected(identifier.clone(), Some(target), attempt, error)
                        .with_duration_ms(elapsed_ms());
                }
                Err(err) => {
                    let error = err.detail();
                    self.emit(CopyEvent::AttemptFailed {
                        identifier: identifier.clone(),
                        target: target.clone(),
                        attempt,
                        error: error.clone(),
                    });

                    if attempt >= max_attempts {
                        self.emit(CopyEvent::GaveUp {
                            identifier: identifier.clone(),
                            attempts: attempt,
                            error: error.clone(),
                        });
                        return CopyOutcome::exhausted(identifier.clone(), target, attempt, error)
                            .with_duration_ms(elapsed_ms());
                    }

                    tokio::time::sleep(self.policy.delay_after(attempt)).await;
                    attempt += 1;
                }
            }
        }
    }

    fn emit(&self, event: CopyEvent) {
        self.observer.observe(&event);
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|message| (*message).to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "non-string panic payload".to_string())
}

impl std::fmt::Debug for CopyWorker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CopyWorker")
            .field("transform", &self.transform)
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}
