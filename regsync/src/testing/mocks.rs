//! Scripted copy primitives for testing.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use crate::copy::CopyPrimitive;
use crate::errors::CopyError;

/// A copy primitive whose results follow a script.
///
/// By default each source fails a fixed number of times and then succeeds.
/// Individual sources can be made to fail forever, to raise an unexpected
/// error or to panic. Concurrency is tracked so pool bounds can be checked.
#[derive(Debug, Default)]
pub struct ScriptedCopier {
    /// Failures per source before success; `None` fails forever.
    failures_before_success: Option<usize>,
    always_fail: HashSet<String>,
    unexpected: HashSet<String>,
    /// Source to the call number that panics.
    panicking: HashMap<String, usize>,
    delay: Duration,
    calls: Mutex<Vec<(String, String)>>,
    per_source: Mutex<HashMap<String, usize>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl ScriptedCopier {
    /// Every copy succeeds on the first attempt.
    #[must_use]
    pub fn always_succeeding() -> Self {
        Self::failing_times(0)
    }

    /// Every copy fails on every attempt.
    #[must_use]
    pub fn always_failing() -> Self {
        Self {
            failures_before_success: None,
            ..Self::default()
        }
    }

    /// Each source fails `n` times, then succeeds.
    #[must_use]
    pub fn failing_times(n: usize) -> Self {
        Self {
            failures_before_success: Some(n),
            ..Self::default()
        }
    }

    /// Makes `source` fail on every attempt.
    #[must_use]
    pub fn with_failing_source(mut self, source: impl Into<String>) -> Self {
        self.always_fail.insert(source.into());
        self
    }

    /// Makes `source` raise an unexpected error.
    #[must_use]
    pub fn with_unexpected_source(mut self, source: impl Into<String>) -> Self {
        self.unexpected.insert(source.into());
        self
    }

    /// Makes the `on_call`-th copy of `source` panic.
    #[must_use]
    pub fn with_panicking_source(mut self, source: impl Into<String>, on_call: usize) -> Self {
        self.panicking.insert(source.into(), on_call);
        self
    }

    /// Makes each call take `delay`.
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Total number of calls.
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    /// Calls made for one source.
    #[must_use]
    pub fn calls_for(&self, source: &str) -> usize {
        self.per_source.lock().get(source).copied().unwrap_or(0)
    }

    /// Every `(source, destination)` pair, in call order.
    #[must_use]
    pub fn recorded_calls(&self) -> Vec<(String, String)> {
        self.calls.lock().clone()
    }

    /// Highest number of copies that were running at once.
    #[must_use]
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CopyPrimitive for ScriptedCopier {
    async fn copy(&self, source: &str, destination: &str) -> Result<(), CopyError> {
        let running = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(running, Ordering::SeqCst);

        self.calls
            .lock()
            .push((source.to_string(), destination.to_string()));
        let call_number = {
            let mut per_source = self.per_source.lock();
            let count = per_source.entry(source.to_string()).or_insert(0);
            *count += 1;
            *count
        };

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.panicking.get(source) == Some(&call_number) {
            panic!("scripted panic for {source}");
        }

        if self.unexpected.contains(source) {
            return Err(CopyError::unexpected(format!("scripted unexpected error for {source}")));
        }
        if self.always_fail.contains(source) {
            return Err(CopyError::failed(Some(1), format!("scripted failure for {source}")));
        }
        match self.failures_before_success {
            Some(n) if call_number > n => Ok(()),
            _ => Err(CopyError::failed(
                Some(1),
                format!("scripted failure {call_number} for {source}"),
            )),
        }
    }
}
