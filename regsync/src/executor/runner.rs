//! The bounded worker pool.

use chrono::Utc;
use futures::future::join_all;
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::cancellation::CancellationToken;
use crate::config::MigrationConfig;
use crate::copy::{CopyPrimitive, CopyWorker};
use crate::core::{ArtifactIdentifier, CopyOutcome, MigrationReport};
use crate::events::CopyObserver;
use crate::reconcile::MigrationWorkList;

/// Runs copy workers over a work list with at most `concurrency` in flight.
#[derive(Debug, Clone)]
pub struct MigrationExecutor {
    worker: CopyWorker,
    concurrency: usize,
    cancel_token: Arc<CancellationToken>,
}

impl MigrationExecutor {
    /// Creates an executor. A concurrency of zero is treated as one.
    #[must_use]
    pub fn new(worker: CopyWorker, concurrency: usize) -> Self {
        Self {
            worker,
            concurrency: concurrency.max(1),
            cancel_token: Arc::new(CancellationToken::new()),
        }
    }

    /// Builds the executor described by `config` around `primitive`.
    #[must_use]
    pub fn from_config(config: &MigrationConfig, primitive: Arc<dyn CopyPrimitive>) -> Self {
        let worker = CopyWorker::new(primitive, config.destination_transform(), config.retry.clone());
        Self::new(worker, config.pool_size())
    }

    /// Shares an externally owned cancellation token.
    #[must_use]
    pub fn with_cancel_token(mut self, token: Arc<CancellationToken>) -> Self {
        self.cancel_token = token;
        self
    }

    /// Attaches an observer to every copy the executor runs.
    #[must_use]
    pub fn with_observer(mut self, observer: Arc<dyn CopyObserver>) -> Self {
        self.worker = self.worker.with_observer(observer);
        self
    }

    /// The token that stops dispatch when cancelled.
    #[must_use]
    pub fn cancel_token(&self) -> &Arc<CancellationToken> {
        &self.cancel_token
    }

    /// Effective pool size.
    #[must_use]
    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// The worker every task shares.
    #[must_use]
    pub fn worker(&self) -> &CopyWorker {
        &self.worker
    }

    /// Migrates every entry of `work_list`.
    ///
    /// Each artifact is processed exactly once. Outcomes are recorded in
    /// completion order. Once the token is cancelled no further artifacts
    /// start; in-flight copies finish and the rest are reported as not
    /// attempted.
    pub async fn run(&self, work_list: &MigrationWorkList) -> MigrationReport {
        let run_id = Uuid::now_v7();
        let started_at = Utc::now();
        let items = MigrationWorkList::new(work_list.iter().cloned());

        info!(
            %run_id,
            total = items.len(),
            concurrency = self.concurrency,
            max_attempts = self.worker.policy().attempts(),
            "Starting migration"
        );

        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        let results: Arc<Mutex<Vec<CopyOutcome>>> = Arc::new(Mutex::new(Vec::with_capacity(items.len())));
        let mut tasks: Vec<(ArtifactIdentifier, JoinHandle<()>)> = Vec::with_capacity(items.len());
        let mut not_attempted = Vec::new();

        let mut pending = items.iter();
        while let Some(identifier) = pending.next() {
            let permit = tokio::select! {
                biased;
                () = self.cancel_token.cancelled() => None,
                permit = semaphore.clone().acquire_owned() => permit.ok(),
            };
            let Some(permit) = permit else {
                not_attempted.push(identifier.clone());
                not_attempted.extend(pending.by_ref().cloned());
                break;
            };

            let worker = self.worker.clone();
            let results = results.clone();
            let task_identifier = identifier.clone();
            let handle = tokio::spawn(async move {
                let outcome = worker.copy(&task_identifier).await;
                results.lock().push(outcome);
                drop(permit);
            });
            tasks.push((identifier.clone(), handle));
        }

        let (identifiers, handles): (Vec<_>, Vec<_>) = tasks.into_iter().unzip();
        for (identifier, joined) in identifiers.into_iter().zip(join_all(handles).await) {
            if let Err(join_error) = joined {
                error!("Worker task for {} failed: {}", identifier, join_error);
                // The worker catches primitive panics itself; a task lost here
                // never reported how many attempts it made.
                let target = self.worker.transform().apply(&identifier);
                results.lock().push(CopyOutcome::unexpected(
                    identifier,
                    target,
                    0,
                    format!("worker task failed: {join_error}"),
                ));
            }
        }

        let outcomes = std::mem::take(&mut *results.lock());
        let cancelled = self.cancel_token.is_cancelled();
        let report = MigrationReport {
            run_id,
            started_at,
            finished_at: Utc::now(),
            outcomes,
            not_attempted,
            cancelled,
        };

        let summary = report.summary();
        if cancelled {
            warn!(
                reason = self.cancel_token.reason().unwrap_or_default(),
                not_attempted = summary.not_attempted,
                "Migration cancelled"
            );
        }
        if summary.failed > 0 {
            error!("{} of {} artifacts failed to migrate", summary.failed, summary.total);
        }
        info!(%run_id, duration_ms = report.duration_ms(), "Migration complete: {summary}");
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::copy::RetryPolicy;
    use crate::core::{CopyStatus, DestinationTransform};
    use crate::errors::CopyError;
    use crate::events::{CopyEvent, CopyObserver};
    use crate::testing::ScriptedCopier;
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;
    use std::collections::HashSet;
    use std::time::Duration;

    fn work_list(raw: &[&str]) -> MigrationWorkList {
        raw.iter().map(|s| s.parse::<ArtifactIdentifier>().unwrap()).collect()
    }

    fn executor(primitive: Arc<dyn CopyPrimitive>, attempts: u32, concurrency: usize) -> MigrationExecutor {
        let worker = CopyWorker::new(
            primitive,
            DestinationTransform::new("repo", "dst/target"),
            RetryPolicy::fixed(attempts, Duration::ZERO),
        );
        MigrationExecutor::new(worker, concurrency)
    }

    #[tokio::test]
    async fn test_every_artifact_processed_once() {
        let raw: Vec<String> = (0..25).map(|i| format!("repo/app:{i}")).collect();
        let refs: Vec<&str> = raw.iter().map(String::as_str).collect();
        let copier = Arc::new(ScriptedCopier::always_succeeding());

        let report = executor(copier.clone(), 3, 4).run(&work_list(&refs)).await;

        assert_eq!(report.outcomes.len(), 25);
        let seen: HashSet<_> = report.outcomes.iter().map(|o| o.identifier.clone()).collect();
        assert_eq!(seen.len(), 25);
        assert_eq!(copier.call_count(), 25);
        assert!(report.not_attempted.is_empty());
        assert!(!report.cancelled);
    }

    #[tokio::test]
    async fn test_concurrency_is_bounded() {
        let raw: Vec<String> = (0..12).map(|i| format!("repo/app:{i}")).collect();
        let refs: Vec<&str> = raw.iter().map(String::as_str).collect();
        let copier = Arc::new(ScriptedCopier::always_succeeding().with_delay(Duration::from_millis(15)));

        let report = executor(copier.clone(), 1, 3).run(&work_list(&refs)).await;

        assert_eq!(report.summary().succeeded, 12);
        assert!(copier.max_in_flight() <= 3);
        assert!(copier.max_in_flight() >= 1);
    }

    #[tokio::test]
    async fn test_zero_concurrency_treated_as_one() {
        let copier = Arc::new(ScriptedCopier::always_succeeding().with_delay(Duration::from_millis(5)));
        let executor = executor(copier.clone(), 1, 0);
        assert_eq!(executor.concurrency(), 1);

        let report = executor.run(&work_list(&["repo/a:1", "repo/b:1", "repo/c:1"])).await;
        assert_eq!(report.outcomes.len(), 3);
        assert_eq!(copier.max_in_flight(), 1);
    }

    #[tokio::test]
    async fn test_single_success_summary() {
        let copier = Arc::new(ScriptedCopier::always_succeeding());
        let report = executor(copier.clone(), 3, 5).run(&work_list(&["repo/app:2.0"])).await;

        assert_eq!(report.summary().to_string(), "1 succeeded, 0 failed");
        assert_eq!(
            copier.recorded_calls(),
            vec![("repo/app:2.0".to_string(), "dst/target/app:2.0".to_string())]
        );
    }

    #[tokio::test]
    async fn test_single_exhausted_summary() {
        let copier = Arc::new(ScriptedCopier::always_failing());
        let report = executor(copier, 2, 5).run(&work_list(&["repo/app:2.0"])).await;

        assert_eq!(report.summary().to_string(), "0 succeeded, 1 failed");
        let outcome = &report.outcomes[0];
        assert_eq!(outcome.status, CopyStatus::FailedExhausted);
        assert_eq!(outcome.attempts, 2);
    }

    #[tokio::test]
    async fn test_failures_do_not_stop_the_run() {
        let copier = Arc::new(
            ScriptedCopier::always_succeeding()
                .with_failing_source("repo/bad:1")
                .with_unexpected_source("repo/odd:1"),
        );
        let report = executor(copier.clone(), 3, 2)
            .run(&work_list(&["repo/bad:1", "repo/good:1", "repo/odd:1", "repo/fine:1"]))
            .await;

        let summary = report.summary();
        assert_eq!(summary.succeeded, 2);
        assert_eq!(summary.failed, 2);
        assert_eq!(copier.calls_for("repo/bad:1"), 3);
        assert_eq!(copier.calls_for("repo/odd:1"), 1);
        assert_eq!(
            report.remaining(),
            vec!["repo/bad:1".parse().unwrap(), "repo/odd:1".parse::<ArtifactIdentifier>().unwrap()]
        );
    }

    #[tokio::test]
    async fn test_duplicates_copied_once() {
        let copier = Arc::new(ScriptedCopier::always_succeeding());
        let list = MigrationWorkList::new(
            ["repo/a:1", "repo/a:1", "repo/b:1"]
                .iter()
                .map(|s| s.parse::<ArtifactIdentifier>().unwrap()),
        );

        let report = executor(copier.clone(), 1, 2).run(&list).await;
        assert_eq!(report.outcomes.len(), 2);
        assert_eq!(copier.calls_for("repo/a:1"), 1);
    }

    #[tokio::test]
    async fn test_cancelled_before_start_attempts_nothing() {
        let copier = Arc::new(ScriptedCopier::always_succeeding());
        let executor = executor(copier.clone(), 1, 2);
        executor.cancel_token().cancel("interrupted");

        let report = executor.run(&work_list(&["repo/a:1", "repo/b:1"])).await;

        assert!(report.cancelled);
        assert!(report.outcomes.is_empty());
        assert_eq!(report.not_attempted.len(), 2);
        assert_eq!(copier.call_count(), 0);
        assert_eq!(report.summary().to_string(), "0 succeeded, 0 failed, 2 not attempted");
    }

    /// Cancels the shared token from inside the first copy.
    struct CancellingCopier {
        token: Arc<CancellationToken>,
    }

    #[async_trait]
    impl CopyPrimitive for CancellingCopier {
        async fn copy(&self, _source: &str, _destination: &str) -> Result<(), CopyError> {
            self.token.cancel("interrupted");
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_cancel_mid_run_finishes_in_flight_and_skips_rest() {
        let token = Arc::new(CancellationToken::new());
        let copier = Arc::new(CancellingCopier { token: token.clone() });
        let executor = executor(copier, 1, 1).with_cancel_token(token);

        let report = executor
            .run(&work_list(&["repo/a:1", "repo/b:1", "repo/c:1", "repo/d:1"]))
            .await;

        assert!(report.cancelled);
        assert_eq!(report.outcomes.len(), 1);
        assert!(report.outcomes[0].is_success());
        assert_eq!(report.outcomes[0].identifier.as_str(), "repo/a:1");
        let skipped: Vec<_> = report.not_attempted.iter().map(ArtifactIdentifier::as_str).collect();
        assert_eq!(skipped, vec!["repo/b:1", "repo/c:1", "repo/d:1"]);
    }

    #[tokio::test]
    async fn test_empty_work_list() {
        let copier = Arc::new(ScriptedCopier::always_succeeding());
        let report = executor(copier, 1, 3).run(&MigrationWorkList::default()).await;

        assert_eq!(report.summary().total, 0);
        assert!(report.summary().is_clean());
    }

    #[tokio::test]
    async fn test_panicking_copy_fails_only_that_artifact() {
        let copier = Arc::new(
            ScriptedCopier::always_succeeding().with_panicking_source("repo/boom:1", 1),
        );

        let report = executor(copier.clone(), 3, 2)
            .run(&work_list(&["repo/a:1", "repo/boom:1", "repo/c:1"]))
            .await;

        assert_eq!(report.summary().to_string(), "2 succeeded, 1 failed");
        let boom = report
            .outcomes
            .iter()
            .find(|o| o.identifier.as_str() == "repo/boom:1")
            .unwrap();
        assert_eq!(boom.status, CopyStatus::FailedUnexpected);
        assert_eq!(boom.attempts, 1);
        assert_eq!(boom.target.as_deref(), Some("dst/target/boom:1"));
        assert_eq!(
            boom.last_error.as_deref(),
            Some("copy panicked: scripted panic for repo/boom:1")
        );
        assert_eq!(copier.calls_for("repo/boom:1"), 1);
    }

    /// Panics while handling the success event for one artifact.
    struct PanicOnSuccess(&'static str);

    impl CopyObserver for PanicOnSuccess {
        fn observe(&self, event: &CopyEvent) {
            let succeeded = matches!(event, CopyEvent::Succeeded { .. });
            if succeeded && event.identifier().as_str() == self.0 {
                panic!("observer failed");
            }
        }
    }

    #[tokio::test]
    async fn test_lost_worker_task_is_recorded_unexpected() {
        let copier = Arc::new(ScriptedCopier::always_succeeding());
        let executor = executor(copier, 1, 2).with_observer(Arc::new(PanicOnSuccess("repo/boom:1")));

        let report = executor.run(&work_list(&["repo/a:1", "repo/boom:1"])).await;

        assert_eq!(report.outcomes.len(), 2);
        let boom = report
            .outcomes
            .iter()
            .find(|o| o.identifier.as_str() == "repo/boom:1")
            .unwrap();
        assert_eq!(boom.status, CopyStatus::FailedUnexpected);
        assert_eq!(boom.attempts, 0);
        assert!(boom.last_error.as_deref().unwrap().starts_with("worker task failed"));
        assert_eq!(report.summary().succeeded, 1);
    }
}
