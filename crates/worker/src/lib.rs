//! Queue worker: polls the task queue and runs the periodic sweeps.
//!
//! One worker pass expires overdue transactions, exports task sets for
//! terminal transactions, executes every due task kind, and runs the
//! retry, abort, and re-export sweeps. All coordination with other
//! worker processes happens inside the stores; any number of workers can
//! run the same passes concurrently.

pub mod config;

pub use config::Config;

use domain::{TaskKind, TransactionKind, TransactionStatus};
use executor::{Dispatcher, TaskContext, TaskExecutor};

/// The terminal (kind, status) pairs whose task sets the worker exports.
const EXPORT_TARGETS: [(TransactionKind, TransactionStatus); 3] = [
    (TransactionKind::PlaceOrder, TransactionStatus::Confirmed),
    (TransactionKind::PlaceOrder, TransactionStatus::Canceled),
    (TransactionKind::PlaceOrder, TransactionStatus::Expired),
];

/// A polling worker over one task context.
pub struct Worker {
    context: TaskContext,
    executor: TaskExecutor,
    dispatcher: Dispatcher,
    config: Config,
}

impl Worker {
    /// Creates a worker over the given context.
    pub fn new(context: TaskContext, config: Config) -> Self {
        let executor = TaskExecutor::new(context.clone());
        let dispatcher = Dispatcher::new(
            context.transactions.clone(),
            context.tasks.clone(),
            context.notifications.clone(),
            config.operator_email.clone(),
        );
        Self {
            context,
            executor,
            dispatcher,
            config,
        }
    }

    /// Runs worker passes until the shutdown future resolves.
    pub async fn run<F>(self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        let mut ticker =
            tokio::time::interval(std::time::Duration::from_secs(self.config.poll_interval_secs));
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = ticker.tick() => self.run_once().await,
                () = &mut shutdown => {
                    tracing::info!("shutdown requested, stopping worker");
                    break;
                }
            }
        }
    }

    /// One full worker pass. Every step logs and absorbs its own
    /// failures so a flaky dependency never stops the remaining sweeps.
    pub async fn run_once(&self) {
        self.expire_transactions().await;
        self.export_task_sets().await;
        self.execute_due_tasks().await;
        self.run_sweeps().await;
    }

    async fn expire_transactions(&self) {
        match self
            .context
            .transactions
            .make_expired(chrono::Utc::now())
            .await
        {
            Ok(0) => {}
            Ok(count) => tracing::info!(count, "transactions expired"),
            Err(error) => tracing::warn!(%error, "expiry sweep failed"),
        }
    }

    async fn export_task_sets(&self) {
        for (kind, status) in EXPORT_TARGETS {
            loop {
                match self.dispatcher.export_tasks(kind, status).await {
                    Ok(Some(_)) => continue,
                    Ok(None) => break,
                    Err(error) => {
                        tracing::warn!(%kind, %status, %error, "task export failed");
                        break;
                    }
                }
            }
        }
    }

    async fn execute_due_tasks(&self) {
        for kind in TaskKind::ALL {
            loop {
                match self.executor.execute_by_kind(kind).await {
                    Ok(Some(_)) => continue,
                    Ok(None) => break,
                    Err(error) => {
                        tracing::warn!(%kind, %error, "task execution pass failed");
                        break;
                    }
                }
            }
        }
    }

    async fn run_sweeps(&self) {
        match self.context.tasks.retry(self.config.task_retry_after()).await {
            Ok(0) => {}
            Ok(count) => tracing::info!(count, "stale task leases reclaimed"),
            Err(error) => tracing::warn!(%error, "retry sweep failed"),
        }

        loop {
            match self
                .dispatcher
                .abort_one_and_report(self.config.task_abort_after())
                .await
            {
                Ok(Some(_)) => continue,
                Ok(None) => break,
                Err(error) => {
                    tracing::warn!(%error, "abort sweep failed");
                    break;
                }
            }
        }

        match self
            .context
            .transactions
            .reexport_tasks(self.config.reexport_after())
            .await
        {
            Ok(0) => {}
            Ok(count) => tracing::info!(count, "stale task exports reclaimed"),
            Err(error) => tracing::warn!(%error, "re-export sweep failed"),
        }
    }
}
