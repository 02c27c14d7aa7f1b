use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use common::TaskId;
use domain::{ExecutionResult, Task, TaskKind, TaskStatus};

use crate::Result;

/// Port for the durable task queue.
///
/// Claiming is the only coordination workers need: the conditional write
/// behind `claim_one_by_kind` guarantees that no two workers hold the
/// same task, and a worker that finds nothing simply moves on. Leases are
/// time-boxed by `last_tried_at`; the retry and abort sweeps reclaim or
/// terminate them.
#[async_trait]
pub trait TaskStore: Send + Sync {
    /// Inserts a new task.
    async fn save(&self, task: Task) -> Result<Task>;

    /// Retrieves a task by ID.
    async fn find(&self, id: TaskId) -> Result<Task>;

    /// Claims one ready, due task of the given kind: CAS
    /// {`Ready`, runs_at ≤ now} → {`Running`, last_tried_at = now,
    /// number_of_tries + 1, remaining_tries − 1}.
    ///
    /// Among eligible rows the least-retried, earliest-due task wins.
    /// No eligible row ⇒ `NotFound`; callers treat that as an idle poll.
    async fn claim_one_by_kind(&self, kind: TaskKind, now: DateTime<Utc>) -> Result<Task>;

    /// Appends an execution result and sets the task's status: `Executed`
    /// on success, left `Running` on failure so the sweeps govern its
    /// fate.
    async fn record_result(
        &self,
        id: TaskId,
        status: TaskStatus,
        result: ExecutionResult,
    ) -> Result<Task>;

    /// Reclaims expired leases: bulk CAS `Running` rows with tries
    /// remaining whose `last_tried_at` is older than `stale_after` back
    /// to `Ready`. Returns the number of rows reclaimed.
    async fn retry(&self, stale_after: Duration) -> Result<u64>;

    /// Terminates one exhausted lease: CAS a `Running` row with no tries
    /// remaining and a `last_tried_at` older than `stale_after` to
    /// `Aborted`, returning it for operator alerting. None eligible ⇒
    /// `NotFound`.
    async fn abort_one(&self, stale_after: Duration) -> Result<Task>;
}
