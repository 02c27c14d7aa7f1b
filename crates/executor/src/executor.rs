//! Claiming and executing tasks.

use chrono::Utc;
use domain::{ExecutionResult, Task, TaskKind, TaskStatus};
use store::StoreError;

use crate::context::TaskContext;
use crate::error::Result;
use crate::handlers;

/// Works the task queue: claims one task at a time and dispatches it to
/// the handler for its kind.
///
/// Any number of executors may run concurrently; the claim in the task
/// store is the only coordination between them.
pub struct TaskExecutor {
    context: TaskContext,
}

impl TaskExecutor {
    /// Creates a new executor over the given context.
    pub fn new(context: TaskContext) -> Self {
        Self { context }
    }

    /// Claims and executes one task of the given kind.
    ///
    /// Returns `None` when nothing is eligible: the idle outcome of a
    /// cooperative poll, not an error.
    #[tracing::instrument(skip(self))]
    pub async fn execute_by_kind(&self, kind: TaskKind) -> Result<Option<Task>> {
        let task = match self.context.tasks.claim_one_by_kind(kind, Utc::now()).await {
            Ok(task) => task,
            Err(StoreError::NotFound { .. }) => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        Ok(Some(self.execute(task).await?))
    }

    /// Executes a claimed task and records the attempt.
    ///
    /// Handler success marks the task `Executed`. Handler failure appends
    /// the error and leaves the task `Running`: the retry and abort
    /// sweeps govern its fate, the failure never propagates out of the
    /// executor.
    pub async fn execute(&self, task: Task) -> Result<Task> {
        metrics::counter!("task_executions_total").increment(1);
        let started = std::time::Instant::now();

        let (status, result) = match handlers::dispatch(&self.context, &task.payload).await {
            Ok(()) => (TaskStatus::Executed, ExecutionResult::success()),
            Err(error) => {
                metrics::counter!("task_execution_failures_total").increment(1);
                tracing::warn!(
                    task_id = %task.id,
                    kind = %task.kind(),
                    %error,
                    "task execution failed"
                );
                (TaskStatus::Running, ExecutionResult::failure(error.to_string()))
            }
        };

        let recorded = self.context.tasks.record_result(task.id, status, result).await?;
        metrics::histogram!("task_execution_seconds").record(started.elapsed().as_secs_f64());
        Ok(recorded)
    }
}
