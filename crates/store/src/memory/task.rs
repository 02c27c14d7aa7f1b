use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use common::TaskId;
use domain::{ExecutionResult, Task, TaskKind, TaskStatus};
use tokio::sync::RwLock;

use crate::error::{Result, StoreError};
use crate::task::TaskStore;

/// In-memory task queue.
#[derive(Clone, Default)]
pub struct InMemoryTaskStore {
    rows: Arc<RwLock<HashMap<TaskId, Task>>>,
}

impl InMemoryTaskStore {
    /// Creates a new empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns every stored task, unordered.
    pub async fn all(&self) -> Vec<Task> {
        self.rows.read().await.values().cloned().collect()
    }

    /// Returns every task of the given kind, unordered.
    pub async fn all_by_kind(&self, kind: TaskKind) -> Vec<Task> {
        self.rows
            .read()
            .await
            .values()
            .filter(|task| task.kind() == kind)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl TaskStore for InMemoryTaskStore {
    async fn save(&self, task: Task) -> Result<Task> {
        let mut rows = self.rows.write().await;
        rows.insert(task.id, task.clone());
        Ok(task)
    }

    async fn find(&self, id: TaskId) -> Result<Task> {
        let rows = self.rows.read().await;
        rows.get(&id)
            .cloned()
            .ok_or_else(|| StoreError::not_found("task", id))
    }

    async fn claim_one_by_kind(&self, kind: TaskKind, now: DateTime<Utc>) -> Result<Task> {
        let mut rows = self.rows.write().await;

        let candidate = rows
            .values_mut()
            .filter(|task| {
                task.status == TaskStatus::Ready && task.kind() == kind && task.runs_at <= now
            })
            .min_by_key(|task| (task.number_of_tries, task.runs_at));

        let task = candidate.ok_or_else(|| StoreError::not_found("task", kind))?;
        task.status = TaskStatus::Running;
        task.last_tried_at = Some(now);
        task.number_of_tries += 1;
        task.remaining_tries -= 1;
        Ok(task.clone())
    }

    async fn record_result(
        &self,
        id: TaskId,
        status: TaskStatus,
        result: ExecutionResult,
    ) -> Result<Task> {
        let mut rows = self.rows.write().await;
        let task = rows
            .get_mut(&id)
            .ok_or_else(|| StoreError::not_found("task", id))?;

        task.execution_results.push(result);
        task.status = status;
        Ok(task.clone())
    }

    async fn retry(&self, stale_after: Duration) -> Result<u64> {
        let threshold = Utc::now() - stale_after;
        let mut rows = self.rows.write().await;

        let mut reclaimed = 0;
        for task in rows.values_mut() {
            if task.status == TaskStatus::Running
                && task.remaining_tries > 0
                && task.last_tried_at.is_some_and(|at| at <= threshold)
            {
                task.status = TaskStatus::Ready;
                reclaimed += 1;
            }
        }
        Ok(reclaimed)
    }

    async fn abort_one(&self, stale_after: Duration) -> Result<Task> {
        let threshold = Utc::now() - stale_after;
        let mut rows = self.rows.write().await;

        let task = rows
            .values_mut()
            .find(|task| {
                task.status == TaskStatus::Running
                    && task.remaining_tries == 0
                    && task.last_tried_at.is_some_and(|at| at <= threshold)
            })
            .ok_or_else(|| StoreError::not_found("task", "abortable"))?;

        task.status = TaskStatus::Aborted;
        Ok(task.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::TransactionId;
    use domain::TaskPayload;

    fn ready_task(runs_at: DateTime<Utc>, remaining_tries: i32) -> Task {
        Task::new(
            TaskPayload::CreateOrder {
                transaction_id: TransactionId::new(),
            },
            runs_at,
            remaining_tries,
        )
    }

    #[tokio::test]
    async fn claim_updates_lease_bookkeeping() {
        let store = InMemoryTaskStore::new();
        let task = store.save(ready_task(Utc::now(), 10)).await.unwrap();

        let claimed = store
            .claim_one_by_kind(TaskKind::CreateOrder, Utc::now())
            .await
            .unwrap();
        assert_eq!(claimed.id, task.id);
        assert_eq!(claimed.status, TaskStatus::Running);
        assert_eq!(claimed.number_of_tries, 1);
        assert_eq!(claimed.remaining_tries, 9);
        assert!(claimed.last_tried_at.is_some());
    }

    #[tokio::test]
    async fn claim_skips_future_and_running_tasks() {
        let store = InMemoryTaskStore::new();
        store
            .save(ready_task(Utc::now() + Duration::hours(1), 10))
            .await
            .unwrap();

        let result = store.claim_one_by_kind(TaskKind::CreateOrder, Utc::now()).await;
        assert!(matches!(result, Err(StoreError::NotFound { .. })));

        store.save(ready_task(Utc::now(), 10)).await.unwrap();
        store
            .claim_one_by_kind(TaskKind::CreateOrder, Utc::now())
            .await
            .unwrap();
        let result = store.claim_one_by_kind(TaskKind::CreateOrder, Utc::now()).await;
        assert!(matches!(result, Err(StoreError::NotFound { .. })));
    }

    #[tokio::test]
    async fn claim_prefers_least_retried_then_earliest_due() {
        let store = InMemoryTaskStore::new();
        let now = Utc::now();

        let mut retried = ready_task(now - Duration::minutes(10), 8);
        retried.number_of_tries = 2;
        let retried = store.save(retried).await.unwrap();
        let fresh_late = store
            .save(ready_task(now - Duration::minutes(1), 10))
            .await
            .unwrap();
        let fresh_early = store
            .save(ready_task(now - Duration::minutes(5), 10))
            .await
            .unwrap();

        let first = store.claim_one_by_kind(TaskKind::CreateOrder, now).await.unwrap();
        assert_eq!(first.id, fresh_early.id);
        let second = store.claim_one_by_kind(TaskKind::CreateOrder, now).await.unwrap();
        assert_eq!(second.id, fresh_late.id);
        let third = store.claim_one_by_kind(TaskKind::CreateOrder, now).await.unwrap();
        assert_eq!(third.id, retried.id);
    }

    #[tokio::test]
    async fn concurrent_claims_never_share_a_task() {
        let store = InMemoryTaskStore::new();
        for _ in 0..5 {
            store.save(ready_task(Utc::now(), 10)).await.unwrap();
        }

        let mut handles = Vec::new();
        for _ in 0..20 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store.claim_one_by_kind(TaskKind::CreateOrder, Utc::now()).await
            }));
        }

        let mut claimed = Vec::new();
        for handle in handles {
            if let Ok(task) = handle.await.unwrap() {
                claimed.push(task.id.to_string());
            }
        }
        claimed.sort();
        claimed.dedup();
        assert_eq!(claimed.len(), 5);
    }

    #[tokio::test]
    async fn record_result_appends_and_sets_status() {
        let store = InMemoryTaskStore::new();
        let task = store.save(ready_task(Utc::now(), 10)).await.unwrap();
        store
            .claim_one_by_kind(TaskKind::CreateOrder, Utc::now())
            .await
            .unwrap();

        let failed = store
            .record_result(
                task.id,
                TaskStatus::Running,
                ExecutionResult::failure("gateway down"),
            )
            .await
            .unwrap();
        assert_eq!(failed.status, TaskStatus::Running);
        assert_eq!(failed.execution_results.len(), 1);

        let executed = store
            .record_result(task.id, TaskStatus::Executed, ExecutionResult::success())
            .await
            .unwrap();
        assert_eq!(executed.status, TaskStatus::Executed);
        assert_eq!(executed.execution_results.len(), 2);
    }

    #[tokio::test]
    async fn retry_only_reclaims_stale_leases_with_tries_left() {
        let store = InMemoryTaskStore::new();
        let with_tries = store.save(ready_task(Utc::now(), 2)).await.unwrap();
        let exhausted = store.save(ready_task(Utc::now(), 1)).await.unwrap();
        store
            .claim_one_by_kind(TaskKind::CreateOrder, Utc::now())
            .await
            .unwrap();
        store
            .claim_one_by_kind(TaskKind::CreateOrder, Utc::now())
            .await
            .unwrap();

        // Neither lease is stale yet.
        assert_eq!(store.retry(Duration::minutes(10)).await.unwrap(), 0);

        // Only the task with tries remaining goes back to Ready.
        assert_eq!(store.retry(Duration::zero()).await.unwrap(), 1);
        let with_tries = store.find(with_tries.id).await.unwrap();
        assert_eq!(with_tries.status, TaskStatus::Ready);
        let exhausted = store.find(exhausted.id).await.unwrap();
        assert_eq!(exhausted.status, TaskStatus::Running);
    }

    #[tokio::test]
    async fn abort_one_only_terminates_exhausted_stale_leases() {
        let store = InMemoryTaskStore::new();
        let exhausted = store.save(ready_task(Utc::now(), 1)).await.unwrap();
        let with_tries = store.save(ready_task(Utc::now(), 5)).await.unwrap();
        store
            .claim_one_by_kind(TaskKind::CreateOrder, Utc::now())
            .await
            .unwrap();
        store
            .claim_one_by_kind(TaskKind::CreateOrder, Utc::now())
            .await
            .unwrap();

        let aborted = store.abort_one(Duration::zero()).await.unwrap();
        assert_eq!(aborted.id, exhausted.id);
        assert_eq!(aborted.status, TaskStatus::Aborted);

        // The task with tries remaining is not abortable.
        let result = store.abort_one(Duration::zero()).await;
        assert!(matches!(result, Err(StoreError::NotFound { .. })));
        let with_tries = store.find(with_tries.id).await.unwrap();
        assert_eq!(with_tries.status, TaskStatus::Running);
    }
}
