use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use common::TaskId;
use domain::{ExecutionResult, Task, TaskKind, TaskStatus};
use sqlx::PgPool;

use crate::error::{Result, StoreError};
use crate::postgres::decode_doc;
use crate::task::TaskStore;

/// PostgreSQL-backed task queue.
#[derive(Clone)]
pub struct PostgresTaskStore {
    pool: PgPool,
}

impl PostgresTaskStore {
    /// Creates a new PostgreSQL task store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl TaskStore for PostgresTaskStore {
    async fn save(&self, task: Task) -> Result<Task> {
        let doc = serde_json::to_value(&task)?;

        sqlx::query(
            r#"
            INSERT INTO tasks
                (id, kind, status, runs_at, remaining_tries, number_of_tries, last_tried_at, doc)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(task.id.as_uuid())
        .bind(task.kind().as_str())
        .bind(task.status.as_str())
        .bind(task.runs_at)
        .bind(task.remaining_tries)
        .bind(task.number_of_tries)
        .bind(task.last_tried_at)
        .bind(&doc)
        .execute(&self.pool)
        .await?;

        Ok(task)
    }

    async fn find(&self, id: TaskId) -> Result<Task> {
        let row = sqlx::query("SELECT doc FROM tasks WHERE id = $1")
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| StoreError::not_found("task", id))?;

        decode_doc(&row)
    }

    async fn claim_one_by_kind(&self, kind: TaskKind, now: DateTime<Utc>) -> Result<Task> {
        // One conditional write claims the least-retried, earliest-due
        // eligible row; SKIP LOCKED keeps concurrent workers from ever
        // holding the same task.
        let row = sqlx::query(
            r#"
            UPDATE tasks
            SET status = 'Running',
                last_tried_at = $2,
                number_of_tries = number_of_tries + 1,
                remaining_tries = remaining_tries - 1,
                doc = doc || jsonb_build_object(
                    'status', 'Running',
                    'last_tried_at', to_jsonb($2::timestamptz),
                    'number_of_tries', number_of_tries + 1,
                    'remaining_tries', remaining_tries - 1
                )
            WHERE id = (
                SELECT id FROM tasks
                WHERE status = 'Ready' AND kind = $1 AND runs_at <= $2
                ORDER BY number_of_tries ASC, runs_at ASC
                LIMIT 1
                FOR UPDATE SKIP LOCKED
            )
            RETURNING doc
            "#,
        )
        .bind(kind.as_str())
        .bind(now)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| StoreError::not_found("task", kind))?;

        decode_doc(&row)
    }

    async fn record_result(
        &self,
        id: TaskId,
        status: TaskStatus,
        result: ExecutionResult,
    ) -> Result<Task> {
        let result_json = serde_json::to_value(&result)?;
        let row = sqlx::query(
            r#"
            UPDATE tasks
            SET status = $2,
                doc = jsonb_set(
                    doc || jsonb_build_object('status', $2::text),
                    '{execution_results}',
                    (doc->'execution_results') || $3
                )
            WHERE id = $1
            RETURNING doc
            "#,
        )
        .bind(id.as_uuid())
        .bind(status.as_str())
        .bind(&result_json)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| StoreError::not_found("task", id))?;

        decode_doc(&row)
    }

    async fn retry(&self, stale_after: Duration) -> Result<u64> {
        let threshold = Utc::now() - stale_after;
        let updated = sqlx::query(
            r#"
            UPDATE tasks
            SET status = 'Ready',
                doc = doc || jsonb_build_object('status', 'Ready')
            WHERE status = 'Running' AND remaining_tries > 0 AND last_tried_at <= $1
            "#,
        )
        .bind(threshold)
        .execute(&self.pool)
        .await?;

        Ok(updated.rows_affected())
    }

    async fn abort_one(&self, stale_after: Duration) -> Result<Task> {
        let threshold = Utc::now() - stale_after;
        let row = sqlx::query(
            r#"
            UPDATE tasks
            SET status = 'Aborted',
                doc = doc || jsonb_build_object('status', 'Aborted')
            WHERE id = (
                SELECT id FROM tasks
                WHERE status = 'Running' AND remaining_tries = 0 AND last_tried_at <= $1
                LIMIT 1
                FOR UPDATE SKIP LOCKED
            )
            RETURNING doc
            "#,
        )
        .bind(threshold)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| StoreError::not_found("task", "abortable"))?;

        decode_doc(&row)
    }
}
