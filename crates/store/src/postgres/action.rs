use async_trait::async_trait;
use chrono::Utc;
use common::{ActionId, TransactionId};
use domain::{Action, ActionResult, ActionStatus};
use sqlx::PgPool;

use crate::action::ActionStore;
use crate::error::{Result, StoreError};
use crate::postgres::decode_doc;

/// PostgreSQL-backed action store.
#[derive(Clone)]
pub struct PostgresActionStore {
    pool: PgPool,
}

impl PostgresActionStore {
    /// Creates a new PostgreSQL action store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn finish(
        &self,
        id: ActionId,
        to: ActionStatus,
        result: Option<ActionResult>,
        error: Option<serde_json::Value>,
    ) -> Result<Action> {
        let mut current = self.find(id).await?;
        if current.status != ActionStatus::Active {
            return Err(StoreError::invalid_status("action", id, current.status));
        }

        current.status = to;
        current.result = result;
        current.error = error;
        current.end_date = Some(Utc::now());
        let doc = serde_json::to_value(&current)?;

        let updated = sqlx::query(
            r#"
            UPDATE actions
            SET status = $2, doc = $3
            WHERE id = $1 AND status = 'Active'
            "#,
        )
        .bind(id.as_uuid())
        .bind(to.as_str())
        .bind(&doc)
        .execute(&self.pool)
        .await?;

        if updated.rows_affected() == 0 {
            // Someone else terminated the action first.
            let row = self.find(id).await?;
            return Err(StoreError::invalid_status("action", id, row.status));
        }
        Ok(current)
    }
}

#[async_trait]
impl ActionStore for PostgresActionStore {
    async fn start(&self, action: Action) -> Result<Action> {
        let doc = serde_json::to_value(&action)?;

        sqlx::query(
            r#"
            INSERT INTO actions (id, kind, status, purpose_id, start_date, doc)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(action.id.as_uuid())
        .bind(action.kind.as_str())
        .bind(action.status.as_str())
        .bind(action.purpose.as_uuid())
        .bind(action.start_date)
        .bind(&doc)
        .execute(&self.pool)
        .await?;

        Ok(action)
    }

    async fn find(&self, id: ActionId) -> Result<Action> {
        let row = sqlx::query("SELECT doc FROM actions WHERE id = $1")
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| StoreError::not_found("action", id))?;

        decode_doc(&row)
    }

    async fn complete(&self, id: ActionId, result: ActionResult) -> Result<Action> {
        self.finish(id, ActionStatus::Completed, Some(result), None)
            .await
    }

    async fn cancel(&self, id: ActionId) -> Result<Action> {
        let mut current = self.find(id).await?;
        if !matches!(
            current.status,
            ActionStatus::Active | ActionStatus::Completed
        ) {
            return Err(StoreError::invalid_status("action", id, current.status));
        }

        let guard = current.status;
        // The result is kept so the external authorization can still be
        // reversed.
        current.status = ActionStatus::Canceled;
        current.end_date = Some(Utc::now());
        let doc = serde_json::to_value(&current)?;

        let updated = sqlx::query(
            r#"
            UPDATE actions
            SET status = 'Canceled', doc = $2
            WHERE id = $1 AND status = $3
            "#,
        )
        .bind(id.as_uuid())
        .bind(&doc)
        .bind(guard.as_str())
        .execute(&self.pool)
        .await?;

        if updated.rows_affected() == 0 {
            let row = self.find(id).await?;
            return Err(StoreError::invalid_status("action", id, row.status));
        }
        Ok(current)
    }

    async fn give_up(&self, id: ActionId, error: serde_json::Value) -> Result<Action> {
        self.finish(id, ActionStatus::Failed, None, Some(error))
            .await
    }

    async fn search_by_purpose(&self, purpose: TransactionId) -> Result<Vec<Action>> {
        let rows = sqlx::query(
            "SELECT doc FROM actions WHERE purpose_id = $1 ORDER BY start_date ASC",
        )
        .bind(purpose.as_uuid())
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(decode_doc).collect()
    }
}
