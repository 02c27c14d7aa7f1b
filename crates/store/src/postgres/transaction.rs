use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use common::TransactionId;
use domain::{
    Action, CustomerContact, PotentialActions, Transaction, TransactionKind, TransactionResult,
    TransactionStatus,
};
use sqlx::PgPool;

use crate::error::{Result, StoreError};
use crate::postgres::decode_doc;
use crate::transaction::TransactionStore;

/// PostgreSQL-backed transaction store.
#[derive(Clone)]
pub struct PostgresTransactionStore {
    pool: PgPool,
}

impl PostgresTransactionStore {
    /// Creates a new PostgreSQL transaction store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> std::result::Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("../../migrations").run(&self.pool).await
    }

    /// Re-reads a row after a conditional write matched nothing and maps
    /// the observed state onto the operation's outcome.
    async fn classify_lost_transition(
        &self,
        id: TransactionId,
        idempotent_status: TransactionStatus,
    ) -> Result<Transaction> {
        let row = self.find(id).await?;
        if row.status == idempotent_status {
            // First writer already won; the retry observes its result.
            Ok(row)
        } else if row.status == TransactionStatus::InProgress {
            Err(StoreError::Conflict(format!(
                "transaction {id} changed concurrently"
            )))
        } else {
            Err(StoreError::invalid_status("transaction", id, row.status))
        }
    }
}

#[async_trait]
impl TransactionStore for PostgresTransactionStore {
    async fn start(&self, transaction: Transaction) -> Result<Transaction> {
        let doc = serde_json::to_value(&transaction)?;
        let passport_token = transaction
            .object
            .passport
            .as_ref()
            .map(|passport| passport.token.clone());

        sqlx::query(
            r#"
            INSERT INTO transactions
                (id, kind, status, expires, task_export_status, tasks_exported_at, passport_token, start_date, doc)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(transaction.id.as_uuid())
        .bind(transaction.kind.as_str())
        .bind(transaction.status.as_str())
        .bind(transaction.expires)
        .bind(transaction.task_export_status.as_str())
        .bind(transaction.tasks_exported_at)
        .bind(&passport_token)
        .bind(transaction.start_date)
        .bind(&doc)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            // The partial unique index on passport_token rejects reuse.
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.constraint() == Some("uniq_transactions_passport_token")
            {
                return StoreError::already_in_use(
                    "transaction",
                    passport_token.as_deref().unwrap_or_default(),
                );
            }
            StoreError::Database(e)
        })?;

        Ok(transaction)
    }

    async fn find(&self, id: TransactionId) -> Result<Transaction> {
        let row = sqlx::query("SELECT doc FROM transactions WHERE id = $1")
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| StoreError::not_found("transaction", id))?;

        decode_doc(&row)
    }

    async fn set_customer_contact(
        &self,
        id: TransactionId,
        contact: CustomerContact,
    ) -> Result<Transaction> {
        let contact_json = serde_json::to_value(&contact)?;
        let row = sqlx::query(
            r#"
            UPDATE transactions
            SET doc = jsonb_set(doc, '{object,customer_contact}', $2)
            WHERE id = $1 AND status = 'InProgress'
            RETURNING doc
            "#,
        )
        .bind(id.as_uuid())
        .bind(&contact_json)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => decode_doc(&row),
            None => {
                let row = self.find(id).await?;
                Err(StoreError::invalid_status("transaction", id, row.status))
            }
        }
    }

    async fn confirm(
        &self,
        id: TransactionId,
        authorize_actions: Vec<Action>,
        result: TransactionResult,
        potential_actions: PotentialActions,
    ) -> Result<Transaction> {
        let mut current = self.find(id).await?;
        match current.status {
            TransactionStatus::InProgress => {}
            TransactionStatus::Confirmed => return Ok(current),
            status => return Err(StoreError::invalid_status("transaction", id, status)),
        }

        current.status = TransactionStatus::Confirmed;
        current.end_date = Some(Utc::now());
        current.object.authorize_actions = authorize_actions;
        current.result = Some(result);
        current.potential_actions = Some(potential_actions);
        let doc = serde_json::to_value(&current)?;

        let updated = sqlx::query(
            r#"
            UPDATE transactions
            SET status = 'Confirmed', doc = $2
            WHERE id = $1 AND status = 'InProgress'
            "#,
        )
        .bind(id.as_uuid())
        .bind(&doc)
        .execute(&self.pool)
        .await?;

        if updated.rows_affected() == 0 {
            return self
                .classify_lost_transition(id, TransactionStatus::Confirmed)
                .await;
        }
        Ok(current)
    }

    async fn cancel(&self, id: TransactionId) -> Result<Transaction> {
        let mut current = self.find(id).await?;
        match current.status {
            TransactionStatus::InProgress => {}
            TransactionStatus::Canceled => return Ok(current),
            status => return Err(StoreError::invalid_status("transaction", id, status)),
        }

        current.status = TransactionStatus::Canceled;
        current.end_date = Some(Utc::now());
        let doc = serde_json::to_value(&current)?;

        let updated = sqlx::query(
            r#"
            UPDATE transactions
            SET status = 'Canceled', doc = $2
            WHERE id = $1 AND status = 'InProgress'
            "#,
        )
        .bind(id.as_uuid())
        .bind(&doc)
        .execute(&self.pool)
        .await?;

        if updated.rows_affected() == 0 {
            return self
                .classify_lost_transition(id, TransactionStatus::Canceled)
                .await;
        }
        Ok(current)
    }

    async fn start_export_tasks(
        &self,
        kind: TransactionKind,
        status: TransactionStatus,
    ) -> Result<Option<Transaction>> {
        let now = Utc::now();
        let row = sqlx::query(
            r#"
            UPDATE transactions
            SET task_export_status = 'Exporting',
                tasks_exported_at = $3,
                doc = doc || jsonb_build_object(
                    'task_export_status', 'Exporting',
                    'tasks_exported_at', to_jsonb($3::timestamptz)
                )
            WHERE id = (
                SELECT id FROM transactions
                WHERE kind = $1 AND status = $2 AND task_export_status = 'Unexported'
                ORDER BY start_date ASC
                LIMIT 1
                FOR UPDATE SKIP LOCKED
            )
            RETURNING doc
            "#,
        )
        .bind(kind.as_str())
        .bind(status.as_str())
        .bind(now)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|row| decode_doc(&row)).transpose()
    }

    async fn mark_tasks_exported(&self, id: TransactionId) -> Result<()> {
        let now = Utc::now();
        let updated = sqlx::query(
            r#"
            UPDATE transactions
            SET task_export_status = 'Exported',
                tasks_exported_at = $2,
                doc = doc || jsonb_build_object(
                    'task_export_status', 'Exported',
                    'tasks_exported_at', to_jsonb($2::timestamptz)
                )
            WHERE id = $1
            "#,
        )
        .bind(id.as_uuid())
        .bind(now)
        .execute(&self.pool)
        .await?;

        if updated.rows_affected() == 0 {
            return Err(StoreError::not_found("transaction", id));
        }
        Ok(())
    }

    async fn reexport_tasks(&self, stale_after: Duration) -> Result<u64> {
        let threshold = Utc::now() - stale_after;
        let updated = sqlx::query(
            r#"
            UPDATE transactions
            SET task_export_status = 'Unexported',
                doc = doc || jsonb_build_object('task_export_status', 'Unexported')
            WHERE task_export_status = 'Exporting' AND tasks_exported_at <= $1
            "#,
        )
        .bind(threshold)
        .execute(&self.pool)
        .await?;

        Ok(updated.rows_affected())
    }

    async fn make_expired(&self, now: DateTime<Utc>) -> Result<u64> {
        let updated = sqlx::query(
            r#"
            UPDATE transactions
            SET status = 'Expired',
                doc = doc || jsonb_build_object(
                    'status', 'Expired',
                    'end_date', to_jsonb($1::timestamptz)
                )
            WHERE status = 'InProgress' AND expires <= $1
            "#,
        )
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(updated.rows_affected())
    }
}
