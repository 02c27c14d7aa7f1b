//! Deriving task sets from terminal transactions.

use std::sync::Arc;

use chrono::{Duration, Utc};
use common::TransactionId;
use domain::{
    CompensationData, EmailMessage, Task, TaskPayload, TransactionKind, TransactionStatus,
};
use saga::services::NotificationSender;
use store::{StoreError, TaskStore, TransactionStore};

use crate::error::{ExecutorError, Result};
use crate::DEFAULT_REMAINING_TRIES;

/// Converts terminal transactions into their task sets and runs the
/// abort sweep.
pub struct Dispatcher {
    transactions: Arc<dyn TransactionStore>,
    tasks: Arc<dyn TaskStore>,
    notifications: Arc<dyn NotificationSender>,
    /// Recipient of abort alerts.
    operator_email: String,
}

impl Dispatcher {
    /// Creates a new dispatcher.
    pub fn new(
        transactions: Arc<dyn TransactionStore>,
        tasks: Arc<dyn TaskStore>,
        notifications: Arc<dyn NotificationSender>,
        operator_email: impl Into<String>,
    ) -> Self {
        Self {
            transactions,
            tasks,
            notifications,
            operator_email: operator_email.into(),
        }
    }

    /// Claims one unexported terminal transaction of the given kind and
    /// status and exports its task set.
    ///
    /// Returns the transaction exported, or `None` when no transaction
    /// was eligible. Concurrent exporters race on the claim; exactly one
    /// wins per transaction.
    #[tracing::instrument(skip(self))]
    pub async fn export_tasks(
        &self,
        kind: TransactionKind,
        status: TransactionStatus,
    ) -> Result<Option<TransactionId>> {
        let Some(transaction) = self.transactions.start_export_tasks(kind, status).await? else {
            return Ok(None);
        };

        let tasks = self.export_tasks_by_id(transaction.id).await?;
        self.transactions.mark_tasks_exported(transaction.id).await?;

        metrics::counter!("transaction_task_exports_total").increment(1);
        tracing::info!(
            transaction_id = %transaction.id,
            task_count = tasks.len(),
            "transaction tasks exported"
        );
        Ok(Some(transaction.id))
    }

    /// Derives and saves the task set for one transaction, branching
    /// exhaustively on its terminal status.
    ///
    /// Confirmed ⇒ exactly the create-order task. Canceled or expired ⇒
    /// exactly the four compensations. Anything else has no defined task
    /// set and is a `NotImplemented`: a design invariant, not a branch
    /// that is ever expected to run.
    pub async fn export_tasks_by_id(&self, transaction_id: TransactionId) -> Result<Vec<Task>> {
        let transaction = self.transactions.find(transaction_id).await?;

        let payloads = match (transaction.kind, transaction.status) {
            (TransactionKind::PlaceOrder, TransactionStatus::Confirmed) => {
                vec![TaskPayload::CreateOrder { transaction_id }]
            }
            (
                TransactionKind::PlaceOrder,
                TransactionStatus::Canceled | TransactionStatus::Expired,
            ) => {
                let data = CompensationData { transaction_id };
                vec![
                    TaskPayload::CancelSeatReservation(data.clone()),
                    TaskPayload::CancelCreditCard(data.clone()),
                    TaskPayload::CancelAccount(data.clone()),
                    TaskPayload::CancelPointAward(data),
                ]
            }
            (TransactionKind::ReturnOrder, _) => {
                return Err(ExecutorError::NotImplemented(
                    "task export for return-order transactions".to_string(),
                ));
            }
            (_, status) => {
                return Err(ExecutorError::NotImplemented(format!(
                    "task export for a {status} transaction"
                )));
            }
        };

        let now = Utc::now();
        let mut tasks = Vec::with_capacity(payloads.len());
        for payload in payloads {
            let task = self
                .tasks
                .save(Task::new(payload, now, DEFAULT_REMAINING_TRIES))
                .await?;
            tasks.push(task);
        }
        Ok(tasks)
    }

    /// Aborts one exhausted stale task and alerts the operator.
    ///
    /// Returns the aborted task, or `None` when nothing was eligible.
    #[tracing::instrument(skip(self))]
    pub async fn abort_one_and_report(&self, stale_after: Duration) -> Result<Option<Task>> {
        let task = match self.tasks.abort_one(stale_after).await {
            Ok(task) => task,
            Err(StoreError::NotFound { .. }) => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        metrics::counter!("tasks_aborted_total").increment(1);
        let last_error = task
            .execution_results
            .iter()
            .rev()
            .find_map(|result| result.error.clone())
            .unwrap_or_else(|| "no execution result recorded".to_string());
        tracing::error!(task_id = %task.id, kind = %task.kind(), %last_error, "task aborted");

        let message = EmailMessage {
            to: self.operator_email.clone(),
            sender: self.operator_email.clone(),
            about: format!("Task {} aborted", task.kind()),
            text: format!(
                "Task {} ({}) exhausted its tries after {} attempts.\nLast error: {}\n",
                task.id,
                task.kind(),
                task.number_of_tries,
                last_error,
            ),
        };
        if let Err(error) = self.notifications.send_email(&message).await {
            // The abort itself already committed; the alert is best effort.
            tracing::warn!(task_id = %task.id, %error, "abort alert mail failed");
        }

        Ok(Some(task))
    }
}
