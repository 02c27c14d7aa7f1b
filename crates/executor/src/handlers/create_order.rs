//! The happy-path handler: materialize the order and fan out the rest.

use chrono::Utc;
use common::TransactionId;
use domain::{Task, TaskPayload};

use crate::context::TaskContext;
use crate::error::{ExecutorError, Result};
use crate::DEFAULT_REMAINING_TRIES;

/// Materializes the order projection from a confirmed transaction and
/// enqueues the settlement, delivery, award, and notification tasks its
/// potential actions call for.
///
/// Re-execution is safe: the order insert is idempotent on the order
/// number, and every follow-up handler is idempotent against its
/// external system.
pub async fn handle(context: &TaskContext, transaction_id: TransactionId) -> Result<()> {
    let transaction = context.transactions.find(transaction_id).await?;

    let order = transaction.order().cloned().ok_or_else(|| {
        ExecutorError::NotImplemented(format!(
            "create-order task for transaction {transaction_id} without an order result"
        ))
    })?;
    let potential_actions = transaction.potential_actions.clone().ok_or_else(|| {
        ExecutorError::NotImplemented(format!(
            "create-order task for transaction {transaction_id} without potential actions"
        ))
    })?;

    context.orders.create_if_not_exists(order.clone()).await?;
    tracing::info!(%transaction_id, order_number = %order.order_number, "order created");

    let mut payloads = Vec::new();
    for settlement in potential_actions.settle_credit_card {
        payloads.push(TaskPayload::SettleCreditCard {
            transaction_id,
            settlement,
        });
    }
    for settlement in potential_actions.settle_account {
        payloads.push(TaskPayload::SettleAccount {
            transaction_id,
            settlement,
        });
    }
    payloads.push(TaskPayload::SendOrder {
        transaction_id,
        order_number: potential_actions.send_order.order_number,
    });
    for grant in potential_actions.give_point_award {
        payloads.push(TaskPayload::GivePointAward {
            transaction_id,
            grant,
        });
    }
    if let Some(message) = potential_actions.send_email_message {
        payloads.push(TaskPayload::SendEmailMessage {
            transaction_id,
            message,
        });
    }

    let now = Utc::now();
    for payload in payloads {
        context
            .tasks
            .save(Task::new(payload, now, DEFAULT_REMAINING_TRIES))
            .await?;
    }
    Ok(())
}
