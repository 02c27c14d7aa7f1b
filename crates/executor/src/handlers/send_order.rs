//! Delivering an order.

use common::TransactionId;
use domain::{Action, ActionKind, ActionObject, ActionResult, OrderNumber, OrderStatus};
use store::StoreError;

use crate::context::TaskContext;
use crate::error::Result;

pub async fn handle(
    context: &TaskContext,
    transaction_id: TransactionId,
    order_number: &OrderNumber,
) -> Result<()> {
    let transaction = context.transactions.find(transaction_id).await?;

    let action = context
        .actions
        .start(Action::start(
            ActionKind::Send,
            transaction.agent.id,
            transaction_id,
            ActionObject::Delivery {
                order_number: order_number.clone(),
            },
        ))
        .await?;

    let delivery = context
        .orders
        .change_status(order_number, OrderStatus::Processing, OrderStatus::Delivered)
        .await;

    match delivery {
        Ok(_) => {}
        // A retry after a partial run finds the order already delivered.
        Err(StoreError::InvalidStatus { ref status, .. })
            if status == OrderStatus::Delivered.as_str() => {}
        Err(error) => {
            let record = serde_json::json!({
                "name": "StoreError",
                "message": error.to_string(),
            });
            context.actions.give_up(action.id, record).await?;
            return Err(error.into());
        }
    }

    context
        .actions
        .complete(
            action.id,
            ActionResult::Sent {
                order_number: order_number.clone(),
            },
        )
        .await?;
    tracing::info!(%transaction_id, %order_number, "order delivered");
    Ok(())
}
