//! Task handlers, one per task kind.
//!
//! The `match` in [`dispatch`] is the task-kind registry: adding a kind
//! without a handler is a compile error, and nothing here ever treats an
//! unknown kind as success.

mod compensation;
mod create_order;
mod give_point_award;
mod send_email;
mod send_order;
mod settle_account;
mod settle_credit_card;

use common::ActionId;
use domain::TaskPayload;
use saga::services::ServiceError;

use crate::context::TaskContext;
use crate::error::Result;

/// Dispatches a claimed task's payload to its handler.
pub async fn dispatch(context: &TaskContext, payload: &TaskPayload) -> Result<()> {
    match payload {
        TaskPayload::CreateOrder { transaction_id } => {
            create_order::handle(context, *transaction_id).await
        }
        TaskPayload::SettleCreditCard {
            transaction_id,
            settlement,
        } => settle_credit_card::handle(context, *transaction_id, settlement).await,
        TaskPayload::SettleAccount {
            transaction_id,
            settlement,
        } => settle_account::handle(context, *transaction_id, settlement).await,
        TaskPayload::SendOrder {
            transaction_id,
            order_number,
        } => send_order::handle(context, *transaction_id, order_number).await,
        TaskPayload::GivePointAward {
            transaction_id,
            grant,
        } => give_point_award::handle(context, *transaction_id, grant).await,
        TaskPayload::SendEmailMessage { message, .. } => {
            send_email::handle(context, message).await
        }
        TaskPayload::CancelSeatReservation(data) => {
            compensation::cancel_seat_reservation(context, data.transaction_id).await
        }
        TaskPayload::CancelCreditCard(data) => {
            compensation::cancel_credit_card(context, data.transaction_id).await
        }
        TaskPayload::CancelAccount(data) => {
            compensation::cancel_account(context, data.transaction_id).await
        }
        TaskPayload::CancelPointAward(data) => {
            compensation::cancel_point_award(context, data.transaction_id).await
        }
    }
}

/// Records a capability failure into the handler's action before the
/// error is re-raised, so every failed attempt leaves a durable record.
pub(crate) async fn record_give_up(
    context: &TaskContext,
    action_id: ActionId,
    error: &ServiceError,
) -> Result<()> {
    let record = serde_json::json!({
        "name": error.name(),
        "message": error.to_string(),
    });
    context.actions.give_up(action_id, record).await?;
    Ok(())
}
