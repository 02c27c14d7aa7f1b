//! Compensation handlers for canceled and expired transactions.
//!
//! Each handler walks the transaction's completed authorize actions,
//! reverses the external side first, and only then revokes the action
//! locally. A failure leaves the action untouched, so the retrying task
//! reaches the external system again; the reversals themselves are
//! idempotent at the service boundary. A transaction with no matching
//! authorization makes the handler a no-op; the compensation set is
//! always exported in full.

use common::TransactionId;
use domain::{Action, ActionResult};

use crate::context::TaskContext;
use crate::error::Result;

async fn completed_authorizations(
    context: &TaskContext,
    transaction_id: TransactionId,
) -> Result<Vec<Action>> {
    let actions = context.actions.search_by_purpose(transaction_id).await?;
    Ok(actions
        .into_iter()
        .filter(Action::is_completed_authorize)
        .collect())
}

/// Releases every completed seat reservation authorization.
pub async fn cancel_seat_reservation(
    context: &TaskContext,
    transaction_id: TransactionId,
) -> Result<()> {
    for action in completed_authorizations(context, transaction_id).await? {
        if let Some(ActionResult::SeatReservationAuthorized { ref external_ref, .. }) =
            action.result
        {
            context.seat_reservation.cancel(external_ref).await?;
            context.actions.cancel(action.id).await?;
            tracing::info!(%transaction_id, action_id = %action.id, "seat reservation released");
        }
    }
    Ok(())
}

/// Voids every completed credit card authorization.
pub async fn cancel_credit_card(
    context: &TaskContext,
    transaction_id: TransactionId,
) -> Result<()> {
    for action in completed_authorizations(context, transaction_id).await? {
        if let Some(ActionResult::CreditCardAuthorized { ref pending_handle, .. }) = action.result
        {
            context.credit_card.void(pending_handle).await?;
            context.actions.cancel(action.id).await?;
            tracing::info!(%transaction_id, action_id = %action.id, "credit card authorization voided");
        }
    }
    Ok(())
}

/// Voids every completed point payment authorization.
pub async fn cancel_account(context: &TaskContext, transaction_id: TransactionId) -> Result<()> {
    for action in completed_authorizations(context, transaction_id).await? {
        if let Some(ActionResult::AccountAuthorized { ref pending_handle, .. }) = action.result {
            context.account.void(pending_handle).await?;
            context.actions.cancel(action.id).await?;
            tracing::info!(%transaction_id, action_id = %action.id, "account hold voided");
        }
    }
    Ok(())
}

/// Voids every completed entitlement authorization: incentive point
/// awards and discount-ticket holds.
pub async fn cancel_point_award(
    context: &TaskContext,
    transaction_id: TransactionId,
) -> Result<()> {
    for action in completed_authorizations(context, transaction_id).await? {
        match action.result {
            Some(ActionResult::PointAwardAuthorized { ref pending_handle, .. }) => {
                context.account.void(pending_handle).await?;
                context.actions.cancel(action.id).await?;
                tracing::info!(%transaction_id, action_id = %action.id, "point award voided");
            }
            Some(ActionResult::DiscountTicketAuthorized { ref external_ref, .. }) => {
                context.discount_ticket.cancel(external_ref).await?;
                context.actions.cancel(action.id).await?;
                tracing::info!(%transaction_id, action_id = %action.id, "discount ticket released");
            }
            _ => {}
        }
    }
    Ok(())
}
