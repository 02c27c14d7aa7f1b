//! Settling an authorized point payment.

use common::TransactionId;
use domain::{
    AccountSettlement, Action, ActionKind, ActionObject, ActionResult, Money, PaymentMethodKind,
};

use crate::context::TaskContext;
use crate::error::Result;
use crate::handlers::record_give_up;

pub async fn handle(
    context: &TaskContext,
    transaction_id: TransactionId,
    settlement: &AccountSettlement,
) -> Result<()> {
    let transaction = context.transactions.find(transaction_id).await?;

    let action = context
        .actions
        .start(Action::start(
            ActionKind::Pay,
            transaction.agent.id,
            transaction_id,
            ActionObject::Payment {
                payment_method: PaymentMethodKind::Account,
                amount: Money::zero(),
                point_amount: settlement.point_amount,
                external_ref: settlement.external_ref.clone(),
            },
        ))
        .await?;

    match context.account.settle(&settlement.pending_handle).await {
        Ok(()) => {
            context
                .actions
                .complete(
                    action.id,
                    ActionResult::Paid {
                        payment_method: PaymentMethodKind::Account,
                        external_ref: settlement.external_ref.clone(),
                    },
                )
                .await?;
            Ok(())
        }
        Err(error) => {
            record_give_up(context, action.id, &error).await?;
            Err(error.into())
        }
    }
}
