//! Capturing an authorized credit card charge.

use common::TransactionId;
use domain::{
    Action, ActionKind, ActionObject, ActionResult, CreditCardSettlement, PaymentMethodKind,
};

use crate::context::TaskContext;
use crate::error::Result;
use crate::handlers::record_give_up;

pub async fn handle(
    context: &TaskContext,
    transaction_id: TransactionId,
    settlement: &CreditCardSettlement,
) -> Result<()> {
    let transaction = context.transactions.find(transaction_id).await?;

    let action = context
        .actions
        .start(Action::start(
            ActionKind::Pay,
            transaction.agent.id,
            transaction_id,
            ActionObject::Payment {
                payment_method: PaymentMethodKind::CreditCard,
                amount: settlement.amount,
                point_amount: 0,
                external_ref: settlement.external_ref.clone(),
            },
        ))
        .await?;

    match context.credit_card.capture(&settlement.pending_handle).await {
        Ok(()) => {
            context
                .actions
                .complete(
                    action.id,
                    ActionResult::Paid {
                        payment_method: PaymentMethodKind::CreditCard,
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
