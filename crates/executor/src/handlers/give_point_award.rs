//! Granting the incentive points a purchase awarded.

use common::TransactionId;
use domain::{Action, ActionKind, ActionObject, ActionResult, PointAwardGrant};

use crate::context::TaskContext;
use crate::error::Result;
use crate::handlers::record_give_up;

pub async fn handle(
    context: &TaskContext,
    transaction_id: TransactionId,
    grant: &PointAwardGrant,
) -> Result<()> {
    let transaction = context.transactions.find(transaction_id).await?;

    let action = context
        .actions
        .start(Action::start(
            ActionKind::Give,
            transaction.agent.id,
            transaction_id,
            ActionObject::PointAward {
                point_amount: grant.point_amount,
                account_number: grant.account_number.clone(),
            },
        ))
        .await?;

    match context.account.settle(&grant.pending_handle).await {
        Ok(()) => {
            context
                .actions
                .complete(
                    action.id,
                    ActionResult::Given {
                        point_amount: grant.point_amount,
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
