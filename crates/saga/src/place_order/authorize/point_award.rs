//! Incentive point award authorization.

use common::{ActionId, AgentId, TransactionId};
use domain::{Action, ActionKind, ActionObject, ActionResult};

use crate::error::Result;
use crate::place_order::OrderPlacementSaga;

/// Parameters for authorizing an incentive point award.
#[derive(Debug, Clone)]
pub struct AuthorizePointAwardParams {
    pub transaction_id: TransactionId,
    pub agent_id: AgentId,
    pub account_number: String,
    pub point_amount: i64,
}

impl OrderPlacementSaga {
    /// Opens a deposit hold for the points the purchase will award.
    #[tracing::instrument(skip(self, params), fields(transaction_id = %params.transaction_id))]
    pub async fn authorize_point_award(
        &self,
        params: AuthorizePointAwardParams,
    ) -> Result<Action> {
        let transaction = self
            .owned_in_progress(params.transaction_id, params.agent_id)
            .await?;

        let action = self
            .actions
            .start(Action::start(
                ActionKind::Authorize,
                transaction.agent.id,
                transaction.id,
                ActionObject::PointAward {
                    point_amount: params.point_amount,
                    account_number: params.account_number.clone(),
                },
            ))
            .await?;

        match self
            .account
            .authorize_deposit(&params.account_number, params.point_amount)
            .await
        {
            Ok(hold) => {
                let result = ActionResult::PointAwardAuthorized {
                    point_amount: params.point_amount,
                    account_number: params.account_number.clone(),
                    external_ref: hold.external_ref,
                    pending_handle: hold.pending_handle,
                };
                Ok(self.actions.complete(action.id, result).await?)
            }
            Err(error) => self.give_up_and_raise(action.id, error).await,
        }
    }

    /// Cancels a point award authorization and best-effort voids the
    /// ledger hold.
    #[tracing::instrument(skip(self))]
    pub async fn cancel_point_award_authorization(
        &self,
        transaction_id: TransactionId,
        agent_id: AgentId,
        action_id: ActionId,
    ) -> Result<Action> {
        self.owned_transaction(transaction_id, agent_id).await?;
        let canceled = self.cancel_owned_action(transaction_id, action_id).await?;

        if let Some(ActionResult::PointAwardAuthorized { pending_handle, .. }) = &canceled.result
            && let Err(error) = self.account.void(pending_handle).await
        {
            tracing::warn!(%action_id, %error, "point award void failed");
        }

        Ok(canceled)
    }
}
