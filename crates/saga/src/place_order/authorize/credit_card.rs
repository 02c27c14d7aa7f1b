//! Credit card authorization.

use common::{ActionId, AgentId, TransactionId};
use domain::{Action, ActionKind, ActionObject, ActionResult, Money};

use crate::error::Result;
use crate::place_order::OrderPlacementSaga;

/// Parameters for authorizing a credit card charge.
#[derive(Debug, Clone)]
pub struct AuthorizeCreditCardParams {
    pub transaction_id: TransactionId,
    pub agent_id: AgentId,
    pub amount: Money,
    /// Tokenized card reference; raw card data never reaches the core.
    pub card_token: String,
}

impl OrderPlacementSaga {
    /// Authorizes a charge against the payment gateway.
    #[tracing::instrument(skip(self, params), fields(transaction_id = %params.transaction_id))]
    pub async fn authorize_credit_card(
        &self,
        params: AuthorizeCreditCardParams,
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
                ActionObject::CreditCard {
                    amount: params.amount,
                    card_token: params.card_token.clone(),
                },
            ))
            .await?;

        match self
            .credit_card
            .authorize(&params.card_token, params.amount)
            .await
        {
            Ok(authorization) => {
                let result = ActionResult::CreditCardAuthorized {
                    amount: params.amount,
                    external_ref: authorization.external_ref,
                    pending_handle: authorization.pending_handle,
                };
                Ok(self.actions.complete(action.id, result).await?)
            }
            Err(error) => self.give_up_and_raise(action.id, error).await,
        }
    }

    /// Cancels a credit card authorization and best-effort voids the
    /// gateway-side charge.
    #[tracing::instrument(skip(self))]
    pub async fn cancel_credit_card_authorization(
        &self,
        transaction_id: TransactionId,
        agent_id: AgentId,
        action_id: ActionId,
    ) -> Result<Action> {
        self.owned_transaction(transaction_id, agent_id).await?;
        let canceled = self.cancel_owned_action(transaction_id, action_id).await?;

        if let Some(ActionResult::CreditCardAuthorized { pending_handle, .. }) = &canceled.result
            && let Err(error) = self.credit_card.void(pending_handle).await
        {
            tracing::warn!(%action_id, %error, "credit card void failed");
        }

        Ok(canceled)
    }
}
