//! Discount ticket authorization.

use common::{ActionId, AgentId, TransactionId};
use domain::{Action, ActionKind, ActionObject, ActionResult, DiscountTicketUnit, Money};

use crate::error::Result;
use crate::place_order::OrderPlacementSaga;

/// Parameters for authorizing discount-ticket units.
#[derive(Debug, Clone)]
pub struct AuthorizeDiscountTicketParams {
    pub transaction_id: TransactionId,
    pub agent_id: AgentId,
    /// The monetary share of the price the tickets cover.
    pub amount: Money,
    pub units: Vec<DiscountTicketUnit>,
}

impl OrderPlacementSaga {
    /// Authorizes discount-ticket units against their issuer.
    #[tracing::instrument(skip(self, params), fields(transaction_id = %params.transaction_id))]
    pub async fn authorize_discount_ticket(
        &self,
        params: AuthorizeDiscountTicketParams,
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
                ActionObject::DiscountTicket {
                    amount: params.amount,
                    units: params.units.clone(),
                },
            ))
            .await?;

        match self
            .discount_ticket
            .authorize(&params.units, params.amount)
            .await
        {
            Ok(authorization) => {
                let result = ActionResult::DiscountTicketAuthorized {
                    amount: authorization.amount,
                    external_ref: authorization.external_ref,
                    units: params.units,
                };
                Ok(self.actions.complete(action.id, result).await?)
            }
            Err(error) => self.give_up_and_raise(action.id, error).await,
        }
    }

    /// Cancels a discount-ticket authorization and best-effort releases
    /// it at the issuer.
    #[tracing::instrument(skip(self))]
    pub async fn cancel_discount_ticket_authorization(
        &self,
        transaction_id: TransactionId,
        agent_id: AgentId,
        action_id: ActionId,
    ) -> Result<Action> {
        self.owned_transaction(transaction_id, agent_id).await?;
        let canceled = self.cancel_owned_action(transaction_id, action_id).await?;

        if let Some(ActionResult::DiscountTicketAuthorized { external_ref, .. }) = &canceled.result
            && let Err(error) = self.discount_ticket.cancel(external_ref).await
        {
            tracing::warn!(%action_id, %error, "discount ticket release failed");
        }

        Ok(canceled)
    }
}
