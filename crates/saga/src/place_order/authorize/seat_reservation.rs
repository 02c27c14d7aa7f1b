//! Seat reservation authorization (the seller side of the transaction).

use common::{ActionId, AgentId, TransactionId};
use domain::{Action, ActionKind, ActionObject, ActionResult, SeatOfferRequest};

use crate::error::Result;
use crate::place_order::OrderPlacementSaga;

/// Parameters for authorizing a seat reservation.
#[derive(Debug, Clone)]
pub struct AuthorizeSeatReservationParams {
    pub transaction_id: TransactionId,
    pub agent_id: AgentId,
    pub requested_seats: Vec<SeatOfferRequest>,
}

impl OrderPlacementSaga {
    /// Opens a hold on the requested seats and records the priced result.
    #[tracing::instrument(skip(self, params), fields(transaction_id = %params.transaction_id))]
    pub async fn authorize_seat_reservation(
        &self,
        params: AuthorizeSeatReservationParams,
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
                ActionObject::SeatReservation {
                    requested_seats: params.requested_seats.clone(),
                },
            ))
            .await?;

        match self.seat_reservation.start(&params.requested_seats).await {
            Ok(hold) => {
                let result = ActionResult::SeatReservationAuthorized {
                    price: hold.price,
                    point_requirement: hold.point_requirement,
                    external_ref: hold.external_ref,
                    seats: hold.seats,
                };
                Ok(self.actions.complete(action.id, result).await?)
            }
            Err(error) => self.give_up_and_raise(action.id, error).await,
        }
    }

    /// Cancels a seat reservation authorization and best-effort releases
    /// the hold.
    #[tracing::instrument(skip(self))]
    pub async fn cancel_seat_reservation_authorization(
        &self,
        transaction_id: TransactionId,
        agent_id: AgentId,
        action_id: ActionId,
    ) -> Result<Action> {
        self.owned_transaction(transaction_id, agent_id).await?;
        let canceled = self.cancel_owned_action(transaction_id, action_id).await?;

        if let Some(ActionResult::SeatReservationAuthorized { external_ref, .. }) =
            &canceled.result
            && let Err(error) = self.seat_reservation.cancel(external_ref).await
        {
            tracing::warn!(%action_id, %error, "seat reservation release failed");
        }

        Ok(canceled)
    }
}
