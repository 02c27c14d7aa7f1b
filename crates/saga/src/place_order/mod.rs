//! The order placement saga.

pub mod authorize;
pub mod confirm;

pub use authorize::{
    AuthorizeAccountParams, AuthorizeCreditCardParams, AuthorizeDiscountTicketParams,
    AuthorizePointAwardParams, AuthorizeSeatReservationParams,
};
pub use confirm::ConfirmParams;

use std::sync::Arc;

use chrono::{DateTime, Utc};
use common::{ActionId, AgentId, TransactionId};
use domain::{
    AdmissionToken, Agent, CustomerContact, Seller, Transaction, TransactionKind,
    TransactionObject,
};
use store::{ActionStore, TransactionStore};

use crate::error::{Result, SagaError};
use crate::services::{
    AccountService, AdmissionTokenVerifier, ConfirmationNumberPublisher, CreditCardService,
    DiscountTicketService, OrderNumberPublisher, SeatReservationService, ServiceError,
};

/// Everything the saga needs, built once at process start and shared.
pub struct PlaceOrderDependencies {
    pub transactions: Arc<dyn TransactionStore>,
    pub actions: Arc<dyn ActionStore>,
    pub seat_reservation: Arc<dyn SeatReservationService>,
    pub credit_card: Arc<dyn CreditCardService>,
    pub account: Arc<dyn AccountService>,
    pub discount_ticket: Arc<dyn DiscountTicketService>,
    pub token_verifier: Arc<dyn AdmissionTokenVerifier>,
    pub order_number: Arc<dyn OrderNumberPublisher>,
    pub confirmation_number: Arc<dyn ConfirmationNumberPublisher>,
}

/// Orchestrates order placement: start, per-capability authorizations,
/// and the reconciling confirm.
///
/// There is no lock anywhere in the saga. Authorizations on the same
/// transaction run fully in parallel; every commit point is a conditional
/// write in one of the stores, and losers of a race observe the winner's
/// outcome instead of corrupting it.
pub struct OrderPlacementSaga {
    pub(crate) transactions: Arc<dyn TransactionStore>,
    pub(crate) actions: Arc<dyn ActionStore>,
    pub(crate) seat_reservation: Arc<dyn SeatReservationService>,
    pub(crate) credit_card: Arc<dyn CreditCardService>,
    pub(crate) account: Arc<dyn AccountService>,
    pub(crate) discount_ticket: Arc<dyn DiscountTicketService>,
    pub(crate) token_verifier: Arc<dyn AdmissionTokenVerifier>,
    pub(crate) order_number: Arc<dyn OrderNumberPublisher>,
    pub(crate) confirmation_number: Arc<dyn ConfirmationNumberPublisher>,
}

/// Parameters for starting a place-order transaction.
#[derive(Debug, Clone)]
pub struct StartParams {
    /// Hard admission deadline for the new transaction.
    pub expires: DateTime<Utc>,
    pub agent: Agent,
    pub seller: Seller,
    /// Raw single-use admission token, when the seller requires one.
    pub passport_token: Option<String>,
}

impl OrderPlacementSaga {
    /// Creates a new saga over the given dependencies.
    pub fn new(deps: PlaceOrderDependencies) -> Self {
        Self {
            transactions: deps.transactions,
            actions: deps.actions,
            seat_reservation: deps.seat_reservation,
            credit_card: deps.credit_card,
            account: deps.account,
            discount_ticket: deps.discount_ticket,
            token_verifier: deps.token_verifier,
            order_number: deps.order_number,
            confirmation_number: deps.confirmation_number,
        }
    }

    /// Starts a place-order transaction.
    ///
    /// When an admission token is supplied its signature and issuer are
    /// verified and its scope must match `Transaction:PlaceOrder:<sellerId>`.
    /// Token reuse is not pre-checked: the store's uniqueness constraint
    /// rejects the second writer with `AlreadyInUse`, which keeps the
    /// check race-safe.
    #[tracing::instrument(skip(self, params), fields(seller_id = %params.seller.id))]
    pub async fn start(&self, params: StartParams) -> Result<Transaction> {
        metrics::counter!("place_order_started_total").increment(1);

        let passport = match &params.passport_token {
            Some(raw_token) => {
                let verified = self.token_verifier.verify(raw_token).await?;
                let expected_scope = format!("Transaction:PlaceOrder:{}", params.seller.id);
                if verified.scope != expected_scope {
                    return Err(SagaError::argument(
                        "passportToken",
                        format!(
                            "token scope {} does not cover {}",
                            verified.scope, expected_scope
                        ),
                    ));
                }
                Some(AdmissionToken {
                    token: verified.token,
                    issuer: verified.issuer,
                    scope: verified.scope,
                })
            }
            None => None,
        };

        let transaction = Transaction::start(
            TransactionKind::PlaceOrder,
            params.agent,
            params.seller,
            TransactionObject {
                passport,
                ..Default::default()
            },
            params.expires,
        );

        let started = self.transactions.start(transaction).await?;
        tracing::info!(transaction_id = %started.id, "place order transaction started");
        Ok(started)
    }

    /// Sets the customer contact on an in-progress transaction.
    #[tracing::instrument(skip(self, contact))]
    pub async fn set_customer_contact(
        &self,
        transaction_id: TransactionId,
        agent_id: AgentId,
        contact: CustomerContact,
    ) -> Result<Transaction> {
        self.owned_transaction(transaction_id, agent_id).await?;

        if !contact.is_complete() {
            return Err(SagaError::argument(
                "contact",
                "family name, given name, email, and telephone are all required",
            ));
        }

        Ok(self
            .transactions
            .set_customer_contact(transaction_id, contact)
            .await?)
    }

    /// Cancels an in-progress transaction. Idempotent: canceling an
    /// already-canceled transaction returns it unchanged.
    #[tracing::instrument(skip(self))]
    pub async fn cancel(
        &self,
        transaction_id: TransactionId,
        agent_id: AgentId,
    ) -> Result<Transaction> {
        self.owned_transaction(transaction_id, agent_id).await?;
        let canceled = self.transactions.cancel(transaction_id).await?;
        metrics::counter!("place_order_canceled_total").increment(1);
        Ok(canceled)
    }

    /// Loads a transaction and checks the caller owns it.
    pub(crate) async fn owned_transaction(
        &self,
        transaction_id: TransactionId,
        agent_id: AgentId,
    ) -> Result<Transaction> {
        let transaction = self.transactions.find(transaction_id).await?;
        if transaction.agent.id != agent_id {
            return Err(SagaError::Forbidden(format!(
                "transaction {transaction_id} belongs to another agent"
            )));
        }
        Ok(transaction)
    }

    /// Loads a transaction, checking ownership and that it is still open.
    pub(crate) async fn owned_in_progress(
        &self,
        transaction_id: TransactionId,
        agent_id: AgentId,
    ) -> Result<Transaction> {
        let transaction = self.owned_transaction(transaction_id, agent_id).await?;
        if !transaction.is_in_progress() {
            return Err(SagaError::argument(
                "transactionId",
                format!("transaction {transaction_id} is already {}", transaction.status),
            ));
        }
        Ok(transaction)
    }

    /// Cancels an action after checking it belongs to the transaction.
    pub(crate) async fn cancel_owned_action(
        &self,
        transaction_id: TransactionId,
        action_id: ActionId,
    ) -> Result<domain::Action> {
        let action = self.actions.find(action_id).await?;
        if action.purpose != transaction_id {
            return Err(SagaError::argument(
                "actionId",
                format!("action {action_id} does not belong to transaction {transaction_id}"),
            ));
        }
        Ok(self.actions.cancel(action_id).await?)
    }

    /// Records a capability failure into the owning action, then
    /// re-raises it. Every failed sub-step leaves a durable record even
    /// though the saga call itself fails fast.
    pub(crate) async fn give_up_and_raise<T>(
        &self,
        action_id: ActionId,
        error: ServiceError,
    ) -> Result<T> {
        let record = serde_json::json!({
            "name": error.name(),
            "message": error.to_string(),
        });
        self.actions.give_up(action_id, record).await?;
        Err(error.into())
    }
}
