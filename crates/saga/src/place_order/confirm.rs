//! Confirming a place-order transaction.
//!
//! Confirm is the one operation that needs a consistent view across all
//! of a transaction's authorize actions. It gets one without locking:
//! re-fetch the actions, keep the completed ones whose end date precedes
//! the confirm timestamp, reconcile, and commit with a single conditional
//! write. Parallel authorize calls that complete later simply miss this
//! confirm attempt.

use std::collections::HashMap;

use chrono::Utc;
use common::{AgentId, TransactionId};
use domain::{
    AcceptedOffer, Action, ActionResult, AccountSettlement, CreditCardSettlement, DeliveryAction,
    DiscountTicketUnit, EmailMessage, Money, Order, OrderStatus, PaymentMethod,
    PaymentMethodKind, PointAwardGrant, PotentialActions, ReservedSeat, Transaction,
    TransactionResult, TransactionStatus,
};

use crate::error::{Result, SagaError};
use crate::place_order::OrderPlacementSaga;

/// Sender address for order confirmation mail.
const EMAIL_SENDER: &str = "no-reply@boxoffice.example";

/// Parameters for confirming a transaction.
#[derive(Debug, Clone)]
pub struct ConfirmParams {
    pub transaction_id: TransactionId,
    pub agent_id: AgentId,
}

/// The single seat-reservation authorization backing a confirm.
#[derive(Debug, Clone)]
struct SeatAuthorization {
    price: Money,
    point_requirement: i64,
    seats: Vec<ReservedSeat>,
}

/// One completed discount-ticket authorization.
#[derive(Debug, Clone)]
struct DiscountTicketSummary {
    amount: Money,
    external_ref: String,
    units: Vec<DiscountTicketUnit>,
}

/// Everything the completed authorize actions add up to.
#[derive(Debug, Clone)]
struct AuthorizationSummary {
    seat: SeatAuthorization,
    credit_cards: Vec<CreditCardSettlement>,
    accounts: Vec<AccountSettlement>,
    discount_tickets: Vec<DiscountTicketSummary>,
    point_awards: Vec<PointAwardGrant>,
}

impl OrderPlacementSaga {
    /// Confirms the transaction, producing its order.
    ///
    /// Idempotent: an already-confirmed transaction returns its existing
    /// order without touching the number publishers again. An expired or
    /// canceled transaction is rejected.
    #[tracing::instrument(skip(self, params), fields(transaction_id = %params.transaction_id))]
    pub async fn confirm(&self, params: ConfirmParams) -> Result<Order> {
        let confirm_start = std::time::Instant::now();
        metrics::counter!("place_order_confirm_total").increment(1);

        let transaction = self
            .owned_transaction(params.transaction_id, params.agent_id)
            .await?;

        match transaction.status {
            TransactionStatus::InProgress => {}
            TransactionStatus::Confirmed => {
                return confirmed_order(&transaction);
            }
            status => {
                return Err(SagaError::argument(
                    "transactionId",
                    format!("transaction {} is already {status}", transaction.id),
                ));
            }
        }

        let customer = transaction
            .object
            .customer_contact
            .clone()
            .filter(|contact| contact.is_complete())
            .ok_or_else(|| {
                SagaError::argument("customerContact", "customer contact is not set")
            })?;

        // Gather the authorize actions settled before this attempt.
        // Sub-sagas still in flight are invisible here and will be seen
        // by a later confirm.
        let now = Utc::now();
        let actions = self.actions.search_by_purpose(transaction.id).await?;
        let authorize_actions: Vec<Action> = actions
            .into_iter()
            .filter(|action| {
                action.is_completed_authorize()
                    && action.end_date.is_some_and(|end_date| end_date <= now)
            })
            .collect();

        let summary = summarize(&authorize_actions)?;
        validate_price(&summary)?;
        let units: Vec<DiscountTicketUnit> = summary
            .discount_tickets
            .iter()
            .flat_map(|authorization| authorization.units.iter().cloned())
            .collect();
        validate_discount_tickets(&summary.seat.seats, &units)?;

        let order_date = Utc::now();
        let order_number = self
            .order_number
            .publish(
                order_date.date_naive(),
                transaction.seller.seller_type,
                &transaction.seller.branch_code,
            )
            .await?;
        let confirmation_number = self
            .confirmation_number
            .publish(order_date.date_naive())
            .await?;

        let order = Order {
            order_number: order_number.clone(),
            confirmation_number,
            seller: transaction.seller.clone(),
            customer,
            accepted_offers: summary
                .seat
                .seats
                .iter()
                .map(|seat| AcceptedOffer {
                    item_offered: seat.clone(),
                    price: seat.ticket_type.charge,
                })
                .collect(),
            price: summary.seat.price,
            payment_methods: payment_methods(&summary),
            order_status: OrderStatus::Processing,
            order_date,
            transaction_id: transaction.id,
        };

        let potential_actions = PotentialActions {
            settle_credit_card: summary.credit_cards.clone(),
            settle_account: summary.accounts.clone(),
            send_order: DeliveryAction {
                order_number: order.order_number.clone(),
            },
            give_point_award: summary.point_awards.clone(),
            send_email_message: Some(build_confirmation_email(&order)),
        };

        // The conditional write commits exactly one confirm; a loser of a
        // concurrent race gets the winner's row back.
        let confirmed = self
            .transactions
            .confirm(
                transaction.id,
                authorize_actions,
                TransactionResult::Order(order),
                potential_actions,
            )
            .await?;

        metrics::histogram!("place_order_confirm_seconds")
            .record(confirm_start.elapsed().as_secs_f64());
        tracing::info!(transaction_id = %confirmed.id, %order_number, "transaction confirmed");

        confirmed_order(&confirmed)
    }
}

/// Extracts the order from a confirmed transaction.
fn confirmed_order(transaction: &Transaction) -> Result<Order> {
    transaction.order().cloned().ok_or_else(|| {
        SagaError::NotImplemented(format!(
            "confirmed transaction {} carries no order",
            transaction.id
        ))
    })
}

/// Collapses the completed authorize actions into per-capability lists,
/// requiring exactly one seat reservation.
fn summarize(authorize_actions: &[Action]) -> Result<AuthorizationSummary> {
    let mut seats = Vec::new();
    let mut credit_cards = Vec::new();
    let mut accounts = Vec::new();
    let mut discount_tickets = Vec::new();
    let mut point_awards = Vec::new();

    for action in authorize_actions {
        match &action.result {
            Some(ActionResult::SeatReservationAuthorized {
                price,
                point_requirement,
                seats: reserved,
                ..
            }) => seats.push(SeatAuthorization {
                price: *price,
                point_requirement: *point_requirement,
                seats: reserved.clone(),
            }),
            Some(ActionResult::CreditCardAuthorized {
                amount,
                external_ref,
                pending_handle,
            }) => credit_cards.push(CreditCardSettlement {
                amount: *amount,
                external_ref: external_ref.clone(),
                pending_handle: pending_handle.clone(),
            }),
            Some(ActionResult::AccountAuthorized {
                point_amount,
                account_number,
                external_ref,
                pending_handle,
            }) => accounts.push(AccountSettlement {
                point_amount: *point_amount,
                account_number: account_number.clone(),
                external_ref: external_ref.clone(),
                pending_handle: pending_handle.clone(),
            }),
            Some(ActionResult::DiscountTicketAuthorized {
                amount,
                external_ref,
                units,
            }) => discount_tickets.push(DiscountTicketSummary {
                amount: *amount,
                external_ref: external_ref.clone(),
                units: units.clone(),
            }),
            Some(ActionResult::PointAwardAuthorized {
                point_amount,
                account_number,
                external_ref,
                pending_handle,
            }) => point_awards.push(PointAwardGrant {
                point_amount: *point_amount,
                account_number: account_number.clone(),
                external_ref: external_ref.clone(),
                pending_handle: pending_handle.clone(),
            }),
            _ => {}
        }
    }

    let mut seats = seats.into_iter();
    let seat = match (seats.next(), seats.next()) {
        (Some(seat), None) => seat,
        (None, _) => {
            return Err(SagaError::argument(
                "transactionId",
                "a completed seat reservation authorization is required",
            ));
        }
        (Some(_), Some(_)) => {
            return Err(SagaError::argument(
                "transactionId",
                "multiple seat reservation authorizations are not supported",
            ));
        }
    };

    Ok(AuthorizationSummary {
        seat,
        credit_cards,
        accounts,
        discount_tickets,
        point_awards,
    })
}

/// Checks that the customer-side authorizations exactly cover what the
/// seller requires: per-method monetary sums against the reserved price,
/// point authorizations against the point requirement.
fn validate_price(summary: &AuthorizationSummary) -> Result<()> {
    let by_credit_card: Money = summary
        .credit_cards
        .iter()
        .map(|settlement| settlement.amount)
        .sum();
    let by_discount_ticket: Money = summary
        .discount_tickets
        .iter()
        .map(|authorization| authorization.amount)
        .sum();
    let authorized = by_credit_card + by_discount_ticket;

    if authorized != summary.seat.price {
        return Err(SagaError::argument(
            "transactionId",
            format!(
                "authorized amount {authorized} does not match the required price {}",
                summary.seat.price
            ),
        ));
    }

    let authorized_points: i64 = summary
        .accounts
        .iter()
        .map(|settlement| settlement.point_amount)
        .sum();
    if authorized_points != summary.seat.point_requirement {
        return Err(SagaError::argument(
            "transactionId",
            format!(
                "authorized points {authorized_points} do not match the required points {}",
                summary.seat.point_requirement
            ),
        ));
    }

    Ok(())
}

/// Checks that every seat priced with a discount-ticket component is
/// matched 1:1 by an authorized unit: identity by (event, seat number),
/// count by (event, service type).
fn validate_discount_tickets(
    seats: &[ReservedSeat],
    units: &[DiscountTicketUnit],
) -> Result<()> {
    let discount_seats: Vec<(&ReservedSeat, &str)> = seats
        .iter()
        .filter_map(|seat| {
            seat.ticket_type
                .discount_service_type
                .as_deref()
                .map(|service_type| (seat, service_type))
        })
        .collect();

    // Identity first, so a shortfall names the seat it fails on.
    for (seat, _) in &discount_seats {
        let matched = units.iter().any(|unit| {
            unit.event_id == seat.event_id && unit.seat_number == seat.seat_number
        });
        if !matched {
            return Err(SagaError::argument(
                "discountTickets",
                format!(
                    "no discount ticket unit matches seat {} of event {}",
                    seat.seat_number, seat.event_id
                ),
            ));
        }
    }

    let mut required: HashMap<(String, String), usize> = HashMap::new();
    for (seat, service_type) in &discount_seats {
        *required
            .entry((seat.event_id.to_string(), service_type.to_string()))
            .or_insert(0) += 1;
    }
    let mut supplied: HashMap<(String, String), usize> = HashMap::new();
    for unit in units {
        *supplied
            .entry((unit.event_id.to_string(), unit.service_type.clone()))
            .or_insert(0) += 1;
    }

    if required != supplied {
        return Err(SagaError::argument(
            "discountTickets",
            "discount ticket units do not match the reserved seats per event and service type",
        ));
    }

    Ok(())
}

/// Records one payment method on the order per completed authorization.
fn payment_methods(summary: &AuthorizationSummary) -> Vec<PaymentMethod> {
    let credit_cards = summary.credit_cards.iter().map(|settlement| PaymentMethod {
        kind: PaymentMethodKind::CreditCard,
        external_ref: settlement.external_ref.clone(),
    });
    let accounts = summary.accounts.iter().map(|settlement| PaymentMethod {
        kind: PaymentMethodKind::Account,
        external_ref: settlement.external_ref.clone(),
    });
    let discount_tickets = summary
        .discount_tickets
        .iter()
        .map(|authorization| PaymentMethod {
            kind: PaymentMethodKind::DiscountTicket,
            external_ref: authorization.external_ref.clone(),
        });
    credit_cards.chain(accounts).chain(discount_tickets).collect()
}

/// Builds the confirmation mail carried by the send-email task.
fn build_confirmation_email(order: &Order) -> EmailMessage {
    EmailMessage {
        to: order.customer.email.clone(),
        sender: EMAIL_SENDER.to_string(),
        about: format!("Order {} confirmed", order.order_number),
        text: format!(
            "Dear {} {},\n\n\
             Your order at {} has been received.\n\
             Order number: {}\n\
             Confirmation number: {}\n\
             Total price: {}\n",
            order.customer.given_name,
            order.customer.family_name,
            order.seller.name,
            order.order_number,
            order.confirmation_number,
            order.price,
        ),
    }
}
