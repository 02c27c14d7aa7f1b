//! Actions: durable records of individual sub-steps.
//!
//! Every externally visible sub-step of a transaction (an authorization,
//! a payment capture, a delivery, a point grant) is recorded as an
//! action. Actions reference their owning transaction through `purpose`;
//! the transaction never owns them.

use chrono::{DateTime, Utc};
use common::{ActionId, AgentId, TransactionId};
use serde::{Deserialize, Serialize};

use crate::money::Money;
use crate::offer::{DiscountTicketUnit, EventId, PaymentMethodKind, ReservedSeat};
use crate::order::OrderNumber;

/// The kind of sub-step an action records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActionKind {
    Authorize,
    Pay,
    Send,
    Give,
    Return,
    Check,
}

impl ActionKind {
    /// Returns the kind name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionKind::Authorize => "Authorize",
            ActionKind::Pay => "Pay",
            ActionKind::Send => "Send",
            ActionKind::Give => "Give",
            ActionKind::Return => "Return",
            ActionKind::Check => "Check",
        }
    }
}

impl std::fmt::Display for ActionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The state of an action.
///
/// State transitions:
/// ```text
/// Active ──┬──► Completed
///          ├──► Canceled
///          └──► Failed
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum ActionStatus {
    /// The sub-step is underway.
    #[default]
    Active,

    /// The sub-step finished successfully (terminal state).
    Completed,

    /// The sub-step was canceled by its agent (terminal state).
    Canceled,

    /// The sub-step failed and gave up (terminal state).
    Failed,
}

impl ActionStatus {
    /// Returns true if the action can still transition.
    pub fn is_active(&self) -> bool {
        matches!(self, ActionStatus::Active)
    }

    /// Returns true if this is a terminal state.
    pub fn is_terminal(&self) -> bool {
        !self.is_active()
    }

    /// Returns the state name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionStatus::Active => "Active",
            ActionStatus::Completed => "Completed",
            ActionStatus::Canceled => "Canceled",
            ActionStatus::Failed => "Failed",
        }
    }
}

impl std::fmt::Display for ActionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A seat the agent asked the seller to hold.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeatOfferRequest {
    pub event_id: EventId,
    pub seat_number: String,
    pub ticket_type_code: String,
}

/// What an action operates on, one concrete shape per sub-step kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum ActionObject {
    /// Seats requested from the seat reservation service.
    SeatReservation { requested_seats: Vec<SeatOfferRequest> },

    /// A credit card charge to authorize.
    CreditCard { amount: Money, card_token: String },

    /// A point account withdrawal to authorize.
    Account { point_amount: i64, account_number: String },

    /// Discount-ticket units to authorize against their issuer.
    DiscountTicket { amount: Money, units: Vec<DiscountTicketUnit> },

    /// An incentive point deposit to authorize.
    PointAward { point_amount: i64, account_number: String },

    /// A previously authorized payment being captured. Monetary methods
    /// carry an amount, the point account a point amount.
    Payment {
        payment_method: PaymentMethodKind,
        amount: Money,
        point_amount: i64,
        external_ref: String,
    },

    /// An order being delivered.
    Delivery { order_number: OrderNumber },
}

/// The outcome recorded when an action completes, one concrete shape per
/// sub-step kind. Authorize results are normalized to an amount, an
/// external reference, and (where the gateway holds open state) a
/// pending-transaction handle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum ActionResult {
    SeatReservationAuthorized {
        /// Total price the seller requires for the held seats.
        price: Money,
        /// Points the held seats require in addition to the price.
        point_requirement: i64,
        external_ref: String,
        seats: Vec<ReservedSeat>,
    },

    CreditCardAuthorized {
        amount: Money,
        external_ref: String,
        pending_handle: String,
    },

    AccountAuthorized {
        point_amount: i64,
        account_number: String,
        external_ref: String,
        pending_handle: String,
    },

    DiscountTicketAuthorized {
        amount: Money,
        external_ref: String,
        units: Vec<DiscountTicketUnit>,
    },

    PointAwardAuthorized {
        point_amount: i64,
        account_number: String,
        external_ref: String,
        pending_handle: String,
    },

    Paid {
        payment_method: PaymentMethodKind,
        external_ref: String,
    },

    Sent { order_number: OrderNumber },

    Given { point_amount: i64 },
}

/// A durable record of one sub-step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Action {
    pub id: ActionId,
    pub kind: ActionKind,
    pub status: ActionStatus,
    /// Who performs the sub-step.
    pub agent: AgentId,
    /// Who receives its effect, when distinct from the agent.
    pub recipient: Option<AgentId>,
    /// Back-reference to the owning transaction.
    pub purpose: TransactionId,
    pub object: ActionObject,
    pub result: Option<ActionResult>,
    /// The failure recorded by give-up, if any.
    pub error: Option<serde_json::Value>,
    pub start_date: DateTime<Utc>,
    pub end_date: Option<DateTime<Utc>>,
}

impl Action {
    /// Creates a new active action for a sub-step that is starting now.
    pub fn start(
        kind: ActionKind,
        agent: AgentId,
        purpose: TransactionId,
        object: ActionObject,
    ) -> Self {
        Self {
            id: ActionId::new(),
            kind,
            status: ActionStatus::Active,
            agent,
            recipient: None,
            purpose,
            object,
            result: None,
            error: None,
            start_date: Utc::now(),
            end_date: None,
        }
    }

    /// Returns true for a completed authorize action.
    pub fn is_completed_authorize(&self) -> bool {
        self.kind == ActionKind::Authorize && self.status == ActionStatus::Completed
    }
}
