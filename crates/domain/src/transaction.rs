//! Transactions: the multi-step order placement record.

use chrono::{DateTime, Utc};
use common::TransactionId;
use serde::{Deserialize, Serialize};

use crate::action::Action;
use crate::money::Money;
use crate::notification::EmailMessage;
use crate::order::{Order, OrderNumber};
use crate::party::{Agent, CustomerContact, Seller};

/// The kind of business transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransactionKind {
    PlaceOrder,
    ReturnOrder,
}

impl TransactionKind {
    /// Returns the kind name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionKind::PlaceOrder => "PlaceOrder",
            TransactionKind::ReturnOrder => "ReturnOrder",
        }
    }
}

impl std::fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The state of a transaction in its lifecycle.
///
/// State transitions:
/// ```text
/// InProgress ──┬──► Confirmed
///              ├──► Expired
///              └──► Canceled
/// ```
///
/// A transaction leaves `InProgress` exactly once; every other field
/// except the task-export bookkeeping is immutable after that.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum TransactionStatus {
    /// The transaction is open for authorizations.
    #[default]
    InProgress,

    /// The order was placed (terminal state).
    Confirmed,

    /// The admission deadline passed (terminal state).
    Expired,

    /// The agent gave up (terminal state).
    Canceled,
}

impl TransactionStatus {
    /// Returns true if the transaction can be confirmed in this state.
    pub fn can_confirm(&self) -> bool {
        matches!(self, TransactionStatus::InProgress)
    }

    /// Returns true if the transaction can be canceled in this state.
    pub fn can_cancel(&self) -> bool {
        matches!(self, TransactionStatus::InProgress)
    }

    /// Returns true if this is a terminal state.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, TransactionStatus::InProgress)
    }

    /// Returns the state name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionStatus::InProgress => "InProgress",
            TransactionStatus::Confirmed => "Confirmed",
            TransactionStatus::Expired => "Expired",
            TransactionStatus::Canceled => "Canceled",
        }
    }
}

impl std::fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Task-export bookkeeping for a terminal transaction.
///
/// The only field that may change after the transaction reaches a
/// terminal status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum TaskExportStatus {
    #[default]
    Unexported,
    Exporting,
    Exported,
}

impl TaskExportStatus {
    /// Returns the state name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskExportStatus::Unexported => "Unexported",
            TaskExportStatus::Exporting => "Exporting",
            TaskExportStatus::Exported => "Exported",
        }
    }
}

impl std::fmt::Display for TaskExportStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A verified single-use admission token gating transaction start.
///
/// Issued and signed elsewhere; the core stores the verified claims and
/// relies on the transaction store's uniqueness constraint to reject
/// reuse.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdmissionToken {
    /// The raw token string, globally unique across transactions.
    pub token: String,
    pub issuer: String,
    /// Scope the token was issued for, e.g. `Transaction:PlaceOrder:<sellerId>`.
    pub scope: String,
}

/// What the transaction operates on.
///
/// Authorize actions are separate records referencing the transaction
/// through `purpose`; a snapshot is embedded here at confirm time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct TransactionObject {
    pub passport: Option<AdmissionToken>,
    pub customer_contact: Option<CustomerContact>,
    /// Snapshot of the authorize actions the confirm was validated
    /// against. Empty while the transaction is in progress.
    pub authorize_actions: Vec<Action>,
}

/// Refund details for a return-order transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefundDescriptor {
    pub order_number: OrderNumber,
    pub refund_amount: Money,
    pub reason: String,
}

/// What a terminal transaction produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum TransactionResult {
    Order(Order),
    Refund(RefundDescriptor),
}

/// Credit card capture parameters compiled at confirm time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreditCardSettlement {
    pub amount: Money,
    pub external_ref: String,
    pub pending_handle: String,
}

/// Point account capture parameters compiled at confirm time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountSettlement {
    pub point_amount: i64,
    pub account_number: String,
    pub external_ref: String,
    pub pending_handle: String,
}

/// Incentive point grant parameters compiled at confirm time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PointAwardGrant {
    pub point_amount: i64,
    pub account_number: String,
    pub external_ref: String,
    pub pending_handle: String,
}

/// Delivery parameters compiled at confirm time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryAction {
    pub order_number: OrderNumber,
}

/// The side effects a confirmed transaction owes, compiled once at
/// confirm and consumed by the create-order task handler. One settlement
/// per completed authorization of each payment method.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PotentialActions {
    pub settle_credit_card: Vec<CreditCardSettlement>,
    pub settle_account: Vec<AccountSettlement>,
    pub send_order: DeliveryAction,
    pub give_point_award: Vec<PointAwardGrant>,
    pub send_email_message: Option<EmailMessage>,
}

/// The multi-step order placement record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: TransactionId,
    pub kind: TransactionKind,
    pub status: TransactionStatus,
    pub agent: Agent,
    pub seller: Seller,
    pub object: TransactionObject,
    /// Hard admission deadline enforced by the expiry sweep.
    pub expires: DateTime<Utc>,
    pub start_date: DateTime<Utc>,
    /// Set when the transaction reaches a terminal status.
    pub end_date: Option<DateTime<Utc>>,
    pub result: Option<TransactionResult>,
    pub potential_actions: Option<PotentialActions>,
    pub task_export_status: TaskExportStatus,
    /// When the task-export bookkeeping last changed; drives the
    /// staleness check that reclaims crashed exporters.
    pub tasks_exported_at: Option<DateTime<Utc>>,
}

impl Transaction {
    /// Creates a new in-progress transaction starting now.
    pub fn start(
        kind: TransactionKind,
        agent: Agent,
        seller: Seller,
        object: TransactionObject,
        expires: DateTime<Utc>,
    ) -> Self {
        Self {
            id: TransactionId::new(),
            kind,
            status: TransactionStatus::InProgress,
            agent,
            seller,
            object,
            expires,
            start_date: Utc::now(),
            end_date: None,
            result: None,
            potential_actions: None,
            task_export_status: TaskExportStatus::Unexported,
            tasks_exported_at: None,
        }
    }

    /// Returns true while the transaction accepts further operations.
    pub fn is_in_progress(&self) -> bool {
        self.status == TransactionStatus::InProgress
    }

    /// Returns true once `expires` has passed.
    pub fn has_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires <= now
    }

    /// Returns the confirmed order, if this transaction produced one.
    pub fn order(&self) -> Option<&Order> {
        match &self.result {
            Some(TransactionResult::Order(order)) => Some(order),
            _ => None,
        }
    }
}
