//! The order projection.
//!
//! An order is materialized exactly once from a confirmed transaction and
//! never rebuilt; only its delivery status changes afterwards, driven by
//! the downstream delivery and return handlers.

use chrono::{DateTime, Utc};
use common::TransactionId;
use serde::{Deserialize, Serialize};

use crate::money::Money;
use crate::offer::{PaymentMethodKind, ReservedSeat};
use crate::party::{CustomerContact, Seller};

/// A published order number.
///
/// Format: seller-type prefix, seller branch code, sell date, and a
/// zero-padded daily sequence (e.g. `M-118-20260807-000042`). Globally
/// unique; uniqueness is enforced by the order store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderNumber(String);

impl OrderNumber {
    /// Creates an order number from an already-published string.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Returns the order number as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for OrderNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The state of an order in its delivery lifecycle.
///
/// State transitions:
/// ```text
/// Processing ──► Delivered ──► Returned
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum OrderStatus {
    /// Order exists but tickets have not been delivered yet.
    #[default]
    Processing,

    /// Tickets have been delivered to the customer.
    Delivered,

    /// The order was returned after delivery.
    Returned,
}

impl OrderStatus {
    /// Returns true if the order can be delivered in this state.
    pub fn can_deliver(&self) -> bool {
        matches!(self, OrderStatus::Processing)
    }

    /// Returns true if the order can be returned in this state.
    pub fn can_return(&self) -> bool {
        matches!(self, OrderStatus::Delivered)
    }

    /// Returns the state name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Processing => "Processing",
            OrderStatus::Delivered => "Delivered",
            OrderStatus::Returned => "Returned",
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A payment instrument recorded on the order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentMethod {
    pub kind: PaymentMethodKind,
    /// Reference assigned by the external payment system.
    pub external_ref: String,
}

/// One seat the customer accepted, at the price it was authorized for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AcceptedOffer {
    pub item_offered: ReservedSeat,
    pub price: Money,
}

/// The order projection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub order_number: OrderNumber,
    /// Human-friendly inquiry number published per month bucket.
    pub confirmation_number: i64,
    pub seller: Seller,
    pub customer: CustomerContact,
    pub accepted_offers: Vec<AcceptedOffer>,
    /// Total monetary price across accepted offers.
    pub price: Money,
    pub payment_methods: Vec<PaymentMethod>,
    pub order_status: OrderStatus,
    pub order_date: DateTime<Utc>,
    /// The transaction this order was confirmed from.
    pub transaction_id: TransactionId,
}
