//! Seat offers, ticket pricing, and payment method classification.

use serde::{Deserialize, Serialize};

use crate::money::Money;

/// Identifier of a ticketed event (a screening, a performance).
///
/// The event catalog itself is maintained elsewhere; the core only carries
/// the identity through reservations and reconciliation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventId(String);

impl EventId {
    /// Creates a new event ID from a string.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the event ID as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for EventId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for EventId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for EventId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// The kind of payment instrument used on the customer side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PaymentMethodKind {
    /// Credit card charge through the payment gateway.
    CreditCard,

    /// Point account withdrawal through the points ledger.
    Account,

    /// Pre-purchased discount ticket covering part of the price.
    DiscountTicket,
}

impl PaymentMethodKind {
    /// Returns the kind name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethodKind::CreditCard => "CreditCard",
            PaymentMethodKind::Account => "Account",
            PaymentMethodKind::DiscountTicket => "DiscountTicket",
        }
    }
}

impl std::fmt::Display for PaymentMethodKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Pricing of one ticket as published by the seller's catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TicketType {
    /// Catalog code for this ticket type.
    pub code: String,
    pub name: String,
    /// Monetary charge for the seat.
    pub charge: Money,
    /// Points required in addition to the monetary charge.
    pub point_requirement: i64,
    /// When set, the seat price includes a discount-ticket component and
    /// must be matched by an authorized discount-ticket unit of this
    /// service type.
    pub discount_service_type: Option<String>,
}

/// A seat held by the seat reservation service for a transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReservedSeat {
    pub event_id: EventId,
    pub seat_number: String,
    pub ticket_type: TicketType,
}

/// One authorized discount-ticket unit.
///
/// Units are matched against reserved seats by (event, service type)
/// count and by (event, seat number) identity at confirm time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscountTicketUnit {
    pub event_id: EventId,
    pub seat_number: String,
    pub service_type: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plain_ticket() -> TicketType {
        TicketType {
            code: "TT-GENERAL".to_string(),
            name: "General".to_string(),
            charge: Money::from_cents(1800),
            point_requirement: 0,
            discount_service_type: None,
        }
    }

    #[test]
    fn test_event_id_string_conversion() {
        let id = EventId::new("evt-20260807-001");
        assert_eq!(id.as_str(), "evt-20260807-001");

        let id2: EventId = "evt-2".into();
        assert_eq!(id2.to_string(), "evt-2");
    }

    #[test]
    fn test_payment_method_kind_display() {
        assert_eq!(PaymentMethodKind::CreditCard.to_string(), "CreditCard");
        assert_eq!(PaymentMethodKind::Account.to_string(), "Account");
        assert_eq!(
            PaymentMethodKind::DiscountTicket.to_string(),
            "DiscountTicket"
        );
    }

    #[test]
    fn test_reserved_seat_serialization_roundtrip() {
        let seat = ReservedSeat {
            event_id: EventId::new("evt-1"),
            seat_number: "A-3".to_string(),
            ticket_type: plain_ticket(),
        };
        let json = serde_json::to_string(&seat).unwrap();
        let deserialized: ReservedSeat = serde_json::from_str(&json).unwrap();
        assert_eq!(seat, deserialized);
    }
}
