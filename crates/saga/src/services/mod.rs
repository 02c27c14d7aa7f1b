//! Capability service ports.
//!
//! Thin interfaces over the external systems the saga calls: the seat
//! reservation service, the payment gateway, the points ledger, the
//! discount-ticket issuer, the admission-token issuer, the number
//! publishers, and the notification channel. Each port ships an in-memory
//! implementation used by tests and development wiring.

pub mod account;
pub mod credit_card;
pub mod discount_ticket;
pub mod notification;
pub mod numbering;
pub mod seat_reservation;
pub mod token;

pub use account::{AccountHold, AccountService, InMemoryAccountService};
pub use credit_card::{CreditCardAuthorization, CreditCardService, InMemoryCreditCardService};
pub use discount_ticket::{
    DiscountTicketAuthorization, DiscountTicketService, InMemoryDiscountTicketService,
};
pub use notification::{InMemoryNotificationSender, NotificationSender};
pub use numbering::{
    ConfirmationNumberPublisher, InMemoryConfirmationNumberPublisher, InMemoryOrderNumberPublisher,
    OrderNumberPublisher,
};
pub use seat_reservation::{InMemorySeatReservationService, SeatHold, SeatReservationService};
pub use token::{AdmissionTokenVerifier, InMemoryAdmissionTokenVerifier, VerifiedToken};

use thiserror::Error;

/// Errors returned by capability services, classified at the gateway
/// boundary so the saga can translate them without inspecting messages.
#[derive(Debug, Clone, Error)]
pub enum ServiceError {
    /// The request itself was invalid.
    #[error("Invalid argument {argument}: {message}")]
    Argument { argument: String, message: String },

    /// The service throttled the request; retrying later may succeed.
    #[error("Rate limited: {0}")]
    RateLimited(String),

    /// The service failed or was unreachable.
    #[error("Unavailable: {0}")]
    Unavailable(String),

    /// The request duplicates an operation the service already performed.
    #[error("Duplicate: {0}")]
    Duplicate(String),
}

impl ServiceError {
    /// Creates an `Argument` error for the given argument name.
    pub fn argument(argument: impl Into<String>, message: impl Into<String>) -> Self {
        ServiceError::Argument {
            argument: argument.into(),
            message: message.into(),
        }
    }

    /// Returns the taxonomy name recorded into failed actions.
    pub fn name(&self) -> &'static str {
        match self {
            ServiceError::Argument { .. } => "Argument",
            ServiceError::RateLimited(_) => "RateLimitExceeded",
            ServiceError::Unavailable(_) => "ServiceUnavailable",
            ServiceError::Duplicate(_) => "AlreadyInUse",
        }
    }
}
