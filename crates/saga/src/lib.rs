//! Order placement saga.
//!
//! A place-order transaction is a multi-step business transaction with no
//! cross-step lock: `start` opens it, per-capability `authorize` calls run
//! independent sub-sagas against the external payment and reservation
//! services, and `confirm` reconciles everything before committing the
//! transaction with a single conditional write. Terminal transactions owe
//! side effects, compiled into potential actions at confirm time and
//! fanned out later through the task queue.

pub mod error;
pub mod place_order;
pub mod services;

pub use error::{Result, SagaError};
pub use place_order::{
    AuthorizeAccountParams, AuthorizeCreditCardParams, AuthorizeDiscountTicketParams,
    AuthorizePointAwardParams, AuthorizeSeatReservationParams, ConfirmParams, OrderPlacementSaga,
    PlaceOrderDependencies, StartParams,
};
pub use services::{
    AccountService, AdmissionTokenVerifier, ConfirmationNumberPublisher, CreditCardService,
    DiscountTicketService, NotificationSender, OrderNumberPublisher, SeatReservationService,
    ServiceError,
};
