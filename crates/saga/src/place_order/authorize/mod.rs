//! Per-capability authorization sub-sagas.
//!
//! Each capability follows the same shape: open an Authorize action,
//! call the external system, and complete the action with the normalized
//! result, or record the classified failure and re-raise. Cancellation
//! transitions the action first and reverses the external side best
//! effort; a reversal failure is logged, never surfaced, because the
//! action is already locally canceled.
//!
//! Sub-sagas on distinct actions of the same transaction are fully
//! independent and may run in parallel.

mod account;
mod credit_card;
mod discount_ticket;
mod point_award;
mod seat_reservation;

pub use account::AuthorizeAccountParams;
pub use credit_card::AuthorizeCreditCardParams;
pub use discount_ticket::AuthorizeDiscountTicketParams;
pub use point_award::AuthorizePointAwardParams;
pub use seat_reservation::AuthorizeSeatReservationParams;
