//! Domain model for the boxoffice order placement core.
//!
//! This crate defines the durable records the platform coordinates on
//! (transactions, actions, tasks, and the order projection) together with
//! the value objects (money, parties, seat offers) and the status state
//! machines that constrain their transitions. All coordination-relevant
//! payloads are tagged variant sets; there are no free-form documents.

pub mod action;
pub mod money;
pub mod notification;
pub mod offer;
pub mod order;
pub mod party;
pub mod task;
pub mod transaction;

pub use action::{Action, ActionKind, ActionObject, ActionResult, ActionStatus, SeatOfferRequest};
pub use common::{ActionId, AgentId, SellerId, TaskId, TransactionId};
pub use money::Money;
pub use notification::EmailMessage;
pub use offer::{DiscountTicketUnit, EventId, PaymentMethodKind, ReservedSeat, TicketType};
pub use order::{AcceptedOffer, Order, OrderNumber, OrderStatus, PaymentMethod};
pub use party::{Agent, CustomerContact, Seller, SellerType};
pub use task::{CompensationData, ExecutionResult, Task, TaskKind, TaskPayload, TaskStatus};
pub use transaction::{
    AccountSettlement, AdmissionToken, CreditCardSettlement, DeliveryAction, PointAwardGrant,
    PotentialActions, RefundDescriptor, TaskExportStatus, Transaction, TransactionKind,
    TransactionObject, TransactionResult, TransactionStatus,
};
