use std::sync::Arc;

use saga::services::{
    AccountService, CreditCardService, DiscountTicketService, NotificationSender,
    SeatReservationService,
};
use store::{ActionStore, OrderStore, TaskStore, TransactionStore};

/// Everything task handlers need, built once at process start and shared
/// across every worker loop.
#[derive(Clone)]
pub struct TaskContext {
    pub transactions: Arc<dyn TransactionStore>,
    pub actions: Arc<dyn ActionStore>,
    pub tasks: Arc<dyn TaskStore>,
    pub orders: Arc<dyn OrderStore>,
    pub seat_reservation: Arc<dyn SeatReservationService>,
    pub credit_card: Arc<dyn CreditCardService>,
    pub account: Arc<dyn AccountService>,
    pub discount_ticket: Arc<dyn DiscountTicketService>,
    pub notifications: Arc<dyn NotificationSender>,
}
