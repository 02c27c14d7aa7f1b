use async_trait::async_trait;
use domain::{Order, OrderNumber, OrderStatus};

use crate::Result;

/// Port for the order projection.
///
/// Orders are materialized exactly once; the unique order number makes
/// re-materialization idempotent. Only the delivery status changes
/// afterwards, through a conditional update.
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Inserts the order unless one with the same order number already
    /// exists, in which case the existing row is returned unchanged.
    async fn create_if_not_exists(&self, order: Order) -> Result<Order>;

    /// Retrieves an order by order number.
    async fn find_by_order_number(&self, order_number: &OrderNumber) -> Result<Order>;

    /// Transitions the delivery status: CAS `from` → `to`. A row in any
    /// other status rejects the update with `InvalidStatus`.
    async fn change_status(
        &self,
        order_number: &OrderNumber,
        from: OrderStatus,
        to: OrderStatus,
    ) -> Result<Order>;
}
