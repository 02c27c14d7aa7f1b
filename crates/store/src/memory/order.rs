use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use domain::{Order, OrderNumber, OrderStatus};
use tokio::sync::RwLock;

use crate::error::{Result, StoreError};
use crate::order::OrderStore;

/// In-memory order projection store.
#[derive(Clone, Default)]
pub struct InMemoryOrderStore {
    rows: Arc<RwLock<HashMap<String, Order>>>,
}

impl InMemoryOrderStore {
    /// Creates a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the total number of orders stored.
    pub async fn count(&self) -> usize {
        self.rows.read().await.len()
    }
}

#[async_trait]
impl OrderStore for InMemoryOrderStore {
    async fn create_if_not_exists(&self, order: Order) -> Result<Order> {
        let mut rows = self.rows.write().await;
        let stored = rows
            .entry(order.order_number.as_str().to_string())
            .or_insert(order);
        Ok(stored.clone())
    }

    async fn find_by_order_number(&self, order_number: &OrderNumber) -> Result<Order> {
        let rows = self.rows.read().await;
        rows.get(order_number.as_str())
            .cloned()
            .ok_or_else(|| StoreError::not_found("order", order_number))
    }

    async fn change_status(
        &self,
        order_number: &OrderNumber,
        from: OrderStatus,
        to: OrderStatus,
    ) -> Result<Order> {
        let mut rows = self.rows.write().await;
        let order = rows
            .get_mut(order_number.as_str())
            .ok_or_else(|| StoreError::not_found("order", order_number))?;

        if order.order_status != from {
            return Err(StoreError::invalid_status(
                "order",
                order_number,
                order.order_status,
            ));
        }

        order.order_status = to;
        Ok(order.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use common::{SellerId, TransactionId};
    use domain::{CustomerContact, Money, Seller, SellerType};

    fn new_order(number: &str) -> Order {
        Order {
            order_number: OrderNumber::new(number),
            confirmation_number: 80_000_001,
            seller: Seller::new(SellerId::new(), "Theater", "118", SellerType::MovieTheater),
            customer: CustomerContact {
                family_name: "Yamada".to_string(),
                given_name: "Taro".to_string(),
                email: "taro@example.com".to_string(),
                telephone: "+819012345678".to_string(),
            },
            accepted_offers: vec![],
            price: Money::from_cents(1800),
            payment_methods: vec![],
            order_status: OrderStatus::Processing,
            order_date: Utc::now(),
            transaction_id: TransactionId::new(),
        }
    }

    #[tokio::test]
    async fn create_if_not_exists_is_idempotent() {
        let store = InMemoryOrderStore::new();
        let order = new_order("M-118-20260807-000001");

        let first = store.create_if_not_exists(order.clone()).await.unwrap();

        // A replay with different content keeps the first materialization.
        let mut replay = order.clone();
        replay.confirmation_number = 99;
        let second = store.create_if_not_exists(replay).await.unwrap();
        assert_eq!(second.confirmation_number, first.confirmation_number);
        assert_eq!(store.count().await, 1);
    }

    #[tokio::test]
    async fn change_status_follows_the_delivery_chain() {
        let store = InMemoryOrderStore::new();
        let order = new_order("M-118-20260807-000002");
        store.create_if_not_exists(order.clone()).await.unwrap();

        let delivered = store
            .change_status(
                &order.order_number,
                OrderStatus::Processing,
                OrderStatus::Delivered,
            )
            .await
            .unwrap();
        assert_eq!(delivered.order_status, OrderStatus::Delivered);

        // Delivering twice fails the conditional update.
        let again = store
            .change_status(
                &order.order_number,
                OrderStatus::Processing,
                OrderStatus::Delivered,
            )
            .await;
        assert!(matches!(again, Err(StoreError::InvalidStatus { .. })));
    }

    #[tokio::test]
    async fn missing_order_is_not_found() {
        let store = InMemoryOrderStore::new();
        let result = store
            .find_by_order_number(&OrderNumber::new("M-118-20260807-999999"))
            .await;
        assert!(matches!(result, Err(StoreError::NotFound { .. })));
    }
}
