use async_trait::async_trait;
use domain::{Order, OrderNumber, OrderStatus};
use sqlx::PgPool;

use crate::error::{Result, StoreError};
use crate::order::OrderStore;
use crate::postgres::decode_doc;

/// PostgreSQL-backed order projection store.
#[derive(Clone)]
pub struct PostgresOrderStore {
    pool: PgPool,
}

impl PostgresOrderStore {
    /// Creates a new PostgreSQL order store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl OrderStore for PostgresOrderStore {
    async fn create_if_not_exists(&self, order: Order) -> Result<Order> {
        let doc = serde_json::to_value(&order)?;

        // The primary key makes materialization idempotent: a replay hits
        // the conflict and keeps the first write.
        sqlx::query(
            r#"
            INSERT INTO orders (order_number, order_status, transaction_id, order_date, doc)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (order_number) DO NOTHING
            "#,
        )
        .bind(order.order_number.as_str())
        .bind(order.order_status.as_str())
        .bind(order.transaction_id.as_uuid())
        .bind(order.order_date)
        .bind(&doc)
        .execute(&self.pool)
        .await?;

        self.find_by_order_number(&order.order_number).await
    }

    async fn find_by_order_number(&self, order_number: &OrderNumber) -> Result<Order> {
        let row = sqlx::query("SELECT doc FROM orders WHERE order_number = $1")
            .bind(order_number.as_str())
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| StoreError::not_found("order", order_number))?;

        decode_doc(&row)
    }

    async fn change_status(
        &self,
        order_number: &OrderNumber,
        from: OrderStatus,
        to: OrderStatus,
    ) -> Result<Order> {
        let row = sqlx::query(
            r#"
            UPDATE orders
            SET order_status = $3,
                doc = doc || jsonb_build_object('order_status', $3::text)
            WHERE order_number = $1 AND order_status = $2
            RETURNING doc
            "#,
        )
        .bind(order_number.as_str())
        .bind(from.as_str())
        .bind(to.as_str())
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => decode_doc(&row),
            None => {
                let order = self.find_by_order_number(order_number).await?;
                Err(StoreError::invalid_status(
                    "order",
                    order_number,
                    order.order_status,
                ))
            }
        }
    }
}
