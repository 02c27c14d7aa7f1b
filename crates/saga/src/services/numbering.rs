//! Order number and confirmation number publishers.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use chrono::{Datelike, NaiveDate};
use domain::{OrderNumber, SellerType};

use super::ServiceError;

/// Trait for the order number publisher.
///
/// Published numbers follow `<prefix>-<branch>-<yyyymmdd>-<seq>`: the
/// seller-type prefix, the seller branch code, the sell date, and a
/// zero-padded daily sequence per branch.
#[async_trait]
pub trait OrderNumberPublisher: Send + Sync {
    /// Publishes the next order number for the given sell date and
    /// seller.
    async fn publish(
        &self,
        date: NaiveDate,
        seller_type: SellerType,
        branch_code: &str,
    ) -> Result<OrderNumber, ServiceError>;
}

/// Trait for the confirmation number publisher.
///
/// Confirmation numbers combine a month bucket with a monthly sequence,
/// giving customers a short inquiry number that stays unique long enough.
#[async_trait]
pub trait ConfirmationNumberPublisher: Send + Sync {
    /// Publishes the next confirmation number for the given sell date.
    async fn publish(&self, date: NaiveDate) -> Result<i64, ServiceError>;
}

/// In-memory order number publisher for testing.
#[derive(Debug, Clone, Default)]
pub struct InMemoryOrderNumberPublisher {
    sequences: Arc<RwLock<HashMap<String, i64>>>,
}

impl InMemoryOrderNumberPublisher {
    /// Creates a new in-memory publisher.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns how many numbers have been published.
    pub fn publish_count(&self) -> i64 {
        self.sequences.read().unwrap().values().sum()
    }
}

#[async_trait]
impl OrderNumberPublisher for InMemoryOrderNumberPublisher {
    async fn publish(
        &self,
        date: NaiveDate,
        seller_type: SellerType,
        branch_code: &str,
    ) -> Result<OrderNumber, ServiceError> {
        let mut sequences = self.sequences.write().unwrap();
        let bucket = format!("{}-{}", branch_code, date.format("%Y%m%d"));
        let seq = sequences.entry(bucket).or_insert(0);
        *seq += 1;

        Ok(OrderNumber::new(format!(
            "{}-{}-{}-{:06}",
            seller_type.order_number_prefix(),
            branch_code,
            date.format("%Y%m%d"),
            seq
        )))
    }
}

/// In-memory confirmation number publisher for testing.
#[derive(Debug, Clone, Default)]
pub struct InMemoryConfirmationNumberPublisher {
    sequences: Arc<RwLock<HashMap<i64, i64>>>,
}

impl InMemoryConfirmationNumberPublisher {
    /// Creates a new in-memory publisher.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ConfirmationNumberPublisher for InMemoryConfirmationNumberPublisher {
    async fn publish(&self, date: NaiveDate) -> Result<i64, ServiceError> {
        let mut sequences = self.sequences.write().unwrap();
        let bucket = (date.year() as i64) * 100 + date.month() as i64;
        let seq = sequences.entry(bucket).or_insert(0);
        *seq += 1;

        Ok(bucket * 1_000_000 + *seq)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_order_numbers_sequence_per_branch_and_day() {
        let publisher = InMemoryOrderNumberPublisher::new();
        let date = NaiveDate::from_ymd_opt(2026, 8, 7).unwrap();

        let first = publisher
            .publish(date, SellerType::MovieTheater, "118")
            .await
            .unwrap();
        assert_eq!(first.as_str(), "M-118-20260807-000001");

        let second = publisher
            .publish(date, SellerType::MovieTheater, "118")
            .await
            .unwrap();
        assert_eq!(second.as_str(), "M-118-20260807-000002");

        // Another branch has its own sequence.
        let other = publisher
            .publish(date, SellerType::Corporation, "001")
            .await
            .unwrap();
        assert_eq!(other.as_str(), "C-001-20260807-000001");

        assert_eq!(publisher.publish_count(), 3);
    }

    #[tokio::test]
    async fn test_confirmation_numbers_bucket_by_month() {
        let publisher = InMemoryConfirmationNumberPublisher::new();
        let august = NaiveDate::from_ymd_opt(2026, 8, 7).unwrap();
        let september = NaiveDate::from_ymd_opt(2026, 9, 1).unwrap();

        assert_eq!(publisher.publish(august).await.unwrap(), 202608_000_001);
        assert_eq!(publisher.publish(august).await.unwrap(), 202608_000_002);
        assert_eq!(publisher.publish(september).await.unwrap(), 202609_000_001);
    }
}
