use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use common::TransactionId;
use domain::{
    Action, CustomerContact, PotentialActions, TaskExportStatus, Transaction, TransactionKind,
    TransactionResult, TransactionStatus,
};
use tokio::sync::RwLock;

use crate::error::{Result, StoreError};
use crate::transaction::TransactionStore;

/// In-memory transaction store.
#[derive(Clone, Default)]
pub struct InMemoryTransactionStore {
    rows: Arc<RwLock<HashMap<TransactionId, Transaction>>>,
}

impl InMemoryTransactionStore {
    /// Creates a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the total number of transactions stored.
    pub async fn count(&self) -> usize {
        self.rows.read().await.len()
    }
}

#[async_trait]
impl TransactionStore for InMemoryTransactionStore {
    async fn start(&self, transaction: Transaction) -> Result<Transaction> {
        let mut rows = self.rows.write().await;

        if let Some(passport) = &transaction.object.passport {
            let reused = rows.values().any(|existing| {
                existing
                    .object
                    .passport
                    .as_ref()
                    .is_some_and(|p| p.token == passport.token)
            });
            if reused {
                return Err(StoreError::already_in_use("transaction", &passport.token));
            }
        }

        rows.insert(transaction.id, transaction.clone());
        Ok(transaction)
    }

    async fn find(&self, id: TransactionId) -> Result<Transaction> {
        let rows = self.rows.read().await;
        rows.get(&id)
            .cloned()
            .ok_or_else(|| StoreError::not_found("transaction", id))
    }

    async fn set_customer_contact(
        &self,
        id: TransactionId,
        contact: CustomerContact,
    ) -> Result<Transaction> {
        let mut rows = self.rows.write().await;
        let row = rows
            .get_mut(&id)
            .ok_or_else(|| StoreError::not_found("transaction", id))?;

        if !row.is_in_progress() {
            return Err(StoreError::invalid_status("transaction", id, row.status));
        }

        row.object.customer_contact = Some(contact);
        Ok(row.clone())
    }

    async fn confirm(
        &self,
        id: TransactionId,
        authorize_actions: Vec<Action>,
        result: TransactionResult,
        potential_actions: PotentialActions,
    ) -> Result<Transaction> {
        let mut rows = self.rows.write().await;
        let row = rows
            .get_mut(&id)
            .ok_or_else(|| StoreError::not_found("transaction", id))?;

        match row.status {
            TransactionStatus::InProgress => {
                row.status = TransactionStatus::Confirmed;
                row.end_date = Some(Utc::now());
                row.object.authorize_actions = authorize_actions;
                row.result = Some(result);
                row.potential_actions = Some(potential_actions);
                Ok(row.clone())
            }
            // First writer already won; the retry observes its result.
            TransactionStatus::Confirmed => Ok(row.clone()),
            status => Err(StoreError::invalid_status("transaction", id, status)),
        }
    }

    async fn cancel(&self, id: TransactionId) -> Result<Transaction> {
        let mut rows = self.rows.write().await;
        let row = rows
            .get_mut(&id)
            .ok_or_else(|| StoreError::not_found("transaction", id))?;

        match row.status {
            TransactionStatus::InProgress => {
                row.status = TransactionStatus::Canceled;
                row.end_date = Some(Utc::now());
                Ok(row.clone())
            }
            TransactionStatus::Canceled => Ok(row.clone()),
            status => Err(StoreError::invalid_status("transaction", id, status)),
        }
    }

    async fn start_export_tasks(
        &self,
        kind: TransactionKind,
        status: TransactionStatus,
    ) -> Result<Option<Transaction>> {
        let mut rows = self.rows.write().await;

        let candidate = rows
            .values_mut()
            .filter(|row| {
                row.kind == kind
                    && row.status == status
                    && row.task_export_status == TaskExportStatus::Unexported
            })
            .min_by_key(|row| row.start_date);

        match candidate {
            Some(row) => {
                row.task_export_status = TaskExportStatus::Exporting;
                row.tasks_exported_at = Some(Utc::now());
                Ok(Some(row.clone()))
            }
            None => Ok(None),
        }
    }

    async fn mark_tasks_exported(&self, id: TransactionId) -> Result<()> {
        let mut rows = self.rows.write().await;
        let row = rows
            .get_mut(&id)
            .ok_or_else(|| StoreError::not_found("transaction", id))?;

        row.task_export_status = TaskExportStatus::Exported;
        row.tasks_exported_at = Some(Utc::now());
        Ok(())
    }

    async fn reexport_tasks(&self, stale_after: Duration) -> Result<u64> {
        let threshold = Utc::now() - stale_after;
        let mut rows = self.rows.write().await;

        let mut reset = 0;
        for row in rows.values_mut() {
            if row.task_export_status == TaskExportStatus::Exporting
                && row.tasks_exported_at.is_some_and(|at| at <= threshold)
            {
                row.task_export_status = TaskExportStatus::Unexported;
                reset += 1;
            }
        }
        Ok(reset)
    }

    async fn make_expired(&self, now: DateTime<Utc>) -> Result<u64> {
        let mut rows = self.rows.write().await;

        let mut expired = 0;
        for row in rows.values_mut() {
            if row.status == TransactionStatus::InProgress && row.has_expired(now) {
                row.status = TransactionStatus::Expired;
                row.end_date = Some(now);
                expired += 1;
            }
        }
        Ok(expired)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::{AgentId, SellerId};
    use domain::{
        AdmissionToken, Agent, DeliveryAction, OrderNumber, Seller, SellerType, TransactionObject,
    };

    fn new_transaction(passport: Option<AdmissionToken>) -> Transaction {
        Transaction::start(
            TransactionKind::PlaceOrder,
            Agent::new(AgentId::new()),
            Seller::new(SellerId::new(), "Theater", "118", SellerType::MovieTheater),
            TransactionObject {
                passport,
                ..Default::default()
            },
            Utc::now() + Duration::minutes(15),
        )
    }

    fn refund_result() -> TransactionResult {
        TransactionResult::Refund(domain::RefundDescriptor {
            order_number: OrderNumber::new("M-118-20260807-000001"),
            refund_amount: domain::Money::from_cents(0),
            reason: "test".to_string(),
        })
    }

    fn empty_potential_actions() -> PotentialActions {
        PotentialActions {
            settle_credit_card: vec![],
            settle_account: vec![],
            send_order: DeliveryAction {
                order_number: OrderNumber::new("M-118-20260807-000001"),
            },
            give_point_award: vec![],
            send_email_message: None,
        }
    }

    #[tokio::test]
    async fn start_and_find() {
        let store = InMemoryTransactionStore::new();
        let transaction = new_transaction(None);

        store.start(transaction.clone()).await.unwrap();
        let found = store.find(transaction.id).await.unwrap();
        assert_eq!(found.id, transaction.id);
        assert_eq!(found.status, TransactionStatus::InProgress);
    }

    #[tokio::test]
    async fn find_missing_is_not_found() {
        let store = InMemoryTransactionStore::new();
        let result = store.find(TransactionId::new()).await;
        assert!(matches!(result, Err(StoreError::NotFound { .. })));
    }

    #[tokio::test]
    async fn duplicate_admission_token_is_rejected() {
        let store = InMemoryTransactionStore::new();
        let token = AdmissionToken {
            token: "single-use-token".to_string(),
            issuer: "https://waiter.example.com".to_string(),
            scope: "Transaction:PlaceOrder:seller-1".to_string(),
        };

        store
            .start(new_transaction(Some(token.clone())))
            .await
            .unwrap();
        let second = store.start(new_transaction(Some(token))).await;
        assert!(matches!(second, Err(StoreError::AlreadyInUse { .. })));
    }

    #[tokio::test]
    async fn confirm_transitions_once_and_is_idempotent() {
        let store = InMemoryTransactionStore::new();
        let transaction = new_transaction(None);
        store.start(transaction.clone()).await.unwrap();

        let confirmed = store
            .confirm(
                transaction.id,
                vec![],
                refund_result(),
                empty_potential_actions(),
            )
            .await
            .unwrap();
        assert_eq!(confirmed.status, TransactionStatus::Confirmed);
        assert!(confirmed.end_date.is_some());

        // A retry returns the same row without rewriting it.
        let again = store
            .confirm(
                transaction.id,
                vec![],
                refund_result(),
                empty_potential_actions(),
            )
            .await
            .unwrap();
        assert_eq!(again.end_date, confirmed.end_date);
    }

    #[tokio::test]
    async fn confirm_after_cancel_is_invalid_status() {
        let store = InMemoryTransactionStore::new();
        let transaction = new_transaction(None);
        store.start(transaction.clone()).await.unwrap();
        store.cancel(transaction.id).await.unwrap();

        let result = store
            .confirm(
                transaction.id,
                vec![],
                refund_result(),
                empty_potential_actions(),
            )
            .await;
        assert!(matches!(result, Err(StoreError::InvalidStatus { .. })));
    }

    #[tokio::test]
    async fn cancel_is_idempotent_but_rejects_confirmed() {
        let store = InMemoryTransactionStore::new();
        let transaction = new_transaction(None);
        store.start(transaction.clone()).await.unwrap();

        store.cancel(transaction.id).await.unwrap();
        let again = store.cancel(transaction.id).await.unwrap();
        assert_eq!(again.status, TransactionStatus::Canceled);

        let confirmed = new_transaction(None);
        store.start(confirmed.clone()).await.unwrap();
        store
            .confirm(
                confirmed.id,
                vec![],
                refund_result(),
                empty_potential_actions(),
            )
            .await
            .unwrap();
        let result = store.cancel(confirmed.id).await;
        assert!(matches!(result, Err(StoreError::InvalidStatus { .. })));
    }

    #[tokio::test]
    async fn export_claim_is_exclusive() {
        let store = InMemoryTransactionStore::new();
        let transaction = new_transaction(None);
        store.start(transaction.clone()).await.unwrap();
        store.cancel(transaction.id).await.unwrap();

        let claimed = store
            .start_export_tasks(TransactionKind::PlaceOrder, TransactionStatus::Canceled)
            .await
            .unwrap();
        assert!(claimed.is_some());

        // The same row is not handed out twice.
        let second = store
            .start_export_tasks(TransactionKind::PlaceOrder, TransactionStatus::Canceled)
            .await
            .unwrap();
        assert!(second.is_none());
    }

    #[tokio::test]
    async fn reexport_resets_stale_exporting_rows() {
        let store = InMemoryTransactionStore::new();
        let transaction = new_transaction(None);
        store.start(transaction.clone()).await.unwrap();
        store.cancel(transaction.id).await.unwrap();
        store
            .start_export_tasks(TransactionKind::PlaceOrder, TransactionStatus::Canceled)
            .await
            .unwrap();

        // Fresh bookkeeping is untouched.
        assert_eq!(store.reexport_tasks(Duration::minutes(10)).await.unwrap(), 0);

        // Anything older than a zero-width window is stale.
        assert_eq!(store.reexport_tasks(Duration::zero()).await.unwrap(), 1);
        let reclaimed = store
            .start_export_tasks(TransactionKind::PlaceOrder, TransactionStatus::Canceled)
            .await
            .unwrap();
        assert!(reclaimed.is_some());
    }

    #[tokio::test]
    async fn make_expired_only_touches_overdue_in_progress_rows() {
        let store = InMemoryTransactionStore::new();
        let overdue = new_transaction(None);
        store.start(overdue.clone()).await.unwrap();
        let fresh = new_transaction(None);
        store.start(fresh.clone()).await.unwrap();

        let count = store
            .make_expired(Utc::now() + Duration::minutes(16))
            .await
            .unwrap();
        assert_eq!(count, 2);

        // Terminal rows never transition again.
        let count = store
            .make_expired(Utc::now() + Duration::hours(1))
            .await
            .unwrap();
        assert_eq!(count, 0);
        let row = store.find(overdue.id).await.unwrap();
        assert_eq!(row.status, TransactionStatus::Expired);
    }
}
