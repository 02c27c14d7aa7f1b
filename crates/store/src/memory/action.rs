use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use common::{ActionId, TransactionId};
use domain::{Action, ActionResult, ActionStatus};
use tokio::sync::RwLock;

use crate::action::ActionStore;
use crate::error::{Result, StoreError};

/// In-memory action store.
#[derive(Clone, Default)]
pub struct InMemoryActionStore {
    rows: Arc<RwLock<HashMap<ActionId, Action>>>,
}

impl InMemoryActionStore {
    /// Creates a new empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl InMemoryActionStore {
    async fn finish(
        &self,
        id: ActionId,
        to: ActionStatus,
        result: Option<ActionResult>,
        error: Option<serde_json::Value>,
    ) -> Result<Action> {
        let mut rows = self.rows.write().await;
        let action = rows
            .get_mut(&id)
            .ok_or_else(|| StoreError::not_found("action", id))?;

        if action.status != ActionStatus::Active {
            return Err(StoreError::invalid_status("action", id, action.status));
        }

        action.status = to;
        action.result = result;
        action.error = error;
        action.end_date = Some(Utc::now());
        Ok(action.clone())
    }
}

#[async_trait]
impl ActionStore for InMemoryActionStore {
    async fn start(&self, action: Action) -> Result<Action> {
        let mut rows = self.rows.write().await;
        rows.insert(action.id, action.clone());
        Ok(action)
    }

    async fn find(&self, id: ActionId) -> Result<Action> {
        let rows = self.rows.read().await;
        rows.get(&id)
            .cloned()
            .ok_or_else(|| StoreError::not_found("action", id))
    }

    async fn complete(&self, id: ActionId, result: ActionResult) -> Result<Action> {
        self.finish(id, ActionStatus::Completed, Some(result), None)
            .await
    }

    async fn cancel(&self, id: ActionId) -> Result<Action> {
        let mut rows = self.rows.write().await;
        let action = rows
            .get_mut(&id)
            .ok_or_else(|| StoreError::not_found("action", id))?;

        match action.status {
            // Canceling keeps the result so the external authorization
            // can still be reversed.
            ActionStatus::Active | ActionStatus::Completed => {
                action.status = ActionStatus::Canceled;
                action.end_date = Some(Utc::now());
                Ok(action.clone())
            }
            status => Err(StoreError::invalid_status("action", id, status)),
        }
    }

    async fn give_up(&self, id: ActionId, error: serde_json::Value) -> Result<Action> {
        self.finish(id, ActionStatus::Failed, None, Some(error))
            .await
    }

    async fn search_by_purpose(&self, purpose: TransactionId) -> Result<Vec<Action>> {
        let rows = self.rows.read().await;
        let mut actions: Vec<_> = rows
            .values()
            .filter(|action| action.purpose == purpose)
            .cloned()
            .collect();
        actions.sort_by_key(|action| action.start_date);
        Ok(actions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::AgentId;
    use domain::{ActionKind, ActionObject, Money};

    fn new_action(purpose: TransactionId) -> Action {
        Action::start(
            ActionKind::Authorize,
            AgentId::new(),
            purpose,
            ActionObject::CreditCard {
                amount: Money::from_cents(1800),
                card_token: "tok_visa".to_string(),
            },
        )
    }

    fn card_result() -> ActionResult {
        ActionResult::CreditCardAuthorized {
            amount: Money::from_cents(1800),
            external_ref: "GMO-0001".to_string(),
            pending_handle: "pending-0001".to_string(),
        }
    }

    #[tokio::test]
    async fn complete_sets_result_and_end_date() {
        let store = InMemoryActionStore::new();
        let action = store.start(new_action(TransactionId::new())).await.unwrap();

        let completed = store.complete(action.id, card_result()).await.unwrap();
        assert_eq!(completed.status, ActionStatus::Completed);
        assert!(completed.result.is_some());
        assert!(completed.end_date.is_some());
    }

    #[tokio::test]
    async fn completion_happens_exactly_once() {
        let store = InMemoryActionStore::new();
        let action = store.start(new_action(TransactionId::new())).await.unwrap();
        store.complete(action.id, card_result()).await.unwrap();

        let again = store.complete(action.id, card_result()).await;
        assert!(matches!(again, Err(StoreError::InvalidStatus { .. })));
        let give_up = store.give_up(action.id, serde_json::json!({})).await;
        assert!(matches!(give_up, Err(StoreError::InvalidStatus { .. })));
    }

    #[tokio::test]
    async fn cancel_revokes_a_completed_authorization_keeping_its_result() {
        let store = InMemoryActionStore::new();
        let action = store.start(new_action(TransactionId::new())).await.unwrap();
        store.complete(action.id, card_result()).await.unwrap();

        let canceled = store.cancel(action.id).await.unwrap();
        assert_eq!(canceled.status, ActionStatus::Canceled);
        assert!(canceled.result.is_some());

        // Canceled actions never transition again.
        let again = store.cancel(action.id).await;
        assert!(matches!(again, Err(StoreError::InvalidStatus { .. })));
    }

    #[tokio::test]
    async fn give_up_records_the_error() {
        let store = InMemoryActionStore::new();
        let action = store.start(new_action(TransactionId::new())).await.unwrap();

        let failed = store
            .give_up(action.id, serde_json::json!({"name": "ServiceUnavailable"}))
            .await
            .unwrap();
        assert_eq!(failed.status, ActionStatus::Failed);
        assert_eq!(failed.error.unwrap()["name"], "ServiceUnavailable");
    }

    #[tokio::test]
    async fn search_by_purpose_returns_only_owned_actions_in_order() {
        let store = InMemoryActionStore::new();
        let purpose = TransactionId::new();

        let first = store.start(new_action(purpose)).await.unwrap();
        let second = store.start(new_action(purpose)).await.unwrap();
        store.start(new_action(TransactionId::new())).await.unwrap();

        let actions = store.search_by_purpose(purpose).await.unwrap();
        assert_eq!(actions.len(), 2);
        assert!(actions[0].start_date <= actions[1].start_date);
        let ids: Vec<_> = actions.iter().map(|a| a.id).collect();
        assert!(ids.contains(&first.id));
        assert!(ids.contains(&second.id));
    }

    #[tokio::test]
    async fn missing_action_is_not_found() {
        let store = InMemoryActionStore::new();
        let result = store.find(ActionId::new()).await;
        assert!(matches!(result, Err(StoreError::NotFound { .. })));
    }
}
