use async_trait::async_trait;
use common::{ActionId, TransactionId};
use domain::{Action, ActionResult};

use crate::Result;

/// Port for the durable action record.
///
/// An action is created `Active` by `start`. `complete` and `give_up`
/// finish an active action exactly once; `cancel` additionally revokes a
/// completed authorization, keeping its recorded result so the reversal
/// can reach the external system. Canceled and failed actions never
/// transition again.
#[async_trait]
pub trait ActionStore: Send + Sync {
    /// Inserts a new active action.
    async fn start(&self, action: Action) -> Result<Action>;

    /// Retrieves an action by ID.
    async fn find(&self, id: ActionId) -> Result<Action>;

    /// Completes an active action with its result: CAS `Active` →
    /// `Completed`, setting `end_date`.
    async fn complete(&self, id: ActionId, result: ActionResult) -> Result<Action>;

    /// Cancels an action: CAS `Active` or `Completed` → `Canceled`. The
    /// recorded result is kept.
    async fn cancel(&self, id: ActionId) -> Result<Action>;

    /// Fails an active action, recording the error that made it give up:
    /// CAS `Active` → `Failed`.
    async fn give_up(&self, id: ActionId, error: serde_json::Value) -> Result<Action>;

    /// Retrieves every action belonging to a transaction, oldest first.
    async fn search_by_purpose(&self, purpose: TransactionId) -> Result<Vec<Action>>;
}
