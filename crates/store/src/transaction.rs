use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use common::TransactionId;
use domain::{
    Action, CustomerContact, PotentialActions, Transaction, TransactionKind, TransactionResult,
    TransactionStatus,
};

use crate::Result;

/// Port for the durable transaction record.
///
/// Status moves from `InProgress` to exactly one terminal state through a
/// conditional update. When the condition does not match, implementations
/// re-read the row and classify the outcome instead of failing blindly:
/// a transition that already happened is reported idempotently, a
/// conflicting terminal state is an `InvalidStatus`, and a missing row is
/// `NotFound`. This makes concurrent confirm/cancel/expire races resolve
/// first-writer-wins and lets clients retry safely across network
/// failures.
#[async_trait]
pub trait TransactionStore: Send + Sync {
    /// Inserts a new in-progress transaction.
    ///
    /// An admission token already attached to another transaction is
    /// rejected with `AlreadyInUse` by the store's uniqueness constraint;
    /// callers never pre-check.
    async fn start(&self, transaction: Transaction) -> Result<Transaction>;

    /// Retrieves a transaction by ID.
    async fn find(&self, id: TransactionId) -> Result<Transaction>;

    /// Sets the customer contact on an in-progress transaction.
    ///
    /// A terminal transaction rejects the update with `InvalidStatus`.
    async fn set_customer_contact(
        &self,
        id: TransactionId,
        contact: CustomerContact,
    ) -> Result<Transaction>;

    /// Confirms an in-progress transaction, attaching the authorize-action
    /// snapshot, the result, and the compiled potential actions.
    ///
    /// Already confirmed ⇒ returns the existing row unchanged (idempotent).
    /// Expired or canceled ⇒ `InvalidStatus`. Missing ⇒ `NotFound`.
    async fn confirm(
        &self,
        id: TransactionId,
        authorize_actions: Vec<Action>,
        result: TransactionResult,
        potential_actions: PotentialActions,
    ) -> Result<Transaction>;

    /// Cancels an in-progress transaction.
    ///
    /// Already canceled ⇒ returns the existing row unchanged (idempotent).
    /// Confirmed or expired ⇒ `InvalidStatus`. Missing ⇒ `NotFound`.
    async fn cancel(&self, id: TransactionId) -> Result<Transaction>;

    /// Claims one terminal transaction of the given kind and status for
    /// task export: CAS `Unexported` → `Exporting`.
    ///
    /// Returns `None` when no row is eligible, which is how concurrent
    /// exporters lose the race. At most one exporter holds a given
    /// transaction's fan-out at a time.
    async fn start_export_tasks(
        &self,
        kind: TransactionKind,
        status: TransactionStatus,
    ) -> Result<Option<Transaction>>;

    /// Marks a transaction's task export finished: `Exporting` → `Exported`.
    async fn mark_tasks_exported(&self, id: TransactionId) -> Result<()>;

    /// Recovers from crashed exporters: resets `Exporting` rows whose
    /// bookkeeping has not moved for `stale_after` back to `Unexported`.
    /// Returns the number of rows reset.
    async fn reexport_tasks(&self, stale_after: Duration) -> Result<u64>;

    /// Expires in-progress transactions whose admission deadline has
    /// passed: bulk CAS `InProgress` → `Expired`. Returns the number of
    /// rows expired.
    async fn make_expired(&self, now: DateTime<Utc>) -> Result<u64>;
}
