//! Storage ports and adapters.
//!
//! One port trait per durable entity (transaction, action, task, order),
//! each with an in-memory adapter for tests and development and a
//! PostgreSQL adapter for production. Every multi-writer operation is a
//! single-row compare-and-swap: the conditional write either matches and
//! transitions the row, or the caller re-reads and reacts to what the
//! winning writer left behind. There are no locks above the store.

pub mod action;
pub mod error;
pub mod memory;
pub mod order;
pub mod postgres;
pub mod task;
pub mod transaction;

pub use action::ActionStore;
pub use error::{Result, StoreError};
pub use memory::{InMemoryActionStore, InMemoryOrderStore, InMemoryTaskStore, InMemoryTransactionStore};
pub use order::OrderStore;
pub use postgres::{PostgresActionStore, PostgresOrderStore, PostgresTaskStore, PostgresTransactionStore};
pub use task::TaskStore;
pub use transaction::TransactionStore;
