//! Shared identifier types used across the boxoffice crates.

pub mod types;

pub use types::{ActionId, AgentId, SellerId, TaskId, TransactionId};
