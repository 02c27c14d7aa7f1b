//! PostgreSQL adapters.
//!
//! Rows are jsonb documents with the CAS-relevant fields promoted into
//! columns; every transition is either a single conditional `UPDATE`
//! (`WHERE` on the expected state, `SKIP LOCKED` for claims) or a
//! read-modify-write guarded by the state the read observed. A write
//! that matches no row re-reads and classifies the outcome.

mod action;
mod order;
mod task;
mod transaction;

pub use action::PostgresActionStore;
pub use order::PostgresOrderStore;
pub use task::PostgresTaskStore;
pub use transaction::PostgresTransactionStore;

use serde::de::DeserializeOwned;
use sqlx::Row;
use sqlx::postgres::PgRow;

use crate::Result;

/// Decodes the `doc` column of a row into a domain type.
pub(crate) fn decode_doc<T: DeserializeOwned>(row: &PgRow) -> Result<T> {
    let doc: serde_json::Value = row.try_get("doc")?;
    Ok(serde_json::from_value(doc)?)
}
