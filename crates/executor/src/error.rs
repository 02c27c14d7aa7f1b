use saga::services::ServiceError;
use saga::SagaError;
use store::StoreError;
use thiserror::Error;

/// Errors surfaced by task execution and dispatch.
#[derive(Debug, Error)]
pub enum ExecutorError {
    /// A branch that should be unreachable by design, e.g. exporting
    /// tasks for a transaction status with no defined task set.
    #[error("Not implemented: {0}")]
    NotImplemented(String),

    /// Store error.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Capability service error recorded by a handler.
    #[error("Service error: {0}")]
    Service(#[from] ServiceError),

    /// Saga error.
    #[error("Saga error: {0}")]
    Saga(#[from] SagaError),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for executor operations.
pub type Result<T> = std::result::Result<T, ExecutorError>;
