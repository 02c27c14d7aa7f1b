//! Saga error taxonomy.

use store::StoreError;
use thiserror::Error;

use crate::services::ServiceError;

/// Errors surfaced by saga operations.
///
/// This is the caller-facing taxonomy: validation and reconciliation
/// failures are `Argument`, ownership violations `Forbidden`, uniqueness
/// violations `AlreadyInUse`, downstream throttling and outages
/// `RateLimitExceeded` and `ServiceUnavailable`, and branches that exist
/// only as design invariants `NotImplemented`.
#[derive(Debug, Error)]
pub enum SagaError {
    /// Validation or reconciliation failure caused by the client.
    #[error("Invalid argument {argument}: {message}")]
    Argument { argument: String, message: String },

    /// The referenced entity does not exist.
    #[error("{entity} not found: {key}")]
    NotFound { entity: &'static str, key: String },

    /// The caller does not own the resource.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// A uniqueness constraint rejected the operation.
    #[error("{entity} already in use: {key}")]
    AlreadyInUse { entity: &'static str, key: String },

    /// A downstream service throttled the request.
    #[error("Rate limit exceeded: {0}")]
    RateLimitExceeded(String),

    /// A downstream service failed.
    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    /// A branch that should be unreachable by design.
    #[error("Not implemented: {0}")]
    NotImplemented(String),

    /// A store failure with no domain meaning at this layer.
    #[error("Store error: {0}")]
    Store(StoreError),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl SagaError {
    /// Creates an `Argument` error for the given argument name.
    pub fn argument(argument: impl Into<String>, message: impl Into<String>) -> Self {
        SagaError::Argument {
            argument: argument.into(),
            message: message.into(),
        }
    }
}

impl From<StoreError> for SagaError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound { entity, key } => SagaError::NotFound { entity, key },
            StoreError::AlreadyInUse { entity, key } => SagaError::AlreadyInUse { entity, key },
            // A conditional write that found the row already terminal is a
            // client mistake: the transaction cannot be operated on anymore.
            StoreError::InvalidStatus {
                entity,
                key,
                status,
            } => SagaError::Argument {
                argument: format!("{entity}Id"),
                message: format!("{entity} {key} is already {status}"),
            },
            e => SagaError::Store(e),
        }
    }
}

impl From<ServiceError> for SagaError {
    fn from(e: ServiceError) -> Self {
        match e {
            ServiceError::Argument { argument, message } => {
                SagaError::Argument { argument, message }
            }
            ServiceError::RateLimited(message) => SagaError::RateLimitExceeded(message),
            ServiceError::Unavailable(message) => SagaError::ServiceUnavailable(message),
            ServiceError::Duplicate(message) => SagaError::AlreadyInUse {
                entity: "external",
                key: message,
            },
        }
    }
}

/// Result type for saga operations.
pub type Result<T> = std::result::Result<T, SagaError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_errors_map_onto_the_taxonomy() {
        let e: SagaError = StoreError::not_found("transaction", "abc").into();
        assert!(matches!(e, SagaError::NotFound { .. }));

        let e: SagaError = StoreError::already_in_use("transaction", "token").into();
        assert!(matches!(e, SagaError::AlreadyInUse { .. }));

        let e: SagaError = StoreError::invalid_status("transaction", "abc", "Expired").into();
        assert!(matches!(e, SagaError::Argument { .. }));
    }

    #[test]
    fn test_service_errors_map_onto_the_taxonomy() {
        let e: SagaError = ServiceError::RateLimited("slow down".to_string()).into();
        assert!(matches!(e, SagaError::RateLimitExceeded(_)));

        let e: SagaError = ServiceError::Unavailable("gateway down".to_string()).into();
        assert!(matches!(e, SagaError::ServiceUnavailable(_)));

        let e: SagaError = ServiceError::Duplicate("already authorized".to_string()).into();
        assert!(matches!(e, SagaError::AlreadyInUse { .. }));
    }
}
