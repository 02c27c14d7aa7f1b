use thiserror::Error;

/// Errors that can occur when interacting with the stores.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The requested row does not exist.
    #[error("{entity} not found: {key}")]
    NotFound { entity: &'static str, key: String },

    /// A uniqueness constraint rejected the write (admission token reuse,
    /// duplicate order number).
    #[error("{entity} already in use: {key}")]
    AlreadyInUse { entity: &'static str, key: String },

    /// A conditional write found the row in a state that forbids the
    /// transition (e.g. confirming an expired transaction).
    #[error("{entity} {key} is already {status}")]
    InvalidStatus {
        entity: &'static str,
        key: String,
        status: String,
    },

    /// A conditional write lost a race it cannot classify further.
    #[error("conflict: {0}")]
    Conflict(String),

    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A serialization/deserialization error occurred.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl StoreError {
    /// Creates a `NotFound` for the given entity and key.
    pub fn not_found(entity: &'static str, key: impl ToString) -> Self {
        StoreError::NotFound {
            entity,
            key: key.to_string(),
        }
    }

    /// Creates an `AlreadyInUse` for the given entity and key.
    pub fn already_in_use(entity: &'static str, key: impl ToString) -> Self {
        StoreError::AlreadyInUse {
            entity,
            key: key.to_string(),
        }
    }

    /// Creates an `InvalidStatus` for the given entity, key, and status.
    pub fn invalid_status(
        entity: &'static str,
        key: impl ToString,
        status: impl ToString,
    ) -> Self {
        StoreError::InvalidStatus {
            entity,
            key: key.to_string(),
            status: status.to_string(),
        }
    }
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
