//! Error types for keyshop storage.

use keyshop_core::ShopError;

/// Result type for storage operations.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Errors that can occur in storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Database operation failed.
    #[error("database error: {0}")]
    Database(String),

    /// Serialization/deserialization failed.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// A stock queue holds fewer keys than requested.
    #[error("insufficient stock: available={available}, requested={requested}")]
    InsufficientStock {
        /// Keys in the queue.
        available: u64,
        /// Keys requested.
        requested: u64,
    },

    /// A compound write was handed inconsistent inputs.
    #[error("conflict: {0}")]
    Conflict(String),
}

impl From<StoreError> for ShopError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::InsufficientStock {
                available,
                requested,
            } => Self::InsufficientStock {
                available,
                requested,
            },
            other => Self::StorageFailure(other.to_string()),
        }
    }
}
