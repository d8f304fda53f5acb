//! Error types for keyshop.

use crate::catalog::Sku;
use crate::ids::IdError;

/// Result type for keyshop operations.
pub type Result<T> = std::result::Result<T, ShopError>;

/// Errors returned to callers of the purchase engine and the admin API.
///
/// Every variant carries enough structured data for the command layer to render
/// an actionable message without the core knowing about formatting.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ShopError {
    /// The product/duration pair is not registered or has no price.
    #[error("unknown product: {product} {duration}")]
    UnknownProduct {
        /// Product name as requested.
        product: String,
        /// Duration as requested.
        duration: String,
    },

    /// The stock queue holds fewer keys than requested.
    #[error("insufficient stock: available={available}, requested={requested}")]
    InsufficientStock {
        /// Keys currently in the queue.
        available: u64,
        /// Keys requested.
        requested: u64,
    },

    /// The charge exceeds the account balance.
    #[error("insufficient balance: available={available}, required={required}")]
    InsufficientBalance {
        /// Current balance in cents.
        available: i64,
        /// Required amount in cents.
        required: i64,
    },

    /// An argument failed validation.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A durable read or write could not be completed.
    #[error("storage failure: {0}")]
    StorageFailure(String),
}

impl ShopError {
    /// Build an `UnknownProduct` error for a SKU.
    #[must_use]
    pub fn unknown_product(sku: &Sku) -> Self {
        Self::UnknownProduct {
            product: sku.product.to_string(),
            duration: sku.duration.to_string(),
        }
    }

    /// Whether this error reflects a business rule rather than infrastructure.
    #[must_use]
    pub const fn is_rejection(&self) -> bool {
        !matches!(self, Self::StorageFailure(_))
    }
}

impl From<IdError> for ShopError {
    fn from(err: IdError) -> Self {
        Self::InvalidArgument(err.to_string())
    }
}
