//! Database schema definitions and column families.
//!
//! This module defines the column families used in `RocksDB` storage.

/// Column family names for the `RocksDB` database.
pub mod cf {
    /// Account records, keyed by `user_id`.
    pub const ACCOUNTS: &str = "accounts";

    /// Product definitions, keyed by product name.
    pub const PRODUCTS: &str = "products";

    /// Unit prices, keyed by encoded SKU.
    pub const PRICES: &str = "prices";

    /// Per-queue head/tail pointers and lifetime counters, keyed by encoded SKU.
    pub const STOCK_META: &str = "stock_meta";

    /// Queued keys, keyed by `sku || sequence` (big-endian, so FIFO order is key order).
    pub const STOCK_QUEUE: &str = "stock_queue";

    /// Every key ever queued or issued, keyed by the key string.
    pub const KEY_INDEX: &str = "key_index";

    /// Transaction records, keyed by `transaction_id` (ULID).
    pub const TRANSACTIONS: &str = "transactions";

    /// Index: transactions by user, keyed by `user_id || sequence`.
    /// Value is the transaction ID.
    pub const TRANSACTIONS_BY_USER: &str = "transactions_by_user";
}

/// Returns all column family names for database initialization.
#[must_use]
pub fn all_column_families() -> Vec<&'static str> {
    vec![
        cf::ACCOUNTS,
        cf::PRODUCTS,
        cf::PRICES,
        cf::STOCK_META,
        cf::STOCK_QUEUE,
        cf::KEY_INDEX,
        cf::TRANSACTIONS,
        cf::TRANSACTIONS_BY_USER,
    ]
}
