//! Storage layer for keyshop.
//!
//! This crate provides persistent storage for accounts, the product catalog, the
//! pricing table, license-key stock queues, and purchase transaction records.
//!
//! # Backends
//!
//! - [`RocksStore`] (feature `rocksdb-backend`, on by default): durable storage
//!   in `RocksDB` column families. Every compound mutation is one `WriteBatch`.
//! - [`MemoryStore`]: in-process storage for tests and ephemeral deployments.
//!
//! # Consistency
//!
//! Single-entity operations and the compound [`Store::commit_purchase`] are
//! atomic: a reader either sees all of a write or none of it. Read-modify-write
//! sequences spanning several calls (load an account, change it, put it back) are
//! not serialized here; callers hold per-entity locks for that.
//!
//! # Example
//!
//! ```no_run
//! use keyshop_core::Sku;
//! use keyshop_store::{MemoryStore, Store};
//!
//! let store = MemoryStore::new();
//! let sku = Sku::parse("Vanguard", "1Day").unwrap();
//! store.append_stock(&sku, &["AAAA-1111".to_string()]).unwrap();
//! assert_eq!(store.stock_level(&sku).unwrap().available, 1);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod error;
pub mod keys;
pub mod memory;
#[cfg(feature = "rocksdb-backend")]
pub mod rocks;
pub mod schema;

pub use error::{Result, StoreError};
pub use memory::MemoryStore;
#[cfg(feature = "rocksdb-backend")]
pub use rocks::{RocksOptions, RocksStore};

use keyshop_core::{
    Account, KeyRecord, Price, Product, ProductName, Sku, StockAppend, StockLevel,
    TransactionId, TransactionRecord, UserId,
};

/// A consistent snapshot of everything a purchase decision reads.
#[derive(Debug, Clone, Default)]
pub struct ReadView {
    /// The buyer's account, if it exists yet.
    pub account: Option<Account>,
    /// The product definition, if registered.
    pub product: Option<Product>,
    /// The SKU's unit price, if set.
    pub price: Option<Price>,
    /// The SKU's queue counters.
    pub stock: StockLevel,
}

/// Everything written by one purchase.
#[derive(Debug, Clone)]
pub struct PurchaseCommit {
    /// The buyer's account after the debit and stats update.
    pub account: Account,
    /// Draft record; the store fills in `keys` from the front of the queue.
    pub record: TransactionRecord,
}

/// The storage trait defining all database operations.
///
/// This trait abstracts the storage layer, allowing for different implementations
/// (`RocksDB`, in-memory for testing).
pub trait Store: Send + Sync {
    // =========================================================================
    // Account Operations
    // =========================================================================

    /// Get an account by user ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn get_account(&self, user_id: &UserId) -> Result<Option<Account>>;

    /// Insert or update an account record.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn put_account(&self, account: &Account) -> Result<()>;

    // =========================================================================
    // Catalog Operations
    // =========================================================================

    /// Get a product by name.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn get_product(&self, name: &ProductName) -> Result<Option<Product>>;

    /// Insert or update a product.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn put_product(&self, product: &Product) -> Result<()>;

    /// List all products, ordered by name.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn list_products(&self) -> Result<Vec<Product>>;

    /// Get the unit price of a SKU.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn get_price(&self, sku: &Sku) -> Result<Option<Price>>;

    /// Insert or update the unit price of a SKU.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn put_price(&self, sku: &Sku, price: &Price) -> Result<()>;

    /// List all prices, ordered by SKU.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn list_prices(&self) -> Result<Vec<(Sku, Price)>>;

    // =========================================================================
    // Stock Operations
    // =========================================================================

    /// Get the queue counters for a SKU. Unknown SKUs report all zeros.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn stock_level(&self, sku: &Sku) -> Result<StockLevel>;

    /// Append keys to the tail of a SKU's queue.
    ///
    /// Entries are trimmed; blank entries, keys already queued or issued
    /// anywhere, and repeats within `keys` are skipped. Concurrent appends
    /// to different SKUs never both queue the same key.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn append_stock(&self, sku: &Sku, keys: &[String]) -> Result<StockAppend>;

    /// Remove and return the first `count` keys of a SKU's queue.
    ///
    /// # Errors
    ///
    /// - `StoreError::InsufficientStock` if the queue is shorter than `count`;
    ///   the queue is left untouched.
    fn dequeue_stock(&self, sku: &Sku, count: u64) -> Result<Vec<String>>;

    /// Discard every queued key of a SKU. Returns the number removed.
    ///
    /// Discarded keys leave the key index and may be uploaded again.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn clear_stock(&self, sku: &Sku) -> Result<u64>;

    /// Look up a license key in the global key index.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn key_record(&self, license_key: &str) -> Result<Option<KeyRecord>>;

    // =========================================================================
    // Transaction Operations
    // =========================================================================

    /// Get a transaction by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn get_transaction(&self, transaction_id: &TransactionId)
        -> Result<Option<TransactionRecord>>;

    /// List a user's transactions, newest first.
    ///
    /// Only records with `sequence < before` are returned when `before` is set.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn list_transactions_by_user(
        &self,
        user_id: &UserId,
        limit: usize,
        before: Option<u64>,
    ) -> Result<Vec<TransactionRecord>>;

    // =========================================================================
    // Compound Operations
    // =========================================================================

    /// Read the account, product, price, and stock level for a purchase from one
    /// consistent snapshot.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn read_view(&self, user_id: &UserId, sku: &Sku) -> Result<ReadView>;

    /// Commit a purchase atomically: write the account, dequeue
    /// `record.quantity` keys from the front of `record.sku`'s queue, mark them
    /// issued, and append the record with those keys to the user's history.
    ///
    /// Returns the final record.
    ///
    /// # Errors
    ///
    /// - `StoreError::InsufficientStock` if the queue is too short.
    /// - `StoreError::Conflict` if the account and record disagree on the buyer.
    ///
    /// Nothing is written when an error is returned.
    fn commit_purchase(&self, commit: PurchaseCommit) -> Result<TransactionRecord>;
}

/// Check that the account and record of a commit belong together.
pub(crate) fn check_commit(commit: &PurchaseCommit) -> Result<()> {
    if commit.account.user_id != commit.record.user_id {
        return Err(StoreError::Conflict(format!(
            "account {} does not match record buyer {}",
            commit.account.user_id, commit.record.user_id
        )));
    }
    if commit.record.sequence + 1 != commit.account.purchase_count {
        return Err(StoreError::Conflict(format!(
            "record sequence {} does not follow account purchase count {}",
            commit.record.sequence, commit.account.purchase_count
        )));
    }
    if commit.record.quantity == 0 {
        return Err(StoreError::Conflict("purchase of zero keys".into()));
    }
    Ok(())
}
