//! Admin mutations: balances, discounts, catalog, prices, and stock.
//!
//! Every mutation takes the same per-entity locks as the purchase engine and
//! is logged on the `keyshop::audit` target.

use std::sync::Arc;

use keyshop_core::{
    Account, Duration, Price, Product, ProductName, Result, ShopError, Sku, StockAppend,
    StockLevel, StockReportLine, UserId,
};
use keyshop_store::Store;

use crate::locks::{LockKey, LockRegistry};

/// Tracing target for admin audit events.
pub const AUDIT_TARGET: &str = "keyshop::audit";

/// Administrative operations over the shared stores.
#[derive(Clone)]
pub struct AdminApi {
    store: Arc<dyn Store>,
    locks: Arc<LockRegistry>,
}

impl AdminApi {
    /// Create an admin API over `store`, sharing `locks` with the engine.
    #[must_use]
    pub fn new(store: Arc<dyn Store>, locks: Arc<LockRegistry>) -> Self {
        Self { store, locks }
    }

    // =========================================================================
    // Ledger
    // =========================================================================

    /// Change a user's balance by `delta_cents`, creating the account if needed.
    ///
    /// # Errors
    ///
    /// - `InvalidArgument` for a zero delta or an overflowing balance.
    /// - `InsufficientBalance` if the balance would go below zero.
    pub async fn adjust_balance(&self, user_id: &UserId, delta_cents: i64) -> Result<Account> {
        let _guard = self
            .locks
            .acquire(vec![LockKey::Account(user_id.clone())])
            .await;

        let mut account = self.load_account(user_id)?;
        let previous = account.balance_cents;
        account.adjust_balance(delta_cents)?;
        self.store.put_account(&account)?;

        tracing::info!(
            target: AUDIT_TARGET,
            user_id = %user_id,
            delta_cents,
            previous_balance_cents = previous,
            balance_cents = account.balance_cents,
            "Balance adjusted"
        );
        Ok(account)
    }

    /// Credit `amount_cents` to a user.
    ///
    /// # Errors
    ///
    /// `InvalidArgument` unless the amount is positive; otherwise as
    /// [`adjust_balance`](Self::adjust_balance).
    pub async fn add_balance(&self, user_id: &UserId, amount_cents: i64) -> Result<Account> {
        require_positive_amount(amount_cents)?;
        self.adjust_balance(user_id, amount_cents).await
    }

    /// Debit `amount_cents` from a user.
    ///
    /// # Errors
    ///
    /// `InvalidArgument` unless the amount is positive; `InsufficientBalance`
    /// if the balance is lower than the amount.
    pub async fn remove_balance(&self, user_id: &UserId, amount_cents: i64) -> Result<Account> {
        require_positive_amount(amount_cents)?;
        self.adjust_balance(user_id, -amount_cents).await
    }

    /// Set a user's discount percentage.
    ///
    /// # Errors
    ///
    /// `InvalidArgument` if `percent` exceeds 100.
    pub async fn set_discount(&self, user_id: &UserId, percent: u8) -> Result<Account> {
        let _guard = self
            .locks
            .acquire(vec![LockKey::Account(user_id.clone())])
            .await;

        let mut account = self.load_account(user_id)?;
        account.set_discount(percent)?;
        self.store.put_account(&account)?;

        tracing::info!(
            target: AUDIT_TARGET,
            user_id = %user_id,
            discount_percent = percent,
            "Discount set"
        );
        Ok(account)
    }

    /// Read a user's account. Unknown users read as a fresh account.
    ///
    /// # Errors
    ///
    /// `StorageFailure` if the store cannot be read.
    pub fn account(&self, user_id: &UserId) -> Result<Account> {
        self.load_account(user_id)
    }

    // =========================================================================
    // Catalog and pricing
    // =========================================================================

    /// Register a product, or merge `durations` into an existing one.
    ///
    /// # Errors
    ///
    /// `InvalidArgument` if `durations` is empty.
    pub async fn add_product(
        &self,
        name: &ProductName,
        durations: Vec<Duration>,
    ) -> Result<Product> {
        if durations.is_empty() {
            return Err(ShopError::InvalidArgument(format!(
                "product {name} needs at least one duration"
            )));
        }

        let _guard = self
            .locks
            .acquire(vec![LockKey::Product(name.clone())])
            .await;

        let product = match self.store.get_product(name)? {
            Some(mut existing) => {
                let added = existing.add_durations(durations);
                if added > 0 {
                    self.store.put_product(&existing)?;
                }
                existing
            }
            None => {
                let product = Product::new(name.clone(), durations);
                self.store.put_product(&product)?;
                product
            }
        };

        tracing::info!(
            target: AUDIT_TARGET,
            product = %name,
            durations = product.durations.len(),
            "Product registered"
        );
        Ok(product)
    }

    /// Set the unit price of a SKU. An unlisted duration is added to the product.
    ///
    /// # Errors
    ///
    /// - `InvalidArgument` unless the price is positive.
    /// - `UnknownProduct` if the product is not registered.
    pub async fn set_price(&self, sku: &Sku, unit_price_cents: i64) -> Result<Price> {
        let price = Price::new(unit_price_cents)?;

        let _guard = self
            .locks
            .acquire(vec![LockKey::Product(sku.product.clone())])
            .await;

        let mut product = self
            .store
            .get_product(&sku.product)?
            .ok_or_else(|| ShopError::unknown_product(sku))?;
        if product.add_durations([sku.duration.clone()]) > 0 {
            self.store.put_product(&product)?;
        }
        self.store.put_price(sku, &price)?;

        tracing::info!(
            target: AUDIT_TARGET,
            sku = %sku,
            unit_price_cents,
            "Price set"
        );
        Ok(price)
    }

    /// The unit price of a SKU.
    ///
    /// # Errors
    ///
    /// `UnknownProduct` if the SKU has no price.
    pub fn get_price(&self, sku: &Sku) -> Result<Price> {
        self.store
            .get_price(sku)?
            .ok_or_else(|| ShopError::unknown_product(sku))
    }

    /// The catalog, ordered by product name.
    ///
    /// # Errors
    ///
    /// `StorageFailure` if the store cannot be read.
    pub fn products(&self) -> Result<Vec<Product>> {
        Ok(self.store.list_products()?)
    }

    // =========================================================================
    // Stock
    // =========================================================================

    /// Append uploaded keys to a SKU's queue.
    ///
    /// # Errors
    ///
    /// `UnknownProduct` if the product does not offer the SKU's duration.
    pub async fn append_stock(&self, sku: &Sku, keys: &[String]) -> Result<StockAppend> {
        let _guard = self
            .locks
            .acquire(vec![LockKey::Stock(sku.clone())])
            .await;

        self.require_offered(sku)?;
        let outcome = self.store.append_stock(sku, keys)?;

        tracing::info!(
            target: AUDIT_TARGET,
            sku = %sku,
            added = outcome.added,
            skipped_blank = outcome.skipped_blank,
            skipped_duplicate = outcome.skipped_duplicate,
            "Stock appended"
        );
        Ok(outcome)
    }

    /// Discard every queued key of a SKU. Returns the number removed.
    ///
    /// # Errors
    ///
    /// `StorageFailure` if the store cannot be written.
    pub async fn clear_stock(&self, sku: &Sku) -> Result<u64> {
        let _guard = self
            .locks
            .acquire(vec![LockKey::Stock(sku.clone())])
            .await;

        let removed = self.store.clear_stock(sku)?;
        tracing::info!(target: AUDIT_TARGET, sku = %sku, removed, "Stock cleared");
        Ok(removed)
    }

    /// Counters for one SKU's queue.
    ///
    /// # Errors
    ///
    /// `StorageFailure` if the store cannot be read.
    pub fn stock_status(&self, sku: &Sku) -> Result<StockLevel> {
        Ok(self.store.stock_level(sku)?)
    }

    /// Counters for every SKU in the catalog.
    ///
    /// # Errors
    ///
    /// `StorageFailure` if the store cannot be read.
    pub fn stock_report(&self) -> Result<Vec<StockReportLine>> {
        let mut report = Vec::new();
        for product in self.store.list_products()? {
            for sku in product.skus() {
                let level = self.store.stock_level(&sku)?;
                report.push(StockReportLine { sku, level });
            }
        }
        Ok(report)
    }

    fn load_account(&self, user_id: &UserId) -> Result<Account> {
        Ok(self
            .store
            .get_account(user_id)?
            .unwrap_or_else(|| Account::new(user_id.clone())))
    }

    fn require_offered(&self, sku: &Sku) -> Result<()> {
        match self.store.get_product(&sku.product)? {
            Some(product) if product.offers(&sku.duration) => Ok(()),
            _ => Err(ShopError::unknown_product(sku)),
        }
    }
}

fn require_positive_amount(amount_cents: i64) -> Result<()> {
    if amount_cents <= 0 {
        return Err(ShopError::InvalidArgument(format!(
            "amount must be positive, got {amount_cents}"
        )));
    }
    Ok(())
}
