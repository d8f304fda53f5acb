//! The reseller-facing purchase engine.
//!
//! A purchase locks the buyer's account and the SKU's stock queue, checks
//! everything against one snapshot, and commits the debit, the dequeue, and the
//! transaction record as a single store write. A rejected purchase writes
//! nothing.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use keyshop_core::{
    apply_discount, Account, HistoryPage, PriceLine, Quote, Result, ShopError, Sku,
    TransactionId, TransactionRecord, UserId,
};
use keyshop_store::{PurchaseCommit, ReadView, Store};

use crate::config::ShopConfig;
use crate::locks::{LockKey, LockRegistry};

/// A priced purchase that has not been made.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Estimate {
    /// The quote as it would be charged now.
    pub quote: Quote,
    /// The caller's current balance, in cents.
    pub balance_cents: i64,
    /// Keys currently queued for the SKU.
    pub available_stock: u64,
}

impl Estimate {
    /// Whether the queue currently holds enough keys.
    #[must_use]
    pub fn in_stock(&self) -> bool {
        self.available_stock >= u64::from(self.quote.quantity)
    }

    /// Whether the balance currently covers the charge.
    #[must_use]
    pub fn is_affordable(&self) -> bool {
        self.balance_cents >= self.quote.charge_cents
    }
}

/// Executes purchases and answers reseller queries.
#[derive(Clone)]
pub struct TransactionEngine {
    store: Arc<dyn Store>,
    locks: Arc<LockRegistry>,
    config: ShopConfig,
}

impl TransactionEngine {
    /// Create an engine over `store`, sharing `locks` with the admin API.
    #[must_use]
    pub fn new(store: Arc<dyn Store>, locks: Arc<LockRegistry>, config: ShopConfig) -> Self {
        Self {
            store,
            locks,
            config,
        }
    }

    /// Buy `quantity` keys of `sku` for `user_id`.
    ///
    /// Returns the committed record including the issued keys in FIFO order.
    ///
    /// # Errors
    ///
    /// Checked in this order:
    /// - `InvalidArgument` if `quantity` is zero or above the configured cap.
    /// - `UnknownProduct` if the SKU is not registered or has no price.
    /// - `InsufficientStock` if the queue holds fewer than `quantity` keys.
    /// - `InsufficientBalance` if the discounted charge exceeds the balance.
    /// - `StorageFailure` if the commit cannot be written.
    pub async fn purchase(
        &self,
        user_id: &UserId,
        sku: &Sku,
        quantity: u32,
    ) -> Result<TransactionRecord> {
        self.check_quantity(quantity)?;

        let _guard = self
            .locks
            .acquire(vec![
                LockKey::Account(user_id.clone()),
                LockKey::Stock(sku.clone()),
            ])
            .await;

        let result = self.purchase_locked(user_id, sku, quantity);
        match &result {
            Ok(record) => tracing::info!(
                user_id = %user_id,
                transaction_id = %record.id,
                sku = %sku,
                quantity,
                charged_cents = record.charged_cents,
                balance_after_cents = record.balance_after_cents,
                "Purchase committed"
            ),
            Err(e) if e.is_rejection() => tracing::debug!(
                user_id = %user_id,
                sku = %sku,
                quantity,
                error = %e,
                "Purchase rejected"
            ),
            Err(e) => tracing::error!(
                user_id = %user_id,
                sku = %sku,
                quantity,
                error = %e,
                "Purchase failed"
            ),
        }
        result
    }

    fn purchase_locked(
        &self,
        user_id: &UserId,
        sku: &Sku,
        quantity: u32,
    ) -> Result<TransactionRecord> {
        let view = self.store.read_view(user_id, sku)?;
        let unit_price = listed_price(&view, sku)?;
        check_stock(&view, quantity)?;

        let mut account = view
            .account
            .unwrap_or_else(|| Account::new(user_id.clone()));
        let quote = Quote::compute(sku.clone(), unit_price, quantity, account.discount_percent)?;
        let balance_after = account.try_debit(quote.charge_cents)?;
        let sequence = account.record_purchase(quote.charge_cents, quantity);

        let record = TransactionRecord::draft(user_id.clone(), sequence, &quote, balance_after);
        let committed = self.store.commit_purchase(PurchaseCommit { account, record })?;
        Ok(committed)
    }

    /// Price a purchase without making it. Nothing is reserved or written.
    ///
    /// # Errors
    ///
    /// Same validation as [`purchase`](Self::purchase) up to and including
    /// `UnknownProduct`; stock and balance shortfalls are reported in the
    /// result instead of as errors.
    pub fn estimate(&self, user_id: &UserId, sku: &Sku, quantity: u32) -> Result<Estimate> {
        self.check_quantity(quantity)?;

        let view = self.store.read_view(user_id, sku)?;
        let unit_price = listed_price(&view, sku)?;
        let (discount, balance) = view
            .account
            .as_ref()
            .map_or((0, 0), |a| (a.discount_percent, a.balance_cents));

        Ok(Estimate {
            quote: Quote::compute(sku.clone(), unit_price, quantity, discount)?,
            balance_cents: balance,
            available_stock: view.stock.available,
        })
    }

    /// A page of `user_id`'s purchases, newest first.
    ///
    /// `limit` defaults to the configured page size and is capped at the
    /// configured maximum. Pass the returned `next_before` to continue.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` for a zero limit, or `StorageFailure`.
    pub fn history(
        &self,
        user_id: &UserId,
        limit: Option<usize>,
        before: Option<u64>,
    ) -> Result<HistoryPage> {
        let limit = match limit {
            Some(0) => {
                return Err(ShopError::InvalidArgument(
                    "history limit must be at least 1".into(),
                ))
            }
            Some(n) => n.min(self.config.max_history_limit),
            None => self.config.default_history_limit,
        };

        // Fetch one extra to know whether an older page exists.
        let mut records = self
            .store
            .list_transactions_by_user(user_id, limit + 1, before)?;
        let has_more = records.len() > limit;
        records.truncate(limit);

        let next_before = if has_more {
            records.last().map(|r| r.sequence)
        } else {
            None
        };
        Ok(HistoryPage {
            records,
            next_before,
        })
    }

    /// Look up one transaction.
    ///
    /// # Errors
    ///
    /// Returns `StorageFailure` if the store cannot be read.
    pub fn transaction(&self, transaction_id: &TransactionId) -> Result<Option<TransactionRecord>> {
        Ok(self.store.get_transaction(transaction_id)?)
    }

    /// The caller's account. Unknown users read as a fresh, empty account.
    ///
    /// # Errors
    ///
    /// Returns `StorageFailure` if the store cannot be read.
    pub fn account(&self, user_id: &UserId) -> Result<Account> {
        Ok(self
            .store
            .get_account(user_id)?
            .unwrap_or_else(|| Account::new(user_id.clone())))
    }

    /// Every priced SKU with its list price and the caller's discounted price.
    ///
    /// # Errors
    ///
    /// Returns `StorageFailure` if the store cannot be read.
    pub fn price_sheet(&self, user_id: &UserId) -> Result<Vec<PriceLine>> {
        let discount = self.account(user_id)?.discount_percent;
        self.store
            .list_prices()?
            .into_iter()
            .map(|(sku, price)| {
                Ok(PriceLine {
                    discounted_unit_price_cents: apply_discount(price.unit_price_cents, discount)?,
                    unit_price_cents: price.unit_price_cents,
                    sku,
                })
            })
            .collect()
    }

    fn check_quantity(&self, quantity: u32) -> Result<()> {
        let max = self.config.max_quantity_per_purchase;
        if quantity == 0 || quantity > max {
            return Err(ShopError::InvalidArgument(format!(
                "quantity must be between 1 and {max}, got {quantity}"
            )));
        }
        Ok(())
    }
}

/// The unit price of `sku`, if the product offers it and it is priced.
fn listed_price(view: &ReadView, sku: &Sku) -> Result<i64> {
    let offered = view
        .product
        .as_ref()
        .is_some_and(|p| p.offers(&sku.duration));
    match view.price {
        Some(price) if offered => Ok(price.unit_price_cents),
        _ => Err(ShopError::unknown_product(sku)),
    }
}

fn check_stock(view: &ReadView, quantity: u32) -> Result<()> {
    let requested = u64::from(quantity);
    if view.stock.available < requested {
        return Err(ShopError::InsufficientStock {
            available: view.stock.available,
            requested,
        });
    }
    Ok(())
}
