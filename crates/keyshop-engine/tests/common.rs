//! Common test utilities for keyshop engine integration tests.

#![allow(dead_code)] // Some utilities are used by different test files

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Once};

use keyshop_core::{
    Account, KeyRecord, Price, Product, ProductName, Sku, StockAppend, StockLevel,
    TransactionId, TransactionRecord, UserId,
};
use keyshop_engine::{Shop, ShopConfig};
use keyshop_store::{MemoryStore, PurchaseCommit, ReadView, Result, Store, StoreError};

static TRACING: Once = Once::new();

/// Install a test-writer subscriber once per test binary. Honors `RUST_LOG`.
pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

/// Test harness containing a shop and handles into its store.
pub struct TestHarness {
    /// The shop under test.
    pub shop: Shop,
    /// The store wrapper, for fault injection.
    pub store: Arc<FaultyStore>,
    /// A reseller used by most tests.
    pub user: UserId,
}

impl TestHarness {
    /// Create a harness over a fresh in-memory store.
    pub fn new() -> Self {
        Self::with_config(ShopConfig::in_memory())
    }

    /// Create a harness with a custom configuration.
    pub fn with_config(config: ShopConfig) -> Self {
        init_tracing();
        let store = Arc::new(FaultyStore::new(MemoryStore::new()));
        let shop = Shop::new(store.clone(), config);
        Self {
            shop,
            store,
            user: UserId::new("reseller-1").expect("valid user id"),
        }
    }

    /// Register `product duration` at `unit_price_cents` and upload `keys`.
    pub async fn stock_sku(
        &self,
        product: &str,
        duration: &str,
        unit_price_cents: i64,
        keys: &[&str],
    ) -> Sku {
        let sku = Sku::parse(product, duration).expect("valid sku");
        let admin = self.shop.admin();
        admin
            .add_product(&sku.product, vec![sku.duration.clone()])
            .await
            .expect("add product");
        admin
            .set_price(&sku, unit_price_cents)
            .await
            .expect("set price");
        if !keys.is_empty() {
            admin
                .append_stock(&sku, &owned(keys))
                .await
                .expect("append stock");
        }
        sku
    }

    /// Fund `user` with `balance_cents` at `discount_percent`.
    pub async fn fund(&self, user: &UserId, balance_cents: i64, discount_percent: u8) {
        let admin = self.shop.admin();
        if balance_cents > 0 {
            admin
                .add_balance(user, balance_cents)
                .await
                .expect("add balance");
        }
        admin
            .set_discount(user, discount_percent)
            .await
            .expect("set discount");
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}

/// Convert string literals into owned keys.
pub fn owned(keys: &[&str]) -> Vec<String> {
    keys.iter().map(|k| (*k).to_string()).collect()
}

/// Numbered keys like `PREFIX-0000`.
pub fn numbered_keys(prefix: &str, count: usize) -> Vec<String> {
    (0..count).map(|i| format!("{prefix}-{i:04}")).collect()
}

/// A store that can be told to fail its writes.
pub struct FaultyStore {
    inner: MemoryStore,
    fail_commits: AtomicBool,
    fail_writes: AtomicBool,
}

impl FaultyStore {
    pub fn new(inner: MemoryStore) -> Self {
        Self {
            inner,
            fail_commits: AtomicBool::new(false),
            fail_writes: AtomicBool::new(false),
        }
    }

    /// Make `commit_purchase` fail until reset.
    pub fn fail_commits(&self, fail: bool) {
        self.fail_commits.store(fail, Ordering::SeqCst);
    }

    /// Make every single-entity write fail until reset.
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    fn check_write(&self) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Database("injected write failure".into()));
        }
        Ok(())
    }
}

impl Store for FaultyStore {
    fn get_account(&self, user_id: &UserId) -> Result<Option<Account>> {
        self.inner.get_account(user_id)
    }

    fn put_account(&self, account: &Account) -> Result<()> {
        self.check_write()?;
        self.inner.put_account(account)
    }

    fn get_product(&self, name: &ProductName) -> Result<Option<Product>> {
        self.inner.get_product(name)
    }

    fn put_product(&self, product: &Product) -> Result<()> {
        self.check_write()?;
        self.inner.put_product(product)
    }

    fn list_products(&self) -> Result<Vec<Product>> {
        self.inner.list_products()
    }

    fn get_price(&self, sku: &Sku) -> Result<Option<Price>> {
        self.inner.get_price(sku)
    }

    fn put_price(&self, sku: &Sku, price: &Price) -> Result<()> {
        self.check_write()?;
        self.inner.put_price(sku, price)
    }

    fn list_prices(&self) -> Result<Vec<(Sku, Price)>> {
        self.inner.list_prices()
    }

    fn stock_level(&self, sku: &Sku) -> Result<StockLevel> {
        self.inner.stock_level(sku)
    }

    fn append_stock(&self, sku: &Sku, keys: &[String]) -> Result<StockAppend> {
        self.check_write()?;
        self.inner.append_stock(sku, keys)
    }

    fn dequeue_stock(&self, sku: &Sku, count: u64) -> Result<Vec<String>> {
        self.check_write()?;
        self.inner.dequeue_stock(sku, count)
    }

    fn clear_stock(&self, sku: &Sku) -> Result<u64> {
        self.check_write()?;
        self.inner.clear_stock(sku)
    }

    fn key_record(&self, license_key: &str) -> Result<Option<KeyRecord>> {
        self.inner.key_record(license_key)
    }

    fn get_transaction(
        &self,
        transaction_id: &TransactionId,
    ) -> Result<Option<TransactionRecord>> {
        self.inner.get_transaction(transaction_id)
    }

    fn list_transactions_by_user(
        &self,
        user_id: &UserId,
        limit: usize,
        before: Option<u64>,
    ) -> Result<Vec<TransactionRecord>> {
        self.inner.list_transactions_by_user(user_id, limit, before)
    }

    fn read_view(&self, user_id: &UserId, sku: &Sku) -> Result<ReadView> {
        self.inner.read_view(user_id, sku)
    }

    fn commit_purchase(&self, commit: PurchaseCommit) -> Result<TransactionRecord> {
        if self.fail_commits.load(Ordering::SeqCst) {
            return Err(StoreError::Database("injected commit failure".into()));
        }
        self.inner.commit_purchase(commit)
    }
}
