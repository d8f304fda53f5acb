//! `RocksDB` storage implementation.
//!
//! This module provides the `RocksStore` implementation of the `Store` trait.
//!
//! Each stock queue is a run of `stock_queue` entries addressed by
//! `sku || sequence`, plus a `stock_meta` row holding the head and tail
//! sequence numbers. Appends write at `tail`, dequeues read and delete from
//! `head`, so FIFO order is explicit rather than an artifact of file layout.

use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

use parking_lot::Mutex;
use rocksdb::{
    BoundColumnFamily, ColumnFamilyDescriptor, DBWithThreadMode, Direction, IteratorMode,
    MultiThreaded, Options, SnapshotWithThreadMode, WriteBatch, WriteOptions,
};
use serde::{Deserialize, Serialize};

use keyshop_core::{
    normalize_keys, Account, KeyRecord, KeyStatus, Price, Product, ProductName, Sku,
    StockAppend, StockLevel, TransactionId, TransactionRecord, UserId,
};

use crate::error::{Result, StoreError};
use crate::keys;
use crate::schema::{all_column_families, cf};
use crate::{check_commit, PurchaseCommit, ReadView, Store};

/// Options for opening a [`RocksStore`].
#[derive(Debug, Clone, Copy)]
pub struct RocksOptions {
    /// Fsync the write-ahead log on every write.
    pub sync_writes: bool,
}

impl Default for RocksOptions {
    fn default() -> Self {
        Self { sync_writes: true }
    }
}

/// Head/tail pointers and lifetime counters of one stock queue.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
struct StockMeta {
    head: u64,
    tail: u64,
    uploaded: u64,
    issued: u64,
    cleared: u64,
}

impl StockMeta {
    const fn available(&self) -> u64 {
        self.tail - self.head
    }

    const fn level(&self) -> StockLevel {
        StockLevel {
            available: self.available(),
            uploaded: self.uploaded,
            issued: self.issued,
            cleared: self.cleared,
        }
    }
}

/// Value stored in the `prices` column family.
#[derive(Debug, Serialize, Deserialize)]
struct PriceRow {
    sku: Sku,
    price: Price,
}

/// RocksDB-backed storage implementation.
pub struct RocksStore {
    db: Arc<DBWithThreadMode<MultiThreaded>>,
    write_options: RocksOptions,
    /// Serializes read-check-write passes over the global key index.
    index_lock: Mutex<()>,
}

impl RocksStore {
    /// Open or create a `RocksDB` database at the given path with default options.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or created.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::open_with(path, RocksOptions::default())
    }

    /// Open or create a `RocksDB` database at the given path.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or created.
    pub fn open_with<P: AsRef<Path>>(path: P, options: RocksOptions) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let cf_descriptors: Vec<_> = all_column_families()
            .into_iter()
            .map(|name| ColumnFamilyDescriptor::new(name, Options::default()))
            .collect();

        let db = DBWithThreadMode::open_cf_descriptors(&opts, path.as_ref(), cf_descriptors)
            .map_err(|e| StoreError::Database(e.to_string()))?;

        tracing::debug!(
            path = %path.as_ref().display(),
            sync_writes = options.sync_writes,
            "Opened RocksDB store"
        );

        Ok(Self {
            db: Arc::new(db),
            write_options: options,
            index_lock: Mutex::new(()),
        })
    }

    /// Get a column family handle.
    fn cf(&self, name: &str) -> Result<Arc<BoundColumnFamily<'_>>> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| StoreError::Database(format!("column family not found: {name}")))
    }

    /// Serialize a value using CBOR.
    fn serialize<T: Serialize>(value: &T) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        ciborium::into_writer(value, &mut buf)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        Ok(buf)
    }

    /// Deserialize a value from CBOR.
    fn deserialize<T: serde::de::DeserializeOwned>(data: &[u8]) -> Result<T> {
        ciborium::from_reader(data).map_err(|e| StoreError::Serialization(e.to_string()))
    }

    /// Get and decode a value from a column family.
    fn get_value<T: serde::de::DeserializeOwned>(&self, name: &str, key: &[u8]) -> Result<Option<T>> {
        let cf = self.cf(name)?;
        self.db
            .get_cf(&cf, key)
            .map_err(|e| StoreError::Database(e.to_string()))?
            .map(|data| Self::deserialize(&data))
            .transpose()
    }

    /// Get and decode a value as of a snapshot.
    fn snapshot_get<T: serde::de::DeserializeOwned>(
        snapshot: &SnapshotWithThreadMode<'_, DBWithThreadMode<MultiThreaded>>,
        cf: &Arc<BoundColumnFamily<'_>>,
        key: &[u8],
    ) -> Result<Option<T>> {
        snapshot
            .get_cf(cf, key)
            .map_err(|e| StoreError::Database(e.to_string()))?
            .map(|data| Self::deserialize(&data))
            .transpose()
    }

    /// Encode and put a single value.
    fn put_value<T: Serialize>(&self, name: &str, key: &[u8], value: &T) -> Result<()> {
        let cf = self.cf(name)?;
        let value = Self::serialize(value)?;
        let mut batch = WriteBatch::default();
        batch.put_cf(&cf, key, value);
        self.write(batch)
    }

    /// Write a batch atomically.
    fn write(&self, batch: WriteBatch) -> Result<()> {
        let mut opts = WriteOptions::default();
        opts.set_sync(self.write_options.sync_writes);
        self.db
            .write_opt(batch, &opts)
            .map_err(|e| StoreError::Database(e.to_string()))
    }

    fn stock_meta(&self, sku: &Sku) -> Result<StockMeta> {
        Ok(self
            .get_value(cf::STOCK_META, &keys::sku_key(sku))?
            .unwrap_or_default())
    }

    /// Stage removal of the first `count` queue entries into `batch`.
    ///
    /// Returns the removed keys. On error the batch may hold partial
    /// operations and must be dropped unwritten.
    fn stage_take_front(&self, batch: &mut WriteBatch, sku: &Sku, count: u64) -> Result<Vec<String>> {
        let mut meta = self.stock_meta(sku)?;
        if meta.available() < count {
            return Err(StoreError::InsufficientStock {
                available: meta.available(),
                requested: count,
            });
        }

        let cf_meta = self.cf(cf::STOCK_META)?;
        let cf_queue = self.cf(cf::STOCK_QUEUE)?;
        let cf_index = self.cf(cf::KEY_INDEX)?;

        let mut taken = Vec::new();
        for sequence in meta.head..meta.head + count {
            let entry_key = keys::queue_entry_key(sku, sequence);
            let raw = self
                .db
                .get_cf(&cf_queue, &entry_key)
                .map_err(|e| StoreError::Database(e.to_string()))?
                .ok_or_else(|| {
                    StoreError::Database(format!("missing stock entry {sequence} for {sku}"))
                })?;
            let license_key =
                String::from_utf8(raw).map_err(|e| StoreError::Serialization(e.to_string()))?;

            let issued = KeyRecord {
                sku: sku.clone(),
                status: KeyStatus::Issued,
            };
            batch.delete_cf(&cf_queue, &entry_key);
            batch.put_cf(
                &cf_index,
                keys::key_index_key(&license_key),
                Self::serialize(&issued)?,
            );
            taken.push(license_key);
        }

        meta.head += count;
        meta.issued += count;
        batch.put_cf(&cf_meta, keys::sku_key(sku), Self::serialize(&meta)?);
        Ok(taken)
    }
}

impl Store for RocksStore {
    // =========================================================================
    // Account Operations
    // =========================================================================

    fn get_account(&self, user_id: &UserId) -> Result<Option<Account>> {
        self.get_value(cf::ACCOUNTS, &keys::account_key(user_id))
    }

    fn put_account(&self, account: &Account) -> Result<()> {
        self.put_value(cf::ACCOUNTS, &keys::account_key(&account.user_id), account)
    }

    // =========================================================================
    // Catalog Operations
    // =========================================================================

    fn get_product(&self, name: &ProductName) -> Result<Option<Product>> {
        self.get_value(cf::PRODUCTS, &keys::product_key(name))
    }

    fn put_product(&self, product: &Product) -> Result<()> {
        self.put_value(cf::PRODUCTS, &keys::product_key(&product.name), product)
    }

    fn list_products(&self) -> Result<Vec<Product>> {
        let cf = self.cf(cf::PRODUCTS)?;
        let mut products = Vec::new();
        for item in self.db.iterator_cf(&cf, IteratorMode::Start) {
            let (_, value) = item.map_err(|e| StoreError::Database(e.to_string()))?;
            products.push(Self::deserialize(&value)?);
        }
        Ok(products)
    }

    fn get_price(&self, sku: &Sku) -> Result<Option<Price>> {
        Ok(self
            .get_value::<PriceRow>(cf::PRICES, &keys::sku_key(sku))?
            .map(|row| row.price))
    }

    fn put_price(&self, sku: &Sku, price: &Price) -> Result<()> {
        let row = PriceRow {
            sku: sku.clone(),
            price: *price,
        };
        self.put_value(cf::PRICES, &keys::sku_key(sku), &row)
    }

    fn list_prices(&self) -> Result<Vec<(Sku, Price)>> {
        let cf = self.cf(cf::PRICES)?;
        let mut prices = Vec::new();
        for item in self.db.iterator_cf(&cf, IteratorMode::Start) {
            let (_, value) = item.map_err(|e| StoreError::Database(e.to_string()))?;
            let row: PriceRow = Self::deserialize(&value)?;
            prices.push((row.sku, row.price));
        }
        prices.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(prices)
    }

    // =========================================================================
    // Stock Operations
    // =========================================================================

    fn stock_level(&self, sku: &Sku) -> Result<StockLevel> {
        Ok(self.stock_meta(sku)?.level())
    }

    fn append_stock(&self, sku: &Sku, raw_keys: &[String]) -> Result<StockAppend> {
        let (candidates, skipped_blank) = normalize_keys(raw_keys);
        let mut outcome = StockAppend {
            skipped_blank,
            ..StockAppend::default()
        };

        let cf_meta = self.cf(cf::STOCK_META)?;
        let cf_queue = self.cf(cf::STOCK_QUEUE)?;
        let cf_index = self.cf(cf::KEY_INDEX)?;

        // Uploads to different SKUs share the key index.
        let _index = self.index_lock.lock();

        let mut meta = self.stock_meta(sku)?;
        let queued = Self::serialize(&KeyRecord {
            sku: sku.clone(),
            status: KeyStatus::Queued,
        })?;

        let mut seen = HashSet::new();
        let mut batch = WriteBatch::default();
        for license_key in candidates {
            let index_key = keys::key_index_key(&license_key);
            let known = self
                .db
                .get_cf(&cf_index, &index_key)
                .map_err(|e| StoreError::Database(e.to_string()))?
                .is_some();
            if known || !seen.insert(license_key.clone()) {
                outcome.skipped_duplicate += 1;
                continue;
            }

            batch.put_cf(
                &cf_queue,
                keys::queue_entry_key(sku, meta.tail),
                license_key.as_bytes(),
            );
            batch.put_cf(&cf_index, index_key, &queued);
            meta.tail += 1;
            meta.uploaded += 1;
            outcome.added += 1;
        }

        if outcome.added > 0 {
            batch.put_cf(&cf_meta, keys::sku_key(sku), Self::serialize(&meta)?);
            self.write(batch)?;
        }

        Ok(outcome)
    }

    fn dequeue_stock(&self, sku: &Sku, count: u64) -> Result<Vec<String>> {
        let mut batch = WriteBatch::default();
        let taken = self.stage_take_front(&mut batch, sku, count)?;
        if count > 0 {
            self.write(batch)?;
        }
        Ok(taken)
    }

    fn clear_stock(&self, sku: &Sku) -> Result<u64> {
        let _index = self.index_lock.lock();
        let mut meta = self.stock_meta(sku)?;
        let removed = meta.available();
        if removed == 0 {
            return Ok(0);
        }

        let cf_meta = self.cf(cf::STOCK_META)?;
        let cf_queue = self.cf(cf::STOCK_QUEUE)?;
        let cf_index = self.cf(cf::KEY_INDEX)?;

        let mut batch = WriteBatch::default();
        for sequence in meta.head..meta.tail {
            let entry_key = keys::queue_entry_key(sku, sequence);
            if let Some(raw) = self
                .db
                .get_cf(&cf_queue, &entry_key)
                .map_err(|e| StoreError::Database(e.to_string()))?
            {
                batch.delete_cf(&cf_index, raw);
            }
            batch.delete_cf(&cf_queue, &entry_key);
        }

        meta.head = meta.tail;
        meta.cleared += removed;
        batch.put_cf(&cf_meta, keys::sku_key(sku), Self::serialize(&meta)?);
        self.write(batch)?;

        Ok(removed)
    }

    fn key_record(&self, license_key: &str) -> Result<Option<KeyRecord>> {
        self.get_value(cf::KEY_INDEX, &keys::key_index_key(license_key))
    }

    // =========================================================================
    // Transaction Operations
    // =========================================================================

    fn get_transaction(
        &self,
        transaction_id: &TransactionId,
    ) -> Result<Option<TransactionRecord>> {
        self.get_value(cf::TRANSACTIONS, &keys::transaction_key(transaction_id))
    }

    fn list_transactions_by_user(
        &self,
        user_id: &UserId,
        limit: usize,
        before: Option<u64>,
    ) -> Result<Vec<TransactionRecord>> {
        let cf_by_user = self.cf(cf::TRANSACTIONS_BY_USER)?;
        let prefix = keys::user_transactions_prefix(user_id);
        let start = keys::user_transaction_key(user_id, before.unwrap_or(u64::MAX));

        let mut transactions = Vec::new();
        if limit == 0 {
            return Ok(transactions);
        }

        // Walk backwards from the cursor so the newest entries come first.
        let iter = self
            .db
            .iterator_cf(&cf_by_user, IteratorMode::From(&start, Direction::Reverse));
        for item in iter {
            let (key, value) = item.map_err(|e| StoreError::Database(e.to_string()))?;

            if !key.starts_with(&prefix) {
                break;
            }
            if before.is_some() && key.as_ref() == start.as_slice() {
                continue;
            }

            let tx_id = keys::decode_transaction_id(&value).ok_or_else(|| {
                StoreError::Serialization("malformed transaction index entry".into())
            })?;
            if let Some(tx) = self.get_transaction(&tx_id)? {
                transactions.push(tx);
            }
            if transactions.len() >= limit {
                break;
            }
        }

        Ok(transactions)
    }

    // =========================================================================
    // Compound Operations
    // =========================================================================

    fn read_view(&self, user_id: &UserId, sku: &Sku) -> Result<ReadView> {
        let snapshot = self.db.snapshot();

        let cf_accounts = self.cf(cf::ACCOUNTS)?;
        let cf_products = self.cf(cf::PRODUCTS)?;
        let cf_prices = self.cf(cf::PRICES)?;
        let cf_meta = self.cf(cf::STOCK_META)?;

        let account = Self::snapshot_get(&snapshot, &cf_accounts, &keys::account_key(user_id))?;
        let product =
            Self::snapshot_get(&snapshot, &cf_products, &keys::product_key(&sku.product))?;
        let price = Self::snapshot_get::<PriceRow>(&snapshot, &cf_prices, &keys::sku_key(sku))?
            .map(|row| row.price);
        let stock = Self::snapshot_get::<StockMeta>(&snapshot, &cf_meta, &keys::sku_key(sku))?
            .unwrap_or_default()
            .level();

        Ok(ReadView {
            account,
            product,
            price,
            stock,
        })
    }

    fn commit_purchase(&self, commit: PurchaseCommit) -> Result<TransactionRecord> {
        check_commit(&commit)?;
        let PurchaseCommit {
            account,
            mut record,
        } = commit;

        let mut batch = WriteBatch::default();
        record.keys = self.stage_take_front(&mut batch, &record.sku, u64::from(record.quantity))?;

        let cf_accounts = self.cf(cf::ACCOUNTS)?;
        let cf_tx = self.cf(cf::TRANSACTIONS)?;
        let cf_tx_by_user = self.cf(cf::TRANSACTIONS_BY_USER)?;

        batch.put_cf(
            &cf_accounts,
            keys::account_key(&account.user_id),
            Self::serialize(&account)?,
        );
        batch.put_cf(
            &cf_tx,
            keys::transaction_key(&record.id),
            Self::serialize(&record)?,
        );
        batch.put_cf(
            &cf_tx_by_user,
            keys::user_transaction_key(&record.user_id, record.sequence),
            keys::transaction_key(&record.id),
        );

        // Account, stock, key index, and history land together or not at all.
        self.write(batch)?;

        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use keyshop_core::Quote;
    use tempfile::TempDir;

    fn create_test_store() -> (RocksStore, TempDir) {
        let dir = TempDir::new().unwrap();
        let store = RocksStore::open_with(dir.path(), RocksOptions { sync_writes: false }).unwrap();
        (store, dir)
    }

    fn sku() -> Sku {
        Sku::parse("Vanguard", "1Week").unwrap()
    }

    fn strings(keys: &[&str]) -> Vec<String> {
        keys.iter().map(|k| (*k).to_string()).collect()
    }

    fn commit_for(store: &RocksStore, user: &str, quantity: u32) -> PurchaseCommit {
        let user_id = UserId::new(user).unwrap();
        let mut account = store
            .get_account(&user_id)
            .unwrap()
            .unwrap_or_else(|| Account::new(user_id.clone()));
        let quote = Quote::compute(sku(), 1000, quantity, 0).unwrap();
        let sequence = account.record_purchase(quote.charge_cents, quantity);
        let record = TransactionRecord::draft(user_id, sequence, &quote, account.balance_cents);
        PurchaseCommit { account, record }
    }

    #[test]
    fn account_and_catalog_roundtrip() {
        let (store, _dir) = create_test_store();
        let user_id = UserId::new("u1").unwrap();
        let mut account = Account::new(user_id.clone());
        account.balance_cents = 5000;
        store.put_account(&account).unwrap();
        assert_eq!(store.get_account(&user_id).unwrap().unwrap(), account);

        let product = Product::new(
            "Vanguard".parse().unwrap(),
            ["1Day".parse().unwrap(), "1Week".parse().unwrap()],
        );
        store.put_product(&product).unwrap();
        store.put_price(&sku(), &Price::new(1000).unwrap()).unwrap();

        assert_eq!(store.list_products().unwrap(), vec![product]);
        assert_eq!(store.get_price(&sku()).unwrap().unwrap().unit_price_cents, 1000);
        assert_eq!(store.list_prices().unwrap().len(), 1);
    }

    #[test]
    fn stock_is_fifo_across_appends() {
        let (store, _dir) = create_test_store();
        store.append_stock(&sku(), &strings(&["A", "B"])).unwrap();
        store.append_stock(&sku(), &strings(&["C"])).unwrap();

        assert_eq!(store.dequeue_stock(&sku(), 2).unwrap(), strings(&["A", "B"]));
        assert_eq!(store.dequeue_stock(&sku(), 1).unwrap(), strings(&["C"]));

        let level = store.stock_level(&sku()).unwrap();
        assert_eq!(level.available, 0);
        assert_eq!(level.issued, 3);
        assert!(level.is_balanced());
    }

    #[test]
    fn append_dedupes_against_index() {
        let (store, _dir) = create_test_store();
        store.append_stock(&sku(), &strings(&["A"])).unwrap();
        let outcome = store
            .append_stock(&sku(), &strings(&["A", "B", "B", "  "]))
            .unwrap();
        assert_eq!(outcome.added, 1);
        assert_eq!(outcome.skipped_duplicate, 2);
        assert_eq!(outcome.skipped_blank, 1);
    }

    #[test]
    fn dequeue_insufficient_leaves_queue() {
        let (store, _dir) = create_test_store();
        store.append_stock(&sku(), &strings(&["A", "B"])).unwrap();
        let result = store.dequeue_stock(&sku(), 5);
        assert!(matches!(
            result,
            Err(StoreError::InsufficientStock {
                available: 2,
                requested: 5
            })
        ));
        assert_eq!(store.dequeue_stock(&sku(), 2).unwrap(), strings(&["A", "B"]));
    }

    #[test]
    fn clear_then_reupload() {
        let (store, _dir) = create_test_store();
        store.append_stock(&sku(), &strings(&["A", "B", "C"])).unwrap();
        store.dequeue_stock(&sku(), 1).unwrap();
        assert_eq!(store.clear_stock(&sku()).unwrap(), 2);
        assert_eq!(store.clear_stock(&sku()).unwrap(), 0);

        assert!(store.key_record("B").unwrap().is_none());
        assert_eq!(
            store.key_record("A").unwrap().unwrap().status,
            KeyStatus::Issued
        );

        let outcome = store.append_stock(&sku(), &strings(&["A", "B"])).unwrap();
        assert_eq!(outcome.added, 1);
        assert_eq!(store.dequeue_stock(&sku(), 1).unwrap(), strings(&["B"]));
    }

    #[test]
    fn commit_purchase_and_history() {
        let (store, _dir) = create_test_store();
        store
            .append_stock(&sku(), &strings(&["A", "B", "C", "D"]))
            .unwrap();

        let first = store.commit_purchase(commit_for(&store, "u1", 1)).unwrap();
        let second = store.commit_purchase(commit_for(&store, "u1", 2)).unwrap();
        let _other = store.commit_purchase(commit_for(&store, "u10", 1)).unwrap();

        assert_eq!(first.keys, strings(&["A"]));
        assert_eq!(second.keys, strings(&["B", "C"]));

        let user_id = UserId::new("u1").unwrap();
        let history = store.list_transactions_by_user(&user_id, 10, None).unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].id, second.id);
        assert_eq!(history[1].id, first.id);

        let older = store.list_transactions_by_user(&user_id, 10, Some(1)).unwrap();
        assert_eq!(older.len(), 1);
        assert_eq!(older[0].id, first.id);

        let account = store.get_account(&user_id).unwrap().unwrap();
        assert_eq!(account.purchase_count, 2);
        assert_eq!(account.total_keys, 3);
    }

    #[test]
    fn failed_commit_writes_nothing() {
        let (store, _dir) = create_test_store();
        store.append_stock(&sku(), &strings(&["A"])).unwrap();

        let result = store.commit_purchase(commit_for(&store, "u1", 2));
        assert!(matches!(result, Err(StoreError::InsufficientStock { .. })));

        let user_id = UserId::new("u1").unwrap();
        assert!(store.get_account(&user_id).unwrap().is_none());
        assert_eq!(store.stock_level(&sku()).unwrap().available, 1);
        assert!(store
            .list_transactions_by_user(&user_id, 10, None)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn concurrent_uploads_to_different_skus_share_key_index() {
        let (store, _dir) = create_test_store();
        let store = Arc::new(store);
        let alpha = Sku::parse("Alpha", "1Day").unwrap();
        let beta = Sku::parse("Beta", "1Day").unwrap();
        let shared: Vec<String> = (0..500).map(|i| format!("SHARED-{i:04}")).collect();

        for round in 0..10 {
            let batch: Vec<String> = shared.iter().map(|k| format!("{k}-{round}")).collect();
            let handles: Vec<_> = [alpha.clone(), beta.clone()]
                .into_iter()
                .map(|sku| {
                    let store = Arc::clone(&store);
                    let batch = batch.clone();
                    std::thread::spawn(move || store.append_stock(&sku, &batch).unwrap().added)
                })
                .collect();
            let added: u64 = handles.into_iter().map(|h| h.join().unwrap()).sum();
            assert_eq!(added, 500, "round {round} queued a key twice");
        }

        let mut issued = Vec::new();
        for sku in [&alpha, &beta] {
            let available = store.stock_level(sku).unwrap().available;
            issued.extend(store.dequeue_stock(sku, available).unwrap());
        }
        let unique: HashSet<&String> = issued.iter().collect();
        assert_eq!(issued.len(), 5000);
        assert_eq!(unique.len(), issued.len());
    }

    #[test]
    fn state_survives_reopen() {
        let dir = TempDir::new().unwrap();
        {
            let store = RocksStore::open(dir.path()).unwrap();
            store.append_stock(&sku(), &strings(&["A", "B"])).unwrap();
            store.commit_purchase(commit_for(&store, "u1", 1)).unwrap();
        }

        let store = RocksStore::open(dir.path()).unwrap();
        assert_eq!(store.stock_level(&sku()).unwrap().available, 1);
        let user_id = UserId::new("u1").unwrap();
        let history = store.list_transactions_by_user(&user_id, 10, None).unwrap();
        assert_eq!(history[0].keys, strings(&["A"]));
    }

    #[test]
    fn read_view_sees_committed_state() {
        let (store, _dir) = create_test_store();
        store.append_stock(&sku(), &strings(&["A"])).unwrap();
        store.put_price(&sku(), &Price::new(1000).unwrap()).unwrap();

        let user_id = UserId::new("u1").unwrap();
        let view = store.read_view(&user_id, &sku()).unwrap();
        assert!(view.account.is_none());
        assert!(view.product.is_none());
        assert_eq!(view.price.unwrap().unit_price_cents, 1000);
        assert_eq!(view.stock.available, 1);
    }
}
