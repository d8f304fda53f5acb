//! In-memory storage implementation.
//!
//! All state lives behind one `RwLock`, so every trait method, including
//! `commit_purchase`, is atomic with respect to every other.

use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};

use parking_lot::RwLock;

use keyshop_core::{
    normalize_keys, Account, KeyRecord, KeyStatus, Price, Product, ProductName, Sku,
    StockAppend, StockLevel, TransactionId, TransactionRecord, UserId,
};

use crate::error::{Result, StoreError};
use crate::{check_commit, PurchaseCommit, ReadView, Store};

#[derive(Debug, Default)]
struct Queue {
    keys: VecDeque<String>,
    level: StockLevel,
}

impl Queue {
    fn take_front(&mut self, count: u64) -> Result<Vec<String>> {
        let available = self.keys.len() as u64;
        if available < count {
            return Err(StoreError::InsufficientStock {
                available,
                requested: count,
            });
        }
        #[allow(clippy::cast_possible_truncation)]
        let taken: Vec<String> = self.keys.drain(..count as usize).collect();
        self.level.available -= count;
        self.level.issued += count;
        Ok(taken)
    }
}

#[derive(Debug, Default)]
struct State {
    accounts: HashMap<UserId, Account>,
    products: BTreeMap<ProductName, Product>,
    prices: BTreeMap<Sku, Price>,
    queues: HashMap<Sku, Queue>,
    key_index: HashMap<String, KeyRecord>,
    transactions: HashMap<TransactionId, TransactionRecord>,
    transactions_by_user: HashMap<UserId, Vec<TransactionId>>,
}

impl State {
    fn mark_issued(&mut self, keys: &[String]) {
        for key in keys {
            if let Some(record) = self.key_index.get_mut(key) {
                record.status = KeyStatus::Issued;
            }
        }
    }
}

/// In-memory [`Store`] implementation.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: RwLock<State>,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl Store for MemoryStore {
    fn get_account(&self, user_id: &UserId) -> Result<Option<Account>> {
        Ok(self.state.read().accounts.get(user_id).cloned())
    }

    fn put_account(&self, account: &Account) -> Result<()> {
        self.state
            .write()
            .accounts
            .insert(account.user_id.clone(), account.clone());
        Ok(())
    }

    fn get_product(&self, name: &ProductName) -> Result<Option<Product>> {
        Ok(self.state.read().products.get(name).cloned())
    }

    fn put_product(&self, product: &Product) -> Result<()> {
        self.state
            .write()
            .products
            .insert(product.name.clone(), product.clone());
        Ok(())
    }

    fn list_products(&self) -> Result<Vec<Product>> {
        Ok(self.state.read().products.values().cloned().collect())
    }

    fn get_price(&self, sku: &Sku) -> Result<Option<Price>> {
        Ok(self.state.read().prices.get(sku).copied())
    }

    fn put_price(&self, sku: &Sku, price: &Price) -> Result<()> {
        self.state.write().prices.insert(sku.clone(), *price);
        Ok(())
    }

    fn list_prices(&self) -> Result<Vec<(Sku, Price)>> {
        Ok(self
            .state
            .read()
            .prices
            .iter()
            .map(|(sku, price)| (sku.clone(), *price))
            .collect())
    }

    fn stock_level(&self, sku: &Sku) -> Result<StockLevel> {
        Ok(self
            .state
            .read()
            .queues
            .get(sku)
            .map(|q| q.level)
            .unwrap_or_default())
    }

    fn append_stock(&self, sku: &Sku, keys: &[String]) -> Result<StockAppend> {
        let (keys, skipped_blank) = normalize_keys(keys);
        let mut outcome = StockAppend {
            skipped_blank,
            ..StockAppend::default()
        };

        let mut state = self.state.write();
        let mut fresh = Vec::with_capacity(keys.len());
        let mut seen = HashSet::new();
        for key in keys {
            if state.key_index.contains_key(&key) || !seen.insert(key.clone()) {
                outcome.skipped_duplicate += 1;
            } else {
                fresh.push(key);
            }
        }

        for key in &fresh {
            state.key_index.insert(
                key.clone(),
                KeyRecord {
                    sku: sku.clone(),
                    status: KeyStatus::Queued,
                },
            );
        }
        outcome.added = fresh.len() as u64;

        let queue = state.queues.entry(sku.clone()).or_default();
        queue.keys.extend(fresh);
        queue.level.available += outcome.added;
        queue.level.uploaded += outcome.added;

        Ok(outcome)
    }

    fn dequeue_stock(&self, sku: &Sku, count: u64) -> Result<Vec<String>> {
        let mut state = self.state.write();
        let taken = match state.queues.get_mut(sku) {
            Some(queue) => queue.take_front(count)?,
            None if count == 0 => Vec::new(),
            None => {
                return Err(StoreError::InsufficientStock {
                    available: 0,
                    requested: count,
                })
            }
        };
        state.mark_issued(&taken);
        Ok(taken)
    }

    fn clear_stock(&self, sku: &Sku) -> Result<u64> {
        let mut state = self.state.write();
        let Some(queue) = state.queues.get_mut(sku) else {
            return Ok(0);
        };
        let removed: Vec<String> = queue.keys.drain(..).collect();
        let count = removed.len() as u64;
        queue.level.available = 0;
        queue.level.cleared += count;
        for key in &removed {
            state.key_index.remove(key);
        }
        Ok(count)
    }

    fn key_record(&self, license_key: &str) -> Result<Option<KeyRecord>> {
        Ok(self.state.read().key_index.get(license_key).cloned())
    }

    fn get_transaction(
        &self,
        transaction_id: &TransactionId,
    ) -> Result<Option<TransactionRecord>> {
        Ok(self.state.read().transactions.get(transaction_id).cloned())
    }

    fn list_transactions_by_user(
        &self,
        user_id: &UserId,
        limit: usize,
        before: Option<u64>,
    ) -> Result<Vec<TransactionRecord>> {
        let state = self.state.read();
        let Some(ids) = state.transactions_by_user.get(user_id) else {
            return Ok(Vec::new());
        };
        Ok(ids
            .iter()
            .rev()
            .filter_map(|id| state.transactions.get(id))
            .filter(|record| before.map_or(true, |cursor| record.sequence < cursor))
            .take(limit)
            .cloned()
            .collect())
    }

    fn read_view(&self, user_id: &UserId, sku: &Sku) -> Result<ReadView> {
        let state = self.state.read();
        Ok(ReadView {
            account: state.accounts.get(user_id).cloned(),
            product: state.products.get(&sku.product).cloned(),
            price: state.prices.get(sku).copied(),
            stock: state.queues.get(sku).map(|q| q.level).unwrap_or_default(),
        })
    }

    fn commit_purchase(&self, commit: PurchaseCommit) -> Result<TransactionRecord> {
        check_commit(&commit)?;
        let PurchaseCommit {
            account,
            mut record,
        } = commit;

        let mut state = self.state.write();
        let requested = u64::from(record.quantity);
        let keys = match state.queues.get_mut(&record.sku) {
            Some(queue) => queue.take_front(requested)?,
            None => {
                return Err(StoreError::InsufficientStock {
                    available: 0,
                    requested,
                })
            }
        };
        state.mark_issued(&keys);
        record.keys = keys;

        state
            .transactions_by_user
            .entry(record.user_id.clone())
            .or_default()
            .push(record.id);
        state.transactions.insert(record.id, record.clone());
        state.accounts.insert(account.user_id.clone(), account);

        Ok(record)
    }
}
