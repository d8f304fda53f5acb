//! Per-entity async locks.
//!
//! Each account, product, and stock queue gets its own `tokio::sync::Mutex`,
//! created on first use and dropped again once no guard or waiter holds it.
//! Guards are owned, so they can be held across await points.
//!
//! Keys are always acquired in sorted order. [`LockKey`] orders every account
//! before every product and every product before every stock queue, so two
//! callers can never wait on each other in a cycle.

use std::collections::HashMap;
use std::sync::Arc;

use keyshop_core::{ProductName, Sku, UserId};
use parking_lot::Mutex;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// An entity that can be locked.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LockKey {
    /// A user's ledger entry.
    Account(UserId),
    /// A catalog entry and its prices.
    Product(ProductName),
    /// A SKU's stock queue.
    Stock(Sku),
}

type LockMap = HashMap<LockKey, Arc<AsyncMutex<()>>>;

/// Held locks; dropping the guard releases them.
#[derive(Debug)]
pub struct LockGuard {
    guards: Vec<(LockKey, OwnedMutexGuard<()>)>,
    entries: Arc<Mutex<LockMap>>,
}

impl LockGuard {
    /// Number of distinct locks held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.guards.len()
    }

    /// Whether no locks are held.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.guards.is_empty()
    }
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        // Release every mutex before checking who else still refers to it.
        let keys: Vec<LockKey> = self.guards.drain(..).map(|(key, _held)| key).collect();

        // Waiters clone the Arc under this same map lock, so a count of one
        // means only the map refers to the mutex.
        let mut entries = self.entries.lock();
        for key in keys {
            if entries
                .get(&key)
                .is_some_and(|mutex| Arc::strong_count(mutex) == 1)
            {
                entries.remove(&key);
            }
        }
    }
}

/// Registry of per-entity mutexes.
#[derive(Debug, Default)]
pub struct LockRegistry {
    entries: Arc<Mutex<LockMap>>,
}

impl LockRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquire every lock in `keys`, waiting as needed.
    ///
    /// Duplicate keys are locked once.
    pub async fn acquire(&self, mut keys: Vec<LockKey>) -> LockGuard {
        keys.sort();
        keys.dedup();

        let mut guards = Vec::with_capacity(keys.len());
        for key in keys {
            // The registry lock is released before awaiting the entity lock.
            let mutex = {
                let mut entries = self.entries.lock();
                Arc::clone(entries.entry(key.clone()).or_default())
            };
            guards.push((key, mutex.lock_owned().await));
        }

        LockGuard {
            guards,
            entries: Arc::clone(&self.entries),
        }
    }

    /// Number of entities currently locked or awaited.
    #[must_use]
    pub fn tracked(&self) -> usize {
        self.entries.lock().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration as StdDuration;

    fn account(id: &str) -> LockKey {
        LockKey::Account(UserId::new(id).unwrap())
    }

    fn stock(product: &str, duration: &str) -> LockKey {
        LockKey::Stock(Sku::parse(product, duration).unwrap())
    }

    #[test]
    fn accounts_sort_before_products_and_stock() {
        let mut keys = vec![
            stock("Alpha", "1Day"),
            LockKey::Product(ProductName::new("Alpha").unwrap()),
            account("zz-last-user"),
        ];
        keys.sort();
        assert!(matches!(keys[0], LockKey::Account(_)));
        assert!(matches!(keys[1], LockKey::Product(_)));
        assert!(matches!(keys[2], LockKey::Stock(_)));
    }

    #[tokio::test]
    async fn duplicate_keys_lock_once() {
        let registry = LockRegistry::new();
        let guard = registry
            .acquire(vec![account("u1"), account("u1"), stock("Vanguard", "1Day")])
            .await;
        assert_eq!(guard.len(), 2);
        assert_eq!(registry.tracked(), 2);
    }

    #[tokio::test]
    async fn released_on_drop() {
        let registry = LockRegistry::new();
        let guard = registry.acquire(vec![account("u1")]).await;
        drop(guard);
        let again = tokio::time::timeout(
            StdDuration::from_millis(100),
            registry.acquire(vec![account("u1")]),
        )
        .await;
        assert!(again.is_ok());
    }

    #[tokio::test]
    async fn idle_entries_are_pruned() {
        let registry = LockRegistry::new();
        let guard = registry
            .acquire(vec![account("u1"), stock("Vanguard", "1Day")])
            .await;
        assert_eq!(registry.tracked(), 2);
        drop(guard);
        assert_eq!(registry.tracked(), 0);
    }

    #[tokio::test]
    async fn entry_survives_while_another_task_waits() {
        let registry = Arc::new(LockRegistry::new());
        let held = registry.acquire(vec![account("u1")]).await;

        let waiter = {
            let registry = Arc::clone(&registry);
            tokio::spawn(async move {
                let guard = registry.acquire(vec![account("u1")]).await;
                guard.len()
            })
        };
        // Give the waiter time to queue on the mutex.
        tokio::time::sleep(StdDuration::from_millis(20)).await;

        drop(held);
        assert_eq!(registry.tracked(), 1);
        assert_eq!(waiter.await.unwrap(), 1);
        assert_eq!(registry.tracked(), 0);
    }

    #[tokio::test]
    async fn held_lock_blocks_same_key_only() {
        let registry = Arc::new(LockRegistry::new());
        let _held = registry.acquire(vec![account("u1")]).await;

        let blocked = tokio::time::timeout(
            StdDuration::from_millis(50),
            registry.acquire(vec![account("u1")]),
        )
        .await;
        assert!(blocked.is_err());

        let other = tokio::time::timeout(
            StdDuration::from_millis(50),
            registry.acquire(vec![account("u2")]),
        )
        .await;
        assert!(other.is_ok());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn opposite_request_orders_do_not_deadlock() {
        let registry = Arc::new(LockRegistry::new());
        let mut handles = Vec::new();
        for i in 0..50 {
            let registry = Arc::clone(&registry);
            handles.push(tokio::spawn(async move {
                let keys = if i % 2 == 0 {
                    vec![account("u1"), stock("Vanguard", "1Day")]
                } else {
                    vec![stock("Vanguard", "1Day"), account("u1")]
                };
                let _guard = registry.acquire(keys).await;
                tokio::task::yield_now().await;
            }));
        }

        let all = tokio::time::timeout(
            StdDuration::from_secs(5),
            futures::future::join_all(handles),
        )
        .await
        .expect("lock acquisition deadlocked");
        assert!(all.into_iter().all(|r| r.is_ok()));
    }
}
