//! The assembled shop: one store, one lock registry, two APIs.

use std::sync::Arc;

use keyshop_core::{Result, ShopError};
use keyshop_store::{MemoryStore, Store};

use crate::admin::AdminApi;
use crate::config::{ShopConfig, StorageBackend};
use crate::engine::TransactionEngine;
use crate::locks::LockRegistry;

/// Shop state shared across request handlers.
#[derive(Clone)]
pub struct Shop {
    store: Arc<dyn Store>,
    engine: TransactionEngine,
    admin: AdminApi,
    config: ShopConfig,
}

impl Shop {
    /// Assemble a shop over an existing store.
    #[must_use]
    pub fn new(store: Arc<dyn Store>, config: ShopConfig) -> Self {
        let locks = Arc::new(LockRegistry::new());
        let engine = TransactionEngine::new(Arc::clone(&store), Arc::clone(&locks), config.clone());
        let admin = AdminApi::new(Arc::clone(&store), locks);
        Self {
            store,
            engine,
            admin,
            config,
        }
    }

    /// Open the configured backend and assemble a shop over it.
    ///
    /// # Errors
    ///
    /// - `InvalidArgument` if the configuration is invalid or names a backend
    ///   this build does not include.
    /// - `StorageFailure` if the database cannot be opened.
    pub fn open(config: ShopConfig) -> Result<Self> {
        config
            .validate()
            .map_err(|e| ShopError::InvalidArgument(e.to_string()))?;

        let store: Arc<dyn Store> = match config.backend {
            StorageBackend::Memory => {
                tracing::warn!("Using in-memory storage; state will not survive restart");
                Arc::new(MemoryStore::new())
            }
            StorageBackend::Rocksdb => open_rocks(&config)?,
        };

        tracing::info!(backend = ?config.backend, "Shop opened");
        Ok(Self::new(store, config))
    }

    /// The reseller-facing engine.
    #[must_use]
    pub fn engine(&self) -> &TransactionEngine {
        &self.engine
    }

    /// The admin API.
    #[must_use]
    pub fn admin(&self) -> &AdminApi {
        &self.admin
    }

    /// The underlying store.
    #[must_use]
    pub fn store(&self) -> &Arc<dyn Store> {
        &self.store
    }

    /// The configuration the shop was built with.
    #[must_use]
    pub fn config(&self) -> &ShopConfig {
        &self.config
    }
}

#[cfg(feature = "rocksdb-backend")]
fn open_rocks(config: &ShopConfig) -> Result<Arc<dyn Store>> {
    use keyshop_store::{RocksOptions, RocksStore};

    let options = RocksOptions {
        sync_writes: config.sync_writes,
    };
    let store = RocksStore::open_with(&config.data_dir, options)?;
    tracing::info!(data_dir = %config.data_dir.display(), "RocksDB store opened");
    Ok(Arc::new(store))
}

#[cfg(not(feature = "rocksdb-backend"))]
fn open_rocks(_config: &ShopConfig) -> Result<Arc<dyn Store>> {
    Err(ShopError::InvalidArgument(
        "rocksdb backend requested but this build lacks the rocksdb-backend feature".into(),
    ))
}
