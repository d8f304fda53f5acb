//! Purchase engine and admin API for keyshop.
//!
//! A [`Shop`] wires one [`Store`](keyshop_store::Store) to two entry points:
//!
//! - [`TransactionEngine`]: reseller operations (purchase, estimate, history,
//!   account, price sheet).
//! - [`AdminApi`]: balance, discount, catalog, price, and stock management.
//!
//! Both share a [`LockRegistry`] so that every mutation of an account or a
//! stock queue is serialized with purchases touching the same entity.
//!
//! # Example
//!
//! ```no_run
//! use keyshop_core::{Sku, UserId};
//! use keyshop_engine::{Shop, ShopConfig};
//!
//! # async fn run() -> keyshop_core::Result<()> {
//! let shop = Shop::open(ShopConfig::in_memory())?;
//! let sku = Sku::parse("Vanguard", "1Week")?;
//! let user = UserId::new("reseller-1")?;
//!
//! shop.admin()
//!     .add_product(&sku.product, vec![sku.duration.clone()])
//!     .await?;
//! shop.admin().set_price(&sku, 1000).await?;
//! shop.admin().append_stock(&sku, &["KEY-1".to_string()]).await?;
//! shop.admin().add_balance(&user, 5000).await?;
//!
//! let record = shop.engine().purchase(&user, &sku, 1).await?;
//! println!("{}", record.summary());
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod admin;
pub mod config;
pub mod engine;
pub mod locks;
pub mod shop;

pub use admin::{AdminApi, AUDIT_TARGET};
pub use config::{ConfigError, ShopConfig, StorageBackend};
pub use engine::{Estimate, TransactionEngine};
pub use locks::{LockGuard, LockKey, LockRegistry};
pub use shop::Shop;
