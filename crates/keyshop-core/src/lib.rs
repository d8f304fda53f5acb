//! Core types and utilities for keyshop.
//!
//! This crate provides the foundational types used by the keyshop stores and
//! purchase engine:
//!
//! - **Identifiers**: `UserId`, `ProductName`, `Duration`, `TransactionId`
//! - **Accounts**: `Account` (balance, discount, lifetime stats)
//! - **Catalog**: `Product`, `Sku`, `Price`
//! - **Pricing**: `Quote`, `apply_discount`
//! - **Stock**: `StockLevel`, `StockAppend`, `KeyRecord`
//! - **Transactions**: `TransactionRecord`, `HistoryPage`
//!
//! # Money
//!
//! All amounts are `i64` cents. Discounted totals are rounded half-up to the
//! cent exactly once per purchase.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod account;
pub mod catalog;
pub mod error;
pub mod ids;
pub mod pricing;
pub mod stock;
pub mod transaction;

pub use account::{Account, MAX_DISCOUNT_PERCENT};
pub use catalog::{Price, Product, Sku};
pub use error::{Result, ShopError};
pub use ids::{Duration, IdError, ProductName, TransactionId, UserId, MAX_NAME_BYTES};
pub use pricing::{apply_discount, format_cents, PriceLine, Quote};
pub use stock::{
    normalize_keys, KeyRecord, KeyStatus, StockAppend, StockLevel, StockReportLine,
};
pub use transaction::{HistoryPage, TransactionRecord};
