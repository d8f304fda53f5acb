//! Purchase transaction records.
//!
//! A record is created exactly once per committed purchase and is never
//! modified afterwards. Records form the per-user purchase history.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::catalog::Sku;
use crate::pricing::Quote;
use crate::{TransactionId, UserId};

/// An immutable receipt of one completed purchase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionRecord {
    /// Unique transaction ID (ULID for time-ordering).
    pub id: TransactionId,

    /// Position in the buyer's history, starting at 0.
    pub sequence: u64,

    /// The buyer.
    pub user_id: UserId,

    /// What was bought.
    pub sku: Sku,

    /// Number of keys issued.
    pub quantity: u32,

    /// List price of one key, in cents.
    pub unit_price_cents: i64,

    /// Discount applied, in percent.
    pub discount_percent: u8,

    /// Undiscounted total, in cents.
    pub base_total_cents: i64,

    /// Amount charged, in cents.
    pub charged_cents: i64,

    /// Buyer balance after the charge, in cents.
    pub balance_after_cents: i64,

    /// The issued keys in FIFO order. Filled in by the store at commit.
    pub keys: Vec<String>,

    /// When the purchase committed.
    pub created_at: DateTime<Utc>,
}

impl TransactionRecord {
    /// Draft a record for a priced purchase; `keys` stays empty until commit.
    #[must_use]
    pub fn draft(user_id: UserId, sequence: u64, quote: &Quote, balance_after_cents: i64) -> Self {
        Self {
            id: TransactionId::generate(),
            sequence,
            user_id,
            sku: quote.sku.clone(),
            quantity: quote.quantity,
            unit_price_cents: quote.unit_price_cents,
            discount_percent: quote.discount_percent,
            base_total_cents: quote.base_total_cents,
            charged_cents: quote.charge_cents,
            balance_after_cents,
            keys: Vec::new(),
            created_at: Utc::now(),
        }
    }

    /// One-line summary in the style of the purchase log.
    #[must_use]
    pub fn summary(&self) -> String {
        format!(
            "Generated {}x {} - Total: {} ({}% discount applied)",
            self.quantity,
            self.sku,
            crate::pricing::format_cents(self.charged_cents),
            self.discount_percent
        )
    }
}

/// One page of a user's purchase history, newest first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryPage {
    /// Records, newest first.
    pub records: Vec<TransactionRecord>,

    /// Cursor for the next (older) page, if any.
    pub next_before: Option<u64>,
}
