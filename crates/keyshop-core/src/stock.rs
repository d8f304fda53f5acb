//! License-key stock types.

use serde::{Deserialize, Serialize};

use crate::catalog::Sku;

/// Remaining and lifetime counts for one stock queue.
///
/// `issued + cleared + available == uploaded` holds for every queue.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockLevel {
    /// Keys waiting to be issued.
    pub available: u64,
    /// Keys ever appended.
    pub uploaded: u64,
    /// Keys handed out by purchases or direct dequeues.
    pub issued: u64,
    /// Keys discarded by clears.
    pub cleared: u64,
}

impl StockLevel {
    /// Whether the counters are consistent with each other.
    #[must_use]
    pub fn is_balanced(&self) -> bool {
        self.issued + self.cleared + self.available == self.uploaded
    }
}

/// Outcome of appending keys to a stock queue.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockAppend {
    /// Keys appended to the tail of the queue.
    pub added: u64,
    /// Entries dropped because they were blank or whitespace only.
    pub skipped_blank: u64,
    /// Keys dropped because they were already queued, already issued, or
    /// repeated within the same upload.
    pub skipped_duplicate: u64,
}

/// Lifecycle state of a key known to the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyStatus {
    /// Waiting in a stock queue.
    Queued,
    /// Handed to a buyer. Issued keys can never be uploaded again.
    Issued,
}

/// Entry in the global key index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyRecord {
    /// Queue the key belongs to.
    pub sku: Sku,
    /// Current state.
    pub status: KeyStatus,
}

/// Trim raw upload entries and drop the blank ones.
///
/// Returns the surviving keys in their original order and the number of blank
/// entries that were dropped.
#[must_use]
pub fn normalize_keys<I, S>(raw: I) -> (Vec<String>, u64)
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut keys = Vec::new();
    let mut blank = 0;
    for entry in raw {
        let trimmed = entry.as_ref().trim();
        if trimmed.is_empty() {
            blank += 1;
        } else {
            keys.push(trimmed.to_string());
        }
    }
    (keys, blank)
}

/// One row of a catalog-wide stock report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockReportLine {
    /// The SKU.
    pub sku: Sku,
    /// Its queue counters.
    pub level: StockLevel,
}
