//! Key encoding utilities for `RocksDB`.
//!
//! Variable-length names are written as `len (u16, big-endian) || bytes` so that
//! composite keys never collide and a user's index entries share a clean prefix.

use keyshop_core::{ProductName, Sku, TransactionId, UserId};

fn push_name(buf: &mut Vec<u8>, bytes: &[u8]) {
    let len = u16::try_from(bytes.len()).unwrap_or(u16::MAX);
    buf.extend_from_slice(&len.to_be_bytes());
    buf.extend_from_slice(&bytes[..usize::from(len)]);
}

/// Create an account key from a user ID.
#[must_use]
pub fn account_key(user_id: &UserId) -> Vec<u8> {
    user_id.as_bytes().to_vec()
}

/// Create a product key from a product name.
#[must_use]
pub fn product_key(name: &ProductName) -> Vec<u8> {
    name.as_bytes().to_vec()
}

/// Encode a SKU.
///
/// Format: `len || product || len || duration`
#[must_use]
pub fn sku_key(sku: &Sku) -> Vec<u8> {
    let mut key = Vec::with_capacity(4 + sku.product.as_bytes().len() + sku.duration.as_bytes().len());
    push_name(&mut key, sku.product.as_bytes());
    push_name(&mut key, sku.duration.as_bytes());
    key
}

/// Create a stock queue entry key.
///
/// Format: `sku_key || sequence (8 bytes, big-endian)`
#[must_use]
pub fn queue_entry_key(sku: &Sku, sequence: u64) -> Vec<u8> {
    let mut key = sku_key(sku);
    key.extend_from_slice(&sequence.to_be_bytes());
    key
}

/// Create a key-index key from a license key string.
#[must_use]
pub fn key_index_key(license_key: &str) -> Vec<u8> {
    license_key.as_bytes().to_vec()
}

/// Create a transaction key from a transaction ID.
#[must_use]
pub fn transaction_key(transaction_id: &TransactionId) -> Vec<u8> {
    transaction_id.to_bytes().to_vec()
}

/// Create a prefix for iterating all transactions for a user.
#[must_use]
pub fn user_transactions_prefix(user_id: &UserId) -> Vec<u8> {
    let mut key = Vec::with_capacity(2 + user_id.as_bytes().len() + 8);
    push_name(&mut key, user_id.as_bytes());
    key
}

/// Create a user-transaction index key.
///
/// Format: `len || user_id || sequence (8 bytes, big-endian)`
///
/// Sequences are assigned per user in commit order, so index order is history order.
#[must_use]
pub fn user_transaction_key(user_id: &UserId, sequence: u64) -> Vec<u8> {
    let mut key = user_transactions_prefix(user_id);
    key.extend_from_slice(&sequence.to_be_bytes());
    key
}

/// Decode a transaction ID stored as an index value.
#[must_use]
pub fn decode_transaction_id(value: &[u8]) -> Option<TransactionId> {
    let bytes: [u8; 16] = value.try_into().ok()?;
    Some(TransactionId::from_bytes(bytes))
}
