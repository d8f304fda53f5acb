//! Reseller accounts.
//!
//! An account holds the prepaid balance, the reseller discount, and lifetime
//! purchase statistics. All mutation helpers keep `balance_cents >= 0`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Result, ShopError};
use crate::UserId;

/// Largest discount that can be granted, in percent.
pub const MAX_DISCOUNT_PERCENT: u8 = 100;

/// A reseller account.
///
/// Accounts are created lazily on first reference with a zero balance and no
/// discount. They are never deleted, only zeroed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    /// The owning user.
    pub user_id: UserId,

    /// Prepaid balance in cents. Never negative.
    pub balance_cents: i64,

    /// Reseller discount applied to purchases (0-100).
    pub discount_percent: u8,

    /// Lifetime amount charged for purchases, in cents.
    pub total_spent_cents: i64,

    /// Lifetime number of keys issued to this account.
    pub total_keys: u64,

    /// Number of committed purchases. Doubles as the next history sequence number.
    pub purchase_count: u64,

    /// When the account was created.
    pub created_at: DateTime<Utc>,

    /// When the account was last updated.
    pub updated_at: DateTime<Utc>,
}

impl Account {
    /// Create a new account with zero balance and no discount.
    #[must_use]
    pub fn new(user_id: UserId) -> Self {
        let now = Utc::now();
        Self {
            user_id,
            balance_cents: 0,
            discount_percent: 0,
            total_spent_cents: 0,
            total_keys: 0,
            purchase_count: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// Check if the account can cover a charge.
    #[must_use]
    pub fn has_sufficient_balance(&self, amount_cents: i64) -> bool {
        self.balance_cents >= amount_cents
    }

    /// Deduct `amount_cents` if the balance covers it.
    ///
    /// # Errors
    ///
    /// Returns `InsufficientBalance` (leaving the account untouched) when the
    /// balance is lower than the amount, and `InvalidArgument` for a negative amount.
    pub fn try_debit(&mut self, amount_cents: i64) -> Result<i64> {
        if amount_cents < 0 {
            return Err(ShopError::InvalidArgument(format!(
                "debit amount must not be negative: {amount_cents}"
            )));
        }
        if !self.has_sufficient_balance(amount_cents) {
            return Err(ShopError::InsufficientBalance {
                available: self.balance_cents,
                required: amount_cents,
            });
        }
        self.balance_cents -= amount_cents;
        self.updated_at = Utc::now();
        Ok(self.balance_cents)
    }

    /// Apply an administrative balance change.
    ///
    /// Returns the new balance.
    ///
    /// # Errors
    ///
    /// - `InvalidArgument` if `delta_cents` is zero or the result overflows.
    /// - `InsufficientBalance` if the result would be negative.
    pub fn adjust_balance(&mut self, delta_cents: i64) -> Result<i64> {
        if delta_cents == 0 {
            return Err(ShopError::InvalidArgument(
                "balance adjustment must not be zero".into(),
            ));
        }
        let new_balance = self
            .balance_cents
            .checked_add(delta_cents)
            .ok_or_else(|| ShopError::InvalidArgument("balance overflow".into()))?;
        if new_balance < 0 {
            return Err(ShopError::InsufficientBalance {
                available: self.balance_cents,
                required: delta_cents.checked_neg().unwrap_or(i64::MAX),
            });
        }
        self.balance_cents = new_balance;
        self.updated_at = Utc::now();
        Ok(new_balance)
    }

    /// Set the reseller discount.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` if `percent` exceeds 100.
    pub fn set_discount(&mut self, percent: u8) -> Result<()> {
        if percent > MAX_DISCOUNT_PERCENT {
            return Err(ShopError::InvalidArgument(format!(
                "discount must be between 0 and {MAX_DISCOUNT_PERCENT}, got {percent}"
            )));
        }
        self.discount_percent = percent;
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Fold a committed purchase into the lifetime statistics.
    ///
    /// Returns the history sequence number assigned to the purchase.
    pub fn record_purchase(&mut self, charge_cents: i64, quantity: u32) -> u64 {
        let sequence = self.purchase_count;
        self.total_spent_cents = self.total_spent_cents.saturating_add(charge_cents);
        self.total_keys = self.total_keys.saturating_add(u64::from(quantity));
        self.purchase_count += 1;
        self.updated_at = Utc::now();
        sequence
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn account() -> Account {
        Account::new(UserId::new("reseller-1").unwrap())
    }

    #[test]
    fn new_account_is_empty() {
        let account = account();
        assert_eq!(account.balance_cents, 0);
        assert_eq!(account.discount_percent, 0);
        assert_eq!(account.total_keys, 0);
        assert_eq!(account.purchase_count, 0);
    }

    #[test]
    fn try_debit_exact_balance() {
        let mut account = account();
        account.balance_cents = 2400;
        assert_eq!(account.try_debit(2400).unwrap(), 0);
    }

    #[test]
    fn try_debit_insufficient_leaves_balance() {
        let mut account = account();
        account.balance_cents = 2399;
        let err = account.try_debit(2400).unwrap_err();
        assert_eq!(
            err,
            ShopError::InsufficientBalance {
                available: 2399,
                required: 2400
            }
        );
        assert_eq!(account.balance_cents, 2399);
    }

    #[test]
    fn adjust_balance_rejects_negative_result() {
        let mut account = account();
        account.adjust_balance(500).unwrap();
        let err = account.adjust_balance(-501).unwrap_err();
        assert_eq!(
            err,
            ShopError::InsufficientBalance {
                available: 500,
                required: 501
            }
        );
        assert_eq!(account.adjust_balance(-500).unwrap(), 0);
    }

    #[test]
    fn adjust_balance_rejects_zero_and_overflow() {
        let mut account = account();
        assert!(matches!(
            account.adjust_balance(0),
            Err(ShopError::InvalidArgument(_))
        ));
        account.balance_cents = i64::MAX;
        assert!(matches!(
            account.adjust_balance(1),
            Err(ShopError::InvalidArgument(_))
        ));
    }

    #[test]
    fn discount_bounds() {
        let mut account = account();
        account.set_discount(100).unwrap();
        assert_eq!(account.discount_percent, 100);
        assert!(account.set_discount(101).is_err());
        assert_eq!(account.discount_percent, 100);
    }

    #[test]
    fn record_purchase_assigns_sequence() {
        let mut account = account();
        assert_eq!(account.record_purchase(2400, 3), 0);
        assert_eq!(account.record_purchase(100, 1), 1);
        assert_eq!(account.total_spent_cents, 2500);
        assert_eq!(account.total_keys, 4);
        assert_eq!(account.purchase_count, 2);
    }
}
