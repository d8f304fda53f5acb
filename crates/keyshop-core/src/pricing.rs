//! Purchase pricing.
//!
//! All amounts are integer cents. A discounted total is
//! `unit_price × quantity × (100 − discount) / 100`, rounded half-up to the cent.
//! Intermediate products are computed in `i128`, so rounding happens exactly once.

use serde::{Deserialize, Serialize};

use crate::account::MAX_DISCOUNT_PERCENT;
use crate::catalog::Sku;
use crate::error::{Result, ShopError};

/// Apply a percentage discount to an amount, rounding half-up to the cent.
///
/// # Errors
///
/// Returns `InvalidArgument` for a negative amount or a discount above 100.
pub fn apply_discount(amount_cents: i64, discount_percent: u8) -> Result<i64> {
    if amount_cents < 0 {
        return Err(ShopError::InvalidArgument(format!(
            "amount must not be negative: {amount_cents}"
        )));
    }
    if discount_percent > MAX_DISCOUNT_PERCENT {
        return Err(ShopError::InvalidArgument(format!(
            "discount must be between 0 and {MAX_DISCOUNT_PERCENT}, got {discount_percent}"
        )));
    }
    let scaled = i128::from(amount_cents) * i128::from(100 - discount_percent);
    let rounded = (scaled + 50) / 100;
    i64::try_from(rounded).map_err(|_| ShopError::InvalidArgument("amount overflow".into()))
}

/// A priced purchase of `quantity` keys of one SKU.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quote {
    /// What is being bought.
    pub sku: Sku,
    /// Number of keys.
    pub quantity: u32,
    /// Price of one key before discount, in cents.
    pub unit_price_cents: i64,
    /// Discount applied, in percent.
    pub discount_percent: u8,
    /// `unit_price × quantity`, in cents.
    pub base_total_cents: i64,
    /// Amount that will be charged, in cents.
    pub charge_cents: i64,
    /// `base_total − charge`, in cents.
    pub savings_cents: i64,
}

impl Quote {
    /// Price a purchase.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` for a zero quantity, a non-positive unit price,
    /// an out-of-range discount, or an overflowing total.
    pub fn compute(
        sku: Sku,
        unit_price_cents: i64,
        quantity: u32,
        discount_percent: u8,
    ) -> Result<Self> {
        if quantity == 0 {
            return Err(ShopError::InvalidArgument(
                "quantity must be at least 1".into(),
            ));
        }
        if unit_price_cents <= 0 {
            return Err(ShopError::InvalidArgument(format!(
                "unit price must be positive, got {unit_price_cents}"
            )));
        }
        let base_total_cents = unit_price_cents
            .checked_mul(i64::from(quantity))
            .ok_or_else(|| ShopError::InvalidArgument("total price overflow".into()))?;
        let charge_cents = apply_discount(base_total_cents, discount_percent)?;

        Ok(Self {
            sku,
            quantity,
            unit_price_cents,
            discount_percent,
            base_total_cents,
            charge_cents,
            savings_cents: base_total_cents - charge_cents,
        })
    }
}

/// One row of a reseller's price sheet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceLine {
    /// The SKU.
    pub sku: Sku,
    /// List price of one key, in cents.
    pub unit_price_cents: i64,
    /// Price of one key after the reseller's discount, in cents.
    pub discounted_unit_price_cents: i64,
}

/// Render cents as a dollar string (`2399` → `"$23.99"`).
#[must_use]
pub fn format_cents(cents: i64) -> String {
    let sign = if cents < 0 { "-" } else { "" };
    let abs = cents.unsigned_abs();
    format!("{sign}${}.{:02}", abs / 100, abs % 100)
}
