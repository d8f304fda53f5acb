//! Product catalog and pricing table types.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Result, ShopError};
use crate::{Duration, ProductName};

/// A sellable (product, duration) pair.
///
/// A SKU addresses one price in the pricing table and one stock queue.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Sku {
    /// Product name.
    pub product: ProductName,
    /// Duration label.
    pub duration: Duration,
}

impl Sku {
    /// Create a new SKU.
    #[must_use]
    pub fn new(product: ProductName, duration: Duration) -> Self {
        Self { product, duration }
    }

    /// Parse a SKU from raw product and duration strings.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` if either part is not a valid name.
    pub fn parse(product: &str, duration: &str) -> Result<Self> {
        Ok(Self {
            product: product.parse()?,
            duration: duration.parse()?,
        })
    }
}

impl fmt::Display for Sku {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.product, self.duration)
    }
}

/// A registered product and the durations it is sold in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    /// Product name.
    pub name: ProductName,

    /// Durations in registration order, without duplicates.
    pub durations: Vec<Duration>,

    /// When the product was first registered.
    pub created_at: DateTime<Utc>,

    /// When the duration list last changed.
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Create a product with the given durations (duplicates are dropped).
    #[must_use]
    pub fn new(name: ProductName, durations: impl IntoIterator<Item = Duration>) -> Self {
        let now = Utc::now();
        let mut product = Self {
            name,
            durations: Vec::new(),
            created_at: now,
            updated_at: now,
        };
        product.add_durations(durations);
        product.updated_at = now;
        product
    }

    /// Merge durations into the product, keeping existing order.
    ///
    /// Returns how many durations were new.
    pub fn add_durations(&mut self, durations: impl IntoIterator<Item = Duration>) -> usize {
        let mut added = 0;
        for duration in durations {
            if !self.durations.contains(&duration) {
                self.durations.push(duration);
                added += 1;
            }
        }
        if added > 0 {
            self.updated_at = Utc::now();
        }
        added
    }

    /// Whether the product is sold in `duration`.
    #[must_use]
    pub fn offers(&self, duration: &Duration) -> bool {
        self.durations.contains(duration)
    }

    /// SKUs for every duration of this product.
    pub fn skus(&self) -> impl Iterator<Item = Sku> + '_ {
        self.durations
            .iter()
            .map(|d| Sku::new(self.name.clone(), d.clone()))
    }
}

/// A unit price entry in the pricing table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Price {
    /// Price of one key in cents.
    pub unit_price_cents: i64,

    /// When the price was last set.
    pub updated_at: DateTime<Utc>,
}

impl Price {
    /// Create a validated price.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` unless the price is strictly positive.
    pub fn new(unit_price_cents: i64) -> Result<Self> {
        if unit_price_cents <= 0 {
            return Err(ShopError::InvalidArgument(format!(
                "unit price must be positive, got {unit_price_cents}"
            )));
        }
        Ok(Self {
            unit_price_cents,
            updated_at: Utc::now(),
        })
    }
}
