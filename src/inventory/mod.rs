//! Inventory ledger - product stock counters and the pure math that moves
//! units between `stock` and `reserved`.
//!
//! A cart adjustment of `delta` units moves `delta` from `stock` to
//! `reserved` (or back, when negative), so `stock + reserved` is unchanged.
//! Restocking is the only operation that changes the total.

use serde::{Deserialize, Serialize};

use crate::error::CartError;
use crate::store::Record;

/// A product's inventory record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: String,
    #[serde(default)]
    pub name: String,
    /// Units physically available and not held by any cart.
    pub stock: u64,
    /// Units held by open carts.
    pub reserved: u64,
    pub version: u64,
}

impl Product {
    /// A new product at version 1 with nothing reserved.
    pub fn new(id: impl Into<String>, name: impl Into<String>, stock: u64) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            stock,
            reserved: 0,
            version: 1,
        }
    }

    /// `stock + reserved`.
    pub fn total_units(&self) -> u64 {
        self.stock + self.reserved
    }

    /// Copy of this product with an adjustment applied and the version bumped,
    /// i.e. the state a committed write leaves behind.
    pub fn with_adjustment(&self, adjustment: StockAdjustment) -> Self {
        Self {
            stock: adjustment.stock,
            reserved: adjustment.reserved,
            version: self.version + 1,
            ..self.clone()
        }
    }
}

impl Record for Product {
    const PARTITION: &'static str = "product";

    fn id(&self) -> &str {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// New counter values for a product.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StockAdjustment {
    pub stock: u64,
    pub reserved: u64,
}

/// Pure stock arithmetic. Never touches the store.
pub struct InventoryLedger;

impl InventoryLedger {
    /// Reserve `delta` units for a cart (release them when negative).
    pub fn compute_stock_adjustment(
        product: &Product,
        delta: i64,
    ) -> Result<StockAdjustment, CartError> {
        let stock = i128::from(product.stock) - i128::from(delta);
        let reserved = i128::from(product.reserved) + i128::from(delta);

        match (u64::try_from(stock), u64::try_from(reserved)) {
            (Ok(stock), Ok(reserved)) => Ok(StockAdjustment { stock, reserved }),
            _ => Err(insufficient(product, delta)),
        }
    }

    /// Add (or write off, when negative) physical units.
    pub fn compute_restock(
        product: &Product,
        delta: i64,
    ) -> Result<StockAdjustment, CartError> {
        let stock = i128::from(product.stock) + i128::from(delta);

        match u64::try_from(stock) {
            Ok(stock) => Ok(StockAdjustment {
                stock,
                reserved: product.reserved,
            }),
            Err(_) => Err(insufficient(product, delta)),
        }
    }
}

fn insufficient(product: &Product, delta: i64) -> CartError {
    CartError::InsufficientStock {
        product_id: product.id.clone(),
        stock: product.stock,
        reserved: product.reserved,
        delta,
    }
}
