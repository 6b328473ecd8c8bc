//! Cart aggregate - a user's cart and the pure quantity upsert.

mod item;

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::CartError;
use crate::store::Record;

pub use item::{Item, Money};

/// A user's cart. Keyed by user id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cart {
    pub id: String,
    pub currency_code: String,
    /// Lines keyed by product id. Iteration order is unspecified.
    #[serde(default)]
    pub items: HashMap<String, Item>,
    pub version: u64,
}

impl Cart {
    /// A fresh, empty cart at version 1.
    pub fn new(id: impl Into<String>, currency_code: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            currency_code: currency_code.into(),
            items: HashMap::new(),
            version: 1,
        }
    }

    pub fn item(&self, product_id: &str) -> Option<&Item> {
        self.items.get(product_id)
    }

    pub fn items(&self) -> impl Iterator<Item = &Item> {
        self.items.values()
    }

    /// Quantity held for a product, 0 if absent.
    pub fn quantity_of(&self, product_id: &str) -> u8 {
        self.items.get(product_id).map(|i| i.quantity).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Sum of quantities across all lines.
    pub fn total_units(&self) -> u64 {
        self.items.values().map(|i| u64::from(i.quantity)).sum()
    }

    /// Add `delta` units of a product (remove when negative).
    ///
    /// Lines reaching zero are removed. On error the cart is left untouched.
    pub fn upsert_item(&mut self, product_id: &str, delta: i64) -> Result<(), CartError> {
        let Some(current) = self.items.get(product_id).map(|i| i.quantity) else {
            if delta <= 0 {
                return Err(CartError::invalid_quantity(
                    product_id,
                    format!("item not in cart, cannot apply delta {}", delta),
                ));
            }
            let quantity = to_quantity(product_id, delta)?;
            self.items
                .insert(product_id.to_string(), Item::new(product_id, quantity));
            return Ok(());
        };

        let new_quantity = i64::from(current) + delta;
        if new_quantity < 0 {
            return Err(CartError::invalid_quantity(
                product_id,
                format!("resulting quantity {} is negative", new_quantity),
            ));
        }
        if new_quantity == 0 {
            self.items.remove(product_id);
            return Ok(());
        }

        let quantity = to_quantity(product_id, new_quantity)?;
        if let Some(item) = self.items.get_mut(product_id) {
            item.quantity = quantity;
        }
        Ok(())
    }
}

fn to_quantity(product_id: &str, value: i64) -> Result<u8, CartError> {
    u8::try_from(value).map_err(|_| {
        CartError::invalid_quantity(product_id, format!("quantity {} exceeds {}", value, u8::MAX))
    })
}

impl Record for Cart {
    const PARTITION: &'static str = "cart";

    fn id(&self) -> &str {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}
