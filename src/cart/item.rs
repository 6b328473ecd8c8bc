use serde::{Deserialize, Serialize};

/// An opaque monetary value in minor units.
///
/// Carts carry prices through unchanged; nothing in this crate does
/// arithmetic on them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Money {
    pub amount: i64,
    pub currency: String,
}

impl Money {
    pub fn new(amount: i64, currency: impl Into<String>) -> Self {
        Self {
            amount,
            currency: currency.into(),
        }
    }
}

/// A cart line for one product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    /// Product id.
    pub id: String,
    #[serde(default)]
    pub short_description: String,
    pub quantity: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit_price_vat_exc: Option<Money>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vat: Option<Money>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit_price_vat_inc: Option<Money>,
}

impl Item {
    pub fn new(id: impl Into<String>, quantity: u8) -> Self {
        Self {
            id: id.into(),
            short_description: String::new(),
            quantity,
            unit_price_vat_exc: None,
            vat: None,
            unit_price_vat_inc: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.short_description = description.into();
        self
    }

    pub fn with_prices(mut self, vat_exc: Money, vat: Money, vat_inc: Money) -> Self {
        self.unit_price_vat_exc = Some(vat_exc);
        self.vat = Some(vat);
        self.unit_price_vat_inc = Some(vat_inc);
        self
    }
}
