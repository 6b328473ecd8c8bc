//! CartTransaction - Chain the conditional writes of one cart adjustment into
//! a single atomic commit.
//!
//! ## Example
//!
//! ```ignore
//! CartTransaction::new()
//!     .product(&product, adjustment)?
//!     .cart(&cart)?
//!     .commit(&store)?;
//! ```

use crate::cart::Cart;
use crate::inventory::{Product, StockAdjustment};
use crate::store::{IdempotencyToken, Record, RecordStore, StoreError, Update, VERSION_FIELD};

/// Conditional update moving a product to new counter values.
///
/// Gated on the version the product was read at; writes `version + 1`.
pub fn product_update(
    product: &Product,
    adjustment: StockAdjustment,
) -> Result<Update, StoreError> {
    Update::new(product.key(), product.version)
        .set("stock", adjustment.stock)?
        .set("reserved", adjustment.reserved)?
        .set(VERSION_FIELD, product.version + 1)
}

/// Conditional update replacing a cart's items.
///
/// Gated on the version the cart was read at; writes `version + 1`.
pub fn cart_update(cart: &Cart) -> Result<Update, StoreError> {
    Update::new(cart.key(), cart.version)
        .set("items", &cart.items)?
        .set(VERSION_FIELD, cart.version + 1)
}

/// Builder for an all-or-nothing write across a product and a cart.
#[derive(Debug, Default)]
pub struct CartTransaction {
    updates: Vec<Update>,
}

impl CartTransaction {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add the product's stock/reserved update.
    pub fn product(
        mut self,
        product: &Product,
        adjustment: StockAdjustment,
    ) -> Result<Self, StoreError> {
        self.updates.push(product_update(product, adjustment)?);
        Ok(self)
    }

    /// Add the cart's items update.
    pub fn cart(mut self, cart: &Cart) -> Result<Self, StoreError> {
        self.updates.push(cart_update(cart)?);
        Ok(self)
    }

    pub fn updates(&self) -> &[Update] {
        &self.updates
    }

    /// Commit under a freshly generated idempotency token.
    pub fn commit<S: RecordStore + ?Sized>(
        self,
        store: &S,
    ) -> Result<IdempotencyToken, StoreError> {
        let token = IdempotencyToken::generate();
        self.commit_with_token(store, &token)?;
        Ok(token)
    }

    /// Commit under a caller-chosen token. Resending the same transaction
    /// with the same token does not apply it twice.
    pub fn commit_with_token<S: RecordStore + ?Sized>(
        self,
        store: &S,
        token: &IdempotencyToken,
    ) -> Result<(), StoreError> {
        store.transact_write(self.updates, token)
    }
}
