//! CartInventoryCoordinator - the only entry point that changes cart and
//! inventory state.
//!
//! Every mutation is an optimistic read-modify-write: records are read with
//! their versions, changed in memory, and written back with conditional
//! updates gated on those versions. Cart adjustments write the product and
//! the cart in one atomic transaction. A lost race surfaces from the store as
//! a failed condition and the whole operation is rerun from fresh reads, up
//! to the configured retry policy. No locks are held between calls.

use crate::cart::Cart;
use crate::config::CoordinatorConfig;
use crate::error::CartError;
use crate::inventory::{InventoryLedger, Product};
use crate::occ::retry_on_conflict;
use crate::store::{Record, RecordStore, RecordsExt};
use crate::transaction::{product_update, CartTransaction};

pub struct CartInventoryCoordinator<S> {
    store: S,
    config: CoordinatorConfig,
}

impl<S: RecordStore> CartInventoryCoordinator<S> {
    pub fn new(store: S) -> Self {
        Self::with_config(store, CoordinatorConfig::default())
    }

    pub fn with_config(store: S, config: CoordinatorConfig) -> Self {
        Self { store, config }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &CoordinatorConfig {
        &self.config
    }

    /// Add `delta` units of a product to a user's cart (remove when negative),
    /// reserving or releasing the same number of units on the product.
    ///
    /// Creates the cart on first use. Returns the cart as committed.
    pub fn adjust_cart_item(
        &self,
        user_id: &str,
        product_id: &str,
        delta: i64,
    ) -> Result<Cart, CartError> {
        let span = tracing::info_span!("adjust_cart_item", user_id, product_id, delta);
        let _enter = span.enter();

        retry_on_conflict(&self.config.retry, |attempt| {
            self.try_adjust_cart_item(user_id, product_id, delta, attempt)
        })
    }

    fn try_adjust_cart_item(
        &self,
        user_id: &str,
        product_id: &str,
        delta: i64,
        attempt: u32,
    ) -> Result<Cart, CartError> {
        let mut cart = match self.load_cart(user_id)? {
            Some(cart) => cart,
            None => self.create_cart(user_id, attempt)?,
        };
        cart.upsert_item(product_id, delta)?;

        let product = self.get_product(product_id)?;
        let adjustment = InventoryLedger::compute_stock_adjustment(&product, delta)?;

        let token = CartTransaction::new()
            .product(&product, adjustment)?
            .cart(&cart)?
            .commit(&self.store)?;

        cart.version += 1;
        tracing::debug!(
            attempt,
            %token,
            cart_version = cart.version,
            product_version = product.version + 1,
            stock = adjustment.stock,
            reserved = adjustment.reserved,
            "cart adjustment committed"
        );
        Ok(cart)
    }

    /// Current cart of a user.
    pub fn get_cart(&self, user_id: &str) -> Result<Cart, CartError> {
        self.load_cart(user_id)?
            .ok_or_else(|| CartError::not_found(Cart::PARTITION, user_id))
    }

    /// Current inventory record of a product.
    pub fn get_product(&self, product_id: &str) -> Result<Product, CartError> {
        self.store
            .records::<Product>()
            .get(product_id)?
            .ok_or_else(|| CartError::not_found(Product::PARTITION, product_id))
    }

    /// Receive (or write off, when negative) physical units of a product.
    ///
    /// Reserved units are untouched. Returns the product as committed.
    pub fn adjust_inventory(&self, product_id: &str, delta: i64) -> Result<Product, CartError> {
        let span = tracing::info_span!("adjust_inventory", product_id, delta);
        let _enter = span.enter();

        retry_on_conflict(&self.config.retry, |attempt| -> Result<Product, CartError> {
            let product = self.get_product(product_id)?;
            let adjustment = InventoryLedger::compute_restock(&product, delta)?;
            self.store.update(product_update(&product, adjustment)?)?;

            tracing::debug!(attempt, stock = adjustment.stock, "inventory adjusted");
            Ok(product.with_adjustment(adjustment))
        })
    }

    /// Add a product to the inventory. Fails with `Conflict` if it exists.
    ///
    /// The stored product always starts at version 1.
    pub fn register_product(&self, product: Product) -> Result<Product, CartError> {
        let product = Product {
            version: 1,
            ..product
        };
        self.store.records::<Product>().insert(&product)?;
        tracing::info!(product_id = %product.id, stock = product.stock, "product registered");
        Ok(product)
    }

    /// Persist an empty cart at version 1. Losing a creation race to another
    /// request surfaces as `Conflict`, so the attempt is rerun and reads
    /// the winner's cart.
    fn create_cart(&self, user_id: &str, attempt: u32) -> Result<Cart, CartError> {
        let cart = Cart::new(user_id, self.config.default_currency.as_str());
        self.store.records::<Cart>().insert(&cart)?;
        tracing::debug!(attempt, "created cart");
        Ok(cart)
    }

    fn load_cart(&self, user_id: &str) -> Result<Option<Cart>, CartError> {
        let mut carts = self.store.records::<Cart>().query_exact(user_id)?;
        if carts.len() > 1 {
            tracing::error!(user_id, count = carts.len(), "multiple carts stored for one user");
            return Err(CartError::Integrity(format!(
                "{} carts stored for user {}",
                carts.len(),
                user_id
            )));
        }
        Ok(carts.pop())
    }
}
