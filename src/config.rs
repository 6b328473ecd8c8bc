//! Coordinator configuration.
//!
//! Values are supplied by the embedding application; nothing is read from
//! the environment here.

use crate::occ::RetryPolicy;

/// Configuration for [`CartInventoryCoordinator`](crate::CartInventoryCoordinator).
#[derive(Debug, Clone, PartialEq)]
pub struct CoordinatorConfig {
    /// Currency code given to carts created on first mutation.
    ///
    /// Default: "EUR"
    pub default_currency: String,

    /// Conflict retry policy shared by every mutating operation.
    pub retry: RetryPolicy,
}

impl CoordinatorConfig {
    pub fn new(default_currency: impl Into<String>) -> Self {
        Self {
            default_currency: default_currency.into(),
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_default_currency(mut self, currency: impl Into<String>) -> Self {
        self.default_currency = currency.into();
        self
    }
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self::new("EUR")
    }
}
