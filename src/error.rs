use crate::store::StoreError;

/// Failures surfaced by cart and inventory operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CartError {
    /// The requested delta breaks a cart quantity rule.
    #[error("invalid quantity for item {product_id}: {reason}")]
    InvalidQuantity { product_id: String, reason: String },
    /// The adjustment would drive stock or reserved units negative.
    #[error("insufficient stock for product {product_id} (stock {stock}, reserved {reserved}, delta {delta})")]
    InsufficientStock {
        product_id: String,
        stock: u64,
        reserved: u64,
        delta: i64,
    },
    /// The referenced record does not exist.
    #[error("{collection} not found: {id}")]
    NotFound { collection: String, id: String },
    /// A concurrent writer changed a record between read and commit.
    #[error("concurrent modification: {0}")]
    Conflict(String),
    /// The store returned data violating a uniqueness guarantee.
    #[error("integrity error: {0}")]
    Integrity(String),
    /// The store failed or returned something unexpected.
    #[error("storage failure: {0}")]
    Storage(String),
}

impl CartError {
    pub(crate) fn invalid_quantity(product_id: &str, reason: impl Into<String>) -> Self {
        CartError::InvalidQuantity {
            product_id: product_id.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn not_found(collection: &str, id: &str) -> Self {
        CartError::NotFound {
            collection: collection.to_string(),
            id: id.to_string(),
        }
    }

    /// Whether rerunning the whole read-modify-write may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, CartError::Conflict(_))
    }
}

impl From<StoreError> for CartError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::ConditionFailed { .. } => CartError::Conflict(err.to_string()),
            StoreError::NotFound(key) => CartError::not_found(&key.partition, &key.sort_key),
            other => CartError::Storage(other.to_string()),
        }
    }
}
