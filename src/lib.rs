mod cart;
mod config;
mod coordinator;
mod error;
mod inventory;
pub mod occ;
pub mod store;
pub mod transaction;

pub use cart::{Cart, Item, Money};
pub use config::CoordinatorConfig;
pub use coordinator::CartInventoryCoordinator;
pub use error::CartError;
pub use inventory::{InventoryLedger, Product, StockAdjustment};
pub use occ::{retry_on_conflict, Retryable, RetryPolicy, RetryPolicyBuilder};
pub use store::{
    Document, IdempotencyToken, InMemoryRecordStore, Record, RecordKey, RecordRepository,
    RecordStore, RecordsExt, StoreError, Update,
};
pub use transaction::CartTransaction;
