//! Record store - the versioned document storage the cart engine runs against.
//!
//! Records live in a single keyspace addressed by `(partition, sort_key)`,
//! the layout of a single-table document store. Every record carries a
//! `version` field that serves as its optimistic concurrency token: writers
//! read a record, compute new field values, and submit an [`Update`] that only
//! applies if the stored version still matches what they read.
//!
//! ## Example
//!
//! ```ignore
//! use cart_ledger::{InMemoryRecordStore, RecordsExt, Product};
//!
//! let store = InMemoryRecordStore::new();
//! store.records::<Product>().put(&Product::new("sku-1", "Socks", 10))?;
//! let loaded = store.records::<Product>().get("sku-1")?;
//! ```

mod in_memory;
mod record_repository;

use serde::{de::DeserializeOwned, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// A stored document: a JSON object.
pub type Document = Map<String, Value>;

/// Name of the field every record uses as its optimistic concurrency token.
pub const VERSION_FIELD: &str = "version";

/// Trait for types that are persisted in the record store.
pub trait Record: Serialize + DeserializeOwned + Clone + Send + Sync {
    /// Partition holding every record of this type (e.g. "product", "cart").
    const PARTITION: &'static str;

    /// Sort key of this record inside its partition.
    fn id(&self) -> &str;

    /// Version observed when the record was read.
    fn version(&self) -> u64;

    /// Full store key of this record.
    fn key(&self) -> RecordKey {
        RecordKey::new(Self::PARTITION, self.id())
    }
}

/// Primary key of a stored record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RecordKey {
    pub partition: String,
    pub sort_key: String,
}

impl RecordKey {
    pub fn new(partition: impl Into<String>, sort_key: impl Into<String>) -> Self {
        Self {
            partition: partition.into(),
            sort_key: sort_key.into(),
        }
    }
}

impl fmt::Display for RecordKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.partition, self.sort_key)
    }
}

/// A conditional write against a single record.
///
/// Applies its field setters only if the stored `version` equals
/// `expected_version`. Setters do not touch `version` implicitly; callers set
/// the next version themselves.
#[derive(Debug, Clone, PartialEq)]
pub struct Update {
    pub key: RecordKey,
    pub expected_version: u64,
    pub setters: Vec<(String, Value)>,
}

impl Update {
    pub fn new(key: RecordKey, expected_version: u64) -> Self {
        Self {
            key,
            expected_version,
            setters: Vec::new(),
        }
    }

    /// Set a field to a serializable value.
    pub fn set<V: Serialize>(self, field: &str, value: V) -> Result<Self, StoreError> {
        let value = serde_json::to_value(value)?;
        Ok(self.set_value(field, value))
    }

    /// Set a field to an already-encoded value.
    pub fn set_value(mut self, field: &str, value: Value) -> Self {
        self.setters.push((field.to_string(), value));
        self
    }

    /// Apply the setters to a document in place.
    pub(crate) fn apply(&self, document: &mut Document) {
        for (field, value) in &self.setters {
            document.insert(field.clone(), value.clone());
        }
    }
}

/// Client-supplied token that makes a transaction safe to resend.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct IdempotencyToken(String);

impl IdempotencyToken {
    /// Generate a fresh random token.
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for IdempotencyToken {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl fmt::Display for IdempotencyToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Error type for record store operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// A version condition did not hold.
    #[error("condition failed on {key} (expected version {expected}, actual {actual:?})")]
    ConditionFailed {
        key: RecordKey,
        expected: u64,
        /// Stored version, or `None` when the record is absent.
        actual: Option<u64>,
    },
    /// The record addressed by an update does not exist.
    #[error("record not found: {0}")]
    NotFound(RecordKey),
    /// An idempotency token was reused for a different set of updates.
    #[error("idempotency token {0} reused with different parameters")]
    TokenReuse(String),
    /// The transaction request itself is malformed.
    #[error("invalid transaction: {0}")]
    InvalidTransaction(String),
    /// Serialization/deserialization error.
    #[error("record serialization error: {0}")]
    Serde(String),
    /// Storage-level error.
    #[error("record storage error: {0}")]
    Storage(String),
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Serde(err.to_string())
    }
}

/// Abstract versioned document storage.
///
/// Every method is a single bounded round trip. Implementations must make
/// each call atomic with respect to every other call.
pub trait RecordStore: Send + Sync {
    /// Point read by key. Returns None if not found.
    fn get(&self, key: &RecordKey) -> Result<Option<Document>, StoreError>;

    /// All records of a partition, optionally narrowed to one sort key.
    fn query(&self, partition: &str, sort_key: Option<&str>)
        -> Result<Vec<Document>, StoreError>;

    /// Upsert a document (insert or replace, no version check).
    fn put(&self, key: &RecordKey, document: Document) -> Result<(), StoreError>;

    /// Insert a document. Fails with `ConditionFailed` if the key exists.
    fn put_if_absent(&self, key: &RecordKey, document: Document) -> Result<(), StoreError>;

    /// Conditional single-record update. Returns the stored document after
    /// the update.
    fn update(&self, update: Update) -> Result<Document, StoreError>;

    /// Apply every update or none of them.
    fn transact_write(
        &self,
        updates: Vec<Update>,
        token: &IdempotencyToken,
    ) -> Result<(), StoreError>;
}

/// Read the version token out of a stored document.
pub fn document_version(document: &Document) -> Option<u64> {
    document.get(VERSION_FIELD).and_then(Value::as_u64)
}

/// Encode a record as a store document.
pub fn to_document<R: Record>(record: &R) -> Result<Document, StoreError> {
    match serde_json::to_value(record)? {
        Value::Object(document) => Ok(document),
        other => Err(StoreError::Serde(format!(
            "record in {} did not encode to an object: {}",
            R::PARTITION,
            other
        ))),
    }
}

/// Decode a store document into a record.
pub fn from_document<R: Record>(document: Document) -> Result<R, StoreError> {
    Ok(serde_json::from_value(Value::Object(document))?)
}

pub use in_memory::{InMemoryRecordStore, DEFAULT_TOKEN_TTL};
pub use record_repository::{RecordRepository, RecordsExt};
