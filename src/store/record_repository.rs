//! RecordRepository - Typed accessor over a RecordStore.

use std::marker::PhantomData;

use super::{from_document, to_document, Record, RecordKey, RecordStore, StoreError};

/// Typed repository wrapper for accessing records of a specific type.
pub struct RecordRepository<'a, S, R> {
    store: &'a S,
    _marker: PhantomData<R>,
}

impl<'a, S: RecordStore, R: Record> RecordRepository<'a, S, R> {
    pub fn new(store: &'a S) -> Self {
        Self {
            store,
            _marker: PhantomData,
        }
    }

    /// Point read by id.
    pub fn get(&self, id: &str) -> Result<Option<R>, StoreError> {
        self.store
            .get(&RecordKey::new(R::PARTITION, id))?
            .map(from_document)
            .transpose()
    }

    /// Every stored record with this id.
    ///
    /// A healthy store returns at most one; callers treat more as corruption.
    pub fn query_exact(&self, id: &str) -> Result<Vec<R>, StoreError> {
        self.store
            .query(R::PARTITION, Some(id))?
            .into_iter()
            .map(from_document)
            .collect()
    }

    /// Every record in the partition.
    pub fn all(&self) -> Result<Vec<R>, StoreError> {
        self.store
            .query(R::PARTITION, None)?
            .into_iter()
            .map(from_document)
            .collect()
    }

    /// Upsert a record (no version check).
    pub fn put(&self, record: &R) -> Result<(), StoreError> {
        self.store.put(&record.key(), to_document(record)?)
    }

    /// Insert a record. Fails with `ConditionFailed` if it already exists.
    pub fn insert(&self, record: &R) -> Result<(), StoreError> {
        self.store.put_if_absent(&record.key(), to_document(record)?)
    }
}

/// Extension trait for typed record access on any RecordStore.
pub trait RecordsExt: RecordStore + Sized {
    /// Get a typed record repository.
    fn records<R: Record>(&self) -> RecordRepository<'_, Self, R> {
        RecordRepository::new(self)
    }
}

impl<S: RecordStore> RecordsExt for S {}
