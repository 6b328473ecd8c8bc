//! InMemoryRecordStore - BTreeMap-backed record store for testing and development.

use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

use super::{
    document_version, Document, IdempotencyToken, RecordKey, RecordStore, StoreError, Update,
};

/// How long a committed idempotency token is remembered by default.
pub const DEFAULT_TOKEN_TTL: Duration = Duration::from_secs(600);

#[derive(Default)]
struct Tables {
    records: BTreeMap<RecordKey, Document>,
    /// Updates committed under each idempotency token.
    tokens: HashMap<IdempotencyToken, Vec<Update>>,
    /// Commit time of each remembered token, oldest first.
    token_log: VecDeque<(Instant, IdempotencyToken)>,
}

impl Tables {
    fn expire_tokens(&mut self, now: Instant, ttl: Duration) {
        while let Some((committed_at, _)) = self.token_log.front() {
            if now.duration_since(*committed_at) < ttl {
                break;
            }
            if let Some((_, token)) = self.token_log.pop_front() {
                self.tokens.remove(&token);
            }
        }
    }
}

/// In-memory record store.
///
/// Records are ordered by `(partition, sort_key)` so partition queries are
/// range scans. Clone-friendly via Arc; clones share storage.
///
/// Transaction tokens are remembered for [`DEFAULT_TOKEN_TTL`] unless set
/// otherwise with [`InMemoryRecordStore::with_token_ttl`]. After that a
/// resend is treated as a new transaction.
#[derive(Clone)]
pub struct InMemoryRecordStore {
    tables: Arc<RwLock<Tables>>,
    token_ttl: Duration,
}

impl Default for InMemoryRecordStore {
    fn default() -> Self {
        Self {
            tables: Arc::default(),
            token_ttl: DEFAULT_TOKEN_TTL,
        }
    }
}

impl InMemoryRecordStore {
    /// Create a new empty record store.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token_ttl(mut self, ttl: Duration) -> Self {
        self.token_ttl = ttl;
        self
    }

    /// Number of idempotency tokens currently remembered.
    pub fn tracked_tokens(&self) -> Result<usize, StoreError> {
        let tables = self
            .tables
            .read()
            .map_err(|_| StoreError::Storage("lock poisoned".into()))?;
        Ok(tables.tokens.len())
    }

    /// Number of stored records across all partitions.
    pub fn len(&self) -> Result<usize, StoreError> {
        let tables = self
            .tables
            .read()
            .map_err(|_| StoreError::Storage("lock poisoned".into()))?;
        Ok(tables.records.len())
    }

    pub fn is_empty(&self) -> Result<bool, StoreError> {
        Ok(self.len()? == 0)
    }

    fn check_condition(
        records: &BTreeMap<RecordKey, Document>,
        update: &Update,
    ) -> Result<(), StoreError> {
        let stored = records
            .get(&update.key)
            .ok_or_else(|| StoreError::ConditionFailed {
                key: update.key.clone(),
                expected: update.expected_version,
                actual: None,
            })?;

        let actual = document_version(stored);
        if actual != Some(update.expected_version) {
            return Err(StoreError::ConditionFailed {
                key: update.key.clone(),
                expected: update.expected_version,
                actual,
            });
        }
        Ok(())
    }
}

impl RecordStore for InMemoryRecordStore {
    fn get(&self, key: &RecordKey) -> Result<Option<Document>, StoreError> {
        let tables = self
            .tables
            .read()
            .map_err(|_| StoreError::Storage("lock poisoned".into()))?;

        Ok(tables.records.get(key).cloned())
    }

    fn query(
        &self,
        partition: &str,
        sort_key: Option<&str>,
    ) -> Result<Vec<Document>, StoreError> {
        let tables = self
            .tables
            .read()
            .map_err(|_| StoreError::Storage("lock poisoned".into()))?;

        if let Some(sort_key) = sort_key {
            let key = RecordKey::new(partition, sort_key);
            return Ok(tables.records.get(&key).cloned().into_iter().collect());
        }

        let results = tables
            .records
            .range(RecordKey::new(partition, "")..)
            .take_while(|(key, _)| key.partition == partition)
            .map(|(_, document)| document.clone())
            .collect();

        Ok(results)
    }

    fn put(&self, key: &RecordKey, document: Document) -> Result<(), StoreError> {
        let mut tables = self
            .tables
            .write()
            .map_err(|_| StoreError::Storage("lock poisoned".into()))?;

        tables.records.insert(key.clone(), document);
        Ok(())
    }

    fn put_if_absent(&self, key: &RecordKey, document: Document) -> Result<(), StoreError> {
        let mut tables = self
            .tables
            .write()
            .map_err(|_| StoreError::Storage("lock poisoned".into()))?;

        if let Some(existing) = tables.records.get(key) {
            return Err(StoreError::ConditionFailed {
                key: key.clone(),
                expected: 0,
                actual: document_version(existing),
            });
        }

        tables.records.insert(key.clone(), document);
        Ok(())
    }

    fn update(&self, update: Update) -> Result<Document, StoreError> {
        let mut tables = self
            .tables
            .write()
            .map_err(|_| StoreError::Storage("lock poisoned".into()))?;

        let stored = tables
            .records
            .get_mut(&update.key)
            .ok_or_else(|| StoreError::NotFound(update.key.clone()))?;

        let actual = document_version(stored);
        if actual != Some(update.expected_version) {
            return Err(StoreError::ConditionFailed {
                key: update.key.clone(),
                expected: update.expected_version,
                actual,
            });
        }

        update.apply(stored);
        Ok(stored.clone())
    }

    fn transact_write(
        &self,
        updates: Vec<Update>,
        token: &IdempotencyToken,
    ) -> Result<(), StoreError> {
        {
            let mut seen = HashSet::new();
            for update in &updates {
                if !seen.insert(&update.key) {
                    return Err(StoreError::InvalidTransaction(format!(
                        "more than one operation on {}",
                        update.key
                    )));
                }
            }
        }

        let mut tables = self
            .tables
            .write()
            .map_err(|_| StoreError::Storage("lock poisoned".into()))?;

        let now = Instant::now();
        tables.expire_tokens(now, self.token_ttl);

        // A resend of an already committed transaction succeeds without re-applying.
        if let Some(committed) = tables.tokens.get(token) {
            if *committed == updates {
                return Ok(());
            }
            return Err(StoreError::TokenReuse(token.to_string()));
        }

        for update in &updates {
            Self::check_condition(&tables.records, update)?;
        }

        for update in &updates {
            if let Some(stored) = tables.records.get_mut(&update.key) {
                update.apply(stored);
            }
        }

        tables.tokens.insert(token.clone(), updates);
        tables.token_log.push_back((now, token.clone()));
        Ok(())
    }
}
