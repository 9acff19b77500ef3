//! Bucketed word store.
//!
//! The ingestion pipeline only needs to create buckets and insert words into
//! them; reads exist for reporting and verification. [`LmdbWordStore`] is the
//! persistent implementation and [`MemoryWordStore`] backs tests.
//!
//! [`LmdbWordStore`]: crate::lmdb_store::LmdbWordStore

use std::collections::{BTreeMap, BTreeSet};

use parking_lot::RwLock;

use crate::error::{StoreError, StoreResult};
use crate::partition::PartitionKey;

/// Handle to a bucket returned by [`WordStore::ensure_bucket`].
pub trait BucketHandle: Clone + Send + Sync {
    /// Partition key of the bucket.
    fn key(&self) -> PartitionKey;
}

/// Storage backend for length-partitioned word sets.
///
/// All methods may be called concurrently from many threads.
pub trait WordStore: Send + Sync {
    /// Bucket handle type.
    type Bucket: BucketHandle;

    /// Creates the bucket for `key` if absent and returns a handle to it.
    fn ensure_bucket(&self, key: PartitionKey) -> StoreResult<Self::Bucket>;

    /// Inserts `word` with an empty value. Inserting an existing word is a no-op.
    ///
    /// Returns once the write is durable.
    fn put_if_new(&self, bucket: &Self::Bucket, word: &[u8]) -> StoreResult<()>;

    /// Value stored for `word`, `None` if the word or the bucket is absent.
    fn get(&self, key: PartitionKey, word: &[u8]) -> StoreResult<Option<Vec<u8>>>;

    /// Returns true if `word` is a member of the bucket for `key`.
    fn contains(&self, key: PartitionKey, word: &[u8]) -> StoreResult<bool> {
        Ok(self.get(key, word)?.is_some())
    }

    /// All existing buckets in key order.
    fn buckets(&self) -> StoreResult<Vec<PartitionKey>>;

    /// Words of one bucket in byte order. Empty if the bucket is absent.
    fn words(&self, key: PartitionKey) -> StoreResult<Vec<Vec<u8>>>;

    /// Number of words in one bucket.
    fn bucket_len(&self, key: PartitionKey) -> StoreResult<usize> {
        Ok(self.words(key)?.len())
    }
}

/// Bucket handle for [`MemoryWordStore`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryBucket(PartitionKey);

impl BucketHandle for MemoryBucket {
    fn key(&self) -> PartitionKey {
        self.0
    }
}

/// In-memory word store backed by a BTreeMap. Thread-safe via RwLock.
///
/// Does not persist anything; used by tests and dry runs.
#[derive(Default)]
pub struct MemoryWordStore {
    data: RwLock<BTreeMap<PartitionKey, BTreeSet<Vec<u8>>>>,
}

impl MemoryWordStore {
    /// Creates a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl WordStore for MemoryWordStore {
    type Bucket = MemoryBucket;

    fn ensure_bucket(&self, key: PartitionKey) -> StoreResult<MemoryBucket> {
        if !self.data.read().contains_key(&key) {
            self.data.write().entry(key).or_default();
        }
        Ok(MemoryBucket(key))
    }

    fn put_if_new(&self, bucket: &MemoryBucket, word: &[u8]) -> StoreResult<()> {
        if word.is_empty() {
            return Err(StoreError::EmptyWord);
        }
        let mut data = self.data.write();
        let set = data.entry(bucket.0).or_default();
        if !set.contains(word) {
            set.insert(word.to_vec());
        }
        Ok(())
    }

    fn get(&self, key: PartitionKey, word: &[u8]) -> StoreResult<Option<Vec<u8>>> {
        let data = self.data.read();
        Ok(data
            .get(&key)
            .filter(|set| set.contains(word))
            .map(|_| Vec::new()))
    }

    fn buckets(&self) -> StoreResult<Vec<PartitionKey>> {
        Ok(self.data.read().keys().copied().collect())
    }

    fn words(&self, key: PartitionKey) -> StoreResult<Vec<Vec<u8>>> {
        let data = self.data.read();
        Ok(data
            .get(&key)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default())
    }

    fn bucket_len(&self, key: PartitionKey) -> StoreResult<usize> {
        Ok(self.data.read().get(&key).map_or(0, BTreeSet::len))
    }
}
