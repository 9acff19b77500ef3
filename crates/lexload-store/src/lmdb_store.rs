//! LMDB-backed word store.
//!
//! The whole store is one LMDB data file (`NO_SUB_DIR`) plus LMDB's
//! `<path>-lock` file. Each length bucket is a named database. Commits are
//! synchronous, so a write that has returned is on disk.

use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use lmdb::{Cursor, Database, DatabaseFlags, Environment, EnvironmentFlags, Transaction, WriteFlags};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::batch::{BatchConfig, BatchSink, BatchStatsSnapshot, Batcher, PendingPut};
use crate::error::{StoreError, StoreResult};
use crate::kvstore::{BucketHandle, WordStore};
use crate::partition::PartitionKey;

/// Largest key LMDB accepts with its default page size.
pub const MAX_KEY_SIZE: usize = 511;

/// Configuration for the LMDB environment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Maximum size of the memory map (and of the data file), in bytes.
    pub map_size: usize,
    /// Maximum number of buckets (named databases).
    pub max_buckets: u32,
    /// Write batching settings.
    pub batch: BatchConfig,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            map_size: 1 << 30, // 1GB
            max_buckets: MAX_KEY_SIZE as u32,
            batch: BatchConfig::default(),
        }
    }
}

/// Handle to one length bucket.
#[derive(Debug, Clone, Copy)]
pub struct LmdbBucket {
    key: PartitionKey,
    db: Database,
}

impl BucketHandle for LmdbBucket {
    fn key(&self) -> PartitionKey {
        self.key
    }
}

/// Commits batched inserts in one LMDB write transaction.
struct LmdbSink {
    env: Arc<Environment>,
}

impl BatchSink for LmdbSink {
    type Target = Database;

    fn commit(&self, puts: &[PendingPut<Database>]) -> StoreResult<()> {
        let mut txn = self
            .env
            .begin_rw_txn()
            .map_err(|e| StoreError::lmdb("begin_rw_txn", e))?;
        for put in puts {
            // Dropping the transaction on error aborts the whole batch.
            match txn.put(put.target, &put.word, b"", WriteFlags::NO_OVERWRITE) {
                Ok(()) | Err(lmdb::Error::KeyExist) => {}
                Err(e) => return Err(StoreError::lmdb("put", e)),
            }
        }
        txn.commit().map_err(|e| StoreError::lmdb("commit", e))
    }
}

/// Word store persisted in a single LMDB file.
pub struct LmdbWordStore {
    path: PathBuf,
    env: Arc<Environment>,
    buckets: RwLock<HashMap<PartitionKey, Database>>,
    batcher: Batcher<LmdbSink>,
}

impl fmt::Debug for LmdbWordStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LmdbWordStore")
            .field("path", &self.path)
            .field("buckets", &self.buckets.read().len())
            .finish_non_exhaustive()
    }
}

impl LmdbWordStore {
    /// Opens the store at `path`, creating the file if it does not exist.
    pub fn open(path: &Path, config: &StoreConfig) -> StoreResult<Self> {
        let mut env_builder = Environment::new();
        env_builder.set_flags(EnvironmentFlags::NO_SUB_DIR);
        env_builder.set_max_dbs(config.max_buckets);
        env_builder.set_map_size(config.map_size);

        let env = env_builder
            .open_with_permissions(path, 0o600)
            .map_err(|e| StoreError::lmdb("open", e))?;
        let env = Arc::new(env);

        let batcher = Batcher::start(
            Arc::new(LmdbSink {
                env: Arc::clone(&env),
            }),
            config.batch.clone(),
        )?;

        info!(
            "Opened word store {} (map_size={}, max_buckets={})",
            path.display(),
            config.map_size,
            config.max_buckets
        );

        Ok(Self {
            path: path.to_path_buf(),
            env,
            buckets: RwLock::new(HashMap::new()),
            batcher,
        })
    }

    /// Deletes any existing store at `path`, then opens a new empty one.
    pub fn create_fresh(path: &Path, config: &StoreConfig) -> StoreResult<Self> {
        for file in [path.to_path_buf(), Self::lock_path(path)] {
            match fs::remove_file(&file) {
                Ok(()) => info!("Removed previous store file {}", file.display()),
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }
        Self::open(path, config)
    }

    /// Path of the lock file LMDB keeps next to the data file.
    pub fn lock_path(path: &Path) -> PathBuf {
        let mut name = path.as_os_str().to_os_string();
        name.push("-lock");
        PathBuf::from(name)
    }

    /// Path of the data file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Batch commit statistics.
    pub fn batch_stats(&self) -> BatchStatsSnapshot {
        self.batcher.stats()
    }

    /// Looks up an existing bucket without creating it.
    fn existing_bucket(&self, key: PartitionKey) -> StoreResult<Option<Database>> {
        if let Some(db) = self.buckets.read().get(&key) {
            return Ok(Some(*db));
        }
        match self.env.open_db(Some(&key.bucket_name())) {
            Ok(db) => {
                self.buckets.write().insert(key, db);
                Ok(Some(db))
            }
            Err(lmdb::Error::NotFound) => Ok(None),
            Err(e) => Err(StoreError::lmdb("open_db", e)),
        }
    }

    fn collect_keys(&self, db: Database) -> StoreResult<Vec<Vec<u8>>> {
        let txn = self
            .env
            .begin_ro_txn()
            .map_err(|e| StoreError::lmdb("begin_ro_txn", e))?;
        let mut cursor = txn
            .open_ro_cursor(db)
            .map_err(|e| StoreError::lmdb("open_ro_cursor", e))?;
        // MDB_NEXT on an unpositioned cursor starts at the first key and ends
        // cleanly on an empty database.
        let keys = cursor.iter().map(|(key, _)| key.to_vec()).collect();
        Ok(keys)
    }
}

impl WordStore for LmdbWordStore {
    type Bucket = LmdbBucket;

    fn ensure_bucket(&self, key: PartitionKey) -> StoreResult<LmdbBucket> {
        if let Some(db) = self.buckets.read().get(&key) {
            return Ok(LmdbBucket { key, db: *db });
        }

        let mut buckets = self.buckets.write();
        if let Some(db) = buckets.get(&key) {
            return Ok(LmdbBucket { key, db: *db });
        }
        let db = self
            .env
            .create_db(Some(&key.bucket_name()), DatabaseFlags::empty())
            .map_err(|e| StoreError::lmdb("create_db", e))?;
        buckets.insert(key, db);
        debug!("Bucket {} ready ({}-byte words)", key, key.word_len());

        Ok(LmdbBucket { key, db })
    }

    fn put_if_new(&self, bucket: &LmdbBucket, word: &[u8]) -> StoreResult<()> {
        if word.is_empty() {
            return Err(StoreError::EmptyWord);
        }
        if word.len() > MAX_KEY_SIZE {
            return Err(StoreError::KeyTooLong {
                len: word.len(),
                limit: MAX_KEY_SIZE,
            });
        }
        self.batcher.submit(bucket.db, word)
    }

    fn get(&self, key: PartitionKey, word: &[u8]) -> StoreResult<Option<Vec<u8>>> {
        if word.is_empty() || word.len() > MAX_KEY_SIZE {
            return Ok(None);
        }
        let Some(db) = self.existing_bucket(key)? else {
            return Ok(None);
        };
        let txn = self
            .env
            .begin_ro_txn()
            .map_err(|e| StoreError::lmdb("begin_ro_txn", e))?;
        let value = match txn.get(db, &word) {
            Ok(bytes) => Some(bytes.to_vec()),
            Err(lmdb::Error::NotFound) => None,
            Err(e) => return Err(StoreError::lmdb("get", e)),
        };
        Ok(value)
    }

    fn buckets(&self) -> StoreResult<Vec<PartitionKey>> {
        let main = self
            .env
            .open_db(None)
            .map_err(|e| StoreError::lmdb("open_db", e))?;
        let mut keys = self
            .collect_keys(main)?
            .into_iter()
            .map(|name| PartitionKey::from_bucket_name(&String::from_utf8_lossy(&name)))
            .collect::<StoreResult<Vec<_>>>()?;
        keys.sort();
        Ok(keys)
    }

    fn words(&self, key: PartitionKey) -> StoreResult<Vec<Vec<u8>>> {
        match self.existing_bucket(key)? {
            Some(db) => self.collect_keys(db),
            None => Ok(Vec::new()),
        }
    }
}
