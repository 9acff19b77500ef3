#![warn(missing_docs)]

//! lexload store subsystem: LMDB word buckets partitioned by word length
//!
//! Words are kept as presence-only keys, one bucket per word length. The
//! LMDB-backed store coalesces concurrent inserts into shared write
//! transactions while each caller still sees a synchronous, durable insert.

pub mod batch;
pub mod error;
pub mod kvstore;
pub mod lmdb_store;
pub mod partition;

pub use batch::{BatchConfig, BatchSink, BatchStatsSnapshot, Batcher, PendingPut};
pub use error::{StoreError, StoreResult};
pub use kvstore::{BucketHandle, MemoryBucket, MemoryWordStore, WordStore};
pub use lmdb_store::{LmdbBucket, LmdbWordStore, StoreConfig, MAX_KEY_SIZE};
pub use partition::{classify, PartitionKey, Word};
