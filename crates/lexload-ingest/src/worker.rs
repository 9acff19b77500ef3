//! Worker pool: classifies and stores words pulled from the work channel.
//!
//! Workers are started before any input is read and run until the channel
//! is closed and drained. A store failure is fatal to the run: the first one
//! is kept in a [`FailFast`] slot, the producer stops, and the remaining
//! queued words are released without being written.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam_channel::Receiver;
use lexload_store::{classify, StoreResult, Word, WordStore};
use parking_lot::Mutex;
use tracing::{debug, error};

use crate::error::{IngestError, IngestResult};
use crate::tracker::CompletionTicket;

/// One word in flight, with the ticket that accounts for it.
pub struct WorkItem {
    word: Word,
    _ticket: CompletionTicket,
}

impl WorkItem {
    /// Pairs a word with its completion ticket.
    pub fn new(word: Word, ticket: CompletionTicket) -> Self {
        Self {
            word,
            _ticket: ticket,
        }
    }

    /// The word to store.
    pub fn word(&self) -> &Word {
        &self.word
    }
}

/// Holds the first fatal error raised by any worker.
#[derive(Default)]
pub struct FailFast {
    tripped: AtomicBool,
    first: Mutex<Option<IngestError>>,
}

impl FailFast {
    /// Records `err` unless an earlier failure is already recorded.
    pub fn trip(&self, err: IngestError) {
        let mut first = self.first.lock();
        if first.is_none() {
            *first = Some(err);
        }
        self.tripped.store(true, Ordering::Release);
    }

    /// Returns true once any failure has been recorded.
    pub fn is_tripped(&self) -> bool {
        self.tripped.load(Ordering::Acquire)
    }

    /// Removes and returns the first recorded failure.
    pub fn take(&self) -> Option<IngestError> {
        self.first.lock().take()
    }
}

/// What one worker did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkerStats {
    /// Index of the worker.
    pub worker: usize,
    /// Words written.
    pub stored: u64,
    /// Words released unwritten after a failure.
    pub skipped: u64,
}

/// Fixed set of worker threads sharing one work channel.
pub struct WorkerPool {
    handles: Vec<JoinHandle<WorkerStats>>,
}

impl WorkerPool {
    /// Spawns `workers` threads draining `queue` into `store`.
    pub fn start<S>(
        workers: usize,
        store: Arc<S>,
        queue: Receiver<WorkItem>,
        fail: Arc<FailFast>,
    ) -> IngestResult<Self>
    where
        S: WordStore + 'static,
    {
        let mut handles = Vec::with_capacity(workers);
        for id in 0..workers {
            let store = Arc::clone(&store);
            let queue = queue.clone();
            let fail = Arc::clone(&fail);
            let handle = thread::Builder::new()
                .name(format!("lexload-worker-{}", id))
                .spawn(move || run_worker(id, &*store, queue, &fail))
                .map_err(IngestError::Spawn)?;
            handles.push(handle);
        }
        debug!("Started {} workers", workers);
        Ok(Self { handles })
    }

    /// Number of workers.
    pub fn len(&self) -> usize {
        self.handles.len()
    }

    /// Returns true if the pool has no workers.
    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Waits for every worker to exit. Call after the channel is closed.
    pub fn join(self) -> IngestResult<Vec<WorkerStats>> {
        let mut stats = Vec::with_capacity(self.handles.len());
        for (worker, handle) in self.handles.into_iter().enumerate() {
            let worker_stats = handle
                .join()
                .map_err(|_| IngestError::WorkerPanicked { worker })?;
            stats.push(worker_stats);
        }
        Ok(stats)
    }
}

fn run_worker<S: WordStore>(
    id: usize,
    store: &S,
    queue: Receiver<WorkItem>,
    fail: &FailFast,
) -> WorkerStats {
    let mut stats = WorkerStats {
        worker: id,
        ..WorkerStats::default()
    };

    // The item, and with it the ticket, is dropped at the end of each
    // iteration, after the write has returned.
    for item in queue.iter() {
        if fail.is_tripped() {
            stats.skipped += 1;
            continue;
        }
        match store_word(store, item.word()) {
            Ok(()) => stats.stored += 1,
            Err(source) => {
                error!("Worker {} failed to store `{}`: {}", id, item.word(), source);
                fail.trip(IngestError::Write {
                    word: item.word().to_string(),
                    source,
                });
            }
        }
    }

    debug!(
        "Worker {} exiting: stored={}, skipped={}",
        id, stats.stored, stats.skipped
    );
    stats
}

/// Classify, ensure the bucket, insert.
fn store_word<S: WordStore>(store: &S, word: &Word) -> StoreResult<()> {
    let bucket = store.ensure_bucket(classify(word))?;
    store.put_if_new(&bucket, word.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tracker::CompletionTracker;
    use lexload_store::{MemoryWordStore, PartitionKey};

    fn item(tracker: &Arc<CompletionTracker>, word: &str) -> WorkItem {
        WorkItem::new(Word::new(word).unwrap(), tracker.ticket())
    }

    #[test]
    fn test_fail_fast_keeps_first_error() {
        let fail = FailFast::default();
        assert!(!fail.is_tripped());
        fail.trip(IngestError::InvalidConfig("first".to_string()));
        fail.trip(IngestError::InvalidConfig("second".to_string()));
        assert!(fail.is_tripped());
        assert!(matches!(fail.take(), Some(IngestError::InvalidConfig(msg)) if msg == "first"));
        assert!(fail.take().is_none());
    }

    #[test]
    fn test_pool_stores_every_item() {
        let store = Arc::new(MemoryWordStore::new());
        let tracker = Arc::new(CompletionTracker::new());
        let fail = Arc::new(FailFast::default());
        let (tx, rx) = crossbeam_channel::bounded(4);

        let pool = WorkerPool::start(4, Arc::clone(&store), rx, Arc::clone(&fail)).unwrap();
        assert_eq!(pool.len(), 4);
        for word in ["cat", "dog", "tree", "house", "cat"] {
            tx.send(item(&tracker, word)).unwrap();
        }
        tracker.wait();
        drop(tx);
        let stats = pool.join().unwrap();

        assert_eq!(stats.iter().map(|s| s.stored).sum::<u64>(), 5);
        assert!(!fail.is_tripped());
        assert_eq!(
            store.words(PartitionKey::new(3)).unwrap(),
            vec![b"cat".to_vec(), b"dog".to_vec()]
        );
        assert!(store.contains(PartitionKey::new(4), b"tree").unwrap());
        assert!(store.contains(PartitionKey::new(5), b"house").unwrap());
    }

    #[test]
    fn test_workers_skip_after_failure() {
        let store = Arc::new(MemoryWordStore::new());
        let tracker = Arc::new(CompletionTracker::new());
        let fail = Arc::new(FailFast::default());
        fail.trip(IngestError::WorkersExited);
        let (tx, rx) = crossbeam_channel::bounded(2);

        let pool = WorkerPool::start(2, Arc::clone(&store), rx, Arc::clone(&fail)).unwrap();
        tx.send(item(&tracker, "cat")).unwrap();
        tx.send(item(&tracker, "dog")).unwrap();
        tracker.wait();
        drop(tx);
        let stats = pool.join().unwrap();

        assert_eq!(stats.iter().map(|s| s.skipped).sum::<u64>(), 2);
        assert!(store.buckets().unwrap().is_empty());
    }
}
