//! Automatic write batching.
//!
//! Concurrent `put_if_new` calls are handed to a single committer thread that
//! coalesces them into one write transaction. A caller blocks until the
//! transaction holding its write has committed, so batching is invisible
//! except for throughput. A batch closes when it reaches `max_batch_size`
//! writes or when `max_batch_delay_ms` has passed since its first write.
//!
//! If a coalesced transaction fails, every write in it is retried in a
//! transaction of its own so the failure reaches only the caller that caused
//! it.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, Sender};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, warn};

use crate::error::{StoreError, StoreResult};

/// Configuration for batch collection behavior.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    /// Maximum number of writes per transaction.
    pub max_batch_size: usize,
    /// How long the first write of a batch waits for company, in milliseconds.
    pub max_batch_delay_ms: u64,
    /// Whether batching is enabled. When disabled every write commits alone.
    pub enabled: bool,
}

impl Default for BatchConfig {
    fn default() -> Self {
        BatchConfig {
            max_batch_size: 1000,
            max_batch_delay_ms: 10,
            enabled: true,
        }
    }
}

impl BatchConfig {
    /// Linger time as a `Duration`.
    pub fn max_batch_delay(&self) -> Duration {
        Duration::from_millis(self.max_batch_delay_ms)
    }

    /// Caps the batch size at the number of concurrent writers.
    ///
    /// Each writer has at most one write outstanding, so a batch can never
    /// hold more writes than there are writers. Capping lets a batch close
    /// as soon as every writer has joined it instead of waiting out the delay.
    pub fn capped_for(&self, writers: usize) -> Self {
        BatchConfig {
            max_batch_size: self.max_batch_size.min(writers.max(1)),
            ..self.clone()
        }
    }
}

/// One queued insert.
#[derive(Debug, Clone)]
pub struct PendingPut<T> {
    /// Where the word goes, e.g. an LMDB database handle.
    pub target: T,
    /// The word to insert.
    pub word: Vec<u8>,
}

/// Applies a group of inserts in a single transaction.
pub trait BatchSink: Send + Sync + 'static {
    /// Destination handle carried by each insert.
    type Target: Copy + Send + 'static;

    /// Commits all `puts` atomically. Returns once durable.
    fn commit(&self, puts: &[PendingPut<Self::Target>]) -> StoreResult<()>;
}

/// Statistics for batch commits.
#[derive(Default)]
pub struct BatchStats {
    batches_committed: AtomicU64,
    puts_committed: AtomicU64,
    solo_retries: AtomicU64,
    largest_batch: AtomicU64,
}

impl BatchStats {
    /// Get a snapshot of current statistics.
    pub fn snapshot(&self) -> BatchStatsSnapshot {
        BatchStatsSnapshot {
            batches_committed: self.batches_committed.load(Ordering::Relaxed),
            puts_committed: self.puts_committed.load(Ordering::Relaxed),
            solo_retries: self.solo_retries.load(Ordering::Relaxed),
            largest_batch: self.largest_batch.load(Ordering::Relaxed),
        }
    }

    fn record_batch(&self, put_count: u64) {
        self.batches_committed.fetch_add(1, Ordering::Relaxed);
        self.puts_committed.fetch_add(put_count, Ordering::Relaxed);
        self.largest_batch.fetch_max(put_count, Ordering::Relaxed);
    }

    fn record_solo_retry(&self) {
        self.solo_retries.fetch_add(1, Ordering::Relaxed);
    }
}

/// A snapshot of batch statistics at a point in time.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchStatsSnapshot {
    /// Transactions committed successfully.
    pub batches_committed: u64,
    /// Inserts applied by those transactions.
    pub puts_committed: u64,
    /// Inserts re-run alone after their batch failed.
    pub solo_retries: u64,
    /// Largest number of inserts in one committed transaction.
    pub largest_batch: u64,
}

struct Request<T> {
    put: PendingPut<T>,
    reply: Sender<StoreResult<()>>,
}

/// Front end to the committer thread.
pub struct Batcher<S: BatchSink> {
    sink: Arc<S>,
    config: BatchConfig,
    queue: Option<Sender<Request<S::Target>>>,
    committer: Option<JoinHandle<()>>,
    stats: Arc<BatchStats>,
}

impl<S: BatchSink> Batcher<S> {
    /// Starts the committer thread, unless batching is disabled.
    pub fn start(sink: Arc<S>, config: BatchConfig) -> StoreResult<Self> {
        let stats = Arc::new(BatchStats::default());
        let (queue, committer) = if config.enabled && config.max_batch_size > 1 {
            let (tx, rx) = crossbeam_channel::unbounded();
            let handle = thread::Builder::new().name("lexload-batch".to_string()).spawn({
                let sink = Arc::clone(&sink);
                let config = config.clone();
                let stats = Arc::clone(&stats);
                move || run_committer(&*sink, &config, rx, &stats)
            })?;
            (Some(tx), Some(handle))
        } else {
            (None, None)
        };

        debug!(
            "Batcher started: max_batch_size={}, max_batch_delay_ms={}, threaded={}",
            config.max_batch_size,
            config.max_batch_delay_ms,
            queue.is_some()
        );

        Ok(Self {
            sink,
            config,
            queue,
            committer,
            stats,
        })
    }

    /// Queues one insert and blocks until its transaction has committed.
    pub fn submit(&self, target: S::Target, word: &[u8]) -> StoreResult<()> {
        let put = PendingPut {
            target,
            word: word.to_vec(),
        };

        let Some(queue) = &self.queue else {
            self.sink.commit(std::slice::from_ref(&put))?;
            self.stats.record_batch(1);
            return Ok(());
        };

        let (reply, outcome) = crossbeam_channel::bounded(1);
        queue
            .send(Request { put, reply })
            .map_err(|_| StoreError::BatcherClosed {
                reason: "committer thread exited".to_string(),
            })?;
        outcome.recv().map_err(|_| StoreError::BatcherClosed {
            reason: "committer dropped the request".to_string(),
        })?
    }

    /// Get a snapshot of current batch statistics.
    pub fn stats(&self) -> BatchStatsSnapshot {
        self.stats.snapshot()
    }

    /// Get the configuration for this batcher.
    pub fn config(&self) -> &BatchConfig {
        &self.config
    }
}

impl<S: BatchSink> Drop for Batcher<S> {
    fn drop(&mut self) {
        // Closing the queue ends the committer loop once it is drained.
        self.queue.take();
        if let Some(handle) = self.committer.take() {
            if handle.join().is_err() {
                error!("Batch committer thread panicked");
            }
        }
    }
}

fn run_committer<S: BatchSink>(
    sink: &S,
    config: &BatchConfig,
    queue: Receiver<Request<S::Target>>,
    stats: &BatchStats,
) {
    while let Ok(first) = queue.recv() {
        let deadline = Instant::now() + config.max_batch_delay();
        let mut batch = vec![first];
        while batch.len() < config.max_batch_size {
            match queue.recv_deadline(deadline) {
                Ok(request) => batch.push(request),
                Err(_) => break,
            }
        }
        commit_batch(sink, batch, stats);
    }
    debug!("Batch committer exiting");
}

fn commit_batch<S: BatchSink>(sink: &S, batch: Vec<Request<S::Target>>, stats: &BatchStats) {
    let (puts, replies): (Vec<_>, Vec<_>) =
        batch.into_iter().map(|req| (req.put, req.reply)).unzip();

    match sink.commit(&puts) {
        Ok(()) => {
            stats.record_batch(puts.len() as u64);
            debug!("Committed batch of {} puts", puts.len());
            for reply in replies {
                let _ = reply.send(Ok(()));
            }
        }
        Err(err) if puts.len() == 1 => {
            let _ = replies[0].send(Err(err));
        }
        Err(err) => {
            warn!(
                "Batch of {} puts failed ({}), retrying each alone",
                puts.len(),
                err
            );
            for (put, reply) in puts.iter().zip(replies) {
                stats.record_solo_retry();
                let outcome = sink.commit(std::slice::from_ref(put));
                if outcome.is_ok() {
                    stats.record_batch(1);
                }
                let _ = reply.send(outcome);
            }
        }
    }
}
