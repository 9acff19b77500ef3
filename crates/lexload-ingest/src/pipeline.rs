//! Ingestion pipeline: distributor -> bounded channel -> worker pool -> store.
//!
//! Shutdown order: input exhausted, wait for the completion count to reach
//! zero, close the channel, join the workers. The first failure from any
//! stage is returned once everything has stopped.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::sync::Arc;
use std::time::{Duration, Instant};

use lexload_store::{BatchStatsSnapshot, LmdbWordStore, WordStore};
use serde::Serialize;
use tracing::info;

use crate::config::IngestConfig;
use crate::distributor::{Distributor, WordCounts};
use crate::error::{IngestError, IngestResult};
use crate::report::Progress;
use crate::tracker::CompletionTracker;
use crate::worker::{FailFast, WorkerPool};

/// Result of a completed run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IngestSummary {
    /// Accepted words per length, duplicates included.
    pub counts: WordCounts,
    /// Lines read from input.
    pub lines_read: u64,
    /// Lines discarded for being out of bounds.
    pub lines_rejected: u64,
    /// Worker threads used.
    pub workers: usize,
    /// Wall time of the run.
    pub elapsed: Duration,
    /// Commit statistics, when the store batches writes.
    pub batches: Option<BatchStatsSnapshot>,
}

impl IngestSummary {
    /// Total accepted words.
    pub fn total_words(&self) -> u64 {
        self.counts.total()
    }
}

/// Runs the pipeline over `input`, writing into `store`.
///
/// `config` must already be validated.
pub fn run<S, R>(
    config: &IngestConfig,
    store: Arc<S>,
    input: R,
    progress: &mut dyn Progress,
) -> IngestResult<IngestSummary>
where
    S: WordStore + 'static,
    R: BufRead,
{
    let started = Instant::now();
    let tracker = Arc::new(CompletionTracker::new());
    let fail = Arc::new(FailFast::default());
    let (queue, work) = crossbeam_channel::bounded(config.workers);

    let pool = WorkerPool::start(config.workers, store, work, Arc::clone(&fail))?;

    let mut distributor = Distributor::new(config);
    let distributed = distributor.distribute(input, &queue, &tracker, &fail, progress);

    tracker.wait();
    drop(queue);
    let worker_stats = pool.join()?;
    progress.finish();

    if let Some(err) = fail.take() {
        return Err(err);
    }
    distributed?;

    let stored: u64 = worker_stats.iter().map(|s| s.stored).sum();
    let summary = IngestSummary {
        lines_read: distributor.lines_read(),
        lines_rejected: distributor.lines_rejected(),
        counts: distributor.into_counts(),
        workers: config.workers,
        elapsed: started.elapsed(),
        batches: None,
    };
    info!(
        "Ingested {} words ({} writes) from {} lines in {:?}",
        summary.total_words(),
        stored,
        summary.lines_read,
        summary.elapsed
    );
    Ok(summary)
}

/// Rebuilds the store at `config.db_path` from `config.word_list`.
///
/// Validates `config`, deletes any previous store, opens the word list and
/// runs the pipeline. Returns the summary and the open store.
pub fn ingest_file(
    config: &IngestConfig,
    progress: &mut dyn Progress,
) -> IngestResult<(IngestSummary, Arc<LmdbWordStore>)> {
    config.validate()?;

    let store = Arc::new(LmdbWordStore::create_fresh(
        &config.db_path,
        &config.store_config(),
    )?);
    let file = File::open(&config.word_list).map_err(|e| IngestError::io(&config.word_list, e))?;

    let mut summary = run(config, Arc::clone(&store), BufReader::new(file), progress)?;
    summary.batches = Some(store.batch_stats());
    Ok((summary, store))
}
