//! Work distribution: reads the word list and feeds the worker pool.
//!
//! The distributor is the only producer. It owns the per-length counts, so
//! they need no synchronization. Sending blocks while the bounded work
//! channel is full, which keeps reading in step with storage throughput.

use std::collections::BTreeMap;
use std::io::BufRead;
use std::path::PathBuf;
use std::sync::Arc;

use crossbeam_channel::Sender;
use lexload_store::Word;
use serde::Serialize;
use tracing::{debug, warn};

use crate::config::IngestConfig;
use crate::error::{IngestError, IngestResult};
use crate::report::Progress;
use crate::tracker::CompletionTracker;
use crate::worker::{FailFast, WorkItem};

/// Accepted-word counts per length.
///
/// Every length in the configured range is present, starting at zero.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct WordCounts(BTreeMap<usize, u64>);

impl WordCounts {
    /// Zeroed counts for `lengths`.
    pub fn new(lengths: impl IntoIterator<Item = usize>) -> Self {
        Self(lengths.into_iter().map(|len| (len, 0)).collect())
    }

    /// Counts one accepted word of `len` bytes.
    pub fn record(&mut self, len: usize) {
        *self.0.entry(len).or_insert(0) += 1;
    }

    /// Count for one length.
    pub fn get(&self, len: usize) -> u64 {
        self.0.get(&len).copied().unwrap_or(0)
    }

    /// `(length, count)` pairs in length order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, u64)> + '_ {
        self.0.iter().map(|(len, count)| (*len, *count))
    }

    /// Sum over all lengths.
    pub fn total(&self) -> u64 {
        self.0.values().sum()
    }
}

/// Splits input into words: one per `\n`-terminated line, trailing `\r` removed.
pub fn word_lines<R: BufRead>(input: R) -> impl Iterator<Item = std::io::Result<Vec<u8>>> {
    input.split(b'\n').map(|line| {
        line.map(|mut bytes| {
            if bytes.last() == Some(&b'\r') {
                bytes.pop();
            }
            bytes
        })
    })
}

/// Single producer of work items.
pub struct Distributor {
    min_word_len: usize,
    max_word_len: usize,
    source: PathBuf,
    counts: WordCounts,
    lines_read: u64,
    lines_rejected: u64,
}

impl Distributor {
    /// Creates a distributor for the bounds in `config`.
    pub fn new(config: &IngestConfig) -> Self {
        Self {
            min_word_len: config.min_word_len,
            max_word_len: config.max_word_len,
            source: config.word_list.clone(),
            counts: WordCounts::new(config.lengths()),
            lines_read: 0,
            lines_rejected: 0,
        }
    }

    /// Returns true if a line of `len` bytes is dispatched.
    pub fn accepts(&self, len: usize) -> bool {
        len >= self.min_word_len && len <= self.max_word_len
    }

    /// Reads `input` to the end, dispatching every accepted word.
    ///
    /// Each dispatched word carries a ticket from `tracker`. Stops early,
    /// without error, once `fail` has tripped; the caller reports that failure.
    pub fn distribute<R: BufRead>(
        &mut self,
        input: R,
        queue: &Sender<WorkItem>,
        tracker: &Arc<CompletionTracker>,
        fail: &FailFast,
        progress: &mut dyn Progress,
    ) -> IngestResult<()> {
        for line in word_lines(input) {
            if fail.is_tripped() {
                warn!("Worker failure, stopping after {} lines", self.lines_read);
                return Ok(());
            }

            let line = line.map_err(|e| IngestError::io(&self.source, e))?;
            self.lines_read += 1;

            let len = line.len();
            if !self.accepts(len) {
                self.lines_rejected += 1;
                continue;
            }
            let Some(word) = Word::new(line) else {
                self.lines_rejected += 1;
                continue;
            };

            let item = WorkItem::new(word, tracker.ticket());
            queue.send(item).map_err(|_| IngestError::WorkersExited)?;
            self.counts.record(len);
            progress.on_accepted(self.counts.total());
        }

        debug!(
            "Input exhausted: {} lines read, {} accepted, {} rejected",
            self.lines_read,
            self.counts.total(),
            self.lines_rejected
        );
        Ok(())
    }

    /// Accepted counts so far.
    pub fn counts(&self) -> &WordCounts {
        &self.counts
    }

    /// Lines read so far.
    pub fn lines_read(&self) -> u64 {
        self.lines_read
    }

    /// Lines discarded for being out of bounds.
    pub fn lines_rejected(&self) -> u64 {
        self.lines_rejected
    }

    /// Consumes the distributor, returning its counts.
    pub fn into_counts(self) -> WordCounts {
        self.counts
    }
}
