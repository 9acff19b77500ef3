#![warn(missing_docs)]

//! lexload ingestion subsystem: concurrent word-list loading
//!
//! A single distributor reads the word list and feeds a bounded channel; a
//! fixed pool of workers classifies each word by length and inserts it into
//! the store. A completion tracker lets the distributor wait until every
//! dispatched word has been durably written before shutting the pool down.

pub mod cli;
pub mod config;
pub mod distributor;
pub mod error;
pub mod pipeline;
pub mod report;
pub mod tracker;
pub mod verify;
pub mod worker;

pub use config::IngestConfig;
pub use distributor::{word_lines, Distributor, WordCounts};
pub use error::{IngestError, IngestResult};
pub use pipeline::{ingest_file, run, IngestSummary};
pub use report::{NoProgress, Progress, TerminalProgress};
pub use tracker::{CompletionTicket, CompletionTracker};
pub use verify::{verify, verify_file, VerifyReport};
pub use worker::{FailFast, WorkItem, WorkerPool, WorkerStats};
