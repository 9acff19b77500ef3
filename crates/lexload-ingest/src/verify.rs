//! Post-load verification.
//!
//! Re-reads the word list and checks that every in-bounds word is a member of
//! the bucket for its length, and that no bucket exists for an out-of-bounds
//! length.

use std::fs::File;
use std::io::{BufRead, BufReader};

use lexload_store::{LmdbWordStore, PartitionKey, WordStore};
use serde::Serialize;
use tracing::{info, warn};

use crate::config::IngestConfig;
use crate::distributor::word_lines;
use crate::error::{IngestError, IngestResult};

/// Outcome of a verification pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct VerifyReport {
    /// In-bounds lines looked up.
    pub checked: u64,
    /// Words not found, lossily decoded.
    pub missing: Vec<String>,
    /// Buckets whose length is outside the configured bounds.
    pub stray_buckets: Vec<PartitionKey>,
}

impl VerifyReport {
    /// Returns true if nothing is missing and nothing is out of place.
    pub fn is_complete(&self) -> bool {
        self.missing.is_empty() && self.stray_buckets.is_empty()
    }
}

/// Checks `store` against the words in `input`.
pub fn verify<S, R>(config: &IngestConfig, store: &S, input: R) -> IngestResult<VerifyReport>
where
    S: WordStore,
    R: BufRead,
{
    let mut report = VerifyReport::default();

    for line in word_lines(input) {
        let word = line.map_err(|e| IngestError::io(&config.word_list, e))?;
        if !config.accepts(word.len()) {
            continue;
        }
        report.checked += 1;
        let key = PartitionKey::new(word.len() as u16);
        if !store.contains(key, &word)? {
            let word = String::from_utf8_lossy(&word).into_owned();
            warn!("`{}` not found", word);
            report.missing.push(word);
        }
    }

    report.stray_buckets = store
        .buckets()?
        .into_iter()
        .filter(|key| !config.accepts(key.word_len() as usize))
        .collect();

    Ok(report)
}

/// Opens the store at `config.db_path` and verifies it against `config.word_list`.
pub fn verify_file(config: &IngestConfig) -> IngestResult<VerifyReport> {
    config.validate()?;
    // Opening would create an empty store.
    if !config.db_path.is_file() {
        return Err(IngestError::io(
            &config.db_path,
            std::io::Error::new(std::io::ErrorKind::NotFound, "store file does not exist"),
        ));
    }
    let store = LmdbWordStore::open(&config.db_path, &config.store_config())?;
    let file = File::open(&config.word_list).map_err(|e| IngestError::io(&config.word_list, e))?;

    let report = verify(config, &store, BufReader::new(file))?;
    info!(
        "Verified {} words: {} missing, {} stray buckets",
        report.checked,
        report.missing.len(),
        report.stray_buckets.len()
    );
    Ok(report)
}
