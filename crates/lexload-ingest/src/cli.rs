//! Command-line flags for the `lexload` binary.

use std::path::PathBuf;

use clap::Parser;

use crate::config::IngestConfig;
use crate::error::IngestResult;

/// Parsed command line.
#[derive(Parser, Debug)]
#[command(name = "lexload")]
#[command(about = "Load a word list into an LMDB file, one bucket per word length", long_about = None)]
pub struct Cli {
    /// LMDB file name [default: words.db]
    #[arg(long)]
    pub db: Option<PathBuf>,

    /// Word list source file [default: words.txt]
    #[arg(long)]
    pub list: Option<PathBuf>,

    /// Minimum word length [default: 4]
    #[arg(long)]
    pub min: Option<usize>,

    /// Maximum word length [default: 8]
    #[arg(long)]
    pub max: Option<usize>,

    /// Number of worker threads [default: number of CPUs]
    #[arg(short, long, env = "LEXLOAD_WORKERS")]
    pub workers: Option<usize>,

    /// TOML or JSON settings file; flags given on the command line win
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Re-read the word list afterwards and check every word was stored
    #[arg(long)]
    pub verify: bool,

    /// Print nothing but errors
    #[arg(short, long)]
    pub quiet: bool,
}

impl Cli {
    /// Builds the run configuration: defaults, then the config file, then flags.
    pub fn to_config(&self) -> IngestResult<IngestConfig> {
        let mut config = match &self.config {
            Some(path) => IngestConfig::from_file(path)?,
            None => IngestConfig::default(),
        };
        if let Some(db) = &self.db {
            config.db_path = db.clone();
        }
        if let Some(list) = &self.list {
            config.word_list = list.clone();
        }
        if let Some(min) = self.min {
            config.min_word_len = min;
        }
        if let Some(max) = self.max {
            config.max_word_len = max;
        }
        if let Some(workers) = self.workers {
            config.workers = workers;
        }
        Ok(config)
    }
}
