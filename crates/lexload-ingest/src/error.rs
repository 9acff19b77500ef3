//! Error types for the ingestion pipeline.

use std::io;
use std::path::PathBuf;

use lexload_store::StoreError;
use thiserror::Error;

/// Result type alias for ingestion operations.
pub type IngestResult<T> = Result<T, IngestError>;

/// Error variants for ingestion. Every one of them ends the run.
#[derive(Debug, Error)]
pub enum IngestError {
    /// Settings rejected before any file is touched.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// A configuration file could not be parsed.
    #[error("Config file {}: {reason}", .path.display())]
    ConfigParse {
        /// The configuration file.
        path: PathBuf,
        /// Parser message.
        reason: String,
    },

    /// Reading or opening a file failed.
    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        /// The file involved.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: io::Error,
    },

    /// Opening or querying the store failed.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// A worker could not store a word.
    #[error("error adding `{word}` to store: {source}")]
    Write {
        /// The word being written, lossily decoded.
        word: String,
        /// The store failure.
        #[source]
        source: StoreError,
    },

    /// The operating system refused to start a worker thread.
    #[error("Failed to spawn worker thread: {0}")]
    Spawn(#[source] io::Error),

    /// A worker thread panicked.
    #[error("Worker {worker} panicked")]
    WorkerPanicked {
        /// Index of the worker.
        worker: usize,
    },

    /// Every worker exited while input was still being distributed.
    #[error("All workers exited before input was exhausted")]
    WorkersExited,
}

impl IngestError {
    /// Wraps an I/O error with the path it concerns.
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        IngestError::Io {
            path: path.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_config_message() {
        let err = IngestError::InvalidConfig("a minimum of one worker is required".to_string());
        assert_eq!(
            format!("{}", err),
            "Invalid configuration: a minimum of one worker is required"
        );
    }

    #[test]
    fn test_io_error_names_path() {
        let err = IngestError::io(
            "words.txt",
            io::Error::new(io::ErrorKind::NotFound, "no such file"),
        );
        let msg = format!("{}", err);
        assert!(msg.contains("words.txt"));
        assert!(msg.contains("no such file"));
    }

    #[test]
    fn test_write_error_names_word() {
        let err = IngestError::Write {
            word: "house".to_string(),
            source: StoreError::EmptyWord,
        };
        assert!(format!("{}", err).starts_with("error adding `house` to store"));
    }

    #[test]
    fn test_store_error_converts() {
        let err: IngestError = StoreError::EmptyWord.into();
        assert!(matches!(err, IngestError::Store(StoreError::EmptyWord)));
    }
}
