//! Error types for the word store.

use thiserror::Error;

/// Result type alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Error variants for store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Wraps standard I/O errors.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// The LMDB engine rejected an operation.
    #[error("LMDB {op} failed: {source}")]
    Lmdb {
        /// The engine operation that failed.
        op: &'static str,
        /// The engine error.
        #[source]
        source: lmdb::Error,
    },

    /// A word does not fit the store's key size limit.
    #[error("Word too long for store: {len} bytes, limit {limit}")]
    KeyTooLong {
        /// Length of the rejected word in bytes.
        len: usize,
        /// Largest key the store accepts.
        limit: usize,
    },

    /// The store cannot hold a zero-length key.
    #[error("Empty word cannot be stored")]
    EmptyWord,

    /// A bucket name found in the store is not a rendered partition key.
    #[error("Invalid bucket name: {name:?}")]
    InvalidBucketName {
        /// The name as found in the store.
        name: String,
    },

    /// The batch committer is gone and can no longer accept writes.
    #[error("Batch committer stopped: {reason}")]
    BatcherClosed {
        /// Description of why the committer is unavailable.
        reason: String,
    },
}

impl StoreError {
    /// Wraps an LMDB error with the name of the failing operation.
    pub fn lmdb(op: &'static str, source: lmdb::Error) -> Self {
        StoreError::Lmdb { op, source }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_result_alias() {
        let ok: StoreResult<i32> = Ok(42);
        assert!(ok.is_ok());

        let err: StoreResult<i32> = Err(StoreError::KeyTooLong { len: 600, limit: 511 });
        assert!(err.is_err());
    }

    #[test]
    fn test_io_error_from_std() {
        let std_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let store_err: StoreError = std_err.into();
        assert!(matches!(store_err, StoreError::IoError(_)));
    }

    #[test]
    fn test_lmdb_error_names_operation() {
        let err = StoreError::lmdb("commit", lmdb::Error::MapFull);
        let msg = format!("{}", err);
        assert!(msg.starts_with("LMDB commit failed"));
    }

    #[test]
    fn test_key_too_long() {
        let err = StoreError::KeyTooLong { len: 600, limit: 511 };
        assert_eq!(
            format!("{}", err),
            "Word too long for store: 600 bytes, limit 511"
        );
    }

    #[test]
    fn test_empty_word() {
        assert_eq!(format!("{}", StoreError::EmptyWord), "Empty word cannot be stored");
    }

    #[test]
    fn test_invalid_bucket_name() {
        let err = StoreError::InvalidBucketName {
            name: "state".to_string(),
        };
        assert!(format!("{}", err).contains("\"state\""));
    }
}
