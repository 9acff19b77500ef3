//! Ingestion settings.

use std::ops::RangeInclusive;
use std::path::{Path, PathBuf};

use lexload_store::{StoreConfig, MAX_KEY_SIZE};
use serde::{Deserialize, Serialize};

use crate::error::{IngestError, IngestResult};

/// Everything a run needs to know.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    /// Store file, deleted and rebuilt on every run.
    pub db_path: PathBuf,
    /// Word list, one word per line.
    pub word_list: PathBuf,
    /// Shortest word accepted, in bytes.
    pub min_word_len: usize,
    /// Longest word accepted, in bytes.
    pub max_word_len: usize,
    /// Number of worker threads.
    pub workers: usize,
    /// LMDB and batching settings.
    pub store: StoreConfig,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from("words.db"),
            word_list: PathBuf::from("words.txt"),
            min_word_len: 4,
            max_word_len: 8,
            workers: num_cpus::get(),
            store: StoreConfig::default(),
        }
    }
}

impl IngestConfig {
    /// Loads settings from a `.toml` or `.json` file. Missing fields take defaults.
    pub fn from_file(path: &Path) -> IngestResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| IngestError::io(path, e))?;
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default();

        let parse_error = |reason: String| IngestError::ConfigParse {
            path: path.to_path_buf(),
            reason,
        };
        match ext.to_lowercase().as_str() {
            "toml" => toml::from_str(&contents).map_err(|e| parse_error(e.to_string())),
            "json" => serde_json::from_str(&contents).map_err(|e| parse_error(e.to_string())),
            _ => Err(parse_error(format!("unsupported config file extension: {:?}", ext))),
        }
    }

    /// Checks the settings. Must pass before any file is opened.
    pub fn validate(&self) -> IngestResult<()> {
        if self.max_word_len < self.min_word_len {
            return Err(IngestError::InvalidConfig(
                "maximum word length must be greater than or equal to the minimum".to_string(),
            ));
        }
        if self.workers == 0 {
            return Err(IngestError::InvalidConfig(
                "a minimum of one worker is required".to_string(),
            ));
        }
        if self.min_word_len == 0 {
            return Err(IngestError::InvalidConfig(
                "minimum word length must be at least 1".to_string(),
            ));
        }
        if self.max_word_len > MAX_KEY_SIZE {
            return Err(IngestError::InvalidConfig(format!(
                "maximum word length {} exceeds the store key limit of {} bytes",
                self.max_word_len, MAX_KEY_SIZE
            )));
        }
        let lengths = self.lengths().count();
        if lengths > self.store.max_buckets as usize {
            return Err(IngestError::InvalidConfig(format!(
                "{} word lengths need more buckets than max_buckets={}",
                lengths, self.store.max_buckets
            )));
        }
        Ok(())
    }

    /// Returns true if a word of `len` bytes is within bounds.
    pub fn accepts(&self, len: usize) -> bool {
        (self.min_word_len..=self.max_word_len).contains(&len)
    }

    /// Every accepted word length.
    pub fn lengths(&self) -> RangeInclusive<usize> {
        self.min_word_len..=self.max_word_len
    }

    /// Store settings with the batch size capped at the worker count.
    pub fn store_config(&self) -> StoreConfig {
        StoreConfig {
            batch: self.store.batch.capped_for(self.workers),
            ..self.store.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn config(min: usize, max: usize, workers: usize) -> IngestConfig {
        IngestConfig {
            min_word_len: min,
            max_word_len: max,
            workers,
            ..IngestConfig::default()
        }
    }

    #[test]
    fn test_default_values() {
        let config = IngestConfig::default();
        assert_eq!(config.db_path, PathBuf::from("words.db"));
        assert_eq!(config.word_list, PathBuf::from("words.txt"));
        assert_eq!(config.min_word_len, 4);
        assert_eq!(config.max_word_len, 8);
        assert_eq!(config.workers, num_cpus::get());
        assert!(config.workers >= 1);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_max_below_min_rejected() {
        let err = config(5, 4, 1).validate().unwrap_err();
        assert!(err.to_string().contains("greater than or equal to the minimum"));
    }

    #[test]
    fn test_equal_bounds_accepted() {
        assert!(config(5, 5, 1).validate().is_ok());
    }

    #[test]
    fn test_zero_workers_rejected() {
        let err = config(4, 8, 0).validate().unwrap_err();
        assert!(matches!(err, IngestError::InvalidConfig(_)));
    }

    #[test]
    fn test_zero_min_rejected() {
        assert!(config(0, 8, 1).validate().is_err());
    }

    #[test]
    fn test_max_above_key_limit_rejected() {
        assert!(config(1, MAX_KEY_SIZE, 1).validate().is_ok());
        assert!(config(1, MAX_KEY_SIZE + 1, 1).validate().is_err());
    }

    #[test]
    fn test_bucket_limit_enforced() {
        let mut c = config(1, 10, 1);
        c.store.max_buckets = 5;
        assert!(c.validate().is_err());
    }

    #[test]
    fn test_accepts_inclusive_bounds() {
        let c = config(3, 5, 1);
        assert!(!c.accepts(2));
        assert!(c.accepts(3));
        assert!(c.accepts(5));
        assert!(!c.accepts(6));
        assert_eq!(c.lengths().collect::<Vec<_>>(), vec![3, 4, 5]);
    }

    #[test]
    fn test_store_config_caps_batch() {
        let c = config(4, 8, 3);
        assert_eq!(c.store_config().batch.max_batch_size, 3);
        assert_eq!(c.store_config().map_size, c.store.map_size);
    }

    #[test]
    fn test_from_toml_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            "db_path = \"out.db\"\nmin_word_len = 3\nmax_word_len = 5\nworkers = 2\n\n[store.batch]\nmax_batch_delay_ms = 1"
        )
        .unwrap();

        let config = IngestConfig::from_file(file.path()).unwrap();
        assert_eq!(config.db_path, PathBuf::from("out.db"));
        assert_eq!(config.word_list, PathBuf::from("words.txt"));
        assert_eq!(config.min_word_len, 3);
        assert_eq!(config.max_word_len, 5);
        assert_eq!(config.workers, 2);
        assert_eq!(config.store.batch.max_batch_delay_ms, 1);
        assert_eq!(config.store.batch.max_batch_size, 1000);
    }

    #[test]
    fn test_from_json_file() {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        write!(file, r#"{{"word_list": "list.txt", "workers": 4}}"#).unwrap();

        let config = IngestConfig::from_file(file.path()).unwrap();
        assert_eq!(config.word_list, PathBuf::from("list.txt"));
        assert_eq!(config.workers, 4);
        assert_eq!(config.min_word_len, 4);
    }

    #[test]
    fn test_unsupported_extension() {
        let file = NamedTempFile::new().unwrap();
        let err = IngestConfig::from_file(file.path()).unwrap_err();
        assert!(matches!(err, IngestError::ConfigParse { .. }));
    }

    #[test]
    fn test_missing_file() {
        let err = IngestConfig::from_file(Path::new("/nonexistent/lexload.toml")).unwrap_err();
        assert!(matches!(err, IngestError::Io { .. }));
    }
}
