//! Length classifier: maps words to the bucket that holds them.
//!
//! Every word lives in the bucket for its length. The partition key is the
//! length as a 2-byte big-endian integer; in LMDB the bucket is the named
//! database whose name is that key rendered as four lowercase hex digits.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{StoreError, StoreResult};

/// Fixed-width identifier of a length bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PartitionKey(u16);

impl PartitionKey {
    /// Creates the key for words of `len` bytes.
    pub fn new(len: u16) -> Self {
        Self(len)
    }

    /// Word length this key stands for.
    pub fn word_len(&self) -> u16 {
        self.0
    }

    /// 2-byte big-endian encoding.
    pub fn to_bytes(self) -> [u8; 2] {
        self.0.to_be_bytes()
    }

    /// Decodes the 2-byte big-endian encoding.
    pub fn from_bytes(bytes: [u8; 2]) -> Self {
        Self(u16::from_be_bytes(bytes))
    }

    /// Name of the bucket in the store.
    pub fn bucket_name(&self) -> String {
        let [hi, lo] = self.to_bytes();
        format!("{:02x}{:02x}", hi, lo)
    }

    /// Parses a bucket name produced by [`PartitionKey::bucket_name`].
    pub fn from_bucket_name(name: &str) -> StoreResult<Self> {
        let invalid = || StoreError::InvalidBucketName {
            name: name.to_string(),
        };
        if name.len() != 4 || !name.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(invalid());
        }
        u16::from_str_radix(name, 16).map(Self).map_err(|_| invalid())
    }
}

impl fmt::Display for PartitionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.bucket_name())
    }
}

/// One word read from input.
///
/// A word's length always fits a [`PartitionKey`], so classification cannot
/// fail.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Word(Vec<u8>);

impl Word {
    /// Longest word representable by a partition key.
    pub const MAX_LEN: usize = u16::MAX as usize;

    /// Wraps raw bytes; `None` if longer than [`Word::MAX_LEN`].
    pub fn new(bytes: impl Into<Vec<u8>>) -> Option<Self> {
        let bytes = bytes.into();
        if bytes.len() > Self::MAX_LEN {
            return None;
        }
        Some(Self(bytes))
    }

    /// Length in bytes.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true for the empty word.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Raw bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Consumes the word, returning its bytes.
    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }
}

impl AsRef<[u8]> for Word {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Display for Word {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&String::from_utf8_lossy(&self.0))
    }
}

/// Partition key for `word`.
pub fn classify(word: &Word) -> PartitionKey {
    // Word::new caps the length at u16::MAX.
    PartitionKey(word.len() as u16)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn word(s: &str) -> Word {
        Word::new(s).unwrap()
    }

    #[test]
    fn test_classify_uses_byte_length() {
        assert_eq!(classify(&word("cat")), PartitionKey::new(3));
        assert_eq!(classify(&word("house")), PartitionKey::new(5));
        assert_eq!(classify(&word("été")), PartitionKey::new(5));
    }

    #[test]
    fn test_equal_lengths_share_partition() {
        assert_eq!(classify(&word("cat")), classify(&word("dog")));
        assert_ne!(classify(&word("cat")), classify(&word("tree")));
    }

    #[test]
    fn test_key_is_big_endian() {
        assert_eq!(PartitionKey::new(4).to_bytes(), [0x00, 0x04]);
        assert_eq!(PartitionKey::new(0x0102).to_bytes(), [0x01, 0x02]);
        assert_eq!(PartitionKey::from_bytes([0x01, 0x02]), PartitionKey::new(258));
    }

    #[test]
    fn test_bucket_name_round_trip() {
        let key = PartitionKey::new(8);
        assert_eq!(key.bucket_name(), "0008");
        assert_eq!(PartitionKey::from_bucket_name("0008").unwrap(), key);
        assert_eq!(PartitionKey::from_bucket_name("01ff").unwrap().word_len(), 511);
    }

    #[test]
    fn test_bucket_name_rejects_foreign_names() {
        assert!(PartitionKey::from_bucket_name("state").is_err());
        assert!(PartitionKey::from_bucket_name("008").is_err());
        assert!(PartitionKey::from_bucket_name("+008").is_err());
    }

    #[test]
    fn test_key_order_follows_length() {
        let mut keys = vec![PartitionKey::new(300), PartitionKey::new(4), PartitionKey::new(8)];
        keys.sort();
        assert_eq!(keys, vec![PartitionKey::new(4), PartitionKey::new(8), PartitionKey::new(300)]);
    }

    #[test]
    fn test_word_rejects_oversized_input() {
        assert!(Word::new(vec![b'a'; Word::MAX_LEN]).is_some());
        assert!(Word::new(vec![b'a'; Word::MAX_LEN + 1]).is_none());
    }

    #[test]
    fn test_word_display_is_lossy() {
        let w = Word::new(vec![b'o', 0xff, b'k']).unwrap();
        assert_eq!(w.len(), 3);
        assert_eq!(w.to_string(), "o\u{fffd}k");
    }
}
