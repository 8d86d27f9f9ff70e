//! Bucket and entry model
//!
//! A slot holds one [`Bucket`]: every key whose hash lands on that slot,
//! each with its own creation time. The whole bucket is encoded, read and
//! written as a unit.

use crate::error::ShmResult;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A cached value and the second it was written
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    /// Opaque value bytes
    pub value: Vec<u8>,
    /// Unix timestamp (seconds) of the write
    pub created_at: u64,
}

impl Entry {
    /// Create a new entry
    pub fn new(value: Vec<u8>, created_at: u64) -> Self {
        Self { value, created_at }
    }
}

/// Entries colocated in one slot
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bucket {
    entries: HashMap<String, Entry>,
}

impl Bucket {
    /// Empty bucket
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up an entry
    pub fn get(&self, key: &str) -> Option<&Entry> {
        self.entries.get(key)
    }

    /// Insert or overwrite an entry, returning the previous one
    pub fn insert(&mut self, key: impl Into<String>, entry: Entry) -> Option<Entry> {
        self.entries.insert(key.into(), entry)
    }

    /// Remove an entry
    pub fn remove(&mut self, key: &str) -> Option<Entry> {
        self.entries.remove(key)
    }

    /// Keep only entries matching `keep`; returns how many were dropped
    pub fn retain(&mut self, mut keep: impl FnMut(&str, &Entry) -> bool) -> usize {
        let before = self.entries.len();
        self.entries.retain(|k, e| keep(k, e));
        before - self.entries.len()
    }

    /// Keys currently stored
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when no entries remain
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Encode for storage in a slot record
    pub fn encode(&self) -> ShmResult<Vec<u8>> {
        Ok(bincode::serialize(self)?)
    }

    /// Decode a slot record payload
    pub fn decode(bytes: &[u8]) -> ShmResult<Self> {
        Ok(bincode::deserialize(bytes)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ShmError;

    #[test]
    fn test_colliding_keys_share_bucket() {
        let mut bucket = Bucket::new();
        bucket.insert("a.x", Entry::new(b"1".to_vec(), 10));
        bucket.insert("b.y", Entry::new(b"2".to_vec(), 11));

        assert_eq!(bucket.len(), 2);
        assert_eq!(bucket.get("a.x").unwrap().value, b"1");
        assert_eq!(bucket.get("b.y").unwrap().value, b"2");
    }

    #[test]
    fn test_insert_overwrites() {
        let mut bucket = Bucket::new();
        assert!(bucket.insert("k", Entry::new(b"old".to_vec(), 1)).is_none());
        let previous = bucket.insert("k", Entry::new(b"new".to_vec(), 2)).unwrap();
        assert_eq!(previous.value, b"old");
        assert_eq!(bucket.get("k").unwrap().created_at, 2);
        assert_eq!(bucket.len(), 1);
    }

    #[test]
    fn test_retain_reports_dropped() {
        let mut bucket = Bucket::new();
        bucket.insert("old", Entry::new(vec![], 1));
        bucket.insert("new", Entry::new(vec![], 100));
        assert_eq!(bucket.retain(|_, e| e.created_at > 50), 1);
        assert_eq!(bucket.keys().collect::<Vec<_>>(), vec!["new"]);
    }

    #[test]
    fn test_codec_preserves_entries() {
        let mut bucket = Bucket::new();
        bucket.insert("app.name", Entry::new(b"MyApp".to_vec(), 1_700_000_000));
        bucket.insert("app.empty", Entry::new(Vec::new(), 1_700_000_001));

        let bytes = bucket.encode().unwrap();
        assert_eq!(Bucket::decode(&bytes).unwrap(), bucket);
    }

    #[test]
    fn test_decode_garbage() {
        let result = Bucket::decode(&[0xFF; 3]);
        assert!(matches!(result, Err(ShmError::Codec { .. })));
    }
}
