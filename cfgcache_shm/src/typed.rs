//! Typed payload helpers
//!
//! The cache stores opaque bytes. Callers caching structured configuration
//! values can use these helpers to go through `serde_json` on both sides.

use crate::cache::SharedCache;
use serde::Serialize;
use serde::de::DeserializeOwned;

/// JSON convenience layer over a byte cache
pub trait TypedCacheExt {
    /// Serialize `value` and store it; false if encoding or the write failed
    fn put_json<T: Serialize>(&self, key: &str, value: &T) -> bool;

    /// Fetch and deserialize; a payload that does not decode is a miss
    fn get_json<T: DeserializeOwned>(&self, key: &str) -> Option<T>;
}

impl TypedCacheExt for SharedCache {
    fn put_json<T: Serialize>(&self, key: &str, value: &T) -> bool {
        match serde_json::to_vec(value) {
            Ok(bytes) => self.put(key, &bytes),
            Err(e) => {
                tracing::warn!("Cannot encode value for '{}': {}", key, e);
                false
            }
        }
    }

    fn get_json<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let bytes = self.get(key)?;
        match serde_json::from_slice(&bytes) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::debug!("Cached value for '{}' does not decode: {}", key, e);
                None
            }
        }
    }
}
