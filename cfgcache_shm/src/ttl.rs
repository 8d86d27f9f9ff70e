//! TTL policy and clock
//!
//! Expiry is lazy. Reads treat expired entries as absent; writes drop them
//! from the bucket they rewrite. Nothing sweeps the segment in the
//! background.

use crate::bucket::{Bucket, Entry};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

/// Source of wall-clock seconds.
///
/// Entries are compared across processes, so the clock must be the shared
/// wall clock, not a per-process monotonic one.
pub trait Clock: Send + Sync {
    /// Seconds since the Unix epoch
    fn now(&self) -> u64;
}

/// The system wall clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs()
    }
}

/// Clock advanced by hand; clones share the same time
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    seconds: Arc<AtomicU64>,
}

impl ManualClock {
    /// Clock starting at `seconds`
    pub fn new(seconds: u64) -> Self {
        Self {
            seconds: Arc::new(AtomicU64::new(seconds)),
        }
    }

    /// Move time forward
    pub fn advance(&self, seconds: u64) {
        self.seconds.fetch_add(seconds, Ordering::SeqCst);
    }

    /// Jump to an absolute time
    pub fn set(&self, seconds: u64) {
        self.seconds.store(seconds, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> u64 {
        self.seconds.load(Ordering::SeqCst)
    }
}

/// Expiry rule for one cache domain
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TtlPolicy {
    ttl_seconds: u64,
}

impl TtlPolicy {
    /// Policy with the given time-to-live
    pub fn new(ttl_seconds: u64) -> Self {
        Self { ttl_seconds }
    }

    /// Time-to-live in seconds
    pub fn ttl_seconds(&self) -> u64 {
        self.ttl_seconds
    }

    /// `now > created_at + ttl`
    pub fn is_expired(&self, entry: &Entry, now: u64) -> bool {
        now > entry.created_at.saturating_add(self.ttl_seconds)
    }

    /// Drop expired entries from `bucket`; returns how many were dropped
    pub fn compact(&self, bucket: &mut Bucket, now: u64) -> usize {
        bucket.retain(|_, entry| !self.is_expired(entry, now))
    }
}
