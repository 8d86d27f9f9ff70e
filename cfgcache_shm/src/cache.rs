//! Cross-process TTL cache facade
//!
//! [`SharedCache`] is what a configuration entry talks to. `setup` derives the
//! IPC key from the namespace token and attaches the segment and semaphore;
//! `get` reads lock-free; `put` and `delete` mutate one bucket under the
//! semaphore; `purge` removes both kernel objects.
//!
//! The cache is an optimisation in front of the configuration store, never
//! the source of truth: mutation failures are reported as `false` and logged,
//! reads report any failure as a miss.

use crate::bucket::{Bucket, Entry};
use crate::error::{CacheSetupError, CacheTeardownError, ShmResult};
use crate::identity::{self, IpcKey};
use crate::segment::{SegmentStats, SharedSegment};
use crate::semaphore::Semaphore;
use crate::slot::{Crc32SlotHasher, SlotHasher};
use crate::ttl::{Clock, SystemClock, TtlPolicy};
use cfgcache_common::config::Validate;
use cfgcache_common::domain::CacheDomain;
use serde::Serialize;
use std::path::Path;
use tracing::{debug, info, warn};

/// Kernel objects attached by `setup`
struct CacheResources {
    key: IpcKey,
    segment: SharedSegment,
    lock: Semaphore,
}

/// Segment usage plus lock state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    /// IPC key as a hex string
    #[serde(serialize_with = "serialize_key")]
    pub key: IpcKey,
    /// Segment usage
    pub segment: SegmentStats,
    /// Lock permits currently free
    pub lock_available: i32,
    /// Configured lock permits
    pub max_lock_holders: u32,
}

fn serialize_key<S: serde::Serializer>(key: &IpcKey, s: S) -> Result<S::Ok, S::Error> {
    s.collect_str(key)
}

/// Handle on one shared cache domain
pub struct SharedCache {
    domain: CacheDomain,
    policy: TtlPolicy,
    hasher: Box<dyn SlotHasher>,
    clock: Box<dyn Clock>,
    resources: Option<CacheResources>,
}

impl SharedCache {
    /// Unattached cache for `domain`; call [`setup`](Self::setup) before use
    pub fn new(domain: CacheDomain) -> Self {
        Self {
            policy: TtlPolicy::new(domain.ttl_seconds),
            domain,
            hasher: Box::new(Crc32SlotHasher),
            clock: Box::new(SystemClock),
            resources: None,
        }
    }

    /// Create and attach using the domain's own namespace token
    pub fn open(domain: CacheDomain) -> Result<Self, CacheSetupError> {
        let token = domain.namespace_token.clone();
        let mut cache = Self::new(domain);
        cache.setup(&token)?;
        Ok(cache)
    }

    /// Replace the slot hasher. All processes sharing a domain must agree.
    pub fn with_hasher(mut self, hasher: impl SlotHasher + 'static) -> Self {
        self.hasher = Box::new(hasher);
        self
    }

    /// Replace the clock used for entry timestamps and expiry
    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    /// Attach the segment and lock named by `token`.
    ///
    /// Creates them if no process has yet. Calling again re-derives the key
    /// and re-attaches, which is how a cache recovers after `purge`.
    pub fn setup(&mut self, token: impl AsRef<Path>) -> Result<(), CacheSetupError> {
        let token = token.as_ref();
        self.domain.namespace_token = token.to_path_buf();

        if !self.domain.enabled {
            info!("Cache disabled for {}; skipping setup", token.display());
            return Ok(());
        }

        self.domain
            .validate()
            .map_err(|e| CacheSetupError::InvalidDomain {
                reason: e.to_string(),
            })?;

        let key = identity::derive(token).map_err(|source| CacheSetupError::IdentityDerivation {
            token: token.to_path_buf(),
            source,
        })?;

        let segment = SharedSegment::attach_or_create(
            key,
            self.domain.segment_capacity_bytes,
            self.domain.max_lock_holders,
        )
        .map_err(|source| CacheSetupError::SegmentAllocation { key, source })?;

        let lock = Semaphore::attach_or_create(key, self.domain.max_lock_holders)
            .map_err(|source| CacheSetupError::LockAcquisition { key, source })?;

        info!(
            "Cache {} ready: {} bytes, ttl {}s, {} lock holder(s)",
            key,
            segment.stats().total_size,
            self.domain.ttl_seconds,
            self.domain.max_lock_holders
        );
        self.resources = Some(CacheResources { key, segment, lock });
        Ok(())
    }

    /// Value stored under `key`, unless absent or expired
    pub fn get(&self, key: &str) -> Option<Vec<u8>> {
        let res = self.resources.as_ref()?;
        let slot = self.hasher.slot_of(key);

        let mut bucket = match res.segment.read_slot(slot) {
            Ok(Some(bucket)) => bucket,
            Ok(None) => return None,
            Err(e) => {
                debug!("Cache read of '{}' in {} failed: {}", key, res.key, e);
                return None;
            }
        };

        let entry = bucket.remove(key)?;
        if self.policy.is_expired(&entry, self.clock.now()) {
            return None;
        }
        Some(entry.value)
    }

    /// Store `value` under `key`; returns whether the segment was updated
    pub fn put(&self, key: &str, value: &[u8]) -> bool {
        let Some(res) = self.resources.as_ref() else {
            return false;
        };

        match self.try_put(res, key, value) {
            Ok(()) => true,
            Err(e) => {
                warn!("Cache put of '{}' in {} failed: {}", key, res.key, e);
                false
            }
        }
    }

    fn try_put(&self, res: &CacheResources, key: &str, value: &[u8]) -> ShmResult<()> {
        let slot = self.hasher.slot_of(key);
        let _guard = res.lock.acquire()?;
        res.segment.recover_torn_write();

        let now = self.clock.now();
        let mut bucket = res.segment.read_slot(slot)?.unwrap_or_default();
        let evicted = self.policy.compact(&mut bucket, now);
        if evicted > 0 {
            debug!("Evicted {} expired entr(ies) from {}", evicted, slot);
        }
        bucket.insert(key, Entry::new(value.to_vec(), now));
        res.segment.write_slot(slot, &bucket)
    }

    /// Remove `key`; returns false if it was not cached or the write failed
    pub fn delete(&self, key: &str) -> bool {
        let Some(res) = self.resources.as_ref() else {
            return false;
        };

        match self.try_delete(res, key) {
            Ok(deleted) => deleted,
            Err(e) => {
                warn!("Cache delete of '{}' in {} failed: {}", key, res.key, e);
                false
            }
        }
    }

    fn try_delete(&self, res: &CacheResources, key: &str) -> ShmResult<bool> {
        let slot = self.hasher.slot_of(key);
        let _guard = res.lock.acquire()?;
        res.segment.recover_torn_write();

        let Some(mut bucket) = res.segment.read_slot(slot)? else {
            return Ok(false);
        };
        if bucket.remove(key).is_none() {
            return Ok(false);
        }

        if bucket.is_empty() {
            res.segment.remove_slot(slot)?;
        } else {
            res.segment.write_slot(slot, &bucket)?;
        }
        Ok(true)
    }

    /// Remove the lock, then the segment.
    ///
    /// Every process attached to the domain loses its cache. A lock removal
    /// failure leaves the segment in place. On success this handle is
    /// detached; calling `purge` again fails with `NotAttached`.
    pub fn purge(&mut self) -> Result<(), CacheTeardownError> {
        if !self.domain.enabled {
            return Ok(());
        }
        let res = self
            .resources
            .as_ref()
            .ok_or(CacheTeardownError::NotAttached)?;
        let key = res.key;

        res.lock
            .remove()
            .map_err(|source| CacheTeardownError::LockRemoval { key, source })?;
        res.segment
            .remove()
            .map_err(|source| CacheTeardownError::SegmentRemoval { key, source })?;

        self.resources = None;
        info!("Cache {} purged", key);
        Ok(())
    }

    /// Usage figures, if attached
    pub fn stats(&self) -> Option<CacheStats> {
        let res = self.resources.as_ref()?;
        let lock_available = match res.lock.available() {
            Ok(value) => value,
            Err(e) => {
                debug!("Reading lock {} failed: {}", res.key, e);
                -1
            }
        };
        Some(CacheStats {
            key: res.key,
            segment: res.segment.stats(),
            lock_available,
            max_lock_holders: self.domain.max_lock_holders,
        })
    }

    /// Keys stored in `key`'s slot, expired ones included
    pub fn colocated_keys(&self, key: &str) -> Vec<String> {
        let Some(res) = self.resources.as_ref() else {
            return Vec::new();
        };
        res.segment
            .read_slot(self.hasher.slot_of(key))
            .ok()
            .flatten()
            .map(|bucket: Bucket| bucket.keys().map(str::to_owned).collect())
            .unwrap_or_default()
    }

    /// True once `setup` attached the kernel objects
    pub fn is_attached(&self) -> bool {
        self.resources.is_some()
    }

    /// IPC key of the attached domain
    pub fn ipc_key(&self) -> Option<IpcKey> {
        self.resources.as_ref().map(|r| r.key)
    }

    /// Domain this cache was built for
    pub fn domain(&self) -> &CacheDomain {
        &self.domain
    }
}
