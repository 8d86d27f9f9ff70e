//! # cfgcache Shared Memory Cache
//!
//! A host-local, cross-process TTL cache for configuration values. Independent
//! worker processes share decoded values through one System V shared memory
//! segment, so a value fetched from the configuration store and decrypted by
//! one process is served to the others without another round trip.
//!
//! ## Architecture Overview
//!
//! ```text
//!  namespace token (path)
//!          │ ftok
//!          ▼
//!      IpcKey ──────────────┬──────────────────────┐
//!                           ▼                      ▼
//!                  ┌─────────────────┐    ┌─────────────────┐
//!                  │ SharedSegment   │    │ Semaphore       │
//!                  │ [Header|Records]│    │ N permits       │
//!                  └────────┬────────┘    └────────┬────────┘
//!                           │ slot = crc32(key)    │ put / delete
//!                           ▼                      │
//!                  Bucket { key → Entry } ◄────────┘
//!                           │
//!                      TtlPolicy (lazy)
//! ```
//!
//! - Reads are lock-free: a sequence counter in the segment header lets a
//!   reader detect a concurrent write and retry, so it never sees a torn
//!   bucket.
//! - Writes hold a semaphore permit for the whole read-modify-write of one
//!   bucket. The permit is a guard and is returned on every exit path.
//! - Expired entries are ignored on read and dropped when their bucket is next
//!   written.
//! - Kernel objects outlive processes. Dropping a cache only detaches;
//!   [`SharedCache::purge`] removes them.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use cfgcache_common::domain::CacheDomain;
//! use cfgcache_shm::SharedCache;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let domain = CacheDomain::new("/etc/cfgcache/namespace").with_ttl(30);
//! let cache = SharedCache::open(domain)?;
//!
//! if cache.get("app.name").is_none() {
//!     // fetch from the configuration store, then:
//!     cache.put("app.name", b"MyApp");
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Error Handling
//!
//! `setup` and `purge` return errors; the caller cannot rely on the cache if
//! they fail. `put` and `delete` return `bool` and log the cause; `get`
//! returns `None` for misses, expiry and failures alike.
//!
//! ```rust,no_run
//! use cfgcache_common::domain::CacheDomain;
//! use cfgcache_shm::{CacheSetupError, SharedCache};
//!
//! match SharedCache::open(CacheDomain::new("/missing/token")) {
//!     Ok(_cache) => { /* use cache */ }
//!     Err(CacheSetupError::IdentityDerivation { token, .. }) => {
//!         eprintln!("Namespace token {} not usable", token.display());
//!     }
//!     Err(e) => eprintln!("Cache unavailable: {}", e),
//! }
//! ```
//!
//! ## Stale locks
//!
//! Permits are taken with `SEM_UNDO`, so the kernel returns the permit of a
//! process that dies while holding it. A process that dies in the middle of a
//! slot write leaves the sequence counter odd. If the segment was created for
//! a single lock holder the next writer clears the data area, otherwise
//! `purge` is the remedy.

#![deny(missing_docs)]
#![warn(clippy::all)]

pub mod bucket;
pub mod cache;
pub mod error;
pub mod identity;
pub mod platform;
pub mod segment;
pub mod semaphore;
pub mod slot;
pub mod ttl;
pub mod typed;
pub mod version;

pub use bucket::{Bucket, Entry};
pub use cache::{CacheStats, SharedCache};
pub use error::{CacheSetupError, CacheTeardownError, ShmError, ShmResult};
pub use identity::IpcKey;
pub use segment::{SegmentHeader, SegmentStats, SharedSegment};
pub use semaphore::{LockGuard, Semaphore};
pub use slot::{Crc32SlotHasher, ModuloSlotHasher, SlotHasher, SlotId};
pub use ttl::{Clock, ManualClock, SystemClock, TtlPolicy};
pub use typed::TypedCacheExt;
pub use version::SequenceCounter;

/// Initialize tracing from `RUST_LOG`
pub fn init_tracing() {
    use tracing_subscriber::{EnvFilter, fmt};

    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .with_line_number(true)
        .finish();

    let _ = tracing::subscriber::set_global_default(subscriber);
}
