//! Prelude module for common re-exports.
//!
//! ```rust
//! use cfgcache_common::prelude::*;
//! ```

// ─── Logging ────────────────────────────────────────────────────────
pub use crate::config::LogLevel;

// ─── Configuration ──────────────────────────────────────────────────
pub use crate::config::{CacheConfig, ConfigError, ConfigLoader, SharedConfig, Validate};
pub use crate::domain::CacheDomain;

// ─── Defaults ───────────────────────────────────────────────────────
pub use crate::consts::{
    DEFAULT_MAX_LOCK_HOLDERS, DEFAULT_SEGMENT_CAPACITY, DEFAULT_TTL_SECONDS,
};

// ─── Shared Memory ──────────────────────────────────────────────────
pub use crate::shm::consts::{SEGMENT_MAX_SIZE, SEGMENT_MIN_SIZE};
