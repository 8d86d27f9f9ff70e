//! Cache domain description.
//!
//! A [`CacheDomain`] names one shared cache: every process that builds a
//! domain with the same namespace token attaches to the same segment and
//! semaphore. Two logically distinct caches must never share a token.

use crate::config::{ConfigError, Validate};
use crate::consts::{DEFAULT_MAX_LOCK_HOLDERS, DEFAULT_SEGMENT_CAPACITY, DEFAULT_TTL_SECONDS};
use crate::shm::consts::{SEGMENT_MAX_SIZE, SEGMENT_MIN_SIZE};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Configuration of one cross-process cache.
///
/// # TOML Example
///
/// ```toml
/// [cache]
/// namespace_token = "/etc/cfgcache/namespace"
/// segment_capacity_bytes = 10000
/// ttl_seconds = 30
/// max_lock_holders = 1
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CacheDomain {
    /// Path of an existing file agreed on by all cooperating processes.
    pub namespace_token: PathBuf,

    /// Size of the shared segment in bytes, header included.
    #[serde(default = "default_capacity")]
    pub segment_capacity_bytes: usize,

    /// Seconds an entry stays readable after it was written.
    #[serde(default = "default_ttl")]
    pub ttl_seconds: u64,

    /// Number of processes allowed to hold the mutation lock at once.
    #[serde(default = "default_holders")]
    pub max_lock_holders: u32,

    /// When false the cache never touches IPC: reads miss, writes report failure.
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_capacity() -> usize {
    DEFAULT_SEGMENT_CAPACITY
}

fn default_ttl() -> u64 {
    DEFAULT_TTL_SECONDS
}

fn default_holders() -> u32 {
    DEFAULT_MAX_LOCK_HOLDERS
}

fn default_enabled() -> bool {
    true
}

impl CacheDomain {
    /// Domain with default capacity, TTL and lock holders.
    pub fn new(namespace_token: impl Into<PathBuf>) -> Self {
        Self {
            namespace_token: namespace_token.into(),
            segment_capacity_bytes: DEFAULT_SEGMENT_CAPACITY,
            ttl_seconds: DEFAULT_TTL_SECONDS,
            max_lock_holders: DEFAULT_MAX_LOCK_HOLDERS,
            enabled: true,
        }
    }

    /// Set the segment capacity in bytes.
    pub fn with_capacity(mut self, bytes: usize) -> Self {
        self.segment_capacity_bytes = bytes;
        self
    }

    /// Set the entry time-to-live in seconds.
    pub fn with_ttl(mut self, seconds: u64) -> Self {
        self.ttl_seconds = seconds;
        self
    }

    /// Set the number of concurrent lock holders.
    pub fn with_max_lock_holders(mut self, holders: u32) -> Self {
        self.max_lock_holders = holders;
        self
    }

    /// Disable the cache entirely.
    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    /// Entry time-to-live as a [`Duration`].
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_seconds)
    }
}

impl Validate for CacheDomain {
    /// Fails if:
    /// - `namespace_token` is empty
    /// - `segment_capacity_bytes` is outside `[SEGMENT_MIN_SIZE, SEGMENT_MAX_SIZE]`
    /// - `ttl_seconds` or `max_lock_holders` is zero
    fn validate(&self) -> Result<(), ConfigError> {
        if self.namespace_token.as_os_str().is_empty() {
            return Err(ConfigError::ValidationError(
                "namespace_token cannot be empty".to_string(),
            ));
        }
        if !(SEGMENT_MIN_SIZE..=SEGMENT_MAX_SIZE).contains(&self.segment_capacity_bytes) {
            return Err(ConfigError::ValidationError(format!(
                "segment_capacity_bytes must be within {}..={}, got {}",
                SEGMENT_MIN_SIZE, SEGMENT_MAX_SIZE, self.segment_capacity_bytes
            )));
        }
        if self.ttl_seconds == 0 {
            return Err(ConfigError::ValidationError(
                "ttl_seconds must be greater than zero".to_string(),
            ));
        }
        if self.max_lock_holders == 0 {
            return Err(ConfigError::ValidationError(
                "max_lock_holders must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let domain = CacheDomain::new("/tmp/token");
        assert_eq!(domain.segment_capacity_bytes, 10_000);
        assert_eq!(domain.ttl_seconds, 30);
        assert_eq!(domain.max_lock_holders, 1);
        assert!(domain.enabled);
        assert!(domain.validate().is_ok());
    }

    #[test]
    fn test_builder() {
        let domain = CacheDomain::new("/tmp/token")
            .with_capacity(1000)
            .with_ttl(1)
            .with_max_lock_holders(2);
        assert_eq!(domain.segment_capacity_bytes, 1000);
        assert_eq!(domain.ttl(), Duration::from_secs(1));
        assert_eq!(domain.max_lock_holders, 2);
    }

    #[test]
    fn test_validation_failures() {
        let bad = [
            CacheDomain::new(""),
            CacheDomain::new("/tmp/token").with_capacity(0),
            CacheDomain::new("/tmp/token").with_capacity(SEGMENT_MIN_SIZE - 1),
            CacheDomain::new("/tmp/token").with_capacity(SEGMENT_MAX_SIZE + 1),
            CacheDomain::new("/tmp/token").with_ttl(0),
            CacheDomain::new("/tmp/token").with_max_lock_holders(0),
        ];
        for domain in bad {
            assert!(
                matches!(domain.validate(), Err(ConfigError::ValidationError(_))),
                "expected validation failure for {:?}",
                domain
            );
        }
    }

    #[test]
    fn test_deserialize_with_defaults() {
        let domain: CacheDomain = toml::from_str(r#"namespace_token = "/tmp/ns""#).unwrap();
        assert_eq!(domain, CacheDomain::new("/tmp/ns"));
    }

    #[test]
    fn test_deserialize_rejects_unknown_fields() {
        let result = toml::from_str::<CacheDomain>(
            r#"
namespace_token = "/tmp/ns"
ttl = 5
"#,
        );
        assert!(result.is_err());
    }
}
