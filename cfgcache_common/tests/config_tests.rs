//! Configuration file tests: full `[shared]` + `[cache]` files on disk.

use cfgcache_common::config::{CacheConfig, ConfigError, ConfigLoader};
use cfgcache_common::prelude::*;
use std::fs;
use tempfile::TempDir;

fn write_config(dir: &TempDir, body: &str) -> std::path::PathBuf {
    let path = dir.path().join("config.toml");
    fs::write(&path, body).unwrap();
    path
}

#[test]
fn test_minimal_config_uses_defaults() {
    let dir = TempDir::new().unwrap();
    let path = write_config(
        &dir,
        r#"
[shared]
service_name = "worker"

[cache]
namespace_token = "/var/run/cfgcache.ns"
"#,
    );

    let config = CacheConfig::load(&path).unwrap();
    assert_eq!(config.shared.log_level, LogLevel::Info);
    assert_eq!(config.cache.segment_capacity_bytes, DEFAULT_SEGMENT_CAPACITY);
    assert_eq!(config.cache.ttl_seconds, DEFAULT_TTL_SECONDS);
    assert_eq!(config.cache.max_lock_holders, DEFAULT_MAX_LOCK_HOLDERS);
    assert!(config.cache.enabled);
}

#[test]
fn test_disabled_cache() {
    let dir = TempDir::new().unwrap();
    let path = write_config(
        &dir,
        r#"
[shared]
service_name = "worker"

[cache]
namespace_token = "/var/run/cfgcache.ns"
enabled = false
"#,
    );

    let config = CacheConfig::load(&path).unwrap();
    assert!(!config.cache.enabled);
}

#[test]
fn test_missing_cache_section() {
    let dir = TempDir::new().unwrap();
    let path = write_config(
        &dir,
        r#"
[shared]
service_name = "worker"
"#,
    );

    assert!(matches!(
        CacheConfig::load(&path),
        Err(ConfigError::ParseError(_))
    ));
}

#[test]
fn test_capacity_below_minimum_rejected() {
    let dir = TempDir::new().unwrap();
    let path = write_config(
        &dir,
        &format!(
            r#"
[shared]
service_name = "worker"

[cache]
namespace_token = "/var/run/cfgcache.ns"
segment_capacity_bytes = {}
"#,
            SEGMENT_MIN_SIZE - 1
        ),
    );

    assert!(matches!(
        CacheConfig::load(&path),
        Err(ConfigError::ValidationError(_))
    ));
}

#[test]
fn test_empty_service_name_rejected() {
    let dir = TempDir::new().unwrap();
    let path = write_config(
        &dir,
        r#"
[shared]
service_name = ""

[cache]
namespace_token = "/var/run/cfgcache.ns"
"#,
    );

    assert!(matches!(
        CacheConfig::load(&path),
        Err(ConfigError::ValidationError(_))
    ));
}
