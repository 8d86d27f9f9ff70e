//! Workspace-wide defaults.
//!
//! Single source of truth for cache defaults and default paths.

/// Default shared segment capacity in bytes (header included).
pub const DEFAULT_SEGMENT_CAPACITY: usize = 10_000;

/// Default number of seconds an entry stays readable after it was written.
pub const DEFAULT_TTL_SECONDS: u64 = 30;

/// Default number of processes allowed to hold the mutation lock at once.
pub const DEFAULT_MAX_LOCK_HOLDERS: u32 = 1;

/// Project identifier passed to `ftok` alongside the namespace token.
pub const IPC_PROJECT_ID: u8 = b'x';

/// Permission bits for created segments and semaphores (`rw-r-----`).
pub const IPC_PERMISSIONS: u32 = 0o640;

/// Default configuration file used by the operator CLI.
pub const DEFAULT_CONFIG_PATH: &str = "/etc/cfgcache/config.toml";
