//! cfgcache Common Library
//!
//! This crate provides shared constants, the cache domain description and
//! configuration loading utilities for all cfgcache workspace crates.
//!
//! # Module Structure
//!
//! - [`shm`] - Shared memory size limits and layout constants
//! - [`domain`] - Cache domain (namespace token, capacity, TTL, lock holders)
//! - [`config`] - Configuration loading traits and types
//! - [`consts`] - Defaults shared by the library and the operator CLI
//! - [`prelude`] - Common re-exports for convenience
//!
//! # Usage
//!
//! ```rust
//! use cfgcache_common::prelude::*;
//!
//! let domain = CacheDomain::new("/etc/cfgcache/namespace");
//! assert_eq!(domain.ttl_seconds, DEFAULT_TTL_SECONDS);
//! ```

pub mod config;
pub mod consts;
pub mod domain;
pub mod prelude;
pub mod shm;
