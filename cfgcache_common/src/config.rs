//! Configuration loading traits and types.
//!
//! A configuration file is only handed out once it has parsed and passed its
//! [`Validate`] checks, so a process never starts on a half-valid domain.
//!
//! # Usage
//!
//! ```rust,no_run
//! use cfgcache_common::config::{CacheConfig, ConfigError, ConfigLoader};
//! use std::path::Path;
//!
//! fn main() -> Result<(), ConfigError> {
//!     let config = CacheConfig::load(Path::new("config.toml"))?;
//!     println!("Service: {}", config.shared.service_name);
//!     Ok(())
//! }
//! ```

use crate::domain::CacheDomain;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Error type for configuration loading operations.
#[derive(Debug, Clone, Error)]
pub enum ConfigError {
    /// Configuration file not found at specified path.
    #[error("Configuration file not found")]
    FileNotFound,

    /// TOML parsing failed.
    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    /// Semantic validation failed.
    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

/// Log level for application logging.
///
/// Uses lowercase serde values for TOML compatibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Most verbose, detailed tracing information.
    Trace,
    /// Debug information useful during development.
    Debug,
    /// General information about application operation.
    #[default]
    Info,
    /// Warning messages for potentially problematic situations.
    Warn,
    /// Error messages for serious problems.
    Error,
}

impl LogLevel {
    /// Directive string understood by `tracing_subscriber::EnvFilter`.
    pub fn as_directive(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

/// Common configuration fields shared across cfgcache processes.
///
/// # TOML Example
///
/// ```toml
/// [shared]
/// log_level = "debug"
/// service_name = "cfgcache"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SharedConfig {
    /// Logging verbosity level.
    #[serde(default)]
    pub log_level: LogLevel,

    /// Application instance identifier.
    pub service_name: String,
}

impl Validate for SharedConfig {
    /// Rejects an empty `service_name`.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.service_name.is_empty() {
            return Err(ConfigError::ValidationError(
                "service_name cannot be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// Complete configuration file of a cache user: shared section plus domain.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Logging and identity.
    pub shared: SharedConfig,

    /// The cache domain to attach to.
    pub cache: CacheDomain,
}

impl Validate for CacheConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        self.shared.validate()?;
        self.cache.validate()
    }
}

/// Semantic checks a parsed configuration must pass.
pub trait Validate {
    /// `Err(ConfigError::ValidationError)` naming the first offending field.
    fn validate(&self) -> Result<(), ConfigError>;
}

/// Loads validated configuration from TOML files.
///
/// Implemented for every `DeserializeOwned` type that is also [`Validate`].
///
/// # Contract
///
/// - Returns `ConfigError::FileNotFound` if the file does not exist
/// - Returns `ConfigError::ParseError` if TOML syntax or shape is invalid
/// - Returns `ConfigError::ValidationError` if the parsed value fails
///   [`Validate::validate`]
pub trait ConfigLoader: Sized + serde::de::DeserializeOwned + Validate {
    /// Parse and validate a TOML file.
    fn load(path: &Path) -> Result<Self, ConfigError> {
        let config = Self::parse(path)?;
        config.validate()?;
        Ok(config)
    }

    /// Parse a TOML file without semantic checks.
    fn parse(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ConfigError::FileNotFound
            } else {
                ConfigError::ParseError(e.to_string())
            }
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::ParseError(e.to_string()))
    }
}

impl<T: serde::de::DeserializeOwned + Validate> ConfigLoader for T {}
