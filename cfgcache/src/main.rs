//! # cfgcache Operator CLI
//!
//! Inspect and maintain the shared configuration cache of a host from the
//! shell. The cache domain is read from the same TOML file the worker
//! processes use, so the CLI attaches to exactly their segment and lock.
//!
//! # Usage
//!
//! ```bash
//! # Show segment usage and lock state
//! cfgcache --config /etc/cfgcache/config.toml stats
//!
//! # Read, write and drop single keys
//! cfgcache get app.name
//! cfgcache put app.name MyApp
//! cfgcache delete app.name
//!
//! # Remove the segment and lock for every attached process
//! cfgcache purge
//! ```

#![deny(warnings)]

use cfgcache_common::consts::DEFAULT_CONFIG_PATH;
use cfgcache_common::prelude::*;
use cfgcache_shm::{CacheSetupError, CacheTeardownError, SharedCache};
use clap::{Parser, Subcommand};
use std::io::Write;
use std::path::PathBuf;
use thiserror::Error;
use tracing::{Level, debug, error, info};
use tracing_subscriber::EnvFilter;

/// cfgcache - shared configuration cache maintenance
#[derive(Parser, Debug)]
#[command(name = "cfgcache")]
#[command(author = "RTS007")]
#[command(version)]
#[command(about = "Inspect and maintain the cross-process configuration cache")]
#[command(long_about = None)]
struct Args {
    /// Path to the configuration file holding the [cache] domain
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Output logs in JSON format
    #[arg(long)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the cached value of a key
    Get {
        /// Configuration key
        key: String,
    },
    /// Store a value under a key
    Put {
        /// Configuration key
        key: String,
        /// Value, stored as UTF-8 bytes
        value: String,
    },
    /// Remove a key from the cache
    Delete {
        /// Configuration key
        key: String,
    },
    /// Remove the shared segment and lock
    Purge,
    /// Print segment and lock statistics as JSON
    Stats,
}

#[derive(Debug, Error)]
enum CliError {
    #[error(transparent)]
    Setup(#[from] CacheSetupError),

    #[error(transparent)]
    Teardown(#[from] CacheTeardownError),

    #[error("Key '{0}' is not cached")]
    Miss(String),

    #[error("Cache {op} of '{key}' failed")]
    Rejected { op: &'static str, key: String },

    #[error("Cache is disabled in the configuration")]
    Disabled,

    #[error("Failed to write output: {0}")]
    Output(#[from] std::io::Error),

    #[error("Failed to encode statistics: {0}")]
    Encode(#[from] serde_json::Error),
}

fn main() {
    let args = Args::parse();

    let config = match CacheConfig::load(&args.config) {
        Ok(config) => config,
        Err(e) => {
            setup_tracing(&args, LogLevel::default());
            error!("Cannot load {}: {}", args.config.display(), e);
            std::process::exit(1);
        }
    };
    setup_tracing(&args, config.shared.log_level);

    if let Err(e) = run(&args.command, config) {
        error!("{}", e);
        std::process::exit(1);
    }
}

fn run(command: &Command, config: CacheConfig) -> Result<(), CliError> {
    debug!(
        "Service '{}' using token {}",
        config.shared.service_name,
        config.cache.namespace_token.display()
    );
    let mut cache = SharedCache::open(config.cache)?;
    if !cache.is_attached() && !matches!(command, Command::Purge) {
        return Err(CliError::Disabled);
    }

    let mut stdout = std::io::stdout().lock();
    match command {
        Command::Get { key } => {
            let value = cache.get(key).ok_or_else(|| CliError::Miss(key.clone()))?;
            stdout.write_all(&value)?;
            writeln!(stdout)?;
        }
        Command::Put { key, value } => {
            if !cache.put(key, value.as_bytes()) {
                return Err(CliError::Rejected {
                    op: "put",
                    key: key.clone(),
                });
            }
            info!("Stored '{}' ({} bytes)", key, value.len());
        }
        Command::Delete { key } => {
            if !cache.delete(key) {
                return Err(CliError::Rejected {
                    op: "delete",
                    key: key.clone(),
                });
            }
            info!("Deleted '{}'", key);
        }
        Command::Purge => {
            cache.purge()?;
        }
        Command::Stats => {
            if let Some(stats) = cache.stats() {
                serde_json::to_writer_pretty(&mut stdout, &stats)?;
                writeln!(stdout)?;
            }
        }
    }
    Ok(())
}

/// Logs go to stderr so command output on stdout stays scriptable.
fn setup_tracing(args: &Args, configured: LogLevel) {
    let filter = if args.verbose {
        EnvFilter::from_default_env().add_directive(Level::DEBUG.into())
    } else {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(configured.as_directive()))
    };

    if args.json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    }
}
